//! In-memory capability table.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::traits::Authorizer;
use crate::types::{Address, Capability};

/// Capability → holders map implementing [`Authorizer`].
///
/// # Examples
///
/// ```
/// use ebb_core::auth::RoleTable;
/// use ebb_core::traits::Authorizer;
/// use ebb_core::types::{Address, Capability};
///
/// let gov = Address::from_seed(1);
/// let mut roles = RoleTable::new();
/// roles.grant(Capability::Governor, gov);
/// assert!(roles.has(Capability::Governor, &gov));
/// assert!(!roles.has(Capability::EntryPoint, &gov));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleTable {
    holders: HashMap<Capability, BTreeSet<Address>>,
}

impl RoleTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table wired for a standard deployment: one governor, one entry point,
    /// one finance manager, and the controller allowed to mint share tokens.
    pub fn standard(governor: Address, entry_point: Address, finance: Address) -> Self {
        let mut t = Self::new();
        t.grant(Capability::Governor, governor);
        t.grant(Capability::EntryPoint, entry_point);
        t.grant(Capability::FinanceManager, finance);
        t.grant(Capability::LockedTokenManager, Address::LOCKING_CONTROLLER);
        t
    }

    /// Give `who` a capability. Returns `false` if it already held it.
    pub fn grant(&mut self, capability: Capability, who: Address) -> bool {
        self.holders.entry(capability).or_default().insert(who)
    }

    /// Take a capability away. Returns `false` if `who` did not hold it.
    pub fn revoke(&mut self, capability: Capability, who: &Address) -> bool {
        self.holders
            .get_mut(&capability)
            .is_some_and(|set| set.remove(who))
    }

    /// All holders of a capability, in address order.
    pub fn holders(&self, capability: Capability) -> Vec<Address> {
        self.holders
            .get(&capability)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }
}

impl Authorizer for RoleTable {
    fn has(&self, capability: Capability, caller: &Address) -> bool {
        self.holders
            .get(&capability)
            .is_some_and(|set| set.contains(caller))
    }
}
