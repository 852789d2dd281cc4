//! Fungible token balances.
//!
//! [`Token`] is a plain balance table used for the receipt (principal) token.
//! [`ShareToken`] wraps one per bucket and only lets holders of
//! [`Capability::LockedTokenManager`] mint or burn.

use std::collections::BTreeMap;

use ebb_core::error::TokenError;
use ebb_core::traits::Authorizer;
use ebb_core::types::{Address, Capability};

/// A fungible balance table.
///
/// # Invariants
///
/// * `total_supply == balances.values().sum()`
/// * No zero balances are stored.
#[derive(Debug, Clone, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct Token {
    symbol: String,
    balances: BTreeMap<Address, u128>,
    total_supply: u128,
}

impl Token {
    /// Create an empty token.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            balances: BTreeMap::new(),
            total_supply: 0,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn balance_of(&self, who: &Address) -> u128 {
        self.balances.get(who).copied().unwrap_or(0)
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    /// Create `amount` new units for `to`.
    pub fn mint(&mut self, to: &Address, amount: u128) -> Result<(), TokenError> {
        if amount == 0 {
            return Ok(());
        }
        self.total_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::SupplyOverflow)?;
        *self.balances.entry(*to).or_insert(0) += amount;
        Ok(())
    }

    /// Destroy `amount` units held by `from`.
    pub fn burn(&mut self, from: &Address, amount: u128) -> Result<(), TokenError> {
        self.debit(from, amount)?;
        self.total_supply -= amount;
        Ok(())
    }

    /// Move `amount` units between accounts.
    pub fn transfer(&mut self, from: &Address, to: &Address, amount: u128) -> Result<(), TokenError> {
        self.debit(from, amount)?;
        if amount > 0 {
            *self.balances.entry(*to).or_insert(0) += amount;
        }
        Ok(())
    }

    fn debit(&mut self, from: &Address, amount: u128) -> Result<(), TokenError> {
        if amount == 0 {
            return Ok(());
        }
        let have = self.balance_of(from);
        if have < amount {
            return Err(TokenError::InsufficientBalance { have, need: amount });
        }
        if have == amount {
            self.balances.remove(from);
        } else {
            self.balances.insert(*from, have - amount);
        }
        Ok(())
    }
}

/// Claim on one bucket's pooled principal.
#[derive(Debug, Clone, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct ShareToken {
    inner: Token,
}

impl ShareToken {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            inner: Token::new(symbol),
        }
    }

    pub fn symbol(&self) -> &str {
        self.inner.symbol()
    }

    pub fn balance_of(&self, who: &Address) -> u128 {
        self.inner.balance_of(who)
    }

    pub fn total_supply(&self) -> u128 {
        self.inner.total_supply()
    }

    /// Shares are freely transferable between holders.
    pub fn transfer(&mut self, from: &Address, to: &Address, amount: u128) -> Result<(), TokenError> {
        self.inner.transfer(from, to, amount)
    }

    pub fn mint(
        &mut self,
        auth: &dyn Authorizer,
        caller: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        self.check_manager(auth, caller)?;
        self.inner.mint(to, amount)
    }

    pub fn burn(
        &mut self,
        auth: &dyn Authorizer,
        caller: &Address,
        from: &Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        self.check_manager(auth, caller)?;
        self.inner.burn(from, amount)
    }

    fn check_manager(&self, auth: &dyn Authorizer, caller: &Address) -> Result<(), TokenError> {
        if auth.has(Capability::LockedTokenManager, caller) {
            Ok(())
        } else {
            Err(TokenError::Unauthorized(self.inner.symbol.clone()))
        }
    }
}
