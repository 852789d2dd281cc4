//! Scenario files: a funded controller plus a list of steps replayed against
//! a weekly clock.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use ebb_core::auth::RoleTable;
use ebb_core::epoch::{epoch, epoch_start};
use ebb_core::types::{Address, Env};
use ebb_core::wad::{format_wad, parse_wad};
use ebb_locking::{LockingConfig, LockingController, Token};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub const GOVERNOR: Address = Address::from_seed(0x01);
pub const ENTRY_POINT: Address = Address::from_seed(0x02);
pub const FINANCE: Address = Address::from_seed(0x03);

#[derive(Debug, Deserialize)]
pub struct Scenario {
    /// Controller configuration. Defaults to the standard thirteen buckets.
    #[serde(default = "LockingConfig::standard")]
    pub config: LockingConfig,
    /// Epoch the clock starts in.
    #[serde(default = "default_start_epoch")]
    pub start_epoch: u64,
    /// Receipt tokens minted to the entry point and to the finance manager.
    pub funding: u64,
    pub steps: Vec<Step>,
}

fn default_start_epoch() -> u64 {
    1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Lock { user: String, amount: u64, duration: u64 },
    /// Unwind `shares` of the bucket, or everything the user holds in it.
    Unwind { user: String, duration: u64, shares: Option<u64> },
    Extend { user: String, from: u64, to: u64, shares: Option<u64> },
    Cancel { user: String, started_epoch: u64, new_duration: u64 },
    Withdraw { user: String, started_epoch: u64 },
    Reward { amount: u64 },
    Loss { amount: u64 },
    SetMultiplier { duration: u64, multiplier: String },
    Pause,
    Unpause,
    Advance { epochs: u64 },
    Report,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing scenario {}", path.display()))
    }
}

/// Longest user name that still fits an address after the tag byte.
pub const MAX_USER_NAME: usize = 19;

/// Deterministic address for a scenario user name. The name is stored
/// verbatim, so distinct names always get distinct addresses.
pub fn user_address(name: &str) -> Result<Address> {
    if name.is_empty() || name.len() > MAX_USER_NAME || name.contains('\0') {
        bail!("user name {name:?} must be 1..={MAX_USER_NAME} bytes without NUL");
    }
    let mut bytes = [0u8; 20];
    bytes[0] = 0xee;
    bytes[1..=name.len()].copy_from_slice(name.as_bytes());
    Ok(Address::from(bytes))
}

#[derive(Debug, Serialize)]
pub struct UnwindingReport {
    pub started_epoch: u64,
    pub balance: u128,
    pub reward_weight: u128,
}

#[derive(Debug, Serialize)]
pub struct UserReport {
    pub locked_balance: u128,
    pub reward_weight: u128,
    pub wallet: u128,
    pub unwinding: Vec<UnwindingReport>,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub epoch: u64,
    pub status: String,
    pub total_balance: u128,
    pub global_principal: u128,
    pub global_reward_weight: u128,
    pub reward_multiplier: String,
    pub unwinding_principal: u128,
    pub unwinding_reward_weight: u128,
    pub slash_index: String,
    pub users: BTreeMap<String, UserReport>,
}

/// Replays a scenario and keeps track of names and open positions.
pub struct Simulator {
    controller: LockingController<RoleTable>,
    now: u64,
    step: u64,
    users: BTreeMap<String, Address>,
    /// Open unwinding positions per user, by start timestamp.
    unwinding: BTreeMap<String, Vec<u64>>,
    pub rejected: usize,
}

impl Simulator {
    pub fn new(scenario: &Scenario) -> Result<Self> {
        let mut receipt = Token::new("eUSD");
        let funding = u128::from(scenario.funding);
        receipt.mint(&ENTRY_POINT, funding)?;
        receipt.mint(&FINANCE, funding)?;
        let controller = LockingController::with_config(
            RoleTable::standard(GOVERNOR, ENTRY_POINT, FINANCE),
            receipt,
            &scenario.config,
        )
        .context("building controller from scenario config")?;
        info!(
            buckets = controller.enabled_buckets().len(),
            funding,
            start_epoch = scenario.start_epoch,
            "simulator ready"
        );
        Ok(Self {
            controller,
            now: epoch_start(scenario.start_epoch) + 3_600,
            step: 0,
            users: BTreeMap::new(),
            unwinding: BTreeMap::new(),
            rejected: 0,
        })
    }

    pub fn controller(&self) -> &LockingController<RoleTable> {
        &self.controller
    }

    fn user(&mut self, name: &str) -> Result<Address> {
        if let Some(who) = self.users.get(name) {
            return Ok(*who);
        }
        let who = user_address(name)?;
        self.users.insert(name.to_string(), who);
        Ok(who)
    }

    /// Each step gets its own second so unwinding keys never collide.
    fn tick(&mut self) -> u64 {
        self.step += 1;
        self.now + self.step
    }

    fn open_position(&self, name: &str, started_epoch: u64) -> Option<u64> {
        self.unwinding
            .get(name)?
            .iter()
            .copied()
            .find(|ts| epoch(*ts) == started_epoch)
    }

    fn close_position(&mut self, name: &str, ts: u64) {
        if let Some(open) = self.unwinding.get_mut(name) {
            open.retain(|t| *t != ts);
        }
    }

    /// Apply one step. Rejected protocol calls are logged and counted; only
    /// malformed steps are errors.
    pub fn apply(&mut self, step: &Step) -> Result<Option<Report>> {
        let ts = self.tick();
        let entry = Env::new(ENTRY_POINT, ts);
        let outcome = match step {
            Step::Lock { user, amount, duration } => {
                let who = self.user(user)?;
                self.controller
                    .create_position(&entry, u128::from(*amount), *duration, who)
                    .map(|shares| debug!(user = %user, shares, "locked"))
            }
            Step::Unwind { user, duration, shares } => {
                let who = self.user(user)?;
                let shares = match shares {
                    Some(s) => u128::from(*s),
                    None => self
                        .controller
                        .bucket(*duration)
                        .map(|b| b.share_token.balance_of(&who))
                        .unwrap_or(0),
                };
                let r = self.controller.start_unwinding(&entry, shares, *duration, who);
                if r.is_ok() {
                    self.unwinding.entry(user.clone()).or_default().push(ts);
                }
                r
            }
            Step::Extend { user, from, to, shares } => {
                let who = self.user(user)?;
                let shares = match shares {
                    Some(s) => u128::from(*s),
                    None => self
                        .controller
                        .bucket(*from)
                        .map(|b| b.share_token.balance_of(&who))
                        .unwrap_or(0),
                };
                self.controller
                    .increase_unwinding_epochs(&entry, shares, *from, *to, who)
                    .map(|_| ())
            }
            Step::Cancel { user, started_epoch, new_duration } => {
                let who = self.user(user)?;
                let Some(start) = self.open_position(user, *started_epoch) else {
                    bail!("{user} has no unwinding started in epoch {started_epoch}");
                };
                let r = self.controller.cancel_unwinding(&entry, who, start, *new_duration);
                if r.is_ok() {
                    self.close_position(user, start);
                }
                r.map(|_| ())
            }
            Step::Withdraw { user, started_epoch } => {
                let who = self.user(user)?;
                let Some(start) = self.open_position(user, *started_epoch) else {
                    bail!("{user} has no unwinding started in epoch {started_epoch}");
                };
                let r = self.controller.withdraw(&entry, who, start);
                if let Ok(amount) = r {
                    self.close_position(user, start);
                    info!(user = %user, amount, "withdrawn");
                }
                r.map(|_| ())
            }
            Step::Reward { amount } => self
                .controller
                .deposit_rewards(&Env::new(FINANCE, ts), u128::from(*amount)),
            Step::Loss { amount } => self
                .controller
                .apply_losses(&Env::new(FINANCE, ts), u128::from(*amount))
                .map(|outcome| info!(?outcome, "loss reported")),
            Step::SetMultiplier { duration, multiplier } => {
                let Some(m) = parse_wad(multiplier) else {
                    bail!("invalid multiplier {multiplier:?}");
                };
                self.controller
                    .set_bucket_multiplier(&Env::new(GOVERNOR, ts), *duration, m)
            }
            Step::Pause => self.controller.pause(&Env::new(GOVERNOR, ts)),
            Step::Unpause => self.controller.unpause(&Env::new(GOVERNOR, ts)),
            Step::Advance { epochs } => {
                self.now = epoch_start(epoch(self.now) + epochs) + 3_600;
                self.step = 0;
                debug!(epoch = epoch(self.now), "clock advanced");
                Ok(())
            }
            Step::Report => return Ok(Some(self.report()?)),
        };

        if let Err(e) = outcome {
            self.rejected += 1;
            warn!(?step, error = %e, "step rejected");
        }
        Ok(None)
    }

    pub fn report(&self) -> Result<Report> {
        let c = &self.controller;
        let now = self.now + self.step;
        let mut users = BTreeMap::new();
        for (name, who) in &self.users {
            let mut unwinding = Vec::new();
            for ts in self.unwinding.get(name).into_iter().flatten() {
                unwinding.push(UnwindingReport {
                    started_epoch: epoch(*ts),
                    balance: c.unwinding_balance_of(*who, *ts, now)?,
                    reward_weight: c.unwinding_reward_weight(*who, *ts, now)?,
                });
            }
            users.insert(
                name.clone(),
                UserReport {
                    locked_balance: c.balance_of(who)?,
                    reward_weight: c.reward_weight(who)?,
                    wallet: c.receipt().balance_of(who),
                    unwinding,
                },
            );
        }
        Ok(Report {
            epoch: epoch(now),
            status: c.status().to_string(),
            total_balance: c.total_balance()?,
            global_principal: c.global_principal(),
            global_reward_weight: c.global_reward_weight(),
            reward_multiplier: format_wad(c.reward_multiplier()?),
            unwinding_principal: c.ledger().total_receipt_tokens(),
            unwinding_reward_weight: c.ledger().total_reward_weight(now)?,
            slash_index: format_wad(c.ledger().slash_index()),
            users,
        })
    }
}
