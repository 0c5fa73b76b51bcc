use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::types::{AccountId, Amount, Epoch, Timestamp};

// ── Reward tokens ────────────────────────────────────────────────────────────

/// The two denominations every reward deposit carries. The ledger never
/// touches the tokens themselves; custody transfer is the collaborators' job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RewardToken {
    Asset,
    Secondary,
}

impl RewardToken {
    pub const ALL: [RewardToken; 2] = [RewardToken::Asset, RewardToken::Secondary];
}

impl fmt::Display for RewardToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewardToken::Asset => write!(f, "asset"),
            RewardToken::Secondary => write!(f, "secondary"),
        }
    }
}

/// A pair of amounts, one per reward token.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardPair {
    pub asset: Amount,
    pub secondary: Amount,
}

impl RewardPair {
    pub fn new(asset: Amount, secondary: Amount) -> Self {
        Self { asset, secondary }
    }

    pub fn is_zero(&self) -> bool {
        self.asset == 0 && self.secondary == 0
    }

    pub fn get(&self, token: RewardToken) -> Amount {
        match token {
            RewardToken::Asset => self.asset,
            RewardToken::Secondary => self.secondary,
        }
    }
}

/// Reward deposited against one finalized epoch. Write-once: no operation may
/// overwrite an existing epoch's record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardRecord {
    pub asset: Amount,
    pub secondary: Amount,
}

// ── Sparse epoch series ──────────────────────────────────────────────────────
//
// Per-epoch snapshots are sparse maps: only touched epochs allocate an entry,
// and an absent entry means "carried forward from the nearest prior recorded
// value". Catch-up makes the carry explicit on demand; pure-zero carries stay
// elided because an absent entry already reads as zero.

fn fill_gap(
    last: &mut BTreeMap<Epoch, Amount>,
    min: &mut BTreeMap<Epoch, Amount>,
    cursor: &mut Epoch,
    carried: Amount,
    until: Epoch,
) {
    if until == 0 || *cursor >= until - 1 {
        return;
    }
    if carried != 0 {
        for e in (*cursor + 1)..until {
            last.insert(e, carried);
            min.insert(e, carried);
        }
    }
    *cursor = until - 1;
}

fn observe(
    last: &mut BTreeMap<Epoch, Amount>,
    min: &mut BTreeMap<Epoch, Amount>,
    epoch: Epoch,
    carried: Amount,
    new_value: Amount,
) {
    // First touch of the epoch seeds the minimum with the carried-in value;
    // every touch lowers it to the updated value if that is smaller.
    let m = min.entry(epoch).or_insert(carried);
    if new_value < *m {
        *m = new_value;
    }
    last.insert(epoch, new_value);
}

// ── StakerLedger ─────────────────────────────────────────────────────────────

/// Full staking and reward state of one staker, as stored in the ledger DB.
///
/// The record is created on the first nonzero stake and kept after removal:
/// `is_staker` flips to false and the stake zeroes, but cumulative totals,
/// the reward cursor and the delegation opt-in survive a later re-creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StakerLedger {
    pub staker: AccountId,
    pub is_staker: bool,
    /// Set when the position transitions from nonexistent to existing;
    /// refreshed on re-creation.
    pub staking_start: Timestamp,
    pub staked_amount: Amount,
    pub last_staked_per_epoch: BTreeMap<Epoch, Amount>,
    pub min_staked_per_epoch: BTreeMap<Epoch, Amount>,
    /// Highest epoch with a finalized snapshot for this staker.
    pub last_epoch_staking_updated: Epoch,
    pub unclaimed: RewardPair,
    pub cumulative: RewardPair,
    /// Highest epoch whose reward has been accrued into `unclaimed`.
    pub last_epoch_rewards_updated: Epoch,
    /// Owned by the loan collaborator; read, never written, by the claim flow.
    pub accepts_delegated_claims: bool,
}

impl StakerLedger {
    pub fn new(staker: AccountId) -> Self {
        Self {
            staker,
            is_staker: false,
            staking_start: 0,
            staked_amount: 0,
            last_staked_per_epoch: BTreeMap::new(),
            min_staked_per_epoch: BTreeMap::new(),
            last_epoch_staking_updated: 0,
            unclaimed: RewardPair::default(),
            cumulative: RewardPair::default(),
            last_epoch_rewards_updated: 0,
            accepts_delegated_claims: false,
        }
    }

    /// Roll the snapshot forward through every epoch strictly before `until`:
    /// an epoch with no activity is recorded as flat at the carried-in value.
    pub fn catch_up(&mut self, until: Epoch) {
        fill_gap(
            &mut self.last_staked_per_epoch,
            &mut self.min_staked_per_epoch,
            &mut self.last_epoch_staking_updated,
            self.staked_amount,
            until,
        );
    }

    /// Record a stake update observed inside `epoch` and make `new_amount`
    /// the current stake. Caller is responsible for prior catch-up.
    pub fn observe_update(&mut self, epoch: Epoch, new_amount: Amount) {
        observe(
            &mut self.last_staked_per_epoch,
            &mut self.min_staked_per_epoch,
            epoch,
            self.staked_amount,
            new_amount,
        );
        self.last_epoch_staking_updated = epoch;
        self.staked_amount = new_amount;
    }

    /// Snapshot minimum for a caught-up epoch; absent entries read as zero.
    pub fn min_staked_at(&self, epoch: Epoch) -> Amount {
        self.min_staked_per_epoch.get(&epoch).copied().unwrap_or(0)
    }

    pub fn last_staked_at(&self, epoch: Epoch) -> Amount {
        self.last_staked_per_epoch.get(&epoch).copied().unwrap_or(0)
    }

    /// Whether the epoch has an explicit snapshot entry (min or last).
    pub fn has_entry_at(&self, epoch: Epoch) -> bool {
        self.min_staked_per_epoch.contains_key(&epoch)
            || self.last_staked_per_epoch.contains_key(&epoch)
    }
}

// ── GlobalLedger ─────────────────────────────────────────────────────────────

/// The aggregate side of the ledger: one record for the whole system.
///
/// The global minimum for an epoch is sampled at the actual sequence of
/// update events, so it is *not* in general the sum of per-staker minima:
/// different stakers bottom out at different instants.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalLedger {
    pub total_staked: Amount,
    pub staker_count: u64,
    pub last_staked_per_epoch: BTreeMap<Epoch, Amount>,
    pub min_staked_per_epoch: BTreeMap<Epoch, Amount>,
    pub last_epoch_staking_updated: Epoch,
    /// The global reward cursor: highest epoch with a finalized RewardRecord.
    pub last_epoch_rewards_updated: Epoch,
}

impl GlobalLedger {
    /// Global analogue of [`StakerLedger::catch_up`], carrying `total_staked`.
    pub fn catch_up(&mut self, until: Epoch) {
        fill_gap(
            &mut self.last_staked_per_epoch,
            &mut self.min_staked_per_epoch,
            &mut self.last_epoch_staking_updated,
            self.total_staked,
            until,
        );
    }

    /// Record the aggregate update observed inside `epoch` and make
    /// `new_total` the current total stake.
    pub fn observe_update(&mut self, epoch: Epoch, new_total: Amount) {
        observe(
            &mut self.last_staked_per_epoch,
            &mut self.min_staked_per_epoch,
            epoch,
            self.total_staked,
            new_total,
        );
        self.last_epoch_staking_updated = epoch;
        self.total_staked = new_total;
    }

    pub fn min_staked_at(&self, epoch: Epoch) -> Amount {
        self.min_staked_per_epoch.get(&epoch).copied().unwrap_or(0)
    }

    pub fn last_staked_at(&self, epoch: Epoch) -> Amount {
        self.last_staked_per_epoch.get(&epoch).copied().unwrap_or(0)
    }
}
