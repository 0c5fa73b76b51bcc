use serde::{Deserialize, Serialize};

use kairos_core::events::LedgerEvent;
use kairos_core::ledger::{GlobalLedger, RewardRecord, StakerLedger};
use kairos_core::types::{Amount, Epoch, Timestamp};

// ── Ledger records ───────────────────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcStakerLedger {
    pub staker: String,
    pub is_staker: bool,
    pub staking_start: Timestamp,
    pub staked_amount: String,
    pub last_epoch_staking_updated: Epoch,
    pub unclaimed_asset: String,
    pub unclaimed_secondary: String,
    pub cumulative_asset: String,
    pub cumulative_secondary: String,
    pub last_epoch_rewards_updated: Epoch,
    pub accepts_delegated_claims: bool,
}

impl From<&StakerLedger> for RpcStakerLedger {
    fn from(s: &StakerLedger) -> Self {
        Self {
            staker: s.staker.to_b58(),
            is_staker: s.is_staker,
            staking_start: s.staking_start,
            staked_amount: s.staked_amount.to_string(),
            last_epoch_staking_updated: s.last_epoch_staking_updated,
            unclaimed_asset: s.unclaimed.asset.to_string(),
            unclaimed_secondary: s.unclaimed.secondary.to_string(),
            cumulative_asset: s.cumulative.asset.to_string(),
            cumulative_secondary: s.cumulative.secondary.to_string(),
            last_epoch_rewards_updated: s.last_epoch_rewards_updated,
            accepts_delegated_claims: s.accepts_delegated_claims,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcGlobalLedger {
    pub total_staked: String,
    pub staker_count: u64,
    pub last_epoch_staking_updated: Epoch,
    pub last_epoch_rewards_updated: Epoch,
}

impl From<&GlobalLedger> for RpcGlobalLedger {
    fn from(g: &GlobalLedger) -> Self {
        Self {
            total_staked: g.total_staked.to_string(),
            staker_count: g.staker_count,
            last_epoch_staking_updated: g.last_epoch_staking_updated,
            last_epoch_rewards_updated: g.last_epoch_rewards_updated,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcEpochSnapshot {
    pub epoch: Epoch,
    pub min_staked: String,
    pub last_staked: String,
}

impl RpcEpochSnapshot {
    pub fn new(epoch: Epoch, min: Amount, last: Amount) -> Self {
        Self {
            epoch,
            min_staked: min.to_string(),
            last_staked: last.to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcRewardRecord {
    pub epoch: Epoch,
    pub asset_amount: String,
    pub secondary_amount: String,
}

impl RpcRewardRecord {
    pub fn new(epoch: Epoch, record: &RewardRecord) -> Self {
        Self {
            epoch,
            asset_amount: record.asset.to_string(),
            secondary_amount: record.secondary.to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcCustody {
    pub asset: String,
    pub secondary: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcEpochBounds {
    pub epoch: Epoch,
    pub start: Timestamp,
    pub end: Timestamp,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcLedgerInfo {
    pub init_timestamp: Timestamp,
    pub epoch_size_secs: i64,
    pub current_epoch: Epoch,
    pub rewards_setter: String,
    pub delegated_claimers: Vec<String>,
    pub version: String,
}

// ── Events ───────────────────────────────────────────────────────────────────

/// Wire form of [`LedgerEvent`]: base-58 identities, decimal-string amounts,
/// tagged for JSON consumers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RpcEvent {
    PositionCreated {
        staker: String,
        amount: String,
    },
    PositionUpdated {
        staker: String,
        old_amount: String,
        new_amount: String,
    },
    PositionRemoved {
        staker: String,
        amount: String,
    },
    RewardsSet {
        setter: String,
        epoch: Epoch,
        asset_amount: String,
        secondary_amount: String,
    },
    TokenDeposited {
        token: String,
        from: String,
        amount: String,
    },
    UnclaimedRewardsUpdated {
        staker: String,
        old_asset: String,
        old_secondary: String,
        new_asset: String,
        new_secondary: String,
        from_epoch: Epoch,
        to_epoch: Epoch,
    },
    RewardsClaimed {
        staker: String,
        recipient: String,
        asset_amount: String,
        secondary_amount: String,
    },
    TokenWithdrawn {
        token: String,
        to: String,
        amount: String,
    },
    StuckRewardsAvoided {
        staker: String,
        epoch: Epoch,
        cleared_min: String,
        cleared_last: String,
    },
}

impl From<&LedgerEvent> for RpcEvent {
    fn from(e: &LedgerEvent) -> Self {
        match e {
            LedgerEvent::PositionCreated { staker, amount } => RpcEvent::PositionCreated {
                staker: staker.to_b58(),
                amount: amount.to_string(),
            },
            LedgerEvent::PositionUpdated { staker, old_amount, new_amount } => {
                RpcEvent::PositionUpdated {
                    staker: staker.to_b58(),
                    old_amount: old_amount.to_string(),
                    new_amount: new_amount.to_string(),
                }
            }
            LedgerEvent::PositionRemoved { staker, amount } => RpcEvent::PositionRemoved {
                staker: staker.to_b58(),
                amount: amount.to_string(),
            },
            LedgerEvent::RewardsSet { setter, epoch, asset_amount, secondary_amount } => {
                RpcEvent::RewardsSet {
                    setter: setter.to_b58(),
                    epoch: *epoch,
                    asset_amount: asset_amount.to_string(),
                    secondary_amount: secondary_amount.to_string(),
                }
            }
            LedgerEvent::TokenDeposited { token, from, amount } => RpcEvent::TokenDeposited {
                token: token.to_string(),
                from: from.to_b58(),
                amount: amount.to_string(),
            },
            LedgerEvent::UnclaimedRewardsUpdated {
                staker,
                old_asset,
                old_secondary,
                new_asset,
                new_secondary,
                from_epoch,
                to_epoch,
            } => RpcEvent::UnclaimedRewardsUpdated {
                staker: staker.to_b58(),
                old_asset: old_asset.to_string(),
                old_secondary: old_secondary.to_string(),
                new_asset: new_asset.to_string(),
                new_secondary: new_secondary.to_string(),
                from_epoch: *from_epoch,
                to_epoch: *to_epoch,
            },
            LedgerEvent::RewardsClaimed { staker, recipient, asset_amount, secondary_amount } => {
                RpcEvent::RewardsClaimed {
                    staker: staker.to_b58(),
                    recipient: recipient.to_b58(),
                    asset_amount: asset_amount.to_string(),
                    secondary_amount: secondary_amount.to_string(),
                }
            }
            LedgerEvent::TokenWithdrawn { token, to, amount } => RpcEvent::TokenWithdrawn {
                token: token.to_string(),
                to: to.to_b58(),
                amount: amount.to_string(),
            },
            LedgerEvent::StuckRewardsAvoided { staker, epoch, cleared_min, cleared_last } => {
                RpcEvent::StuckRewardsAvoided {
                    staker: staker.to_b58(),
                    epoch: *epoch,
                    cleared_min: cleared_min.to_string(),
                    cleared_last: cleared_last.to_string(),
                }
            }
        }
    }
}
