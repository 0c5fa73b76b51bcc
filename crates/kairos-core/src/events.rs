use serde::{Deserialize, Serialize};

use crate::ledger::RewardToken;
use crate::types::{AccountId, Amount, Epoch};

/// Everything the ledger tells the outside world. Each engine operation
/// returns the events it produced, in order; the node logs them and the RPC
/// layer hands them back to the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// A position transitioned from nonexistent to existing.
    PositionCreated {
        staker: AccountId,
        amount: Amount,
    },

    /// An existing position changed size (both old and new nonzero).
    PositionUpdated {
        staker: AccountId,
        old_amount: Amount,
        new_amount: Amount,
    },

    /// A position was fully closed.
    PositionRemoved {
        staker: AccountId,
        amount: Amount,
    },

    /// A reward was recorded against a finalized epoch.
    RewardsSet {
        setter: AccountId,
        epoch: Epoch,
        asset_amount: Amount,
        secondary_amount: Amount,
    },

    /// Reward tokens entered engine custody.
    TokenDeposited {
        token: RewardToken,
        from: AccountId,
        amount: Amount,
    },

    /// Accrual moved reward-bearing epochs into a staker's unclaimed balance.
    UnclaimedRewardsUpdated {
        staker: AccountId,
        old_asset: Amount,
        old_secondary: Amount,
        new_asset: Amount,
        new_secondary: Amount,
        from_epoch: Epoch,
        to_epoch: Epoch,
    },

    /// Unclaimed rewards were paid out and folded into the cumulative total.
    RewardsClaimed {
        staker: AccountId,
        recipient: AccountId,
        asset_amount: Amount,
        secondary_amount: Amount,
    },

    /// Reward tokens left engine custody.
    TokenWithdrawn {
        token: RewardToken,
        to: AccountId,
        amount: Amount,
    },

    /// An exiting staker's weight was cleared from a finalized epoch that had
    /// no reward assigned yet, so the epoch carries no ghost claimant.
    StuckRewardsAvoided {
        staker: AccountId,
        epoch: Epoch,
        cleared_min: Amount,
        cleared_last: Amount,
    },
}
