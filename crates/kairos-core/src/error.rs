use thiserror::Error;

use crate::types::Epoch;

#[derive(Debug, Error)]
pub enum LedgerError {
    // ── Staking errors ───────────────────────────────────────────────────────
    #[error("staker does not exist: {0}")]
    StakerNotFound(String),

    #[error("operation before ledger initialization timestamp (epoch 0)")]
    BeforeInitialization,

    #[error("catch-up target epoch {until} exceeds current epoch {current}")]
    CatchUpBeyondCurrent { until: Epoch, current: Epoch },

    // ── Reward errors ────────────────────────────────────────────────────────
    #[error("rewards for epoch {epoch} cannot be set while current epoch is {current}: epoch not finalized")]
    RewardEpochNotFinalized { epoch: Epoch, current: Epoch },

    #[error("rewards must be set in strict sequence: expected epoch {expected}, got {got}")]
    RewardEpochOutOfSequence { expected: Epoch, got: Epoch },

    #[error("reward amounts must not both be zero")]
    ZeroRewardAmount,

    // ── Authorization errors ─────────────────────────────────────────────────
    #[error("caller {0} is not the rewards setter")]
    NotRewardsSetter(String),

    #[error("caller {0} does not hold the delegated-claim authorization")]
    NotDelegatedClaimer(String),

    #[error("staker {0} has not opted in to delegated claims")]
    DelegationNotAccepted(String),

    // ── Initialization ───────────────────────────────────────────────────────
    #[error("ledger already initialized")]
    AlreadyInitialized,

    #[error("ledger not initialized")]
    NotInitialized,

    #[error("epoch size must be greater than zero")]
    InvalidEpochSize,

    // ── Encoding / arithmetic ────────────────────────────────────────────────
    #[error("invalid account id: {0}")]
    InvalidAccountId(String),

    #[error("arithmetic overflow in reward computation")]
    ArithmeticOverflow,

    // ── Serialization / storage ──────────────────────────────────────────────
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),
}
