//! kairos-rpc
//!
//! JSON-RPC 2.0 surface of the staking ledger.
//!
//! Namespace: "kairos"
//! Operations (collaborator-facing):
//!   kairos_setStake                   — absolute stake change for a staker
//!   kairos_setRewards                 — record a reward for a finalized epoch
//!   kairos_updateUnclaimedRewards     — accrue reward epochs for a staker
//!   kairos_claimRewards               — pay out a staker's unclaimed rewards
//!   kairos_claimRewardsOnBehalfOf     — delegated claim, pays the delegate
//!   kairos_updateStakerPreviousEpochs — amortized staker catch-up
//!   kairos_updateGlobalPreviousEpochs — amortized global catch-up
//!   kairos_setAcceptsDelegatedClaims  — loan-collaborator opt-in flag
//! Read accessors:
//!   kairos_getStaker, kairos_getGlobal, kairos_getStakerSnapshot,
//!   kairos_getGlobalSnapshot, kairos_getRewardRecord, kairos_getCustody,
//!   kairos_getCurrentEpoch, kairos_getEpochBounds, kairos_getLedgerInfo

pub mod api;
pub mod server;
pub mod types;

pub use server::{RpcServer, RpcServerState};
pub use types::{
    RpcCustody, RpcEpochBounds, RpcEpochSnapshot, RpcEvent, RpcGlobalLedger, RpcLedgerInfo,
    RpcRewardRecord, RpcStakerLedger,
};
