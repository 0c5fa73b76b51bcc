use jsonrpsee::core::RpcResult;
use jsonrpsee::proc_macros::rpc;

use crate::types::{
    RpcCustody, RpcEpochBounds, RpcEpochSnapshot, RpcEvent, RpcGlobalLedger, RpcLedgerInfo,
    RpcRewardRecord, RpcStakerLedger,
};

/// Kairos JSON-RPC 2.0 API definition.
///
/// All method names are prefixed with "kairos_" via `namespace = "kairos"`.
/// Amounts are decimal strings (u128 does not survive every JSON client).
/// Identities are base-58 encoded 32-byte account ids.
#[rpc(server, namespace = "kairos")]
pub trait KairosApi {
    // ── Operations ────────────────────────────────────────────────────────────

    /// Set a staker's absolute stake. Called by the balance-owning
    /// collaborator whenever the eligible balance changes. Returns the
    /// lifecycle events the update produced.
    #[method(name = "setStake")]
    async fn set_stake(&self, staker: String, amount: String) -> RpcResult<Vec<RpcEvent>>;

    /// Record a reward for a finalized epoch. Restricted to the rewards
    /// setter; epochs are strictly sequential and write-once.
    #[method(name = "setRewards")]
    async fn set_rewards(
        &self,
        caller: String,
        epoch: u64,
        asset_amount: String,
        secondary_amount: String,
    ) -> RpcResult<Vec<RpcEvent>>;

    /// Accrue every newly reward-bearing epoch into the staker's unclaimed
    /// balance. Callable by anyone.
    #[method(name = "updateUnclaimedRewards")]
    async fn update_unclaimed_rewards(&self, staker: String) -> RpcResult<Vec<RpcEvent>>;

    /// Pay out a staker's unclaimed rewards to the staker.
    #[method(name = "claimRewards")]
    async fn claim_rewards(&self, staker: String) -> RpcResult<Vec<RpcEvent>>;

    /// Delegated claim: an authorized caller claims for an opted-in staker
    /// and receives the tokens.
    #[method(name = "claimRewardsOnBehalfOf")]
    async fn claim_rewards_on_behalf_of(
        &self,
        caller: String,
        staker: String,
    ) -> RpcResult<Vec<RpcEvent>>;

    /// Roll a staker's epoch snapshots forward without changing the stake,
    /// so a large epoch gap can be amortized across calls.
    #[method(name = "updateStakerPreviousEpochs")]
    async fn update_staker_previous_epochs(
        &self,
        staker: String,
        until_epoch: Option<u64>,
    ) -> RpcResult<()>;

    /// Global analogue of `updateStakerPreviousEpochs`.
    #[method(name = "updateGlobalPreviousEpochs")]
    async fn update_global_previous_epochs(&self, until_epoch: u64) -> RpcResult<()>;

    /// Flip a staker's delegated-claim opt-in. Owned by the loan
    /// collaborator; the claim flow only reads it.
    #[method(name = "setAcceptsDelegatedClaims")]
    async fn set_accepts_delegated_claims(&self, staker: String, accepts: bool) -> RpcResult<()>;

    // ── Read accessors ────────────────────────────────────────────────────────

    /// Full ledger record for one staker, or null if never staked.
    #[method(name = "getStaker")]
    async fn get_staker(&self, staker: String) -> RpcResult<Option<RpcStakerLedger>>;

    /// The global aggregate ledger.
    #[method(name = "getGlobal")]
    async fn get_global(&self) -> RpcResult<RpcGlobalLedger>;

    /// Finalized (min, last) snapshot of one staker for one epoch, or null
    /// while the epoch is beyond the staker's catch-up horizon.
    #[method(name = "getStakerSnapshot")]
    async fn get_staker_snapshot(
        &self,
        staker: String,
        epoch: u64,
    ) -> RpcResult<Option<RpcEpochSnapshot>>;

    /// Finalized (min, last) global snapshot for one epoch.
    #[method(name = "getGlobalSnapshot")]
    async fn get_global_snapshot(&self, epoch: u64) -> RpcResult<Option<RpcEpochSnapshot>>;

    /// The reward recorded for an epoch, or null if none yet.
    #[method(name = "getRewardRecord")]
    async fn get_reward_record(&self, epoch: u64) -> RpcResult<Option<RpcRewardRecord>>;

    /// Engine-side reward token balances.
    #[method(name = "getCustody")]
    async fn get_custody(&self) -> RpcResult<RpcCustody>;

    /// The epoch containing the server's current wall-clock time.
    #[method(name = "getCurrentEpoch")]
    async fn get_current_epoch(&self) -> RpcResult<RpcEpochBounds>;

    /// Start and end timestamps of an epoch.
    #[method(name = "getEpochBounds")]
    async fn get_epoch_bounds(&self, epoch: u64) -> RpcResult<RpcEpochBounds>;

    /// Founding parameters and version information.
    #[method(name = "getLedgerInfo")]
    async fn get_ledger_info(&self) -> RpcResult<RpcLedgerInfo>;
}
