use std::net::SocketAddr;
use std::sync::Arc;

use jsonrpsee::core::{async_trait, RpcResult};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::ErrorObject;
use tracing::info;

use kairos_core::error::LedgerError;
use kairos_core::events::LedgerEvent;
use kairos_core::ledger::RewardToken;
use kairos_core::types::{AccountId, Amount, Timestamp};
use kairos_ledger::LedgerEngine;

use crate::api::KairosApiServer;
use crate::types::{
    RpcCustody, RpcEpochBounds, RpcEpochSnapshot, RpcEvent, RpcGlobalLedger, RpcLedgerInfo,
    RpcRewardRecord, RpcStakerLedger,
};

fn rpc_err(code: i32, msg: impl Into<String>) -> ErrorObject<'static> {
    ErrorObject::owned(code, msg.into(), None::<()>)
}

fn parse_account(s: &str) -> Result<AccountId, ErrorObject<'static>> {
    AccountId::from_b58(s).map_err(|e| rpc_err(-32602, e.to_string()))
}

fn parse_amount(s: &str) -> Result<Amount, ErrorObject<'static>> {
    s.parse::<Amount>()
        .map_err(|e| rpc_err(-32602, format!("invalid amount: {e}")))
}

fn engine_err(e: LedgerError) -> ErrorObject<'static> {
    rpc_err(-32603, e.to_string())
}

fn to_rpc_events(events: &[LedgerEvent]) -> Vec<RpcEvent> {
    events.iter().map(RpcEvent::from).collect()
}

/// Shared state passed to the RPC server.
pub struct RpcServerState {
    pub engine: Arc<LedgerEngine>,
}

impl RpcServerState {
    /// Wall-clock timestamp operations are dated with. The ledger itself
    /// never reads the clock.
    fn now(&self) -> Timestamp {
        chrono::Utc::now().timestamp()
    }
}

/// The RPC server implementation.
pub struct RpcServer {
    state: Arc<RpcServerState>,
}

impl RpcServer {
    pub fn new(state: Arc<RpcServerState>) -> Self {
        Self { state }
    }

    /// Start the JSON-RPC server on `addr`. Returns a handle to stop it.
    pub async fn start(self, addr: SocketAddr) -> anyhow::Result<ServerHandle> {
        let server = Server::builder().build(addr).await?;
        let module = self.into_rpc();
        let handle = server.start(module);
        info!(%addr, "RPC server started");
        Ok(handle)
    }
}

#[async_trait]
impl KairosApiServer for RpcServer {
    // ── Operations ────────────────────────────────────────────────────────────

    async fn set_stake(&self, staker: String, amount: String) -> RpcResult<Vec<RpcEvent>> {
        let staker = parse_account(&staker)?;
        let amount = parse_amount(&amount)?;
        let events = self
            .state
            .engine
            .set_stake(&staker, amount, self.state.now())
            .map_err(engine_err)?;
        Ok(to_rpc_events(&events))
    }

    async fn set_rewards(
        &self,
        caller: String,
        epoch: u64,
        asset_amount: String,
        secondary_amount: String,
    ) -> RpcResult<Vec<RpcEvent>> {
        let caller = parse_account(&caller)?;
        let asset = parse_amount(&asset_amount)?;
        let secondary = parse_amount(&secondary_amount)?;
        let events = self
            .state
            .engine
            .set_rewards(&caller, epoch, asset, secondary, self.state.now())
            .map_err(engine_err)?;
        Ok(to_rpc_events(&events))
    }

    async fn update_unclaimed_rewards(&self, staker: String) -> RpcResult<Vec<RpcEvent>> {
        let staker = parse_account(&staker)?;
        let events = self
            .state
            .engine
            .update_unclaimed_rewards(&staker, self.state.now())
            .map_err(engine_err)?;
        Ok(to_rpc_events(&events))
    }

    async fn claim_rewards(&self, staker: String) -> RpcResult<Vec<RpcEvent>> {
        let staker = parse_account(&staker)?;
        let events = self
            .state
            .engine
            .claim_rewards(&staker, self.state.now())
            .map_err(engine_err)?;
        Ok(to_rpc_events(&events))
    }

    async fn claim_rewards_on_behalf_of(
        &self,
        caller: String,
        staker: String,
    ) -> RpcResult<Vec<RpcEvent>> {
        let caller = parse_account(&caller)?;
        let staker = parse_account(&staker)?;
        let events = self
            .state
            .engine
            .claim_rewards_on_behalf_of(&caller, &staker, self.state.now())
            .map_err(engine_err)?;
        Ok(to_rpc_events(&events))
    }

    async fn update_staker_previous_epochs(
        &self,
        staker: String,
        until_epoch: Option<u64>,
    ) -> RpcResult<()> {
        let staker = parse_account(&staker)?;
        self.state
            .engine
            .update_staker_previous_epochs(&staker, until_epoch, self.state.now())
            .map_err(engine_err)
    }

    async fn update_global_previous_epochs(&self, until_epoch: u64) -> RpcResult<()> {
        self.state
            .engine
            .update_global_previous_epochs(until_epoch, self.state.now())
            .map_err(engine_err)
    }

    async fn set_accepts_delegated_claims(&self, staker: String, accepts: bool) -> RpcResult<()> {
        let staker = parse_account(&staker)?;
        self.state
            .engine
            .set_accepts_delegated_claims(&staker, accepts)
            .map_err(engine_err)
    }

    // ── Read accessors ────────────────────────────────────────────────────────

    async fn get_staker(&self, staker: String) -> RpcResult<Option<RpcStakerLedger>> {
        let staker = parse_account(&staker)?;
        let record = self.state.engine.staker(&staker).map_err(engine_err)?;
        Ok(record.as_ref().map(RpcStakerLedger::from))
    }

    async fn get_global(&self) -> RpcResult<RpcGlobalLedger> {
        let g = self.state.engine.global().map_err(engine_err)?;
        Ok(RpcGlobalLedger::from(&g))
    }

    async fn get_staker_snapshot(
        &self,
        staker: String,
        epoch: u64,
    ) -> RpcResult<Option<RpcEpochSnapshot>> {
        let staker = parse_account(&staker)?;
        let snap = self
            .state
            .engine
            .staker_snapshot(&staker, epoch)
            .map_err(engine_err)?;
        Ok(snap.map(|(min, last)| RpcEpochSnapshot::new(epoch, min, last)))
    }

    async fn get_global_snapshot(&self, epoch: u64) -> RpcResult<Option<RpcEpochSnapshot>> {
        let snap = self.state.engine.global_snapshot(epoch).map_err(engine_err)?;
        Ok(snap.map(|(min, last)| RpcEpochSnapshot::new(epoch, min, last)))
    }

    async fn get_reward_record(&self, epoch: u64) -> RpcResult<Option<RpcRewardRecord>> {
        let record = self.state.engine.reward_record(epoch).map_err(engine_err)?;
        Ok(record.map(|r| RpcRewardRecord::new(epoch, &r)))
    }

    async fn get_custody(&self) -> RpcResult<RpcCustody> {
        let asset = self
            .state
            .engine
            .custody(RewardToken::Asset)
            .map_err(engine_err)?;
        let secondary = self
            .state
            .engine
            .custody(RewardToken::Secondary)
            .map_err(engine_err)?;
        Ok(RpcCustody {
            asset: asset.to_string(),
            secondary: secondary.to_string(),
        })
    }

    async fn get_current_epoch(&self) -> RpcResult<RpcEpochBounds> {
        let clock = self.state.engine.clock();
        let epoch = clock.epoch_of(self.state.now());
        Ok(RpcEpochBounds {
            epoch,
            start: clock.epoch_start(epoch),
            end: clock.epoch_end(epoch),
        })
    }

    async fn get_epoch_bounds(&self, epoch: u64) -> RpcResult<RpcEpochBounds> {
        let clock = self.state.engine.clock();
        Ok(RpcEpochBounds {
            epoch,
            start: clock.epoch_start(epoch),
            end: clock.epoch_end(epoch),
        })
    }

    async fn get_ledger_info(&self) -> RpcResult<RpcLedgerInfo> {
        let params = self.state.engine.params();
        let clock = self.state.engine.clock();
        Ok(RpcLedgerInfo {
            init_timestamp: params.init_timestamp,
            epoch_size_secs: params.epoch_size_secs,
            current_epoch: clock.epoch_of(self.state.now()),
            rewards_setter: params.rewards_setter.to_b58(),
            delegated_claimers: params
                .delegated_claimers
                .iter()
                .map(|c| c.to_b58())
                .collect(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }
}
