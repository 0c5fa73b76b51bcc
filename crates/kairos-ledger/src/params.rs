//! Ledger initialization — the founding state, written exactly once.
//!
//! The epoch clock origin and duration are immutable for the lifetime of the
//! ledger: every per-epoch snapshot ever taken is indexed against them.
//! Authorization is a flat role list supplied here; role *wiring* (how those
//! identities are governed) belongs to the collaborator system.

use serde::{Deserialize, Serialize};
use tracing::info;

use kairos_core::error::LedgerError;
use kairos_core::ledger::GlobalLedger;
use kairos_core::types::{AccountId, Timestamp};

use crate::db::LedgerDb;

/// Founding parameters, persisted in the DB meta tree on first run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InitParams {
    /// Epoch 1 opens at this instant. Operations dated earlier fail.
    pub init_timestamp: Timestamp,
    /// Epoch duration in seconds; must be > 0.
    pub epoch_size_secs: i64,
    /// Sole identity authorized to call `set_rewards`.
    pub rewards_setter: AccountId,
    /// Identities holding the delegated-claim authorization.
    pub delegated_claimers: Vec<AccountId>,
}

/// Write the founding state into an empty `LedgerDb`.
///
/// Fails with `AlreadyInitialized` if params are present: the epoch origin
/// can never be rewritten without invalidating every recorded snapshot.
pub fn init_ledger(db: &LedgerDb, params: &InitParams) -> Result<(), LedgerError> {
    if params.epoch_size_secs <= 0 {
        return Err(LedgerError::InvalidEpochSize);
    }
    if db.get_params()?.is_some() {
        return Err(LedgerError::AlreadyInitialized);
    }

    db.put_params(params)?;
    db.put_global(&GlobalLedger::default())?;
    db.flush()?;

    info!(
        init_timestamp = params.init_timestamp,
        epoch_size_secs = params.epoch_size_secs,
        rewards_setter = %params.rewards_setter,
        delegated_claimers = params.delegated_claimers.len(),
        "ledger initialized"
    );
    Ok(())
}
