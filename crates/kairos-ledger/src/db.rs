use std::path::Path;

use kairos_core::error::LedgerError;
use kairos_core::ledger::{GlobalLedger, RewardRecord, RewardToken, StakerLedger};
use kairos_core::types::{AccountId, Amount, Epoch};

use crate::params::InitParams;

/// Persistent ledger database backed by sled (pure-Rust, no C dependencies).
///
/// Named trees (analogous to column families):
///   stakers  — AccountId bytes      → bincode(StakerLedger)
///   rewards  — Epoch big-endian u64 → bincode(RewardRecord)
///   custody  — token name bytes     → bincode(Amount)
///   meta     — utf8 key bytes       → bincode (params, global ledger)
pub struct LedgerDb {
    _db: sled::Db,
    stakers: sled::Tree,
    rewards: sled::Tree,
    custody: sled::Tree,
    meta: sled::Tree,
}

const META_PARAMS: &str = "init_params";
const META_GLOBAL: &str = "global_ledger";

fn storage_err(e: sled::Error) -> LedgerError {
    LedgerError::Storage(e.to_string())
}

fn ser_err(e: bincode::Error) -> LedgerError {
    LedgerError::Serialization(e.to_string())
}

impl LedgerDb {
    /// Open or create the ledger database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LedgerError> {
        let db = sled::open(path).map_err(storage_err)?;
        let stakers = db.open_tree("stakers").map_err(storage_err)?;
        let rewards = db.open_tree("rewards").map_err(storage_err)?;
        let custody = db.open_tree("custody").map_err(storage_err)?;
        let meta = db.open_tree("meta").map_err(storage_err)?;
        Ok(Self { _db: db, stakers, rewards, custody, meta })
    }

    // ── Stakers ──────────────────────────────────────────────────────────────

    pub fn get_staker(&self, id: &AccountId) -> Result<Option<StakerLedger>, LedgerError> {
        match self.stakers.get(id.as_bytes()).map_err(storage_err)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes).map_err(ser_err)?)),
            None => Ok(None),
        }
    }

    pub fn put_staker(&self, staker: &StakerLedger) -> Result<(), LedgerError> {
        let bytes = bincode::serialize(staker).map_err(ser_err)?;
        self.stakers
            .insert(staker.staker.as_bytes(), bytes)
            .map_err(storage_err)?;
        Ok(())
    }

    pub fn staker_exists(&self, id: &AccountId) -> bool {
        self.stakers.contains_key(id.as_bytes()).unwrap_or(false)
    }

    // ── Reward records ───────────────────────────────────────────────────────

    pub fn get_reward(&self, epoch: Epoch) -> Result<Option<RewardRecord>, LedgerError> {
        match self.rewards.get(epoch.to_be_bytes()).map_err(storage_err)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes).map_err(ser_err)?)),
            None => Ok(None),
        }
    }

    pub fn put_reward(&self, epoch: Epoch, record: &RewardRecord) -> Result<(), LedgerError> {
        let bytes = bincode::serialize(record).map_err(ser_err)?;
        self.rewards
            .insert(epoch.to_be_bytes(), bytes)
            .map_err(storage_err)?;
        Ok(())
    }

    // ── Custody ──────────────────────────────────────────────────────────────

    /// Engine-side balance of one reward token; absent means zero.
    pub fn get_custody(&self, token: RewardToken) -> Result<Amount, LedgerError> {
        match self
            .custody
            .get(token.to_string().as_bytes())
            .map_err(storage_err)?
        {
            Some(bytes) => Ok(bincode::deserialize(&bytes).map_err(ser_err)?),
            None => Ok(0),
        }
    }

    pub fn put_custody(&self, token: RewardToken, amount: Amount) -> Result<(), LedgerError> {
        let bytes = bincode::serialize(&amount).map_err(ser_err)?;
        self.custody
            .insert(token.to_string().as_bytes(), bytes)
            .map_err(storage_err)?;
        Ok(())
    }

    // ── Meta ─────────────────────────────────────────────────────────────────

    pub fn get_params(&self) -> Result<Option<InitParams>, LedgerError> {
        match self.meta.get(META_PARAMS.as_bytes()).map_err(storage_err)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes).map_err(ser_err)?)),
            None => Ok(None),
        }
    }

    pub fn put_params(&self, params: &InitParams) -> Result<(), LedgerError> {
        let bytes = bincode::serialize(params).map_err(ser_err)?;
        self.meta
            .insert(META_PARAMS.as_bytes(), bytes)
            .map_err(storage_err)?;
        Ok(())
    }

    pub fn get_global(&self) -> Result<Option<GlobalLedger>, LedgerError> {
        match self.meta.get(META_GLOBAL.as_bytes()).map_err(storage_err)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes).map_err(ser_err)?)),
            None => Ok(None),
        }
    }

    pub fn put_global(&self, global: &GlobalLedger) -> Result<(), LedgerError> {
        let bytes = bincode::serialize(global).map_err(ser_err)?;
        self.meta
            .insert(META_GLOBAL.as_bytes(), bytes)
            .map_err(storage_err)?;
        Ok(())
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), LedgerError> {
        self._db.flush().map_err(storage_err)?;
        Ok(())
    }
}
