//! Epoch clock: a pure mapping from timestamps to epoch indices.
//!
//! Epoch 1 opens at the ledger's immutable `init_timestamp`; each epoch lasts
//! exactly `epoch_size` seconds. Epoch 0 means "before initialization" and is
//! invalid for any staking or reward operation. The engine rejects it; the
//! clock just reports it.

use serde::{Deserialize, Serialize};

use kairos_core::types::{Epoch, Timestamp};

/// Total, pure mapping between timestamps and epochs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochClock {
    /// Immutable ledger origin; epoch 1 starts here.
    pub init_timestamp: Timestamp,
    /// Epoch duration in seconds, > 0 (enforced at ledger initialization).
    pub epoch_size: i64,
}

impl EpochClock {
    pub fn new(init_timestamp: Timestamp, epoch_size: i64) -> Self {
        Self {
            init_timestamp,
            epoch_size,
        }
    }

    /// The epoch containing `ts`: 0 before initialization, else
    /// `1 + (ts - init) / size`.
    pub fn epoch_of(&self, ts: Timestamp) -> Epoch {
        if ts < self.init_timestamp {
            return 0;
        }
        1 + ((ts - self.init_timestamp) / self.epoch_size) as Epoch
    }

    /// First second of `epoch`; 0 for epoch 0.
    pub fn epoch_start(&self, epoch: Epoch) -> Timestamp {
        if epoch == 0 {
            return 0;
        }
        self.init_timestamp + (epoch as i64 - 1) * self.epoch_size
    }

    /// Last (inclusive) second of `epoch`; 0 for epoch 0.
    pub fn epoch_end(&self, epoch: Epoch) -> Timestamp {
        if epoch == 0 {
            return 0;
        }
        self.epoch_start(epoch) + self.epoch_size - 1
    }
}
