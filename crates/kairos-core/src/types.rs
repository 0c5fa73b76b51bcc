use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::LedgerError;

/// Token amount in base units. u128 leaves ample headroom above the u64
/// supplies of every token the collaborators custody.
pub type Amount = u128;

/// Unix timestamp (seconds, UTC).
pub type Timestamp = i64;

/// Epoch index. Epoch 0 means "before ledger initialization" and is invalid
/// for every staking and reward operation.
pub type Epoch = u64;

// ── AccountId ────────────────────────────────────────────────────────────────

/// 32-byte identity of a staker or collaborator, assigned by the external
/// identity layer. The ledger never interprets the bytes.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    pub fn from_bytes(b: [u8; 32]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Base-58 encoded string representation.
    pub fn to_b58(&self) -> String {
        bs58::encode(&self.0).into_string()
    }

    pub fn from_b58(s: &str) -> Result<Self, LedgerError> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| LedgerError::InvalidAccountId(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| LedgerError::InvalidAccountId("must decode to 32 bytes".into()))?;
        Ok(Self(arr))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_b58())
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", &self.to_b58()[..8])
    }
}
