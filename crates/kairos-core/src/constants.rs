/// ─── Kairos Protocol Constants ──────────────────────────────────────────────
///
/// Epoch-indexed staking ledger with pro-rata reward distribution.
///
/// The reward weight of a staker for an epoch is the *minimum* stake held
/// during that epoch, so a last-moment deposit cannot capture a share of a
/// reward it did not sit through.

// ── Epochs ───────────────────────────────────────────────────────────────────

/// Default epoch duration: one week. Deployments override via init params.
pub const DEFAULT_EPOCH_SIZE_SECS: i64 = 7 * 24 * 3600;

// ── RPC ──────────────────────────────────────────────────────────────────────

/// JSON-RPC method namespace (methods appear as `kairos_<name>`).
pub const RPC_NAMESPACE: &str = "kairos";
