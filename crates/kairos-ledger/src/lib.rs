//! kairos-ledger
//!
//! The epoch-indexed staking ledger: persistent storage (`LedgerDb`), the
//! founding parameters (`InitParams`), and the single serializing engine
//! (`LedgerEngine`) through which every mutation flows.

pub mod db;
pub mod engine;
pub mod params;

pub use db::LedgerDb;
pub use engine::LedgerEngine;
pub use params::{init_ledger, InitParams};
