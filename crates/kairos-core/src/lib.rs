pub mod constants;
pub mod error;
pub mod events;
pub mod ledger;
pub mod types;

pub use constants::*;
pub use error::LedgerError;
pub use events::*;
pub use ledger::*;
pub use types::*;
