//! In-memory state for the ordering assistant. Nothing here survives a
//! process restart.

pub mod catalog;
pub mod ledger;
pub mod session;

pub use catalog::{Catalog, Category};
pub use ledger::{CanceledOrder, OrderLedger};
pub use session::{SelectionMode, SessionState, SessionStore};
