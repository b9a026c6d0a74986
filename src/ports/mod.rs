//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the usecases layer requires
//! from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `LedgerService`: Market state and trade execution

pub mod ledger;

pub use ledger::{LedgerService, TradeReceipt};
