//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` and converts
//! loosely-typed outside input into domain requests.
//!
//! Adapter categories:
//! - `ledger`: `LedgerService` implementations (in-memory simulation)
//! - `options`: SDK-style JSON options objects to typed requests

pub mod ledger;
pub mod options;
