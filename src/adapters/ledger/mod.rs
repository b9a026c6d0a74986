//! Ledger adapters.

pub mod simulated;

pub use simulated::SimulatedLedger;
