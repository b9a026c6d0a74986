//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces.
//!
//! Use cases:
//! - `TradePlanner`: Quote, limit and submit buys and sells

pub mod trade_planner;

pub use trade_planner::{BuyOrder, SellOrder, TradePlanner};
