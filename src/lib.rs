//! LMSR Calculator — Library Root
//!
//! Off-chain replica of an on-chain LMSR market maker's pricing math,
//! plus the trade-planning layer that turns quotes into bounded buy and
//! sell instructions. Re-exports all modules for integration tests and
//! benchmarks.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
