//! `fuel-series` library crate.
//!
//! The binary (`fuelseries`) is a thin wrapper around this library so that:
//!
//! - the reconciliation core is testable without a database or a process
//! - the store boundary can be swapped (`store::PriceStore`)

pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod io;
pub mod report;
pub mod store;
pub mod transform;
