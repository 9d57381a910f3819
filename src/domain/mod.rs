//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the station/fuel identity (`StationFuelKey`) and raw `Observation`s
//! - intermediate grid cells (`GridCell`, `ReconciledCell`, `FilledCell`)
//! - load-ready output rows (`PriceRecord`)
//! - the immutable per-run `RunContext`

pub mod context;
pub mod types;

pub use context::*;
pub use types::*;
