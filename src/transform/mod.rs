//! The reconciliation core.
//!
//! Responsibilities:
//!
//! - collapse intraday observations to daily medians (`aggregate`)
//! - expand keys x days into a dense, ordered grid (`grid`)
//! - forward-fill each series from carry-over and observations (`fill`)
//! - trim to the target month and fingerprint rows (`assemble`, `fingerprint`)

pub mod aggregate;
pub mod assemble;
pub mod fill;
pub mod fingerprint;
pub mod grid;

pub use aggregate::*;
pub use assemble::*;
pub use fill::*;
pub use fingerprint::*;
pub use grid::*;
