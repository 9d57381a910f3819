//! Input/output helpers.
//!
//! - monthly CSV ingest + validation (`ingest`)
//! - load-ready record export (`export`)
//! - run-state JSON read/write (`state`)

pub mod export;
pub mod ingest;
pub mod state;

pub use export::*;
pub use ingest::*;
pub use state::*;
