//! Shared types and models for the restaurant inventory platform
//!
//! This crate holds the domain models and the pure parts of the stock
//! reconciliation engine: consumption calculation, urgency classification,
//! usage statistics and ledger replay. It has no I/O.

pub mod consumption;
pub mod ledger;
pub mod models;
pub mod types;
pub mod validation;

pub use consumption::*;
pub use ledger::*;
pub use models::*;
pub use types::*;
pub use validation::*;
