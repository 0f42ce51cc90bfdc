//! Domain models for restaurant inventory

mod analytics;
mod ingredient;
mod recipe;
mod sale;
mod stock;
mod usage;

pub use analytics::*;
pub use ingredient::*;
pub use recipe::*;
pub use sale::*;
pub use stock::*;
pub use usage::*;
