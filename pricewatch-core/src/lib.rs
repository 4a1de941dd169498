//! Core types for Pricewatch
//!
//! This crate defines the shared data structures used across the workspace:
//! price readings produced by upstream sources and the user-defined alerts
//! evaluated against them.

pub mod alert;
pub mod error;
pub mod price;

pub use alert::{Alert, AlertId, Direction, NewAlert};
pub use error::{PricewatchError, PricewatchResult};
pub use price::PriceReading;
