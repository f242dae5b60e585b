//! Core domain types for the exchange holdings ledger.
//!
//! This crate provides fundamental types used throughout the ledger:
//! - `Amount`: Precision-safe monetary amount
//! - `Asset`, `Currency`: Balance addressing
//! - `HoldingKey`: Exchange/account/asset/currency identity
//! - `ClaimId`, `WaitId`: Opaque reservation identifiers

pub mod asset;
pub mod decimal;
pub mod error;
pub mod ids;

pub use asset::{Asset, Currency, HoldingKey};
pub use decimal::Amount;
pub use error::{CoreError, Result};
pub use ids::{ClaimId, WaitId};
