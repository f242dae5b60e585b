//! Exchange holdings ledger.
//!
//! Tracks, per exchange, account, asset class and currency, how much of an
//! exchange-reported balance is free, locked by open orders, pending
//! exchange confirmation, or claimed by a strategy that is about to place
//! an order.
//!
//! - [`Holdings`]: per-exchange registry fed by balance snapshots
//! - [`Holding`]: one balance cell with its claims and waiting queue
//! - [`Claim`]: a reservation against a holding
//! - [`Waiting`]: a queued request for a future claim
//!
//! # Example
//!
//! ```
//! use rust_decimal::Decimal;
//! use vault_core::{Amount, Asset, Currency};
//! use vault_holdings::{BalanceSnapshot, CurrencySnapshot, Holdings};
//!
//! let holdings = Holdings::new("binance");
//! holdings.load_account("main");
//!
//! let usdt = Currency::new("USDT");
//! let mut snapshot = CurrencySnapshot::new();
//! snapshot.insert(
//!     usdt.clone(),
//!     BalanceSnapshot::new(Amount::new(Decimal::from(100)), Amount::ZERO),
//! );
//! holdings.load_holdings("main", Asset::Spot, &snapshot).unwrap();
//!
//! let claim = holdings
//!     .claim("main", Asset::Spot, &usdt, Amount::new(Decimal::from(40)), true)
//!     .unwrap();
//! claim.release_to_pending().unwrap();
//! ```

pub mod balance;
pub mod claim;
pub mod config;
pub mod error;
pub mod holding;
pub mod observer;
pub mod registry;
pub mod waiting;

pub use balance::{
    snapshot_from_json, snapshot_from_raw, BalanceSnapshot, CurrencySnapshot, RawBalanceEntry,
};
pub use claim::Claim;
pub use config::HoldingsConfig;
pub use error::{HoldingsError, HoldingsResult};
pub use holding::{Holding, HoldingSnapshot};
pub use observer::{HoldingsObserver, NoopObserver};
pub use registry::Holdings;
pub use waiting::Waiting;
