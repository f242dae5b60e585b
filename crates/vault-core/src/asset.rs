//! Asset class, currency and holding identification types.
//!
//! A balance on an exchange is addressed by four segments:
//! exchange, account, asset class and currency. `HoldingKey` carries
//! all four for diagnostics and error context.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Asset class a balance is held under (spot wallet, margin wallet, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Asset {
    Spot,
    Margin,
    CrossMargin,
    Futures,
    PerpetualSwap,
    Options,
}

impl Asset {
    /// Every supported asset class.
    pub const ALL: [Asset; 6] = [
        Asset::Spot,
        Asset::Margin,
        Asset::CrossMargin,
        Asset::Futures,
        Asset::PerpetualSwap,
        Asset::Options,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Asset::Spot => "spot",
            Asset::Margin => "margin",
            Asset::CrossMargin => "cross_margin",
            Asset::Futures => "futures",
            Asset::PerpetualSwap => "perpetual_swap",
            Asset::Options => "options",
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Asset {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spot" => Ok(Asset::Spot),
            "margin" => Ok(Asset::Margin),
            "cross_margin" | "crossmargin" => Ok(Asset::CrossMargin),
            "futures" => Ok(Asset::Futures),
            "perpetual_swap" | "perpetualswap" | "perp" => Ok(Asset::PerpetualSwap),
            "options" => Ok(Asset::Options),
            "" => Err(CoreError::UnsupportedAsset("<empty>".to_string())),
            other => Err(CoreError::UnsupportedAsset(other.to_string())),
        }
    }
}

/// Currency code (e.g., "BTC", "USDT").
///
/// Codes are trimmed and uppercased on construction. An empty code is
/// representable so that callers can be told about it explicitly.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Currency {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Currency {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<Currency> for String {
    fn from(c: Currency) -> Self {
        c.0
    }
}

/// Full identity of one balance cell.
///
/// Format: `{exchange}/{account}/{asset}/{currency}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HoldingKey {
    pub exchange: String,
    pub account: String,
    pub asset: Asset,
    pub currency: Currency,
}

impl HoldingKey {
    pub fn new(
        exchange: impl Into<String>,
        account: impl Into<String>,
        asset: Asset,
        currency: Currency,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            account: account.into(),
            asset,
            currency,
        }
    }
}

impl fmt::Display for HoldingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.exchange, self.account, self.asset, self.currency
        )
    }
}
