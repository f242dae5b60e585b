//! Exchange balance snapshots.
//!
//! Balance feeds report a total and a locked (on-hold) amount per currency.
//! Many exchange APIs encode these as strings; `RawBalanceEntry` accepts that
//! shape and converts it into the decimal `BalanceSnapshot` consumed by
//! `Holdings::load_holdings`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use vault_core::{Amount, Currency};

use crate::error::{HoldingsError, HoldingsResult};

/// Exchange-reported totals for one currency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    /// Total balance held on the exchange.
    pub total: Amount,
    /// Portion committed to open orders.
    pub locked: Amount,
}

impl BalanceSnapshot {
    pub fn new(total: Amount, locked: Amount) -> Self {
        Self { total, locked }
    }

    /// Build from float inputs, as some feeds deliver them.
    pub fn from_f64(total: f64, locked: f64) -> HoldingsResult<Self> {
        Ok(Self {
            total: Amount::try_from_f64(total)?,
            locked: Amount::try_from_f64(locked)?,
        })
    }

    /// Free balance as the exchange sees it.
    pub fn free(&self) -> Amount {
        self.total - self.locked
    }

    /// Reject negative totals or locked amounts.
    pub fn validate(&self, currency: &Currency) -> HoldingsResult<()> {
        if self.total.is_negative() || self.locked.is_negative() {
            return Err(HoldingsError::NegativeBalance {
                currency: currency.clone(),
                total: self.total,
                locked: self.locked,
            });
        }
        Ok(())
    }
}

/// Per-currency snapshot for one account/asset.
pub type CurrencySnapshot = HashMap<Currency, BalanceSnapshot>;

/// Raw balance entry as delivered by an exchange REST/WS feed.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawBalanceEntry {
    /// Currency code (e.g., "USDC").
    #[serde(alias = "currency", alias = "asset")]
    pub coin: String,
    /// Total balance as string.
    pub total: String,
    /// Amount on hold for open orders, as string.
    #[serde(alias = "locked", default = "zero_string")]
    pub hold: String,
}

fn zero_string() -> String {
    "0".to_string()
}

impl RawBalanceEntry {
    /// Parse into a currency and validated snapshot.
    pub fn parse(&self) -> HoldingsResult<(Currency, BalanceSnapshot)> {
        let currency = Currency::new(&self.coin);
        if currency.is_empty() {
            return Err(HoldingsError::CurrencyEmpty);
        }
        let snapshot = BalanceSnapshot::new(self.total.parse()?, self.hold.parse()?);
        snapshot.validate(&currency)?;
        Ok((currency, snapshot))
    }
}

/// Build a currency snapshot from raw entries.
///
/// Entries reporting the same currency more than once (sub-wallets) are
/// summed.
pub fn snapshot_from_raw(entries: &[RawBalanceEntry]) -> HoldingsResult<CurrencySnapshot> {
    let mut snapshot = CurrencySnapshot::with_capacity(entries.len());
    for entry in entries {
        let (currency, balance) = entry.parse()?;
        let slot = snapshot.entry(currency).or_default();
        slot.total += balance.total;
        slot.locked += balance.locked;
    }
    Ok(snapshot)
}

/// Build a currency snapshot from a JSON array of raw entries.
pub fn snapshot_from_json(json: &str) -> HoldingsResult<CurrencySnapshot> {
    let entries: Vec<RawBalanceEntry> = serde_json::from_str(json)?;
    snapshot_from_raw(&entries)
}
