//! Registry fixtures.

#![allow(dead_code)]

use rust_decimal::Decimal;
use vault_core::{Amount, Asset, Currency};
use vault_holdings::{BalanceSnapshot, CurrencySnapshot, Holdings};

pub const EXCHANGE: &str = "test_exchange";
pub const ACCOUNT: &str = "main";

pub fn amt(value: Decimal) -> Amount {
    Amount::new(value)
}

/// Build a snapshot from `(currency, total, locked)` triples.
pub fn snapshot(entries: &[(&str, Decimal, Decimal)]) -> CurrencySnapshot {
    entries
        .iter()
        .map(|(code, total, locked)| {
            (
                Currency::new(code),
                BalanceSnapshot::new(amt(*total), amt(*locked)),
            )
        })
        .collect()
}

/// Registry with `ACCOUNT` registered and one spot snapshot loaded.
pub fn funded_registry(entries: &[(&str, Decimal, Decimal)]) -> Holdings {
    let holdings = Holdings::new(EXCHANGE);
    holdings.load_account(ACCOUNT);
    holdings
        .load_holdings(ACCOUNT, Asset::Spot, &snapshot(entries))
        .expect("snapshot loads");
    holdings
}
