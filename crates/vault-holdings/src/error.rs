//! Holdings error types.
//!
//! Three families share one enum:
//! - input validation (caller mistake, safe to retry once fixed)
//! - domain/state (balance or claim bookkeeping refused the request)
//! - reconciliation (`InvalidHoldings`: needs a fresh exchange snapshot)

use thiserror::Error;
use vault_core::{Amount, Asset, ClaimId, CoreError, Currency, HoldingKey, WaitId};

#[derive(Debug, Error)]
pub enum HoldingsError {
    // === Input validation ===
    #[error("Account name unset")]
    AccountNameUnset,

    #[error("Asset not supported: {0}")]
    AssetNotSupported(Asset),

    #[error("Currency is empty")]
    CurrencyEmpty,

    #[error("Amount must be positive, got {0}")]
    AmountMustBePositive(Amount),

    #[error("Amount cannot be zero")]
    AmountCannotBeZero,

    #[error("Negative balance reported for {currency}: total {total}, locked {locked}")]
    NegativeBalance {
        currency: Currency,
        total: Amount,
        locked: Amount,
    },

    // === Registry lookups ===
    #[error("{exchange}: no accounts loaded")]
    AccountsNotLoaded { exchange: String },

    #[error("{exchange}: account not found: {account}")]
    AccountNotFound { exchange: String, account: String },

    #[error("{exchange}/{account}: asset type not found: {asset}")]
    AssetTypeNotFound {
        exchange: String,
        account: String,
        asset: Asset,
    },

    #[error("{exchange}/{account}/{asset}: currency item not found: {currency}")]
    CurrencyItemNotFound {
        exchange: String,
        account: String,
        asset: Asset,
        currency: Currency,
    },

    #[error("{exchange}: no holdings loaded")]
    NoHoldingsLoaded { exchange: String },

    // === Holding state ===
    #[error("{key}: no balance available")]
    NoBalance { key: HoldingKey },

    #[error("{key}: amount {requested} exceeds free balance {free}")]
    AmountExceedsHoldings {
        key: HoldingKey,
        requested: Amount,
        free: Amount,
    },

    #[error("{key}: unable to release claim {claim}")]
    UnableToReleaseClaim { key: HoldingKey, claim: ClaimId },

    #[error("{key}: unable to reduce claim {claim}")]
    UnableToReduceClaim { key: HoldingKey, claim: ClaimId },

    #[error("{key}: cannot wait on claim {claim} while it is still active")]
    CannotWait { key: HoldingKey, claim: ClaimId },

    #[error("{key}: cannot cancel wait {wait}, not queued")]
    CannotCancelWait { key: HoldingKey, wait: WaitId },

    // === Reconciliation ===
    #[error("{key}: invalid holdings, free balance is negative: {free}")]
    InvalidHoldings { key: HoldingKey, free: Amount },

    // === Ambient ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Balance parse error: {0}")]
    Parse(#[from] CoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type HoldingsResult<T> = Result<T, HoldingsError>;
