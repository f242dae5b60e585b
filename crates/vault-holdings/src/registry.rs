//! Per-exchange registry of holdings.
//!
//! Cells are addressed by account, then asset class, then currency. Two
//! lookup styles coexist:
//!
//! - lazy (`get_holding`, `load_holdings`): missing maps and cells are created
//! - strict (`adjust_by_balance`, `claim`): a missing segment is an error
//!
//! The registry `RwLock` only guards the map topology and the account list.
//! It is always released before a holding's own mutex is taken.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use vault_core::{Amount, Asset, Currency, HoldingKey};

use crate::balance::{BalanceSnapshot, CurrencySnapshot};
use crate::claim::Claim;
use crate::config::HoldingsConfig;
use crate::error::{HoldingsError, HoldingsResult};
use crate::holding::{Holding, HoldingSnapshot};
use crate::observer::{HoldingsObserver, NoopObserver};

type CurrencyMap = HashMap<Currency, Arc<Holding>>;
type AssetMap = HashMap<Asset, CurrencyMap>;
type FundMap = HashMap<String, AssetMap>;

/// Trim and lowercase an account name.
fn normalize_account(account: &str) -> HoldingsResult<String> {
    let account = account.trim().to_lowercase();
    if account.is_empty() {
        return Err(HoldingsError::AccountNameUnset);
    }
    Ok(account)
}

/// Holdings for every account on one exchange.
pub struct Holdings {
    exchange: String,
    /// Empty means every asset class is accepted.
    supported_assets: Vec<Asset>,
    funds: RwLock<FundMap>,
    accounts: RwLock<Vec<String>>,
    observer: Arc<dyn HoldingsObserver>,
}

impl Holdings {
    pub fn new(exchange: impl Into<String>) -> Self {
        Self {
            exchange: exchange.into(),
            supported_assets: Vec::new(),
            funds: RwLock::new(FundMap::new()),
            accounts: RwLock::new(Vec::new()),
            observer: Arc::new(NoopObserver),
        }
    }

    /// Build a registry from configuration and register its accounts.
    pub fn from_config(config: &HoldingsConfig) -> HoldingsResult<Self> {
        config.validate()?;
        let holdings = Self::new(config.exchange.trim())
            .with_supported_assets(config.supported_assets.clone());
        for account in &config.accounts {
            holdings.load_account(account);
        }
        info!(
            exchange = %holdings.exchange,
            accounts = config.accounts.len(),
            supported_assets = ?holdings.supported_assets,
            "Holdings registry initialized"
        );
        Ok(holdings)
    }

    pub fn with_observer(mut self, observer: Arc<dyn HoldingsObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_supported_assets(mut self, assets: Vec<Asset>) -> Self {
        self.supported_assets = assets;
        self
    }

    pub fn exchange_name(&self) -> &str {
        &self.exchange
    }

    // ------------------------------------------------------------------------
    // Accounts
    // ------------------------------------------------------------------------

    /// Registered account names, in registration order.
    pub fn get_accounts(&self) -> HoldingsResult<Vec<String>> {
        let accounts = self.accounts.read();
        if accounts.is_empty() {
            return Err(HoldingsError::AccountsNotLoaded {
                exchange: self.exchange.clone(),
            });
        }
        Ok(accounts.clone())
    }

    pub fn account_valid(&self, account: &str) -> HoldingsResult<()> {
        let account = normalize_account(account)?;
        if self.accounts.read().contains(&account) {
            Ok(())
        } else {
            Err(HoldingsError::AccountNotFound {
                exchange: self.exchange.clone(),
                account,
            })
        }
    }

    /// Register an account. Registering twice is a no-op.
    pub fn load_account(&self, account: &str) {
        let account = match normalize_account(account) {
            Ok(account) => account,
            Err(_) => {
                warn!(exchange = %self.exchange, "Ignoring empty account name");
                return;
            }
        };

        let mut accounts = self.accounts.write();
        if !accounts.contains(&account) {
            debug!(exchange = %self.exchange, account = %account, "Account registered");
            accounts.push(account);
        }
    }

    // ------------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------------

    fn check_asset(&self, asset: Asset) -> HoldingsResult<()> {
        if self.supported_assets.is_empty() || self.supported_assets.contains(&asset) {
            Ok(())
        } else {
            Err(HoldingsError::AssetNotSupported(asset))
        }
    }

    fn check_currency(currency: &Currency) -> HoldingsResult<()> {
        if currency.is_empty() {
            return Err(HoldingsError::CurrencyEmpty);
        }
        Ok(())
    }

    fn key(&self, account: &str, asset: Asset, currency: &Currency) -> HoldingKey {
        HoldingKey::new(self.exchange.as_str(), account, asset, currency.clone())
    }

    /// Fetch a holding, creating it (and any missing parent maps) if needed.
    pub fn get_holding(
        &self,
        account: &str,
        asset: Asset,
        currency: &Currency,
    ) -> HoldingsResult<Arc<Holding>> {
        let account = normalize_account(account)?;
        self.check_asset(asset)?;
        Self::check_currency(currency)?;

        if let Some(holding) = self
            .funds
            .read()
            .get(&account)
            .and_then(|assets| assets.get(&asset))
            .and_then(|currencies| currencies.get(currency))
        {
            return Ok(Arc::clone(holding));
        }

        let key = self.key(&account, asset, currency);
        let mut funds = self.funds.write();
        let holding = funds
            .entry(account)
            .or_default()
            .entry(asset)
            .or_default()
            .entry(currency.clone())
            .or_insert_with(|| Holding::new(key));
        Ok(Arc::clone(holding))
    }

    /// Fetch an existing holding without creating anything.
    fn find_holding(
        &self,
        account: &str,
        asset: Asset,
        currency: &Currency,
    ) -> HoldingsResult<Arc<Holding>> {
        let funds = self.funds.read();
        let assets = funds
            .get(account)
            .ok_or_else(|| HoldingsError::AccountNotFound {
                exchange: self.exchange.clone(),
                account: account.to_string(),
            })?;
        let currencies = assets
            .get(&asset)
            .ok_or_else(|| HoldingsError::AssetTypeNotFound {
                exchange: self.exchange.clone(),
                account: account.to_string(),
                asset,
            })?;
        currencies
            .get(currency)
            .map(Arc::clone)
            .ok_or_else(|| HoldingsError::CurrencyItemNotFound {
                exchange: self.exchange.clone(),
                account: account.to_string(),
                asset,
                currency: currency.clone(),
            })
    }

    // ------------------------------------------------------------------------
    // Balance feed
    // ------------------------------------------------------------------------

    /// Apply a full balance snapshot for one account and asset class.
    ///
    /// New currencies are seeded with `free = total - locked`; existing ones
    /// are reconciled. Currencies held locally but missing from the snapshot
    /// are driven to zero.
    pub fn load_holdings(
        &self,
        account: &str,
        asset: Asset,
        snapshot: &CurrencySnapshot,
    ) -> HoldingsResult<()> {
        let account = normalize_account(account)?;
        self.check_asset(asset)?;
        for (currency, balance) in snapshot {
            Self::check_currency(currency)?;
            balance.validate(currency)?;
        }

        let mut reconcile: Vec<(Arc<Holding>, BalanceSnapshot)> = Vec::new();
        let mut created = 0usize;
        {
            let mut funds = self.funds.write();
            let currencies = funds
                .entry(account.clone())
                .or_default()
                .entry(asset)
                .or_default();

            for (currency, balance) in snapshot {
                match currencies.get(currency) {
                    Some(holding) => reconcile.push((Arc::clone(holding), *balance)),
                    None => {
                        let key = self.key(&account, asset, currency);
                        currencies.insert(
                            currency.clone(),
                            Holding::with_balance(key, balance.total, balance.locked),
                        );
                        created += 1;
                    }
                }
            }

            for (currency, holding) in currencies.iter() {
                if !snapshot.contains_key(currency) {
                    reconcile.push((Arc::clone(holding), BalanceSnapshot::default()));
                }
            }
        }

        for (holding, balance) in &reconcile {
            holding.set_amounts(balance.total, balance.locked);
        }

        debug!(
            exchange = %self.exchange,
            account = %account,
            asset = %asset,
            created,
            reconciled = reconcile.len(),
            "Holdings loaded"
        );
        self.observer
            .holdings_loaded(&self.exchange, &account, asset);
        Ok(())
    }

    /// Apply a balance change to an existing holding.
    pub fn adjust_by_balance(
        &self,
        account: &str,
        asset: Asset,
        currency: &Currency,
        amount: Amount,
    ) -> HoldingsResult<()> {
        let account = normalize_account(account)?;
        self.check_asset(asset)?;
        Self::check_currency(currency)?;
        if amount.is_zero() {
            return Err(HoldingsError::AmountCannotBeZero);
        }

        self.find_holding(&account, asset, currency)?
            .adjust_by_balance(amount)
    }

    // ------------------------------------------------------------------------
    // Strategy side
    // ------------------------------------------------------------------------

    /// Claim funds from an existing holding of a registered account.
    pub fn claim(
        &self,
        account: &str,
        asset: Asset,
        currency: &Currency,
        amount: Amount,
        total_required: bool,
    ) -> HoldingsResult<Claim> {
        if !amount.is_positive() {
            return Err(HoldingsError::AmountMustBePositive(amount));
        }
        let account = normalize_account(account)?;
        self.account_valid(&account)?;
        self.check_asset(asset)?;
        Self::check_currency(currency)?;

        self.find_holding(&account, asset, currency)?
            .claim(amount, total_required)
    }

    // ------------------------------------------------------------------------
    // Reporting
    // ------------------------------------------------------------------------

    /// The registry itself, once any holding has been created.
    pub fn get_holdings(&self) -> HoldingsResult<&Self> {
        if self.funds.read().is_empty() {
            return Err(HoldingsError::NoHoldingsLoaded {
                exchange: self.exchange.clone(),
            });
        }
        Ok(self)
    }

    /// Point-in-time copy of every holding, ordered by key.
    pub fn snapshot(&self) -> Vec<HoldingSnapshot> {
        let holdings: Vec<Arc<Holding>> = self
            .funds
            .read()
            .values()
            .flat_map(|assets| assets.values())
            .flat_map(|currencies| currencies.values())
            .map(Arc::clone)
            .collect();

        let mut snapshots: Vec<HoldingSnapshot> =
            holdings.iter().map(|holding| holding.snapshot()).collect();
        snapshots.sort_by(|a, b| a.key.cmp(&b.key));
        snapshots
    }
}

impl std::fmt::Debug for Holdings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Holdings")
            .field("exchange", &self.exchange)
            .field("supported_assets", &self.supported_assets)
            .field("accounts", &*self.accounts.read())
            .finish_non_exhaustive()
    }
}
