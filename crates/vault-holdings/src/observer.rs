//! Notification hook for balance feed events.
//!
//! The registry does not broadcast on its own. Embedders that want to fan
//! out "holdings loaded" events (to a pub/sub bus, a dashboard, ...) plug in
//! an observer; the default does nothing.

use vault_core::Asset;

/// Receives registry-level notifications.
///
/// Called synchronously after the registry lock has been released, so
/// implementations may query the registry but should return quickly.
pub trait HoldingsObserver: Send + Sync {
    /// A balance snapshot for one account/asset has been applied.
    fn holdings_loaded(&self, exchange: &str, account: &str, asset: Asset);
}

/// Observer that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl HoldingsObserver for NoopObserver {
    fn holdings_loaded(&self, _exchange: &str, _account: &str, _asset: Asset) {}
}
