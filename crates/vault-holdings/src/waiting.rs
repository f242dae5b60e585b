//! Queued requests for a future claim.
//!
//! A `Waiting` is created from a released claim and sits in its holding's
//! FIFO queue until enough free balance shows up. The new claim arrives on
//! the delivery channel; a closed channel without a claim means the wait
//! was cancelled.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use vault_core::{Amount, HoldingKey, WaitId};

use crate::claim::Claim;
use crate::error::HoldingsResult;
use crate::holding::Holding;

/// Pending request for a claim of `amount` against one holding.
pub struct Waiting {
    id: WaitId,
    amount: Amount,
    holding: Arc<Holding>,
    rx: mpsc::UnboundedReceiver<Claim>,
}

impl Waiting {
    pub(crate) fn new(
        id: WaitId,
        amount: Amount,
        holding: Arc<Holding>,
        rx: mpsc::UnboundedReceiver<Claim>,
    ) -> Self {
        Self {
            id,
            amount,
            holding,
            rx,
        }
    }

    pub fn id(&self) -> WaitId {
        self.id
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn key(&self) -> &HoldingKey {
        self.holding.key()
    }

    /// Wait for the claim.
    ///
    /// Returns `None` once the wait has been cancelled, or after the
    /// delivered claim has been received.
    pub async fn recv(&mut self) -> Option<Claim> {
        self.rx.recv().await
    }

    /// Take the claim if it has already been delivered.
    pub fn try_recv(&mut self) -> Option<Claim> {
        self.rx.try_recv().ok()
    }

    /// Block the current thread until the claim arrives or the wait is
    /// cancelled.
    ///
    /// # Panics
    ///
    /// Panics when called from within an asynchronous execution context.
    pub fn blocking_recv(&mut self) -> Option<Claim> {
        self.rx.blocking_recv()
    }

    /// Cancel the wait and close the delivery channel.
    ///
    /// A claim delivered but not yet received is released back to free.
    /// Fails with `CannotCancelWait` if there was nothing left to cancel
    /// (already cancelled, or the claim was already received).
    pub fn done(&mut self) -> HoldingsResult<()> {
        let cancelled = self.holding.cancel_wait(self.id);
        if self.return_undelivered() {
            return Ok(());
        }
        cancelled
    }

    /// Close the channel and release any claim still buffered in it.
    fn return_undelivered(&mut self) -> bool {
        self.rx.close();
        let mut returned = false;
        while let Ok(claim) = self.rx.try_recv() {
            returned = true;
            match claim.release() {
                Ok(()) => debug!(
                    holding = %self.holding.key(),
                    wait = %self.id,
                    claim = %claim.id(),
                    "Undelivered claim returned"
                ),
                Err(e) => warn!(
                    holding = %self.holding.key(),
                    wait = %self.id,
                    error = %e,
                    "Failed to return undelivered claim"
                ),
            }
        }
        returned
    }
}

impl Drop for Waiting {
    fn drop(&mut self) {
        // Not queued any more is the common case here.
        let _ = self.holding.cancel_wait(self.id);
        self.return_undelivered();
    }
}

impl fmt::Debug for Waiting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Waiting")
            .field("id", &self.id)
            .field("amount", &self.amount)
            .field("holding", self.holding.key())
            .finish()
    }
}
