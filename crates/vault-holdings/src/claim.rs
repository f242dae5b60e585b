//! Claim handle returned to strategies.
//!
//! A claim reserves a fixed amount against one holding. It ends in exactly
//! one of three ways:
//!
//! - [`Claim::release`]: order cancelled, funds go back to free
//! - [`Claim::release_to_pending`]: order accepted, funds await the exchange
//! - [`Claim::release_and_reduce`]: funds left the account for good

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use vault_core::{Amount, ClaimId, HoldingKey};

use crate::error::HoldingsResult;
use crate::holding::Holding;
use crate::waiting::Waiting;

/// Reservation of a fixed amount against a [`Holding`].
///
/// The holding reference is a relation only: holdings live for the whole
/// process, so a claim can always reach its owner.
pub struct Claim {
    id: ClaimId,
    amount: Amount,
    created_at: DateTime<Utc>,
    holding: Arc<Holding>,
}

impl Claim {
    pub(crate) fn new(
        id: ClaimId,
        amount: Amount,
        created_at: DateTime<Utc>,
        holding: Arc<Holding>,
    ) -> Self {
        Self {
            id,
            amount,
            created_at,
            holding,
        }
    }

    pub fn id(&self) -> ClaimId {
        self.id
    }

    /// Amount actually reserved. May be less than requested for a
    /// partial claim.
    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn key(&self) -> &HoldingKey {
        self.holding.key()
    }

    pub fn holding(&self) -> &Arc<Holding> {
        &self.holding
    }

    /// Return the funds to the holding's free balance.
    pub fn release(&self) -> HoldingsResult<()> {
        self.holding.release(self)?;
        self.log_release("Claim released to free");
        Ok(())
    }

    /// Hand the funds to an order awaiting exchange confirmation.
    pub fn release_to_pending(&self) -> HoldingsResult<()> {
        self.holding.release_to_pending(self)?;
        self.log_release("Claim released to pending");
        Ok(())
    }

    /// Remove the claim and permanently reduce the holding's total.
    pub fn release_and_reduce(&self) -> HoldingsResult<()> {
        self.holding.reduce(self)?;
        self.log_release("Claim released and total reduced");
        Ok(())
    }

    /// Re-validate the holding before handing out the amount.
    ///
    /// A trade placed directly on the exchange can drive the holding's free
    /// balance negative after this claim was made; in that case the claim
    /// should not be acted upon.
    pub fn check_and_get_amount(&self) -> HoldingsResult<Amount> {
        self.holding.validate(self.amount)?;
        Ok(self.amount)
    }

    /// Whether the claim is still active.
    pub fn has_claim(&self) -> bool {
        self.holding.check_claim(self)
    }

    /// Queue a request for a new claim of this amount once it has been
    /// released.
    pub fn wait(&self) -> HoldingsResult<Waiting> {
        self.holding.claim_and_wait(self)
    }

    fn log_release(&self, message: &str) {
        let key = self.holding.key();
        info!(
            exchange = %key.exchange,
            account = %key.account,
            asset = %key.asset,
            currency = %key.currency,
            amount = %self.amount,
            claim = %self.id,
            "{}",
            message
        );
    }
}

impl fmt::Debug for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claim")
            .field("id", &self.id)
            .field("amount", &self.amount)
            .field("created_at", &self.created_at)
            .field("holding", self.holding.key())
            .finish()
    }
}
