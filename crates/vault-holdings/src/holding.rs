//! Balance cell for one account/asset/currency triple.
//!
//! A `Holding` keeps four exact-decimal amounts plus the active claims made
//! against it:
//!
//! - `total`: last exchange-reported total
//! - `locked`: exchange-reported amount committed to open orders
//! - `free`: locally computed amount available for new claims
//! - `pending`: claimed funds handed to an order whose effect the exchange
//!   has not reported yet
//!
//! After every mutating call `total == free + locked + pending + Σ claims`.
//! `free` may go negative when the exchange reports less than is locally
//! committed (e.g. a manual trade on the exchange UI); this is surfaced by
//! [`Holding::validate`] and never clamped.
//!
//! # Locking
//!
//! Each holding owns one `parking_lot::Mutex`. Every accessor and mutator
//! takes it for its whole duration, so operations on the same holding are
//! strictly serialized while unrelated holdings never contend.
//!
//! # Waiting queue
//!
//! Any operation that can raise `free` walks the waiting queue oldest-first
//! and satisfies each request whose amount now fits, sending a fresh
//! [`Claim`] down its delivery channel.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use vault_core::{Amount, ClaimId, HoldingKey, WaitId};
use vault_telemetry::Metrics;

use crate::claim::Claim;
use crate::error::{HoldingsError, HoldingsResult};
use crate::waiting::Waiting;

// ============================================================================
// HoldingSnapshot
// ============================================================================

/// Point-in-time copy of a holding's amounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldingSnapshot {
    pub key: HoldingKey,
    pub total: Amount,
    pub locked: Amount,
    pub free: Amount,
    pub pending: Amount,
    /// Sum of active claims.
    pub claimed: Amount,
    /// Number of active claims.
    pub active_claims: usize,
    /// Number of queued waiting requests.
    pub waiting: usize,
}

impl HoldingSnapshot {
    /// Whether `total == free + locked + pending + claimed`.
    pub fn is_balanced(&self) -> bool {
        self.total == self.free + self.locked + self.pending + self.claimed
    }
}

// ============================================================================
// HoldingState
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct ClaimRecord {
    amount: Amount,
    created_at: DateTime<Utc>,
}

#[derive(Debug)]
struct WaitEntry {
    id: WaitId,
    amount: Amount,
    tx: mpsc::UnboundedSender<Claim>,
}

#[derive(Debug, Default)]
struct HoldingState {
    total: Amount,
    locked: Amount,
    free: Amount,
    pending: Amount,
    claims: HashMap<ClaimId, ClaimRecord>,
    waiting: VecDeque<WaitEntry>,
}

impl HoldingState {
    fn claimed(&self) -> Amount {
        self.claims.values().map(|c| c.amount).sum()
    }
}

// ============================================================================
// Holding
// ============================================================================

/// Balance cell for one (account, asset, currency) triple.
///
/// Shared as `Arc<Holding>` between the registry, claims and waiting
/// requests. Cells are never removed from the registry once created.
#[derive(Debug)]
pub struct Holding {
    key: HoldingKey,
    state: Mutex<HoldingState>,
}

impl Holding {
    /// Create an empty holding.
    pub(crate) fn new(key: HoldingKey) -> Arc<Self> {
        Arc::new(Self {
            key,
            state: Mutex::new(HoldingState::default()),
        })
    }

    /// Create a holding seeded from a first exchange snapshot.
    pub(crate) fn with_balance(key: HoldingKey, total: Amount, locked: Amount) -> Arc<Self> {
        let holding = Arc::new(Self {
            key,
            state: Mutex::new(HoldingState {
                total,
                locked,
                free: total - locked,
                ..HoldingState::default()
            }),
        });
        holding.publish_free(holding.state.lock().free);
        holding
    }

    pub fn key(&self) -> &HoldingKey {
        &self.key
    }

    /// Last exchange-reported total.
    pub fn total(&self) -> Amount {
        self.state.lock().total
    }

    /// Exchange-reported amount committed to open orders.
    pub fn locked(&self) -> Amount {
        self.state.lock().locked
    }

    /// Claimed funds awaiting exchange confirmation.
    pub fn pending(&self) -> Amount {
        self.state.lock().pending
    }

    /// Amount available for new claims.
    pub fn free(&self) -> Amount {
        self.state.lock().free
    }

    /// Sum of all active claims.
    pub fn total_claims(&self) -> Amount {
        self.state.lock().claimed()
    }

    pub fn claims_len(&self) -> usize {
        self.state.lock().claims.len()
    }

    pub fn waiting_len(&self) -> usize {
        self.state.lock().waiting.len()
    }

    pub fn snapshot(&self) -> HoldingSnapshot {
        let state = self.state.lock();
        HoldingSnapshot {
            key: self.key.clone(),
            total: state.total,
            locked: state.locked,
            free: state.free,
            pending: state.pending,
            claimed: state.claimed(),
            active_claims: state.claims.len(),
            waiting: state.waiting.len(),
        }
    }

    /// Check the holding is usable.
    ///
    /// Fails with `InvalidHoldings` when `free` is negative. The amount is
    /// accepted for amount-specific checks; currently only the sign of
    /// `free` is inspected.
    pub fn validate(&self, _amount: Amount) -> HoldingsResult<()> {
        let free = self.state.lock().free;
        if free.is_negative() {
            return Err(HoldingsError::InvalidHoldings {
                key: self.key.clone(),
                free,
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Reconciliation
    // ------------------------------------------------------------------------

    /// Merge a fresh exchange-reported total/locked pair with local state.
    ///
    /// Locally known pending and claimed amounts take precedence over the
    /// raw exchange delta: an exchange may report a new total before an
    /// order's effect is fully reflected in `locked`.
    pub(crate) fn set_amounts(self: &Arc<Self>, total: Amount, locked: Amount) {
        let mut state = self.state.lock();

        let mut reported_free = total - locked;
        let claimed = state.claimed();

        if state.pending.is_positive() {
            // Total dropped: treat the drop as pending funds being consumed.
            let total_delta = state.total - total;
            if total_delta.is_positive() {
                state.pending = (state.pending - total_delta).floor_zero();
            }
            // Pending not yet visible in locked must not count as free.
            if (state.pending - locked).is_positive() {
                reported_free -= state.pending;
            }
        }

        state.total = total;
        state.locked = locked;
        state.free = reported_free - claimed;

        Metrics::reconciliation(&self.key.exchange);
        if state.free.is_negative() {
            Metrics::invalid_holdings(&self.key.exchange);
            warn!(
                exchange = %self.key.exchange,
                account = %self.key.account,
                asset = %self.key.asset,
                currency = %self.key.currency,
                free = %state.free,
                claimed = %claimed,
                pending = %state.pending,
                "Free balance negative after reconciliation"
            );
        } else {
            trace!(
                holding = %self.key,
                total = %state.total,
                locked = %state.locked,
                free = %state.free,
                pending = %state.pending,
                "Holding reconciled"
            );
        }

        self.match_waiting(&mut state);
        self.publish_free(state.free);
    }

    /// Apply a balance change that cannot be attributed to a tracked claim.
    ///
    /// With pending funds, a positive amount is absorbed by `pending` (and
    /// leaves `total`), a negative amount is added to `pending` (and to
    /// `total`). Whatever pending does not absorb moves between `locked` and
    /// `free`; if `locked` cannot cover it, `total` grows instead.
    pub(crate) fn adjust_by_balance(self: &Arc<Self>, amount: Amount) -> HoldingsResult<()> {
        if amount.is_zero() {
            return Err(HoldingsError::AmountCannotBeZero);
        }

        let mut state = self.state.lock();
        let mut remainder = amount;

        if state.pending.is_positive() {
            if amount.is_positive() {
                let absorbed = amount.min(state.pending);
                state.pending -= absorbed;
                state.total -= absorbed;
                remainder = amount - absorbed;
            } else {
                let absorbed = amount.abs();
                state.pending += absorbed;
                state.total += absorbed;
                remainder = Amount::ZERO;
            }
        }

        if !remainder.is_zero() {
            state.free += remainder;
            let locked = state.locked - remainder;
            if locked.is_negative() {
                state.total += locked.abs();
                state.locked = Amount::ZERO;
            } else {
                state.locked = locked;
            }
        }

        debug!(
            holding = %self.key,
            amount = %amount,
            total = %state.total,
            locked = %state.locked,
            free = %state.free,
            pending = %state.pending,
            "Holding adjusted by balance"
        );

        self.match_waiting(&mut state);
        self.publish_free(state.free);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Claims
    // ------------------------------------------------------------------------

    /// Reserve `amount` from the free balance.
    ///
    /// When `total_required` is false and `free` is short, the whole of
    /// `free` is claimed instead; callers must check [`Claim::amount`].
    pub fn claim(self: &Arc<Self>, amount: Amount, total_required: bool) -> HoldingsResult<Claim> {
        if !amount.is_positive() {
            return Err(HoldingsError::AmountMustBePositive(amount));
        }

        let mut state = self.state.lock();

        if !state.free.is_positive() {
            Metrics::claim_rejected(&self.key.exchange, "no_balance");
            return Err(HoldingsError::NoBalance {
                key: self.key.clone(),
            });
        }

        let granted = if (state.free - amount).is_negative() {
            if total_required {
                Metrics::claim_rejected(&self.key.exchange, "exceeds_holdings");
                return Err(HoldingsError::AmountExceedsHoldings {
                    key: self.key.clone(),
                    requested: amount,
                    free: state.free,
                });
            }
            state.free
        } else {
            amount
        };

        let claim = self.record_claim(&mut state, granted);
        Metrics::claim_granted(&self.key.exchange, granted != amount);
        trace!(
            holding = %self.key,
            claim = %claim.id(),
            requested = %amount,
            granted = %granted,
            free = %state.free,
            "Claim granted"
        );
        self.publish_free(state.free);
        Ok(claim)
    }

    /// Return a claim's amount to `free`.
    pub fn release(self: &Arc<Self>, claim: &Claim) -> HoldingsResult<()> {
        self.release_claim(claim, false)
    }

    /// Move a claim's amount into `pending`.
    pub fn release_to_pending(self: &Arc<Self>, claim: &Claim) -> HoldingsResult<()> {
        self.release_claim(claim, true)
    }

    fn release_claim(self: &Arc<Self>, claim: &Claim, pending: bool) -> HoldingsResult<()> {
        let mut state = self.state.lock();

        let record = state.claims.remove(&claim.id()).ok_or_else(|| {
            HoldingsError::UnableToReleaseClaim {
                key: self.key.clone(),
                claim: claim.id(),
            }
        })?;

        if pending {
            state.pending += record.amount;
            Metrics::claim_released(&self.key.exchange, "pending");
        } else {
            state.free += record.amount;
            Metrics::claim_released(&self.key.exchange, "free");
            self.match_waiting(&mut state);
        }

        self.publish_free(state.free);
        Ok(())
    }

    /// Remove a claim and take its amount out of `total` for good.
    ///
    /// Used when the funds have left the account (e.g. a withdrawal) and
    /// will never come back as free or locked.
    pub(crate) fn reduce(&self, claim: &Claim) -> HoldingsResult<()> {
        let mut state = self.state.lock();

        let record = state.claims.remove(&claim.id()).ok_or_else(|| {
            HoldingsError::UnableToReduceClaim {
                key: self.key.clone(),
                claim: claim.id(),
            }
        })?;

        state.total -= record.amount;
        Metrics::claim_released(&self.key.exchange, "reduce");
        Ok(())
    }

    /// Whether `claim` is still active on this holding.
    pub fn check_claim(&self, claim: &Claim) -> bool {
        self.state.lock().claims.contains_key(&claim.id())
    }

    /// When an active claim was made, if it is still active.
    pub fn claim_created_at(&self, claim: &Claim) -> Option<DateTime<Utc>> {
        self.state
            .lock()
            .claims
            .get(&claim.id())
            .map(|record| record.created_at)
    }

    fn record_claim(self: &Arc<Self>, state: &mut HoldingState, amount: Amount) -> Claim {
        let id = ClaimId::new();
        let created_at = Utc::now();
        state.claims.insert(id, ClaimRecord { amount, created_at });
        state.free -= amount;
        Claim::new(id, amount, created_at, Arc::clone(self))
    }

    // ------------------------------------------------------------------------
    // Waiting
    // ------------------------------------------------------------------------

    /// Queue a request for a future claim of the same amount as `claim`.
    ///
    /// Only released claims made against this holding can be converted into
    /// a wait. If enough free balance is already available the request is
    /// satisfied immediately.
    pub fn claim_and_wait(self: &Arc<Self>, claim: &Claim) -> HoldingsResult<Waiting> {
        let mut state = self.state.lock();

        if !Arc::ptr_eq(claim.holding(), self) || state.claims.contains_key(&claim.id()) {
            return Err(HoldingsError::CannotWait {
                key: self.key.clone(),
                claim: claim.id(),
            });
        }

        let id = WaitId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        state.waiting.push_back(WaitEntry {
            id,
            amount: claim.amount(),
            tx,
        });
        debug!(
            holding = %self.key,
            wait = %id,
            amount = %claim.amount(),
            queued = state.waiting.len(),
            "Waiting request queued"
        );

        self.match_waiting(&mut state);
        self.publish_free(state.free);
        Ok(Waiting::new(id, claim.amount(), Arc::clone(self), rx))
    }

    /// Drop a queued wait, closing its delivery channel.
    pub(crate) fn cancel_wait(&self, wait: WaitId) -> HoldingsResult<()> {
        let mut state = self.state.lock();

        let position = state
            .waiting
            .iter()
            .position(|entry| entry.id == wait)
            .ok_or_else(|| HoldingsError::CannotCancelWait {
                key: self.key.clone(),
                wait,
            })?;

        // Dropping the entry drops the sender, which closes the channel.
        state.waiting.remove(position);
        trace!(holding = %self.key, wait = %wait, "Waiting request cancelled");
        Ok(())
    }

    /// Satisfy queued waits, oldest first, that fit the current free balance.
    fn match_waiting(self: &Arc<Self>, state: &mut HoldingState) {
        if state.waiting.is_empty() || !state.free.is_positive() {
            return;
        }

        let mut remaining = VecDeque::with_capacity(state.waiting.len());
        while let Some(entry) = state.waiting.pop_front() {
            if entry.tx.is_closed() {
                trace!(holding = %self.key, wait = %entry.id, "Dropping abandoned wait");
                continue;
            }
            if entry.amount > state.free {
                remaining.push_back(entry);
                continue;
            }

            let claim = self.record_claim(state, entry.amount);
            let claim_id = claim.id();
            match entry.tx.send(claim) {
                Ok(()) => {
                    Metrics::waiting_delivered(&self.key.exchange);
                    debug!(
                        holding = %self.key,
                        wait = %entry.id,
                        claim = %claim_id,
                        amount = %entry.amount,
                        "Waiting request satisfied"
                    );
                }
                Err(_) => {
                    // Receiver went away between the check and the send.
                    state.claims.remove(&claim_id);
                    state.free += entry.amount;
                }
            }
        }
        state.waiting = remaining;
    }

    fn publish_free(&self, free: Amount) {
        Metrics::holding_free(
            &self.key.exchange,
            &self.key.account,
            self.key.asset.as_str(),
            self.key.currency.as_str(),
            free.to_f64(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use vault_core::{Asset, Currency};

    fn amt(value: rust_decimal::Decimal) -> Amount {
        Amount::new(value)
    }

    fn test_holding() -> Arc<Holding> {
        Holding::new(HoldingKey::new(
            "test_exchange",
            "main",
            Asset::Spot,
            Currency::new("BTC"),
        ))
    }

    fn assert_state(
        h: &Holding,
        total: Amount,
        locked: Amount,
        free: Amount,
        pending: Amount,
        claims: Amount,
    ) {
        let snap = h.snapshot();
        assert_eq!(snap.total, total, "total");
        assert_eq!(snap.locked, locked, "locked");
        assert_eq!(snap.free, free, "free");
        assert_eq!(snap.pending, pending, "pending");
        assert_eq!(snap.claimed, claims, "claims");
    }

    #[test]
    fn test_worked_sequence() {
        let h = test_holding();
        let zero = Amount::ZERO;

        h.set_amounts(amt(dec!(10)), zero);
        assert_state(&h, amt(dec!(10)), zero, amt(dec!(10)), zero, zero);

        h.set_amounts(amt(dec!(10)), amt(dec!(1)));
        assert_state(&h, amt(dec!(10)), amt(dec!(1)), amt(dec!(9)), zero, zero);

        h.set_amounts(amt(dec!(9)), zero);
        assert_state(&h, amt(dec!(9)), zero, amt(dec!(9)), zero, zero);

        let claim = h.claim(amt(dec!(1)), true).unwrap();
        assert_state(&h, amt(dec!(9)), zero, amt(dec!(8)), zero, amt(dec!(1)));

        h.release_to_pending(&claim).unwrap();
        assert_state(&h, amt(dec!(9)), zero, amt(dec!(8)), amt(dec!(1)), zero);

        h.set_amounts(amt(dec!(8)), zero);
        assert_state(&h, amt(dec!(8)), zero, amt(dec!(8)), zero, zero);
    }

    #[test]
    fn test_partial_claim() {
        let h = test_holding();
        h.set_amounts(amt(dec!(1)), amt(dec!(0.5)));
        assert_eq!(h.free(), amt(dec!(0.5)));

        let err = h.claim(amt(dec!(0.6)), true).unwrap_err();
        assert!(matches!(err, HoldingsError::AmountExceedsHoldings { .. }));
        assert_eq!(h.free(), amt(dec!(0.5)));

        let c1 = h.claim(amt(dec!(0.1)), false).unwrap();
        assert_eq!(c1.amount(), amt(dec!(0.1)));
        assert_eq!(h.free(), amt(dec!(0.4)));

        let c2 = h.claim(amt(dec!(0.5)), false).unwrap();
        assert_eq!(c2.amount(), amt(dec!(0.4)));
        assert_eq!(h.free(), Amount::ZERO);

        assert!(h.snapshot().is_balanced());
    }

    #[test]
    fn test_claim_rejects_non_positive_amount() {
        let h = test_holding();
        h.set_amounts(amt(dec!(5)), Amount::ZERO);

        assert!(matches!(
            h.claim(amt(dec!(-3)), true),
            Err(HoldingsError::AmountMustBePositive(_))
        ));
        assert!(matches!(
            h.claim(Amount::ZERO, false),
            Err(HoldingsError::AmountMustBePositive(_))
        ));
        assert_eq!(h.free(), amt(dec!(5)));
        assert_eq!(h.claims_len(), 0);
    }

    #[test]
    fn test_claim_no_balance() {
        let h = test_holding();
        let err = h.claim(amt(dec!(1)), false).unwrap_err();
        assert!(matches!(err, HoldingsError::NoBalance { .. }));
    }

    #[test]
    fn test_claim_rejected_when_free_negative() {
        let h = test_holding();
        h.set_amounts(amt(dec!(5)), Amount::ZERO);
        let _claim = h.claim(amt(dec!(5)), true).unwrap();

        // Exchange reports less than is claimed locally.
        h.set_amounts(amt(dec!(3)), Amount::ZERO);
        assert_eq!(h.free(), amt(dec!(-2)));

        let err = h.claim(amt(dec!(1)), false).unwrap_err();
        assert!(matches!(err, HoldingsError::NoBalance { .. }));
        assert!(matches!(
            h.validate(Amount::ZERO),
            Err(HoldingsError::InvalidHoldings { .. })
        ));
    }

    #[test]
    fn test_release_round_trip() {
        let h = test_holding();
        h.set_amounts(amt(dec!(3.3)), amt(dec!(0.3)));
        let before = h.free();

        let claim = h.claim(amt(dec!(1.1)), true).unwrap();
        assert!(h.check_claim(&claim));
        assert!(h.claim_created_at(&claim).is_some());

        h.release(&claim).unwrap();
        assert_eq!(h.free(), before);
        assert!(!h.check_claim(&claim));
        assert!(h.claim_created_at(&claim).is_none());
    }

    #[test]
    fn test_double_release_fails() {
        let h = test_holding();
        h.set_amounts(amt(dec!(2)), Amount::ZERO);
        let claim = h.claim(amt(dec!(1)), true).unwrap();

        h.release(&claim).unwrap();
        assert!(matches!(
            h.release(&claim),
            Err(HoldingsError::UnableToReleaseClaim { .. })
        ));
        assert!(matches!(
            h.release_to_pending(&claim),
            Err(HoldingsError::UnableToReleaseClaim { .. })
        ));
        assert_eq!(h.free(), amt(dec!(2)));
    }

    #[test]
    fn test_foreign_claim_rejected() {
        let a = test_holding();
        let b = test_holding();
        a.set_amounts(amt(dec!(1)), Amount::ZERO);
        b.set_amounts(amt(dec!(1)), Amount::ZERO);

        let claim = a.claim(amt(dec!(1)), true).unwrap();
        assert!(!b.check_claim(&claim));
        assert!(b.release(&claim).is_err());
        assert!(b.reduce(&claim).is_err());
        assert_eq!(b.free(), amt(dec!(1)));
    }

    #[test]
    fn test_reduce() {
        let h = test_holding();
        h.set_amounts(amt(dec!(10)), Amount::ZERO);
        let claim = h.claim(amt(dec!(4)), true).unwrap();

        h.reduce(&claim).unwrap();
        let zero = Amount::ZERO;
        assert_state(&h, amt(dec!(6)), zero, amt(dec!(6)), zero, zero);
        assert!(matches!(
            h.reduce(&claim),
            Err(HoldingsError::UnableToReduceClaim { .. })
        ));
    }

    #[test]
    fn test_pending_not_in_locked_is_excluded_from_free() {
        let h = test_holding();
        h.set_amounts(amt(dec!(10)), Amount::ZERO);
        let claim = h.claim(amt(dec!(3)), true).unwrap();
        h.release_to_pending(&claim).unwrap();

        // Exchange has not seen the order yet: same total, nothing locked.
        h.set_amounts(amt(dec!(10)), Amount::ZERO);
        assert_state(&h, amt(dec!(10)), Amount::ZERO, amt(dec!(7)), amt(dec!(3)), Amount::ZERO);

        // Order partially filled: total dropped by 1.
        h.set_amounts(amt(dec!(9)), Amount::ZERO);
        assert_state(&h, amt(dec!(9)), Amount::ZERO, amt(dec!(7)), amt(dec!(2)), Amount::ZERO);
    }

    #[test]
    fn test_pending_already_locked_is_not_netted() {
        let h = test_holding();
        h.set_amounts(amt(dec!(10)), Amount::ZERO);
        let claim = h.claim(amt(dec!(3)), true).unwrap();
        h.release_to_pending(&claim).unwrap();

        // Exchange now locks the order: pending is covered by locked, so it
        // is not subtracted from free a second time.
        h.set_amounts(amt(dec!(10)), amt(dec!(3)));
        assert_state(&h, amt(dec!(10)), amt(dec!(3)), amt(dec!(7)), amt(dec!(3)), Amount::ZERO);
        assert!(!h.snapshot().is_balanced());

        // Fill lands: total drops by the order size and pending clears.
        h.set_amounts(amt(dec!(7)), Amount::ZERO);
        assert_state(&h, amt(dec!(7)), Amount::ZERO, amt(dec!(7)), Amount::ZERO, Amount::ZERO);
        assert!(h.snapshot().is_balanced());
    }

    #[test]
    fn test_pending_drop_larger_than_pending_clamps() {
        let h = test_holding();
        h.set_amounts(amt(dec!(10)), Amount::ZERO);
        let claim = h.claim(amt(dec!(1)), true).unwrap();
        h.release_to_pending(&claim).unwrap();

        h.set_amounts(amt(dec!(5)), Amount::ZERO);
        assert_eq!(h.pending(), Amount::ZERO);
        assert_eq!(h.free(), amt(dec!(5)));
    }

    #[test]
    fn test_adjust_by_balance_zero() {
        let h = test_holding();
        assert!(matches!(
            h.adjust_by_balance(Amount::ZERO),
            Err(HoldingsError::AmountCannotBeZero)
        ));

        h.set_amounts(amt(dec!(4)), amt(dec!(1)));
        assert!(matches!(
            h.adjust_by_balance(Amount::ZERO),
            Err(HoldingsError::AmountCannotBeZero)
        ));
    }

    #[test]
    fn test_adjust_by_balance_moves_locked_to_free() {
        let h = test_holding();
        h.set_amounts(amt(dec!(10)), amt(dec!(4)));

        h.adjust_by_balance(amt(dec!(3))).unwrap();
        assert_state(&h, amt(dec!(10)), amt(dec!(1)), amt(dec!(9)), Amount::ZERO, Amount::ZERO);

        // More than is locked: total grows by the excess.
        h.adjust_by_balance(amt(dec!(2))).unwrap();
        assert_state(&h, amt(dec!(11)), Amount::ZERO, amt(dec!(11)), Amount::ZERO, Amount::ZERO);

        h.adjust_by_balance(amt(dec!(-5))).unwrap();
        assert_state(&h, amt(dec!(11)), amt(dec!(5)), amt(dec!(6)), Amount::ZERO, Amount::ZERO);
    }

    #[test]
    fn test_adjust_by_balance_with_pending() {
        let h = test_holding();
        h.set_amounts(amt(dec!(10)), Amount::ZERO);
        let claim = h.claim(amt(dec!(2)), true).unwrap();
        h.release_to_pending(&claim).unwrap();

        h.adjust_by_balance(amt(dec!(0.5))).unwrap();
        assert_state(&h, amt(dec!(9.5)), Amount::ZERO, amt(dec!(8)), amt(dec!(1.5)), Amount::ZERO);

        h.adjust_by_balance(amt(dec!(-1))).unwrap();
        assert_state(&h, amt(dec!(10.5)), Amount::ZERO, amt(dec!(8)), amt(dec!(2.5)), Amount::ZERO);

        // Pending fully absorbed, the rest is a plain balance increase.
        h.adjust_by_balance(amt(dec!(3))).unwrap();
        assert_state(&h, amt(dec!(8.5)), Amount::ZERO, amt(dec!(8.5)), Amount::ZERO, Amount::ZERO);
        assert!(h.snapshot().is_balanced());
    }

    #[test]
    fn test_claim_and_wait_requires_released_claim() {
        let h = test_holding();
        h.set_amounts(amt(dec!(2)), Amount::ZERO);
        let claim = h.claim(amt(dec!(1)), true).unwrap();

        assert!(matches!(
            h.claim_and_wait(&claim),
            Err(HoldingsError::CannotWait { .. })
        ));
        assert_eq!(h.waiting_len(), 0);
    }

    #[test]
    fn test_claim_and_wait_rejects_foreign_claim() {
        let a = test_holding();
        let b = test_holding();
        a.set_amounts(amt(dec!(2)), Amount::ZERO);
        b.set_amounts(amt(dec!(2)), Amount::ZERO);

        let claim = a.claim(amt(dec!(1)), true).unwrap();
        assert!(matches!(
            b.claim_and_wait(&claim),
            Err(HoldingsError::CannotWait { .. })
        ));
        claim.release().unwrap();
        assert!(matches!(
            b.claim_and_wait(&claim),
            Err(HoldingsError::CannotWait { .. })
        ));
        assert_eq!(b.waiting_len(), 0);
        assert_eq!(b.free(), amt(dec!(2)));
    }

    #[test]
    fn test_dropped_wait_returns_delivered_claim() {
        let h = test_holding();
        h.set_amounts(amt(dec!(5)), Amount::ZERO);
        let claim = h.claim(amt(dec!(2)), true).unwrap();
        h.release(&claim).unwrap();

        // Satisfied before the caller ever looks at the channel.
        let waiting = h.claim_and_wait(&claim).unwrap();
        assert_eq!(h.free(), amt(dec!(3)));
        assert_eq!(h.claims_len(), 1);

        drop(waiting);
        assert_state(&h, amt(dec!(5)), Amount::ZERO, amt(dec!(5)), Amount::ZERO, Amount::ZERO);
        assert_eq!(h.claims_len(), 0);
    }

    #[test]
    fn test_done_returns_undelivered_claim() {
        let h = test_holding();
        h.set_amounts(amt(dec!(5)), Amount::ZERO);
        let claim = h.claim(amt(dec!(2)), true).unwrap();
        h.release(&claim).unwrap();

        let mut waiting = h.claim_and_wait(&claim).unwrap();
        waiting.done().unwrap();
        assert_eq!(h.free(), amt(dec!(5)));
        assert_eq!(h.claims_len(), 0);
        assert!(waiting.try_recv().is_none());

        drop(waiting);
        assert_eq!(h.free(), amt(dec!(5)));
    }

    #[test]
    fn test_wait_satisfied_when_free_rises() {
        let h = test_holding();
        h.set_amounts(amt(dec!(2)), Amount::ZERO);
        let first = h.claim(amt(dec!(2)), true).unwrap();
        h.release(&first).unwrap();
        let blocker = h.claim(amt(dec!(2)), true).unwrap();

        let mut waiting = h.claim_and_wait(&first).unwrap();
        assert_eq!(h.waiting_len(), 1);
        assert!(waiting.try_recv().is_none());

        h.release(&blocker).unwrap();
        assert_eq!(h.waiting_len(), 0);

        let delivered = waiting.try_recv().expect("claim delivered");
        assert_eq!(delivered.amount(), amt(dec!(2)));
        assert!(delivered.has_claim());
        assert_eq!(h.free(), Amount::ZERO);
        assert!(h.snapshot().is_balanced());
    }

    #[test]
    fn test_wait_satisfied_immediately_when_free_suffices() {
        let h = test_holding();
        h.set_amounts(amt(dec!(5)), Amount::ZERO);
        let claim = h.claim(amt(dec!(1)), true).unwrap();
        h.release(&claim).unwrap();

        let mut waiting = h.claim_and_wait(&claim).unwrap();
        let delivered = waiting.try_recv().expect("claim delivered");
        assert_eq!(delivered.amount(), amt(dec!(1)));
        assert_eq!(h.free(), amt(dec!(4)));
        assert_eq!(h.waiting_len(), 0);
    }

    #[test]
    fn test_wait_queue_skips_entries_that_do_not_fit() {
        let h = test_holding();
        h.set_amounts(amt(dec!(3)), Amount::ZERO);
        let big = h.claim(amt(dec!(3)), true).unwrap();
        h.release(&big).unwrap();
        let small = h.claim(amt(dec!(1)), true).unwrap();
        h.release(&small).unwrap();
        let blocker = h.claim(amt(dec!(3)), true).unwrap();

        let mut big_wait = h.claim_and_wait(&big).unwrap();
        let mut small_wait = h.claim_and_wait(&small).unwrap();

        // Only 2 freed: the older request for 3 keeps its place, the newer
        // request for 1 is served.
        h.adjust_by_balance(amt(dec!(-1))).unwrap();
        h.release(&blocker).unwrap();
        assert!(big_wait.try_recv().is_none());
        assert_eq!(small_wait.try_recv().unwrap().amount(), amt(dec!(1)));
        assert_eq!(h.waiting_len(), 1);
        assert_eq!(h.free(), amt(dec!(1)));
    }

    #[test]
    fn test_abandoned_wait_is_dropped() {
        let h = test_holding();
        h.set_amounts(amt(dec!(1)), Amount::ZERO);
        let claim = h.claim(amt(dec!(1)), true).unwrap();
        h.release(&claim).unwrap();
        let blocker = h.claim(amt(dec!(1)), true).unwrap();

        let waiting = h.claim_and_wait(&claim).unwrap();
        drop(waiting);

        h.release(&blocker).unwrap();
        assert_eq!(h.waiting_len(), 0);
        assert_eq!(h.free(), amt(dec!(1)));
        assert_eq!(h.claims_len(), 0);
    }

    #[test]
    fn test_cancel_wait() {
        let h = test_holding();
        h.set_amounts(amt(dec!(1)), Amount::ZERO);
        let claim = h.claim(amt(dec!(1)), true).unwrap();
        h.release(&claim).unwrap();
        let blocker = h.claim(amt(dec!(1)), true).unwrap();

        let mut waiting = h.claim_and_wait(&claim).unwrap();
        waiting.done().unwrap();
        assert_eq!(h.waiting_len(), 0);
        assert!(matches!(
            waiting.done(),
            Err(HoldingsError::CannotCancelWait { .. })
        ));

        h.release(&blocker).unwrap();
        assert!(waiting.try_recv().is_none());
        assert_eq!(h.free(), amt(dec!(1)));
    }
}
