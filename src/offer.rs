//! [`TwoPhaseOffer`]: the commit protocol object backing external choice.
//!
//! A composite request (built by [`crate::multi::MultiChannelAccess`], or
//! implicitly shared by the two sides of a direct pairing when either side
//! carries one) attaches one `TwoPhaseOffer` per sibling. The channel engine
//! calls `offer()` on every participant in canonical (`RequestId`-ascending)
//! order before committing a match, guaranteeing that exactly one sibling of
//! a composite ever transitions to `Committed`.

use parking_lot::Mutex;

/// Offer lifecycle. `Idle -> Offered -> Committed` is the success path;
/// `Offered -> Idle` (via `withdraw`) lets the engine retry a different pair
/// without losing the composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferState {
    Idle,
    Offered,
    Committed,
    Withdrawn,
}

/// Serializes offer/commit/withdraw under its own lock, independent of any
/// channel's lock: offer locks are never held while a channel lock is
/// acquired, and vice versa.
pub struct TwoPhaseOffer {
    state: Mutex<OfferState>,
}

impl TwoPhaseOffer {
    pub fn new() -> Self {
        TwoPhaseOffer {
            state: Mutex::new(OfferState::Idle),
        }
    }

    /// Tentatively claims the offer. Returns `true` and transitions to
    /// `Offered` iff the offer was `Idle`; returns `false` (no transition)
    /// if it is already `Offered` (by the same claim — callers hold one
    /// offer() outstanding at a time), `Committed`, or `Withdrawn`.
    pub fn offer(&self) -> bool {
        let mut state = self.state.lock();
        if *state == OfferState::Idle {
            *state = OfferState::Offered;
            true
        } else {
            false
        }
    }

    /// Seals the offer. Must only be called after a successful `offer()`.
    pub fn commit(&self) {
        let mut state = self.state.lock();
        *state = OfferState::Committed;
    }

    /// Releases a tentative claim without committing, returning the offer to
    /// `Idle` so a later match attempt may claim it again.
    pub fn withdraw(&self) {
        let mut state = self.state.lock();
        if *state == OfferState::Offered {
            *state = OfferState::Idle;
        }
    }

    pub fn is_committed(&self) -> bool {
        *self.state.lock() == OfferState::Committed
    }

    pub fn state(&self) -> OfferState {
        *self.state.lock()
    }
}

impl Default for TwoPhaseOffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs the two-phase commit protocol across a set of offers in canonical
/// order, returning `true` iff every offer accepted (in which case all are
/// left `Offered`, ready for the caller to `commit()` after performing the
/// value transfer). On any refusal, every offer that had accepted is
/// withdrawn before returning `false`.
pub(crate) fn try_offer_all(offers: &[&TwoPhaseOffer]) -> bool {
    let mut accepted = Vec::with_capacity(offers.len());
    for offer in offers {
        if offer.offer() {
            accepted.push(*offer);
        } else {
            for taken in &accepted {
                taken.withdraw();
            }
            return false;
        }
    }
    true
}

/// Commits every offer in the set. Called only after [`try_offer_all`]
/// returned `true` for the same set.
pub(crate) fn commit_all(offers: &[&TwoPhaseOffer]) {
    for offer in offers {
        offer.commit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A second `offer()` call while `Offered` returns false (not `Committed`
    /// — offer() only ever succeeds from `Idle`).
    #[test]
    fn second_offer_while_offered_fails() {
        let offer = TwoPhaseOffer::new();
        assert!(offer.offer());
        assert!(!offer.offer());
    }

    /// A second `offer()` call while `Committed` returns false.
    #[test]
    fn offer_after_commit_fails() {
        let offer = TwoPhaseOffer::new();
        assert!(offer.offer());
        offer.commit();
        assert!(!offer.offer());
        assert!(offer.is_committed());
    }

    /// Withdraw releases the tentative claim, allowing re-offering.
    #[test]
    fn withdraw_allows_reoffer() {
        let offer = TwoPhaseOffer::new();
        assert!(offer.offer());
        offer.withdraw();
        assert!(offer.offer());
    }

    /// `try_offer_all` rolls back every prior acceptance when one offer refuses.
    #[test]
    fn try_offer_all_rolls_back_on_refusal() {
        let a = TwoPhaseOffer::new();
        let b = TwoPhaseOffer::new();
        b.offer(); // pre-claim b, simulating a sibling that already committed elsewhere
        assert!(!try_offer_all(&[&a, &b]));
        assert_eq!(a.state(), OfferState::Idle);
    }

    /// When every offer accepts, all remain `Offered` until explicitly committed.
    #[test]
    fn try_offer_all_succeeds_then_commit_all() {
        let a = TwoPhaseOffer::new();
        let b = TwoPhaseOffer::new();
        assert!(try_offer_all(&[&a, &b]));
        assert_eq!(a.state(), OfferState::Offered);
        commit_all(&[&a, &b]);
        assert!(a.is_committed());
        assert!(b.is_committed());
    }
}
