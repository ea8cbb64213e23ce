//! Composite requests across more than one channel: external choice.
//!
//! [`MultiChannelAccess`] lets a process offer a Read or a Write on several
//! channels at once and commit to whichever partner is ready first, without
//! ever double-committing — the defining guarantee of CSP's ALT construct.
//! Every leg shares one [`TwoPhaseOffer`]; whichever channel's matching
//! engine claims it first wins, and the others are cancelled via the same
//! [`CancelToken`] plumbing ordinary timeouts use.

use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::future;
use rand::seq::SliceRandom;

use crate::channel::Channel;
use crate::error::ChannelError;
use crate::offer::TwoPhaseOffer;
use crate::request::CancelToken;

/// Ordering policy among legs that all become ready around the same time.
///
/// All three race the legs' futures concurrently — the channel that
/// actually commits first always wins, regardless of policy. What `Priority`
/// controls is the *order legs are offered in*, which matters because
/// [`crate::offer::try_offer_all`] claims offers sequentially: the earlier a
/// leg is offered, the likelier it wins a simultaneous tie.
///
/// - `First` always offers legs in the order they were given to [`MultiChannelAccess::new`].
/// - `Fair` rotates the starting leg on every call, round-robin, so no single
///   leg is systematically favored across repeated selects.
/// - `Random` shuffles the offer order on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    First,
    Fair,
    Random,
}

/// A set of channels offered together for external choice, all carrying the
/// same element type. Mixing element types across legs is possible by
/// reading into an enum the caller defines; this type only handles the
/// common, same-type case directly.
pub struct MultiChannelAccess<T: Clone + Send + 'static> {
    legs: Vec<Arc<Channel<T>>>,
    priority: Priority,
    rotation: AtomicUsize,
}

impl<T: Clone + Send + 'static> MultiChannelAccess<T> {
    /// Builds a composite over the given channels. Panics if the same
    /// channel is offered twice — offering a channel to itself on both
    /// sides of a choice can never resolve and is refused at construction
    /// rather than deadlocking at runtime.
    pub fn new(legs: Vec<Arc<Channel<T>>>, priority: Priority) -> Self {
        for i in 0..legs.len() {
            for j in (i + 1)..legs.len() {
                if Arc::ptr_eq(&legs[i], &legs[j]) {
                    panic!("MultiChannelAccess: the same channel cannot be offered twice");
                }
            }
        }
        MultiChannelAccess {
            legs,
            priority,
            rotation: AtomicUsize::new(0),
        }
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// The original-index order legs are offered in for one call, per
    /// [`Priority`].
    fn offer_order(&self) -> Vec<usize> {
        let n = self.legs.len();
        match self.priority {
            Priority::First => (0..n).collect(),
            Priority::Fair => {
                let start = self.rotation.fetch_add(1, Ordering::Relaxed) % n;
                (0..n).map(|i| (start + i) % n).collect()
            }
            Priority::Random => {
                let mut order: Vec<usize> = (0..n).collect();
                order.shuffle(&mut rand::rng());
                order
            }
        }
    }

    /// Reads from whichever leg becomes ready first, cancelling every other
    /// leg's offer the moment one commits.
    pub async fn read(&self) -> Result<(usize, T), ChannelError> {
        self.read_opts(None).await
    }

    pub async fn read_opts(&self, deadline: Option<Instant>) -> Result<(usize, T), ChannelError> {
        if self.legs.is_empty() {
            return Err(ChannelError::InvalidOperation(
                "MultiChannelAccess has no legs".into(),
            ));
        }
        let offer = Arc::new(TwoPhaseOffer::new());
        let cancel = CancelToken::new();

        let mut futures_vec = Vec::with_capacity(self.legs.len());
        for idx in self.offer_order() {
            let offer = offer.clone();
            let cancel = cancel.clone();
            let channel = self.legs[idx].clone();
            futures_vec.push(Box::pin(async move {
                let result = channel.read_opts(Some(offer), deadline, Some(cancel)).await;
                (idx, result)
            }));
        }

        let (winner, _idx_unused, rest) = future::select_all(futures_vec).await;
        // The winner firing cancels every sibling still racing; their
        // futures are simply dropped once this function returns, which
        // drops their registration but the cancel token already tore down
        // any pending queue entries via `Channel::fail_pending`.
        cancel.cancel();
        drop(rest);
        let (idx, result) = winner;
        result.map(|value| (idx, value))
    }
}

type LegOutcome = Result<Box<dyn Any + Send>, ChannelError>;
type LegFuture = Pin<Box<dyn Future<Output = LegOutcome> + Send>>;
type LegThunk = Box<dyn FnOnce(Arc<TwoPhaseOffer>, Option<Instant>, CancelToken) -> LegFuture + Send>;

/// A one-shot external choice across channels of *different* element types,
/// and/or a mix of Read and Write requests — the general form of external
/// choice, where [`MultiChannelAccess`] covers only its common same-type,
/// Read-only case (and, unlike this type, is reusable across repeated calls
/// so `Priority::Fair` can rotate meaningfully).
///
/// Built with the channel/value pairs it will race, then consumed by
/// [`HeterogeneousChoice::select`]. The winning leg's value comes back
/// type-erased (`Box<dyn Any + Send>`); downcast it with the element type
/// you know that leg carries.
#[derive(Default)]
pub struct HeterogeneousChoice {
    legs: Vec<(usize, LegThunk)>,
}

impl HeterogeneousChoice {
    pub fn new() -> Self {
        HeterogeneousChoice { legs: Vec::new() }
    }

    /// Adds a Read leg on `channel`.
    pub fn read<T: Clone + Send + 'static>(mut self, channel: Arc<Channel<T>>) -> Self {
        let ptr = Arc::as_ptr(&channel) as usize;
        self.legs.push((
            ptr,
            Box::new(move |offer, deadline, cancel| {
                Box::pin(async move {
                    channel
                        .read_opts(Some(offer), deadline, Some(cancel))
                        .await
                        .map(|v| Box::new(v) as Box<dyn Any + Send>)
                })
            }),
        ));
        self
    }

    /// Adds a Write leg offering `value` on `channel`.
    pub fn write<T: Clone + Send + 'static>(mut self, channel: Arc<Channel<T>>, value: T) -> Self {
        let ptr = Arc::as_ptr(&channel) as usize;
        self.legs.push((
            ptr,
            Box::new(move |offer, deadline, cancel| {
                Box::pin(async move {
                    channel
                        .write_opts(value, Some(offer), deadline, Some(cancel))
                        .await
                        .map(|()| Box::new(()) as Box<dyn Any + Send>)
                })
            }),
        ));
        self
    }

    /// Races every leg and commits to whichever completes first, cancelling
    /// the rest. Fails with `InvalidOperation` if the same channel was
    /// offered by more than one leg (the same self-deadlock guard
    /// [`MultiChannelAccess::new`] applies) or if no legs were added.
    pub async fn select(
        mut self,
        priority: Priority,
        deadline: Option<Instant>,
    ) -> Result<(usize, Box<dyn Any + Send>), ChannelError> {
        if self.legs.is_empty() {
            return Err(ChannelError::InvalidOperation(
                "HeterogeneousChoice has no legs".into(),
            ));
        }
        for i in 0..self.legs.len() {
            for j in (i + 1)..self.legs.len() {
                if self.legs[i].0 == self.legs[j].0 {
                    return Err(ChannelError::InvalidOperation(
                        "the same channel cannot be offered by two legs of one choice".into(),
                    ));
                }
            }
        }

        let order: Vec<usize> = match priority {
            Priority::First => (0..self.legs.len()).collect(),
            Priority::Fair | Priority::Random => {
                let mut order: Vec<usize> = (0..self.legs.len()).collect();
                order.shuffle(&mut rand::rng());
                order
            }
        };

        let offer = Arc::new(TwoPhaseOffer::new());
        let cancel = CancelToken::new();
        let mut thunks: Vec<Option<LegThunk>> = self.legs.drain(..).map(|(_, t)| Some(t)).collect();
        let mut futures_vec = Vec::with_capacity(order.len());
        for idx in order {
            let thunk = thunks[idx].take().expect("leg consumed twice");
            let fut = thunk(offer.clone(), deadline, cancel.clone());
            futures_vec.push(Box::pin(async move { (idx, fut.await) }));
        }

        let ((idx, result), _, rest) = future::select_all(futures_vec).await;
        cancel.cancel();
        drop(rest);
        result.map(|value| (idx, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelConfig;
    use futures::executor::block_on;

    #[test]
    fn heterogeneous_choice_picks_ready_write_leg() {
        let numbers = Channel::<i32>::new(ChannelConfig::new(0));
        let words = Channel::<String>::new(ChannelConfig::new(0));

        let reader = words.clone();
        let handle = std::thread::spawn(move || block_on(reader.read()));
        // give the reader time to register before racing the choice
        std::thread::sleep(std::time::Duration::from_millis(20));

        let choice = HeterogeneousChoice::new()
            .read(numbers)
            .write(words, "hello".to_string());
        let (idx, value) = block_on(choice.select(Priority::First, None)).unwrap();
        assert_eq!(idx, 1);
        assert_eq!(*value.downcast::<()>().unwrap(), ());
        assert_eq!(handle.join().unwrap().unwrap(), "hello");
    }

    #[test]
    fn heterogeneous_choice_rejects_duplicate_channel() {
        let ch = Channel::<i32>::new(ChannelConfig::new(0));
        let choice = HeterogeneousChoice::new().read(ch.clone()).write(ch, 1);
        let err = block_on(choice.select(Priority::First, None)).unwrap_err();
        assert!(matches!(err, ChannelError::InvalidOperation(_)));
    }

    #[test]
    #[should_panic(expected = "offered twice")]
    fn rejects_duplicate_leg() {
        let ch = Channel::<i32>::new(ChannelConfig::new(0));
        let _ = MultiChannelAccess::new(vec![ch.clone(), ch], Priority::First);
    }

    /// Reading through a composite of two channels returns from whichever
    /// one is actually written to.
    #[test]
    fn reads_from_whichever_leg_is_ready() {
        let a = Channel::<i32>::new(ChannelConfig::new(0));
        let b = Channel::<i32>::new(ChannelConfig::new(0));
        let composite = MultiChannelAccess::new(vec![a.clone(), b.clone()], Priority::First);

        let writer = b.clone();
        let handle = std::thread::spawn(move || block_on(writer.write(7)));
        let (idx, value) = block_on(composite.read()).unwrap();
        assert_eq!(idx, 1);
        assert_eq!(value, 7);
        handle.join().unwrap().unwrap();
    }
}
