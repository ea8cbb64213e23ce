//! A Communicating Sequential Processes (CSP) runtime.
//!
//! `rendezvous` gives processes typed, in-memory channels with the handful
//! of primitives CSP networks are built from: synchronous or buffered
//! point-to-point delivery, external choice across several channels at
//! once (an ALT), graceful retirement, and named lookup scopes for wiring a
//! process network together without passing handles through every
//! constructor.
//!
//! ## Example
//!
//! ```
//! use rendezvous::{Channel, ChannelConfig};
//! use futures::executor::block_on;
//!
//! let ch = Channel::<i32>::new(ChannelConfig::new(0));
//! let writer = ch.clone();
//! std::thread::spawn(move || block_on(writer.write(42)));
//! assert_eq!(block_on(ch.read()).unwrap(), 42);
//! ```
//!
//! ## Module map
//!
//! - [`channel`] — the core synchronization primitive and its matching engine.
//! - [`offer`] — the two-phase commit protocol backing external choice.
//! - [`multi`] — composing several channels into one external-choice request.
//! - [`scope`] — named lookup of channels within a process network.
//! - [`queue`] — the FIFO pending-request queue with O(log n) removal.
//! - [`request`] — the waiter types and cancellation/deadline plumbing.
//! - [`join`] — optional participant tracking that drives auto-retirement.
//! - [`error`] — the error taxonomy shared by every operation.
//! - [`blocking`] — convenience wrappers for non-async callers.

mod blocking;
mod channel;
mod error;
mod join;
mod multi;
mod offer;
mod queue;
mod request;
mod scope;
mod timer;

pub use blocking::BlockingChannelExt;
pub use channel::{Channel, ChannelConfig, OverflowStrategy, Side};
pub use error::{ChannelError, TryRecvError, TrySendError};
pub use multi::{HeterogeneousChoice, MultiChannelAccess, Priority};
pub use offer::{OfferState, TwoPhaseOffer};
pub use request::{CancelToken, RequestId};
pub use scope::{ChannelScope, LocalScope};

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    /// End-to-end: two channels wired through a scope, a producer and a
    /// consumer exchanging values, then a graceful retirement.
    #[test]
    fn producer_consumer_through_a_scope() {
        let scope = LocalScope::new();
        let ch = Channel::<i32>::new(ChannelConfig::new(1));
        assert!(scope.register("numbers", ch.clone()));

        let resolved: std::sync::Arc<Channel<i32>> = scope.lookup("numbers").unwrap();
        let producer = resolved.clone();
        let handle = std::thread::spawn(move || {
            block_on(async {
                for i in 0..5 {
                    producer.write(i).await.unwrap();
                }
                producer.retire(false);
            })
        });

        block_on(async {
            for i in 0..5 {
                assert_eq!(resolved.read().await.unwrap(), i);
            }
            assert!(matches!(resolved.read().await, Err(ChannelError::Retired)));
        });
        handle.join().unwrap();
    }

    /// Fair alternation: several writers sharing one channel all get served,
    /// in the order they actually enqueued.
    #[test]
    fn many_writers_all_get_served() {
        let ch = Channel::<usize>::new(ChannelConfig::new(0));
        let mut handles = Vec::new();
        for id in 0..10 {
            let writer = ch.clone();
            handles.push(std::thread::spawn(move || block_on(writer.write(id))));
        }
        let mut seen = std::collections::HashSet::new();
        block_on(async {
            for _ in 0..10 {
                let value = ch.read().await.unwrap();
                seen.insert(value);
            }
        });
        for handle in handles {
            handle.join().unwrap().unwrap();
        }
        assert_eq!(seen.len(), 10);
    }
}
