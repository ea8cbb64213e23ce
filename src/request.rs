//! Pending requests: the unit of work that flows through a [`crate::channel::Channel`].
//!
//! A reader and a writer get distinct waiter types (`ReadWaiter`/`WriteWaiter`)
//! rather than one generic `PendingRequest` because their result sinks differ:
//! a Read resolves to the value read, a Write resolves to `()`. Both carry
//! everything needed to complete later from a different thread: a one-shot
//! result sink, an optional [`TwoPhaseOffer`] shared with composite siblings,
//! and optional deadline/cancellation triggers. Completion is exactly-once
//! because `oneshot::Sender::send` itself can only ever succeed once; every
//! cancel/timeout/match path races to call it but only the first wins.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use futures::channel::oneshot;

use crate::error::ChannelError;
use crate::offer::TwoPhaseOffer;
use crate::timer::{self, TimerHandle};

/// Globally unique, monotonically increasing request identity.
///
/// Used both as the PriorityQueue removal key and as the canonical lock
/// order for composite offer commits (§4.2: "in a canonical order, by
/// requestId, to avoid deadlock").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        RequestId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value, exposed for logging/debugging only.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A cancellation signal a caller can fire from any thread.
///
/// Firing before the request is enqueued is remembered (`fired` starts
/// false and is set exactly once); firing after the request has already
/// completed is a documented no-op.
#[derive(Clone)]
pub struct CancelToken(Arc<CancelInner>);

struct CancelInner {
    fired: AtomicBool,
    on_fire: parking_lot::Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken(Arc::new(CancelInner {
            fired: AtomicBool::new(false),
            on_fire: parking_lot::Mutex::new(None),
        }))
    }

    /// Fires the token. Safe to call from any thread, any number of times;
    /// only the first call has an effect.
    pub fn cancel(&self) {
        if self.0.fired.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(cb) = self.0.on_fire.lock().take() {
            cb();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.fired.load(Ordering::Acquire)
    }

    /// Registers the callback that runs when `cancel()` fires. If the token
    /// already fired, runs the callback immediately instead of losing it.
    pub(crate) fn on_cancel(&self, cb: impl FnOnce() + Send + 'static) {
        if self.0.fired.load(Ordering::Acquire) {
            cb();
            return;
        }
        let mut slot = self.0.on_fire.lock();
        if self.0.fired.load(Ordering::Acquire) {
            drop(slot);
            cb();
            return;
        }
        *slot = Some(Box::new(cb));
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("fired", &self.is_cancelled())
            .finish()
    }
}

/// A registered deadline/cancel pair, tracked so it can be disarmed the
/// moment the request completes through some other path (match or
/// retirement), guaranteeing a late-firing timer/cancel is a no-op.
pub(crate) struct Triggers {
    pub(crate) timer: Option<TimerHandle>,
    pub(crate) cancel: Option<CancelToken>,
}

impl Triggers {
    pub(crate) fn none() -> Self {
        Triggers {
            timer: None,
            cancel: None,
        }
    }

    pub(crate) fn disarm(&mut self) {
        if let Some(handle) = self.timer.take() {
            timer::cancel(handle);
        }
        self.cancel.take();
    }
}

/// Entries storable in a [`crate::queue::PriorityQueue`].
pub(crate) trait QueueEntry {
    fn id(&self) -> RequestId;
}

/// A Read that could not complete synchronously.
pub struct ReadWaiter<T> {
    pub request_id: RequestId,
    pub offer: Option<Arc<TwoPhaseOffer>>,
    sink: Option<oneshot::Sender<Result<T, ChannelError>>>,
    pub(crate) triggers: Triggers,
}

impl<T> ReadWaiter<T> {
    pub fn new(
        offer: Option<Arc<TwoPhaseOffer>>,
    ) -> (Self, oneshot::Receiver<Result<T, ChannelError>>) {
        let (tx, rx) = oneshot::channel();
        (
            ReadWaiter {
                request_id: RequestId::next(),
                offer,
                sink: Some(tx),
                triggers: Triggers::none(),
            },
            rx,
        )
    }

    /// Completes the request exactly once. Returns `false` if it was already
    /// completed through another path.
    pub fn complete(&mut self, result: Result<T, ChannelError>) -> bool {
        self.triggers.disarm();
        match self.sink.take() {
            Some(sink) => sink.send(result).is_ok(),
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.sink.is_some()
    }
}

impl<T> QueueEntry for ReadWaiter<T> {
    fn id(&self) -> RequestId {
        self.request_id
    }
}

impl<T> fmt::Debug for ReadWaiter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadWaiter")
            .field("request_id", &self.request_id)
            .field("has_offer", &self.offer.is_some())
            .finish()
    }
}

/// A Write that could not complete synchronously.
pub struct WriteWaiter<T> {
    pub request_id: RequestId,
    pub offer: Option<Arc<TwoPhaseOffer>>,
    pub value: Option<T>,
    sink: Option<oneshot::Sender<Result<(), ChannelError>>>,
    pub(crate) triggers: Triggers,
}

impl<T> WriteWaiter<T> {
    pub fn new(
        value: T,
        offer: Option<Arc<TwoPhaseOffer>>,
    ) -> (Self, oneshot::Receiver<Result<(), ChannelError>>) {
        let (tx, rx) = oneshot::channel();
        (
            WriteWaiter {
                request_id: RequestId::next(),
                offer,
                value: Some(value),
                sink: Some(tx),
                triggers: Triggers::none(),
            },
            rx,
        )
    }

    pub fn complete(&mut self, result: Result<(), ChannelError>) -> bool {
        self.triggers.disarm();
        match self.sink.take() {
            Some(sink) => sink.send(result).is_ok(),
            None => false,
        }
    }

    /// Completes with an error, returning the unsent value to the caller —
    /// used by overflow eviction, which hands the value back via
    /// [`crate::error::TrySendError`]-shaped paths where applicable.
    pub fn take_value(&mut self) -> Option<T> {
        self.value.take()
    }

    pub fn is_pending(&self) -> bool {
        self.sink.is_some()
    }
}

impl<T> QueueEntry for WriteWaiter<T> {
    fn id(&self) -> RequestId {
        self.request_id
    }
}

impl<T> fmt::Debug for WriteWaiter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteWaiter")
            .field("request_id", &self.request_id)
            .field("has_offer", &self.offer.is_some())
            .finish()
    }
}

/// Convenience: a deadline expressed as "now + duration".
pub fn deadline_in(duration: Duration) -> Instant {
    Instant::now() + duration
}
