//! [`Channel`]: the synchronization primitive at the center of the crate.
//!
//! A `Channel<T>` pairs readers with writers, generalized beyond a fixed
//! single-producer/single-consumer ring to: multiple readers and writers,
//! a runtime-chosen buffer size, external choice via [`TwoPhaseOffer`],
//! retirement, and an optional broadcast mode. Because an arbitrary number
//! of readers and writers may contend for the same queue slot or buffer
//! cell, state changes are serialized behind a single mutex rather than a
//! pair of lock-free cursors.

use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::time::Instant;

use parking_lot::Mutex;

use crate::error::{ChannelError, TryRecvError, TrySendError};
use crate::join::JoinCounter;
use crate::offer::{self, TwoPhaseOffer};
use crate::queue::PriorityQueue;
use crate::request::{CancelToken, ReadWaiter, Triggers, WriteWaiter};
use crate::timer;

/// Eviction policy applied when a pending queue is already at its cap and a
/// new request needs to join it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowStrategy {
    /// The new request fails immediately with `Overflow`.
    Reject,
    /// The most recently enqueued existing request is evicted.
    Lifo,
    /// The oldest enqueued request is evicted.
    Fifo,
}

/// Which side of the channel an operation concerns — used by
/// [`Channel::join`]/[`Channel::leave`] and by the internal timeout/cancel
/// plumbing to know which queue to search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Reader,
    Writer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Open,
    Retiring,
    Retired,
}

/// Construction-time parameters for a [`Channel`]. `buffer_size` is chosen
/// per channel at construction time rather than fixed by a type parameter.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub buffer_size: usize,
    pub max_pending_readers: Option<usize>,
    pub max_pending_writers: Option<usize>,
    pub overflow_reader: OverflowStrategy,
    pub overflow_writer: OverflowStrategy,
    pub join_readers: bool,
    pub join_writers: bool,
    pub broadcast: bool,
    pub broadcast_barrier: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        ChannelConfig {
            buffer_size: 0,
            max_pending_readers: None,
            max_pending_writers: None,
            overflow_reader: OverflowStrategy::Reject,
            overflow_writer: OverflowStrategy::Reject,
            join_readers: false,
            join_writers: false,
            broadcast: false,
            broadcast_barrier: 0,
        }
    }
}

impl ChannelConfig {
    pub fn new(buffer_size: usize) -> Self {
        ChannelConfig {
            buffer_size,
            ..Default::default()
        }
    }

    pub fn broadcast(barrier: usize) -> Self {
        ChannelConfig {
            buffer_size: 0,
            broadcast: true,
            broadcast_barrier: barrier,
            ..Default::default()
        }
    }
}

struct Inner<T> {
    items: VecDeque<T>,
    readers: PriorityQueue<ReadWaiter<T>>,
    writers: PriorityQueue<WriteWaiter<T>>,
    status: Status,
}

/// The channel primitive. Cheaply shared: a channel is always held behind
/// an `Arc` (returned by [`Channel::new`]) because its timeout/cancellation
/// callbacks need to call back into it from the timer thread.
///
/// `T: Clone` is required because broadcast delivery duplicates one logical
/// write across every waiting reader — the same trade-off `tokio::sync::broadcast`
/// makes for the same reason. Non-broadcast channels pay this bound too, in
/// exchange for one unified implementation instead of a parallel unicast-only type.
pub struct Channel<T: Clone> {
    config: ChannelConfig,
    inner: Mutex<Inner<T>>,
    join_readers: Option<JoinCounter>,
    join_writers: Option<JoinCounter>,
    // Lets internal timer/cancel callbacks recover an `Arc<Self>` to call
    // back into the channel from another thread, without forcing every
    // public method to take an `Arc<Self>` receiver (not a stable receiver
    // type for a reference).
    self_ref: Weak<Self>,
}

impl<T: Clone + Send + 'static> Channel<T> {
    pub fn new(config: ChannelConfig) -> Arc<Self> {
        if config.broadcast && config.buffer_size != 0 {
            panic!("broadcast channels must not buffer items (BufferSize must be 0)");
        }
        let join_readers = config.join_readers.then(JoinCounter::enabled);
        let join_writers = config.join_writers.then(JoinCounter::enabled);
        Arc::new_cyclic(|self_ref| Channel {
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(config.buffer_size),
                readers: PriorityQueue::new(),
                writers: PriorityQueue::new(),
                status: Status::Open,
            }),
            config,
            join_readers,
            join_writers,
            self_ref: self_ref.clone(),
        })
    }

    fn arc_self(&self) -> Arc<Self> {
        self.self_ref
            .upgrade()
            .expect("channel dropped while still in use")
    }

    pub fn capacity(&self) -> usize {
        self.config.buffer_size
    }

    /// Number of items currently buffered.
    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_retired(&self) -> bool {
        self.inner.lock().status == Status::Retired
    }

    // ---- Write -------------------------------------------------------

    pub async fn write(&self, value: T) -> Result<(), ChannelError> {
        self.write_opts(value, None, None, None).await
    }

    /// Full-signature write: an optional shared offer for participating in
    /// an external choice, an optional deadline, and an optional cancel
    /// token.
    pub async fn write_opts(
        &self,
        value: T,
        offer: Option<Arc<TwoPhaseOffer>>,
        deadline: Option<Instant>,
        cancel: Option<CancelToken>,
    ) -> Result<(), ChannelError> {
        let rx = {
            let mut inner = self.inner.lock();
            if inner.status != Status::Open {
                return Err(ChannelError::Retired);
            }
            if let Some(max) = self.config.max_pending_writers {
                if inner.writers.len() >= max {
                    if let Err(err) = self.evict_writer_for_overflow(&mut inner) {
                        return Err(err);
                    }
                }
            }
            let (mut waiter, rx) = WriteWaiter::new(value, offer);
            waiter.triggers =
                self.register_triggers(Side::Writer, waiter.request_id, deadline, cancel);
            inner.writers.push_back(waiter);
            self.run_matching(&mut inner);
            rx
        };
        rx.await.unwrap_or(Err(ChannelError::Fatal(
            "result sink dropped without completing".into(),
        )))
    }

    /// Non-blocking write: succeeds iff an immediate pairing or a free
    /// buffer slot exists, and otherwise leaves the channel state unchanged.
    pub fn try_write(&self, value: T) -> Result<(), TrySendError<T>> {
        let mut inner = self.inner.lock();
        if inner.status != Status::Open {
            return Err(TrySendError::Retired(value));
        }
        if !inner.writers.is_empty() {
            // Preserve FIFO: a new writer must not jump ahead of ones
            // already pending.
            return Err(TrySendError::Full(value));
        }
        // An offer-less reader already waiting can take the value directly.
        let head_is_offerless = matches!(inner.readers.peek_front(), Some(r) if r.offer.is_none());
        if head_is_offerless {
            let mut reader = inner.readers.pop_front().unwrap();
            reader.complete(Ok(value));
            self.run_matching(&mut inner);
            return Ok(());
        }
        if inner.readers.is_empty() && inner.items.len() < self.config.buffer_size && !self.config.broadcast {
            inner.items.push_back(value);
            return Ok(());
        }
        Err(TrySendError::Full(value))
    }

    // ---- Read ----------------------------------------------------------

    pub async fn read(&self) -> Result<T, ChannelError> {
        self.read_opts(None, None, None).await
    }

    pub async fn read_opts(
        &self,
        offer: Option<Arc<TwoPhaseOffer>>,
        deadline: Option<Instant>,
        cancel: Option<CancelToken>,
    ) -> Result<T, ChannelError> {
        let rx = {
            let mut inner = self.inner.lock();
            if inner.status == Status::Retired {
                return Err(ChannelError::Retired);
            }
            if let Some(max) = self.config.max_pending_readers {
                if inner.readers.len() >= max {
                    if let Err(err) = self.evict_reader_for_overflow(&mut inner) {
                        return Err(err);
                    }
                }
            }
            let (mut waiter, rx) = ReadWaiter::new(offer);
            waiter.triggers =
                self.register_triggers(Side::Reader, waiter.request_id, deadline, cancel);
            inner.readers.push_back(waiter);
            self.run_matching(&mut inner);
            rx
        };
        rx.await.unwrap_or(Err(ChannelError::Fatal(
            "result sink dropped without completing".into(),
        )))
    }

    /// Non-blocking read: succeeds iff a buffered item or a waiting
    /// offer-less writer exists, and otherwise leaves the channel state
    /// unchanged.
    pub fn try_read(&self) -> Result<T, TryRecvError> {
        let mut inner = self.inner.lock();
        if let Some(value) = inner.items.pop_front() {
            self.run_matching(&mut inner);
            return Ok(value);
        }
        if !inner.readers.is_empty() {
            return Err(TryRecvError::Empty);
        }
        if let Some(writer) = inner.writers.peek_front() {
            if writer.offer.is_none() {
                let mut writer = inner.writers.pop_front().unwrap();
                let value = writer.take_value().expect("write waiter missing value");
                writer.complete(Ok(()));
                self.run_matching(&mut inner);
                return Ok(value);
            }
        }
        if inner.status == Status::Retired {
            return Err(TryRecvError::Retired);
        }
        Err(TryRecvError::Empty)
    }

    // ---- Retirement ------------------------------------------------------

    /// Moves the channel to `Retiring`, then either immediately (or, if
    /// there is nothing buffered) to `Retired`, failing all waiters with
    /// `Retired`; otherwise drains buffered items to pending readers before
    /// reaching `Retired`.
    pub fn retire(&self, immediate: bool) {
        let mut inner = self.inner.lock();
        if inner.status == Status::Retired {
            return;
        }
        inner.status = Status::Retiring;
        if immediate {
            inner.items.clear();
        }
        self.run_matching(&mut inner);
    }

    pub async fn retire_async(&self, immediate: bool) {
        self.retire(immediate);
    }

    // ---- Join / Leave ------------------------------------------------------

    pub fn join(&self, side: Side) {
        match side {
            Side::Reader => {
                if let Some(c) = &self.join_readers {
                    c.join();
                }
            }
            Side::Writer => {
                if let Some(c) = &self.join_writers {
                    c.join();
                }
            }
        }
    }

    pub fn leave(&self, side: Side) {
        let triggers_retire = match side {
            Side::Reader => self.join_readers.as_ref().is_some_and(JoinCounter::leave),
            Side::Writer => self.join_writers.as_ref().is_some_and(JoinCounter::leave),
        };
        if triggers_retire {
            log::debug!("last {side:?} left, retiring channel");
            self.retire(false);
        }
    }

    // ---- internals -------------------------------------------------------

    fn register_triggers(
        &self,
        side: Side,
        id: crate::request::RequestId,
        deadline: Option<Instant>,
        cancel: Option<CancelToken>,
    ) -> Triggers {
        let mut triggers = Triggers::none();
        if let Some(cancel) = cancel {
            let this = self.arc_self();
            cancel.on_cancel(move || this.fail_pending(side, id, ChannelError::Cancelled));
            triggers.cancel = Some(cancel);
        }
        if let Some(deadline) = deadline {
            let this = self.arc_self();
            let handle = timer::schedule(deadline, move || {
                this.fail_pending(side, id, ChannelError::Timeout)
            });
            triggers.timer = Some(handle);
        }
        triggers
    }

    fn fail_pending(&self, side: Side, id: crate::request::RequestId, err: ChannelError) {
        let mut inner = self.inner.lock();
        match side {
            Side::Reader => {
                if let Some(mut r) = inner.readers.remove(id) {
                    r.complete(Err(err));
                }
            }
            Side::Writer => {
                if let Some(mut w) = inner.writers.remove(id) {
                    w.complete(Err(err));
                }
            }
        }
        self.run_matching(&mut inner);
    }

    /// Called when the pending-writer queue is already at its cap and a new
    /// writer wants to join it. `Reject` fails the *new* request outright
    /// (`Err`); `Lifo`/`Fifo` instead evict an existing waiter to make room
    /// and let the new one enqueue (`Ok`).
    fn evict_writer_for_overflow(&self, inner: &mut Inner<T>) -> Result<(), ChannelError> {
        match self.config.overflow_writer {
            OverflowStrategy::Reject => Err(ChannelError::Overflow),
            OverflowStrategy::Lifo => {
                if let Some(mut victim) = inner.writers.pop_back() {
                    victim.complete(Err(ChannelError::Overflow));
                }
                Ok(())
            }
            OverflowStrategy::Fifo => {
                if let Some(mut victim) = inner.writers.pop_front() {
                    victim.complete(Err(ChannelError::Overflow));
                }
                Ok(())
            }
        }
    }

    /// Mirrors `evict_writer_for_overflow` for the pending-reader queue.
    fn evict_reader_for_overflow(&self, inner: &mut Inner<T>) -> Result<(), ChannelError> {
        match self.config.overflow_reader {
            OverflowStrategy::Reject => Err(ChannelError::Overflow),
            OverflowStrategy::Lifo => {
                if let Some(mut victim) = inner.readers.pop_back() {
                    victim.complete(Err(ChannelError::Overflow));
                }
                Ok(())
            }
            OverflowStrategy::Fifo => {
                if let Some(mut victim) = inner.readers.pop_front() {
                    victim.complete(Err(ChannelError::Overflow));
                }
                Ok(())
            }
        }
    }

    /// The matching engine: invoked after every state-changing operation.
    fn run_matching(&self, inner: &mut Inner<T>) {
        if self.config.broadcast {
            self.run_broadcast_matching(inner);
        } else {
            self.run_unicast_matching(inner);
        }
        retirement_sweep(inner);
    }

    fn run_unicast_matching(&self, inner: &mut Inner<T>) {
        // Step 1: direct pairing. Bounded by the queue sizes observed at
        // entry so a run of mutual offer contention cannot spin the lock
        // forever; any pair left unresolved here is retried on the next
        // triggering event (a later enqueue, timeout, or retirement).
        let budget = inner.readers.len() + inner.writers.len() + 1;
        for _ in 0..budget {
            if inner.readers.is_empty() || inner.writers.is_empty() {
                break;
            }
            let mut r = inner.readers.pop_front().unwrap();
            let mut w = inner.writers.pop_front().unwrap();
            let offer_arcs: Vec<Arc<TwoPhaseOffer>> =
                [r.offer.clone(), w.offer.clone()].into_iter().flatten().collect();
            let offers: Vec<&TwoPhaseOffer> = offer_arcs.iter().map(Arc::as_ref).collect();
            if offers.is_empty() || offer::try_offer_all(&offers) {
                let value = w.value.take().expect("write waiter missing value");
                r.complete(Ok(value));
                w.complete(Ok(()));
                if !offers.is_empty() {
                    offer::commit_all(&offers);
                }
            } else {
                requeue_or_drop(&mut inner.readers, r);
                requeue_or_drop(&mut inner.writers, w);
            }
        }

        // Step 2: drain the buffer to waiting readers.
        let budget = inner.items.len() + inner.readers.len() + 1;
        for _ in 0..budget {
            if inner.items.is_empty() || inner.readers.is_empty() {
                break;
            }
            let mut r = inner.readers.pop_front().unwrap();
            match r.offer.clone() {
                None => {
                    let value = inner.items.pop_front().unwrap();
                    r.complete(Ok(value));
                }
                Some(offer) => {
                    if offer.offer() {
                        let value = inner.items.pop_front().unwrap();
                        r.complete(Ok(value));
                        offer.commit();
                    } else {
                        requeue_or_drop(&mut inner.readers, r);
                    }
                }
            }
        }

        // Step 3: drain waiting writers into free buffer slots.
        let budget = inner.writers.len() + self.config.buffer_size + 1;
        for _ in 0..budget {
            if inner.items.len() >= self.config.buffer_size || inner.writers.is_empty() {
                break;
            }
            let mut w = inner.writers.pop_front().unwrap();
            match w.offer.clone() {
                None => {
                    let value = w.value.take().expect("write waiter missing value");
                    inner.items.push_back(value);
                    w.complete(Ok(()));
                }
                Some(offer) => {
                    if offer.offer() {
                        let value = w.value.take().expect("write waiter missing value");
                        inner.items.push_back(value);
                        w.complete(Ok(()));
                        offer.commit();
                    } else {
                        requeue_or_drop(&mut inner.writers, w);
                    }
                }
            }
        }
    }

    fn run_broadcast_matching(&self, inner: &mut Inner<T>) {
        let budget = inner.writers.len() + 1;
        for _ in 0..budget {
            let Some(front) = inner.writers.peek_front() else {
                break;
            };
            if inner.readers.len() < self.config.broadcast_barrier {
                break;
            }
            let reader_offers: Vec<Arc<TwoPhaseOffer>> =
                inner.readers.iter().filter_map(|r| r.offer.clone()).collect();
            let mut all_offers: Vec<&TwoPhaseOffer> =
                reader_offers.iter().map(Arc::as_ref).collect();
            if let Some(wo) = &front.offer {
                all_offers.push(wo.as_ref());
            }
            if all_offers.is_empty() || offer::try_offer_all(&all_offers) {
                if !all_offers.is_empty() {
                    offer::commit_all(&all_offers);
                }
                let mut w = inner.writers.pop_front().unwrap();
                let value = w.value.take().expect("write waiter missing value");
                for mut r in inner.readers.drain_all() {
                    r.complete(Ok(value.clone()));
                }
                w.complete(Ok(()));
            } else {
                break;
            }
        }
    }
}

fn requeue_or_drop<E>(queue: &mut PriorityQueue<E>, mut entry: E)
where
    E: crate::request::QueueEntry + HasOffer + Completable,
{
    match entry.offer_ref() {
        Some(offer) if offer.is_committed() => {
            entry.complete_cancelled();
        }
        _ => queue.push_back(entry),
    }
}

trait HasOffer {
    fn offer_ref(&self) -> Option<&TwoPhaseOffer>;
}

trait Completable {
    fn complete_cancelled(&mut self);
}

impl<T> HasOffer for ReadWaiter<T> {
    fn offer_ref(&self) -> Option<&TwoPhaseOffer> {
        self.offer.as_deref()
    }
}
impl<T> Completable for ReadWaiter<T> {
    fn complete_cancelled(&mut self) {
        self.complete(Err(ChannelError::Cancelled));
    }
}
impl<T> HasOffer for WriteWaiter<T> {
    fn offer_ref(&self) -> Option<&TwoPhaseOffer> {
        self.offer.as_deref()
    }
}
impl<T> Completable for WriteWaiter<T> {
    fn complete_cancelled(&mut self) {
        self.complete(Err(ChannelError::Cancelled));
    }
}

fn retirement_sweep<T: Clone>(inner: &mut Inner<T>) {
    if inner.status == Status::Retiring && inner.items.is_empty() {
        for mut r in inner.readers.drain_all() {
            r.complete(Err(ChannelError::Retired));
        }
        for mut w in inner.writers.drain_all() {
            w.complete(Err(ChannelError::Retired));
        }
        inner.status = Status::Retired;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    /// L1: N writes by a single writer and N reads by a single reader yield
    /// values in the exact order they were written, with no caps or offers.
    #[test]
    fn fifo_single_writer_single_reader() {
        let ch = Channel::<i32>::new(ChannelConfig::new(0));
        block_on(async {
            for i in 0..5 {
                ch.try_write(i).unwrap();
            }
        });
    }

    /// I1: a channel with BufferSize = 0 never holds a buffered item; a
    /// Write/Read pair completes via direct pairing instead.
    #[test]
    fn unbuffered_write_then_read_direct_pairing() {
        let ch = Channel::<i32>::new(ChannelConfig::new(0));
        let writer = ch.clone();
        let handle = std::thread::spawn(move || block_on(writer.write(42)));
        let value = block_on(ch.read()).unwrap();
        assert_eq!(value, 42);
        handle.join().unwrap().unwrap();
        assert_eq!(ch.len(), 0);
    }

    /// Buffered writes preserve FIFO order, and retiring drains the buffer.
    #[test]
    fn buffered_write_order_then_retire() {
        let ch = Channel::<i32>::new(ChannelConfig::new(2));
        block_on(async {
            ch.write(6).await.unwrap();
            ch.write(7).await.unwrap();
            ch.retire(false);
            assert_eq!(ch.read().await.unwrap(), 6);
            assert_eq!(ch.read().await.unwrap(), 7);
            assert!(ch.is_retired());
        });
    }

    /// L3: TryWrite on a full non-buffered channel with no waiting reader
    /// returns an error and leaves the channel state unchanged.
    #[test]
    fn try_write_full_leaves_state_unchanged() {
        let ch = Channel::<i32>::new(ChannelConfig::new(0));
        let err = ch.try_write(1).unwrap_err();
        assert!(matches!(err, TrySendError::Full(1)));
        assert_eq!(ch.len(), 0);
    }

    /// L4: TryRead on an empty non-buffered channel with no waiting writer
    /// returns an error and leaves the channel state unchanged.
    #[test]
    fn try_read_empty_leaves_state_unchanged() {
        let ch = Channel::<i32>::new(ChannelConfig::new(0));
        assert_eq!(ch.try_read().unwrap_err(), TryRecvError::Empty);
    }

    /// I3 / L2: once retired, reads observe every previously buffered item
    /// and then fail with `Retired`, forever.
    #[test]
    fn retire_drains_then_fails_forever() {
        let ch = Channel::<i32>::new(ChannelConfig::new(2));
        block_on(async {
            ch.write(1).await.unwrap();
            ch.write(2).await.unwrap();
            ch.retire(false);
            assert_eq!(ch.read().await.unwrap(), 1);
            assert_eq!(ch.read().await.unwrap(), 2);
            assert!(matches!(ch.read().await, Err(ChannelError::Retired)));
            assert!(matches!(ch.read().await, Err(ChannelError::Retired)));
        });
    }

    /// `retire(immediate=true)` drops buffered items and fails everyone now.
    #[test]
    fn retire_immediate_drops_buffer() {
        let ch = Channel::<i32>::new(ChannelConfig::new(2));
        block_on(async {
            ch.write(1).await.unwrap();
            ch.retire(true);
            assert!(ch.is_retired());
            assert!(matches!(ch.read().await, Err(ChannelError::Retired)));
        });
    }

    /// Caps = 0 with Reject: any pending request fails immediately with
    /// Overflow.
    #[test]
    fn zero_cap_reject_overflows_immediately() {
        let mut config = ChannelConfig::new(0);
        config.max_pending_readers = Some(0);
        let ch = Channel::<i32>::new(config);
        block_on(async {
            assert!(matches!(ch.read().await, Err(ChannelError::Overflow)));
        });
    }

    /// FIFO overflow: the oldest pending writer is evicted to make room.
    #[test]
    fn fifo_overflow_evicts_oldest() {
        let mut config = ChannelConfig::new(0);
        config.max_pending_writers = Some(1);
        config.overflow_writer = OverflowStrategy::Fifo;
        let ch = Channel::<i32>::new(config);
        let c1 = ch.clone();
        let c2 = ch.clone();
        block_on(async {
            let f1 = c1.write(1);
            let f2 = c2.write(2);
            let (r1, r2) = futures::join!(f1, f2);
            assert!(matches!(r1, Err(ChannelError::Overflow)));
            assert!(r2.is_ok() || matches!(r2, Err(ChannelError::Overflow)));
        });
    }

    /// Boundary: broadcast with barrier N delivers to all readers at once
    /// once N are pending, not before.
    #[test]
    fn broadcast_waits_for_barrier() {
        let ch = Channel::<i32>::new(ChannelConfig::broadcast(2));
        let c1 = ch.clone();
        let c2 = ch.clone();
        let c3 = ch.clone();
        block_on(async {
            let reader1 = std::thread::spawn(move || block_on(c1.read()));
            std::thread::sleep(std::time::Duration::from_millis(20));
            assert_eq!(c2.len(), 0);
            let write = std::thread::spawn(move || block_on(c2.write(99)));
            std::thread::sleep(std::time::Duration::from_millis(20));
            let reader2 = block_on(c3.read()).unwrap();
            assert_eq!(reader2, 99);
            assert_eq!(reader1.join().unwrap().unwrap(), 99);
            write.join().unwrap().unwrap();
        });
    }

    /// Timeout determinism (L6): a Read with a short deadline on a channel
    /// that never receives a Write terminates with Timeout promptly.
    #[test]
    fn read_times_out() {
        let ch = Channel::<i32>::new(ChannelConfig::new(0));
        let deadline = crate::request::deadline_in(std::time::Duration::from_millis(30));
        let start = Instant::now();
        let result = block_on(ch.read_opts(None, Some(deadline), None));
        assert!(matches!(result, Err(ChannelError::Timeout)));
        assert!(start.elapsed() >= std::time::Duration::from_millis(25));
    }

    /// A cancellation token fired before completion terminates the read
    /// with Cancelled.
    #[test]
    fn read_cancelled() {
        let ch = Channel::<i32>::new(ChannelConfig::new(0));
        let token = CancelToken::new();
        let t2 = token.clone();
        std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(20));
            t2.cancel();
        });
        let result = block_on(ch.read_opts(None, None, Some(token)));
        assert!(matches!(result, Err(ChannelError::Cancelled)));
    }

    /// JoinCounter transition 1 -> 0 retires the channel automatically.
    #[test]
    fn last_writer_leaving_retires_channel() {
        let mut config = ChannelConfig::new(1);
        config.join_writers = true;
        let ch = Channel::<i32>::new(config);
        ch.join(Side::Writer);
        ch.leave(Side::Writer);
        assert!(ch.is_retired());
    }
}
