//! A minimal deadline scheduler for [`crate::request::PendingRequest`] timeouts.
//!
//! The crate is runtime-agnostic (it is built on `futures` primitives, not
//! tokio), so deadlines cannot be expressed as `tokio::time::sleep`. Instead
//! a single background thread holds a min-heap of `(Instant, callback)`
//! pairs and fires each callback once its instant elapses. This keeps
//! timeout handling out of whatever executor is polling the channel's
//! futures.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, OnceLock};
use std::time::Instant;

/// Opaque handle returned by [`schedule`], used to cancel a still-pending timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TimerHandle(u64);

struct Entry {
    deadline: Instant,
    id: u64,
    callback: Option<Box<dyn FnOnce() + Send>>,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.id == other.id
    }
}
impl Eq for Entry {}
impl Ord for Entry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // BinaryHeap is a max-heap; we want the earliest deadline on top.
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.id.cmp(&self.id))
    }
}
impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

struct Wheel {
    heap: Mutex<BinaryHeap<Entry>>,
    cond: Condvar,
}

static WHEEL: OnceLock<&'static Wheel> = OnceLock::new();
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn wheel() -> &'static Wheel {
    *WHEEL.get_or_init(|| {
        let wheel: &'static Wheel = Box::leak(Box::new(Wheel {
            heap: Mutex::new(BinaryHeap::new()),
            cond: Condvar::new(),
        }));
        std::thread::Builder::new()
            .name("rendezvous-timer".into())
            .spawn(move || run(wheel))
            .expect("failed to spawn timer thread");
        wheel
    })
}

fn run(wheel: &'static Wheel) {
    let mut guard = wheel.heap.lock().unwrap();
    loop {
        match guard.peek() {
            None => {
                guard = wheel.cond.wait(guard).unwrap();
            }
            Some(top) => {
                let now = Instant::now();
                if top.deadline <= now {
                    let mut entry = guard.pop().unwrap();
                    let cb = entry.callback.take();
                    drop(guard);
                    if let Some(cb) = cb {
                        cb();
                    }
                    guard = wheel.heap.lock().unwrap();
                } else {
                    let wait = top.deadline - now;
                    let (g, _timeout) = wheel.cond.wait_timeout(guard, wait).unwrap();
                    guard = g;
                }
            }
        }
    }
}

/// Schedules `callback` to run once, at or after `deadline`. The callback is
/// only ever invoked by the timer thread, never by the caller of `schedule`.
pub(crate) fn schedule(deadline: Instant, callback: impl FnOnce() + Send + 'static) -> TimerHandle {
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let w = wheel();
    {
        let mut heap = w.heap.lock().unwrap();
        heap.push(Entry {
            deadline,
            id,
            callback: Some(Box::new(callback)),
        });
    }
    w.cond.notify_all();
    TimerHandle(id)
}

/// Best-effort cancellation: removes the entry if it hasn't fired yet. If the
/// timer already fired (or is about to), this is a harmless no-op — the
/// fired callback itself must be idempotent/guarded (it always is here,
/// since it races `PendingRequest::complete`'s one-shot sink).
pub(crate) fn cancel(handle: TimerHandle) {
    if let Some(w) = WHEEL.get() {
        let mut heap = w.heap.lock().unwrap();
        let retained: Vec<Entry> = heap
            .drain()
            .filter(|e| e.id != handle.0)
            .collect();
        *heap = BinaryHeap::from(retained);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    /// A scheduled callback fires at (or after) its deadline, not before.
    #[test]
    fn fires_after_deadline() {
        let (tx, rx) = mpsc::channel();
        let start = Instant::now();
        schedule(Instant::now() + Duration::from_millis(30), move || {
            tx.send(Instant::now()).unwrap();
        });
        let fired_at = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(fired_at - start >= Duration::from_millis(25));
    }

    /// Cancelling before the deadline prevents the callback from firing.
    #[test]
    fn cancel_prevents_firing() {
        let (tx, rx) = mpsc::channel();
        let handle = schedule(Instant::now() + Duration::from_millis(50), move || {
            tx.send(()).unwrap();
        });
        cancel(handle);
        assert!(rx.recv_timeout(Duration::from_millis(150)).is_err());
    }
}
