//! [`JoinCounter`]: optional participant tracking that auto-retires a
//! channel when the last reader or the last writer leaves.
//!
//! Cache-padded with `crossbeam_utils::CachePadded` since `Join`/`Leave` are
//! on the hot path of any long-running process network, contended by every
//! participant the way a producer/consumer cursor pair is.

use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicI64, Ordering};

/// Tracks announced participants on one side (readers or writers) of a
/// channel. `disabled()` counters are a permanent no-op: join tracking is
/// off and retirement stays explicit.
pub struct JoinCounter {
    count: CachePadded<AtomicI64>,
    enabled: bool,
}

impl JoinCounter {
    pub fn enabled() -> Self {
        JoinCounter {
            count: CachePadded::new(AtomicI64::new(0)),
            enabled: true,
        }
    }

    pub fn disabled() -> Self {
        JoinCounter {
            count: CachePadded::new(AtomicI64::new(0)),
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn current(&self) -> i64 {
        self.count.load(Ordering::Acquire)
    }

    /// Increments the count. No-op if tracking is disabled.
    pub fn join(&self) {
        if self.enabled {
            self.count.fetch_add(1, Ordering::AcqRel);
        }
    }

    /// Decrements the count. Returns `true` iff this call observed the
    /// 1 -> 0 transition with tracking enabled (the caller should retire the
    /// channel). Going from 0 to -1 with tracking disabled never happens
    /// since `join`/`leave` are no-ops in that mode; going from 0 to -1 with
    /// tracking enabled (an unmatched `leave`) clamps at 0 and never
    /// triggers.
    pub fn leave(&self) -> bool {
        if !self.enabled {
            return false;
        }
        loop {
            let current = self.count.load(Ordering::Acquire);
            if current <= 0 {
                return false;
            }
            let next = current - 1;
            if self
                .count
                .compare_exchange(current, next, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return next == 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A disabled counter never reports the 1 -> 0 transition.
    #[test]
    fn disabled_counter_never_triggers() {
        let c = JoinCounter::disabled();
        c.join();
        assert!(!c.leave());
    }

    /// Leaving with no prior join has no effect.
    #[test]
    fn leave_without_join_has_no_effect() {
        let c = JoinCounter::enabled();
        assert!(!c.leave());
        assert_eq!(c.current(), 0);
    }

    /// The last leave (count 1 -> 0) reports true; earlier ones report false.
    #[test]
    fn last_leave_triggers() {
        let c = JoinCounter::enabled();
        c.join();
        c.join();
        c.join();
        assert!(!c.leave());
        assert!(!c.leave());
        assert!(c.leave());
        assert_eq!(c.current(), 0);
    }
}
