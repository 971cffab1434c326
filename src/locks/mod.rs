//! Mutual-exclusion primitives under test
//!
//! Every algorithm implements the [`Lock`] capability: infallible
//! `acquire`/`release` with a release→acquire happens-before edge between
//! an unlock and the next lock. The `wid` argument is the caller's dense
//! worker id; queue locks use it to index a flat per-worker node array,
//! the rest ignore it.

pub mod mcs;
pub mod mutex;
pub mod tas;
pub mod ticket;
pub mod ticket_backoff;

use std::sync::Arc;

pub use mcs::{McsLock, McsLockPreLoad};
pub use mutex::MutexLock;
pub use tas::{TasSpinlock, TasSpinlockPreLoad};
pub use ticket::{TicketLock, TicketLockPreLoad};
pub use ticket_backoff::{TicketLockAdaptive, TicketLockBackOff, TicketLockBackOffPrefetch};

/// Dense worker id in `[0, max_workers)`.
pub type WorkerId = usize;

/// Mutual-exclusion capability.
///
/// Contract:
/// - at most one worker is between a returned `acquire` and the matching
///   `release`;
/// - each `release` is preceded by a matching `acquire` on the same
///   worker, and acquires never nest;
/// - `release` publishes all prior writes to the next acquirer.
pub trait Lock: Send + Sync {
    fn acquire(&self, wid: WorkerId);
    fn release(&self, wid: WorkerId);
    fn name(&self) -> &'static str;
}

/// Supported lock algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockKind {
    /// OS mutex baseline (the only blocking variant)
    Mutex,
    /// Test-and-set spinlock
    Tas,
    /// Test-and-test-and-set: plain-load before each RMW attempt
    TasPreLoad,
    /// Fair FIFO ticket lock
    Ticket,
    /// Ticket lock that only takes a ticket when the queue is empty
    TicketPreLoad,
    /// Ticket lock with proportional back-off
    TicketBackOff,
    /// Proportional back-off plus write-prefetch hints
    TicketBackOffPrefetch,
    /// Ticket lock with a capped piecewise pause schedule
    TicketAdaptive,
    /// MCS queue lock (local spinning)
    Mcs,
    /// MCS without queueing: CAS the tail only when it is observed null
    McsPreLoad,
}

impl LockKind {
    /// Every kind, in report order.
    pub const ALL: [LockKind; 10] = [
        Self::Mutex,
        Self::Tas,
        Self::TasPreLoad,
        Self::Ticket,
        Self::TicketPreLoad,
        Self::TicketBackOff,
        Self::TicketBackOffPrefetch,
        Self::TicketAdaptive,
        Self::Mcs,
        Self::McsPreLoad,
    ];

    /// Parse a lock kind from string (case-insensitive, `-`/`_` both accepted)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "mutex" => Some(Self::Mutex),
            "tas" => Some(Self::Tas),
            "tas_preload" | "tas_pre_load" => Some(Self::TasPreLoad),
            "ticket" => Some(Self::Ticket),
            "ticket_preload" | "ticket_pre_load" => Some(Self::TicketPreLoad),
            "ticket_backoff" | "ticket_back_off" => Some(Self::TicketBackOff),
            "ticket_backoff_prefetch" | "ticket_back_off_prefetch" => {
                Some(Self::TicketBackOffPrefetch)
            }
            "ticket_adaptive" => Some(Self::TicketAdaptive),
            "mcs" => Some(Self::Mcs),
            "mcs_preload" | "mcs_pre_load" => Some(Self::McsPreLoad),
            _ => None,
        }
    }

    /// Stable identifier used in reports and the CSV contract
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mutex => "mutex",
            Self::Tas => "tas",
            Self::TasPreLoad => "tas_preload",
            Self::Ticket => "ticket",
            Self::TicketPreLoad => "ticket_preload",
            Self::TicketBackOff => "ticket_backoff",
            Self::TicketBackOffPrefetch => "ticket_backoff_prefetch",
            Self::TicketAdaptive => "ticket_adaptive",
            Self::Mcs => "mcs",
            Self::McsPreLoad => "mcs_preload",
        }
    }

    /// Construct a lock instance sized for `max_workers`.
    pub fn build(&self, max_workers: usize) -> Arc<dyn Lock> {
        match self {
            Self::Mutex => Arc::new(MutexLock::new()),
            Self::Tas => Arc::new(TasSpinlock::new()),
            Self::TasPreLoad => Arc::new(TasSpinlockPreLoad::new()),
            Self::Ticket => Arc::new(TicketLock::new()),
            Self::TicketPreLoad => Arc::new(TicketLockPreLoad::new()),
            Self::TicketBackOff => Arc::new(TicketLockBackOff::new()),
            Self::TicketBackOffPrefetch => Arc::new(TicketLockBackOffPrefetch::new()),
            Self::TicketAdaptive => Arc::new(TicketLockAdaptive::new()),
            Self::Mcs => Arc::new(McsLock::new(max_workers)),
            Self::McsPreLoad => Arc::new(McsLockPreLoad::new(max_workers)),
        }
    }

    /// Whether acquisitions complete in FIFO order of arrival.
    ///
    /// The pre-load variants trade this away to cut write pressure on the
    /// shared word; `tas` never had it; the OS mutex makes no ordering
    /// promise either.
    pub fn is_fifo_fair(&self) -> bool {
        matches!(
            self,
            Self::Ticket
                | Self::TicketBackOff
                | Self::TicketBackOffPrefetch
                | Self::TicketAdaptive
                | Self::Mcs
        )
    }
}

impl std::fmt::Display for LockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// RAII guard over a [`Lock`] for a fixed worker id.
///
/// The measurement loop calls `acquire`/`release` directly; this exists
/// for tests and external callers that want unwind safety.
pub struct LockGuard<'a> {
    lock: &'a dyn Lock,
    wid: WorkerId,
}

impl<'a> LockGuard<'a> {
    pub fn new(lock: &'a dyn Lock, wid: WorkerId) -> Self {
        lock.acquire(wid);
        Self { lock, wid }
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.lock.release(self.wid);
    }
}
