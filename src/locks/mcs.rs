//! MCS queue locks
//!
//! Waiters form an intrusive queue through per-worker nodes and each
//! waiter spins only on its own node's `locked` flag, so a handoff is one
//! cache line moving from predecessor to successor instead of every
//! waiter hammering a shared word.
//!
//! Nodes live in a flat array indexed by worker id, sized at
//! construction. One node per (lock, worker): a worker never has more
//! than one outstanding acquisition (no re-entry), so the slot is free by
//! the time it is needed again. Each node is cache-line padded; `next`
//! and `locked` must not share a line with any other worker's state.
//!
//! Node states: Idle -> Enqueued -> Held -> Idle. Every transition is made
//! by the owning worker except `locked := false`, written by the
//! predecessor during handoff.

use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};

use crossbeam_utils::CachePadded;

use super::{Lock, WorkerId};

struct McsNode {
    next: AtomicPtr<McsNode>,
    locked: AtomicBool,
}

impl McsNode {
    fn new() -> Self {
        Self {
            next: AtomicPtr::new(ptr::null_mut()),
            locked: AtomicBool::new(false),
        }
    }
}

fn node_array(max_workers: usize) -> Box<[CachePadded<McsNode>]> {
    (0..max_workers.max(1))
        .map(|_| CachePadded::new(McsNode::new()))
        .collect()
}

/// MCS queue lock.
pub struct McsLock {
    tail: AtomicPtr<McsNode>,
    nodes: Box<[CachePadded<McsNode>]>,
}

impl McsLock {
    /// Create a lock usable by worker ids `0..max_workers`.
    pub fn new(max_workers: usize) -> Self {
        Self {
            tail: AtomicPtr::new(ptr::null_mut()),
            nodes: node_array(max_workers),
        }
    }

    fn node(&self, wid: WorkerId) -> &McsNode {
        &self.nodes[wid]
    }
}

impl Lock for McsLock {
    fn acquire(&self, wid: WorkerId) {
        let me = self.node(wid);
        let me_ptr = (me as *const McsNode).cast_mut();

        me.next.store(ptr::null_mut(), Ordering::Relaxed);
        me.locked.store(true, Ordering::Relaxed);

        let prev = self.tail.swap(me_ptr, Ordering::AcqRel);
        if prev.is_null() {
            // Lock was free; no predecessor will ever clear our flag.
            me.locked.store(false, Ordering::Relaxed);
            return;
        }

        // SAFETY: `prev` points into some worker's node in this lock's
        // array, which lives as long as `self`; the release store makes
        // our node initialisation visible to the predecessor.
        unsafe { (*prev).next.store(me_ptr, Ordering::Release) };
        while me.locked.load(Ordering::Acquire) {
            std::hint::spin_loop();
        }
    }

    fn release(&self, wid: WorkerId) {
        let me = self.node(wid);
        let me_ptr = (me as *const McsNode).cast_mut();

        let mut succ = me.next.load(Ordering::Acquire);
        if succ.is_null() {
            if self
                .tail
                .compare_exchange(me_ptr, ptr::null_mut(), Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                // No successor; fully released.
                return;
            }
            // A successor swapped the tail but has not linked yet.
            loop {
                succ = me.next.load(Ordering::Acquire);
                if !succ.is_null() {
                    break;
                }
                std::hint::spin_loop();
            }
        }

        // SAFETY: `succ` is a live node in this lock's array; the release
        // store hands the critical section to its owner.
        unsafe { (*succ).locked.store(false, Ordering::Release) };
        me.next.store(ptr::null_mut(), Ordering::Relaxed);
    }

    fn name(&self) -> &'static str {
        "mcs"
    }
}

/// MCS without the queue.
///
/// Observes `tail` with plain loads and CASes it from null only, so a
/// held lock sees no writes at all from waiters. There is no linkage and
/// no local-spin flag; the node serves purely as this worker's identity
/// in `tail`. No FIFO order and starvation is possible under heavy
/// contention; the report surfaces per-worker spread for exactly this
/// reason.
pub struct McsLockPreLoad {
    tail: AtomicPtr<McsNode>,
    nodes: Box<[CachePadded<McsNode>]>,
}

impl McsLockPreLoad {
    pub fn new(max_workers: usize) -> Self {
        Self {
            tail: AtomicPtr::new(ptr::null_mut()),
            nodes: node_array(max_workers),
        }
    }

    fn node_ptr(&self, wid: WorkerId) -> *mut McsNode {
        (&*self.nodes[wid] as *const McsNode).cast_mut()
    }
}

impl Lock for McsLockPreLoad {
    fn acquire(&self, wid: WorkerId) {
        let me_ptr = self.node_ptr(wid);
        loop {
            if !self.tail.load(Ordering::Relaxed).is_null() {
                // Held or contended; keep observing without writing.
                std::hint::spin_loop();
                continue;
            }
            if self
                .tail
                .compare_exchange_weak(
                    ptr::null_mut(),
                    me_ptr,
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                )
                .is_ok()
            {
                return;
            }
        }
    }

    fn release(&self, wid: WorkerId) {
        let me_ptr = self.node_ptr(wid);
        let _ = self.tail.compare_exchange(
            me_ptr,
            ptr::null_mut(),
            Ordering::AcqRel,
            Ordering::Relaxed,
        );
    }

    fn name(&self) -> &'static str {
        "mcs_preload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locks::Lock;

    #[test]
    fn test_uncontended_acquire_release() {
        let lock = McsLock::new(1);
        for _ in 0..3 {
            lock.acquire(0);
            lock.release(0);
        }
        assert!(lock.tail.load(Ordering::Relaxed).is_null());
    }

    #[test]
    fn test_preload_uncontended_acquire_release() {
        let lock = McsLockPreLoad::new(1);
        for _ in 0..3 {
            lock.acquire(0);
            lock.release(0);
        }
        assert!(lock.tail.load(Ordering::Relaxed).is_null());
    }

    #[test]
    fn test_nodes_occupy_distinct_cache_lines() {
        let lock = McsLock::new(4);
        let stride = std::mem::size_of::<CachePadded<McsNode>>();
        assert!(stride >= 64);
        for pair in lock.nodes.windows(2) {
            let a = &*pair[0] as *const McsNode as usize;
            let b = &*pair[1] as *const McsNode as usize;
            assert!(b - a >= 64);
        }
    }

    #[test]
    fn test_handoff_between_threads() {
        use std::sync::Arc;

        let lock = Arc::new(McsLock::new(2));
        lock.acquire(0);

        let t = {
            let lock = Arc::clone(&lock);
            std::thread::spawn(move || {
                lock.acquire(1);
                lock.release(1);
            })
        };

        // Give the second worker time to enqueue behind us, then hand off.
        std::thread::sleep(std::time::Duration::from_millis(10));
        lock.release(0);
        t.join().unwrap();
        assert!(lock.tail.load(Ordering::Relaxed).is_null());
    }
}
