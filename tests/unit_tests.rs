//! Unit tests for core kernel modules
//!
//! These tests run on the host (not the embedded target) against the
//! `not(target_arch = "arm")` stub port, exercising the kernel's
//! algorithms without real hardware.

#[cfg(test)]
mod error_tests {
    use rtkernel::error::KernelError;

    #[test]
    fn variants_are_distinct_and_debuggable() {
        assert_eq!(KernelError::Param, KernelError::Param);
        assert_ne!(KernelError::Param, KernelError::Timeout);
        let _ = format!("{:?}", KernelError::QFull);
    }
}

#[cfg(test)]
mod types_tests {
    use rtkernel::types::*;

    #[test]
    fn task_state_equality() {
        assert_eq!(TaskState::Ready, TaskState::Ready);
        assert_ne!(TaskState::Ready, TaskState::Blocked);
        assert_ne!(TaskState::Blocked, TaskState::Deleted);
    }
}

#[cfg(test)]
mod config_tests {
    use rtkernel::config::*;

    #[test]
    fn config_values_are_sane() {
        assert!(PRIO_MAX >= 8, "need at least 8 priority levels");
        assert!(PRIO_MAX <= 256, "priorities must fit a byte-lane bitmap scan");
        assert!(STK_SIZE_MIN >= 32, "stack too small to hold a switch frame");
        assert!(TICK_RATE_HZ >= 10 && TICK_RATE_HZ <= 10_000);
        assert_eq!(PRIO_IDLE as usize, PRIO_MAX - 1);
    }
}

#[cfg(test)]
mod prio_tests {
    use rtkernel::prio::PrioBitmap;

    #[test]
    fn highest_priority_wins() {
        let mut bm = PrioBitmap::new();
        bm.insert(20);
        bm.insert(5);
        bm.insert(10);
        assert_eq!(bm.top_priority(), Some(5));
        bm.remove(5);
        assert_eq!(bm.top_priority(), Some(10));
    }
}

#[cfg(test)]
mod sem_tests {
    use rtkernel::sem::Semaphore;

    #[test]
    fn fast_path_never_touches_the_scheduler() {
        // Below its initial count, `wait` never needs to block, so this is
        // safe to exercise without `rtkernel::init()`/`start_scheduler()`.
        let sem = Semaphore::new(1);
        assert_eq!(sem.wait().unwrap(), 0);
        assert_eq!(sem.post().unwrap(), 1);
        assert_eq!(sem.count(), 1);
    }

    #[test]
    fn post_from_isr_reports_whether_a_waiter_was_woken() {
        let sem = Semaphore::new(0);
        // No waiters yet: count is simply incremented.
        assert_eq!(sem.post_from_isr().unwrap(), false);
        assert_eq!(sem.count(), 1);
    }
}

#[cfg(test)]
mod mutex_tests {
    use rtkernel::mutex::Mutex;

    #[test]
    fn starts_unowned() {
        let m = Mutex::new();
        assert!(!m.is_owned());
    }

    #[test]
    fn init_clears_ownership() {
        let m = Mutex::new();
        m.init().unwrap();
        assert!(!m.is_owned());
    }
}

#[cfg(test)]
mod queue_tests {
    use rtkernel::error::KernelError;
    use rtkernel::queue::Queue;

    #[test]
    fn fifo_order_is_preserved() {
        let q: Queue<4> = Queue::new();
        let msgs: [*mut (); 3] = [1usize as *mut (), 2usize as *mut (), 3usize as *mut ()];
        for m in msgs {
            q.send(m).unwrap();
        }
        for m in msgs {
            assert_eq!(q.receive_from_isr().unwrap(), m);
        }
    }

    #[test]
    fn send_never_blocks_and_rejects_when_full() {
        let q: Queue<2> = Queue::new();
        q.send(1usize as *mut ()).unwrap();
        q.send(2usize as *mut ()).unwrap();
        assert_eq!(q.send(3usize as *mut ()), Err(KernelError::QFull));
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn receive_from_isr_on_empty_queue_reports_resource_error() {
        let q: Queue<1> = Queue::new();
        assert!(q.is_empty());
        assert_eq!(q.receive_from_isr(), Err(KernelError::Resource));
    }
}

#[cfg(test)]
mod mem_tests {
    use rtkernel::error::KernelError;
    use rtkernel::mem::MemPool;

    static mut STORAGE: [u8; 128] = [0; 128];

    /// Memory-pool scenario: base address, block_size=32, blocks=4.
    /// `put` on a block-aligned interior address succeeds; a misaligned
    /// address is rejected before an out-of-range one even though both are
    /// invalid, matching the validation order in SPEC_FULL.md §4.10.
    #[test]
    #[allow(static_mut_refs)]
    fn put_checks_range_before_alignment() {
        let pool = MemPool::new();
        let storage = unsafe { &mut STORAGE };
        let base = storage.as_ptr() as usize;
        pool.init(storage, 32, 4).unwrap();
        assert_eq!(pool.free_count(), 4);

        let block = pool.get().unwrap();
        assert_eq!(block as usize, base);
        assert_eq!(pool.free_count(), 3);

        pool.put(block).unwrap();
        assert_eq!(pool.free_count(), 4);

        assert_eq!(pool.put((base + 16) as *mut ()), Err(KernelError::NotAlign));
        assert_eq!(pool.put((base + 128) as *mut ()), Err(KernelError::InvalidAddr));
    }

    #[test]
    #[allow(static_mut_refs)]
    fn exhausted_pool_has_zero_free_count() {
        static mut SMALL: [u8; 64] = [0; 64];
        let pool = MemPool::new();
        let storage = unsafe { &mut SMALL };
        pool.init(storage, 32, 2).unwrap();

        let a = pool.get().unwrap();
        let b = pool.get().unwrap();
        assert_ne!(a, b);
        assert_eq!(pool.free_count(), 0);
    }
}

#[cfg(test)]
mod kernel_tests {
    // `rtkernel::init()`/`start_scheduler()` share process-global state
    // (the ready-set, the idle TCB); only one test in the whole binary may
    // exercise them, and `start_scheduler` never returns on the stub port
    // either, so it is intentionally left uncalled here. `init()` alone is
    // idempotent-safe to assert on.
    #[test]
    fn init_reports_not_yet_running() {
        assert!(rtkernel::init().is_ok());
        assert!(!rtkernel::kernel::is_running());
        assert!(rtkernel::kernel::is_initialized());
    }
}
