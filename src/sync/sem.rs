//! Counting semaphore
//!
//! FIFO wait list: the task that has waited longest is always the one
//! woken first, regardless of priority (P-series property P6).

use core::cell::UnsafeCell;

use crate::critical::{critical_section, is_isr_context};
use crate::error::{KernelError, KernelResult};
use crate::kernel;
use crate::list::TcbList;
use crate::types::{Count, TaskState};

struct SemInner {
    count: Count,
    waiters: TcbList,
}

impl SemInner {
    const fn new(count: Count) -> Self {
        SemInner { count, waiters: TcbList::new() }
    }
}

/// A counting semaphore.
///
/// Usable as a `'static` with [`Semaphore::new`], matching how the kernel's
/// other synchronization objects are declared (no heap allocation).
pub struct Semaphore {
    inner: UnsafeCell<SemInner>,
}

unsafe impl Sync for Semaphore {}
unsafe impl Send for Semaphore {}

impl Semaphore {
    pub const fn new(count: Count) -> Self {
        Semaphore { inner: UnsafeCell::new(SemInner::new(count)) }
    }

    /// (Re)initialize to `count`, clearing any waiters. Not safe to call
    /// while tasks are already blocked on this semaphore.
    pub fn init(&self, count: Count) -> KernelResult<()> {
        if is_isr_context() {
            return Err(KernelError::Isr);
        }
        critical_section(|_cs| {
            let inner = unsafe { &mut *self.inner.get() };
            inner.count = count;
            inner.waiters.init();
            Ok(())
        })
    }

    /// Take a count, blocking the caller if none is available. A waiter
    /// woken by [`Semaphore::post`] is handed the count directly (see
    /// `post`'s doc comment) and simply returns on wake rather than
    /// re-checking `count` — there is nothing to re-check, since a
    /// handoff-post never touches it.
    pub fn wait(&self) -> KernelResult<Count> {
        if is_isr_context() {
            return Err(KernelError::Isr);
        }

        critical_section(|_cs| {
            let inner = unsafe { &mut *self.inner.get() };

            if inner.count > 0 {
                inner.count -= 1;
                return Ok(inner.count);
            }

            let cur = unsafe { kernel::tcb_cur() }.ok_or(KernelError::Param)?;
            unsafe {
                kernel::ready_set_remove(cur);
                (*cur.as_ptr()).state = TaskState::Blocked;
                inner.waiters.insert_tail(cur);
            }
            crate::sched::request_switch();
            Ok(inner.count)
        })
    }

    /// Give a count back. If a task is already waiting, hand it off
    /// directly instead of incrementing `count` — the increment a plain
    /// `post` would do and the decrement the woken waiter would do on wake
    /// cancel, so this crate (like the ground truth it's modeled on) skips
    /// both. This also keeps the FIFO guarantee intact: an unrelated caller
    /// racing in on [`Semaphore::wait`]'s fast path can never observe (and
    /// steal) a count that was meant for the task already queued.
    pub fn post(&self) -> KernelResult<Count> {
        critical_section(|_cs| {
            let inner = unsafe { &mut *self.inner.get() };

            match inner.waiters.pop_head() {
                Some(waiter) => {
                    unsafe {
                        (*waiter.as_ptr()).state = TaskState::Ready;
                        kernel::ready_set_insert(waiter);
                    }
                    if !is_isr_context() {
                        crate::sched::request_switch();
                    }
                }
                None => {
                    inner.count = inner.count.checked_add(1).ok_or(KernelError::Param)?;
                }
            }

            Ok(inner.count)
        })
    }

    /// ISR-safe post. Never requests a switch itself (an ISR epilogue does
    /// that); instead reports whether a task was woken so the caller can
    /// request one.
    pub fn post_from_isr(&self) -> KernelResult<bool> {
        critical_section(|_cs| {
            let inner = unsafe { &mut *self.inner.get() };

            match inner.waiters.pop_head() {
                Some(waiter) => {
                    unsafe {
                        (*waiter.as_ptr()).state = TaskState::Ready;
                        kernel::ready_set_insert(waiter);
                    }
                    Ok(true)
                }
                None => {
                    inner.count = inner.count.checked_add(1).ok_or(KernelError::Param)?;
                    Ok(false)
                }
            }
        })
    }

    #[inline]
    pub fn count(&self) -> Count {
        unsafe { (*self.inner.get()).count }
    }
}

impl Default for Semaphore {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_increments_when_no_waiters() {
        let sem = Semaphore::new(0);
        assert_eq!(sem.post().unwrap(), 1);
        assert_eq!(sem.count(), 1);
    }

    #[test]
    fn wait_without_scheduler_consumes_available_count() {
        let sem = Semaphore::new(2);
        assert_eq!(sem.wait().unwrap(), 1);
        assert_eq!(sem.count(), 1);
    }

    /// `post` on a semaphore with a task already queued must hand off
    /// directly and leave `count` untouched (SPEC_FULL.md §4.7: "count is
    /// not incremented when a waiter is woken").
    #[test]
    fn post_with_waiter_hands_off_without_touching_count() {
        use core::ptr::NonNull;

        let sem = Semaphore::new(0);
        let mut waiter = crate::task::Tcb::new();
        waiter.priority = 4;
        waiter.original_priority = 4;
        waiter.state = TaskState::Blocked;
        let waiter_ptr = unsafe { NonNull::new_unchecked(&mut waiter as *mut crate::task::Tcb) };

        unsafe { (*sem.inner.get()).waiters.insert_tail(waiter_ptr) };

        assert_eq!(sem.post().unwrap(), 0);
        assert_eq!(sem.count(), 0);
        assert_eq!(waiter.state, TaskState::Ready);
    }
}
