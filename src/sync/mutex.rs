//! Priority-inheriting mutex
//!
//! Recursive: a task already owning the mutex may `pend` it again, bumping
//! a nest count rather than blocking; `post` must be called a matching
//! number of times before the mutex is actually released.
//!
//! When a higher-priority task blocks on a mutex held by a lower-priority
//! one, the owner's priority is boosted to the waiter's for as long as it
//! holds the mutex (priority inheritance), preventing unbounded priority
//! inversion. The boost is a single step, not transitive: if the owner is
//! itself blocked on some other object when boosted, its priority field is
//! updated in place without reordering that object's wait list.

use core::cell::UnsafeCell;
use core::ptr::NonNull;

use crate::critical::{critical_section, is_isr_context};
use crate::error::{KernelError, KernelResult};
use crate::kernel;
use crate::list::TcbList;
use crate::task::Tcb;
use crate::types::TaskState;

struct MutexInner {
    owner: Option<NonNull<Tcb>>,
    nest_count: u32,
    waiters: TcbList,
}

/// A priority-inheriting mutex, usable as a `'static`.
pub struct Mutex {
    inner: UnsafeCell<MutexInner>,
}

unsafe impl Sync for Mutex {}
unsafe impl Send for Mutex {}

impl Mutex {
    pub const fn new() -> Self {
        Mutex {
            inner: UnsafeCell::new(MutexInner { owner: None, nest_count: 0, waiters: TcbList::new() }),
        }
    }

    /// (Re)initialize to unowned, clearing any waiters. Not safe to call
    /// while tasks are already blocked on this mutex.
    pub fn init(&self) -> KernelResult<()> {
        if is_isr_context() {
            return Err(KernelError::Isr);
        }
        critical_section(|_cs| {
            let inner = unsafe { &mut *self.inner.get() };
            inner.owner = None;
            inner.nest_count = 0;
            inner.waiters.init();
            Ok(())
        })
    }

    /// Acquire the mutex, blocking the caller if another task owns it.
    pub fn pend(&self) -> KernelResult<()> {
        if is_isr_context() {
            return Err(KernelError::Isr);
        }

        critical_section(|_cs| {
            let inner = unsafe { &mut *self.inner.get() };
            let cur = unsafe { kernel::tcb_cur() }.ok_or(KernelError::Param)?;

            match inner.owner {
                None => {
                    inner.owner = Some(cur);
                    inner.nest_count = 1;
                    return Ok(());
                }
                Some(owner) if owner == cur => {
                    inner.nest_count = inner.nest_count.checked_add(1).ok_or(KernelError::Nesting)?;
                    return Ok(());
                }
                Some(owner) => {
                    let cur_prio = unsafe { cur.as_ref() }.priority;
                    let owner_ref = unsafe { &mut *owner.as_ptr() };

                    if cur_prio < owner_ref.priority {
                        if owner_ref.is_ready() {
                            unsafe { kernel::ready_set_change_prio(owner, cur_prio) };
                        } else {
                            owner_ref.priority = cur_prio;
                        }
                    }

                    unsafe {
                        kernel::ready_set_remove(cur);
                        (*cur.as_ptr()).state = TaskState::Blocked;
                        inner.waiters.insert_sorted_by_priority(cur);
                    }
                    crate::sched::request_switch();
                    Ok(())
                }
            }
        })
    }

    /// Release the mutex. Restores the caller's priority if it had been
    /// boosted, then hands ownership to the highest-priority waiter, if any.
    pub fn post(&self) -> KernelResult<()> {
        if is_isr_context() {
            return Err(KernelError::Isr);
        }

        critical_section(|_cs| {
            let inner = unsafe { &mut *self.inner.get() };
            let cur = unsafe { kernel::tcb_cur() }.ok_or(KernelError::Param)?;

            if inner.owner != Some(cur) {
                return Err(KernelError::NotOwner);
            }

            inner.nest_count -= 1;
            if inner.nest_count > 0 {
                return Ok(());
            }

            let cur_ref = unsafe { &mut *cur.as_ptr() };
            if cur_ref.priority != cur_ref.original_priority {
                let restored = cur_ref.original_priority;
                unsafe { kernel::ready_set_change_prio(cur, restored) };
            }

            match inner.waiters.pop_head() {
                Some(waiter) => {
                    inner.owner = Some(waiter);
                    inner.nest_count = 1;
                    unsafe {
                        (*waiter.as_ptr()).state = TaskState::Ready;
                        kernel::ready_set_insert(waiter);
                    }
                    crate::sched::request_switch();
                }
                None => inner.owner = None,
            }

            Ok(())
        })
    }

    #[inline]
    pub fn is_owned(&self) -> bool {
        unsafe { (*self.inner.get()).owner.is_some() }
    }
}

impl Default for Mutex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_mutex_is_unowned() {
        let m = Mutex::new();
        assert!(!m.is_owned());
    }

    /// Recursive pend/post × k leaves `owner = nil` only after the matching
    /// number of posts (P12).
    #[test]
    fn recursive_pend_post_releases_after_matching_count() {
        let mut t = Tcb::new();
        t.priority = 5;
        t.original_priority = 5;
        let ptr = unsafe { NonNull::new_unchecked(&mut t as *mut Tcb) };

        unsafe { kernel::set_tcb_cur(Some(ptr)) };

        let m = Mutex::new();
        m.pend().unwrap();
        m.pend().unwrap();
        m.pend().unwrap();
        assert!(m.is_owned());

        m.post().unwrap();
        assert!(m.is_owned());
        m.post().unwrap();
        assert!(m.is_owned());
        m.post().unwrap();
        assert!(!m.is_owned());

        unsafe { kernel::set_tcb_cur(None) };
    }
}
