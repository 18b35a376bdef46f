//! Delay list and tick handler
//!
//! The delay list is a single, delta-encoded, ascending list: each member's
//! `delay_ticks` is relative to the member before it, so waking expired
//! tasks and decrementing the list for one elapsed tick is O(1) regardless
//! of how many tasks are delayed, and insertion is the only O(n) walk.

use core::ptr::NonNull;

use crate::config::PRIO_MAX;
use crate::critical::critical_section;
use crate::error::{KernelError, KernelResult};
use crate::kernel::{self, DELAY_LIST_HEAD};
use crate::task::Tcb;
use crate::types::{TaskState, Tick};

/// Insert `tcb` into the delay list so that it wakes in `ticks` ticks.
///
/// Encodes `ticks` as a delta against whatever is already in the list:
/// - empty list: `tcb` becomes the sole member, `delay_ticks = ticks`.
/// - `ticks` is smaller than the head's absolute delay: `tcb` becomes the
///   new head; the old head's `delay_ticks` is reduced by `ticks` so it
///   still represents the same absolute wake time relative to the new head.
/// - otherwise: walk forward, subtracting each member's delta from the
///   remaining `ticks` budget, until the budget is smaller than the next
///   member's delta (insert before it, shrinking its delta by the consumed
///   budget) or the list end is reached (insert at the tail).
///
/// # Safety
/// Caller holds the critical section; `tcb` is not already on any list.
unsafe fn delay_list_insert_into(head_cell: &mut Option<NonNull<Tcb>>, tcb: NonNull<Tcb>, ticks: Tick) {
    unsafe {
        let tcb_mut = &mut *tcb.as_ptr();

        let head = match *head_cell {
            None => {
                tcb_mut.delay_ticks = ticks;
                tcb_mut.prev = None;
                tcb_mut.next = None;
                *head_cell = Some(tcb);
                return;
            }
            Some(h) => h,
        };

        let head_ref = &mut *head.as_ptr();
        if ticks < head_ref.delay_ticks {
            tcb_mut.delay_ticks = ticks;
            head_ref.delay_ticks -= ticks;

            tcb_mut.prev = None;
            tcb_mut.next = Some(head);
            head_ref.prev = Some(tcb);
            *head_cell = Some(tcb);
            return;
        }

        let mut remaining = ticks - head_ref.delay_ticks;
        let mut cursor = head;

        loop {
            let cursor_ref = &mut *cursor.as_ptr();
            match cursor_ref.next {
                Some(next) => {
                    let next_ref = &*next.as_ptr();
                    if remaining < next_ref.delay_ticks {
                        tcb_mut.delay_ticks = remaining;
                        (*next.as_ptr()).delay_ticks -= remaining;

                        tcb_mut.prev = Some(cursor);
                        tcb_mut.next = Some(next);
                        cursor_ref.next = Some(tcb);
                        (*next.as_ptr()).prev = Some(tcb);
                        return;
                    }
                    remaining -= next_ref.delay_ticks;
                    cursor = next;
                }
                None => {
                    tcb_mut.delay_ticks = remaining;
                    tcb_mut.prev = Some(cursor);
                    tcb_mut.next = None;
                    cursor_ref.next = Some(tcb);
                    return;
                }
            }
        }
    }
}

/// Suspend the calling task for `ticks` system ticks.
///
/// Must not be called from ISR context (use the queue/semaphore
/// `_from_isr` variants there instead). `ticks == 0` still inserts into the
/// delay list and requests a switch — it yields the CPU to other tasks of
/// the same or higher priority rather than returning immediately.
pub fn delay(ticks: Tick) -> KernelResult<()> {
    if crate::critical::is_isr_context() {
        return Err(KernelError::Isr);
    }

    critical_section(|_cs| {
        let cur = match unsafe { kernel::tcb_cur() } {
            Some(t) => t,
            None => return Err(KernelError::Param),
        };

        unsafe {
            kernel::ready_set_remove(cur);
            (*cur.as_ptr()).state = TaskState::Blocked;
            delay_list_insert_into(DELAY_LIST_HEAD.get_unchecked(), cur, ticks);
        }

        crate::sched::request_switch();
        Ok(())
    })
}

/// Tick handler: called from the CPU port's periodic timer ISR.
///
/// 1. Audits the running task's stack sentinel; a corrupted sentinel is
///    fatal.
/// 2. Increments the free-running tick counter.
/// 3. Decrements the delay list's head delta by one tick (a node already at
///    zero, e.g. a just-inserted `delay(0)` yield, is left alone rather than
///    underflowed) and wakes every task whose delta has reached zero (there
///    may be several, since multiple tasks can share an absolute wake
///    tick).
/// 4. Rotates the running task's ready bucket, but only if it is actually
///    Ready (tick-only round robin) — a task that just blocked in the same
///    window this tick fired must not have some unrelated bucket rotated
///    under its stale priority.
/// 5. Requests a switch if a higher- or equal-priority task is now due.
pub fn tick_handler() {
    critical_section(|_cs| {
        if let Some(cur) = unsafe { kernel::tcb_cur() } {
            if !unsafe { cur.as_ref() }.stack_ok() {
                crate::error::fatal("stack overflow");
            }
        }

        kernel::tick_increment();

        unsafe {
            let head_cell = DELAY_LIST_HEAD.get_unchecked();
            if let Some(head) = *head_cell {
                let head_ref = &mut *head.as_ptr();
                if head_ref.delay_ticks > 0 {
                    head_ref.delay_ticks -= 1;
                }

                while let Some(due) = *head_cell {
                    let due_ref = &mut *due.as_ptr();
                    if due_ref.delay_ticks != 0 {
                        break;
                    }

                    *head_cell = due_ref.next;
                    if let Some(next) = due_ref.next {
                        (*next.as_ptr()).prev = None;
                    }
                    due_ref.prev = None;
                    due_ref.next = None;

                    due_ref.state = TaskState::Ready;
                    kernel::ready_set_insert(due);
                }
            }
        }

        let cur_ready = unsafe { kernel::tcb_cur() }.filter(|t| unsafe { t.as_ref() }.state == TaskState::Ready);
        if let Some(cur) = cur_ready {
            let prio = unsafe { cur.as_ref() }.priority;
            if (prio as usize) < PRIO_MAX {
                crate::sched::round_robin(prio);
                return;
            }
        }
        crate::sched::request_switch();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tcb(prio: u8) -> Tcb {
        let mut t = Tcb::new();
        t.priority = prio;
        t.original_priority = prio;
        t
    }

    /// Collects up to 8 `(priority, delay_ticks)` pairs walking from `head`.
    fn chain(head: Option<NonNull<Tcb>>) -> ([(u8, Tick); 8], usize) {
        let mut out = [(0u8, 0u32); 8];
        let mut n = 0;
        let mut cur = head;
        while let Some(c) = cur {
            let c_ref = unsafe { c.as_ref() };
            out[n] = (c_ref.priority, c_ref.delay_ticks);
            n += 1;
            cur = c_ref.next;
        }
        (out, n)
    }

    /// T1 calls delay(50), T2 delay(10), T3 delay(30), all at tick 0.
    /// Expected delta-encoded order: T2(10) -> T3(20) -> T1(20).
    #[test]
    fn delay_list_scenario_matches_delta_encoding() {
        let mut t1 = tcb(1);
        let mut t2 = tcb(2);
        let mut t3 = tcb(3);

        let t1_ptr = unsafe { NonNull::new_unchecked(&mut t1 as *mut Tcb) };
        let t2_ptr = unsafe { NonNull::new_unchecked(&mut t2 as *mut Tcb) };
        let t3_ptr = unsafe { NonNull::new_unchecked(&mut t3 as *mut Tcb) };

        let mut head: Option<NonNull<Tcb>> = None;
        unsafe {
            delay_list_insert_into(&mut head, t1_ptr, 50);
            delay_list_insert_into(&mut head, t2_ptr, 10);
            delay_list_insert_into(&mut head, t3_ptr, 30);
        }

        let (entries, n) = chain(head);
        assert_eq!(n, 3);
        assert_eq!(&entries[..3], &[(2u8, 10u32), (3u8, 20u32), (1u8, 20u32)]);
    }

    #[test]
    fn delay_list_single_entry() {
        let mut t1 = tcb(1);
        let t1_ptr = unsafe { NonNull::new_unchecked(&mut t1 as *mut Tcb) };

        let mut head: Option<NonNull<Tcb>> = None;
        unsafe { delay_list_insert_into(&mut head, t1_ptr, 25) };

        let (entries, n) = chain(head);
        assert_eq!(n, 1);
        assert_eq!(entries[0], (1u8, 25u32));
    }
}
