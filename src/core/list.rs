//! Intrusive doubly-linked list of TCBs
//!
//! A TCB belongs to at most one list at a time (invariant I1): the ready-set
//! bucket for its priority, the delay list, or exactly one synchronization
//! object's wait list. Every one of those lists is an instance of this same
//! type, reusing the single `prev`/`next` link pair embedded in the TCB.

use core::ptr::NonNull;

use crate::task::Tcb;

/// A FIFO (or, via [`TcbList::insert_sorted_by_priority`], priority-ordered)
/// list of TCBs.
#[derive(Debug)]
pub struct TcbList {
    head: Option<NonNull<Tcb>>,
    tail: Option<NonNull<Tcb>>,
}

impl TcbList {
    pub const fn new() -> Self {
        TcbList { head: None, tail: None }
    }

    pub fn init(&mut self) {
        self.head = None;
        self.tail = None;
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    #[inline]
    pub fn head(&self) -> Option<NonNull<Tcb>> {
        self.head
    }

    #[inline]
    pub fn tail(&self) -> Option<NonNull<Tcb>> {
        self.tail
    }

    /// Insert at the tail. O(1). FIFO ordering for readers that always pop
    /// from the head.
    ///
    /// # Safety
    /// `tcb` must not already be a member of any list.
    pub fn insert_tail(&mut self, tcb: NonNull<Tcb>) {
        let tcb_ref = unsafe { &mut *tcb.as_ptr() };

        tcb_ref.next = None;
        tcb_ref.prev = self.tail;

        match self.tail {
            Some(tail) => unsafe { (*tail.as_ptr()).next = Some(tcb) },
            None => self.head = Some(tcb),
        }

        self.tail = Some(tcb);
    }

    /// Insert in increasing-priority order (smaller `priority` value first),
    /// FIFO among equal priorities. O(n). Used by the mutex wait list, the
    /// only list in this kernel that needs priority order.
    ///
    /// # Safety
    /// `tcb` must not already be a member of any list.
    pub fn insert_sorted_by_priority(&mut self, tcb: NonNull<Tcb>) {
        let prio = unsafe { tcb.as_ref() }.priority;

        let mut cursor = self.head;
        let mut prev: Option<NonNull<Tcb>> = None;

        while let Some(cur) = cursor {
            let cur_ref = unsafe { cur.as_ref() };
            if prio < cur_ref.priority {
                break;
            }
            prev = cursor;
            cursor = cur_ref.next;
        }

        let tcb_mut = unsafe { &mut *tcb.as_ptr() };
        tcb_mut.prev = prev;
        tcb_mut.next = cursor;

        match prev {
            Some(p) => unsafe { (*p.as_ptr()).next = Some(tcb) },
            None => self.head = Some(tcb),
        }

        match cursor {
            Some(c) => unsafe { (*c.as_ptr()).prev = Some(tcb) },
            None => self.tail = Some(tcb),
        }
    }

    /// Remove an arbitrary member. O(1).
    ///
    /// # Safety
    /// `tcb` must currently be a member of this list.
    pub fn remove(&mut self, tcb: NonNull<Tcb>) {
        let tcb_ref = unsafe { &mut *tcb.as_ptr() };

        match tcb_ref.prev {
            Some(prev) => unsafe { (*prev.as_ptr()).next = tcb_ref.next },
            None => self.head = tcb_ref.next,
        }

        match tcb_ref.next {
            Some(next) => unsafe { (*next.as_ptr()).prev = tcb_ref.prev },
            None => self.tail = tcb_ref.prev,
        }

        tcb_ref.prev = None;
        tcb_ref.next = None;
    }

    /// Remove and return the head. O(1).
    pub fn pop_head(&mut self) -> Option<NonNull<Tcb>> {
        let head = self.head?;
        self.remove(head);
        Some(head)
    }
}

impl Default for TcbList {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: only ever mutated within the kernel's critical section.
unsafe impl Send for TcbList {}
unsafe impl Sync for TcbList {}

impl Copy for TcbList {}

impl Clone for TcbList {
    fn clone(&self) -> Self {
        *self
    }
}
