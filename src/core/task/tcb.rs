//! Task Control Block (TCB) definition

use core::ptr::NonNull;

use crate::types::{Prio, StkElement, TaskState, Tick};

/// Sentinel word written at the low end of a task's stack at creation time;
/// the tick handler checks it is unchanged to catch stack overflow.
pub(crate) const STACK_SENTINEL: StkElement = 0xDEAD_C0DE;

/// Task Control Block.
///
/// A TCB belongs to at most one kernel list at a time: a ready-set bucket,
/// the delay list, or a synchronization object's wait list (invariant I1).
/// `prev`/`next` are that one shared link pair.
#[repr(C)]
pub struct Tcb {
    /// Saved stack pointer. Valid only while the task is not running.
    pub sp: *mut StkElement,
    /// Low address of the backing stack region (sentinel lives here).
    pub stack_base: *mut StkElement,
    /// Stack capacity, in stack words.
    pub stack_size: usize,

    /// Name used only for diagnostics/logging; part of no invariant.
    pub name: &'static str,

    /// Shared intrusive links (see module docs).
    pub prev: Option<NonNull<Tcb>>,
    pub next: Option<NonNull<Tcb>>,

    pub state: TaskState,

    /// Delta ticks remaining relative to the predecessor, while on the
    /// delay list; zero otherwise.
    pub delay_ticks: Tick,

    /// Current effective priority (may be boosted by mutex inheritance).
    pub priority: Prio,
    /// Priority at creation; restored when an inherited boost is released.
    pub original_priority: Prio,
}

impl Tcb {
    /// Create a new, uninitialized TCB.
    pub const fn new() -> Self {
        Tcb {
            sp: core::ptr::null_mut(),
            stack_base: core::ptr::null_mut(),
            stack_size: 0,
            name: "",
            prev: None,
            next: None,
            state: TaskState::Deleted,
            delay_ticks: 0,
            priority: 0,
            original_priority: 0,
        }
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.state == TaskState::Ready
    }

    #[inline]
    pub fn is_blocked(&self) -> bool {
        self.state == TaskState::Blocked
    }

    /// Stack-overflow audit: the sentinel must be intact and `sp` must
    /// still be above `stack_base`. Run once per tick on the current task.
    pub fn stack_ok(&self) -> bool {
        if self.stack_base.is_null() {
            return true;
        }
        let sentinel = unsafe { self.stack_base.read_volatile() };
        sentinel == STACK_SENTINEL && (self.sp as usize) > (self.stack_base as usize)
    }
}

impl Default for Tcb {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl Send for Tcb {}
unsafe impl Sync for Tcb {}
