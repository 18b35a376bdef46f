//! Core type aliases and small enums shared across the kernel.

/// Task priority (0 = highest priority).
pub type Prio = u8;

/// Tick counter / delay type.
pub type Tick = u32;

/// Semaphore / queue counter type.
pub type Count = u32;

/// Critical-section / suspend nesting counter.
pub type NestCtr = u8;

/// Message size type.
pub type MsgSize = usize;

/// Stack element type.
pub type StkElement = u32;

/// Task state.
///
/// Three states only: a task is either runnable, blocked on a delay or a
/// synchronization object, or permanently removed from scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TaskState {
    /// Task is on the ready-set and eligible to run.
    Ready = 0,
    /// Task is on the delay list or a wait list.
    Blocked = 1,
    /// Task has been deleted; its TCB must not be scheduled again.
    Deleted = 2,
}
