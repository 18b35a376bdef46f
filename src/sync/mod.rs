//! Synchronization primitives
//!
//! Counting semaphores, a priority-inheriting mutex, a fixed-capacity
//! message queue and a fixed-block memory pool. All four share the same
//! blocking shape: a non-blocking fast path taken under the critical
//! section, and a slow path that parks the caller on the primitive's own
//! [`crate::list::TcbList`] wait list and requests a switch.

pub mod sem;
pub mod mutex;
pub mod queue;
pub mod mem;
