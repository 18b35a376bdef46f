//! Compile-time configuration
//!
//! These constants control the behavior and resource limits of the kernel.

/// Number of priority levels (0 = highest, `PRIO_MAX - 1` = idle).
pub const PRIO_MAX: usize = 32;

/// System tick rate in Hz.
pub const TICK_RATE_HZ: u32 = 1000;

/// Minimum task stack size, in stack words.
pub const STK_SIZE_MIN: usize = 64;

/// Idle task priority. Always the lowest priority level.
pub const PRIO_IDLE: u8 = (PRIO_MAX - 1) as u8;

/// Default byte capacity backing a message queue's ring buffer, when the
/// caller doesn't size one explicitly.
pub const MSG_POOL_SIZE: usize = 32;
