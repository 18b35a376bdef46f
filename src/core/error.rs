//! Kernel error taxonomy
//!
//! A flat, minimal error tag. Programmer-logic violations that threaten a
//! kernel invariant (corrupt ready bitmap, stack overflow, unbalanced
//! critical section) are never returned as `Err` — they trip [`fatal`],
//! which halts with interrupts disabled. Only conditions a caller can
//! reasonably react to at the call site are represented here.

/// Kernel error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum KernelError {
    /// A null or out-of-range argument.
    Param,
    /// Reserved: no API in this kernel currently produces a timeout.
    Timeout,
    /// A non-blocking request found the resource unavailable.
    Resource,
    /// `mutex_post` called by a task that doesn't own the mutex.
    NotOwner,
    /// Mutex nest-count overflow.
    Nesting,
    /// Send to a full queue.
    QFull,
    /// Memory-pool `put` of an address outside the pool's range.
    InvalidAddr,
    /// Memory-pool `put` of a misaligned address.
    NotAlign,
    /// Reserved: a non-ISR-safe API was invoked from interrupt context.
    Isr,
}

/// Result type alias for kernel operations.
pub type KernelResult<T> = Result<T, KernelError>;

/// Disable interrupts and halt.
///
/// Called when a kernel invariant has been violated in a way that cannot be
/// recovered from locally: a corrupt list, a stack overflow, an unbalanced
/// `exit_critical`. There is no return from this function.
#[cold]
pub fn fatal(msg: &'static str) -> ! {
    #[cfg(target_arch = "arm")]
    {
        crate::error!("fatal: {}", msg);
        cortex_m::interrupt::disable();
        loop {
            cortex_m::asm::udf();
        }
    }
    #[cfg(not(target_arch = "arm"))]
    {
        panic!("fatal: {}", msg);
    }
}
