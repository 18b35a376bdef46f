//! A small preemptive, priority-based real-time kernel for single-core
//! Cortex-M microcontrollers.
//!
//! - Priority-based preemptive scheduling (32 priority levels, O(1) lookup)
//! - A delta-encoded delay list for O(1) per-tick bookkeeping
//! - Counting semaphores, a priority-inheriting mutex, a fixed-capacity
//!   message queue and a fixed-block memory pool
//! - Context switching for ARM Cortex-M via PendSV

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]

// ============ Critical Section ============

#[cfg(target_arch = "arm")]
mod cs_impl {
    use cortex_m::interrupt;
    use cortex_m::register::primask;
    use critical_section::{set_impl, Impl, RawRestoreState};

    struct SingleCoreCriticalSection;
    set_impl!(SingleCoreCriticalSection);

    unsafe impl Impl for SingleCoreCriticalSection {
        unsafe fn acquire() -> RawRestoreState {
            let was_active = primask::read().is_active();
            interrupt::disable();
            was_active
        }

        unsafe fn release(was_active: RawRestoreState) {
            if was_active {
                unsafe { interrupt::enable() }
            }
        }
    }
}

// ============ Modules ============

pub mod log;
mod lang_items;

pub mod core;
pub mod sync;
pub mod port;

// ============ Re-exports ============

pub use core::config;
pub use core::config::*;
pub use core::critical;
pub use core::error;
pub use core::error::{KernelError, KernelResult};
pub use core::kernel;
pub use core::kernel::{init, start_scheduler, tick_handler, enter_critical, exit_critical};
pub use core::prio;
pub use core::list;
pub use core::types;
pub use core::types::*;
pub use core::task;
pub use core::task::task_create;
pub use core::sched;
pub use core::time;
pub use core::time::delay;

pub use sync::sem;
pub use sync::mutex;
pub use sync::queue;
pub use sync::mem;

#[cfg(feature = "pac")]
pub use stm32_metapac as pac;
