//! CPU port layer
//!
//! The hardware abstraction the kernel calls through: build an initial task
//! stack frame, program/acknowledge the periodic tick, and request a
//! context switch. The actual register save/restore is an external
//! collaborator to the kernel core (see SPEC_FULL.md §6).

#[cfg(target_arch = "arm")]
pub mod cortex_m4;

#[cfg(target_arch = "arm")]
pub use cortex_m4::*;

/// Host-side stub port, used so the kernel's algorithms can be exercised by
/// `cargo test` without real hardware. It models a switch by recording which
/// TCB is "current" without any real register save/restore.
#[cfg(not(target_arch = "arm"))]
pub mod stub {
    use crate::task::TaskFn;
    use crate::types::StkElement;

    pub unsafe fn start_first_task() -> ! {
        loop {
            core::hint::spin_loop();
        }
    }

    pub fn trigger_switch() {
        // On real hardware this pends a PendSV, which is what actually
        // commits `tcb_cur = tcb_next`. The stub port has no interrupt to
        // pend and intentionally never performs that commit, so host tests
        // can observe `tcb_next` after a switch request without a real
        // scheduler ever having run.
    }

    pub unsafe fn stack_init(
        _entry: TaskFn,
        _arg: *mut (),
        stk_base: *mut StkElement,
        stk_size: usize,
    ) -> *mut StkElement {
        unsafe { stk_base.add(stk_size - 1) }
    }

    pub fn timer_init(_rate_hz: u32) {}

    pub fn timer_reset() {}
}

#[cfg(not(target_arch = "arm"))]
pub use stub::*;
