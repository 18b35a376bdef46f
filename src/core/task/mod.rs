//! Task creation
//!
//! The kernel never allocates; every TCB and stack is supplied by the
//! caller as a `'static mut` and handed to [`task_create`] once.

mod tcb;

pub use tcb::Tcb;

use core::ptr::NonNull;

use crate::config::{PRIO_MAX, STK_SIZE_MIN};
use crate::critical::critical_section;
use crate::error::{KernelError, KernelResult};
use crate::kernel;
use crate::types::{Prio, StkElement, TaskState};

/// Task entry point. If it returns, the port's trampoline parks the task in
/// an infinite low-power loop (see `port::stack_init`).
pub type TaskFn = fn(*mut ()) -> !;

/// Create a task and add it to the ready-set.
///
/// May be called before or after [`crate::kernel::start_scheduler`]; if
/// called afterward and the new task outranks the caller, creation
/// immediately preempts the caller.
pub fn task_create(
    tcb: &'static mut Tcb,
    stack: &'static mut [StkElement],
    name: &'static str,
    entry: TaskFn,
    arg: *mut (),
    prio: Prio,
) -> KernelResult<()> {
    if crate::critical::is_isr_context() {
        return Err(KernelError::Isr);
    }

    unsafe {
        task_create_raw(tcb as *mut Tcb, name, entry, arg, prio, stack.as_mut_ptr(), stack.len())
    }
}

/// Raw task creation shared by the public API and kernel bootstrap (the
/// idle task). Performs no ISR check, so kernel bootstrap can call it before
/// the scheduler is marked running.
///
/// # Safety
/// `tcb` and `stk_base` must be valid for the lifetime of the task.
pub(crate) unsafe fn task_create_raw(
    tcb: *mut Tcb,
    name: &'static str,
    entry: TaskFn,
    arg: *mut (),
    prio: Prio,
    stk_base: *mut StkElement,
    stk_size: usize,
) -> KernelResult<()> {
    if tcb.is_null() || stk_base.is_null() {
        return Err(KernelError::Param);
    }
    if stk_size < STK_SIZE_MIN {
        return Err(KernelError::Param);
    }
    if prio as usize >= PRIO_MAX {
        return Err(KernelError::Param);
    }

    critical_section(|_cs| {
        let tcb_ref = unsafe { &mut *tcb };
        *tcb_ref = Tcb::new();

        tcb_ref.name = name;
        tcb_ref.priority = prio;
        tcb_ref.original_priority = prio;
        tcb_ref.state = TaskState::Ready;
        tcb_ref.stack_base = stk_base;
        tcb_ref.stack_size = stk_size;

        unsafe {
            core::ptr::write_volatile(stk_base, tcb::STACK_SENTINEL);
            tcb_ref.sp = crate::port::stack_init(entry, arg, stk_base, stk_size);
        }

        let tcb_nonnull = unsafe { NonNull::new_unchecked(tcb) };
        unsafe { kernel::ready_set_insert(tcb_nonnull) };

        if kernel::is_running() {
            crate::sched::request_switch();
        }

        Ok(())
    })
}
