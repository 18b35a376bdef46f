//! Cortex-M4 port implementation
//!
//! Context switching via the PendSV exception handler; the periodic tick
//! via SysTick.

#![allow(named_asm_labels)]

use core::arch::{asm, naked_asm};

use cortex_m::peripheral::scb::SystemHandler;
use cortex_m::peripheral::syst::SystClkSource;

use crate::task::TaskFn;
use crate::types::StkElement;

/// Dedicated MSP stack used once the scheduler hands off to PSP-backed
/// tasks.
#[no_mangle]
static mut INTERRUPT_STACK: [u64; 256] = [0xDEADBEEF_DEADBEEF; 256];

/// Program SysTick for the configured tick rate.
///
/// `rate_hz` is divided into the core clock the caller's `clock()` reports;
/// this port assumes a 16 MHz core clock, matching the reference board.
pub fn timer_init(rate_hz: u32) {
    let reload = 16_000_000 / rate_hz;
    let mut p = unsafe { cortex_m::Peripherals::steal() };

    p.SYST.set_reload(reload - 1);
    p.SYST.clear_current();
    p.SYST.set_clock_source(SystClkSource::Core);
    p.SYST.enable_interrupt();
    p.SYST.enable_counter();
}

/// Acknowledge the tick interrupt. SysTick's COUNTFLAG clears itself on
/// read, so there is nothing further to do; kept for the port API's
/// symmetry with `timer_init`.
pub fn timer_reset() {}

/// Dispatch the first task and never return.
#[allow(static_mut_refs)]
pub unsafe fn start_first_task() -> ! {
    unsafe {
        let mut scb = cortex_m::Peripherals::steal().SCB;

        scb.set_priority(SystemHandler::PendSV, 0xF0);
        scb.set_priority(SystemHandler::SysTick, 0xF0);

        let msp_top =
            &INTERRUPT_STACK as *const _ as u32 + core::mem::size_of_val(&INTERRUPT_STACK) as u32;

        asm!("msr msp, {0}", in(reg) msp_top);
        asm!("msr psp, {0}", in(reg) 0u32);

        crate::kernel::CPU_STATE.tcb_cur = core::ptr::null_mut();

        cortex_m::interrupt::enable();
        cortex_m::peripheral::SCB::set_pendsv();
    }

    loop {
        cortex_m::asm::wfi();
    }
}

/// Request a context switch from task level.
#[inline(always)]
pub fn trigger_switch() {
    cortex_m::peripheral::SCB::set_pendsv();
}

/// Context saved on a task's own stack across a switch.
#[repr(C, align(4))]
struct SwitchFrame {
    r4: u32,
    r5: u32,
    r6: u32,
    r7: u32,
    r8: u32,
    r9: u32,
    r10: u32,
    r11: u32,
    exc_return: u32,
    r0: u32,
    r1: u32,
    r2: u32,
    r3: u32,
    r12: u32,
    lr: u32,
    pc: u32,
    xpsr: u32,
}
const FRAME_WORDS: usize = 17;

/// Build the initial stack frame so that a context restore followed by
/// exception return begins executing `entry(arg)`.
pub unsafe fn stack_init(
    entry: TaskFn,
    arg: *mut (),
    stk_base: *mut StkElement,
    stk_size: usize,
) -> *mut StkElement {
    unsafe {
        let stk_top = stk_base.add(stk_size);
        let stk_aligned = ((stk_top as usize) & !7) as *mut u32;

        let frame_ptr = stk_aligned.sub(FRAME_WORDS) as *mut SwitchFrame;

        core::ptr::write(
            frame_ptr,
            SwitchFrame {
                r4: 0,
                r5: 0,
                r6: 0,
                r7: 0,
                r8: 0,
                r9: 0,
                r10: 0,
                r11: 0,
                exc_return: 0xFFFF_FFFD,
                r0: arg as u32,
                r1: 0,
                r2: 0,
                r3: 0,
                r12: 0,
                lr: task_returned as *const () as u32,
                pc: (entry as usize as u32) | 1,
                xpsr: 0x0100_0000,
            },
        );

        (frame_ptr as *mut u32).sub(1) as *mut StkElement
    }
}

/// Called from PendSV to swap `tcb_cur`/`tcb_next` and return the new
/// task's stack pointer.
#[inline(never)]
#[no_mangle]
unsafe extern "C" fn pendsv_switch_context(cur_sp: *mut u32) -> *mut u32 {
    unsafe {
        let cur = crate::kernel::CPU_STATE.tcb_cur;
        if !cur.is_null() {
            (*cur).sp = cur_sp as *mut StkElement;
        }

        crate::kernel::CPU_STATE.tcb_cur = crate::kernel::CPU_STATE.tcb_next;

        let new = crate::kernel::CPU_STATE.tcb_cur;
        if new.is_null() {
            core::ptr::null_mut()
        } else {
            (*new).sp as *mut u32
        }
    }
}

/// PendSV exception handler: save R4-R11/LR to the outgoing task's PSP,
/// swap TCB pointers, restore R4-R11/LR from the incoming task's stack.
#[no_mangle]
#[unsafe(naked)]
pub unsafe extern "C" fn PendSV() {
    use crate::kernel::CPU_STATE;

    naked_asm!(
        "cpsid i",
        "dsb",
        "isb",

        "mrs r0, psp",

        "ldr r1, ={cpu_state}",
        "ldr r1, [r1]",
        "cbz r1, 1f",

        "stmdb r0!, {{r4-r11, lr}}",
        "sub r0, r0, #4",

        "1:",
        "bl pendsv_switch_context",

        "cbz r0, 2f",
        "add r0, r0, #4",
        "ldmia r0!, {{r4-r11, lr}}",
        "msr psp, r0",

        "2:",
        "cpsie i",
        "dsb",
        "isb",
        "bx lr",

        cpu_state = sym CPU_STATE,
    );
}

/// Reached if a task function returns. Parks the core; the kernel never
/// reschedules a task whose entry point has returned.
fn task_returned() -> ! {
    loop {
        cortex_m::asm::wfi();
    }
}
