//! Critical section handling
//!
//! A single, globally nest-counted interrupt mask protects every kernel data
//! structure. `enter` always masks interrupts; `exit` only unmasks them once
//! the nesting count returns to zero, so a critical section entered from
//! within another one is a correct no-op at the hardware level.

use core::sync::atomic::{AtomicU8, Ordering};

use crate::types::NestCtr;

/// Global critical-section nesting counter.
static NESTING: AtomicU8 = AtomicU8::new(0);

/// RAII guard for a critical section.
///
/// Disables interrupts on construction; restores them on drop, but only
/// once every nested guard has been dropped (nesting count reaches zero).
pub struct CriticalSection {
    _private: (),
}

impl CriticalSection {
    /// Enter a (possibly nested) critical section.
    #[inline(always)]
    pub fn enter() -> Self {
        #[cfg(target_arch = "arm")]
        cortex_m::interrupt::disable();

        NESTING.fetch_add(1, Ordering::SeqCst);
        CriticalSection { _private: () }
    }

    /// Current nesting depth. Zero means interrupts are enabled under
    /// kernel control (invariant I5).
    #[inline(always)]
    pub fn nesting() -> NestCtr {
        NESTING.load(Ordering::SeqCst)
    }
}

impl Drop for CriticalSection {
    #[inline(always)]
    fn drop(&mut self) {
        let prev = NESTING.fetch_sub(1, Ordering::SeqCst);
        if prev == 0 {
            crate::error::fatal("exit_critical underflow");
        }

        if prev == 1 {
            #[cfg(target_arch = "arm")]
            unsafe {
                cortex_m::interrupt::enable()
            };
        }
    }
}

/// Execute a closure with interrupts disabled.
///
/// The closure receives a reference to the critical-section guard, which can
/// be used to access [`crate::core::cs_cell::CsCell`]-protected data.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(&CriticalSection) -> R,
{
    let cs = CriticalSection::enter();
    f(&cs)
}

/// `enter_critical` / `exit_critical` as free functions, matching the
/// kernel API surface (§6). Prefer [`critical_section`] inside the crate.
#[inline(always)]
pub fn enter_critical() -> CriticalSection {
    CriticalSection::enter()
}

#[inline(always)]
pub fn exit_critical(cs: CriticalSection) {
    drop(cs)
}

/// Check if currently executing in an ISR context.
#[inline]
pub fn is_isr_context() -> bool {
    #[cfg(target_arch = "arm")]
    {
        let ipsr: u32;
        unsafe {
            core::arch::asm!(
                "mrs {}, IPSR",
                out(reg) ipsr,
                options(nomem, nostack, preserves_flags)
            );
        }
        ipsr != 0
    }

    #[cfg(not(target_arch = "arm"))]
    {
        false
    }
}
