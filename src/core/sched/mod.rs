//! Scheduler
//!
//! Priority-based preemptive scheduling with round-robin among tasks that
//! share the current priority. All ready-set bookkeeping lives in
//! `crate::kernel`; this module only decides *when* a switch is warranted
//! and hands the decision to the CPU port.

use crate::kernel;

/// Compare the highest-priority ready task against the one currently
/// running and, if they differ, commit the switch and ask the port to
/// perform it.
///
/// Must be called with the critical section held. A no-op before the
/// scheduler has started (`task_create` may call this during setup).
pub fn request_switch() {
    if !kernel::is_running() {
        return;
    }

    unsafe {
        let next = match kernel::ready_set_find_next() {
            Some(t) => t,
            None => return,
        };

        let cur = kernel::tcb_cur();
        if cur == Some(next) {
            return;
        }

        kernel::set_tcb_next(Some(next));
    }

    crate::port::trigger_switch();
}

/// Rotate the ready bucket at `prio` to its next member and request a
/// switch. Called once per tick for the running task's priority band
/// (tick-only round robin; no sub-tick time slicing).
///
/// Must be called with the critical section held.
pub(crate) fn round_robin(prio: crate::types::Prio) {
    unsafe { kernel::ready_set_rotate(prio) };
    request_switch();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_switch_before_start_is_noop() {
        // Scheduler not started in this process: must not panic or touch
        // CPU_STATE.
        request_switch();
    }
}
