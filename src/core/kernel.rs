//! Kernel singleton, boot sequence and ready-set storage
//!
//! One static owns every piece of kernel-shared mutable state: the
//! per-priority ready-set, the priority bitmap, the delay list head, the
//! current/next TCB pointers and the tick counter. It is guarded entirely by
//! the critical section (no blocking lock exists inside the kernel).

use core::ptr::NonNull;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::config::{PRIO_IDLE, PRIO_MAX};
use crate::core::cs_cell::CsCell;
use crate::critical::{critical_section, CriticalSection};
use crate::error::{KernelError, KernelResult};
use crate::list::TcbList;
use crate::prio::PrioBitmap;
use crate::task::Tcb;
use crate::types::{Prio, Tick};

// ============ Kernel flags ============

struct KernelFlags {
    initialized: AtomicBool,
    running: AtomicBool,
    tick_counter: AtomicU32,
}

impl KernelFlags {
    const fn new() -> Self {
        Self {
            initialized: AtomicBool::new(false),
            running: AtomicBool::new(false),
            tick_counter: AtomicU32::new(0),
        }
    }

    fn reset(&self) {
        self.initialized.store(false, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        self.tick_counter.store(0, Ordering::SeqCst);
    }
}

static FLAGS: KernelFlags = KernelFlags::new();

/// Whether the scheduler has been started.
#[inline(always)]
pub fn is_running() -> bool {
    FLAGS.running.load(Ordering::Acquire)
}

#[inline(always)]
pub fn is_initialized() -> bool {
    FLAGS.initialized.load(Ordering::Acquire)
}

/// Current tick count (free-running, wraps).
#[inline(always)]
pub fn tick_get() -> Tick {
    FLAGS.tick_counter.load(Ordering::Relaxed)
}

#[inline(always)]
pub(crate) fn tick_increment() -> Tick {
    FLAGS.tick_counter.fetch_add(1, Ordering::Relaxed) + 1
}

// ============ Ready-set ============

struct ReadySet {
    bitmap: PrioBitmap,
    buckets: [TcbList; PRIO_MAX],
}

impl ReadySet {
    const fn new() -> Self {
        Self {
            bitmap: PrioBitmap::new(),
            buckets: [TcbList::new(); PRIO_MAX],
        }
    }

    fn reset(&mut self) {
        self.bitmap.init();
        self.buckets = [TcbList::new(); PRIO_MAX];
    }
}

static READY: CsCell<ReadySet> = CsCell::new(ReadySet::new());

/// Add `tcb` to the ready-set at its current `priority`.
///
/// # Safety
/// Caller holds the critical section and `tcb` is not already in any list.
pub(crate) unsafe fn ready_set_insert(tcb: NonNull<Tcb>) {
    let prio = unsafe { tcb.as_ref() }.priority;
    unsafe {
        let set = READY.get_unchecked();
        set.buckets[prio as usize].insert_tail(tcb);
        set.bitmap.insert(prio);
    }
}

/// Remove `tcb` from the ready-set at its current `priority`.
///
/// # Safety
/// Caller holds the critical section and `tcb` is currently in the
/// ready-set.
pub(crate) unsafe fn ready_set_remove(tcb: NonNull<Tcb>) {
    let prio = unsafe { tcb.as_ref() }.priority;
    unsafe {
        let set = READY.get_unchecked();
        set.buckets[prio as usize].remove(tcb);
        if set.buckets[prio as usize].is_empty() {
            set.bitmap.remove(prio);
        }
    }
}

/// Move `tcb`, currently on the ready-set, to a new priority bucket.
///
/// # Safety
/// Caller holds the critical section and `tcb` is currently in the
/// ready-set.
pub(crate) unsafe fn ready_set_change_prio(tcb: NonNull<Tcb>, new_prio: Prio) {
    let tcb_ref = unsafe { &mut *tcb.as_ptr() };
    let old_prio = tcb_ref.priority;
    if old_prio == new_prio {
        return;
    }
    unsafe {
        let set = READY.get_unchecked();
        set.buckets[old_prio as usize].remove(tcb);
        if set.buckets[old_prio as usize].is_empty() {
            set.bitmap.remove(old_prio);
        }
        tcb_ref.priority = new_prio;
        set.buckets[new_prio as usize].insert_tail(tcb);
        set.bitmap.insert(new_prio);
    }
}

/// Rotate the ready bucket at `prio`: move its head to its tail. No-op if
/// the bucket has zero or one member.
///
/// # Safety
/// Caller holds the critical section.
pub(crate) unsafe fn ready_set_rotate(prio: Prio) {
    unsafe {
        let bucket = &mut READY.get_unchecked().buckets[prio as usize];
        if bucket.head() != bucket.tail() {
            if let Some(head) = bucket.pop_head() {
                bucket.insert_tail(head);
            }
        }
    }
}

/// Highest-priority ready task, if any.
///
/// # Safety
/// Caller holds the critical section.
pub(crate) unsafe fn ready_set_find_next() -> Option<NonNull<Tcb>> {
    unsafe {
        let set = READY.get_unchecked();
        let prio = set.bitmap.top_priority()?;
        set.buckets[prio as usize].head()
    }
}

// ============ CPU state ============

/// Pointers the CPU port reads/writes during a context switch.
#[repr(C)]
pub struct CpuState {
    pub tcb_cur: *mut Tcb,
    pub tcb_next: *mut Tcb,
}

impl CpuState {
    const fn new() -> Self {
        Self {
            tcb_cur: core::ptr::null_mut(),
            tcb_next: core::ptr::null_mut(),
        }
    }

    fn reset(&mut self) {
        self.tcb_cur = core::ptr::null_mut();
        self.tcb_next = core::ptr::null_mut();
    }
}

/// Global CPU state instance, read by the port's PendSV trampoline.
#[no_mangle]
#[used]
pub static mut CPU_STATE: CpuState = CpuState::new();

#[inline]
#[allow(static_mut_refs)]
pub(crate) unsafe fn tcb_cur() -> Option<NonNull<Tcb>> {
    unsafe { NonNull::new(CPU_STATE.tcb_cur) }
}

#[inline]
#[allow(static_mut_refs)]
pub(crate) unsafe fn set_tcb_cur(tcb: Option<NonNull<Tcb>>) {
    unsafe { CPU_STATE.tcb_cur = tcb.map_or(core::ptr::null_mut(), |p| p.as_ptr()) };
}

#[inline]
#[allow(static_mut_refs)]
pub(crate) unsafe fn set_tcb_next(tcb: Option<NonNull<Tcb>>) {
    unsafe { CPU_STATE.tcb_next = tcb.map_or(core::ptr::null_mut(), |p| p.as_ptr()) };
}

// ============ Delay list ============
//
// Owned here (as a single NonNull head) so `kernel` remains the one
// singleton every other module reaches through; the delta-encoding logic
// that walks it lives in `crate::time`, which this field is crate-visible
// to.

pub(crate) static DELAY_LIST_HEAD: CsCell<Option<NonNull<Tcb>>> = CsCell::new(None);

// ============ Idle task ============

static mut IDLE_TCB: Tcb = Tcb::new();
static mut IDLE_STK: [crate::types::StkElement; 128] = [0; 128];

fn idle_task(_: *mut ()) -> ! {
    loop {
        #[cfg(target_arch = "arm")]
        cortex_m::asm::wfi();
        #[cfg(not(target_arch = "arm"))]
        core::hint::spin_loop();
    }
}

// ============ Boot sequence ============

/// Initialize the kernel.
///
/// Must be called before any other kernel function. Resets all kernel
/// state, initializes the ready-set and delay list, and creates the idle
/// task at the lowest priority.
#[allow(static_mut_refs)]
pub fn init() -> KernelResult<()> {
    if is_running() {
        return Err(KernelError::Param);
    }

    FLAGS.reset();
    unsafe {
        CPU_STATE.reset();
        READY.get_unchecked().reset();
        *DELAY_LIST_HEAD.get_unchecked() = None;
    }

    critical_section(|_cs| unsafe {
        crate::task::task_create_raw(
            &raw mut IDLE_TCB,
            "idle",
            idle_task,
            core::ptr::null_mut(),
            PRIO_IDLE,
            IDLE_STK.as_mut_ptr(),
            IDLE_STK.len(),
        )
    })?;

    FLAGS.initialized.store(true, Ordering::SeqCst);
    Ok(())
}

/// Start the scheduler: dispatch the highest-priority ready task (the idle
/// task if nothing else was created) and hand control to the CPU port.
/// Never returns under normal operation.
pub fn start_scheduler() -> KernelResult<()> {
    if !is_initialized() {
        return Err(KernelError::Param);
    }
    if is_running() {
        return Err(KernelError::Param);
    }

    critical_section(|_cs| unsafe {
        let next = ready_set_find_next().expect("idle task missing from ready-set");
        set_tcb_cur(Some(next));
        set_tcb_next(Some(next));
    });

    FLAGS.running.store(true, Ordering::SeqCst);

    crate::port::timer_init(crate::config::TICK_RATE_HZ);
    unsafe { crate::port::start_first_task() };

    Ok(())
}

pub use crate::critical::{enter_critical, exit_critical};

/// Tick handler entry point, called from the CPU port's tick ISR.
pub fn tick_handler() {
    crate::time::tick_handler();
}

pub(crate) type Cs = CriticalSection;
