//! Priority inversion demo - mutex priority inheritance
//!
//! Three tasks: High(5), Med(10), Low(15).
//! Low holds the mutex, High blocks on it, Low is boosted to priority 5
//! for as long as it holds the mutex.

#![no_std]
#![no_main]
#![allow(static_mut_refs)]

use core::sync::atomic::{AtomicU32, Ordering};

use cortex_m_rt::entry;
use defmt::info;
use rtkernel::mutex::Mutex;
use rtkernel::task::Tcb;
use rtkernel::types::StkElement;
use rtkernel::{delay, task_create};

static HIGH_RUNS: AtomicU32 = AtomicU32::new(0);
static LOW_RUNS: AtomicU32 = AtomicU32::new(0);

static MTX: Mutex = Mutex::new();

static mut HIGH_STK: [StkElement; 256] = [0; 256];
static mut HIGH_TCB: Tcb = Tcb::new();
static mut MED_STK: [StkElement; 256] = [0; 256];
static mut MED_TCB: Tcb = Tcb::new();
static mut LOW_STK: [StkElement; 256] = [0; 256];
static mut LOW_TCB: Tcb = Tcb::new();

/// High priority task (prio=5)
fn high_task_fn(_arg: *mut ()) -> ! {
    let _ = delay(50);

    loop {
        let n = HIGH_RUNS.fetch_add(1, Ordering::Relaxed) + 1;

        let _ = MTX.pend();
        info!("[HIGH] acquired #{}", n);

        for _ in 0..1_000 {
            cortex_m::asm::nop();
        }

        let _ = MTX.post();
        let _ = delay(100);
    }
}

/// Medium priority task (prio=10), CPU bound, never touches the mutex.
fn med_task_fn(_arg: *mut ()) -> ! {
    loop {
        for _ in 0..50_000 {
            cortex_m::asm::nop();
        }
        let _ = delay(10);
    }
}

/// Low priority task (prio=15), holds the mutex for a long stretch.
fn low_task_fn(_arg: *mut ()) -> ! {
    loop {
        let n = LOW_RUNS.fetch_add(1, Ordering::Relaxed) + 1;

        let _ = MTX.pend();
        info!("[LOW] holding #{}", n);

        for _ in 0..100_000 {
            cortex_m::asm::nop();
        }

        let _ = MTX.post();
        let _ = delay(200);
    }
}

#[entry]
fn main() -> ! {
    info!("Priority Inversion Demo: H(5) M(10) L(15)");

    rtkernel::init().expect("kernel init failed");
    MTX.init().unwrap();

    unsafe {
        task_create(&mut LOW_TCB, &mut LOW_STK, "L", low_task_fn, core::ptr::null_mut(), 15).unwrap();
        task_create(&mut MED_TCB, &mut MED_STK, "M", med_task_fn, core::ptr::null_mut(), 10).unwrap();
        task_create(&mut HIGH_TCB, &mut HIGH_STK, "H", high_task_fn, core::ptr::null_mut(), 5).unwrap();
    }

    info!("Starting...");
    rtkernel::start_scheduler().expect("scheduler start failed");

    loop {
        cortex_m::asm::wfi();
    }
}
