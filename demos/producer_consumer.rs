//! Producer-consumer demo using a counting semaphore

#![no_std]
#![no_main]
#![allow(static_mut_refs)]

use core::sync::atomic::{AtomicU32, Ordering};

use cortex_m_rt::entry;
use defmt::info;
use rtkernel::sem::Semaphore;
use rtkernel::task::Tcb;
use rtkernel::types::StkElement;
use rtkernel::{delay, task_create};

static PRODUCED: AtomicU32 = AtomicU32::new(0);
static CONSUMED: AtomicU32 = AtomicU32::new(0);

static SEM: Semaphore = Semaphore::new(0);

static mut PRODUCER_STK: [StkElement; 256] = [0; 256];
static mut PRODUCER_TCB: Tcb = Tcb::new();
static mut CONSUMER_STK: [StkElement; 256] = [0; 256];
static mut CONSUMER_TCB: Tcb = Tcb::new();

fn producer_task(_arg: *mut ()) -> ! {
    loop {
        let n = PRODUCED.fetch_add(1, Ordering::Relaxed) + 1;
        let _ = SEM.post();
        info!("[P] produced #{}", n);
        let _ = delay(200);
    }
}

fn consumer_task(_arg: *mut ()) -> ! {
    loop {
        let _ = SEM.wait();
        let n = CONSUMED.fetch_add(1, Ordering::Relaxed) + 1;
        info!("[C] consumed #{}", n);
        for _ in 0..10_000 {
            cortex_m::asm::nop();
        }
    }
}

#[entry]
fn main() -> ! {
    info!("Producer-Consumer Demo");

    rtkernel::init().expect("kernel init failed");
    SEM.init(0).unwrap();

    unsafe {
        task_create(&mut PRODUCER_TCB, &mut PRODUCER_STK, "P", producer_task, core::ptr::null_mut(), 15).unwrap();
        task_create(&mut CONSUMER_TCB, &mut CONSUMER_STK, "C", consumer_task, core::ptr::null_mut(), 10).unwrap();
    }

    info!("Starting...");
    rtkernel::start_scheduler().expect("scheduler start failed");

    loop {
        cortex_m::asm::wfi();
    }
}
