//! Blink demo - LED blinking using the kernel on STM32F401

#![no_std]
#![no_main]
#![allow(static_mut_refs)]

use cortex_m_rt::entry;
use rtkernel::task::Tcb;
use rtkernel::types::StkElement;
use rtkernel::{delay, task_create};

#[cfg(feature = "pac")]
use stm32_metapac as pac;

// ============ Task storage ============

static mut BLINK_STK: [StkElement; 512] = [0; 512];
static mut BLINK_TCB: Tcb = Tcb::new();

static mut TEST_STK: [StkElement; 512] = [0; 512];
static mut TEST_TCB: Tcb = Tcb::new();

// ============ LED control ============

#[cfg(feature = "pac")]
fn led_init() {
    pac::RCC.ahb1enr().modify(|w| w.set_gpioaen(true));
    pac::GPIOA.moder().modify(|w| w.set_moder(5, pac::gpio::vals::Moder::OUTPUT));
    pac::GPIOA.otyper().modify(|w| w.set_ot(5, pac::gpio::vals::Ot::PUSHPULL));
}

#[cfg(feature = "pac")]
fn led_on() { pac::GPIOA.bsrr().write(|w| w.set_bs(5, true)); }
#[cfg(feature = "pac")]
fn led_off() { pac::GPIOA.bsrr().write(|w| w.set_br(5, true)); }

#[cfg(not(feature = "pac"))]
fn led_init() {}
#[cfg(not(feature = "pac"))]
fn led_on() {}
#[cfg(not(feature = "pac"))]
fn led_off() {}

// ============ Tasks ============

fn blink_task(_: *mut ()) -> ! {
    rtkernel::info!("blink task started");
    loop {
        led_on();
        rtkernel::info!("LED ON");
        let _ = delay(500);

        led_off();
        rtkernel::info!("LED OFF");
        let _ = delay(500);
    }
}

fn test_task(_: *mut ()) -> ! {
    rtkernel::info!("test task started");
    loop {
        rtkernel::info!("test tick");
        let _ = delay(1000);
    }
}

// ============ Main ============

#[entry]
fn main() -> ! {
    led_init();

    rtkernel::init().expect("kernel init failed");

    unsafe {
        task_create(&mut BLINK_TCB, &mut BLINK_STK, "blink", blink_task, core::ptr::null_mut(), 5)
            .expect("blink task creation failed");

        task_create(&mut TEST_TCB, &mut TEST_STK, "test", test_task, core::ptr::null_mut(), 5)
            .expect("test task creation failed");
    }

    rtkernel::info!("starting scheduler");
    rtkernel::start_scheduler().expect("scheduler start failed");

    loop {
        cortex_m::asm::nop();
    }
}
