//! Device logic for the RFID lock.
//!
//! Everything in here is hardware-agnostic so it can be unit tested on the
//! host. The board binary (`main.rs`, `stm32` feature) wires it to the
//! STM32F411 peripherals.
#![cfg_attr(not(test), no_std)]

pub mod buzzer;
pub mod command;
pub mod config;
pub mod controller;
pub mod device;
pub mod errors;
pub mod lock;
pub mod log_line;
pub mod pressure;
pub mod serial;
pub mod uid;
pub mod watchdog;

/// Milliseconds from a free-running tick counter.
pub type Millis = u32;

/// Time elapsed since `since`, correct across a counter rollover.
#[inline]
pub fn elapsed(now: Millis, since: Millis) -> Millis {
    now.wrapping_sub(since)
}
