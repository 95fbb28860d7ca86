//! `embedded_hal::delay::DelayNs` backed by `std::thread::sleep`, standing
//! in for whatever timer peripheral a board crate would supply.

use embedded_hal::delay::DelayNs;
use std::time::Duration;

#[derive(Clone, Copy, Default)]
pub struct SystemDelay;

impl DelayNs for SystemDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(ns as u64));
    }
}
