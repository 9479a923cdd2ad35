//! GPIO adapter for the 74HC595 control lines.
//!
//! The shift register hangs off three push-pull MCU pins. `lights-core` owns
//! the bit-serial protocol; this module only maps its line-level requests
//! onto the Embassy GPIO driver.

#![cfg(target_os = "none")]

use embassy_stm32::gpio::Output;

use lights_core::output::{LineLevel, RegisterBus};

/// [`RegisterBus`] implementation over the latch, clock, and data pins.
pub struct GpioRegisterBus<'d> {
    latch: Output<'d>,
    clock: Output<'d>,
    data: Output<'d>,
}

impl<'d> GpioRegisterBus<'d> {
    /// Creates the bus from already-configured push-pull outputs.
    pub fn new(latch: Output<'d>, clock: Output<'d>, data: Output<'d>) -> Self {
        Self { latch, clock, data }
    }
}

impl RegisterBus for GpioRegisterBus<'_> {
    fn set_latch(&mut self, level: LineLevel) {
        drive(&mut self.latch, level);
    }

    fn set_clock(&mut self, level: LineLevel) {
        drive(&mut self.clock, level);
    }

    fn set_data(&mut self, level: LineLevel) {
        drive(&mut self.data, level);
    }
}

fn drive(pin: &mut Output<'_>, level: LineLevel) {
    match level {
        LineLevel::Low => pin.set_low(),
        LineLevel::High => pin.set_high(),
    }
}
