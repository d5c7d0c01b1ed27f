//! Button edges and press/hold gestures from daisy-chained shift registers.
//!
//! A parallel-in/serial-out shift register such as the 74HC165 latches
//! eight digital inputs at once and clocks them out one bit at a time.
//! Chain a few of them and a handful of microcontroller pins can read
//! dozens of buttons.  This crate drives that protocol through
//! [`embedded-hal`][0] pins, turns consecutive samples into sticky
//! "pressed" and "released" edges, and layers a small timed classifier
//! on top that tells a short press from a hold and a repeating hold.
//!
//! There is no debounce filtering beyond the one-sample edge
//! computation.  Contact bounce is left to the hardware or to the
//! cadence at which you scan.
//!
//! # Usage
//!
//! You need to bring just a few things:
//!
//! - Three output pins (shift/load, clock inhibit, clock) and one input
//!   pin (serial data), perhaps provided by a hardware abstraction
//!   layer (HAL) for your chip.  All four must share an error type.
//! - A microsecond delay, for the register's minimum pulse widths.
//! - An implementation of the [`ShiftConfig`](ShiftConfig) trait, maybe
//!   just one from the [`default`](default) module.
//! - A millisecond counter, as anything implementing [`Clock`](Clock).
//!   Any `Fn() -> u32` closure will do.
//! - Some way to regularly call [`run()`](GestureTracker#method.run) on
//!   each tracker, usually from your main loop.
//!
//! Your implementation will consist of three major steps:
//!
//! ## Create the scanner.
//!
//! The number of registers in the chain is fixed for the lifetime of
//! the scanner.  Since trackers share it, keep it in a `RefCell`.
//!
//! ```
//! # use core::convert::Infallible;
//! # use embedded_hal::blocking::delay::DelayUs;
//! # use embedded_hal::digital::v2::{InputPin, OutputPin};
//! # struct Pin;
//! # impl OutputPin for Pin {
//! #     type Error = Infallible;
//! #     fn set_low(&mut self) -> Result<(), Self::Error> {
//! #         Ok(())
//! #     }
//! #     fn set_high(&mut self) -> Result<(), Self::Error> {
//! #         Ok(())
//! #     }
//! # }
//! # impl InputPin for Pin {
//! #     type Error = Infallible;
//! #     fn is_high(&self) -> Result<bool, Self::Error> {
//! #         Ok(true)
//! #     }
//! #     fn is_low(&self) -> Result<bool, Self::Error> {
//! #         Ok(false)
//! #     }
//! # }
//! # struct Delay;
//! # impl DelayUs<u32> for Delay {
//! #     fn delay_us(&mut self, _us: u32) {}
//! # }
//! use core::cell::RefCell;
//! use shiftpress::{default::ActiveLow, RegisterScanner, ShiftRegisterBus};
//!
//! let bus: ShiftRegisterBus<_, _, _, _, _, ActiveLow> =
//!     ShiftRegisterBus::new(Pin, Pin, Pin, Pin, Delay);
//! let scanner: RefCell<RegisterScanner<_, 2>> = RefCell::new(RegisterScanner::new(bus));
//!
//! scanner.borrow_mut().begin().unwrap();
//! ```
//!
//! ## Attach trackers.
//!
//! Each button you care about gets a [`GestureTracker`](GestureTracker)
//! naming its register and bit position.  Handlers are optional.
//!
//! ```
//! # use core::convert::Infallible;
//! # use embedded_hal::blocking::delay::DelayUs;
//! # use embedded_hal::digital::v2::{InputPin, OutputPin};
//! # struct Pin;
//! # impl OutputPin for Pin {
//! #     type Error = Infallible;
//! #     fn set_low(&mut self) -> Result<(), Self::Error> {
//! #         Ok(())
//! #     }
//! #     fn set_high(&mut self) -> Result<(), Self::Error> {
//! #         Ok(())
//! #     }
//! # }
//! # impl InputPin for Pin {
//! #     type Error = Infallible;
//! #     fn is_high(&self) -> Result<bool, Self::Error> {
//! #         Ok(true)
//! #     }
//! #     fn is_low(&self) -> Result<bool, Self::Error> {
//! #         Ok(false)
//! #     }
//! # }
//! # struct Delay;
//! # impl DelayUs<u32> for Delay {
//! #     fn delay_us(&mut self, _us: u32) {}
//! # }
//! # use core::cell::RefCell;
//! # use shiftpress::{default::ActiveLow, RegisterScanner, ShiftRegisterBus};
//! # let bus: ShiftRegisterBus<_, _, _, _, _, ActiveLow> =
//! #     ShiftRegisterBus::new(Pin, Pin, Pin, Pin, Delay);
//! # let scanner: RefCell<RegisterScanner<_, 2>> = RefCell::new(RegisterScanner::new(bus));
//! # scanner.borrow_mut().begin().unwrap();
//! use shiftpress::GestureTracker;
//!
//! let millis = || 0u32;
//! let mut select = || { /* short press */ };
//! let mut scroll = || { /* held, and every 200ms after */ };
//!
//! let mut button = GestureTracker::new(&scanner, millis, 1, 3);
//! button.press_handler(&mut select);
//! button.hold_handler(&mut scroll, 750);
//! button.set_hold_repeat(200);
//! ```
//!
//! ## Run the trackers.
//!
//! On a regular basis, make a call to [`run()`](GestureTracker#method.run).
//! By default each call scans the chain once.  With several trackers
//! you may prefer to scan once yourself and turn that off with
//! [`scan_on_run()`](GestureTracker#method.scan_on_run).
//!
//! ```ignore
//! loop {
//!     button.run().unwrap();
//! }
//! ```
//!
//! [0]: https://github.com/rust-embedded/embedded-hal

#![no_std]
#![deny(missing_docs)]
#![doc(html_root_url = "https://docs.rs/shiftpress/0.1.0")]

mod bus;
mod gesture;
mod scanner;
#[cfg(test)]
mod testing;

pub use bus::{BusError, Sample, ShiftRegisterBus};
pub use gesture::{Gesture, GestureConfig, GestureState, GestureTracker};
pub use scanner::RegisterScanner;

/// Static configuration of the shift register protocol.
pub trait ShiftConfig {
    /// How long to hold each edge of the shift/load pulse, in
    /// microseconds.
    ///
    /// The 74HC165 needs a few hundred nanoseconds at worst; the
    /// default configurations use 5µs, which is plenty even with long
    /// wires between chained registers.
    const PULSE_US: u32;

    /// Whether a pressed button reads as a low bit.
    ///
    /// If `ACTIVE_LOW` is true, every sampled byte is inverted so that
    /// a set bit always means "pressed" further up the stack.  This is
    /// the usual case with pull-up resistors and buttons to ground.
    const ACTIVE_LOW: bool;
}

/// Some default configurations.
///
/// These provide reasonable defaults for a 74HC165 chain.
pub mod default {
    /// A reasonable default active-high configuration.
    pub struct ActiveHigh;

    impl super::ShiftConfig for ActiveHigh {
        /// With a `PULSE_US` of 5, each load takes about 10µs.
        const PULSE_US: u32 = 5;

        /// Buttons pull their inputs high.
        const ACTIVE_LOW: bool = false;
    }

    /// A reasonable default active-low configuration.
    pub struct ActiveLow;

    impl super::ShiftConfig for ActiveLow {
        /// With a `PULSE_US` of 5, each load takes about 10µs.
        const PULSE_US: u32 = 5;

        /// Buttons pull their inputs to ground.
        const ACTIVE_LOW: bool = true;
    }
}

/// A monotonic millisecond counter.
///
/// It may wrap around; elapsed times are always computed with wrapping
/// subtraction, which stays correct across a single overflow.
pub trait Clock {
    /// The current time in milliseconds.
    fn now_ms(&self) -> u32;
}

impl<F: Fn() -> u32> Clock for F {
    #[inline(always)]
    fn now_ms(&self) -> u32 {
        self()
    }
}
