//! The bit-banged 74HC165 capture protocol.

use core::fmt;
use core::marker::PhantomData;

use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::digital::v2::{InputPin, OutputPin};

use crate::ShiftConfig;

/// A source of raw register levels.
///
/// [`ShiftRegisterBus`](ShiftRegisterBus) is the implementation you
/// want for real hardware.  Implement this yourself to drive a
/// [`RegisterScanner`](crate::RegisterScanner) from something else,
/// such as a simulator or a different register family.
pub trait Sample {
    /// Error type for sampling.
    type Error;

    /// Put the control lines in their idle state.
    fn begin(&mut self) -> Result<(), Self::Error>;

    /// Capture one fresh sample of every register in the chain.
    ///
    /// `levels[0]` is the first byte shifted in.  Within a byte, a set
    /// bit means the button is pressed.
    fn sample(&mut self, levels: &mut [u8]) -> Result<(), Self::Error>;
}

/// An error that arose on the shift register bus.
#[derive(Debug)]
pub enum BusError<PinError> {
    /// The bus was sampled before the call to
    /// [`begin()`](Sample#tymethod.begin) completed.
    NotStarted,

    /// An error driving or reading one of the pins.
    Pin(PinError),
}

impl<PinError: fmt::Debug> fmt::Display for BusError<PinError> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusError::NotStarted => f.write_str("shift register bus sampled before begin()"),
            BusError::Pin(e) => write!(f, "pin error: {:?}", e),
        }
    }
}

/// A chain of 74HC165 registers on four pins.
///
/// ## Type Parameters
///
/// * `ShLd` - shift/load pin, low to latch the parallel inputs
/// * `ClkInh` - clock inhibit pin, low to enable clocking
/// * `Clk` - clock pin, shifts on the rising edge
/// * `Data` - serial data input (the last register's QH)
/// * `Delay` - microsecond delay for the load pulse
/// * `Cfg` - static configuration, see [`ShiftConfig`](ShiftConfig)
pub struct ShiftRegisterBus<ShLd, ClkInh, Clk, Data, Delay, Cfg> {
    cfg: PhantomData<Cfg>,
    shift_load: ShLd,
    clock_inhibit: ClkInh,
    clock: Clk,
    data: Data,
    delay: Delay,
    started: bool,
}

impl<ShLd, ClkInh, Clk, Data, Delay, Cfg> ShiftRegisterBus<ShLd, ClkInh, Clk, Data, Delay, Cfg> {
    /// Create a new bus from its pins.
    ///
    /// Pin directions are whatever the HAL gave you; call
    /// [`begin()`](Sample#tymethod.begin) before sampling.
    pub fn new(shift_load: ShLd, clock_inhibit: ClkInh, clock: Clk, data: Data, delay: Delay) -> Self {
        ShiftRegisterBus {
            cfg: PhantomData,
            shift_load,
            clock_inhibit,
            clock,
            data,
            delay,
            started: false,
        }
    }

    /// Destroy the bus, returning the pins and delay in constructor
    /// order.
    pub fn release(self) -> (ShLd, ClkInh, Clk, Data, Delay) {
        (
            self.shift_load,
            self.clock_inhibit,
            self.clock,
            self.data,
            self.delay,
        )
    }
}

impl<ShLd, ClkInh, Clk, Data, Delay, Cfg, E> ShiftRegisterBus<ShLd, ClkInh, Clk, Data, Delay, Cfg>
where
    ShLd: OutputPin<Error = E>,
    ClkInh: OutputPin<Error = E>,
    Clk: OutputPin<Error = E>,
    Data: InputPin<Error = E>,
    Delay: DelayUs<u32>,
    Cfg: ShiftConfig,
{
    /// Latch the parallel inputs of every register in the chain.
    fn load(&mut self) -> Result<(), BusError<E>> {
        self.shift_load.set_low().map_err(BusError::Pin)?;
        self.delay.delay_us(Cfg::PULSE_US);
        self.shift_load.set_high().map_err(BusError::Pin)?;
        self.delay.delay_us(Cfg::PULSE_US);
        Ok(())
    }

    /// Clock in one byte, most significant bit first.
    ///
    /// The clock idles high, so the first bit is already on the data
    /// line when we get here; every later bit follows a rising edge.
    fn shift_in(&mut self) -> Result<u8, BusError<E>> {
        let mut byte = 0u8;
        for bit in (0..8).rev() {
            self.clock.set_high().map_err(BusError::Pin)?;
            if self.data.is_high().map_err(BusError::Pin)? {
                byte |= 1 << bit;
            }
            self.clock.set_low().map_err(BusError::Pin)?;
        }

        Ok(if Cfg::ACTIVE_LOW { !byte } else { byte })
    }

    fn capture(&mut self, levels: &mut [u8]) -> Result<(), BusError<E>> {
        self.load()?;

        // Clocking needs SH/LD high and CLK INH low.
        self.clock_inhibit.set_low().map_err(BusError::Pin)?;

        for level in levels.iter_mut() {
            *level = self.shift_in()?;
        }

        // CLK INH may only rise while CLK is high.
        self.clock.set_high().map_err(BusError::Pin)?;
        self.clock_inhibit.set_high().map_err(BusError::Pin)?;

        Ok(())
    }
}

impl<ShLd, ClkInh, Clk, Data, Delay, Cfg, E> Sample for ShiftRegisterBus<ShLd, ClkInh, Clk, Data, Delay, Cfg>
where
    ShLd: OutputPin<Error = E>,
    ClkInh: OutputPin<Error = E>,
    Clk: OutputPin<Error = E>,
    Data: InputPin<Error = E>,
    Delay: DelayUs<u32>,
    Cfg: ShiftConfig,
{
    type Error = BusError<E>;

    fn begin(&mut self) -> Result<(), Self::Error> {
        // Idle levels from the '165 timing diagram.
        self.clock.set_high().map_err(BusError::Pin)?;
        self.shift_load.set_high().map_err(BusError::Pin)?;
        self.started = true;

        log::debug!("shift register bus started");
        Ok(())
    }

    fn sample(&mut self, levels: &mut [u8]) -> Result<(), Self::Error> {
        if !self.started {
            return Err(BusError::NotStarted);
        }

        self.capture(levels).map_err(|e| {
            // Best effort back to idle, or the next sample's first
            // clock high is a real edge and drops a bit.
            let _ = self.clock.set_high();
            let _ = self.clock_inhibit.set_high();
            e
        })
    }
}
