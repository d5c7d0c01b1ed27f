//! Level sampling and sticky edge accumulation.

use crate::Sample;

/// Levels and pending edges for a chain of `N` eight-bit registers.
///
/// Each [`scan()`](#method.scan) captures a fresh sample and compares it
/// with the one before.  Bits that went 0→1 are added to the pending
/// pressed edges, bits that went 1→0 to the pending released edges.
/// Pending edges stay set until they are read, one bit at a time, by
/// [`pressed()`](#method.pressed) or [`released()`](#method.released).
///
/// Every query method takes a `suppress_scan` flag.  When false the
/// query scans first.  A scan is a bus transaction, so when several
/// buttons are queried in one pass you'll usually scan once and
/// suppress the rest; the edges are tracked per bit, so nothing is lost
/// either way.
///
/// Register indexes run from 0 to `N - 1` in the order the bytes are
/// shifted in.  Bit positions run from 0 to 7.
pub struct RegisterScanner<S, const N: usize> {
    bus: S,
    current: [u8; N],
    previous: [u8; N],
    pending_pressed: [u8; N],
    pending_released: [u8; N],
}

impl<S: Sample, const N: usize> RegisterScanner<S, N> {
    /// Create a new scanner on a level source.
    ///
    /// All levels start out released and no edges are pending.
    pub fn new(bus: S) -> Self {
        RegisterScanner {
            bus,
            current: [0; N],
            previous: [0; N],
            pending_pressed: [0; N],
            pending_released: [0; N],
        }
    }

    /// Put the bus in its idle state.  Call this once before scanning.
    pub fn begin(&mut self) -> Result<(), S::Error> {
        self.bus.begin()
    }

    /// Capture a fresh sample and accumulate its edges.
    ///
    /// If the bus fails, the previous levels and pending edges are left
    /// untouched.
    pub fn scan(&mut self) -> Result<(), S::Error> {
        let mut fresh = [0u8; N];
        self.bus.sample(&mut fresh)?;

        self.previous = self.current;
        self.current = fresh;

        for reg in 0..N {
            let rising = !self.previous[reg] & self.current[reg];
            let falling = self.previous[reg] & !self.current[reg];

            if rising | falling != 0 {
                log::trace!(
                    "register {}: pressed {:08b} released {:08b}",
                    reg,
                    rising,
                    falling
                );
            }

            self.pending_pressed[reg] |= rising;
            self.pending_released[reg] |= falling;
        }

        Ok(())
    }

    /// Whether the button saw a press edge since this was last asked.
    ///
    /// Reading clears that one pending bit, whatever its value, so two
    /// calls in a row without a scan in between give the edge and then
    /// `false`.  Other bits of the register are not affected.  An
    /// out-of-range register or position reads as `false`.
    pub fn pressed(&mut self, reg: usize, position: u8, suppress_scan: bool) -> Result<bool, S::Error> {
        if !suppress_scan {
            self.scan()?;
        }

        Ok(take_bit(&mut self.pending_pressed, reg, position))
    }

    /// Whether the button saw a release edge since this was last asked.
    ///
    /// Consumes the edge the same way [`pressed()`](#method.pressed) does.
    pub fn released(&mut self, reg: usize, position: u8, suppress_scan: bool) -> Result<bool, S::Error> {
        if !suppress_scan {
            self.scan()?;
        }

        Ok(take_bit(&mut self.pending_released, reg, position))
    }

    /// Whether the button is down in the latest sample.
    ///
    /// This doesn't consume anything.
    pub fn held(&mut self, reg: usize, position: u8, suppress_scan: bool) -> Result<bool, S::Error> {
        if !suppress_scan {
            self.scan()?;
        }

        Ok(read_bit(&self.current, reg, position))
    }

    /// The latest sample of a whole register, or 0 if `reg` is out of
    /// range.
    pub fn get_register(&mut self, reg: usize, suppress_scan: bool) -> Result<u8, S::Error> {
        if !suppress_scan {
            self.scan()?;
        }

        Ok(self.current.get(reg).copied().unwrap_or(0))
    }

    /// The sample before the latest one, or 0 if `reg` is out of range.
    pub fn previous_register(&self, reg: usize) -> u8 {
        self.previous.get(reg).copied().unwrap_or(0)
    }

    /// The number of registers in the chain.
    #[inline(always)]
    pub fn register_count(&self) -> usize {
        N
    }

    /// Borrow the level source.
    pub fn bus(&self) -> &S {
        &self.bus
    }

    /// Mutably borrow the level source.
    pub fn bus_mut(&mut self) -> &mut S {
        &mut self.bus
    }

    /// Destroy the scanner, returning the level source.
    pub fn release(self) -> S {
        self.bus
    }
}

#[inline(always)]
fn bit_mask(position: u8) -> Option<u8> {
    1u8.checked_shl(u32::from(position))
}

fn read_bit(masks: &[u8], reg: usize, position: u8) -> bool {
    match (masks.get(reg), bit_mask(position)) {
        (Some(byte), Some(mask)) => byte & mask != 0,
        _ => false,
    }
}

fn take_bit(masks: &mut [u8], reg: usize, position: u8) -> bool {
    match (masks.get_mut(reg), bit_mask(position)) {
        (Some(byte), Some(mask)) => {
            let set = *byte & mask != 0;
            *byte &= !mask;
            set
        }
        _ => false,
    }
}
