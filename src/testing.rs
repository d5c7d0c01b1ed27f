//! A scripted level source for exercising the scanner without pins.

use crate::Sample;

/// The error a [`Levels`] source reports while unplugged.
#[derive(Debug, PartialEq)]
pub struct Unplugged;

/// Hands out whatever levels the test last set, for every sample.
pub struct Levels<const N: usize> {
    pub levels: [u8; N],
    pub samples: usize,
    pub started: bool,
    pub unplugged: bool,
}

impl<const N: usize> Levels<N> {
    pub fn new() -> Self {
        Levels {
            levels: [0; N],
            samples: 0,
            started: false,
            unplugged: false,
        }
    }

    pub fn set(&mut self, reg: usize, byte: u8) {
        self.levels[reg] = byte;
    }
}

impl<const N: usize> Sample for Levels<N> {
    type Error = Unplugged;

    fn begin(&mut self) -> Result<(), Self::Error> {
        self.started = true;
        Ok(())
    }

    fn sample(&mut self, levels: &mut [u8]) -> Result<(), Self::Error> {
        if self.unplugged {
            // scribble on the buffer, as a half-finished shift would
            levels.iter_mut().for_each(|level| *level = 0xa5);
            return Err(Unplugged);
        }

        levels.copy_from_slice(&self.levels);
        self.samples += 1;
        Ok(())
    }
}
