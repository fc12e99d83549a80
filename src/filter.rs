//! Single-pole IIR low-pass filter.
//!
//! `y = (y * a + x) / (a + 1)` with truncating division. Under a constant input the
//! output settles at most `a` counts below it; callers that need tighter settling use a
//! smaller attenuation.

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct IirLowPass {
    value: u32,
    attenuation: u8,
}

impl IirLowPass {
    /// Create a filter with a zeroed accumulator. Higher attenuation responds slower.
    pub const fn new(attenuation: u8) -> Self {
        Self { value: 0, attenuation }
    }

    /// Reset the accumulator and replace the attenuation.
    pub fn init(&mut self, attenuation: u8) {
        self.value = 0;
        self.attenuation = attenuation;
    }

    pub fn attenuation(&self) -> u8 {
        self.attenuation
    }

    pub fn value(&self) -> u16 {
        self.value as u16
    }

    /// Fold in one sample and return the new output.
    pub fn update(&mut self, sample: u16) -> u16 {
        let a = self.attenuation as u32;
        self.value = (self.value * a + sample as u32) / (a + 1);
        self.value as u16
    }
}
