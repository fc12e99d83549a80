//! Front-panel indicator state.

bitflags::bitflags! {
    /// Indicator LEDs. `X1..X8` form the level bar next to the mode LEDs.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct Indicators: u16 {
        const CV     = 1 << 0;
        const CC     = 1 << 1;
        const CHARGE = 1 << 2;
        /// Fault: latched error, snub, refused charge.
        const ERROR  = 1 << 3;
        const X1     = 1 << 4;
        const X2     = 1 << 5;
        const X3     = 1 << 6;
        const X4     = 1 << 7;
        const X5     = 1 << 8;
        const X6     = 1 << 9;
        const X7     = 1 << 10;
        /// Activity / output-on blinker.
        const X8     = 1 << 11;
    }
}

impl Indicators {
    /// Level-bar LED for a selector index (0 -> X1). Out-of-range indices light nothing.
    pub fn level(index: usize) -> Self {
        if index < 8 {
            Indicators::from_bits_truncate(Indicators::X1.bits() << index)
        } else {
            Indicators::empty()
        }
    }
}

/// Indicator set plus the dirty flag consumed by the 10 ms slice.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct LedPanel {
    lit: Indicators,
    dirty: bool,
}

impl LedPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lit(&self) -> Indicators {
        self.lit
    }

    pub fn is_lit(&self, leds: Indicators) -> bool {
        self.lit.contains(leds)
    }

    pub fn set(&mut self, leds: Indicators) {
        self.lit.insert(leds);
        self.dirty = true;
    }

    pub fn clear(&mut self, leds: Indicators) {
        self.lit.remove(leds);
        self.dirty = true;
    }

    pub fn toggle(&mut self, leds: Indicators) {
        self.lit.toggle(leds);
        self.dirty = true;
    }

    /// Turn everything off and force a publish.
    pub fn clear_all(&mut self) {
        self.lit = Indicators::empty();
        self.dirty = true;
    }

    /// Hand out the set to publish if anything changed since the last call.
    pub fn take_update(&mut self) -> Option<Indicators> {
        if self.dirty {
            self.dirty = false;
            Some(self.lit)
        } else {
            None
        }
    }
}
