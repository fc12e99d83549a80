//! Same-rate cascade of the cooperative scheduler: 10 ms -> 100 ms -> 500 ms -> 1000 ms.

/// Slower slices that fire after a 10 ms slice.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Slices {
    pub ms100: bool,
    pub ms500: bool,
    pub ms1000: bool,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SliceCascade {
    count_10ms: u8,
    count_100ms: u8,
    count_500ms: u8,
}

impl SliceCascade {
    pub const fn new() -> Self {
        Self { count_10ms: 0, count_100ms: 0, count_500ms: 0 }
    }

    /// Account for one 10 ms slice: every 10th fires 100 ms, every 5th of those 500 ms,
    /// every 2nd of those 1000 ms.
    pub fn on_10ms(&mut self) -> Slices {
        let mut slices = Slices::default();

        self.count_10ms += 1;
        if self.count_10ms < 10 {
            return slices;
        }
        self.count_10ms = 0;
        slices.ms100 = true;

        self.count_100ms += 1;
        if self.count_100ms < 5 {
            return slices;
        }
        self.count_100ms = 0;
        slices.ms500 = true;

        self.count_500ms += 1;
        if self.count_500ms < 2 {
            return slices;
        }
        self.count_500ms = 0;
        slices.ms1000 = true;

        slices
    }
}
