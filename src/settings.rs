//! Persisted settings: layout, load-time repair and the debounced save countdown.
//!
//! Blob layout (16 bytes, little endian, written in 4-byte chunks):
//!
//! | offset | field                         |
//! |--------|-------------------------------|
//! | 0      | mode                          |
//! | 1      | output enabled                |
//! | 2      | input current trim (i8)       |
//! | 3      | output current trim (i8)      |
//! | 4..6   | input idle baseline (u16)     |
//! | 6..8   | output idle baseline (u16)    |
//! | 8      | input voltage trim (i8)       |
//! | 9      | output voltage trim (i8)      |
//! | 10     | CV voltage                    |
//! | 11, 12 | CC current, CC voltage        |
//! | 13, 14 | charge current, charge voltage|
//! | 15     | reserved                      |

use crate::data_types::{AppMode, CurrentLevel, VoltageLevel};

pub const SETTINGS_BLOB_LEN: usize = 16;
/// Storage write granularity.
pub const SETTINGS_CHUNK_LEN: usize = 4;

/// Measurement trims and idle-current baselines.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CalibrationOffsets {
    /// Shunt trim in mΩ.
    pub input_current: i8,
    /// Raw decimated code read with no load.
    pub input_current_idle: u16,
    pub output_current: i8,
    pub output_current_idle: u16,
    /// Divider trim in tenths.
    pub input_voltage: i8,
    pub output_voltage: i8,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CvSettings {
    pub voltage: VoltageLevel,
}

/// Current target plus the voltage ceiling.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CcSettings {
    pub current: CurrentLevel,
    pub voltage: VoltageLevel,
}

/// Charge current plus the battery voltage class.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ChargeSettings {
    pub current: CurrentLevel,
    pub voltage: VoltageLevel,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Settings {
    pub mode: AppMode,
    pub output_enabled: bool,
    pub calibration: CalibrationOffsets,
    pub cv: CvSettings,
    pub cc: CcSettings,
    pub charge: ChargeSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: AppMode::Idle,
            output_enabled: false,
            calibration: CalibrationOffsets::default(),
            cv: CvSettings { voltage: VoltageLevel::V1_5 },
            cc: CcSettings { current: CurrentLevel::Ma20, voltage: VoltageLevel::V1_5 },
            charge: ChargeSettings { current: CurrentLevel::Ma20, voltage: VoltageLevel::V1_5 },
        }
    }
}

/// Decode an index, falling back to `default` and counting the repair.
fn repair<T: TryFrom<u8>>(raw: u8, default: T, repaired: &mut u8) -> T {
    match T::try_from(raw) {
        Ok(value) => value,
        Err(_) => {
            *repaired += 1;
            default
        }
    }
}

impl Settings {
    pub fn encode(&self) -> [u8; SETTINGS_BLOB_LEN] {
        let cal = &self.calibration;
        let mut blob = [0u8; SETTINGS_BLOB_LEN];
        blob[0] = self.mode as u8;
        blob[1] = self.output_enabled as u8;
        blob[2] = cal.input_current as u8;
        blob[3] = cal.output_current as u8;
        blob[4..6].copy_from_slice(&cal.input_current_idle.to_le_bytes());
        blob[6..8].copy_from_slice(&cal.output_current_idle.to_le_bytes());
        blob[8] = cal.input_voltage as u8;
        blob[9] = cal.output_voltage as u8;
        blob[10] = self.cv.voltage as u8;
        blob[11] = self.cc.current as u8;
        blob[12] = self.cc.voltage as u8;
        blob[13] = self.charge.current as u8;
        blob[14] = self.charge.voltage as u8;
        blob
    }

    /// Decode a stored blob. Out-of-range selectors and transient modes are replaced by
    /// defaults; the second value counts the repaired fields.
    pub fn decode(blob: &[u8; SETTINGS_BLOB_LEN]) -> (Self, u8) {
        let defaults = Settings::default();
        let mut repaired = 0;

        let mut mode = repair(blob[0], defaults.mode, &mut repaired);
        if mode.is_transient() {
            mode = defaults.mode;
            repaired += 1;
        }

        let settings = Self {
            mode,
            output_enabled: blob[1] != 0,
            calibration: CalibrationOffsets {
                input_current: blob[2] as i8,
                output_current: blob[3] as i8,
                input_current_idle: u16::from_le_bytes([blob[4], blob[5]]),
                output_current_idle: u16::from_le_bytes([blob[6], blob[7]]),
                input_voltage: blob[8] as i8,
                output_voltage: blob[9] as i8,
            },
            cv: CvSettings {
                voltage: repair(blob[10], defaults.cv.voltage, &mut repaired),
            },
            cc: CcSettings {
                current: repair(blob[11], defaults.cc.current, &mut repaired),
                voltage: repair(blob[12], defaults.cc.voltage, &mut repaired),
            },
            charge: ChargeSettings {
                current: repair(blob[13], defaults.charge.current, &mut repaired),
                voltage: repair(blob[14], defaults.charge.voltage, &mut repaired),
            },
        };
        (settings, repaired)
    }
}

/// Seconds countdown to the next settings write, driven by the 1000 ms slice.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SaveScheduler {
    remaining_s: u8,
}

impl SaveScheduler {
    pub const fn new() -> Self {
        Self { remaining_s: 0 }
    }

    /// (Re)start the countdown. A later request replaces an earlier one.
    pub fn schedule(&mut self, delay_s: u8) {
        self.remaining_s = delay_s.max(1);
    }

    pub fn cancel(&mut self) {
        self.remaining_s = 0;
    }

    pub fn is_pending(&self) -> bool {
        self.remaining_s > 0
    }

    pub fn remaining_s(&self) -> u8 {
        self.remaining_s
    }

    /// Advance one second; true when the save is due now.
    pub fn tick_1000ms(&mut self) -> bool {
        if self.remaining_s == 0 {
            return false;
        }
        self.remaining_s -= 1;
        self.remaining_s == 0
    }
}
