//! Data types shared across the control core: mode selectors, target tables and readings.

/// Application mode selector, in mode-ring order.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AppMode {
    Idle,
    /// Constant voltage.
    Cv,
    /// Constant current with a voltage ceiling.
    Cc,
    /// Battery charge (CC wrapping CV).
    Charge,
    /// Maximum-power-point tracking stub.
    Mppt,
    /// Latched protection fault.
    Error,
    Calibration,
}

impl AppMode {
    /// Next mode on the ring. Every mode from MPPT onwards wraps to Idle.
    pub fn next(self) -> Self {
        match self {
            AppMode::Idle => AppMode::Cv,
            AppMode::Cv => AppMode::Cc,
            AppMode::Cc => AppMode::Charge,
            AppMode::Charge => AppMode::Mppt,
            AppMode::Mppt | AppMode::Error | AppMode::Calibration => AppMode::Idle,
        }
    }

    /// Modes that must never be restored from storage.
    pub fn is_transient(self) -> bool {
        matches!(self, AppMode::Error | AppMode::Calibration)
    }
}

impl TryFrom<u8> for AppMode {
    type Error = u8;

    // `Self::Error` would also name the `Error` variant.
    fn try_from(value: u8) -> Result<Self, u8> {
        match value {
            0 => Ok(AppMode::Idle),
            1 => Ok(AppMode::Cv),
            2 => Ok(AppMode::Cc),
            3 => Ok(AppMode::Charge),
            4 => Ok(AppMode::Mppt),
            5 => Ok(AppMode::Error),
            6 => Ok(AppMode::Calibration),
            other => Err(other),
        }
    }
}

/// Selectable voltage target. Also used as the voltage class of the charger.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VoltageLevel {
    V1_5,
    V3,
    V3_7,
    V5,
    V9,
    V12,
    /// Top slot. The panel labels it 18 V but the output is capped at 14 V.
    V14,
}

/// Selectable current target.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CurrentLevel {
    Ma20,
    Ma100,
    Ma250,
    Ma500,
    Ma750,
    Ma1000,
    Ma1500,
}

/// Number of entries in each selector table.
pub const LEVEL_COUNT: usize = 7;

const VOLTAGE_LEVELS: [VoltageLevel; LEVEL_COUNT] = [
    VoltageLevel::V1_5,
    VoltageLevel::V3,
    VoltageLevel::V3_7,
    VoltageLevel::V5,
    VoltageLevel::V9,
    VoltageLevel::V12,
    VoltageLevel::V14,
];

const CURRENT_LEVELS: [CurrentLevel; LEVEL_COUNT] = [
    CurrentLevel::Ma20,
    CurrentLevel::Ma100,
    CurrentLevel::Ma250,
    CurrentLevel::Ma500,
    CurrentLevel::Ma750,
    CurrentLevel::Ma1000,
    CurrentLevel::Ma1500,
];

/// CV target per voltage level (mV).
pub const CV_TARGET_MV: [u32; LEVEL_COUNT] = [1_500, 3_000, 3_700, 5_000, 9_000, 12_000, 14_000];
/// CC target per current level (mA).
pub const CC_TARGET_MA: [u32; LEVEL_COUNT] = [20, 100, 250, 500, 750, 1_000, 1_500];
/// Lowest battery voltage the charger accepts per voltage class (mV).
pub const CHARGE_MIN_SAFE_MV: [u32; LEVEL_COUNT] = [1_100, 2_000, 3_000, 4_000, 6_000, 10_000, 15_000];
/// Charge termination voltage per voltage class (mV).
pub const CHARGE_MAX_MV: [u32; LEVEL_COUNT] = [1_480, 3_100, 4_120, 5_000, 8_240, 13_800, 20_000];

impl VoltageLevel {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn target_mv(self) -> u32 {
        CV_TARGET_MV[self.index()]
    }

    pub fn charge_min_safe_mv(self) -> u32 {
        CHARGE_MIN_SAFE_MV[self.index()]
    }

    pub fn charge_max_mv(self) -> u32 {
        CHARGE_MAX_MV[self.index()]
    }

    /// Next level, wrapping from the top slot to the bottom one.
    pub fn next(self) -> Self {
        VOLTAGE_LEVELS[(self.index() + 1) % LEVEL_COUNT]
    }

    /// Previous level, wrapping from the bottom slot to the top one.
    pub fn previous(self) -> Self {
        VOLTAGE_LEVELS[(self.index() + LEVEL_COUNT - 1) % LEVEL_COUNT]
    }
}

impl CurrentLevel {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn target_ma(self) -> u32 {
        CC_TARGET_MA[self.index()]
    }

    pub fn next(self) -> Self {
        CURRENT_LEVELS[(self.index() + 1) % LEVEL_COUNT]
    }
}

impl TryFrom<u8> for VoltageLevel {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        VOLTAGE_LEVELS.get(value as usize).copied().ok_or(value)
    }
}

impl TryFrom<u8> for CurrentLevel {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        CURRENT_LEVELS.get(value as usize).copied().ok_or(value)
    }
}

/// Physical buttons on the front panel.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ButtonId {
    Mode,
    Output,
}

/// Classified button gesture.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ButtonEvent {
    /// Released before the hold timeout.
    Pressed,
    /// Held past the hold timeout.
    Held,
}

/// Timer configuration of the switching stage.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PwmMode {
    Fast15kHz,
    Fast31kHz,
    Fast125kHz,
    Fast250kHz,
    PhaseCorrect8kHz,
    PhaseCorrect15kHz,
    PhaseCorrect63kHz,
    PhaseCorrect125kHz,
}

/// Analog inputs sampled every fast tick.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Channel {
    InputCurrent,
    OutputCurrent,
    InputVoltage,
    OutputVoltage,
}

/// Volatile readings and actuator state, recomputed every fast tick.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ApplicationState {
    /// PWM level, always within `MIN_DUTY_CYCLE..=MAX_DUTY_CYCLE`.
    pub duty_cycle: u8,
    pub input_voltage_mv: u32,
    pub output_voltage_mv: u32,
    pub input_current_ma: u32,
    pub output_current_ma: u32,
}

impl ApplicationState {
    /// Step duty up by one, saturating at `MAX_DUTY_CYCLE`.
    pub fn increase_duty(&mut self) {
        if self.duty_cycle < crate::config::MAX_DUTY_CYCLE {
            self.duty_cycle += 1;
        }
    }

    /// Step duty down by one, saturating at `MIN_DUTY_CYCLE`.
    pub fn decrease_duty(&mut self) {
        if self.duty_cycle > crate::config::MIN_DUTY_CYCLE {
            self.duty_cycle -= 1;
        }
    }

    pub fn duty_saturated(&self) -> bool {
        self.duty_cycle >= crate::config::MAX_DUTY_CYCLE
    }
}
