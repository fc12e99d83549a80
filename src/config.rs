//! Hardware constants and runtime configuration.
//! Defaults describe the reference board: 20 mΩ shunts behind a 16x amplifier,
//! 100k/6k2 dividers and a 12-bit ADC referenced to 1.024 V.

use crate::data_types::{Channel, PwmMode};

/// Full-scale value of the 8-bit PWM compare register.
pub const PWM_RESOLUTION: u8 = 255;
/// Highest duty cycle the regulators may request (about a third of the period).
pub const MAX_DUTY_CYCLE: u8 = 85;
pub const MIN_DUTY_CYCLE: u8 = 0;

/// Timer configuration used at boot and under normal load.
pub const PWM_DEFAULT_MODE: PwmMode = PwmMode::Fast125kHz;
/// Low-frequency mode that lets the stage deliver more power once duty saturates.
pub const PWM_HIGH_LOAD_MODE: PwmMode = PwmMode::Fast15kHz;
/// Input must exceed output by this much before dropping to the high-load mode.
pub const PWM_HIGH_LOAD_HEADROOM_MV: u32 = 2_500;

/// Absolute output ceilings of the power stage.
pub const OUTPUT_VOLTAGE_CEILING_MV: u32 = 16_900;
pub const OUTPUT_CURRENT_CEILING_MA: u32 = 2_000;

/// ADC reference in millivolts.
pub const ADC_REFERENCE_MV: u32 = 1_024;
/// Native ADC resolution before oversampling.
pub const ADC_RESOLUTION_BITS: u8 = 12;
/// Largest supported oversample-bit count (16 samples).
pub const MAX_OVERSAMPLE_BITS: u8 = 2;
/// Fixed-point multiplier of the shunt resistance (mΩ to Ω).
pub const CURRENT_SCALE_MULT: u32 = 1_000;
/// Fixed-point multiplier of the divider ratio (one decimal place).
pub const VOLTAGE_SCALE_MULT: u32 = 10;

// CV mode.
pub const CV_MAX_RIPPLE_MV: u32 = 2_200;
pub const CV_SOFT_START_STEP_MV: u32 = 1;
pub const CV_SOFT_START_PERIOD_10MS: u8 = 5;
pub const CV_SNUB_PERCENT: u8 = 3;

// CC mode and its voltage ceiling.
pub const CC_MAX_RIPPLE_MA: u32 = 1_000;
pub const CC_SOFT_START_STEP_MA: u32 = 1;
pub const CC_SOFT_START_PERIOD_10MS: u8 = 5;
pub const CC_SNUB_PERCENT: u8 = 3;
pub const CC_CV_HYSTERESIS_MV: u32 = 0;
pub const CC_CV_MAX_RIPPLE_MV: u32 = 2_000;
pub const CC_CV_SNUB_PERCENT: u8 = 3;

// Charge mode.
pub const CHARGE_CC_SNUB_PERCENT: u8 = 0;
pub const CHARGE_CV_HYSTERESIS_MV: u32 = 20;
pub const CHARGE_CV_MAX_RIPPLE_MV: u32 = 4_000;
pub const CHARGE_CV_SNUB_PERCENT: u8 = 0;
/// Standby once output current drops to 1/20 of the charge current.
pub const CHARGE_STANDBY_CURRENT_DIVISOR: u32 = 20;

// MPPT stub.
pub const MPPT_DEFAULT_INPUT_MV: u32 = 4_000;
pub const MPPT_STEP_MV: u32 = 100;

/// Descriptor handed to the board for one raw conversion.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AnalogChannel {
    pub channel: Channel,
    /// Amplifier gain applied in front of the ADC.
    pub gain: u8,
    /// Oversampling depth, 0..=MAX_OVERSAMPLE_BITS.
    pub oversample_bits: u8,
}

/// Linear conversion from a decimated code to a physical quantity.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Scale {
    /// Shunt measurement, result in mA. Calibration trims the shunt value in mΩ.
    Current { shunt_milliohm: u32 },
    /// Divider measurement, result in mV. Calibration trims the ratio in tenths.
    Voltage { divider_ratio: u32 },
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ChannelConfig {
    pub analog: AnalogChannel,
    /// IIR attenuation, `None` for an unfiltered channel.
    pub filter_attenuation: Option<u8>,
    pub scale: Scale,
}

impl ChannelConfig {
    /// 20 mΩ shunt behind the 16x current-sense amplifier.
    pub const fn shunt(channel: Channel, oversample_bits: u8, filter_attenuation: Option<u8>) -> Self {
        Self {
            analog: AnalogChannel { channel, gain: 16, oversample_bits },
            filter_attenuation,
            scale: Scale::Current { shunt_milliohm: 20 },
        }
    }

    /// (100k + 6k2) / 6k2 divider, truncated to 17.
    pub const fn divider(channel: Channel, oversample_bits: u8) -> Self {
        Self {
            analog: AnalogChannel { channel, gain: 1, oversample_bits },
            filter_attenuation: None,
            scale: Scale::Voltage { divider_ratio: 17 },
        }
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MeasurementConfig {
    pub input_current: ChannelConfig,
    pub output_current: ChannelConfig,
    pub input_voltage: ChannelConfig,
    pub output_voltage: ChannelConfig,
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            input_current: ChannelConfig::shunt(Channel::InputCurrent, 1, Some(10)),
            output_current: ChannelConfig::shunt(Channel::OutputCurrent, 1, None),
            input_voltage: ChannelConfig::divider(Channel::InputVoltage, 1),
            output_voltage: ChannelConfig::divider(Channel::OutputVoltage, 2),
        }
    }
}

/// Global hardware limits checked every fast tick.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ProtectionLimits {
    pub max_input_current_ma: u32,
    pub max_output_current_ma: u32,
    pub max_output_voltage_mv: u32,
    /// Output floor that must be exceeded once duty saturates.
    pub min_output_voltage_mv: u32,
    /// Reverse-voltage rating of the SEPIC diode.
    pub diode_reverse_rating_mv: u32,
    /// Share of the diode rating that vin + vout may use.
    pub diode_safety_percent: u32,
}

impl ProtectionLimits {
    pub fn max_input_plus_output_mv(&self) -> u32 {
        self.diode_reverse_rating_mv * self.diode_safety_percent / 100
    }
}

impl Default for ProtectionLimits {
    fn default() -> Self {
        Self {
            max_input_current_ma: 1_500,
            max_output_current_ma: OUTPUT_CURRENT_CEILING_MA,
            max_output_voltage_mv: OUTPUT_VOLTAGE_CEILING_MV,
            min_output_voltage_mv: 1_000,
            diode_reverse_rating_mv: 40_000,
            diode_safety_percent: 68,
        }
    }
}

/// Button classification timing, in 100 ms poll cycles.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ButtonTiming {
    /// A press longer than this many polls is a long press.
    pub hold_timeout_100ms: u8,
    /// Bounce hold-off before the edge latch is live again.
    pub rearm_delay_100ms: u8,
}

impl Default for ButtonTiming {
    fn default() -> Self {
        Self { hold_timeout_100ms: 20, rearm_delay_100ms: 2 }
    }
}

/// Runtime configuration of the control core.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config {
    pub limits: ProtectionLimits,
    pub measurement: MeasurementConfig,
    pub buttons: ButtonTiming,
    /// Debounce between a settings change and the write.
    pub settings_save_delay_s: u8,
    /// Save delay after a calibration offset nudge.
    pub calibration_save_delay_s: u8,
    /// Minimum spacing of charge regulation passes.
    pub charge_regulation_period_10ms: u8,
    /// Iterations of the idle-current averaging loop.
    pub calibration_idle_samples: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            limits: ProtectionLimits::default(),
            measurement: MeasurementConfig::default(),
            buttons: ButtonTiming::default(),
            settings_save_delay_s: 10,
            calibration_save_delay_s: 5,
            charge_regulation_period_10ms: 7,
            calibration_idle_samples: 500,
        }
    }
}
