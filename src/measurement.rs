//! Analog measurement pipeline.
//!
//! Per channel: oversample and decimate, subtract the idle baseline (current channels),
//! optionally low-pass filter, then scale to mV / mA with the calibration trim applied.
//! All scaling runs in `u64`; codes reach 2^14 and multipliers 10^5.

use crate::board::Board;
use crate::config::{
    ADC_REFERENCE_MV, ADC_RESOLUTION_BITS, AnalogChannel, CURRENT_SCALE_MULT, ChannelConfig, MAX_OVERSAMPLE_BITS,
    MeasurementConfig, Scale, VOLTAGE_SCALE_MULT,
};
use crate::data_types::ApplicationState;
use crate::filter::IirLowPass;
use crate::settings::CalibrationOffsets;

/// Number of raw conversions taken for `oversample_bits` (4^bits).
pub fn sample_count(oversample_bits: u8) -> u32 {
    1 << (2 * oversample_bits.min(MAX_OVERSAMPLE_BITS))
}

/// Largest decimated code for `oversample_bits`, plus one.
pub fn full_scale(oversample_bits: u8) -> u32 {
    1 << (ADC_RESOLUTION_BITS + oversample_bits.min(MAX_OVERSAMPLE_BITS))
}

/// Sum `sample_count(bits)` conversions and shift right by `bits`. Codes wider than the
/// ADC resolution saturate at `u16::MAX`.
pub fn oversample<E>(oversample_bits: u8, mut sample: impl FnMut() -> Result<u16, E>) -> Result<u16, E> {
    let bits = oversample_bits.min(MAX_OVERSAMPLE_BITS);
    let mut sum: u32 = 0;
    for _ in 0..sample_count(bits) {
        sum += sample()? as u32;
    }
    Ok(u16::try_from(sum >> bits).unwrap_or(u16::MAX))
}

/// Remove the idle-current baseline, clamping at zero.
pub fn subtract_idle(raw: u16, idle: u16) -> u16 {
    raw.saturating_sub(idle)
}

/// Convert a decimated code into mA (shunt) or mV (divider).
pub fn scale(code: u16, analog: &AnalogChannel, scale: Scale, trim: i8) -> u32 {
    let code = code as u64;
    let full_scale = full_scale(analog.oversample_bits) as u64;
    let value = match scale {
        Scale::Current { shunt_milliohm } => {
            // A trim that would zero the shunt is held at 1 mΩ.
            let shunt = (shunt_milliohm as i64 + trim as i64).max(1) as u64;
            let gain = analog.gain.max(1) as u64;
            code * ADC_REFERENCE_MV as u64 * CURRENT_SCALE_MULT as u64 / (shunt * full_scale * gain)
        }
        Scale::Voltage { divider_ratio } => {
            let ratio = (divider_ratio as i64 * VOLTAGE_SCALE_MULT as i64 + trim as i64).max(0) as u64;
            code * ADC_REFERENCE_MV as u64 * ratio / (full_scale * VOLTAGE_SCALE_MULT as u64)
        }
    };
    value.min(u32::MAX as u64) as u32
}

/// Read one channel through the board with oversampling, no further processing.
pub fn read_raw<B: Board>(board: &mut B, analog: &AnalogChannel) -> Result<u16, B::Error> {
    oversample(analog.oversample_bits, || board.sample(analog))
}

/// One channel's configuration plus its filter state.
#[derive(Clone, Copy, Debug)]
pub struct ChannelPipeline {
    config: ChannelConfig,
    filter: Option<IirLowPass>,
}

impl ChannelPipeline {
    pub fn new(config: ChannelConfig) -> Self {
        Self {
            config,
            filter: config.filter_attenuation.map(IirLowPass::new),
        }
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Process an already decimated code. `idle` is ignored for voltage channels.
    pub fn convert(&mut self, raw: u16, idle: u16, trim: i8) -> u32 {
        let code = match self.config.scale {
            Scale::Current { .. } => subtract_idle(raw, idle),
            Scale::Voltage { .. } => raw,
        };
        let code = match self.filter.as_mut() {
            Some(filter) => filter.update(code),
            None => code,
        };
        scale(code, &self.config.analog, self.config.scale, trim)
    }
}

/// The four channels sampled every fast tick.
#[derive(Clone, Copy, Debug)]
pub struct MeasurementPipeline {
    input_current: ChannelPipeline,
    output_current: ChannelPipeline,
    input_voltage: ChannelPipeline,
    output_voltage: ChannelPipeline,
}

impl MeasurementPipeline {
    pub fn new(config: &MeasurementConfig) -> Self {
        Self {
            input_current: ChannelPipeline::new(config.input_current),
            output_current: ChannelPipeline::new(config.output_current),
            input_voltage: ChannelPipeline::new(config.input_voltage),
            output_voltage: ChannelPipeline::new(config.output_voltage),
        }
    }

    pub fn input_current_channel(&self) -> &AnalogChannel {
        &self.input_current.config.analog
    }

    pub fn output_current_channel(&self) -> &AnalogChannel {
        &self.output_current.config.analog
    }

    /// Refresh all four readings in `app`. Currents first, then voltages.
    pub fn measure<B: Board>(
        &mut self,
        board: &mut B,
        calibration: &CalibrationOffsets,
        app: &mut ApplicationState,
    ) -> Result<(), B::Error> {
        let raw = read_raw(board, &self.input_current.config.analog)?;
        app.input_current_ma =
            self.input_current.convert(raw, calibration.input_current_idle, calibration.input_current);

        let raw = read_raw(board, &self.output_current.config.analog)?;
        app.output_current_ma =
            self.output_current.convert(raw, calibration.output_current_idle, calibration.output_current);

        let raw = read_raw(board, &self.input_voltage.config.analog)?;
        app.input_voltage_mv = self.input_voltage.convert(raw, 0, calibration.input_voltage);

        let raw = read_raw(board, &self.output_voltage.config.analog)?;
        app.output_voltage_mv = self.output_voltage.convert(raw, 0, calibration.output_voltage);

        Ok(())
    }
}
