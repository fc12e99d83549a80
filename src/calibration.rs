//! Calibration sequencer.
//!
//! Stages run in a fixed order: idle-current baseline, input voltage, output voltage,
//! input current, output current, finish. The idle stage is sampled by the controller
//! (it has to keep the scheduler alive while it averages); the interactive stages let the
//! user trim one offset each, with a live CV or CC loop driving a real load where needed.

use crate::config::MIN_DUTY_CYCLE;
use crate::data_types::ApplicationState;
use crate::leds::{Indicators, LedPanel};
use crate::regulator::{CcRegulator, RegulatorParams, VoltageRegulator};
use crate::settings::{CalibrationOffsets, Settings};

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CalibrationStage {
    IdleCurrent,
    InputVoltage,
    OutputVoltage,
    InputCurrent,
    OutputCurrent,
    Finish,
}

impl CalibrationStage {
    pub fn next(self) -> Self {
        match self {
            CalibrationStage::IdleCurrent => CalibrationStage::InputVoltage,
            CalibrationStage::InputVoltage => CalibrationStage::OutputVoltage,
            CalibrationStage::OutputVoltage => CalibrationStage::InputCurrent,
            CalibrationStage::InputCurrent => CalibrationStage::OutputCurrent,
            CalibrationStage::OutputCurrent | CalibrationStage::Finish => CalibrationStage::Finish,
        }
    }

    /// Offset trimmed by the buttons in this stage.
    pub fn offset<'a>(self, offsets: &'a mut CalibrationOffsets) -> Option<&'a mut i8> {
        match self {
            CalibrationStage::InputVoltage => Some(&mut offsets.input_voltage),
            CalibrationStage::OutputVoltage => Some(&mut offsets.output_voltage),
            CalibrationStage::InputCurrent => Some(&mut offsets.input_current),
            CalibrationStage::OutputCurrent => Some(&mut offsets.output_current),
            CalibrationStage::IdleCurrent | CalibrationStage::Finish => None,
        }
    }
}

/// `avg = avg/2 + sample/2`, seeded by the first sample.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RunningAverage {
    value: u16,
    samples: u16,
}

impl RunningAverage {
    pub const fn new() -> Self {
        Self { value: 0, samples: 0 }
    }

    pub fn push(&mut self, sample: u16) {
        self.value = if self.samples == 0 {
            sample
        } else {
            self.value / 2 + sample / 2
        };
        self.samples = self.samples.saturating_add(1);
    }

    pub fn value(&self) -> u16 {
        self.value
    }

    pub fn samples(&self) -> u16 {
        self.samples
    }
}

/// Regulator driving the load during a stage.
#[derive(Clone, Copy, Debug)]
pub enum LiveLoop {
    Voltage(VoltageRegulator),
    Current(CcRegulator),
}

#[derive(Clone, Copy, Debug)]
pub struct CalibrationSequencer {
    stage: CalibrationStage,
    live: Option<LiveLoop>,
}

impl CalibrationSequencer {
    pub fn new() -> Self {
        Self { stage: CalibrationStage::IdleCurrent, live: None }
    }

    pub fn stage(&self) -> CalibrationStage {
        self.stage
    }

    pub fn live(&self) -> Option<&LiveLoop> {
        self.live.as_ref()
    }

    /// Accepts button input only once the idle baseline is in.
    pub fn is_interactive(&self) -> bool {
        self.stage != CalibrationStage::IdleCurrent
    }

    /// Store the averaged idle codes of both current channels.
    pub fn store_idle_baselines(offsets: &mut CalibrationOffsets, input: u16, output: u16) {
        offsets.input_current_idle = input;
        offsets.output_current_idle = output;
        info!("idle baselines: in {} out {}", input, output);
    }

    /// Move to the next stage and light the indicators of its live loop. Returns true once
    /// the sequence is complete and the caller should leave calibration.
    pub fn advance(&mut self, app: &mut ApplicationState, settings: &mut Settings, leds: &mut LedPanel) -> bool {
        self.stage = self.stage.next();
        app.duty_cycle = MIN_DUTY_CYCLE;
        leds.clear_all();
        self.live = match self.stage {
            CalibrationStage::OutputVoltage => {
                settings.output_enabled = true;
                leds.set(Indicators::CV | Indicators::level(settings.cv.voltage.index()));
                Some(LiveLoop::Voltage(VoltageRegulator::new(RegulatorParams::cv(settings.cv.voltage))))
            }
            CalibrationStage::InputCurrent | CalibrationStage::OutputCurrent => {
                settings.output_enabled = true;
                leds.set(Indicators::CC | Indicators::level(settings.cc.current.index()));
                Some(LiveLoop::Current(CcRegulator::cc_mode(settings.cc.current, settings.cc.voltage)))
            }
            _ => None,
        };
        info!("calibration stage {}", self.stage);
        self.stage == CalibrationStage::Finish
    }

    /// Nudge the stage's offset by `delta`, saturating. False when the stage has no offset.
    pub fn trim(&self, offsets: &mut CalibrationOffsets, delta: i8) -> bool {
        match self.stage.offset(offsets) {
            Some(offset) => {
                *offset = offset.saturating_add(delta);
                true
            }
            None => false,
        }
    }

    /// Fast-tick step: run the live loop, or hold duty at zero.
    pub fn tick(&mut self, app: &mut ApplicationState, output_enabled: bool, now_10ms: u32, leds: &mut LedPanel) {
        match self.live.as_mut() {
            Some(LiveLoop::Voltage(regulator)) => regulator.regulate(app, output_enabled, now_10ms, leds),
            Some(LiveLoop::Current(regulator)) => regulator.regulate(app, output_enabled, now_10ms, leds),
            None => app.duty_cycle = MIN_DUTY_CYCLE,
        }
    }
}

impl Default for CalibrationSequencer {
    fn default() -> Self {
        Self::new()
    }
}
