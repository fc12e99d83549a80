//! Soft-start / on / snub regulator shared by constant-voltage and constant-current operation.
//!
//! Key Features:
//! - One state machine, parameterized by the regulated quantity ([`OutputVoltage`] or [`OutputCurrent`]).
//! - Soft start: duty only climbs every `soft_start_period_10ms` ticks, and only while the measured
//!   quantity is not rising faster than `soft_start_step`. This keeps inrush into load capacitance low.
//! - Ripple protection: in `On`, a reading above `target + max_ripple` drops duty to zero (`Snub`)
//!   and lights the fault LED. The loop resumes once the reading falls under
//!   `target * (100 - snub_percent) / 100`, through soft start, or straight to `On` when
//!   `snub_percent` is zero.
//!
//! Detailed Operation (one fast tick):
//! 1. Ripple check (only in `On`).
//! 2. Nothing else while the output is disabled.
//! 3. In `Snub`, hold until the recovery threshold is crossed.
//! 4. Below target: duty + 1 (throttled in soft start). Above target: duty - 1, and an overshoot
//!    ends soft start.
//! 5. Soft start also ends when the target is reached or duty saturates. A reading that sags
//!    below the previous sample ends it too, but only once the output has risen under this
//!    soft start's duty; a reading still decaying after a snub keeps the ramp throttled.
//!
//! [`CcRegulator`] nests a voltage regulator under a current regulator and hands it the tick once
//! the voltage ceiling is reached.

use core::marker::PhantomData;

use crate::config::{
    CC_CV_HYSTERESIS_MV, CC_CV_MAX_RIPPLE_MV, CC_CV_SNUB_PERCENT, CC_MAX_RIPPLE_MA, CC_SNUB_PERCENT,
    CC_SOFT_START_PERIOD_10MS, CC_SOFT_START_STEP_MA, CV_MAX_RIPPLE_MV, CV_SNUB_PERCENT, CV_SOFT_START_PERIOD_10MS,
    CV_SOFT_START_STEP_MV, MIN_DUTY_CYCLE, OUTPUT_CURRENT_CEILING_MA, OUTPUT_VOLTAGE_CEILING_MV,
};
use crate::data_types::{ApplicationState, CurrentLevel, VoltageLevel};
use crate::leds::{Indicators, LedPanel};

/// Lifecycle of a regulator.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RegulatorState {
    SoftStart,
    On,
    Snub,
}

/// Quantity a regulator drives towards its target.
pub trait Quantity {
    /// Seed of the previous-sample memory, so the first soft-start step is never throttled.
    const CEILING: u32;

    fn measure(app: &ApplicationState) -> u32;
}

/// Output voltage in mV.
#[derive(Clone, Copy, Debug)]
pub struct OutputVoltage;

/// Output current in mA.
#[derive(Clone, Copy, Debug)]
pub struct OutputCurrent;

impl Quantity for OutputVoltage {
    const CEILING: u32 = OUTPUT_VOLTAGE_CEILING_MV;

    fn measure(app: &ApplicationState) -> u32 {
        app.output_voltage_mv
    }
}

impl Quantity for OutputCurrent {
    const CEILING: u32 = OUTPUT_CURRENT_CEILING_MA;

    fn measure(app: &ApplicationState) -> u32 {
        app.output_current_ma
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RegulatorParams {
    pub target: u32,
    /// Excursion above target tolerated in `On` before snubbing.
    pub max_ripple: u32,
    /// Largest rise between two samples that still allows a soft-start increment.
    pub soft_start_step: u32,
    /// Minimum spacing of soft-start increments.
    pub soft_start_period_10ms: u8,
    /// Recovery depth in percent of target; 0 resumes straight to `On`.
    pub snub_percent: u8,
}

impl RegulatorParams {
    /// Constant-voltage preset. The 5 V slot recovers without soft start.
    pub fn cv(level: VoltageLevel) -> Self {
        Self {
            target: level.target_mv(),
            max_ripple: CV_MAX_RIPPLE_MV,
            soft_start_step: CV_SOFT_START_STEP_MV,
            soft_start_period_10ms: CV_SOFT_START_PERIOD_10MS,
            snub_percent: if level == VoltageLevel::V5 { 0 } else { CV_SNUB_PERCENT },
        }
    }

    pub fn cc(level: CurrentLevel) -> Self {
        Self {
            target: level.target_ma(),
            max_ripple: CC_MAX_RIPPLE_MA,
            soft_start_step: CC_SOFT_START_STEP_MA,
            soft_start_period_10ms: CC_SOFT_START_PERIOD_10MS,
            snub_percent: CC_SNUB_PERCENT,
        }
    }

    /// Voltage ceiling nested under a CC regulator.
    pub fn cc_ceiling(level: VoltageLevel) -> Self {
        Self {
            target: level.target_mv(),
            max_ripple: CC_CV_MAX_RIPPLE_MV,
            soft_start_step: 0,
            soft_start_period_10ms: CV_SOFT_START_PERIOD_10MS,
            snub_percent: CC_CV_SNUB_PERCENT,
        }
    }

    /// Reading below which a snubbed regulator resumes.
    pub fn recovery_threshold(&self) -> u32 {
        let keep = 100u32.saturating_sub(self.snub_percent as u32);
        (self.target as u64 * keep as u64 / 100) as u32
    }
}

/// Regulator for quantity `Q`.
#[derive(Clone, Copy, Debug)]
pub struct Regulator<Q> {
    params: RegulatorParams,
    state: RegulatorState,
    previous: u32,
    /// Set once the measurement has risen during the current soft start.
    output_rose: bool,
    last_soft_step_10ms: u32,
    _quantity: PhantomData<Q>,
}

pub type VoltageRegulator = Regulator<OutputVoltage>;
pub type CurrentRegulator = Regulator<OutputCurrent>;

impl<Q: Quantity> Regulator<Q> {
    /// Fresh regulator in soft start. The caller zeroes duty when (re)entering the mode.
    pub fn new(params: RegulatorParams) -> Self {
        Self::with_state(params, RegulatorState::SoftStart)
    }

    pub fn with_state(params: RegulatorParams, state: RegulatorState) -> Self {
        Self {
            params,
            state,
            previous: Q::CEILING,
            output_rose: false,
            last_soft_step_10ms: 0,
            _quantity: PhantomData,
        }
    }

    pub fn state(&self) -> RegulatorState {
        self.state
    }

    pub fn params(&self) -> &RegulatorParams {
        &self.params
    }

    pub fn target(&self) -> u32 {
        self.params.target
    }

    /// Drop duty to zero and restart the gentle ramp.
    pub fn soft_start(&mut self, app: &mut ApplicationState) {
        app.duty_cycle = MIN_DUTY_CYCLE;
        self.state = RegulatorState::SoftStart;
        self.output_rose = false;
    }

    fn snub(&mut self, app: &mut ApplicationState, leds: &mut LedPanel) {
        app.duty_cycle = MIN_DUTY_CYCLE;
        self.state = RegulatorState::Snub;
        leds.set(Indicators::ERROR);
        warn!("regulator snub, target {}", self.params.target);
    }

    fn turn_on(&mut self, leds: &mut LedPanel) {
        self.state = RegulatorState::On;
        leds.clear(Indicators::ERROR);
    }

    /// Ripple check; only armed in `On`.
    pub fn protect(&mut self, app: &mut ApplicationState, leds: &mut LedPanel) {
        if self.state == RegulatorState::On
            && Q::measure(app) > self.params.target.saturating_add(self.params.max_ripple)
        {
            self.snub(app, leds);
        }
    }

    /// Full regulation pass: ripple check, then one step while the output is enabled.
    pub fn regulate(&mut self, app: &mut ApplicationState, output_enabled: bool, now_10ms: u32, leds: &mut LedPanel) {
        self.protect(app, leds);
        if !output_enabled {
            return;
        }
        self.step(app, now_10ms, leds);
    }

    /// One duty adjustment. No ripple check; see [`Regulator::regulate`].
    pub fn step(&mut self, app: &mut ApplicationState, now_10ms: u32, leds: &mut LedPanel) {
        let measured = Q::measure(app);
        let target = self.params.target;

        if self.state == RegulatorState::Snub {
            if measured >= self.params.recovery_threshold() {
                return;
            }
            if self.params.snub_percent == 0 {
                self.turn_on(leds);
            } else {
                self.soft_start(app);
            }
            debug!("regulator leaves snub at {}", measured);
        }

        let duty_applied = app.duty_cycle > MIN_DUTY_CYCLE;

        if measured < target && !app.duty_saturated() {
            if self.state == RegulatorState::SoftStart {
                if now_10ms.wrapping_sub(self.last_soft_step_10ms) >= self.params.soft_start_period_10ms as u32 {
                    self.last_soft_step_10ms = now_10ms;
                    if measured <= self.previous.saturating_add(self.params.soft_start_step) {
                        app.increase_duty();
                    }
                }
            } else {
                app.increase_duty();
            }
        } else if measured > target && app.duty_cycle > MIN_DUTY_CYCLE {
            app.decrease_duty();
            if self.state == RegulatorState::SoftStart {
                self.turn_on(leds);
            }
        }

        if self.state == RegulatorState::SoftStart {
            let reached = measured >= target || app.duty_saturated();
            // A fall counts as a sag only after the output has risen in this soft start.
            let sagging = duty_applied && self.output_rose && measured < self.previous;
            if reached || sagging {
                self.turn_on(leds);
            } else if measured > self.previous {
                self.output_rose = true;
            }
        }

        self.previous = measured;
    }
}

/// Current regulator with a nested voltage ceiling.
#[derive(Clone, Copy, Debug)]
pub struct CcRegulator {
    current: CurrentRegulator,
    ceiling: VoltageRegulator,
    ceiling_hysteresis_mv: u32,
}

impl CcRegulator {
    pub fn new(current: CurrentRegulator, ceiling: VoltageRegulator, ceiling_hysteresis_mv: u32) -> Self {
        Self { current, ceiling, ceiling_hysteresis_mv }
    }

    /// CC mode preset: current loop in soft start, ceiling already on.
    pub fn cc_mode(current: CurrentLevel, ceiling: VoltageLevel) -> Self {
        Self::new(
            CurrentRegulator::new(RegulatorParams::cc(current)),
            VoltageRegulator::with_state(RegulatorParams::cc_ceiling(ceiling), RegulatorState::On),
            CC_CV_HYSTERESIS_MV,
        )
    }

    pub fn current(&self) -> &CurrentRegulator {
        &self.current
    }

    pub fn ceiling(&self) -> &VoltageRegulator {
        &self.ceiling
    }

    /// True when this tick belongs to the voltage ceiling.
    pub fn ceiling_in_control(&self, app: &ApplicationState) -> bool {
        app.output_voltage_mv >= self.ceiling.target().saturating_add(self.ceiling_hysteresis_mv)
            || self.ceiling.state() == RegulatorState::Snub
    }

    pub fn regulate(&mut self, app: &mut ApplicationState, output_enabled: bool, now_10ms: u32, leds: &mut LedPanel) {
        self.current.protect(app, leds);
        if !output_enabled {
            return;
        }
        if self.ceiling_in_control(app) {
            self.ceiling.regulate(app, output_enabled, now_10ms, leds);
            return;
        }
        self.current.step(app, now_10ms, leds);
    }
}
