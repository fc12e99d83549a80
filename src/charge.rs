//! Battery charge composer: a CC regulator with a CV ceiling, gated by battery state.

use crate::config::{
    CC_MAX_RIPPLE_MA, CC_SOFT_START_PERIOD_10MS, CC_SOFT_START_STEP_MA, CHARGE_CC_SNUB_PERCENT,
    CHARGE_CV_HYSTERESIS_MV, CHARGE_CV_MAX_RIPPLE_MV, CHARGE_CV_SNUB_PERCENT, CHARGE_STANDBY_CURRENT_DIVISOR,
    CV_SOFT_START_PERIOD_10MS, MIN_DUTY_CYCLE,
};
use crate::data_types::{ApplicationState, CurrentLevel, VoltageLevel};
use crate::leds::{Indicators, LedPanel};
use crate::regulator::{CcRegulator, CurrentRegulator, RegulatorParams, RegulatorState, VoltageRegulator};

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChargeState {
    /// Waiting for a battery above the minimum safe voltage.
    Idle,
    Charging,
    /// Trickle hold once the current has tapered at the termination voltage.
    Standby,
    /// Charging stopped for good; output disabled.
    Finished,
}

#[derive(Clone, Copy, Debug)]
pub struct ChargeComposer {
    state: ChargeState,
    regulator: CcRegulator,
    min_safe_mv: u32,
    regulation_period_10ms: u8,
    last_regulation_10ms: u32,
}

impl ChargeComposer {
    /// Charger for `current` into a battery of voltage class `voltage`.
    pub fn new(current: CurrentLevel, voltage: VoltageLevel, regulation_period_10ms: u8) -> Self {
        let current_loop = CurrentRegulator::new(RegulatorParams {
            target: current.target_ma(),
            max_ripple: CC_MAX_RIPPLE_MA,
            soft_start_step: CC_SOFT_START_STEP_MA,
            soft_start_period_10ms: CC_SOFT_START_PERIOD_10MS,
            snub_percent: CHARGE_CC_SNUB_PERCENT,
        });
        let ceiling = VoltageRegulator::with_state(
            RegulatorParams {
                target: voltage.charge_max_mv(),
                max_ripple: CHARGE_CV_MAX_RIPPLE_MV,
                soft_start_step: 0,
                soft_start_period_10ms: CV_SOFT_START_PERIOD_10MS,
                snub_percent: CHARGE_CV_SNUB_PERCENT,
            },
            RegulatorState::On,
        );
        Self {
            state: ChargeState::Idle,
            regulator: CcRegulator::new(current_loop, ceiling, CHARGE_CV_HYSTERESIS_MV),
            min_safe_mv: voltage.charge_min_safe_mv(),
            regulation_period_10ms,
            last_regulation_10ms: 0,
        }
    }

    pub fn state(&self) -> ChargeState {
        self.state
    }

    pub fn regulator(&self) -> &CcRegulator {
        &self.regulator
    }

    pub fn min_safe_mv(&self) -> u32 {
        self.min_safe_mv
    }

    /// One charge pass, at most once per regulation period.
    pub fn regulate(&mut self, app: &mut ApplicationState, output_enabled: bool, now_10ms: u32, leds: &mut LedPanel) {
        if now_10ms.wrapping_sub(self.last_regulation_10ms) < self.regulation_period_10ms as u32 {
            return;
        }
        self.last_regulation_10ms = now_10ms;

        if !output_enabled || self.state == ChargeState::Finished {
            return;
        }

        if self.state == ChargeState::Idle {
            if app.output_voltage_mv < self.min_safe_mv {
                // Dead or missing cell: refuse, but stay recoverable.
                leds.set(Indicators::ERROR);
                return;
            }
            self.state = ChargeState::Charging;
            info!("charging, battery at {} mV", app.output_voltage_mv);
        }

        if self.state == ChargeState::Charging {
            let taper_ma = self.regulator.current().target() / CHARGE_STANDBY_CURRENT_DIVISOR;
            if app.output_current_ma <= taper_ma && app.output_voltage_mv >= self.regulator.ceiling().target() {
                self.state = ChargeState::Standby;
                info!("charge standby");
            }
        }

        self.regulator.regulate(app, output_enabled, now_10ms, leds);
    }

    /// Stop charging: duty to zero, output off, and no further regulation.
    pub fn finish(&mut self, app: &mut ApplicationState, output_enabled: &mut bool) {
        app.duty_cycle = MIN_DUTY_CYCLE;
        *output_enabled = false;
        self.state = ChargeState::Finished;
        info!("charge finished");
    }
}
