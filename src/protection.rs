//! Global protection: conditions that latch the supply into `Error`.
//!
//! Per-regulator ripple protection lives with the regulator (see [`crate::regulator`]);
//! it snubs the loop locally instead of latching.

use crate::config::{MAX_DUTY_CYCLE, ProtectionLimits};
use crate::data_types::ApplicationState;

/// Reason a global protection tripped.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Trip {
    InputOverCurrent,
    OutputOverCurrent,
    OutputOverVoltage,
    /// Duty saturated while the output stays under the floor: the switching path is open.
    OpenSwitchPath,
    /// vin + vout reached the diode's reverse-voltage budget.
    DiodeReverseVoltage,
}

/// Evaluate all global limits against fresh readings. First match wins.
pub fn check(app: &ApplicationState, limits: &ProtectionLimits) -> Option<Trip> {
    if app.input_current_ma > limits.max_input_current_ma {
        return Some(Trip::InputOverCurrent);
    }
    if app.output_current_ma > limits.max_output_current_ma {
        return Some(Trip::OutputOverCurrent);
    }
    if app.output_voltage_mv > limits.max_output_voltage_mv {
        return Some(Trip::OutputOverVoltage);
    }
    if app.duty_cycle == MAX_DUTY_CYCLE && app.output_voltage_mv < limits.min_output_voltage_mv {
        return Some(Trip::OpenSwitchPath);
    }
    if app.input_voltage_mv.saturating_add(app.output_voltage_mv) >= limits.max_input_plus_output_mv() {
        return Some(Trip::DiodeReverseVoltage);
    }
    None
}
