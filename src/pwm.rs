//! Duty-cycle application and switching-frequency auto-adjust.

use embedded_hal::pwm::SetDutyCycle;

use crate::config::{MAX_DUTY_CYCLE, PWM_DEFAULT_MODE, PWM_HIGH_LOAD_HEADROOM_MV, PWM_HIGH_LOAD_MODE, PWM_RESOLUTION};
use crate::data_types::{ApplicationState, PwmMode};

/// Write `duty` (out of `PWM_RESOLUTION`) to the actuator, clamped to `MAX_DUTY_CYCLE`.
pub fn apply_duty<P: SetDutyCycle>(pwm: &mut P, duty: u8) -> Result<(), P::Error> {
    pwm.set_duty_cycle_fraction(duty.min(MAX_DUTY_CYCLE) as u16, PWM_RESOLUTION as u16)
}

/// Drops to a low switching frequency when duty saturates with plenty of input headroom,
/// and returns to the default once the load backs off.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PwmGovernor {
    mode: PwmMode,
}

impl PwmGovernor {
    pub const fn new() -> Self {
        Self { mode: PWM_DEFAULT_MODE }
    }

    pub fn mode(&self) -> PwmMode {
        self.mode
    }

    /// Once-a-second check. Returns the new mode when a switch is needed.
    pub fn tick_1000ms(&mut self, app: &ApplicationState) -> Option<PwmMode> {
        let next = if self.mode == PWM_DEFAULT_MODE
            && app.duty_cycle == MAX_DUTY_CYCLE
            && app.input_voltage_mv > app.output_voltage_mv.saturating_add(PWM_HIGH_LOAD_HEADROOM_MV)
        {
            PWM_HIGH_LOAD_MODE
        } else if self.mode == PWM_HIGH_LOAD_MODE && app.duty_cycle <= MAX_DUTY_CYCLE / 10 {
            PWM_DEFAULT_MODE
        } else {
            return None;
        };
        self.mode = next;
        Some(next)
    }
}

impl Default for PwmGovernor {
    fn default() -> Self {
        Self::new()
    }
}
