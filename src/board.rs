//! Hardware seam of the control core.

use embedded_hal::digital::InputPin;
use embedded_hal::pwm::SetDutyCycle;

use crate::config::AnalogChannel;
use crate::data_types::{ButtonId, PwmMode};
use crate::leds::Indicators;

/// Collaborators the controller drives: ADC, PWM stage, buttons, LEDs, storage, watchdog.
///
/// Button lines are active low. Each button's edge interrupt is expected to call
/// [`EdgeLatch::on_edge`](crate::button::EdgeLatch::on_edge) and detach itself;
/// [`Board::arm_button`] re-attaches it.
pub trait Board {
    type Error: core::fmt::Debug;
    type Pwm: SetDutyCycle;
    type Button: InputPin;

    /// One raw conversion of `channel`. Oversampling is done by the caller.
    fn sample(&mut self, channel: &AnalogChannel) -> Result<u16, Self::Error>;

    /// Duty-cycle actuator. Implementations apply the compare value atomically.
    fn pwm(&mut self) -> &mut Self::Pwm;

    /// Reprogram the switching timer.
    fn set_pwm_mode(&mut self, mode: PwmMode) -> Result<(), Self::Error>;

    fn button(&mut self, id: ButtonId) -> &mut Self::Button;

    /// Re-attach the edge interrupt of `id` after the bounce hold-off.
    fn arm_button(&mut self, id: ButtonId);

    /// Drive the indicator LEDs.
    fn publish_indicators(&mut self, leds: Indicators) -> Result<(), Self::Error>;

    /// Read the persisted settings blob into `buf`.
    fn read_settings(&mut self, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Write one chunk of the settings blob at `offset`.
    fn write_settings(&mut self, offset: usize, chunk: &[u8]) -> Result<(), Self::Error>;

    fn feed_watchdog(&mut self);

    /// Release all outputs and force a hard reset. On hardware this does not return.
    fn reboot(&mut self);
}
