//! Error definitions for collaborator failures.
//!
//! Control faults (protection trips, snubs, refused charging) are states, not errors;
//! only failures reported by the board or the `embedded-hal` peripherals end up here.

use embedded_hal::digital::ErrorKind as PinErrorKind;
use embedded_hal::pwm::ErrorKind as PwmErrorKind;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug)]
pub enum Error<BoardError> {
    /// ADC, indicator, storage or PWM-mode call on the board failed.
    Board(BoardError),
    /// Duty-cycle actuator rejected the new compare value.
    Pwm(PwmErrorKind),
    /// Button line could not be read.
    Button(PinErrorKind),
}

impl<BoardError: core::fmt::Debug> core::fmt::Display for Error<BoardError> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Board(e) => write!(f, "board error: {:?}", e),
            Error::Pwm(kind) => write!(f, "PWM error: {:?}", kind),
            Error::Button(kind) => write!(f, "button line error: {:?}", kind),
        }
    }
}
