#![allow(dead_code)]

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType as PinErrorType, InputPin};
use embedded_hal::pwm::{ErrorType as PwmErrorType, SetDutyCycle};
use sepic_psu_rs::config::AnalogChannel;
use sepic_psu_rs::data_types::{ButtonId, Channel, PwmMode};
use sepic_psu_rs::leds::Indicators;
use sepic_psu_rs::settings::SETTINGS_BLOB_LEN;
use sepic_psu_rs::{Board, Controller};

/// PWM actuator that records the last compare value (max 255).
#[derive(Default)]
pub struct FakePwm {
    pub duty: u16,
}

impl PwmErrorType for FakePwm {
    type Error = Infallible;
}

impl SetDutyCycle for FakePwm {
    fn max_duty_cycle(&self) -> u16 {
        255
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.duty = duty;
        Ok(())
    }
}

/// Active-low button line.
#[derive(Default)]
pub struct FakeButton {
    pub low: bool,
}

impl PinErrorType for FakeButton {
    type Error = Infallible;
}

impl InputPin for FakeButton {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.low)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(self.low)
    }
}

#[derive(Default)]
pub struct FakeBoard {
    /// Raw conversion returned per channel, indexed by `Channel as usize`.
    pub raw: [u16; 4],
    pub pwm: FakePwm,
    pub mode_button: FakeButton,
    pub output_button: FakeButton,
    pub storage: [u8; SETTINGS_BLOB_LEN],
    pub chunk_offsets: Vec<usize>,
    pub pwm_modes: Vec<PwmMode>,
    pub published: Vec<Indicators>,
    pub armed: Vec<ButtonId>,
    pub watchdog_feeds: u32,
    pub reboots: u32,
}

impl FakeBoard {
    pub fn with_settings(blob: [u8; SETTINGS_BLOB_LEN]) -> Self {
        Self { storage: blob, ..Self::default() }
    }

    pub fn set_raw(&mut self, channel: Channel, sample: u16) {
        self.raw[channel as usize] = sample;
    }
}

impl Board for FakeBoard {
    type Error = Infallible;
    type Pwm = FakePwm;
    type Button = FakeButton;

    fn sample(&mut self, channel: &AnalogChannel) -> Result<u16, Self::Error> {
        Ok(self.raw[channel.channel as usize])
    }

    fn pwm(&mut self) -> &mut Self::Pwm {
        &mut self.pwm
    }

    fn set_pwm_mode(&mut self, mode: PwmMode) -> Result<(), Self::Error> {
        self.pwm_modes.push(mode);
        Ok(())
    }

    fn button(&mut self, id: ButtonId) -> &mut Self::Button {
        match id {
            ButtonId::Mode => &mut self.mode_button,
            ButtonId::Output => &mut self.output_button,
        }
    }

    fn arm_button(&mut self, id: ButtonId) {
        self.armed.push(id);
    }

    fn publish_indicators(&mut self, leds: Indicators) -> Result<(), Self::Error> {
        self.published.push(leds);
        Ok(())
    }

    fn read_settings(&mut self, buf: &mut [u8]) -> Result<(), Self::Error> {
        buf.copy_from_slice(&self.storage[..buf.len()]);
        Ok(())
    }

    fn write_settings(&mut self, offset: usize, chunk: &[u8]) -> Result<(), Self::Error> {
        self.storage[offset..offset + chunk.len()].copy_from_slice(chunk);
        self.chunk_offsets.push(offset);
        Ok(())
    }

    fn feed_watchdog(&mut self) {
        self.watchdog_feeds += 1;
    }

    fn reboot(&mut self) {
        self.reboots += 1;
    }
}

/// Run `slices` timer periods, one fast tick each.
pub fn run_slices(controller: &mut Controller<'_, FakeBoard>, signals: &sepic_psu_rs::Signals, slices: u32) {
    for _ in 0..slices {
        signals.timebase.on_tick();
        controller.fast_tick().unwrap();
    }
}
