//! Operating modes and their event hooks.
//!
//! Every mode answers the same hooks (init, fast tick, four time slices, two buttons times
//! two gestures). Hooks never call back into the controller; anything that reaches beyond
//! the mode (switching mode, toggling the output, reboot) comes back as a [`Request`].

use crate::calibration::{CalibrationSequencer, CalibrationStage, LiveLoop};
use crate::charge::{ChargeComposer, ChargeState};
use crate::config::{Config, MAX_DUTY_CYCLE, MIN_DUTY_CYCLE, MPPT_DEFAULT_INPUT_MV, MPPT_STEP_MV};
use crate::data_types::{AppMode, ApplicationState, ButtonEvent, ButtonId};
use crate::leds::{Indicators, LedPanel};
use crate::regulator::{CcRegulator, RegulatorParams, VoltageRegulator};
use crate::settings::{SaveScheduler, Settings};

/// Borrowed view of the controller state handed to every hook.
pub struct ModeContext<'a> {
    pub app: &'a mut ApplicationState,
    pub settings: &'a mut Settings,
    pub leds: &'a mut LedPanel,
    pub save: &'a mut SaveScheduler,
    pub config: &'a Config,
    pub now_10ms: u32,
}

impl ModeContext<'_> {
    fn schedule_save(&mut self) {
        self.save.schedule(self.config.settings_save_delay_s);
    }
}

/// Action a hook asks the controller to carry out.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Request {
    /// Advance the mode ring.
    NextMode,
    /// Flip the output-enabled flag and re-enter the mode.
    ToggleOutput,
    /// Re-enter the active mode with the current settings.
    Reinit,
    Reboot,
}

/// MPPT placeholder: walks duty so the input settles at a fixed voltage.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MpptTracker {
    pub input_target_mv: u32,
}

impl MpptTracker {
    pub fn new() -> Self {
        Self { input_target_mv: MPPT_DEFAULT_INPUT_MV }
    }

    pub fn track(&self, app: &mut ApplicationState, output_enabled: bool) {
        if !output_enabled {
            return;
        }
        if app.input_voltage_mv > self.input_target_mv && app.duty_cycle < MAX_DUTY_CYCLE {
            app.increase_duty();
        } else if app.input_voltage_mv < self.input_target_mv && app.duty_cycle > MIN_DUTY_CYCLE {
            app.decrease_duty();
        }
    }
}

impl Default for MpptTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Active mode with its transient state.
#[derive(Clone, Copy, Debug)]
pub enum Mode {
    Idle,
    Cv(VoltageRegulator),
    Cc(CcRegulator),
    Charge(ChargeComposer),
    Mppt(MpptTracker),
    Error,
    Calibration(CalibrationSequencer),
}

impl Mode {
    /// Build the state for `kind` from the settings and light its indicators.
    ///
    /// Calibration starts in the idle-current stage; the controller runs the sampling loop.
    pub fn init(kind: AppMode, ctx: &mut ModeContext<'_>) -> Self {
        ctx.leds.clear_all();
        ctx.app.duty_cycle = MIN_DUTY_CYCLE;
        let settings = *ctx.settings;
        debug!("init mode {}", kind);

        match kind {
            AppMode::Idle => Mode::Idle,
            AppMode::Cv => {
                ctx.leds.set(Indicators::CV | Indicators::level(settings.cv.voltage.index()));
                Mode::Cv(VoltageRegulator::new(RegulatorParams::cv(settings.cv.voltage)))
            }
            AppMode::Cc => {
                ctx.leds.set(Indicators::CC | Indicators::level(settings.cc.current.index()));
                Mode::Cc(CcRegulator::cc_mode(settings.cc.current, settings.cc.voltage))
            }
            AppMode::Charge => {
                ctx.leds.set(Indicators::CC | Indicators::CHARGE | Indicators::level(settings.charge.current.index()));
                Mode::Charge(ChargeComposer::new(
                    settings.charge.current,
                    settings.charge.voltage,
                    ctx.config.charge_regulation_period_10ms,
                ))
            }
            AppMode::Mppt => Mode::Mppt(MpptTracker::new()),
            AppMode::Error => {
                ctx.settings.mode = AppMode::Error;
                ctx.save.cancel();
                Mode::Error
            }
            AppMode::Calibration => Mode::Calibration(CalibrationSequencer::new()),
        }
    }

    pub fn kind(&self) -> AppMode {
        match self {
            Mode::Idle => AppMode::Idle,
            Mode::Cv(_) => AppMode::Cv,
            Mode::Cc(_) => AppMode::Cc,
            Mode::Charge(_) => AppMode::Charge,
            Mode::Mppt(_) => AppMode::Mppt,
            Mode::Error => AppMode::Error,
            Mode::Calibration(_) => AppMode::Calibration,
        }
    }

    /// One regulation step, run every fast tick after protection.
    pub fn tick(&mut self, ctx: &mut ModeContext<'_>) {
        let output = ctx.settings.output_enabled;
        match self {
            Mode::Idle | Mode::Error => ctx.app.duty_cycle = MIN_DUTY_CYCLE,
            Mode::Cv(regulator) => regulator.regulate(ctx.app, output, ctx.now_10ms, ctx.leds),
            Mode::Cc(regulator) => regulator.regulate(ctx.app, output, ctx.now_10ms, ctx.leds),
            Mode::Charge(charger) => charger.regulate(ctx.app, output, ctx.now_10ms, ctx.leds),
            Mode::Mppt(tracker) => tracker.track(ctx.app, output),
            Mode::Calibration(sequencer) => sequencer.tick(ctx.app, output, ctx.now_10ms, ctx.leds),
        }
    }

    pub fn slice_10ms(&mut self, _ctx: &mut ModeContext<'_>) {}

    pub fn slice_100ms(&mut self, ctx: &mut ModeContext<'_>) {
        if let Mode::Calibration(sequencer) = self {
            let stage_led = match sequencer.stage() {
                CalibrationStage::OutputVoltage => Indicators::CV,
                CalibrationStage::OutputCurrent => Indicators::CC,
                _ => Indicators::empty(),
            };
            ctx.leds.toggle(Indicators::CHARGE | stage_led);
        }
    }

    pub fn slice_500ms(&mut self, ctx: &mut ModeContext<'_>) {
        match self {
            Mode::Cc(_) => blink_ceiling(ctx),
            Mode::Charge(charger) => {
                let voltage = ctx.settings.charge.voltage;
                ctx.leds.toggle(Indicators::CV | Indicators::level(voltage.index()));
                if charger.state() == ChargeState::Charging {
                    blink_output(ctx);
                }
            }
            Mode::Error => ctx.leds.toggle(Indicators::ERROR),
            Mode::Calibration(sequencer) => {
                if let Some(LiveLoop::Current(_)) = sequencer.live() {
                    blink_ceiling(ctx);
                }
            }
            _ => {}
        }
    }

    pub fn slice_1000ms(&mut self, ctx: &mut ModeContext<'_>) {
        match self {
            Mode::Idle => ctx.leds.toggle(Indicators::X8),
            Mode::Cv(_) => blink_cv(ctx),
            Mode::Charge(charger) => {
                if charger.state() == ChargeState::Standby {
                    blink_output(ctx);
                }
            }
            Mode::Mppt(_) => ctx.leds.toggle(Indicators::CHARGE),
            Mode::Calibration(sequencer) => {
                if let Some(LiveLoop::Voltage(_)) = sequencer.live() {
                    blink_cv(ctx);
                }
            }
            _ => {}
        }
    }

    /// Dispatch a classified button gesture.
    pub fn on_button(&mut self, button: ButtonId, event: ButtonEvent, ctx: &mut ModeContext<'_>) -> Option<Request> {
        match self {
            Mode::Idle => match (button, event) {
                (ButtonId::Mode, ButtonEvent::Held) => Some(Request::NextMode),
                _ => None,
            },
            Mode::Cv(_) => match (button, event) {
                (ButtonId::Mode, ButtonEvent::Pressed) => Some(Request::ToggleOutput),
                (ButtonId::Mode, ButtonEvent::Held) => Some(Request::NextMode),
                (ButtonId::Output, ButtonEvent::Pressed) => {
                    ctx.settings.cv.voltage = ctx.settings.cv.voltage.next();
                    ctx.schedule_save();
                    Some(Request::Reinit)
                }
                (ButtonId::Output, ButtonEvent::Held) => {
                    ctx.settings.cv.voltage = ctx.settings.cv.voltage.previous();
                    ctx.schedule_save();
                    Some(Request::Reinit)
                }
            },
            Mode::Cc(_) => match (button, event) {
                (ButtonId::Mode, ButtonEvent::Pressed) => Some(Request::ToggleOutput),
                (ButtonId::Mode, ButtonEvent::Held) => Some(Request::NextMode),
                (ButtonId::Output, ButtonEvent::Pressed) => {
                    ctx.settings.cc.current = ctx.settings.cc.current.next();
                    ctx.schedule_save();
                    Some(Request::Reinit)
                }
                (ButtonId::Output, ButtonEvent::Held) => {
                    ctx.settings.cc.voltage = ctx.settings.cc.voltage.next();
                    ctx.schedule_save();
                    Some(Request::Reinit)
                }
            },
            Mode::Charge(_) => match (button, event) {
                (ButtonId::Mode, ButtonEvent::Pressed) => Some(Request::ToggleOutput),
                (ButtonId::Mode, ButtonEvent::Held) => Some(Request::NextMode),
                (ButtonId::Output, ButtonEvent::Pressed) => {
                    ctx.settings.charge.current = ctx.settings.charge.current.next();
                    ctx.schedule_save();
                    Some(Request::Reinit)
                }
                (ButtonId::Output, ButtonEvent::Held) => {
                    ctx.settings.charge.voltage = ctx.settings.charge.voltage.next();
                    ctx.schedule_save();
                    Some(Request::Reinit)
                }
            },
            Mode::Mppt(tracker) => match (button, event) {
                (ButtonId::Mode, ButtonEvent::Pressed) => Some(Request::ToggleOutput),
                (ButtonId::Mode, ButtonEvent::Held) => Some(Request::NextMode),
                (ButtonId::Output, ButtonEvent::Pressed) => {
                    tracker.input_target_mv = tracker.input_target_mv.saturating_add(MPPT_STEP_MV);
                    None
                }
                (ButtonId::Output, ButtonEvent::Held) => {
                    tracker.input_target_mv = tracker.input_target_mv.saturating_sub(MPPT_STEP_MV);
                    None
                }
            },
            Mode::Error => match event {
                ButtonEvent::Pressed => Some(Request::Reboot),
                ButtonEvent::Held => None,
            },
            Mode::Calibration(sequencer) => {
                if !sequencer.is_interactive() {
                    return None;
                }
                match (button, event) {
                    (ButtonId::Mode, ButtonEvent::Held) => {
                        if sequencer.advance(ctx.app, ctx.settings, ctx.leds) {
                            Some(Request::NextMode)
                        } else {
                            None
                        }
                    }
                    (_, ButtonEvent::Pressed) => {
                        let delta = if button == ButtonId::Mode { 1 } else { -1 };
                        if sequencer.trim(&mut ctx.settings.calibration, delta) {
                            ctx.save.schedule(ctx.config.calibration_save_delay_s);
                        }
                        None
                    }
                    (ButtonId::Output, ButtonEvent::Held) => None,
                }
            }
        }
    }
}

/// X8 blinks while the output is enabled.
fn blink_output(ctx: &mut ModeContext<'_>) {
    if ctx.settings.output_enabled {
        ctx.leds.toggle(Indicators::X8);
    }
}

/// CV mode: the target LEDs blink while the output is enabled.
fn blink_cv(ctx: &mut ModeContext<'_>) {
    if ctx.settings.output_enabled {
        ctx.leds.toggle(Indicators::CV | Indicators::level(ctx.settings.cv.voltage.index()));
    }
}

/// CC mode: the voltage-ceiling LEDs blink, X8 too while the output is enabled.
fn blink_ceiling(ctx: &mut ModeContext<'_>) {
    ctx.leds.toggle(Indicators::CV | Indicators::level(ctx.settings.cc.voltage.index()));
    blink_output(ctx);
}
