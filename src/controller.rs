//! Application controller: owns the volatile state and runs the cooperative scheduler.

use embedded_hal::digital::Error as _;
use embedded_hal::pwm::Error as _;

use crate::board::Board;
use crate::button::{ButtonClassifier, is_down};
use crate::calibration::{CalibrationSequencer, RunningAverage};
use crate::config::{Config, MIN_DUTY_CYCLE};
use crate::data_types::{AppMode, ApplicationState, ButtonEvent, ButtonId, PwmMode};
use crate::error::Error;
use crate::leds::LedPanel;
use crate::measurement::{MeasurementPipeline, read_raw};
use crate::mode::{Mode, ModeContext, Request};
use crate::protection::{self, Trip};
use crate::pwm::{PwmGovernor, apply_duty};
use crate::scheduler::SliceCascade;
use crate::settings::{SETTINGS_BLOB_LEN, SETTINGS_CHUNK_LEN, SaveScheduler, Settings};
use crate::timebase::Signals;

/// Supply controller over board `B`.
pub struct Controller<'a, B> {
    board: B,
    signals: &'a Signals,
    config: Config,
    app: ApplicationState,
    settings: Settings,
    mode: Mode,
    leds: LedPanel,
    save: SaveScheduler,
    measurement: MeasurementPipeline,
    cascade: SliceCascade,
    pwm_governor: PwmGovernor,
    mode_button: ButtonClassifier,
    output_button: ButtonClassifier,
    saving: bool,
    last_trip: Option<Trip>,
}

impl<'a, B: Board> Controller<'a, B> {
    /// Create a controller in Idle with default settings. Call [`Controller::start`] before ticking.
    pub fn new(board: B, signals: &'a Signals, config: Config) -> Self {
        Self {
            board,
            signals,
            measurement: MeasurementPipeline::new(&config.measurement),
            mode_button: ButtonClassifier::new(config.buttons),
            output_button: ButtonClassifier::new(config.buttons),
            config,
            app: ApplicationState::default(),
            settings: Settings::default(),
            mode: Mode::Idle,
            leds: LedPanel::new(),
            save: SaveScheduler::new(),
            cascade: SliceCascade::new(),
            pwm_governor: PwmGovernor::new(),
            saving: false,
            last_trip: None,
        }
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut B {
        &mut self.board
    }

    /// Release the board.
    pub fn free(self) -> B {
        self.board
    }

    pub fn app(&self) -> &ApplicationState {
        &self.app
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn leds(&self) -> &LedPanel {
        &self.leds
    }

    pub fn save_scheduler(&self) -> &SaveScheduler {
        &self.save
    }

    /// Protection that latched the current Error, if any.
    pub fn last_trip(&self) -> Option<Trip> {
        self.last_trip
    }

    pub fn pwm_mode(&self) -> PwmMode {
        self.pwm_governor.mode()
    }

    /// Boot: load settings, enter calibration if both buttons are held, start the mode.
    pub fn start(&mut self) -> Result<(), Error<B::Error>> {
        self.load_settings()?;
        self.app = ApplicationState::default();
        self.board.set_pwm_mode(self.pwm_governor.mode()).map_err(Error::Board)?;

        let mode_down = is_down(self.board.button(ButtonId::Mode)).map_err(|e| Error::Button(e.kind()))?;
        let output_down = is_down(self.board.button(ButtonId::Output)).map_err(|e| Error::Button(e.kind()))?;
        if mode_down && output_down {
            info!("both buttons held at boot, entering calibration");
            self.settings.mode = AppMode::Calibration;
        }

        self.init_current_mode()
    }

    /// Fast entry point: measure, protect, regulate, apply duty, then any due time slice.
    pub fn fast_tick(&mut self) -> Result<(), Error<B::Error>> {
        self.board.feed_watchdog();

        self.measurement
            .measure(&mut self.board, &self.settings.calibration, &mut self.app)
            .map_err(Error::Board)?;

        self.protect();

        let mut ctx = ModeContext {
            app: &mut self.app,
            settings: &mut self.settings,
            leds: &mut self.leds,
            save: &mut self.save,
            config: &self.config,
            now_10ms: self.signals.timebase.now_10ms(),
        };
        self.mode.tick(&mut ctx);

        apply_duty(self.board.pwm(), self.app.duty_cycle).map_err(|e| Error::Pwm(e.kind()))?;

        if self.signals.timebase.take_pending() {
            self.slice_10ms()?;
        }
        Ok(())
    }

    fn protect(&mut self) {
        if self.mode.kind() == AppMode::Error {
            return;
        }
        if let Some(trip) = protection::check(&self.app, &self.config.limits) {
            self.enter_error(trip);
        }
    }

    /// Latch the supply into Error. Only a reboot leaves it.
    fn enter_error(&mut self, trip: Trip) {
        warn!("protection trip: {}", trip);
        self.last_trip = Some(trip);
        self.app.duty_cycle = MIN_DUTY_CYCLE;
        self.settings.mode = AppMode::Error;
        let mut ctx = ModeContext {
            app: &mut self.app,
            settings: &mut self.settings,
            leds: &mut self.leds,
            save: &mut self.save,
            config: &self.config,
            now_10ms: self.signals.timebase.now_10ms(),
        };
        self.mode = Mode::init(AppMode::Error, &mut ctx);
    }

    fn slice_10ms(&mut self) -> Result<(), Error<B::Error>> {
        let slices = self.cascade.on_10ms();

        self.with_mode(|mode, ctx| mode.slice_10ms(ctx));
        if let Some(leds) = self.leds.take_update() {
            self.board.publish_indicators(leds).map_err(Error::Board)?;
        }

        if slices.ms100 {
            self.with_mode(|mode, ctx| mode.slice_100ms(ctx));
            self.poll_buttons()?;
        }
        if slices.ms500 {
            self.with_mode(|mode, ctx| mode.slice_500ms(ctx));
        }
        if slices.ms1000 {
            self.with_mode(|mode, ctx| mode.slice_1000ms(ctx));
            if let Some(pwm_mode) = self.pwm_governor.tick_1000ms(&self.app) {
                info!("pwm mode {}", pwm_mode);
                self.board.set_pwm_mode(pwm_mode).map_err(Error::Board)?;
            }
            // A save in progress re-enters the scheduler; the countdown waits for it.
            if !self.saving && self.save.tick_1000ms() {
                self.save_settings()?;
            }
        }
        Ok(())
    }

    fn with_mode<R>(&mut self, hook: impl FnOnce(&mut Mode, &mut ModeContext<'_>) -> R) -> R {
        let mut ctx = ModeContext {
            app: &mut self.app,
            settings: &mut self.settings,
            leds: &mut self.leds,
            save: &mut self.save,
            config: &self.config,
            now_10ms: self.signals.timebase.now_10ms(),
        };
        hook(&mut self.mode, &mut ctx)
    }

    fn poll_buttons(&mut self) -> Result<(), Error<B::Error>> {
        let signals = self.signals;
        for id in [ButtonId::Mode, ButtonId::Output] {
            let latch = signals.latch(id);
            let classifier = match id {
                ButtonId::Mode => &mut self.mode_button,
                ButtonId::Output => &mut self.output_button,
            };
            let poll = classifier
                .poll(latch, self.board.button(id))
                .map_err(|e| Error::Button(e.kind()))?;
            if poll.rearmed {
                self.board.arm_button(id);
            }
            if let Some(event) = poll.event {
                self.dispatch_button(id, event)?;
            }
        }
        Ok(())
    }

    fn dispatch_button(&mut self, id: ButtonId, event: ButtonEvent) -> Result<(), Error<B::Error>> {
        debug!("button {} {}", id, event);
        match self.with_mode(|mode, ctx| mode.on_button(id, event, ctx)) {
            Some(request) => self.handle(request),
            None => Ok(()),
        }
    }

    fn handle(&mut self, request: Request) -> Result<(), Error<B::Error>> {
        match request {
            Request::NextMode => self.next_mode(),
            Request::ToggleOutput => self.output_toggle(),
            Request::Reinit => self.init_current_mode(),
            Request::Reboot => {
                info!("reboot requested");
                self.board.reboot();
                Ok(())
            }
        }
    }

    /// Advance the mode ring with the output forced off. Error is left only by a reboot.
    pub fn next_mode(&mut self) -> Result<(), Error<B::Error>> {
        if self.mode.kind() == AppMode::Error {
            warn!("mode change ignored while latched in error");
            return Ok(());
        }
        self.output_off();
        self.settings.mode = self.settings.mode.next();
        info!("mode -> {}", self.settings.mode);
        self.init_current_mode()?;
        self.save.schedule(self.config.settings_save_delay_s);
        Ok(())
    }

    /// Flip the output and re-enter the active mode.
    pub fn output_toggle(&mut self) -> Result<(), Error<B::Error>> {
        if self.settings.output_enabled {
            self.output_off();
        } else {
            self.settings.output_enabled = true;
            self.save.schedule(self.config.settings_save_delay_s);
        }
        self.init_current_mode()
    }

    fn output_off(&mut self) {
        self.settings.output_enabled = false;
        self.app.duty_cycle = MIN_DUTY_CYCLE;
        self.save.schedule(self.config.settings_save_delay_s);
    }

    /// (Re)build the active mode from the settings.
    pub fn init_current_mode(&mut self) -> Result<(), Error<B::Error>> {
        let kind = self.settings.mode;
        self.mode = self.with_mode(|_, ctx| Mode::init(kind, ctx));
        if kind == AppMode::Calibration {
            self.start_calibration()?;
        }
        Ok(())
    }

    /// Average the idle current of both channels while keeping the scheduler running,
    /// then move on to the first interactive stage.
    fn start_calibration(&mut self) -> Result<(), Error<B::Error>> {
        let input_channel = *self.measurement.input_current_channel();
        let output_channel = *self.measurement.output_current_channel();
        let mut input = RunningAverage::new();
        let mut output = RunningAverage::new();

        for _ in 0..self.config.calibration_idle_samples {
            input.push(read_raw(&mut self.board, &input_channel).map_err(Error::Board)?);
            output.push(read_raw(&mut self.board, &output_channel).map_err(Error::Board)?);
            self.fast_tick()?;
        }

        // A trip during sampling leaves the controller in Error.
        if !matches!(self.mode, Mode::Calibration(_)) {
            return Ok(());
        }

        CalibrationSequencer::store_idle_baselines(&mut self.settings.calibration, input.value(), output.value());
        self.save.schedule(1);

        let finished = match &mut self.mode {
            Mode::Calibration(sequencer) => sequencer.advance(&mut self.app, &mut self.settings, &mut self.leds),
            _ => false,
        };
        if finished {
            self.next_mode()
        } else {
            Ok(())
        }
    }

    /// Write the settings blob chunk by chunk, re-entering the scheduler in between.
    fn save_settings(&mut self) -> Result<(), Error<B::Error>> {
        info!("saving settings");
        let blob = self.settings.encode();
        self.saving = true;
        let result = self.write_blob(&blob);
        self.saving = false;
        result
    }

    fn write_blob(&mut self, blob: &[u8; SETTINGS_BLOB_LEN]) -> Result<(), Error<B::Error>> {
        for (index, chunk) in blob.chunks(SETTINGS_CHUNK_LEN).enumerate() {
            self.board
                .write_settings(index * SETTINGS_CHUNK_LEN, chunk)
                .map_err(Error::Board)?;
            self.fast_tick()?;
        }
        Ok(())
    }

    fn load_settings(&mut self) -> Result<(), Error<B::Error>> {
        let mut blob = [0u8; SETTINGS_BLOB_LEN];
        self.board.read_settings(&mut blob).map_err(Error::Board)?;
        let (settings, repaired) = Settings::decode(&blob);
        if repaired > 0 {
            warn!("settings: repaired {} fields", repaired);
        }
        self.settings = settings;
        Ok(())
    }
}
