mod common;

use common::{FakeBoard, run_slices};
use sepic_psu_rs::calibration::CalibrationStage;
use sepic_psu_rs::data_types::{AppMode, ButtonId, Channel, PwmMode, VoltageLevel};
use sepic_psu_rs::leds::Indicators;
use sepic_psu_rs::mode::Mode;
use sepic_psu_rs::protection::Trip;
use sepic_psu_rs::settings::Settings;
use sepic_psu_rs::{Config, Controller, Signals};

fn started(board: FakeBoard, signals: &Signals) -> Controller<'_, FakeBoard> {
    let mut controller = Controller::new(board, signals, Config::default());
    controller.start().unwrap();
    controller
}

#[test]
fn blank_storage_boots_idle() {
    let signals = Signals::new();
    let controller = started(FakeBoard::default(), &signals);

    assert_eq!(controller.mode().kind(), AppMode::Idle);
    assert_eq!(controller.app().duty_cycle, 0);
    assert_eq!(controller.board().pwm_modes, vec![PwmMode::Fast125kHz]);
    assert_eq!(controller.pwm_mode(), PwmMode::Fast125kHz);
    assert!(!controller.save_scheduler().is_pending());
}

#[test]
fn over_current_latches_error() {
    let signals = Signals::new();
    let mut controller = started(FakeBoard::default(), &signals);

    // 2 x 2562 decimated -> 2001 mA, one over the output ceiling.
    controller.board_mut().set_raw(Channel::OutputCurrent, 2_562);
    run_slices(&mut controller, &signals, 1);

    assert_eq!(controller.mode().kind(), AppMode::Error);
    assert_eq!(controller.last_trip(), Some(Trip::OutputOverCurrent));
    assert_eq!(controller.settings().mode, AppMode::Error);
    assert_eq!(controller.board().pwm.duty, 0);
    assert!(!controller.save_scheduler().is_pending());

    // Clearing the fault does not leave Error.
    controller.board_mut().set_raw(Channel::OutputCurrent, 0);
    run_slices(&mut controller, &signals, 300);
    assert_eq!(controller.mode().kind(), AppMode::Error);
    assert!(controller.board().chunk_offsets.is_empty());
}

#[test]
fn mode_change_cannot_leave_error() {
    let signals = Signals::new();
    let mut controller = started(FakeBoard::default(), &signals);
    controller.board_mut().set_raw(Channel::OutputCurrent, 3_000);
    run_slices(&mut controller, &signals, 1);
    assert_eq!(controller.mode().kind(), AppMode::Error);

    controller.board_mut().set_raw(Channel::OutputCurrent, 0);
    controller.next_mode().unwrap();
    assert_eq!(controller.mode().kind(), AppMode::Error);
    assert_eq!(controller.settings().mode, AppMode::Error);
    assert!(!controller.save_scheduler().is_pending());

    run_slices(&mut controller, &signals, 10);
    assert_eq!(controller.mode().kind(), AppMode::Error);
    assert_eq!(controller.board().pwm.duty, 0);
}

#[test]
fn just_under_the_ceiling_does_not_trip() {
    let signals = Signals::new();
    let mut controller = started(FakeBoard::default(), &signals);
    controller.board_mut().set_raw(Channel::OutputCurrent, 2_560);
    run_slices(&mut controller, &signals, 5);
    assert_eq!(controller.mode().kind(), AppMode::Idle);
    assert_eq!(controller.last_trip(), None);
}

#[test]
fn short_press_in_error_reboots() {
    let signals = Signals::new();
    let mut controller = started(FakeBoard::default(), &signals);
    controller.board_mut().set_raw(Channel::OutputCurrent, 3_000);
    run_slices(&mut controller, &signals, 1);
    assert_eq!(controller.mode().kind(), AppMode::Error);

    signals.mode_button.on_edge();
    controller.board_mut().mode_button.low = true;
    run_slices(&mut controller, &signals, 9);
    controller.board_mut().mode_button.low = false;
    run_slices(&mut controller, &signals, 10);

    assert_eq!(controller.board().reboots, 1);
}

#[test]
fn long_press_advances_mode_and_saves_later() {
    let signals = Signals::new();
    let mut controller = started(FakeBoard::default(), &signals);

    signals.mode_button.on_edge();
    controller.board_mut().mode_button.low = true;
    run_slices(&mut controller, &signals, 209);
    assert_eq!(controller.mode().kind(), AppMode::Idle);
    run_slices(&mut controller, &signals, 1);
    assert_eq!(controller.mode().kind(), AppMode::Cv);
    assert!(!controller.settings().output_enabled);
    assert_eq!(controller.save_scheduler().remaining_s(), 10);

    // Release: no second gesture, the latch re-arms two polls later.
    controller.board_mut().mode_button.low = false;
    run_slices(&mut controller, &signals, 30);
    assert_eq!(controller.board().armed, vec![ButtonId::Mode]);
    assert_eq!(controller.mode().kind(), AppMode::Cv);

    run_slices(&mut controller, &signals, 1_199 - 240);
    assert!(controller.board().chunk_offsets.is_empty());
    run_slices(&mut controller, &signals, 1);
    assert_eq!(controller.board().chunk_offsets, vec![0, 4, 8, 12]);
    assert_eq!(controller.board().storage[0], AppMode::Cv as u8);
    assert!(!controller.save_scheduler().is_pending());
}

#[test]
fn stored_cv_mode_soft_starts_on_boot() {
    let mut settings = Settings::default();
    settings.mode = AppMode::Cv;
    settings.output_enabled = true;
    settings.cv.voltage = VoltageLevel::V5;

    let signals = Signals::new();
    let mut controller = started(FakeBoard::with_settings(settings.encode()), &signals);
    assert_eq!(controller.leds().lit(), Indicators::CV | Indicators::X4);

    run_slices(&mut controller, &signals, 50);
    assert_eq!(controller.app().duty_cycle, 10);
    assert_eq!(controller.board().pwm.duty, 10);
    match controller.mode() {
        Mode::Cv(regulator) => assert_eq!(regulator.target(), 5_000),
        other => panic!("unexpected mode {:?}", other.kind()),
    }
}

#[test]
fn idle_publishes_activity_blink() {
    let signals = Signals::new();
    let mut controller = started(FakeBoard::default(), &signals);

    run_slices(&mut controller, &signals, 1);
    assert_eq!(controller.board().published, vec![Indicators::empty()]);

    // The 1000 ms hook runs after the publish, so its toggle goes out on the next slice.
    run_slices(&mut controller, &signals, 99);
    assert_eq!(controller.leds().lit(), Indicators::X8);
    assert_eq!(controller.board().published.len(), 1);
    run_slices(&mut controller, &signals, 1);
    assert_eq!(controller.board().published.last(), Some(&Indicators::X8));
    run_slices(&mut controller, &signals, 100);
    assert_eq!(controller.board().published.last(), Some(&Indicators::empty()));
    assert_eq!(controller.board().published.len(), 3);
}

#[test]
fn both_buttons_at_boot_calibrate_idle_current() {
    let mut board = FakeBoard::default();
    board.mode_button.low = true;
    board.output_button.low = true;
    board.set_raw(Channel::InputCurrent, 10);
    board.set_raw(Channel::OutputCurrent, 6);

    let signals = Signals::new();
    let controller = started(board, &signals);

    assert_eq!(controller.mode().kind(), AppMode::Calibration);
    match controller.mode() {
        Mode::Calibration(sequencer) => assert_eq!(sequencer.stage(), CalibrationStage::InputVoltage),
        other => panic!("unexpected mode {:?}", other.kind()),
    }
    let calibration = controller.settings().calibration;
    assert_eq!(calibration.input_current_idle, 20);
    assert_eq!(calibration.output_current_idle, 12);
    assert_eq!(controller.save_scheduler().remaining_s(), 1);
    assert!(controller.board().watchdog_feeds >= 500);
}

#[test]
fn saved_calibration_mode_boots_idle() {
    let mut settings = Settings::default();
    settings.mode = AppMode::Calibration;
    let signals = Signals::new();
    let controller = started(FakeBoard::with_settings(settings.encode()), &signals);
    assert_eq!(controller.mode().kind(), AppMode::Idle);
}
