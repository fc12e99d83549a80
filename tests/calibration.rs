use sepic_psu_rs::calibration::{CalibrationSequencer, CalibrationStage, LiveLoop, RunningAverage};
use sepic_psu_rs::data_types::{ApplicationState, CurrentLevel, VoltageLevel};
use sepic_psu_rs::leds::{Indicators, LedPanel};
use sepic_psu_rs::regulator::RegulatorState;
use sepic_psu_rs::settings::{CalibrationOffsets, Settings};

#[test]
fn running_average_seeds_then_halves() {
    let mut avg = RunningAverage::new();
    avg.push(100);
    assert_eq!(avg.value(), 100);
    avg.push(50);
    assert_eq!(avg.value(), 75);
    avg.push(75);
    assert_eq!(avg.value(), 74); // 37 + 37
    assert_eq!(avg.samples(), 3);
}

#[test]
fn stage_order() {
    let mut stage = CalibrationStage::IdleCurrent;
    let mut order = Vec::new();
    for _ in 0..7 {
        order.push(stage);
        stage = stage.next();
    }
    assert_eq!(
        order,
        vec![
            CalibrationStage::IdleCurrent,
            CalibrationStage::InputVoltage,
            CalibrationStage::OutputVoltage,
            CalibrationStage::InputCurrent,
            CalibrationStage::OutputCurrent,
            CalibrationStage::Finish,
            CalibrationStage::Finish,
        ]
    );
}

#[test]
fn idle_stage_is_not_interactive() {
    let sequencer = CalibrationSequencer::new();
    let mut offsets = CalibrationOffsets::default();
    assert!(!sequencer.is_interactive());
    assert!(!sequencer.trim(&mut offsets, 1));
    assert_eq!(offsets, CalibrationOffsets::default());
}

#[test]
fn idle_baselines_land_in_offsets() {
    let mut offsets = CalibrationOffsets::default();
    CalibrationSequencer::store_idle_baselines(&mut offsets, 20, 12);
    assert_eq!(offsets.input_current_idle, 20);
    assert_eq!(offsets.output_current_idle, 12);
}

#[test]
fn trims_follow_the_stage_and_saturate() {
    let mut app = ApplicationState::default();
    let mut settings = Settings::default();
    let mut leds = LedPanel::new();
    let mut sequencer = CalibrationSequencer::new();

    assert!(!sequencer.advance(&mut app, &mut settings, &mut leds));
    assert_eq!(sequencer.stage(), CalibrationStage::InputVoltage);
    assert!(sequencer.live().is_none());

    let offsets = &mut settings.calibration;
    assert!(sequencer.trim(offsets, -1));
    assert!(sequencer.trim(offsets, -1));
    assert_eq!(offsets.input_voltage, -2);
    assert_eq!(offsets.output_voltage, 0);

    offsets.input_voltage = 127;
    assert!(sequencer.trim(offsets, 1));
    assert_eq!(offsets.input_voltage, 127);
}

#[test]
fn live_loops_enable_the_output() {
    let mut app = ApplicationState { duty_cycle: 40, ..Default::default() };
    let mut settings = Settings::default();
    settings.cv.voltage = VoltageLevel::V5;
    settings.cc.current = CurrentLevel::Ma250;
    let mut leds = LedPanel::new();
    let mut sequencer = CalibrationSequencer::new();

    sequencer.advance(&mut app, &mut settings, &mut leds);
    assert!(!settings.output_enabled);
    assert_eq!(leds.lit(), Indicators::empty());

    sequencer.advance(&mut app, &mut settings, &mut leds);
    assert_eq!(sequencer.stage(), CalibrationStage::OutputVoltage);
    assert!(settings.output_enabled);
    assert_eq!(leds.lit(), Indicators::CV | Indicators::X4);
    assert_eq!(app.duty_cycle, 0);
    match sequencer.live() {
        Some(LiveLoop::Voltage(regulator)) => {
            assert_eq!(regulator.target(), 5_000);
            assert_eq!(regulator.state(), RegulatorState::SoftStart);
        }
        other => panic!("unexpected live loop {other:?}"),
    }

    sequencer.advance(&mut app, &mut settings, &mut leds);
    assert!(matches!(sequencer.live(), Some(LiveLoop::Current(_))));
    assert_eq!(leds.lit(), Indicators::CC | Indicators::X3);
    sequencer.advance(&mut app, &mut settings, &mut leds);
    assert_eq!(sequencer.stage(), CalibrationStage::OutputCurrent);
    assert!(matches!(sequencer.live(), Some(LiveLoop::Current(_))));

    assert!(sequencer.advance(&mut app, &mut settings, &mut leds));
    assert_eq!(sequencer.stage(), CalibrationStage::Finish);
    assert!(sequencer.live().is_none());
    assert_eq!(leds.lit(), Indicators::empty());
}

#[test]
fn stages_without_a_loop_hold_duty_at_zero() {
    let mut app = ApplicationState { duty_cycle: 12, ..Default::default() };
    let mut leds = LedPanel::new();
    let mut sequencer = CalibrationSequencer::new();
    sequencer.tick(&mut app, true, 0, &mut leds);
    assert_eq!(app.duty_cycle, 0);
}
