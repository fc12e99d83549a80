use sepic_psu_rs::charge::{ChargeComposer, ChargeState};
use sepic_psu_rs::data_types::{ApplicationState, CurrentLevel, VoltageLevel};
use sepic_psu_rs::leds::{Indicators, LedPanel};

const PERIOD: u8 = 7;

fn li_ion() -> ChargeComposer {
    // 500 mA into a 3.7 V class cell: safe from 3000 mV, terminate at 4120 mV.
    ChargeComposer::new(CurrentLevel::Ma500, VoltageLevel::V3_7, PERIOD)
}

fn battery(mv: u32, ma: u32) -> ApplicationState {
    ApplicationState { output_voltage_mv: mv, output_current_ma: ma, ..Default::default() }
}

#[test]
fn refuses_cell_below_minimum_safe_voltage() {
    let mut charger = li_ion();
    let mut leds = LedPanel::new();
    let mut app = battery(charger.min_safe_mv() - 1, 0);

    charger.regulate(&mut app, true, 7, &mut leds);
    assert_eq!(charger.state(), ChargeState::Idle);
    assert_eq!(app.duty_cycle, 0);
    assert!(leds.is_lit(Indicators::ERROR));
}

#[test]
fn accepts_cell_at_minimum_safe_voltage() {
    let mut charger = li_ion();
    let mut leds = LedPanel::new();
    let mut app = battery(3_000, 0);
    assert_eq!(charger.min_safe_mv(), 3_000);

    charger.regulate(&mut app, true, 7, &mut leds);
    assert_eq!(charger.state(), ChargeState::Charging);
}

#[test]
fn refusal_recovers_once_voltage_rises() {
    let mut charger = li_ion();
    let mut leds = LedPanel::new();
    let mut app = battery(2_500, 0);

    charger.regulate(&mut app, true, 7, &mut leds);
    assert_eq!(charger.state(), ChargeState::Idle);
    app.output_voltage_mv = 3_100;
    charger.regulate(&mut app, true, 14, &mut leds);
    assert_eq!(charger.state(), ChargeState::Charging);
}

#[test]
fn regulation_is_rate_limited() {
    let mut charger = li_ion();
    let mut leds = LedPanel::new();
    let mut app = battery(3_500, 0);

    for now in 0..PERIOD as u32 {
        charger.regulate(&mut app, true, now, &mut leds);
        assert_eq!(charger.state(), ChargeState::Idle);
    }
    charger.regulate(&mut app, true, 7, &mut leds);
    assert_eq!(charger.state(), ChargeState::Charging);
    let duty = app.duty_cycle;

    // Inside the next period nothing moves.
    for now in 8..14 {
        charger.regulate(&mut app, true, now, &mut leds);
        assert_eq!(app.duty_cycle, duty);
    }
}

#[test]
fn does_nothing_with_output_disabled() {
    let mut charger = li_ion();
    let mut leds = LedPanel::new();
    let mut app = battery(3_500, 0);

    charger.regulate(&mut app, false, 7, &mut leds);
    assert_eq!(charger.state(), ChargeState::Idle);
    assert_eq!(app.duty_cycle, 0);
}

#[test]
fn tapers_into_standby_at_termination_voltage() {
    let mut charger = li_ion();
    let mut leds = LedPanel::new();
    let mut app = battery(3_500, 480);

    charger.regulate(&mut app, true, 7, &mut leds);
    assert_eq!(charger.state(), ChargeState::Charging);

    // 26 mA is above 5 % of 500 mA: keep charging.
    app.output_voltage_mv = 4_120;
    app.output_current_ma = 26;
    charger.regulate(&mut app, true, 14, &mut leds);
    assert_eq!(charger.state(), ChargeState::Charging);

    app.output_current_ma = 25;
    charger.regulate(&mut app, true, 21, &mut leds);
    assert_eq!(charger.state(), ChargeState::Standby);

    // Standby keeps regulating through the CC/CV stack.
    app.output_voltage_mv = 4_000;
    app.duty_cycle = 5;
    charger.regulate(&mut app, true, 28, &mut leds);
    assert_eq!(charger.state(), ChargeState::Standby);
    assert_ne!(app.duty_cycle, 5);
}

#[test]
fn ceiling_targets_class_termination_voltage() {
    let charger = ChargeComposer::new(CurrentLevel::Ma1000, VoltageLevel::V12, PERIOD);
    assert_eq!(charger.regulator().ceiling().target(), 13_800);
    assert_eq!(charger.regulator().current().target(), 1_000);
    assert_eq!(charger.min_safe_mv(), 10_000);
}

#[test]
fn finish_latches_with_output_off() {
    let mut charger = li_ion();
    let mut leds = LedPanel::new();
    let mut app = battery(3_500, 300);
    let mut output = true;

    charger.regulate(&mut app, output, 7, &mut leds);
    app.duty_cycle = 20;
    charger.finish(&mut app, &mut output);
    assert_eq!(charger.state(), ChargeState::Finished);
    assert_eq!(app.duty_cycle, 0);
    assert!(!output);

    charger.regulate(&mut app, true, 14, &mut leds);
    assert_eq!(app.duty_cycle, 0);
    assert_eq!(charger.state(), ChargeState::Finished);
}
