use sepic_psu_rs::config::{MAX_DUTY_CYCLE, ProtectionLimits};
use sepic_psu_rs::data_types::ApplicationState;
use sepic_psu_rs::protection::{Trip, check};

fn nominal() -> ApplicationState {
    ApplicationState {
        duty_cycle: 40,
        input_voltage_mv: 12_000,
        output_voltage_mv: 5_000,
        input_current_ma: 500,
        output_current_ma: 800,
    }
}

#[test]
fn nominal_readings_pass() {
    assert_eq!(check(&nominal(), &ProtectionLimits::default()), None);
}

#[test]
fn current_limits_are_exclusive() {
    let limits = ProtectionLimits::default();

    let mut app = nominal();
    app.output_current_ma = limits.max_output_current_ma;
    assert_eq!(check(&app, &limits), None);
    app.output_current_ma += 1;
    assert_eq!(check(&app, &limits), Some(Trip::OutputOverCurrent));

    let mut app = nominal();
    app.input_current_ma = limits.max_input_current_ma + 1;
    assert_eq!(check(&app, &limits), Some(Trip::InputOverCurrent));
}

#[test]
fn output_over_voltage() {
    let limits = ProtectionLimits::default();
    let mut app = nominal();
    app.input_voltage_mv = 5_000;
    app.output_voltage_mv = 16_901;
    assert_eq!(check(&app, &limits), Some(Trip::OutputOverVoltage));
}

#[test]
fn saturated_duty_with_collapsed_output() {
    let limits = ProtectionLimits::default();
    let mut app = nominal();
    app.output_voltage_mv = 999;
    assert_eq!(check(&app, &limits), None);
    app.duty_cycle = MAX_DUTY_CYCLE;
    assert_eq!(check(&app, &limits), Some(Trip::OpenSwitchPath));
    app.output_voltage_mv = 1_000;
    assert_eq!(check(&app, &limits), None);
}

#[test]
fn diode_budget_is_inclusive() {
    let limits = ProtectionLimits::default();
    assert_eq!(limits.max_input_plus_output_mv(), 27_200);

    let mut app = nominal();
    app.input_voltage_mv = 15_000;
    app.output_voltage_mv = 12_199;
    assert_eq!(check(&app, &limits), None);
    app.output_voltage_mv = 12_200;
    assert_eq!(check(&app, &limits), Some(Trip::DiodeReverseVoltage));
}
