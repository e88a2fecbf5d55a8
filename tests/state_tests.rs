use rinnai_touch::{
    DeviceState, Error, FanLevel, MAX_TARGET_C, MIN_TARGET_C, Mode, RestoredState, TouchClient,
};

fn client() -> TouchClient {
    TouchClient::builder("127.0.0.1").build()
}

#[test]
fn mode_roundtrip() {
    for mode in Mode::ALL {
        assert_eq!(Mode::from_str(mode.as_str()), Some(mode));
    }
    assert_eq!(Mode::from_str("heat"), None);
}

#[test]
fn mode_serializes_snake_case() {
    assert_eq!(serde_json::to_string(&Mode::FanOnly).unwrap(), r#""fan_only""#);
    let parsed: Mode = serde_json::from_str(r#""cool""#).unwrap();
    assert_eq!(parsed, Mode::Cool);
}

#[test]
fn fan_level_bounds() {
    assert!(matches!(FanLevel::new(0), Err(Error::InvalidFanLevel(0))));
    assert!(matches!(FanLevel::new(17), Err(Error::InvalidFanLevel(17))));
    assert_eq!(FanLevel::new(1).unwrap(), FanLevel::MIN);
    assert_eq!(FanLevel::new(16).unwrap(), FanLevel::MAX);
}

#[test]
fn fan_level_wire_codes() {
    assert_eq!(FanLevel::MIN.wire_code(), "01");
    assert_eq!(FanLevel::MAX.wire_code(), "16");
    assert_eq!(FanLevel::from_wire_code("05"), FanLevel::new(5).ok());
    assert_eq!(FanLevel::from_wire_code("00"), None);
    assert_eq!(FanLevel::from_wire_code("banana"), None);
}

#[test]
fn fan_level_serde_rejects_out_of_range() {
    let parsed: FanLevel = serde_json::from_str("9").unwrap();
    assert_eq!(parsed.get(), 9);
    assert!(serde_json::from_str::<FanLevel>("42").is_err());
}

#[test]
fn restored_state_tolerates_missing_last_on_mode() {
    let parsed: RestoredState =
        serde_json::from_str(r#"{"mode":"cool","fan_level":9}"#).unwrap();
    assert_eq!(parsed.mode, Mode::Cool);
    assert_eq!(parsed.fan_level.get(), 9);
    assert_eq!(parsed.last_on_mode, None);
}

#[test]
fn startup_defaults() {
    let state = DeviceState::default();
    assert_eq!(state.mode, Mode::Off);
    assert_eq!(state.fan_level, FanLevel::MIN);
    assert_eq!(state.target_temperature, MIN_TARGET_C);
    assert_eq!(state.last_on_mode, None);
    assert_eq!(state.current_temperature, None);
}

#[test]
fn target_temperature_accepts_and_rounds_in_range_values() {
    let mut c = client();
    for t in [18.0, 22.0, 28.0] {
        c.set_target_temperature(t);
        assert_eq!(c.state().target_temperature, t);
    }
    c.set_target_temperature(22.4);
    assert_eq!(c.state().target_temperature, 22.0);
    c.set_target_temperature(22.6);
    assert_eq!(c.state().target_temperature, 23.0);
}

#[test]
fn target_temperature_rejects_out_of_range_silently() {
    let mut c = client();
    c.set_target_temperature(24.0);

    c.set_target_temperature(MIN_TARGET_C - 0.1);
    assert_eq!(c.state().target_temperature, 24.0);
    c.set_target_temperature(MAX_TARGET_C + 0.1);
    assert_eq!(c.state().target_temperature, 24.0);
    c.set_target_temperature(f64::NAN);
    assert_eq!(c.state().target_temperature, 24.0);
}

#[test]
fn sensor_bridge_stores_numeric_readings_only() {
    let mut c = client();
    c.sensor_reading("21.5");
    assert_eq!(c.state().current_temperature, Some(21.5));

    c.sensor_reading("unknown");
    assert_eq!(c.state().current_temperature, Some(21.5));

    c.sensor_reading("not a number");
    assert_eq!(c.state().current_temperature, Some(21.5));

    c.sensor_reading(" 19.0 ");
    assert_eq!(c.state().current_temperature, Some(19.0));
}

#[test]
fn restore_seeds_mirror() {
    let mut c = client();
    c.restore(RestoredState {
        mode: Mode::FanOnly,
        fan_level: FanLevel::new(11).unwrap(),
        last_on_mode: Some(Mode::Cool),
    });
    assert_eq!(c.state().mode, Mode::FanOnly);
    assert_eq!(c.state().fan_level.get(), 11);
    assert_eq!(c.state().last_on_mode, Some(Mode::Cool));
}

#[test]
fn restore_backfills_last_on_mode_from_an_on_mode() {
    let mut c = client();
    c.restore(RestoredState {
        mode: Mode::Auto,
        fan_level: FanLevel::MIN,
        last_on_mode: None,
    });
    assert_eq!(c.state().last_on_mode, Some(Mode::Auto));

    let mut c = client();
    c.restore(RestoredState {
        mode: Mode::Off,
        fan_level: FanLevel::MIN,
        last_on_mode: None,
    });
    assert_eq!(c.state().last_on_mode, None);
}
