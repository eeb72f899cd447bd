use bimeter_config::{MissingDataMode, load_toml};
use rstest::rstest;

#[test]
fn empty_config_uses_defaults() {
    let cfg = load_toml("").expect("parse TOML");
    cfg.validate().expect("defaults should validate");
    assert_eq!(cfg.defaults.sequence_increment, 256);
    assert_eq!(cfg.defaults.direction_reverse_code, 1);
    assert!(cfg.defaults.missing_message_detection);
    assert!(!cfg.defaults.single_zero_suppression);
    assert_eq!(cfg.defaults.missing_data, MissingDataMode::KeepAll);
    assert!(cfg.devices.is_empty());
    assert!(cfg.datapoints.csv.is_none());
}

#[test]
fn full_config_parses() {
    let toml = r#"
[defaults]
sequence_increment = 1
direction_reverse_code = 0
single_zero_suppression = true
missing_message_detection = false
missing_data = "nullify-missing"

[defaults.channel_a]
delay_direction = true

[defaults.channel_b]
signed_power = true

[devices."0xa4c1380000000001"]
signed_power_a = true
delay_direction_b = true
missing_data = "keep-present"

[datapoints]
csv = "etc/datapoints.csv"

[logging]
file = "bimeter.log"
level = "debug"
rotation = "daily"
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.defaults.sequence_increment, 1);
    assert_eq!(cfg.defaults.missing_data, MissingDataMode::NullifyMissing);
    assert!(cfg.defaults.channel_a.delay_direction);
    assert!(!cfg.defaults.channel_a.signed_power);
    assert!(cfg.defaults.channel_b.signed_power);
    let dev = &cfg.devices["0xa4c1380000000001"];
    assert_eq!(dev.signed_power_a, Some(true));
    assert_eq!(dev.delay_direction_b, Some(true));
    assert_eq!(dev.missing_data, Some(MissingDataMode::KeepPresent));
    assert_eq!(dev.sequence_increment, None);
    assert_eq!(cfg.datapoints.csv.as_deref(), Some("etc/datapoints.csv"));
}

#[rstest]
#[case("[defaults]\nsequence_increment = 0\n", "sequence_increment must be in 1..=65535")]
#[case("[defaults]\nsequence_increment = 70000\n", "sequence_increment must be in 1..=65535")]
#[case("[defaults]\ndirection_reverse_code = 2\n", "direction_reverse_code must be 0 or 1")]
#[case("[devices.\"d1\"]\nsequence_increment = 0\n", "devices.\"d1\".sequence_increment")]
#[case("[devices.\"d1\"]\ndirection_reverse_code = -1\n", "devices.\"d1\".direction_reverse_code")]
#[case("[logging]\nrotation = \"weekly\"\n", "logging.rotation")]
#[case("[datapoints]\ncsv = \"  \"\n", "datapoints.csv")]
fn rejects_invalid_values(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(
        format!("{err}").contains(needle),
        "error {err} should mention {needle}"
    );
}

#[test]
fn unknown_missing_data_mode_fails_to_parse() {
    assert!(load_toml("[defaults]\nmissing_data = \"drop\"\n").is_err());
}

#[test]
fn unknown_device_override_key_fails_to_parse() {
    assert!(load_toml("[devices.\"d1\"]\nsigned_power_c = true\n").is_err());
}
