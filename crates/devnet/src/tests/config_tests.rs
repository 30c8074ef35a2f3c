use super::{apply_env_overrides, apply_file_overrides, Settings};

use std::collections::HashMap;

#[test]
fn default_settings_produce_a_valid_genesis() {
    let genesis = Settings::default().genesis().expect("genesis");
    assert_eq!(genesis.campaign_fee.to_string(), "20000000000000000");
    assert!(!genesis.owner.same_account(&genesis.super_owner));
}

#[test]
fn file_values_override_defaults() {
    let mut settings = Settings::default();
    apply_file_overrides(
        &mut settings,
        r#"
bind_addr = "0.0.0.0:9000"
campaign_fee = "5"
"#,
    );
    assert_eq!(settings.bind_addr, "0.0.0.0:9000");
    assert_eq!(settings.campaign_fee, "5");
    assert_eq!(settings.owner, Settings::default().owner);
}

#[test]
fn malformed_file_is_ignored() {
    let mut settings = Settings::default();
    apply_file_overrides(&mut settings, "bind_addr = [");
    assert_eq!(settings, Settings::default());
}

#[test]
fn app_env_takes_precedence_over_legacy_name() {
    let env: HashMap<&str, &str> = HashMap::from([
        ("DEVNET_BIND", "127.0.0.1:1"),
        ("APP__BIND_ADDR", "127.0.0.1:2"),
        ("APP__CAMPAIGN_FEE", "42"),
    ]);
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings, |key| env.get(key).map(|v| v.to_string()));
    assert_eq!(settings.bind_addr, "127.0.0.1:2");
    assert_eq!(settings.campaign_fee, "42");
}

#[test]
fn invalid_genesis_values_are_reported() {
    let settings = Settings {
        owner: "not-an-address".into(),
        ..Settings::default()
    };
    let err = settings.genesis().expect_err("should fail");
    assert!(err.to_string().contains("owner"));

    let settings = Settings {
        campaign_fee: "1.5".into(),
        ..Settings::default()
    };
    assert!(settings.genesis().is_err());
}
