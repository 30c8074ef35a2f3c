use std::{collections::HashMap, fs};

use anyhow::Context;
use shared::domain::Address;

const SETTINGS_FILE: &str = "dashboard.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub ledger_url: String,
    /// Account the local wallet signs as; unset means no wallet connection.
    pub account: Option<String>,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ledger_url: "http://127.0.0.1:8545".into(),
            account: None,
            log_filter: "info".into(),
        }
    }
}

impl Settings {
    pub fn account_address(&self) -> anyhow::Result<Option<Address>> {
        self.account
            .as_deref()
            .map(|raw| Address::parse(raw).with_context(|| format!("invalid account '{raw}'")))
            .transpose()
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();
    if let Ok(raw) = fs::read_to_string(SETTINGS_FILE) {
        apply_file_overrides(&mut settings, &raw);
    }
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings
}

pub(crate) fn apply_file_overrides(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) else {
        return;
    };
    if let Some(v) = file_cfg.get("ledger_url") {
        settings.ledger_url = v.clone();
    }
    if let Some(v) = file_cfg.get("account") {
        settings.account = Some(v.clone());
    }
    if let Some(v) = file_cfg.get("log_filter") {
        settings.log_filter = v.clone();
    }
}

pub(crate) fn apply_env_overrides(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(v) = lookup("APP__LEDGER_URL") {
        settings.ledger_url = v;
    }
    if let Some(v) = lookup("APP__ACCOUNT") {
        settings.account = Some(v).filter(|account| !account.trim().is_empty());
    }
    if let Some(v) = lookup("RUST_LOG") {
        settings.log_filter = v;
    }
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
