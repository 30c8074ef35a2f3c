use std::{collections::HashMap, fs};

use anyhow::Context;
use ledger_sim::LedgerGenesis;
use shared::{amount::Amount, domain::Address};

const SETTINGS_FILE: &str = "devnet.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub bind_addr: String,
    pub owner: String,
    pub super_owner: String,
    /// Campaign creation fee in wei.
    pub campaign_fee: String,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8545".into(),
            owner: "0x00000000000000000000000000000000000000a1".into(),
            super_owner: "0x00000000000000000000000000000000000000a2".into(),
            campaign_fee: "20000000000000000".into(),
            log_filter: "info".into(),
        }
    }
}

impl Settings {
    pub fn genesis(&self) -> anyhow::Result<LedgerGenesis> {
        let owner = Address::parse(&self.owner).context("invalid owner address")?;
        let super_owner =
            Address::parse(&self.super_owner).context("invalid super owner address")?;
        let campaign_fee: Amount = self
            .campaign_fee
            .parse()
            .with_context(|| format!("invalid campaign fee '{}'", self.campaign_fee))?;
        Ok(LedgerGenesis {
            owner,
            super_owner,
            campaign_fee,
        })
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
    if let Some(v) = file_cfg.get("bind_addr") {
        settings.bind_addr = v.clone();
    }
    if let Some(v) = file_cfg.get("owner") {
        settings.owner = v.clone();
    }
    if let Some(v) = file_cfg.get("super_owner") {
        settings.super_owner = v.clone();
    }
    if let Some(v) = file_cfg.get("campaign_fee") {
        settings.campaign_fee = v.clone();
    }
    if let Some(v) = file_cfg.get("log_filter") {
        settings.log_filter = v.clone();
    }
}

pub(crate) fn apply_env_overrides(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(v) = lookup("DEVNET_BIND") {
        settings.bind_addr = v;
    }
    if let Some(v) = lookup("APP__BIND_ADDR") {
        settings.bind_addr = v;
    }
    if let Some(v) = lookup("APP__OWNER") {
        settings.owner = v;
    }
    if let Some(v) = lookup("APP__SUPER_OWNER") {
        settings.super_owner = v;
    }
    if let Some(v) = lookup("APP__CAMPAIGN_FEE") {
        settings.campaign_fee = v;
    }
    if let Some(v) = lookup("RUST_LOG") {
        settings.log_filter = v;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
