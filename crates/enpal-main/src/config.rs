// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of Enpal Bridge.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use anyhow::{Context, Result};
use enpal_core::{ConnectionConfig, DEFAULT_SCAN_INTERVAL};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

const ADDON_OPTIONS_PATH: &str = "/data/options.json";

/// Runtime configuration of the bridge
///
/// The Enpal connection fields stay optional here; a missing one is reported
/// when the integration is set up, not when the file is parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(flatten)]
    pub connection: ConnectionConfig,

    /// Entities published by this process carry this id, so a restart can
    /// find and purge them
    #[serde(default = "default_instance_id")]
    pub instance_id: String,

    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ha_base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ha_token: Option<String>,
}

fn default_instance_id() -> String {
    "enpal".to_owned()
}

fn default_scan_interval_secs() -> u64 {
    DEFAULT_SCAN_INTERVAL.as_secs()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            instance_id: default_instance_id(),
            scan_interval_secs: default_scan_interval_secs(),
            ha_base_url: None,
            ha_token: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from HA addon options or config file, then apply
    /// environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_first_of(
            Path::new(ADDON_OPTIONS_PATH),
            Path::new("config.toml"),
            Path::new("config.json"),
        )?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// First existing file wins; defaults when none exists
    fn load_first_of(options: &Path, toml_path: &Path, json_path: &Path) -> Result<Self> {
        // Try HA addon options first
        if let Ok(options_str) = std::fs::read_to_string(options) {
            let config: AppConfig =
                serde_json::from_str(&options_str).context("Failed to parse HA addon options")?;
            info!("✅ Loaded configuration from HA addon options");
            return Ok(config);
        }

        // Try config.toml for development
        if let Ok(config_str) = std::fs::read_to_string(toml_path) {
            let config: AppConfig =
                toml::from_str(&config_str).context("Failed to parse config.toml")?;
            info!("✅ Loaded configuration from config.toml");
            return Ok(config);
        }

        // Try config.json for development
        if let Ok(config_str) = std::fs::read_to_string(json_path) {
            let config: AppConfig =
                serde_json::from_str(&config_str).context("Failed to parse config.json")?;
            info!("✅ Loaded configuration from config.json");
            return Ok(config);
        }

        warn!("No configuration file found, using defaults with environment overrides");
        Ok(Self::default())
    }

    /// Override values from the environment (or any other key lookup)
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let mut overrides = ConnectionConfig::default();
        if let Some(host) = lookup("ENPAL_HOST_IP") {
            overrides.host = Some(host);
        }
        if let Some(port) = lookup("ENPAL_HOST_PORT") {
            match port.parse::<u16>() {
                Ok(port) => overrides.port = Some(port),
                Err(_) => warn!("⚠️ Ignoring ENPAL_HOST_PORT='{}': not a port number", port),
            }
        }
        if let Some(token) = lookup("ENPAL_TOKEN") {
            overrides.token = Some(token);
        }
        self.connection = std::mem::take(&mut self.connection).with_overrides(&overrides);

        if let Some(interval) = lookup("SCAN_INTERVAL_SECS")
            && let Ok(secs) = interval.parse::<u64>()
        {
            self.scan_interval_secs = secs;
        }

        // Override HA connection
        if let Some(url) = lookup("HA_BASE_URL") {
            self.ha_base_url = Some(url);
        }
        if let Some(token) = lookup("HA_TOKEN") {
            self.ha_token = Some(token);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.instance_id.trim().is_empty() {
            anyhow::bail!("instance_id cannot be empty");
        }
        if self.scan_interval_secs == 0 {
            anyhow::bail!("scan_interval_secs must be at least 1");
        }
        Ok(())
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }
}
