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

//! Connection settings for the Enpal InfluxDB instance

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};

/// Organization the Enpal box registers its InfluxDB data under
pub const INFLUX_ORG: &str = "enpal";

/// Bucket holding the inverter samples
pub const INFLUX_BUCKET: &str = "solar";

/// Connection settings as supplied by the host
///
/// Every field is optional on the wire so a missing value can be reported
/// by name instead of failing deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default, rename = "enpal_host_ip", alias = "host")]
    pub host: Option<String>,

    #[serde(default, rename = "enpal_host_port", alias = "port")]
    pub port: Option<u16>,

    #[serde(default, rename = "enpal_token", alias = "token")]
    pub token: Option<String>,
}

impl ConnectionConfig {
    /// Merge option overrides on top of this config
    pub fn with_overrides(mut self, overrides: &ConnectionConfig) -> Self {
        if let Some(host) = &overrides.host {
            self.host = Some(host.clone());
        }
        if let Some(port) = overrides.port {
            self.port = Some(port);
        }
        if let Some(token) = &overrides.token {
            self.token = Some(token.clone());
        }
        self
    }

    /// Resolve into complete connection parameters
    pub fn require(&self) -> Result<ConnectionParams, ConfigError> {
        let host = self
            .host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(ConfigError::Missing("enpal_host_ip"))?;

        let port = self.port.ok_or(ConfigError::Missing("enpal_host_port"))?;
        if port == 0 {
            return Err(ConfigError::Invalid {
                field: "enpal_host_port",
                reason: "port must be between 1 and 65535".to_owned(),
            });
        }

        let token = self
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::Missing("enpal_token"))?;

        Ok(ConnectionParams {
            host: host.to_owned(),
            port,
            token: token.to_owned(),
        })
    }
}

/// Complete parameters for one InfluxDB connection
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub token: String,
}

impl ConnectionParams {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

// Keep the token out of logs
impl std::fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("token", &"***")
            .finish()
    }
}
