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

use thiserror::Error;

/// Failure of a point-in-time query against the time-series service
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to time-series service failed: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("request to time-series service timed out")]
    Timeout,

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("query failed with status {status}: {message}")]
    Query { status: u16, message: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("non-numeric value '{value}' for field {field}")]
    InvalidValue { field: String, value: String },
}

pub type FetchResult<T> = Result<T, FetchError>;

/// Missing or invalid connection settings
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no {0} in config entry")]
    Missing(&'static str),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Reasons the integration could not be set up
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("discovery query failed: {0}")]
    Discovery(#[from] FetchError),

    #[error("entity registry error: {0}")]
    Registry(#[source] anyhow::Error),
}
