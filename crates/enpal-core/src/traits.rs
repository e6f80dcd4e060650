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

use crate::connection::ConnectionParams;
use crate::errors::FetchResult;
use crate::sensor::RefreshOutcome;
use anyhow::Result;
use async_trait::async_trait;
use enpal_types::{DeviceClass, Observation, StateClass};
use serde_json::{Map, Value};
use std::sync::Arc;

// ============= Time-series Source =============

/// Read access to the latest samples in the solar bucket
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// One (field, measurement) pair per series that has a sample in the
    /// last 5 minutes
    async fn latest_observations(&self) -> FetchResult<Vec<Observation>>;

    /// Most recent value of one series in the last 5 minutes, `None` if the
    /// series has no sample in that window
    async fn latest_value(&self, measurement: &str, field: &str) -> FetchResult<Option<f64>>;

    /// Get source name for logging
    fn name(&self) -> &str;
}

/// Builds a dedicated source per sensor from its own connection parameters
pub trait MetricSourceFactory: Send + Sync {
    fn connect(&self, params: &ConnectionParams) -> Arc<dyn MetricSource>;
}

// ============= Host Collaborators =============

/// What the host needs from a polled sensor entity
#[async_trait]
pub trait SensorEntity: Send + Sync {
    fn unique_id(&self) -> &str;

    fn name(&self) -> &str;

    /// `None` while the sensor is unavailable
    fn native_value(&self) -> Option<f64>;

    fn native_unit_of_measurement(&self) -> Option<&str>;

    fn device_class(&self) -> Option<DeviceClass>;

    fn state_class(&self) -> Option<StateClass>;

    fn icon(&self) -> &str;

    fn extra_state_attributes(&self) -> Map<String, Value>;

    /// Refresh the state; never fails, errors are folded into the outcome
    async fn update(&mut self) -> RefreshOutcome;
}

/// Receives sensor state after every refresh
#[async_trait]
pub trait EntitySink: Send + Sync {
    async fn publish(&self, entity: &dyn SensorEntity) -> Result<()>;
}

/// The host's record of entities created by an integration instance
#[async_trait]
pub trait EntityRegistry: Send + Sync {
    /// Entity ids currently registered for `instance_id`
    async fn entries_for_instance(&self, instance_id: &str) -> Result<Vec<String>>;

    async fn remove(&self, entity_id: &str) -> Result<()>;
}
