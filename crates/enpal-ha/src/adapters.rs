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
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::client::HomeAssistantClient;
use crate::errors::HaError;
use crate::types::HaStateUpdate;
use enpal_core::{EntityRegistry, EntitySink, SensorEntity};

/// State attribute tying an entity to the integration instance that created it
pub const INSTANCE_ATTRIBUTE: &str = "integration_instance";

/// HA entity id for a sensor unique id
///
/// Lowercases and replaces every run of non-alphanumeric characters with a
/// single `_`, the way HA slugifies object ids.
/// `enpal_solar_Power.Grid.Export_pure_in` -> `sensor.enpal_solar_power_grid_export_pure_in`
pub fn entity_id_for(unique_id: &str) -> String {
    let mut slug = String::with_capacity(unique_id.len());
    for c in unique_id.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let slug = slug.trim_end_matches('_');
    format!("sensor.{slug}")
}

/// Publishes sensor state through `POST /api/states/<entity_id>`
#[derive(Debug, Clone)]
pub struct HaEntitySink {
    client: Arc<HomeAssistantClient>,
    instance_id: String,
}

impl HaEntitySink {
    pub fn new(client: Arc<HomeAssistantClient>, instance_id: impl Into<String>) -> Self {
        Self {
            client,
            instance_id: instance_id.into(),
        }
    }

    /// State body for one sensor
    pub fn state_update(&self, entity: &dyn SensorEntity) -> HaStateUpdate {
        let state = entity
            .native_value()
            .map_or_else(|| "unavailable".to_owned(), |v| v.to_string());

        let mut attributes = serde_json::Map::new();
        attributes.insert("friendly_name".to_owned(), json!(entity.name()));
        attributes.insert("icon".to_owned(), json!(entity.icon()));
        attributes.insert("unique_id".to_owned(), json!(entity.unique_id()));
        attributes.insert(INSTANCE_ATTRIBUTE.to_owned(), json!(self.instance_id));
        if let Some(unit) = entity.native_unit_of_measurement() {
            attributes.insert("unit_of_measurement".to_owned(), json!(unit));
        }
        if let Some(device_class) = entity.device_class() {
            attributes.insert("device_class".to_owned(), json!(device_class.as_str()));
        }
        if let Some(state_class) = entity.state_class() {
            attributes.insert("state_class".to_owned(), json!(state_class.as_str()));
        }
        attributes.extend(entity.extra_state_attributes());

        HaStateUpdate { state, attributes }
    }
}

#[async_trait]
impl EntitySink for HaEntitySink {
    async fn publish(&self, entity: &dyn SensorEntity) -> Result<()> {
        let entity_id = entity_id_for(entity.unique_id());
        let update = self.state_update(entity);
        trace!("[HA SINK] {} attributes: {:?}", entity_id, update.attributes);

        self.client
            .set_state(&entity_id, &update)
            .await
            .with_context(|| format!("Failed to publish {}", entity_id))
    }
}

/// Entities this integration created, found through their instance attribute
#[derive(Debug, Clone)]
pub struct HaEntityRegistry {
    client: Arc<HomeAssistantClient>,
}

impl HaEntityRegistry {
    pub fn new(client: Arc<HomeAssistantClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EntityRegistry for HaEntityRegistry {
    async fn entries_for_instance(&self, instance_id: &str) -> Result<Vec<String>> {
        let states = self
            .client
            .get_all_states()
            .await
            .context("Failed to list entity states")?;

        let entries: Vec<String> = states
            .into_iter()
            .filter(|s| {
                s.attributes.get(INSTANCE_ATTRIBUTE).and_then(Value::as_str) == Some(instance_id)
            })
            .map(|s| s.entity_id)
            .collect();

        debug!(
            "📋 [HA REGISTRY] {} entities registered for '{}'",
            entries.len(),
            instance_id
        );
        Ok(entries)
    }

    async fn remove(&self, entity_id: &str) -> Result<()> {
        match self.client.delete_state(entity_id).await {
            Ok(()) | Err(HaError::EntityNotFound(_)) => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", entity_id)),
        }
    }
}
