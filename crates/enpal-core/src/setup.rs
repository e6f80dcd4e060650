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

//! Integration setup: validate the entry, discover sensors, purge stale entities

use crate::connection::{ConnectionConfig, ConnectionParams};
use crate::errors::{FetchResult, SetupError};
use crate::sensor::EnpalSensor;
use crate::traits::{EntityRegistry, MetricSource, MetricSourceFactory};
use enpal_types::match_observations;
use tracing::{debug, error, info, warn};

/// Query the latest samples and build one sensor per catalog match
///
/// Every sensor gets its own source from `factory`, so no connection state is
/// shared between sensors.
pub async fn discover_sensors(
    source: &dyn MetricSource,
    params: &ConnectionParams,
    factory: &dyn MetricSourceFactory,
) -> FetchResult<Vec<EnpalSensor>> {
    let observations = source.latest_observations().await?;
    debug!(
        "🔍 [DISCOVERY] {} series reported by {}",
        observations.len(),
        source.name()
    );

    let sensors: Vec<EnpalSensor> = match_observations(&observations)
        .into_iter()
        .map(|(definition, measurement)| {
            EnpalSensor::new(definition, measurement, factory.connect(params))
        })
        .collect();

    info!(
        "✅ [DISCOVERY] {} sensors from {} observed series",
        sensors.len(),
        observations.len()
    );
    Ok(sensors)
}

/// Set up one integration instance
///
/// Fails without creating anything when a connection parameter is missing or
/// the discovery query fails. Entities previously registered for
/// `instance_id` are removed before the fresh set is returned.
pub async fn setup_entry(
    instance_id: &str,
    config: &ConnectionConfig,
    registry: &dyn EntityRegistry,
    factory: &dyn MetricSourceFactory,
) -> Result<Vec<EnpalSensor>, SetupError> {
    let params = config.require().inspect_err(|e| {
        error!("❌ [SETUP] {}", e);
    })?;
    info!("🔌 [SETUP] Connecting to {}", params.base_url());

    let discovery_source = factory.connect(&params);
    let sensors = discover_sensors(discovery_source.as_ref(), &params, factory)
        .await
        .inspect_err(|e| error!("❌ [SETUP] Discovery failed: {}", e))?;

    let stale = registry
        .entries_for_instance(instance_id)
        .await
        .map_err(SetupError::Registry)?;
    if !stale.is_empty() {
        info!(
            "🧹 [SETUP] Removing {} previously registered entities",
            stale.len()
        );
    }
    for entity_id in &stale {
        if let Err(e) = registry.remove(entity_id).await {
            warn!("⚠️ [SETUP] Failed to remove {}: {}", entity_id, e);
        }
    }

    Ok(sensors)
}
