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

//! Integration tests for the discovery -> refresh -> publish flow

use anyhow::Result;
use async_trait::async_trait;
use enpal_core::{
    ConnectionConfig, ConnectionParams, EntityRegistry, EntitySink, FetchError, FetchResult,
    MetricSource, MetricSourceFactory, Observation, RefreshOutcome, SensorEntity, SensorPool,
    StateClass, refresh_and_publish, setup_entry,
};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Bucket contents keyed by (measurement, field)
#[derive(Clone, Default)]
struct FakeBucket {
    samples: HashMap<(String, String), f64>,
    /// Shared by every clone, so a running sensor can be made to fail
    timeout: Arc<AtomicBool>,
}

impl FakeBucket {
    fn with(mut self, measurement: &str, field: &str, value: f64) -> Self {
        self.samples
            .insert((measurement.to_string(), field.to_string()), value);
        self
    }
}

#[async_trait]
impl MetricSource for FakeBucket {
    async fn latest_observations(&self) -> FetchResult<Vec<Observation>> {
        let mut observations: Vec<Observation> = self
            .samples
            .keys()
            .map(|(measurement, field)| Observation::new(field.as_str(), measurement.as_str()))
            .collect();
        observations.sort_by(|a, b| a.field.cmp(&b.field));
        Ok(observations)
    }

    async fn latest_value(&self, measurement: &str, field: &str) -> FetchResult<Option<f64>> {
        if self.timeout.load(Ordering::SeqCst) {
            return Err(FetchError::Timeout);
        }
        Ok(self
            .samples
            .get(&(measurement.to_string(), field.to_string()))
            .copied())
    }

    fn name(&self) -> &str {
        "fake-bucket"
    }
}

struct FakeFactory(FakeBucket);

impl MetricSourceFactory for FakeFactory {
    fn connect(&self, _params: &ConnectionParams) -> Arc<dyn MetricSource> {
        Arc::new(self.0.clone())
    }
}

struct EmptyRegistry;

#[async_trait]
impl EntityRegistry for EmptyRegistry {
    async fn entries_for_instance(&self, _instance_id: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn remove(&self, _entity_id: &str) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Published {
    unique_id: String,
    value: Option<f64>,
    unit: Option<String>,
    state_class: Option<StateClass>,
    attributes: Map<String, Value>,
}

#[derive(Default)]
struct RecordingSink {
    published: Mutex<Vec<Published>>,
}

#[async_trait]
impl EntitySink for RecordingSink {
    async fn publish(&self, entity: &dyn SensorEntity) -> Result<()> {
        self.published.lock().push(Published {
            unique_id: entity.unique_id().to_string(),
            value: entity.native_value(),
            unit: entity.native_unit_of_measurement().map(str::to_string),
            state_class: entity.state_class(),
            attributes: entity.extra_state_attributes(),
        });
        Ok(())
    }
}

fn config() -> ConnectionConfig {
    ConnectionConfig {
        host: Some("127.0.0.1".to_string()),
        port: Some(8086),
        token: Some("token".to_string()),
    }
}

#[tokio::test]
async fn test_grid_export_produces_base_and_split_sensors() {
    let bucket = FakeBucket::default().with("solar", "Power.Grid.Export", -150.7);
    let factory = FakeFactory(bucket);
    let sink = RecordingSink::default();

    let sensors = setup_entry("enpal", &config(), &EmptyRegistry, &factory)
        .await
        .unwrap();
    assert_eq!(sensors.len(), 3);

    for mut sensor in sensors {
        let outcome = refresh_and_publish(&mut sensor, &sink).await;
        assert!(matches!(outcome, RefreshOutcome::Updated(_)));
    }

    let published = sink.published.lock().clone();
    let by_id: HashMap<&str, &Published> = published
        .iter()
        .map(|p| (p.unique_id.as_str(), p))
        .collect();

    let base = by_id["enpal_solar_Power.Grid.Export"];
    assert_eq!(base.value, Some(-150.7));
    assert_eq!(base.unit.as_deref(), Some("W"));
    assert_eq!(base.state_class, Some(StateClass::Measurement));

    assert_eq!(by_id["enpal_solar_Power.Grid.Export_pure_out"].value, Some(0.0));
    assert_eq!(by_id["enpal_solar_Power.Grid.Export_pure_in"].value, Some(150.7));
}

fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, minute, 0).unwrap()
}

#[tokio::test]
async fn test_fetch_timeout_publishes_unavailable() {
    let bucket = FakeBucket::default().with("solar", "Power.DC.Total", 800.0);
    let timeout = Arc::clone(&bucket.timeout);
    let sink = RecordingSink::default();

    let mut sensors = setup_entry("enpal", &config(), &EmptyRegistry, &FakeFactory(bucket))
        .await
        .unwrap();
    let sensor = &mut sensors[0];

    let outcome = sensor.refresh_at(at(0)).await;
    assert!(matches!(outcome, RefreshOutcome::Updated(v) if v == 800.0));
    sink.publish(&*sensor).await.unwrap();

    // Same sensor, next cycle: the bucket stops answering
    timeout.store(true, Ordering::SeqCst);
    let outcome = sensor.refresh_at(at(1)).await;
    assert!(outcome.is_failure());
    sink.publish(&*sensor).await.unwrap();

    let published = sink.published.lock().clone();
    assert_eq!(published.len(), 2);
    assert_eq!(published[0].value, Some(800.0));
    assert_eq!(published[0].attributes["last_check"], at(0).to_rfc3339());
    assert_eq!(published[1].value, None);
    assert_eq!(published[1].attributes["last_check"], at(1).to_rfc3339());
    assert!(sensor.last_error().is_some());

    // And recovers on the one after
    timeout.store(false, Ordering::SeqCst);
    sensor.refresh_at(at(2)).await;
    assert_eq!(sensor.native_value(), Some(800.0));
    assert!(sensor.last_error().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_pool_refreshes_on_interval() {
    let bucket = FakeBucket::default().with("solar", "Energy.Production.Total.Day", 7.5);
    let sink = Arc::new(RecordingSink::default());

    let sensors = setup_entry("enpal", &config(), &EmptyRegistry, &FakeFactory(bucket))
        .await
        .unwrap();
    let boxed: Vec<Box<dyn SensorEntity>> = sensors
        .into_iter()
        .map(|s| Box::new(s) as Box<dyn SensorEntity>)
        .collect();

    let pool = SensorPool::start(boxed, sink.clone(), Duration::from_secs(20));
    assert_eq!(pool.len(), 1);

    // Ticks at 0s, 20s and 40s
    tokio::time::sleep(Duration::from_secs(45)).await;
    pool.shutdown().await;

    let published = sink.published.lock().clone();
    assert_eq!(published.len(), 3);
    assert!(published.iter().all(|p| p.value == Some(7.5)));
    assert!(published[0].attributes.contains_key("last_reset"));
}
