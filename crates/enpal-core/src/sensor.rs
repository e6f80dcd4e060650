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

//! A single Enpal metric exposed as a polled sensor

use crate::errors::FetchError;
use crate::traits::{MetricSource, SensorEntity};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use enpal_types::{
    DeviceClass, MetricDefinition, StateClass, battery_level_icon, last_reset_for, normalize,
    state_class_for_unit, unique_id,
};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, trace};

/// Field whose icon follows the battery level
const STORAGE_LEVEL_FIELD: &str = "Percent.Storage.Level";

/// Result of one refresh cycle
#[derive(Debug)]
pub enum RefreshOutcome {
    /// A sample was found and published
    Updated(f64),
    /// The query succeeded but the window was empty; published as 0
    NoData,
    /// The query failed; the sensor is unavailable until the next cycle
    Failed(FetchError),
}

impl RefreshOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Free-form attributes published next to the state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorAttributes {
    pub last_check: Option<DateTime<Utc>>,
    pub field: Option<String>,
    pub measurement: Option<String>,
    pub last_reset: Option<DateTime<Utc>>,
}

impl SensorAttributes {
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        if let Some(last_check) = self.last_check {
            map.insert("last_check".to_owned(), Value::String(last_check.to_rfc3339()));
        }
        if let Some(field) = &self.field {
            map.insert("field".to_owned(), Value::String(field.clone()));
        }
        if let Some(measurement) = &self.measurement {
            map.insert("measurement".to_owned(), Value::String(measurement.clone()));
        }
        if let Some(last_reset) = self.last_reset {
            map.insert("last_reset".to_owned(), Value::String(last_reset.to_rfc3339()));
        }
        map
    }
}

/// Sensor bound to one catalog entry and one measurement
///
/// Presentation state starts empty and is filled in by the first successful
/// refresh. Split variants query the base field and only differ in their
/// unique id, name and sign clamp.
pub struct EnpalSensor {
    definition: &'static MetricDefinition,
    measurement: String,
    unique_id: String,
    source: Arc<dyn MetricSource>,
    native_value: Option<f64>,
    unit: Option<&'static str>,
    device_class: Option<DeviceClass>,
    state_class: Option<StateClass>,
    icon: &'static str,
    attributes: SensorAttributes,
    last_error: Option<String>,
}

impl EnpalSensor {
    pub fn new(
        definition: &'static MetricDefinition,
        measurement: impl Into<String>,
        source: Arc<dyn MetricSource>,
    ) -> Self {
        let measurement = measurement.into();
        Self {
            definition,
            unique_id: unique_id(&measurement, definition),
            measurement,
            source,
            native_value: None,
            unit: None,
            device_class: None,
            state_class: None,
            icon: definition.icon,
            attributes: SensorAttributes::default(),
            last_error: None,
        }
    }

    pub fn definition(&self) -> &'static MetricDefinition {
        self.definition
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn attributes(&self) -> &SensorAttributes {
        &self.attributes
    }

    /// Error recorded by the last refresh, cleared on success
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Run one refresh cycle as of `now`
    pub async fn refresh_at(&mut self, now: DateTime<Utc>) -> RefreshOutcome {
        let field = self.definition.field;
        trace!("[SENSOR] Refreshing {}", self.unique_id);

        match self.source.latest_value(&self.measurement, field).await {
            Ok(reading) => {
                let raw = reading.unwrap_or_else(|| {
                    debug!(
                        "⚠️ [SENSOR] No data for {}/{} in the last 5 minutes, reporting 0",
                        self.measurement, field
                    );
                    0.0
                });
                self.apply_reading(raw, now);
                self.last_error = None;
                match reading {
                    Some(_) => RefreshOutcome::Updated(self.native_value.unwrap_or_default()),
                    None => RefreshOutcome::NoData,
                }
            }
            Err(e) => {
                error!("❌ [SENSOR] {} refresh failed: {}", self.unique_id, e);
                self.native_value = None;
                self.attributes.last_check = Some(now);
                self.last_error = Some(e.to_string());
                RefreshOutcome::Failed(e)
            }
        }
    }

    fn apply_reading(&mut self, raw: f64, now: DateTime<Utc>) {
        let definition = self.definition;
        let value = normalize(raw, definition.clamp);
        if definition.is_split_variant() {
            debug!(
                "[SENSOR] {}: {} -> {} ({:?})",
                self.unique_id, raw, value, definition.clamp
            );
        }

        self.native_value = Some(value);
        self.unit = Some(definition.unit);
        self.device_class = Some(definition.device_class);
        self.state_class = Some(state_class_for_unit(definition.unit));

        self.attributes.last_check = Some(now);
        self.attributes.field = Some(definition.field.to_owned());
        self.attributes.measurement = Some(self.measurement.clone());
        if let Some(last_reset) = last_reset_for(definition.unit, now) {
            self.attributes.last_reset = Some(last_reset);
        }

        if definition.field == STORAGE_LEVEL_FIELD
            && let Some(icon) = battery_level_icon(value)
        {
            self.icon = icon;
        }
    }
}

impl fmt::Debug for EnpalSensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnpalSensor")
            .field("unique_id", &self.unique_id)
            .field("source", &self.source.name())
            .field("native_value", &self.native_value)
            .field("icon", &self.icon)
            .field("attributes", &self.attributes)
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SensorEntity for EnpalSensor {
    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    fn name(&self) -> &str {
        self.definition.name
    }

    fn native_value(&self) -> Option<f64> {
        self.native_value
    }

    fn native_unit_of_measurement(&self) -> Option<&str> {
        self.unit
    }

    fn device_class(&self) -> Option<DeviceClass> {
        self.device_class
    }

    fn state_class(&self) -> Option<StateClass> {
        self.state_class
    }

    fn icon(&self) -> &str {
        self.icon
    }

    fn extra_state_attributes(&self) -> Map<String, Value> {
        self.attributes.to_map()
    }

    async fn update(&mut self) -> RefreshOutcome {
        self.refresh_at(Utc::now()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FetchResult;
    use chrono::TimeZone;
    use enpal_types::{CATALOG, Observation};

    /// Source returning a fixed reading for every series
    struct FixedSource(Option<f64>);

    #[async_trait]
    impl MetricSource for FixedSource {
        async fn latest_observations(&self) -> FetchResult<Vec<Observation>> {
            Ok(Vec::new())
        }

        async fn latest_value(&self, _measurement: &str, _field: &str) -> FetchResult<Option<f64>> {
            Ok(self.0)
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct FailingSource;

    #[async_trait]
    impl MetricSource for FailingSource {
        async fn latest_observations(&self) -> FetchResult<Vec<Observation>> {
            Err(FetchError::Timeout)
        }

        async fn latest_value(&self, _measurement: &str, _field: &str) -> FetchResult<Option<f64>> {
            Err(FetchError::Timeout)
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn definition(field: &str, suffix: &str) -> &'static MetricDefinition {
        CATALOG
            .iter()
            .find(|d| d.field == field && d.key_suffix == suffix)
            .unwrap()
    }

    fn sensor(field: &str, suffix: &str, reading: Option<f64>) -> EnpalSensor {
        EnpalSensor::new(
            definition(field, suffix),
            "solar",
            Arc::new(FixedSource(reading)),
        )
    }

    fn afternoon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 21, 14, 30, 0).unwrap()
    }

    #[test]
    fn test_new_sensor_is_empty() {
        let sensor = sensor("Power.DC.Total", "", Some(1.0));
        assert_eq!(sensor.unique_id(), "enpal_solar_Power.DC.Total");
        assert_eq!(sensor.name(), "Enpal Solar Production Power");
        assert_eq!(sensor.native_value(), None);
        assert_eq!(sensor.native_unit_of_measurement(), None);
        assert_eq!(sensor.icon(), "mdi:solar-power");
        assert!(sensor.extra_state_attributes().is_empty());
    }

    #[tokio::test]
    async fn test_power_refresh() {
        let mut sensor = sensor("Power.DC.Total", "", Some(4321.456));
        let outcome = sensor.refresh_at(afternoon()).await;

        assert!(matches!(outcome, RefreshOutcome::Updated(v) if v == 4321.46));
        assert_eq!(sensor.native_value(), Some(4321.46));
        assert_eq!(sensor.native_unit_of_measurement(), Some("W"));
        assert_eq!(sensor.device_class(), Some(DeviceClass::Power));
        assert_eq!(sensor.state_class(), Some(StateClass::Measurement));

        let attrs = sensor.extra_state_attributes();
        assert_eq!(attrs["field"], "Power.DC.Total");
        assert_eq!(attrs["measurement"], "solar");
        assert_eq!(attrs["last_check"], afternoon().to_rfc3339());
        assert!(!attrs.contains_key("last_reset"));
    }

    #[tokio::test]
    async fn test_energy_refresh_sets_last_reset() {
        let mut sensor = sensor("Energy.Production.Total.Day", "", Some(12.3456));
        sensor.refresh_at(afternoon()).await;

        assert_eq!(sensor.native_value(), Some(12.35));
        assert_eq!(sensor.state_class(), Some(StateClass::TotalIncreasing));
        assert_eq!(
            sensor.attributes().last_reset,
            Some(Utc.with_ymd_and_hms(2025, 3, 21, 0, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_wallbox_wh_counter_is_total_increasing() {
        let mut sensor = sensor("Energy.Wallbox.Connector.1.Charged.Total", "", Some(5000.0));
        sensor.refresh_at(afternoon()).await;

        assert_eq!(sensor.state_class(), Some(StateClass::TotalIncreasing));
        assert!(sensor.extra_state_attributes().contains_key("last_reset"));
    }

    #[tokio::test]
    async fn test_no_data_reports_zero() {
        let mut sensor = sensor("Power.House.Total", "", None);
        let outcome = sensor.refresh_at(afternoon()).await;

        assert!(matches!(outcome, RefreshOutcome::NoData));
        assert_eq!(sensor.native_value(), Some(0.0));
        assert_eq!(sensor.last_error(), None);
    }

    #[tokio::test]
    async fn test_split_variants_query_base_field() {
        let mut pure_in = sensor("Power.Grid.Export", "_pure_in", Some(-150.7));
        let mut pure_out = sensor("Power.Grid.Export", "_pure_out", Some(-150.7));
        pure_in.refresh_at(afternoon()).await;
        pure_out.refresh_at(afternoon()).await;

        assert_eq!(pure_in.native_value(), Some(150.7));
        assert_eq!(pure_out.native_value(), Some(0.0));
        assert_eq!(pure_in.unique_id(), "enpal_solar_Power.Grid.Export_pure_in");
        assert_eq!(pure_in.extra_state_attributes()["field"], "Power.Grid.Export");
    }

    #[tokio::test]
    async fn test_storage_level_icon_follows_value() {
        for (level, icon) in [
            (0.0, "mdi:battery-outline"),
            (55.0, "mdi:battery-50"),
            (100.0, "mdi:battery"),
        ] {
            let mut sensor = sensor("Percent.Storage.Level", "", Some(level));
            sensor.refresh_at(afternoon()).await;
            assert_eq!(sensor.icon(), icon, "level {level}");
        }
    }

    #[tokio::test]
    async fn test_out_of_range_storage_level_keeps_icon() {
        let mut sensor = sensor("Percent.Storage.Level", "", Some(104.0));
        sensor.refresh_at(afternoon()).await;
        assert_eq!(sensor.icon(), "mdi:battery");
        assert_eq!(sensor.native_value(), Some(104.0));
    }

    #[tokio::test]
    async fn test_other_battery_fields_keep_static_icon() {
        let mut sensor = sensor("Energy.Battery.Charge.Level", "", Some(55.0));
        sensor.refresh_at(afternoon()).await;
        assert_eq!(sensor.icon(), "mdi:battery");
    }

    #[tokio::test]
    async fn test_failure_marks_unavailable() {
        let mut sensor = EnpalSensor::new(
            definition("Power.DC.Total", ""),
            "solar",
            Arc::new(FailingSource),
        );
        let outcome = sensor.refresh_at(afternoon()).await;

        assert!(outcome.is_failure());
        assert_eq!(sensor.native_value(), None);
        assert_eq!(
            sensor.extra_state_attributes()["last_check"],
            afternoon().to_rfc3339()
        );
        assert_eq!(
            sensor.last_error(),
            Some("request to time-series service timed out")
        );
    }
}
