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

pub mod connection;
pub mod errors;
pub mod polling;
pub mod sensor;
pub mod setup;
pub mod traits;

pub use connection::{ConnectionConfig, ConnectionParams, INFLUX_BUCKET, INFLUX_ORG};
pub use errors::{ConfigError, FetchError, FetchResult, SetupError};
pub use polling::{DEFAULT_SCAN_INTERVAL, SensorPool, refresh_and_publish};
pub use sensor::{EnpalSensor, RefreshOutcome, SensorAttributes};
pub use setup::{discover_sensors, setup_entry};
pub use traits::{EntityRegistry, EntitySink, MetricSource, MetricSourceFactory, SensorEntity};

// Re-export the catalog so hosts only need one dependency
pub use enpal_types::{
    CATALOG, DeviceClass, MetricDefinition, Observation, SignClamp, StateClass,
};
