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

//! Fixed-interval refresh of every sensor, one task per sensor

use crate::sensor::RefreshOutcome;
use crate::traits::{EntitySink, SensorEntity};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// How often each sensor re-queries its field
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(20);

/// Refresh one sensor and hand its state to the sink
///
/// Publish failures are logged; the sensor is retried on its next tick.
pub async fn refresh_and_publish(
    sensor: &mut dyn SensorEntity,
    sink: &dyn EntitySink,
) -> RefreshOutcome {
    let outcome = sensor.update().await;
    if let Err(e) = sink.publish(sensor).await {
        warn!(
            "⚠️ [POLL] Failed to publish {}: {:#}",
            sensor.unique_id(),
            e
        );
    }
    outcome
}

/// Running refresh tasks
///
/// Each sensor is refreshed immediately when added, then on every tick of
/// its own interval. A tick that would overlap a running refresh is skipped.
#[derive(Debug)]
pub struct SensorPool {
    tasks: JoinSet<()>,
    shutdown: watch::Sender<bool>,
}

impl SensorPool {
    pub fn start(
        sensors: Vec<Box<dyn SensorEntity>>,
        sink: Arc<dyn EntitySink>,
        interval: Duration,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        let mut tasks = JoinSet::new();

        info!(
            "⏱️ [POLL] Starting {} sensors, refresh every {:?}",
            sensors.len(),
            interval
        );
        for sensor in sensors {
            tasks.spawn(poll_sensor(
                sensor,
                Arc::clone(&sink),
                interval,
                shutdown.subscribe(),
            ));
        }

        Self { tasks, shutdown }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Stop all refresh tasks and wait for them to finish
    pub async fn shutdown(mut self) {
        // Receivers see the change or the dropped sender; either ends the loop
        let _ = self.shutdown.send(true);
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                warn!("⚠️ [POLL] Sensor task ended abnormally: {}", e);
            }
        }
        info!("[POLL] All sensor tasks stopped");
    }
}

async fn poll_sensor(
    mut sensor: Box<dyn SensorEntity>,
    sink: Arc<dyn EntitySink>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!("[POLL] Stopping {}", sensor.unique_id());
                    break;
                }
            }
            _ = ticker.tick() => {
                refresh_and_publish(sensor.as_mut(), sink.as_ref()).await;
            }
        }
    }
}
