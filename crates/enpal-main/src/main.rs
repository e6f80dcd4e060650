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

mod config;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::FmtSubscriber;

use config::AppConfig;
use enpal_core::{EntitySink, SensorEntity, SensorPool, setup_entry};
use enpal_ha::{HaEntityRegistry, HaEntitySink, HomeAssistantClient};
use enpal_influx::InfluxSourceFactory;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Handle command line arguments
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        match args[1].as_str() {
            "--help" | "-h" => {
                println!("Enpal Bridge - Enpal solar data for Home Assistant");
                println!("Version: {}", VERSION);
                println!();
                println!("Usage: enpal-bridge [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help    Print this help message");
                println!("  -v, --version Print version");
                return Ok(());
            }
            "--version" | "-v" => {
                println!("{}", VERSION);
                return Ok(());
            }
            _ => {}
        }
    }

    // Respects RUST_LOG environment variable
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let config = AppConfig::load()?;

    info!("🚀 Starting Enpal Bridge v{}", VERSION);
    info!("📋 Configuration Summary:");
    info!("   Instance: {}", config.instance_id);
    info!(
        "   Enpal box: {}:{}",
        config.connection.host.as_deref().unwrap_or("<unset>"),
        config
            .connection
            .port
            .map_or_else(|| "<unset>".to_owned(), |p| p.to_string())
    );
    info!("   Scan interval: {}s", config.scan_interval_secs);

    let ha_client = if std::env::var("SUPERVISOR_TOKEN").is_ok() {
        info!("🏠 Initializing HA client using Supervisor API...");
        Arc::new(HomeAssistantClient::from_supervisor()?)
    } else {
        info!("🏠 Initializing HA client from configuration...");
        Arc::new(HomeAssistantClient::from_config(
            config.ha_base_url.clone(),
            config.ha_token.clone(),
        )?)
    };
    if !ha_client.ping().await? {
        warn!("⚠️ Home Assistant did not answer the health check, continuing anyway");
    }

    let registry = HaEntityRegistry::new(Arc::clone(&ha_client));
    let factory = InfluxSourceFactory::default();
    let sensors = match setup_entry(&config.instance_id, &config.connection, &registry, &factory)
        .await
    {
        Ok(sensors) => sensors,
        Err(e) => {
            error!("❌ Setup failed, no entities created: {}", e);
            return Err(e.into());
        }
    };

    if sensors.is_empty() {
        warn!("⚠️ No known Enpal fields in the last 5 minutes, nothing to publish");
        return Ok(());
    }

    let sink: Arc<dyn EntitySink> = Arc::new(HaEntitySink::new(
        Arc::clone(&ha_client),
        config.instance_id.clone(),
    ));
    let sensors: Vec<Box<dyn SensorEntity>> = sensors
        .into_iter()
        .map(|s| Box::new(s) as Box<dyn SensorEntity>)
        .collect();
    let pool = SensorPool::start(sensors, sink, config.scan_interval());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("🛑 Shutdown requested, stopping {} sensors", pool.len());
    pool.shutdown().await;

    Ok(())
}
