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

//! Static catalog of Enpal metrics and the matcher that turns observed
//! (field, measurement) pairs into sensor definitions.

use crate::presentation::{DeviceClass, SignClamp};
use DeviceClass::{Battery, Current, Energy, Power, Voltage};
use SignClamp::{NegativeOnly, PositiveOnly};
use serde::{Deserialize, Serialize};

/// Presentation metadata for one known metric
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricDefinition {
    /// Field name in the solar bucket (e.g. "Power.DC.Total")
    pub field: &'static str,
    /// Appended to the field in the unique id of split variants ("_in", "_pure_out", ...)
    pub key_suffix: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub device_class: DeviceClass,
    pub unit: &'static str,
    pub clamp: SignClamp,
}

impl MetricDefinition {
    const fn base(
        field: &'static str,
        name: &'static str,
        icon: &'static str,
        device_class: DeviceClass,
        unit: &'static str,
    ) -> Self {
        Self {
            field,
            key_suffix: "",
            name,
            icon,
            device_class,
            unit,
            clamp: SignClamp::None,
        }
    }

    const fn split(
        field: &'static str,
        key_suffix: &'static str,
        name: &'static str,
        icon: &'static str,
        clamp: SignClamp,
    ) -> Self {
        Self {
            field,
            key_suffix,
            name,
            icon,
            device_class: DeviceClass::Power,
            unit: "W",
            clamp,
        }
    }

    /// Key that identifies this sensor within a measurement
    pub fn key(&self) -> String {
        format!("{}{}", self.field, self.key_suffix)
    }

    /// True for the synthetic in/out variants of a bidirectional flow
    pub fn is_split_variant(&self) -> bool {
        !self.key_suffix.is_empty()
    }
}

/// A (field, measurement) pair seen in the most recent samples of the bucket
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Observation {
    pub field: String,
    pub measurement: String,
}

impl Observation {
    pub fn new(field: impl Into<String>, measurement: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            measurement: measurement.into(),
        }
    }
}

/// Stable unique id of a sensor, persisted by the host's entity registry
pub fn unique_id(measurement: &str, definition: &MetricDefinition) -> String {
    format!("enpal_{}_{}", measurement, definition.key())
}

/// Every metric the integration knows about, in registration order
#[rustfmt::skip]
pub const CATALOG: &[MetricDefinition] = &[
    // Power
    MetricDefinition::base("Power.DC.Total", "Enpal Solar Production Power", "mdi:solar-power", Power, "W"),
    MetricDefinition::base("Power.House.Total", "Enpal Power House Total", "mdi:home-lightning-bolt", Power, "W"),
    MetricDefinition::base("Power.House.Total.Fox", "Enpal Power House Total (Fox)", "mdi:home-lightning-bolt", Power, "W"),
    MetricDefinition::base("Power.External.Total", "Enpal Power External Total", "mdi:home-lightning-bolt", Power, "W"),
    MetricDefinition::base("Power.Grid.Export", "Enpal Power Grid Export", "mdi:home-lightning-bolt", Power, "W"),
    // Daily energy
    MetricDefinition::base("Energy.Consumption.Total.Day", "Enpal Energy Consumption", "mdi:home-lightning-bolt", Energy, "kWh"),
    MetricDefinition::base("Energy.External.Total.Out.Day", "Enpal Energy External Out Day", "mdi:transmission-tower-export", Energy, "kWh"),
    MetricDefinition::base("Energy.External.Total.In.Day", "Enpal Energy External In Day", "mdi:transmission-tower-import", Energy, "kWh"),
    MetricDefinition::base("Energy.Grid.Export.Day", "Enpal Energy Grid Export Day", "mdi:home-lightning-bolt", Energy, "kWh"),
    MetricDefinition::base("Energy.Grid.Import.Day", "Enpal Energy Grid Import Day", "mdi:home-lightning-bolt", Energy, "kWh"),
    MetricDefinition::base("Energy.Production.Total.Day", "Enpal Production Day", "mdi:solar-power-variant", Energy, "kWh"),
    // Phases
    MetricDefinition::base("Voltage.Phase.A", "Enpal Voltage Phase A", "mdi:lightning-bolt", Voltage, "V"),
    MetricDefinition::base("Current.Phase.A", "Enpal Ampere Phase A", "mdi:lightning-bolt", Current, "A"),
    MetricDefinition::base("Power.AC.Phase.A", "Enpal Power Phase A", "mdi:lightning-bolt", Power, "W"),
    MetricDefinition::base("Voltage.Phase.B", "Enpal Voltage Phase B", "mdi:lightning-bolt", Voltage, "V"),
    MetricDefinition::base("Current.Phase.B", "Enpal Ampere Phase B", "mdi:lightning-bolt", Current, "A"),
    MetricDefinition::base("Power.AC.Phase.B", "Enpal Power Phase B", "mdi:lightning-bolt", Power, "W"),
    MetricDefinition::base("Voltage.Phase.C", "Enpal Voltage Phase C", "mdi:lightning-bolt", Voltage, "V"),
    MetricDefinition::base("Current.Phase.C", "Enpal Ampere Phase C", "mdi:lightning-bolt", Current, "A"),
    MetricDefinition::base("Power.AC.Phase.C", "Enpal Power Phase C", "mdi:lightning-bolt", Power, "W"),
    // DC strings
    MetricDefinition::base("Power.DC.String.1", "Enpal Power DC String 1", "mdi:lightning-bolt", Power, "W"),
    MetricDefinition::base("Current.String.1", "Enpal Ampere String 1", "mdi:lightning-bolt", Current, "A"),
    MetricDefinition::base("Voltage.String.1", "Enpal Voltage String 1", "mdi:lightning-bolt", Voltage, "V"),
    MetricDefinition::base("Power.DC.String.2", "Enpal Power DC String 2", "mdi:lightning-bolt", Power, "W"),
    MetricDefinition::base("Current.String.2", "Enpal Ampere String 2", "mdi:lightning-bolt", Current, "A"),
    MetricDefinition::base("Voltage.String.2", "Enpal Voltage String 2", "mdi:lightning-bolt", Voltage, "V"),
    // Battery
    MetricDefinition::base("Power.Battery.Charge.Discharge", "Enpal Battery Power", "mdi:battery-charging", Power, "W"),
    MetricDefinition::base("Energy.Battery.Charge.Level", "Enpal Battery Percent", "mdi:battery", Battery, "%"),
    MetricDefinition::base("Percent.Storage.Level", "Enpal Storage Level", "mdi:battery", Battery, "%"),
    MetricDefinition::base("Energy.Battery.Charge.Day", "Enpal Battery Charge Day", "mdi:battery-arrow-up", Energy, "kWh"),
    MetricDefinition::base("Energy.Battery.Discharge.Day", "Enpal Battery Discharge Day", "mdi:battery-arrow-down", Energy, "kWh"),
    MetricDefinition::base("Energy.Battery.Charge.Total.Unit.1", "Enpal Battery Charge Total", "mdi:battery-arrow-up", Energy, "kWh"),
    MetricDefinition::base("Energy.Battery.Discharge.Total.Unit.1", "Enpal Battery Discharge Total", "mdi:battery-arrow-down", Energy, "kWh"),
    // Wallbox
    MetricDefinition::base("State.Wallbox.Connector.1.Charge", "Wallbox Charge Percent", "mdi:ev-station", Battery, "%"),
    MetricDefinition::base("Power.Wallbox.Connector.1.Charging", "Wallbox Charging Power", "mdi:ev-station", Power, "W"),
    MetricDefinition::base("Energy.Wallbox.Connector.1.Charged.Total", "Wallbox Charging Total", "mdi:ev-station", Energy, "Wh"),
    // In/out splits of bidirectional flows
    MetricDefinition::split("Power.AC.Phase.A", "_in", "Enpal Power Phase A in", "mdi:lightning-bolt", PositiveOnly),
    MetricDefinition::split("Power.AC.Phase.A", "_out", "Enpal Power Phase A out", "mdi:lightning-bolt", NegativeOnly),
    MetricDefinition::split("Power.AC.Phase.B", "_in", "Enpal Power Phase B in", "mdi:lightning-bolt", PositiveOnly),
    MetricDefinition::split("Power.AC.Phase.B", "_out", "Enpal Power Phase B out", "mdi:lightning-bolt", NegativeOnly),
    MetricDefinition::split("Power.AC.Phase.C", "_in", "Enpal Power Phase C in", "mdi:lightning-bolt", PositiveOnly),
    MetricDefinition::split("Power.AC.Phase.C", "_out", "Enpal Power Phase C out", "mdi:lightning-bolt", NegativeOnly),
    MetricDefinition::split("Power.Grid.Export", "_pure_out", "Enpal Power Grid pure Export", "mdi:home-lightning-bolt", PositiveOnly),
    MetricDefinition::split("Power.Grid.Export", "_pure_in", "Enpal Power Grid pure Import", "mdi:home-lightning-bolt", NegativeOnly),
    MetricDefinition::split("Power.Battery.Charge.Discharge", "_in", "Enpal Battery Power in", "mdi:battery-charging", PositiveOnly),
    MetricDefinition::split("Power.Battery.Charge.Discharge", "_out", "Enpal Battery Power out", "mdi:battery-charging", NegativeOnly),
];

/// Match observed pairs against the catalog
///
/// Output follows catalog order. A field observed under several measurements
/// yields one match per measurement; repeated identical observations are
/// collapsed. Unknown fields are ignored.
pub fn match_observations(
    observations: &[Observation],
) -> Vec<(&'static MetricDefinition, String)> {
    let mut unique: Vec<&Observation> = Vec::with_capacity(observations.len());
    for observation in observations {
        if !unique.contains(&observation) {
            unique.push(observation);
        }
    }

    CATALOG
        .iter()
        .flat_map(|definition| {
            unique
                .iter()
                .filter(move |obs| obs.field == definition.field)
                .map(move |obs| (definition, obs.measurement.clone()))
        })
        .collect()
}
