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

pub mod catalog;
pub mod presentation;

// Re-export common types for convenience
pub use catalog::{CATALOG, MetricDefinition, Observation, match_observations, unique_id};
pub use presentation::{
    DeviceClass, SignClamp, StateClass, battery_level_icon, last_reset_for, normalize,
    round_to_hundredths, state_class_for_unit,
};
