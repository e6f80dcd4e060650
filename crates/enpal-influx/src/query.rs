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

//! Flux queries issued against the solar bucket

/// Window searched for the latest sample
pub const LOOKBACK: &str = "-5m";

/// Quote a value as a Flux string literal
fn flux_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '"' | '\\' => {
                quoted.push('\\');
                quoted.push(c);
            }
            '$' => quoted.push_str("\\$"),
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// Last sample of every series in the bucket
pub fn latest_samples(bucket: &str) -> String {
    format!(
        "from(bucket: {bucket})\n  |> range(start: {LOOKBACK})\n  |> last()",
        bucket = flux_string(bucket)
    )
}

/// Last sample of one (measurement, field) series
pub fn latest_value(bucket: &str, measurement: &str, field: &str) -> String {
    format!(
        "from(bucket: {bucket})\n  \
         |> range(start: {LOOKBACK})\n  \
         |> filter(fn: (r) => r[\"_measurement\"] == {measurement})\n  \
         |> filter(fn: (r) => r[\"_field\"] == {field})\n  \
         |> last()",
        bucket = flux_string(bucket),
        measurement = flux_string(measurement),
        field = flux_string(field),
    )
}
