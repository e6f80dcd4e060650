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

//! Parsing of the CSV returned by the InfluxDB v2 query API
//!
//! A response holds one or more tables. Each section starts with a header row
//! (`,result,table,_start,...`), optionally preceded by `#` annotation rows.
//! Errors raised while the query streams are reported as an `error,reference`
//! section with HTTP status 200.

use enpal_core::{FetchError, FetchResult};
use std::collections::HashMap;

/// One row of a result table, keyed by column name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FluxRecord {
    values: HashMap<String, String>,
}

impl FluxRecord {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }

    pub fn value(&self) -> Option<&str> {
        self.get("_value")
    }

    pub fn field(&self) -> Option<&str> {
        self.get("_field")
    }

    pub fn measurement(&self) -> Option<&str> {
        self.get("_measurement")
    }
}

/// Rows sharing one group key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FluxTable {
    pub records: Vec<FluxRecord>,
}

#[derive(Debug)]
enum Section {
    Table(Vec<String>),
    Error(Vec<String>),
}

fn is_table_header(row: &csv::StringRecord) -> bool {
    row.iter().any(|c| c == "result") && row.iter().any(|c| c == "table")
}

fn is_error_header(row: &csv::StringRecord) -> bool {
    row.iter().any(|c| c == "error") && row.iter().any(|c| c == "reference")
}

/// Split a CSV response body into tables, in response order
pub fn parse_tables(body: &str) -> FetchResult<Vec<FluxTable>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    // (section index, table id) of the table currently being filled
    let mut current_key: Option<(usize, String)> = None;
    let mut tables: Vec<FluxTable> = Vec::new();
    let mut section: Option<Section> = None;
    let mut section_index = 0_usize;

    for row in reader.records() {
        let row = row.map_err(|e| FetchError::MalformedResponse(format!("invalid CSV: {e}")))?;

        if row.iter().all(str::is_empty) || row.get(0).is_some_and(|c| c.starts_with('#')) {
            continue;
        }

        if is_table_header(&row) {
            section = Some(Section::Table(row.iter().map(str::to_owned).collect()));
            section_index += 1;
            continue;
        }
        if is_error_header(&row) {
            section = Some(Section::Error(row.iter().map(str::to_owned).collect()));
            continue;
        }

        match &section {
            None => {
                return Err(FetchError::MalformedResponse(
                    "data row before header row".to_owned(),
                ));
            }
            Some(Section::Error(columns)) => {
                let message = columns
                    .iter()
                    .position(|c| c == "error")
                    .and_then(|i| row.get(i))
                    .unwrap_or("unknown query error");
                return Err(FetchError::Query {
                    status: 200,
                    message: message.to_owned(),
                });
            }
            Some(Section::Table(columns)) => {
                let values: HashMap<String, String> = columns
                    .iter()
                    .zip(row.iter())
                    .filter(|(name, _)| !name.is_empty())
                    .map(|(name, value)| (name.clone(), value.to_owned()))
                    .collect();
                let record = FluxRecord { values };

                let key = (
                    section_index,
                    record.get("table").unwrap_or_default().to_owned(),
                );
                if current_key.as_ref() != Some(&key) {
                    tables.push(FluxTable::default());
                    current_key = Some(key);
                }
                if let Some(table) = tables.last_mut() {
                    table.records.push(record);
                }
            }
        }
    }

    Ok(tables)
}
