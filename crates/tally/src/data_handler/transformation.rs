// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use crate::data_handler::column::Column;
use crate::data_handler::common::{DataError, DataType, Result};
use crate::data_handler::dataframe::Dataset;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Granularity that temporal x values are truncated to before grouping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateBucket {
    Day,
    #[default]
    Month,
    Quarter,
    Year,
}

impl DateBucket {
    pub fn truncate(&self, value: NaiveDateTime) -> Option<NaiveDateTime> {
        let date = value.date();
        let start = match self {
            DateBucket::Day => Some(date),
            DateBucket::Month => NaiveDate::from_ymd_opt(date.year(), date.month(), 1),
            DateBucket::Quarter => {
                NaiveDate::from_ymd_opt(date.year(), ((date.month() - 1) / 3) * 3 + 1, 1)
            }
            DateBucket::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1),
        }?;
        start.and_hms_opt(0, 0, 0)
    }
}

fn ensure_numeric(dataset: &Dataset, name: &str) -> Result<()> {
    let column = dataset.require_column(name)?;
    match column.data_type() {
        DataType::Int64 | DataType::Float64 | DataType::Boolean => Ok(()),
        other => Err(DataError::TypeMismatch {
            column: name.to_string(),
            details: format!("expected numeric values, found {other}"),
        }),
    }
}

/// Groups rows by the key columns and sums `value` within each group.
///
/// Groups appear in first-seen order; key columns keep their original type
/// and the summed column is Float64. Rows with a null key are skipped.
pub fn group_sum<S: AsRef<str>>(dataset: &Dataset, keys: &[S], value: &str) -> Result<Dataset> {
    ensure_numeric(dataset, value)?;
    let key_columns: Result<Vec<&Column>> = keys
        .iter()
        .map(|k| dataset.require_column(k.as_ref()))
        .collect();
    let key_columns = key_columns?;
    let value_column = dataset.require_column(value)?;

    let mut groups: IndexMap<Vec<String>, (usize, f64)> = IndexMap::new();
    for i in 0..dataset.row_count() {
        let key: Option<Vec<String>> = key_columns.iter().map(|c| c.get_string(i)).collect();
        let Some(key) = key else {
            continue;
        };
        let entry = groups.entry(key).or_insert((i, 0.0));
        if let Some(v) = value_column.to_f64(i) {
            entry.1 += v;
        }
    }

    let representatives: Vec<usize> = groups.values().map(|(row, _)| *row).collect();
    let sums: Vec<Option<f64>> = groups.values().map(|(_, sum)| Some(*sum)).collect();
    let mut columns = Vec::with_capacity(keys.len() + 1);
    for (name, column) in keys.iter().zip(&key_columns) {
        columns.push((name.as_ref().to_string(), column.select_rows(&representatives)?));
    }
    columns.push((value.to_string(), Column::from(sums)));
    let mut result = Dataset::from_columns(&format!("{}_grouped", dataset.metadata.name), columns)?;
    result.metadata.row_count = representatives.len();
    Ok(result)
}

/// Reshapes wide series columns into long form: one row per
/// `(id, series name, value)`, series-major, so `n` rows and `k` series give
/// `n * k` rows.
pub fn unpivot<S: AsRef<str>>(
    dataset: &Dataset,
    id: &str,
    value_vars: &[S],
    var_name: &str,
    value_name: &str,
) -> Result<Dataset> {
    let id_column = dataset.require_column(id)?;
    let rows = dataset.row_count();
    let mut indices = Vec::with_capacity(rows * value_vars.len());
    let mut series: Vec<Option<Arc<str>>> = Vec::with_capacity(indices.capacity());
    let mut values: Vec<Option<f64>> = Vec::with_capacity(indices.capacity());
    for var in value_vars {
        let var = var.as_ref();
        ensure_numeric(dataset, var)?;
        let column = dataset.require_column(var)?;
        let label: Arc<str> = Arc::from(var);
        for i in 0..rows {
            indices.push(i);
            series.push(Some(Arc::clone(&label)));
            values.push(column.to_f64(i));
        }
    }
    Dataset::from_columns(
        &format!("{}_long", dataset.metadata.name),
        vec![
            (id.to_string(), id_column.select_rows(&indices)?),
            (var_name.to_string(), Column::String(series.into())),
            (value_name.to_string(), Column::from(values)),
        ],
    )
}

/// Elementwise `numerator / denominator`. A zero or missing denominator gives
/// a null cell rather than an infinity.
pub fn derive_ratio(dataset: &Dataset, numerator: &str, denominator: &str, name: &str) -> Result<Dataset> {
    ensure_numeric(dataset, numerator)?;
    ensure_numeric(dataset, denominator)?;
    let num = dataset.require_column(numerator)?;
    let den = dataset.require_column(denominator)?;
    let ratio: Vec<Option<f64>> = (0..dataset.row_count())
        .map(|i| match (num.to_f64(i), den.to_f64(i)) {
            (Some(a), Some(b)) if b != 0.0 => Some(a / b),
            _ => None,
        })
        .collect();
    dataset.with_column(name, Column::from(ratio))
}

/// Converts `name` to a Datetime column, nulling cells that do not parse.
pub fn parse_datetime_column(dataset: &Dataset, name: &str) -> Result<Dataset> {
    let column = dataset.require_column(name)?;
    if column.data_type() == DataType::Datetime {
        return Ok(dataset.clone());
    }
    let parsed: Vec<Option<NaiveDateTime>> = (0..dataset.row_count())
        .map(|i| match column {
            Column::String(_) => column.to_datetime(i),
            _ => column.get_string(i).and_then(|s| crate::data_handler::common::parse_datetime(&s)),
        })
        .collect();
    dataset.with_column(name, Column::from(parsed))
}

/// Parses `name` as dates, drops rows that fail to parse and truncates the
/// survivors to the start of their bucket.
pub fn bucket_dates(dataset: &Dataset, name: &str, bucket: DateBucket) -> Result<Dataset> {
    let parsed = parse_datetime_column(dataset, name)?.drop_nulls(&[name])?;
    let column = parsed.require_column(name)?;
    let bucketed: Vec<Option<NaiveDateTime>> = (0..parsed.row_count())
        .map(|i| column.to_datetime(i).and_then(|v| bucket.truncate(v)))
        .collect();
    parsed.with_column(name, Column::from(bucketed))
}
