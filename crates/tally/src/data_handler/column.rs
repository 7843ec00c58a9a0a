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

use crate::data_handler::common::{parse_bool, parse_datetime, DataError, DataType, Result};
use chrono::NaiveDateTime;
use rayon::prelude::*;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::Arc;

const DISPLAY_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const JSON_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Null-aware typed column storage. Clones share the underlying buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Int64(Arc<[Option<i64>]>),
    Float64(Arc<[Option<f64>]>),
    String(Arc<[Option<Arc<str>>]>),
    Boolean(Arc<[Option<bool>]>),
    Datetime(Arc<[Option<NaiveDateTime>]>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Int64(data) => data.len(),
            Column::Float64(data) => data.len(),
            Column::String(data) => data.len(),
            Column::Boolean(data) => data.len(),
            Column::Datetime(data) => data.len(),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn data_type(&self) -> DataType {
        match self {
            Column::Int64(_) => DataType::Int64,
            Column::Float64(_) => DataType::Float64,
            Column::String(_) => DataType::String,
            Column::Boolean(_) => DataType::Boolean,
            Column::Datetime(_) => DataType::Datetime,
        }
    }
    pub fn is_null(&self, index: usize) -> bool {
        match self {
            Column::Int64(data) => data.get(index).is_none_or(|v| v.is_none()),
            // NaN is treated as missing, the way a float column loaded from a
            // spreadsheet would encode blanks.
            Column::Float64(data) => data
                .get(index)
                .is_none_or(|v| v.is_none_or(|f| f.is_nan())),
            Column::String(data) => data.get(index).is_none_or(|v| v.is_none()),
            Column::Boolean(data) => data.get(index).is_none_or(|v| v.is_none()),
            Column::Datetime(data) => data.get(index).is_none_or(|v| v.is_none()),
        }
    }
    pub fn null_count(&self) -> usize {
        (0..self.len()).filter(|&i| self.is_null(i)).count()
    }
    /// The stored representation of a cell, used for equality filters,
    /// grouping keys and distinct counts.
    pub fn get_string(&self, index: usize) -> Option<String> {
        if self.is_null(index) {
            return None;
        }
        match self {
            Column::Int64(data) => data.get(index)?.map(|v| v.to_string()),
            Column::Float64(data) => data.get(index)?.map(|v| v.to_string()),
            Column::String(data) => data.get(index)?.as_ref().map(|s| s.to_string()),
            Column::Boolean(data) => data.get(index)?.map(|v| v.to_string()),
            Column::Datetime(data) => data
                .get(index)?
                .map(|v| v.format(DISPLAY_DATETIME_FORMAT).to_string()),
        }
    }
    pub fn to_f64(&self, index: usize) -> Option<f64> {
        if self.is_null(index) {
            return None;
        }
        match self {
            Column::Int64(data) => data.get(index).and_then(|opt| opt.map(|v| v as f64)),
            Column::Float64(data) => data.get(index).copied()?,
            Column::String(data) => data
                .get(index)
                .and_then(|opt| opt.as_ref().and_then(|s| s.trim().parse::<f64>().ok())),
            Column::Boolean(data) => data
                .get(index)
                .and_then(|opt| opt.map(|v| if v { 1.0 } else { 0.0 })),
            Column::Datetime(_) => None,
        }
    }
    pub fn to_datetime(&self, index: usize) -> Option<NaiveDateTime> {
        match self {
            Column::Datetime(data) => data.get(index).copied()?,
            Column::String(data) => data
                .get(index)
                .and_then(|opt| opt.as_ref().and_then(|s| parse_datetime(s))),
            _ => None,
        }
    }
    pub fn to_json(&self, index: usize) -> Value {
        if self.is_null(index) {
            return Value::Null;
        }
        match self {
            Column::Int64(data) => data
                .get(index)
                .copied()
                .flatten()
                .map_or(Value::Null, Value::from),
            Column::Float64(data) => data
                .get(index)
                .copied()
                .flatten()
                .map_or(Value::Null, Value::from),
            Column::String(data) => data
                .get(index)
                .and_then(|opt| opt.as_ref())
                .map_or(Value::Null, |s| Value::String(s.to_string())),
            Column::Boolean(data) => data
                .get(index)
                .copied()
                .flatten()
                .map_or(Value::Null, Value::Bool),
            Column::Datetime(data) => data.get(index).copied().flatten().map_or(Value::Null, |v| {
                Value::String(v.format(JSON_DATETIME_FORMAT).to_string())
            }),
        }
    }
    /// Orders two non-null cells of this column. Nulls sort after values.
    pub fn compare_rows(&self, a: usize, b: usize) -> Ordering {
        match (self.is_null(a), self.is_null(b)) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            (false, false) => {}
        }
        match self {
            Column::Int64(data) => data[a].cmp(&data[b]),
            Column::Float64(data) => data[a]
                .partial_cmp(&data[b])
                .unwrap_or(Ordering::Equal),
            Column::String(data) => data[a].cmp(&data[b]),
            Column::Boolean(data) => data[a].cmp(&data[b]),
            Column::Datetime(data) => data[a].cmp(&data[b]),
        }
    }
    pub fn select_rows(&self, indices: &[usize]) -> Result<Column> {
        fn pick<T: Clone + Send + Sync>(data: &[Option<T>], indices: &[usize]) -> Result<Arc<[Option<T>]>> {
            let picked: Result<Vec<Option<T>>> = indices
                .par_iter()
                .map(|&i| data.get(i).cloned().ok_or(DataError::OutOfBounds(i)))
                .collect();
            Ok(picked?.into())
        }
        Ok(match self {
            Column::Int64(data) => Column::Int64(pick(data, indices)?),
            Column::Float64(data) => Column::Float64(pick(data, indices)?),
            Column::String(data) => Column::String(pick(data, indices)?),
            Column::Boolean(data) => Column::Boolean(pick(data, indices)?),
            Column::Datetime(data) => Column::Datetime(pick(data, indices)?),
        })
    }
    /// Parses every cell of a string column as `data_type`. Cells that fail to
    /// parse become null; `strict` turns them into an error instead.
    pub fn from_strings(values: &[Option<String>], data_type: DataType, strict: bool) -> Result<Self> {
        fn parse_all<T, F>(values: &[Option<String>], strict: bool, target: DataType, parse: F) -> Result<Arc<[Option<T>]>>
        where
            F: Fn(&str) -> Option<T>,
        {
            let mut out = Vec::with_capacity(values.len());
            for value in values {
                match value.as_deref().map(str::trim) {
                    None | Some("") => out.push(None),
                    Some(s) => match parse(s) {
                        Some(v) => out.push(Some(v)),
                        None if strict => {
                            return Err(DataError::Parse(format!("Cannot parse '{s}' as {target}")))
                        }
                        None => out.push(None),
                    },
                }
            }
            Ok(out.into())
        }
        Ok(match data_type {
            DataType::Int64 => Column::Int64(parse_all(values, strict, data_type, |s| s.parse().ok())?),
            DataType::Float64 => Column::Float64(parse_all(values, strict, data_type, |s| s.parse().ok())?),
            DataType::Boolean => Column::Boolean(parse_all(values, strict, data_type, parse_bool)?),
            DataType::Datetime => Column::Datetime(parse_all(values, strict, data_type, parse_datetime)?),
            DataType::String => Column::String(
                values
                    .iter()
                    .map(|opt| match opt.as_deref() {
                        None | Some("") => None,
                        Some(s) => Some(Arc::from(s)),
                    })
                    .collect::<Vec<_>>()
                    .into(),
            ),
        })
    }
}

impl From<Vec<Option<i64>>> for Column {
    fn from(values: Vec<Option<i64>>) -> Self {
        Column::Int64(values.into())
    }
}
impl From<Vec<Option<f64>>> for Column {
    fn from(values: Vec<Option<f64>>) -> Self {
        Column::Float64(values.into())
    }
}
impl From<Vec<Option<bool>>> for Column {
    fn from(values: Vec<Option<bool>>) -> Self {
        Column::Boolean(values.into())
    }
}
impl From<Vec<Option<NaiveDateTime>>> for Column {
    fn from(values: Vec<Option<NaiveDateTime>>) -> Self {
        Column::Datetime(values.into())
    }
}
impl From<Vec<i64>> for Column {
    fn from(values: Vec<i64>) -> Self {
        Column::Int64(values.into_iter().map(Some).collect::<Vec<_>>().into())
    }
}
impl From<Vec<f64>> for Column {
    fn from(values: Vec<f64>) -> Self {
        Column::Float64(values.into_iter().map(Some).collect::<Vec<_>>().into())
    }
}
impl From<Vec<&str>> for Column {
    fn from(values: Vec<&str>) -> Self {
        Column::String(values.into_iter().map(|s| Some(Arc::from(s))).collect::<Vec<_>>().into())
    }
}
impl From<Vec<Option<&str>>> for Column {
    fn from(values: Vec<Option<&str>>) -> Self {
        Column::String(values.into_iter().map(|s| s.map(Arc::from)).collect::<Vec<_>>().into())
    }
}
impl From<Vec<String>> for Column {
    fn from(values: Vec<String>) -> Self {
        Column::String(
            values
                .into_iter()
                .map(|s| Some(Arc::from(s.as_str())))
                .collect::<Vec<_>>()
                .into(),
        )
    }
}

/// Accumulates raw text cells and infers the narrowest type that every
/// non-empty cell satisfies.
#[derive(Debug, Default)]
pub struct ColumnBuilder {
    values: Vec<Option<String>>,
}

impl ColumnBuilder {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }
    pub fn push(&mut self, value: Option<String>) {
        let value = value.filter(|s| !s.trim().is_empty());
        self.values.push(value);
    }
    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
    pub fn infer_type(&self) -> DataType {
        let present: Vec<&str> = self.values.iter().flatten().map(|s| s.trim()).collect();
        if present.is_empty() {
            return DataType::String;
        }
        if present.iter().all(|s| s.parse::<i64>().is_ok()) {
            DataType::Int64
        } else if present.iter().all(|s| s.parse::<f64>().is_ok()) {
            DataType::Float64
        } else if present.iter().all(|s| parse_bool(s).is_some()) {
            DataType::Boolean
        } else if present.iter().all(|s| parse_datetime(s).is_some()) {
            DataType::Datetime
        } else {
            DataType::String
        }
    }
    pub fn build(self) -> Result<Column> {
        let data_type = self.infer_type();
        Column::from_strings(&self.values, data_type, true)
    }
}
