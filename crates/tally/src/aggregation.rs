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

use crate::data_handler::common::parse_datetime;
use crate::data_handler::{Column, DataType, Dataset};
use crate::error::{ResolutionError, ResolutionResult};
use crate::resolver::ColumnResolver;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AggregationKind {
    Sum,
    Count,
    CountDistinct,
    Average,
}

impl AggregationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationKind::Sum => "SUM",
            AggregationKind::Count => "COUNT",
            AggregationKind::CountDistinct => "COUNT_DISTINCT",
            AggregationKind::Average => "AVERAGE",
        }
    }
}

impl FromStr for AggregationKind {
    type Err = ResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SUM" => Ok(AggregationKind::Sum),
            "COUNT" => Ok(AggregationKind::Count),
            "COUNT_DISTINCT" => Ok(AggregationKind::CountDistinct),
            "AVERAGE" => Ok(AggregationKind::Average),
            _ => Err(ResolutionError::UnsupportedAggregation {
                kind: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for AggregationKind {
    type Error = ResolutionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AggregationKind> for String {
    fn from(kind: AggregationKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for AggregationKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationSpec {
    pub column_ref: String,
    pub kind: AggregationKind,
}

impl AggregationSpec {
    pub fn new(column_ref: impl Into<String>, kind: AggregationKind) -> Self {
        Self {
            column_ref: column_ref.into(),
            kind,
        }
    }
}

/// Restricts rows to those whose resolved column equals `value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    #[serde(alias = "column_ref")]
    pub column: String,
    pub value: Value,
}

impl FilterSpec {
    pub fn new(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
    fn matches(&self, column: &Column, row: usize) -> bool {
        match &self.value {
            Value::Null => false,
            Value::Number(n) if column.data_type().is_numeric() => {
                match (n.as_f64(), column.to_f64(row)) {
                    (Some(wanted), Some(actual)) => wanted == actual,
                    _ => false,
                }
            }
            Value::String(s) if column.data_type() == DataType::Datetime => match parse_datetime(s) {
                Some(wanted) => column.to_datetime(row) == Some(wanted),
                None => column.get_string(row).as_deref() == Some(s.as_str()),
            },
            Value::String(s) => column.get_string(row).as_deref() == Some(s.as_str()),
            other => column.get_string(row) == Some(other.to_string()),
        }
    }
}

/// Applies `filter` to a working copy of `dataset`. An unresolved filter
/// column is an error rather than a silently ignored filter.
pub fn apply_filter(
    dataset: &Dataset,
    filter: &FilterSpec,
    resolver: &dyn ColumnResolver,
) -> ResolutionResult<Dataset> {
    let name = resolver
        .resolve(&filter.column, dataset.column_names())
        .require(&filter.column)?;
    let column = dataset.require_column(&name)?;
    let filtered = dataset.filter(|row| filter.matches(column, row))?;
    debug!(
        column = %name,
        value = %filter.value,
        kept = filtered.row_count(),
        of = dataset.row_count(),
        "Applied equality filter"
    );
    Ok(filtered)
}

/// Aggregates an already resolved column.
pub fn aggregate(dataset: &Dataset, column_name: &str, kind: AggregationKind) -> ResolutionResult<f64> {
    let column = dataset.require_column(column_name)?;
    let rows = 0..dataset.row_count();
    match kind {
        AggregationKind::Count => Ok(rows.filter(|&i| !column.is_null(i)).count() as f64),
        AggregationKind::CountDistinct => {
            let distinct: HashSet<String> = rows.filter_map(|i| column.get_string(i)).collect();
            Ok(distinct.len() as f64)
        }
        AggregationKind::Sum | AggregationKind::Average => {
            if matches!(column.data_type(), DataType::String | DataType::Datetime) {
                return Err(ResolutionError::TypeMismatch {
                    column: column_name.to_string(),
                    expected: "numeric".to_string(),
                    found: column.data_type().to_string(),
                });
            }
            let values: Vec<f64> = rows.filter_map(|i| column.to_f64(i)).collect();
            let sum = values.iter().fold(0.0, |acc, v| acc + v);
            if kind == AggregationKind::Sum {
                Ok(sum)
            } else if values.is_empty() {
                Err(ResolutionError::EmptySelection {
                    column: column_name.to_string(),
                })
            } else {
                Ok(sum / values.len() as f64)
            }
        }
    }
}

/// Filter first, then resolve and aggregate the spec's column.
pub fn evaluate(
    dataset: &Dataset,
    spec: &AggregationSpec,
    filter: Option<&FilterSpec>,
    resolver: &dyn ColumnResolver,
) -> ResolutionResult<f64> {
    let filtered;
    let working = match filter {
        Some(filter) => {
            filtered = apply_filter(dataset, filter, resolver)?;
            &filtered
        }
        None => dataset,
    };
    let name = resolver
        .resolve(&spec.column_ref, working.column_names())
        .require(&spec.column_ref)?;
    aggregate(working, &name, spec.kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::SubstringResolver;

    fn sales() -> Dataset {
        Dataset::from_columns(
            "sales",
            vec![
                ("Region", Column::from(vec!["West", "West", "East", "East"])),
                ("Sales", Column::from(vec![Some(100.0), Some(300.0), None, Some(50.0)])),
                ("Customer ID", Column::from(vec!["c1", "c2", "c1", "c3"])),
                ("Quantity", Column::from(vec![1_i64, 2, 3, 4])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn kinds_parse_case_insensitively() {
        assert_eq!("sum".parse::<AggregationKind>().unwrap(), AggregationKind::Sum);
        assert_eq!(
            " Count_Distinct ".parse::<AggregationKind>().unwrap(),
            AggregationKind::CountDistinct
        );
        assert!(matches!(
            "MEDIAN".parse::<AggregationKind>(),
            Err(ResolutionError::UnsupportedAggregation { .. })
        ));
    }

    #[test]
    fn aggregates_skip_nulls() {
        let data = sales();
        assert_eq!(aggregate(&data, "Sales", AggregationKind::Sum).unwrap(), 450.0);
        assert_eq!(aggregate(&data, "Sales", AggregationKind::Count).unwrap(), 3.0);
        assert_eq!(aggregate(&data, "Sales", AggregationKind::Average).unwrap(), 150.0);
        assert_eq!(
            aggregate(&data, "Customer ID", AggregationKind::CountDistinct).unwrap(),
            3.0
        );
    }

    #[test]
    fn text_columns_cannot_be_summed() {
        let err = aggregate(&sales(), "Region", AggregationKind::Sum).unwrap_err();
        assert!(matches!(err, ResolutionError::TypeMismatch { .. }));
    }

    #[test]
    fn filter_restricts_before_aggregating() {
        let spec = AggregationSpec::new("sales", AggregationKind::Sum);
        let west = FilterSpec::new("region", "West");
        let value = evaluate(&sales(), &spec, Some(&west), &SubstringResolver).unwrap();
        assert_eq!(value, 400.0);
    }

    #[test]
    fn numeric_filter_compares_numerically() {
        let spec = AggregationSpec::new("Sales", AggregationKind::Count);
        let filter = FilterSpec::new("Quantity", 4);
        assert_eq!(evaluate(&sales(), &spec, Some(&filter), &SubstringResolver).unwrap(), 1.0);
    }

    #[test]
    fn average_of_empty_selection_fails() {
        let spec = AggregationSpec::new("Sales", AggregationKind::Average);
        let filter = FilterSpec::new("Region", "North");
        let err = evaluate(&sales(), &spec, Some(&filter), &SubstringResolver).unwrap_err();
        assert!(matches!(err, ResolutionError::EmptySelection { .. }));
    }

    #[test]
    fn unresolved_filter_column_is_an_error() {
        let spec = AggregationSpec::new("Sales", AggregationKind::Sum);
        let filter = FilterSpec::new("Country", "US");
        let err = evaluate(&sales(), &spec, Some(&filter), &SubstringResolver).unwrap_err();
        assert_eq!(err, ResolutionError::column_not_found("Country"));
    }
}
