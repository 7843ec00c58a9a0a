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

use crate::data_handler::column::{Column, ColumnBuilder};
use crate::data_handler::common::{ColumnMetadata, DataError, DatasetMetadata, Result};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

/// An ordered collection of uniquely named, equally long columns.
///
/// Every operation returns a new `Dataset`; untouched columns are shared with
/// the source through `Arc`, so working copies are cheap and the caller's
/// dataset is never modified.
#[derive(Debug, Clone)]
pub struct Dataset {
    columns: HashMap<String, Arc<Column>>,
    column_order: Vec<String>,
    pub metadata: DatasetMetadata,
}

impl Dataset {
    pub fn new(metadata: DatasetMetadata) -> Self {
        Self {
            columns: HashMap::new(),
            column_order: Vec::new(),
            metadata,
        }
    }
    pub fn from_columns<N, I>(name: &str, columns: I) -> Result<Self>
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, Column)>,
    {
        let mut dataset = Self::new(DatasetMetadata::named(name));
        for (column_name, column) in columns {
            let column_name = column_name.into();
            if dataset.columns.contains_key(&column_name) {
                return Err(DataError::DuplicateColumn(column_name));
            }
            dataset.add_column(column_name, column)?;
        }
        Ok(dataset)
    }
    /// Builds a dataset from text rows, inferring each column's type. Empty
    /// cells are nulls; short rows are padded with nulls.
    pub fn from_rows<S: AsRef<str>>(name: &str, headers: &[S], rows: &[Vec<S>]) -> Result<Self> {
        let mut builders: Vec<ColumnBuilder> = headers
            .iter()
            .map(|_| ColumnBuilder::with_capacity(rows.len()))
            .collect();
        for (line, row) in rows.iter().enumerate() {
            if row.len() > headers.len() {
                return Err(DataError::CsvParse(format!(
                    "Row {}: expected {} fields, got {}",
                    line + 1,
                    headers.len(),
                    row.len()
                )));
            }
            for (i, builder) in builders.iter_mut().enumerate() {
                builder.push(row.get(i).map(|cell| cell.as_ref().to_string()));
            }
        }
        let columns: Result<Vec<(String, Column)>> = headers
            .iter()
            .zip(builders)
            .map(|(header, builder)| Ok((header.as_ref().to_string(), builder.build()?)))
            .collect();
        Self::from_columns(name, columns?)
    }
    fn add_column(&mut self, name: String, column: Column) -> Result<()> {
        if let Some(first) = self.column_order.first() {
            let expected = self.columns[first].len();
            if column.len() != expected {
                return Err(DataError::LengthMismatch {
                    expected,
                    found: column.len(),
                });
            }
        }
        if !self.columns.contains_key(&name) {
            self.column_order.push(name.clone());
        }
        self.metadata.row_count = column.len();
        self.columns.insert(name, Arc::new(column));
        self.metadata.column_count = self.column_order.len();
        Ok(())
    }
    /// Returns a copy with `column` added, replacing any same-named column in
    /// place.
    pub fn with_column(&self, name: impl Into<String>, column: Column) -> Result<Dataset> {
        let mut result = self.clone();
        result.metadata = self.metadata.derived("derived");
        result.metadata.row_count = self.row_count();
        result.metadata.column_count = self.column_count();
        result.add_column(name.into(), column)?;
        Ok(result)
    }
    pub fn row_count(&self) -> usize {
        self.metadata.row_count
    }
    pub fn column_count(&self) -> usize {
        self.column_order.len()
    }
    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }
    pub fn column_names(&self) -> &[String] {
        &self.column_order
    }
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name).map(|arc| arc.as_ref())
    }
    pub fn require_column(&self, name: &str) -> Result<&Column> {
        self.column(name)
            .ok_or_else(|| DataError::ColumnNotFound(name.to_string()))
    }
    pub fn column_metadata(&self) -> Vec<ColumnMetadata> {
        self.column_order
            .iter()
            .map(|name| {
                let column = &self.columns[name];
                ColumnMetadata {
                    name: name.clone(),
                    data_type: column.data_type(),
                    null_count: column.null_count(),
                }
            })
            .collect()
    }
    pub fn select<S: AsRef<str>>(&self, column_names: &[S]) -> Result<Dataset> {
        let mut result = Dataset::new(self.metadata.derived("selected"));
        for name in column_names {
            let name = name.as_ref();
            let column = self
                .columns
                .get(name)
                .ok_or_else(|| DataError::ColumnNotFound(name.to_string()))?;
            if result.has_column(name) {
                continue;
            }
            result.column_order.push(name.to_string());
            result.columns.insert(name.to_string(), Arc::clone(column));
        }
        result.metadata.row_count = self.row_count();
        result.metadata.column_count = result.column_order.len();
        Ok(result)
    }
    pub fn select_rows(&self, indices: &[usize]) -> Result<Dataset> {
        let mut result = Dataset::new(self.metadata.derived("rows"));
        for name in &self.column_order {
            let column = self.columns[name].select_rows(indices)?;
            result.add_column(name.clone(), column)?;
        }
        result.metadata.row_count = indices.len();
        Ok(result)
    }
    pub fn filter<P>(&self, predicate: P) -> Result<Dataset>
    where
        P: Fn(usize) -> bool,
    {
        let indices: Vec<usize> = (0..self.row_count()).filter(|&i| predicate(i)).collect();
        self.select_rows(&indices)
    }
    /// Keeps only rows where every column in `subset` holds a value.
    pub fn drop_nulls<S: AsRef<str>>(&self, subset: &[S]) -> Result<Dataset> {
        let columns: Result<Vec<&Column>> = subset
            .iter()
            .map(|name| self.require_column(name.as_ref()))
            .collect();
        let columns = columns?;
        self.filter(|i| columns.iter().all(|column| !column.is_null(i)))
    }
    /// Stable sort on one column. Nulls go last in either direction.
    pub fn sort_by(&self, column_name: &str, ascending: bool) -> Result<Dataset> {
        let column = self.require_column(column_name)?;
        let mut indices: Vec<usize> = (0..self.row_count()).collect();
        indices.sort_by(|&a, &b| match column.is_null(a).cmp(&column.is_null(b)) {
            Ordering::Equal if ascending => column.compare_rows(a, b),
            Ordering::Equal => column.compare_rows(a, b).reverse(),
            nulls_last => nulls_last,
        });
        self.select_rows(&indices)
    }
    /// One row as `(column, stored representation)` pairs, in column order.
    pub fn row(&self, index: usize) -> Vec<(&str, Option<String>)> {
        self.column_order
            .iter()
            .map(|name| (name.as_str(), self.columns[name].get_string(index)))
            .collect()
    }
    /// The first `limit` rows as JSON objects keyed by column name, for
    /// embedding a data sample in a prompt.
    pub fn to_records(&self, limit: usize) -> Vec<serde_json::Map<String, serde_json::Value>> {
        (0..self.row_count().min(limit))
            .map(|row| {
                self.column_order
                    .iter()
                    .map(|name| (name.clone(), self.columns[name].to_json(row)))
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::from_columns(
            "sample",
            vec![
                ("Region", Column::from(vec![Some("West"), None, Some("East")])),
                ("Sales", Column::from(vec![Some(10.0), Some(5.0), None])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn rejects_ragged_and_duplicate_columns() {
        let ragged = Dataset::from_columns(
            "ragged",
            vec![
                ("a", Column::from(vec![1_i64, 2])),
                ("b", Column::from(vec![1_i64])),
            ],
        );
        assert!(matches!(ragged, Err(DataError::LengthMismatch { expected: 2, found: 1 })));
        let duplicate = Dataset::from_columns(
            "dup",
            vec![
                ("a", Column::from(vec![1_i64])),
                ("a", Column::from(vec![2_i64])),
            ],
        );
        assert!(matches!(duplicate, Err(DataError::DuplicateColumn(_))));
    }

    #[test]
    fn with_column_leaves_source_untouched() {
        let source = sample();
        let derived = source
            .with_column("Sales", Column::from(vec![1.0, 2.0, 3.0]))
            .unwrap();
        assert_eq!(source.column("Sales").unwrap().to_f64(0), Some(10.0));
        assert_eq!(derived.column("Sales").unwrap().to_f64(0), Some(1.0));
        assert_eq!(derived.column_names(), source.column_names());
    }

    #[test]
    fn drop_nulls_checks_only_the_subset() {
        let source = sample();
        assert_eq!(source.drop_nulls(&["Region"]).unwrap().row_count(), 2);
        assert_eq!(source.drop_nulls(&["Region", "Sales"]).unwrap().row_count(), 1);
    }

    #[test]
    fn sort_keeps_nulls_last_both_ways() {
        let source = sample();
        let asc = source.sort_by("Region", true).unwrap();
        let desc = source.sort_by("Region", false).unwrap();
        let regions = |d: &Dataset| {
            (0..d.row_count())
                .map(|i| d.column("Region").unwrap().get_string(i))
                .collect::<Vec<_>>()
        };
        assert_eq!(regions(&asc), vec![Some("East".into()), Some("West".into()), None]);
        assert_eq!(regions(&desc), vec![Some("West".into()), Some("East".into()), None]);
    }

    #[test]
    fn records_keep_column_order_and_nulls() {
        let records = sample().to_records(2);
        assert_eq!(records.len(), 2);
        let keys: Vec<&String> = records[0].keys().collect();
        assert_eq!(keys.len(), 2);
        assert_eq!(records[1]["Region"], serde_json::Value::Null);
        assert_eq!(records[0]["Sales"], serde_json::json!(10.0));
    }
}
