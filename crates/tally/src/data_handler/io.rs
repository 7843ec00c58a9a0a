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

use crate::data_handler::column::ColumnBuilder;
use crate::data_handler::common::{DataError, DatasetMetadata, Result};
use crate::data_handler::dataframe::Dataset;
use std::io::Read;
use std::path::Path;
use tracing::debug;

const MAX_FIELDS: usize = 10_000;

#[derive(Debug, Clone)]
pub struct CsvReader {
    has_headers: bool,
    delimiter: u8,
    flexible: bool,
}

impl Default for CsvReader {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvReader {
    pub fn new() -> Self {
        Self {
            has_headers: true,
            delimiter: b',',
            flexible: true,
        }
    }
    pub fn with_headers(mut self, has_headers: bool) -> Self {
        self.has_headers = has_headers;
        self
    }
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
    /// Rejects records whose field count differs from the header.
    pub fn strict(mut self) -> Self {
        self.flexible = false;
        self
    }
    pub fn read_file(&self, path: &Path, dataset_name: &str) -> Result<Dataset> {
        let reader = self.builder().from_path(path)?;
        let mut dataset = self.read_records(reader, dataset_name)?;
        dataset.metadata.source_path = Some(path.to_path_buf());
        debug!(
            path = %path.display(),
            rows = dataset.row_count(),
            columns = dataset.column_count(),
            "Loaded CSV dataset"
        );
        Ok(dataset)
    }
    pub fn read_str(&self, content: &str, dataset_name: &str) -> Result<Dataset> {
        let reader = self.builder().from_reader(content.as_bytes());
        self.read_records(reader, dataset_name)
    }
    fn builder(&self) -> csv::ReaderBuilder {
        let mut builder = csv::ReaderBuilder::new();
        builder
            .has_headers(self.has_headers)
            .delimiter(self.delimiter)
            .flexible(self.flexible)
            .trim(csv::Trim::Headers);
        builder
    }
    fn read_records<R: Read>(&self, mut reader: csv::Reader<R>, dataset_name: &str) -> Result<Dataset> {
        let mut rows: Vec<csv::StringRecord> = Vec::new();
        for record in reader.records() {
            rows.push(record?);
        }
        let headers: Vec<String> = if self.has_headers {
            reader.headers()?.iter().map(str::to_string).collect()
        } else {
            let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
            (0..width).map(|i| format!("column_{i}")).collect()
        };
        if headers.len() > MAX_FIELDS {
            return Err(DataError::CsvParse(format!(
                "Header has {} fields, limit is {MAX_FIELDS}",
                headers.len()
            )));
        }
        let mut builders: Vec<ColumnBuilder> = headers
            .iter()
            .map(|_| ColumnBuilder::with_capacity(rows.len()))
            .collect();
        for (line, record) in rows.iter().enumerate() {
            if record.len() > headers.len() {
                return Err(DataError::CsvParse(format!(
                    "Row {}: expected {} fields, got {}",
                    line + 1,
                    headers.len(),
                    record.len()
                )));
            }
            for (i, builder) in builders.iter_mut().enumerate() {
                builder.push(record.get(i).map(str::to_string));
            }
        }
        let mut columns = Vec::with_capacity(headers.len());
        for (header, builder) in headers.into_iter().zip(builders) {
            columns.push((header, builder.build()?));
        }
        let mut dataset = Dataset::from_columns(dataset_name, columns)?;
        dataset.metadata = DatasetMetadata {
            row_count: rows.len(),
            column_count: dataset.column_count(),
            ..DatasetMetadata::named(dataset_name)
        };
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_handler::common::DataType;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn reads_quoted_fields_and_infers_types() {
        let csv = "Region,Sales,Customer Name\nWest,100,\"Doe, Jane\"\nEast,250.5,Smith\n";
        let dataset = CsvReader::new().read_str(csv, "orders").unwrap();
        assert_eq!(dataset.row_count(), 2);
        assert_eq!(dataset.column("Sales").unwrap().data_type(), DataType::Float64);
        assert_eq!(
            dataset.column("Customer Name").unwrap().get_string(0),
            Some("Doe, Jane".to_string())
        );
    }

    #[test]
    fn short_rows_are_padded_with_nulls() {
        let csv = "a,b\n1,2\n3\n";
        let dataset = CsvReader::new().read_str(csv, "ragged").unwrap();
        assert_eq!(dataset.row_count(), 2);
        assert!(dataset.column("b").unwrap().is_null(1));
    }

    #[test]
    fn reads_from_disk_and_records_source() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Order Date,Sales").unwrap();
        writeln!(file, "2024-01-02,10").unwrap();
        let dataset = CsvReader::new().read_file(file.path(), "disk").unwrap();
        assert_eq!(dataset.metadata.source_path.as_deref(), Some(file.path()));
        assert_eq!(
            dataset.column("Order Date").unwrap().data_type(),
            DataType::Datetime
        );
    }

    #[test]
    fn missing_file_is_a_parse_error() {
        let err = CsvReader::new()
            .read_file(Path::new("/definitely/not/here.csv"), "missing")
            .unwrap_err();
        assert!(matches!(err, DataError::CsvParse(_)));
    }
}
