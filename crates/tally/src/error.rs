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

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TallyError {
    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),
    #[error("Data error: {0}")]
    Data(#[from] DataError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialisation error: {0}")]
    Serialisation(#[from] SerialisationError),
    #[error("Text generation error: {0}")]
    Generation(#[from] GenerationError),
}

/// Failures raised while turning a metric definition or chart request into a
/// concrete result. These are always contained at the granularity of a single
/// KPI or a single chart.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolutionError {
    #[error("Column '{reference}' not found")]
    ColumnNotFound { reference: String },
    #[error("Unsupported aggregation: {kind}")]
    UnsupportedAggregation { kind: String },
    #[error("Unsupported operation: {operation}")]
    UnsupportedOperation { operation: String },
    #[error("Operation {operation} takes {expected} aggregate(s), got {found}")]
    ArityMismatch {
        operation: String,
        expected: usize,
        found: usize,
    },
    #[error("Column '{column}' holds {found} values, expected {expected}")]
    TypeMismatch {
        column: String,
        expected: String,
        found: String,
    },
    #[error("Column '{column}' has no non-null values to aggregate")]
    EmptySelection { column: String },
    #[error("Malformed specification: {reason}")]
    MalformedSpecification { reason: String },
    #[error("Chart cannot be built: {reason}")]
    NotBuildable { reason: String },
    #[error(transparent)]
    Data(#[from] DataError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("Column not found: {0}")]
    ColumnNotFound(String),
    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),
    #[error("Column length mismatch: expected {expected}, got {found}")]
    LengthMismatch { expected: usize, found: usize },
    #[error("Type mismatch in column '{column}': {details}")]
    TypeMismatch { column: String, details: String },
    #[error("Index out of bounds: {0}")]
    OutOfBounds(usize),
    #[error("CSV parse error: {0}")]
    CsvParse(String),
    #[error("Parse error: {0}")]
    Parse(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid configuration: {field} = {value}")]
    InvalidValue { field: String, value: String },
    #[error("Missing required configuration: {field}")]
    MissingRequired { field: String },
    #[error("Failed to parse configuration: {reason}")]
    ParseFailed { reason: String },
}

#[derive(Error, Debug)]
pub enum SerialisationError {
    #[error("JSON serialisation failed: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
    #[error("YAML serialisation failed: {source}")]
    Yaml {
        #[from]
        source: serde_yaml::Error,
    },
}

/// Errors surfaced by the injected text-generation collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Timeout error: request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },
    #[error("Empty response from generator")]
    EmptyResponse,
}

pub type Result<T> = std::result::Result<T, TallyError>;
pub type ResolutionResult<T> = std::result::Result<T, ResolutionError>;
pub type DataResult<T> = std::result::Result<T, DataError>;
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
pub type GenerationResult<T> = std::result::Result<T, GenerationError>;

impl From<serde_json::Error> for TallyError {
    fn from(err: serde_json::Error) -> Self {
        TallyError::Serialisation(SerialisationError::Json { source: err })
    }
}

impl From<csv::Error> for DataError {
    fn from(err: csv::Error) -> Self {
        DataError::CsvParse(err.to_string())
    }
}

impl ResolutionError {
    pub fn not_buildable(reason: impl Into<String>) -> Self {
        ResolutionError::NotBuildable {
            reason: reason.into(),
        }
    }
    pub fn column_not_found(reference: impl Into<String>) -> Self {
        ResolutionError::ColumnNotFound {
            reference: reference.into(),
        }
    }
    pub fn malformed(reason: impl Into<String>) -> Self {
        ResolutionError::MalformedSpecification {
            reason: reason.into(),
        }
    }
    pub fn kind(&self) -> &'static str {
        match self {
            ResolutionError::ColumnNotFound { .. } => "ColumnNotFound",
            ResolutionError::UnsupportedAggregation { .. } => "UnsupportedAggregation",
            ResolutionError::UnsupportedOperation { .. } => "UnsupportedOperation",
            ResolutionError::ArityMismatch { .. } => "ArityMismatch",
            ResolutionError::TypeMismatch { .. } => "TypeMismatch",
            ResolutionError::EmptySelection { .. } => "EmptySelection",
            ResolutionError::MalformedSpecification { .. } => "MalformedSpecification",
            ResolutionError::NotBuildable { .. } => "NotBuildable",
            ResolutionError::Data(_) => "Data",
        }
    }
}

impl TallyError {
    pub fn category(&self) -> &'static str {
        match self {
            TallyError::Resolution(_) => "Resolution",
            TallyError::Data(_) => "Data",
            TallyError::Config(_) => "Configuration",
            TallyError::Io(_) => "I/O",
            TallyError::Serialisation(_) => "Serialisation",
            TallyError::Generation(_) => "Generation",
        }
    }
    pub fn user_message(&self) -> String {
        match self {
            TallyError::Data(DataError::CsvParse(_)) => {
                "The dataset could not be read. Please check the CSV file.".to_string()
            }
            TallyError::Config(_) => {
                "Unable to load engine configuration. Please check the configuration file."
                    .to_string()
            }
            _ => self.to_string(),
        }
    }
}
