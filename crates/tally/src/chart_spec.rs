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

use crate::data_handler::Dataset;
use crate::error::{ResolutionError, ResolutionResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    Scatter,
    Line,
    Pie,
}

impl ChartType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Bar => "bar",
            ChartType::Scatter => "scatter",
            ChartType::Line => "line",
            ChartType::Pie => "pie",
        }
    }
}

impl FromStr for ChartType {
    type Err = ResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bar" => Ok(ChartType::Bar),
            "scatter" => Ok(ChartType::Scatter),
            "line" => Ok(ChartType::Line),
            "pie" => Ok(ChartType::Pie),
            other => Err(ResolutionError::not_buildable(format!(
                "Unsupported chart type: {other}"
            ))),
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chart request exactly as the text generator wrote it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRequest {
    #[serde(alias = "type")]
    pub chart_type: String,
    pub x: String,
    pub y: Value,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum YAxis {
    Column { name: String },
    /// `numerator/denominator`, materialised as a column named `expression`.
    Ratio {
        numerator: String,
        denominator: String,
        expression: String,
    },
    Series { columns: Vec<String> },
}

impl YAxis {
    pub fn parse(value: &Value) -> ResolutionResult<Self> {
        match value {
            Value::String(s) if s.contains('/') => {
                let parts: Vec<&str> = s.split('/').map(str::trim).collect();
                match parts.as_slice() {
                    [numerator, denominator] if !numerator.is_empty() && !denominator.is_empty() => {
                        Ok(YAxis::Ratio {
                            numerator: numerator.to_string(),
                            denominator: denominator.to_string(),
                            expression: s.clone(),
                        })
                    }
                    _ => Err(ResolutionError::not_buildable(format!(
                        "Ratio '{s}' must name exactly two columns"
                    ))),
                }
            }
            Value::String(s) if s.trim().is_empty() => {
                Err(ResolutionError::malformed("y axis is empty"))
            }
            Value::String(s) => Ok(YAxis::Column { name: s.clone() }),
            Value::Array(items) if !items.is_empty() => {
                let columns = items
                    .iter()
                    .map(|item| {
                        item.as_str()
                            .map(str::to_string)
                            .ok_or_else(|| ResolutionError::malformed(format!("y series entry {item} is not a column name")))
                    })
                    .collect::<ResolutionResult<Vec<_>>>()?;
                Ok(YAxis::Series { columns })
            }
            other => Err(ResolutionError::malformed(format!(
                "y must be a column name or a list of column names, got {other}"
            ))),
        }
    }
    /// Working columns holding y values once the chart is prepared.
    pub fn value_columns(&self) -> Vec<&str> {
        match self {
            YAxis::Column { name } => vec![name.as_str()],
            YAxis::Ratio { expression, .. } => vec![expression.as_str()],
            YAxis::Series { columns } => columns.iter().map(String::as_str).collect(),
        }
    }
    pub fn label(&self) -> String {
        match self {
            YAxis::Column { name } => name.clone(),
            YAxis::Ratio { expression, .. } => expression.clone(),
            YAxis::Series { columns } => columns.join(", "),
        }
    }
    pub fn is_multi_series(&self) -> bool {
        matches!(self, YAxis::Series { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub chart_type: ChartType,
    pub x: String,
    pub y: YAxis,
    pub title: String,
}

impl ChartSpec {
    pub fn new(chart_type: ChartType, x: impl Into<String>, y: YAxis, title: impl Into<String>) -> Self {
        Self {
            chart_type,
            x: x.into(),
            y,
            title: title.into(),
        }
    }
    pub fn from_json(value: Value) -> ResolutionResult<Self> {
        let request: ChartRequest = serde_json::from_value(value)
            .map_err(|e| ResolutionError::malformed(e.to_string()))?;
        Self::try_from(request)
    }
    /// Checks that every named column exists verbatim. A request is expected
    /// to echo real column names, so no fuzzy matching happens here.
    pub fn validate_columns(&self, dataset: &Dataset) -> ResolutionResult<()> {
        let require = |name: &str| {
            if dataset.has_column(name) {
                Ok(())
            } else {
                Err(ResolutionError::column_not_found(name))
            }
        };
        require(&self.x)?;
        match &self.y {
            YAxis::Column { name } => require(name),
            YAxis::Ratio {
                numerator,
                denominator,
                ..
            } => {
                require(numerator)?;
                require(denominator)
            }
            YAxis::Series { columns } => columns.iter().try_for_each(|c| require(c)),
        }
    }
}

impl TryFrom<ChartRequest> for ChartSpec {
    type Error = ResolutionError;

    fn try_from(request: ChartRequest) -> Result<Self, Self::Error> {
        let chart_type: ChartType = request.chart_type.parse()?;
        if request.x.trim().is_empty() {
            return Err(ResolutionError::malformed("x axis is empty"));
        }
        Ok(Self {
            chart_type,
            x: request.x,
            y: YAxis::parse(&request.y)?,
            title: request.title,
        })
    }
}
