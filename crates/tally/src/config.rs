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

use crate::data_handler::DateBucket;
use crate::error::{ConfigError, ConfigResult, Result};
use crate::resolver::ResolverStrategy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

pub const FAILURE_MARKER: &str = "❌";
pub const NOT_APPLICABLE_MARKER: &str = "N/A";

/// Engine settings. Every field has a default, so a YAML file only needs the
/// keys it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub resolver: ResolverStrategy,
    pub kpi: KpiConfig,
    pub chart: ChartConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KpiConfig {
    pub decimals: u32,
    pub benchmark_multiplier: f64,
    pub failure_marker: String,
    pub not_applicable_marker: String,
}

impl Default for KpiConfig {
    fn default() -> Self {
        Self {
            decimals: 2,
            benchmark_multiplier: 1.1,
            failure_marker: FAILURE_MARKER.to_string(),
            not_applicable_marker: NOT_APPLICABLE_MARKER.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Title words that switch on a colour grouping column.
    pub grouping_keywords: Vec<String>,
    /// Columns tried, in order, as the colour grouping column.
    pub grouping_candidates: Vec<String>,
    /// Substrings of an x column name that mark it as a date.
    pub date_hints: Vec<String>,
    pub date_bucket: DateBucket,
    pub series_name: String,
    pub value_name: String,
    pub layout: LayoutConfig,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            grouping_keywords: ["category", "segment", "region", "state"]
                .map(String::from)
                .to_vec(),
            grouping_candidates: ["Category", "Sub-Category", "Segment", "Region", "State"]
                .map(String::from)
                .to_vec(),
            date_hints: vec!["date".to_string()],
            date_bucket: DateBucket::Month,
            series_name: "Series".to_string(),
            value_name: "Value".to_string(),
            layout: LayoutConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub x_tick_angle: i32,
    pub margin_left: u32,
    pub margin_right: u32,
    pub margin_top: u32,
    pub margin_bottom: u32,
    pub plot_background: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            x_tick_angle: -45,
            margin_left: 40,
            margin_right: 40,
            margin_top: 60,
            margin_bottom: 120,
            plot_background: "rgba(0,0,0,0)".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let config: EngineConfig =
            serde_yaml::from_str(content).map_err(|e| ConfigError::ParseFailed {
                reason: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config = Self::from_yaml_str(&content)?;
        info!(path = %path.as_ref().display(), "Loaded engine configuration");
        Ok(config)
    }
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| crate::error::SerialisationError::from(e).into())
    }
    pub fn validate(&self) -> ConfigResult<()> {
        if self.kpi.decimals > 10 {
            return Err(ConfigError::InvalidValue {
                field: "kpi.decimals".to_string(),
                value: self.kpi.decimals.to_string(),
            });
        }
        if !self.kpi.benchmark_multiplier.is_finite() {
            return Err(ConfigError::InvalidValue {
                field: "kpi.benchmark_multiplier".to_string(),
                value: self.kpi.benchmark_multiplier.to_string(),
            });
        }
        if self.kpi.failure_marker.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "kpi.failure_marker".to_string(),
            });
        }
        if self.chart.series_name.is_empty() || self.chart.value_name.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "chart.series_name / chart.value_name".to_string(),
            });
        }
        if self.chart.series_name == self.chart.value_name {
            return Err(ConfigError::InvalidValue {
                field: "chart.value_name".to_string(),
                value: self.chart.value_name.clone(),
            });
        }
        Ok(())
    }
}
