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

mod common;

use std::io::Write;
use tally::config::EngineConfig;
use tally::data_handler::DateBucket;
use tally::{ConfigError, KpiValue, KpiDefinition, MetricEngine, ResolverStrategy, TallyError};

fn yaml_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_partial_yaml_overrides_defaults() {
    let config = EngineConfig::from_yaml_str("kpi:\n  decimals: 0\nchart:\n  date_bucket: year\n").unwrap();
    assert_eq!(config.kpi.decimals, 0);
    assert_eq!(config.kpi.benchmark_multiplier, 1.1);
    assert_eq!(config.chart.date_bucket, DateBucket::Year);
    assert_eq!(config.resolver, ResolverStrategy::Substring);
}

#[test]
fn test_invalid_values_are_rejected() {
    assert!(matches!(
        EngineConfig::from_yaml_str("kpi:\n  decimals: 11\n"),
        Err(ConfigError::InvalidValue { .. })
    ));
    assert!(matches!(
        EngineConfig::from_yaml_str("chart:\n  series_name: Value\n"),
        Err(ConfigError::InvalidValue { .. })
    ));
    assert!(matches!(
        EngineConfig::from_yaml_str("kpi: [1, 2]"),
        Err(ConfigError::ParseFailed { .. })
    ));
}

#[test]
fn test_engine_from_yaml_file() {
    let file = yaml_file("resolver: exact\nkpi:\n  benchmark_multiplier: 2.0\n  failure_marker: FAILED\n");
    let engine = MetricEngine::from_yaml_file(file.path()).unwrap();
    let data = common::sales();
    let results = engine.resolve_kpis(
        &data,
        &[
            KpiDefinition::new("Revenue", "SUM").with_aggregation("Sales", "SUM"),
            KpiDefinition::new("Fuzzy", "SUM").with_aggregation("sales", "SUM"),
        ],
    );
    assert_eq!(results[0].value, KpiValue::Number(1000.0));
    assert_eq!(results[0].benchmark.as_ref().and_then(|b| b.as_number()), Some(2000.0));
    assert_eq!(results[1].value, KpiValue::Failed("FAILED".to_string()));
}

#[test]
fn test_missing_config_file_is_io_error() {
    assert!(matches!(
        MetricEngine::from_yaml_file("/nonexistent/tally.yaml"),
        Err(TallyError::Io(_))
    ));
}

#[test]
fn test_yaml_round_trip() {
    let config = EngineConfig::default();
    let text = config.to_yaml().unwrap();
    assert_eq!(EngineConfig::from_yaml_str(&text).unwrap(), config);
}

#[test]
fn test_csv_loading_through_engine() {
    let file = yaml_file("Region,Sales\nWest,10\nEast,\n");
    let engine = MetricEngine::new();
    let data = engine.load_csv(file.path()).unwrap();
    assert_eq!(data.row_count(), 2);
    let profile = engine.profile(&data);
    assert_eq!(profile[1].null_count, 1);
}
