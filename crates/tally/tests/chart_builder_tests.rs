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

use serde_json::json;
use tally::{BarMode, ChartOutcome, ChartSpec, MetricEngine, ResolutionError};

fn spec(value: serde_json::Value) -> ChartSpec {
    ChartSpec::from_json(value).unwrap()
}

fn build(value: serde_json::Value) -> ChartOutcome {
    MetricEngine::new().build_chart(&common::sales(), &spec(value))
}

#[test]
fn test_bar_groups_and_sorts_by_x() {
    let outcome = build(json!({"chart_type": "bar", "x": "Region", "y": "Profit", "title": "Total profit"}));
    let figure = outcome.figure().unwrap();
    assert_eq!(figure.traces.len(), 1);
    assert_eq!(figure.traces[0].x, vec![json!("East"), json!("West")]);
    assert_eq!(figure.traces[0].y, vec![100.0, 90.0]);
    assert_eq!(figure.color_label, None);
}

#[test]
fn test_region_title_with_two_rows_per_region() {
    let data = common::small(
        &["Region", "Profit"],
        &[&["West", "4"], &["East", "1"], &["West", "6"], &["East", "2"]],
    );
    let request = spec(json!({"chart_type": "bar", "x": "Region", "y": "Profit", "title": "Average profit by Region"}));
    let engine = MetricEngine::new();
    let prepared = engine.chart_builder().prepare(&data, &request).unwrap();
    assert_eq!(prepared.table.row_count(), 2);
    assert_eq!(prepared.color, None);
    let figure = engine.build_chart(&data, &request).figure().cloned().unwrap();
    assert_eq!(figure.traces[0].x, vec![json!("East"), json!("West")]);
    assert_eq!(figure.traces[0].y, vec![3.0, 10.0]);
    assert_eq!(figure.color_label, None);
}

#[test]
fn test_missing_date_axis_is_not_buildable() {
    let outcome = build(json!({"chart_type": "line", "x": "Ship Date", "y": "Sales", "title": "Shipping"}));
    assert!(!outcome.is_built());
    assert_eq!(outcome.reason(), Some("Column 'Ship Date' not in dataset"));
}

#[test]
fn test_title_keyword_adds_colour_grouping() {
    let outcome = build(json!({"chart_type": "bar", "x": "Region", "y": "Sales", "title": "Sales by category"}));
    let figure = outcome.figure().unwrap();
    assert_eq!(figure.color_label.as_deref(), Some("Category"));
    assert_eq!(figure.traces.len(), 2);
    assert_eq!(figure.point_count(), 4);
    assert_eq!(figure.trace("Furniture").unwrap().y, vec![250.0, 250.0]);
}

#[test]
fn test_line_over_dates_buckets_by_month() {
    let outcome = build(json!({"type": "line", "x": "Order Date", "y": "Sales", "title": "Monthly sales"}));
    let figure = outcome.figure().unwrap();
    assert_eq!(figure.traces[0].y, vec![500.0, 500.0]);
    assert_eq!(figure.to_plotly_json()["data"][0]["mode"], "lines");
}

#[test]
fn test_ratio_axis_is_derived() {
    let outcome = build(json!({"chart_type": "bar", "x": "Region", "y": "Profit/Sales", "title": "Margin"}));
    let figure = outcome.figure().unwrap();
    assert_eq!(figure.y_label, "Profit/Sales");
    let east = figure.traces[0].y[0];
    assert!((east - 2.0).abs() < 1e-9);
}

#[test]
fn test_ratio_with_missing_operand_is_not_buildable() {
    let data = common::small(&["Region", "Profit"], &[&["West", "1"], &["East", "2"]]);
    let request = spec(json!({"chart_type": "bar", "x": "Region", "y": "Profit/Sales", "title": "Margin"}));
    let outcome = MetricEngine::new().build_chart(&data, &request);
    assert!(!outcome.is_built());
    assert!(outcome.reason().unwrap().contains("derived y is missing"));
}

#[test]
fn test_multi_series_melts_to_long_form() {
    let data = common::small(
        &["Month", "Sales", "Profit"],
        &[&["Mar", "30", "3"], &["Jan", "10", "1"], &["Feb", "20", "2"]],
    );
    let request = spec(json!({"chart_type": "bar", "x": "Month", "y": ["Sales", "Profit"], "title": "Trend"}));
    let engine = MetricEngine::new();
    let prepared = engine.chart_builder().prepare(&data, &request).unwrap();
    assert_eq!(prepared.table.row_count(), 6);
    assert_eq!(prepared.color.as_deref(), Some("Series"));
    let figure = engine.build_chart(&data, &request).into_figure().unwrap();
    assert_eq!(figure.bar_mode, Some(BarMode::Group));
    assert_eq!(figure.traces.len(), 2);
    assert_eq!(figure.trace("Sales").unwrap().x, vec![json!("Feb"), json!("Jan"), json!("Mar")]);
    assert_eq!(figure.trace("Profit").unwrap().y, vec![2.0, 1.0, 3.0]);
}

#[test]
fn test_pie_rejects_multi_series() {
    let outcome = build(json!({"chart_type": "pie", "x": "Region", "y": ["Sales", "Profit"], "title": "Share"}));
    assert_eq!(outcome.reason(), Some("Multi-series not supported for pie charts"));
}

#[test]
fn test_unknown_chart_type_and_missing_column() {
    assert!(matches!(
        ChartSpec::from_json(json!({"chart_type": "radar", "x": "Region", "y": "Sales"})),
        Err(ResolutionError::NotBuildable { .. })
    ));
    let outcome = build(json!({"chart_type": "bar", "x": "Segment", "y": "Sales", "title": "t"}));
    assert_eq!(outcome.reason(), Some("Column 'Segment' not in dataset"));
}

#[test]
fn test_outcome_serialises_with_status() {
    let outcome = build(json!({"chart_type": "bar", "x": "Segment", "y": "Sales"}));
    let value = serde_json::to_value(&outcome).unwrap();
    assert_eq!(value["status"], "not_buildable");
    assert_eq!(value["reason"], "Column 'Segment' not in dataset");
}

#[test]
fn test_kpi_comparison_figure() {
    let engine = MetricEngine::new();
    let results = engine.resolve_kpis_from_text(
        &common::sales(),
        r#"[{"name": "Revenue", "operation": "SUM", "aggregation_map": {"Sales": "SUM"}},
            {"name": "Bad", "operation": "SUM", "aggregation_map": {"Nope": "SUM"}}]"#,
    );
    let figure = engine.kpi_comparison(&results);
    assert_eq!(figure.title, "KPI Comparison");
    assert_eq!(figure.trace("Company").unwrap().y, vec![1000.0]);
    assert_eq!(figure.trace("Benchmark").unwrap().y, vec![1100.0]);
    assert_eq!(figure.to_plotly_json()["layout"]["barmode"], "group");
}
