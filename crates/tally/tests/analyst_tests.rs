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

use tally::llm::{GenerationError, GenerationResult, ScriptedGenerator};
use tally::{InsightAnalyst, KpiValue, MetricEngine};

const KPI_RESPONSE: &str = r#"Here are three KPIs:
```json
[
  {"name": "Total Sales", "operation": "SUM", "aggregation_map": {"Sales": "SUM"}},
  {"name": "Average Order Value", "operation": "RATIO",
   "aggregation_map": {"Sales": "SUM", "Order ID": "COUNT"}},
  {"name": "Customer Count", "operation": "COUNT_DISTINCT",
   "aggregation_map": {"Customer ID": "COUNT_DISTINCT"}}
]
```"#;

#[test]
fn test_propose_kpis_from_scripted_response() {
    let analyst = InsightAnalyst::new(ScriptedGenerator::new([KPI_RESPONSE]), MetricEngine::new());
    let results = analyst.propose_kpis(&common::sales(), "propose KPIs");
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].value, KpiValue::Number(1000.0));
    assert_eq!(results[1].value, KpiValue::Number(50.0));
    assert!(results[2].is_failed());
    assert!(results.iter().all(|r| r.benchmark.is_some()));
}

#[test]
fn test_closure_generator_sees_prompt() {
    let generator = |prompt: &str| -> GenerationResult<String> {
        Ok(format!(
            r#"{{"chart_type": "bar", "x": "Region", "y": "Sales", "title": "{prompt}"}}"#
        ))
    };
    let analyst = InsightAnalyst::new(generator, MetricEngine::new());
    let outcome = analyst.chart_for(&common::sales(), "Sales overview");
    let figure = outcome.figure().unwrap();
    assert_eq!(figure.title, "Sales overview");
    assert_eq!(figure.traces[0].y, vec![500.0, 500.0]);
}

#[test]
fn test_generator_failure_degrades_gracefully() {
    let generator = |_: &str| -> GenerationResult<String> { Err(GenerationError::Timeout { seconds: 30 }) };
    let analyst = InsightAnalyst::new(generator, MetricEngine::new());
    let data = common::sales();
    assert!(analyst.propose_kpis(&data, "kpis").is_empty());
    assert!(analyst.insights("insights").is_empty());
    assert!(!analyst.chart_for(&data, "chart").is_built());
    assert!(analyst.consult(&data, "hello").is_none());
}

#[test]
fn test_unusable_chart_response_is_not_buildable() {
    let analyst = InsightAnalyst::new(
        ScriptedGenerator::new(["I cannot draw that.", "{\"chart_type\": \"bar\", \"x\": \"Region\"}"]),
        MetricEngine::new(),
    );
    let data = common::sales();
    assert!(!analyst.chart_for(&data, "first").is_built());
    assert!(!analyst.chart_for(&data, "second").is_built());
    assert!(!analyst.chart_for(&data, "exhausted").is_built());
}

#[test]
fn test_insights_each_get_a_chart() {
    let insights = r#"[
        {"decision": "Grow West", "observation": "West trails on profit"},
        {"decision": "Cut discounts", "observation": "Discounts rose in February"}
    ]"#;
    let analyst = InsightAnalyst::new(
        ScriptedGenerator::new([
            insights,
            r#"{"chart_type": "bar", "x": "Region", "y": "Profit", "title": "Profit"}"#,
            r#"{"chart_type": "line", "x": "Month Date", "y": "Discount", "title": "Discount"}"#,
        ]),
        MetricEngine::new(),
    );
    let charted = analyst.insights_with_charts(&common::sales(), "insights", |insight| {
        format!("Chart for: {}", insight.headline().unwrap_or_default())
    });
    assert_eq!(charted.len(), 2);
    assert_eq!(charted[0].0.headline(), Some("Grow West"));
    assert!(charted[0].1.is_built());
    let discount = charted[1].1.figure().unwrap();
    assert_eq!(discount.point_count(), 2);
}

#[test]
fn test_consult_strips_fences_and_charts_instruction() {
    let analyst = InsightAnalyst::new(
        ScriptedGenerator::new(["```json\nDiscount vs Profit\n```", "Let's plot Discount vs Profit"]),
        MetricEngine::new(),
    );
    let consultation = analyst.consult(&common::sales(), "what next?").unwrap();
    assert_eq!(consultation.reply, "Discount vs Profit");
    let figure = consultation.chart.unwrap().into_figure().unwrap();
    assert_eq!(figure.title, "Profit vs Discount");
    assert_eq!(figure.point_count(), 20);
    let prose = analyst.consult(&common::sales(), "and now?").unwrap();
    assert!(prose.chart.is_none());
}
