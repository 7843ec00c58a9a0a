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

//! Renderable figures in a plotly-compatible shape.

use crate::chart_spec::ChartType;
use crate::config::LayoutConfig;
use crate::kpi::KpiResult;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarMode {
    Group,
    Stack,
    Relative,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    /// Legend entry; `None` for a lone uncoloured series.
    pub name: Option<String>,
    pub x: Vec<Value>,
    pub y: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Margin {
    pub l: u32,
    pub r: u32,
    pub t: u32,
    pub b: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub x_tick_angle: i32,
    pub margin: Margin,
    pub plot_background: String,
}

impl From<&LayoutConfig> for Layout {
    fn from(config: &LayoutConfig) -> Self {
        Self {
            x_tick_angle: config.x_tick_angle,
            margin: Margin {
                l: config.margin_left,
                r: config.margin_right,
                t: config.margin_top,
                b: config.margin_bottom,
            },
            plot_background: config.plot_background.clone(),
        }
    }
}

impl Default for Layout {
    fn default() -> Self {
        Layout::from(&LayoutConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedFigure {
    pub chart_type: ChartType,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub color_label: Option<String>,
    pub bar_mode: Option<BarMode>,
    pub traces: Vec<Trace>,
    pub layout: Layout,
}

impl ResolvedFigure {
    pub fn point_count(&self) -> usize {
        self.traces.iter().map(|t| t.y.len()).sum()
    }
    pub fn trace(&self, name: &str) -> Option<&Trace> {
        self.traces.iter().find(|t| t.name.as_deref() == Some(name))
    }
    /// `{data, layout}` document accepted by plotly.js.
    pub fn to_plotly_json(&self) -> Value {
        let data: Vec<Value> = self.traces.iter().map(|t| self.trace_json(t)).collect();
        let mut layout = Map::new();
        layout.insert("title".into(), json!({ "text": self.title }));
        layout.insert(
            "xaxis".into(),
            json!({ "title": { "text": self.x_label }, "tickangle": self.layout.x_tick_angle }),
        );
        layout.insert("yaxis".into(), json!({ "title": { "text": self.y_label } }));
        layout.insert(
            "margin".into(),
            json!({
                "l": self.layout.margin.l,
                "r": self.layout.margin.r,
                "t": self.layout.margin.t,
                "b": self.layout.margin.b,
            }),
        );
        layout.insert("plot_bgcolor".into(), json!(self.layout.plot_background));
        if let Some(mode) = self.bar_mode {
            layout.insert("barmode".into(), json!(mode));
        }
        if let Some(label) = &self.color_label {
            layout.insert("legend".into(), json!({ "title": { "text": label } }));
        }
        json!({ "data": data, "layout": layout })
    }
    fn trace_json(&self, trace: &Trace) -> Value {
        let mut out = match self.chart_type {
            ChartType::Pie => json!({ "type": "pie", "labels": trace.x, "values": trace.y }),
            ChartType::Bar => json!({ "type": "bar", "x": trace.x, "y": trace.y }),
            ChartType::Line => json!({ "type": "scatter", "mode": "lines", "x": trace.x, "y": trace.y }),
            ChartType::Scatter => {
                json!({ "type": "scatter", "mode": "markers", "x": trace.x, "y": trace.y })
            }
        };
        if let (Some(name), Some(obj)) = (&trace.name, out.as_object_mut()) {
            obj.insert("name".into(), json!(name));
        }
        out
    }
}

/// Grouped bar of each KPI's value beside its benchmark. Non-numeric values
/// and benchmarks are left out of their series.
pub fn kpi_comparison(results: &[KpiResult], layout: &LayoutConfig) -> ResolvedFigure {
    let series = |name: &str, pick: &dyn Fn(&KpiResult) -> Option<f64>| {
        let (x, y): (Vec<Value>, Vec<f64>) = results
            .iter()
            .filter_map(|r| pick(r).map(|v| (json!(r.name()), v)))
            .unzip();
        Trace {
            name: Some(name.to_string()),
            x,
            y,
        }
    };
    let company = series("Company", &|r: &KpiResult| r.value.as_number());
    let benchmark = series("Benchmark", &|r: &KpiResult| r.benchmark.as_ref().and_then(|b| b.as_number()));
    ResolvedFigure {
        chart_type: ChartType::Bar,
        title: "KPI Comparison".to_string(),
        x_label: "KPI".to_string(),
        y_label: "Value".to_string(),
        color_label: Some("Type".to_string()),
        bar_mode: Some(BarMode::Group),
        traces: vec![company, benchmark],
        layout: Layout::from(layout),
    }
}
