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

//! Turning a [`ChartSpec`] and a dataset into a [`ResolvedFigure`].
//!
//! Building happens in two stages. [`ChartBuilder::prepare`] narrows a
//! private working copy of the dataset step by step (derived ratio, date
//! bucketing, null removal, colour inference, reshaping or grouping) and
//! returns the table that will be drawn. [`ChartBuilder::render`] then splits
//! that table into traces. Any failure along the way is reported as
//! [`ChartOutcome::NotBuildable`]; the caller's dataset is never touched.

use crate::chart_spec::{ChartSpec, ChartType, YAxis};
use crate::config::ChartConfig;
use crate::data_handler::{bucket_dates, derive_ratio, group_sum, unpivot, Dataset};
use crate::error::{ResolutionError, ResolutionResult};
use crate::figure::{BarMode, Layout, ResolvedFigure, Trace};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChartOutcome {
    Built(ResolvedFigure),
    NotBuildable { reason: String },
}

impl ChartOutcome {
    pub fn figure(&self) -> Option<&ResolvedFigure> {
        match self {
            ChartOutcome::Built(figure) => Some(figure),
            ChartOutcome::NotBuildable { .. } => None,
        }
    }
    pub fn into_figure(self) -> Option<ResolvedFigure> {
        match self {
            ChartOutcome::Built(figure) => Some(figure),
            ChartOutcome::NotBuildable { .. } => None,
        }
    }
    pub fn is_built(&self) -> bool {
        matches!(self, ChartOutcome::Built(_))
    }
    pub fn reason(&self) -> Option<&str> {
        match self {
            ChartOutcome::Built(_) => None,
            ChartOutcome::NotBuildable { reason } => Some(reason),
        }
    }
}

impl From<ResolutionResult<ResolvedFigure>> for ChartOutcome {
    fn from(result: ResolutionResult<ResolvedFigure>) -> Self {
        match result {
            Ok(figure) => ChartOutcome::Built(figure),
            Err(ResolutionError::NotBuildable { reason }) => ChartOutcome::NotBuildable { reason },
            Err(err) => ChartOutcome::NotBuildable {
                reason: err.to_string(),
            },
        }
    }
}

/// The table a figure is drawn from, after every narrowing step.
#[derive(Debug, Clone)]
pub struct PreparedChart {
    pub spec: ChartSpec,
    pub table: Dataset,
    pub x: String,
    /// Column of `table` holding the plotted values.
    pub value: String,
    /// Column of `table` that splits rows into coloured traces.
    pub color: Option<String>,
    pub bar_mode: Option<BarMode>,
}

pub struct ChartBuilder {
    config: ChartConfig,
}

impl Default for ChartBuilder {
    fn default() -> Self {
        Self::new(ChartConfig::default())
    }
}

impl ChartBuilder {
    pub fn new(config: ChartConfig) -> Self {
        Self { config }
    }
    pub fn config(&self) -> &ChartConfig {
        &self.config
    }
    pub fn build(&self, dataset: &Dataset, spec: &ChartSpec) -> ChartOutcome {
        let outcome: ChartOutcome = self
            .prepare(dataset, spec)
            .and_then(|prepared| self.render(&prepared))
            .into();
        if let ChartOutcome::NotBuildable { reason } = &outcome {
            warn!(title = %spec.title, chart_type = %spec.chart_type, reason = %reason, "Chart not buildable");
        }
        outcome
    }
    fn is_date_name(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.config
            .date_hints
            .iter()
            .any(|hint| lower.contains(&hint.to_lowercase()))
    }
    fn not_buildable<T>(reason: impl Into<String>) -> ResolutionResult<T> {
        Err(ResolutionError::not_buildable(reason))
    }
    fn infer_color(&self, working: &Dataset, spec: &ChartSpec) -> Option<String> {
        let title = spec.title.to_lowercase();
        if !self
            .config
            .grouping_keywords
            .iter()
            .any(|kw| title.contains(&kw.to_lowercase()))
        {
            return None;
        }
        let y_columns = spec.y.value_columns();
        self.config
            .grouping_candidates
            .iter()
            .find(|c| {
                working.has_column(c) && **c != spec.x && !y_columns.contains(&c.as_str())
            })
            .cloned()
    }
    pub fn prepare(&self, dataset: &Dataset, spec: &ChartSpec) -> ResolutionResult<PreparedChart> {
        let x = spec.x.as_str();
        let mut working = dataset.clone();

        if let YAxis::Ratio {
            numerator,
            denominator,
            expression,
        } = &spec.y
        {
            if !working.has_column(numerator) || !working.has_column(denominator) {
                return Self::not_buildable(format!(
                    "One of the columns '{numerator}' or '{denominator}' for derived y is missing"
                ));
            }
            working = derive_ratio(&working, numerator, denominator, expression)?;
        }

        let date_axis = self.is_date_name(x);
        let y_columns = spec.y.value_columns();
        if let Some(missing) = std::iter::once(x)
            .chain(y_columns.iter().copied())
            .find(|c| !working.has_column(c))
        {
            return Self::not_buildable(format!("Column '{missing}' not in dataset"));
        }

        let mut in_use = vec![x];
        in_use.extend(y_columns.iter().copied());
        working = working.drop_nulls(&in_use)?;

        let is_temporal = working
            .column(x)
            .is_some_and(|c| c.data_type().is_temporal());
        if is_temporal || date_axis {
            working = bucket_dates(&working, x, self.config.date_bucket)?;
        }

        let color = self.infer_color(&working, spec);

        let prepared = match &spec.y {
            YAxis::Series { columns } => {
                if spec.chart_type == ChartType::Pie {
                    return Self::not_buildable("Multi-series not supported for pie charts");
                }
                let mut selected = vec![x];
                selected.extend(columns.iter().map(String::as_str));
                let sorted = working.select(&selected)?.sort_by(x, true)?;
                let long = unpivot(
                    &sorted,
                    x,
                    columns,
                    &self.config.series_name,
                    &self.config.value_name,
                )
                .map_err(|e| ResolutionError::not_buildable(e.to_string()))?;
                PreparedChart {
                    spec: spec.clone(),
                    table: long,
                    x: x.to_string(),
                    value: self.config.value_name.clone(),
                    color: Some(self.config.series_name.clone()),
                    bar_mode: (spec.chart_type == ChartType::Bar).then_some(BarMode::Group),
                }
            }
            _ => {
                let y = y_columns[0];
                let (keys, color) = match (&spec.chart_type, color) {
                    (ChartType::Pie, _) | (_, None) => (vec![x.to_string()], None),
                    (_, Some(color)) => (vec![x.to_string(), color.clone()], Some(color)),
                };
                let grouped = group_sum(&working, &keys, y).map_err(|e| match e {
                    crate::error::DataError::TypeMismatch { .. } => {
                        ResolutionError::not_buildable(format!("Column '{y}' is not numeric"))
                    }
                    other => ResolutionError::from(other),
                })?;
                PreparedChart {
                    spec: spec.clone(),
                    table: grouped.sort_by(x, true)?,
                    x: x.to_string(),
                    value: y.to_string(),
                    color,
                    bar_mode: None,
                }
            }
        };
        debug!(
            title = %spec.title,
            rows = prepared.table.row_count(),
            color = ?prepared.color,
            "Prepared chart table"
        );
        Ok(prepared)
    }
    pub fn render(&self, prepared: &PreparedChart) -> ResolutionResult<ResolvedFigure> {
        let table = &prepared.table;
        let x = table.require_column(&prepared.x)?;
        let y = table.require_column(&prepared.value)?;
        let color = match &prepared.color {
            Some(name) => Some(table.require_column(name)?),
            None => None,
        };
        let mut traces: IndexMap<Option<String>, Trace> = IndexMap::new();
        for row in 0..table.row_count() {
            let Some(value) = y.to_f64(row) else {
                continue;
            };
            let name = color.and_then(|c| c.get_string(row));
            let trace = traces.entry(name.clone()).or_insert_with(|| Trace {
                name,
                x: Vec::new(),
                y: Vec::new(),
            });
            trace.x.push(x.to_json(row));
            trace.y.push(value);
        }
        let spec = &prepared.spec;
        Ok(ResolvedFigure {
            chart_type: spec.chart_type,
            title: spec.title.clone(),
            x_label: prepared.x.clone(),
            y_label: prepared.value.clone(),
            color_label: prepared.color.clone(),
            bar_mode: prepared.bar_mode,
            traces: traces.into_values().collect(),
            layout: Layout::from(&self.config.layout),
        })
    }
    /// Ungrouped scatter of two resolved columns, titled "`y` vs `x`".
    pub fn scatter(&self, dataset: &Dataset, x: &str, y: &str) -> ChartOutcome {
        self.scatter_figure(dataset, x, y).into()
    }
    fn scatter_figure(&self, dataset: &Dataset, x: &str, y: &str) -> ResolutionResult<ResolvedFigure> {
        let table = dataset.select(&[x, y])?.drop_nulls(&[x, y])?;
        let spec = ChartSpec::new(
            ChartType::Scatter,
            x,
            YAxis::Column { name: y.to_string() },
            format!("{y} vs {x}"),
        );
        self.render(&PreparedChart {
            spec,
            table,
            x: x.to_string(),
            value: y.to_string(),
            color: None,
            bar_mode: None,
        })
    }
}
