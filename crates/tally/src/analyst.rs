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

//! The generator-facing workflow: ask, extract, resolve.
//!
//! Prompt wording belongs to the caller. Every method here degrades to an
//! empty or not-buildable result when the generator fails or answers with
//! something unusable.

use crate::chart_builder::{ChartBuilder, ChartOutcome};
use crate::data_handler::Dataset;
use crate::insight::{parse_insights, Insight};
use crate::kpi::KpiResult;
use crate::llm::{parse_chart_spec, TextGenerator};
use crate::resolver::ColumnResolver;
use crate::MetricEngine;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

static VERSUS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z0-9_ ]+)\s+vs\s+([A-Za-z0-9_ ]+)").unwrap());
static FENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```(json)?").unwrap());

/// Looks for an "`X` vs `Y`" instruction in free text and, when both sides
/// resolve to columns, draws an ungrouped scatter of `Y` against `X`.
pub fn plot_instruction(
    text: &str,
    dataset: &Dataset,
    resolver: &dyn ColumnResolver,
    builder: &ChartBuilder,
) -> Option<ChartOutcome> {
    let captures = VERSUS_RE.captures(text)?;
    let columns = dataset.column_names();
    let resolve = |side: &str| resolver.resolve(side.trim(), columns).found().map(str::to_string);
    let x = resolve(&captures[1])?;
    let y = resolve(&captures[2])?;
    debug!(x = %x, y = %y, "Found plot instruction");
    Some(builder.scatter(dataset, &x, &y))
}

/// A free-text reply plus the chart it asked for, if any.
#[derive(Debug, Clone, Serialize)]
pub struct Consultation {
    pub reply: String,
    pub chart: Option<ChartOutcome>,
}

pub struct InsightAnalyst<G: TextGenerator> {
    generator: G,
    engine: MetricEngine,
}

impl<G: TextGenerator> InsightAnalyst<G> {
    pub fn new(generator: G, engine: MetricEngine) -> Self {
        Self { generator, engine }
    }
    pub fn engine(&self) -> &MetricEngine {
        &self.engine
    }
    fn ask(&self, prompt: &str) -> Option<String> {
        match self.generator.generate(prompt) {
            Ok(response) if !response.trim().is_empty() => Some(response),
            Ok(_) => {
                warn!("Generator returned an empty response");
                None
            }
            Err(err) => {
                warn!(error = %err, "Generator call failed");
                None
            }
        }
    }
    /// Asks for KPI definitions, then resolves and benchmarks them.
    pub fn propose_kpis(&self, dataset: &Dataset, prompt: &str) -> Vec<KpiResult> {
        match self.ask(prompt) {
            Some(response) => self.engine.resolve_kpis_from_text(dataset, &response),
            None => Vec::new(),
        }
    }
    pub fn insights(&self, prompt: &str) -> Vec<Insight> {
        self.ask(prompt)
            .map(|response| parse_insights(&response))
            .unwrap_or_default()
    }
    /// Asks for one chart specification and builds it.
    pub fn chart_for(&self, dataset: &Dataset, prompt: &str) -> ChartOutcome {
        let Some(response) = self.ask(prompt) else {
            return ChartOutcome::NotBuildable {
                reason: "no response from generator".to_string(),
            };
        };
        match parse_chart_spec(&response) {
            Ok(spec) => self.engine.build_chart(dataset, &spec),
            Err(err) => {
                warn!(error = %err, "Unusable chart specification");
                ChartOutcome::NotBuildable {
                    reason: err.to_string(),
                }
            }
        }
    }
    /// Insights first, then one chart per insight, prompting with the
    /// insight's headline through `chart_prompt`.
    pub fn insights_with_charts<F>(&self, dataset: &Dataset, prompt: &str, chart_prompt: F) -> Vec<(Insight, ChartOutcome)>
    where
        F: Fn(&Insight) -> String,
    {
        self.insights(prompt)
            .into_iter()
            .map(|insight| {
                let outcome = self.chart_for(dataset, &chart_prompt(&insight));
                (insight, outcome)
            })
            .collect()
    }
    /// A conversational turn: fences are stripped from the reply and any
    /// "X vs Y" instruction in it is charted.
    pub fn consult(&self, dataset: &Dataset, prompt: &str) -> Option<Consultation> {
        let response = self.ask(prompt)?;
        let reply = FENCE_RE
            .replace_all(&response, "")
            .trim_matches(|c: char| c == '`' || c.is_whitespace())
            .to_string();
        let chart = self.engine.plot_instruction(dataset, &reply);
        Some(Consultation { reply, chart })
    }
}
