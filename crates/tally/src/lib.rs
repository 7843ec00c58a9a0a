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

pub mod aggregation;
pub mod analyst;
pub mod chart_builder;
pub mod chart_spec;
pub mod config;
pub mod data_handler;
pub mod error;
pub mod figure;
pub mod insight;
pub mod kpi;
pub mod llm;
pub mod resolver;

pub use aggregation::{evaluate, AggregationKind, AggregationSpec, FilterSpec};
pub use analyst::{plot_instruction, Consultation, InsightAnalyst};
pub use chart_builder::{ChartBuilder, ChartOutcome, PreparedChart};
pub use chart_spec::{ChartRequest, ChartSpec, ChartType, YAxis};
pub use config::{ChartConfig, EngineConfig, KpiConfig, LayoutConfig};
pub use data_handler::{Column, ColumnMetadata, CsvReader, DataType, Dataset};
pub use error::{
    ConfigError, DataError, GenerationError, ResolutionError, Result, SerialisationError,
    TallyError,
};
pub use figure::{kpi_comparison, BarMode, ResolvedFigure, Trace};
pub use insight::{parse_insights, Insight};
pub use kpi::{round_to, Benchmark, KpiDefinition, KpiOperation, KpiPlan, KpiResolver, KpiResult, KpiValue};
pub use llm::{parse_chart_spec, parse_kpi_definitions, TextGenerator};
pub use resolver::{ColumnResolver, ExactResolver, Resolution, ResolverStrategy, SubstringResolver};

use std::path::Path;
use tracing::info;

/// Entry point bundling the resolver, KPI resolver and chart builder under
/// one configuration.
pub struct MetricEngine {
    config: EngineConfig,
    resolver: Box<dyn ColumnResolver>,
    kpis: KpiResolver,
    charts: ChartBuilder,
}

impl MetricEngine {
    pub fn new() -> Self {
        Self::build(EngineConfig::default())
    }
    pub fn with_config(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_config(EngineConfig::from_yaml_file(path)?)
    }
    fn build(config: EngineConfig) -> Self {
        info!(resolver = ?config.resolver, "Creating metric engine");
        Self {
            resolver: config.resolver.resolver(),
            kpis: KpiResolver::new(config.resolver.resolver(), config.kpi.clone()),
            charts: ChartBuilder::new(config.chart.clone()),
            config,
        }
    }
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
    pub fn resolver(&self) -> &dyn ColumnResolver {
        self.resolver.as_ref()
    }
    pub fn kpi_resolver(&self) -> &KpiResolver {
        &self.kpis
    }
    pub fn chart_builder(&self) -> &ChartBuilder {
        &self.charts
    }
    pub fn load_csv<P: AsRef<Path>>(&self, path: P) -> Result<Dataset> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("dataset");
        Ok(CsvReader::new().read_file(path, name)?)
    }
    /// Resolves every definition against `dataset` and attaches benchmarks.
    /// Output order follows `definitions`.
    pub fn resolve_kpis(&self, dataset: &Dataset, definitions: &[KpiDefinition]) -> Vec<KpiResult> {
        let mut results = self.kpis.resolve_all_parallel(dataset, definitions);
        self.kpis.attach_benchmarks(&mut results);
        info!(
            total = results.len(),
            failed = results.iter().filter(|r| r.is_failed()).count(),
            "Resolved KPIs"
        );
        results
    }
    pub fn resolve_kpis_from_text(&self, dataset: &Dataset, text: &str) -> Vec<KpiResult> {
        self.resolve_kpis(dataset, &parse_kpi_definitions(text))
    }
    pub fn build_chart(&self, dataset: &Dataset, spec: &ChartSpec) -> ChartOutcome {
        self.charts.build(dataset, spec)
    }
    pub fn chart_from_text(&self, dataset: &Dataset, text: &str) -> ChartOutcome {
        match parse_chart_spec(text) {
            Ok(spec) => self.build_chart(dataset, &spec),
            Err(err) => ChartOutcome::NotBuildable {
                reason: err.to_string(),
            },
        }
    }
    pub fn plot_instruction(&self, dataset: &Dataset, text: &str) -> Option<ChartOutcome> {
        plot_instruction(text, dataset, self.resolver(), &self.charts)
    }
    pub fn kpi_comparison(&self, results: &[KpiResult]) -> ResolvedFigure {
        kpi_comparison(results, &self.config.chart.layout)
    }
    pub fn profile(&self, dataset: &Dataset) -> Vec<ColumnMetadata> {
        dataset.column_metadata()
    }
}

impl Default for MetricEngine {
    fn default() -> Self {
        Self::new()
    }
}
