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

//! KPI definitions, their validated evaluation plans and the per-KPI result
//! records handed back to the host.

use crate::aggregation::{aggregate, apply_filter, AggregationSpec, FilterSpec};
use crate::config::KpiConfig;
use crate::data_handler::Dataset;
use crate::error::{ResolutionError, ResolutionResult};
use crate::resolver::ColumnResolver;
use indexmap::IndexMap;
use itertools::Itertools;
use rayon::prelude::*;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// A metric as authored by the text generator. Unknown keys are preserved so
/// the evaluated record round-trips everything the generator said.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct KpiDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub operation: String,
    #[serde(default)]
    pub aggregation_map: IndexMap<String, String>,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub group_by: Vec<String>,
    #[serde(
        default,
        deserialize_with = "optional_filter",
        skip_serializing_if = "Option::is_none"
    )]
    pub filter: Option<FilterSpec>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub why: String,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
    /// Set when the generator's object could not be read as a definition.
    #[serde(skip)]
    pub malformed: Option<String>,
}

/// Keys written by evaluation; stale copies from the generator are dropped.
const RESULT_KEYS: &[&str] = &["value", "error", "benchmark"];

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(s)) if s.trim().is_empty() => Vec::new(),
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v,
    })
}

/// `null`, `{}` and `""` all mean "no filter".
fn optional_filter<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<FilterSpec>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) if map.is_empty() => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(other) => serde_json::from_value(other)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

impl KpiDefinition {
    pub fn new(name: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            operation: operation.into(),
            ..Self::default()
        }
    }
    pub fn with_aggregation(mut self, column: impl Into<String>, kind: impl Into<String>) -> Self {
        self.aggregation_map.insert(column.into(), kind.into());
        self
    }
    pub fn with_filter(mut self, filter: FilterSpec) -> Self {
        self.filter = Some(filter);
        self
    }
    pub fn with_group_by(mut self, column: impl Into<String>) -> Self {
        self.group_by.push(column.into());
        self
    }
    /// Reads one generator object. Anything that fails to deserialise becomes
    /// a definition flagged as malformed, keeping its name when one is
    /// present, so it is reported rather than dropped.
    pub fn from_json(value: Value) -> Self {
        match serde_json::from_value::<KpiDefinition>(value.clone()) {
            Ok(mut definition) => {
                for key in RESULT_KEYS {
                    definition.extra.shift_remove(*key);
                }
                definition
            }
            Err(err) => {
                let name = value
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                warn!(kpi = %name, error = %err, "Malformed KPI definition");
                Self {
                    name,
                    malformed: Some(err.to_string()),
                    ..Self::default()
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KpiOperation {
    Sum,
    Average,
    Count,
    CountDistinct,
    Divide,
    Ratio,
    Multiply,
}

impl KpiOperation {
    /// Number of aggregates the operation consumes, in map order.
    pub fn arity(&self) -> usize {
        match self {
            KpiOperation::Sum
            | KpiOperation::Average
            | KpiOperation::Count
            | KpiOperation::CountDistinct => 1,
            KpiOperation::Divide | KpiOperation::Ratio | KpiOperation::Multiply => 2,
        }
    }
    pub fn as_str(&self) -> &'static str {
        match self {
            KpiOperation::Sum => "SUM",
            KpiOperation::Average => "AVERAGE",
            KpiOperation::Count => "COUNT",
            KpiOperation::CountDistinct => "COUNT_DISTINCT",
            KpiOperation::Divide => "DIVIDE",
            KpiOperation::Ratio => "RATIO",
            KpiOperation::Multiply => "MULTIPLY",
        }
    }
    fn combine(&self, values: &[f64]) -> f64 {
        match self {
            KpiOperation::Sum
            | KpiOperation::Average
            | KpiOperation::Count
            | KpiOperation::CountDistinct => values[0],
            KpiOperation::Divide | KpiOperation::Ratio if values[1] == 0.0 => 0.0,
            KpiOperation::Divide | KpiOperation::Ratio => values[0] / values[1],
            KpiOperation::Multiply => values[0] * values[1],
        }
    }
}

impl FromStr for KpiOperation {
    type Err = ResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SUM" => Ok(KpiOperation::Sum),
            "AVERAGE" => Ok(KpiOperation::Average),
            "COUNT" => Ok(KpiOperation::Count),
            "COUNT_DISTINCT" => Ok(KpiOperation::CountDistinct),
            "DIVIDE" => Ok(KpiOperation::Divide),
            "RATIO" => Ok(KpiOperation::Ratio),
            "MULTIPLY" => Ok(KpiOperation::Multiply),
            _ => Err(ResolutionError::UnsupportedOperation {
                operation: s.trim().to_uppercase(),
            }),
        }
    }
}

impl fmt::Display for KpiOperation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A definition whose operation, aggregation kinds and arity have been
/// checked. Column references are still unresolved.
#[derive(Debug, Clone, PartialEq)]
pub struct KpiPlan {
    operation: KpiOperation,
    aggregations: Vec<AggregationSpec>,
    filter: Option<FilterSpec>,
}

impl KpiPlan {
    pub fn new(
        operation: KpiOperation,
        aggregations: Vec<AggregationSpec>,
        filter: Option<FilterSpec>,
    ) -> ResolutionResult<Self> {
        if aggregations.len() != operation.arity() {
            return Err(ResolutionError::ArityMismatch {
                operation: operation.to_string(),
                expected: operation.arity(),
                found: aggregations.len(),
            });
        }
        Ok(Self {
            operation,
            aggregations,
            filter,
        })
    }
    pub fn from_definition(definition: &KpiDefinition) -> ResolutionResult<Self> {
        if let Some(reason) = &definition.malformed {
            return Err(ResolutionError::malformed(reason.clone()));
        }
        let operation: KpiOperation = definition.operation.parse()?;
        let aggregations = definition
            .aggregation_map
            .iter()
            .map(|(column, kind)| Ok(AggregationSpec::new(column.clone(), kind.parse()?)))
            .collect::<ResolutionResult<Vec<_>>>()?;
        Self::new(operation, aggregations, definition.filter.clone())
    }
    pub fn operation(&self) -> KpiOperation {
        self.operation
    }
    pub fn aggregations(&self) -> &[AggregationSpec] {
        &self.aggregations
    }
    pub fn filter(&self) -> Option<&FilterSpec> {
        self.filter.as_ref()
    }
    /// Unrounded value over `dataset`.
    pub fn evaluate(&self, dataset: &Dataset, resolver: &dyn ColumnResolver) -> ResolutionResult<f64> {
        let filtered;
        let working = match &self.filter {
            Some(filter) => {
                filtered = apply_filter(dataset, filter, resolver)?;
                &filtered
            }
            None => dataset,
        };
        let mut values = Vec::with_capacity(self.aggregations.len());
        for spec in &self.aggregations {
            let column = resolver
                .resolve(&spec.column_ref, working.column_names())
                .require(&spec.column_ref)?;
            values.push(aggregate(working, &column, spec.kind)?);
        }
        let value = self.operation.combine(&values);
        if !value.is_finite() {
            return Err(ResolutionError::TypeMismatch {
                column: self
                    .aggregations
                    .iter()
                    .map(|a| a.column_ref.as_str())
                    .join(", "),
                expected: "finite number".to_string(),
                found: value.to_string(),
            });
        }
        Ok(value)
    }
}

/// Rounds half away from zero. Values too large to carry the requested
/// fractional digits are returned as they are.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    let scaled = value * factor;
    if !scaled.is_finite() || scaled.abs() >= 2f64.powi(52) {
        return value;
    }
    scaled.round() / factor
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KpiValue {
    Number(f64),
    /// Serialises as the failure marker text.
    Failed(String),
}

impl KpiValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            KpiValue::Number(v) => Some(*v),
            KpiValue::Failed(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Benchmark {
    Value(f64),
    NotApplicable(String),
}

impl Benchmark {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Benchmark::Value(v) => Some(*v),
            Benchmark::NotApplicable(_) => None,
        }
    }
}

/// An evaluated definition. Serialises flat: the definition's keys followed
/// by `value`, `error` and `benchmark`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiResult {
    #[serde(flatten)]
    pub definition: KpiDefinition,
    pub value: KpiValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benchmark: Option<Benchmark>,
}

impl KpiResult {
    pub fn name(&self) -> &str {
        &self.definition.name
    }
    pub fn is_failed(&self) -> bool {
        matches!(self.value, KpiValue::Failed(_))
    }
}

/// Evaluates KPI definitions with per-KPI failure containment.
pub struct KpiResolver {
    resolver: Box<dyn ColumnResolver>,
    config: KpiConfig,
}

impl KpiResolver {
    pub fn new(resolver: Box<dyn ColumnResolver>, config: KpiConfig) -> Self {
        Self { resolver, config }
    }
    pub fn config(&self) -> &KpiConfig {
        &self.config
    }
    pub fn resolve(&self, dataset: &Dataset, definition: &KpiDefinition) -> KpiResult {
        if !definition.group_by.is_empty() {
            debug!(
                kpi = %definition.name,
                group_by = ?definition.group_by,
                "group_by is not evaluated; computing a single overall value"
            );
        }
        let outcome = KpiPlan::from_definition(definition)
            .and_then(|plan| plan.evaluate(dataset, self.resolver.as_ref()));
        match outcome {
            Ok(value) => {
                let value = round_to(value, self.config.decimals);
                debug!(kpi = %definition.name, value, "Resolved KPI");
                KpiResult {
                    definition: definition.clone(),
                    value: KpiValue::Number(value),
                    error: None,
                    benchmark: None,
                }
            }
            Err(err) => {
                warn!(kpi = %definition.name, kind = err.kind(), error = %err, "KPI resolution failed");
                KpiResult {
                    definition: definition.clone(),
                    value: KpiValue::Failed(self.config.failure_marker.clone()),
                    error: Some(err.to_string()),
                    benchmark: None,
                }
            }
        }
    }
    pub fn resolve_all(&self, dataset: &Dataset, definitions: &[KpiDefinition]) -> Vec<KpiResult> {
        definitions.iter().map(|d| self.resolve(dataset, d)).collect()
    }
    /// Same output, same order as [`Self::resolve_all`].
    pub fn resolve_all_parallel(&self, dataset: &Dataset, definitions: &[KpiDefinition]) -> Vec<KpiResult> {
        definitions.par_iter().map(|d| self.resolve(dataset, d)).collect()
    }
    /// Sets `benchmark` on every result: `value * multiplier` rounded for
    /// numeric values, the not-applicable marker otherwise.
    pub fn attach_benchmarks(&self, results: &mut [KpiResult]) {
        for result in results.iter_mut() {
            result.benchmark = Some(match result.value.as_number() {
                Some(value) => Benchmark::Value(round_to(
                    value * self.config.benchmark_multiplier,
                    self.config.decimals,
                )),
                None => Benchmark::NotApplicable(self.config.not_applicable_marker.clone()),
            });
        }
    }
}

impl Default for KpiResolver {
    fn default() -> Self {
        Self::new(Box::new(crate::resolver::SubstringResolver), KpiConfig::default())
    }
}
