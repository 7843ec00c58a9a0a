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

use crate::chart_spec::ChartSpec;
use crate::error::{ResolutionError, ResolutionResult};
use crate::kpi::KpiDefinition;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

static BRACKETED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\[.*\]|\{.*\}").unwrap());

static FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```([A-Za-z0-9_+-]*)[^\S\n]*\n?(.*?)(?:```|\z)").unwrap());

/// Fenced blocks as `(language, body)`. A closing fence may share a line with
/// the body; an unterminated fence runs to the end of the text.
pub fn extract_code_blocks(text: &str) -> Vec<(Option<String>, String)> {
    FENCE_RE
        .captures_iter(text)
        .map(|caps| {
            let language = Some(caps[1].to_lowercase()).filter(|l| !l.is_empty());
            (language, caps[2].trim_end().to_string())
        })
        .collect()
}

/// The JSON-looking part of a generator response: a `json` (or untagged)
/// fenced block, else the widest bracketed span, else the whole text when it
/// already starts like JSON.
pub fn extract_json_block(text: &str) -> Option<String> {
    if let Some((_, body)) = extract_code_blocks(text)
        .into_iter()
        .find(|(lang, _)| matches!(lang.as_deref(), Some("json") | None))
    {
        debug!("Using fenced block as JSON candidate");
        return Some(body.trim().to_string());
    }
    if let Some(found) = BRACKETED_RE.find(text) {
        debug!("Using bracketed span as JSON candidate");
        return Some(found.as_str().to_string());
    }
    let trimmed = text.trim();
    (trimmed.starts_with('[') || trimmed.starts_with('{')).then(|| trimmed.to_string())
}

pub fn parse_json(text: &str) -> ResolutionResult<Value> {
    let candidate = extract_json_block(text)
        .ok_or_else(|| ResolutionError::malformed("no JSON found in response"))?;
    serde_json::from_str(&candidate).map_err(|e| {
        warn!(error = %e, "JSON decode failed");
        ResolutionError::malformed(format!("JSON decode failed: {e}"))
    })
}

/// KPI definitions from a generator response. Undecodable text yields an
/// empty list; objects that are not valid definitions are kept as malformed
/// entries; non-object entries are skipped.
pub fn parse_kpi_definitions(text: &str) -> Vec<KpiDefinition> {
    let entries = match parse_json(text) {
        Ok(Value::Array(items)) => items,
        Ok(Value::Object(map)) => {
            let wrapped = if map.contains_key("aggregation_map") {
                None
            } else {
                map.values().find_map(as_object_list)
            };
            wrapped.unwrap_or_else(|| vec![Value::Object(map)])
        }
        Ok(other) => {
            warn!(found = %other, "KPI response is neither a list nor an object");
            return Vec::new();
        }
        Err(err) => {
            warn!(error = %err, "No KPI definitions in response");
            return Vec::new();
        }
    };
    entries
        .into_iter()
        .filter_map(|entry| match entry {
            Value::Object(_) => Some(KpiDefinition::from_json(entry)),
            other => {
                warn!(entry = %other, "Skipping non-object KPI entry");
                None
            }
        })
        .collect()
}

fn as_object_list(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_object) => {
            Some(items.clone())
        }
        _ => None,
    }
}

pub fn parse_chart_spec(text: &str) -> ResolutionResult<ChartSpec> {
    match parse_json(text)? {
        value @ Value::Object(_) => ChartSpec::from_json(value),
        Value::Array(mut items) if items.len() == 1 => ChartSpec::from_json(items.remove(0)),
        other => Err(ResolutionError::malformed(format!(
            "expected one chart object, got {other}"
        ))),
    }
}
