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

use crate::llm::parse_json;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

/// One business insight returned by the text generator. Both the plain
/// (decision / observation / action) and the benchmark-comparison shapes are
/// accepted; keys outside either shape are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(default, deserialize_with = "text", skip_serializing_if = "Option::is_none")]
    pub decision: Option<String>,
    #[serde(default, deserialize_with = "text", skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,
    #[serde(default, deserialize_with = "text", skip_serializing_if = "Option::is_none")]
    pub why_it_matters: Option<String>,
    #[serde(default, deserialize_with = "text", skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, deserialize_with = "text", skip_serializing_if = "Option::is_none")]
    pub impact: Option<String>,
    #[serde(default, deserialize_with = "text", skip_serializing_if = "Option::is_none")]
    pub kpi_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benchmark_value: Option<Value>,
    #[serde(
        rename = "estimated impact",
        alias = "estimated_impact",
        default,
        deserialize_with = "text",
        skip_serializing_if = "Option::is_none"
    )]
    pub estimated_impact: Option<String>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// Strings pass through; numbers and booleans are rendered as text.
fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

impl Insight {
    /// The sentence a chart for this insight would be titled with.
    pub fn headline(&self) -> Option<&str> {
        self.decision
            .as_deref()
            .or(self.observation.as_deref())
            .or(self.kpi_name.as_deref())
    }
    pub fn is_comparison(&self) -> bool {
        self.kpi_name.is_some() || self.benchmark_value.is_some()
    }
}

/// Insights from a generator response. Anything undecodable yields an empty
/// list; entries that are not objects are dropped.
pub fn parse_insights(text: &str) -> Vec<Insight> {
    let items = match parse_json(text) {
        Ok(Value::Array(items)) => items,
        Ok(value @ Value::Object(_)) => vec![value],
        Ok(_) => return Vec::new(),
        Err(err) => {
            warn!(error = %err, "No insights in response");
            return Vec::new();
        }
    };
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Insight>(item) {
            Ok(insight) => Some(insight),
            Err(err) => {
                warn!(error = %err, "Skipping unreadable insight");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_plain_and_comparison_shapes() {
        let text = r#"```json
[
  {"decision": "Expand West", "observation": "West leads", "why_it_matters": "growth",
   "action": "hire", "impact": "high"},
  {"kpi_name": "Margin", "company_value": 0.12, "benchmark_value": 0.13,
   "observation": "below", "estimated impact": 5, "owner": "cfo"}
]
```"#;
        let insights = parse_insights(text);
        assert_eq!(insights.len(), 2);
        assert_eq!(insights[0].headline(), Some("Expand West"));
        assert!(!insights[0].is_comparison());
        assert!(insights[1].is_comparison());
        assert_eq!(insights[1].estimated_impact.as_deref(), Some("5"));
        assert_eq!(insights[1].extra.get("owner"), Some(&Value::from("cfo")));
    }

    #[test]
    fn garbage_yields_nothing() {
        assert!(parse_insights("the model was unavailable").is_empty());
        assert!(parse_insights("[1, 2]").is_empty());
    }
}
