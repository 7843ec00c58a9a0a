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

//! Mapping loosely named column references onto real dataset columns.
//!
//! Column names in metric definitions and chart requests are guesses made by a
//! text generator, so they rarely match the dataset verbatim. The
//! [`SubstringResolver`] absorbs paraphrases by normalised containment; the
//! [`ExactResolver`] is used wherever a request is expected to echo real names.

use crate::error::{ResolutionError, ResolutionResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(String),
    NotFound,
}

impl Resolution {
    pub fn found(&self) -> Option<&str> {
        match self {
            Resolution::Found(name) => Some(name),
            Resolution::NotFound => None,
        }
    }
    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }
    /// Converts a miss into `ColumnNotFound` for `reference`.
    pub fn require(self, reference: &str) -> ResolutionResult<String> {
        match self {
            Resolution::Found(name) => Ok(name),
            Resolution::NotFound => Err(ResolutionError::column_not_found(reference)),
        }
    }
}

pub trait ColumnResolver: Send + Sync {
    /// Picks a column for `reference` from `candidates`, which must be in
    /// dataset column order.
    fn resolve(&self, reference: &str, candidates: &[String]) -> Resolution;
}

/// Lower-cases and removes spaces.
pub fn normalise(name: &str) -> String {
    name.chars()
        .filter(|c| *c != ' ')
        .flat_map(char::to_lowercase)
        .collect()
}

/// First candidate whose normalised name contains the normalised reference.
///
/// Ties resolve to the earliest column, so "Sales" against
/// `["Total Sales", "Sales"]` picks "Total Sales".
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringResolver;

impl ColumnResolver for SubstringResolver {
    fn resolve(&self, reference: &str, candidates: &[String]) -> Resolution {
        let needle = normalise(reference);
        if needle.is_empty() {
            return Resolution::NotFound;
        }
        match candidates.iter().find(|c| normalise(c).contains(&needle)) {
            Some(column) => {
                if column != reference {
                    debug!(reference, column = %column, "Resolved column by substring");
                }
                Resolution::Found(column.clone())
            }
            None => {
                debug!(reference, "No column matched reference");
                Resolution::NotFound
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExactResolver;

impl ColumnResolver for ExactResolver {
    fn resolve(&self, reference: &str, candidates: &[String]) -> Resolution {
        if reference.is_empty() {
            return Resolution::NotFound;
        }
        candidates
            .iter()
            .find(|c| c.as_str() == reference)
            .map_or(Resolution::NotFound, |c| Resolution::Found(c.clone()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolverStrategy {
    #[default]
    Substring,
    Exact,
}

impl ResolverStrategy {
    pub fn resolver(&self) -> Box<dyn ColumnResolver> {
        match self {
            ResolverStrategy::Substring => Box::new(SubstringResolver),
            ResolverStrategy::Exact => Box::new(ExactResolver),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn normalisation_ignores_case_and_spaces() {
        assert_eq!(normalise("Order Date"), "orderdate");
        assert_eq!(normalise(" SUB Category "), "subcategory");
    }

    #[test]
    fn substring_matches_paraphrased_names() {
        let cols = columns(&["Order ID", "Order Date", "Sales"]);
        assert_eq!(
            SubstringResolver.resolve("orderdate", &cols),
            Resolution::Found("Order Date".into())
        );
        assert_eq!(SubstringResolver.resolve("Revenue", &cols), Resolution::NotFound);
    }

    #[test]
    fn first_column_wins_on_ties() {
        let cols = columns(&["Total Sales", "Sales"]);
        assert_eq!(
            SubstringResolver.resolve("Sales", &cols),
            Resolution::Found("Total Sales".into())
        );
    }

    #[test]
    fn empty_reference_never_matches() {
        let cols = columns(&["Sales"]);
        assert_eq!(SubstringResolver.resolve("  ", &cols), Resolution::NotFound);
        assert_eq!(ExactResolver.resolve("", &cols), Resolution::NotFound);
    }

    #[test]
    fn exact_resolver_is_case_sensitive() {
        let cols = columns(&["Sales"]);
        assert!(ExactResolver.resolve("Sales", &cols).is_found());
        assert!(!ExactResolver.resolve("sales", &cols).is_found());
    }

    #[test]
    fn require_maps_miss_to_column_not_found() {
        let err = Resolution::NotFound.require("Margin").unwrap_err();
        assert_eq!(err, ResolutionError::column_not_found("Margin"));
    }
}
