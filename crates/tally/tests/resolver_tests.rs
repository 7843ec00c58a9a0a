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

use proptest::prelude::*;
use tally::resolver::normalise;
use tally::{ColumnResolver, ExactResolver, Resolution, ResolverStrategy, SubstringResolver};

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_case_and_space_insensitive_match() {
    let candidates = columns(&["Order ID", "Sub-Category", "Sales"]);
    let resolver = SubstringResolver;
    assert_eq!(resolver.resolve("orderid", &candidates).found(), Some("Order ID"));
    assert_eq!(resolver.resolve("SUB-category", &candidates).found(), Some("Sub-Category"));
    assert_eq!(resolver.resolve("ale", &candidates).found(), Some("Sales"));
}

#[test]
fn test_first_candidate_wins_ties() {
    let candidates = columns(&["Total Sales", "Sales"]);
    assert_eq!(
        SubstringResolver.resolve("Sales", &candidates),
        Resolution::Found("Total Sales".to_string())
    );
    assert_eq!(
        ExactResolver.resolve("Sales", &candidates),
        Resolution::Found("Sales".to_string())
    );
}

#[test]
fn test_empty_and_unknown_references() {
    let candidates = columns(&["Sales"]);
    assert!(!SubstringResolver.resolve("", &candidates).is_found());
    assert!(!SubstringResolver.resolve("   ", &candidates).is_found());
    assert!(!SubstringResolver.resolve("Margin", &candidates).is_found());
    assert!(!SubstringResolver.resolve("Sales", &[]).is_found());
    assert!(SubstringResolver.resolve("Margin", &candidates).require("Margin").is_err());
}

#[test]
fn test_strategy_selects_resolver() {
    let candidates = columns(&["Order Date"]);
    assert!(ResolverStrategy::Substring.resolver().resolve("date", &candidates).is_found());
    assert!(!ResolverStrategy::Exact.resolver().resolve("date", &candidates).is_found());
}

proptest! {
    #[test]
    fn test_resolved_column_contains_reference(
        names in prop::collection::vec("[A-Za-z ]{1,12}", 1..8),
        reference in "[A-Za-z]{1,4}",
    ) {
        let needle = normalise(&reference);
        match SubstringResolver.resolve(&reference, &names) {
            Resolution::Found(column) => {
                prop_assert!(normalise(&column).contains(&needle));
                let first = names.iter().find(|c| normalise(c).contains(&needle));
                prop_assert_eq!(Some(&column), first);
            }
            Resolution::NotFound => {
                prop_assert!(names.iter().all(|c| !normalise(c).contains(&needle)));
            }
        }
    }

    #[test]
    fn test_every_column_resolves_to_a_match(
        names in prop::collection::vec("[A-Za-z]{1,10}", 1..8),
        index in 0usize..8,
    ) {
        let reference = names[index % names.len()].clone();
        prop_assert!(SubstringResolver.resolve(&reference, &names).is_found());
        let resolved = ExactResolver.resolve(&reference, &names);
        prop_assert_eq!(
            resolved.found(),
            Some(reference.as_str())
        );
    }
}
