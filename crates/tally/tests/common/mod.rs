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

#![allow(dead_code)]

use tally::Dataset;

pub const HEADERS: [&str; 7] = [
    "Order ID",
    "Order Date",
    "Region",
    "Category",
    "Sales",
    "Profit",
    "Discount",
];

/// Twenty orders of 50.0 each across two months, two regions and two
/// categories. Profit is the row index, so West sums to 90 and East to 100.
/// Order ids repeat after fifteen rows.
pub fn sales() -> Dataset {
    let rows: Vec<Vec<String>> = (0..20)
        .map(|i: usize| {
            let date = if i < 10 {
                format!("2024-01-{:02}", i + 1)
            } else {
                format!("2024-02-{:02}", i - 9)
            };
            vec![
                format!("CA-{}", i % 15),
                date,
                if i % 2 == 0 { "West" } else { "East" }.to_string(),
                if i % 4 < 2 { "Furniture" } else { "Technology" }.to_string(),
                "50".to_string(),
                i.to_string(),
                if i < 10 { "0.1" } else { "0.2" }.to_string(),
            ]
        })
        .collect();
    let headers: Vec<String> = HEADERS.iter().map(|h| h.to_string()).collect();
    Dataset::from_rows("sales", &headers, &rows).unwrap()
}

pub fn small(headers: &[&str], rows: &[&[&str]]) -> Dataset {
    let rows: Vec<Vec<&str>> = rows.iter().map(|r| r.to_vec()).collect();
    Dataset::from_rows("small", headers, &rows).unwrap()
}
