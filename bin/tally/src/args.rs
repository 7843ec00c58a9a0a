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

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "tally")]
#[command(about = "Resolve KPI definitions and chart specifications against a CSV dataset")]
pub struct Cli {
    /// Engine configuration (YAML). Falls back to $TALLY_CONFIG.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[arg(long, global = true, default_value_t = false)]
    pub debug: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Evaluate KPI definitions and print results with benchmarks.
    Kpis {
        #[arg(long)]
        data: PathBuf,
        /// JSON file of definitions, or "-" for stdin.
        #[arg(long)]
        definitions: String,
        /// Also print the company-vs-benchmark figure.
        #[arg(long, default_value_t = false)]
        figure: bool,
    },
    /// Build a chart from a chart specification.
    Chart {
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        spec: String,
        /// Print the plotly figure instead of the build outcome.
        #[arg(long, default_value_t = false)]
        plotly: bool,
    },
    /// Chart an "X vs Y" instruction found in free text.
    Plot {
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        text: String,
    },
    /// Column names, types and null counts.
    Profile {
        #[arg(long)]
        data: PathBuf,
    },
    /// Print the effective configuration as YAML.
    Config,
}
