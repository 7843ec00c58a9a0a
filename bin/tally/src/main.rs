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

mod args;

use anyhow::{Context, Result};
use args::{Cli, Commands};
use clap::Parser;
use serde_json::json;
use std::io::Read;
use std::path::PathBuf;
use tally::{ChartOutcome, MetricEngine};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn read_input(source: &str) -> Result<String> {
    if source == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("reading stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(source).with_context(|| format!("reading {source}"))
}

fn engine(config: Option<PathBuf>) -> Result<MetricEngine> {
    let path = config.or_else(|| std::env::var_os("TALLY_CONFIG").map(PathBuf::from));
    match path {
        Some(path) => MetricEngine::from_yaml_file(&path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(MetricEngine::new()),
    }
}

fn print_outcome(outcome: &ChartOutcome, plotly: bool) -> Result<()> {
    let value = match (plotly, outcome.figure()) {
        (true, Some(figure)) => figure.to_plotly_json(),
        _ => serde_json::to_value(outcome)?,
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,tally=info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let engine = engine(cli.config)?;
    match cli.command {
        Commands::Kpis {
            data,
            definitions,
            figure,
        } => {
            let dataset = engine.load_csv(&data)?;
            let results = engine.resolve_kpis_from_text(&dataset, &read_input(&definitions)?);
            info!(count = results.len(), "KPIs evaluated");
            let output = if figure {
                json!({
                    "kpis": results,
                    "figure": engine.kpi_comparison(&results).to_plotly_json(),
                })
            } else {
                serde_json::to_value(&results)?
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Chart { data, spec, plotly } => {
            let dataset = engine.load_csv(&data)?;
            let outcome = engine.chart_from_text(&dataset, &read_input(&spec)?);
            print_outcome(&outcome, plotly)?;
        }
        Commands::Plot { data, text } => {
            let dataset = engine.load_csv(&data)?;
            match engine.plot_instruction(&dataset, &text) {
                Some(outcome) => print_outcome(&outcome, false)?,
                None => println!("No plot instruction found"),
            }
        }
        Commands::Profile { data } => {
            let dataset = engine.load_csv(&data)?;
            let profile = engine.profile(&dataset);
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        Commands::Config => {
            print!("{}", engine.config().to_yaml()?);
        }
    }
    Ok(())
}
