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

pub mod extract;

pub use crate::error::{GenerationError, GenerationResult};
pub use extract::{extract_code_blocks, extract_json_block, parse_chart_spec, parse_json, parse_kpi_definitions};

/// The text-generation service, reduced to text in, text out. Retries,
/// timeouts and credentials belong to the implementor.
pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> GenerationResult<String>;
}

impl<F> TextGenerator for F
where
    F: Fn(&str) -> GenerationResult<String> + Send + Sync,
{
    fn generate(&self, prompt: &str) -> GenerationResult<String> {
        self(prompt)
    }
}

/// Replays canned responses in order, then reports an empty response.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    responses: std::sync::Mutex<std::collections::VecDeque<String>>,
}

impl ScriptedGenerator {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: std::sync::Mutex::new(responses.into_iter().map(Into::into).collect()),
        }
    }
}

impl TextGenerator for ScriptedGenerator {
    fn generate(&self, _prompt: &str) -> GenerationResult<String> {
        let mut queue = self
            .responses
            .lock()
            .map_err(|e| GenerationError::Api(e.to_string()))?;
        queue.pop_front().ok_or(GenerationError::EmptyResponse)
    }
}
