//! Simulated prompt refinement.
//!
//! No provider is ever called: the output is a fixed template around the
//! input, produced after an artificial delay.

use crate::text::{truncate_text, SlashCommand, SlashCommandKind};
use anyhow::{Context, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tera::Tera;
use tracing::debug;

pub const DEFAULT_SHORTEN_LENGTH: usize = 100;

const ENHANCE_TEMPLATE: &str = "**Enhanced Prompt:**

{{ prompt_text }}

**Improvements:**
- Added clearer structure and context
- Enhanced specificity for better AI responses
- Included measurable success criteria
- Optimized for {{ provider }} model characteristics

**Usage Tips:**
- Use this enhanced version for more consistent results
- Adjust temperature settings based on desired creativity level
- Consider adding examples for complex tasks";

const SHORTEN_TEMPLATE: &str = "**Shortened Prompt ({{ target_length }} chars):**

{{ shortened }}

**Key points preserved:**
- Core instruction maintained
- Essential context retained
- Optimized for brevity while preserving meaning";

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Openai,
    Anthropic,
    Google,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Openai => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Google => "google",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefineCommand {
    Enhance,
    Shorten { target_length: usize },
    /// Any unrecognized command: the text comes back unchanged.
    Passthrough,
}

impl RefineCommand {
    /// Maps a wire command name. A missing command means `enhance`.
    ///
    /// Fractional shorten lengths are floored; a missing, non-positive or
    /// non-finite length means [`DEFAULT_SHORTEN_LENGTH`].
    pub fn from_wire(command: Option<&str>, shorten_length: Option<f64>) -> Self {
        match command.unwrap_or("enhance") {
            "enhance" => RefineCommand::Enhance,
            "shorten" => RefineCommand::Shorten {
                target_length: shorten_length
                    .filter(|n| n.is_finite() && *n > 0.0)
                    .map_or(DEFAULT_SHORTEN_LENGTH, |n| n.floor() as usize),
            },
            _ => RefineCommand::Passthrough,
        }
    }

    /// Text recorded as a revision's `command_text`.
    pub fn label(&self) -> String {
        match self {
            RefineCommand::Enhance => "enhance".to_string(),
            RefineCommand::Shorten { target_length } => format!("shorten {}", target_length),
            RefineCommand::Passthrough => "passthrough".to_string(),
        }
    }

    /// Synthetic token count for `prompt_text` under this command.
    ///
    /// Length is measured in UTF-16 code units, so a character outside the
    /// Basic Multilingual Plane counts twice. For shorten, halving the floored
    /// target equals halving the raw requested length before flooring.
    pub fn tokens_used(&self, prompt_text: &str) -> u64 {
        let length = prompt_text.encode_utf16().count() as u64;
        match self {
            RefineCommand::Enhance => length * 3 / 4 + 50,
            RefineCommand::Shorten { target_length } => *target_length as u64 / 2 + 20,
            RefineCommand::Passthrough => length / 4,
        }
    }
}

impl From<&SlashCommand> for RefineCommand {
    fn from(command: &SlashCommand) -> Self {
        match command.command {
            SlashCommandKind::Enhance => RefineCommand::Enhance,
            SlashCommandKind::Shorten => RefineCommand::Shorten {
                target_length: command
                    .shorten_length()
                    .filter(|n| *n > 0)
                    .unwrap_or(DEFAULT_SHORTEN_LENGTH),
            },
        }
    }
}

/// Body of `POST /api/refine`. Unknown fields, including `apiKey`, are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefineRequest {
    #[serde(default)]
    pub prompt_text: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
    /// Any JSON number; see [`RefineCommand::from_wire`].
    #[serde(default)]
    pub shorten_length: Option<f64>,
    #[serde(default)]
    pub provider: Option<Provider>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefineResponse {
    pub refined_text: String,
    pub tokens_used: u64,
    pub provider: Provider,
    pub request_id: String,
}

/// Produces refinements after a delay of `min_delay` plus up to `jitter`.
#[derive(Debug, Clone, Copy)]
pub struct Refiner {
    min_delay: Duration,
    jitter: Duration,
}

impl Default for Refiner {
    fn default() -> Self {
        Self::new(Duration::from_millis(1000), Duration::from_millis(2000))
    }
}

impl Refiner {
    pub fn new(min_delay: Duration, jitter: Duration) -> Self {
        Self { min_delay, jitter }
    }

    /// A refiner that answers immediately.
    pub fn instant() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub async fn refine(
        &self,
        prompt_text: &str,
        command: &RefineCommand,
        provider: Provider,
    ) -> Result<RefineResponse> {
        let delay = self.pick_delay();
        if !delay.is_zero() {
            debug!(delay_ms = delay.as_millis() as u64, "Simulating provider latency");
            tokio::time::sleep(delay).await;
        }

        let refined_text = render(prompt_text, command, provider)?;
        Ok(RefineResponse {
            refined_text,
            tokens_used: command.tokens_used(prompt_text),
            provider,
            request_id: request_id(),
        })
    }

    fn pick_delay(&self) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.min_delay;
        }
        self.min_delay + Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
    }
}

fn render(prompt_text: &str, command: &RefineCommand, provider: Provider) -> Result<String> {
    let mut context = tera::Context::new();
    let template = match command {
        RefineCommand::Enhance => {
            context.insert("prompt_text", prompt_text);
            context.insert("provider", provider.as_str());
            ENHANCE_TEMPLATE
        }
        RefineCommand::Shorten { target_length } => {
            context.insert("target_length", target_length);
            context.insert("shortened", &truncate_text(prompt_text, *target_length));
            SHORTEN_TEMPLATE
        }
        RefineCommand::Passthrough => return Ok(prompt_text.to_string()),
    };
    Tera::one_off(template, &context, false).context("Failed to render refinement template")
}

/// `req_<unix millis>_<9 base36 chars>`.
pub fn request_id() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..9)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();
    format!("req_{}_{}", chrono::Utc::now().timestamp_millis(), suffix)
}
