//! Core Data Models
//!
//! This module defines the data structures shared by the transcript reader, the
//! cache-event accumulator and the report renderer.
//!
//! ## Data Flow
//!
//! 1. **Raw Data**: [`TranscriptLine`] - One JSON object deserialized from a transcript line
//! 2. **Records**: [`UsageRecord`] - A line that carried a usage block, with its model resolved
//! 3. **Aggregation**: [`ModelStats`] and [`TokenTotals`] - Running sums per model and overall
//!
//! ## Features
//!
//! - **Serde Integration**: Absent token fields resolve to zero; a block with none of them is no usage
//! - **Ordered Fallback**: [`TranscriptLine::usage`] prefers `message.usage` over a top-level `usage`
//! - **Monotonic Sums**: Aggregates saturate rather than wrap, so they only ever grow

use serde::{Deserialize, Serialize};

/// Model identifier used when a line carries usage but no `message.model`.
pub const UNKNOWN_MODEL: &str = "unknown";

/// One transcript line. Every field is optional; unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranscriptLine {
    pub message: Option<MessageData>,
    pub usage: Option<RawUsage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageData {
    pub model: Option<String>,
    pub usage: Option<RawUsage>,
}

/// Usage block as it appears on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct RawUsage {
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub cache_read_input_tokens: Option<u64>,
    pub cache_creation_input_tokens: Option<u64>,
}

impl RawUsage {
    /// `None` when no token field is present, e.g. `"usage": {}`.
    pub fn resolve(&self) -> Option<UsageData> {
        if self.input_tokens.is_none()
            && self.output_tokens.is_none()
            && self.cache_read_input_tokens.is_none()
            && self.cache_creation_input_tokens.is_none()
        {
            return None;
        }
        Some(UsageData {
            input_tokens: self.input_tokens.unwrap_or(0),
            output_tokens: self.output_tokens.unwrap_or(0),
            cache_read_input_tokens: self.cache_read_input_tokens.unwrap_or(0),
            cache_creation_input_tokens: self.cache_creation_input_tokens.unwrap_or(0),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UsageData {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_input_tokens: u64,
    pub cache_creation_input_tokens: u64,
}

impl TranscriptLine {
    /// Usage block for this line: `message.usage` first, then top-level `usage`.
    ///
    /// An empty `message.usage` is still the chosen block, so the line has no usage.
    pub fn usage(&self) -> Option<UsageData> {
        match self.message.as_ref().and_then(|m| m.usage.as_ref()) {
            Some(nested) => nested.resolve(),
            None => self.usage.as_ref().and_then(RawUsage::resolve),
        }
    }

    pub fn model(&self) -> &str {
        self.message
            .as_ref()
            .and_then(|m| m.model.as_deref())
            .unwrap_or(UNKNOWN_MODEL)
    }

    /// Resolve the line into a record, or `None` when it has no usage block.
    pub fn into_record(self, line_number: usize) -> Option<UsageRecord> {
        let usage = self.usage()?;
        Some(UsageRecord {
            line_number,
            model: self.model().to_string(),
            usage,
        })
    }
}

/// A transcript line that carried token usage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageRecord {
    /// 1-based physical line number in the source
    pub line_number: usize,
    pub model: String,
    pub usage: UsageData,
}

impl UsageRecord {
    pub fn new(model: impl Into<String>, usage: UsageData) -> Self {
        Self {
            line_number: 0,
            model: model.into(),
            usage,
        }
    }
}

/// Running totals for a single model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModelStats {
    pub messages: u64,
    pub input: u64,
    pub output: u64,
    pub cache_read: u64,
    pub cache_create: u64,
}

impl ModelStats {
    pub fn add(&mut self, usage: &UsageData) {
        self.messages += 1;
        self.input = self.input.saturating_add(usage.input_tokens);
        self.output = self.output.saturating_add(usage.output_tokens);
        self.cache_read = self.cache_read.saturating_add(usage.cache_read_input_tokens);
        self.cache_create = self.cache_create.saturating_add(usage.cache_creation_input_tokens);
    }
}

/// Running totals across every model in the transcript.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenTotals {
    pub input: u64,
    pub output: u64,
    pub cache_read: u64,
    pub cache_create: u64,
}

impl TokenTotals {
    pub fn add(&mut self, usage: &UsageData) {
        self.input = self.input.saturating_add(usage.input_tokens);
        self.output = self.output.saturating_add(usage.output_tokens);
        self.cache_read = self.cache_read.saturating_add(usage.cache_read_input_tokens);
        self.cache_create = self.cache_create.saturating_add(usage.cache_creation_input_tokens);
    }

    /// Fresh plus cached input.
    pub fn total_input(&self) -> u64 {
        self.input.saturating_add(self.cache_read)
    }
}
