#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use transcript_analyzer::models::{UsageData, UsageRecord};

pub const SONNET: &str = "claude-sonnet-4-5-20250929";
pub const HAIKU: &str = "claude-3-5-haiku-20241022";

/// Write `lines` as a transcript inside a fresh temp dir.
pub fn create_transcript(lines: &[String]) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("session.jsonl");
    let mut content = lines.join("\n");
    content.push('\n');
    fs::write(&path, content).unwrap();
    (temp_dir, path)
}

/// Assistant line in the nested `message.usage` shape.
pub fn assistant_line(
    model: &str,
    input: u64,
    output: u64,
    cache_read: u64,
    cache_create: u64,
) -> String {
    format!(
        r#"{{"type":"assistant","timestamp":"2025-01-15T10:30:00Z","message":{{"id":"msg_1","role":"assistant","model":"{}","usage":{{"input_tokens":{},"output_tokens":{},"cache_read_input_tokens":{},"cache_creation_input_tokens":{}}}}}}}"#,
        model, input, output, cache_read, cache_create
    )
}

/// Line with only a top-level `usage` block and no model.
pub fn top_level_usage_line(input: u64, output: u64) -> String {
    format!(
        r#"{{"type":"result","usage":{{"input_tokens":{},"output_tokens":{}}}}}"#,
        input, output
    )
}

pub fn user_line() -> String {
    r#"{"type":"user","message":{"role":"user","content":"hello"}}"#.to_string()
}

pub fn record(
    model: &str,
    input: u64,
    output: u64,
    cache_read: u64,
    cache_create: u64,
) -> UsageRecord {
    UsageRecord::new(
        model,
        UsageData {
            input_tokens: input,
            output_tokens: output,
            cache_read_input_tokens: cache_read,
            cache_creation_input_tokens: cache_create,
        },
    )
}

/// Sonnet record whose only cache activity is `amount` cache-read tokens.
pub fn cache_read(amount: u64) -> UsageRecord {
    record(SONNET, 10, 10, amount, 0)
}
