//! Transcript Analyzer Library
//!
//! Reads a Claude session transcript (one JSON object per line) in a single streaming
//! pass, reports per-message and aggregate token usage, detects prompt-cache lifecycle
//! events and estimates cost per model, with and without the cache discount.
//!
//! ## Architecture Overview
//!
//! - [`models`] - Transcript line shapes, usage records and running totals
//! - [`parser`] - Lazy, restartable record reader that skips blank and malformed lines
//! - [`analyzer`] - Cache-event classification and the accumulating fold
//! - [`pricing`] - Externally editable price table and cost/savings computation
//! - [`display`] - Terminal table, summary and cost report, plus JSON output
//! - [`config`] - Configuration from defaults, TOML file and environment
//! - [`logging`] - Structured logging setup
//!
//! ## Main Entry Point
//!
//! [`TranscriptAnalyzer`] runs a whole transcript. For finer control, drive an
//! [`analyzer::Accumulator`] directly:
//!
//! ```rust
//! use transcript_analyzer::analyzer::{Accumulator, CacheEvent, Thresholds};
//! use transcript_analyzer::models::{UsageData, UsageRecord};
//!
//! let mut acc = Accumulator::new(Thresholds::default());
//! let write = UsageRecord::new("claude-sonnet-4-5-20250929", UsageData {
//!     cache_creation_input_tokens: 500,
//!     ..UsageData::default()
//! });
//! let read = UsageRecord::new("claude-sonnet-4-5-20250929", UsageData {
//!     cache_read_input_tokens: 500,
//!     ..UsageData::default()
//! });
//!
//! assert_eq!(acc.step(&write).event, Some(CacheEvent::CacheStart));
//! assert_eq!(acc.step(&read).event, Some(CacheEvent::FirstRead));
//! ```

pub mod analyzer;
pub mod config;
pub mod display;
pub mod logging;
pub mod models;
pub mod parser;
pub mod pricing;

pub use analyzer::TranscriptAnalyzer;
pub use models::*;
