//! Cache-Event Analysis Engine
//!
//! This module folds a stream of [`UsageRecord`]s into running totals and classifies
//! every record against the one before it to surface prompt-cache lifecycle events.
//!
//! ## Core Functionality
//!
//! ### The Fold
//! [`Accumulator::step`] is the whole per-record state transition. It:
//! 1. Counts the message
//! 2. Adds the four token fields to the global totals and to the record's [`ModelStats`]
//! 3. Computes the per-record cache efficiency
//! 4. Classifies the cache transition with [`classify`]
//! 5. Replaces the previous-record [`CacheSnapshot`]
//!
//! ### Event Classification
//! [`classify`] is pure and compares against the *previous record's* cache counters,
//! never the running totals. First matching rule wins:
//! - **CacheStart**: cache writes begin after a record with none
//! - **FirstRead**: cache reads begin after a record with none
//! - **Invalidation**: cache reads drop by at least the invalidation threshold
//! - **Grew**: cache reads grow by at least the growth threshold
//!
//! ## Orchestration
//!
//! [`TranscriptAnalyzer`] runs one transcript end to end: reader, fold, pricing and
//! rendering.
//!
//! ```rust,no_run
//! use transcript_analyzer::analyzer::{RunOptions, TranscriptAnalyzer};
//! use transcript_analyzer::pricing::PriceTable;
//!
//! # fn example() -> anyhow::Result<()> {
//! let analyzer = TranscriptAnalyzer::new(PriceTable::builtin()?);
//! let mut out = std::io::stdout().lock();
//! analyzer.run_file("session.jsonl", &RunOptions::default(), &mut out)?;
//! # Ok(())
//! # }
//! ```

use crate::display::{format_number, DisplayManager};
use crate::models::{ModelStats, TokenTotals, UsageRecord};
use crate::parser::{RecordProcessor, TranscriptReader};
use crate::pricing::{CostReport, PriceTable};
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, info_span};
use uuid::Uuid;

pub const DEFAULT_INVALIDATION_THRESHOLD: u64 = 10_000;
pub const DEFAULT_GROWTH_THRESHOLD: u64 = 1_000;

/// Minimum cache-read movements that count as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub invalidation: u64,
    pub growth: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            invalidation: DEFAULT_INVALIDATION_THRESHOLD,
            growth: DEFAULT_GROWTH_THRESHOLD,
        }
    }
}

/// Cache counters of a single record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheSnapshot {
    pub read: u64,
    pub create: u64,
}

impl From<&UsageRecord> for CacheSnapshot {
    fn from(record: &UsageRecord) -> Self {
        Self {
            read: record.usage.cache_read_input_tokens,
            create: record.usage.cache_creation_input_tokens,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CacheEvent {
    CacheStart,
    FirstRead,
    Invalidation { drop: u64 },
    Grew { growth: u64 },
}

impl fmt::Display for CacheEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheEvent::CacheStart => write!(f, "🆕 CACHE START"),
            CacheEvent::FirstRead => write!(f, "⚡ CACHE READ"),
            CacheEvent::Invalidation { drop } => {
                write!(f, "🔄 INVALIDATION (↓{})", format_number(*drop))
            }
            CacheEvent::Grew { growth } => write!(f, "📈 GREW (+{})", format_number(*growth)),
        }
    }
}

/// Classify the transition from `prev` to `current`.
pub fn classify(
    prev: CacheSnapshot,
    current: CacheSnapshot,
    thresholds: Thresholds,
) -> Option<CacheEvent> {
    if current.create > 0 && prev.create == 0 {
        Some(CacheEvent::CacheStart)
    } else if current.read > 0 && prev.read == 0 {
        Some(CacheEvent::FirstRead)
    } else if prev.read > 0 && current.read < prev.read {
        let drop = prev.read - current.read;
        (drop >= thresholds.invalidation).then_some(CacheEvent::Invalidation { drop })
    } else if prev.read > 0 && current.read > prev.read {
        let growth = current.read - prev.read;
        (growth >= thresholds.growth).then_some(CacheEvent::Grew { growth })
    } else {
        None
    }
}

/// Share of a record's input served from cache, as a percentage.
pub fn cache_efficiency(input: u64, cache_read: u64) -> Option<f64> {
    (cache_read > 0).then(|| cache_read as f64 / (input as f64 + cache_read as f64) * 100.0)
}

/// Per-record output of one fold step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineReport {
    pub message_num: u64,
    pub model: String,
    pub input: u64,
    pub output: u64,
    pub cache_read: u64,
    pub cache_create: u64,
    /// Running total of fresh input tokens, cache reads excluded
    pub cumulative_input: u64,
    pub efficiency: Option<f64>,
    pub event: Option<CacheEvent>,
}

/// Final state of a fold.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisSummary {
    pub message_count: u64,
    pub totals: TokenTotals,
    pub models: BTreeMap<String, ModelStats>,
}

impl AnalysisSummary {
    pub fn overall_efficiency(&self) -> Option<f64> {
        cache_efficiency(self.totals.input, self.totals.cache_read)
    }
}

/// Running state of the fold over a transcript.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    thresholds: Thresholds,
    message_num: u64,
    totals: TokenTotals,
    models: BTreeMap<String, ModelStats>,
    prev: CacheSnapshot,
}

impl Accumulator {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            ..Self::default()
        }
    }

    /// Fold one record into the state and report on it.
    pub fn step(&mut self, record: &UsageRecord) -> LineReport {
        let usage = &record.usage;
        self.message_num += 1;
        self.totals.add(usage);
        self.models.entry(record.model.clone()).or_default().add(usage);

        let current = CacheSnapshot::from(record);
        let event = classify(self.prev, current, self.thresholds);
        if let Some(CacheEvent::Invalidation { drop }) = event {
            info!(
                line = record.line_number,
                drop,
                previous = self.prev.read,
                current = current.read,
                "Cache invalidation detected"
            );
        }
        self.prev = current;

        LineReport {
            message_num: self.message_num,
            model: record.model.clone(),
            input: usage.input_tokens,
            output: usage.output_tokens,
            cache_read: usage.cache_read_input_tokens,
            cache_create: usage.cache_creation_input_tokens,
            cumulative_input: self.totals.input,
            efficiency: cache_efficiency(usage.input_tokens, usage.cache_read_input_tokens),
            event,
        }
    }

    pub fn message_num(&self) -> u64 {
        self.message_num
    }

    pub fn totals(&self) -> &TokenTotals {
        &self.totals
    }

    pub fn previous(&self) -> CacheSnapshot {
        self.prev
    }

    pub fn model_stats(&self, model: &str) -> Option<&ModelStats> {
        self.models.get(model)
    }

    pub fn finish(self) -> AnalysisSummary {
        AnalysisSummary {
            message_count: self.message_num,
            totals: self.totals,
            models: self.models,
        }
    }
}

/// Fold `records` and hand each per-record report to `on_line`.
pub fn analyze_records<I, F>(
    records: I,
    thresholds: Thresholds,
    mut on_line: F,
) -> Result<AnalysisSummary>
where
    I: IntoIterator<Item = Result<UsageRecord>>,
    F: FnMut(&LineReport) -> Result<()>,
{
    let mut acc = Accumulator::new(thresholds);
    for record in records {
        let line = acc.step(&record?);
        on_line(&line)?;
    }
    Ok(acc.finish())
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub json_output: bool,
    pub json_pretty: bool,
}

// Processor that folds records and streams table rows to a writer
struct TableProcessor<'a, W: Write> {
    acc: Accumulator,
    display: &'a DisplayManager,
    out: &'a mut W,
}

impl<W: Write> RecordProcessor for TableProcessor<'_, W> {
    type Output = AnalysisSummary;

    fn process_record(&mut self, record: UsageRecord) -> Result<()> {
        let line = self.acc.step(&record);
        self.display.write_line(&mut *self.out, &line)?;
        Ok(())
    }

    fn finalize(self) -> Result<Self::Output> {
        Ok(self.acc.finish())
    }
}

// Processor that folds records and keeps every row for the JSON document
struct CollectingProcessor {
    acc: Accumulator,
    lines: Vec<LineReport>,
}

impl RecordProcessor for CollectingProcessor {
    type Output = (Vec<LineReport>, AnalysisSummary);

    fn process_record(&mut self, record: UsageRecord) -> Result<()> {
        let line = self.acc.step(&record);
        self.lines.push(line);
        Ok(())
    }

    fn finalize(self) -> Result<Self::Output> {
        Ok((self.lines, self.acc.finish()))
    }
}

pub struct TranscriptAnalyzer {
    display_manager: DisplayManager,
    pricing: PriceTable,
    thresholds: Thresholds,
}

impl TranscriptAnalyzer {
    pub fn new(pricing: PriceTable) -> Self {
        Self {
            display_manager: DisplayManager::new(),
            pricing,
            thresholds: Thresholds::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_display(mut self, display_manager: DisplayManager) -> Self {
        self.display_manager = display_manager;
        self
    }

    /// Analyze the transcript at `path` and write the full report to `out`.
    pub fn run_file<W: Write>(
        &self,
        path: impl AsRef<Path>,
        options: &RunOptions,
        out: &mut W,
    ) -> Result<AnalysisSummary> {
        let path = path.as_ref();
        let span = info_span!("analyze", run_id = %Uuid::new_v4(), path = %path.display());
        let _enter = span.enter();

        let reader = TranscriptReader::open(path)?;

        let summary = if options.json_output {
            let (lines, summary) = reader.process(CollectingProcessor {
                acc: Accumulator::new(self.thresholds),
                lines: Vec::new(),
            })?;
            let costs = CostReport::compute(&summary, &self.pricing);
            self.display_manager.write_json(
                out,
                path,
                &lines,
                &summary,
                &costs,
                options.json_pretty,
            )?;
            summary
        } else {
            self.display_manager.write_header(out, path)?;
            let summary = reader.process(TableProcessor {
                acc: Accumulator::new(self.thresholds),
                display: &self.display_manager,
                out: &mut *out,
            })?;
            let costs = CostReport::compute(&summary, &self.pricing);
            self.display_manager.write_summary(out, &summary)?;
            self.display_manager.write_costs(out, &costs)?;
            if let Some(savings) = &costs.savings {
                self.display_manager.write_savings(out, savings)?;
            }
            summary
        };

        debug!(
            messages = summary.message_count,
            models = summary.models.len(),
            "Analysis complete"
        );
        Ok(summary)
    }
}
