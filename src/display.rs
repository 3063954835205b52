//! Report Rendering
//!
//! This module renders analysis results as a fixed-width terminal report or as a
//! single JSON document. Every method writes into a caller-supplied [`Write`] so the
//! binary can stream to stdout while tests capture into a buffer.
//!
//! ## Report Layout
//!
//! ### Per-record Table
//! One row per usage record: message index, the four raw token counts, the running
//! fresh-input total (`Ctx`), cache efficiency and the cache event label.
//!
//! ### Summary
//! Message count, fresh vs cached vs total input, output, cache writes and the overall
//! cache efficiency when anything was read from the cache.
//!
//! ### Per-model Breakdown & Costs
//! Models sorted by identifier with their token sums and cost, or an unknown-cost
//! marker for models missing from the price table, followed by the grand total.
//!
//! ### Cache Savings
//! Only when cache reads occurred: the hypothetical cost without caching and the
//! savings relative to it.
//!
//! ## Number Formatting
//!
//! Token counts are abbreviated with [`format_number`]: `999`, `1.0k`, `1.0m`.
//!
//! Colors come from the `colored` crate and honor its global override, so
//! `colored::control::set_override(false)` yields plain text.

use crate::analyzer::{AnalysisSummary, CacheEvent, LineReport};
use crate::pricing::{CostReport, ModelCost, Savings};
use anyhow::{Context, Result};
use colored::{ColoredString, Colorize};
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

pub const DEFAULT_TABLE_WIDTH: usize = 130;

/// Abbreviate a token count with a `k` or `m` suffix.
pub fn format_number(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}m", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}k", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

fn format_efficiency(efficiency: Option<f64>) -> String {
    match efficiency {
        Some(pct) => format!("{:.2}", pct),
        None => "-".to_string(),
    }
}

fn event_label(event: &CacheEvent) -> ColoredString {
    let label = event.to_string();
    match event {
        CacheEvent::CacheStart => label.bright_green(),
        CacheEvent::FirstRead => label.bright_cyan(),
        CacheEvent::Invalidation { .. } => label.bright_red().bold(),
        CacheEvent::Grew { .. } => label.bright_yellow(),
    }
}

#[derive(Serialize)]
struct JsonSummary {
    messages: u64,
    fresh_input: u64,
    cached_input: u64,
    total_input: u64,
    output: u64,
    cache_written: u64,
    cache_efficiency: Option<f64>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    file: String,
    records: &'a [LineReport],
    summary: JsonSummary,
    models: &'a [ModelCost],
    total_cost: f64,
    savings: Option<&'a Savings>,
}

pub struct DisplayManager {
    table_width: usize,
}

impl Default for DisplayManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayManager {
    pub fn new() -> Self {
        Self {
            table_width: DEFAULT_TABLE_WIDTH,
        }
    }

    pub fn with_table_width(table_width: usize) -> Self {
        Self { table_width }
    }

    fn rule(&self) -> ColoredString {
        "=".repeat(self.table_width).bright_cyan()
    }

    pub fn write_header<W: Write>(&self, out: &mut W, path: &Path) -> io::Result<()> {
        writeln!(out, "Analyzing: {}\n", path.display().to_string().bright_white())?;
        let header = format!(
            "{:>5} {:>8} {:>8} {:>8} {:>8} {:>8} {:>7} {}",
            "Msg#", "Input", "Output", "CacheR", "CacheC", "Ctx", "Eff%", "Event"
        );
        writeln!(out, "{}", header.bold())?;
        writeln!(out, "{}", self.rule())
    }

    pub fn write_line<W: Write>(&self, out: &mut W, line: &LineReport) -> io::Result<()> {
        let row = format!(
            "{:>5} {:>8} {:>8} {:>8} {:>8} {:>8} {:>7}",
            line.message_num,
            format_number(line.input),
            format_number(line.output),
            format_number(line.cache_read),
            format_number(line.cache_create),
            format_number(line.cumulative_input),
            format_efficiency(line.efficiency),
        );
        match &line.event {
            Some(event) => writeln!(out, "{} {}", row, event_label(event)),
            None => writeln!(out, "{} ", row),
        }
    }

    pub fn write_summary<W: Write>(
        &self,
        out: &mut W,
        summary: &AnalysisSummary,
    ) -> io::Result<()> {
        let totals = &summary.totals;

        writeln!(out, "{}", self.rule())?;
        writeln!(out, "\n{}", "SUMMARY:".bright_white().bold())?;
        writeln!(out, "Total Messages: {}", summary.message_count.to_string().bold())?;
        writeln!(out, "\nInput Tokens:")?;
        writeln!(out, "  Fresh (non-cached): {}", format_number(totals.input))?;
        writeln!(out, "  From Cache:         {}", format_number(totals.cache_read))?;
        writeln!(
            out,
            "  TOTAL INPUT:        {}",
            format_number(totals.total_input()).bold()
        )?;
        writeln!(out, "\nOutput Tokens:        {}", format_number(totals.output))?;
        writeln!(out, "Cache Written:        {}", format_number(totals.cache_create))?;
        writeln!(
            out,
            "\nNote: 'Ctx' column shows cumulative fresh input tokens (running total)"
        )?;

        if let Some(efficiency) = summary.overall_efficiency() {
            writeln!(
                out,
                "\nCache Efficiency: {}",
                format!("{:.2}%", efficiency).bright_green().bold()
            )?;
        }
        Ok(())
    }

    pub fn write_costs<W: Write>(&self, out: &mut W, costs: &CostReport) -> io::Result<()> {
        writeln!(out, "\n{}", self.rule())?;
        writeln!(out, "\n{}", "PER-MODEL BREAKDOWN & COSTS:".bright_white().bold())?;

        for model in &costs.models {
            let stats = &model.stats;
            writeln!(out, "\n{}:", model.model.bright_cyan())?;
            writeln!(out, "  Messages: {}", stats.messages)?;
            writeln!(out, "  Input:    {}", format_number(stats.input))?;
            writeln!(out, "  Output:   {}", format_number(stats.output))?;
            writeln!(out, "  Cache R:  {}", format_number(stats.cache_read))?;
            writeln!(out, "  Cache W:  {}", format_number(stats.cache_create))?;
            match model.cost {
                Some(cost) => writeln!(
                    out,
                    "  Cost:     {}",
                    format!("${:.4}", cost).bright_green()
                )?,
                None => writeln!(
                    out,
                    "  Cost:     {}",
                    "Unknown (pricing not available)".yellow()
                )?,
            }
        }

        writeln!(
            out,
            "\n{:<20} {}",
            "TOTAL COST:",
            format!("${:.4}", costs.total_cost).bright_green().bold()
        )?;
        writeln!(out, "{:<20} ${:.2}", "=", costs.total_cost)
    }

    pub fn write_savings<W: Write>(&self, out: &mut W, savings: &Savings) -> io::Result<()> {
        writeln!(
            out,
            "\nCost without cache:  ${:.2}",
            savings.cost_without_cache
        )?;
        let percent = match savings.percent {
            Some(pct) => format!("{:.1}%", pct),
            None => "n/a".to_string(),
        };
        writeln!(
            out,
            "Savings from cache:  {} ({})",
            format!("${:.2}", savings.savings).bright_green().bold(),
            percent
        )
    }

    pub fn write_json<W: Write>(
        &self,
        out: &mut W,
        path: &Path,
        lines: &[LineReport],
        summary: &AnalysisSummary,
        costs: &CostReport,
        pretty: bool,
    ) -> Result<()> {
        let totals = &summary.totals;
        let report = JsonReport {
            file: path.display().to_string(),
            records: lines,
            summary: JsonSummary {
                messages: summary.message_count,
                fresh_input: totals.input,
                cached_input: totals.cache_read,
                total_input: totals.total_input(),
                output: totals.output,
                cache_written: totals.cache_create,
                cache_efficiency: summary.overall_efficiency(),
            },
            models: &costs.models,
            total_cost: costs.total_cost,
            savings: costs.savings.as_ref(),
        };

        let written = if pretty {
            serde_json::to_writer_pretty(&mut *out, &report)
        } else {
            serde_json::to_writer(&mut *out, &report)
        };
        written.context("Error serializing report to JSON")?;
        writeln!(out)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number_boundaries() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1_000), "1.0k");
        assert_eq!(format_number(12_345), "12.3k");
        assert_eq!(format_number(999_999), "1000.0k");
        assert_eq!(format_number(1_000_000), "1.0m");
        assert_eq!(format_number(2_450_000), "2.5m");
    }

    #[test]
    fn test_format_efficiency() {
        assert_eq!(format_efficiency(None), "-");
        assert_eq!(format_efficiency(Some(83.333)), "83.33");
    }
}
