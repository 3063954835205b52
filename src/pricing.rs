//! Model pricing and cost estimation
//!
//! Rates are USD per million tokens, keyed by exact model identifier. The built-in
//! table is `config/pricing.toml`; a file of the same shape replaces it wholesale.
//! Looking up a model that is not in the table yields [`Pricing::Unpriced`], which
//! the report shows as an unknown cost rather than as zero.

use crate::analyzer::AnalysisSummary;
use crate::models::ModelStats;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

const BUILTIN_PRICING: &str = include_str!("../config/pricing.toml");

const TOKENS_PER_UNIT: f64 = 1_000_000.0;

/// Per-million-token rates for one model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelRates {
    pub input: f64,
    pub cache_write: f64,
    pub cache_read: f64,
    pub output: f64,
}

impl ModelRates {
    pub const fn new(input: f64, cache_write: f64, cache_read: f64, output: f64) -> Self {
        Self {
            input,
            cache_write,
            cache_read,
            output,
        }
    }

    /// Cost of `stats` with cache reads and writes billed at their own rates.
    pub fn cost(&self, stats: &ModelStats) -> f64 {
        per_million(stats.input, self.input)
            + per_million(stats.output, self.output)
            + per_million(stats.cache_read, self.cache_read)
            + per_million(stats.cache_create, self.cache_write)
    }

    /// Cost of `stats` had every cache read been fresh input and nothing been cached.
    pub fn cost_without_cache(&self, stats: &ModelStats) -> f64 {
        per_million(stats.input.saturating_add(stats.cache_read), self.input)
            + per_million(stats.output, self.output)
    }

    fn validate(&self, model: &str) -> Result<()> {
        for (name, rate) in [
            ("input", self.input),
            ("cache_write", self.cache_write),
            ("cache_read", self.cache_read),
            ("output", self.output),
        ] {
            if !rate.is_finite() || rate < 0.0 {
                anyhow::bail!("Invalid {} rate for {}: {}", name, model, rate);
            }
        }
        Ok(())
    }
}

fn per_million(tokens: u64, rate: f64) -> f64 {
    tokens as f64 / TOKENS_PER_UNIT * rate
}

/// Result of a price lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pricing<'a> {
    Known(&'a ModelRates),
    Unpriced,
}

impl<'a> Pricing<'a> {
    pub fn rates(self) -> Option<&'a ModelRates> {
        match self {
            Pricing::Known(rates) => Some(rates),
            Pricing::Unpriced => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub models: BTreeMap<String, ModelRates>,
}

impl PriceTable {
    /// The table shipped with the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_PRICING).context("Built-in pricing table is invalid")
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let table: PriceTable = toml::from_str(content)?;
        for (model, rates) in &table.models {
            rates.validate(model)?;
        }
        Ok(table)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read pricing file: {}", path.display()))?;

        let table = Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse pricing file: {}", path.display()))?;

        info!(
            path = %path.display(),
            models = table.models.len(),
            version = table.version.as_deref().unwrap_or("unversioned"),
            "Loaded pricing table"
        );
        Ok(table)
    }

    /// Load from `path` when given, otherwise the built-in table.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Self::builtin(),
        }
    }

    pub fn insert(&mut self, model: impl Into<String>, rates: ModelRates) {
        self.models.insert(model.into(), rates);
    }

    pub fn lookup(&self, model: &str) -> Pricing<'_> {
        match self.models.get(model) {
            Some(rates) => Pricing::Known(rates),
            None => Pricing::Unpriced,
        }
    }
}

/// One row of the per-model breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelCost {
    pub model: String,
    pub stats: ModelStats,
    /// `None` when the model is not in the price table
    pub cost: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Savings {
    pub cost_without_cache: f64,
    pub savings: f64,
    /// `None` when nothing priced would have been billed without the cache
    pub percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostReport {
    pub models: Vec<ModelCost>,
    pub total_cost: f64,
    /// Present only when the transcript read anything from the cache
    pub savings: Option<Savings>,
}

impl CostReport {
    pub fn compute(summary: &AnalysisSummary, table: &PriceTable) -> Self {
        let models: Vec<ModelCost> = summary
            .models
            .iter()
            .map(|(model, stats)| ModelCost {
                model: model.clone(),
                stats: *stats,
                cost: table.lookup(model).rates().map(|rates| rates.cost(stats)),
            })
            .collect();

        let total_cost = models.iter().filter_map(|m| m.cost).fold(0.0, |acc, c| acc + c);

        let savings = (summary.totals.cache_read > 0).then(|| {
            let cost_without_cache = models
                .iter()
                .filter_map(|m| {
                    table
                        .lookup(&m.model)
                        .rates()
                        .map(|rates| rates.cost_without_cache(&m.stats))
                })
                .fold(0.0, |acc, c| acc + c);
            let savings = cost_without_cache - total_cost;
            let percent =
                (cost_without_cache > 0.0).then(|| savings / cost_without_cache * 100.0);
            Savings {
                cost_without_cache,
                savings,
                percent,
            }
        });

        debug!(
            total_cost,
            unpriced = models.iter().filter(|m| m.cost.is_none()).count(),
            "Computed costs"
        );

        Self {
            models,
            total_cost,
            savings,
        }
    }
}
