use serde::{Deserialize, Serialize};

/// Baseline used to turn observed changes into abnormal changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyMode {
    /// Baseline is the market's own change (slope 1, intercept 0).
    MarketAdjusted,
    /// Baseline is a per-symbol OLS fit against the market.
    MarketModel,
}

impl StudyMode {
    /// Aggregation granularity used when the configuration leaves it open.
    pub fn default_granularity(self) -> Granularity {
        match self {
            StudyMode::MarketAdjusted => Granularity::Pooled,
            StudyMode::MarketModel => Granularity::PerSymbol,
        }
    }

    /// Decides whether a curve mean counts as positive.
    ///
    /// Market-adjusted studies treat a zero mean as positive, market-model
    /// studies do not. Both rules are kept as-is.
    pub fn is_positive(self, mean: f64) -> bool {
        match self {
            StudyMode::MarketAdjusted => positive_inclusive(mean),
            StudyMode::MarketModel => positive_strict(mean),
        }
    }
}

/// `mean >= 0`
pub fn positive_inclusive(mean: f64) -> bool {
    mean >= 0.0
}

/// `mean > 0`
pub fn positive_strict(mean: f64) -> bool {
    mean > 0.0
}

/// How event windows are stacked before the final reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// Every event of every symbol in one events x offsets matrix.
    Pooled,
    /// Mean curve per symbol first, then the mean across symbols.
    PerSymbol,
}

/// What to do with a symbol whose market model cannot be fitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegenerateFitPolicy {
    #[default]
    ExcludeSymbol,
    Abort,
}

/// How a window of abnormal changes is accumulated into a curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accumulation {
    /// Cumulative product of `1 + x` (compounding returns).
    Compound,
    /// Cumulative sum (volume changes).
    Additive,
}

/// The two change series an event study measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    Returns,
    Volume,
}

impl SeriesKind {
    pub fn accumulation(self) -> Accumulation {
        match self {
            SeriesKind::Returns => Accumulation::Compound,
            SeriesKind::Volume => Accumulation::Additive,
        }
    }

    /// Short label used in logs and errors.
    pub fn label(self) -> &'static str {
        match self {
            SeriesKind::Returns => "CAR",
            SeriesKind::Volume => "CAVC",
        }
    }
}
