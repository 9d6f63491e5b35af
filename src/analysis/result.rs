use super::aggregator::CurveSummary;
use super::significance::{SignificanceError, SignificanceTester, TTest};
use super::study::{Result, StudyError};
use super::window::EventWindow;
use crate::types::{Granularity, SeriesKind, StudyMode};
use ndarray::Array1;
use serde::Serialize;
use tracing::warn;

/// Result of testing one curve for significance.
///
/// A zero-variance curve has no t-statistic; that case is kept as
/// `Undefined` with its cause instead of a numeric placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveSignificance {
    Tested(TTest),
    Undefined(SignificanceError),
}

impl CurveSignificance {
    pub fn t_statistic(&self) -> Option<f64> {
        match self {
            CurveSignificance::Tested(t) => Some(t.t_statistic),
            CurveSignificance::Undefined(_) => None,
        }
    }

    pub fn is_significant(&self) -> bool {
        matches!(self, CurveSignificance::Tested(t) if t.significant)
    }
}

/// How many symbols' own curves point each way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SymbolCounts {
    pub positive: usize,
    pub negative: usize,
    pub significant_positive: usize,
    pub significant_negative: usize,
}

/// One aggregated curve (CAR or CAVC) with its statistics.
#[derive(Debug, Clone, Serialize)]
pub struct CurveStatistics {
    pub kind: SeriesKind,
    pub curve: Array1<f64>,
    pub std_err: Array1<f64>,
    pub significance: CurveSignificance,
    pub positive: bool,
    /// Per-symbol direction counts; only for per-symbol aggregation.
    pub symbol_counts: Option<SymbolCounts>,
}

impl CurveStatistics {
    pub fn t_statistic(&self) -> Option<f64> {
        self.significance.t_statistic()
    }

    pub fn significant(&self) -> bool {
        self.significance.is_significant()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    NoUsableEvents,
    DegenerateFit(SeriesKind),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExcludedSymbol {
    pub symbol: String,
    pub reason: ExclusionReason,
}

/// Cumulative abnormal returns and volume changes of one study run.
#[derive(Debug, Clone, Serialize)]
pub struct CarsCavcsResult {
    pub mode: StudyMode,
    pub granularity: Granularity,
    pub window: EventWindow,
    /// Events that contributed to the curves.
    pub num_events: usize,
    /// Every other marker of a studied symbol: windows off the calendar,
    /// curves that could not be formed, and all events of excluded symbols.
    /// `num_events + num_excluded_events` is the number of markers studied.
    pub num_excluded_events: usize,
    pub symbols: Vec<String>,
    pub excluded_symbols: Vec<ExcludedSymbol>,
    pub cars: CurveStatistics,
    pub cavcs: Option<CurveStatistics>,
}

impl CarsCavcsResult {
    pub fn num_symbols(&self) -> usize {
        self.symbols.len()
    }
}

/// Reduced curves of one series kind, ready for testing.
#[derive(Debug, Clone)]
pub struct AggregatedCurves {
    pub kind: SeriesKind,
    pub overall: CurveSummary,
    /// Symbol-level curves; empty for pooled aggregation.
    pub per_symbol: Vec<(String, CurveSummary)>,
}

/// Everything the assembler needs, gathered after aggregation.
#[derive(Debug, Clone)]
pub struct StudyCurves {
    pub num_events: usize,
    pub num_excluded_events: usize,
    pub symbols: Vec<String>,
    pub excluded_symbols: Vec<ExcludedSymbol>,
    pub cars: AggregatedCurves,
    pub cavcs: Option<AggregatedCurves>,
}

/// Tests the aggregated curves and packages them into a [`CarsCavcsResult`].
#[derive(Debug, Clone, Copy)]
pub struct ResultAssembler {
    tester: SignificanceTester,
    granularity: Granularity,
    window: EventWindow,
    strict: bool,
}

impl ResultAssembler {
    /// With `strict`, an undefined t-statistic on an overall curve fails the run.
    pub fn new(tester: SignificanceTester, granularity: Granularity, window: EventWindow, strict: bool) -> Self {
        Self {
            tester,
            granularity,
            window,
            strict,
        }
    }

    pub fn assemble(&self, curves: StudyCurves) -> Result<CarsCavcsResult> {
        let cars = self.curve_statistics(&curves.cars)?;
        let cavcs = curves
            .cavcs
            .as_ref()
            .map(|c| self.curve_statistics(c))
            .transpose()?;

        Ok(CarsCavcsResult {
            mode: self.tester.mode(),
            granularity: self.granularity,
            window: self.window,
            num_events: curves.num_events,
            num_excluded_events: curves.num_excluded_events,
            symbols: curves.symbols,
            excluded_symbols: curves.excluded_symbols,
            cars,
            cavcs,
        })
    }

    fn curve_statistics(&self, curves: &AggregatedCurves) -> Result<CurveStatistics> {
        let accumulation = curves.kind.accumulation();
        let excess = curves.overall.excess(accumulation);
        let undefined = |source| StudyError::StatisticalUndefined {
            kind: curves.kind,
            source,
        };

        let positive = self.tester.is_positive(excess.view()).map_err(undefined)?;
        let significance = match self.tester.t_test(excess.view()) {
            Ok(t_test) => CurveSignificance::Tested(t_test),
            Err(err) if !self.strict => {
                warn!(curve = curves.kind.label(), error = %err, "t-statistic undefined");
                CurveSignificance::Undefined(err)
            }
            Err(err) => return Err(undefined(err)),
        };

        let symbol_counts = match self.granularity {
            Granularity::PerSymbol => Some(self.symbol_counts(curves)),
            Granularity::Pooled => None,
        };

        Ok(CurveStatistics {
            kind: curves.kind,
            curve: curves.overall.mean.clone(),
            std_err: curves.overall.std_err.clone(),
            significance,
            positive,
            symbol_counts,
        })
    }

    /// Symbols whose own curve has an undefined mean are left out of every count.
    fn symbol_counts(&self, curves: &AggregatedCurves) -> SymbolCounts {
        let accumulation = curves.kind.accumulation();
        let mut counts = SymbolCounts::default();
        for (_, summary) in &curves.per_symbol {
            let excess = summary.excess(accumulation);
            let Ok(positive) = self.tester.is_positive(excess.view()) else {
                continue;
            };
            let t_test = self.tester.t_test(excess.view()).ok();
            if positive {
                counts.positive += 1;
                if t_test.is_some_and(|t| t.significant) {
                    counts.significant_positive += 1;
                }
            } else {
                counts.negative += 1;
                if t_test.is_some_and(|t| t.lower_tail_significant(self.tester.level())) {
                    counts.significant_negative += 1;
                }
            }
        }
        counts
    }
}
