use super::aggregator::CurveSummary;
use super::market_model::{EstimationWindow, MarketModelParameters};
use crate::types::SeriesKind;
use ndarray::ArrayView1;
use tracing::debug;

/// Hooks invoked by the study for each symbol, e.g. to draw diagnostic
/// regression plots. Called from worker threads, in no particular order.
pub trait StudyObserver: Sync {
    /// A baseline was fitted; `market` and `symbol` are the estimation-window
    /// slices the fit used.
    fn on_fit(
        &self,
        _symbol: &str,
        _kind: SeriesKind,
        _params: &MarketModelParameters,
        _window: &EstimationWindow,
        _market: ArrayView1<f64>,
        _symbol_changes: ArrayView1<f64>,
    ) {
    }

    /// Symbol-level curves, before the cross-symbol reduction.
    fn on_symbol_curves(&self, _symbol: &str, _cars: &CurveSummary, _cavcs: Option<&CurveSummary>) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl StudyObserver for NoopObserver {}

/// Logs every callback at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl StudyObserver for TracingObserver {
    fn on_fit(
        &self,
        symbol: &str,
        kind: SeriesKind,
        params: &MarketModelParameters,
        window: &EstimationWindow,
        _market: ArrayView1<f64>,
        _symbol_changes: ArrayView1<f64>,
    ) {
        debug!(
            symbol,
            series = kind.label(),
            slope = params.slope,
            intercept = params.intercept,
            window_start = window.start,
            window_end = window.end,
            "Fitted market model"
        );
    }

    fn on_symbol_curves(&self, symbol: &str, cars: &CurveSummary, cavcs: Option<&CurveSummary>) {
        debug!(
            symbol,
            events = cars.count,
            final_car = cars.mean.iter().last().copied().unwrap_or(f64::NAN),
            final_cavc = cavcs
                .and_then(|c| c.mean.iter().last().copied())
                .unwrap_or(f64::NAN),
            "Symbol curves"
        );
    }
}
