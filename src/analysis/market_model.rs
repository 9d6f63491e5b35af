use crate::types::StudyMode;
use ndarray::{s, Array1, Array2, ArrayView1};
use ndarray_linalg::solve::Solve;
use serde::Serialize;
use std::ops::Range;
use thiserror::Error;

/// Centred market variance, relative to the raw sum of squares, below which
/// the market column is treated as constant.
const DEGENERATE_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Error)]
pub enum MarketModelError {
    #[error("Linear algebra error: {0}")]
    LinAlgError(#[from] ndarray_linalg::error::LinalgError),
    #[error("Market and symbol series differ in length ({market} vs {symbol})")]
    LengthMismatch { market: usize, symbol: usize },
    #[error("Estimation window {start}..{end} exceeds series of length {len}")]
    WindowOutOfBounds { start: usize, end: usize, len: usize },
    #[error("Estimation window has {0} observations, at least 2 are required")]
    InsufficientObservations(usize),
    #[error("Undefined value at index {0} inside the estimation window")]
    UndefinedValue(usize),
    #[error("Market change has no variance over the estimation window")]
    DegenerateFit,
}

pub type Result<T> = std::result::Result<T, MarketModelError>;

/// Half-open range of calendar indices used only for fitting a baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EstimationWindow {
    pub start: usize,
    pub end: usize,
}

impl EstimationWindow {
    /// `[anchor - buffer - length, anchor - buffer)`, or `None` when that
    /// range would start before the first calendar day.
    pub fn preceding(anchor: usize, buffer: usize, length: usize) -> Option<Self> {
        let end = anchor.checked_sub(buffer)?;
        let start = end.checked_sub(length)?;
        Some(Self { start, end })
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// `symbol_change ≈ slope * market_change + intercept`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarketModelParameters {
    pub slope: f64,
    pub intercept: f64,
}

impl MarketModelParameters {
    /// Baseline of the market-adjusted model.
    pub const IDENTITY: Self = Self {
        slope: 1.0,
        intercept: 0.0,
    };

    pub fn predict(&self, market_change: f64) -> f64 {
        self.slope * market_change + self.intercept
    }

    pub fn predict_series(&self, market: ArrayView1<f64>) -> Array1<f64> {
        market.mapv(|m| self.predict(m))
    }
}

/// Ordinary least squares of `symbol` on `[market, 1]` over `window`.
///
/// The market column enters the design matrix centred on its window mean and
/// the intercept is shifted back afterwards. A market column without variance
/// is reported as [`MarketModelError::DegenerateFit`].
pub fn fit(
    market: ArrayView1<f64>,
    symbol: ArrayView1<f64>,
    window: &EstimationWindow,
) -> Result<MarketModelParameters> {
    if market.len() != symbol.len() {
        return Err(MarketModelError::LengthMismatch {
            market: market.len(),
            symbol: symbol.len(),
        });
    }
    if window.end > market.len() || window.start > window.end {
        return Err(MarketModelError::WindowOutOfBounds {
            start: window.start,
            end: window.end,
            len: market.len(),
        });
    }
    let n_obs = window.len();
    if n_obs < 2 {
        return Err(MarketModelError::InsufficientObservations(n_obs));
    }

    let x = market.slice(s![window.range()]);
    let y = symbol.slice(s![window.range()]);
    if let Some(offset) = x
        .iter()
        .zip(y.iter())
        .position(|(xi, yi)| xi.is_nan() || yi.is_nan())
    {
        return Err(MarketModelError::UndefinedValue(window.start + offset));
    }

    let market_mean = x
        .mean()
        .ok_or(MarketModelError::InsufficientObservations(n_obs))?;
    let centred = x.mapv(|m| m - market_mean);
    if centred.dot(&centred) <= DEGENERATE_TOLERANCE * x.dot(&x) {
        return Err(MarketModelError::DegenerateFit);
    }

    let mut design = Array2::ones((n_obs, 2));
    design.column_mut(0).assign(&centred);

    // (X'X) b = X'y
    let xtx = design.t().dot(&design);
    let xty = design.t().dot(&y);
    let coefficients = xtx.solve(&xty)?;

    let slope = coefficients[0];
    Ok(MarketModelParameters {
        slope,
        intercept: coefficients[1] - slope * market_mean,
    })
}

/// A fitted baseline and the change it predicts for every calendar day.
#[derive(Debug, Clone)]
pub struct BaselineEstimate {
    pub parameters: MarketModelParameters,
    pub predicted: Array1<f64>,
}

/// Predicts the "normal" change of a symbol from the market's change.
pub trait BaselineModel: Send + Sync {
    /// Whether the model is fitted on an estimation window at all.
    fn requires_estimation(&self) -> bool;

    fn parameters(
        &self,
        market: ArrayView1<f64>,
        symbol: ArrayView1<f64>,
        window: &EstimationWindow,
    ) -> Result<MarketModelParameters>;

    /// Predicted change for every day of `market`.
    fn estimate(
        &self,
        market: ArrayView1<f64>,
        symbol: ArrayView1<f64>,
        window: &EstimationWindow,
    ) -> Result<BaselineEstimate> {
        let parameters = self.parameters(market, symbol, window)?;
        Ok(BaselineEstimate {
            parameters,
            predicted: parameters.predict_series(market),
        })
    }
}

/// Abnormal change is the symbol's change minus the market's.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarketAdjustedBaseline;

impl BaselineModel for MarketAdjustedBaseline {
    fn requires_estimation(&self) -> bool {
        false
    }

    fn parameters(
        &self,
        _market: ArrayView1<f64>,
        _symbol: ArrayView1<f64>,
        _window: &EstimationWindow,
    ) -> Result<MarketModelParameters> {
        Ok(MarketModelParameters::IDENTITY)
    }
}

/// Abnormal change is measured against a per-symbol OLS fit.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarketModelBaseline;

impl BaselineModel for MarketModelBaseline {
    fn requires_estimation(&self) -> bool {
        true
    }

    fn parameters(
        &self,
        market: ArrayView1<f64>,
        symbol: ArrayView1<f64>,
        window: &EstimationWindow,
    ) -> Result<MarketModelParameters> {
        fit(market, symbol, window)
    }
}

pub fn baseline_for(mode: StudyMode) -> Box<dyn BaselineModel> {
    match mode {
        StudyMode::MarketAdjusted => Box::new(MarketAdjustedBaseline),
        StudyMode::MarketModel => Box::new(MarketModelBaseline),
    }
}
