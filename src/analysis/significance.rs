use crate::types::StudyMode;
use ndarray::ArrayView1;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};
use thiserror::Error;

/// One-sided significance level (95% confidence).
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Standard deviations at or below this are treated as zero.
const ZERO_VARIANCE_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Error, Clone, PartialEq, Serialize)]
pub enum SignificanceError {
    #[error("Curve has zero standard deviation, t-statistic is undefined")]
    ZeroVariance,
    #[error("Curve has {0} values, at least 2 are required")]
    InsufficientData(usize),
    #[error("Curve contains undefined values")]
    UndefinedValue,
    #[error("Distribution error: {0}")]
    Distribution(String),
}

pub type Result<T> = std::result::Result<T, SignificanceError>;

/// Outcome of a t-test whose statistic is defined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TTest {
    pub t_statistic: f64,
    pub p_value: f64,
    pub degrees_of_freedom: f64,
    pub significant: bool,
}

impl TTest {
    /// Lower-tail counterpart of `significant`.
    pub fn lower_tail_significant(&self, level: f64) -> bool {
        1.0 - self.p_value < level
    }
}

/// `(t_statistic, significant, positive)` for one curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SignificanceTest {
    pub t_test: TTest,
    pub positive: bool,
}

/// Tests a curve against the null hypothesis of zero mean abnormal effect.
#[derive(Debug, Clone, Copy)]
pub struct SignificanceTester {
    mode: StudyMode,
    level: f64,
}

impl SignificanceTester {
    pub fn new(mode: StudyMode) -> Self {
        Self {
            mode,
            level: SIGNIFICANCE_LEVEL,
        }
    }

    pub fn mode(&self) -> StudyMode {
        self.mode
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn test(&self, curve: ArrayView1<f64>) -> Result<SignificanceTest> {
        let t_test = self.t_test(curve)?;
        Ok(SignificanceTest {
            t_test,
            positive: self.is_positive(curve)?,
        })
    }

    /// Direction of the curve under the mode's positivity rule.
    pub fn is_positive(&self, curve: ArrayView1<f64>) -> Result<bool> {
        let mean = curve
            .mean()
            .ok_or(SignificanceError::InsufficientData(0))?;
        if mean.is_nan() {
            return Err(SignificanceError::UndefinedValue);
        }
        Ok(self.mode.is_positive(mean))
    }

    /// `t = mean / std * sqrt(n)` with `n - 1` degrees of freedom; significant
    /// when the upper-tail p-value is below the level.
    pub fn t_test(&self, curve: ArrayView1<f64>) -> Result<TTest> {
        let n = curve.len();
        if n < 2 {
            return Err(SignificanceError::InsufficientData(n));
        }
        if curve.iter().any(|x| x.is_nan()) {
            return Err(SignificanceError::UndefinedValue);
        }

        let mean = curve.mean().ok_or(SignificanceError::InsufficientData(n))?;
        let std = curve.std(0.0);
        if std <= ZERO_VARIANCE_TOLERANCE {
            return Err(SignificanceError::ZeroVariance);
        }

        let t_statistic = mean / std * (n as f64).sqrt();
        let degrees_of_freedom = (n - 1) as f64;
        let dist = StudentsT::new(0.0, 1.0, degrees_of_freedom)
            .map_err(|e| SignificanceError::Distribution(e.to_string()))?;
        let p_value = 1.0 - dist.cdf(t_statistic);

        Ok(TTest {
            t_statistic,
            p_value,
            degrees_of_freedom,
            significant: p_value < self.level,
        })
    }
}
