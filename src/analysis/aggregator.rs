use super::window::EventWindow;
use crate::types::Accumulation;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::Serialize;

/// Per-offset mean and standard deviation of a stack of curves.
#[derive(Debug, Clone, Serialize)]
pub struct CurveSummary {
    pub mean: Array1<f64>,
    pub std_err: Array1<f64>,
    /// Number of stacked rows (events or symbols).
    pub count: usize,
}

impl CurveSummary {
    /// The curve as a deviation from "no abnormal effect": `mean - 1` for
    /// compounded curves, `mean` for additive ones.
    pub fn excess(&self, accumulation: Accumulation) -> Array1<f64> {
        match accumulation {
            Accumulation::Compound => self.mean.mapv(|x| x - 1.0),
            Accumulation::Additive => self.mean.clone(),
        }
    }
}

/// Cumulative product of `1 + x`.
pub fn compound(abnormal: ArrayView1<f64>) -> Array1<f64> {
    let mut level = 1.0;
    abnormal
        .iter()
        .map(|&x| {
            level *= 1.0 + x;
            level
        })
        .collect()
}

/// Cumulative sum.
pub fn cumulative_sum(abnormal: ArrayView1<f64>) -> Array1<f64> {
    let mut total = 0.0;
    abnormal
        .iter()
        .map(|&x| {
            total += x;
            total
        })
        .collect()
}

/// Divides the whole curve by its value at `offset`, or `None` when that value
/// is not a positive, finite level.
pub fn rebase(curve: &Array1<f64>, offset: usize) -> Option<Array1<f64>> {
    let base = *curve.get(offset)?;
    if !base.is_finite() || base <= 0.0 {
        return None;
    }
    Some(curve.mapv(|x| x / base))
}

/// Stacks equally long rows into a rows x offsets matrix.
pub fn stack_rows<'a, I>(rows: I, width: usize) -> Array2<f64>
where
    I: IntoIterator<Item = ArrayView1<'a, f64>>,
{
    let rows: Vec<_> = rows.into_iter().collect();
    let mut matrix = Array2::zeros((rows.len(), width));
    for (i, row) in rows.iter().enumerate() {
        matrix.row_mut(i).assign(row);
    }
    matrix
}

/// Turns raw change windows into abnormal cumulative curves and reduces
/// stacks of them to mean / standard-error curves.
#[derive(Debug, Clone, Copy)]
pub struct AbnormalSeriesAggregator {
    window: EventWindow,
    rebase_compound: bool,
}

impl AbnormalSeriesAggregator {
    /// `rebase_compound` re-normalizes compounded curves to 1.0 on the event day.
    pub fn new(window: EventWindow, rebase_compound: bool) -> Self {
        Self {
            window,
            rebase_compound,
        }
    }

    pub fn window(&self) -> EventWindow {
        self.window
    }

    /// Observed minus predicted change over the event's window.
    pub fn abnormal_window(
        &self,
        observed: ArrayView1<f64>,
        predicted: ArrayView1<f64>,
        event_index: usize,
    ) -> Option<Array1<f64>> {
        let observed = self.window.extract(observed, event_index)?;
        let predicted = self.window.extract(predicted, event_index)?;
        Some(observed - predicted)
    }

    /// Cumulative curve of one event's abnormal window. `None` when the curve
    /// has to be re-based on an event-day level that is not positive.
    pub fn event_curve(
        &self,
        abnormal: ArrayView1<f64>,
        accumulation: Accumulation,
    ) -> Option<Array1<f64>> {
        match accumulation {
            Accumulation::Compound if self.rebase_compound => {
                rebase(&compound(abnormal), self.window.pre)
            }
            Accumulation::Compound => Some(compound(abnormal)),
            Accumulation::Additive => Some(cumulative_sum(abnormal)),
        }
    }

    /// Per-offset mean / std across curves. `None` when there are no curves.
    pub fn reduce<'a, I>(&self, curves: I) -> Option<CurveSummary>
    where
        I: IntoIterator<Item = ArrayView1<'a, f64>>,
    {
        let matrix = stack_rows(curves, self.window.len());
        if matrix.nrows() == 0 {
            return None;
        }
        let mean = matrix.mean_axis(Axis(0))?;
        let std_err = matrix.std_axis(Axis(0), 0.0);
        Some(CurveSummary {
            mean,
            std_err,
            count: matrix.nrows(),
        })
    }

    /// Mean across symbol-level mean curves.
    pub fn reduce_symbols<'a, I>(&self, summaries: I) -> Option<CurveSummary>
    where
        I: IntoIterator<Item = &'a CurveSummary>,
    {
        self.reduce(summaries.into_iter().map(|summary| summary.mean.view()))
    }
}
