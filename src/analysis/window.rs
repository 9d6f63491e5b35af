use ndarray::{s, Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Days before and after the event day covered by an event window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventWindow {
    pub pre: usize,
    pub post: usize,
}

impl EventWindow {
    pub fn new(pre: usize, post: usize) -> Self {
        Self { pre, post }
    }

    /// `pre + post + 1`
    pub fn len(&self) -> usize {
        self.pre + self.post + 1
    }

    /// Day offsets relative to the event, `-pre..=post`.
    pub fn offsets(&self) -> RangeInclusive<i64> {
        -(self.pre as i64)..=self.post as i64
    }

    /// Calendar indices covered by the window, or `None` when the window runs
    /// off either edge of a calendar of `calendar_len` days.
    pub fn bounds(&self, event_index: usize, calendar_len: usize) -> Option<RangeInclusive<usize>> {
        let first = event_index.checked_sub(self.pre)?;
        let last = event_index.checked_add(self.post)?;
        (last < calendar_len).then_some(first..=last)
    }

    pub fn fits(&self, event_index: usize, calendar_len: usize) -> bool {
        self.bounds(event_index, calendar_len).is_some()
    }

    /// Window slice with the event day at position `pre`. Events too close to
    /// either calendar edge yield `None` and are never padded.
    pub fn extract(&self, series: ArrayView1<f64>, event_index: usize) -> Option<Array1<f64>> {
        let bounds = self.bounds(event_index, series.len())?;
        Some(series.slice(s![*bounds.start()..=*bounds.end()]).to_owned())
    }

    /// Splits event indices into those with a full window and those without.
    pub fn partition(&self, events: &[usize], calendar_len: usize) -> (Vec<usize>, Vec<usize>) {
        events
            .iter()
            .copied()
            .partition(|&index| self.fits(index, calendar_len))
    }
}

/// Free-function form of [`EventWindow::extract`].
pub fn extract(
    change_series: ArrayView1<f64>,
    event_index: usize,
    pre_window: usize,
    post_window: usize,
    calendar_length: usize,
) -> Option<Array1<f64>> {
    let window = EventWindow::new(pre_window, post_window);
    window.bounds(event_index, calendar_length)?;
    window.extract(change_series, event_index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(n: usize) -> Array1<f64> {
        Array1::from_iter((0..n).map(|i| i as f64))
    }

    #[test]
    fn test_event_day_sits_at_pre_offset() {
        let data = series(30);
        let window = EventWindow::new(3, 2);
        let extracted = window.extract(data.view(), 15).unwrap();

        assert_eq!(extracted.len(), window.len());
        assert_eq!(extracted[window.pre], 15.0);
        assert_eq!(extracted.to_vec(), vec![12.0, 13.0, 14.0, 15.0, 16.0, 17.0]);
        assert_eq!(window.offsets().collect::<Vec<_>>(), vec![-3, -2, -1, 0, 1, 2]);
    }

    #[test]
    fn test_edge_events_are_excluded() {
        let data = series(10);
        let window = EventWindow::new(2, 2);

        assert!(window.extract(data.view(), 1).is_none());
        assert!(window.extract(data.view(), 2).is_some());
        assert!(window.extract(data.view(), 7).is_some());
        assert!(window.extract(data.view(), 8).is_none());
        assert!(extract(data.view(), 9, 2, 2, 10).is_none());

        let (usable, excluded) = window.partition(&[0, 2, 5, 8, 9], 10);
        assert_eq!(usable, vec![2, 5]);
        assert_eq!(excluded, vec![0, 8, 9]);
    }
}
