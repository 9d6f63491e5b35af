use super::{DataError, Result};
use chrono::NaiveDate;

/// Ordered, distinct trading dates shared by every symbol of a panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradingCalendar {
    dates: Vec<NaiveDate>,
}

impl TradingCalendar {
    pub fn new(dates: Vec<NaiveDate>) -> Result<Self> {
        for pair in dates.windows(2) {
            if pair[1] <= pair[0] {
                return Err(DataError::UnorderedCalendar(pair[1], pair[0]));
            }
        }
        Ok(Self { dates })
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn date(&self, index: usize) -> Option<NaiveDate> {
        self.dates.get(index).copied()
    }

    /// Exact lookup; the date must be a trading day.
    pub fn index_of(&self, date: NaiveDate) -> Result<usize> {
        self.dates
            .binary_search(&date)
            .map_err(|_| DataError::DateNotInCalendar(date))
    }

    /// First trading day on or after `date`, used to move events that fall on
    /// weekends or holidays forward. `None` past the last trading day.
    pub fn index_on_or_after(&self, date: NaiveDate) -> Option<usize> {
        let idx = match self.dates.binary_search(&date) {
            Ok(idx) => idx,
            Err(idx) => idx,
        };
        (idx < self.dates.len()).then_some(idx)
    }
}
