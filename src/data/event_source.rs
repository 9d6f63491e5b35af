use super::{EventMatrix, Result, TradingCalendar};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

/// One dated observation of the raw event source.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Value")]
    pub value: f64,
}

/// Builds an event matrix from a dated value list: every date whose value
/// reaches the threshold becomes an event for all configured symbols.
#[derive(Debug, Clone)]
pub struct ThresholdEventSource {
    pub value_threshold: f64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl ThresholdEventSource {
    pub fn new(value_threshold: f64) -> Self {
        Self {
            value_threshold,
            start_date: None,
            end_date: None,
        }
    }

    pub fn with_range(mut self, start_date: Option<NaiveDate>, end_date: Option<NaiveDate>) -> Self {
        self.start_date = start_date;
        self.end_date = end_date;
        self
    }

    pub fn read_raw_events<P: AsRef<Path>>(path: P) -> Result<Vec<RawEvent>> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&path)?;

        let mut events = Vec::new();
        for result in rdr.deserialize() {
            let event: RawEvent = result?;
            events.push(event);
        }
        Ok(events)
    }

    pub fn build_from_file<P: AsRef<Path>>(
        &self,
        path: P,
        calendar: &TradingCalendar,
        symbols: &[String],
    ) -> Result<EventMatrix> {
        let raw = Self::read_raw_events(path)?;
        self.build(raw, calendar, symbols)
    }

    /// Raw dates falling on non-trading days are moved to the next trading day.
    pub fn build(
        &self,
        mut raw: Vec<RawEvent>,
        calendar: &TradingCalendar,
        symbols: &[String],
    ) -> Result<EventMatrix> {
        raw.sort_by_key(|event| event.date);

        let mut matrix = EventMatrix::new(calendar.clone(), symbols.to_vec());
        let mut accepted = 0;
        for event in raw.iter().filter(|event| self.accepts(event)) {
            let Some(index) = calendar.index_on_or_after(event.date) else {
                warn!(date = %event.date, "Event after the last trading day, dropped");
                continue;
            };
            for symbol in symbols {
                matrix.mark_index(index, symbol)?;
            }
            accepted += 1;
        }

        info!(
            raw = raw.len(),
            accepted,
            event_dates = matrix.event_dates().len(),
            "Built event matrix"
        );
        Ok(matrix)
    }

    fn accepts(&self, event: &RawEvent) -> bool {
        let after_start = self.start_date.map_or(true, |start| event.date >= start);
        let before_end = self.end_date.map_or(true, |end| event.date <= end);
        after_start && before_end && event.value >= self.value_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2015, 9, day).unwrap()
    }

    fn raw(day: u32, value: f64) -> RawEvent {
        RawEvent {
            date: d(day),
            value,
        }
    }

    #[test]
    fn test_threshold_and_backfill() {
        // Sept 5-6 2015 is a weekend
        let calendar = TradingCalendar::new(vec![d(3), d(4), d(7), d(8)]).unwrap();
        let symbols = vec!["S1".to_string(), "S2".to_string()];
        let source = ThresholdEventSource::new(7.0);

        let matrix = source
            .build(vec![raw(8, 9.0), raw(5, 7.0), raw(4, 6.9)], &calendar, &symbols)
            .unwrap();

        assert!(matrix.is_marked(d(7), "S1"));
        assert!(matrix.is_marked(d(7), "S2"));
        assert!(matrix.is_marked(d(8), "S1"));
        assert!(!matrix.is_marked(d(4), "S1"));
        assert_eq!(matrix.num_events(), 4);
    }

    #[test]
    fn test_date_range_and_trailing_events() {
        let calendar = TradingCalendar::new(vec![d(3), d(4), d(7), d(8)]).unwrap();
        let symbols = vec!["S1".to_string()];
        let source = ThresholdEventSource::new(1.0).with_range(Some(d(4)), None);

        let matrix = source
            .build(vec![raw(3, 5.0), raw(4, 5.0), raw(10, 5.0)], &calendar, &symbols)
            .unwrap();

        assert_eq!(matrix.events_for("S1"), vec![1]);
    }
}
