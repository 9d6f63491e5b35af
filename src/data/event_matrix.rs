use super::{DataError, Result, TradingCalendar};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

/// Sparse date x symbol event markers.
///
/// An event is the presence of `(date index, symbol)` in the set; absence is
/// the only non-event state.
#[derive(Debug, Clone)]
pub struct EventMatrix {
    calendar: TradingCalendar,
    symbols: Vec<String>,
    marks: BTreeMap<usize, BTreeSet<String>>,
}

impl EventMatrix {
    pub fn new(calendar: TradingCalendar, symbols: Vec<String>) -> Self {
        Self {
            calendar,
            symbols,
            marks: BTreeMap::new(),
        }
    }

    pub fn calendar(&self) -> &TradingCalendar {
        &self.calendar
    }

    /// Symbol columns, including ones without any event.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn has_symbol(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|s| s == symbol)
    }

    /// Marks an event. The date must be a trading day and the symbol a column.
    pub fn mark(&mut self, date: NaiveDate, symbol: &str) -> Result<()> {
        let index = self.calendar.index_of(date)?;
        self.mark_index(index, symbol)
    }

    pub fn mark_index(&mut self, index: usize, symbol: &str) -> Result<()> {
        if !self.has_symbol(symbol) {
            return Err(DataError::UnknownSymbol(symbol.to_string()));
        }
        if index >= self.calendar.len() {
            return Err(DataError::IndexOutOfCalendar(index));
        }
        self.marks
            .entry(index)
            .or_default()
            .insert(symbol.to_string());
        Ok(())
    }

    pub fn is_marked(&self, date: NaiveDate, symbol: &str) -> bool {
        self.calendar
            .index_of(date)
            .ok()
            .and_then(|index| self.marks.get(&index))
            .is_some_and(|set| set.contains(symbol))
    }

    /// Calendar indices of the symbol's events, ascending.
    pub fn events_for(&self, symbol: &str) -> Vec<usize> {
        self.marks
            .iter()
            .filter(|(_, set)| set.contains(symbol))
            .map(|(&index, _)| index)
            .collect()
    }

    /// Dates carrying at least one marker.
    pub fn event_dates(&self) -> Vec<NaiveDate> {
        self.marks
            .iter()
            .filter(|(_, set)| !set.is_empty())
            .filter_map(|(&index, _)| self.calendar.date(index))
            .collect()
    }

    /// Total number of markers across all dates and symbols.
    pub fn num_events(&self) -> usize {
        self.marks.values().map(BTreeSet::len).sum()
    }

    /// Copy of the matrix with one symbol column removed; `self` is untouched.
    pub fn without_symbol(&self, symbol: &str) -> Self {
        let symbols = self
            .symbols
            .iter()
            .filter(|s| s.as_str() != symbol)
            .cloned()
            .collect();
        let marks = self
            .marks
            .iter()
            .filter_map(|(&index, set)| {
                let kept: BTreeSet<String> =
                    set.iter().filter(|s| s.as_str() != symbol).cloned().collect();
                (!kept.is_empty()).then_some((index, kept))
            })
            .collect();
        Self {
            calendar: self.calendar.clone(),
            symbols,
            marks,
        }
    }
}
