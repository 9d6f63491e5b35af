use super::{DataError, Result, TradingCalendar};
use ndarray::{Array1, ArrayView1};
use std::collections::BTreeMap;

/// Per-symbol observation series aligned 1:1 with a shared calendar.
///
/// Missing observations are stored as `NaN`, never dropped, so every series
/// has exactly `calendar.len()` values.
#[derive(Debug, Clone)]
pub struct Panel {
    calendar: TradingCalendar,
    series: BTreeMap<String, BTreeMap<String, Array1<f64>>>,
}

impl Panel {
    pub fn new(calendar: TradingCalendar) -> Self {
        Self {
            calendar,
            series: BTreeMap::new(),
        }
    }

    pub fn insert(
        &mut self,
        symbol: impl Into<String>,
        field: impl Into<String>,
        values: Array1<f64>,
    ) -> Result<()> {
        let symbol = symbol.into();
        let field = field.into();
        if values.len() != self.calendar.len() {
            return Err(DataError::LengthMismatch {
                symbol,
                field,
                expected: self.calendar.len(),
                actual: values.len(),
            });
        }
        self.series.entry(symbol).or_default().insert(field, values);
        Ok(())
    }

    pub fn calendar(&self) -> &TradingCalendar {
        &self.calendar
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.series.contains_key(symbol)
    }

    /// Symbols in sorted order.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn field(&self, symbol: &str, field: &str) -> Result<ArrayView1<'_, f64>> {
        let fields = self
            .series
            .get(symbol)
            .ok_or_else(|| DataError::UnknownSymbol(symbol.to_string()))?;
        fields
            .get(field)
            .map(|values| values.view())
            .ok_or_else(|| DataError::UnknownField {
                symbol: symbol.to_string(),
                field: field.to_string(),
            })
    }
}
