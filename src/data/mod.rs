pub mod calendar;
pub mod event_matrix;
pub mod event_source;
pub mod loader;
pub mod panel;

pub use calendar::TradingCalendar;
pub use event_matrix::EventMatrix;
pub use panel::Panel;

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

/// Field names understood by the loader and the study.
pub const CLOSE: &str = "close";
pub const ADJUSTED_CLOSE: &str = "adjusted_close";
pub const VOLUME: &str = "volume";

/// One row of a long-format price file.
#[derive(Debug, Deserialize)]
pub struct MarketData {
    pub date: NaiveDate,
    pub ticker: String,
    #[serde(default)]
    pub close: Option<f64>,
    #[serde(default)]
    pub adjusted_close: Option<f64>,
    #[serde(default)]
    pub volume: Option<f64>,
}

impl MarketData {
    pub fn field(&self, name: &str) -> Option<f64> {
        match name {
            CLOSE => self.close,
            ADJUSTED_CLOSE => self.adjusted_close,
            VOLUME => self.volume,
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum DataError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Missing required column: {0}")]
    MissingColumn(String),
    #[error("Calendar dates must be strictly increasing ({0} follows {1})")]
    UnorderedCalendar(NaiveDate, NaiveDate),
    #[error("Date {0} is not a trading day")]
    DateNotInCalendar(NaiveDate),
    #[error("Index {0} is outside the trading calendar")]
    IndexOutOfCalendar(usize),
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),
    #[error("Unknown field '{field}' for symbol {symbol}")]
    UnknownField { symbol: String, field: String },
    #[error("Series for {symbol}/{field} has {actual} values, calendar has {expected}")]
    LengthMismatch {
        symbol: String,
        field: String,
        expected: usize,
        actual: usize,
    },
}

pub type Result<T> = std::result::Result<T, DataError>;
