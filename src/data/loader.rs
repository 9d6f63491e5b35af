use super::{DataError, MarketData, Panel, Result, TradingCalendar, CLOSE};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use ndarray::Array1;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

pub struct DataLoader;

impl DataLoader {
    fn verify_required_columns(headers: &[String], fields: &[&str]) -> Result<()> {
        let headers_set: HashSet<_> = headers.iter().map(|s| s.to_lowercase()).collect();

        for column in ["date", "ticker"].iter().chain(fields.iter()) {
            if !headers_set.contains(&column.to_lowercase()) {
                return Err(DataError::MissingColumn(column.to_string()));
            }
        }
        Ok(())
    }

    fn analyze_date_coverage(
        data_by_ticker: &HashMap<String, Vec<MarketData>>,
    ) -> (Vec<NaiveDate>, HashMap<String, f64>) {
        // Union of all dates seen for any ticker
        let all_dates: BTreeSet<NaiveDate> = data_by_ticker
            .values()
            .flat_map(|data| data.iter().map(|record| record.date))
            .collect();
        let all_dates: Vec<_> = all_dates.into_iter().collect();

        let mut coverage = HashMap::new();
        for (ticker, data) in data_by_ticker {
            let ticker_dates: HashSet<_> = data.iter().map(|record| record.date).collect();
            let coverage_pct = ticker_dates.len() as f64 / all_dates.len() as f64 * 100.0;
            coverage.insert(ticker.clone(), coverage_pct);
        }

        (all_dates, coverage)
    }

    /// Loads a long-format price file (`date,ticker,<fields...>`) into a panel
    /// aligned on the union of all dates of the requested symbols.
    ///
    /// Dates a symbol has no row for become `NaN` in every field.
    pub fn load_panel<P: AsRef<Path>>(path: P, symbols: &[String], fields: &[&str]) -> Result<Panel> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&path)?;

        let headers: Vec<String> = rdr.headers()?.iter().map(|s| s.to_string()).collect();
        Self::verify_required_columns(&headers, fields)?;

        let wanted: HashSet<&str> = symbols.iter().map(String::as_str).collect();
        let mut data_by_ticker: HashMap<String, Vec<MarketData>> = HashMap::new();
        for result in rdr.deserialize() {
            let record: MarketData = result?;
            if wanted.contains(record.ticker.as_str()) {
                data_by_ticker
                    .entry(record.ticker.clone())
                    .or_default()
                    .push(record);
            }
        }

        for symbol in symbols {
            if !data_by_ticker.contains_key(symbol) {
                return Err(DataError::UnknownSymbol(symbol.clone()));
            }
        }

        for data in data_by_ticker.values_mut() {
            data.sort_by(|a, b| a.date.cmp(&b.date));
        }

        let (all_dates, coverage) = Self::analyze_date_coverage(&data_by_ticker);
        info!(dates = all_dates.len(), tickers = symbols.len(), "Loaded price data");
        let mut coverage_stats: Vec<_> = coverage.iter().collect();
        coverage_stats.sort_by(|a, b| b.1.total_cmp(a.1));
        for (ticker, coverage_pct) in coverage_stats {
            debug!(ticker = %ticker, coverage_pct = *coverage_pct, "Date coverage");
        }

        let calendar = TradingCalendar::new(all_dates)?;
        let mut panel = Panel::new(calendar.clone());

        for symbol in symbols {
            let ticker_data = &data_by_ticker[symbol];
            for &field in fields {
                let values: Array1<f64> = calendar
                    .dates()
                    .iter()
                    .map(|date| {
                        match ticker_data.binary_search_by_key(date, |record| record.date) {
                            Ok(idx) => ticker_data[idx].field(field).unwrap_or(f64::NAN),
                            Err(_) => f64::NAN,
                        }
                    })
                    .collect();
                panel.insert(symbol.clone(), field, values)?;
            }
        }

        Ok(panel)
    }

    /// Closing prices only.
    pub fn load_close<P: AsRef<Path>>(path: P, symbols: &[String]) -> Result<Panel> {
        Self::load_panel(path, symbols, &[CLOSE])
    }

    pub fn get_tickers<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&path)?;

        let headers = rdr.headers()?;
        Self::verify_required_columns(&headers.iter().map(|s| s.to_string()).collect::<Vec<_>>(), &[])?;

        let mut tickers = BTreeSet::new();
        for result in rdr.deserialize() {
            let record: MarketData = result?;
            tickers.insert(record.ticker);
        }

        Ok(tickers.into_iter().collect())
    }
}
