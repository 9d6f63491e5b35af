//! The event-study pipeline: estimate, extract, aggregate, test, assemble.

use super::aggregator::{AbnormalSeriesAggregator, CurveSummary};
use super::changes::{fill_missing, pct_change, relative_volume_change};
use super::market_model::{baseline_for, BaselineModel, EstimationWindow, MarketModelError};
use super::observer::{NoopObserver, StudyObserver};
use super::result::{
    AggregatedCurves, CarsCavcsResult, ExcludedSymbol, ExclusionReason, ResultAssembler,
    StudyCurves,
};
use super::significance::{SignificanceError, SignificanceTester};
use super::window::EventWindow;
use crate::config::StudyConfig;
use crate::data::{DataError, EventMatrix, Panel};
use crate::types::{DegenerateFitPolicy, Granularity, SeriesKind, StudyMode};
use ndarray::{s, Array1, ArrayView1};
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PreconditionError {
    #[error("Market symbol {symbol} is missing from the {source_name}")]
    MissingMarketSymbol {
        symbol: String,
        source_name: &'static str,
    },
    #[error("Zero events in the event matrix")]
    ZeroEvents,
    #[error("Invalid window: {0}")]
    InvalidWindow(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Panel and event matrix use different calendars")]
    CalendarMismatch,
}

#[derive(Debug, Error)]
pub enum StudyError {
    #[error("Precondition failed: {0}")]
    Precondition(#[from] PreconditionError),
    #[error("Degenerate {} market model for {symbol}: {source}", .kind.label())]
    DegenerateFit {
        symbol: String,
        kind: SeriesKind,
        source: MarketModelError,
    },
    #[error("Cannot estimate {} baseline for {symbol}: {source}", .kind.label())]
    Estimation {
        symbol: String,
        kind: SeriesKind,
        source: MarketModelError,
    },
    #[error("{} statistic undefined: {source}", .kind.label())]
    StatisticalUndefined {
        kind: SeriesKind,
        source: SignificanceError,
    },
    #[error("Data error: {0}")]
    Data(#[from] DataError),
}

pub type Result<T> = std::result::Result<T, StudyError>;

/// Market change series shared read-only by every symbol.
struct MarketChanges {
    returns: Array1<f64>,
    volume: Option<Array1<f64>>,
}

/// Curves of one symbol that made it through estimation and extraction.
struct SymbolCurves {
    symbol: String,
    num_events: usize,
    num_excluded_events: usize,
    event_cars: Vec<Array1<f64>>,
    event_cavcs: Option<Vec<Array1<f64>>>,
    cars: CurveSummary,
    cavcs: Option<CurveSummary>,
}

enum SymbolOutcome {
    Included(SymbolCurves),
    Excluded {
        excluded: ExcludedSymbol,
        num_excluded_events: usize,
    },
}

pub struct EventStudy {
    config: StudyConfig,
    baseline: Box<dyn BaselineModel>,
    aggregator: AbnormalSeriesAggregator,
    window: EventWindow,
}

impl EventStudy {
    pub fn new(config: StudyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: StudyConfig) -> Self {
        let window = config.event_window();
        let baseline = baseline_for(config.mode);
        // market-adjusted curves are re-based to 1.0 on the event day
        let aggregator =
            AbnormalSeriesAggregator::new(window, config.mode == StudyMode::MarketAdjusted);
        Self {
            config,
            baseline,
            aggregator,
            window,
        }
    }

    pub fn config(&self) -> &StudyConfig {
        &self.config
    }

    pub fn run(&self, panel: &Panel, events: &EventMatrix) -> Result<CarsCavcsResult> {
        self.run_with_observer(panel, events, &NoopObserver)
    }

    pub fn run_with_observer(
        &self,
        panel: &Panel,
        events: &EventMatrix,
        observer: &dyn StudyObserver,
    ) -> Result<CarsCavcsResult> {
        let market_symbol = self.config.market_symbol.as_str();
        if !panel.contains(market_symbol) {
            return Err(PreconditionError::MissingMarketSymbol {
                symbol: market_symbol.to_string(),
                source_name: "panel",
            }
            .into());
        }
        if !events.has_symbol(market_symbol) {
            return Err(PreconditionError::MissingMarketSymbol {
                symbol: market_symbol.to_string(),
                source_name: "event matrix",
            }
            .into());
        }
        if panel.calendar() != events.calendar() {
            return Err(PreconditionError::CalendarMismatch.into());
        }
        let calendar_len = panel.calendar().len();
        if self.window.len() > calendar_len {
            return Err(PreconditionError::InvalidWindow(format!(
                "event window of {} days exceeds calendar of {} days",
                self.window.len(),
                calendar_len
            ))
            .into());
        }

        let events = events.without_symbol(market_symbol);
        if events.num_events() == 0 {
            return Err(PreconditionError::ZeroEvents.into());
        }

        let market = self.market_changes(panel)?;
        info!(
            mode = ?self.config.mode,
            granularity = ?self.config.granularity(),
            symbols = events.symbols().len(),
            raw_events = events.num_events(),
            "Running event study"
        );

        let outcomes = events
            .symbols()
            .par_iter()
            .map(|symbol| self.process_symbol(symbol, &events, panel, &market, observer))
            .collect::<Vec<_>>()
            .into_iter()
            .collect::<Result<Vec<_>>>()?;

        let curves = self.reduce(outcomes)?;
        info!(
            events = curves.num_events,
            excluded_events = curves.num_excluded_events,
            symbols = curves.symbols.len(),
            excluded_symbols = curves.excluded_symbols.len(),
            "Aggregated event windows"
        );

        let tester = SignificanceTester::new(self.config.mode);
        ResultAssembler::new(
            tester,
            self.config.granularity(),
            self.window,
            self.config.strict_significance,
        )
        .assemble(curves)
    }

    fn market_changes(&self, panel: &Panel) -> Result<MarketChanges> {
        let market_symbol = self.config.market_symbol.as_str();
        let returns = self.return_changes(panel, market_symbol)?;
        let volume = self
            .config
            .volume_field
            .as_deref()
            .map(|field| self.volume_changes(panel, market_symbol, field))
            .transpose()?;
        Ok(MarketChanges { returns, volume })
    }

    fn return_changes(&self, panel: &Panel, symbol: &str) -> Result<Array1<f64>> {
        let prices = panel.field(symbol, &self.config.price_field)?;
        Ok(fill_missing(&pct_change(prices), 0.0))
    }

    fn volume_changes(&self, panel: &Panel, symbol: &str, field: &str) -> Result<Array1<f64>> {
        let volumes = panel.field(symbol, field)?;
        Ok(fill_missing(
            &relative_volume_change(volumes, self.config.volume_lookback),
            0.0,
        ))
    }

    /// Estimation window for an event, anchored on the first day of its event
    /// window so the two never overlap.
    fn estimation_window(&self, event_index: usize) -> Option<EstimationWindow> {
        let anchor = event_index.checked_sub(self.window.pre)?;
        EstimationWindow::preceding(anchor, self.config.buffer, self.config.estimation_window)
    }

    fn is_usable(&self, event_index: usize, calendar_len: usize) -> bool {
        self.window.fits(event_index, calendar_len)
            && (!self.baseline.requires_estimation()
                || self.estimation_window(event_index).is_some())
    }

    fn process_symbol(
        &self,
        symbol: &str,
        events: &EventMatrix,
        panel: &Panel,
        market: &MarketChanges,
        observer: &dyn StudyObserver,
    ) -> Result<SymbolOutcome> {
        let calendar_len = events.calendar().len();
        let (usable, dropped): (Vec<usize>, Vec<usize>) = events
            .events_for(symbol)
            .into_iter()
            .partition(|&index| self.is_usable(index, calendar_len));

        let Some(&first_event) = usable.first() else {
            warn!(symbol, dropped = dropped.len(), "No usable events, symbol excluded");
            return Ok(SymbolOutcome::Excluded {
                excluded: ExcludedSymbol {
                    symbol: symbol.to_string(),
                    reason: ExclusionReason::NoUsableEvents,
                },
                num_excluded_events: dropped.len(),
            });
        };

        // one fit per symbol, on the window before its earliest usable event
        let estimation = self
            .estimation_window(first_event)
            .unwrap_or(EstimationWindow { start: 0, end: 0 });
        let num_marked = usable.len() + dropped.len();

        let returns = self.return_changes(panel, symbol)?;
        let Some(car_curves) = self.event_curves(
            symbol,
            SeriesKind::Returns,
            market.returns.view(),
            returns.view(),
            &estimation,
            &usable,
            observer,
        )?
        else {
            return Ok(self.degenerate(symbol, SeriesKind::Returns, num_marked));
        };

        let cavc_curves = match (&self.config.volume_field, &market.volume) {
            (Some(field), Some(market_volume)) => {
                let volume = self.volume_changes(panel, symbol, field)?;
                match self.event_curves(
                    symbol,
                    SeriesKind::Volume,
                    market_volume.view(),
                    volume.view(),
                    &estimation,
                    &usable,
                    observer,
                )? {
                    Some(curves) => Some(curves),
                    None => return Ok(self.degenerate(symbol, SeriesKind::Volume, num_marked)),
                }
            }
            _ => None,
        };

        // an event only counts when every curve of it could be formed
        let with_volume = cavc_curves.is_some();
        let mut cavc_curves = cavc_curves.map(Vec::into_iter);
        let mut event_cars = Vec::with_capacity(usable.len());
        let mut event_cavcs = Vec::new();
        let mut unformed = 0;
        for car in car_curves {
            let cavc = cavc_curves.as_mut().map(|curves| curves.next().flatten());
            match (car, cavc) {
                (Some(car), None) => event_cars.push(car),
                (Some(car), Some(Some(cavc))) => {
                    event_cars.push(car);
                    event_cavcs.push(cavc);
                }
                _ => unformed += 1,
            }
        }
        if unformed > 0 {
            warn!(symbol, events = unformed, "Event curves could not be formed, events excluded");
        }
        let num_excluded_events = dropped.len() + unformed;

        let Some(cars) = self.aggregator.reduce(event_cars.iter().map(|c| c.view())) else {
            warn!(symbol, dropped = num_excluded_events, "No usable events, symbol excluded");
            return Ok(SymbolOutcome::Excluded {
                excluded: ExcludedSymbol {
                    symbol: symbol.to_string(),
                    reason: ExclusionReason::NoUsableEvents,
                },
                num_excluded_events,
            });
        };
        let event_cavcs = with_volume.then_some(event_cavcs);
        let cavcs = event_cavcs
            .as_ref()
            .and_then(|curves| self.aggregator.reduce(curves.iter().map(|c| c.view())));
        observer.on_symbol_curves(symbol, &cars, cavcs.as_ref());

        debug!(
            symbol,
            events = event_cars.len(),
            dropped = num_excluded_events,
            "Processed symbol"
        );
        Ok(SymbolOutcome::Included(SymbolCurves {
            symbol: symbol.to_string(),
            num_events: event_cars.len(),
            num_excluded_events,
            event_cars,
            event_cavcs,
            cars,
            cavcs,
        }))
    }

    /// Cumulative abnormal curve of every usable event, in the order of
    /// `usable`; an entry is `None` when its curve cannot be formed. The whole
    /// result is `None` when the baseline is degenerate and the policy
    /// excludes the symbol.
    #[allow(clippy::too_many_arguments)]
    fn event_curves(
        &self,
        symbol: &str,
        kind: SeriesKind,
        market: ArrayView1<f64>,
        observed: ArrayView1<f64>,
        estimation: &EstimationWindow,
        usable: &[usize],
        observer: &dyn StudyObserver,
    ) -> Result<Option<Vec<Option<Array1<f64>>>>> {
        let estimate = match self.baseline.estimate(market, observed, estimation) {
            Ok(estimate) => estimate,
            Err(source @ MarketModelError::DegenerateFit) => match self.config.degenerate_fit {
                DegenerateFitPolicy::Abort => {
                    return Err(StudyError::DegenerateFit {
                        symbol: symbol.to_string(),
                        kind,
                        source,
                    })
                }
                DegenerateFitPolicy::ExcludeSymbol => {
                    warn!(symbol, series = kind.label(), "Degenerate market model, symbol excluded");
                    return Ok(None);
                }
            },
            Err(source) => {
                return Err(StudyError::Estimation {
                    symbol: symbol.to_string(),
                    kind,
                    source,
                })
            }
        };
        if self.baseline.requires_estimation() {
            observer.on_fit(
                symbol,
                kind,
                &estimate.parameters,
                estimation,
                market.slice(s![estimation.range()]),
                observed.slice(s![estimation.range()]),
            );
        }

        let accumulation = kind.accumulation();
        Ok(Some(
            usable
                .iter()
                .map(|&index| {
                    self.aggregator
                        .abnormal_window(observed, estimate.predicted.view(), index)
                        .and_then(|abnormal| {
                            self.aggregator.event_curve(abnormal.view(), accumulation)
                        })
                })
                .collect(),
        ))
    }

    fn degenerate(&self, symbol: &str, kind: SeriesKind, num_excluded_events: usize) -> SymbolOutcome {
        SymbolOutcome::Excluded {
            excluded: ExcludedSymbol {
                symbol: symbol.to_string(),
                reason: ExclusionReason::DegenerateFit(kind),
            },
            num_excluded_events,
        }
    }

    /// Cross-event (pooled) or cross-symbol reduction of every included symbol.
    fn reduce(&self, outcomes: Vec<SymbolOutcome>) -> Result<StudyCurves> {
        let mut included = Vec::new();
        let mut excluded_symbols = Vec::new();
        let mut num_excluded_events = 0;
        for outcome in outcomes {
            match outcome {
                SymbolOutcome::Included(curves) => {
                    num_excluded_events += curves.num_excluded_events;
                    included.push(curves);
                }
                SymbolOutcome::Excluded {
                    excluded,
                    num_excluded_events: dropped,
                } => {
                    num_excluded_events += dropped;
                    excluded_symbols.push(excluded);
                }
            }
        }

        let num_events: usize = included.iter().map(|c| c.num_events).sum();
        if num_events == 0 {
            return Err(PreconditionError::ZeroEvents.into());
        }

        let granularity = self.config.granularity();
        let cars = self.aggregate(
            SeriesKind::Returns,
            granularity,
            &included,
            |c| Some(&c.event_cars),
            |c| Some(&c.cars),
        )?;
        let cavcs = if self.config.volume_field.is_some() {
            Some(self.aggregate(
                SeriesKind::Volume,
                granularity,
                &included,
                |c| c.event_cavcs.as_ref(),
                |c| c.cavcs.as_ref(),
            )?)
        } else {
            None
        };

        Ok(StudyCurves {
            num_events,
            num_excluded_events,
            symbols: included.iter().map(|c| c.symbol.clone()).collect(),
            excluded_symbols,
            cars,
            cavcs,
        })
    }

    fn aggregate<'a, E, S>(
        &self,
        kind: SeriesKind,
        granularity: Granularity,
        included: &'a [SymbolCurves],
        event_curves: E,
        symbol_curve: S,
    ) -> Result<AggregatedCurves>
    where
        E: Fn(&'a SymbolCurves) -> Option<&'a Vec<Array1<f64>>>,
        S: Fn(&'a SymbolCurves) -> Option<&'a CurveSummary>,
    {
        let (overall, per_symbol) = match granularity {
            Granularity::Pooled => {
                let rows = included
                    .iter()
                    .filter_map(&event_curves)
                    .flat_map(|curves| curves.iter().map(|c| c.view()));
                (self.aggregator.reduce(rows), Vec::new())
            }
            Granularity::PerSymbol => {
                let per_symbol: Vec<(String, CurveSummary)> = included
                    .iter()
                    .filter_map(|c| symbol_curve(c).map(|summary| (c.symbol.clone(), summary.clone())))
                    .collect();
                let overall = self
                    .aggregator
                    .reduce_symbols(per_symbol.iter().map(|(_, summary)| summary));
                (overall, per_symbol)
            }
        };
        let overall = overall.ok_or(PreconditionError::ZeroEvents)?;
        Ok(AggregatedCurves {
            kind,
            overall,
            per_symbol,
        })
    }

    /// The simple market-adjusted calculator: returns only, every event of
    /// every symbol pooled, curves re-based on the event day.
    ///
    /// Returns `(mean curve, std curve, number of events)`.
    pub fn market_adjusted_car(
        panel: &Panel,
        events: &EventMatrix,
        market_symbol: &str,
        look_back: usize,
        look_forward: usize,
    ) -> Result<(Array1<f64>, Array1<f64>, usize)> {
        let mut config = StudyConfig::new(market_symbol, StudyMode::MarketAdjusted);
        config.pre_event_window = look_back;
        config.post_event_window = look_forward;
        config.granularity = Some(Granularity::Pooled);
        config.volume_field = None;

        // a zero look-back is allowed here, unlike in a configured study
        config.validate_look_forward()?;
        let result = Self::build(config).run(panel, events)?;
        Ok((result.cars.curve, result.cars.std_err, result.num_events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::market_model::MarketModelParameters;
    use crate::data::TradingCalendar;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};
    use std::sync::Mutex;

    fn calendar(n: usize) -> TradingCalendar {
        let start = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
        TradingCalendar::new((0..n).map(|i| start + Duration::days(i as i64)).collect()).unwrap()
    }

    fn prices(returns: &[f64]) -> Array1<f64> {
        let mut level = 100.0;
        returns
            .iter()
            .enumerate()
            .map(|(i, r)| {
                if i > 0 {
                    level *= 1.0 + r;
                }
                level
            })
            .collect()
    }

    fn alternating(i: usize) -> f64 {
        if i % 2 == 0 {
            0.01
        } else {
            -0.005
        }
    }

    /// Market returns alternate so the market model never degenerates.
    fn panel(n: usize) -> Panel {
        let market: Vec<f64> = (0..n).map(alternating).collect();
        let stock: Vec<f64> = market.iter().map(|m| 1.2 * m + 0.001).collect();
        let mut panel = Panel::new(calendar(n));
        panel.insert("MKT", "close", prices(&market)).unwrap();
        panel.insert("A", "close", prices(&stock)).unwrap();
        panel
    }

    fn config(mode: StudyMode) -> StudyConfig {
        let mut config = StudyConfig::new("MKT", mode);
        config.estimation_window = 8;
        config.buffer = 2;
        config.pre_event_window = 2;
        config.post_event_window = 2;
        config.volume_field = None;
        config
    }

    fn matrix(n: usize, marks: &[(usize, &str)]) -> EventMatrix {
        matrix_for(n, &["A", "MKT"], marks)
    }

    fn matrix_for(n: usize, symbols: &[&str], marks: &[(usize, &str)]) -> EventMatrix {
        let symbols = symbols.iter().map(|s| s.to_string()).collect();
        let mut em = EventMatrix::new(calendar(n), symbols);
        for &(index, symbol) in marks {
            em.mark_index(index, symbol).unwrap();
        }
        em
    }

    fn changes(panel: &Panel, symbol: &str) -> Array1<f64> {
        fill_missing(&pct_change(panel.field(symbol, "close").unwrap()), 0.0)
    }

    #[derive(Default)]
    struct Recorder {
        fits: Mutex<Vec<(String, EstimationWindow, Vec<f64>, Vec<f64>)>>,
        curves: Mutex<Vec<String>>,
    }

    impl StudyObserver for Recorder {
        fn on_fit(
            &self,
            symbol: &str,
            _kind: SeriesKind,
            _params: &MarketModelParameters,
            window: &EstimationWindow,
            market: ArrayView1<f64>,
            symbol_changes: ArrayView1<f64>,
        ) {
            self.fits.lock().unwrap().push((
                symbol.to_string(),
                *window,
                market.to_vec(),
                symbol_changes.to_vec(),
            ));
        }

        fn on_symbol_curves(&self, symbol: &str, _cars: &CurveSummary, _cavcs: Option<&CurveSummary>) {
            self.curves.lock().unwrap().push(symbol.to_string());
        }
    }

    #[test]
    fn test_market_symbol_must_be_present() {
        let study = EventStudy::new(config(StudyMode::MarketModel)).unwrap();
        let mut em = EventMatrix::new(calendar(40), vec!["A".into()]);
        em.mark_index(20, "A").unwrap();
        let err = study.run(&panel(40), &em).unwrap_err();
        assert!(matches!(
            err,
            StudyError::Precondition(PreconditionError::MissingMarketSymbol { .. })
        ));
    }

    #[test]
    fn test_market_events_do_not_count() {
        let study = EventStudy::new(config(StudyMode::MarketModel)).unwrap();
        let em = matrix(40, &[(20, "MKT")]);
        let err = study.run(&panel(40), &em).unwrap_err();
        assert!(matches!(
            err,
            StudyError::Precondition(PreconditionError::ZeroEvents)
        ));
    }

    #[test]
    fn test_events_without_estimation_history_are_excluded() {
        let study = EventStudy::new(config(StudyMode::MarketModel)).unwrap();
        // event 5 has no room for 8 + 2 days of history before its window
        let em = matrix(40, &[(5, "A"), (20, "A"), (30, "A")]);
        let result = study.run(&panel(40), &em).unwrap();
        assert_eq!(result.num_events, 2);
        assert_eq!(result.num_excluded_events, 1);
    }

    #[test]
    fn test_market_model_removes_linear_baseline() {
        let study = EventStudy::new(config(StudyMode::MarketModel)).unwrap();
        let em = matrix(40, &[(20, "A"), (30, "A")]);
        let result = study.run(&panel(40), &em).unwrap();

        for value in result.cars.curve.iter() {
            assert_relative_eq!(*value, 1.0, epsilon = 1e-9);
        }
        assert_eq!(result.cars.curve.len(), 5);
        assert_eq!(result.symbols, vec!["A".to_string()]);
        assert!(result.cavcs.is_none());
    }

    #[test]
    fn test_degenerate_fit_policy() {
        let n = 40;
        let mut panel = Panel::new(calendar(n));
        panel.insert("MKT", "close", prices(&vec![0.01; n])).unwrap();
        panel.insert("A", "close", prices(&vec![0.02; n])).unwrap();
        let em = matrix(n, &[(25, "A")]);

        let mut cfg = config(StudyMode::MarketModel);
        let err = EventStudy::new(cfg.clone())
            .unwrap()
            .run(&panel, &em)
            .unwrap_err();
        // the only symbol is excluded, nothing is left
        assert!(matches!(
            err,
            StudyError::Precondition(PreconditionError::ZeroEvents)
        ));

        cfg.degenerate_fit = DegenerateFitPolicy::Abort;
        let err = EventStudy::new(cfg).unwrap().run(&panel, &em).unwrap_err();
        assert!(matches!(
            err,
            StudyError::DegenerateFit {
                kind: SeriesKind::Returns,
                source: MarketModelError::DegenerateFit,
                ..
            }
        ));
    }

    #[test]
    fn test_caller_event_matrix_is_untouched() {
        let study = EventStudy::new(config(StudyMode::MarketAdjusted)).unwrap();
        let em = matrix(40, &[(20, "A"), (20, "MKT")]);
        study.run(&panel(40), &em).unwrap();
        assert!(em.has_symbol("MKT"));
        assert_eq!(em.num_events(), 2);
    }

    #[test]
    fn test_observer_receives_estimation_slices() {
        let n = 40;
        let mut panel = panel(n);
        let b: Vec<f64> = (0..n).map(|i| 0.7 * alternating(i) - 0.002).collect();
        panel.insert("B", "close", prices(&b)).unwrap();
        let em = matrix_for(n, &["A", "B", "MKT"], &[(20, "A"), (30, "A"), (25, "B")]);

        let recorder = Recorder::default();
        EventStudy::new(config(StudyMode::MarketModel))
            .unwrap()
            .run_with_observer(&panel, &em, &recorder)
            .unwrap();

        let mut fits = recorder.fits.into_inner().unwrap();
        fits.sort_by(|x, y| x.0.cmp(&y.0));
        assert_eq!(fits.len(), 2);

        let market = changes(&panel, "MKT");
        let expected = [("A", EstimationWindow { start: 8, end: 16 }), ("B", EstimationWindow { start: 13, end: 21 })];
        for ((symbol, window, market_slice, symbol_slice), (name, range)) in fits.iter().zip(expected) {
            assert_eq!(symbol, name);
            assert_eq!(*window, range);
            assert_eq!(*market_slice, market.slice(s![range.range()]).to_vec());
            assert_eq!(
                *symbol_slice,
                changes(&panel, name).slice(s![range.range()]).to_vec()
            );
        }

        let mut curves = recorder.curves.into_inner().unwrap();
        curves.sort();
        assert_eq!(curves, vec!["A".to_string(), "B".to_string()]);

        // nothing is fitted in market-adjusted mode
        let recorder = Recorder::default();
        EventStudy::new(config(StudyMode::MarketAdjusted))
            .unwrap()
            .run_with_observer(&panel, &em, &recorder)
            .unwrap();
        assert!(recorder.fits.into_inner().unwrap().is_empty());
        assert_eq!(recorder.curves.into_inner().unwrap().len(), 2);
    }

    #[test]
    fn test_degenerate_symbol_events_are_counted_as_excluded() {
        let n = 50;
        // flat market over days 30..=42, so a fit ending before day 30 has variance
        let market: Vec<f64> = (0..n)
            .map(|i| if (30..=42).contains(&i) { 0.01 } else { alternating(i) })
            .collect();
        let b: Vec<f64> = market.iter().map(|m| 1.2 * m + 0.001).collect();
        let mut panel = Panel::new(calendar(n));
        panel.insert("MKT", "close", prices(&market)).unwrap();
        panel.insert("A", "close", prices(&market)).unwrap();
        panel.insert("B", "close", prices(&b)).unwrap();
        let em = matrix_for(n, &["A", "B", "MKT"], &[(1, "A"), (44, "A"), (20, "B")]);

        let result = EventStudy::new(config(StudyMode::MarketModel))
            .unwrap()
            .run(&panel, &em)
            .unwrap();

        assert_eq!(result.num_events, 1);
        assert_eq!(result.num_excluded_events, 2);
        assert_eq!(result.symbols, vec!["B".to_string()]);
        assert_eq!(
            result.excluded_symbols,
            vec![ExcludedSymbol {
                symbol: "A".to_string(),
                reason: ExclusionReason::DegenerateFit(SeriesKind::Returns),
            }]
        );
    }

    #[test]
    fn test_wiped_out_price_excludes_event() {
        let n = 40;
        let mut panel = panel(n);
        let mut a = prices(&(0..n).map(alternating).collect::<Vec<_>>());
        a[14] = 0.0;
        panel.insert("A", "close", a).unwrap();
        let b: Vec<f64> = (0..n).map(|i| alternating(i) + 0.002).collect();
        panel.insert("B", "close", prices(&b)).unwrap();
        let em = matrix_for(n, &["A", "B", "MKT"], &[(15, "A"), (25, "B")]);

        let result = EventStudy::new(config(StudyMode::MarketAdjusted))
            .unwrap()
            .run(&panel, &em)
            .unwrap();

        assert_eq!(result.num_events, 1);
        assert_eq!(result.num_excluded_events, 1);
        assert_eq!(result.symbols, vec!["B".to_string()]);
        assert_eq!(result.excluded_symbols[0].reason, ExclusionReason::NoUsableEvents);
        assert_eq!(result.cars.curve[2], 1.0);
        assert!(result.cars.curve.iter().all(|x| x.is_finite() && *x > 0.0));
    }

    #[test]
    fn test_calculator_allows_zero_look_back() {
        let em = matrix(40, &[(20, "A")]);
        let (mean, std, num_events) =
            EventStudy::market_adjusted_car(&panel(40), &em, "MKT", 0, 3).unwrap();
        assert_eq!(num_events, 1);
        assert_eq!(mean.len(), 4);
        assert_eq!(mean[0], 1.0);
        assert_eq!(std.len(), 4);

        let mut cfg = config(StudyMode::MarketAdjusted);
        cfg.pre_event_window = 0;
        assert!(matches!(
            EventStudy::new(cfg),
            Err(StudyError::Precondition(PreconditionError::InvalidWindow(_)))
        ));
    }
}
