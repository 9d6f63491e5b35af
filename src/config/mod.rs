use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::analysis::study::PreconditionError;
use crate::analysis::window::EventWindow;
use crate::data::{CLOSE, VOLUME};
use crate::types::{DegenerateFitPolicy, Granularity, StudyMode};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSettings {
    pub prices_path: PathBuf,
    pub events_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSettings {
    #[serde(default = "default_value_threshold")]
    pub value_threshold: f64,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Parameters of one event-study run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyConfig {
    pub market_symbol: String,
    /// Symbols to study; the market symbol is added by the driver.
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default = "default_estimation_window")]
    pub estimation_window: usize,
    #[serde(default = "default_buffer")]
    pub buffer: usize,
    #[serde(default = "default_event_window")]
    pub pre_event_window: usize,
    #[serde(default = "default_event_window")]
    pub post_event_window: usize,
    #[serde(default = "default_mode")]
    pub mode: StudyMode,
    /// Falls back to the mode's default when absent.
    #[serde(default)]
    pub granularity: Option<Granularity>,
    #[serde(default = "default_price_field")]
    pub price_field: String,
    /// No CAVC curve is computed when absent.
    #[serde(default = "default_volume_field")]
    pub volume_field: Option<String>,
    #[serde(default = "default_volume_lookback")]
    pub volume_lookback: usize,
    #[serde(default)]
    pub degenerate_fit: DegenerateFitPolicy,
    #[serde(default)]
    pub strict_significance: bool,
}

impl StudyConfig {
    pub fn new(market_symbol: impl Into<String>, mode: StudyMode) -> Self {
        Self {
            market_symbol: market_symbol.into(),
            symbols: Vec::new(),
            estimation_window: default_estimation_window(),
            buffer: default_buffer(),
            pre_event_window: default_event_window(),
            post_event_window: default_event_window(),
            mode,
            granularity: None,
            price_field: default_price_field(),
            volume_field: default_volume_field(),
            volume_lookback: default_volume_lookback(),
            degenerate_fit: DegenerateFitPolicy::default(),
            strict_significance: false,
        }
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
            .unwrap_or_else(|| self.mode.default_granularity())
    }

    pub fn event_window(&self) -> EventWindow {
        EventWindow::new(self.pre_event_window, self.post_event_window)
    }

    /// Rejects an empty market symbol and any zero-length window or buffer.
    pub fn validate(&self) -> Result<(), PreconditionError> {
        self.check_market_symbol()?;
        positive("pre_event_window", self.pre_event_window)?;
        self.check_common()
    }

    /// Like [`validate`](Self::validate), but allows an event window that
    /// starts on the event day, as the simple market-adjusted calculator does.
    pub fn validate_look_forward(&self) -> Result<(), PreconditionError> {
        self.check_market_symbol()?;
        self.check_common()
    }

    fn check_market_symbol(&self) -> Result<(), PreconditionError> {
        if self.market_symbol.trim().is_empty() {
            return Err(PreconditionError::InvalidParameter(
                "market symbol must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn check_common(&self) -> Result<(), PreconditionError> {
        positive("post_event_window", self.post_event_window)?;
        positive("buffer", self.buffer)?;
        positive("estimation_window", self.estimation_window)?;
        if self.mode == StudyMode::MarketModel && self.estimation_window < 2 {
            return Err(PreconditionError::InvalidWindow(format!(
                "estimation window of {} days is too short for a market model",
                self.estimation_window
            )));
        }
        if self.volume_lookback == 0 {
            return Err(PreconditionError::InvalidParameter(
                "volume lookback must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn positive(name: &str, days: usize) -> Result<(), PreconditionError> {
    if days == 0 {
        return Err(PreconditionError::InvalidWindow(format!(
            "{} must be at least one day",
            name
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data: DataSettings,
    pub study: StudyConfig,
    pub events: EventSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)?;
        Ok(config)
    }

    /// Study symbols followed by the market symbol, without duplicates.
    pub fn all_symbols(&self) -> Vec<String> {
        let mut symbols = self.study.symbols.clone();
        if !symbols.contains(&self.study.market_symbol) {
            symbols.push(self.study.market_symbol.clone());
        }
        symbols
    }

    /// Fields the loader has to read for this study.
    pub fn fields(&self) -> Vec<&str> {
        let mut fields = vec![self.study.price_field.as_str()];
        if let Some(volume) = &self.study.volume_field {
            fields.push(volume.as_str());
        }
        fields
    }
}

fn default_value_threshold() -> f64 {
    7.0
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_estimation_window() -> usize {
    200
}

fn default_buffer() -> usize {
    5
}

fn default_event_window() -> usize {
    10
}

fn default_mode() -> StudyMode {
    StudyMode::MarketModel
}

fn default_price_field() -> String {
    CLOSE.to_string()
}

fn default_volume_field() -> Option<String> {
    Some(VOLUME.to_string())
}

fn default_volume_lookback() -> usize {
    1
}
