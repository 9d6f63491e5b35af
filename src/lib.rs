pub mod analysis;
pub mod config;
pub mod data;
pub mod types;

pub use analysis::{CarsCavcsResult, EventStudy, PreconditionError, StudyError};
pub use config::{Config, StudyConfig};
pub use types::{DegenerateFitPolicy, Granularity, StudyMode};
