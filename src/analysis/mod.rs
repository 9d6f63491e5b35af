pub mod aggregator;
pub mod changes;
pub mod market_model;
pub mod observer;
pub mod result;
pub mod significance;
pub mod study;
pub mod window;

pub use result::{CarsCavcsResult, CurveSignificance, CurveStatistics};
pub use study::{EventStudy, PreconditionError, StudyError};
