use thiserror::Error;

/// Error type for invalid operations.
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("{0}")]
    Error(String),
    #[error("Failed to fetch dataset '{source_id}': {reason}")]
    Fetch { source_id: String, reason: String },
    #[error("Cannot map time value '{value}' to a calendar date: {reason}")]
    Calendar { value: String, reason: String },
    #[error("Selection yielded no data: {reason}")]
    EmptySelection { reason: String },
    #[error("Dataset '{source_id}' is missing the required '{axis}' axis")]
    MissingAxis { source_id: String, axis: String },
    #[error("Dataset '{source_id}' has an unrecognised axis '{axis}'")]
    UnknownAxis { source_id: String, axis: String },
    #[error("Shape mismatch for '{what}': expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        what: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    #[error("Coordinate axis '{axis}' must be strictly monotonic and finite")]
    NonMonotonic { axis: String },
    #[error("Invalid time window [{start}, {end}]")]
    InvalidWindow { start: f64, end: f64 },
    #[error("Inverse log transform overflowed for input {value}")]
    Overflow { value: f64 },
    #[error("Unsupported precipitation unit '{unit}': {reason}")]
    UnsupportedUnit { unit: String, reason: String },
    #[error("Ensemble member {index} requested but dataset has {available} members")]
    InvalidMember { index: usize, available: usize },
    #[error("Alignment of '{dataset}' failed: {cause}")]
    Alignment {
        dataset: String,
        #[source]
        cause: Box<BenchError>,
    },
    #[error("Unknown gauge station '{0}'")]
    UnknownStation(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience type for `Result<T, BenchError>`.
pub type BenchResult<T> = Result<T, BenchError>;
