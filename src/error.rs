use thiserror::Error;

/// Everything that can go wrong while reducing an experiment.
///
/// Variants split along the boundaries drawn by the recovery policy:
/// arithmetic failures (`DivisionByZero`, `UndefinedOperation`,
/// `DegenerateFit`, `EmptySeries`, `MissingIntermediate`) are recovered
/// per-metric, `MissingLogfile` excludes a single experiment, and
/// `NoExperiments` is the only condition that aborts a run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("division by zero in uncertainty propagation")]
    DivisionByZero,

    #[error("relative error is undefined for a zero-valued operand")]
    UndefinedOperation,

    #[error("degenerate fit: zero variance in the independent variable")]
    DegenerateFit,

    #[error("series contains no samples")]
    EmptySeries,

    #[error("derived intermediate ({0}) is unavailable")]
    MissingIntermediate(&'static str),

    #[error("no {kind} logfile found for experiment: {label}")]
    MissingLogfile { label: String, kind: &'static str },

    #[error("no valid experiments found")]
    NoExperiments,

    #[error("malformed timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("malformed experiment manifest: {0}")]
    Manifest(#[from] toml::de::Error),
}
