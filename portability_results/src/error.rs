use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("duplicate platform name: {0}")]
    DuplicatePlatform(String),

    #[error("duplicate application name: {0}")]
    DuplicateApplication(String),

    #[error("row for platform {platform} has {got} cells, expected {expected}")]
    RowShape {
        platform: String,
        expected: usize,
        got: usize,
    },

    #[error("table has {got} rows for {expected} platforms")]
    RowCount { expected: usize, got: usize },

    #[error("unknown application: {0}")]
    UnknownApplication(String),

    #[error("unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("{statistic} needs at least {needed} values, got {got}")]
    TooFewValues {
        statistic: &'static str,
        needed: usize,
        got: usize,
    },

    #[error("empty sample set")]
    EmptySamples,

    #[error("density grid needs at least 2 points, got {0}")]
    GridTooSmall(usize),

    #[error("sample {sample} lies outside the density domain [{lower}, {upper}]")]
    SampleOutOfDomain { sample: f64, lower: f64, upper: f64 },

    #[error("{y} values sampled on {x} points")]
    LengthMismatch { x: usize, y: usize },

    #[error("refinement needs at least one iteration")]
    NoIterations,

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
