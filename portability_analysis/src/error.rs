use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error(transparent)]
    Results(#[from] portability_results::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("line {line}, column {column}: cannot parse {value:?} as a number")]
    Parse {
        line: u64,
        column: String,
        value: String,
    },

    #[error("missing header row")]
    MissingHeader,

    #[error("failed to create PDF {jobname}: {message}")]
    Pdf { jobname: String, message: String },
}
