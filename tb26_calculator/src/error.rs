use chrono::NaiveDate;
use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors raised by the TB2.6 engine and its data loaders.
///
/// Missing or partial market data is not an error: incomplete days are
/// reported through [`crate::models::SkipReason`] instead.
#[derive(Debug, Error)]
pub enum Tb26Error {
    #[error("hour ending {0} is outside 1..=24")]
    InvalidHourEnding(i64),

    #[error("month {0} is outside 1..=12")]
    InvalidMonth(u32),

    #[error("window end {end} precedes start {start}")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },

    #[error("failed to fetch {feed} from {path}")]
    UpstreamFetch {
        feed: &'static str,
        path: String,
        #[source]
        source: PolarsError,
    },

    #[error("{feed}: unusable column {column}")]
    Column {
        feed: &'static str,
        column: String,
        #[source]
        source: PolarsError,
    },

    #[error("{feed} row {row}: {message}")]
    MalformedRow {
        feed: &'static str,
        row: usize,
        message: String,
    },

    #[error("config error: {field}: {message}")]
    Config { field: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Tb26Error>;
