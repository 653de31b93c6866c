use crate::constraint_catalog::ConstraintCatalog;
use crate::error::{Result, Tb26Error};
use crate::models::{BindingConstraintRecord, HourEnding, MarginalUnitRecord};
use crate::normalizer::{FundamentalsFeed, FundamentalsRow, PriceAttribute, SimulationResults, TimestampConvention};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::path::{Path, PathBuf};

/// Read a CSV or Parquet export, chosen by file extension.
pub(crate) fn read_frame(path: &Path, feed: &'static str) -> Result<DataFrame> {
    let fetch_error = |source: PolarsError| Tb26Error::UpstreamFetch {
        feed,
        path: path.display().to_string(),
        source,
    };

    let is_parquet = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("parquet"));

    if is_parquet {
        LazyFrame::scan_parquet(path, ScanArgsParquet::default())
            .and_then(|lf| lf.collect())
            .map_err(fetch_error)
    } else {
        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(10_000))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .and_then(|reader| reader.finish())
            .map_err(fetch_error)
    }
}

fn column_error(feed: &'static str, column: &str) -> impl FnOnce(PolarsError) -> Tb26Error {
    let column = column.to_string();
    move |source| Tb26Error::Column { feed, column, source }
}

pub(crate) fn string_column(df: &DataFrame, name: &str, feed: &'static str) -> Result<Vec<Option<String>>> {
    let series = df
        .column(name)
        .and_then(|c| c.cast(&DataType::String))
        .map_err(column_error(feed, name))?;
    let values = series.str().map_err(column_error(feed, name))?;
    Ok(values.into_iter().map(|v| v.map(str::to_string)).collect())
}

pub(crate) fn f64_column(df: &DataFrame, name: &str, feed: &'static str) -> Result<Vec<Option<f64>>> {
    let series = df
        .column(name)
        .and_then(|c| c.cast(&DataType::Float64))
        .map_err(column_error(feed, name))?;
    let values = series.f64().map_err(column_error(feed, name))?;
    Ok(values.into_iter().collect())
}

pub(crate) fn i64_column(df: &DataFrame, name: &str, feed: &'static str) -> Result<Vec<Option<i64>>> {
    let series = df
        .column(name)
        .and_then(|c| c.cast(&DataType::Int64))
        .map_err(column_error(feed, name))?;
    let values = series.i64().map_err(column_error(feed, name))?;
    Ok(values.into_iter().collect())
}

fn has_column(df: &DataFrame, name: &str) -> bool {
    df.column(name).is_ok()
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "y" | "yes" | "t"
    )
}

/// File locations for one scenario's upstream exports.
#[derive(Debug, Clone)]
pub struct ScenarioPaths {
    pub prices: PathBuf,
    pub fundamentals: Option<PathBuf>,
    pub marginal_units: Option<PathBuf>,
    pub binding_constraints: Option<PathBuf>,
    pub constraint_names: Option<PathBuf>,
}

impl ScenarioPaths {
    pub const PRICES: &'static str = "prices.csv";
    pub const FUNDAMENTALS: &'static str = "fundamentals.csv";
    pub const MARGINAL_UNITS: &'static str = "marginal_units.csv";
    pub const BINDING_CONSTRAINTS: &'static str = "binding_constraints.csv";
    pub const CONSTRAINT_NAMES: &'static str = "constraint_names.csv";

    /// Standard file names inside a scenario directory; optional feeds are
    /// only used when present.
    pub fn in_dir(dir: &Path) -> Self {
        let optional = |name: &str| {
            let path = dir.join(name);
            path.exists().then_some(path)
        };
        Self {
            prices: dir.join(Self::PRICES),
            fundamentals: optional(Self::FUNDAMENTALS),
            marginal_units: optional(Self::MARGINAL_UNITS),
            binding_constraints: optional(Self::BINDING_CONSTRAINTS),
            constraint_names: optional(Self::CONSTRAINT_NAMES),
        }
    }
}

/// Everything fetched for one scenario, in memory.
#[derive(Debug, Clone, Default)]
pub struct ScenarioData {
    pub prices: SimulationResults,
    pub fundamentals: Option<FundamentalsFeed>,
    pub marginal_units: Vec<MarginalUnitRecord>,
    pub binding_constraints: Vec<BindingConstraintRecord>,
    pub constraint_names: ConstraintCatalog,
}

/// Batch loader for the upstream exports the engine consumes.
pub struct DataLoader {
    date_format: String,
    timestamp_format: String,
    fundamentals_convention: TimestampConvention,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new("%Y-%m-%d", "%Y-%m-%d %H:%M:%S%.f", TimestampConvention::HourEnding)
    }
}

impl DataLoader {
    pub fn new(date_format: &str, timestamp_format: &str, fundamentals_convention: TimestampConvention) -> Self {
        Self {
            date_format: date_format.to_string(),
            timestamp_format: timestamp_format.to_string(),
            fundamentals_convention,
        }
    }

    fn parse_date(&self, value: &str, feed: &'static str, row: usize) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(value.trim(), &self.date_format).map_err(|e| Tb26Error::MalformedRow {
            feed,
            row,
            message: format!("bad date \"{value}\": {e}"),
        })
    }

    fn parse_timestamp(&self, value: &str, feed: &'static str, row: usize) -> Result<NaiveDateTime> {
        NaiveDateTime::parse_from_str(value.trim(), &self.timestamp_format).map_err(|e| Tb26Error::MalformedRow {
            feed,
            row,
            message: format!("bad timestamp \"{value}\": {e}"),
        })
    }

    fn hour_ending(value: i64, feed: &'static str, row: usize) -> Result<HourEnding> {
        HourEnding::new(value).map_err(|e| Tb26Error::MalformedRow {
            feed,
            row,
            message: e.to_string(),
        })
    }

    /// Hourly LMP components from the simulation results store.
    ///
    /// Columns: `date, hour_ending, energy, congestion, losses[, lmp]`.
    pub fn load_hourly_prices(&self, path: &Path) -> Result<SimulationResults> {
        const FEED: &str = "hourly prices";
        let df = read_frame(path, FEED)?;

        let dates = string_column(&df, "date", FEED)?;
        let hours = i64_column(&df, "hour_ending", FEED)?;
        let energy = f64_column(&df, "energy", FEED)?;
        let congestion = f64_column(&df, "congestion", FEED)?;
        let losses = f64_column(&df, "losses", FEED)?;
        let lmp = if has_column(&df, "lmp") {
            f64_column(&df, "lmp", FEED)?
        } else {
            vec![None; df.height()]
        };

        let mut results = SimulationResults::default();
        let mut dropped = 0usize;
        for row in 0..df.height() {
            let (Some(date), Some(hour), Some(e), Some(c), Some(l)) =
                (&dates[row], hours[row], energy[row], congestion[row], losses[row])
            else {
                dropped += 1;
                continue;
            };
            results.push(
                self.parse_date(date, FEED, row)?,
                Self::hour_ending(hour, FEED, row)?,
                e,
                c,
                l,
                lmp[row],
            );
        }

        if dropped > 0 {
            log::warn!("{}: dropped {} rows with missing values", path.display(), dropped);
        }
        log::info!("Loaded {} hourly price rows from {}", results.len(), path.display());
        Ok(results)
    }

    /// Historical actuals as flat `timestamp, attribute, value` rows.
    pub fn load_fundamentals_feed(&self, path: &Path) -> Result<FundamentalsFeed> {
        const FEED: &str = "fundamentals";
        let df = read_frame(path, FEED)?;

        let timestamps = string_column(&df, "timestamp", FEED)?;
        let attributes = string_column(&df, "attribute", FEED)?;
        let values = f64_column(&df, "value", FEED)?;

        let mut rows = Vec::with_capacity(df.height());
        let mut dropped = 0usize;
        let mut other_attributes = 0usize;
        for row in 0..df.height() {
            let (Some(timestamp), Some(attribute), Some(value)) =
                (&timestamps[row], &attributes[row], values[row])
            else {
                dropped += 1;
                continue;
            };
            // Feeds also carry load, generation and fuel series.
            let Ok(attribute) = attribute.parse::<PriceAttribute>() else {
                other_attributes += 1;
                continue;
            };
            rows.push(FundamentalsRow {
                timestamp: self.parse_timestamp(timestamp, FEED, row)?,
                attribute,
                value,
            });
        }

        if dropped > 0 {
            log::warn!("{}: dropped {} rows with missing values", path.display(), dropped);
        }
        if other_attributes > 0 {
            log::debug!("{}: skipped {} non-price attribute rows", path.display(), other_attributes);
        }
        log::info!("Loaded {} fundamentals rows from {}", rows.len(), path.display());
        Ok(FundamentalsFeed::new(rows, self.fundamentals_convention))
    }

    /// Columns: `date, hour_ending, unit_id, unit_name, unit_type[, is_marginal]`.
    ///
    /// Without an `is_marginal` column every row counts as marginal.
    pub fn load_marginal_units(&self, path: &Path) -> Result<Vec<MarginalUnitRecord>> {
        const FEED: &str = "marginal units";
        let df = read_frame(path, FEED)?;

        let dates = string_column(&df, "date", FEED)?;
        let hours = i64_column(&df, "hour_ending", FEED)?;
        let unit_ids = string_column(&df, "unit_id", FEED)?;
        let unit_names = string_column(&df, "unit_name", FEED)?;
        let unit_types = string_column(&df, "unit_type", FEED)?;
        let flags = if has_column(&df, "is_marginal") {
            string_column(&df, "is_marginal", FEED)?
        } else {
            vec![None; df.height()]
        };

        let mut records = Vec::with_capacity(df.height());
        for row in 0..df.height() {
            let (Some(date), Some(hour), Some(unit_id)) = (&dates[row], hours[row], &unit_ids[row]) else {
                continue;
            };
            records.push(MarginalUnitRecord {
                date: self.parse_date(date, FEED, row)?,
                hour_ending: Self::hour_ending(hour, FEED, row)?,
                unit_id: unit_id.clone(),
                unit_name: unit_names[row].clone().unwrap_or_else(|| unit_id.clone()),
                unit_type: unit_types[row].clone().unwrap_or_else(|| "Unknown".to_string()),
                is_marginal: flags[row].as_deref().map_or(true, parse_flag),
            });
        }

        log::info!("Loaded {} marginal unit rows from {}", records.len(), path.display());
        Ok(records)
    }

    /// Columns: `date, hour_ending, constraint_id, congestion_value`.
    pub fn load_binding_constraints(&self, path: &Path) -> Result<Vec<BindingConstraintRecord>> {
        const FEED: &str = "binding constraints";
        let df = read_frame(path, FEED)?;

        let dates = string_column(&df, "date", FEED)?;
        let hours = i64_column(&df, "hour_ending", FEED)?;
        let ids = string_column(&df, "constraint_id", FEED)?;
        let values = f64_column(&df, "congestion_value", FEED)?;

        let mut records = Vec::with_capacity(df.height());
        for row in 0..df.height() {
            let (Some(date), Some(hour), Some(id), Some(value)) = (&dates[row], hours[row], &ids[row], values[row])
            else {
                continue;
            };
            records.push(BindingConstraintRecord {
                date: self.parse_date(date, FEED, row)?,
                hour_ending: Self::hour_ending(hour, FEED, row)?,
                constraint_id: id.clone(),
                congestion_value: value,
            });
        }

        log::info!("Loaded {} binding constraint rows from {}", records.len(), path.display());
        Ok(records)
    }

    /// Single batch fetch of every feed a scenario provides.
    pub fn load_scenario(&self, paths: &ScenarioPaths) -> Result<ScenarioData> {
        Ok(ScenarioData {
            prices: self.load_hourly_prices(&paths.prices)?,
            fundamentals: paths
                .fundamentals
                .as_deref()
                .map(|p| self.load_fundamentals_feed(p))
                .transpose()?,
            marginal_units: match &paths.marginal_units {
                Some(p) => self.load_marginal_units(p)?,
                None => vec![],
            },
            binding_constraints: match &paths.binding_constraints {
                Some(p) => self.load_binding_constraints(p)?,
                None => vec![],
            },
            constraint_names: match &paths.constraint_names {
                Some(p) => ConstraintCatalog::from_file(p)?,
                None => ConstraintCatalog::default(),
            },
        })
    }
}
