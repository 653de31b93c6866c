use anyhow::Result;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tb26_calculator::{WeeklyReport, WindowComparison};

pub const SUMMARY_FILE: &str = "tb26_summary.csv";

/// One line of the batch summary: a scenario's result for one window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub scenario: String,
    pub window: &'static str,
    pub week_start: String,
    pub week_end: String,
    pub restriction_month: u32,
    pub days_used: usize,
    pub days_skipped: usize,
    pub total_tb26: f64,
    pub energy_tb26: f64,
    pub congestion_tb26: f64,
}

impl SummaryRow {
    pub fn from_report(scenario: &str, window: &'static str, report: &WeeklyReport) -> Self {
        Self {
            scenario: scenario.to_string(),
            window,
            week_start: report.window.start.to_string(),
            week_end: report.window.end.to_string(),
            restriction_month: report.restriction_month,
            days_used: report.financial.days_used,
            days_skipped: report.skipped_days.len(),
            total_tb26: report.financial.total_tb26,
            energy_tb26: report.financial.energy_tb26,
            congestion_tb26: report.financial.congestion_tb26,
        }
    }

    /// This week, last week and last year, in that order.
    pub fn from_comparison(scenario: &str, comparison: &WindowComparison) -> Vec<Self> {
        vec![
            Self::from_report(scenario, "this_week", &comparison.this_week),
            Self::from_report(scenario, "last_week", &comparison.last_week),
            Self::from_report(scenario, "last_year", &comparison.last_year),
        ]
    }
}

pub fn write_scenario_json(path: &Path, comparison: &WindowComparison) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, comparison)?;
    Ok(())
}

pub fn write_summary(path: &Path, rows: &[SummaryRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
