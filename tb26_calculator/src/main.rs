use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use log::info;
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use tb26_calculator::normalizer::TimestampConvention;
use tb26_calculator::{
    ComparisonInputs, DataLoader, EngineConfig, ScenarioPaths, WeekWindow, WeeklyAggregator, WeeklyInputs,
    WeeklyReport,
};

#[derive(Parser)]
#[command(name = "tb26_calculator")]
#[command(about = "Weekly TB2.6 battery arbitrage and price-driver attribution for one priced location")]
struct Args {
    /// Hourly price components from the simulation results store (CSV or Parquet)
    #[arg(long)]
    prices: PathBuf,

    /// Historical actuals as flat timestamp/attribute/value rows
    #[arg(long)]
    fundamentals: Option<PathBuf>,

    /// Fundamentals rows are sub-hourly and stamped at interval start
    #[arg(long)]
    interval_beginning: bool,

    /// Marginal unit records
    #[arg(long)]
    marginal_units: Option<PathBuf>,

    /// Binding constraint records
    #[arg(long)]
    constraints: Option<PathBuf>,

    /// Constraint id to name mapping
    #[arg(long)]
    constraint_names: Option<PathBuf>,

    /// First day of the week (YYYY-MM-DD)
    #[arg(long)]
    week_start: String,

    /// Date format used by the input files
    #[arg(long, default_value = "%Y-%m-%d")]
    date_format: String,

    /// TOML file overriding battery parameters or the restriction calendar
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also run last week and the same week last year
    #[arg(long)]
    compare: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    output: OutputFormat,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
    Summary,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    info!("Starting TB2.6 calculation");

    let config = match &args.config {
        Some(path) => EngineConfig::from_toml_file(path)?,
        None => EngineConfig::default(),
    };

    let week_start = NaiveDate::parse_from_str(&args.week_start, "%Y-%m-%d")
        .with_context(|| format!("invalid --week-start {}", args.week_start))?;
    let window = WeekWindow::new(week_start);

    let convention = if args.interval_beginning {
        TimestampConvention::IntervalBeginning
    } else {
        TimestampConvention::HourEnding
    };
    let loader = DataLoader::new(&args.date_format, "%Y-%m-%d %H:%M:%S%.f", convention);

    let paths = ScenarioPaths {
        prices: args.prices.clone(),
        fundamentals: args.fundamentals.clone(),
        marginal_units: args.marginal_units.clone(),
        binding_constraints: args.constraints.clone(),
        constraint_names: args.constraint_names.clone(),
    };
    let data = loader.load_scenario(&paths)?;

    let aggregator = WeeklyAggregator::new(config.restriction_calendar(), config.battery.clone());

    if args.compare {
        let comparison = aggregator.compare(&ComparisonInputs::from_scenario(&data, window));
        match args.output {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&comparison)?),
            OutputFormat::Csv => write_csv(
                io::stdout(),
                &[
                    ("this_week", &comparison.this_week),
                    ("last_week", &comparison.last_week),
                    ("last_year", &comparison.last_year),
                ],
            )?,
            OutputFormat::Summary => {
                print_summary("This week", &comparison.this_week);
                print_summary("Last week", &comparison.last_week);
                print_summary("Same week last year", &comparison.last_year);
            }
        }
        return Ok(());
    }

    let inputs = WeeklyInputs::from_source(
        window,
        &data.prices,
        &data.marginal_units,
        &data.binding_constraints,
        &data.constraint_names,
    );
    let report = aggregator.run(&inputs);

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Csv => write_csv(io::stdout(), &[("this_week", &report)])?,
        OutputFormat::Summary => print_summary("This week", &report),
    }

    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CsvRow<'a> {
    window: &'a str,
    date: NaiveDate,
    net_revenue: f64,
    energy_revenue: f64,
    congestion_revenue: f64,
    #[serde(rename = "TB26")]
    tb26: f64,
    top_constraint: &'a str,
    bottom_constraint: &'a str,
    top_unit_type: &'a str,
    bottom_unit_type: &'a str,
}

fn csv_rows<'a>(label: &'a str, report: &'a WeeklyReport) -> impl Iterator<Item = CsvRow<'a>> {
    report
        .financial
        .daily_breakdown
        .iter()
        .zip(&report.congestion)
        .zip(&report.marginal_units)
        .map(move |((financial, congestion), units)| CsvRow {
            window: label,
            date: financial.date,
            net_revenue: financial.total_revenue,
            energy_revenue: financial.energy_revenue,
            congestion_revenue: financial.congestion_revenue,
            tb26: financial.total_tb26,
            top_constraint: &congestion.top_hours.constraint_name,
            bottom_constraint: &congestion.bottom_hours.constraint_name,
            top_unit_type: &units.top_hours_unit_type,
            bottom_unit_type: &units.bottom_hours_unit_type,
        })
}

fn write_csv<W: Write>(out: W, reports: &[(&str, &WeeklyReport)]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for (label, report) in reports {
        for row in csv_rows(label, report) {
            writer.serialize(row)?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn print_summary(title: &str, report: &WeeklyReport) {
    let financial = &report.financial;
    println!("{title}: {} to {}", report.window.start, report.window.end);
    println!("{}", "=".repeat(40));
    println!("Restriction month: {}", report.restriction_month);
    println!("Valid days: {}", financial.days_used);
    println!("TB2.6 total:      ${:.2}/kW-month", financial.total_tb26);
    println!("TB2.6 energy:     ${:.2}/kW-month", financial.energy_tb26);
    println!("TB2.6 congestion: ${:.2}/kW-month", financial.congestion_tb26);
    for skipped in &report.skipped_days {
        println!("  skipped {}: {}", skipped.date, skipped.reason);
    }
    for congestion in &report.congestion {
        println!(
            "  {} peak driver: {} (${:.2}), trough driver: {} (${:.2})",
            congestion.date,
            congestion.top_hours.constraint_name,
            congestion.top_hours.avg_congestion,
            congestion.bottom_hours.constraint_name,
            congestion.bottom_hours.avg_congestion,
        );
    }
    println!();
}
