use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tb26_calculator::{EngineConfig, WeekWindow};

mod report_writer;
mod scenario_processor;

fn print_usage() {
    println!("Usage:");
    println!("  forecast_batch_processor <scenarios_dir> <week_start> [output_dir] [--config <file.toml>]");
    println!("  forecast_batch_processor --verify <scenarios_dir> <week_start> [--config <file.toml>]");
    println!("Example: forecast_batch_processor forecasts/2024Q3 2024-08-05 tb26_results");
}

fn parse_week(value: &str) -> Result<WeekWindow> {
    let start = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("week start must be YYYY-MM-DD, got {value}"))?;
    Ok(WeekWindow::new(start))
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => {
            println!("Using engine config {}", path.display());
            Ok(EngineConfig::from_toml_file(path)?)
        }
        None => Ok(EngineConfig::default()),
    }
}

fn main() -> Result<()> {
    // Set Rayon to use all available cores
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_cpus::get())
        .build_global()?;

    let mut args: Vec<String> = std::env::args().skip(1).collect();

    let config_path = match args.iter().position(|a| a == "--config") {
        Some(i) => {
            if i + 1 >= args.len() {
                bail!("--config needs a file path");
            }
            let path = PathBuf::from(args.remove(i + 1));
            args.remove(i);
            Some(path)
        }
        None => None,
    };
    let config = load_config(config_path.as_deref())?;

    if args.first().map(String::as_str) == Some("--verify") {
        if args.len() < 3 {
            print_usage();
            return Ok(());
        }
        let week = parse_week(&args[2])?;
        scenario_processor::verify_scenarios(Path::new(&args[1]), week, &config)?;
    } else if args.len() >= 2 {
        println!("🚀 TB2.6 Forecast Batch Processor");
        println!("Using {} CPU cores", num_cpus::get());
        println!("Rayon thread pool configured with {} threads", rayon::current_num_threads());
        println!("{}", "=".repeat(60));

        let root = PathBuf::from(&args[0]);
        let week = parse_week(&args[1])?;
        let output_dir = args
            .get(2)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("tb26_results"));

        scenario_processor::process_all_scenarios(&root, week, &config, &output_dir)?;
    } else {
        print_usage();
    }

    Ok(())
}
