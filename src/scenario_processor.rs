use crate::report_writer::{write_scenario_json, write_summary, SummaryRow, SUMMARY_FILE};
use anyhow::{Context, Result};
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tb26_calculator::{
    ComparisonInputs, DataLoader, EngineConfig, ScenarioPaths, WeekWindow, WeeklyAggregator, WindowComparison,
};

/// Every directory under `root` that holds a prices export.
pub fn discover_scenarios(root: &Path) -> Result<Vec<PathBuf>> {
    let pattern = root.join("*").join(ScenarioPaths::PRICES);
    let pattern = pattern
        .to_str()
        .with_context(|| format!("non UTF-8 scenario root {}", root.display()))?;

    let mut dirs: Vec<PathBuf> = glob(pattern)?
        .filter_map(Result::ok)
        .filter_map(|prices| prices.parent().map(Path::to_path_buf))
        .collect();
    dirs.sort();
    Ok(dirs)
}

pub fn scenario_name(dir: &Path) -> String {
    dir.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string())
}

/// Load one scenario and run the three-window comparison.
pub fn run_scenario(dir: &Path, week: WeekWindow, config: &EngineConfig) -> Result<WindowComparison> {
    let data = DataLoader::default()
        .load_scenario(&ScenarioPaths::in_dir(dir))
        .with_context(|| format!("loading scenario {}", dir.display()))?;
    let aggregator = WeeklyAggregator::new(config.restriction_calendar(), config.battery.clone());
    Ok(aggregator.compare(&ComparisonInputs::from_scenario(&data, week)))
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
    {
        pb.set_style(style);
    }
    pb
}

/// Run every scenario under `root` in parallel, writing `<scenario>.json`
/// and the combined summary CSV into `output_dir`.
pub fn process_all_scenarios(root: &Path, week: WeekWindow, config: &EngineConfig, output_dir: &Path) -> Result<()> {
    println!("\n📊 TB2.6 Batch Run: {} to {}", week.start, week.end);
    println!("{}", "=".repeat(60));

    let scenarios = discover_scenarios(root)?;
    println!("Found {} scenario directories in {}", scenarios.len(), root.display());
    if scenarios.is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(output_dir)?;

    let pb = progress_bar(scenarios.len());
    let results: Vec<(String, Result<Vec<SummaryRow>>)> = scenarios
        .par_iter()
        .map(|dir| {
            let name = scenario_name(dir);
            let result = run_scenario(dir, week, config).and_then(|comparison| {
                write_scenario_json(&output_dir.join(format!("{name}.json")), &comparison)?;
                Ok(SummaryRow::from_comparison(&name, &comparison))
            });
            pb.inc(1);
            (name, result)
        })
        .collect();
    pb.finish_with_message("done");

    let mut rows = Vec::new();
    let mut failures = 0;
    for (name, result) in results {
        match result {
            Ok(scenario_rows) => rows.extend(scenario_rows),
            Err(e) => {
                println!("  ❌ {name}: {e:#}");
                failures += 1;
            }
        }
    }

    let summary_path = output_dir.join(SUMMARY_FILE);
    write_summary(&summary_path, &rows)?;

    println!("\n{}", "=".repeat(60));
    println!("✅ {} scenarios processed, {} failed", scenarios.len() - failures, failures);
    println!("Summary written to {}", summary_path.display());
    for row in rows.iter().filter(|r| r.window == "this_week") {
        println!(
            "  {:<30} ${:>8.2}/kW-month ({} of 7 days)",
            row.scenario, row.total_tb26, row.days_used
        );
    }

    Ok(())
}

/// Report the days each scenario would drop from the weekly average.
pub fn verify_scenarios(root: &Path, week: WeekWindow, config: &EngineConfig) -> Result<()> {
    println!("\n🔍 Scenario Data Verification: {} to {}", week.start, week.end);
    println!("{}", "=".repeat(60));

    let scenarios = discover_scenarios(root)?;
    let mut total_issues = 0;

    for dir in &scenarios {
        let name = scenario_name(dir);
        println!("\n📁 {name}");

        let comparison = match run_scenario(dir, week, config) {
            Ok(comparison) => comparison,
            Err(e) => {
                println!("    ❌ {e:#}");
                total_issues += 1;
                continue;
            }
        };

        for (label, report) in [
            ("this week", &comparison.this_week),
            ("last week", &comparison.last_week),
            ("last year", &comparison.last_year),
        ] {
            if report.skipped_days.is_empty() {
                println!("    ✅ {label}: all {} days usable", report.financial.days_used);
                continue;
            }
            println!(
                "    ⚠️  {label}: {} of 7 days skipped",
                report.skipped_days.len()
            );
            for skipped in &report.skipped_days {
                println!("        {}: {}", skipped.date, skipped.reason);
            }
            total_issues += report.skipped_days.len();
        }
    }

    println!("\n{}", "=".repeat(60));
    if total_issues == 0 {
        println!("✅ Verification passed! No issues found.");
    } else {
        println!("⚠️  Verification found {} issues", total_issues);
    }

    Ok(())
}
