use chrono::NaiveDate;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tb26_calculator::models::{HourEnding, SkipReason};
use tb26_calculator::{
    ComparisonInputs, DataLoader, EngineConfig, ScenarioPaths, Tb26Error, WeekWindow, WeeklyAggregator,
    WeeklyInputs,
};
use tempfile::TempDir;

const WEEK_START: (i32, u32, u32) = (2024, 8, 5);

fn week() -> WeekWindow {
    let (y, m, d) = WEEK_START;
    WeekWindow::new(NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

/// August shape: rising overnight, a shoulder, a late-afternoon peak inside
/// the charging window and an evening peak outside it.
fn energy_at(hour_ending: i64) -> f64 {
    match hour_ending {
        1..=6 => 20.0 + hour_ending as f64,
        15 => 90.0,
        16 => 95.0,
        17..=21 => 200.0,
        22..=24 => 30.0,
        _ => 40.0,
    }
}

fn write_prices(dir: &Path, window: WeekWindow, gap: Option<(NaiveDate, i64)>) {
    let mut csv = String::from("date,hour_ending,energy,congestion,losses\n");
    for day in window.days() {
        for he in 1..=24 {
            if gap == Some((day, he)) {
                continue;
            }
            writeln!(csv, "{day},{he},{:.2},0.0,0.0", energy_at(he)).unwrap();
        }
    }
    fs::write(dir.join(ScenarioPaths::PRICES), csv).unwrap();
}

fn write_attribution_feeds(dir: &Path) {
    fs::write(
        dir.join(ScenarioPaths::BINDING_CONSTRAINTS),
        "date,hour_ending,constraint_id,congestion_value\n\
         2024-08-05,16,101,12.5\n\
         2024-08-05,15,101,7.5\n\
         2024-08-05,15,202,-3.0\n\
         2024-08-05,18,303,500.0\n",
    )
    .unwrap();
    fs::write(
        dir.join(ScenarioPaths::CONSTRAINT_NAMES),
        "constraint_id,constraint_name\n101,North Hub Import\n202,West Tie\n",
    )
    .unwrap();
    fs::write(
        dir.join(ScenarioPaths::MARGINAL_UNITS),
        "date,hour_ending,unit_id,unit_name,unit_type,is_marginal\n\
         2024-08-05,16,CT1,Peaker One,Gas CT,true\n\
         2024-08-05,15,ST4,Coal Four,Coal,false\n\
         2024-08-05,1,WF2,Wind Farm Two,Wind,true\n",
    )
    .unwrap();
}

fn scenario_dir(gap: Option<(NaiveDate, i64)>) -> TempDir {
    let dir = TempDir::new().unwrap();
    write_prices(dir.path(), week(), gap);
    write_attribution_feeds(dir.path());
    dir
}

fn he(h: i64) -> HourEnding {
    HourEnding::new(h).unwrap()
}

#[test]
fn test_week_from_scenario_directory() {
    let dir = scenario_dir(None);
    let data = DataLoader::default()
        .load_scenario(&ScenarioPaths::in_dir(dir.path()))
        .unwrap();
    assert!(data.fundamentals.is_none());

    let config = EngineConfig::default();
    let aggregator = WeeklyAggregator::new(config.restriction_calendar(), config.battery.clone());
    let inputs = WeeklyInputs::from_source(
        week(),
        &data.prices,
        &data.marginal_units,
        &data.binding_constraints,
        &data.constraint_names,
    );
    let report = aggregator.run(&inputs);

    assert_eq!(report.restriction_month, 8);
    assert_eq!(report.financial.days_used, 7);
    assert!(report.skipped_days.is_empty());

    // Charge 80 MW at HE1 and HE2; sell 60 at HE16, 60 at HE15, 17.6 at a $40 hour.
    let daily_net = 60.0 * 95.0 + 60.0 * 90.0 + 17.6 * 40.0 - (80.0 * 21.0 + 80.0 * 22.0);
    let expected_tb26 = daily_net / 60_000.0 * 30.25;
    assert!((report.financial.total_tb26 - expected_tb26).abs() < 1e-9);
    assert!((report.financial.energy_tb26 - expected_tb26).abs() < 1e-9);
    assert_eq!(report.financial.congestion_tb26, 0.0);

    let monday = &report.congestion[0];
    assert_eq!(monday.top_hours.hours, vec![he(16), he(15)]);
    assert_eq!(monday.top_hours.constraint_name, "North Hub Import");
    assert_eq!(monday.top_hours.avg_congestion, 10.0);
    assert_eq!(monday.bottom_hours.hours, vec![he(1), he(2)]);
    assert_eq!(monday.bottom_hours.constraint_name, "No constraints");

    let units = &report.marginal_units[0];
    assert_eq!(units.top_hours_unit_type, "Gas CT");
    assert_eq!(units.top_hours_mec, 95.0);
    assert_eq!(units.bottom_hours_unit_type, "Wind");
    assert_eq!(units.bottom_hours_mec, 21.0);

    // Tuesday has no records in any attribution feed.
    assert_eq!(report.congestion[1].top_hours.constraint_name, "No constraints");
    assert_eq!(report.marginal_units[1].top_hours_unit_type, "Unknown");
}

#[test]
fn test_day_with_missing_hour_is_skipped() {
    let wednesday = NaiveDate::from_ymd_opt(2024, 8, 7).unwrap();
    let dir = scenario_dir(Some((wednesday, 12)));
    let data = DataLoader::default()
        .load_scenario(&ScenarioPaths::in_dir(dir.path()))
        .unwrap();

    let aggregator = WeeklyAggregator::new(Default::default(), Default::default());
    let inputs = WeeklyInputs::from_source(
        week(),
        &data.prices,
        &data.marginal_units,
        &data.binding_constraints,
        &data.constraint_names,
    );
    let report = aggregator.run(&inputs);

    assert_eq!(report.financial.days_used, 6);
    assert_eq!(report.skipped_days.len(), 1);
    assert_eq!(report.skipped_days[0].date, wednesday);
    assert_eq!(report.skipped_days[0].reason, SkipReason::IncompleteDay { records: 23 });
    assert!(report.financial.daily_breakdown.iter().all(|d| d.date != wednesday));
}

#[test]
fn test_comparison_without_history_is_zero() {
    let dir = scenario_dir(None);
    let data = DataLoader::default()
        .load_scenario(&ScenarioPaths::in_dir(dir.path()))
        .unwrap();
    let aggregator = WeeklyAggregator::new(Default::default(), Default::default());

    let comparison = aggregator.compare(&ComparisonInputs::from_scenario(&data, week()));

    assert_eq!(comparison.this_week.financial.days_used, 7);
    assert_eq!(comparison.last_week.window.start, NaiveDate::from_ymd_opt(2024, 7, 29).unwrap());
    assert_eq!(comparison.last_week.financial.days_used, 0);
    assert_eq!(comparison.last_week.financial.total_tb26, 0.0);
    assert_eq!(comparison.last_year.window.start, NaiveDate::from_ymd_opt(2023, 8, 7).unwrap());
    assert_eq!(comparison.last_year.skipped_days.len(), 7);
}

#[test]
fn test_config_file_overrides_battery() {
    let dir = scenario_dir(None);
    let config_path = dir.path().join("engine.toml");
    fs::write(&config_path, "[battery]\nbuy_budget_mw = 80.0\n").unwrap();
    let config = EngineConfig::from_toml_file(&config_path).unwrap();
    assert_eq!(config.battery.buy_budget_mw, 80.0);

    let data = DataLoader::default()
        .load_scenario(&ScenarioPaths::in_dir(dir.path()))
        .unwrap();
    let aggregator = WeeklyAggregator::new(config.restriction_calendar(), config.battery.clone());
    let inputs = WeeklyInputs::from_source(
        week(),
        &data.prices,
        &data.marginal_units,
        &data.binding_constraints,
        &data.constraint_names,
    );
    let daily = &aggregator.run(&inputs).financial.daily_breakdown[0];

    assert_eq!(daily.dispatch.charged_mw(), 80.0);
    assert_eq!(daily.dispatch.charges.len(), 1);
}

#[test]
fn test_missing_prices_file_is_an_upstream_error() {
    let dir = TempDir::new().unwrap();
    let err = DataLoader::default()
        .load_scenario(&ScenarioPaths::in_dir(dir.path()))
        .unwrap_err();
    assert!(matches!(err, Tb26Error::UpstreamFetch { feed: "hourly prices", .. }));
}
