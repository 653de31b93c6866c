use crate::attribution::{attribute_congestion, attribute_marginal_units};
use crate::calculator::Tb26Calculator;
use crate::config::Tb26Config;
use crate::constraint_catalog::ConstraintCatalog;
use crate::data_loader::ScenarioData;
use crate::models::{
    BindingConstraintRecord, DailyCongestionAttribution, DailyMecAttribution, HourEnding, HourlyPrice, MarginalUnitRecord,
    SkippedDay, WeekWindow, WeeklyReport, WindowComparison,
};
use crate::normalizer::HourlyPriceSource;
use crate::ranker::{rank_day, RankedDay};
use crate::restriction::RestrictionCalendar;
use chrono::NaiveDate;
use log::{debug, info, warn};
use std::collections::BTreeMap;

/// Already-fetched inputs for one window.
#[derive(Debug, Clone)]
pub struct WeeklyInputs<'a> {
    pub window: WeekWindow,
    pub prices: Vec<HourlyPrice>,
    pub marginal_units: &'a [MarginalUnitRecord],
    pub binding_constraints: &'a [BindingConstraintRecord],
    pub constraint_names: &'a ConstraintCatalog,
}

impl<'a> WeeklyInputs<'a> {
    /// Pull the window's prices out of any price adapter.
    pub fn from_source<S>(
        window: WeekWindow,
        source: &S,
        marginal_units: &'a [MarginalUnitRecord],
        binding_constraints: &'a [BindingConstraintRecord],
        constraint_names: &'a ConstraintCatalog,
    ) -> Self
    where
        S: HourlyPriceSource + ?Sized,
    {
        Self {
            window,
            prices: source.hourly_prices(&window),
            marginal_units,
            binding_constraints,
            constraint_names,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ComparisonInputs<'a> {
    pub this_week: WeeklyInputs<'a>,
    pub last_week: WeeklyInputs<'a>,
    pub last_year: WeeklyInputs<'a>,
}

impl<'a> ComparisonInputs<'a> {
    /// This week and last week come from the simulation results; last year
    /// comes from the fundamentals feed when the scenario has one.
    pub fn from_scenario(data: &'a ScenarioData, this_week: WeekWindow) -> Self {
        let marginal_units = data.marginal_units.as_slice();
        let binding_constraints = data.binding_constraints.as_slice();
        let constraint_names = &data.constraint_names;
        let inputs = move |window: WeekWindow, source: &dyn HourlyPriceSource| {
            WeeklyInputs::from_source(window, source, marginal_units, binding_constraints, constraint_names)
        };

        let results: &dyn HourlyPriceSource = &data.prices;
        let historical: &dyn HourlyPriceSource = match &data.fundamentals {
            Some(feed) => feed,
            None => results,
        };

        Self {
            this_week: inputs(this_week, results),
            last_week: inputs(this_week.previous_week(), results),
            last_year: inputs(this_week.same_week_last_year(), historical),
        }
    }
}

/// Runs the ranking, dispatch and attribution steps over a window.
pub struct WeeklyAggregator {
    calendar: RestrictionCalendar,
    calculator: Tb26Calculator,
}

impl WeeklyAggregator {
    pub fn new(calendar: RestrictionCalendar, config: Tb26Config) -> Self {
        Self {
            calendar,
            calculator: Tb26Calculator::new(config),
        }
    }

    pub fn calculator(&self) -> &Tb26Calculator {
        &self.calculator
    }

    pub fn run(&self, inputs: &WeeklyInputs) -> WeeklyReport {
        let window = inputs.window;
        let (month, profile) = self.calendar.profile_for_window(&window);

        let mut by_day: BTreeMap<NaiveDate, Vec<HourlyPrice>> = BTreeMap::new();
        for price in inputs.prices.iter().filter(|p| window.contains(p.date)) {
            by_day.entry(price.date).or_default().push(price.clone());
        }

        let mut daily = Vec::new();
        let mut marginal_units = Vec::new();
        let mut congestion = Vec::new();
        let mut skipped_days = Vec::new();

        for date in window.days() {
            let records = by_day.get(&date).map(Vec::as_slice).unwrap_or(&[]);
            let ranked = match rank_day(date, records, profile) {
                Ok(ranked) => ranked,
                Err(reason) => {
                    debug!("{date}: skipped, {reason}");
                    skipped_days.push(SkippedDay { date, reason });
                    continue;
                }
            };

            daily.push(self.calculator.calculate_day(&ranked));
            congestion.push(self.congestion_for(&ranked, inputs));
            marginal_units.push(self.marginal_units_for(&ranked, records, inputs));
        }

        let window_ids = inputs
            .binding_constraints
            .iter()
            .filter(|c| window.contains(c.date))
            .map(|c| c.constraint_id.as_str());
        for id in inputs.constraint_names.unnamed_ids(window_ids) {
            warn!("constraint id {id} has no name, reporting it by id");
        }

        let financial = self.calculator.summarize_week(daily);
        info!(
            "{} to {}: {} valid days, TB2.6 ${:.2}/kW-month (restriction month {})",
            window.start, window.end, financial.days_used, financial.total_tb26, month
        );

        WeeklyReport {
            window,
            restriction_month: month,
            financial,
            marginal_units,
            congestion,
            skipped_days,
        }
    }

    /// Runs this week, last week and the same week last year.
    pub fn compare(&self, inputs: &ComparisonInputs) -> WindowComparison {
        WindowComparison {
            this_week: self.run(&inputs.this_week),
            last_week: self.run(&inputs.last_week),
            last_year: self.run(&inputs.last_year),
        }
    }

    fn congestion_for(&self, ranked: &RankedDay, inputs: &WeeklyInputs) -> DailyCongestionAttribution {
        let resolve = |hours: &[HourEnding]| {
            attribute_congestion(
                ranked.date,
                hours,
                inputs.binding_constraints,
                inputs.constraint_names,
            )
        };
        DailyCongestionAttribution {
            date: ranked.date,
            top_hours: resolve(&ranked.top_hours),
            bottom_hours: resolve(&ranked.bottom_hours),
        }
    }

    fn marginal_units_for(
        &self,
        ranked: &RankedDay,
        day_prices: &[HourlyPrice],
        inputs: &WeeklyInputs,
    ) -> DailyMecAttribution {
        let top = attribute_marginal_units(ranked.date, &ranked.top_hours, inputs.marginal_units, day_prices);
        let bottom = attribute_marginal_units(ranked.date, &ranked.bottom_hours, inputs.marginal_units, day_prices);
        DailyMecAttribution {
            date: ranked.date,
            top_hours: ranked.top_hours.clone(),
            bottom_hours: ranked.bottom_hours.clone(),
            top_hours_mec: top.average_impact,
            bottom_hours_mec: bottom.average_impact,
            top_hours_unit_type: top.driver_name,
            bottom_hours_unit_type: bottom.driver_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SkipReason, HOURS_PER_DAY};
    use crate::normalizer::{FundamentalsFeed, FundamentalsRow, PriceAttribute, SimulationResults, TimestampConvention};
    use crate::restriction::RestrictionProfile;
    use chrono::{Duration, NaiveTime};

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 7).unwrap()
    }

    fn open_calendar() -> RestrictionCalendar {
        RestrictionCalendar::from_profiles(vec![RestrictionProfile::new([100.0; HOURS_PER_DAY]); 12])
    }

    /// LMP equals the hour ending plus a per-day offset.
    fn day_prices(date: NaiveDate, offset: f64) -> Vec<HourlyPrice> {
        (1..=24)
            .map(|he| {
                HourlyPrice::from_components(date, HourEnding::new(he).unwrap(), he as f64 + offset, 0.0, 0.0, None)
            })
            .collect()
    }

    fn week_prices() -> Vec<HourlyPrice> {
        (0..7)
            .flat_map(|d| day_prices(start() + Duration::days(d), d as f64))
            .collect()
    }

    fn aggregator() -> WeeklyAggregator {
        WeeklyAggregator::new(open_calendar(), Tb26Config::default())
    }

    #[test]
    fn test_full_week_uses_every_day() {
        let catalog = ConstraintCatalog::default();
        let prices = week_prices();
        let inputs = WeeklyInputs::from_source(WeekWindow::new(start()), &prices, &[], &[], &catalog);
        let report = aggregator().run(&inputs);

        assert_eq!(report.financial.days_used, 7);
        assert!(report.skipped_days.is_empty());
        assert_eq!(report.congestion.len(), 7);
        assert_eq!(report.marginal_units.len(), 7);
        assert_eq!(report.restriction_month, 10);

        // A uniform offset cancels between the buy and sell legs except for
        // the 22.4 MW lost to efficiency, so each day differs by -22.4 * offset.
        let first = report.financial.daily_breakdown[0].total_revenue;
        let second = report.financial.daily_breakdown[1].total_revenue;
        assert!((second - first - (137.6 - 160.0)).abs() < 1e-6);

        let mean: f64 = report.financial.daily_breakdown.iter().map(|d| d.total_revenue).sum::<f64>() / 7.0;
        assert!((report.financial.total_tb26 - mean / 60000.0 * 30.25).abs() < 1e-12);
    }

    #[test]
    fn test_incomplete_day_dropped_not_zeroed() {
        let catalog = ConstraintCatalog::default();
        let mut prices = week_prices();
        let third = start() + Duration::days(2);
        prices.retain(|p| !(p.date == third && p.hour_ending.get() == 12));

        let report = aggregator().run(&WeeklyInputs::from_source(WeekWindow::new(start()), &prices, &[], &[], &catalog));
        assert_eq!(report.financial.days_used, 6);
        assert_eq!(
            report.skipped_days,
            vec![SkippedDay { date: third, reason: SkipReason::IncompleteDay { records: 23 } }]
        );
        assert!(report.financial.daily_breakdown.iter().all(|d| d.date != third));
        assert!(report.congestion.iter().all(|d| d.date != third));
    }

    #[test]
    fn test_week_without_data_is_all_zero() {
        let catalog = ConstraintCatalog::default();
        let report = aggregator().run(&WeeklyInputs::from_source(WeekWindow::new(start()), &Vec::<HourlyPrice>::new(), &[], &[], &catalog));
        assert_eq!(report.financial.total_tb26, 0.0);
        assert_eq!(report.financial.energy_tb26, 0.0);
        assert_eq!(report.financial.congestion_tb26, 0.0);
        assert_eq!(report.skipped_days.len(), 7);
    }

    #[test]
    fn test_attribution_per_day() {
        let catalog = ConstraintCatalog::from_pairs([("9", "Valley 345kV")]);
        let day = start();
        let constraints = vec![BindingConstraintRecord {
            date: day,
            hour_ending: HourEnding::new(24).unwrap(),
            constraint_id: "9".to_string(),
            congestion_value: 15.0,
        }];
        let units = vec![MarginalUnitRecord {
            date: day,
            hour_ending: HourEnding::new(1).unwrap(),
            unit_id: "C1".to_string(),
            unit_name: "Coal 1".to_string(),
            unit_type: "Coal".to_string(),
            is_marginal: true,
        }];
        let prices = week_prices();
        let inputs = WeeklyInputs::from_source(WeekWindow::new(day), &prices, &units, &constraints, &catalog);
        let report = aggregator().run(&inputs);

        let congestion = &report.congestion[0];
        assert_eq!(congestion.top_hours.constraint_name, "Valley 345kV");
        assert_eq!(congestion.top_hours.avg_congestion, 15.0);
        assert_eq!(congestion.bottom_hours.constraint_name, "No constraints");

        let mec = &report.marginal_units[0];
        assert_eq!(mec.bottom_hours_unit_type, "Coal");
        assert_eq!(mec.bottom_hours_mec, 1.0);
        assert_eq!(mec.top_hours_unit_type, "Unknown");
        assert_eq!(mec.top_hours_mec, 0.0);
    }

    #[test]
    fn test_repeat_runs_are_identical() {
        let catalog = ConstraintCatalog::from_pairs([("1", "A"), ("2", "B")]);
        let constraints: Vec<BindingConstraintRecord> = (0..7)
            .flat_map(|d| {
                [("1", 10.0), ("2", -10.0)].map(|(id, value)| BindingConstraintRecord {
                    date: start() + Duration::days(d),
                    hour_ending: HourEnding::new(24).unwrap(),
                    constraint_id: id.to_string(),
                    congestion_value: value,
                })
            })
            .collect();
        let prices = week_prices();
        let inputs = WeeklyInputs::from_source(WeekWindow::new(start()), &prices, &[], &constraints, &catalog);

        let aggregator = WeeklyAggregator::new(RestrictionCalendar::reference(), Tb26Config::default());
        let first = aggregator.run(&inputs);
        let second = aggregator.run(&inputs);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_compare_uses_fundamentals_for_last_year() {
        let this_week = WeekWindow::new(start());
        let mut results = SimulationResults::default();
        for price in week_prices().into_iter().chain(
            (0..7).flat_map(|d| day_prices(this_week.previous_week().start + Duration::days(d), 0.0)),
        ) {
            results.push(price.date, price.hour_ending, price.energy, price.congestion, price.losses, None);
        }

        let last_year = this_week.same_week_last_year();
        let rows = last_year
            .days()
            .flat_map(|day| {
                (1..=24).map(move |he| FundamentalsRow {
                    timestamp: day.and_time(NaiveTime::MIN) + Duration::hours(he),
                    attribute: PriceAttribute::Lmp,
                    value: he as f64 * 2.0,
                })
            })
            .collect();

        let data = ScenarioData {
            prices: results,
            fundamentals: Some(FundamentalsFeed::new(rows, TimestampConvention::HourEnding)),
            ..ScenarioData::default()
        };

        let comparison = aggregator().compare(&ComparisonInputs::from_scenario(&data, this_week));
        assert_eq!(comparison.this_week.financial.days_used, 7);
        assert_eq!(comparison.last_week.financial.days_used, 7);
        assert_eq!(comparison.last_year.financial.days_used, 7);
        assert_eq!(comparison.last_year.window, last_year);
        assert!(comparison.last_year.financial.total_tb26 > comparison.last_week.financial.total_tb26);
    }
}
