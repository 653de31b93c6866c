use crate::config::Tb26Config;
use crate::models::{ChargeableHour, DailyFinancial, DispatchResult, HourDispatch, HourlyPrice, WeeklyFinancialSummary};
use crate::ranker::RankedDay;
use log::debug;

/// Running MW-weighted sums of each price component.
#[derive(Debug, Default, Clone, Copy)]
struct Legs {
    total: f64,
    energy: f64,
    congestion: f64,
    losses: f64,
}

impl Legs {
    fn add(&mut self, mw: f64, price: &HourlyPrice) {
        self.total += mw * price.lmp;
        self.energy += mw * price.energy;
        self.congestion += mw * price.congestion;
        self.losses += mw * price.losses;
    }
}

/// Daily price-extremum battery dispatch for a fixed-size battery.
pub struct Tb26Calculator {
    config: Tb26Config,
}

impl Tb26Calculator {
    pub fn new(config: Tb26Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Tb26Config {
        &self.config
    }

    /// Simulate one day of charging and discharging over the eligible hours.
    ///
    /// Charging buys from the cheapest hour upward, limited by each hour's cap,
    /// until the buy budget is filled. Discharging sells the post-loss energy
    /// into the most expensive hours in fixed blocks, the last hour taking the
    /// remainder. Charge and discharge hours are picked independently.
    pub fn simulate_day(&self, hours: &[ChargeableHour]) -> DispatchResult {
        let mut ascending: Vec<&ChargeableHour> = hours.iter().collect();
        ascending.sort_by(|a, b| a.price.lmp.total_cmp(&b.price.lmp));

        let mut cost = Legs::default();
        let mut charges = Vec::new();
        let mut remaining = self.config.buy_budget_mw;

        for hour in &ascending {
            if remaining <= 0.0 {
                break;
            }
            let mw = remaining.min(hour.cap_mw);
            if mw <= 0.0 {
                continue;
            }
            cost.add(mw, &hour.price);
            charges.push(HourDispatch {
                hour_ending: hour.price.hour_ending,
                mw,
                lmp: hour.price.lmp,
            });
            remaining -= mw;
        }

        let mut revenue = Legs::default();
        let mut discharges = Vec::new();

        for (hour, mw) in ascending.iter().rev().zip(self.discharge_blocks()) {
            revenue.add(mw, &hour.price);
            discharges.push(HourDispatch {
                hour_ending: hour.price.hour_ending,
                mw,
                lmp: hour.price.lmp,
            });
        }

        DispatchResult {
            total_revenue: revenue.total - cost.total,
            energy_revenue: revenue.energy - cost.energy,
            congestion_revenue: revenue.congestion - cost.congestion,
            losses_revenue: revenue.losses - cost.losses,
            charges,
            discharges,
        }
    }

    /// Discharge MW per hour, most expensive hour first.
    ///
    /// With the reference parameters this is 60, 60 and 137.6 - 120.
    pub fn discharge_blocks(&self) -> Vec<f64> {
        let available = self.config.available_energy_mwh();
        let block = self.config.discharge_block_mw;

        let full_blocks = (available / block).floor() as usize;
        let mut blocks = vec![block; full_blocks];
        let remainder = available - block * full_blocks as f64;
        if remainder > 1e-9 {
            blocks.push(remainder);
        }
        blocks
    }

    pub fn calculate_day(&self, ranked: &RankedDay) -> DailyFinancial {
        let dispatch = self.simulate_day(&ranked.chargeable);
        debug!(
            "{}: charged {:.1} MW, discharged {:.1} MW, net ${:.2}",
            ranked.date,
            dispatch.charged_mw(),
            dispatch.discharged_mw(),
            dispatch.total_revenue
        );

        DailyFinancial {
            date: ranked.date,
            total_revenue: dispatch.total_revenue,
            energy_revenue: dispatch.energy_revenue,
            congestion_revenue: dispatch.congestion_revenue,
            total_tb26: self.config.to_kw_month(dispatch.total_revenue),
            dispatch,
        }
    }

    /// Average the valid days and express them in $/kW-month.
    ///
    /// A week without a single valid day is all zeros.
    pub fn summarize_week(&self, daily: Vec<DailyFinancial>) -> WeeklyFinancialSummary {
        if daily.is_empty() {
            return WeeklyFinancialSummary::empty();
        }

        let days = daily.len() as f64;
        let average = |f: fn(&DailyFinancial) -> f64| daily.iter().map(f).sum::<f64>() / days;

        WeeklyFinancialSummary {
            total_tb26: self.config.to_kw_month(average(|d| d.total_revenue)),
            energy_tb26: self.config.to_kw_month(average(|d| d.energy_revenue)),
            congestion_tb26: self.config.to_kw_month(average(|d| d.congestion_revenue)),
            days_used: daily.len(),
            daily_breakdown: daily,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HourEnding, HOURS_PER_DAY};
    use crate::ranker::rank_day;
    use crate::restriction::RestrictionProfile;
    use chrono::NaiveDate;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn hour(he: i64, energy: f64, congestion: f64, losses: f64, cap_mw: f64) -> ChargeableHour {
        ChargeableHour {
            price: HourlyPrice::from_components(
                day(),
                HourEnding::new(he).unwrap(),
                energy,
                congestion,
                losses,
                None,
            ),
            cap_mw,
        }
    }

    fn daily_net(date: NaiveDate, net: f64) -> DailyFinancial {
        DailyFinancial {
            date,
            total_revenue: net,
            energy_revenue: net,
            congestion_revenue: 0.0,
            total_tb26: 0.0,
            dispatch: DispatchResult::default(),
        }
    }

    #[test]
    fn test_discharge_blocks_reference_split() {
        let calculator = Tb26Calculator::new(Tb26Config::default());
        let blocks = calculator.discharge_blocks();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0], 60.0);
        assert_eq!(blocks[1], 60.0);
        assert_eq!(blocks[2], 160.0 * 0.86 - 120.0);
    }

    #[test]
    fn test_hand_computed_day() {
        // Caps of 100 MW: charge 100 MW at $10 and 60 MW at $20.
        let mut hours: Vec<ChargeableHour> = (1..=20).map(|he| hour(he, 50.0, 0.0, 0.0, 100.0)).collect();
        hours[0] = hour(1, 10.0, 0.0, 0.0, 100.0);
        hours[1] = hour(2, 20.0, 0.0, 0.0, 100.0);
        hours[17] = hour(18, 100.0, 0.0, 0.0, 100.0);
        hours[18] = hour(19, 200.0, 0.0, 0.0, 100.0);
        hours[19] = hour(20, 300.0, 0.0, 0.0, 100.0);

        let result = Tb26Calculator::new(Tb26Config::default()).simulate_day(&hours);

        let cost = 100.0 * 10.0 + 60.0 * 20.0;
        let revenue = 60.0 * 300.0 + 60.0 * 200.0 + (137.6 - 120.0) * 100.0;
        assert!((result.total_revenue - (revenue - cost)).abs() < 1e-6);
        assert_eq!(result.charges.len(), 2);
        assert_eq!(result.discharges.iter().map(|d| d.hour_ending.get()).collect::<Vec<_>>(), vec![20, 19, 18]);
    }

    #[test]
    fn test_charging_respects_budget_and_caps() {
        let caps = [30.0, 45.0, 10.0, 70.0, 25.0, 90.0];
        let hours: Vec<ChargeableHour> = caps
            .iter()
            .enumerate()
            .map(|(i, cap)| hour(i as i64 + 1, 10.0 + i as f64, 1.0, 0.5, *cap))
            .collect();

        let result = Tb26Calculator::new(Tb26Config::default()).simulate_day(&hours);

        assert!(result.charged_mw() <= 160.0 + 1e-9);
        assert!((result.charged_mw() - 160.0).abs() < 1e-9);
        for charge in &result.charges {
            let cap = caps[charge.hour_ending.hour_beginning()];
            assert!(charge.mw <= cap);
        }
    }

    #[test]
    fn test_charging_stops_when_hours_run_out() {
        let hours = vec![
            hour(1, 10.0, 0.0, 0.0, 20.0),
            hour(2, 20.0, 0.0, 0.0, 20.0),
            hour(3, 30.0, 0.0, 0.0, 20.0),
            hour(4, 40.0, 0.0, 0.0, 20.0),
        ];
        let result = Tb26Calculator::new(Tb26Config::default()).simulate_day(&hours);
        assert_eq!(result.charged_mw(), 80.0);
        assert_eq!(result.discharges.len(), 3);
    }

    #[test]
    fn test_components_reconcile_with_losses_term() {
        let hours: Vec<ChargeableHour> = (1..=24)
            .map(|he| {
                let x = he as f64;
                hour(he, 20.0 + (x * 3.7) % 40.0, (x * 1.3) % 9.0 - 4.0, 1.0, 80.0)
            })
            .collect();
        let result = Tb26Calculator::new(Tb26Config::default()).simulate_day(&hours);

        let rebuilt = result.energy_revenue + result.congestion_revenue + result.losses_revenue;
        assert!((result.total_revenue - rebuilt).abs() < 1e-6);

        // Flat $1 losses: 137.6 MW sold minus 160 MW bought.
        assert!((result.losses_revenue - (137.6 - 160.0)).abs() < 1e-6);
    }

    #[test]
    fn test_weekly_normalization_two_days() {
        let calculator = Tb26Calculator::new(Tb26Config::default());
        let summary = calculator.summarize_week(vec![
            daily_net(day(), 6000.0),
            daily_net(day().succ_opt().unwrap(), 9000.0),
        ]);
        assert!((summary.total_tb26 - 7500.0 / 60000.0 * 30.25).abs() < 1e-12);
        assert!((summary.total_tb26 - 3.78).abs() < 0.01);
        assert_eq!(summary.days_used, 2);
        assert_eq!(summary.congestion_tb26, 0.0);
    }

    #[test]
    fn test_empty_week_is_zero_not_nan() {
        let summary = Tb26Calculator::new(Tb26Config::default()).summarize_week(vec![]);
        assert_eq!(summary.total_tb26, 0.0);
        assert_eq!(summary.energy_tb26, 0.0);
        assert_eq!(summary.congestion_tb26, 0.0);
        assert_eq!(summary.days_used, 0);
    }

    #[test]
    fn test_calculate_day_from_ranked() {
        let records: Vec<HourlyPrice> = (1..=24)
            .map(|he| {
                HourlyPrice::from_components(day(), HourEnding::new(he).unwrap(), he as f64, 0.0, 0.0, None)
            })
            .collect();
        let ranked = rank_day(day(), &records, &RestrictionProfile::new([100.0; HOURS_PER_DAY])).unwrap();
        let financial = Tb26Calculator::new(Tb26Config::default()).calculate_day(&ranked);

        // Charge 100 MW at $1 and 60 MW at $2; discharge at $24, $23, $22.
        let expected = 60.0 * 24.0 + 60.0 * 23.0 + (137.6 - 120.0) * 22.0 - (100.0 + 120.0);
        assert!((financial.total_revenue - expected).abs() < 1e-6);
        assert!((financial.total_tb26 - expected / 60000.0 * 30.25).abs() < 1e-12);
    }
}
