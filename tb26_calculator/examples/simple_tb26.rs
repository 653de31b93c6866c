use chrono::NaiveDate;
use tb26_calculator::models::HourEnding;
use tb26_calculator::ranker::rank_day;
use tb26_calculator::{HourlyPrice, RestrictionCalendar, Tb26Calculator, Tb26Config};

fn main() {
    let calculator = Tb26Calculator::new(Tb26Config::default());
    let calendar = RestrictionCalendar::reference();
    let date = NaiveDate::from_ymd_opt(2024, 4, 15).unwrap();

    // Cheap overnight, a solar trough at midday and an evening peak
    let prices: Vec<HourlyPrice> = (1..=24)
        .map(|h| {
            let energy = match h {
                1..=5 => 22.0,
                11..=15 => 8.0,
                18..=21 => 110.0,
                _ => 40.0,
            };
            HourlyPrice::from_components(date, HourEnding::new(h).unwrap(), energy, 3.0, 0.8, None)
        })
        .collect();

    let profile = calendar.profile(4).unwrap();
    let ranked = match rank_day(date, &prices, profile) {
        Ok(ranked) => ranked,
        Err(reason) => {
            println!("{date} skipped: {reason}");
            return;
        }
    };
    let daily = calculator.calculate_day(&ranked);

    println!("TB2.6 Daily Result");
    println!("==================");
    println!("Date: {}", daily.date);
    println!(
        "Peak hours: {}",
        ranked.top_hours.iter().map(|h| h.to_string()).collect::<Vec<_>>().join(", ")
    );
    println!(
        "Trough hours: {}",
        ranked.bottom_hours.iter().map(|h| h.to_string()).collect::<Vec<_>>().join(", ")
    );
    println!();
    println!("Charged: {:.1} MW", daily.dispatch.charged_mw());
    println!("Discharged: {:.1} MW", daily.dispatch.discharged_mw());
    println!("Net revenue: ${:.2}", daily.total_revenue);
    println!("  energy: ${:.2}", daily.energy_revenue);
    println!("  congestion: ${:.2}", daily.congestion_revenue);
    println!("TB2.6: ${:.2}/kW-month", daily.total_tb26);
}
