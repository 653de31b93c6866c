use crate::constraint_catalog::ConstraintCatalog;
use crate::models::{
    AttributionRecord, BindingConstraintRecord, HourEnding, HourSetAttribution, HourlyPrice, MarginalUnitRecord,
};
use chrono::NaiveDate;
use std::collections::BTreeMap;

pub const NO_CONSTRAINTS: &str = "No constraints";
pub const UNKNOWN_UNIT: &str = "Unknown";

/// Group impacts by name and pick the name whose mean is largest in
/// absolute value. The reported impact keeps its sign.
///
/// Names are compared in lexical order, so on equal magnitudes the
/// lexically first name wins.
pub fn resolve_driver<I>(impacts: I, sentinel: &str) -> AttributionRecord
where
    I: IntoIterator<Item = (String, f64)>,
{
    let mut groups: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for (name, impact) in impacts {
        let group = groups.entry(name).or_insert((0.0, 0));
        group.0 += impact;
        group.1 += 1;
    }

    let mut best: Option<AttributionRecord> = None;
    for (name, (sum, count)) in groups {
        let mean = sum / count as f64;
        if best.as_ref().map_or(true, |b| mean.abs() > b.average_impact.abs()) {
            best = Some(AttributionRecord {
                driver_name: name,
                average_impact: mean,
            });
        }
    }

    best.unwrap_or_else(|| AttributionRecord::sentinel(sentinel))
}

/// The binding constraint that best explains congestion over `hours`.
pub fn attribute_congestion(
    date: NaiveDate,
    hours: &[HourEnding],
    constraints: &[BindingConstraintRecord],
    catalog: &ConstraintCatalog,
) -> HourSetAttribution {
    let impacts = constraints
        .iter()
        .filter(|c| c.date == date && hours.contains(&c.hour_ending))
        .map(|c| (catalog.display_name(&c.constraint_id), c.congestion_value));
    let driver = resolve_driver(impacts, NO_CONSTRAINTS);

    HourSetAttribution {
        hours: hours.to_vec(),
        constraint_name: driver.driver_name,
        avg_congestion: driver.average_impact,
    }
}

/// The marginal unit type that best explains the energy component over
/// `hours`. Each marginal record carries the energy component of its hour.
pub fn attribute_marginal_units(
    date: NaiveDate,
    hours: &[HourEnding],
    units: &[MarginalUnitRecord],
    prices: &[HourlyPrice],
) -> AttributionRecord {
    let energy_at = |hour: HourEnding| {
        prices
            .iter()
            .find(|p| p.date == date && p.hour_ending == hour)
            .map(|p| p.energy)
    };

    let impacts = units
        .iter()
        .filter(|u| u.is_marginal && u.date == date && hours.contains(&u.hour_ending))
        .filter_map(|u| energy_at(u.hour_ending).map(|energy| (u.unit_type.clone(), energy)));

    resolve_driver(impacts, UNKNOWN_UNIT)
}
