use crate::models::{ChargeableHour, HourEnding, HourlyPrice, SkipReason, HOURS_PER_DAY};
use crate::restriction::RestrictionProfile;
use chrono::NaiveDate;

/// Number of hours reported at each price extreme.
pub const EXTREME_HOURS: usize = 2;

/// A complete day reduced to its restriction-eligible hours.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedDay {
    pub date: NaiveDate,
    /// Eligible hours, most expensive first.
    pub chargeable: Vec<ChargeableHour>,
    /// The two most expensive eligible hours, highest first.
    pub top_hours: Vec<HourEnding>,
    /// The two cheapest eligible hours, cheapest first.
    pub bottom_hours: Vec<HourEnding>,
}

/// Returns the day's 24 hourly records ordered by hour ending.
///
/// When an hour ending appears more than once the first record is kept.
pub fn complete_day(records: &[HourlyPrice]) -> Result<Vec<HourlyPrice>, SkipReason> {
    let mut slots: [Option<&HourlyPrice>; HOURS_PER_DAY] = [None; HOURS_PER_DAY];
    for record in records {
        let slot = &mut slots[record.hour_beginning()];
        if slot.is_none() {
            *slot = Some(record);
        }
    }

    let present = slots.iter().filter(|s| s.is_some()).count();
    if present < HOURS_PER_DAY {
        return Err(SkipReason::IncompleteDay { records: present });
    }
    Ok(slots.iter().flatten().map(|p| (*p).clone()).collect())
}

/// Masks a day's prices with the restriction profile and ranks them by LMP.
///
/// Ties keep hour-ending order.
pub fn rank_day(
    date: NaiveDate,
    records: &[HourlyPrice],
    profile: &RestrictionProfile,
) -> Result<RankedDay, SkipReason> {
    let day = complete_day(records)?;

    let mut chargeable: Vec<ChargeableHour> = day
        .into_iter()
        .filter(|p| profile.is_chargeable(p.hour_beginning()))
        .map(|price| {
            let cap_mw = profile.cap(price.hour_beginning());
            ChargeableHour { price, cap_mw }
        })
        .collect();

    if chargeable.len() < EXTREME_HOURS * 2 {
        return Err(SkipReason::InsufficientChargeableHours {
            eligible: chargeable.len(),
        });
    }

    chargeable.sort_by(|a, b| b.price.lmp.total_cmp(&a.price.lmp));

    let top_hours = chargeable
        .iter()
        .take(EXTREME_HOURS)
        .map(|h| h.price.hour_ending)
        .collect();
    let bottom_hours = chargeable
        .iter()
        .rev()
        .take(EXTREME_HOURS)
        .map(|h| h.price.hour_ending)
        .collect();

    Ok(RankedDay {
        date,
        chargeable,
        top_hours,
        bottom_hours,
    })
}
