use crate::error::{Result, Tb26Error};
use crate::models::{WeekWindow, HOURS_PER_DAY};
use chrono::Datelike;

/// Month used when a calendar has no profile for the requested month.
pub const FALLBACK_MONTH: u32 = 10;

// Charging caps in MW, indexed by hour beginning, January first.
#[rustfmt::skip]
const REFERENCE_PROFILES: [[f64; HOURS_PER_DAY]; 12] = [
    [100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 80.0, 0.0, 0.0, 60.0, 60.0, 60.0, 60.0, 60.0, 60.0, 60.0, 80.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0],
    [100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 80.0, 0.0, 0.0, 60.0, 60.0, 60.0, 60.0, 60.0, 60.0, 60.0, 80.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0],
    [120.0, 120.0, 120.0, 120.0, 120.0, 120.0, 100.0, 60.0, 60.0, 80.0, 80.0, 80.0, 80.0, 80.0, 80.0, 80.0, 100.0, 120.0, 120.0, 120.0, 120.0, 120.0, 120.0, 120.0],
    [120.0, 120.0, 120.0, 120.0, 120.0, 120.0, 120.0, 80.0, 80.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 120.0, 120.0, 120.0, 120.0, 120.0, 120.0, 120.0],
    [100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 80.0, 80.0, 80.0, 80.0, 80.0, 80.0, 80.0, 80.0, 40.0, 0.0, 0.0, 0.0, 60.0, 100.0, 100.0, 100.0],
    [80.0, 80.0, 80.0, 80.0, 80.0, 80.0, 80.0, 80.0, 60.0, 60.0, 60.0, 60.0, 60.0, 60.0, 60.0, 60.0, 0.0, 0.0, 0.0, 0.0, 0.0, 60.0, 80.0, 80.0],
    [80.0, 80.0, 80.0, 80.0, 80.0, 80.0, 60.0, 60.0, 40.0, 40.0, 40.0, 40.0, 40.0, 40.0, 40.0, 40.0, 0.0, 0.0, 0.0, 0.0, 0.0, 40.0, 80.0, 80.0],
    [80.0, 80.0, 80.0, 80.0, 80.0, 80.0, 60.0, 60.0, 40.0, 40.0, 40.0, 40.0, 40.0, 40.0, 40.0, 40.0, 0.0, 0.0, 0.0, 0.0, 0.0, 40.0, 80.0, 80.0],
    [80.0, 80.0, 80.0, 80.0, 80.0, 80.0, 80.0, 80.0, 60.0, 60.0, 60.0, 60.0, 60.0, 60.0, 60.0, 60.0, 20.0, 0.0, 0.0, 0.0, 40.0, 60.0, 80.0, 80.0],
    [100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 80.0, 80.0, 80.0, 80.0, 80.0, 80.0, 80.0, 80.0, 80.0, 80.0, 60.0, 60.0, 60.0, 80.0, 100.0, 100.0, 100.0],
    [100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 80.0, 40.0, 40.0, 60.0, 60.0, 60.0, 60.0, 60.0, 60.0, 60.0, 80.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0],
    [100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 80.0, 0.0, 0.0, 60.0, 60.0, 60.0, 60.0, 60.0, 60.0, 60.0, 80.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0],
];

/// Per-hour charging caps (MW) for one calendar month, indexed by hour beginning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RestrictionProfile([f64; HOURS_PER_DAY]);

impl RestrictionProfile {
    pub const fn new(caps: [f64; HOURS_PER_DAY]) -> Self {
        Self(caps)
    }

    pub fn cap(&self, hour_beginning: usize) -> f64 {
        self.0.get(hour_beginning).copied().unwrap_or(0.0)
    }

    pub fn is_chargeable(&self, hour_beginning: usize) -> bool {
        self.cap(hour_beginning) > 0.0
    }

    pub fn caps(&self) -> &[f64; HOURS_PER_DAY] {
        &self.0
    }
}

impl TryFrom<&[f64]> for RestrictionProfile {
    type Error = Tb26Error;

    fn try_from(caps: &[f64]) -> Result<Self> {
        let caps: [f64; HOURS_PER_DAY] = caps.try_into().map_err(|_| Tb26Error::Config {
            field: "restrictions.profiles".to_string(),
            message: format!("expected 24 caps, got {}", caps.len()),
        })?;
        Ok(Self(caps))
    }
}

/// Month-by-month restriction profiles shared by every weekly calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct RestrictionCalendar {
    profiles: Vec<RestrictionProfile>,
}

impl Default for RestrictionCalendar {
    fn default() -> Self {
        Self::reference()
    }
}

impl RestrictionCalendar {
    pub fn reference() -> Self {
        Self::from_profiles(REFERENCE_PROFILES.iter().copied().map(RestrictionProfile::new).collect())
    }

    /// Profiles are taken in month order starting with January.
    pub fn from_profiles(profiles: Vec<RestrictionProfile>) -> Self {
        Self { profiles }
    }

    pub fn profile(&self, month: u32) -> Result<&RestrictionProfile> {
        if !(1..=12).contains(&month) {
            return Err(Tb26Error::InvalidMonth(month));
        }
        Ok(self.profile_or_fallback(month))
    }

    fn profile_or_fallback(&self, month: u32) -> &RestrictionProfile {
        self.profiles
            .get(month as usize - 1)
            .or_else(|| {
                log::warn!("no restriction profile for month {month}, using month {FALLBACK_MONTH}");
                self.profiles.get(FALLBACK_MONTH as usize - 1)
            })
            .unwrap_or(&REFERENCE_FALLBACK)
    }

    /// Resolves the window's dominant month and its profile.
    pub fn profile_for_window(&self, window: &WeekWindow) -> (u32, &RestrictionProfile) {
        let month = dominant_month(window);
        (month, self.profile_or_fallback(month))
    }
}

static REFERENCE_FALLBACK: RestrictionProfile =
    RestrictionProfile::new(REFERENCE_PROFILES[FALLBACK_MONTH as usize - 1]);

/// Month (1..=12) holding the most days of the window.
///
/// Ties go to the month reached first when walking the window forward.
pub fn dominant_month(window: &WeekWindow) -> u32 {
    let mut counts: Vec<(u32, usize)> = Vec::with_capacity(2);
    for day in window.days() {
        match counts.iter_mut().find(|(month, _)| *month == day.month()) {
            Some((_, count)) => *count += 1,
            None => counts.push((day.month(), 1)),
        }
    }

    let mut best: Option<(u32, usize)> = None;
    for (month, count) in counts {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((month, count));
        }
    }
    best.map(|(month, _)| month).unwrap_or_else(|| window.start.month())
}
