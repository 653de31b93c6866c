use crate::error::{Result, Tb26Error};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const HOURS_PER_DAY: usize = 24;

/// Hour-ending label of an hourly interval, 1..=24.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct HourEnding(u8);

impl HourEnding {
    pub fn new(value: i64) -> Result<Self> {
        if (1..=HOURS_PER_DAY as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(Tb26Error::InvalidHourEnding(value))
        }
    }

    pub fn from_hour_beginning(hour: u32) -> Result<Self> {
        Self::new(i64::from(hour) + 1)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Hour ending 1 is hour beginning 0 of the same day.
    pub fn hour_beginning(self) -> usize {
        usize::from(self.0) - 1
    }
}

impl TryFrom<i64> for HourEnding {
    type Error = Tb26Error;

    fn try_from(value: i64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<HourEnding> for u8 {
    fn from(hour: HourEnding) -> Self {
        hour.0
    }
}

impl fmt::Display for HourEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HE{:02}", self.0)
    }
}

/// One hour of nodal prices in $/MWh.
///
/// `lmp` is authoritative: upstream data does not always satisfy
/// `lmp == energy + congestion + losses`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyPrice {
    pub date: NaiveDate,
    pub hour_ending: HourEnding,
    pub energy: f64,
    pub congestion: f64,
    pub losses: f64,
    pub lmp: f64,
}

impl HourlyPrice {
    /// Builds a price, reconstructing the LMP from its components when the
    /// source did not report one.
    pub fn from_components(
        date: NaiveDate,
        hour_ending: HourEnding,
        energy: f64,
        congestion: f64,
        losses: f64,
        lmp: Option<f64>,
    ) -> Self {
        Self {
            date,
            hour_ending,
            energy,
            congestion,
            losses,
            lmp: lmp.unwrap_or(energy + congestion + losses),
        }
    }

    pub fn hour_beginning(&self) -> usize {
        self.hour_ending.hour_beginning()
    }

    /// Naive timestamp at the start of the interval.
    pub fn interval_start(&self) -> NaiveDateTime {
        self.date.and_time(chrono::NaiveTime::MIN) + Duration::hours(self.hour_beginning() as i64)
    }
}

/// An hour that passed the restriction mask, with the MW cap that applies to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeableHour {
    #[serde(flatten)]
    pub price: HourlyPrice,
    pub cap_mw: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HourDispatch {
    pub hour_ending: HourEnding,
    pub mw: f64,
    pub lmp: f64,
}

/// Net daily arbitrage result in dollars, before weekly normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    pub total_revenue: f64,
    pub energy_revenue: f64,
    pub congestion_revenue: f64,
    pub losses_revenue: f64,
    pub charges: Vec<HourDispatch>,
    pub discharges: Vec<HourDispatch>,
}

impl DispatchResult {
    pub fn charged_mw(&self) -> f64 {
        self.charges.iter().map(|c| c.mw).sum()
    }

    pub fn discharged_mw(&self) -> f64 {
        self.discharges.iter().map(|d| d.mw).sum()
    }
}

/// The single driver with the largest absolute average impact over a set of hours.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributionRecord {
    pub driver_name: String,
    pub average_impact: f64,
}

impl AttributionRecord {
    pub fn sentinel(name: &str) -> Self {
        Self {
            driver_name: name.to_string(),
            average_impact: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginalUnitRecord {
    pub date: NaiveDate,
    pub hour_ending: HourEnding,
    pub unit_id: String,
    pub unit_name: String,
    pub unit_type: String,
    pub is_marginal: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingConstraintRecord {
    pub date: NaiveDate,
    pub hour_ending: HourEnding,
    pub constraint_id: String,
    pub congestion_value: f64,
}

/// Inclusive calendar-day window, normally seven days long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WeekWindow {
    pub fn new(start: NaiveDate) -> Self {
        Self {
            start,
            end: start + Duration::days(6),
        }
    }

    pub fn try_new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(Tb26Error::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn previous_week(&self) -> Self {
        self.shifted(Duration::days(-7))
    }

    /// 52 weeks back, so weekdays stay aligned with this window.
    pub fn same_week_last_year(&self) -> Self {
        self.shifted(Duration::days(-364))
    }

    fn shifted(&self, by: Duration) -> Self {
        Self {
            start: self.start + by,
            end: self.end + by,
        }
    }
}

/// Why a day contributed nothing to a weekly figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SkipReason {
    IncompleteDay { records: usize },
    InsufficientChargeableHours { eligible: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::IncompleteDay { records } => {
                write!(f, "incomplete day ({records} of 24 hourly records)")
            }
            SkipReason::InsufficientChargeableHours { eligible } => {
                write!(f, "only {eligible} restriction-eligible hours")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedDay {
    pub date: NaiveDate,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyFinancial {
    pub date: NaiveDate,
    pub total_revenue: f64,
    pub energy_revenue: f64,
    pub congestion_revenue: f64,
    #[serde(rename = "totalTB26")]
    pub total_tb26: f64,
    pub dispatch: DispatchResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyFinancialSummary {
    #[serde(rename = "totalTB26")]
    pub total_tb26: f64,
    #[serde(rename = "energyTB26")]
    pub energy_tb26: f64,
    #[serde(rename = "congestionTB26")]
    pub congestion_tb26: f64,
    pub days_used: usize,
    pub daily_breakdown: Vec<DailyFinancial>,
}

impl WeeklyFinancialSummary {
    pub fn empty() -> Self {
        Self {
            total_tb26: 0.0,
            energy_tb26: 0.0,
            congestion_tb26: 0.0,
            days_used: 0,
            daily_breakdown: vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyMecAttribution {
    pub date: NaiveDate,
    #[serde(rename = "topHours")]
    pub top_hours: Vec<HourEnding>,
    #[serde(rename = "bottomHours")]
    pub bottom_hours: Vec<HourEnding>,
    #[serde(rename = "topHoursMEC")]
    pub top_hours_mec: f64,
    #[serde(rename = "bottomHoursMEC")]
    pub bottom_hours_mec: f64,
    #[serde(rename = "topHoursUnitType")]
    pub top_hours_unit_type: String,
    #[serde(rename = "bottomHoursUnitType")]
    pub bottom_hours_unit_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HourSetAttribution {
    pub hours: Vec<HourEnding>,
    pub constraint_name: String,
    pub avg_congestion: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCongestionAttribution {
    pub date: NaiveDate,
    pub top_hours: HourSetAttribution,
    pub bottom_hours: HourSetAttribution,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyReport {
    pub window: WeekWindow,
    pub restriction_month: u32,
    pub financial: WeeklyFinancialSummary,
    pub marginal_units: Vec<DailyMecAttribution>,
    pub congestion: Vec<DailyCongestionAttribution>,
    pub skipped_days: Vec<SkippedDay>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowComparison {
    pub this_week: WeeklyReport,
    pub last_week: WeeklyReport,
    pub last_year: WeeklyReport,
}
