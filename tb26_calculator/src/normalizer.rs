use crate::error::{Result, Tb26Error};
use crate::models::{HourEnding, HourlyPrice, WeekWindow, HOURS_PER_DAY};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::collections::BTreeMap;
use std::str::FromStr;

/// One calendar day of values keyed by hour-beginning timestamp.
pub type HourlySeries = BTreeMap<NaiveDateTime, f64>;

pub fn hour_ending_to_beginning(timestamp: NaiveDateTime) -> NaiveDateTime {
    timestamp - Duration::hours(1)
}

pub fn truncate_to_hour(timestamp: NaiveDateTime) -> NaiveDateTime {
    timestamp
        .date()
        .and_time(NaiveTime::MIN)
        + Duration::hours(i64::from(timestamp.hour()))
}

pub fn day_hours(day: NaiveDate) -> impl Iterator<Item = NaiveDateTime> {
    let midnight = day.and_time(NaiveTime::MIN);
    (0..HOURS_PER_DAY as i64).map(move |h| midnight + Duration::hours(h))
}

/// Hour-ending stamped values, summed per hour when several sources report
/// the same hour.
pub fn from_hour_ending<I>(points: I, day: NaiveDate) -> HourlySeries
where
    I: IntoIterator<Item = (NaiveDateTime, f64)>,
{
    let mut series = HourlySeries::new();
    for (timestamp, value) in points {
        let hour = hour_ending_to_beginning(timestamp);
        if hour.date() == day {
            *series.entry(hour).or_insert(0.0) += value;
        }
    }
    series
}

/// Sub-hourly values stamped by interval start, averaged over the intervals
/// actually observed in each hour.
pub fn from_sub_hourly<I>(points: I, day: NaiveDate) -> HourlySeries
where
    I: IntoIterator<Item = (NaiveDateTime, f64)>,
{
    let mut buckets: BTreeMap<NaiveDateTime, (f64, usize)> = BTreeMap::new();
    for (timestamp, value) in points {
        let hour = truncate_to_hour(timestamp);
        if hour.date() == day {
            let bucket = buckets.entry(hour).or_insert((0.0, 0));
            bucket.0 += value;
            bucket.1 += 1;
        }
    }
    buckets
        .into_iter()
        .map(|(hour, (sum, count))| (hour, sum / count as f64))
        .collect()
}

/// Adds already-normalized series hour by hour.
pub fn sum_sources(sources: &[HourlySeries]) -> HourlySeries {
    let mut total = HourlySeries::new();
    for source in sources {
        for (hour, value) in source {
            *total.entry(*hour).or_insert(0.0) += value;
        }
    }
    total
}

/// Fills every hour of the day, treating missing hours as zero.
pub fn zero_filled(series: &HourlySeries, day: NaiveDate) -> HourlySeries {
    day_hours(day)
        .map(|hour| (hour, series.get(&hour).copied().unwrap_or(0.0)))
        .collect()
}

/// Anything that can supply hourly prices for a window.
pub trait HourlyPriceSource {
    fn hourly_prices(&self, window: &WeekWindow) -> Vec<HourlyPrice>;
}

impl HourlyPriceSource for [HourlyPrice] {
    fn hourly_prices(&self, window: &WeekWindow) -> Vec<HourlyPrice> {
        self.iter()
            .filter(|p| window.contains(p.date))
            .cloned()
            .collect()
    }
}

impl HourlyPriceSource for Vec<HourlyPrice> {
    fn hourly_prices(&self, window: &WeekWindow) -> Vec<HourlyPrice> {
        self.as_slice().hourly_prices(window)
    }
}

/// Hourly price components exported column by column from the simulation
/// results store. Rows are already hour-ending labelled.
#[derive(Debug, Clone, Default)]
pub struct SimulationResults {
    pub dates: Vec<NaiveDate>,
    pub hour_endings: Vec<HourEnding>,
    pub energy: Vec<f64>,
    pub congestion: Vec<f64>,
    pub losses: Vec<f64>,
    pub lmp: Vec<Option<f64>>,
}

impl SimulationResults {
    pub fn push(
        &mut self,
        date: NaiveDate,
        hour_ending: HourEnding,
        energy: f64,
        congestion: f64,
        losses: f64,
        lmp: Option<f64>,
    ) {
        self.dates.push(date);
        self.hour_endings.push(hour_ending);
        self.energy.push(energy);
        self.congestion.push(congestion);
        self.losses.push(losses);
        self.lmp.push(lmp);
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

impl HourlyPriceSource for SimulationResults {
    fn hourly_prices(&self, window: &WeekWindow) -> Vec<HourlyPrice> {
        (0..self.len())
            .filter(|&idx| window.contains(self.dates[idx]))
            .map(|idx| {
                HourlyPrice::from_components(
                    self.dates[idx],
                    self.hour_endings[idx],
                    self.energy[idx],
                    self.congestion[idx],
                    self.losses[idx],
                    self.lmp[idx],
                )
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PriceAttribute {
    Energy,
    Congestion,
    Losses,
    Lmp,
}

impl FromStr for PriceAttribute {
    type Err = Tb26Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "energy" | "mec" | "energy_component" => Ok(Self::Energy),
            "congestion" | "mcc" | "congestion_component" => Ok(Self::Congestion),
            "losses" | "loss" | "mlc" | "loss_component" => Ok(Self::Losses),
            "lmp" | "price" => Ok(Self::Lmp),
            other => Err(Tb26Error::MalformedRow {
                feed: "fundamentals",
                row: 0,
                message: format!("unknown price attribute \"{other}\""),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampConvention {
    /// Hourly values stamped at the end of their hour.
    #[default]
    HourEnding,
    /// Sub-hourly values stamped at the start of their interval.
    IntervalBeginning,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FundamentalsRow {
    pub timestamp: NaiveDateTime,
    pub attribute: PriceAttribute,
    pub value: f64,
}

/// Historical actuals delivered as flat attribute-tagged rows.
///
/// An hour is emitted when the feed has an LMP for it or all three
/// components; components absent next to a reported LMP count as zero.
#[derive(Debug, Clone, Default)]
pub struct FundamentalsFeed {
    pub rows: Vec<FundamentalsRow>,
    pub convention: TimestampConvention,
}

impl FundamentalsFeed {
    pub fn new(rows: Vec<FundamentalsRow>, convention: TimestampConvention) -> Self {
        Self { rows, convention }
    }

    fn attribute_series(&self, attribute: PriceAttribute, day: NaiveDate) -> HourlySeries {
        let points = self
            .rows
            .iter()
            .filter(|row| row.attribute == attribute)
            .map(|row| (row.timestamp, row.value));
        match self.convention {
            TimestampConvention::HourEnding => from_hour_ending(points, day),
            TimestampConvention::IntervalBeginning => from_sub_hourly(points, day),
        }
    }

    fn day_prices(&self, day: NaiveDate) -> Vec<HourlyPrice> {
        let energy = self.attribute_series(PriceAttribute::Energy, day);
        let congestion = self.attribute_series(PriceAttribute::Congestion, day);
        let losses = self.attribute_series(PriceAttribute::Losses, day);
        let lmp = self.attribute_series(PriceAttribute::Lmp, day);

        day_hours(day)
            .enumerate()
            .filter_map(|(hour_beginning, hour)| {
                let components = (energy.get(&hour), congestion.get(&hour), losses.get(&hour));
                let reported_lmp = lmp.get(&hour).copied();
                let complete = matches!(components, (Some(_), Some(_), Some(_)));
                if reported_lmp.is_none() && !complete {
                    return None;
                }
                let hour_ending = HourEnding::from_hour_beginning(hour_beginning as u32).ok()?;
                Some(HourlyPrice::from_components(
                    day,
                    hour_ending,
                    components.0.copied().unwrap_or(0.0),
                    components.1.copied().unwrap_or(0.0),
                    components.2.copied().unwrap_or(0.0),
                    reported_lmp,
                ))
            })
            .collect()
    }
}

impl HourlyPriceSource for FundamentalsFeed {
    fn hourly_prices(&self, window: &WeekWindow) -> Vec<HourlyPrice> {
        window.days().flat_map(|day| self.day_prices(day)).collect()
    }
}
