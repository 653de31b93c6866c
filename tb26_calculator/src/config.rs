use crate::error::{Result, Tb26Error};
use crate::models::HOURS_PER_DAY;
use crate::restriction::{RestrictionCalendar, RestrictionProfile};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Battery and normalization parameters for the TB2.6 heuristic.
///
/// Defaults reproduce the historical report constants and must stay
/// unchanged for figures to remain comparable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Tb26Config {
    /// Cumulative charging volume bought per day (MW).
    pub buy_budget_mw: f64,
    pub round_trip_efficiency: f64,
    /// Discharge per top-priced hour (MW); the last hour takes the remainder.
    pub discharge_block_mw: f64,
    /// Rating used to express weekly dollars per kW.
    pub normalization_mw: f64,
    pub days_per_month: f64,
}

impl Default for Tb26Config {
    fn default() -> Self {
        Self {
            buy_budget_mw: 160.0,
            round_trip_efficiency: 0.86,
            discharge_block_mw: 60.0,
            normalization_mw: 60.0,
            days_per_month: 30.25,
        }
    }
}

impl Tb26Config {
    /// Energy left for discharge after round-trip losses.
    pub fn available_energy_mwh(&self) -> f64 {
        self.buy_budget_mw * self.round_trip_efficiency
    }

    /// Converts an average daily net revenue in dollars into $/kW-month.
    pub fn to_kw_month(&self, daily_net: f64) -> f64 {
        daily_net / (self.normalization_mw * 1000.0) * self.days_per_month
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("battery.buy_budget_mw", self.buy_budget_mw),
            ("battery.discharge_block_mw", self.discharge_block_mw),
            ("battery.normalization_mw", self.normalization_mw),
            ("battery.days_per_month", self.days_per_month),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(config_error(field, format!("must be positive, got {value}")));
            }
        }
        if !(self.round_trip_efficiency > 0.0 && self.round_trip_efficiency <= 1.0) {
            return Err(config_error(
                "battery.round_trip_efficiency",
                format!("must be in (0, 1], got {}", self.round_trip_efficiency),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RestrictionOverride {
    /// Twelve month profiles (January first) of 24 hour-beginning caps.
    pub profiles: Vec<Vec<f64>>,
}

/// Engine configuration as read from a TOML file.
///
/// ```toml
/// [battery]
/// round_trip_efficiency = 0.85
///
/// [restrictions]
/// profiles = [[100.0, 100.0, ...], ...]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub battery: Tb26Config,
    #[serde(default)]
    pub restrictions: Option<RestrictionOverride>,
}

impl EngineConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            config_error("config", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| config_error("toml", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.battery.validate()?;
        if let Some(restrictions) = &self.restrictions {
            if restrictions.profiles.len() != 12 {
                return Err(config_error(
                    "restrictions.profiles",
                    format!("expected 12 month profiles, got {}", restrictions.profiles.len()),
                ));
            }
            for (idx, profile) in restrictions.profiles.iter().enumerate() {
                if profile.len() != HOURS_PER_DAY {
                    return Err(config_error(
                        "restrictions.profiles",
                        format!("month {} has {} caps, expected 24", idx + 1, profile.len()),
                    ));
                }
                if profile.iter().any(|cap| !cap.is_finite() || *cap < 0.0) {
                    return Err(config_error(
                        "restrictions.profiles",
                        format!("month {} has a negative or non-finite cap", idx + 1),
                    ));
                }
            }
        }
        Ok(())
    }

    /// The configured calendar, or the built-in reference calendar.
    pub fn restriction_calendar(&self) -> RestrictionCalendar {
        match &self.restrictions {
            Some(restrictions) => RestrictionCalendar::from_profiles(
                restrictions
                    .profiles
                    .iter()
                    .filter_map(|caps| RestrictionProfile::try_from(caps.as_slice()).ok())
                    .collect(),
            ),
            None => RestrictionCalendar::reference(),
        }
    }
}

fn config_error(field: &str, message: String) -> Tb26Error {
    Tb26Error::Config {
        field: field.to_string(),
        message,
    }
}
