pub mod attribution;
pub mod calculator;
pub mod config;
pub mod constraint_catalog;
pub mod data_loader;
pub mod error;
pub mod models;
pub mod normalizer;
pub mod ranker;
pub mod restriction;
pub mod weekly;

pub use calculator::Tb26Calculator;
pub use config::{EngineConfig, Tb26Config};
pub use constraint_catalog::ConstraintCatalog;
pub use data_loader::{DataLoader, ScenarioData, ScenarioPaths};
pub use error::{Result, Tb26Error};
pub use models::{DispatchResult, HourEnding, HourlyPrice, WeekWindow, WeeklyReport, WindowComparison};
pub use normalizer::{FundamentalsFeed, HourlyPriceSource, SimulationResults};
pub use restriction::{RestrictionCalendar, RestrictionProfile};
pub use weekly::{ComparisonInputs, WeeklyAggregator, WeeklyInputs};
