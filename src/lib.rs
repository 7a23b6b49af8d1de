pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod launcher;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{HttpZoneParser, InfluxClient, SystemClock};
pub use config::toml_config::CollectorConfig;
pub use core::{collector::Collector, registry::ParserRegistry, scheduler::Scheduler};
pub use domain::model::{DataType, FetchRequest, ZoneKey};
pub use launcher::{LaunchOutcome, Launcher, LauncherConfig};
pub use utils::error::{CollectorError, Result};
