pub mod env_file;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;

#[cfg(feature = "cli")]
mod cli {
    use crate::config::env_file::DEFAULT_ENV_FILE;
    use crate::config::toml_config::DEFAULT_CONFIG_FILE;
    use crate::domain::model::{DataType, FetchRequest, ZoneKey};
    use crate::utils::error::{CollectorError, Result};
    use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
    use clap::Parser;

    #[derive(Debug, Clone, Parser)]
    #[command(name = "energy-influx")]
    #[command(about = "Collect grid data from zone parsers into InfluxDB on a schedule")]
    pub struct CliConfig {
        /// Path to TOML configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        pub config: String,

        /// Env file loaded before the configuration is read
        #[arg(long, default_value = DEFAULT_ENV_FILE)]
        pub env_file: String,

        /// Print full parser output and timing for every fetch
        #[arg(short, long)]
        pub verbose: bool,

        /// Log as JSON lines
        #[arg(long)]
        pub log_json: bool,

        /// Run every job once and exit
        #[arg(long)]
        pub once: bool,

        /// Show the schedule without fetching anything
        #[arg(long)]
        pub dry_run: bool,

        /// One-off fetch: zone key, e.g. AT or AT->CH
        #[arg(long, requires = "data_type")]
        pub zone: Option<String>,

        /// One-off fetch: data type, e.g. production or exchangeForecast
        #[arg(long, requires = "zone")]
        pub data_type: Option<String>,

        /// One-off fetch: past datetime, RFC 3339 or "YYYY-MM-DD HH:MM" (UTC)
        #[arg(long, requires = "zone")]
        pub target_datetime: Option<String>,
    }

    impl CliConfig {
        /// The request for `--zone/--data-type`, if given.
        pub fn one_off_request(&self) -> Result<Option<FetchRequest>> {
            let (Some(zone), Some(data_type)) = (&self.zone, &self.data_type) else {
                return Ok(None);
            };

            let target_datetime = self
                .target_datetime
                .as_deref()
                .map(parse_target_datetime)
                .transpose()?;

            Ok(Some(FetchRequest {
                zone: ZoneKey::new(zone.clone()),
                data_type: data_type.parse::<DataType>()?,
                target_datetime,
            }))
        }
    }

    /// Accepts RFC 3339, `YYYY-MM-DD HH:MM[:SS]` or a bare date, naive values as UTC.
    pub fn parse_target_datetime(value: &str) -> Result<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Ok(dt.with_timezone(&Utc));
        }
        for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
                return Ok(naive.and_utc());
            }
        }
        if let Some(naive) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
        {
            return Ok(naive.and_utc());
        }

        Err(CollectorError::InvalidConfigValueError {
            field: "target_datetime".to_string(),
            value: value.to_string(),
            reason: "Expected RFC 3339 or 'YYYY-MM-DD HH:MM'".to_string(),
        })
    }

}
