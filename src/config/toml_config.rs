use crate::adapters::{HttpZoneParser, InfluxClient};
use crate::core::registry::ParserRegistry;
use crate::domain::model::{DataType, FetchRequest, JobSpec, ZoneKey};
use crate::utils::error::{CollectorError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "energy-influx.toml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectorConfig {
    #[serde(default)]
    pub influx: InfluxConfig,
    #[serde(default)]
    pub parsers: ParsersConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub jobs: Vec<JobConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InfluxConfig {
    pub url: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_seconds: Option<u64>,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8086".to_string(),
            database: "influx".to_string(),
            username: None,
            password: None,
            timeout_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParsersConfig {
    pub endpoint: String,
    pub timeout_seconds: Option<u64>,
}

impl Default for ParsersConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000/parsers".to_string(),
            timeout_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScheduleConfig {
    pub cancel_on_failure: Option<bool>,
    pub tick_seconds: Option<u64>,
    /// e.g. "2h"; newer data than this counts as fresh.
    pub max_lag: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobConfig {
    pub zone: String,
    pub data_type: DataType,
    /// e.g. "15m", "12h".
    pub every: String,
}

impl JobConfig {
    pub fn new(zone: &str, data_type: DataType, every: &str) -> Self {
        Self {
            zone: zone.to_string(),
            data_type,
            every: every.to_string(),
        }
    }

    pub fn to_spec(&self) -> Result<JobSpec> {
        Ok(JobSpec {
            request: FetchRequest::latest(ZoneKey::new(self.zone.clone()), self.data_type),
            every: parse_interval(&self.every)?,
        })
    }
}

/// Parse `30s`, `15m`, `12h` or `1d`.
pub fn parse_interval(value: &str) -> Result<Duration> {
    let re = Regex::new(r"^\s*(\d+)\s*([smhd])\s*$").map_err(|e| {
        CollectorError::ConfigValidationError {
            field: "interval".to_string(),
            message: e.to_string(),
        }
    })?;

    let invalid = |reason: &str| CollectorError::InvalidConfigValueError {
        field: "every".to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let caps = re
        .captures(value)
        .ok_or_else(|| invalid("Expected a number followed by s, m, h or d"))?;
    let amount: u64 = caps[1].parse().map_err(|_| invalid("Number is too large"))?;
    let unit_seconds = match &caps[2] {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        _ => 86_400,
    };

    amount
        .checked_mul(unit_seconds)
        .map(Duration::from_secs)
        .ok_or_else(|| invalid("Interval is too large"))
}

/// Placeholders that survived substitution mean the variable was never set.
fn resolved(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .filter(|v| !v.is_empty() && !(v.starts_with("${") && v.ends_with('}')))
        .cloned()
}

impl Default for CollectorConfig {
    /// The production schedule for Austria and its neighbours.
    fn default() -> Self {
        let mut jobs = vec![
            JobConfig::new("AT", DataType::Production, "12h"),
            JobConfig::new("AT", DataType::GenerationForecast, "12h"),
            JobConfig::new("AT", DataType::ConsumptionForecast, "12h"),
        ];

        let exchange_zones = ["AT->CH", "AT->CZ", "AT->DE", "AT->HU", "AT->IT-NO", "AT->SI"];
        for zone in exchange_zones {
            jobs.push(JobConfig::new(zone, DataType::Exchange, "12h"));
            jobs.push(JobConfig::new(zone, DataType::ExchangeForecast, "12h"));
        }

        jobs.push(JobConfig::new("AT", DataType::Price, "15m"));
        jobs.push(JobConfig::new("AT", DataType::Consumption, "15m"));

        Self {
            influx: InfluxConfig::default(),
            parsers: ParsersConfig::default(),
            schedule: ScheduleConfig::default(),
            jobs,
        }
    }
}

impl CollectorConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(CollectorError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| CollectorError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Load `path` if it exists; fall back to the built-in schedule otherwise.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            tracing::info!("Loading configuration from {}", path.display());
            Self::from_file(path)
        } else {
            tracing::info!(
                "No configuration at {}, using the built-in schedule",
                path.display()
            );
            Ok(Self::default())
        }
    }

    /// Replace `${VAR}` with the environment value; unknown names are kept.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| CollectorError::ConfigValidationError {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn job_specs(&self) -> Result<Vec<JobSpec>> {
        self.jobs.iter().map(JobConfig::to_spec).collect()
    }

    pub fn influx_timeout(&self) -> Duration {
        Duration::from_secs(self.influx.timeout_seconds.unwrap_or(10))
    }

    pub fn parser_timeout(&self) -> Duration {
        Duration::from_secs(self.parsers.timeout_seconds.unwrap_or(60))
    }

    pub fn tick(&self) -> Duration {
        Duration::from_secs(self.schedule.tick_seconds.unwrap_or(1))
    }

    pub fn cancel_on_failure(&self) -> bool {
        self.schedule.cancel_on_failure.unwrap_or(false)
    }

    pub fn max_lag(&self) -> Result<Duration> {
        match &self.schedule.max_lag {
            Some(lag) => parse_interval(lag),
            None => Ok(crate::core::collector::DEFAULT_MAX_LAG),
        }
    }

    pub fn influx_username(&self) -> Option<String> {
        resolved(&self.influx.username)
    }

    pub fn influx_password(&self) -> Option<String> {
        resolved(&self.influx.password)
    }

    /// One HTTP parser per configured (data type, zone), sharing a client.
    pub fn build_registry(&self) -> Result<ParserRegistry> {
        self.build_registry_for(&[])
    }

    /// Like `build_registry`, plus parsers for requests outside the schedule
    /// (a one-off fetch from the command line).
    pub fn build_registry_for(&self, extra: &[FetchRequest]) -> Result<ParserRegistry> {
        let client = reqwest::Client::builder()
            .timeout(self.parser_timeout())
            .build()?;

        let scheduled = self
            .jobs
            .iter()
            .map(|job| (job.data_type, ZoneKey::new(job.zone.clone())));
        let requested = extra.iter().map(|r| (r.data_type, r.zone.clone()));

        let mut registry = ParserRegistry::new();
        for (data_type, zone) in scheduled.chain(requested) {
            let parser = HttpZoneParser::with_client(client.clone(), self.parsers.endpoint.clone());
            registry.register(data_type, zone, Arc::new(parser));
        }
        Ok(registry)
    }

    pub fn build_writer(&self) -> Result<InfluxClient> {
        Ok(
            InfluxClient::new(&self.influx.url, &self.influx.database, self.influx_timeout())?
                .with_credentials(self.influx_username(), self.influx_password()),
        )
    }
}

impl Validate for CollectorConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_service_url("influx.url", &self.influx.url)?;
        validation::validate_non_empty_string("influx.database", &self.influx.database)?;
        validation::validate_service_url("parsers.endpoint", &self.parsers.endpoint)?;

        if let Some(timeout) = self.influx.timeout_seconds {
            validation::validate_positive_number("influx.timeout_seconds", timeout, 1)?;
        }
        if let Some(timeout) = self.parsers.timeout_seconds {
            validation::validate_positive_number("parsers.timeout_seconds", timeout, 1)?;
        }
        if let Some(tick) = self.schedule.tick_seconds {
            validation::validate_range("schedule.tick_seconds", tick, 1, 3600)?;
        }
        self.max_lag()?;

        if self.jobs.is_empty() {
            return Err(CollectorError::ConfigValidationError {
                field: "jobs".to_string(),
                message: "At least one job must be configured".to_string(),
            });
        }

        for (index, job) in self.jobs.iter().enumerate() {
            validation::validate_non_empty_string(&format!("jobs[{}].zone", index), &job.zone)?;
            let spec = job.to_spec()?;
            validation::validate_interval(&format!("jobs[{}].every", index), spec.every)?;

            let pair_count = job.zone.split(ZoneKey::EXCHANGE_SEPARATOR).count();
            if job.data_type.is_exchange() && pair_count != 2 {
                return Err(CollectorError::InvalidConfigValueError {
                    field: format!("jobs[{}].zone", index),
                    value: job.zone.clone(),
                    reason: "Exchange zones must look like 'AT->CH'".to_string(),
                });
            }
        }

        Ok(())
    }
}
