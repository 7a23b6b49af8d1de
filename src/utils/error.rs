use thiserror::Error;

#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Parser endpoint returned {status} for {url}")]
    ParserStatusError { url: String, status: u16 },

    #[error("No parser registered for {data_type} in zone {zone}")]
    UnknownParser { data_type: String, zone: String },

    #[error("Parser output lacks `datetime` key for at least some of the output. Full output: {output}")]
    MissingDatetime { output: String },

    #[error("Invalid datetime '{value}': {reason}")]
    InvalidDatetime { value: String, reason: String },

    #[error("InfluxDB write failed with status {status}: {body}")]
    InfluxError { status: u16, body: String },

    #[error("Configuration validation error in field '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for field '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Data,
    Storage,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl CollectorError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CollectorError::ApiError(_) | CollectorError::ParserStatusError { .. } => {
                ErrorCategory::Network
            }
            CollectorError::ConfigValidationError { .. }
            | CollectorError::InvalidConfigValueError { .. }
            | CollectorError::UnknownParser { .. } => ErrorCategory::Configuration,
            CollectorError::SerializationError(_)
            | CollectorError::MissingDatetime { .. }
            | CollectorError::InvalidDatetime { .. }
            | CollectorError::ProcessingError { .. } => ErrorCategory::Data,
            CollectorError::InfluxError { .. } => ErrorCategory::Storage,
            CollectorError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // a later tick usually succeeds
            ErrorCategory::Network | ErrorCategory::Storage => ErrorSeverity::Medium,
            ErrorCategory::Data | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.severity() == ErrorSeverity::Medium
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            CollectorError::ApiError(_) | CollectorError::ParserStatusError { .. } => {
                "Check that the parser endpoint is reachable and the zone is supported"
            }
            CollectorError::UnknownParser { .. } => {
                "Add a job for this zone and data type to the configuration file"
            }
            CollectorError::MissingDatetime { .. } | CollectorError::InvalidDatetime { .. } => {
                "Parsers must return an RFC 3339 `datetime` for every record"
            }
            CollectorError::InfluxError { .. } => {
                "Check that InfluxDB is running and the database exists"
            }
            CollectorError::ConfigValidationError { .. }
            | CollectorError::InvalidConfigValueError { .. } => {
                "Fix the configuration file and run again"
            }
            CollectorError::SerializationError(_) | CollectorError::ProcessingError { .. } => {
                "Inspect the parser output with --verbose"
            }
            CollectorError::IoError(_) => "Check file permissions and available disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not fetch data: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Data => format!("Parser returned unusable data: {}", self),
            ErrorCategory::Storage => format!("Could not store data: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, CollectorError>;
