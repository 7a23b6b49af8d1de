use crate::utils::error::{CollectorError, Result};
use std::path::Path;

pub const DEFAULT_ENV_FILE: &str = "secrets.env";

fn env_file_error(path: &Path, e: dotenvy::Error) -> CollectorError {
    CollectorError::ConfigValidationError {
        field: path.display().to_string(),
        message: format!("Could not read env file: {}", e),
    }
}

/// Load `KEY=VALUE` lines into the process environment without overriding
/// variables that are already set. A missing file is not an error; returns
/// how many variables were set.
pub fn load_env_file<P: AsRef<Path>>(path: P) -> Result<usize> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::debug!("No env file at {}", path.display());
        return Ok(0);
    }

    let mut loaded = 0;
    for item in dotenvy::from_path_iter(path).map_err(|e| env_file_error(path, e))? {
        let (key, value) = item.map_err(|e| env_file_error(path, e))?;
        if std::env::var_os(&key).is_none() {
            std::env::set_var(&key, value);
            loaded += 1;
        }
    }

    tracing::debug!("Loaded {} variables from {}", loaded, path.display());
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_env_file_keeps_existing_values() {
        std::env::set_var("ENERGY_INFLUX_TEST_KEEP", "from-process");
        std::env::remove_var("ENERGY_INFLUX_TEST_NEW");
        std::env::remove_var("ENERGY_INFLUX_TEST_QUOTED");

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# InfluxDB credentials").unwrap();
        writeln!(file, "ENERGY_INFLUX_TEST_KEEP=from-file").unwrap();
        writeln!(file, "ENERGY_INFLUX_TEST_NEW=fresh").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "export ENERGY_INFLUX_TEST_QUOTED=\"p@ss=word\"").unwrap();

        let loaded = load_env_file(file.path()).unwrap();

        assert_eq!(loaded, 2);
        assert_eq!(
            std::env::var("ENERGY_INFLUX_TEST_KEEP").unwrap(),
            "from-process"
        );
        assert_eq!(std::env::var("ENERGY_INFLUX_TEST_NEW").unwrap(), "fresh");
        assert_eq!(
            std::env::var("ENERGY_INFLUX_TEST_QUOTED").unwrap(),
            "p@ss=word"
        );

        std::env::remove_var("ENERGY_INFLUX_TEST_KEEP");
        std::env::remove_var("ENERGY_INFLUX_TEST_NEW");
        std::env::remove_var("ENERGY_INFLUX_TEST_QUOTED");
    }

    #[test]
    fn test_malformed_env_file_is_a_config_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "ENERGY_INFLUX_TEST_BROKEN=\"unterminated").unwrap();

        let err = load_env_file(file.path()).unwrap_err();
        assert!(matches!(err, CollectorError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_missing_env_file_is_fine() {
        assert_eq!(load_env_file("/nonexistent/secrets.env").unwrap(), 0);
    }
}
