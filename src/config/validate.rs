//! Configuration validation.

use crate::config::Config;
use crate::constants::confidence;
use crate::error::{Error, Result};

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_defaults(config)?;
    validate_http(config)?;
    validate_location(config)?;
    validate_remote(config)?;
    Ok(())
}

fn invalid(message: impl Into<String>) -> Error {
    Error::ConfigValidation {
        message: message.into(),
    }
}

fn validate_defaults(config: &Config) -> Result<()> {
    let defaults = &config.defaults;

    if !(confidence::MIN..=confidence::MAX).contains(&defaults.min_confidence) {
        return Err(invalid(format!(
            "min_confidence must be between {} and {}, got {}",
            confidence::MIN,
            confidence::MAX,
            defaults.min_confidence
        )));
    }

    if defaults.top_n == 0 {
        return Err(invalid("top_n must be at least 1"));
    }

    if config.data.table.trim().is_empty() {
        return Err(invalid("data.table must not be empty"));
    }

    Ok(())
}

fn validate_http(config: &Config) -> Result<()> {
    let http = &config.http;
    for (name, value) in [
        ("summary_timeout_secs", http.summary_timeout_secs),
        ("weather_timeout_secs", http.weather_timeout_secs),
        ("content_read_timeout_secs", http.content_read_timeout_secs),
        ("content_write_timeout_secs", http.content_write_timeout_secs),
    ] {
        if value == 0 {
            return Err(invalid(format!("http.{name} must be greater than 0")));
        }
    }
    Ok(())
}

fn validate_location(config: &Config) -> Result<()> {
    config.location.timezone.parse::<chrono_tz::Tz>().map_err(|_| Error::InvalidTimezone {
        value: config.location.timezone.clone(),
    })?;
    Ok(())
}

fn validate_remote(config: &Config) -> Result<()> {
    if let Some(repository) = &config.remote.repository {
        let mut parts = repository.split('/');
        let valid = matches!(
            (parts.next(), parts.next(), parts.next()),
            (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty()
        );
        if !valid {
            return Err(invalid(format!(
                "remote.repository must look like 'owner/name', got '{repository}'"
            )));
        }
    }
    if config.remote.path.trim().is_empty() {
        return Err(invalid("remote.path must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_confidence_out_of_range() {
        let mut config = Config::default();
        config.defaults.min_confidence = 1.5;
        assert!(matches!(
            validate_config(&config),
            Err(Error::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_zero_top_n() {
        let mut config = Config::default();
        config.defaults.top_n = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_timeout() {
        let mut config = Config::default();
        config.http.weather_timeout_secs = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("weather_timeout_secs"));
    }

    #[test]
    fn test_bad_timezone() {
        let mut config = Config::default();
        config.location.timezone = "Mars/Olympus".to_string();
        assert!(matches!(
            validate_config(&config),
            Err(Error::InvalidTimezone { .. })
        ));
    }

    #[test]
    fn test_repository_format() {
        let mut config = Config::default();
        config.remote.repository = Some("owner/name".to_string());
        assert!(validate_config(&config).is_ok());

        for bad in ["owner", "owner/", "/name", "a/b/c"] {
            config.remote.repository = Some(bad.to_string());
            assert!(validate_config(&config).is_err(), "{bad} should be rejected");
        }
    }
}
