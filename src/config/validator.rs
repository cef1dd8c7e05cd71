use crate::config::{parse_duration, Config, SCHEMA_VERSION};
use crate::error::{Result, TelescopeError, ValidationError};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration, reporting every problem at once
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_channel(config, &mut errors);
        Self::validate_lookup(config, &mut errors);
        Self::validate_overlay(config, &mut errors);
        Self::validate_logging(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(TelescopeError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != SCHEMA_VERSION {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_channel(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.channel.capacity == 0 {
            errors.push(ValidationError::new(
                "channel.capacity",
                "Channel capacity must be greater than 0",
            ));
        }
    }

    fn validate_lookup(config: &Config, errors: &mut Vec<ValidationError>) {
        let delay = &config.lookup.event_delay;
        if parse_duration(delay).is_none() {
            errors.push(ValidationError::new(
                "lookup.event_delay",
                format!("Invalid duration format: {}", delay),
            ));
        }
    }

    fn validate_overlay(config: &Config, errors: &mut Vec<ValidationError>) {
        let overlay = &config.overlay;

        if overlay.label.trim().is_empty() {
            errors.push(ValidationError::new(
                "overlay.label",
                "Overlay label cannot be empty",
            ));
        }

        if overlay.min_width == 0 || overlay.min_height == 0 {
            errors.push(ValidationError::new(
                "overlay.min_width",
                "Minimum overlay size must be greater than 0",
            ));
        }

        if overlay.width < overlay.min_width {
            errors.push(ValidationError::new(
                "overlay.width",
                format!(
                    "Width {} is below the minimum width {}",
                    overlay.width, overlay.min_width
                ),
            ));
        }

        if overlay.height < overlay.min_height {
            errors.push(ValidationError::new(
                "overlay.height",
                format!(
                    "Height {} is below the minimum height {}",
                    overlay.height, overlay.min_height
                ),
            ));
        }
    }

    fn validate_logging(config: &Config, errors: &mut Vec<ValidationError>) {
        let level = config.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            errors.push(ValidationError::new(
                "logging.level",
                format!(
                    "Level must be one of {:?}, got '{}'",
                    LOG_LEVELS, config.logging.level
                ),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let config = Config::default();
        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = Config::default();
        config.channel.capacity = 0;
        config.lookup.event_delay = "soon".to_string();
        config.overlay.width = 100;

        match ConfigValidator::validate(&config) {
            Err(TelescopeError::ConfigValidation { errors }) => {
                let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
                assert_eq!(
                    paths,
                    vec!["channel.capacity", "lookup.event_delay", "overlay.width"]
                );
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(ConfigValidator::validate(&config).is_err());
    }
}
