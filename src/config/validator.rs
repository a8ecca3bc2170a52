use crate::config::Config;
use crate::error::{Result, SiftError, ValidationError};
use scraper::Selector;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        // Selectors must be valid CSS
        Self::validate_selectors(config, &mut errors);

        // Validate logging settings
        Self::validate_logging(config, &mut errors);

        // Validate timing settings
        Self::validate_performance(config, &mut errors);
        Self::validate_auto_refresh(config, &mut errors);
        Self::validate_navigation(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SiftError::ConfigValidation { errors })
        }
    }

    fn validate_selectors(config: &Config, errors: &mut Vec<ValidationError>) {
        let selectors = [
            ("selectors.job_tile_list", &config.selectors.job_tile_list),
            ("selectors.client_spending", &config.selectors.client_spending),
            ("selectors.proposals", &config.selectors.proposals),
        ];

        for (path, selector) in selectors {
            if selector.trim().is_empty() {
                errors.push(ValidationError::new(path, "Selector cannot be empty"));
            } else if let Err(e) = Selector::parse(selector) {
                errors.push(ValidationError::new(
                    path,
                    format!("Invalid selector '{}': {:?}", selector, e),
                ));
            }
        }
    }

    fn validate_logging(config: &Config, errors: &mut Vec<ValidationError>) {
        let level = &config.logging.level;
        let valid_levels = ["debug", "info", "warn", "error"];
        if !valid_levels.contains(&level.as_str()) {
            errors.push(ValidationError::new(
                "logging.level",
                format!("Level must be one of {:?}, got '{}'", valid_levels, level),
            ));
        }
    }

    fn validate_performance(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.performance.debounce_delay_ms == 0 {
            errors.push(ValidationError::new(
                "performance.debounce_delay_ms",
                "Debounce delay must be greater than 0",
            ));
        }

        if config.performance.max_processing_time_ms == 0 {
            errors.push(ValidationError::new(
                "performance.max_processing_time_ms",
                "Processing time budget must be greater than 0",
            ));
        }
    }

    fn validate_auto_refresh(config: &Config, errors: &mut Vec<ValidationError>) {
        // Range clamping belongs to the settings editor; only reject a zero interval
        if config.auto_refresh.refresh_interval_ms == 0 {
            errors.push(ValidationError::new(
                "auto_refresh.refresh_interval_ms",
                "Refresh interval must be greater than 0",
            ));
        }
    }

    fn validate_navigation(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.navigation.listing_path.is_empty() {
            errors.push(ValidationError::new(
                "navigation.listing_path",
                "Listing path cannot be empty",
            ));
        }

        if config.navigation.notify_delay_ms == 0 {
            errors.push(ValidationError::new(
                "navigation.notify_delay_ms",
                "Notify delay must be greater than 0",
            ));
        }
    }
}
