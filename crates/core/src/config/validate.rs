use chrono_tz::Tz;

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Zendesk credentials are non-empty when the section is present
/// - Zendesk request timeout is at least 1 second
/// - Aggregation time zone is a known IANA name
/// - Concurrency limits, page cap and aggregation timeout are at least 1
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if let Some(zendesk) = &config.zendesk {
        for (name, value) in [
            ("zendesk.subdomain", &zendesk.subdomain),
            ("zendesk.email", &zendesk.email),
            ("zendesk.api_token", &zendesk.api_token),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "{} cannot be empty",
                    name
                )));
            }
        }

        if zendesk.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "zendesk.timeout_secs must be at least 1".to_string(),
            ));
        }
    }

    let aggregation = &config.aggregation;
    aggregation.time_zone.parse::<Tz>().map_err(|_| {
        ConfigError::ValidationError(format!(
            "aggregation.time_zone '{}' is not a known time zone",
            aggregation.time_zone
        ))
    })?;

    if aggregation.max_parallel_searches == 0 {
        return Err(ConfigError::ValidationError(
            "aggregation.max_parallel_searches must be at least 1".to_string(),
        ));
    }
    if aggregation.max_parallel_lookups == 0 {
        return Err(ConfigError::ValidationError(
            "aggregation.max_parallel_lookups must be at least 1".to_string(),
        ));
    }
    if aggregation.max_pages_per_office == 0 {
        return Err(ConfigError::ValidationError(
            "aggregation.max_pages_per_office must be at least 1".to_string(),
        ));
    }
    if aggregation.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "aggregation.timeout_secs must be at least 1".to_string(),
        ));
    }

    Ok(())
}
