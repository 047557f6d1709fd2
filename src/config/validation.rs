use crate::config::types::{Config, CrawlerConfig, EndpointConfig, OutputConfig, QueryConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_endpoint_config(&config.endpoint)?;
    validate_output_config(&config.output)?;
    validate_query_config(&config.query)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "connect_timeout_secs must be >= 1".to_string(),
        ));
    }

    if let Some(max_attempts) = config.max_attempts {
        if max_attempts < 1 {
            return Err(ConfigError::Validation(format!(
                "max_attempts must be >= 1 when set, got {}",
                max_attempts
            )));
        }
    }

    if config.retry_base_delay_ms > config.retry_max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "retry_base_delay_ms ({}) must not exceed retry_max_delay_ms ({})",
            config.retry_base_delay_ms, config.retry_max_delay_ms
        )));
    }

    if let Some(offset) = config.host_utc_offset_hours {
        if !(-24..=24).contains(&offset) {
            return Err(ConfigError::Validation(format!(
                "host_utc_offset_hours must be between -24 and 24, got {}",
                offset
            )));
        }
    }

    if config.max_empty_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max_empty_pages must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates endpoint configuration
fn validate_endpoint_config(config: &EndpointConfig) -> Result<(), ConfigError> {
    for (name, raw) in [
        ("site_url", &config.site_url),
        ("search_url", &config.search_url),
        ("timeline_url", &config.timeline_url),
    ] {
        let url = Url::parse(raw)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {}: {}", name, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "{} '{}' must use http or https",
                name, raw
            )));
        }
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.data_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "data_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates query configuration
fn validate_query_config(config: &QueryConfig) -> Result<(), ConfigError> {
    if let Some(near) = &config.near {
        if near.place.trim().is_empty() {
            return Err(ConfigError::Validation(
                "near.place cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}
