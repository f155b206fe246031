use crate::config::types::{Config, CrawlerConfig, DiscoveryConfig, FetchConfig, StorageConfig};
use crate::ConfigError;
use chrono::{Datelike, Utc};

/// Earliest archive year accepted for HLTV discovery
const FIRST_ARCHIVE_YEAR: i32 = 2000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_fetch_config(&config.fetch)?;
    validate_storage_config(&config.storage)?;
    validate_discovery_config(&config.discovery)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 64 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 64, got {}",
            config.workers
        )));
    }

    Ok(())
}

/// Validates fetch configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 || config.max_attempts > 20 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be between 1 and 20, got {}",
            config.max_attempts
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.navigation_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "navigation-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.corpus_dir.trim().is_empty() {
        return Err(ConfigError::Validation(
            "corpus-dir cannot be empty".to_string(),
        ));
    }

    if matches!(&config.database_path, Some(path) if path.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "database-path cannot be empty; omit it for file-only mode".to_string(),
        ));
    }

    Ok(())
}

/// Validates discovery configuration
fn validate_discovery_config(config: &DiscoveryConfig) -> Result<(), ConfigError> {
    let current_year = Utc::now().year();
    if config.hltv_first_year < FIRST_ARCHIVE_YEAR || config.hltv_first_year > current_year {
        return Err(ConfigError::Validation(format!(
            "hltv-first-year must be between {} and {}, got {}",
            FIRST_ARCHIVE_YEAR, current_year, config.hltv_first_year
        )));
    }

    if config.cybersport_tags.is_empty() {
        return Err(ConfigError::Validation(
            "cybersport-tags must name at least one tag".to_string(),
        ));
    }

    for tag in &config.cybersport_tags {
        validate_tag(tag)?;
    }

    if config.max_idle_rounds < 1 {
        return Err(ConfigError::Validation(
            "max-idle-rounds must be >= 1".to_string(),
        ));
    }

    if config.max_targets_per_tag < 1 {
        return Err(ConfigError::Validation(
            "max-targets-per-tag must be >= 1".to_string(),
        ));
    }

    if config.workers < 1 || config.workers > 16 {
        return Err(ConfigError::Validation(format!(
            "discovery workers must be between 1 and 16, got {}",
            config.workers
        )));
    }

    Ok(())
}

/// Tags become a URL path segment and part of cache file names
fn validate_tag(tag: &str) -> Result<(), ConfigError> {
    if tag.is_empty() {
        return Err(ConfigError::Validation("tag cannot be empty".to_string()));
    }

    if !tag
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "tag '{}' must contain only ASCII letters, digits, '-' or '_'",
            tag
        )));
    }

    Ok(())
}
