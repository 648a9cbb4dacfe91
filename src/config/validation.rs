use crate::config::types::{
    Config, CrawlerConfig, IndexConfig, ShardConfig, StateConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_shard_config(&config.shard)?;
    validate_crawler_config(&config.crawler)?;
    validate_state_config(&config.state)?;
    validate_index_config(&config.index)?;
    validate_user_agent_config(&config.user_agent)?;
    Ok(())
}

/// Validates shard selection
fn validate_shard_config(config: &ShardConfig) -> Result<(), ConfigError> {
    if config.count == 0 {
        return Err(ConfigError::Validation(
            "shard count must be >= 1".to_string(),
        ));
    }

    if config.index >= config.count {
        return Err(ConfigError::Validation(format!(
            "shard index must be < shard count, got index {} of {}",
            config.index, config.count
        )));
    }

    if config.max_domains == 0 {
        return Err(ConfigError::Validation(
            "max_domains must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 100, got {}",
            config.concurrency
        )));
    }

    if config.fetch_timeout_ms == 0 || config.robots_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "fetch and robots timeouts must be > 0ms".to_string(),
        ));
    }

    if config.host_timeout_ms < config.fetch_timeout_ms {
        return Err(ConfigError::Validation(format!(
            "host_timeout_ms ({}) must be >= fetch_timeout_ms ({})",
            config.host_timeout_ms, config.fetch_timeout_ms
        )));
    }

    if config.max_pages_per_host == 0 {
        return Err(ConfigError::Validation(
            "max_pages_per_host must be >= 1".to_string(),
        ));
    }

    if config.max_sitemaps_per_host == 0 {
        return Err(ConfigError::Validation(
            "max_sitemaps_per_host must be >= 1".to_string(),
        ));
    }

    if config.max_total_pages == 0 {
        return Err(ConfigError::Validation(
            "max_total_pages must be >= 1".to_string(),
        ));
    }

    if config.max_backoff_ms < config.retry_backoff_ms {
        return Err(ConfigError::Validation(format!(
            "max_backoff_ms ({}) must be >= retry_backoff_ms ({})",
            config.max_backoff_ms, config.retry_backoff_ms
        )));
    }

    Ok(())
}

/// Validates ledger bounds
fn validate_state_config(config: &StateConfig) -> Result<(), ConfigError> {
    if config.max_urls_per_host == 0 {
        return Err(ConfigError::Validation(
            "max_urls_per_host must be >= 1".to_string(),
        ));
    }
    Ok(())
}

/// Validates page record limits
fn validate_index_config(config: &IndexConfig) -> Result<(), ConfigError> {
    if config.max_field_chars == 0 {
        return Err(ConfigError::Validation(
            "max_field_chars must be >= 1".to_string(),
        ));
    }

    if config.max_text_chars < config.max_field_chars {
        return Err(ConfigError::Validation(format!(
            "max_text_chars ({}) must be >= max_field_chars ({})",
            config.max_text_chars, config.max_field_chars
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::Validation(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    // Domain part should contain at least one dot
    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
