use crate::config::types::{BackendConfig, Config, CrawlerConfig, HostConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_backend_config(&config.backend)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_host_config(&config.host)?;
    Ok(())
}

/// Validates crawl timings
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.force_capture_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "force_capture_timeout_ms must be > 0".to_string(),
        ));
    }

    if config.handshake_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "handshake_timeout_ms must be > 0".to_string(),
        ));
    }

    if config.preprocess_delay_ms == 0 {
        return Err(ConfigError::Validation(
            "preprocess_delay_ms must be > 0".to_string(),
        ));
    }

    // A preprocessing delay at or past the forced deadline means normal captures never win
    if config.preprocess_delay_ms >= config.force_capture_timeout_ms {
        return Err(ConfigError::Validation(format!(
            "preprocess_delay_ms ({}ms) must be shorter than force_capture_timeout_ms ({}ms)",
            config.preprocess_delay_ms, config.force_capture_timeout_ms
        )));
    }

    Ok(())
}

/// Validates backend configuration
fn validate_backend_config(config: &BackendConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "base_url '{}' must use http or https",
            config.base_url
        )));
    }

    if config.request_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "request_timeout_ms must be > 0".to_string(),
        ));
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
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

fn validate_host_config(config: &HostConfig) -> Result<(), ConfigError> {
    if config.page_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "page_timeout_ms must be > 0".to_string(),
        ));
    }
    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

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

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
