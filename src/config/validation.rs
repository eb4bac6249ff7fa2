use crate::config::types::{Config, OutputConfig, SearchConfig, SiteConfig, TimeoutConfig};
use crate::{ConfigError, ConfigResult};
use url::Url;

/// Upper bound for any single wait: ten minutes
const MAX_TIMEOUT_MS: u64 = 600_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_site_config(&config.site)?;
    validate_search_config(&config.search)?;
    validate_timeout_config(&config.timeouts)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the target site configuration
fn validate_site_config(config: &SiteConfig) -> ConfigResult<()> {
    let url = Url::parse(&config.target_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid target-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "target-url must use HTTP or HTTPS, got '{}'",
            url.scheme()
        )));
    }

    require_non_empty("back-selector", &config.back_selector)?;
    require_non_empty("back-text", &config.back_text)?;

    if config.back_function.is_empty()
        || !config
            .back_function
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
    {
        return Err(ConfigError::Validation(format!(
            "back-function must be a plain identifier, got '{}'",
            config.back_function
        )));
    }

    Ok(())
}

/// Validates the search filters
fn validate_search_config(config: &SearchConfig) -> ConfigResult<()> {
    require_non_empty("state", &config.state)?;
    require_non_empty("city", &config.city)?;
    require_non_empty("property-type", &config.property_type)?;
    require_non_empty("any-option", &config.any_option)?;
    require_non_empty("next-caption", &config.next_caption)?;

    if config.price_band.value.trim().is_empty() && config.price_band.option_text.trim().is_empty()
    {
        return Err(ConfigError::Validation(
            "price-band needs a value or an option-text".to_string(),
        ));
    }

    Ok(())
}

/// Validates per-operation bounds
fn validate_timeout_config(config: &TimeoutConfig) -> ConfigResult<()> {
    if config.poll_interval < 10 {
        return Err(ConfigError::Validation(format!(
            "poll-interval must be >= 10ms, got {}ms",
            config.poll_interval
        )));
    }

    for (name, value) in [
        ("navigation", config.navigation),
        ("frame", config.frame),
        ("option", config.option),
        ("stage-two", config.stage_two),
        ("price-band", config.price_band),
        ("list-ready", config.list_ready),
        ("detail-ready", config.detail_ready),
        ("navigation-check", config.navigation_check),
    ] {
        if value < config.poll_interval || value > MAX_TIMEOUT_MS {
            return Err(ConfigError::Validation(format!(
                "timeout '{}' must be between poll-interval ({}ms) and {}ms, got {}ms",
                name, config.poll_interval, MAX_TIMEOUT_MS, value
            )));
        }
    }

    if config.settle > MAX_TIMEOUT_MS {
        return Err(ConfigError::Validation(format!(
            "settle must be at most {}ms, got {}ms",
            MAX_TIMEOUT_MS, config.settle
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> ConfigResult<()> {
    require_non_empty("path", &config.path)?;

    if matches!(config.delimiter, '"' | '\n' | '\r') {
        return Err(ConfigError::Validation(format!(
            "delimiter cannot be {:?}",
            config.delimiter
        )));
    }

    if config.sentinel.trim().is_empty() {
        return Err(ConfigError::Validation(
            "sentinel cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn require_non_empty(name: &str, value: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
    }
    Ok(())
}
