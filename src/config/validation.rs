use crate::config::types::{Config, CrawlerConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Upper bound on any worker or per-host count; larger values are almost
/// certainly a typo and would only waste memory on idle tasks.
const MAX_WORKERS: usize = 256;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler(&config.crawler)?;
    validate_user_agent(&config.user_agent)?;
    Ok(())
}

/// Validates crawler concurrency settings
///
/// Also called from `Crawler::new`, so programmatically built configs get
/// the same checks as loaded ones.
pub fn validate_crawler(config: &CrawlerConfig) -> Result<(), ConfigError> {
    check_positive("download-workers", config.download_workers)?;
    check_positive("extract-workers", config.extract_workers)?;
    check_positive("max-per-host", config.max_per_host)?;

    if config.request_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "request-timeout-ms must be >= 100ms, got {}ms",
            config.request_timeout_ms
        )));
    }

    Ok(())
}

fn check_positive(name: &str, value: usize) -> Result<(), ConfigError> {
    if value < 1 || value > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "{} must be between 1 and {}, got {}",
            name, MAX_WORKERS, value
        )));
    }
    Ok(())
}

/// Validates user agent identification
fn validate_user_agent(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::Validation(format!("Invalid contact-url: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_download_workers_rejected() {
        let config = CrawlerConfig {
            download_workers: 0,
            ..CrawlerConfig::default()
        };
        assert!(matches!(
            validate_crawler(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_zero_extract_workers_rejected() {
        let config = CrawlerConfig {
            extract_workers: 0,
            ..CrawlerConfig::default()
        };
        assert!(validate_crawler(&config).is_err());
    }

    #[test]
    fn test_zero_per_host_rejected() {
        let config = CrawlerConfig {
            max_per_host: 0,
            ..CrawlerConfig::default()
        };
        assert!(validate_crawler(&config).is_err());
    }

    #[test]
    fn test_oversized_worker_count_rejected() {
        let config = CrawlerConfig {
            download_workers: MAX_WORKERS + 1,
            ..CrawlerConfig::default()
        };
        assert!(validate_crawler(&config).is_err());
    }

    #[test]
    fn test_tiny_timeout_rejected() {
        let config = CrawlerConfig {
            request_timeout_ms: 50,
            ..CrawlerConfig::default()
        };
        assert!(validate_crawler(&config).is_err());
    }

    #[test]
    fn test_empty_crawler_name_rejected() {
        let mut config = Config::default();
        config.user_agent.crawler_name = String::new();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_crawler_name_with_spaces_rejected() {
        let mut config = Config::default();
        config.user_agent.crawler_name = "my crawler".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_bad_contact_url_rejected() {
        let mut config = Config::default();
        config.user_agent.contact_url = "not a url".to_string();
        assert!(validate(&config).is_err());
    }
}
