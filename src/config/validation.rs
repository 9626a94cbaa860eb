use crate::config::types::{Config, SiteEntry, UserAgentConfig};
use crate::url::normalize_site_url;
use crate::ConfigError;
use std::collections::HashSet;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_user_agent_config(&config.user_agent)?;

    if config.database.path.is_empty() {
        return Err(ConfigError::Validation(
            "database path cannot be empty".to_string(),
        ));
    }

    if config.search.default_limit < 1 {
        return Err(ConfigError::Validation(format!(
            "default-limit must be >= 1, got {}",
            config.search.default_limit
        )));
    }

    validate_sites(&config.sites)?;
    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent name cannot be empty".to_string(),
        ));
    }

    if config.name.chars().any(char::is_whitespace) {
        return Err(ConfigError::Validation(format!(
            "user-agent name cannot contain whitespace, got '{}'",
            config.name
        )));
    }

    if let Some(referrer) = &config.referrer {
        url::Url::parse(referrer)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid referrer: {}", e)))?;
    }

    Ok(())
}

/// Validates site seeds: at least one, all parseable, unique after canonicalisation
fn validate_sites(sites: &[SiteEntry]) -> Result<(), ConfigError> {
    if sites.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[sites]] entry is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for site in sites {
        if site.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "site '{}' must have a name",
                site.url
            )));
        }

        let canonical = normalize_site_url(&site.url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid site URL '{}': {}", site.url, e)))?;

        if !seen.insert(canonical.clone()) {
            return Err(ConfigError::Validation(format!(
                "site '{}' is configured more than once",
                canonical
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(name: &str, url: &str) -> SiteEntry {
        SiteEntry {
            name: name.to_string(),
            url: url.to_string(),
        }
    }

    #[test]
    fn test_validate_sites() {
        assert!(validate_sites(&[site("A", "https://a.com"), site("B", "http://b.org/")]).is_ok());

        assert!(validate_sites(&[]).is_err());
        assert!(validate_sites(&[site("", "https://a.com")]).is_err());
        assert!(validate_sites(&[site("A", "not a url")]).is_err());
        assert!(validate_sites(&[site("A", "ftp://a.com")]).is_err());
    }

    #[test]
    fn test_duplicate_sites_after_canonicalisation() {
        let result = validate_sites(&[
            site("A", "https://www.a.com/"),
            site("A again", "https://a.com"),
        ]);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validate_user_agent() {
        let mut agent = UserAgentConfig {
            name: "Bot".to_string(),
            version: "1.0".to_string(),
            referrer: Some("https://www.google.com".to_string()),
        };
        assert!(validate_user_agent_config(&agent).is_ok());

        agent.name = "Bad Bot".to_string();
        assert!(validate_user_agent_config(&agent).is_err());

        agent.name = "Bot".to_string();
        agent.referrer = Some("::nope".to_string());
        assert!(validate_user_agent_config(&agent).is_err());
    }
}
