//! Startup validation.
//!
//! Invalid configuration is fatal: the process refuses to start rather than
//! run with wiring that can misroute or duplicate media.

use {secrecy::ExposeSecret, thiserror::Error};

use crate::schema::RelayConfig;

/// Validation failure listing every detected problem.
#[derive(Debug, Error)]
#[error("invalid configuration: {}", problems.join("; "))]
pub struct ConfigError {
    pub problems: Vec<String>,
}

/// Check the loaded configuration for fatal problems.
pub fn validate(cfg: &RelayConfig) -> Result<(), ConfigError> {
    let mut problems = Vec::new();

    if cfg.telegram.token.expose_secret().is_empty() {
        problems.push("telegram.token is empty".into());
    }
    if cfg.channels.sources.is_empty() {
        problems.push("channels.sources is empty".into());
    }
    if cfg.channels.target == 0 {
        problems.push("channels.target is not set".into());
    }
    if cfg.channels.sources.contains(&cfg.channels.target) {
        problems.push("channels.target is also listed as a source".into());
    }
    if !cfg.caption_template.is_empty() && !cfg.caption_template.contains("{caption}") {
        problems.push("caption_template has no {caption} placeholder".into());
    }
    if cfg.rate_limit_per_minute == 0 {
        problems.push("rate_limit_per_minute must be at least 1".into());
    }
    if cfg.queue_capacity == 0 {
        problems.push("queue_capacity must be at least 1".into());
    }
    if cfg.workers == 0 {
        problems.push("workers must be at least 1".into());
    }
    if cfg.dedup.use_hash && cfg.dedup.hash_max_bytes == 0 {
        problems.push("dedup.hash_max_bytes must be nonzero when dedup.use_hash is set".into());
    }
    if cfg.delivery.timeout_secs == 0 {
        problems.push("delivery.timeout_secs must be nonzero".into());
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ConfigError { problems })
    }
}

#[cfg(test)]
mod tests {
    use secrecy::Secret;

    use {super::*, crate::schema::RelayConfig};

    fn valid_config() -> RelayConfig {
        let mut cfg = RelayConfig::default();
        cfg.telegram.token = Secret::new("123:ABC".into());
        cfg.channels.sources = vec![-1001];
        cfg.channels.target = -1009;
        cfg
    }

    #[test]
    fn accepts_valid_config() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn default_config_is_rejected() {
        let err = validate(&RelayConfig::default()).unwrap_err();
        assert!(err.problems.iter().any(|p| p.contains("token")));
        assert!(err.problems.iter().any(|p| p.contains("sources")));
        assert!(err.problems.iter().any(|p| p.contains("target")));
    }

    #[test]
    fn target_cannot_be_a_source() {
        let mut cfg = valid_config();
        cfg.channels.sources.push(cfg.channels.target);
        let err = validate(&cfg).unwrap_err();
        assert!(err.problems.iter().any(|p| p.contains("also listed")));
    }

    #[test]
    fn template_requires_placeholder() {
        let mut cfg = valid_config();
        cfg.caption_template = "no placeholder here".into();
        assert!(validate(&cfg).is_err());

        // Empty template is the identity function; allowed.
        cfg.caption_template = String::new();
        assert!(validate(&cfg).is_ok());
    }

    #[test]
    fn zero_rate_limit_rejected() {
        let mut cfg = valid_config();
        cfg.rate_limit_per_minute = 0;
        assert!(validate(&cfg).is_err());
    }
}
