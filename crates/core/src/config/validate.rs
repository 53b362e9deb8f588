use super::{types::Config, ConfigError, DistillerProvider};

/// Validate configuration
/// Currently validates:
/// - Distiller section exists (enforced by serde)
/// - Anthropic provider has an API key
/// - Server port is not 0
/// - Orchestrator limits are sane
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.distiller.provider == DistillerProvider::Anthropic
        && config.distiller.api_key.is_none()
    {
        return Err(ConfigError::ValidationError(
            "distiller.api_key is required for the anthropic provider".to_string(),
        ));
    }

    if config.distiller.model.is_empty() {
        return Err(ConfigError::ValidationError(
            "distiller.model cannot be empty".to_string(),
        ));
    }

    if config.orchestrator.max_concurrency == 0 || config.orchestrator.max_concurrency > 10 {
        return Err(ConfigError::ValidationError(
            "orchestrator.max_concurrency must be between 1 and 10".to_string(),
        ));
    }

    if config.orchestrator.cancel_poll_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.cancel_poll_interval_ms cannot be 0".to_string(),
        ));
    }

    Ok(())
}
