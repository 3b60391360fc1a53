use super::{types::Config, AuthMethod, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Auth section exists (enforced by serde)
/// - api_key auth has a non-empty key
/// - Server port is not 0
/// - Intake limits and intervals are positive
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.auth.method == AuthMethod::ApiKey
        && config.auth.api_key.as_deref().map_or(true, str::is_empty)
    {
        return Err(ConfigError::ValidationError(
            "auth.api_key must be set when auth.method = \"api_key\"".to_string(),
        ));
    }

    let intake = &config.intake;
    if intake.max_file_size_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "intake.max_file_size_bytes must be positive".to_string(),
        ));
    }
    if intake.retention_secs == 0 {
        return Err(ConfigError::ValidationError(
            "intake.retention_secs must be positive".to_string(),
        ));
    }
    if intake.sweep_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "intake.sweep_interval_secs must be positive".to_string(),
        ));
    }
    if intake.max_request_bytes < intake.max_file_size_bytes {
        return Err(ConfigError::ValidationError(
            "intake.max_request_bytes cannot be smaller than intake.max_file_size_bytes"
                .to_string(),
        ));
    }

    Ok(())
}
