//! Configuration validation.

use super::Config;
use crate::error::{Result, TypeMapError};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    let batching = &config.batching;

    if batching.max_payload_bytes == 0 {
        return Err(TypeMapError::Config(
            "batching.max_payload_bytes must be at least 1".into(),
        ));
    }
    if batching.max_parameters == 0 {
        return Err(TypeMapError::Config(
            "batching.max_parameters must be at least 1".into(),
        ));
    }
    if batching.row_overhead_bytes >= batching.max_payload_bytes {
        return Err(TypeMapError::Config(format!(
            "batching.row_overhead_bytes ({}) must be smaller than batching.max_payload_bytes ({})",
            batching.row_overhead_bytes, batching.max_payload_bytes
        )));
    }

    if config.mapping.spatial && !cfg!(feature = "spatial") {
        return Err(TypeMapError::Config(
            "mapping.spatial requires the 'spatial' feature".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BatchConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_payload_rejected() {
        let mut config = Config::default();
        config.batching.max_payload_bytes = 0;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("max_payload_bytes"));
    }

    #[test]
    fn test_zero_parameters_rejected() {
        let mut config = Config::default();
        config.batching.max_parameters = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_overhead_must_fit_payload() {
        let config = Config {
            batching: BatchConfig {
                max_payload_bytes: 64,
                max_parameters: 10,
                row_overhead_bytes: 64,
            },
            ..Config::default()
        };
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("row_overhead_bytes"));
    }
}
