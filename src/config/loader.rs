//! Configuration loading from files (std only).

use std::fs;
use std::path::Path;

use crate::error::{ConfigError, Error, Result};

use super::GantryConfig;

/// Load configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
///
/// # Example
///
/// ```rust,ignore
/// use gantry_motion::load_config;
///
/// let config = load_config("gantry.toml")?;
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<GantryConfig> {
    let content = fs::read_to_string(path.as_ref()).map_err(|e| {
        let msg = heapless::String::try_from(e.to_string().as_str()).unwrap_or_default();
        Error::Config(ConfigError::IoError(msg))
    })?;

    parse_config(&content)
}

/// Parse configuration from a TOML string.
///
/// # Errors
///
/// Returns an error if the TOML is invalid or fails validation.
pub fn parse_config(content: &str) -> Result<GantryConfig> {
    let config: GantryConfig = toml::from_str(content).map_err(|e| {
        // Keep the head of long messages rather than dropping them
        let mut msg = heapless::String::new();
        for c in e.message().chars() {
            if msg.push(c).is_err() {
                break;
            }
        }
        Error::Config(ConfigError::ParseError(msg))
    })?;

    super::validation::validate_config(&config)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let toml = r#"
[axes.x]
step_line = 5
dir_line = 6
enable_line = 13
steps_per_mm = 80.0
"#;

        let config = parse_config(toml).unwrap();
        let x = config.axis("x").unwrap();
        assert_eq!(x.pulse_width_us, 5);
        assert!(x.enable_active_low);
        assert!(x.sensor.is_none());
        assert_eq!(config.homing.verify_distance_mm, 5.0);
        assert_eq!(config.coordination.tolerance_steps, 1);
    }

    #[test]
    fn test_parse_rejects_unknown_pair() {
        let toml = r#"
[axes.y1]
step_line = 5
dir_line = 6
enable_line = 13
steps_per_mm = 80.0

[coordination]
pairs = [["y2", "y1"]]
"#;

        assert!(matches!(
            parse_config(toml),
            Err(Error::Config(ConfigError::InvalidPairing { .. }))
        ));
    }

    #[test]
    fn test_parse_error_reported() {
        let result = parse_config("[axes.x]\nstep_line = \"five\"\n");
        match result {
            Err(Error::Config(ConfigError::ParseError(msg))) => assert!(!msg.is_empty()),
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_file() {
        let result = load_config("/nonexistent/gantry.toml");
        assert!(matches!(result, Err(Error::Config(ConfigError::IoError(_)))));
    }
}
