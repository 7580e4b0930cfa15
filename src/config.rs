use std::path::PathBuf;

use crate::generation::GenerationConfig;
use crate::prompt::PromptConfig;
use crate::ui::orbit::OrbitConfig;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{var} must be a number, got {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Application configuration loaded from the environment.
///
/// Everything is read from environment variables (an optional `.env` file is
/// loaded first). Every value has a default, so an empty environment gives
/// a working setup that only lacks an API key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    /// Session database file; `None` means the per-user default location.
    pub db_path: Option<PathBuf>,
    /// API key found in the environment, if any.
    pub api_key: Option<String>,
    pub generation: GenerationConfig,
    pub orbit: OrbitConfig,
    pub prompt: PromptConfig,
}

impl Config {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                                     |
    /// |-------------------------------|---------------------------------------------|
    /// | `VIEWSHIFT_DB_PATH`           | `<data dir>/viewshift/viewshift.db`         |
    /// | `GEMINI_API_KEY` / `API_KEY`  | unset                                       |
    /// | `GEMINI_API_URL`              | `https://generativelanguage.googleapis.com` |
    /// | `GEMINI_MODEL`                | `gemini-3-pro-image-preview`                |
    /// | `VIEWSHIFT_TEMPERATURE`       | `0.4`                                       |
    /// | `VIEWSHIFT_ORBIT_SENSITIVITY` | `0.6`                                       |
    /// | `VIEWSHIFT_REVERSE_ANGLE`     | `150`                                       |
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                log::warn!("Ignoring unreadable .env file: {}", e);
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let db_path = non_empty("VIEWSHIFT_DB_PATH").map(PathBuf::from);
        let api_key = non_empty("GEMINI_API_KEY").or_else(|| non_empty("API_KEY"));

        let generation = GenerationConfig {
            api_url: non_empty("GEMINI_API_URL").unwrap_or(defaults.generation.api_url),
            model: non_empty("GEMINI_MODEL").unwrap_or(defaults.generation.model),
            temperature: parse_f32(
                "VIEWSHIFT_TEMPERATURE",
                non_empty("VIEWSHIFT_TEMPERATURE"),
                defaults.generation.temperature,
            )?,
            grounding: defaults.generation.grounding,
        };

        let orbit = OrbitConfig {
            sensitivity: parse_f32(
                "VIEWSHIFT_ORBIT_SENSITIVITY",
                non_empty("VIEWSHIFT_ORBIT_SENSITIVITY"),
                defaults.orbit.sensitivity,
            )?,
        };

        let prompt = PromptConfig {
            reverse_angle_threshold: parse_f32(
                "VIEWSHIFT_REVERSE_ANGLE",
                non_empty("VIEWSHIFT_REVERSE_ANGLE"),
                defaults.prompt.reverse_angle_threshold,
            )?,
        };

        Ok(Self {
            db_path,
            api_key,
            generation,
            orbit,
            prompt,
        })
    }
}

fn parse_f32(var: &'static str, value: Option<String>, default: f32) -> Result<f32, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => match value.parse::<f32>() {
            Ok(parsed) if parsed.is_finite() => Ok(parsed),
            _ => Err(ConfigError::Invalid { var, value }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_empty_environment_gives_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.api_key.is_none());
        assert_eq!(config.orbit.sensitivity, 0.6);
        assert_eq!(config.prompt.reverse_angle_threshold, 150.0);
        assert_eq!(config.generation.temperature, 0.4);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("VIEWSHIFT_DB_PATH", "/tmp/vs.db"),
            ("GEMINI_API_KEY", " key-123 "),
            ("GEMINI_MODEL", "other-model"),
            ("VIEWSHIFT_ORBIT_SENSITIVITY", "0.25"),
            ("VIEWSHIFT_REVERSE_ANGLE", "120"),
        ]))
        .unwrap();

        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/vs.db")));
        assert_eq!(config.api_key.as_deref(), Some("key-123"));
        assert_eq!(config.generation.model, "other-model");
        assert_eq!(config.orbit.sensitivity, 0.25);
        assert_eq!(config.prompt.reverse_angle_threshold, 120.0);
    }

    #[test]
    fn test_api_key_fallback_and_blank_values() {
        let config = Config::from_lookup(lookup(&[("GEMINI_API_KEY", "  "), ("API_KEY", "fallback")])).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("fallback"));
    }

    #[test]
    fn test_invalid_number_is_reported() {
        let error = Config::from_lookup(lookup(&[("VIEWSHIFT_TEMPERATURE", "warm")])).unwrap_err();
        assert_eq!(
            error,
            ConfigError::Invalid {
                var: "VIEWSHIFT_TEMPERATURE",
                value: "warm".into()
            }
        );

        assert!(Config::from_lookup(lookup(&[("VIEWSHIFT_REVERSE_ANGLE", "NaN")])).is_err());
    }
}
