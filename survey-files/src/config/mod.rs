//! Configuration du service

use serde::{Deserialize, Serialize};
use std::path::Path;

use anyhow::{Context, Result};

/// Configuration principale
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// CRS attendu des projets quand la commande n'en précise pas
    #[serde(default = "default_crs")]
    pub default_crs: String,

    /// JSON indenté en sortie
    #[serde(default = "default_pretty_json")]
    pub pretty_json: bool,

    /// Nombre maximal de fichiers convertis en parallèle
    #[serde(default)]
    pub jobs: Option<usize>,
}

fn default_crs() -> String {
    "EPSG:3006".to_string()
}

fn default_pretty_json() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_crs: default_crs(),
            pretty_json: default_pretty_json(),
            jobs: None,
        }
    }
}

impl Config {
    /// Charge la configuration depuis les variables d'environnement
    ///
    /// `SURVEY_DEFAULT_CRS`, `SURVEY_PRETTY_JSON`, `SURVEY_JOBS`
    pub fn from_env() -> Self {
        Self {
            default_crs: std::env::var("SURVEY_DEFAULT_CRS").unwrap_or_else(|_| default_crs()),
            pretty_json: std::env::var("SURVEY_PRETTY_JSON")
                .ok()
                .and_then(|v| parse_bool(&v))
                .unwrap_or_else(default_pretty_json),
            jobs: std::env::var("SURVEY_JOBS")
                .ok()
                .and_then(|j| j.parse().ok())
                .filter(|&j| j > 0),
        }
    }

    /// Charge une configuration depuis un fichier JSON
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config JSON")
    }

    /// Sérialise une valeur selon `pretty_json`
    pub fn to_json<T: Serialize>(&self, value: &T) -> Result<String> {
        let json = if self.pretty_json {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        Ok(json)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.default_crs, "EPSG:3006");
        assert!(config.pretty_json);
        assert_eq!(config.jobs, None);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"jobs": 4}"#).unwrap();
        assert_eq!(config.default_crs, "EPSG:3006");
        assert!(config.pretty_json);
        assert_eq!(config.jobs, Some(4));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(Config::load(Path::new("does-not-exist.json")).is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_compact_json() {
        let config = Config {
            pretty_json: false,
            ..Default::default()
        };
        assert_eq!(config.to_json(&vec![1, 2]).unwrap(), "[1,2]");
    }
}
