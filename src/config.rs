// src/config.rs

use serde::Deserialize;
use anyhow::{Context, Result};

fn default_log_json() -> bool {
    true
}

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    /// Snapshot JSON des pools (`Vec<Pool>`), tel que produit par le pipeline de tracking.
    pub pool_snapshot_path: String,
    /// Route JSON à rejouer.
    pub route_path: String,
    /// Quotas restants par période (`{"<période>": "<quota>"}`), optionnel.
    pub volume_limits_path: Option<String>,
    #[serde(default = "default_log_json")]
    pub log_json: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()
            .context("Configuration invalide (POOL_SNAPSHOT_PATH et ROUTE_PATH sont requis)")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_fields_have_defaults() {
        let vars = vec![
            ("POOL_SNAPSHOT_PATH".to_string(), "pools.json".to_string()),
            ("ROUTE_PATH".to_string(), "route.json".to_string()),
        ];
        let config: Config = envy::from_iter(vars).unwrap();
        assert_eq!(config.pool_snapshot_path, "pools.json");
        assert!(config.volume_limits_path.is_none());
        assert!(config.log_json);
    }

    #[test]
    fn log_format_can_be_switched_off() {
        let vars = vec![
            ("POOL_SNAPSHOT_PATH".to_string(), "p".to_string()),
            ("ROUTE_PATH".to_string(), "r".to_string()),
            ("VOLUME_LIMITS_PATH".to_string(), "limits.json".to_string()),
            ("LOG_JSON".to_string(), "false".to_string()),
        ];
        let config: Config = envy::from_iter(vars).unwrap();
        assert_eq!(config.volume_limits_path.as_deref(), Some("limits.json"));
        assert!(!config.log_json);
    }
}
