use crate::*;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

#[instrument(skip(path))]
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<GexConfig> {
    let path = path.as_ref();
    info!("Loading configuration from: {:?}", path);

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    debug!("Config file content length: {} bytes", content.len());

    parse_config(&content)
}

/// Parse a YAML document after environment variable substitution.
pub fn parse_config(content: &str) -> Result<GexConfig> {
    let substituted = substitution::substitute_env_vars(content)?;
    debug!("Environment variable substitution completed");

    if substitution::has_unresolved_env_vars(&substituted) {
        warn!("Configuration still contains unresolved environment variable placeholders");
    }

    let config: GexConfig = serde_yaml::from_str(&substituted)
        .with_context(|| "Failed to parse YAML configuration")?;

    info!("Configuration loaded successfully");
    Ok(config)
}

#[instrument]
pub fn generate_default_config() -> GexConfig {
    GexConfig {
        engine: EngineConfig::default(),
        walls: WallConfig::default(),
        flow: FlowConfig::default(),
        logging: LoggingConfig::default(),
        metrics: Some(MetricsConfig {
            enabled: false,
            port: default_metrics_port(),
        }),
    }
}

#[instrument]
pub fn save_config<P: AsRef<Path> + std::fmt::Debug>(config: &GexConfig, path: P) -> Result<()> {
    let path = path.as_ref();
    info!("Saving configuration to: {:?}", path);

    let yaml = serde_yaml::to_string(config)
        .with_context(|| "Failed to serialize configuration to YAML")?;

    fs::write(path, yaml)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    info!("Configuration saved successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_then_load() {
        let path = std::env::temp_dir().join(format!("gex-config-{}.yaml", std::process::id()));
        let mut config = generate_default_config();
        config.walls.max_walls = 4;
        config.engine.price_band = Some(0.3);

        save_config(&config, &path).unwrap();
        let loaded = load_config(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(loaded.walls.max_walls, 4);
        assert_eq!(loaded.engine.price_band, Some(0.3));
        assert_eq!(loaded.flow.thresholds, config.flow.thresholds);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = load_config("/definitely/not/here/gex.yaml");
        assert!(result.is_err());
    }

    #[test]
    fn test_env_substitution_in_document() {
        std::env::set_var("GEX_TEST_MAX_WALLS", "9");
        let config = parse_config("walls:\n  max_walls: ${GEX_TEST_MAX_WALLS}\n").unwrap();
        assert_eq!(config.walls.max_walls, 9);
    }

    #[test]
    fn test_unresolved_placeholder_is_kept_in_string_fields() {
        std::env::remove_var("GEX_TEST_UNSET_FORMAT");

        let config = parse_config("logging:\n  format: ${GEX_TEST_UNSET_FORMAT}\n").unwrap();
        assert_eq!(config.logging.format, "${GEX_TEST_UNSET_FORMAT}");

        std::env::remove_var("GEX_TEST_UNSET_WALLS");
        assert!(parse_config("walls:\n  max_walls: ${GEX_TEST_UNSET_WALLS}\n").is_err());
    }
}
