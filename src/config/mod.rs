mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./ffbatch.toml",
        "~/.config/ffbatch/config.toml",
        "/etc/ffbatch/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.encoder.stop_timeout_ms == 0 {
        anyhow::bail!("encoder.stop_timeout_ms cannot be 0");
    }

    for (name, secs) in config.probe.entries() {
        if secs == 0 {
            anyhow::bail!("probe.{} timeout cannot be 0", name);
        }
    }

    // Probing and encoding report the missing binary themselves.
    if let Some(ref binary) = config.encoder.binary_path {
        if !binary.is_file() {
            tracing::warn!("Encoder binary does not exist: {:?}", binary);
        }
    }

    Ok(())
}
