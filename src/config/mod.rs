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

    // Try default locations
    let default_paths = [
        "./config.toml",
        "./vidforge.toml",
        "~/.config/vidforge/config.toml",
        "/etc/vidforge/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.upload.allowed_extensions.is_empty() {
        anyhow::bail!("upload.allowed_extensions must list at least one extension");
    }

    if let Some(ext) = config
        .upload
        .allowed_extensions
        .iter()
        .find(|ext| ext.is_empty() || ext.contains(['.', '/', '\\']))
    {
        anyhow::bail!("Invalid extension in upload.allowed_extensions: {:?}", ext);
    }

    if config.upload.max_upload_mb == 0 {
        anyhow::bail!("upload.max_upload_mb must be greater than 0");
    }
    if config.upload.checked_max_upload_bytes().is_none() {
        anyhow::bail!(
            "upload.max_upload_mb is too large: {}",
            config.upload.max_upload_mb
        );
    }

    if config.rate_limit.enabled {
        if config.rate_limit.requests == 0 {
            anyhow::bail!("rate_limit.requests must be greater than 0");
        }
        if config.rate_limit.window_secs == 0 {
            anyhow::bail!("rate_limit.window_secs must be greater than 0");
        }
    }

    if config.encoder.max_concurrent == 0 {
        anyhow::bail!("encoder.max_concurrent must be greater than 0");
    }

    if config.encoder.timeout_secs == Some(0) {
        anyhow::bail!("encoder.timeout_secs must be greater than 0 when set");
    }

    if config.storage.upload_dir == config.storage.output_dir {
        anyhow::bail!("storage.upload_dir and storage.output_dir must differ");
    }

    if let Some(program) = &config.encoder.program {
        if !program.exists() {
            tracing::warn!("Configured encoder does not exist: {:?}", program);
        }
    }

    Ok(())
}
