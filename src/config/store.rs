use arc_swap::ArcSwap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::AppConfig;
use crate::error::{AppError, Result};

/// Configuration loaded from an optional JSON file
///
/// Uses `ArcSwap` for lock-free reads from request handlers.
#[derive(Clone)]
pub struct ConfigStore {
    path: Option<PathBuf>,
    cache: Arc<ArcSwap<AppConfig>>,
}

impl ConfigStore {
    /// Load configuration from `path`, falling back to defaults if the file
    /// does not exist or no path was given
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::read_file(path).await?,
            None => AppConfig::default(),
        };

        Ok(Self {
            path: path.map(Path::to_path_buf),
            cache: Arc::new(ArcSwap::from_pointee(config)),
        })
    }

    /// Store holding the given configuration, without a backing file
    pub fn from_config(config: AppConfig) -> Self {
        Self {
            path: None,
            cache: Arc::new(ArcSwap::from_pointee(config)),
        }
    }

    async fn read_file(path: &Path) -> Result<AppConfig> {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("Config file {} not found, using defaults", path.display());
                return Ok(AppConfig::default());
            }
            Err(e) => return Err(e.into()),
        };

        let config: AppConfig = serde_json::from_str(&raw).map_err(|e| {
            AppError::Config(format!("Invalid config file {}: {}", path.display(), e))
        })?;
        validate(&config)?;

        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Get current configuration (lock-free)
    pub fn get(&self) -> Arc<AppConfig> {
        self.cache.load_full()
    }

    /// Replace the in-memory configuration
    pub fn set(&self, config: AppConfig) -> Result<()> {
        validate(&config)?;
        self.cache.store(Arc::new(config));
        Ok(())
    }

    /// Apply a modification to the in-memory configuration
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = (*self.get()).clone();
        f(&mut config);
        self.set(config)
    }

    /// File the configuration was read from
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

fn validate(config: &AppConfig) -> Result<()> {
    if config.camera.probe_count == 0 {
        return Err(AppError::Config("camera.probe_count must be at least 1".to_string()));
    }
    if !(1..=100).contains(&config.stream.jpeg_quality) {
        return Err(AppError::Config(format!(
            "stream.jpeg_quality must be within 1-100, got {}",
            config.stream.jpeg_quality
        )));
    }
    Ok(())
}
