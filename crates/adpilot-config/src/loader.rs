use notify::{Event as NotifyEvent, EventKind, RecursiveMode, Watcher};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use adpilot_core::{PilotError, Result};

use crate::schema::PilotConfig;

/// Loads and optionally hot-reloads the adpilot configuration.
pub struct ConfigLoader {
    config: Arc<RwLock<PilotConfig>>,
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Resolve the config path: explicit path > ADPILOT_CONFIG env > ~/.adpilot/adpilot.toml
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("ADPILOT_CONFIG") {
            return PathBuf::from(p);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".adpilot")
            .join("adpilot.toml")
    }

    /// Load the config from disk, falling back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = Self::resolve_path(path);
        let config = if config_path.exists() {
            info!(?config_path, "loading configuration");
            let raw = std::fs::read_to_string(&config_path)?;
            toml::from_str::<PilotConfig>(&raw).map_err(|e| {
                PilotError::Config(format!("failed to parse {}: {}", config_path.display(), e))
            })?
        } else {
            warn!(?config_path, "config file not found, using defaults");
            PilotConfig::default()
        };

        // Apply environment variable overrides
        let config = Self::apply_env_overrides(config);

        // Validate config: log warnings, fail on errors
        match config.validate() {
            Ok(warnings) => {
                for w in &warnings {
                    warn!("{}", w);
                }
            }
            Err(e) => {
                return Err(PilotError::Config(e));
            }
        }

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path,
        })
    }

    /// Get a read snapshot of the current config.
    pub fn get(&self) -> PilotConfig {
        self.config.read().clone()
    }

    /// Get a shared reference for subscription.
    pub fn shared(&self) -> Arc<RwLock<PilotConfig>> {
        Arc::clone(&self.config)
    }

    /// Path being watched.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Apply env var overrides (ADPILOT_TICK_INTERVAL, ADPILOT_AUTOMATION_LEVEL, etc.)
    fn apply_env_overrides(mut config: PilotConfig) -> PilotConfig {
        if let Ok(v) = std::env::var("ADPILOT_TICK_INTERVAL") {
            if let Ok(secs) = v.parse::<u64>() {
                config.engine.tick_interval_secs = secs;
            }
        }
        if let Ok(v) = std::env::var("ADPILOT_AUTOMATION_LEVEL") {
            config.guardrails.automation_level = v;
        }
        if let Ok(v) = std::env::var("ADPILOT_TIMEZONE") {
            config.engine.timezone = v;
        }
        if let Ok(v) = std::env::var("ADPILOT_LOG_LEVEL") {
            config.logging.level = v;
        }
        if let Ok(v) = std::env::var("ADPILOT_DB_PATH") {
            config.ledger.db_path = PathBuf::from(v);
        }
        // API key: env var fills in when the config file doesn't set it.
        // Config file takes priority, env is the fallback.
        if config.analyst.api_key.is_none() {
            if let Ok(v) = std::env::var("ANTHROPIC_API_KEY") {
                config.analyst.api_key = Some(v);
            }
        }
        config
    }

    /// Reload the config from disk.
    pub fn reload(&self) -> Result<()> {
        if !self.config_path.exists() {
            return Err(PilotError::Config(format!(
                "config file not found: {}",
                self.config_path.display()
            )));
        }
        let raw = std::fs::read_to_string(&self.config_path)?;
        let new_config = toml::from_str::<PilotConfig>(&raw).map_err(|e| {
            PilotError::Config(format!("failed to parse {}: {}", self.config_path.display(), e))
        })?;
        let new_config = Self::apply_env_overrides(new_config);
        *self.config.write() = new_config;
        info!("configuration reloaded");
        Ok(())
    }

    /// Start a background file watcher that triggers a reload when the config
    /// file changes. Returns a handle that must be kept alive for watching to
    /// continue.
    pub fn watch(&self) -> Result<notify::RecommendedWatcher> {
        let config = Arc::clone(&self.config);
        let config_path = self.config_path.clone();

        info!(?config_path, "starting config file watcher");

        let path_for_event = config_path.clone();
        let mut watcher =
            notify::recommended_watcher(move |res: std::result::Result<NotifyEvent, notify::Error>| {
                match res {
                    Ok(event) => {
                        // Only react to modify/create events on our specific file
                        match event.kind {
                            EventKind::Modify(_) | EventKind::Create(_) => {
                                let is_our_file = event
                                    .paths
                                    .iter()
                                    .any(|p| p.file_name() == path_for_event.file_name());
                                if !is_our_file {
                                    return;
                                }

                                info!("config file changed, reloading");
                                match std::fs::read_to_string(&path_for_event) {
                                    Ok(raw) => match toml::from_str::<PilotConfig>(&raw) {
                                        Ok(new_config) => {
                                            let new_config =
                                                ConfigLoader::apply_env_overrides(new_config);
                                            match new_config.validate() {
                                                Ok(_) => {
                                                    *config.write() = new_config;
                                                    info!("configuration hot-reloaded");
                                                }
                                                Err(e) => {
                                                    warn!(error = %e, "reloaded config is invalid, keeping current config");
                                                }
                                            }
                                        }
                                        Err(e) => {
                                            warn!(error = %e, "config file has errors, keeping current config");
                                        }
                                    },
                                    Err(e) => {
                                        warn!(error = %e, "failed to read config file during hot-reload");
                                    }
                                }
                            }
                            _ => {}
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "file watcher error");
                    }
                }
            })
            .map_err(|e| PilotError::Config(format!("failed to create file watcher: {e}")))?;

        // Watch the parent directory (some editors create temp files + rename)
        let watch_path = self.config_path.parent().unwrap_or(Path::new("."));
        watcher
            .watch(watch_path, RecursiveMode::NonRecursive)
            .map_err(|e| PilotError::Config(format!("failed to watch config directory: {e}")))?;

        Ok(watcher)
    }
}
