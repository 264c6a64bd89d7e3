//! TOML configuration with file-watch hot-reload (§10.3), grounded on the
//! teacher's `ConfigManager`.

use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, RwLock};
use std::thread;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;

use varserver_types::constants::{DEFAULT_NOTIFY_QUEUE_LEN, DEFAULT_WORK_BUFFER_LEN};
use varserver_types::ConfigError;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub max_variables: usize,
    pub notify_queue_len: usize,
    pub default_work_buffer_len: usize,
    pub socket_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            max_variables: 4096,
            notify_queue_len: DEFAULT_NOTIFY_QUEUE_LEN,
            default_work_buffer_len: DEFAULT_WORK_BUFFER_LEN,
            socket_path: "/run/varserver/varserver.sock".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub directory: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig { level: "info".into(), directory: "logs".into() }
    }
}

fn load(path: &Path) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
    toml::from_str(&text).map_err(ConfigError::Parse)
}

/// Shared, hot-reloadable configuration. A background thread watches the
/// backing file and swaps in a freshly parsed `Config` on every write event;
/// a config that fails to parse is logged and the previous value is kept.
pub struct ConfigManager {
    current: Arc<RwLock<Config>>,
    _watcher: RecommendedWatcher,
}

impl ConfigManager {
    pub fn new(path: &Path) -> Result<Self, ConfigError> {
        let config = load(path)?;
        let current = Arc::new(RwLock::new(config));

        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(tx).map_err(|e| ConfigError::Validation(e.to_string()))?;
        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        let watched_path: PathBuf = path.to_path_buf();
        let reload_target = current.clone();
        thread::Builder::new()
            .name("config-watcher".into())
            .spawn(move || {
                for event in rx {
                    let Ok(event) = event else { continue };
                    if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                        continue;
                    }
                    match load(&watched_path) {
                        Ok(fresh) => {
                            if let Ok(mut guard) = reload_target.write() {
                                *guard = fresh;
                                log::info!("configuration reloaded from {}", watched_path.display());
                            }
                        }
                        Err(e) => log::warn!("ignoring invalid configuration reload: {e}"),
                    }
                }
            })
            .expect("failed to spawn config watcher thread");

        Ok(ConfigManager { current, _watcher: watcher })
    }

    pub fn get(&self) -> Config {
        self.current.read().expect("config lock poisoned").clone()
    }
}
