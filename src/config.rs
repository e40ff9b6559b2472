//! Settings loaded from `config.toml`, optionally overridden by `config-local.toml`.
//!
//! Nothing in the library reads these settings on its own; the binary loads them
//! once and hands the relevant section to whoever needs it.

// External crates
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// Local modules
use crate::constants::{
    BINANCE_BASE_URL, CONFIG_FILE_NAME, DEFAULT_DATASET_DIRECTORY, LOCAL_CONFIG_FILE_NAME,
};
use crate::error::Result;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub binance: BinanceSettings,
    pub dataset: DatasetSettings,
}

/// Exchange credentials and endpoint. Only public kline endpoints are called,
/// so the API key is the one credential read; other keys in `[binance]`, such
/// as a signing secret, are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BinanceSettings {
    pub api_key: Option<String>,
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatasetSettings {
    pub directory: PathBuf,
}

impl Default for BinanceSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: BINANCE_BASE_URL.to_string(),
        }
    }
}

impl Default for DatasetSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_DATASET_DIRECTORY),
        }
    }
}

impl Settings {
    /// Loads `config.toml` and `config-local.toml` from `dir`
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load(&[dir.join(CONFIG_FILE_NAME), dir.join(LOCAL_CONFIG_FILE_NAME)])
    }

    /// Loads the given files in order, later files overriding earlier ones.
    /// Files that do not exist are skipped.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut merged = toml::Table::new();

        for path in paths {
            let path = path.as_ref();
            if !path.exists() {
                debug!("Config file {} not found, skipping", path.display());
                continue;
            }
            info!("Loading config: {}", path.display());
            let contents = std::fs::read_to_string(path)?;
            let table: toml::Table = toml::from_str(&contents)?;
            merge_tables(&mut merged, table);
        }

        Ok(toml::Value::Table(merged).try_into()?)
    }
}

fn merge_tables(base: &mut toml::Table, overrides: toml::Table) {
    for (key, value) in overrides {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
