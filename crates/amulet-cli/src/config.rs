//! Run configuration file

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use amulet_core::{MarkovConfig, MineConfig};

/// Where candidates come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    /// Corpus the Markov model is built from
    pub corpus: PathBuf,
    /// Word list to cycle through instead of the Markov model
    pub wordlist: Option<PathBuf>,
    pub markov: MarkovConfig,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            corpus: PathBuf::from("markov.txt"),
            wordlist: None,
            markov: MarkovConfig::default(),
        }
    }
}

/// Everything a `mine` run needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub mine: MineConfig,
    pub source: SourceSettings,
    /// CSV file hits are appended to
    pub output: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mine: MineConfig {
                workers: 20,
                attempts: 500_000,
                ..MineConfig::default()
            },
            source: SourceSettings::default(),
            output: PathBuf::from("found_amulets.csv"),
        }
    }
}

impl RunConfig {
    /// Load a JSON config file; missing keys keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let overrides: Value = serde_json::from_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;

        // Nested sections would otherwise fall back to their own defaults,
        // not the run defaults (workers 20 vs 0)
        let mut merged = serde_json::to_value(Self::default())?;
        merge(&mut merged, overrides);
        serde_json::from_value(merged)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }
}

/// Overlay `overrides` onto `base`, recursing into objects
fn merge(base: &mut Value, overrides: Value) {
    match (base, overrides) {
        (Value::Object(base), Value::Object(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
