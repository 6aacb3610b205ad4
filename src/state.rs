//! Local record of managed instances
//!
//! Each entry holds the last state read back from the API, keyed by address.
//! Plan compares the desired file against this record without touching the
//! network.

use crate::resource::Registry;
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use reconcile::{Address, AttributeStore, Instance, Outcome, decode_config};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use std::fs;
use std::path::{Path, PathBuf};

const STATE_VERSION: u32 = 1;

/// Get the state directory path (~/.local/state/zpa)
pub fn state_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".local").join("state").join("zpa"))
}

/// Resolve `--state`, expanding `~`, or fall back to the default location
pub fn state_path(flag: Option<&str>) -> Result<PathBuf> {
    match flag {
        Some(p) => Ok(PathBuf::from(shellexpand::tilde(p).as_ref())),
        None => Ok(state_dir()?.join("state.json")),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    pub version: u32,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub instances: Vec<StateEntry>,
}

/// One managed instance as last synced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateEntry {
    pub address: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    #[serde(default)]
    pub attributes: Map<String, Json>,
    pub last_synced: DateTime<Utc>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            last_updated: Utc::now(),
            instances: Vec::new(),
        }
    }
}

impl StateFile {
    /// Load state from disk, or return an empty state if the file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file {} does not exist, using empty state", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;
        let state: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;
        if state.version > STATE_VERSION {
            bail!(
                "State file {} has version {}, this build reads up to {STATE_VERSION}",
                path.display(),
                state.version
            );
        }

        log::debug!("Loaded {} instances from {}", state.instances.len(), path.display());
        Ok(state)
    }

    /// Save state to disk
    pub fn save(&mut self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        self.last_updated = Utc::now();
        self.instances.sort_by(|a, b| a.address.cmp(&b.address));
        let content = serde_json::to_string_pretty(&self).context("Failed to serialize state")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }

    pub fn get(&self, address: &Address) -> Option<&StateEntry> {
        let key = address.to_string();
        self.instances.iter().find(|e| e.address == key)
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Decode every entry into a plan instance
    pub fn to_instances(&self, registry: &Registry) -> Result<Vec<Instance>> {
        self.instances
            .iter()
            .map(|entry| {
                let resource = registry
                    .require(&entry.kind)
                    .with_context(|| format!("State entry {}", entry.address))?;
                let address = Address::parse(&entry.address)
                    .with_context(|| format!("Malformed address in state: {:?}", entry.address))?;
                let mut attributes = decode_config(resource.schema(), &entry.attributes).map_err(|diags| {
                    anyhow::anyhow!("State entry {} does not match its schema:\n{diags}", entry.address)
                })?;
                attributes.set_id(entry.id.clone());
                Ok(Instance {
                    address,
                    resource,
                    attributes,
                })
            })
            .collect()
    }

    /// Record `store` for `address`; a store without an identifier drops it
    pub fn upsert(&mut self, address: &Address, store: &AttributeStore) -> Result<()> {
        let Some(id) = store.id() else {
            self.remove(address);
            return Ok(());
        };
        let entry = StateEntry {
            address: address.to_string(),
            kind: address.kind.clone(),
            id: id.to_string(),
            attributes: attributes_json(store)?,
            last_synced: Utc::now(),
        };
        self.remove(address);
        self.instances.push(entry);
        Ok(())
    }

    pub fn remove(&mut self, address: &Address) -> Option<StateEntry> {
        let key = address.to_string();
        let pos = self.instances.iter().position(|e| e.address == key)?;
        Some(self.instances.remove(pos))
    }

    /// Apply execution outcomes
    ///
    /// Outcomes that changed nothing remotely keep their entry untouched,
    /// including its sync time.
    pub fn record(&mut self, outcomes: &[Outcome]) -> Result<()> {
        for outcome in outcomes {
            match &outcome.state {
                None => {
                    self.remove(&outcome.address);
                }
                Some(store) => {
                    let unchanged = self
                        .get(&outcome.address)
                        .is_some_and(|e| Some(e.id.as_str()) == store.id() && !outcome.result.is_change());
                    if !unchanged {
                        self.upsert(&outcome.address, store)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Serialize a store's attributes keyed by local field names
fn attributes_json(store: &AttributeStore) -> Result<Map<String, Json>> {
    match serde_json::to_value(store.values()).context("Failed to serialize attributes")? {
        Json::Object(map) => Ok(map),
        other => bail!("Attributes serialized to {other}, expected an object"),
    }
}
