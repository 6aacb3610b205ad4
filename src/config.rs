//! Provider configuration
//!
//! Settings come from `~/.config/zpa/config.toml` when it exists, then from
//! the environment and the command line (clap merges those two, flags
//! winning).

use crate::cli::ConnectionArgs;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use zpa_client::ClientConfig;

const DEFAULT_BASE_URL: &str = "https://config.private.zscaler.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Get the config directory path (~/.config/zpa)
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("zpa"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub customer_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub microtenant_id: Option<String>,
    pub timeout_secs: u64,
    pub user_agent: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            customer_id: None,
            client_id: None,
            client_secret: None,
            microtenant_id: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: None,
        }
    }
}

impl ProviderConfig {
    /// Load from `path`, or from the default location when `None`
    ///
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => config_dir()?.join("config.toml"),
        };

        if !path.exists() {
            log::debug!("Config file {} does not exist, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply environment and command-line settings on top
    pub fn with_overrides(mut self, args: &ConnectionArgs) -> Self {
        if let Some(url) = &args.base_url {
            self.base_url.clone_from(url);
        }
        let replace = |slot: &mut Option<String>, value: &Option<String>| {
            if value.is_some() {
                slot.clone_from(value);
            }
        };
        replace(&mut self.customer_id, &args.customer_id);
        replace(&mut self.client_id, &args.client_id);
        replace(&mut self.client_secret, &args.client_secret);
        replace(&mut self.microtenant_id, &args.microtenant_id);
        self
    }

    /// Reject configurations that cannot reach the API
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        for diag in validation::url(&self.base_url).iter() {
            problems.push(format!("base_url: {}", diag.detail));
        }
        let missing = [
            ("customer_id", &self.customer_id, "ZPA_CUSTOMER_ID"),
            ("client_id", &self.client_id, "ZPA_CLIENT_ID"),
            ("client_secret", &self.client_secret, "ZPA_CLIENT_SECRET"),
        ];
        for (name, value, env) in missing {
            if value.as_deref().is_none_or(str::is_empty) {
                problems.push(format!("{name} is not set (config file, --{} or {env})", name.replace('_', "-")));
            }
        }
        if self.timeout_secs == 0 {
            problems.push("timeout_secs must be greater than zero".to_string());
        }

        if !problems.is_empty() {
            bail!("Invalid provider configuration:\n  {}", problems.join("\n  "));
        }
        Ok(())
    }

    /// Build the REST client settings; call [`Self::validate`] first
    pub fn to_client_config(&self) -> Result<ClientConfig> {
        self.validate()?;
        let field = |v: &Option<String>| v.clone().unwrap_or_default();
        let mut config = ClientConfig::new(
            self.base_url.trim_end_matches('/'),
            field(&self.customer_id),
            field(&self.client_id),
            field(&self.client_secret),
        );
        config.microtenant_id = self.microtenant_id.clone().filter(|s| !s.is_empty());
        config.timeout = Duration::from_secs(self.timeout_secs);
        if let Some(agent) = &self.user_agent {
            config.user_agent.clone_from(agent);
        }
        Ok(config)
    }
}
