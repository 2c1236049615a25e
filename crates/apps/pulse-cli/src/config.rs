use anyhow::{Context, Result};
use pulse_sdk::IdentityContext;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_STORAGE_FILE: &str = "pulse-notifications.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PulseConfig {
    pub server_addr: String,
    pub storage_path: Option<String>,
    pub brand: Option<String>,
    pub identity: IdentitySection,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:4780".to_string(),
            storage_path: None,
            brand: None,
            identity: IdentitySection::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IdentitySection {
    pub user_id: String,
    pub full_name: String,
    pub is_admin: bool,
    pub roles: Vec<String>,
    pub assigned_brands: Vec<String>,
}

impl IdentitySection {
    pub fn to_context(&self) -> IdentityContext {
        IdentityContext {
            user_id: self.user_id.clone(),
            full_name: self.full_name.clone(),
            is_admin: self.is_admin,
            roles: self.roles.clone(),
            assigned_brands: self.assigned_brands.clone(),
        }
    }
}

impl PulseConfig {
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// Missing file falls back to defaults so local-only commands work
    /// without any setup.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from_path(path)
        } else {
            log::debug!("no config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn storage_file(&self) -> PathBuf {
        self.storage_path
            .as_deref()
            .unwrap_or(DEFAULT_STORAGE_FILE)
            .into()
    }

    pub fn example_toml() -> String {
        let example = Self {
            server_addr: "127.0.0.1:4780".to_string(),
            storage_path: Some(DEFAULT_STORAGE_FILE.to_string()),
            brand: Some("brand-1".to_string()),
            identity: IdentitySection {
                user_id: "u-1001".to_string(),
                full_name: "Asha Rao".to_string(),
                is_admin: false,
                roles: vec!["sales".to_string()],
                assigned_brands: vec!["brand-1".to_string(), "brand-2".to_string()],
            },
        };
        toml::to_string_pretty(&example).expect("valid example config")
    }
}
