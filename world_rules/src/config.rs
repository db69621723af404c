//! Naming configuration for graphs and explorations.
//!
//! Every reserved name the model relies on lives here so that an application
//! can move them out of the way of its own decision and transition names.
//! Configuration is read from TOML; omitted keys keep their defaults.
//!
//! ```toml
//! [naming]
//! unknown_prefix = "?:"
//! return_transition = "back"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{RulesError, RulesResult};

/// Reserved names and prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Prefix of minted placeholder decision names.
    pub unknown_prefix: String,
    /// Prefix of ending decision names.
    pub ending_prefix: String,
    /// Tag carried by every placeholder decision.
    pub unknown_tag: String,
    /// Tag carried by ending decisions and the transitions leading to them.
    pub ending_tag: String,
    /// Name of the reciprocal added from a placeholder back to its source.
    pub return_transition: String,
    pub warp_prefix: String,
    /// Used instead of `warp_prefix` when a warp stays at the same decision.
    pub wait_prefix: String,
    /// Separator between a base name and its numeric uniqueness suffix.
    pub suffix_separator: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            unknown_prefix: "_u:".to_string(),
            ending_prefix: "_e:".to_string(),
            unknown_tag: "unknown".to_string(),
            ending_tag: "ending".to_string(),
            return_transition: "return".to_string(),
            warp_prefix: "~~".to_string(),
            wait_prefix: "..".to_string(),
            suffix_separator: ".".to_string(),
        }
    }
}

impl NamingConfig {
    /// Name of the placeholder minted with the given counter value.
    pub fn placeholder_name(&self, counter: u64) -> String {
        format!("{}{}", self.unknown_prefix, counter)
    }

    /// Name of the shared decision for an ending.
    pub fn ending_name(&self, ending: &str) -> String {
        format!("{}{}", self.ending_prefix, ending)
    }

    pub fn is_placeholder_name(&self, name: &str) -> bool {
        name.starts_with(&self.unknown_prefix)
    }

    pub fn is_ending_name(&self, name: &str) -> bool {
        name.starts_with(&self.ending_prefix)
    }

    /// Transition name recorded for a warp (or a wait when `stays_put`).
    pub fn warp_name(&self, stays_put: bool, message: Option<&str>) -> String {
        let prefix = if stays_put {
            &self.wait_prefix
        } else {
            &self.warp_prefix
        };
        match message {
            Some(msg) if !msg.is_empty() => format!("{}:{}", prefix, msg),
            _ => prefix.clone(),
        }
    }
}

/// Top-level configuration of an exploration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorationConfig {
    pub naming: NamingConfig,
}

impl ExplorationConfig {
    pub fn from_toml_str(text: &str) -> RulesResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> RulesResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| RulesError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}
