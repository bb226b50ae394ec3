// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use serde::Deserialize;
use std::{env, fmt, fs, net::SocketAddr, str::FromStr};

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:50051";
pub const DEFAULT_GLOBAL_PACKAGING_NAMESPACE: &str = "kapp-controller-packaging-global";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 300;

/// Rule used to turn a pinned version into the constraint written on a PackageInstall
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UpgradePolicy {
    #[default]
    None,
    Patch,
    Minor,
    Major,
}

impl FromStr for UpgradePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" | "" => Ok(UpgradePolicy::None),
            "patch" => Ok(UpgradePolicy::Patch),
            "minor" => Ok(UpgradePolicy::Minor),
            "major" => Ok(UpgradePolicy::Major),
            other => anyhow::bail!("unknown upgrade policy '{}'", other),
        }
    }
}

impl fmt::Display for UpgradePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UpgradePolicy::None => "none",
            UpgradePolicy::Patch => "patch",
            UpgradePolicy::Minor => "minor",
            UpgradePolicy::Major => "major",
        };
        f.write_str(s)
    }
}

/// Behaviour knobs of the kapp-controller plugin, immutable once loaded
#[derive(Debug, Clone, PartialEq)]
pub struct PluginConfig {
    pub default_upgrade_policy: UpgradePolicy,
    /// `None` and `Some([])` both exclude prereleases, listed identifiers allow only those
    pub default_prereleases_version_selection: Option<Vec<String>>,
    pub default_allow_downgrades: bool,
    pub global_packaging_namespace: String,
    pub timeout_seconds: u64,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            default_upgrade_policy: UpgradePolicy::None,
            default_prereleases_version_selection: None,
            default_allow_downgrades: false,
            global_packaging_namespace: DEFAULT_GLOBAL_PACKAGING_NAMESPACE.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

// On-disk layout, shared with the other kubeapps plugins
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PluginConfigFile {
    #[serde(default)]
    core: CoreSection,
    #[serde(default)]
    kapp_controller: KappControllerSection,
}

#[derive(Deserialize, Default)]
struct CoreSection {
    #[serde(default)]
    packages: CorePackages,
}

#[derive(Deserialize, Default)]
struct CorePackages {
    #[serde(default)]
    v1alpha1: CoreV1alpha1,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct CoreV1alpha1 {
    timeout_seconds: Option<u64>,
}

#[derive(Deserialize, Default)]
struct KappControllerSection {
    #[serde(default)]
    packages: KappPackages,
}

#[derive(Deserialize, Default)]
struct KappPackages {
    #[serde(default)]
    v1alpha1: KappV1alpha1,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct KappV1alpha1 {
    default_upgrade_policy: Option<String>,
    #[serde(default)]
    default_prereleases_version_selection: Option<Vec<String>>,
    default_allow_downgrades: Option<bool>,
    global_packaging_namespace: Option<String>,
}

impl PluginConfig {
    /// Parse a plugin configuration document (YAML or JSON)
    pub fn from_yaml(content: &str) -> Result<Self> {
        let file: PluginConfigFile =
            serde_yaml::from_str(content).context("Failed to parse plugin configuration")?;
        let defaults = PluginConfig::default();
        let kapp = file.kapp_controller.packages.v1alpha1;

        let default_upgrade_policy = match kapp.default_upgrade_policy {
            Some(p) => p.parse()?,
            None => defaults.default_upgrade_policy,
        };

        Ok(PluginConfig {
            default_upgrade_policy,
            default_prereleases_version_selection: kapp.default_prereleases_version_selection,
            default_allow_downgrades: kapp
                .default_allow_downgrades
                .unwrap_or(defaults.default_allow_downgrades),
            global_packaging_namespace: kapp
                .global_packaging_namespace
                .filter(|ns| !ns.is_empty())
                .unwrap_or(defaults.global_packaging_namespace),
            timeout_seconds: file
                .core
                .packages
                .v1alpha1
                .timeout_seconds
                .unwrap_or(defaults.timeout_seconds),
        })
    }
}

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub plugin: PluginConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let listen_addr = env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string())
            .parse()
            .context("LISTEN_ADDR is not a valid socket address")?;

        let plugin = match env::var("PLUGIN_CONFIG_PATH") {
            Ok(path) => {
                let content = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read plugin configuration {}", path))?;
                PluginConfig::from_yaml(&content)?
            }
            Err(_) => PluginConfig::default(),
        };

        Ok(Config {
            listen_addr,
            plugin,
        })
    }
}
