// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The packages and repositories API, served from kapp-controller resources.

mod available;
mod installed;
mod repositories;

use crate::api;
use crate::config::PluginConfig;
use crate::error::{PluginError, Result};
use crate::types::Package;
use crate::versions;
use k8s_openapi::NamespaceResourceScope;
use kube::{Api, Client, Resource};
use semver::Version;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct PackagesServer {
    client: Client,
    config: Arc<PluginConfig>,
}

impl PackagesServer {
    pub fn new(client: Client, config: PluginConfig) -> Self {
        Self {
            client,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// Namespaced Api, or across all namespaces when `namespace` is empty
    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        if namespace.is_empty() {
            Api::all(self.client.clone())
        } else {
            Api::namespaced(self.client.clone(), namespace)
        }
    }

    /// Fetch a namespaced object, NotFound when it does not exist
    async fn get<K>(&self, namespace: &str, name: &str) -> Result<K>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + std::fmt::Debug,
        <K as Resource>::DynamicType: Default,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name).await?.ok_or_else(|| {
            PluginError::not_found(format!(
                "{} {}/{} not found",
                K::kind(&Default::default()),
                namespace,
                name
            ))
        })
    }
}

fn require(value: &str, what: &str) -> Result<()> {
    if value.is_empty() {
        return Err(PluginError::invalid(format!("no {} provided", what)));
    }
    Ok(())
}

/// Packages of one family, newest first
pub(crate) struct PackageVersions(Vec<(Version, Package)>);

impl PackageVersions {
    pub fn latest(&self) -> Option<&(Version, Package)> {
        self.0.first()
    }

    pub fn find(&self, version: &Version) -> Option<&Package> {
        self.0.iter().find(|(v, _)| v == version).map(|(_, p)| p)
    }

    pub fn versions(&self) -> Vec<Version> {
        self.0.iter().map(|(v, _)| v.clone()).collect()
    }
}

/// Group packages by `(namespace, refName)`; unparseable versions are skipped
pub(crate) fn group_packages(packages: Vec<Package>) -> HashMap<(String, String), PackageVersions> {
    let mut grouped: HashMap<(String, String), Vec<(Version, Package)>> = HashMap::new();
    for package in packages {
        let version = match versions::parse(&package.spec.version) {
            Ok(v) => v,
            Err(e) => {
                warn!(
                    "Ignoring package {} with invalid version '{}': {}",
                    package.spec.ref_name, package.spec.version, e
                );
                continue;
            }
        };
        let key = (
            package.metadata.namespace.clone().unwrap_or_default(),
            package.spec.ref_name.clone(),
        );
        grouped.entry(key).or_default().push((version, package));
    }
    grouped
        .into_iter()
        .map(|(key, mut list)| {
            list.sort_by(|a, b| b.0.cmp(&a.0));
            (key, PackageVersions(list))
        })
        .collect()
}

fn available_ref(cluster: &str, namespace: &str, identifier: String) -> api::AvailablePackageReference {
    api::AvailablePackageReference {
        context: api::Context {
            cluster: cluster.to_string(),
            namespace: namespace.to_string(),
        },
        identifier,
        plugin: api::Plugin::default(),
    }
}
