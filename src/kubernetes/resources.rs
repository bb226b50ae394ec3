// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Objects deployed for an installed package, found through the label kapp stamps on them.

use crate::api::ResourceRef;
use crate::constants::KAPP_APP_SUFFIX;
use crate::error::{PluginError, Result};
use crate::types::App;
use futures::future::join_all;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::{ApiResource, DynamicObject, ListParams};
use kube::discovery::{verbs, Discovery};
use kube::{Api, Client, ResourceExt};
use serde::Deserialize;
use tracing::{debug, instrument};

/// The `spec` entry of the ConfigMap kapp keeps for every app
#[derive(Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
struct KappAppSpec {
    label_key: String,
    label_value: String,
}

fn label_selector(config_map: &ConfigMap) -> Result<String> {
    let raw = config_map
        .data
        .as_ref()
        .and_then(|d| d.get("spec"))
        .ok_or_else(|| {
            PluginError::Internal(format!(
                "kapp ConfigMap {} has no spec entry",
                config_map.name_any()
            ))
        })?;
    let spec: KappAppSpec = serde_json::from_str(raw).map_err(|e| {
        PluginError::Internal(format!(
            "unable to parse the spec of kapp ConfigMap {}: {}",
            config_map.name_any(),
            e
        ))
    })?;
    Ok(format!("{}={}", spec.label_key, spec.label_value))
}

/// References to every live object deployed for the installed package `name`
#[instrument(skip(client))]
pub async fn resource_refs(client: &Client, namespace: &str, name: &str) -> Result<Vec<ResourceRef>> {
    let apps: Api<App> = Api::namespaced(client.clone(), namespace);
    apps.get_opt(name).await?.ok_or_else(|| {
        PluginError::not_found(format!(
            "unable to find the App for installed package {}/{}",
            namespace, name
        ))
    })?;

    let config_maps: Api<ConfigMap> = Api::namespaced(client.clone(), namespace);
    let config_map_name = format!("{}{}", name, KAPP_APP_SUFFIX);
    let config_map = config_maps.get_opt(&config_map_name).await?.ok_or_else(|| {
        PluginError::not_found(format!(
            "unable to find the kapp ConfigMap {}/{}",
            namespace, config_map_name
        ))
    })?;
    let selector = label_selector(&config_map)?;

    let discovery = Discovery::new(client.clone())
        .run()
        .await
        .map_err(|e| PluginError::Internal(format!("unable to discover resource kinds: {}", e)))?;

    let listable: Vec<ApiResource> = discovery
        .groups()
        .flat_map(|g| g.recommended_resources())
        .filter(|(_, caps)| caps.supports_operation(verbs::LIST))
        .map(|(ar, _)| ar)
        .collect();
    debug!(
        "Listing {} resource kinds with selector {}",
        listable.len(),
        selector
    );

    let params = ListParams::default().labels(&selector);
    let lists = join_all(listable.iter().map(|ar| {
        let api: Api<DynamicObject> = Api::all_with(client.clone(), ar);
        let params = params.clone();
        async move { (ar, api.list(&params).await) }
    }))
    .await;

    let mut refs = Vec::new();
    for (ar, list) in lists {
        match list {
            Ok(list) => refs.extend(list.items.into_iter().map(|obj| ResourceRef {
                api_version: ar.api_version.clone(),
                kind: ar.kind.clone(),
                namespace: obj.namespace().unwrap_or_default(),
                name: obj.name_any(),
            })),
            // Kinds the caller may not list are left out
            Err(e) => debug!("Skipping {}: {}", ar.kind, e),
        }
    }
    refs.sort_by(|a, b| {
        (&a.api_version, &a.kind, &a.namespace, &a.name)
            .cmp(&(&b.api_version, &b.kind, &b.namespace, &b.name))
    });
    Ok(refs)
}
