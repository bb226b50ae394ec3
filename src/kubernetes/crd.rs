// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! CRD availability checking utilities

use crate::constants::crd::{
    DATA_PACKAGING_GROUP, PACKAGING_GROUP, POLL_INTERVAL_SECS, POLL_MAX_INTERVAL_SECS,
};
use crate::error::Result;
use kube::{discovery::Discovery, Client};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Kinds the plugin serves, per API group
const REQUIRED_KINDS: &[(&str, &[&str])] = &[
    (PACKAGING_GROUP, &["PackageInstall", "PackageRepository"]),
    (DATA_PACKAGING_GROUP, &["Package", "PackageMetadata"]),
];

/// Wait for kapp-controller's packaging CRDs to become available in the cluster.
/// This uses exponential backoff starting at POLL_INTERVAL_SECS seconds.
pub async fn wait_for_packaging_crds(client: &Client) -> Result<()> {
    let mut interval = POLL_INTERVAL_SECS;

    loop {
        match missing_kinds(client).await {
            Ok(missing) if missing.is_empty() => {
                info!("kapp-controller packaging CRDs are available");
                return Ok(());
            }
            Ok(missing) => {
                info!(
                    "Packaging CRDs not yet available (missing {}), waiting {} seconds...",
                    missing.join(", "),
                    interval
                );
            }
            Err(e) => {
                warn!(
                    "Error checking for packaging CRDs: {}, retrying in {} seconds...",
                    e, interval
                );
            }
        }

        sleep(Duration::from_secs(interval)).await;

        // Exponential backoff with max cap
        interval = (interval * 2).min(POLL_MAX_INTERVAL_SECS);
    }
}

/// Required kinds that discovery does not report yet
async fn missing_kinds(client: &Client) -> Result<Vec<String>> {
    let groups: Vec<&str> = REQUIRED_KINDS.iter().map(|(g, _)| *g).collect();
    let discovery = Discovery::new(client.clone())
        .filter(&groups)
        .run()
        .await?;

    let mut missing = Vec::new();
    for (group_name, kinds) in REQUIRED_KINDS {
        let served: Vec<String> = discovery
            .groups()
            .filter(|g| g.name() == *group_name)
            .flat_map(|g| g.recommended_resources())
            .map(|(ar, _)| ar.kind)
            .collect();
        missing.extend(
            kinds
                .iter()
                .filter(|kind| !served.iter().any(|s| s == *kind))
                .map(|kind| format!("{}.{}", kind, group_name)),
        );
    }
    Ok(missing)
}
