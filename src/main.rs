// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use kube::Client;
use tracing::info;
use tracing_subscriber::EnvFilter;

use kapp_packages_plugin::config::Config;
use kapp_packages_plugin::kubernetes::wait_for_packaging_crds;
use kapp_packages_plugin::rpc;
use kapp_packages_plugin::PackagesServer;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting kapp-controller packages plugin");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: global_packaging_namespace={}, default_upgrade_policy={}, timeout_seconds={}",
        config.plugin.global_packaging_namespace,
        config.plugin.default_upgrade_policy,
        config.plugin.timeout_seconds
    );

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    // The plugin is useless until kapp-controller's APIs are served
    info!("Waiting for kapp-controller packaging CRDs to become available...");
    wait_for_packaging_crds(&client).await?;

    let server = PackagesServer::new(client, config.plugin);
    rpc::serve(config.listen_addr, server).await
}
