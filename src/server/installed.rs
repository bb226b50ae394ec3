// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Installed packages: PackageInstalls, their values secrets and deployed resources.

use super::{available_ref, group_packages, require, PackageVersions, PackagesServer};
use crate::api;
use crate::auth::secrets::{is_plugin_managed, secret_string};
use crate::constants::{annotations, secrets as keys, UNKNOWN_REPO};
use crate::error::{PluginError, Result};
use crate::identifiers::{paginate, AvailablePackageId, RepositoryResolver};
use crate::kubernetes::resource_refs;
use crate::policy;
use crate::status::{normalize, Readiness};
use crate::translate::validate_interval;
use crate::types::package_install::{
    PackageInstallSpec, PackageInstallValues, PackageRef, ValuesSecretRef,
};
use crate::types::{Package, PackageInstall, PackageMetadata};
use crate::versions::{self, Constraint};
use k8s_openapi::api::core::v1::Secret;
use kube::api::{DeleteParams, ListParams, ObjectMeta, Patch, PatchParams, PostParams};
use kube::{Api, ResourceExt};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, instrument, warn};

fn values_secret_name(install_name: &str) -> String {
    format!("{}-values", install_name)
}

fn installed_ref(cluster: &str, namespace: &str, name: &str) -> api::InstalledPackageReference {
    api::InstalledPackageReference {
        context: api::Context {
            cluster: cluster.to_string(),
            namespace: namespace.to_string(),
        },
        identifier: name.to_string(),
        plugin: api::Plugin::default(),
    }
}

fn installed_status(install: &PackageInstall) -> api::InstalledPackageStatus {
    let normalized = normalize(
        install.status.as_ref().map(|s| &s.generic),
        install.metadata.generation,
    );
    let reason = match normalized.readiness {
        Readiness::Installed => api::InstalledPackageStatusReason::StatusReasonInstalled,
        Readiness::Pending => api::InstalledPackageStatusReason::StatusReasonPending,
        Readiness::Failed => api::InstalledPackageStatusReason::StatusReasonFailed,
        Readiness::Unspecified => api::InstalledPackageStatusReason::StatusReasonUnspecified,
    };
    api::InstalledPackageStatus {
        ready: normalized.is_ready(),
        reason,
        user_reason: normalized.message,
    }
}

/// Current, latest and latest-within-constraint versions of an install
struct VersionReport {
    current: api::PackageAppVersion,
    latest: api::PackageAppVersion,
    latest_matching: Option<api::PackageAppVersion>,
}

fn version_report(install: &PackageInstall, family: Option<&PackageVersions>) -> VersionReport {
    let available = family.map(PackageVersions::versions).unwrap_or_default();
    let latest = versions::latest(&available)
        .map(|v| api::PackageAppVersion::from_pkg_version(v.to_string()))
        .unwrap_or_default();

    let latest_matching = install.version_selection().and_then(|selection| {
        let constraint: Constraint = match selection.constraints.parse() {
            Ok(c) => c,
            Err(e) => {
                warn!(
                    "PackageInstall {} has an unusable version constraint: {}",
                    install.name_any(),
                    e
                );
                return None;
            }
        };
        versions::latest_matching(&available, &constraint, selection.prerelease_allowlist())
            .map(|v| api::PackageAppVersion::from_pkg_version(v.to_string()))
    });

    VersionReport {
        current: install
            .current_version()
            .map(api::PackageAppVersion::from_pkg_version)
            .unwrap_or_default(),
        latest,
        latest_matching,
    }
}

fn constraint_reference(install: &PackageInstall) -> api::VersionReference {
    api::VersionReference {
        version: install
            .version_selection()
            .map(|s| s.constraints.clone())
            .unwrap_or_default(),
    }
}

fn validate_values(values: &str) -> Result<()> {
    serde_yaml::from_str::<serde_yaml::Value>(values)
        .map(|_| ())
        .map_err(|e| PluginError::invalid(format!("values are not valid YAML: {}", e)))
}

impl PackagesServer {
    #[instrument(skip(self, request), fields(namespace = %request.context.namespace))]
    pub async fn get_installed_package_summaries(
        &self,
        request: api::GetInstalledPackageSummariesRequest,
    ) -> Result<api::GetInstalledPackageSummariesResponse> {
        let namespace = &request.context.namespace;
        let mut installs = self
            .api::<PackageInstall>(namespace)
            .list(&ListParams::default())
            .await?
            .items;
        installs.sort_by_key(|i| (i.namespace().unwrap_or_default(), i.name_any()));
        let (page, next_page_token) = paginate(installs, &request.pagination_options)?;
        if page.is_empty() {
            return Ok(api::GetInstalledPackageSummariesResponse {
                installed_package_summaries: Vec::new(),
                next_page_token,
            });
        }

        let metadatas: HashMap<(String, String), PackageMetadata> = self
            .api::<PackageMetadata>(namespace)
            .list(&ListParams::default())
            .await?
            .items
            .into_iter()
            .map(|m| ((m.namespace().unwrap_or_default(), m.name_any()), m))
            .collect();
        let families = group_packages(
            self.api::<Package>(namespace)
                .list(&ListParams::default())
                .await?
                .items,
        );

        let summaries = page
            .iter()
            .map(|install| {
                let key = (install.namespace().unwrap_or_default(), install.ref_name().to_string());
                let metadata = metadatas.get(&key);
                let report = version_report(install, families.get(&key));
                api::InstalledPackageSummary {
                    installed_package_ref: installed_ref(
                        &request.context.cluster,
                        &key.0,
                        &install.name_any(),
                    ),
                    name: install.name_any(),
                    pkg_version_reference: constraint_reference(install),
                    current_version: report.current,
                    icon_url: metadata.map(|m| m.icon_url()).unwrap_or_default(),
                    pkg_display_name: metadata
                        .map(|m| m.display_name())
                        .unwrap_or_else(|| install.ref_name().to_string()),
                    short_description: metadata
                        .and_then(|m| m.spec.short_description.clone())
                        .unwrap_or_default(),
                    latest_matching_version: report.latest_matching,
                    latest_version: report.latest,
                    status: installed_status(install),
                }
            })
            .collect();

        Ok(api::GetInstalledPackageSummariesResponse {
            installed_package_summaries: summaries,
            next_page_token,
        })
    }

    #[instrument(skip(self, request), fields(installed = %request.installed_package_ref.identifier))]
    pub async fn get_installed_package_detail(
        &self,
        request: api::GetInstalledPackageDetailRequest,
    ) -> Result<api::GetInstalledPackageDetailResponse> {
        let reference = &request.installed_package_ref;
        let namespace = &reference.context.namespace;
        require(namespace, "namespace")?;
        require(&reference.identifier, "installed package identifier")?;

        let install: PackageInstall = self.get(namespace, &reference.identifier).await?;
        let metadatas: Api<PackageMetadata> = Api::namespaced(self.client.clone(), namespace);
        let metadata = metadatas.get_opt(install.ref_name()).await?;
        let family = self.package_versions(namespace, install.ref_name()).await?;
        let report = version_report(&install, Some(&family));

        let available_id = match &metadata {
            Some(metadata) => {
                RepositoryResolver::new(self.client.clone())
                    .package_id(metadata)
                    .await?
            }
            None => AvailablePackageId::new(UNKNOWN_REPO, install.ref_name()),
        };

        let post_installation_notes = install
            .current_version()
            .and_then(|v| versions::parse(v).ok())
            .and_then(|v| family.find(&v))
            .and_then(|p| p.spec.release_notes.clone())
            .unwrap_or_default();

        let spec = &install.spec;
        Ok(api::GetInstalledPackageDetailResponse {
            installed_package_detail: api::InstalledPackageDetail {
                installed_package_ref: installed_ref(
                    &reference.context.cluster,
                    namespace,
                    &install.name_any(),
                ),
                pkg_version_reference: constraint_reference(&install),
                name: install.name_any(),
                current_version: report.current,
                values_applied: self.applied_values(namespace, &install).await?,
                reconciliation_options: api::ReconciliationOptions {
                    interval: spec.sync_period.clone().unwrap_or_default(),
                    suspend: spec.paused.unwrap_or(false),
                    service_account_name: spec.service_account_name.clone().unwrap_or_default(),
                },
                status: installed_status(&install),
                post_installation_notes,
                available_package_ref: available_ref(
                    &reference.context.cluster,
                    namespace,
                    available_id.encode(),
                ),
                latest_matching_version: report.latest_matching,
                latest_version: report.latest,
            },
        })
    }

    /// Values currently referenced by the install; empty when there are none
    async fn applied_values(&self, namespace: &str, install: &PackageInstall) -> Result<String> {
        let Some(secret_ref) = install.values_secret_ref() else {
            return Ok(String::new());
        };
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let Some(secret) = secrets.get_opt(&secret_ref.name).await? else {
            warn!(
                "Values secret {} of PackageInstall {} does not exist",
                secret_ref.name,
                install.name_any()
            );
            return Ok(String::new());
        };
        let key = secret_ref.key.as_deref().unwrap_or(keys::KEY_VALUES);
        Ok(secret_string(&secret, key).unwrap_or_default())
    }

    #[instrument(skip(self, request), fields(name = %request.name, namespace = %request.target_context.namespace))]
    pub async fn create_installed_package(
        &self,
        request: api::CreateInstalledPackageRequest,
    ) -> Result<api::CreateInstalledPackageResponse> {
        require(&request.name, "name")?;
        require(&request.target_context.namespace, "target namespace")?;
        require(&request.pkg_version_reference.version, "package version")?;
        let options = request.reconciliation_options.clone().unwrap_or_default();
        require(&options.service_account_name, "service account name")?;
        validate_interval(&options.interval)?;
        if !request.values.is_empty() {
            validate_values(&request.values)?;
        }

        let id = AvailablePackageId::decode(&request.available_package_ref.identifier)?;
        let namespace = request.target_context.namespace.as_str();
        let package_namespace = match request.available_package_ref.context.namespace.as_str() {
            "" => namespace,
            ns => ns,
        };

        let version = versions::parse(&request.pkg_version_reference.version)?;
        let family = self.package_versions(package_namespace, &id.ref_name).await?;
        if family.find(&version).is_none() {
            return Err(PluginError::not_found(format!(
                "version {} of package {} not found",
                version, id.ref_name
            )));
        }
        policy::validate_prerelease(&version, &self.config)?;
        let selection = policy::version_selection(&version, &self.config)?;

        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let values_ref = if request.values.is_empty() {
            None
        } else {
            let secret = values_secret(namespace, &request.name, &request.values);
            let created = secrets.create(&PostParams::default(), &secret).await?;
            debug!("Created values secret {}", created.name_any());
            Some(created.name_any())
        };

        let mut install = PackageInstall::new(
            &request.name,
            PackageInstallSpec {
                service_account_name: Some(options.service_account_name.clone()),
                sync_period: Some(options.interval.clone()).filter(|i| !i.is_empty()),
                package_ref: PackageRef {
                    ref_name: id.ref_name.clone(),
                    version_selection: Some(selection),
                },
                values: values_ref
                    .iter()
                    .map(|name| PackageInstallValues {
                        secret_ref: Some(ValuesSecretRef {
                            name: name.clone(),
                            key: Some(keys::KEY_VALUES.to_string()),
                        }),
                    })
                    .collect(),
                paused: options.suspend.then_some(true),
                canceled: None,
            },
        );
        install.metadata.namespace = Some(namespace.to_string());
        if self.config.default_allow_downgrades {
            install
                .annotations_mut()
                .insert(annotations::DOWNGRADABLE.to_string(), String::new());
        }

        let installs: Api<PackageInstall> = Api::namespaced(self.client.clone(), namespace);
        if let Err(e) = installs.create(&PostParams::default(), &install).await {
            if let Some(name) = &values_ref {
                if let Err(cleanup) = secrets.delete(name, &DeleteParams::default()).await {
                    warn!("Failed to delete values secret {}: {}", name, cleanup);
                }
            }
            return Err(PluginError::from(e).context(format!(
                "unable to create PackageInstall {}/{}",
                namespace, request.name
            )));
        }
        info!("Created PackageInstall {}/{}", namespace, request.name);

        Ok(api::CreateInstalledPackageResponse {
            installed_package_ref: installed_ref(
                &request.target_context.cluster,
                namespace,
                &request.name,
            ),
        })
    }

    #[instrument(skip(self, request), fields(installed = %request.installed_package_ref.identifier))]
    pub async fn update_installed_package(
        &self,
        request: api::UpdateInstalledPackageRequest,
    ) -> Result<api::UpdateInstalledPackageResponse> {
        let reference = &request.installed_package_ref;
        let namespace = reference.context.namespace.as_str();
        let name = reference.identifier.as_str();
        require(namespace, "namespace")?;
        require(name, "installed package identifier")?;
        require(&request.pkg_version_reference.version, "package version")?;
        if let Some(values) = request.values.as_deref().filter(|v| !v.is_empty()) {
            validate_values(values)?;
        }
        if let Some(options) = &request.reconciliation_options {
            validate_interval(&options.interval)?;
        }

        let install: PackageInstall = self.get(namespace, name).await?;
        let version = versions::parse(&request.pkg_version_reference.version)?;
        let family = self.package_versions(namespace, install.ref_name()).await?;
        if family.find(&version).is_none() {
            return Err(PluginError::not_found(format!(
                "version {} of package {} not found",
                version,
                install.ref_name()
            )));
        }
        policy::validate_prerelease(&version, &self.config)?;
        policy::validate_downgrade(
            &version,
            install.current_version(),
            self.config.default_allow_downgrades || install.is_downgradable(),
        )?;

        let selection = policy::version_selection(&version, &self.config)?;
        let mut spec = serde_json::json!({
            "packageRef": {
                "versionSelection": {
                    "constraints": selection.constraints,
                    "prereleases": selection.prereleases,
                }
            }
        });
        if let Some(options) = &request.reconciliation_options {
            if !options.service_account_name.is_empty() {
                spec["serviceAccountName"] = options.service_account_name.clone().into();
            }
            if !options.interval.is_empty() {
                spec["syncPeriod"] = options.interval.clone().into();
            }
            spec["paused"] = if options.suspend {
                true.into()
            } else {
                serde_json::Value::Null
            };
        }

        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let mut created_values = None;
        let mut stale_values = None;
        match request.values.as_deref() {
            None => {}
            Some("") => {
                spec["values"] = serde_json::Value::Null;
                stale_values = install.values_secret_ref().map(|r| r.name.clone());
            }
            Some(values) => {
                let secret_name = values_secret_name(name);
                if secrets.get_opt(&secret_name).await?.is_some() {
                    let patch = serde_json::json!({ "stringData": { (keys::KEY_VALUES): values } });
                    secrets
                        .patch(&secret_name, &PatchParams::default(), &Patch::Merge(&patch))
                        .await?;
                } else {
                    secrets
                        .create(&PostParams::default(), &values_secret(namespace, name, values))
                        .await?;
                    created_values = Some(secret_name.clone());
                }
                spec["values"] = serde_json::json!([
                    { "secretRef": { "name": secret_name, "key": keys::KEY_VALUES } }
                ]);
            }
        }

        let patch = serde_json::json!({
            "metadata": { "resourceVersion": install.resource_version() },
            "spec": spec,
        });
        let installs: Api<PackageInstall> = Api::namespaced(self.client.clone(), namespace);
        if let Err(e) = installs
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
        {
            if let Some(created) = created_values {
                self.delete_values_secret(&secrets, &created).await;
            }
            return Err(PluginError::from(e)
                .context(format!("unable to update PackageInstall {}/{}", namespace, name)));
        }
        info!("Updated PackageInstall {}/{}", namespace, name);

        if let Some(stale) = stale_values {
            self.delete_values_secret(&secrets, &stale).await;
        }

        Ok(api::UpdateInstalledPackageResponse {
            installed_package_ref: installed_ref(&reference.context.cluster, namespace, name),
        })
    }

    #[instrument(skip(self, request), fields(installed = %request.installed_package_ref.identifier))]
    pub async fn delete_installed_package(
        &self,
        request: api::DeleteInstalledPackageRequest,
    ) -> Result<api::DeleteInstalledPackageResponse> {
        let reference = &request.installed_package_ref;
        let namespace = reference.context.namespace.as_str();
        let name = reference.identifier.as_str();
        require(namespace, "namespace")?;
        require(name, "installed package identifier")?;

        let install: PackageInstall = self.get(namespace, name).await?;
        let installs: Api<PackageInstall> = Api::namespaced(self.client.clone(), namespace);
        installs
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|e| {
                PluginError::from(e)
                    .context(format!("unable to delete PackageInstall {}/{}", namespace, name))
            })?;
        info!("Deleted PackageInstall {}/{}", namespace, name);

        if let Some(secret_ref) = install.values_secret_ref() {
            let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
            self.delete_values_secret(&secrets, &secret_ref.name).await;
        }
        Ok(api::DeleteInstalledPackageResponse {})
    }

    #[instrument(skip(self, request), fields(installed = %request.installed_package_ref.identifier))]
    pub async fn get_installed_package_resource_refs(
        &self,
        request: api::GetInstalledPackageResourceRefsRequest,
    ) -> Result<api::GetInstalledPackageResourceRefsResponse> {
        let reference = request.installed_package_ref;
        require(&reference.context.namespace, "namespace")?;
        require(&reference.identifier, "installed package identifier")?;

        let refs = resource_refs(
            &self.client,
            &reference.context.namespace,
            &reference.identifier,
        )
        .await?;
        Ok(api::GetInstalledPackageResourceRefsResponse {
            context: reference.context,
            resource_refs: refs,
        })
    }

    /// Delete a values secret, but only one this plugin created
    async fn delete_values_secret(&self, secrets: &Api<Secret>, name: &str) {
        match secrets.get_opt(name).await {
            Ok(Some(secret)) if is_plugin_managed(&secret) => {
                match secrets.delete(name, &DeleteParams::default()).await {
                    Ok(_) => debug!("Deleted values secret {}", name),
                    Err(e) => warn!("Failed to delete values secret {}: {}", name, e),
                }
            }
            Ok(_) => debug!("Leaving values secret {} in place", name),
            Err(e) => warn!("Failed to read values secret {}: {}", name, e),
        }
    }
}

fn values_secret(namespace: &str, install_name: &str, values: &str) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(values_secret_name(install_name)),
            namespace: Some(namespace.to_string()),
            annotations: Some(BTreeMap::from([(
                annotations::MANAGED_BY.to_string(),
                annotations::MANAGED_BY_VALUE.to_string(),
            )])),
            ..Default::default()
        },
        type_: Some(keys::TYPE_OPAQUE.to_string()),
        string_data: Some(BTreeMap::from([(
            keys::KEY_VALUES.to_string(),
            values.to_string(),
        )])),
        ..Default::default()
    }
}
