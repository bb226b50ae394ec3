// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Available packages: PackageMetadata joined with the Packages of its family.

use super::{available_ref, group_packages, require, PackageVersions, PackagesServer};
use crate::api;
use crate::error::{PluginError, Result};
use crate::identifiers::{paginate, AvailablePackageId, RepositoryResolver};
use crate::types::{Package, PackageMetadata};
use crate::versions;
use kube::api::ListParams;
use kube::ResourceExt;
use std::collections::BTreeSet;
use tracing::{debug, instrument};

impl PackagesServer {
    #[instrument(skip(self, request), fields(namespace = %request.context.namespace))]
    pub async fn get_available_package_summaries(
        &self,
        request: api::GetAvailablePackageSummariesRequest,
    ) -> Result<api::GetAvailablePackageSummariesResponse> {
        let namespace = &request.context.namespace;
        let metadatas = self
            .api::<PackageMetadata>(namespace)
            .list(&ListParams::default())
            .await?
            .items;
        let families = group_packages(
            self.api::<Package>(namespace)
                .list(&ListParams::default())
                .await?
                .items,
        );

        let filter = &request.filter_options;
        let query = filter.query.to_lowercase();
        let mut resolver = RepositoryResolver::new(self.client.clone());
        let mut summaries = Vec::new();

        for metadata in metadatas {
            let key = (metadata.namespace().unwrap_or_default(), metadata.name_any());
            // Metadata without any Package has nothing to install
            let Some(latest) = families.get(&key).and_then(PackageVersions::latest) else {
                debug!("Skipping package metadata {} without packages", key.1);
                continue;
            };

            if !query.is_empty()
                && !metadata.name_any().to_lowercase().contains(&query)
                && !metadata.display_name().to_lowercase().contains(&query)
            {
                continue;
            }
            if !filter.categories.is_empty()
                && !metadata
                    .spec
                    .categories
                    .iter()
                    .any(|c| filter.categories.contains(c))
            {
                continue;
            }
            let id = resolver.package_id(&metadata).await?;
            if !filter.repositories.is_empty() && !filter.repositories.contains(&id.repo) {
                continue;
            }

            summaries.push(api::AvailablePackageSummary {
                available_package_ref: available_ref(
                    &request.context.cluster,
                    &key.0,
                    id.encode(),
                ),
                name: metadata.name_any(),
                latest_version: api::PackageAppVersion::from_pkg_version(latest.0.to_string()),
                icon_url: metadata.icon_url(),
                display_name: metadata.display_name(),
                short_description: metadata.spec.short_description.clone().unwrap_or_default(),
                categories: metadata.spec.categories.clone(),
            });
        }

        summaries.sort_by(|a, b| {
            (&a.name, &a.available_package_ref.context.namespace)
                .cmp(&(&b.name, &b.available_package_ref.context.namespace))
        });
        let categories: BTreeSet<String> = summaries
            .iter()
            .flat_map(|s| s.categories.iter().cloned())
            .collect();
        let (page, next_page_token) = paginate(summaries, &request.pagination_options)?;

        Ok(api::GetAvailablePackageSummariesResponse {
            available_package_summaries: page,
            next_page_token,
            categories: categories.into_iter().collect(),
        })
    }

    #[instrument(skip(self, request), fields(identifier = %request.available_package_ref.identifier))]
    pub async fn get_available_package_detail(
        &self,
        request: api::GetAvailablePackageDetailRequest,
    ) -> Result<api::GetAvailablePackageDetailResponse> {
        let reference = &request.available_package_ref;
        let namespace = &reference.context.namespace;
        require(namespace, "namespace")?;
        let id = AvailablePackageId::decode(&reference.identifier)?;

        let metadata: PackageMetadata = self.get(namespace, &id.ref_name).await?;
        let family = self.package_versions(namespace, &id.ref_name).await?;

        let (version, package) = if request.pkg_version.is_empty() {
            family
                .latest()
                .map(|(v, p)| (v.clone(), p))
                .ok_or_else(|| PluginError::not_found(format!("no versions of package {}", id.ref_name)))?
        } else {
            let requested = versions::parse(&request.pkg_version)?;
            let package = family.find(&requested).ok_or_else(|| {
                PluginError::not_found(format!(
                    "version {} of package {} not found",
                    request.pkg_version, id.ref_name
                ))
            })?;
            (requested, package)
        };

        Ok(api::GetAvailablePackageDetailResponse {
            available_package_detail: available_detail(
                available_ref(&reference.context.cluster, namespace, id.encode()),
                &metadata,
                package,
                &version,
            )?,
        })
    }

    #[instrument(skip(self, request), fields(identifier = %request.available_package_ref.identifier))]
    pub async fn get_available_package_versions(
        &self,
        request: api::GetAvailablePackageVersionsRequest,
    ) -> Result<api::GetAvailablePackageVersionsResponse> {
        let reference = &request.available_package_ref;
        require(&reference.context.namespace, "namespace")?;
        let id = AvailablePackageId::decode(&reference.identifier)?;

        let family = self
            .package_versions(&reference.context.namespace, &id.ref_name)
            .await?;

        Ok(api::GetAvailablePackageVersionsResponse {
            package_app_versions: family
                .versions()
                .iter()
                .map(|v| api::PackageAppVersion::from_pkg_version(v.to_string()))
                .collect(),
        })
    }

    /// Packages of one family in a namespace
    pub(super) async fn package_versions(
        &self,
        namespace: &str,
        ref_name: &str,
    ) -> Result<PackageVersions> {
        let params = ListParams::default().fields(&format!("spec.refName={}", ref_name));
        let packages: Vec<Package> = self
            .api::<Package>(namespace)
            .list(&params)
            .await?
            .items
            .into_iter()
            .filter(|p| p.spec.ref_name == ref_name)
            .collect();
        Ok(group_packages(packages)
            .into_values()
            .next()
            .unwrap_or(PackageVersions(Vec::new())))
    }
}

fn available_detail(
    reference: api::AvailablePackageReference,
    metadata: &PackageMetadata,
    package: &Package,
    version: &semver::Version,
) -> Result<api::AvailablePackageDetail> {
    let schema = package
        .spec
        .values_schema
        .as_ref()
        .and_then(|s| s.open_api_v3.as_ref());
    let (values_schema, default_values) = match schema {
        Some(schema) => (serde_json::to_string(schema)?, default_values_yaml(schema)?),
        None => (String::new(), String::new()),
    };
    let spec = &metadata.spec;

    Ok(api::AvailablePackageDetail {
        available_package_ref: reference,
        name: metadata.name_any(),
        version: api::PackageAppVersion::from_pkg_version(version.to_string()),
        icon_url: metadata.icon_url(),
        display_name: metadata.display_name(),
        short_description: spec.short_description.clone().unwrap_or_default(),
        long_description: spec.long_description.clone().unwrap_or_default(),
        readme: spec.long_description.clone().unwrap_or_default(),
        default_values,
        values_schema,
        maintainers: spec
            .maintainers
            .iter()
            .map(|m| api::Maintainer {
                name: m.name.clone(),
                email: String::new(),
            })
            .collect(),
        categories: spec.categories.clone(),
        release_notes: package.spec.release_notes.clone().unwrap_or_default(),
        released_at: package.spec.released_at.clone().unwrap_or_default(),
        licenses: package.spec.licenses.clone(),
        capacity_requirements_description: package
            .spec
            .capacity_requirements_description
            .clone()
            .unwrap_or_default(),
        provider_name: spec.provider_name.clone().unwrap_or_default(),
        support_description: spec.support_description.clone().unwrap_or_default(),
        ..Default::default()
    })
}

/// `default` values declared in an OpenAPI schema, nested like the values they describe
fn schema_defaults(schema: &serde_json::Value) -> Option<serde_json::Value> {
    if let Some(default) = schema.get("default") {
        return Some(default.clone());
    }
    let properties = schema.get("properties")?.as_object()?;
    let defaults: serde_json::Map<String, serde_json::Value> = properties
        .iter()
        .filter_map(|(name, property)| Some((name.clone(), schema_defaults(property)?)))
        .collect();
    (!defaults.is_empty()).then_some(serde_json::Value::Object(defaults))
}

fn default_values_yaml(schema: &serde_json::Value) -> Result<String> {
    match schema_defaults(schema) {
        Some(defaults) => serde_yaml::to_string(&defaults)
            .map_err(|e| PluginError::Internal(format!("unable to render default values: {}", e))),
        None => Ok(String::new()),
    }
}
