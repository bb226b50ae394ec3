// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::annotations;
use crate::types::status::GenericStatus;
use kube::{CustomResource, ResourceExt};
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[kube(group = "packaging.carvel.dev", version = "v1alpha1", kind = "PackageInstall")]
#[kube(namespaced)]
#[kube(status = "PackageInstallStatus")]
#[serde(rename_all = "camelCase")]
pub struct PackageInstallSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_period: Option<String>,
    pub package_ref: PackageRef,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<PackageInstallValues>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canceled: Option<bool>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PackageRef {
    pub ref_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_selection: Option<VersionSelectionSemver>,
}

/// Semver range plus prerelease allowlist, as understood by kapp-controller
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VersionSelectionSemver {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub constraints: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prereleases: Option<VersionSelectionSemverPrereleases>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
pub struct VersionSelectionSemverPrereleases {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifiers: Vec<String>,
}

impl VersionSelectionSemver {
    /// Prerelease allowlist in the engine's terms
    pub fn prerelease_allowlist(&self) -> Option<&[String]> {
        self.prereleases.as_ref().map(|p| p.identifiers.as_slice())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PackageInstallValues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<ValuesSecretRef>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
pub struct ValuesSecretRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PackageInstallStatus {
    #[serde(flatten)]
    pub generic: GenericStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempted_version: Option<String>,
}

impl PackageInstall {
    pub fn ref_name(&self) -> &str {
        &self.spec.package_ref.ref_name
    }

    pub fn version_selection(&self) -> Option<&VersionSelectionSemver> {
        self.spec.package_ref.version_selection.as_ref()
    }

    /// The version kapp-controller last reconciled, or last attempted when none succeeded yet
    pub fn current_version(&self) -> Option<&str> {
        self.status.as_ref().and_then(|s| {
            s.version
                .as_deref()
                .filter(|v| !v.is_empty())
                .or_else(|| s.last_attempted_version.as_deref().filter(|v| !v.is_empty()))
        })
    }

    pub fn is_downgradable(&self) -> bool {
        self.annotations().contains_key(annotations::DOWNGRADABLE)
    }

    /// First values secret reference, if any
    pub fn values_secret_ref(&self) -> Option<&ValuesSecretRef> {
        self.spec.values.iter().find_map(|v| v.secret_ref.as_ref())
    }
}
