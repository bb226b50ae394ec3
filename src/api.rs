// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Request and response messages of the packages and repositories API.
//!
//! Field names follow the kubeapps packages API (camelCase on the wire). Every
//! message has a `Default` so clients can omit anything they don't care about.

use crate::constants::plugin;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Context {
    pub cluster: String,
    pub namespace: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Plugin {
    pub name: String,
    pub version: String,
}

impl Default for Plugin {
    fn default() -> Self {
        Self {
            name: plugin::NAME.to_string(),
            version: plugin::VERSION.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AvailablePackageReference {
    pub context: Context,
    pub identifier: String,
    pub plugin: Plugin,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct InstalledPackageReference {
    pub context: Context,
    pub identifier: String,
    pub plugin: Plugin,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PackageRepositoryReference {
    pub context: Context,
    pub identifier: String,
    pub plugin: Plugin,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PaginationOptions {
    pub page_token: String,
    pub page_size: i32,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterOptions {
    pub query: String,
    pub categories: Vec<String>,
    pub repositories: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PackageAppVersion {
    pub pkg_version: String,
    pub app_version: String,
}

impl PackageAppVersion {
    /// kapp-controller packages carry a single version for both
    pub fn from_pkg_version(version: impl Into<String>) -> Self {
        let version = version.into();
        Self {
            app_version: version.clone(),
            pkg_version: version,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct VersionReference {
    pub version: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Maintainer {
    pub name: String,
    pub email: String,
}

// --- available packages ---

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AvailablePackageSummary {
    pub available_package_ref: AvailablePackageReference,
    pub name: String,
    pub latest_version: PackageAppVersion,
    pub icon_url: String,
    pub display_name: String,
    pub short_description: String,
    pub categories: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AvailablePackageDetail {
    pub available_package_ref: AvailablePackageReference,
    pub name: String,
    pub version: PackageAppVersion,
    pub repo_url: String,
    pub home_url: String,
    pub icon_url: String,
    pub display_name: String,
    pub short_description: String,
    pub long_description: String,
    pub readme: String,
    pub default_values: String,
    pub values_schema: String,
    pub source_urls: Vec<String>,
    pub maintainers: Vec<Maintainer>,
    pub categories: Vec<String>,
    pub release_notes: String,
    pub released_at: String,
    pub licenses: Vec<String>,
    pub capacity_requirements_description: String,
    pub provider_name: String,
    pub support_description: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GetAvailablePackageSummariesRequest {
    pub context: Context,
    pub filter_options: FilterOptions,
    pub pagination_options: PaginationOptions,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GetAvailablePackageSummariesResponse {
    pub available_package_summaries: Vec<AvailablePackageSummary>,
    pub next_page_token: String,
    pub categories: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GetAvailablePackageDetailRequest {
    pub available_package_ref: AvailablePackageReference,
    pub pkg_version: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GetAvailablePackageDetailResponse {
    pub available_package_detail: AvailablePackageDetail,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GetAvailablePackageVersionsRequest {
    pub available_package_ref: AvailablePackageReference,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GetAvailablePackageVersionsResponse {
    pub package_app_versions: Vec<PackageAppVersion>,
}

// --- installed packages ---

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstalledPackageStatusReason {
    #[default]
    StatusReasonUnspecified,
    StatusReasonInstalled,
    StatusReasonUninstalled,
    StatusReasonFailed,
    StatusReasonPending,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct InstalledPackageStatus {
    pub ready: bool,
    pub reason: InstalledPackageStatusReason,
    pub user_reason: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ReconciliationOptions {
    /// kapp-controller sync period, a Go duration such as `10m`
    pub interval: String,
    pub suspend: bool,
    pub service_account_name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct InstalledPackageSummary {
    pub installed_package_ref: InstalledPackageReference,
    pub name: String,
    pub pkg_version_reference: VersionReference,
    pub current_version: PackageAppVersion,
    pub icon_url: String,
    pub pkg_display_name: String,
    pub short_description: String,
    /// Absent when no available version satisfies the install's constraint
    pub latest_matching_version: Option<PackageAppVersion>,
    pub latest_version: PackageAppVersion,
    pub status: InstalledPackageStatus,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct InstalledPackageDetail {
    pub installed_package_ref: InstalledPackageReference,
    pub pkg_version_reference: VersionReference,
    pub name: String,
    pub current_version: PackageAppVersion,
    pub values_applied: String,
    pub reconciliation_options: ReconciliationOptions,
    pub status: InstalledPackageStatus,
    pub post_installation_notes: String,
    pub available_package_ref: AvailablePackageReference,
    pub latest_matching_version: Option<PackageAppVersion>,
    pub latest_version: PackageAppVersion,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GetInstalledPackageSummariesRequest {
    pub context: Context,
    pub pagination_options: PaginationOptions,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GetInstalledPackageSummariesResponse {
    pub installed_package_summaries: Vec<InstalledPackageSummary>,
    pub next_page_token: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GetInstalledPackageDetailRequest {
    pub installed_package_ref: InstalledPackageReference,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GetInstalledPackageDetailResponse {
    pub installed_package_detail: InstalledPackageDetail,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateInstalledPackageRequest {
    pub available_package_ref: AvailablePackageReference,
    pub target_context: Context,
    pub name: String,
    pub pkg_version_reference: VersionReference,
    pub values: String,
    pub reconciliation_options: Option<ReconciliationOptions>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateInstalledPackageResponse {
    pub installed_package_ref: InstalledPackageReference,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateInstalledPackageRequest {
    pub installed_package_ref: InstalledPackageReference,
    pub pkg_version_reference: VersionReference,
    /// `None` leaves the values untouched, an empty string removes them
    pub values: Option<String>,
    pub reconciliation_options: Option<ReconciliationOptions>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateInstalledPackageResponse {
    pub installed_package_ref: InstalledPackageReference,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DeleteInstalledPackageRequest {
    pub installed_package_ref: InstalledPackageReference,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct DeleteInstalledPackageResponse {}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceRef {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub namespace: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GetInstalledPackageResourceRefsRequest {
    pub installed_package_ref: InstalledPackageReference,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GetInstalledPackageResourceRefsResponse {
    pub context: Context,
    pub resource_refs: Vec<ResourceRef>,
}

// --- repositories ---

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PackageRepositoryStatusReason {
    #[default]
    StatusReasonUnspecified,
    StatusReasonSuccess,
    StatusReasonFailed,
    StatusReasonPending,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PackageRepositoryStatus {
    pub ready: bool,
    pub reason: PackageRepositoryStatusReason,
    pub user_reason: String,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthType {
    #[default]
    PackageRepositoryAuthTypeUnspecified,
    PackageRepositoryAuthTypeBasicAuth,
    PackageRepositoryAuthTypeBearer,
    PackageRepositoryAuthTypeAuthorizationHeader,
    PackageRepositoryAuthTypeDockerConfigJson,
    PackageRepositoryAuthTypeSsh,
    PackageRepositoryAuthTypeTls,
    PackageRepositoryAuthTypeOpaque,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct UsernamePassword {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DockerCredentials {
    pub server: String,
    pub username: String,
    pub password: String,
    pub email: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SshCredentials {
    pub private_key: String,
    pub known_hosts: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SecretKeyReference {
    pub name: String,
    pub key: String,
}

/// Credentials supplied inline, or a reference to a user-managed secret
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum PackageRepositoryAuthData {
    UsernamePassword(UsernamePassword),
    Header(String),
    DockerCreds(DockerCredentials),
    SshCreds(SshCredentials),
    SecretRef(SecretKeyReference),
}

impl PackageRepositoryAuthData {
    /// True when every field of the payload is empty
    pub fn is_empty(&self) -> bool {
        match self {
            PackageRepositoryAuthData::UsernamePassword(up) => {
                up.username.is_empty() && up.password.is_empty()
            }
            PackageRepositoryAuthData::Header(header) => header.is_empty(),
            PackageRepositoryAuthData::DockerCreds(dc) => {
                dc.server.is_empty()
                    && dc.username.is_empty()
                    && dc.password.is_empty()
                    && dc.email.is_empty()
            }
            PackageRepositoryAuthData::SshCreds(ssh) => {
                ssh.private_key.is_empty() && ssh.known_hosts.is_empty()
            }
            PackageRepositoryAuthData::SecretRef(secret_ref) => {
                secret_ref.name.is_empty() && secret_ref.key.is_empty()
            }
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PackageRepositoryAuth {
    #[serde(rename = "type")]
    pub auth_type: AuthType,
    pub pass_credentials: bool,
    pub package_repo_auth_one_of: Option<PackageRepositoryAuthData>,
}

/// Opaque plugin-specific payload, identified by its type URL
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomDetail {
    pub type_url: String,
    pub value: serde_json::Value,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct VersionSelectionSemverPrereleases {
    pub identifiers: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct VersionSelectionSemver {
    pub constraints: String,
    pub prereleases: Option<VersionSelectionSemverPrereleases>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct VersionSelection {
    pub semver: Option<VersionSelectionSemver>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ImgpkgBundleDetail {
    pub tag_selection: Option<VersionSelection>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageDetail {
    pub tag_selection: Option<VersionSelection>,
    pub sub_path: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GitDetail {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub ref_selection: Option<VersionSelection>,
    pub sub_path: String,
    pub lfs_skip_smudge: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpDetail {
    pub sub_path: String,
    pub sha256: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct InlineSourceRef {
    pub name: String,
    pub directory_path: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct InlineSource {
    pub secret_ref: Option<InlineSourceRef>,
    pub config_map_ref: Option<InlineSourceRef>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct InlineDetail {
    pub paths: BTreeMap<String, String>,
    pub paths_from: Vec<InlineSource>,
}

/// Type-specific fetch options; exactly one variant per repository
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum PackageRepositoryFetch {
    ImgpkgBundle(ImgpkgBundleDetail),
    Image(ImageDetail),
    Git(GitDetail),
    Http(HttpDetail),
    Inline(InlineDetail),
}

/// Payload of [`CustomDetail`] for this plugin
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct KappControllerPackageRepositoryCustomDetail {
    pub fetch: Option<PackageRepositoryFetch>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PackageRepositorySummary {
    pub package_repo_ref: PackageRepositoryReference,
    pub name: String,
    pub description: String,
    pub namespace_scoped: bool,
    #[serde(rename = "type")]
    pub repo_type: String,
    pub url: String,
    pub status: PackageRepositoryStatus,
    pub requires_auth: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PackageRepositoryDetail {
    pub package_repo_ref: PackageRepositoryReference,
    pub name: String,
    pub description: String,
    pub namespace_scoped: bool,
    #[serde(rename = "type")]
    pub repo_type: String,
    pub url: String,
    pub interval: String,
    pub auth: Option<PackageRepositoryAuth>,
    pub custom_detail: Option<CustomDetail>,
    pub status: PackageRepositoryStatus,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GetPackageRepositorySummariesRequest {
    pub context: Context,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GetPackageRepositorySummariesResponse {
    pub package_repository_summaries: Vec<PackageRepositorySummary>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GetPackageRepositoryDetailRequest {
    pub package_repo_ref: PackageRepositoryReference,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GetPackageRepositoryDetailResponse {
    pub detail: PackageRepositoryDetail,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AddPackageRepositoryRequest {
    pub context: Context,
    pub name: String,
    pub description: String,
    pub namespace_scoped: bool,
    #[serde(rename = "type")]
    pub repo_type: String,
    pub url: String,
    pub interval: String,
    pub auth: Option<PackageRepositoryAuth>,
    pub custom_detail: Option<CustomDetail>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AddPackageRepositoryResponse {
    pub package_repo_ref: PackageRepositoryReference,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdatePackageRepositoryRequest {
    pub package_repo_ref: PackageRepositoryReference,
    pub url: String,
    pub description: String,
    pub interval: String,
    pub auth: Option<PackageRepositoryAuth>,
    pub custom_detail: Option<CustomDetail>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdatePackageRepositoryResponse {
    pub package_repo_ref: PackageRepositoryReference,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DeletePackageRepositoryRequest {
    pub package_repo_ref: PackageRepositoryReference,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct DeletePackageRepositoryResponse {}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GetPackageRepositoryPermissionsRequest {
    pub context: Context,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PackageRepositoriesPermissions {
    pub plugin: Plugin,
    pub global: BTreeMap<String, bool>,
    pub namespace: BTreeMap<String, bool>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GetPackageRepositoryPermissionsResponse {
    pub permissions: Vec<PackageRepositoriesPermissions>,
}
