// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::annotations;
use crate::types::package_install::VersionSelectionSemver;
use crate::types::status::GenericStatus;
use kube::{CustomResource, ResourceExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[kube(group = "packaging.carvel.dev", version = "v1alpha1", kind = "PackageRepository")]
#[kube(namespaced)]
#[kube(status = "PackageRepositoryStatus")]
#[serde(rename_all = "camelCase")]
pub struct PackageRepositorySpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_period: Option<String>,
    pub fetch: Fetch,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused: Option<bool>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
pub struct PackageRepositoryStatus {
    #[serde(flatten)]
    pub generic: GenericStatus,
}

/// Where kapp-controller fetches repository content from. Exactly one source per repository.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum Fetch {
    ImgpkgBundle(FetchImgpkgBundle),
    Image(FetchImage),
    Git(FetchGit),
    Http(FetchHttp),
    Inline(FetchInline),
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
pub struct SecretRef {
    pub name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
pub struct VersionSelection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semver: Option<VersionSelectionSemver>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FetchImgpkgBundle {
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<SecretRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_selection: Option<VersionSelection>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FetchImage {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<SecretRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_selection: Option<VersionSelection>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FetchGit {
    pub url: String,
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_selection: Option<VersionSelection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<SecretRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lfs_skip_smudge: Option<bool>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FetchHttp {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<SecretRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_path: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FetchInline {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub paths: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths_from: Vec<InlineSource>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InlineSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<InlineSourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_map_ref: Option<InlineSourceRef>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InlineSourceRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory_path: Option<String>,
}

/// Discriminant of [`Fetch`], as exchanged with API clients
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FetchType {
    ImgpkgBundle,
    Image,
    Git,
    Http,
    Inline,
}

impl FetchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchType::ImgpkgBundle => "imgpkgBundle",
            FetchType::Image => "image",
            FetchType::Git => "git",
            FetchType::Http => "http",
            FetchType::Inline => "inline",
        }
    }
}

impl FromStr for FetchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "imgpkgBundle" => Ok(FetchType::ImgpkgBundle),
            "image" => Ok(FetchType::Image),
            "git" => Ok(FetchType::Git),
            "http" => Ok(FetchType::Http),
            "inline" => Ok(FetchType::Inline),
            other => Err(format!("unsupported repository type '{}'", other)),
        }
    }
}

impl fmt::Display for FetchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Fetch {
    pub fn fetch_type(&self) -> FetchType {
        match self {
            Fetch::ImgpkgBundle(_) => FetchType::ImgpkgBundle,
            Fetch::Image(_) => FetchType::Image,
            Fetch::Git(_) => FetchType::Git,
            Fetch::Http(_) => FetchType::Http,
            Fetch::Inline(_) => FetchType::Inline,
        }
    }

    /// Source location; inline repositories have none
    pub fn url(&self) -> Option<&str> {
        match self {
            Fetch::ImgpkgBundle(f) => Some(&f.image),
            Fetch::Image(f) => Some(&f.url),
            Fetch::Git(f) => Some(&f.url),
            Fetch::Http(f) => Some(&f.url),
            Fetch::Inline(_) => None,
        }
    }

    pub fn set_url(&mut self, url: String) {
        match self {
            Fetch::ImgpkgBundle(f) => f.image = url,
            Fetch::Image(f) => f.url = url,
            Fetch::Git(f) => f.url = url,
            Fetch::Http(f) => f.url = url,
            Fetch::Inline(_) => {}
        }
    }

    pub fn secret_name(&self) -> Option<&str> {
        let secret_ref = match self {
            Fetch::ImgpkgBundle(f) => f.secret_ref.as_ref(),
            Fetch::Image(f) => f.secret_ref.as_ref(),
            Fetch::Git(f) => f.secret_ref.as_ref(),
            Fetch::Http(f) => f.secret_ref.as_ref(),
            Fetch::Inline(_) => None,
        };
        secret_ref.map(|r| r.name.as_str()).filter(|n| !n.is_empty())
    }

    pub fn set_secret_name(&mut self, name: Option<String>) {
        let secret_ref = name.map(|name| SecretRef { name });
        match self {
            Fetch::ImgpkgBundle(f) => f.secret_ref = secret_ref,
            Fetch::Image(f) => f.secret_ref = secret_ref,
            Fetch::Git(f) => f.secret_ref = secret_ref,
            Fetch::Http(f) => f.secret_ref = secret_ref,
            Fetch::Inline(_) => {}
        }
    }
}

impl PackageRepository {
    pub fn fetch_type(&self) -> FetchType {
        self.spec.fetch.fetch_type()
    }

    pub fn description(&self) -> String {
        self.annotations()
            .get(annotations::DESCRIPTION)
            .cloned()
            .unwrap_or_default()
    }

    pub fn generic_status(&self) -> Option<&GenericStatus> {
        self.status.as_ref().map(|s| &s.generic)
    }
}
