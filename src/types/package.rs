// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::annotations;
use kube::{CustomResource, ResourceExt};
use serde::{Deserialize, Serialize};

/// One immutable version of a package family
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[kube(group = "data.packaging.carvel.dev", version = "v1alpha1", kind = "Package")]
#[kube(namespaced)]
#[serde(rename_all = "camelCase")]
pub struct PackageSpec {
    pub ref_name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity_requirements_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub released_at: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub licenses: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values_schema: Option<ValuesSchema>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
pub struct ValuesSchema {
    #[serde(rename = "openAPIv3", default, skip_serializing_if = "Option::is_none")]
    pub open_api_v3: Option<serde_json::Value>,
}

/// Descriptive data shared by all versions of a package family
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[kube(group = "data.packaging.carvel.dev", version = "v1alpha1", kind = "PackageMetadata")]
#[kube(namespaced)]
#[serde(rename_all = "camelCase")]
pub struct PackageMetadataSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_description: Option<String>,
    #[serde(rename = "iconSVGBase64", default, skip_serializing_if = "Option::is_none")]
    pub icon_svg_base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub maintainers: Vec<Maintainer>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_description: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
pub struct Maintainer {
    pub name: String,
}

impl PackageMetadata {
    /// Display name, falling back to the resource name
    pub fn display_name(&self) -> String {
        self.spec
            .display_name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| self.name_any())
    }

    /// Icon as a data URL, if the metadata carries one
    pub fn icon_url(&self) -> String {
        self.spec
            .icon_svg_base64
            .as_ref()
            .filter(|icon| !icon.is_empty())
            .map(|icon| format!("data:image/svg+xml;base64,{}", icon))
            .unwrap_or_default()
    }

    /// The `<namespace>/<name>` repository annotation set by kapp-controller
    pub fn repository_ref(&self) -> Option<(&str, &str)> {
        self.annotations()
            .get(annotations::REPO_REF)
            .and_then(|r| r.split_once('/'))
            .filter(|(ns, name)| !ns.is_empty() && !name.is_empty())
    }
}
