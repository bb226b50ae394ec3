// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Composite identifiers for available packages, and page tokens.

use crate::api::PaginationOptions;
use crate::constants::UNKNOWN_REPO;
use crate::error::{PluginError, Result};
use crate::types::{PackageMetadata, PackageRepository};
use kube::{Api, Client};
use std::collections::HashMap;
use tracing::debug;

/// `<repo-slug>/<packageRefName>`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AvailablePackageId {
    pub repo: String,
    pub ref_name: String,
}

impl AvailablePackageId {
    pub fn new(repo: impl Into<String>, ref_name: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            ref_name: ref_name.into(),
        }
    }

    pub fn encode(&self) -> String {
        format!("{}/{}", self.repo, self.ref_name)
    }

    /// Split on the first `/`; both halves must be present
    pub fn decode(identifier: &str) -> Result<Self> {
        match identifier.split_once('/') {
            Some((repo, ref_name)) if !repo.is_empty() && !ref_name.is_empty() => {
                Ok(Self::new(repo, ref_name))
            }
            _ => Err(PluginError::invalid(format!(
                "invalid available package identifier '{}', expected '<repository>/<package>'",
                identifier
            ))),
        }
    }
}

/// Resolves the repository a package came from, remembering lookups for the
/// lifetime of a single request
pub struct RepositoryResolver {
    client: Client,
    resolved: HashMap<(String, String), Option<String>>,
}

impl RepositoryResolver {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            resolved: HashMap::new(),
        }
    }

    /// Repository slug for the metadata, `unknown` when it cannot be attributed
    pub async fn slug_for(&mut self, metadata: &PackageMetadata) -> Result<String> {
        let Some((namespace, name)) = metadata.repository_ref() else {
            return Ok(UNKNOWN_REPO.to_string());
        };

        let key = (namespace.to_string(), name.to_string());
        if let Some(found) = self.resolved.get(&key) {
            return Ok(found.clone().unwrap_or_else(|| UNKNOWN_REPO.to_string()));
        }

        let repos: Api<PackageRepository> = Api::namespaced(self.client.clone(), namespace);
        let found = repos.get_opt(name).await?.map(|_| name.to_string());
        if found.is_none() {
            debug!(
                "PackageRepository {}/{} referenced by package metadata no longer exists",
                namespace, name
            );
        }
        self.resolved.insert(key, found.clone());
        Ok(found.unwrap_or_else(|| UNKNOWN_REPO.to_string()))
    }

    pub async fn package_id(&mut self, metadata: &PackageMetadata) -> Result<AvailablePackageId> {
        let repo = self.slug_for(metadata).await?;
        Ok(AvailablePackageId::new(repo, kube::ResourceExt::name_any(metadata)))
    }
}

/// Cut one page out of `items`, returning it with the token of the next page
/// (empty on the last page)
pub fn paginate<T>(items: Vec<T>, options: &PaginationOptions) -> Result<(Vec<T>, String)> {
    let page: usize = if options.page_token.is_empty() {
        0
    } else {
        options.page_token.parse().map_err(|_| {
            PluginError::invalid(format!("invalid page token '{}'", options.page_token))
        })?
    };

    if options.page_size <= 0 {
        return Ok((items, String::new()));
    }
    let size = options.page_size as usize;
    let total = items.len();
    let offset = page.saturating_mul(size);

    if offset > 0 && offset >= total {
        return Err(PluginError::invalid(format!(
            "page token '{}' is beyond the last page ({} items, page size {})",
            options.page_token, total, size
        )));
    }

    let next_page_token = if offset + size < total {
        (page + 1).to_string()
    } else {
        String::new()
    };
    let page_items = items.into_iter().skip(offset).take(size).collect();
    Ok((page_items, next_page_token))
}
