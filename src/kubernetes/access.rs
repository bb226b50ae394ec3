// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! What the caller may do with PackageRepositories, asked through SelfSubjectAccessReviews.

use crate::constants::crd::PACKAGING_GROUP;
use crate::error::Result;
use futures::future::try_join_all;
use k8s_openapi::api::authorization::v1::{
    ResourceAttributes, SelfSubjectAccessReview, SelfSubjectAccessReviewSpec,
};
use kube::api::PostParams;
use kube::{Api, Client};
use std::collections::BTreeMap;
use tracing::instrument;

pub const REPOSITORY_VERBS: &[&str] = &["get", "list", "create", "update", "delete"];

const REPOSITORIES_RESOURCE: &str = "packagerepositories";

async fn can_i(client: &Client, namespace: &str, verb: &str) -> Result<bool> {
    let reviews: Api<SelfSubjectAccessReview> = Api::all(client.clone());
    let review = SelfSubjectAccessReview {
        spec: SelfSubjectAccessReviewSpec {
            resource_attributes: Some(ResourceAttributes {
                group: Some(PACKAGING_GROUP.to_string()),
                resource: Some(REPOSITORIES_RESOURCE.to_string()),
                verb: Some(verb.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        },
        ..Default::default()
    };
    let result = reviews.create(&PostParams::default(), &review).await?;
    Ok(result.status.is_some_and(|s| s.allowed))
}

/// Verb → allowed, for PackageRepositories in `namespace`
#[instrument(skip(client))]
pub async fn repository_permissions(
    client: &Client,
    namespace: &str,
) -> Result<BTreeMap<String, bool>> {
    let allowed =
        try_join_all(REPOSITORY_VERBS.iter().map(|verb| can_i(client, namespace, verb))).await?;
    Ok(REPOSITORY_VERBS
        .iter()
        .map(|v| v.to_string())
        .zip(allowed)
        .collect())
}
