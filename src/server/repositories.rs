// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Package repositories: PackageRepository resources and their auth secrets.

use super::{require, PackagesServer};
use crate::api;
use crate::auth::reconcile::{self, current_state, link_owner};
use crate::auth::secrets::redacted_auth;
use crate::auth::{parse_auth, AuthRequest, AuthState};
use crate::constants::annotations;
use crate::error::{PluginError, Result};
use crate::kubernetes::repository_permissions;
use crate::status::{is_stable, normalize, Readiness};
use crate::translate::{
    apply_update, custom_detail_from_fetch, fetch_from_request, fetch_merge_patch,
    parse_custom_detail, parse_fetch_type, validate_interval,
};
use crate::types::package_repository::PackageRepositorySpec;
use crate::types::PackageRepository;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::{Api, Resource, ResourceExt};
use tracing::{debug, info, instrument, warn};

fn repository_ref(cluster: &str, namespace: &str, name: &str) -> api::PackageRepositoryReference {
    api::PackageRepositoryReference {
        context: api::Context {
            cluster: cluster.to_string(),
            namespace: namespace.to_string(),
        },
        identifier: name.to_string(),
        plugin: api::Plugin::default(),
    }
}

fn repository_status(repo: &PackageRepository) -> api::PackageRepositoryStatus {
    let normalized = normalize(repo.generic_status(), repo.metadata.generation);
    let reason = match normalized.readiness {
        Readiness::Installed => api::PackageRepositoryStatusReason::StatusReasonSuccess,
        Readiness::Pending => api::PackageRepositoryStatusReason::StatusReasonPending,
        Readiness::Failed => api::PackageRepositoryStatusReason::StatusReasonFailed,
        Readiness::Unspecified => api::PackageRepositoryStatusReason::StatusReasonUnspecified,
    };
    api::PackageRepositoryStatus {
        ready: normalized.is_ready(),
        reason,
        user_reason: normalized.message,
    }
}

impl PackagesServer {
    fn is_namespace_scoped(&self, repo: &PackageRepository) -> bool {
        repo.namespace().as_deref() != Some(self.config.global_packaging_namespace.as_str())
    }

    /// Secret named by a secret-ref request, if there is one
    async fn requested_secret(
        &self,
        secrets: &Api<Secret>,
        request: &AuthRequest,
    ) -> Result<Option<Secret>> {
        match request {
            AuthRequest::SecretRef { name, .. } => Ok(secrets.get_opt(name).await?),
            _ => Ok(None),
        }
    }

    #[instrument(skip(self, request), fields(namespace = %request.context.namespace))]
    pub async fn get_package_repository_summaries(
        &self,
        request: api::GetPackageRepositorySummariesRequest,
    ) -> Result<api::GetPackageRepositorySummariesResponse> {
        let namespace = request.context.namespace.as_str();
        let global = self.config.global_packaging_namespace.as_str();

        let mut repos = self
            .api::<PackageRepository>(namespace)
            .list(&ListParams::default())
            .await?
            .items;
        if !namespace.is_empty() && namespace != global {
            let globals: Api<PackageRepository> = Api::namespaced(self.client.clone(), global);
            repos.extend(globals.list(&ListParams::default()).await?.items);
        }
        repos.sort_by_key(|r| (r.namespace().unwrap_or_default(), r.name_any()));

        let summaries = repos
            .iter()
            .map(|repo| {
                let repo_namespace = repo.namespace().unwrap_or_default();
                api::PackageRepositorySummary {
                    package_repo_ref: repository_ref(
                        &request.context.cluster,
                        &repo_namespace,
                        &repo.name_any(),
                    ),
                    name: repo.name_any(),
                    description: repo.description(),
                    namespace_scoped: self.is_namespace_scoped(repo),
                    repo_type: repo.fetch_type().to_string(),
                    url: repo.spec.fetch.url().unwrap_or_default().to_string(),
                    status: repository_status(repo),
                    requires_auth: repo.spec.fetch.secret_name().is_some(),
                }
            })
            .collect();

        Ok(api::GetPackageRepositorySummariesResponse {
            package_repository_summaries: summaries,
        })
    }

    #[instrument(skip(self, request), fields(repository = %request.package_repo_ref.identifier))]
    pub async fn get_package_repository_detail(
        &self,
        request: api::GetPackageRepositoryDetailRequest,
    ) -> Result<api::GetPackageRepositoryDetailResponse> {
        let reference = &request.package_repo_ref;
        let namespace = reference.context.namespace.as_str();
        require(namespace, "namespace")?;
        require(&reference.identifier, "repository name")?;

        let repo: PackageRepository = self.get(namespace, &reference.identifier).await?;
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let auth = current_state(&secrets, &repo.spec.fetch)
            .await?
            .secret()
            .map(redacted_auth);

        Ok(api::GetPackageRepositoryDetailResponse {
            detail: api::PackageRepositoryDetail {
                package_repo_ref: repository_ref(
                    &reference.context.cluster,
                    namespace,
                    &repo.name_any(),
                ),
                name: repo.name_any(),
                description: repo.description(),
                namespace_scoped: self.is_namespace_scoped(&repo),
                repo_type: repo.fetch_type().to_string(),
                url: repo.spec.fetch.url().unwrap_or_default().to_string(),
                interval: repo.spec.sync_period.clone().unwrap_or_default(),
                auth,
                custom_detail: Some(custom_detail_from_fetch(&repo.spec.fetch)?),
                status: repository_status(&repo),
            },
        })
    }

    #[instrument(skip(self, request), fields(name = %request.name, namespace = %request.context.namespace))]
    pub async fn add_package_repository(
        &self,
        request: api::AddPackageRepositoryRequest,
    ) -> Result<api::AddPackageRepositoryResponse> {
        require(&request.name, "repository name")?;
        let global = self.config.global_packaging_namespace.as_str();
        let namespace = if request.namespace_scoped {
            require(&request.context.namespace, "namespace")?;
            if request.context.namespace == global {
                return Err(PluginError::invalid(format!(
                    "namespace-scoped repositories cannot be created in the global packaging namespace '{}'",
                    global
                )));
            }
            request.context.namespace.as_str()
        } else {
            global
        };

        let fetch_type = parse_fetch_type(&request.repo_type)?;
        let detail = parse_custom_detail(request.custom_detail.as_ref())?;
        validate_interval(&request.interval)?;
        let mut fetch = fetch_from_request(fetch_type, &request.url, detail)?;
        let auth = parse_auth(request.auth.as_ref(), fetch_type)?;

        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let user_secret = self.requested_secret(&secrets, &auth).await?;
        let plan = reconcile::plan(
            &auth,
            &AuthState::None,
            user_secret.as_ref(),
            namespace,
            &request.name,
        )?;

        let repos: Api<PackageRepository> = Api::namespaced(self.client.clone(), namespace);
        if repos.get_opt(&request.name).await?.is_some() {
            return Err(PluginError::AlreadyExists(format!(
                "PackageRepository {}/{} already exists",
                namespace, request.name
            )));
        }

        let applied = reconcile::apply(&secrets, plan, None).await?;
        fetch.set_secret_name(applied.secret_name.clone());

        let mut repo = PackageRepository::new(
            &request.name,
            PackageRepositorySpec {
                sync_period: Some(request.interval.clone()).filter(|i| !i.is_empty()),
                fetch,
                paused: None,
            },
        );
        repo.metadata.namespace = Some(namespace.to_string());
        if !request.description.is_empty() {
            repo.annotations_mut().insert(
                annotations::DESCRIPTION.to_string(),
                request.description.clone(),
            );
        }

        let created = match repos.create(&PostParams::default(), &repo).await {
            Ok(created) => created,
            Err(e) => {
                applied.rollback(&secrets).await;
                return Err(PluginError::from(e).context(format!(
                    "unable to create PackageRepository {}/{}",
                    namespace, request.name
                )));
            }
        };
        info!("Created PackageRepository {}/{}", namespace, request.name);

        if let (Some(secret_name), Some(owner)) =
            (applied.created(), created.controller_owner_ref(&()))
        {
            link_owner(&secrets, secret_name, owner).await;
        }
        applied.commit(&secrets).await;

        Ok(api::AddPackageRepositoryResponse {
            package_repo_ref: repository_ref(&request.context.cluster, namespace, &request.name),
        })
    }

    #[instrument(skip(self, request), fields(repository = %request.package_repo_ref.identifier))]
    pub async fn update_package_repository(
        &self,
        request: api::UpdatePackageRepositoryRequest,
    ) -> Result<api::UpdatePackageRepositoryResponse> {
        let reference = &request.package_repo_ref;
        let namespace = reference.context.namespace.as_str();
        let name = reference.identifier.as_str();
        require(namespace, "namespace")?;
        require(name, "repository name")?;

        let repo: PackageRepository = self.get(namespace, name).await?;
        if !is_stable(repo.generic_status(), repo.metadata.generation) {
            return Err(PluginError::FailedPrecondition(format!(
                "the repository {}/{} is not in a stable state, wait until it has been reconciled",
                namespace, name
            )));
        }

        let detail = parse_custom_detail(request.custom_detail.as_ref())?;
        validate_interval(&request.interval)?;
        let mut fetch = repo.spec.fetch.clone();
        apply_update(&mut fetch, &request.url, detail)?;
        let auth = parse_auth(request.auth.as_ref(), fetch.fetch_type())?;

        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let state = current_state(&secrets, &repo.spec.fetch).await?;
        let user_secret = self.requested_secret(&secrets, &auth).await?;
        let plan = reconcile::plan(&auth, &state, user_secret.as_ref(), namespace, name)?;

        let applied = reconcile::apply(&secrets, plan, repo.controller_owner_ref(&())).await?;
        fetch.set_secret_name(applied.secret_name.clone());

        let description = (!request.description.is_empty()).then_some(request.description.as_str());
        let sync_period = (!request.interval.is_empty()).then_some(request.interval.as_str());
        let patch = serde_json::json!({
            "metadata": {
                "resourceVersion": repo.resource_version(),
                "annotations": { (annotations::DESCRIPTION): description },
            },
            "spec": {
                "syncPeriod": sync_period,
                "fetch": fetch_merge_patch(&fetch)?,
            },
        });

        let repos: Api<PackageRepository> = Api::namespaced(self.client.clone(), namespace);
        if let Err(e) = repos
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
        {
            applied.rollback(&secrets).await;
            return Err(PluginError::from(e)
                .context(format!("unable to update PackageRepository {}/{}", namespace, name)));
        }
        info!("Updated PackageRepository {}/{}", namespace, name);
        applied.commit(&secrets).await;

        Ok(api::UpdatePackageRepositoryResponse {
            package_repo_ref: repository_ref(&reference.context.cluster, namespace, name),
        })
    }

    #[instrument(skip(self, request), fields(repository = %request.package_repo_ref.identifier))]
    pub async fn delete_package_repository(
        &self,
        request: api::DeletePackageRepositoryRequest,
    ) -> Result<api::DeletePackageRepositoryResponse> {
        let reference = &request.package_repo_ref;
        let namespace = reference.context.namespace.as_str();
        let name = reference.identifier.as_str();
        require(namespace, "namespace")?;
        require(name, "repository name")?;

        let repo: PackageRepository = self.get(namespace, name).await?;
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let state = current_state(&secrets, &repo.spec.fetch).await?;

        let repos: Api<PackageRepository> = Api::namespaced(self.client.clone(), namespace);
        repos
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|e| {
                PluginError::from(e)
                    .context(format!("unable to delete PackageRepository {}/{}", namespace, name))
            })?;
        info!("Deleted PackageRepository {}/{}", namespace, name);

        // Owned secrets are garbage collected, this covers one whose owner link never landed
        if let AuthState::PluginManaged(secret) = state {
            let secret_name = secret.name_any();
            match secrets.delete(&secret_name, &DeleteParams::default()).await {
                Ok(_) => debug!("Deleted auth secret {}", secret_name),
                Err(kube::Error::Api(e)) if e.code == 404 => {}
                Err(e) => warn!("Failed to delete auth secret {}: {}", secret_name, e),
            }
        }
        Ok(api::DeletePackageRepositoryResponse {})
    }

    #[instrument(skip(self, request), fields(namespace = %request.context.namespace))]
    pub async fn get_package_repository_permissions(
        &self,
        request: api::GetPackageRepositoryPermissionsRequest,
    ) -> Result<api::GetPackageRepositoryPermissionsResponse> {
        let global =
            repository_permissions(&self.client, &self.config.global_packaging_namespace).await?;
        let namespace = if request.context.namespace.is_empty() {
            Default::default()
        } else {
            repository_permissions(&self.client, &request.context.namespace).await?
        };

        Ok(api::GetPackageRepositoryPermissionsResponse {
            permissions: vec![api::PackageRepositoriesPermissions {
                plugin: api::Plugin::default(),
                global,
                namespace,
            }],
        })
    }
}
