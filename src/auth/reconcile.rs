// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Decide and carry out the secret changes behind a repository auth request.
//!
//! Planning is pure and runs before anything is written. Applying a plan writes the
//! secret only; the caller then points the repository at it and either commits
//! (removing the secret that was replaced) or rolls back (removing the secret that was
//! just created, or restoring the content of the secret that was rewritten).

use crate::auth::credentials::{AuthRequest, Credentials};
use crate::auth::secrets::{
    build_managed_secret, detect_kind, is_plugin_managed, merge_credentials, stored_values,
    validate_user_secret,
};
use crate::error::{PluginError, Result};
use crate::types::Fetch;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::{DeleteParams, Patch, PatchParams, PostParams};
use kube::{Api, ResourceExt};
use tracing::{debug, info, warn};

/// Auth currently configured on a repository
#[derive(Clone, Debug)]
pub enum AuthState {
    None,
    UserManaged(Secret),
    PluginManaged(Secret),
}

impl AuthState {
    pub fn secret(&self) -> Option<&Secret> {
        match self {
            AuthState::None => None,
            AuthState::UserManaged(s) | AuthState::PluginManaged(s) => Some(s),
        }
    }
}

/// Load the secret a fetch spec points at. A dangling reference counts as no auth.
pub async fn current_state(secrets: &Api<Secret>, fetch: &Fetch) -> Result<AuthState> {
    let Some(name) = fetch.secret_name() else {
        return Ok(AuthState::None);
    };
    match secrets.get_opt(name).await? {
        Some(secret) if is_plugin_managed(&secret) => Ok(AuthState::PluginManaged(secret)),
        Some(secret) => Ok(AuthState::UserManaged(secret)),
        None => {
            warn!("Repository references secret {} which does not exist", name);
            Ok(AuthState::None)
        }
    }
}

/// Secret changes needed to reach the requested auth
#[derive(Clone, Debug, PartialEq)]
pub enum AuthPlan {
    /// No secret referenced afterwards
    Clear { delete: Option<String> },
    /// Reference an existing user-managed secret
    Reference { name: String },
    /// Create a new plugin-managed secret, replacing `delete` if set
    Create {
        secret: Box<Secret>,
        delete: Option<String>,
    },
    /// Overwrite the data of the current plugin-managed secret
    Rewrite {
        secret: Box<Secret>,
        previous: Box<Secret>,
    },
}

/// Work out the secret changes. `user_secret` is the secret named by a secret-ref request.
pub fn plan(
    request: &AuthRequest,
    state: &AuthState,
    user_secret: Option<&Secret>,
    namespace: &str,
    repository_name: &str,
) -> Result<AuthPlan> {
    match request {
        AuthRequest::None => Ok(AuthPlan::Clear {
            delete: match state {
                AuthState::PluginManaged(s) => Some(s.name_any()),
                _ => None,
            },
        }),
        AuthRequest::SecretRef { kind, name } => {
            if matches!(state, AuthState::PluginManaged(_)) {
                return Err(mode_change_error());
            }
            let secret = user_secret
                .ok_or_else(|| PluginError::not_found(format!("secret '{}' not found", name)))?;
            validate_user_secret(secret, *kind)?;
            Ok(AuthPlan::Reference { name: name.clone() })
        }
        AuthRequest::Inline(credentials) => match state {
            AuthState::UserManaged(_) => Err(mode_change_error()),
            AuthState::PluginManaged(current) => {
                replace_managed(credentials, current, namespace, repository_name)
            }
            AuthState::None => {
                let values = merge_credentials(credentials, None)?;
                Ok(AuthPlan::Create {
                    secret: Box::new(build_managed_secret(&values, namespace, repository_name)?),
                    delete: None,
                })
            }
        },
    }
}

fn mode_change_error() -> PluginError {
    PluginError::invalid(
        "auth management mode cannot be changed, remove the repository auth first",
    )
}

fn replace_managed(
    credentials: &Credentials,
    current: &Secret,
    namespace: &str,
    repository_name: &str,
) -> Result<AuthPlan> {
    let stored = stored_values(current);
    let values = merge_credentials(credentials, stored.as_ref())?;

    // Secret type is immutable, a different auth type needs a new secret
    if detect_kind(current) == Some(values.kind()) {
        let mut secret = current.clone();
        secret.data = Some(values.to_data()?);
        secret.string_data = None;
        Ok(AuthPlan::Rewrite {
            secret: Box::new(secret),
            previous: Box::new(current.clone()),
        })
    } else {
        Ok(AuthPlan::Create {
            secret: Box::new(build_managed_secret(&values, namespace, repository_name)?),
            delete: Some(current.name_any()),
        })
    }
}

/// Outcome of writing the secret side of a plan
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppliedAuth {
    /// Secret the repository must reference
    pub secret_name: Option<String>,
    created: Option<String>,
    stale: Option<String>,
    /// Content to put back when a rewritten secret must be rolled back
    restore: Option<Box<Secret>>,
}

impl AppliedAuth {
    /// Name of the secret created by this request, if any
    pub fn created(&self) -> Option<&str> {
        self.created.as_deref()
    }

    /// The repository now references `secret_name`; drop the secret it replaced
    pub async fn commit(self, secrets: &Api<Secret>) {
        if let Some(name) = self.stale {
            delete_secret(secrets, &name).await;
        }
    }

    /// The repository write failed; drop the secret created for it or put back
    /// the credentials that were overwritten
    pub async fn rollback(self, secrets: &Api<Secret>) {
        if let Some(name) = self.created {
            delete_secret(secrets, &name).await;
        }
        if let Some(previous) = self.restore {
            let name = previous.name_any();
            match secrets.replace(&name, &PostParams::default(), &previous).await {
                Ok(_) => info!("Restored auth secret {}", name),
                Err(e) => warn!("Failed to restore auth secret {}: {}", name, e),
            }
        }
    }
}

/// Write the secret side of a plan. `owner` is set on created secrets when the
/// repository already exists.
pub async fn apply(
    secrets: &Api<Secret>,
    plan: AuthPlan,
    owner: Option<OwnerReference>,
) -> Result<AppliedAuth> {
    match plan {
        AuthPlan::Clear { delete } => Ok(AppliedAuth {
            stale: delete,
            ..Default::default()
        }),
        AuthPlan::Reference { name } => Ok(AppliedAuth {
            secret_name: Some(name),
            ..Default::default()
        }),
        AuthPlan::Create { secret, delete } => {
            let mut secret = *secret;
            if let Some(owner) = owner {
                secret.metadata.owner_references = Some(vec![owner]);
            }
            let created = secrets.create(&PostParams::default(), &secret).await?;
            let name = created.name_any();
            info!("Created auth secret {}", name);
            Ok(AppliedAuth {
                secret_name: Some(name.clone()),
                created: Some(name),
                stale: delete,
                restore: None,
            })
        }
        AuthPlan::Rewrite { secret, previous } => {
            let name = secret.name_any();
            let updated = secrets
                .replace(&name, &PostParams::default(), &secret)
                .await?;
            debug!("Updated auth secret {}", name);
            let mut restore = *previous;
            restore.metadata.resource_version = updated.resource_version();
            Ok(AppliedAuth {
                secret_name: Some(name),
                restore: Some(Box::new(restore)),
                ..Default::default()
            })
        }
    }
}

/// Make a secret created before its repository owned by that repository
pub async fn link_owner(secrets: &Api<Secret>, name: &str, owner: OwnerReference) {
    let patch = serde_json::json!({
        "metadata": { "ownerReferences": [owner] }
    });
    if let Err(e) = secrets
        .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
        .await
    {
        warn!("Failed to set owner reference on secret {}: {}", name, e);
    }
}

async fn delete_secret(secrets: &Api<Secret>, name: &str) {
    match secrets.delete(name, &DeleteParams::default()).await {
        Ok(_) => info!("Deleted auth secret {}", name),
        Err(e) => warn!("Failed to delete auth secret {}: {}", name, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::credentials::{AuthKind, Credential};
    use crate::auth::secrets::secret_string;
    use crate::constants::{annotations, secrets as keys};
    use crate::error::ErrorCode;
    use crate::test_utils::{requests_with_method, secret_json, MockService};
    use base64::Engine;

    const SECRETS_PATH: &str = "/api/v1/namespaces/default/secrets";

    fn managed_basic(username: &str, password: &str) -> Secret {
        serde_json::from_value(secret_json(
            "default",
            "my-repo-abcde",
            keys::TYPE_BASIC_AUTH,
            &[(keys::KEY_USERNAME, username), (keys::KEY_PASSWORD, password)],
            &[(annotations::MANAGED_BY, annotations::MANAGED_BY_VALUE)],
        ))
        .unwrap()
    }

    fn managed_bearer() -> Secret {
        serde_json::from_value(secret_json(
            "default",
            "my-repo-token",
            keys::TYPE_OPAQUE,
            &[(keys::KEY_TOKEN, "abc")],
            &[(annotations::MANAGED_BY, annotations::MANAGED_BY_VALUE)],
        ))
        .unwrap()
    }

    fn user_basic() -> Secret {
        serde_json::from_value(secret_json(
            "default",
            "user-creds",
            keys::TYPE_BASIC_AUTH,
            &[(keys::KEY_USERNAME, "foo"), (keys::KEY_PASSWORD, "bar")],
            &[],
        ))
        .unwrap()
    }

    fn basic_request(username: Credential, password: Credential) -> AuthRequest {
        AuthRequest::Inline(Credentials::BasicAuth { username, password })
    }

    fn value(s: &str) -> Credential {
        Credential::Value(s.to_string())
    }

    #[test]
    fn test_create_with_redacted_is_invalid() {
        let err = plan(
            &basic_request(Credential::Redacted, value("bar")),
            &AuthState::None,
            None,
            "default",
            "my-repo",
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
        assert!(err.to_string().contains("unexpected REDACTED content"));
    }

    #[test]
    fn test_redacted_update_keeps_unchanged_fields() {
        let state = AuthState::PluginManaged(managed_basic("foo", "bar"));
        let result = plan(
            &basic_request(Credential::Redacted, value("bar2")),
            &state,
            None,
            "default",
            "my-repo",
        )
        .unwrap();

        let AuthPlan::Rewrite { secret, previous } = result else {
            panic!("expected rewrite, got {:?}", result);
        };
        assert_eq!(secret.name_any(), "my-repo-abcde");
        assert_eq!(secret_string(&secret, keys::KEY_USERNAME).as_deref(), Some("foo"));
        assert_eq!(secret_string(&secret, keys::KEY_PASSWORD).as_deref(), Some("bar2"));
        assert_eq!(secret_string(&previous, keys::KEY_PASSWORD).as_deref(), Some("bar"));
    }

    #[test]
    fn test_redacted_update_against_bearer_secret_is_invalid() {
        let state = AuthState::PluginManaged(managed_bearer());
        let err = plan(
            &basic_request(Credential::Redacted, value("bar")),
            &state,
            None,
            "default",
            "my-repo",
        )
        .unwrap_err();
        assert!(err.to_string().contains("unexpected REDACTED content"));
    }

    #[test]
    fn test_auth_type_change_replaces_secret() {
        let state = AuthState::PluginManaged(managed_bearer());
        let result = plan(
            &basic_request(value("foo"), value("bar")),
            &state,
            None,
            "default",
            "my-repo",
        )
        .unwrap();

        let AuthPlan::Create { secret, delete } = result else {
            panic!("expected create, got {:?}", result);
        };
        assert_eq!(secret.type_.as_deref(), Some(keys::TYPE_BASIC_AUTH));
        assert_eq!(delete.as_deref(), Some("my-repo-token"));
    }

    #[test]
    fn test_removing_auth() {
        let managed = AuthState::PluginManaged(managed_basic("foo", "bar"));
        assert_eq!(
            plan(&AuthRequest::None, &managed, None, "default", "my-repo").unwrap(),
            AuthPlan::Clear {
                delete: Some("my-repo-abcde".to_string())
            }
        );

        let user = AuthState::UserManaged(user_basic());
        assert_eq!(
            plan(&AuthRequest::None, &user, None, "default", "my-repo").unwrap(),
            AuthPlan::Clear { delete: None }
        );
    }

    #[test]
    fn test_management_mode_cannot_change() {
        let user = AuthState::UserManaged(user_basic());
        let err = plan(
            &basic_request(value("foo"), value("bar")),
            &user,
            None,
            "default",
            "my-repo",
        )
        .unwrap_err();
        assert!(err.to_string().contains("management mode cannot be changed"));

        let managed = AuthState::PluginManaged(managed_basic("foo", "bar"));
        let secret_ref = AuthRequest::SecretRef {
            kind: AuthKind::BasicAuth,
            name: "user-creds".to_string(),
        };
        let secret = user_basic();
        assert!(plan(&secret_ref, &managed, Some(&secret), "default", "my-repo").is_err());
    }

    #[test]
    fn test_user_secret_must_exist_and_match() {
        let request = AuthRequest::SecretRef {
            kind: AuthKind::Ssh,
            name: "user-creds".to_string(),
        };
        let missing = plan(&request, &AuthState::None, None, "default", "r").unwrap_err();
        assert_eq!(missing.code(), ErrorCode::NotFound);

        let secret = user_basic();
        let mismatch = plan(&request, &AuthState::None, Some(&secret), "default", "r").unwrap_err();
        assert_eq!(mismatch.code(), ErrorCode::InvalidArgument);
    }

    #[tokio::test]
    async fn test_apply_create_commit_deletes_replaced_secret() {
        let created = secret_json(
            "default",
            "my-repo-xyz12",
            keys::TYPE_BASIC_AUTH,
            &[],
            &[(annotations::MANAGED_BY, annotations::MANAGED_BY_VALUE)],
        );
        let mock = MockService::new()
            .on_post(SECRETS_PATH, 201, &created.to_string())
            .on_delete(
                &format!("{}/my-repo-token", SECRETS_PATH),
                200,
                &managed_bearer_json(),
            );
        let recorder = mock.recorder();
        let secrets: Api<Secret> = Api::namespaced(mock.into_client(), "default");

        let result = plan(
            &basic_request(value("foo"), value("bar")),
            &AuthState::PluginManaged(managed_bearer()),
            None,
            "default",
            "my-repo",
        )
        .unwrap();
        let applied = apply(&secrets, result, None).await.unwrap();
        assert_eq!(applied.secret_name.as_deref(), Some("my-repo-xyz12"));
        applied.commit(&secrets).await;

        let posts = requests_with_method(&recorder, "POST");
        assert_eq!(posts.len(), 1);
        let username = posts[0].body["data"][keys::KEY_USERNAME].as_str().unwrap();
        assert_eq!(
            base64::engine::general_purpose::STANDARD.decode(username).unwrap(),
            b"foo"
        );
        let deletes = requests_with_method(&recorder, "DELETE");
        assert_eq!(deletes.len(), 1);
        assert!(deletes[0].path.ends_with("/my-repo-token"));
    }

    #[tokio::test]
    async fn test_apply_rewrite_replaces_in_place() {
        let mock = MockService::new().on_put(
            &format!("{}/my-repo-abcde", SECRETS_PATH),
            200,
            &serde_json::to_string(&managed_basic("foo", "bar2")).unwrap(),
        );
        let recorder = mock.recorder();
        let secrets: Api<Secret> = Api::namespaced(mock.into_client(), "default");

        let result = plan(
            &basic_request(Credential::Redacted, value("bar2")),
            &AuthState::PluginManaged(managed_basic("foo", "bar")),
            None,
            "default",
            "my-repo",
        )
        .unwrap();
        let applied = apply(&secrets, result, None).await.unwrap();

        assert_eq!(applied.secret_name.as_deref(), Some("my-repo-abcde"));
        assert_eq!(applied.created(), None);
        let puts = requests_with_method(&recorder, "PUT");
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].body["metadata"]["resourceVersion"], "3");
    }

    #[tokio::test]
    async fn test_rollback_deletes_created_secret() {
        let mock = MockService::new().on_delete(
            &format!("{}/my-repo-xyz12", SECRETS_PATH),
            200,
            &managed_bearer_json(),
        );
        let recorder = mock.recorder();
        let secrets: Api<Secret> = Api::namespaced(mock.into_client(), "default");

        let applied = AppliedAuth {
            secret_name: Some("my-repo-xyz12".to_string()),
            created: Some("my-repo-xyz12".to_string()),
            stale: Some("my-repo-token".to_string()),
            restore: None,
        };
        applied.rollback(&secrets).await;

        let deletes = requests_with_method(&recorder, "DELETE");
        assert_eq!(deletes.len(), 1);
        assert!(deletes[0].path.ends_with("/my-repo-xyz12"));
    }

    #[tokio::test]
    async fn test_rollback_restores_rewritten_credentials() {
        let mut updated = managed_basic("foo", "bar2");
        updated.metadata.resource_version = Some("4".to_string());
        let mock = MockService::new().on_put(
            &format!("{}/my-repo-abcde", SECRETS_PATH),
            200,
            &serde_json::to_string(&updated).unwrap(),
        );
        let recorder = mock.recorder();
        let secrets: Api<Secret> = Api::namespaced(mock.into_client(), "default");

        let result = plan(
            &basic_request(Credential::Redacted, value("bar2")),
            &AuthState::PluginManaged(managed_basic("foo", "bar")),
            None,
            "default",
            "my-repo",
        )
        .unwrap();
        let applied = apply(&secrets, result, None).await.unwrap();
        applied.rollback(&secrets).await;

        let puts = requests_with_method(&recorder, "PUT");
        assert_eq!(puts.len(), 2);
        assert_eq!(puts[1].body["metadata"]["resourceVersion"], "4");
        let password = puts[1].body["data"][keys::KEY_PASSWORD].as_str().unwrap();
        assert_eq!(
            base64::engine::general_purpose::STANDARD.decode(password).unwrap(),
            b"bar"
        );
        assert!(requests_with_method(&recorder, "DELETE").is_empty());
    }

    #[tokio::test]
    async fn test_dangling_reference_is_no_auth() {
        let secrets: Api<Secret> = Api::namespaced(MockService::new().into_client(), "default");
        let mut fetch: Fetch = serde_json::from_value(serde_json::json!({
            "imgpkgBundle": {"image": "projects.registry.vmware.com/tce/main:0.9.1"}
        }))
        .unwrap();
        fetch.set_secret_name(Some("gone".to_string()));

        let state = current_state(&secrets, &fetch).await.unwrap();
        assert!(matches!(state, AuthState::None));
    }

    fn managed_bearer_json() -> String {
        serde_json::to_string(&managed_bearer()).unwrap()
    }
}
