// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Shape, read and redact repository auth secrets.

use crate::api::{self, PackageRepositoryAuthData};
use crate::auth::credentials::{AuthKind, Credentials};
use crate::constants::{annotations, secrets, REDACTED};
use crate::error::{PluginError, Result};
use base64::Engine;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;

/// Fully resolved credential values, ready to be written
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CredentialValues {
    BasicAuth {
        username: String,
        password: String,
    },
    Bearer {
        token: String,
    },
    DockerConfigJson {
        server: String,
        username: String,
        password: String,
        email: String,
    },
    Ssh {
        private_key: String,
        known_hosts: String,
    },
}

impl CredentialValues {
    pub fn kind(&self) -> AuthKind {
        match self {
            CredentialValues::BasicAuth { .. } => AuthKind::BasicAuth,
            CredentialValues::Bearer { .. } => AuthKind::Bearer,
            CredentialValues::DockerConfigJson { .. } => AuthKind::DockerConfigJson,
            CredentialValues::Ssh { .. } => AuthKind::Ssh,
        }
    }

    /// Secret data for these credentials
    pub fn to_data(&self) -> Result<BTreeMap<String, ByteString>> {
        let entries: Vec<(&str, String)> = match self {
            CredentialValues::BasicAuth { username, password } => vec![
                (secrets::KEY_USERNAME, username.clone()),
                (secrets::KEY_PASSWORD, password.clone()),
            ],
            CredentialValues::Bearer { token } => vec![(secrets::KEY_TOKEN, token.clone())],
            CredentialValues::DockerConfigJson {
                server,
                username,
                password,
                email,
            } => {
                let auth = base64::engine::general_purpose::STANDARD
                    .encode(format!("{}:{}", username, password));
                let config = serde_json::json!({
                    "auths": {
                        server.as_str(): {
                            "username": username,
                            "password": password,
                            "email": email,
                            "auth": auth
                        }
                    }
                });
                vec![(secrets::KEY_DOCKER_CONFIG_JSON, serde_json::to_string(&config)?)]
            }
            CredentialValues::Ssh {
                private_key,
                known_hosts,
            } => {
                let mut entries = vec![(secrets::KEY_SSH_PRIVATE_KEY, private_key.clone())];
                if !known_hosts.is_empty() {
                    entries.push((secrets::KEY_SSH_KNOWN_HOSTS, known_hosts.clone()));
                }
                entries
            }
        };
        Ok(entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), ByteString(v.into_bytes())))
            .collect())
    }
}

/// Decoded value of one data key
pub fn secret_string(secret: &Secret, key: &str) -> Option<String> {
    secret
        .data
        .as_ref()
        .and_then(|d| d.get(key))
        .map(|b| String::from_utf8_lossy(&b.0).into_owned())
        .or_else(|| secret.string_data.as_ref().and_then(|d| d.get(key)).cloned())
}

fn has_key(secret: &Secret, key: &str) -> bool {
    secret_string(secret, key).is_some_and(|v| !v.is_empty())
}

pub fn is_plugin_managed(secret: &Secret) -> bool {
    secret
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(annotations::MANAGED_BY))
        .is_some_and(|v| v == annotations::MANAGED_BY_VALUE)
}

/// Auth type a secret holds, judged by its type and keys
pub fn detect_kind(secret: &Secret) -> Option<AuthKind> {
    match secret.type_.as_deref().unwrap_or(secrets::TYPE_OPAQUE) {
        secrets::TYPE_BASIC_AUTH => Some(AuthKind::BasicAuth),
        secrets::TYPE_DOCKER_CONFIG_JSON => Some(AuthKind::DockerConfigJson),
        secrets::TYPE_OPAQUE if has_key(secret, secrets::KEY_TOKEN) => Some(AuthKind::Bearer),
        secrets::TYPE_OPAQUE if has_key(secret, secrets::KEY_SSH_PRIVATE_KEY) => {
            Some(AuthKind::Ssh)
        }
        secrets::TYPE_OPAQUE if has_key(secret, secrets::KEY_USERNAME) => {
            Some(AuthKind::BasicAuth)
        }
        _ => None,
    }
}

/// A user-managed secret must carry the keys kapp-controller needs for the declared auth type
pub fn validate_user_secret(secret: &Secret, kind: AuthKind) -> Result<()> {
    let required: &[&str] = match kind {
        AuthKind::BasicAuth => &[secrets::KEY_USERNAME, secrets::KEY_PASSWORD],
        AuthKind::Bearer => &[secrets::KEY_TOKEN],
        AuthKind::DockerConfigJson => &[secrets::KEY_DOCKER_CONFIG_JSON],
        AuthKind::Ssh => &[secrets::KEY_SSH_PRIVATE_KEY],
    };
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|key| !has_key(secret, key))
        .collect();
    if !missing.is_empty() {
        return Err(PluginError::invalid(format!(
            "secret '{}' does not match auth type {:?}, missing key(s): {}",
            secret.metadata.name.as_deref().unwrap_or_default(),
            kind.to_wire(),
            missing.join(", ")
        )));
    }
    Ok(())
}

/// First registry entry of a dockerconfigjson secret
fn docker_entry(secret: &Secret) -> Option<(String, serde_json::Value)> {
    let raw = secret_string(secret, secrets::KEY_DOCKER_CONFIG_JSON)?;
    let config: serde_json::Value = serde_json::from_str(&raw).ok()?;
    config
        .get("auths")?
        .as_object()?
        .iter()
        .next()
        .map(|(server, entry)| (server.clone(), entry.clone()))
}

/// Read the credentials currently stored in a secret
pub fn stored_values(secret: &Secret) -> Option<CredentialValues> {
    let get = |key: &str| secret_string(secret, key).unwrap_or_default();
    match detect_kind(secret)? {
        AuthKind::BasicAuth => Some(CredentialValues::BasicAuth {
            username: get(secrets::KEY_USERNAME),
            password: get(secrets::KEY_PASSWORD),
        }),
        AuthKind::Bearer => Some(CredentialValues::Bearer {
            token: get(secrets::KEY_TOKEN),
        }),
        AuthKind::DockerConfigJson => {
            let (server, entry) = docker_entry(secret)?;
            let field = |name: &str| {
                entry
                    .get(name)
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string()
            };
            Some(CredentialValues::DockerConfigJson {
                server,
                username: field("username"),
                password: field("password"),
                email: field("email"),
            })
        }
        AuthKind::Ssh => Some(CredentialValues::Ssh {
            private_key: get(secrets::KEY_SSH_PRIVATE_KEY),
            known_hosts: get(secrets::KEY_SSH_KNOWN_HOSTS),
        }),
    }
}

fn required(field: &str, value: Option<String>) -> Result<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| PluginError::invalid(format!("missing required auth field '{}'", field)))
}

/// Merge requested credentials with the stored ones.
///
/// Redacted fields take the stored value; stored values of a different auth type are
/// never carried over.
pub fn merge_credentials(
    requested: &Credentials,
    stored: Option<&CredentialValues>,
) -> Result<CredentialValues> {
    let stored = stored.filter(|s| s.kind() == requested.kind());

    let values = match requested {
        Credentials::BasicAuth { username, password } => {
            let (prior_user, prior_pass) = match stored {
                Some(CredentialValues::BasicAuth { username, password }) => {
                    (Some(username.as_str()), Some(password.as_str()))
                }
                _ => (None, None),
            };
            CredentialValues::BasicAuth {
                username: required("username", username.resolve("username", prior_user)?)?,
                password: required("password", password.resolve("password", prior_pass)?)?,
            }
        }
        Credentials::Bearer { token } => {
            let prior = match stored {
                Some(CredentialValues::Bearer { token }) => Some(token.as_str()),
                _ => None,
            };
            CredentialValues::Bearer {
                token: required("token", token.resolve("token", prior)?)?,
            }
        }
        Credentials::DockerConfigJson {
            server,
            username,
            password,
            email,
        } => {
            let prior = match stored {
                Some(CredentialValues::DockerConfigJson {
                    server,
                    username,
                    password,
                    email,
                }) => Some((server, username, password, email)),
                _ => None,
            };
            CredentialValues::DockerConfigJson {
                server: required(
                    "server",
                    server.resolve("server", prior.map(|p| p.0.as_str()))?,
                )?,
                username: required(
                    "username",
                    username.resolve("username", prior.map(|p| p.1.as_str()))?,
                )?,
                password: required(
                    "password",
                    password.resolve("password", prior.map(|p| p.2.as_str()))?,
                )?,
                email: email
                    .resolve("email", prior.map(|p| p.3.as_str()))?
                    .unwrap_or_default(),
            }
        }
        Credentials::Ssh {
            private_key,
            known_hosts,
        } => {
            let prior = match stored {
                Some(CredentialValues::Ssh {
                    private_key,
                    known_hosts,
                }) => Some((private_key, known_hosts)),
                _ => None,
            };
            CredentialValues::Ssh {
                private_key: required(
                    "privateKey",
                    private_key.resolve("privateKey", prior.map(|p| p.0.as_str()))?,
                )?,
                known_hosts: known_hosts
                    .resolve("knownHosts", prior.map(|p| p.1.as_str()))?
                    .unwrap_or_default(),
            }
        }
    };
    Ok(values)
}

/// New plugin-managed secret for a repository; the name is generated by the API server
pub fn build_managed_secret(
    values: &CredentialValues,
    namespace: &str,
    repository_name: &str,
) -> Result<Secret> {
    Ok(Secret {
        metadata: ObjectMeta {
            generate_name: Some(format!("{}-", repository_name)),
            namespace: Some(namespace.to_string()),
            annotations: Some(BTreeMap::from([(
                annotations::MANAGED_BY.to_string(),
                annotations::MANAGED_BY_VALUE.to_string(),
            )])),
            ..Default::default()
        },
        type_: Some(values.kind().secret_type().to_string()),
        data: Some(values.to_data()?),
        ..Default::default()
    })
}

/// Auth as shown to clients: plugin-managed material is replaced by the placeholder,
/// user-managed secrets are only referenced
pub fn redacted_auth(secret: &Secret) -> api::PackageRepositoryAuth {
    let name = secret.metadata.name.clone().unwrap_or_default();
    let auth_type = detect_kind(secret)
        .map(AuthKind::to_wire)
        .unwrap_or_default();

    let data = if is_plugin_managed(secret) {
        stored_values(secret).map(|values| redact(&values))
    } else {
        None
    };
    let data = data.unwrap_or(PackageRepositoryAuthData::SecretRef(
        api::SecretKeyReference {
            name,
            key: String::new(),
        },
    ));

    api::PackageRepositoryAuth {
        auth_type,
        pass_credentials: false,
        package_repo_auth_one_of: Some(data),
    }
}

fn redact(values: &CredentialValues) -> PackageRepositoryAuthData {
    let r = |v: &str| {
        if v.is_empty() {
            String::new()
        } else {
            REDACTED.to_string()
        }
    };
    match values {
        CredentialValues::BasicAuth { username, password } => {
            PackageRepositoryAuthData::UsernamePassword(api::UsernamePassword {
                username: r(username),
                password: r(password),
            })
        }
        CredentialValues::Bearer { token } => PackageRepositoryAuthData::Header(r(token)),
        CredentialValues::DockerConfigJson {
            server,
            username,
            password,
            email,
        } => PackageRepositoryAuthData::DockerCreds(api::DockerCredentials {
            server: r(server),
            username: r(username),
            password: r(password),
            email: r(email),
        }),
        CredentialValues::Ssh {
            private_key,
            known_hosts,
        } => PackageRepositoryAuthData::SshCreds(api::SshCredentials {
            private_key: r(private_key),
            known_hosts: r(known_hosts),
        }),
    }
}
