// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Typed view of the repository auth carried by API requests.

use crate::api::{self, AuthType, PackageRepositoryAuthData};
use crate::constants::{secrets, REDACTED};
use crate::error::{PluginError, Result};
use crate::types::FetchType;

/// A credential field as sent by a client
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credential {
    Unset,
    /// The client echoed back the placeholder it was given, meaning "keep the stored value"
    Redacted,
    Value(String),
}

impl Credential {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "" => Credential::Unset,
            REDACTED => Credential::Redacted,
            value => Credential::Value(value.to_string()),
        }
    }

    /// Resolve against the value currently stored, if any
    pub fn resolve(&self, field: &str, prior: Option<&str>) -> Result<Option<String>> {
        match self {
            Credential::Unset => Ok(None),
            Credential::Value(v) => Ok(Some(v.clone())),
            Credential::Redacted => prior
                .filter(|p| !p.is_empty())
                .map(|p| Some(p.to_string()))
                .ok_or_else(|| {
                    PluginError::invalid(format!(
                        "unexpected REDACTED content for '{}', there is no stored value to keep",
                        field
                    ))
                }),
        }
    }
}

/// Auth types this plugin can store in a secret
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthKind {
    BasicAuth,
    Bearer,
    DockerConfigJson,
    Ssh,
}

impl AuthKind {
    /// `None` for an unspecified type
    pub fn from_wire(auth_type: AuthType) -> Result<Option<Self>> {
        match auth_type {
            AuthType::PackageRepositoryAuthTypeUnspecified => Ok(None),
            AuthType::PackageRepositoryAuthTypeBasicAuth => Ok(Some(AuthKind::BasicAuth)),
            AuthType::PackageRepositoryAuthTypeBearer => Ok(Some(AuthKind::Bearer)),
            AuthType::PackageRepositoryAuthTypeDockerConfigJson => {
                Ok(Some(AuthKind::DockerConfigJson))
            }
            AuthType::PackageRepositoryAuthTypeSsh => Ok(Some(AuthKind::Ssh)),
            other => Err(PluginError::invalid(format!(
                "auth type {:?} is not supported by kapp-controller repositories",
                other
            ))),
        }
    }

    pub fn to_wire(self) -> AuthType {
        match self {
            AuthKind::BasicAuth => AuthType::PackageRepositoryAuthTypeBasicAuth,
            AuthKind::Bearer => AuthType::PackageRepositoryAuthTypeBearer,
            AuthKind::DockerConfigJson => AuthType::PackageRepositoryAuthTypeDockerConfigJson,
            AuthKind::Ssh => AuthType::PackageRepositoryAuthTypeSsh,
        }
    }

    pub fn secret_type(self) -> &'static str {
        match self {
            AuthKind::BasicAuth => secrets::TYPE_BASIC_AUTH,
            AuthKind::DockerConfigJson => secrets::TYPE_DOCKER_CONFIG_JSON,
            AuthKind::Bearer | AuthKind::Ssh => secrets::TYPE_OPAQUE,
        }
    }

    pub fn compatible_with(self, fetch_type: FetchType) -> bool {
        match fetch_type {
            FetchType::ImgpkgBundle | FetchType::Image | FetchType::Http => matches!(
                self,
                AuthKind::BasicAuth | AuthKind::Bearer | AuthKind::DockerConfigJson
            ),
            FetchType::Git => matches!(self, AuthKind::BasicAuth | AuthKind::Ssh),
            FetchType::Inline => false,
        }
    }
}

/// Credential material supplied inline, for a plugin-managed secret
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credentials {
    BasicAuth {
        username: Credential,
        password: Credential,
    },
    Bearer {
        token: Credential,
    },
    DockerConfigJson {
        server: Credential,
        username: Credential,
        password: Credential,
        email: Credential,
    },
    Ssh {
        private_key: Credential,
        known_hosts: Credential,
    },
}

impl Credentials {
    pub fn kind(&self) -> AuthKind {
        match self {
            Credentials::BasicAuth { .. } => AuthKind::BasicAuth,
            Credentials::Bearer { .. } => AuthKind::Bearer,
            Credentials::DockerConfigJson { .. } => AuthKind::DockerConfigJson,
            Credentials::Ssh { .. } => AuthKind::Ssh,
        }
    }
}

/// What a request asks for regarding repository auth
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthRequest {
    None,
    /// Reference to a secret the user manages
    SecretRef { kind: AuthKind, name: String },
    /// Credentials the plugin stores in a secret it owns
    Inline(Credentials),
}

/// Parse and validate the auth of a request against the repository's fetch type
pub fn parse_auth(
    auth: Option<&api::PackageRepositoryAuth>,
    fetch_type: FetchType,
) -> Result<AuthRequest> {
    let Some(auth) = auth else {
        return Ok(AuthRequest::None);
    };

    let Some(kind) = AuthKind::from_wire(auth.auth_type)? else {
        // Only a payload carrying values makes the intent ambiguous
        if auth
            .package_repo_auth_one_of
            .as_ref()
            .is_some_and(|data| !data.is_empty())
        {
            return Err(PluginError::invalid(
                "auth data provided without an auth type",
            ));
        }
        return Ok(AuthRequest::None);
    };

    if !kind.compatible_with(fetch_type) {
        return Err(PluginError::invalid(format!(
            "auth type {:?} is not supported for '{}' repositories",
            auth.auth_type, fetch_type
        )));
    }

    let mismatch = || {
        PluginError::invalid(format!(
            "auth data does not match auth type {:?}",
            auth.auth_type
        ))
    };

    let data = auth
        .package_repo_auth_one_of
        .as_ref()
        .ok_or_else(|| PluginError::invalid("auth type provided without auth data"))?;

    let credentials = match (kind, data) {
        (_, PackageRepositoryAuthData::SecretRef(secret_ref)) => {
            if secret_ref.name.is_empty() {
                return Err(PluginError::invalid("auth secret reference has no name"));
            }
            return Ok(AuthRequest::SecretRef {
                kind,
                name: secret_ref.name.clone(),
            });
        }
        (AuthKind::BasicAuth, PackageRepositoryAuthData::UsernamePassword(up)) => {
            Credentials::BasicAuth {
                username: Credential::parse(&up.username),
                password: Credential::parse(&up.password),
            }
        }
        (AuthKind::Bearer, PackageRepositoryAuthData::Header(header)) => Credentials::Bearer {
            token: Credential::parse(header.strip_prefix("Bearer ").unwrap_or(header)),
        },
        (AuthKind::DockerConfigJson, PackageRepositoryAuthData::DockerCreds(docker)) => {
            Credentials::DockerConfigJson {
                server: Credential::parse(&docker.server),
                username: Credential::parse(&docker.username),
                password: Credential::parse(&docker.password),
                email: Credential::parse(&docker.email),
            }
        }
        (AuthKind::Ssh, PackageRepositoryAuthData::SshCreds(ssh)) => Credentials::Ssh {
            private_key: Credential::parse(&ssh.private_key),
            known_hosts: Credential::parse(&ssh.known_hosts),
        },
        _ => return Err(mismatch()),
    };
    Ok(AuthRequest::Inline(credentials))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn make_auth(auth_type: AuthType, data: Option<PackageRepositoryAuthData>) -> api::PackageRepositoryAuth {
        api::PackageRepositoryAuth {
            auth_type,
            pass_credentials: false,
            package_repo_auth_one_of: data,
        }
    }

    fn basic(username: &str, password: &str) -> PackageRepositoryAuthData {
        PackageRepositoryAuthData::UsernamePassword(api::UsernamePassword {
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    #[test]
    fn test_credential_parse() {
        assert_eq!(Credential::parse(""), Credential::Unset);
        assert_eq!(Credential::parse(REDACTED), Credential::Redacted);
        assert_eq!(Credential::parse("foo"), Credential::Value("foo".to_string()));
    }

    #[test]
    fn test_redacted_resolves_to_prior_value() {
        let resolved = Credential::Redacted.resolve("username", Some("foo")).unwrap();
        assert_eq!(resolved.as_deref(), Some("foo"));
    }

    #[test]
    fn test_redacted_without_prior_value_is_invalid() {
        let err = Credential::Redacted.resolve("username", None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
        assert!(err.to_string().contains("unexpected REDACTED content"));
    }

    #[test]
    fn test_missing_auth_is_none() {
        assert_eq!(parse_auth(None, FetchType::Git).unwrap(), AuthRequest::None);
        let unspecified = make_auth(AuthType::PackageRepositoryAuthTypeUnspecified, None);
        assert_eq!(
            parse_auth(Some(&unspecified), FetchType::Git).unwrap(),
            AuthRequest::None
        );
    }

    #[test]
    fn test_data_without_type_is_invalid() {
        let auth = make_auth(
            AuthType::PackageRepositoryAuthTypeUnspecified,
            Some(basic("foo", "bar")),
        );
        let err = parse_auth(Some(&auth), FetchType::Image).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_empty_data_without_type_is_none() {
        let auth = make_auth(
            AuthType::PackageRepositoryAuthTypeUnspecified,
            Some(basic("", "")),
        );
        assert_eq!(
            parse_auth(Some(&auth), FetchType::Image).unwrap(),
            AuthRequest::None
        );

        let header = make_auth(
            AuthType::PackageRepositoryAuthTypeUnspecified,
            Some(PackageRepositoryAuthData::Header(String::new())),
        );
        assert_eq!(
            parse_auth(Some(&header), FetchType::Http).unwrap(),
            AuthRequest::None
        );

        // A single filled-in field is still ambiguous
        let partial = make_auth(
            AuthType::PackageRepositoryAuthTypeUnspecified,
            Some(basic("", "bar")),
        );
        assert!(parse_auth(Some(&partial), FetchType::Image).is_err());
    }

    #[test]
    fn test_fetch_type_compatibility() {
        let ssh = make_auth(
            AuthType::PackageRepositoryAuthTypeSsh,
            Some(PackageRepositoryAuthData::SshCreds(api::SshCredentials {
                private_key: "key".to_string(),
                known_hosts: String::new(),
            })),
        );
        assert!(parse_auth(Some(&ssh), FetchType::Git).is_ok());
        assert!(parse_auth(Some(&ssh), FetchType::ImgpkgBundle).is_err());

        let basic_auth = make_auth(
            AuthType::PackageRepositoryAuthTypeBasicAuth,
            Some(basic("foo", "bar")),
        );
        assert!(parse_auth(Some(&basic_auth), FetchType::Http).is_ok());
        assert!(parse_auth(Some(&basic_auth), FetchType::Inline).is_err());
    }

    #[test]
    fn test_unsupported_auth_type() {
        let tls = make_auth(AuthType::PackageRepositoryAuthTypeTls, None);
        let err = parse_auth(Some(&tls), FetchType::Image).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_data_must_match_type() {
        let auth = make_auth(
            AuthType::PackageRepositoryAuthTypeBearer,
            Some(basic("foo", "bar")),
        );
        assert!(parse_auth(Some(&auth), FetchType::Image).is_err());
    }

    #[test]
    fn test_bearer_prefix_is_stripped() {
        let auth = make_auth(
            AuthType::PackageRepositoryAuthTypeBearer,
            Some(PackageRepositoryAuthData::Header("Bearer abc".to_string())),
        );
        assert_eq!(
            parse_auth(Some(&auth), FetchType::Image).unwrap(),
            AuthRequest::Inline(Credentials::Bearer {
                token: Credential::Value("abc".to_string())
            })
        );
    }

    #[test]
    fn test_secret_ref() {
        let auth = make_auth(
            AuthType::PackageRepositoryAuthTypeBasicAuth,
            Some(PackageRepositoryAuthData::SecretRef(api::SecretKeyReference {
                name: "my-creds".to_string(),
                key: String::new(),
            })),
        );
        assert_eq!(
            parse_auth(Some(&auth), FetchType::Git).unwrap(),
            AuthRequest::SecretRef {
                kind: AuthKind::BasicAuth,
                name: "my-creds".to_string()
            }
        );
    }

    #[test]
    fn test_redacted_placeholder_is_recognised() {
        let auth = make_auth(
            AuthType::PackageRepositoryAuthTypeBasicAuth,
            Some(basic(REDACTED, "bar2")),
        );
        let AuthRequest::Inline(credentials) = parse_auth(Some(&auth), FetchType::Image).unwrap()
        else {
            panic!("expected inline credentials");
        };
        assert_eq!(credentials.kind(), AuthKind::BasicAuth);
        let Credentials::BasicAuth { username, .. } = credentials else {
            panic!("expected basic auth");
        };
        assert_eq!(username, Credential::Redacted);
    }
}
