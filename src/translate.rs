// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Mapping between the repository fields of the API and a PackageRepository fetch spec.

use crate::api;
use crate::constants::REPOSITORY_CUSTOM_DETAIL_TYPE;
use crate::error::{PluginError, Result};
use crate::types::package_install::{VersionSelectionSemver, VersionSelectionSemverPrereleases};
use crate::types::package_repository::{
    Fetch, FetchGit, FetchHttp, FetchImage, FetchImgpkgBundle, FetchInline, FetchType,
    InlineSource, InlineSourceRef, VersionSelection,
};

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

fn detail_type(detail: &api::PackageRepositoryFetch) -> FetchType {
    match detail {
        api::PackageRepositoryFetch::ImgpkgBundle(_) => FetchType::ImgpkgBundle,
        api::PackageRepositoryFetch::Image(_) => FetchType::Image,
        api::PackageRepositoryFetch::Git(_) => FetchType::Git,
        api::PackageRepositoryFetch::Http(_) => FetchType::Http,
        api::PackageRepositoryFetch::Inline(_) => FetchType::Inline,
    }
}

pub fn parse_fetch_type(repo_type: &str) -> Result<FetchType> {
    if repo_type.is_empty() {
        return Err(PluginError::invalid("no repository type provided"));
    }
    repo_type.parse().map_err(PluginError::InvalidArgument)
}

/// Unpack the plugin custom detail, rejecting payloads meant for another plugin
pub fn parse_custom_detail(
    detail: Option<&api::CustomDetail>,
) -> Result<Option<api::PackageRepositoryFetch>> {
    let Some(detail) = detail else {
        return Ok(None);
    };
    if detail.type_url != REPOSITORY_CUSTOM_DETAIL_TYPE {
        return Err(PluginError::invalid(format!(
            "custom detail of unexpected type '{}'",
            detail.type_url
        )));
    }
    let parsed: api::KappControllerPackageRepositoryCustomDetail =
        serde_json::from_value(detail.value.clone())
            .map_err(|e| PluginError::invalid(format!("invalid custom detail: {}", e)))?;
    Ok(parsed.fetch)
}

/// Inline repositories carry their content, every other type needs a location
pub fn validate_url(fetch_type: FetchType, repo_url: &str) -> Result<()> {
    match fetch_type {
        FetchType::Inline if !repo_url.is_empty() => Err(PluginError::invalid(
            "inline repositories do not accept a url",
        )),
        FetchType::Inline => Ok(()),
        _ if repo_url.is_empty() => Err(PluginError::invalid("no repository url provided")),
        FetchType::Http => url::Url::parse(repo_url)
            .map(|_| ())
            .map_err(|e| PluginError::invalid(format!("invalid repository url '{}': {}", repo_url, e))),
        _ => Ok(()),
    }
}

/// Sync periods are Go durations such as `10m` or `1h30m`; empty means the default
pub fn validate_interval(interval: &str) -> Result<()> {
    if interval.is_empty() {
        return Ok(());
    }
    let duration = regex::Regex::new(r"^([0-9]+(\.[0-9]+)?(ns|us|µs|ms|s|m|h))+$")
        .map_err(|e| PluginError::Internal(format!("failed to compile regex: {}", e)))?;
    if !duration.is_match(interval) {
        return Err(PluginError::invalid(format!(
            "invalid interval '{}', expected a duration such as 10m or 1h30m",
            interval
        )));
    }
    Ok(())
}

/// Build the fetch spec for a new repository
pub fn fetch_from_request(
    fetch_type: FetchType,
    repo_url: &str,
    detail: Option<api::PackageRepositoryFetch>,
) -> Result<Fetch> {
    validate_url(fetch_type, repo_url)?;
    let url = repo_url.to_string();
    let mut fetch = match fetch_type {
        FetchType::ImgpkgBundle => Fetch::ImgpkgBundle(FetchImgpkgBundle {
            image: url,
            ..Default::default()
        }),
        FetchType::Image => Fetch::Image(FetchImage {
            url,
            ..Default::default()
        }),
        FetchType::Git => Fetch::Git(FetchGit {
            url,
            ..Default::default()
        }),
        FetchType::Http => Fetch::Http(FetchHttp {
            url,
            ..Default::default()
        }),
        FetchType::Inline => Fetch::Inline(FetchInline::default()),
    };
    if let Some(detail) = detail {
        apply_detail(&mut fetch, detail)?;
    }
    Ok(fetch)
}

/// Apply an update request: new location, and the options when a detail is supplied
pub fn apply_update(
    fetch: &mut Fetch,
    repo_url: &str,
    detail: Option<api::PackageRepositoryFetch>,
) -> Result<()> {
    validate_url(fetch.fetch_type(), repo_url)?;
    fetch.set_url(repo_url.to_string());
    if let Some(detail) = detail {
        apply_detail(fetch, detail)?;
    }
    Ok(())
}

/// Overwrite the type-specific options, keeping location and secret
fn apply_detail(fetch: &mut Fetch, detail: api::PackageRepositoryFetch) -> Result<()> {
    let declared = detail_type(&detail);
    match (fetch, detail) {
        (Fetch::ImgpkgBundle(f), api::PackageRepositoryFetch::ImgpkgBundle(d)) => {
            f.tag_selection = d.tag_selection.map(selection_to_spec);
        }
        (Fetch::Image(f), api::PackageRepositoryFetch::Image(d)) => {
            f.tag_selection = d.tag_selection.map(selection_to_spec);
            f.sub_path = non_empty(&d.sub_path);
        }
        (Fetch::Git(f), api::PackageRepositoryFetch::Git(d)) => {
            f.git_ref = non_empty(&d.git_ref);
            f.ref_selection = d.ref_selection.map(selection_to_spec);
            f.sub_path = non_empty(&d.sub_path);
            f.lfs_skip_smudge = d.lfs_skip_smudge.then_some(true);
        }
        (Fetch::Http(f), api::PackageRepositoryFetch::Http(d)) => {
            f.sub_path = non_empty(&d.sub_path);
            f.sha256 = non_empty(&d.sha256);
        }
        (Fetch::Inline(f), api::PackageRepositoryFetch::Inline(d)) => {
            f.paths = d.paths;
            f.paths_from = d.paths_from.into_iter().map(inline_source_to_spec).collect();
        }
        (fetch, _) => {
            return Err(PluginError::invalid(format!(
                "custom detail for a '{}' repository does not match repository type '{}'",
                declared,
                fetch.fetch_type()
            )));
        }
    }
    Ok(())
}

/// Custom detail describing the options of an existing fetch spec
pub fn custom_detail_from_fetch(fetch: &Fetch) -> Result<api::CustomDetail> {
    let detail = match fetch {
        Fetch::ImgpkgBundle(f) => api::PackageRepositoryFetch::ImgpkgBundle(api::ImgpkgBundleDetail {
            tag_selection: f.tag_selection.clone().map(selection_to_api),
        }),
        Fetch::Image(f) => api::PackageRepositoryFetch::Image(api::ImageDetail {
            tag_selection: f.tag_selection.clone().map(selection_to_api),
            sub_path: f.sub_path.clone().unwrap_or_default(),
        }),
        Fetch::Git(f) => api::PackageRepositoryFetch::Git(api::GitDetail {
            git_ref: f.git_ref.clone().unwrap_or_default(),
            ref_selection: f.ref_selection.clone().map(selection_to_api),
            sub_path: f.sub_path.clone().unwrap_or_default(),
            lfs_skip_smudge: f.lfs_skip_smudge.unwrap_or(false),
        }),
        Fetch::Http(f) => api::PackageRepositoryFetch::Http(api::HttpDetail {
            sub_path: f.sub_path.clone().unwrap_or_default(),
            sha256: f.sha256.clone().unwrap_or_default(),
        }),
        Fetch::Inline(f) => api::PackageRepositoryFetch::Inline(api::InlineDetail {
            paths: f.paths.clone(),
            paths_from: f.paths_from.iter().cloned().map(inline_source_to_api).collect(),
        }),
    };
    let value = serde_json::to_value(api::KappControllerPackageRepositoryCustomDetail {
        fetch: Some(detail),
    })?;
    Ok(api::CustomDetail {
        type_url: REPOSITORY_CUSTOM_DETAIL_TYPE.to_string(),
        value,
    })
}

/// JSON merge patch replacing the fetch spec: unset optional fields become explicit
/// nulls so the API server drops previous values
pub fn fetch_merge_patch(fetch: &Fetch) -> Result<serde_json::Value> {
    let optional_keys: &[&str] = match fetch {
        Fetch::ImgpkgBundle(_) => &["secretRef", "tagSelection"],
        Fetch::Image(_) => &["secretRef", "subPath", "tagSelection"],
        Fetch::Git(_) => &["ref", "refSelection", "secretRef", "subPath", "lfsSkipSmudge"],
        Fetch::Http(_) => &["sha256", "secretRef", "subPath"],
        Fetch::Inline(_) => &["paths", "pathsFrom"],
    };

    let mut patch = serde_json::to_value(fetch)?;
    if let Some(variant) = patch
        .get_mut(fetch.fetch_type().as_str())
        .and_then(|v| v.as_object_mut())
    {
        for key in optional_keys {
            variant
                .entry(key.to_string())
                .or_insert(serde_json::Value::Null);
        }
    }
    Ok(patch)
}

fn selection_to_spec(selection: api::VersionSelection) -> VersionSelection {
    VersionSelection {
        semver: selection.semver.map(|s| VersionSelectionSemver {
            constraints: s.constraints,
            prereleases: s.prereleases.map(|p| VersionSelectionSemverPrereleases {
                identifiers: p.identifiers,
            }),
        }),
    }
}

fn selection_to_api(selection: VersionSelection) -> api::VersionSelection {
    api::VersionSelection {
        semver: selection.semver.map(|s| api::VersionSelectionSemver {
            constraints: s.constraints,
            prereleases: s.prereleases.map(|p| api::VersionSelectionSemverPrereleases {
                identifiers: p.identifiers,
            }),
        }),
    }
}

fn inline_source_to_spec(source: api::InlineSource) -> InlineSource {
    let to_ref = |r: api::InlineSourceRef| InlineSourceRef {
        name: r.name,
        directory_path: non_empty(&r.directory_path),
    };
    InlineSource {
        secret_ref: source.secret_ref.map(to_ref),
        config_map_ref: source.config_map_ref.map(to_ref),
    }
}

fn inline_source_to_api(source: InlineSource) -> api::InlineSource {
    let to_ref = |r: InlineSourceRef| api::InlineSourceRef {
        name: r.name,
        directory_path: r.directory_path.unwrap_or_default(),
    };
    api::InlineSource {
        secret_ref: source.secret_ref.map(to_ref),
        config_map_ref: source.config_map_ref.map(to_ref),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn git_detail() -> api::PackageRepositoryFetch {
        api::PackageRepositoryFetch::Git(api::GitDetail {
            git_ref: "origin/main".to_string(),
            ref_selection: None,
            sub_path: "repo".to_string(),
            lfs_skip_smudge: true,
        })
    }

    fn wrap(detail: api::PackageRepositoryFetch) -> api::CustomDetail {
        api::CustomDetail {
            type_url: REPOSITORY_CUSTOM_DETAIL_TYPE.to_string(),
            value: serde_json::to_value(api::KappControllerPackageRepositoryCustomDetail {
                fetch: Some(detail),
            })
            .unwrap(),
        }
    }

    #[test]
    fn test_git_fetch_from_request() {
        let fetch =
            fetch_from_request(FetchType::Git, "https://github.com/foo/bar", Some(git_detail()))
                .unwrap();

        assert_eq!(
            fetch,
            Fetch::Git(FetchGit {
                url: "https://github.com/foo/bar".to_string(),
                git_ref: Some("origin/main".to_string()),
                sub_path: Some("repo".to_string()),
                lfs_skip_smudge: Some(true),
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_detail_type_mismatch_is_rejected() {
        let err = fetch_from_request(
            FetchType::ImgpkgBundle,
            "projects.registry.vmware.com/tce/main:0.9.1",
            Some(git_detail()),
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_foreign_custom_detail_is_rejected() {
        let detail = api::CustomDetail {
            type_url: "type.googleapis.com/kubeappsapis.plugins.helm.packages.v1alpha1.HelmPackageRepositoryCustomDetail".to_string(),
            value: serde_json::json!({}),
        };
        let err = parse_custom_detail(Some(&detail)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_parse_custom_detail() {
        assert_eq!(parse_custom_detail(None).unwrap(), None);
        assert_eq!(
            parse_custom_detail(Some(&wrap(git_detail()))).unwrap(),
            Some(git_detail())
        );
    }

    #[test]
    fn test_custom_detail_from_fetch_matches_request() {
        let fetch =
            fetch_from_request(FetchType::Git, "https://github.com/foo/bar", Some(git_detail()))
                .unwrap();
        assert_eq!(custom_detail_from_fetch(&fetch).unwrap(), wrap(git_detail()));
    }

    fn round_trip(fetch_type: FetchType, url: &str, detail: api::PackageRepositoryFetch) {
        let fetch = fetch_from_request(fetch_type, url, Some(detail.clone())).unwrap();
        assert_eq!(fetch.fetch_type(), fetch_type);
        assert_eq!(custom_detail_from_fetch(&fetch).unwrap(), wrap(detail));
    }

    fn tag_selection(constraints: &str, prereleases: &[&str]) -> api::VersionSelection {
        api::VersionSelection {
            semver: Some(api::VersionSelectionSemver {
                constraints: constraints.to_string(),
                prereleases: Some(api::VersionSelectionSemverPrereleases {
                    identifiers: prereleases.iter().map(|p| p.to_string()).collect(),
                }),
            }),
        }
    }

    #[test]
    fn test_imgpkg_bundle_detail_round_trip() {
        round_trip(
            FetchType::ImgpkgBundle,
            "projects.registry.vmware.com/tce/main",
            api::PackageRepositoryFetch::ImgpkgBundle(api::ImgpkgBundleDetail {
                tag_selection: Some(tag_selection(">=0.9.0", &["rc"])),
            }),
        );
    }

    #[test]
    fn test_image_detail_round_trip() {
        round_trip(
            FetchType::Image,
            "projects.registry.vmware.com/tce/repo",
            api::PackageRepositoryFetch::Image(api::ImageDetail {
                tag_selection: Some(tag_selection("1.x", &[])),
                sub_path: "packages".to_string(),
            }),
        );
    }

    #[test]
    fn test_git_detail_round_trip_with_ref_selection() {
        round_trip(
            FetchType::Git,
            "https://github.com/foo/bar",
            api::PackageRepositoryFetch::Git(api::GitDetail {
                git_ref: String::new(),
                ref_selection: Some(tag_selection(">=1.0.0", &["beta"])),
                sub_path: String::new(),
                lfs_skip_smudge: false,
            }),
        );
    }

    #[test]
    fn test_http_detail_round_trip() {
        let detail = api::PackageRepositoryFetch::Http(api::HttpDetail {
            sub_path: "repo".to_string(),
            sha256: "0ba0a3b5c3d1f2e1".to_string(),
        });
        round_trip(FetchType::Http, "https://example.com/repo.tar.gz", detail.clone());

        let fetch =
            fetch_from_request(FetchType::Http, "https://example.com/repo.tar.gz", Some(detail))
                .unwrap();
        assert_eq!(
            fetch,
            Fetch::Http(FetchHttp {
                url: "https://example.com/repo.tar.gz".to_string(),
                sub_path: Some("repo".to_string()),
                sha256: Some("0ba0a3b5c3d1f2e1".to_string()),
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_inline_detail_round_trip() {
        let detail = api::PackageRepositoryFetch::Inline(api::InlineDetail {
            paths: [(
                "packages/foo.yaml".to_string(),
                "apiVersion: data.packaging.carvel.dev/v1alpha1".to_string(),
            )]
            .into_iter()
            .collect(),
            paths_from: vec![
                api::InlineSource {
                    secret_ref: Some(api::InlineSourceRef {
                        name: "pkg-secret".to_string(),
                        directory_path: "packages".to_string(),
                    }),
                    config_map_ref: None,
                },
                api::InlineSource {
                    secret_ref: None,
                    config_map_ref: Some(api::InlineSourceRef {
                        name: "pkg-config".to_string(),
                        directory_path: String::new(),
                    }),
                },
            ],
        });
        round_trip(FetchType::Inline, "", detail.clone());

        let Fetch::Inline(inline) = fetch_from_request(FetchType::Inline, "", Some(detail)).unwrap()
        else {
            panic!("expected inline fetch");
        };
        assert_eq!(inline.paths_from.len(), 2);
        let secret_ref = inline.paths_from[0].secret_ref.as_ref().unwrap();
        assert_eq!(secret_ref.directory_path.as_deref(), Some("packages"));
        let config_map_ref = inline.paths_from[1].config_map_ref.as_ref().unwrap();
        assert_eq!(config_map_ref.directory_path, None);
    }

    #[test]
    fn test_apply_update_replaces_image_options() {
        let mut fetch = fetch_from_request(
            FetchType::Image,
            "registry.example.com/repo",
            Some(api::PackageRepositoryFetch::Image(api::ImageDetail {
                tag_selection: Some(tag_selection(">=1.0.0", &[])),
                sub_path: "old".to_string(),
            })),
        )
        .unwrap();

        apply_update(
            &mut fetch,
            "registry.example.com/other",
            Some(api::PackageRepositoryFetch::Image(api::ImageDetail {
                tag_selection: None,
                sub_path: "new".to_string(),
            })),
        )
        .unwrap();

        assert_eq!(
            fetch,
            Fetch::Image(FetchImage {
                url: "registry.example.com/other".to_string(),
                sub_path: Some("new".to_string()),
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_url_validation() {
        assert!(validate_url(FetchType::Image, "").is_err());
        assert!(validate_url(FetchType::Inline, "http://example.com").is_err());
        assert!(validate_url(FetchType::Inline, "").is_ok());
        assert!(validate_url(FetchType::Http, "not a url").is_err());
        assert!(validate_url(FetchType::Http, "https://example.com/repo.tar.gz").is_ok());
        assert!(validate_url(FetchType::Git, "git@github.com:foo/bar.git").is_ok());
    }

    #[test]
    fn test_validate_interval() {
        for ok in ["", "10m", "24h", "1h30m", "1.5h", "300ms"] {
            assert!(validate_interval(ok).is_ok(), "{}", ok);
        }
        for bad in ["10", "ten minutes", "1d", "m10"] {
            assert!(validate_interval(bad).is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_parse_fetch_type() {
        assert_eq!(parse_fetch_type("http").unwrap(), FetchType::Http);
        assert_eq!(parse_fetch_type("").unwrap_err().code(), ErrorCode::InvalidArgument);
        assert_eq!(parse_fetch_type("helm").unwrap_err().code(), ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_apply_update_keeps_secret_and_options_without_detail() {
        let mut fetch = Fetch::Http(FetchHttp {
            url: "https://example.com/old.tar.gz".to_string(),
            sha256: Some("abc".to_string()),
            ..Default::default()
        });
        fetch.set_secret_name(Some("creds".to_string()));

        apply_update(&mut fetch, "https://example.com/new.tar.gz", None).unwrap();

        assert_eq!(fetch.url(), Some("https://example.com/new.tar.gz"));
        assert_eq!(fetch.secret_name(), Some("creds"));
        let Fetch::Http(http) = &fetch else {
            panic!("expected http fetch");
        };
        assert_eq!(http.sha256.as_deref(), Some("abc"));
    }

    #[test]
    fn test_fetch_merge_patch_nulls_unset_fields() {
        let fetch = Fetch::Http(FetchHttp {
            url: "https://example.com/repo.tar.gz".to_string(),
            ..Default::default()
        });
        assert_eq!(
            fetch_merge_patch(&fetch).unwrap(),
            serde_json::json!({"http": {
                "url": "https://example.com/repo.tar.gz",
                "sha256": null,
                "secretRef": null,
                "subPath": null
            }})
        );
    }
}
