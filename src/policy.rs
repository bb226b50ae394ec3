// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Turns a pinned version and the configured upgrade policy into the version
//! selection written on a PackageInstall.

use crate::config::{PluginConfig, UpgradePolicy};
use crate::error::{PluginError, Result};
use crate::types::package_install::{VersionSelectionSemver, VersionSelectionSemverPrereleases};
use crate::versions;
use semver::Version;
use std::cmp::Ordering;

/// Range expression allowed by `policy` around `base`
pub fn derive_constraint(base: &Version, policy: UpgradePolicy) -> Result<String> {
    let upper_bound = |component: u64| {
        component.checked_add(1).ok_or_else(|| {
            PluginError::invalid(format!(
                "version {} cannot be upgraded under the {} upgrade policy",
                base, policy
            ))
        })
    };
    Ok(match policy {
        UpgradePolicy::None => base.to_string(),
        UpgradePolicy::Patch => format!(
            ">={}.{}.0 <{}.{}.0",
            base.major,
            base.minor,
            base.major,
            upper_bound(base.minor)?
        ),
        UpgradePolicy::Minor => {
            format!(">={}.0.0 <{}.0.0", base.major, upper_bound(base.major)?)
        }
        UpgradePolicy::Major => format!(">={}.{}.{}", base.major, base.minor, base.patch),
    })
}

/// Version selection for a PackageInstall pinned to `base`
pub fn version_selection(base: &Version, config: &PluginConfig) -> Result<VersionSelectionSemver> {
    // An empty list means "no prereleases" here, which kapp-controller spells as no list at all
    let prereleases = config
        .default_prereleases_version_selection
        .as_ref()
        .filter(|ids| !ids.is_empty())
        .map(|ids| VersionSelectionSemverPrereleases {
            identifiers: ids.clone(),
        });

    Ok(VersionSelectionSemver {
        constraints: derive_constraint(base, config.default_upgrade_policy)?,
        prereleases,
    })
}

/// Reject a requested version that the configured prerelease selection would never pick
pub fn validate_prerelease(version: &Version, config: &PluginConfig) -> Result<()> {
    if versions::prerelease_allowed(
        version,
        config.default_prereleases_version_selection.as_deref(),
    ) {
        return Ok(());
    }
    Err(PluginError::invalid(format!(
        "the selected version {} is a prerelease, which is not allowed by the plugin's prerelease version selection",
        version
    )))
}

/// Reject moving to an older version unless downgrades are allowed
pub fn validate_downgrade(requested: &Version, current: Option<&str>, allowed: bool) -> Result<()> {
    if allowed {
        return Ok(());
    }
    let Some(current) = current else {
        return Ok(());
    };
    let current = versions::parse(current)?;
    if requested.cmp_precedence(&current) == Ordering::Less {
        return Err(PluginError::invalid(format!(
            "the selected version {} is older than the installed version {} and downgrades are not allowed",
            requested, current
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        versions::parse(s).unwrap()
    }

    #[test]
    fn test_derive_constraint_table() {
        let base = v("1.0.0");
        assert_eq!(derive_constraint(&base, UpgradePolicy::None).unwrap(), "1.0.0");
        assert_eq!(derive_constraint(&base, UpgradePolicy::Patch).unwrap(), ">=1.0.0 <1.1.0");
        assert_eq!(derive_constraint(&base, UpgradePolicy::Minor).unwrap(), ">=1.0.0 <2.0.0");
        assert_eq!(derive_constraint(&base, UpgradePolicy::Major).unwrap(), ">=1.0.0");
    }

    #[test]
    fn test_derive_constraint_non_zero_components() {
        let base = v("2.3.4");
        assert_eq!(derive_constraint(&base, UpgradePolicy::None).unwrap(), "2.3.4");
        assert_eq!(derive_constraint(&base, UpgradePolicy::Patch).unwrap(), ">=2.3.0 <2.4.0");
        assert_eq!(derive_constraint(&base, UpgradePolicy::Minor).unwrap(), ">=2.0.0 <3.0.0");
        assert_eq!(derive_constraint(&base, UpgradePolicy::Major).unwrap(), ">=2.3.4");
    }

    #[test]
    fn test_derive_constraint_at_component_limit() {
        let base = Version::new(1, u64::MAX, 0);
        let err = derive_constraint(&base, UpgradePolicy::Patch).unwrap_err();
        assert!(matches!(err, PluginError::InvalidArgument(_)));
        assert!(derive_constraint(&Version::new(u64::MAX, 0, 0), UpgradePolicy::Minor).is_err());

        // Policies without an upper bound still work
        assert_eq!(
            derive_constraint(&base, UpgradePolicy::Major).unwrap(),
            format!(">=1.{}.0", u64::MAX)
        );
        assert_eq!(
            derive_constraint(&base, UpgradePolicy::Minor).unwrap(),
            ">=1.0.0 <2.0.0"
        );
    }

    #[test]
    fn test_derived_constraints_parse() {
        let base = v("1.2.3-rc.1");
        for policy in [
            UpgradePolicy::None,
            UpgradePolicy::Patch,
            UpgradePolicy::Minor,
            UpgradePolicy::Major,
        ] {
            let expr = derive_constraint(&base, policy).unwrap();
            assert!(
                expr.parse::<versions::Constraint>().is_ok(),
                "constraint '{}' for {} did not parse",
                expr,
                policy
            );
        }
    }

    #[test]
    fn test_version_selection_prereleases() {
        let mut config = PluginConfig::default();
        assert_eq!(version_selection(&v("1.0.0"), &config).unwrap().prereleases, None);

        config.default_prereleases_version_selection = Some(vec![]);
        assert_eq!(version_selection(&v("1.0.0"), &config).unwrap().prereleases, None);

        config.default_prereleases_version_selection = Some(vec!["rc".to_string()]);
        assert_eq!(
            version_selection(&v("1.0.0"), &config).unwrap().prereleases,
            Some(VersionSelectionSemverPrereleases {
                identifiers: vec!["rc".to_string()]
            })
        );
    }

    #[test]
    fn test_version_selection_uses_configured_policy() {
        let config = PluginConfig {
            default_upgrade_policy: UpgradePolicy::Minor,
            ..Default::default()
        };
        assert_eq!(
            version_selection(&v("1.0.0"), &config).unwrap().constraints,
            ">=1.0.0 <2.0.0"
        );
    }

    #[test]
    fn test_validate_prerelease() {
        let mut config = PluginConfig::default();
        assert!(validate_prerelease(&v("1.0.0"), &config).is_ok());
        assert!(validate_prerelease(&v("1.0.0-rc1"), &config).is_err());

        config.default_prereleases_version_selection = Some(vec!["rc1".to_string()]);
        assert!(validate_prerelease(&v("1.0.0-rc1"), &config).is_ok());
        assert!(validate_prerelease(&v("1.0.0-beta"), &config).is_err());
    }

    #[test]
    fn test_validate_downgrade() {
        assert!(validate_downgrade(&v("1.2.0"), Some("1.2.3"), false).is_err());
        assert!(validate_downgrade(&v("1.2.0"), Some("1.2.3"), true).is_ok());
        assert!(validate_downgrade(&v("1.2.3"), Some("1.2.3"), false).is_ok());
        assert!(validate_downgrade(&v("1.2.10"), Some("1.2.9"), false).is_ok());
        assert!(validate_downgrade(&v("0.1.0"), None, false).is_ok());
        assert!(validate_downgrade(&v("1.2.3+a"), Some("1.2.3+b"), false).is_ok());
    }
}
