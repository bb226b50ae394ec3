// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Semantic version parsing, range constraints and version selection.
//!
//! Constraints use the range syntax kapp-controller accepts: comparators separated by
//! whitespace or commas are ANDed, groups separated by `||` are ORed, and a bare
//! version means equality (`"1.0.0"`, `">=1.0.0 <2.0.0"`, `"<1.0.0 || >=2.0.0"`).
//! Prerelease versions only ever match when their identifiers are allowlisted.

use crate::error::{PluginError, Result};
use semver::{Prerelease, Version};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Parse a full version string, tolerating a leading `v`
pub fn parse(version: &str) -> Result<Version> {
    let trimmed = version.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    Ok(Version::parse(trimmed)?)
}

/// Greatest version by semver precedence, `None` for an empty set.
///
/// Build metadata carries no precedence, so of two versions differing only in
/// build metadata the later one in iteration order wins.
pub fn latest<'a>(versions: impl IntoIterator<Item = &'a Version>) -> Option<&'a Version> {
    versions.into_iter().max_by(|a, b| a.cmp_precedence(b))
}

/// Greatest version satisfying the constraint, `None` when nothing matches
pub fn latest_matching<'a>(
    versions: impl IntoIterator<Item = &'a Version>,
    constraint: &Constraint,
    prereleases: Option<&[String]>,
) -> Option<&'a Version> {
    versions
        .into_iter()
        .filter(|v| constraint.matches(v, prereleases))
        .max_by(|a, b| a.cmp_precedence(b))
}

/// Whether a version passes the prerelease allowlist.
///
/// Release versions always pass. A prerelease passes only when one of its
/// alphanumeric identifiers is listed; numeric identifiers such as the `1` of
/// `rc.1` never match. `None` and an empty list both reject it.
pub fn prerelease_allowed(version: &Version, allowlist: Option<&[String]>) -> bool {
    if version.pre == Prerelease::EMPTY {
        return true;
    }
    let Some(allowlist) = allowlist else {
        return false;
    };
    version
        .pre
        .as_str()
        .split('.')
        .filter(|id| !id.bytes().all(|b| b.is_ascii_digit()))
        .any(|id| allowlist.iter().any(|allowed| allowed == id))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Op {
    fn as_str(&self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Ne => "!=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Lt => "<",
            Op::Le => "<=",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Comparator {
    op: Op,
    version: Version,
}

impl Comparator {
    fn matches(&self, version: &Version) -> bool {
        let ordering = version.cmp_precedence(&self.version);
        match self.op {
            Op::Eq => ordering == Ordering::Equal,
            Op::Ne => ordering != Ordering::Equal,
            Op::Gt => ordering == Ordering::Greater,
            Op::Ge => ordering != Ordering::Less,
            Op::Lt => ordering == Ordering::Less,
            Op::Le => ordering != Ordering::Greater,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.op == Op::Eq {
            write!(f, "{}", self.version)
        } else {
            write!(f, "{}{}", self.op.as_str(), self.version)
        }
    }
}

/// A parsed range expression
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Constraint {
    groups: Vec<Vec<Comparator>>,
}

impl Constraint {
    /// True when the version satisfies every comparator of at least one group
    /// and passes the prerelease allowlist
    pub fn matches(&self, version: &Version, prereleases: Option<&[String]>) -> bool {
        prerelease_allowed(version, prereleases)
            && self
                .groups
                .iter()
                .any(|group| group.iter().all(|c| c.matches(version)))
    }
}

impl FromStr for Constraint {
    type Err = PluginError;

    fn from_str(expr: &str) -> Result<Self> {
        let groups = expr
            .split("||")
            .map(parse_group)
            .collect::<Result<Vec<_>>>()
            .map_err(|e| PluginError::invalid(format!("invalid constraint '{}': {}", expr, e)))?;
        Ok(Constraint { groups })
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let groups: Vec<String> = self
            .groups
            .iter()
            .map(|g| {
                g.iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();
        f.write_str(&groups.join(" || "))
    }
}

fn parse_group(group: &str) -> Result<Vec<Comparator>> {
    let normalized = group.replace(',', " ");
    let mut tokens = normalized.split_whitespace();
    let mut comparators = Vec::new();

    while let Some(token) = tokens.next() {
        let (op, rest) = split_operator(token);
        // Operator written apart from its version, as in ">= 1.0.0"
        let version = if rest.is_empty() {
            tokens
                .next()
                .ok_or_else(|| PluginError::invalid(format!("operator '{}' without version", token)))?
        } else {
            rest
        };
        comparators.push(Comparator {
            op,
            version: parse_partial(version)?,
        });
    }

    if comparators.is_empty() {
        return Err(PluginError::invalid("empty constraint"));
    }
    Ok(comparators)
}

fn split_operator(token: &str) -> (Op, &str) {
    for (prefix, op) in [
        (">=", Op::Ge),
        ("<=", Op::Le),
        ("!=", Op::Ne),
        ("==", Op::Eq),
        (">", Op::Gt),
        ("<", Op::Lt),
        ("=", Op::Eq),
    ] {
        if let Some(rest) = token.strip_prefix(prefix) {
            return (op, rest);
        }
    }
    (Op::Eq, token)
}

/// Parse a version that may omit minor and patch (`1`, `1.2`)
fn parse_partial(version: &str) -> Result<Version> {
    let version = version.strip_prefix('v').unwrap_or(version);
    let core_end = version.find(['-', '+']).unwrap_or(version.len());
    let (core, suffix) = version.split_at(core_end);
    let padded = match core.matches('.').count() {
        0 => format!("{}.0.0{}", core, suffix),
        1 => format!("{}.0{}", core, suffix),
        _ => version.to_string(),
    };
    Ok(Version::parse(&padded)?)
}
