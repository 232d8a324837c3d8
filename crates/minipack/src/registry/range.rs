//! npm style version ranges on top of `semver`.
//!
//! npm and Cargo disagree on bare versions: for npm `3.4` means `3.4.x` and
//! `3.4.1` means exactly that version, while `semver::VersionReq` reads both
//! as caret requirements. Ranges are translated before parsing.

use semver::{Version, VersionReq};

use crate::{MinipackError, Result};

/// A set of alternatives (`a || b`), each a list of comparators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    alternatives: Vec<VersionReq>,
}

impl VersionRange {
    pub fn parse(range: &str) -> Result<Self> {
        let alternatives = range
            .split("||")
            .map(|part| {
                let translated = translate(part);
                VersionReq::parse(&translated).map_err(|e| {
                    MinipackError::InvalidDependency(format!(
                        "invalid version range \"{}\": {}",
                        range.trim(),
                        e
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { alternatives })
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }

    /// Parse `version` leniently (leading `v`) and match it
    pub fn matches_str(&self, version: &str) -> bool {
        Version::parse(version.trim_start_matches('v'))
            .map(|v| self.matches(&v))
            .unwrap_or(false)
    }
}

/// Rewrite one `||` alternative into `semver::VersionReq` syntax
fn translate(part: &str) -> String {
    let part = part.trim();

    if part.is_empty() || part == "*" || part.eq_ignore_ascii_case("x") {
        return "*".to_string();
    }

    // Hyphen range: `1.2.3 - 2.3.4`
    if let Some((low, high)) = part.split_once(" - ") {
        return format!(
            ">={}, <={}",
            strip_v(low.trim()),
            strip_v(high.trim())
        );
    }

    // Space separated comparators, an operator may be split from its version
    let mut comparators: Vec<String> = Vec::new();
    let mut pending_op = String::new();
    for token in part.split_whitespace() {
        if token.chars().all(|c| "<>=~^".contains(c)) {
            pending_op.push_str(token);
            continue;
        }
        let comparator = format!("{}{}", pending_op, token);
        pending_op.clear();
        comparators.push(translate_comparator(&comparator));
    }

    comparators.join(", ")
}

fn translate_comparator(comparator: &str) -> String {
    let op_len = comparator
        .find(|c: char| !"<>=~^".contains(c))
        .unwrap_or(comparator.len());
    let (op, version) = comparator.split_at(op_len);
    let version = strip_v(version);

    match op {
        "" => bare_version(version),
        "=" => bare_version(version),
        _ => format!("{}{}", op, version),
    }
}

/// A bare npm version: complete means exact, partial means wildcard
fn bare_version(version: &str) -> String {
    let (core, pre) = match version.find(['-', '+']) {
        Some(idx) => version.split_at(idx),
        None => (version, ""),
    };
    let parts: Vec<&str> = core.split('.').collect();
    let has_wildcard = parts
        .iter()
        .any(|p| *p == "*" || p.eq_ignore_ascii_case("x"));

    if has_wildcard {
        let kept: Vec<&str> = parts
            .iter()
            .take_while(|p| **p != "*" && !p.eq_ignore_ascii_case("x"))
            .copied()
            .collect();
        if kept.is_empty() {
            return "*".to_string();
        }
        return format!("{}.*", kept.join("."));
    }

    match parts.len() {
        3 => format!("={}{}", core, pre),
        _ => format!("{}.*", core),
    }
}

fn strip_v(version: &str) -> &str {
    version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('V'))
        .unwrap_or(version)
}
