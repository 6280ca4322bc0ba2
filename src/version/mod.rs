//! Version specifier resolution against repository tags and branches.
//!
//! Supported specifiers, tried in order:
//!
//! - `latest` - highest stable semver tag
//! - exact versions (`1.2.3`, `v1.2.3`) - the tag carrying that version
//! - semver requirements (`^1.2`, `~1.2.0`, `>=1.0, <2.0`) - highest stable match
//! - anything else - a tag or branch with exactly that name
//!
//! Tags are parsed leniently: a leading `v` or `V` is ignored and tags that do
//! not parse as semver are only reachable by exact name.

use semver::{Version, VersionReq};

/// A tag that parsed as a semantic version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    /// Parsed version
    pub version: Version,
    /// Original tag name
    pub tag: String,
    /// Whether the version carries a prerelease suffix
    pub prerelease: bool,
}

/// Resolves specifiers against the refs of one repository.
#[derive(Debug, Clone, Default)]
pub struct VersionResolver {
    versions: Vec<VersionInfo>,
    refs: Vec<String>,
}

impl VersionResolver {
    /// Build a resolver from tag and branch names.
    #[must_use]
    pub fn new<I, S>(refs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let refs: Vec<String> = refs.into_iter().map(Into::into).collect();

        let mut versions: Vec<VersionInfo> = refs
            .iter()
            .filter_map(|tag| {
                parse_tag(tag).map(|version| VersionInfo {
                    prerelease: !version.pre.is_empty(),
                    version,
                    tag: tag.clone(),
                })
            })
            .collect();

        // Newest first
        versions.sort_by(|a, b| b.version.cmp(&a.version));

        Self {
            versions,
            refs,
        }
    }

    /// The ref name matching `specifier`, if any.
    #[must_use]
    pub fn resolve(&self, specifier: &str) -> Option<String> {
        let specifier = specifier.trim();

        if specifier == "latest" {
            return self.versions.iter().find(|v| !v.prerelease).map(|v| v.tag.clone());
        }

        if let Some(exact) = parse_tag(specifier) {
            if let Some(found) = self.versions.iter().find(|v| v.version == exact) {
                return Some(found.tag.clone());
            }
        }

        if let Ok(req) = VersionReq::parse(specifier) {
            if let Some(found) = self.versions.iter().filter(|v| !v.prerelease).find(|v| req.matches(&v.version)) {
                return Some(found.tag.clone());
            }
        }

        self.refs.iter().find(|r| r.as_str() == specifier).cloned()
    }

    /// All parsed versions, newest first.
    #[must_use]
    pub fn versions(&self) -> &[VersionInfo] {
        &self.versions
    }
}

fn parse_tag(tag: &str) -> Option<Version> {
    let cleaned = tag.trim_start_matches('v').trim_start_matches('V');
    Version::parse(cleaned).ok()
}
