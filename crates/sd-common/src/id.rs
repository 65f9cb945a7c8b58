//! Run, connector and section identity types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for one invocation of the report generator.
///
/// Format: `run-<12 hex chars>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a fresh run id.
    pub fn new() -> Self {
        let uuid = uuid::Uuid::new_v4().simple().to_string();
        RunId(format!("run-{}", &uuid[..12]))
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Connector or rule GUID in canonical form (lowercase, no braces).
///
/// Configuration exports write GUIDs inconsistently (`{5E2F...}` vs
/// `5e2f...`); cross references are resolved on the canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Guid(String);

impl Guid {
    /// Parse a GUID, accepting optional braces and any letter case.
    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim().trim_start_matches('{').trim_end_matches('}');
        uuid::Uuid::parse_str(trimmed)
            .ok()
            .map(|u| Guid(u.hyphenated().to_string()))
    }

    /// Canonicalize without validating the GUID syntax.
    ///
    /// Used for identifiers that are GUID-like but not strictly RFC 4122.
    pub fn normalize(s: &str) -> Self {
        Self::parse(s).unwrap_or_else(|| {
            Guid(
                s.trim()
                    .trim_start_matches('{')
                    .trim_end_matches('}')
                    .to_ascii_lowercase(),
            )
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Anchor-safe section identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionId(String);

impl SectionId {
    /// Build a section id from arbitrary text.
    pub fn new(raw: &str) -> Self {
        SectionId(anchor_slug(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Turn arbitrary text into an HTML id fragment.
///
/// ASCII alphanumerics are lowercased and kept, every other run of
/// characters collapses to a single `-`. Empty input yields `"x"`.
pub fn anchor_slug(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut pending_dash = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        slug.push('x');
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_format() {
        let id = RunId::new();
        assert!(id.0.starts_with("run-"));
        assert_eq!(id.0.len(), 16);
        assert_ne!(id, RunId::new());
    }

    #[test]
    fn test_guid_canonical_form() {
        let braced = Guid::parse("{5E2F8C3A-0B1C-4D2E-9F00-112233445566}").unwrap();
        let plain = Guid::parse("5e2f8c3a-0b1c-4d2e-9f00-112233445566").unwrap();
        assert_eq!(braced, plain);
        assert_eq!(plain.as_str(), "5e2f8c3a-0b1c-4d2e-9f00-112233445566");
        assert!(Guid::parse("not-a-guid").is_none());
        assert_eq!(Guid::normalize("{ABC}").as_str(), "abc");
    }

    #[test]
    fn test_anchor_slug() {
        assert_eq!(anchor_slug("In from AD - User Join"), "in-from-ad-user-join");
        assert_eq!(anchor_slug("OU=Sales,DC=root"), "ou-sales-dc-root");
        assert_eq!(anchor_slug("  --  "), "x");
        assert_eq!(SectionId::new("Global Settings").as_str(), "global-settings");
    }
}
