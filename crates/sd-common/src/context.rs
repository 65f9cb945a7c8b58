//! Explicit diagnostic context for section processing.
//!
//! Every section is processed with a [`SectionContext`] naming what is being
//! documented (object type, connector, rule). The context is passed by value
//! to the code that logs, and [`SectionContext::span`] attaches it to a
//! tracing span so every event inside the section carries the identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which snapshot a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The proposed configuration under review.
    Pilot,
    /// The configuration currently in effect.
    Production,
}

impl Side {
    /// The other snapshot.
    pub fn opposite(self) -> Side {
        match self {
            Side::Pilot => Side::Production,
            Side::Production => Side::Pilot,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Pilot => write!(f, "pilot"),
            Side::Production => write!(f, "production"),
        }
    }
}

/// Identifiers describing the section currently being processed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionContext {
    pub section_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connector_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connector_guid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_guid: Option<String>,
}

impl SectionContext {
    /// Create a context for a section.
    pub fn new(section_id: impl Into<String>) -> Self {
        Self {
            section_id: section_id.into(),
            ..Self::default()
        }
    }

    /// Set the metaverse or connector object type.
    pub fn with_object_type(mut self, object_type: impl Into<String>) -> Self {
        self.object_type = Some(object_type.into());
        self
    }

    /// Set the connector name and GUID.
    pub fn with_connector(mut self, name: impl Into<String>, guid: impl Into<String>) -> Self {
        self.connector_name = Some(name.into());
        self.connector_guid = Some(guid.into());
        self
    }

    /// Set the synchronization rule name and GUID.
    pub fn with_rule(mut self, name: impl Into<String>, guid: Option<String>) -> Self {
        self.rule_name = Some(name.into());
        self.rule_guid = guid;
        self
    }

    /// Open a tracing span carrying these identifiers.
    ///
    /// Hold the returned guard (`span.enter()`) for the lifetime of the
    /// section; dropping it closes the span on every exit path.
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "section",
            section = %self.section_id,
            object_type = self.object_type.as_deref().unwrap_or(""),
            connector = self.connector_name.as_deref().unwrap_or(""),
            connector_guid = self.connector_guid.as_deref().unwrap_or(""),
            rule = self.rule_name.as_deref().unwrap_or(""),
            rule_guid = self.rule_guid.as_deref().unwrap_or(""),
        )
    }
}

impl fmt::Display for SectionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "section={}", self.section_id)?;
        if let Some(object_type) = &self.object_type {
            write!(f, " object_type={}", object_type)?;
        }
        if let Some(name) = &self.connector_name {
            write!(f, " connector={}", name)?;
        }
        if let Some(guid) = &self.connector_guid {
            write!(f, " connector_guid={}", guid)?;
        }
        if let Some(rule) = &self.rule_name {
            write!(f, " rule={}", rule)?;
        }
        if let Some(guid) = &self.rule_guid {
            write!(f, " rule_guid={}", guid)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_display_and_opposite() {
        assert_eq!(Side::Pilot.to_string(), "pilot");
        assert_eq!(Side::Production.to_string(), "production");
        assert_eq!(Side::Pilot.opposite(), Side::Production);
    }

    #[test]
    fn test_context_display_includes_identifiers() {
        let ctx = SectionContext::new("ad-sync-rules")
            .with_connector("contoso.com", "{5E2F}")
            .with_rule("In from AD - User Join", Some("9a1b".into()));
        let text = ctx.to_string();
        assert!(text.starts_with("section=ad-sync-rules"));
        assert!(text.contains("connector=contoso.com"));
        assert!(text.contains("rule=In from AD - User Join"));
        assert!(text.contains("rule_guid=9a1b"));
        assert!(!text.contains("object_type"));
    }

    #[test]
    fn test_context_serialization_skips_empty() {
        let ctx = SectionContext::new("global").with_object_type("person");
        let json = serde_json::to_string(&ctx).unwrap();
        assert_eq!(json, r#"{"section_id":"global","object_type":"person"}"#);
    }
}
