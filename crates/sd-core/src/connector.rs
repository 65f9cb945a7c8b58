//! Connector kinds, section ordering and the connector registry.
//!
//! Each section file names the connector it documents by category and
//! subtype strings as written in the exported configuration. Those strings
//! select a [`ConnectorKind`] through a dispatch table; the kind decides where
//! the connector's sections appear and which titles they get.

use sd_common::Guid;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Family of a documented configuration area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorKind {
    /// Engine-wide settings.
    Global,
    /// The central object store schema and its rules.
    Metaverse,
    ActiveDirectory,
    /// LDAP directories other than Active Directory.
    Ldap,
    Sql,
    AzureAd,
    /// Extensible connectivity (ECMA2) management agents.
    Extensible,
    /// Anything the dispatch table does not know.
    Generic,
}

/// `(category, subtype, kind)`; categories compare case-insensitively and a
/// `*` subtype matches anything. First match wins.
const DISPATCH: &[(&str, &str, ConnectorKind)] = &[
    ("global", "*", ConnectorKind::Global),
    ("metaverse", "*", ConnectorKind::Metaverse),
    ("AD", "*", ConnectorKind::ActiveDirectory),
    ("ADAM", "*", ConnectorKind::Ldap),
    ("eDirectory", "*", ConnectorKind::Ldap),
    ("iPlanet", "*", ConnectorKind::Ldap),
    ("MSSQL", "*", ConnectorKind::Sql),
    ("Oracle", "*", ConnectorKind::Sql),
    (
        "Extensible2",
        "Windows Azure Active Directory (Microsoft)",
        ConnectorKind::AzureAd,
    ),
    ("Extensible2", "*", ConnectorKind::Extensible),
];

const GLOBAL_SECTIONS: &[(&str, &str)] = &[
    ("settings", "Global Settings"),
    ("extensions", "Rules Extensions"),
];

const METAVERSE_SECTIONS: &[(&str, &str)] = &[
    ("object_types", "Metaverse Object Types"),
    ("attributes", "Metaverse Attributes"),
    ("deletion_rules", "Object Deletion Rules"),
    ("precedence", "Attribute Precedence"),
];

const DIRECTORY_SECTIONS: &[(&str, &str)] = &[
    ("properties", "Connector Properties"),
    ("partitions", "Directory Partitions and Containers"),
    ("schema", "Selected Object Types and Attributes"),
    ("filters", "Connector Filter Rules"),
    ("sync_rules", "Synchronization Rules"),
    ("attribute_flows", "Attribute Flow Summary"),
    ("run_profiles", "Run Profiles"),
];

const SQL_SECTIONS: &[(&str, &str)] = &[
    ("properties", "Connector Properties"),
    ("database", "Database Settings"),
    ("schema", "Selected Object Types and Attributes"),
    ("filters", "Connector Filter Rules"),
    ("sync_rules", "Synchronization Rules"),
    ("attribute_flows", "Attribute Flow Summary"),
    ("run_profiles", "Run Profiles"),
];

const EXTENSIBLE_SECTIONS: &[(&str, &str)] = &[
    ("properties", "Connector Properties"),
    ("parameters", "Connectivity Parameters"),
    ("partitions", "Partitions and Hierarchies"),
    ("schema", "Selected Object Types and Attributes"),
    ("filters", "Connector Filter Rules"),
    ("sync_rules", "Synchronization Rules"),
    ("attribute_flows", "Attribute Flow Summary"),
    ("run_profiles", "Run Profiles"),
];

const GENERIC_SECTIONS: &[(&str, &str)] = &[
    ("properties", "Connector Properties"),
    ("schema", "Selected Object Types and Attributes"),
    ("sync_rules", "Synchronization Rules"),
    ("run_profiles", "Run Profiles"),
];

impl ConnectorKind {
    /// Pick the kind for a category/subtype pair.
    pub fn dispatch(category: &str, subtype: &str) -> Self {
        DISPATCH
            .iter()
            .find(|(c, s, _)| c.eq_ignore_ascii_case(category) && (*s == "*" || s.eq_ignore_ascii_case(subtype)))
            .map(|(_, _, kind)| *kind)
            .unwrap_or_else(|| {
                debug!(category, subtype, "no dispatch entry; using generic layout");
                ConnectorKind::Generic
            })
    }

    pub fn label(self) -> &'static str {
        match self {
            ConnectorKind::Global => "Global",
            ConnectorKind::Metaverse => "Metaverse",
            ConnectorKind::ActiveDirectory => "Active Directory",
            ConnectorKind::Ldap => "LDAP Directory",
            ConnectorKind::Sql => "SQL Database",
            ConnectorKind::AzureAd => "Azure Active Directory",
            ConnectorKind::Extensible => "Extensible Connectivity",
            ConnectorKind::Generic => "Connector",
        }
    }

    /// Global settings first, then the metaverse, then connectors.
    pub fn group_rank(self) -> u8 {
        match self {
            ConnectorKind::Global => 0,
            ConnectorKind::Metaverse => 1,
            _ => 2,
        }
    }

    /// Known section kinds with their titles, in document order.
    pub fn sections(self) -> &'static [(&'static str, &'static str)] {
        match self {
            ConnectorKind::Global => GLOBAL_SECTIONS,
            ConnectorKind::Metaverse => METAVERSE_SECTIONS,
            ConnectorKind::ActiveDirectory | ConnectorKind::Ldap => DIRECTORY_SECTIONS,
            ConnectorKind::Sql => SQL_SECTIONS,
            ConnectorKind::AzureAd | ConnectorKind::Extensible => EXTENSIBLE_SECTIONS,
            ConnectorKind::Generic => GENERIC_SECTIONS,
        }
    }

    /// Position of a section kind; unknown kinds sort after known ones.
    pub fn section_rank(self, section: &str) -> usize {
        self.sections()
            .iter()
            .position(|(key, _)| *key == section)
            .unwrap_or(usize::MAX)
    }

    pub fn section_title(self, section: &str) -> Option<&'static str> {
        self.sections()
            .iter()
            .find(|(key, _)| *key == section)
            .map(|(_, title)| *title)
    }
}

impl std::fmt::Display for ConnectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A connector as named in section files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorInfo {
    pub guid: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub subtype: String,
}

impl ConnectorInfo {
    pub fn kind(&self) -> ConnectorKind {
        ConnectorKind::dispatch(&self.category, &self.subtype)
    }

    pub fn canonical_guid(&self) -> Guid {
        Guid::normalize(&self.guid)
    }
}

/// Every connector seen on either side, keyed by canonical GUID.
#[derive(Debug, Clone, Default)]
pub struct ConnectorRegistry {
    by_guid: BTreeMap<Guid, ConnectorInfo>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connector. The first registration of a GUID wins.
    pub fn register(&mut self, info: &ConnectorInfo) {
        let guid = info.canonical_guid();
        match self.by_guid.get(&guid) {
            Some(existing) if existing.name != info.name => {
                debug!(guid = %guid, kept = %existing.name, ignored = %info.name, "connector renamed between sides");
            }
            Some(_) => {}
            None => {
                self.by_guid.insert(guid, info.clone());
            }
        }
    }

    /// Look up a connector by any spelling of its GUID.
    pub fn resolve(&self, id: &str) -> Option<&ConnectorInfo> {
        self.by_guid.get(&Guid::normalize(id))
    }

    /// Registered connectors in GUID order.
    pub fn iter(&self) -> impl Iterator<Item = &ConnectorInfo> {
        self.by_guid.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(guid: &str, name: &str, category: &str) -> ConnectorInfo {
        ConnectorInfo {
            guid: guid.into(),
            name: name.into(),
            category: category.into(),
            subtype: String::new(),
        }
    }

    #[test]
    fn test_dispatch_table() {
        assert_eq!(ConnectorKind::dispatch("AD", ""), ConnectorKind::ActiveDirectory);
        assert_eq!(ConnectorKind::dispatch("ad", "anything"), ConnectorKind::ActiveDirectory);
        assert_eq!(ConnectorKind::dispatch("MSSQL", ""), ConnectorKind::Sql);
        assert_eq!(
            ConnectorKind::dispatch("Extensible2", "Windows Azure Active Directory (Microsoft)"),
            ConnectorKind::AzureAd
        );
        assert_eq!(ConnectorKind::dispatch("Extensible2", "Generic LDAP"), ConnectorKind::Extensible);
        assert_eq!(ConnectorKind::dispatch("FIM", ""), ConnectorKind::Generic);
    }

    #[test]
    fn test_section_ordering() {
        let ad = ConnectorKind::ActiveDirectory;
        assert!(ad.section_rank("properties") < ad.section_rank("sync_rules"));
        assert!(ad.section_rank("sync_rules") < ad.section_rank("run_profiles"));
        assert_eq!(ad.section_rank("custom"), usize::MAX);
        assert_eq!(ad.section_title("partitions"), Some("Directory Partitions and Containers"));
        assert_eq!(ConnectorKind::Sql.section_title("partitions"), None);
    }

    #[test]
    fn test_group_rank() {
        assert!(ConnectorKind::Global.group_rank() < ConnectorKind::Metaverse.group_rank());
        assert!(ConnectorKind::Metaverse.group_rank() < ConnectorKind::Sql.group_rank());
    }

    #[test]
    fn test_registry_resolves_any_guid_spelling() {
        let mut registry = ConnectorRegistry::new();
        registry.register(&info("{5E2F0C4A-1B2C-4D3E-8F90-112233445566}", "contoso.com", "AD"));
        registry.register(&info("5e2f0c4a-1b2c-4d3e-8f90-112233445566", "renamed", "AD"));
        assert_eq!(registry.iter().count(), 1);
        let found = registry.resolve("5E2F0C4A-1B2C-4D3E-8F90-112233445566").unwrap();
        assert_eq!(found.name, "contoso.com");
        assert!(registry.resolve("{00000000-0000-0000-0000-000000000000}").is_none());
    }
}
