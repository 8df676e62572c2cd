//! Zone attributes: what the backend reports and what the caller asks for

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Zone type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ZoneType {
    #[default]
    Primary,
    Secondary,
}

impl std::fmt::Display for ZoneType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ZoneType::Primary => write!(f, "PRIMARY"),
            ZoneType::Secondary => write!(f, "SECONDARY"),
        }
    }
}

/// A zone as last observed on the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneDescriptor {
    /// Backend-assigned identifier, immutable once assigned
    pub id: String,

    /// Fully qualified zone name (e.g. "example.com.")
    pub name: String,

    pub email: String,

    pub ttl: u32,

    pub description: String,

    pub zone_type: ZoneType,

    /// Master hosts for secondary zones; order is irrelevant
    pub masters: BTreeSet<String>,

    /// Free-form key/value attributes
    pub attributes: BTreeMap<String, String>,

    pub project_id: Option<String>,

    /// Raw status tag as reported by the backend
    pub status: String,

    pub created_at: Option<DateTime<Utc>>,

    pub updated_at: Option<DateTime<Utc>>,
}

impl ZoneDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: String::new(),
            ttl: 0,
            description: String::new(),
            zone_type: ZoneType::Primary,
            masters: BTreeSet::new(),
            attributes: BTreeMap::new(),
            project_id: None,
            status: String::new(),
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    /// Build the descriptor the backend would report right after accepting `spec`
    pub fn from_spec(id: impl Into<String>, spec: &ZoneSpec) -> Self {
        Self {
            id: id.into(),
            name: spec.name.clone(),
            email: spec.email.clone().unwrap_or_default(),
            ttl: spec.ttl.unwrap_or_default(),
            description: spec.description.clone().unwrap_or_default(),
            zone_type: spec.zone_type.unwrap_or_default(),
            masters: spec.masters.clone(),
            attributes: spec.attributes.clone(),
            project_id: spec.project_id.clone(),
            status: String::new(),
            created_at: None,
            updated_at: None,
        }
    }
}

/// Attributes the caller wants the zone to have
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneSpec {
    pub name: String,

    #[serde(default)]
    pub email: Option<String>,

    /// Left to the backend default when unset
    #[serde(default)]
    pub ttl: Option<u32>,

    #[serde(default)]
    pub description: Option<String>,

    /// Created as PRIMARY when unset; an unset type never forces a replacement
    #[serde(default)]
    pub zone_type: Option<ZoneType>,

    #[serde(default)]
    pub masters: BTreeSet<String>,

    #[serde(default)]
    pub attributes: BTreeMap<String, String>,

    /// Extra create-time fields passed through to the backend verbatim
    #[serde(default)]
    pub value_specs: BTreeMap<String, String>,

    /// Project to create the zone in, when it differs from the caller's
    #[serde(default)]
    pub project_id: Option<String>,
}

impl ZoneSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_zone_type(mut self, zone_type: ZoneType) -> Self {
        self.zone_type = Some(zone_type);
        self
    }

    pub fn with_master(mut self, host: impl Into<String>) -> Self {
        self.masters.insert(host.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Changes to the remotely mutable fields of a zone
///
/// `None` leaves a field untouched. An empty patch means there is nothing
/// to send.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZonePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub masters: Option<BTreeSet<String>>,
}

impl ZonePatch {
    /// Compare the mutable fields of `current` against `desired`
    ///
    /// Fields the spec leaves unset are not tracked, except `masters`, whose
    /// empty set is a meaningful value.
    pub fn between(current: &ZoneDescriptor, desired: &ZoneSpec) -> Self {
        let mut patch = Self::default();

        let email = desired.email.clone().unwrap_or_default();
        if email != current.email {
            patch.email = Some(email);
        }

        if let Some(ttl) = desired.ttl
            && ttl != current.ttl
        {
            patch.ttl = Some(ttl);
        }

        let description = desired.description.clone().unwrap_or_default();
        if description != current.description {
            patch.description = Some(description);
        }

        if desired.masters != current.masters {
            patch.masters = Some(desired.masters.clone());
        }

        patch
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Names of the fields this patch touches
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.email.is_some() {
            fields.push("email");
        }
        if self.ttl.is_some() {
            fields.push("ttl");
        }
        if self.description.is_some() {
            fields.push("description");
        }
        if self.masters.is_some() {
            fields.push("masters");
        }
        fields
    }

    /// Apply the patch to a local copy of the zone
    pub fn apply_to(&self, zone: &mut ZoneDescriptor) {
        if let Some(email) = &self.email {
            zone.email = email.clone();
        }
        if let Some(ttl) = self.ttl {
            zone.ttl = ttl;
        }
        if let Some(description) = &self.description {
            zone.description = description.clone();
        }
        if let Some(masters) = &self.masters {
            zone.masters = masters.clone();
        }
    }
}

/// Full comparison of a zone against a spec
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneDiff {
    /// In-place changes
    pub patch: ZonePatch,

    /// Immutable fields that differ; any entry forces a replacement
    pub replace_fields: Vec<&'static str>,
}

impl ZoneDiff {
    pub fn between(current: &ZoneDescriptor, desired: &ZoneSpec) -> Self {
        let mut replace_fields = Vec::new();

        if normalize_name(&desired.name) != normalize_name(&current.name) {
            replace_fields.push("name");
        }
        if let Some(zone_type) = desired.zone_type
            && zone_type != current.zone_type
        {
            replace_fields.push("type");
        }
        if desired.attributes != current.attributes {
            replace_fields.push("attributes");
        }
        if let Some(project_id) = &desired.project_id
            && current.project_id.as_ref() != Some(project_id)
        {
            replace_fields.push("project_id");
        }

        Self {
            patch: ZonePatch::between(current, desired),
            replace_fields,
        }
    }

    pub fn requires_replacement(&self) -> bool {
        !self.replace_fields.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.patch.is_empty() && self.replace_fields.is_empty()
    }
}

/// Zone names compare without the trailing root dot
fn normalize_name(name: &str) -> &str {
    name.strip_suffix('.').unwrap_or(name)
}
