//! Action planning for a single zone

use crate::zone::{ZoneDescriptor, ZoneDiff, ZonePatch, ZoneSpec};

/// Type of action to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    /// Create a new zone
    Create,
    /// Change mutable fields in place
    Update,
    /// Delete and create again because an immutable field changed
    Replace,
    /// Delete the zone
    Delete,
    /// No changes needed
    NoOp,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Update => write!(f, "update"),
            ActionType::Replace => write!(f, "replace"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

/// A planned change to one zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneAction {
    Create(ZoneSpec),
    Update {
        id: String,
        patch: ZonePatch,
    },
    Replace {
        id: String,
        spec: ZoneSpec,
        /// Immutable fields that changed
        fields: Vec<&'static str>,
    },
    Delete {
        id: String,
    },
    NoOp {
        id: String,
    },
}

impl ZoneAction {
    pub fn action_type(&self) -> ActionType {
        match self {
            ZoneAction::Create(_) => ActionType::Create,
            ZoneAction::Update { .. } => ActionType::Update,
            ZoneAction::Replace { .. } => ActionType::Replace,
            ZoneAction::Delete { .. } => ActionType::Delete,
            ZoneAction::NoOp { .. } => ActionType::NoOp,
        }
    }

    pub fn has_changes(&self) -> bool {
        self.action_type() != ActionType::NoOp
    }

    /// Human-readable summary
    pub fn description(&self) -> String {
        match self {
            ZoneAction::Create(spec) => format!("create zone {}", spec.name),
            ZoneAction::Update { id, patch } => {
                format!("update zone {} ({})", id, patch.changed_fields().join(", "))
            }
            ZoneAction::Replace { id, spec, fields } => format!(
                "replace zone {} with {} ({} changed)",
                id,
                spec.name,
                fields.join(", ")
            ),
            ZoneAction::Delete { id } => format!("delete zone {}", id),
            ZoneAction::NoOp { id } => format!("zone {} is up to date", id),
        }
    }
}

/// Decide what to do to move `current` towards `desired`
///
/// Returns `None` when neither exists.
pub fn plan(current: Option<&ZoneDescriptor>, desired: Option<&ZoneSpec>) -> Option<ZoneAction> {
    let action = match (current, desired) {
        (None, None) => return None,
        (None, Some(spec)) => ZoneAction::Create(spec.clone()),
        (Some(zone), None) => ZoneAction::Delete {
            id: zone.id.clone(),
        },
        (Some(zone), Some(spec)) => {
            let diff = ZoneDiff::between(zone, spec);
            if diff.requires_replacement() {
                ZoneAction::Replace {
                    id: zone.id.clone(),
                    spec: spec.clone(),
                    fields: diff.replace_fields,
                }
            } else if !diff.patch.is_empty() {
                ZoneAction::Update {
                    id: zone.id.clone(),
                    patch: diff.patch,
                }
            } else {
                ZoneAction::NoOp {
                    id: zone.id.clone(),
                }
            }
        }
    };
    Some(action)
}
