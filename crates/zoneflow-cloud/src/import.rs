//! Import identifiers
//!
//! An existing zone is adopted by id, optionally qualified with the project
//! that owns it: `<id>` or `<id>:<project_id>`.

use crate::error::MalformedImportId;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportId {
    pub id: String,
    pub project_id: Option<String>,
}

impl ImportId {
    pub fn parse(text: &str) -> Result<Self, MalformedImportId> {
        let mut parts = text.split(':');
        let id = parts.next().unwrap_or_default();
        let project_id = parts.next();

        if id.is_empty() || parts.next().is_some() {
            return Err(MalformedImportId(text.to_string()));
        }

        Ok(Self {
            id: id.to_string(),
            project_id: project_id.map(str::to_string),
        })
    }
}

impl FromStr for ImportId {
    type Err = MalformedImportId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for ImportId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.project_id {
            Some(project_id) => write!(f, "{}:{}", self.id, project_id),
            None => write!(f, "{}", self.id),
        }
    }
}
