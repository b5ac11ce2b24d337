//! Connection identity and metadata

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a connection inside a project.
///
/// Connection ids are only unique within their project, so every lookup goes
/// through the `(project_id, connection_id)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionKey {
    pub project_id: String,
    pub connection_id: String,
}

impl ConnectionKey {
    pub fn new(project_id: impl Into<String>, connection_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            connection_id: connection_id.into(),
        }
    }
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.project_id, self.connection_id)
    }
}

/// A known connection as seen by the console
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    pub project_id: String,
    pub id: String,
    pub name: String,
    /// Driver identifier (e.g., "postgres", "sqlite")
    pub driver: String,
    #[serde(default)]
    pub connected: bool,
}

impl ConnectionInfo {
    pub fn new(
        project_id: impl Into<String>,
        id: impl Into<String>,
        name: impl Into<String>,
        driver: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            id: id.into(),
            name: name.into(),
            driver: driver.into(),
            connected: false,
        }
    }

    pub fn key(&self) -> ConnectionKey {
        ConnectionKey::new(&self.project_id, &self.id)
    }
}
