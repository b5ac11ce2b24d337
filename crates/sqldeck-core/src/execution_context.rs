//! Execution context snapshots

use serde::{Deserialize, Serialize};

use crate::ConnectionKey;

/// Value snapshot of a live execution context.
///
/// A snapshot never tracks the live context; holders must replace it whenever
/// the context is updated (e.g. after a catalog/schema change).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContextInfo {
    pub id: String,
    pub project_id: String,
    pub connection_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_catalog: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_schema: Option<String>,
}

impl ExecutionContextInfo {
    pub fn new(
        id: impl Into<String>,
        project_id: impl Into<String>,
        connection_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            project_id: project_id.into(),
            connection_id: connection_id.into(),
            default_catalog: None,
            default_schema: None,
        }
    }

    /// Key of the connection owning this context
    pub fn connection_key(&self) -> ConnectionKey {
        ConnectionKey::new(&self.project_id, &self.connection_id)
    }

    pub fn with_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.default_catalog = Some(catalog.into());
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.default_schema = Some(schema.into());
        self
    }
}
