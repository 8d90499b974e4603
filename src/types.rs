//! Values handed back to the orchestrator.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::{has_errors, Diagnostic};

/// The outcome of one lifecycle call.
///
/// `state` is `None` when there is no remote object to track: after a delete,
/// after a read found the object gone, or when the call failed before an
/// identifier was bound.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceResponse {
    /// The persisted state, if a binding exists.
    pub state: Option<Value>,
    /// Errors and warnings produced along the way.
    pub diagnostics: Vec<Diagnostic>,
}

impl ResourceResponse {
    /// Build a response.
    pub fn new(state: Option<Value>, diagnostics: Vec<Diagnostic>) -> Self {
        Self { state, diagnostics }
    }

    /// A response carrying only diagnostics.
    pub fn from_diagnostics(diagnostics: Vec<Diagnostic>) -> Self {
        Self::new(None, diagnostics)
    }

    /// A response carrying a single error diagnostic.
    pub fn error(diagnostic: Diagnostic) -> Self {
        Self::from_diagnostics(vec![diagnostic])
    }

    /// Whether any diagnostic is an error.
    pub fn has_errors(&self) -> bool {
        has_errors(&self.diagnostics)
    }

    /// The identifier recorded in the state, if any.
    pub fn id(&self) -> Option<&str> {
        self.state.as_ref()?.get(crate::state::ID_KEY)?.as_str()
    }
}

/// Names of everything the provider can manage or look up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    /// Resource type names, sorted.
    pub resources: Vec<String>,
    /// Data source type names, sorted.
    pub data_sources: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_helpers() {
        let ok = ResourceResponse::new(Some(json!({"id": "pg-1", "name": "grp1"})), vec![]);
        assert_eq!(ok.id(), Some("pg-1"));
        assert!(!ok.has_errors());

        let failed = ResourceResponse::error(Diagnostic::error("boom"));
        assert!(failed.has_errors());
        assert!(failed.id().is_none());

        let warned = ResourceResponse::from_diagnostics(vec![Diagnostic::warning("careful")]);
        assert!(!warned.has_errors());
    }
}
