//! Tool key resolution (§4.3).
//!
//! Tools are registered under qualified keys `serviceGroup_toolName`. LLMs
//! may emit one of: the exact qualified key, the dot form
//! `serviceGroup.toolName`, or a bare `toolName`. Resolution order:
//! (1) direct lookup; (2) dot -> underscore conversion; (3) suffix match by
//! the last `_`. A miss is a structured "tool not found" result, never an
//! exception.
//!
//! Grounded on the teacher's `ExtensionRegistry::execute` name-based
//! dispatch (builtin -> memory -> skill-by-tool-name -> skill-by-name ->
//! unknown-tool error), generalized from that flat name space to the
//! qualified-key resolution order the spec requires.

use std::collections::HashMap;
use std::sync::Arc;

use agentcore_core::traits::ToolContext;

/// A resolved tool registry: qualified key -> tool context, built once from
/// a `ToolRegistry::all_tools()` snapshot.
pub struct ToolIndex {
    by_key: HashMap<String, Arc<dyn ToolContext>>,
}

impl ToolIndex {
    pub fn new(tools: Vec<(String, Arc<dyn ToolContext>)>) -> Self {
        Self {
            by_key: tools.into_iter().collect(),
        }
    }

    /// Resolve `requested` to a registered qualified key, `None` on a miss.
    /// Resolution order: (1) exact match; (2) dot-form converted to
    /// underscore form; (3) suffix match on the last `_`-delimited segment.
    pub fn resolve_key(&self, requested: &str) -> Option<String> {
        if self.by_key.contains_key(requested) {
            return Some(requested.to_string());
        }
        if requested.contains('.') {
            let underscored = requested.replace('.', "_");
            if self.by_key.contains_key(&underscored) {
                return Some(underscored);
            }
        }
        if let Some(suffix) = requested.rsplit('_').next() {
            if suffix != requested {
                let matches: Vec<&String> = self
                    .by_key
                    .keys()
                    .filter(|k| k.rsplit('_').next() == Some(suffix))
                    .collect();
                if matches.len() == 1 {
                    return Some(matches[0].clone());
                }
            }
        }
        None
    }

    pub fn get(&self, resolved_key: &str) -> Option<Arc<dyn ToolContext>> {
        self.by_key.get(resolved_key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentcore_core::traits::{ExecutionMeta, ToolApplyResult, ToolCapability};
    use async_trait::async_trait;
    use serde_json::Value;

    struct StubTool(Value);

    #[async_trait]
    impl ToolContext for StubTool {
        fn capability(&self) -> ToolCapability {
            ToolCapability::Plain
        }
        fn json_schema(&self) -> &Value {
            &self.0
        }
        async fn apply(&self, _arguments: Value, _ctx: &ExecutionMeta) -> ToolApplyResult {
            ToolApplyResult {
                output: "ok".to_string(),
                is_error: false,
                can_terminate: false,
            }
        }
    }

    fn index() -> ToolIndex {
        ToolIndex::new(vec![(
            "search_lookup".to_string(),
            Arc::new(StubTool(Value::Null)) as Arc<dyn ToolContext>,
        )])
    }

    #[test]
    fn resolves_exact_qualified_key() {
        assert_eq!(index().resolve_key("search_lookup"), Some("search_lookup".to_string()));
    }

    #[test]
    fn resolves_dot_form() {
        assert_eq!(index().resolve_key("search.lookup"), Some("search_lookup".to_string()));
    }

    #[test]
    fn resolves_bare_suffix() {
        assert_eq!(index().resolve_key("lookup"), Some("search_lookup".to_string()));
    }

    #[test]
    fn miss_returns_none() {
        assert_eq!(index().resolve_key("unknown"), None);
    }

    #[test]
    fn resolution_is_deterministic() {
        let idx = index();
        assert_eq!(idx.resolve_key("lookup"), idx.resolve_key("lookup"));
    }
}
