//! In-memory `PlanStore` (§6): template persistence beyond this minimal
//! shape is explicitly out of scope (§1), so there is no file-backed
//! equivalent of the teacher's append-only jsonl `plan.rs` here — templates
//! live only for the process lifetime.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use agentcore_core::error::AgentCoreError;
use agentcore_core::traits::{PlanStore, PlanTemplate};

#[derive(Default)]
pub struct InMemoryPlanStore {
    templates: Mutex<HashMap<String, PlanTemplate>>,
}

impl InMemoryPlanStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlanStore for InMemoryPlanStore {
    async fn load_template(&self, id: &str) -> Result<PlanTemplate, AgentCoreError> {
        self.templates
            .lock()
            .expect("plan store mutex poisoned")
            .get(id)
            .cloned()
            .ok_or_else(|| AgentCoreError::PlanFatal(format!("no plan template registered for id {id}")))
    }

    async fn list_templates(&self) -> Result<Vec<PlanTemplate>, AgentCoreError> {
        Ok(self.templates.lock().expect("plan store mutex poisoned").values().cloned().collect())
    }

    async fn save_template(&self, template: PlanTemplate) -> Result<(), AgentCoreError> {
        self.templates.lock().expect("plan store mutex poisoned").insert(template.id.clone(), template);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_saved_template() {
        let store = InMemoryPlanStore::new();
        let template = PlanTemplate {
            id: "p1".to_string(),
            title: "demo".to_string(),
            step_requirements: vec!["do the thing".to_string()],
        };
        store.save_template(template.clone()).await.unwrap();
        let loaded = store.load_template("p1").await.unwrap();
        assert_eq!(loaded.title, "demo");
        assert_eq!(store.list_templates().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_template_is_an_error() {
        let store = InMemoryPlanStore::new();
        assert!(store.load_template("missing").await.is_err());
    }
}
