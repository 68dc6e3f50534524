//! Environment-backed `ModelRegistry` (§6), reusing
//! `agentcore-core::config::LlmConfig`'s `AGENTCORE_LLM_*`-prefixed env vars.

use async_trait::async_trait;

use agentcore_core::config::LlmConfig;
use agentcore_core::error::AgentCoreError;
use agentcore_core::traits::{ModelConfig, ModelRegistry};

pub struct EnvModelRegistry {
    config: LlmConfig,
}

impl EnvModelRegistry {
    pub fn from_env() -> Self {
        Self { config: LlmConfig::from_env() }
    }
}

#[async_trait]
impl ModelRegistry for EnvModelRegistry {
    async fn find_default(&self) -> Result<ModelConfig, AgentCoreError> {
        Ok(ModelConfig {
            name: self.config.model.clone(),
            api_base: self.config.api_base.clone(),
            api_key: self.config.api_key.clone(),
        })
    }

    async fn find_by_name(&self, name: &str) -> Result<ModelConfig, AgentCoreError> {
        if name == self.config.model {
            self.find_default().await
        } else {
            Ok(ModelConfig {
                name: name.to_string(),
                api_base: self.config.api_base.clone(),
                api_key: self.config.api_key.clone(),
            })
        }
    }
}
