//! Environment variable key constants and alias chains.
//!
//! Primary variables use the `AGENTCORE_*` prefix; a handful of OpenAI-
//! compatible aliases are accepted for the LLM section so existing
//! `OPENAI_*`-configured deployments work unmodified.

/// LLM API configuration.
pub mod llm {
    pub const API_BASE: &str = "AGENTCORE_API_BASE";
    pub const API_BASE_ALIASES: &[&str] = &["OPENAI_API_BASE", "OPENAI_BASE_URL", "BASE_URL"];

    pub const API_KEY: &str = "AGENTCORE_API_KEY";
    pub const API_KEY_ALIASES: &[&str] = &["OPENAI_API_KEY", "API_KEY"];

    pub const MODEL: &str = "AGENTCORE_MODEL";
    pub const MODEL_ALIASES: &[&str] = &["OPENAI_MODEL", "MODEL"];
}

/// Agent/ReAct loop tunables (numerical defaults table).
pub mod agent {
    pub const MAX_STEPS: &str = "AGENTCORE_MAX_STEPS";
    pub const PARALLEL_TOOL_CALLS: &str = "AGENTCORE_PARALLEL_TOOL_CALLS";
    pub const DEBUG_DETAIL: &str = "AGENTCORE_DEBUG_DETAIL";
    pub const USER_INPUT_TIMEOUT_SECS: &str = "AGENTCORE_USER_INPUT_TIMEOUT_SECS";
    pub const FORM_POLL_MS: &str = "AGENTCORE_FORM_POLL_MS";
    pub const INTERRUPT_RECHECK_MS: &str = "AGENTCORE_INTERRUPT_RECHECK_MS";
    pub const LLM_MAX_RETRIES: &str = "AGENTCORE_LLM_MAX_RETRIES";
    pub const RETRY_BASE_MS: &str = "AGENTCORE_RETRY_BASE_MS";
    pub const RETRY_CAP_MS: &str = "AGENTCORE_RETRY_CAP_MS";
    pub const EARLY_TERMINATION_THRESHOLD: &str = "AGENTCORE_EARLY_TERMINATION_THRESHOLD";
}

/// Conversation Memory Compressor thresholds.
pub mod memory {
    pub const MAX_CHARS: &str = "AGENTCORE_CONVERSATION_MEMORY_MAX_CHARS";
    pub const RETENTION_RATIO: &str = "AGENTCORE_MEMORY_RETENTION_RATIO";
    pub const SUMMARY_MIN_CHARS: &str = "AGENTCORE_MEMORY_SUMMARY_MIN_CHARS";
    pub const SUMMARY_MAX_CHARS: &str = "AGENTCORE_MEMORY_SUMMARY_MAX_CHARS";
    pub const REPEATED_RESULT_THRESHOLD: &str = "AGENTCORE_REPEATED_RESULT_THRESHOLD";
    pub const ENABLE_CONVERSATION_MEMORY: &str = "AGENTCORE_ENABLE_CONVERSATION_MEMORY";
    pub const MAX_MEMORY_MESSAGES: &str = "AGENTCORE_MAX_MEMORY_MESSAGES";
}

/// Level-based executor pool capacities.
pub mod pool {
    /// Fallback capacity used for any depth without a specific override.
    pub const DEFAULT_CAPACITY: &str = "AGENTCORE_POOL_DEFAULT_CAPACITY";
    /// Per-depth override; the literal key is formatted as `AGENTCORE_POOL_CAPACITY_<N>`.
    pub const CAPACITY_PREFIX: &str = "AGENTCORE_POOL_CAPACITY_";
}

/// Observability / logging.
pub mod observability {
    pub const QUIET: &str = "AGENTCORE_QUIET";
    pub const LOG_LEVEL: &str = "AGENTCORE_LOG_LEVEL";
    pub const LOG_JSON: &str = "AGENTCORE_LOG_JSON";
}

/// Workspace / directory configuration.
pub mod paths {
    pub const WORKSPACE: &str = "AGENTCORE_WORKSPACE";
}
