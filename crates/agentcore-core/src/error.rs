//! Abstract error kinds for the agent execution core.
//!
//! Internally every fallible path returns `Result<_, AgentCoreError>`, but no
//! variant is ever allowed to cross a plan boundary as an exception: the
//! propagation policy materializes every kind as data (a step's
//! `error_message`, a tool's ERROR envelope, or a plan's failed result).

use thiserror::Error;

/// The abstract error kinds of the propagation policy.
#[derive(Debug, Error)]
pub enum AgentCoreError {
    /// Cooperative cancellation observed for a `rootPlanId`. Never retried.
    #[error("interrupted")]
    Interrupted,

    /// Network/timeout/DNS failure classified as retryable by `is_retryable`.
    #[error("transient LLM failure: {0}")]
    LlmTransient(String),

    /// Three consecutive tool-free LLM responses. Non-retryable.
    #[error("LLM returned text but no tool calls {attempts} times in a row")]
    LlmToolless { attempts: u32 },

    /// Non-retryable server error from the LLM provider.
    #[error("fatal LLM error: {0}")]
    LlmFatal(String),

    /// No registered tool matches the resolved key. Step continues.
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// Argument conversion failed for a tool call. Step continues.
    #[error("failed to convert arguments for tool {tool}: {reason}")]
    ToolArgConvert { tool: String, reason: String },

    /// A tool raised during execution. Step continues (single-tool path) or
    /// is interleaved with successes (multi-tool path).
    #[error("tool {tool} failed: {reason}")]
    ToolExec { tool: String, reason: String },

    /// Form-input rendezvous exceeded its configured timeout.
    #[error("form input timed out after {0}s")]
    FormTimeout(u64),

    /// Any uncaught error bubbling out of the plan's step loop.
    #[error("plan failed: {0}")]
    PlanFatal(String),
}

impl AgentCoreError {
    /// `true` for failures the retry policy should retry (§4.2.1 step 7):
    /// DNS resolution, connection, and timeout markers in the error text.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AgentCoreError::LlmTransient(_))
    }

    /// Classify a raw error message the way the teacher's
    /// `is_context_overflow_error` string-matching idiom does, generalized to
    /// the retry-policy's DNS/connection/timeout markers.
    pub fn classify_llm_error(msg: &str) -> AgentCoreError {
        let lower = msg.to_lowercase();
        let retryable = lower.contains("dns")
            || lower.contains("connection")
            || lower.contains("timed out")
            || lower.contains("timeout")
            || lower.contains("temporarily unavailable")
            || lower.contains("503")
            || lower.contains("502")
            || lower.contains("429");
        if retryable {
            AgentCoreError::LlmTransient(msg.to_string())
        } else {
            AgentCoreError::LlmFatal(msg.to_string())
        }
    }
}
