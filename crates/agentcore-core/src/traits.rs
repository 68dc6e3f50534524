//! External interfaces (§6): the narrow seams the core consumes its
//! collaborators through. Plan template persistence, model configuration,
//! the LLM wire protocol, per-tool business logic, and directory management
//! are all out of scope for the core itself — these traits are the contract
//! a concrete adapter fulfills (see `agentcore`'s `adapters` module for the
//! runnable set: `InMemoryPlanStore`, `EnvModelRegistry`, `HttpChatClient`,
//! `TracingRecorder`, `LocalDirectoryManager`).

use async_trait::async_trait;
use serde_json::Value;

use crate::error::AgentCoreError;
use crate::model::{Message, PlanId, ToolCall};

/// A stored plan template: the ordered step requirements a `PlanStore` loads
/// by id. Template persistence beyond this minimal append-only shape is
/// explicitly out of scope (§1).
#[derive(Debug, Clone)]
pub struct PlanTemplate {
    pub id: PlanId,
    pub title: String,
    pub step_requirements: Vec<String>,
}

#[async_trait]
pub trait PlanStore: Send + Sync {
    async fn load_template(&self, id: &str) -> Result<PlanTemplate, AgentCoreError>;
    async fn list_templates(&self) -> Result<Vec<PlanTemplate>, AgentCoreError>;
    async fn save_template(&self, template: PlanTemplate) -> Result<(), AgentCoreError>;
}

/// The resolved configuration for one model: API base, key, model name.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub name: String,
    pub api_base: String,
    pub api_key: String,
}

#[async_trait]
pub trait ModelRegistry: Send + Sync {
    async fn find_default(&self) -> Result<ModelConfig, AgentCoreError>;
    async fn find_by_name(&self, name: &str) -> Result<ModelConfig, AgentCoreError>;
}

/// One chunk of a streamed assistant turn: either a text delta or a
/// tool-call argument fragment keyed by index (see
/// `agentcore-agent::stream` for the merge logic).
#[derive(Debug, Clone)]
pub enum StreamChunk {
    TextDelta(String),
    ToolCallDelta { index: usize, id: Option<String>, name: Option<String>, arguments_delta: String },
    Done,
}

/// A tool declared to the LLM: name + JSON schema.
#[derive(Debug, Clone)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// "accept prompt + tool catalog, return a stream of assistant chunks."
/// Internal tool auto-execution must be disabled on every implementation —
/// the core manages the think/act loop itself.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn stream_chat(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[ToolDeclaration],
        temperature: Option<f64>,
        on_chunk: &mut (dyn FnMut(StreamChunk) + Send),
    ) -> Result<(), AgentCoreError>;
}

/// One tool's capability, resolved from its registration (§4.2.2 Act).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolCapability {
    /// Ordinary tool: store the result, leave the agent `in-progress`.
    Plain,
    /// Enters the form-input rendezvous protocol (§4.2.4).
    FormInput,
    /// Exposes a post-call `can_terminate` predicate.
    Terminable,
    /// A distinguished terminable tool: always completes the step.
    Terminate,
    /// Extracts `error_message` from the result for UI visibility.
    ErrorReport,
}

/// The result of applying one tool.
#[derive(Debug, Clone)]
pub struct ToolApplyResult {
    pub output: String,
    pub is_error: bool,
    /// Only meaningful for `ToolCapability::Terminable`.
    pub can_terminate: bool,
}

/// `{inputType, jsonSchema, apply(input, ctx) -> result}` (sync) or
/// `applyAsync(...) -> future<result>` (async), plus `cleanup` and
/// `current_state_string`. Grounded on the teacher's
/// `ExtensionRegistry::execute` dispatch-by-name pattern, generalized to a
/// trait object per registered tool rather than one big match.
#[async_trait]
pub trait ToolContext: Send + Sync {
    fn capability(&self) -> ToolCapability;
    fn json_schema(&self) -> &Value;
    /// `true` if this tool's `apply` should be invoked through its async
    /// interface directly rather than submitted to the depth pool.
    fn is_async(&self) -> bool {
        true
    }
    async fn apply(&self, arguments: Value, ctx: &ExecutionMeta) -> ToolApplyResult;
    fn cleanup(&self, _plan_id: &str) {}
    fn current_state_string(&self) -> String {
        String::new()
    }
}

/// Minimal per-call metadata a `ToolContext::apply` needs: correlation id
/// and recursion depth (so a tool that spawns a sub-plan submits it to the
/// pool at `depth + 1`).
#[derive(Debug, Clone)]
pub struct ExecutionMeta {
    pub tool_call_id: String,
    pub depth: u32,
    pub root_plan_id: PlanId,
}

#[async_trait]
pub trait ToolRegistry: Send + Sync {
    /// All registered tools, keyed by their qualified `serviceGroup_toolName` key.
    fn all_tools(&self) -> Vec<(String, std::sync::Arc<dyn ToolContext>)>;
}

/// `rootPlanDir`, `ensureExternalFolderLink`, `removeExternalFolderLink`.
#[async_trait]
pub trait DirectoryManager: Send + Sync {
    fn root_plan_dir(&self, plan_id: &str) -> std::path::PathBuf;
    async fn ensure_external_folder_link(&self, plan_id: &str, upload_key: &str) -> Result<(), AgentCoreError>;
    async fn remove_external_folder_link(&self, plan_id: &str) -> Result<(), AgentCoreError>;
}

/// `checkAndContinue(rootPlanId) -> bool`. `false` means "stop".
pub trait InterruptionHelper: Send + Sync {
    fn check_and_continue(&self, root_plan_id: &str) -> bool;
}

/// A tool call with its arguments parsed into an ordered JSON object
/// (`serde_json::Map` preserves insertion order when the `preserve_order`
/// feature is enabled), used by the argument-conversion step of dispatch.
#[derive(Debug, Clone)]
pub struct ResolvedCall {
    pub index: usize,
    pub tool_call: ToolCall,
    pub resolved_key: String,
    pub arguments: Value,
}
