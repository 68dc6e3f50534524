//! Shared data model: `Plan`, `Step`, `Message`, `DialogRound`,
//! `ConversationMemory`, `ToolCall`, `ExecutionContext`.
//!
//! These types are used across the dispatch, memory, agent, and executor
//! crates, so they live in `agentcore-core` to keep the dependency graph
//! acyclic.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A plan identifier. Opaque, caller-assigned.
pub type PlanId = String;
/// A conversation identifier scoping `ConversationMemory`.
pub type ConversationId = String;

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ─── Messages ───────────────────────────────────────────────────────────────

/// One chat-completion message. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    ToolResponse,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }

    pub fn assistant(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_calls: if tool_calls.is_empty() {
                None
            } else {
                Some(tool_calls)
            },
            tool_call_id: None,
            name: None,
        }
    }

    pub fn tool_response(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::ToolResponse,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
            name: None,
        }
    }

    /// Serialized character count, used as the proxy for token accounting
    /// throughout the memory compressor (the spec is explicit that exact
    /// token accounting is a non-goal).
    pub fn char_len(&self) -> usize {
        serde_json::to_string(self).map(|s| s.len()).unwrap_or(0)
    }
}

/// A tool call as emitted by the LLM. `name` may be a qualified key
/// (`serviceGroup_toolName` / `serviceGroup.toolName`) or a bare tool name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Raw JSON arguments text as emitted by the LLM (may be a fragment
    /// while streaming; see `agentcore-agent::stream`).
    pub arguments: String,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

// ─── Dialog rounds ──────────────────────────────────────────────────────────

/// A maximal contiguous sub-list of messages matching one of the shapes
/// `user -> assistant -> tool_response*`, `user -> assistant`, or
/// `assistant -> tool_response*`. Derived, never stored.
#[derive(Debug, Clone, Default)]
pub struct DialogRound {
    pub messages: Vec<Message>,
}

impl DialogRound {
    pub fn char_len(&self) -> usize {
        self.messages.iter().map(Message::char_len).sum()
    }
}

/// Group a flat message list into dialog rounds (§4.4 "Round grouping"):
/// scan left to right, closing a round on any tool-response message, and
/// otherwise starting a new round at each user message. Unknown message
/// shapes attach to the currently open round.
pub fn group_messages_into_rounds(messages: &[Message]) -> Vec<DialogRound> {
    let mut rounds: Vec<DialogRound> = Vec::new();
    let mut current = DialogRound::default();

    for msg in messages {
        if msg.role == Role::User && !current.messages.is_empty() {
            rounds.push(std::mem::take(&mut current));
        }
        current.messages.push(msg.clone());
        if msg.role == Role::ToolResponse {
            rounds.push(std::mem::take(&mut current));
        }
    }
    if !current.messages.is_empty() {
        rounds.push(current);
    }
    rounds
}

/// Flatten rounds back into one message list (inverse of
/// `group_messages_into_rounds`, used by the round-trip law in the spec's
/// testable properties).
pub fn flatten_rounds(rounds: &[DialogRound]) -> Vec<Message> {
    rounds.iter().flat_map(|r| r.messages.clone()).collect()
}

// ─── Conversation memory ───────────────────────────────────────────────────

/// The cross-plan, user-visible dialog for one conversation. Invariant:
/// after compression, messages form alternating user/assistant pairs (the
/// summary snapshot is injected as `user(snapshot), assistant(ack)`).
#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    pub conversation_id: ConversationId,
    pub messages: Vec<Message>,
}

impl ConversationMemory {
    pub fn new(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            messages: Vec::new(),
        }
    }

    pub fn char_len(&self) -> usize {
        self.messages.iter().map(Message::char_len).sum()
    }
}

// ─── Agent memory ───────────────────────────────────────────────────────────

/// The step's reasoning trail: assistant turns and tool responses only
/// (never system or raw user-environment messages, per the memory filtering
/// invariant).
#[derive(Debug, Clone, Default)]
pub struct AgentMemory {
    pub messages: Vec<Message>,
    /// Rolling window of the last `REPEATED_RESULT_THRESHOLD` (3) tool
    /// results, used for loop detection.
    pub recent_tool_results: VecDeque<String>,
}

impl AgentMemory {
    pub fn char_len(&self) -> usize {
        self.messages.iter().map(Message::char_len).sum()
    }

    /// Append a raw tool-result string to the rolling window, keeping it
    /// bounded to `capacity` entries.
    pub fn push_tool_result(&mut self, result: String, capacity: usize) {
        self.recent_tool_results.push_back(result);
        while self.recent_tool_results.len() > capacity {
            self.recent_tool_results.pop_front();
        }
    }

    /// `true` when the window is full and every entry is identical.
    pub fn is_repeated_loop(&self, capacity: usize) -> bool {
        self.recent_tool_results.len() == capacity
            && self
                .recent_tool_results
                .iter()
                .all(|r| r == &self.recent_tool_results[0])
    }

    pub fn clear_repeat_window(&mut self) {
        self.recent_tool_results.clear();
    }
}

// ─── Plan / Step ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Interrupted,
}

/// One unit of work within a plan: an agent tag, requirement text, and result.
#[derive(Debug, Clone)]
pub struct Step {
    pub step_id: String,
    pub step_index: usize,
    pub requirement: String,
    /// Leading `[TAG]` parsed (uppercased) from the requirement text.
    pub agent_tag: Option<String>,
    pub status: StepStatus,
    pub result: Option<String>,
    pub error_message: Option<String>,
}

impl Step {
    pub const DEFAULT_AGENT_TAG: &'static str = "DEFAULT_AGENT";

    pub fn new(step_index: usize, requirement: impl Into<String>) -> Self {
        let requirement = requirement.into();
        let agent_tag = parse_leading_tag(&requirement);
        Self {
            step_id: new_id(),
            step_index,
            requirement,
            agent_tag,
            status: StepStatus::Pending,
            result: None,
            error_message: None,
        }
    }
}

/// Parse a leading `[TAG]` prefix from requirement text (uppercased).
/// Returns `None` if the requirement does not start with a bracketed tag.
pub fn parse_leading_tag(requirement: &str) -> Option<String> {
    let trimmed = requirement.trim_start();
    if !trimmed.starts_with('[') {
        return None;
    }
    let end = trimmed.find(']')?;
    let tag = &trimmed[1..end];
    if tag.is_empty() {
        None
    } else {
        Some(tag.to_uppercase())
    }
}

/// An ordered sequence of steps with a unique identifier. Created when a
/// request is accepted; mutated only by its owning executor; destroyed
/// after terminal state is recorded.
#[derive(Debug, Clone)]
pub struct Plan {
    pub plan_id: PlanId,
    pub root_plan_id: PlanId,
    pub parent_plan_id: Option<PlanId>,
    pub title: String,
    pub depth: u32,
    pub steps: Vec<Step>,
    pub result: Option<PlanExecutionResult>,
}

impl Plan {
    /// A top-level plan: `root_plan_id == plan_id`, `parent_plan_id = None`, `depth = 0`.
    pub fn top_level(title: impl Into<String>, steps: Vec<Step>) -> Self {
        let plan_id = new_id();
        Self {
            root_plan_id: plan_id.clone(),
            plan_id,
            parent_plan_id: None,
            title: title.into(),
            depth: 0,
            steps,
            result: None,
        }
    }

    /// A sub-plan spawned by a tool at `depth + 1`, inheriting the lineage.
    pub fn sub_plan(
        parent: &Plan,
        title: impl Into<String>,
        steps: Vec<Step>,
    ) -> Self {
        Self {
            plan_id: new_id(),
            root_plan_id: parent.root_plan_id.clone(),
            parent_plan_id: Some(parent.plan_id.clone()),
            title: title.into(),
            depth: parent.depth + 1,
            steps,
            result: None,
        }
    }

    pub fn is_top_level(&self) -> bool {
        self.root_plan_id == self.plan_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanOutcome {
    Completed,
    Failed,
    Interrupted,
}

/// The result a plan's execution future resolves to. Never an `Err` —
/// failures are always materialized as data (§7 propagation policy).
#[derive(Debug, Clone)]
pub struct PlanExecutionResult {
    pub outcome: PlanOutcome,
    pub final_result: Option<String>,
    pub error: Option<String>,
    pub step_outcomes: Vec<(String, StepStatus)>,
}

// ─── Execution context ──────────────────────────────────────────────────────

/// Threaded through a plan's execution: identity, lineage, and correlation.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub current_plan_id: PlanId,
    pub root_plan_id: PlanId,
    pub parent_plan_id: Option<PlanId>,
    pub depth: u32,
    pub conversation_id: ConversationId,
    pub upload_key: Option<String>,
    pub success: bool,
    pub tool_call_correlation_id: Option<String>,
}

impl ExecutionContext {
    pub fn for_plan(plan: &Plan, conversation_id: impl Into<String>) -> Self {
        Self {
            current_plan_id: plan.plan_id.clone(),
            root_plan_id: plan.root_plan_id.clone(),
            parent_plan_id: plan.parent_plan_id.clone(),
            depth: plan.depth,
            conversation_id: conversation_id.into(),
            upload_key: None,
            success: true,
            tool_call_correlation_id: None,
        }
    }
}

// ─── Result envelope (§4.3) ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ToolStatus {
    Success,
    Error,
}

/// `{index, status, output|error}` — the dispatch result envelope. Errors
/// never propagate as exceptions; they become `ToolStatus::Error` envelopes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResultEnvelope {
    pub index: usize,
    pub tool_call_id: String,
    pub status: ToolStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResultEnvelope {
    pub fn success(index: usize, tool_call_id: impl Into<String>, output: String) -> Self {
        Self {
            index,
            tool_call_id: tool_call_id.into(),
            status: ToolStatus::Success,
            output: Some(output),
            error: None,
        }
    }

    pub fn error(index: usize, tool_call_id: impl Into<String>, error: String) -> Self {
        Self {
            index,
            tool_call_id: tool_call_id.into(),
            status: ToolStatus::Error,
            output: None,
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == ToolStatus::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_leading_tag() {
        assert_eq!(parse_leading_tag("[search] look up X"), Some("SEARCH".to_string()));
        assert_eq!(parse_leading_tag("no tag here"), None);
        assert_eq!(parse_leading_tag("[] empty"), None);
    }

    #[test]
    fn top_level_plan_has_matching_root_id() {
        let plan = Plan::top_level("demo", vec![Step::new(0, "do it")]);
        assert!(plan.is_top_level());
        assert_eq!(plan.root_plan_id, plan.plan_id);
    }

    #[test]
    fn sub_plan_inherits_root_and_increments_depth() {
        let parent = Plan::top_level("parent", vec![]);
        let child = Plan::sub_plan(&parent, "child", vec![]);
        assert_eq!(child.root_plan_id, parent.root_plan_id);
        assert_eq!(child.depth, 1);
        assert!(!child.is_top_level());
    }

    #[test]
    fn round_trip_group_then_flatten() {
        let messages = vec![
            Message::user("hi"),
            Message::assistant(Some("sure".into()), vec![]),
            Message::user("next"),
            Message::assistant(None, vec![ToolCall::new("search", "{}")]),
            Message::tool_response("tc1", "result"),
        ];
        let rounds = group_messages_into_rounds(&messages);
        let flat = flatten_rounds(&rounds);
        assert_eq!(flat.len(), messages.len());
    }

    #[test]
    fn repeated_result_window_detects_loop() {
        let mut mem = AgentMemory::default();
        mem.push_tool_result("loop".into(), 3);
        assert!(!mem.is_repeated_loop(3));
        mem.push_tool_result("loop".into(), 3);
        mem.push_tool_result("loop".into(), 3);
        assert!(mem.is_repeated_loop(3));
        mem.push_tool_result("other".into(), 3);
        assert!(!mem.is_repeated_loop(3));
    }
}
