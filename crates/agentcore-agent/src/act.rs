//! Act (§4.2.2): single- and multi-tool execution paths, result
//! post-processing, loop detection, and the memory filtering rule (§4.2.3).

use std::time::Duration;

use agentcore_core::config::{ExecutorConfig, MemoryConfig};
use agentcore_core::error::AgentCoreError;
use agentcore_core::interruption::{FormInputSlots, FormState, InterruptionRegistry};
use agentcore_core::model::{AgentMemory, ConversationMemory, ExecutionContext, Message, Role, ToolCall, ToolResultEnvelope};
use agentcore_core::pool::LevelPools;
use agentcore_core::traits::{ChatClient, ToolCapability, ToolContext};
use agentcore_dispatch::{dispatch_single, dispatch_tool_calls, ToolIndex};

/// What the caller (the agent's step loop) should do after one Act call.
pub enum ActOutcome {
    /// Continue to the next think/act iteration. The `Option<String>` is a
    /// nudge for the *next* Think prompt (e.g. "call a tool", "form
    /// submitted: ...") — carried as a directive rather than pushed into
    /// agent memory, since agent memory holds only assistant turns and tool
    /// responses (§4.2.3).
    InProgress(Option<String>),
    /// Terminate the step with this result text.
    Terminate(String),
    /// Step failed; attach this message for UI visibility.
    Failed(String),
}

/// Routing entry point (§4.2.2 "Routing"): 0 calls prompts for a tool, 1 call
/// takes the single-tool path, 2+ take the multi-tool path.
#[allow(clippy::too_many_arguments)]
pub async fn act(
    assistant_turn: &Message,
    ctx: &ExecutionContext,
    index_table: &ToolIndex,
    pools: &LevelPools,
    interruption: &InterruptionRegistry,
    form_slots: &FormInputSlots,
    executor_config: &ExecutorConfig,
    memory_config: &MemoryConfig,
    chat_client: &dyn ChatClient,
    model: &str,
    agent_memory: &mut AgentMemory,
    conversation: &ConversationMemory,
) -> Result<ActOutcome, AgentCoreError> {
    let calls = assistant_turn.tool_calls.clone().unwrap_or_default();
    agent_memory.messages.push(assistant_turn.clone());

    let outcome = match calls.len() {
        0 => Ok(ActOutcome::InProgress(Some(
            "No tool call was made. Please call a tool to make progress.".to_string(),
        ))),
        1 => {
            single_tool_path(
                &calls[0],
                ctx,
                index_table,
                pools,
                interruption,
                form_slots,
                executor_config,
                memory_config,
                chat_client,
                model,
                agent_memory,
            )
            .await
        }
        _ => multi_tool_path(&calls, ctx, index_table, pools, agent_memory).await,
    };

    // Memory filtering rule (§4.2.3): drop anything already mirrored in
    // conversation memory plus any stray system/user message, so agent
    // memory never grows past assistant turns and tool responses.
    if outcome.is_ok() {
        agent_memory.messages = apply_memory_filter(&agent_memory.messages, conversation);
    }

    outcome
}

// ─── Single-tool path (§4.2.2) ──────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
async fn single_tool_path(
    call: &ToolCall,
    ctx: &ExecutionContext,
    index_table: &ToolIndex,
    pools: &LevelPools,
    interruption: &InterruptionRegistry,
    form_slots: &FormInputSlots,
    executor_config: &ExecutorConfig,
    memory_config: &MemoryConfig,
    chat_client: &dyn ChatClient,
    model: &str,
    agent_memory: &mut AgentMemory,
) -> Result<ActOutcome, AgentCoreError> {
    let (envelope, tool) = dispatch_single(call, index_table, ctx.depth, pools).await;

    let Some(tool) = tool else {
        agent_memory
            .messages
            .push(Message::tool_response(call.id.clone(), envelope_text(&envelope)));
        return Ok(ActOutcome::InProgress(None));
    };

    match tool.capability() {
        ToolCapability::FormInput => {
            form_input_rendezvous(call, ctx, tool.as_ref(), interruption, form_slots, executor_config, agent_memory)
                .await
        }
        ToolCapability::Terminate => {
            let result = post_process_result(&envelope);
            agent_memory.messages.push(Message::tool_response(call.id.clone(), result.clone()));
            Ok(ActOutcome::Terminate(result))
        }
        ToolCapability::Terminable => {
            let result = post_process_result(&envelope);
            agent_memory.messages.push(Message::tool_response(call.id.clone(), result.clone()));
            record_for_loop_detection(agent_memory, &envelope_text(&envelope), memory_config, chat_client, model).await;
            if !envelope.is_error() {
                Ok(ActOutcome::Terminate(result))
            } else {
                Ok(ActOutcome::InProgress(None))
            }
        }
        ToolCapability::ErrorReport => {
            let result = post_process_result(&envelope);
            let error_message = extract_error_message(&result);
            agent_memory.messages.push(Message::tool_response(call.id.clone(), result.clone()));
            Ok(ActOutcome::Failed(error_message.unwrap_or(result)))
        }
        ToolCapability::Plain => {
            let result = post_process_result(&envelope);
            agent_memory.messages.push(Message::tool_response(call.id.clone(), result.clone()));
            record_for_loop_detection(agent_memory, &envelope_text(&envelope), memory_config, chat_client, model).await;
            Ok(ActOutcome::InProgress(None))
        }
    }
}

/// Result post-processing (§4.2.2 step 3): a fixed-point (not recursive)
/// unwrap of one level of escaped-JSON-string nesting, re-serialized
/// preserving key order.
pub fn post_process_result(envelope: &ToolResultEnvelope) -> String {
    let raw = envelope.output.clone().or_else(|| envelope.error.clone()).unwrap_or_default();
    unwrap_one_level(&raw)
}

fn unwrap_one_level(raw: &str) -> String {
    let Ok(parsed) = serde_json::from_str::<serde_json::Value>(raw) else {
        return raw.to_string();
    };
    let candidate = match &parsed {
        serde_json::Value::String(inner) => Some(inner.clone()),
        serde_json::Value::Object(map) => match map.get("output") {
            Some(serde_json::Value::String(inner)) => Some(inner.clone()),
            _ => None,
        },
        _ => None,
    };
    match candidate {
        Some(inner) if serde_json::from_str::<serde_json::Value>(&inner).is_ok() => inner,
        _ => raw.to_string(),
    }
}

fn extract_error_message(result: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(result)
        .ok()?
        .get("error_message")
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

fn envelope_text(envelope: &ToolResultEnvelope) -> String {
    envelope.output.clone().or_else(|| envelope.error.clone()).unwrap_or_default()
}

/// Loop detection (§4.2.2 step 4): append to the rolling window; force a
/// memory compression if the window is full of identical entries.
async fn record_for_loop_detection(
    agent_memory: &mut AgentMemory,
    result: &str,
    memory_config: &MemoryConfig,
    chat_client: &dyn ChatClient,
    model: &str,
) {
    agent_memory.push_tool_result(result.to_string(), memory_config.repeated_result_threshold);
    if agentcore_memory::should_force_compress(agent_memory, memory_config) {
        agentcore_memory::force_compress_agent_memory(agent_memory, chat_client, model, memory_config).await;
    }
}

// ─── Multi-tool path (§4.2.2) ───────────────────────────────────────────────

async fn multi_tool_path(
    calls: &[ToolCall],
    ctx: &ExecutionContext,
    index_table: &ToolIndex,
    pools: &LevelPools,
    agent_memory: &mut AgentMemory,
) -> Result<ActOutcome, AgentCoreError> {
    for call in calls {
        if let Some(key) = index_table.resolve_key(&call.name) {
            if let Some(tool) = index_table.get(&key) {
                if tool.capability() == ToolCapability::FormInput {
                    return Ok(ActOutcome::Failed(format!(
                        "tool {} requires interactive form input and cannot be used in a multi-tool turn",
                        call.name
                    )));
                }
            }
        }
    }

    let envelopes = dispatch_tool_calls(calls, index_table, ctx.depth, pools).await;

    let mut terminate_result = None;
    for (call, envelope) in calls.iter().zip(envelopes.iter()) {
        let text = post_process_result(envelope);
        agent_memory.messages.push(Message::tool_response(call.id.clone(), text.clone()));

        if let Some(key) = index_table.resolve_key(&call.name) {
            if let Some(tool) = index_table.get(&key) {
                if tool.capability() == ToolCapability::Terminate && !envelope.is_error() {
                    terminate_result = Some(text);
                }
            }
        }
    }

    match terminate_result {
        Some(result) => Ok(ActOutcome::Terminate(result)),
        None => Ok(ActOutcome::InProgress(None)),
    }
}

// ─── Memory filtering rule (§4.2.3) ─────────────────────────────────────────

/// Rebuild agent memory from a post-act message list: drop anything already
/// present in conversation memory, discard system/user messages, and keep
/// the rest (assistant turns and tool responses) as the new agent memory.
pub fn apply_memory_filter(post_act_messages: &[Message], conversation: &ConversationMemory) -> Vec<Message> {
    post_act_messages
        .iter()
        .filter(|m| !already_in_conversation(m, conversation))
        .filter(|m| m.role != Role::System && m.role != Role::User)
        .cloned()
        .collect()
}

fn already_in_conversation(message: &Message, conversation: &ConversationMemory) -> bool {
    conversation.messages.iter().any(|existing| messages_equal(existing, message))
}

fn messages_equal(a: &Message, b: &Message) -> bool {
    a.role == b.role
        && a.content == b.content
        && a.tool_call_id == b.tool_call_id
        && a.name == b.name
        && a.tool_calls.as_ref().map(|t| t.iter().map(|c| &c.id).collect::<Vec<_>>())
            == b.tool_calls.as_ref().map(|t| t.iter().map(|c| &c.id).collect::<Vec<_>>())
}

// ─── Form-input rendezvous (§4.2.4) ─────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
async fn form_input_rendezvous(
    call: &ToolCall,
    ctx: &ExecutionContext,
    tool: &dyn ToolContext,
    interruption: &InterruptionRegistry,
    form_slots: &FormInputSlots,
    executor_config: &ExecutorConfig,
    agent_memory: &mut AgentMemory,
) -> Result<ActOutcome, AgentCoreError> {
    if !form_slots.try_acquire(&ctx.root_plan_id) {
        return Ok(ActOutcome::Failed(format!(
            "a form is already outstanding for plan {}",
            ctx.root_plan_id
        )));
    }

    let state = form_slots
        .wait_for_input(
            &ctx.root_plan_id,
            interruption,
            Duration::from_millis(executor_config.form_poll_ms),
            Duration::from_millis(executor_config.interrupt_recheck_ms),
            Duration::from_secs(executor_config.user_input_timeout_secs),
        )
        .await;
    form_slots.release(&ctx.root_plan_id);

    let _ = tool.capability();

    match state {
        FormState::InputReceived(input) => {
            agent_memory.messages.push(Message::tool_response(call.id.clone(), input.clone()));
            Ok(ActOutcome::InProgress(Some(format!("Form submitted: {input}"))))
        }
        FormState::InputTimeout => Err(AgentCoreError::FormTimeout(executor_config.user_input_timeout_secs)),
        FormState::Pending => Err(AgentCoreError::FormTimeout(executor_config.user_input_timeout_secs)),
    }
}
