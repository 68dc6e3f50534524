//! Think (§4.2.1): one retried, streamed LLM call per ReAct iteration.
//!
//! Grounded on the teacher's `is_context_overflow_error` string-matching
//! idiom (`llm/mod.rs`), generalized by
//! `AgentCoreError::classify_llm_error` into the retry policy's
//! DNS/connection/timeout markers, and on the teacher's
//! `chat_completion_stream`/`on_text_chunk` callback shape for the streaming
//! call itself.

use std::sync::Arc;
use std::time::Duration;

use agentcore_core::config::ExecutorConfig;
use agentcore_core::error::AgentCoreError;
use agentcore_core::model::{AgentMemory, ConversationMemory, ExecutionContext, Message};
use agentcore_core::traits::{ChatClient, InterruptionHelper, ToolDeclaration};

use crate::stream::StreamMerger;

/// Everything Think needs besides the wire call itself.
pub struct ThinkInputs<'a> {
    pub ctx: &'a ExecutionContext,
    pub conversation: &'a ConversationMemory,
    pub agent_memory: &'a AgentMemory,
    /// Current-step environment snapshot (§4.2.1 step 2), passed as a
    /// prompt-assembly input rather than stored in `agent_memory` — agent
    /// memory holds only assistant turns and tool responses (§4.2.3).
    pub environment_message: &'a str,
    pub tools: &'a [ToolDeclaration],
    pub model: &'a str,
    pub include_conversation_history: bool,
    pub extra_directive: Option<&'a str>,
}

/// The finished assistant turn plus the environment message that preceded
/// it in the prompt, useful for callers building a think/act record.
pub struct ThinkOutcome {
    pub message: Message,
    pub prompt_messages: Vec<Message>,
}

/// System-preamble builder (§4.2.1 step 4): OS, date, debug/parallel flags.
fn system_preamble(config: &ExecutorConfig) -> String {
    format!(
        "You are an autonomous agent operating on {os}. Today's date is {date}. \
         Parallel tool calls are {parallel}. Debug detail is {debug}. \
         Call exactly the tools needed to make progress; when finished, call the \
         terminate tool with your final answer.",
        os = std::env::consts::OS,
        date = chrono::Utc::now().format("%Y-%m-%d"),
        parallel = if config.parallel_tool_calls { "enabled" } else { "disabled" },
        debug = if config.debug_detail { "on" } else { "off" },
    )
}

/// Query every registered tool's current-state string and fold the non-empty
/// ones into the round-scoped environment message (§4.2.1 step 2).
pub fn environment_snapshot(states: &[(String, String)]) -> String {
    let lines: Vec<String> = states
        .iter()
        .filter(|(_, s)| !s.is_empty())
        .map(|(name, s)| format!("- {name}: {s}"))
        .collect();
    if lines.is_empty() {
        "Current environment: nothing to report.".to_string()
    } else {
        format!("Current environment:\n{}", lines.join("\n"))
    }
}

/// Assemble the full prompt in spec order: system preamble, conversation
/// history (if enabled), agent memory, current-step environment message.
pub fn build_prompt(
    config: &ExecutorConfig,
    conversation: &ConversationMemory,
    agent_memory: &AgentMemory,
    environment_message: &str,
    include_conversation_history: bool,
    extra_directive: Option<&str>,
) -> Vec<Message> {
    let mut prompt = vec![Message::system(system_preamble(config))];
    if include_conversation_history {
        prompt.extend(conversation.messages.iter().cloned());
    }
    prompt.extend(agent_memory.messages.iter().cloned());

    let mut env_text = environment_message.to_string();
    if let Some(directive) = extra_directive {
        env_text.push_str("\n\n");
        env_text.push_str(directive);
    }
    prompt.push(Message::user(env_text));
    prompt
}

fn backoff_delay(attempt: u32, config: &ExecutorConfig) -> Duration {
    let millis = config.retry_base_ms.saturating_mul(1u64 << attempt.saturating_sub(1));
    Duration::from_millis(millis.min(config.retry_cap_ms))
}

/// Run one streaming call with the retry policy (§4.2.1 step 7): retries
/// only retryable failures with exponential backoff, tracks an early
/// termination counter across attempts, and fails the step with
/// `LlmToolless` once that counter reaches the configured threshold.
pub async fn think(
    client: &dyn ChatClient,
    config: &ExecutorConfig,
    interruption: &dyn InterruptionHelper,
    inputs: ThinkInputs<'_>,
) -> Result<ThinkOutcome, AgentCoreError> {
    if !interruption.check_and_continue(&inputs.ctx.root_plan_id) {
        return Err(AgentCoreError::Interrupted);
    }

    let mut early_termination_count: u32 = 0;
    let mut extra_directive = inputs.extra_directive.map(str::to_string);
    let mut last_err: Option<AgentCoreError> = None;

    for attempt in 1..=config.llm_max_retries.max(1) {
        if !interruption.check_and_continue(&inputs.ctx.root_plan_id) {
            return Err(AgentCoreError::Interrupted);
        }

        let prompt_messages = build_prompt(
            config,
            inputs.conversation,
            inputs.agent_memory,
            inputs.environment_message,
            inputs.include_conversation_history,
            extra_directive.as_deref(),
        );

        let mut merger = StreamMerger::new();
        let mut on_chunk = |chunk| merger.on_chunk(chunk);
        let call_result = client
            .stream_chat(inputs.model, &prompt_messages, inputs.tools, None, &mut on_chunk)
            .await;

        match call_result {
            Ok(()) => {
                let turn = merger.finish();
                if turn.is_early_termination {
                    early_termination_count += 1;
                    if early_termination_count >= config.early_termination_threshold {
                        return Err(AgentCoreError::LlmToolless { attempts: early_termination_count });
                    }
                    extra_directive = Some(
                        "You must call a tool. Do not respond with plain text alone.".to_string(),
                    );
                    continue;
                }
                return Ok(ThinkOutcome { message: turn.message, prompt_messages });
            }
            Err(e) => {
                let classified = AgentCoreError::classify_llm_error(&e.to_string());
                let retryable = classified.is_retryable();
                last_err = Some(classified);
                if !retryable {
                    break;
                }
                if attempt < config.llm_max_retries {
                    tokio::time::sleep(backoff_delay(attempt, config)).await;
                }
            }
        }
    }

    Err(last_err.unwrap_or(AgentCoreError::LlmFatal("exhausted retries".to_string())))
}

/// Shared Arc-wrapped dependency bundle (used by `agent::DynamicAgent`).
pub type SharedChatClient = Arc<dyn ChatClient>;

#[cfg(test)]
mod tests {
    use super::*;
    use agentcore_core::interruption::InterruptionRegistry;
    use agentcore_core::traits::StreamChunk;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn config() -> ExecutorConfig {
        ExecutorConfig {
            max_steps: 30,
            parallel_tool_calls: true,
            debug_detail: false,
            user_input_timeout_secs: 300,
            form_poll_ms: 500,
            interrupt_recheck_ms: 2_000,
            llm_max_retries: 3,
            retry_base_ms: 1,
            retry_cap_ms: 2,
            early_termination_threshold: 3,
            workspace: ".".to_string(),
        }
    }

    fn ctx() -> ExecutionContext {
        ExecutionContext {
            current_plan_id: "p".into(),
            root_plan_id: "p".into(),
            parent_plan_id: None,
            depth: 0,
            conversation_id: "c".into(),
            upload_key: None,
            success: true,
            tool_call_correlation_id: None,
        }
    }

    struct ToolCallingClient;
    #[async_trait]
    impl ChatClient for ToolCallingClient {
        async fn stream_chat(
            &self,
            _model: &str,
            _messages: &[Message],
            _tools: &[ToolDeclaration],
            _temperature: Option<f64>,
            on_chunk: &mut (dyn FnMut(StreamChunk) + Send),
        ) -> Result<(), AgentCoreError> {
            on_chunk(StreamChunk::ToolCallDelta {
                index: 0,
                id: Some("c1".into()),
                name: Some("terminate".into()),
                arguments_delta: "{}".into(),
            });
            Ok(())
        }
    }

    #[tokio::test]
    async fn succeeds_with_a_tool_call() {
        let interruption = InterruptionRegistry::new();
        let conv = ConversationMemory::default();
        let mem = AgentMemory::default();
        let ectx = ctx();
        let outcome = think(
            &ToolCallingClient,
            &config(),
            &interruption,
            ThinkInputs {
                ctx: &ectx,
                conversation: &conv,
                agent_memory: &mem,
                environment_message: "Proceed.",
                tools: &[],
                model: "m",
                include_conversation_history: true,
                extra_directive: None,
            },
        )
        .await
        .unwrap();
        assert!(outcome.message.tool_calls.is_some());
    }

    struct EarlyTerminationClient {
        calls: AtomicU32,
    }
    #[async_trait]
    impl ChatClient for EarlyTerminationClient {
        async fn stream_chat(
            &self,
            _model: &str,
            _messages: &[Message],
            _tools: &[ToolDeclaration],
            _temperature: Option<f64>,
            on_chunk: &mut (dyn FnMut(StreamChunk) + Send),
        ) -> Result<(), AgentCoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            on_chunk(StreamChunk::TextDelta("just text, no tools".into()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn early_termination_exhausts_into_toolless_error() {
        let interruption = InterruptionRegistry::new();
        let conv = ConversationMemory::default();
        let mem = AgentMemory::default();
        let ectx = ctx();
        let client = EarlyTerminationClient { calls: AtomicU32::new(0) };
        let err = think(
            &client,
            &config(),
            &interruption,
            ThinkInputs {
                ctx: &ectx,
                conversation: &conv,
                agent_memory: &mem,
                environment_message: "Proceed.",
                tools: &[],
                model: "m",
                include_conversation_history: true,
                extra_directive: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AgentCoreError::LlmToolless { attempts: 3 }));
        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn interrupted_flag_short_circuits_before_any_call() {
        let interruption = InterruptionRegistry::new();
        interruption.interrupt("p");
        let conv = ConversationMemory::default();
        let mem = AgentMemory::default();
        let ectx = ctx();
        let err = think(
            &ToolCallingClient,
            &config(),
            &interruption,
            ThinkInputs {
                ctx: &ectx,
                conversation: &conv,
                agent_memory: &mem,
                environment_message: "Proceed.",
                tools: &[],
                model: "m",
                include_conversation_history: true,
                extra_directive: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AgentCoreError::Interrupted));
    }
}
