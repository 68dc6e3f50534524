//! The compressor itself (§4.4): ties together round grouping, selection,
//! and snapshot summarization, and exposes both the conversation-memory and
//! agent-memory compression entry points.

use agentcore_core::config::MemoryConfig;
use agentcore_core::error::AgentCoreError;
use agentcore_core::model::{
    group_messages_into_rounds, AgentMemory, ConversationMemory, Message,
};
use agentcore_core::traits::{ChatClient, StreamChunk, ToolDeclaration};

use crate::selection::select_rounds;
use crate::snapshot::{clamp_summary, serialize_rounds_for_summary, summary_prompt, wrap_as_snapshot_pair};

/// Run one summarization call against the given rounds and return the
/// clamped `<state_snapshot>` text. On LLM failure, logs and returns `Err`
/// so the caller can fall back to returning the history uncompressed
/// (matching the teacher's "keeping all messages" fallback).
async fn summarize_rounds(
    client: &dyn ChatClient,
    model: &str,
    rounds: &[agentcore_core::model::DialogRound],
    config: &MemoryConfig,
) -> Result<String, AgentCoreError> {
    let serialized = serialize_rounds_for_summary(rounds);
    let prompt = Message::user(summary_prompt(&serialized));

    let mut buffer = String::new();
    let mut on_chunk = |chunk: StreamChunk| {
        if let StreamChunk::TextDelta(delta) = chunk {
            buffer.push_str(&delta);
        }
    };

    client
        .stream_chat(model, &[prompt], &[] as &[ToolDeclaration], Some(0.3), &mut on_chunk)
        .await?;

    if buffer.trim().is_empty() {
        tracing::warn!("compaction summary empty, using placeholder");
        buffer = "[Compaction summary unavailable]".to_string();
    }

    Ok(clamp_summary(&buffer, config.summary_max_chars))
}

/// Compress `ConversationMemory` (and, in place, `agent_memory`) if their
/// *combined* serialized size exceeds `config.max_chars` (§4.4 thresholds,
/// §4.2.1 step 3). Returns the conversation memory unchanged, and leaves
/// `agent_memory` untouched, if the combined size is under threshold; either
/// half that fails to summarize falls back to its own full history
/// (fail-open, matching the teacher's fallback).
pub async fn compress_conversation_memory(
    memory: &ConversationMemory,
    agent_memory: &mut AgentMemory,
    client: &dyn ChatClient,
    model: &str,
    config: &MemoryConfig,
) -> ConversationMemory {
    if memory.char_len() + agent_memory.char_len() <= config.max_chars {
        return memory.clone();
    }

    match compress_messages(&agent_memory.messages, client, model, config).await {
        Ok(messages) => agent_memory.messages = messages,
        Err(e) => tracing::warn!("agent memory compaction failed, keeping full history: {e}"),
    }

    compress_messages(&memory.messages, client, model, config)
        .await
        .map(|messages| ConversationMemory {
            conversation_id: memory.conversation_id.clone(),
            messages,
        })
        .unwrap_or_else(|e| {
            tracing::warn!("conversation memory compaction failed, keeping full history: {e}");
            memory.clone()
        })
}

/// Forced compression (§4.4 "Forced compression"): bypasses the size check,
/// used by the repeated-result detector or an explicit Executor call.
/// Operates on the agent-memory message list in place conceptually, but
/// returns the new list since `AgentMemory` is plain data here.
pub async fn force_compress_agent_memory(
    memory: &mut AgentMemory,
    client: &dyn ChatClient,
    model: &str,
    config: &MemoryConfig,
) {
    match compress_messages(&memory.messages, client, model, config).await {
        Ok(messages) => {
            memory.messages = messages;
            memory.clear_repeat_window();
        }
        Err(e) => {
            tracing::warn!("forced agent memory compaction failed, keeping full history: {e}");
        }
    }
}

/// Shared round-grouping / selection / summarization pipeline for both
/// conversation memory and agent memory.
async fn compress_messages(
    messages: &[Message],
    client: &dyn ChatClient,
    model: &str,
    config: &MemoryConfig,
) -> Result<Vec<Message>, AgentCoreError> {
    let rounds = group_messages_into_rounds(messages);
    if rounds.len() <= 1 {
        return Ok(messages.to_vec());
    }

    let total_chars: usize = rounds.iter().map(|r| r.char_len()).sum();
    let retention_target = (total_chars as f64 * config.retention_ratio) as usize;
    let selection = select_rounds(rounds, retention_target);

    if selection.summarize.is_empty() {
        return Ok(messages.to_vec());
    }

    let summary = summarize_rounds(client, model, &selection.summarize, config).await?;
    let pair = wrap_as_snapshot_pair(&summary);

    let mut rebuilt = Vec::with_capacity(pair.len() + selection.keep.len() * 2);
    rebuilt.extend(pair);
    for round in &selection.keep {
        rebuilt.extend(round.messages.clone());
    }
    Ok(rebuilt)
}

/// `true` if `memory` should trigger the repeated-result forced-compression
/// path (§4.4 "Repeated-result threshold", §4.2.2).
pub fn should_force_compress(memory: &AgentMemory, config: &MemoryConfig) -> bool {
    memory.is_repeated_loop(config.repeated_result_threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentcore_core::traits::ChatClient;
    use async_trait::async_trait;

    struct EchoSummaryClient;

    #[async_trait]
    impl ChatClient for EchoSummaryClient {
        async fn stream_chat(
            &self,
            _model: &str,
            _messages: &[Message],
            _tools: &[ToolDeclaration],
            _temperature: Option<f64>,
            on_chunk: &mut (dyn FnMut(StreamChunk) + Send),
        ) -> Result<(), AgentCoreError> {
            on_chunk(StreamChunk::TextDelta("<state_snapshot>summary</state_snapshot>".to_string()));
            Ok(())
        }
    }

    fn config() -> MemoryConfig {
        MemoryConfig {
            max_chars: 50,
            retention_ratio: 0.4,
            summary_min_chars: 1,
            summary_max_chars: 4_000,
            repeated_result_threshold: 3,
            enable_conversation_memory: true,
            max_memory_messages: 200,
        }
    }

    fn big_history() -> Vec<Message> {
        (0..10)
            .flat_map(|i| {
                vec![
                    Message::user(format!("question {i}").repeat(5)),
                    Message::assistant(Some(format!("answer {i}").repeat(5)), vec![]),
                ]
            })
            .collect()
    }

    #[tokio::test]
    async fn under_threshold_is_left_unchanged() {
        let memory = ConversationMemory {
            conversation_id: "c1".into(),
            messages: vec![Message::user("hi")],
        };
        let mut agent_memory = AgentMemory::default();
        let out = compress_conversation_memory(&memory, &mut agent_memory, &EchoSummaryClient, "m", &config()).await;
        assert_eq!(out.messages.len(), 1);
    }

    #[tokio::test]
    async fn over_threshold_is_compressed_with_snapshot_pair() {
        let memory = ConversationMemory {
            conversation_id: "c1".into(),
            messages: big_history(),
        };
        let mut agent_memory = AgentMemory::default();
        let out = compress_conversation_memory(&memory, &mut agent_memory, &EchoSummaryClient, "m", &config()).await;
        assert!(out.messages.len() < memory.messages.len());
        assert!(out.messages[0].content.as_deref().unwrap().contains("state_snapshot"));
        assert_eq!(out.messages[1].content.as_deref(), Some(crate::snapshot::ACK_MESSAGE));
    }

    #[tokio::test]
    async fn combined_threshold_compresses_agent_memory_too() {
        let memory = ConversationMemory {
            conversation_id: "c1".into(),
            messages: vec![Message::user("hi")],
        };
        let mut agent_memory = AgentMemory {
            messages: big_history(),
            recent_tool_results: Default::default(),
        };
        let before_len = agent_memory.messages.len();
        let out = compress_conversation_memory(&memory, &mut agent_memory, &EchoSummaryClient, "m", &config()).await;
        assert_eq!(out.messages.len(), 1);
        assert!(agent_memory.messages.len() < before_len);
        assert!(agent_memory.messages[0].content.as_deref().unwrap().contains("state_snapshot"));
    }

    #[tokio::test]
    async fn forced_compression_clears_repeat_window() {
        let mut mem = AgentMemory {
            messages: big_history(),
            recent_tool_results: Default::default(),
        };
        mem.push_tool_result("same".into(), 3);
        mem.push_tool_result("same".into(), 3);
        mem.push_tool_result("same".into(), 3);
        assert!(should_force_compress(&mem, &config()));
        force_compress_agent_memory(&mut mem, &EchoSummaryClient, "m", &config()).await;
        assert!(!mem.is_repeated_loop(3));
    }
}
