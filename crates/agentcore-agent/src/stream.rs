//! Streaming LLM Handler (§4.6): merges partial assistant chunks — text
//! deltas and partial tool-call argument fragments keyed by index — into one
//! final assistant turn, and detects "early termination" (text present, zero
//! tool calls) for the retry policy of §4.2.1.
//!
//! Grounded on the teacher's `on_text_chunk` streaming callback and
//! `ChoiceMessage`/`Choice` response shape (`llm/mod.rs`), generalized to
//! reassemble incremental tool-call argument strings: the teacher's client
//! returns fully-formed tool calls per response, but real OpenAI-compatible
//! streaming delivers tool-call arguments as string fragments per chunk, so
//! the merge step concatenates `arguments_delta` fragments by index before
//! the call is considered complete.

use agentcore_core::model::{Message, ToolCall};
use agentcore_core::traits::StreamChunk;

#[derive(Default)]
struct PartialToolCall {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
}

/// Accumulates `StreamChunk`s into a final assistant `Message`.
#[derive(Default)]
pub struct StreamMerger {
    text: String,
    tool_calls: Vec<Option<PartialToolCall>>,
}

impl StreamMerger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_chunk(&mut self, chunk: StreamChunk) {
        match chunk {
            StreamChunk::TextDelta(delta) => self.text.push_str(&delta),
            StreamChunk::ToolCallDelta { index, id, name, arguments_delta } => {
                if self.tool_calls.len() <= index {
                    self.tool_calls.resize_with(index + 1, || None);
                }
                let slot = self.tool_calls[index].get_or_insert_with(PartialToolCall::default);
                if let Some(id) = id {
                    slot.id = Some(id);
                }
                if let Some(name) = name {
                    slot.name = Some(name);
                }
                slot.arguments.push_str(&arguments_delta);
            }
            StreamChunk::Done => {}
        }
    }

    /// Finalize into an assistant `Message`. Tool-call slots with no `name`
    /// are dropped (a fragment stream that never specified which tool is
    /// being called is not a usable call).
    pub fn finish(self) -> MergedTurn {
        let tool_calls: Vec<ToolCall> = self
            .tool_calls
            .into_iter()
            .flatten()
            .filter_map(|p| {
                p.name.map(|name| ToolCall {
                    id: p.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                    name,
                    arguments: p.arguments,
                })
            })
            .collect();

        let content = if self.text.is_empty() { None } else { Some(self.text) };
        let is_early_termination = content.is_some() && tool_calls.is_empty();

        MergedTurn {
            message: Message::assistant(content, tool_calls),
            is_early_termination,
        }
    }
}

pub struct MergedTurn {
    pub message: Message,
    /// `true` when the assistant produced text but zero tool calls — the
    /// retry policy's "early termination" condition (§4.2.1 step 7).
    pub is_early_termination: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_text_deltas() {
        let mut merger = StreamMerger::new();
        merger.on_chunk(StreamChunk::TextDelta("hello ".into()));
        merger.on_chunk(StreamChunk::TextDelta("world".into()));
        let turn = merger.finish();
        assert_eq!(turn.message.content.as_deref(), Some("hello world"));
        assert!(turn.is_early_termination);
    }

    #[test]
    fn merges_tool_call_argument_fragments_by_index() {
        let mut merger = StreamMerger::new();
        merger.on_chunk(StreamChunk::ToolCallDelta {
            index: 0,
            id: Some("call_1".into()),
            name: Some("search_lookup".into()),
            arguments_delta: "{\"q\":".into(),
        });
        merger.on_chunk(StreamChunk::ToolCallDelta {
            index: 0,
            id: None,
            name: None,
            arguments_delta: "\"rust\"}".into(),
        });
        let turn = merger.finish();
        let calls = turn.message.tool_calls.unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].arguments, "{\"q\":\"rust\"}");
        assert!(!turn.is_early_termination);
    }

    #[test]
    fn tool_call_without_name_is_dropped() {
        let mut merger = StreamMerger::new();
        merger.on_chunk(StreamChunk::ToolCallDelta {
            index: 0,
            id: Some("call_1".into()),
            name: None,
            arguments_delta: "{}".into(),
        });
        let turn = merger.finish();
        assert!(turn.message.tool_calls.is_none());
    }

    #[test]
    fn preserves_call_order_by_index() {
        let mut merger = StreamMerger::new();
        merger.on_chunk(StreamChunk::ToolCallDelta {
            index: 1,
            id: Some("b".into()),
            name: Some("tool_b".into()),
            arguments_delta: "{}".into(),
        });
        merger.on_chunk(StreamChunk::ToolCallDelta {
            index: 0,
            id: Some("a".into()),
            name: Some("tool_a".into()),
            arguments_delta: "{}".into(),
        });
        let turn = merger.finish();
        let calls = turn.message.tool_calls.unwrap();
        assert_eq!(calls[0].name, "tool_a");
        assert_eq!(calls[1].name, "tool_b");
    }
}
