//! Conversation Memory Compressor (§4.4): round grouping, newest-to-oldest
//! retention selection, and LLM-backed `<state_snapshot>` summarization for
//! both the cross-plan `ConversationMemory` and the per-step `AgentMemory`.

pub mod compress;
pub mod selection;
pub mod snapshot;

pub use compress::{compress_conversation_memory, force_compress_agent_memory, should_force_compress};
