//! `<state_snapshot>` construction (§4.4 "Summarization"): serialize the
//! rounds being summarized, prompt the LLM for the fixed XML schema, and
//! wrap the result as `user(snapshot) + assistant(ack)` so the rebuilt
//! message list preserves the strict user/assistant alternation downstream
//! LLMs expect.
//!
//! Grounded on the teacher's `compact_history_inner` (`chat_session.rs`):
//! the summary prompt there role-tags each message and asks for a concise
//! summary; we keep that shape but target the structured XML schema instead
//! of free text, and append a canned acknowledgement rather than a system
//! message, matching the spec's alternation requirement.

use agentcore_core::model::{DialogRound, Message};

pub const ACK_MESSAGE: &str = "Got it. Thanks for the additional context!";

/// Serialize rounds to JSON; fall back to role-tagged plain text if
/// serialization fails for any reason (it practically never does, since
/// `Message` is plain data, but the teacher's compaction path always treats
/// summarization as best-effort rather than fallible in a way that aborts).
pub fn serialize_rounds_for_summary(rounds: &[DialogRound]) -> String {
    let messages: Vec<&Message> = rounds.iter().flat_map(|r| r.messages.iter()).collect();
    serde_json::to_string_pretty(&messages).unwrap_or_else(|_| plain_text_fallback(rounds))
}

fn plain_text_fallback(rounds: &[DialogRound]) -> String {
    rounds
        .iter()
        .flat_map(|r| r.messages.iter())
        .filter_map(|m| {
            let content = m.content.as_deref().unwrap_or("");
            if content.is_empty() {
                None
            } else {
                Some(format!("[{:?}] {}", m.role, content))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The prompt sent to the LLM asking for the fixed `<state_snapshot>` schema.
pub fn summary_prompt(serialized_rounds: &str) -> String {
    format!(
        "Summarize the following conversation history. Respond with exactly \
         one `<state_snapshot>` element in this schema, nothing else:\n\n\
         <state_snapshot>\n  <overall_goal>…</overall_goal>\n  \
         <key_knowledge>…</key_knowledge>\n  <file_system_state>…</file_system_state>\n  \
         <recent_actions>…</recent_actions>\n  <current_plan>…</current_plan>\n\
         </state_snapshot>\n\nConversation history:\n{serialized_rounds}"
    )
}

/// Hard-truncate a summary above the size band (§4.4 "Summary size band");
/// under-size summaries are accepted as-is (the caller logs a warning).
pub fn clamp_summary(summary: &str, max_chars: usize) -> String {
    if summary.len() <= max_chars {
        summary.to_string()
    } else {
        summary.chars().take(max_chars).collect()
    }
}

/// Wrap a finished summary as the `user(snapshot) + assistant(ack)` pair
/// that precedes the kept rounds in the rebuilt memory.
pub fn wrap_as_snapshot_pair(summary: &str) -> [Message; 2] {
    [Message::user(summary.to_string()), Message::assistant(Some(ACK_MESSAGE.to_string()), vec![])]
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentcore_core::model::group_messages_into_rounds;

    #[test]
    fn serializes_rounds_as_json() {
        let messages = vec![Message::user("hi"), Message::assistant(Some("ack".into()), vec![])];
        let rounds = group_messages_into_rounds(&messages);
        let out = serialize_rounds_for_summary(&rounds);
        assert!(out.contains("hi"));
    }

    #[test]
    fn clamp_truncates_above_band() {
        let long = "x".repeat(5_000);
        let clamped = clamp_summary(&long, 4_000);
        assert_eq!(clamped.len(), 4_000);
    }

    #[test]
    fn clamp_leaves_undersize_summary_untouched() {
        let short = "short summary";
        assert_eq!(clamp_summary(short, 4_000), short);
    }

    #[test]
    fn wraps_snapshot_as_alternating_pair() {
        let pair = wrap_as_snapshot_pair("snapshot text");
        assert_eq!(pair[0].role, agentcore_core::model::Role::User);
        assert_eq!(pair[1].role, agentcore_core::model::Role::Assistant);
        assert_eq!(pair[1].content.as_deref(), Some(ACK_MESSAGE));
    }
}
