//! Round selection (§4.4 "Selection"): walk dialog rounds newest-to-oldest,
//! accumulating characters into `keep[]` against the retention target. The
//! first round that would push the running total past the target stops
//! accumulation; everything older goes to `summarize[]`. The newest round
//! is unconditionally kept even if it alone exceeds the target.

use agentcore_core::model::DialogRound;

pub struct Selection {
    pub keep: Vec<DialogRound>,
    pub summarize: Vec<DialogRound>,
}

/// `retention_target_chars` is `total_chars * retention_ratio`, computed by
/// the caller so this function stays a pure function of its inputs.
pub fn select_rounds(rounds: Vec<DialogRound>, retention_target_chars: usize) -> Selection {
    let mut keep: Vec<DialogRound> = Vec::new();
    let mut summarize: Vec<DialogRound> = Vec::new();
    let mut kept_chars = 0usize;
    let mut stopped = false;

    for (i, round) in rounds.into_iter().rev().enumerate() {
        if stopped {
            summarize.push(round);
            continue;
        }
        let round_chars = round.char_len();
        if i == 0 {
            kept_chars += round_chars;
            keep.push(round);
            continue;
        }
        if kept_chars + round_chars > retention_target_chars {
            summarize.push(round);
            stopped = true;
        } else {
            kept_chars += round_chars;
            keep.push(round);
        }
    }

    keep.reverse();
    summarize.reverse();
    Selection { keep, summarize }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentcore_core::model::{group_messages_into_rounds, Message, ToolCall};

    fn round(text: &str) -> DialogRound {
        let messages = vec![
            Message::user(text.repeat(10)),
            Message::assistant(Some("ack".into()), vec![]),
        ];
        group_messages_into_rounds(&messages).remove(0)
    }

    #[test]
    fn newest_round_always_kept_even_if_it_exceeds_target() {
        let huge = DialogRound {
            messages: vec![Message::user("x".repeat(10_000))],
        };
        let sel = select_rounds(vec![round("a"), huge], 10);
        assert_eq!(sel.keep.len(), 1);
        assert_eq!(sel.summarize.len(), 1);
    }

    #[test]
    fn accumulates_from_newest_until_target_exceeded() {
        let rounds = vec![round("a"), round("b"), round("c")];
        let target = rounds[1].char_len() + rounds[2].char_len();
        let sel = select_rounds(rounds, target);
        assert_eq!(sel.keep.len(), 2);
        assert_eq!(sel.summarize.len(), 1);
    }

    #[test]
    fn stops_accumulating_at_first_over_target_round_even_if_an_older_one_would_fit() {
        // "b" alone would fit under the target, but it sits behind "c" in the
        // walk, and "c" already pushed the running total past the target —
        // so "b" must be summarized too, not kept.
        let rounds = vec![round("a"), round("b"), round("c")];
        let target = rounds[2].char_len();
        let sel = select_rounds(rounds, target);
        assert_eq!(sel.keep.len(), 1);
        assert_eq!(sel.summarize.len(), 2);
    }

    #[test]
    fn tool_response_closes_round_in_selection_input() {
        let messages = vec![
            Message::user("go"),
            Message::assistant(None, vec![ToolCall::new("t", "{}")]),
            Message::tool_response("tc1", "done"),
            Message::user("more"),
            Message::assistant(Some("ok".into()), vec![]),
        ];
        let rounds = group_messages_into_rounds(&messages);
        assert_eq!(rounds.len(), 2);
        let sel = select_rounds(rounds, usize::MAX);
        assert_eq!(sel.keep.len(), 2);
        assert!(sel.summarize.is_empty());
    }
}
