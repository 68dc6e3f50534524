//! OpenAI-compatible + Claude-native streaming chat client (§6 `ChatClient`).
//!
//! Grounded on the teacher's `skilllite-agent/src/llm` module: `openai.rs`'s
//! `accumulate_openai_stream` (SSE line-buffering, `delta.tool_calls`
//! index-merge) for the OpenAI path, and `claude.rs`'s
//! `convert_messages_for_claude` / `accumulate_claude_stream` (system-prompt
//! extraction, `tool_use`/`tool_result` content blocks, `event:`-typed SSE)
//! for the Claude path, with `mod.rs`'s `detect_tool_format` auto-routing by
//! model name / API base. Both paths call `on_chunk` per delta instead of
//! accumulating into one final response object — the core's `StreamMerger`
//! (in `agentcore-agent`) owns accumulation now.

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};

use agentcore_core::error::AgentCoreError;
use agentcore_core::model::{Message, Role};
use agentcore_core::traits::{ChatClient, StreamChunk, ToolDeclaration};

pub struct HttpChatClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl HttpChatClient {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .expect("failed to build HTTP client");
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn role_str(role: Role) -> &'static str {
        match role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::ToolResponse => "tool",
        }
    }

    fn to_wire_message(message: &Message) -> Value {
        let mut obj = json!({ "role": Self::role_str(message.role) });
        if let Some(content) = &message.content {
            obj["content"] = json!(content);
        }
        if let Some(tool_call_id) = &message.tool_call_id {
            obj["tool_call_id"] = json!(tool_call_id);
        }
        if let Some(name) = &message.name {
            obj["name"] = json!(name);
        }
        if let Some(calls) = &message.tool_calls {
            obj["tool_calls"] = json!(calls
                .iter()
                .map(|c| json!({
                    "id": c.id,
                    "type": "function",
                    "function": { "name": c.name, "arguments": c.arguments },
                }))
                .collect::<Vec<_>>());
        }
        obj
    }

    fn to_wire_tool(tool: &ToolDeclaration) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.parameters,
            },
        })
    }

    fn to_claude_tool(tool: &ToolDeclaration) -> Value {
        json!({
            "name": tool.name,
            "description": tool.description,
            "input_schema": tool.parameters,
        })
    }

    /// System prompt + turn list for the Claude Messages API: system
    /// messages merge into one prompt string, tool results batch into a
    /// single `user` turn of `tool_result` blocks.
    fn to_claude_messages(messages: &[Message]) -> (Option<String>, Vec<Value>) {
        let mut system_prompt: Option<String> = None;
        let mut turns: Vec<Value> = Vec::new();
        let mut pending_tool_results: Vec<Value> = Vec::new();

        let flush = |turns: &mut Vec<Value>, pending: &mut Vec<Value>| {
            if !pending.is_empty() {
                turns.push(json!({ "role": "user", "content": std::mem::take(pending) }));
            }
        };

        for message in messages {
            if message.role != Role::ToolResponse {
                flush(&mut turns, &mut pending_tool_results);
            }
            match message.role {
                Role::System => {
                    if let Some(content) = &message.content {
                        system_prompt = Some(match system_prompt.take() {
                            Some(existing) => format!("{existing}\n\n{content}"),
                            None => content.clone(),
                        });
                    }
                }
                Role::User => {
                    turns.push(json!({
                        "role": "user",
                        "content": message.content.clone().unwrap_or_default(),
                    }));
                }
                Role::Assistant => {
                    let mut blocks: Vec<Value> = Vec::new();
                    if let Some(text) = &message.content {
                        if !text.is_empty() {
                            blocks.push(json!({ "type": "text", "text": text }));
                        }
                    }
                    if let Some(calls) = &message.tool_calls {
                        for call in calls {
                            let input: Value =
                                serde_json::from_str(&call.arguments).unwrap_or_else(|_| json!({}));
                            blocks.push(json!({
                                "type": "tool_use",
                                "id": call.id,
                                "name": call.name,
                                "input": input,
                            }));
                        }
                    }
                    if !blocks.is_empty() {
                        turns.push(json!({ "role": "assistant", "content": blocks }));
                    }
                }
                Role::ToolResponse => {
                    pending_tool_results.push(json!({
                        "type": "tool_result",
                        "tool_use_id": message.tool_call_id.clone().unwrap_or_default(),
                        "content": message.content.clone().unwrap_or_default(),
                    }));
                }
            }
        }
        flush(&mut turns, &mut pending_tool_results);
        (system_prompt, turns)
    }
}

/// Detect which wire protocol to speak, per the teacher's
/// `detect_tool_format`: Claude model names / API bases route to the
/// Anthropic Messages API, everything else to the OpenAI-compatible one.
fn is_claude(model: &str, api_base: &str) -> bool {
    let model = model.to_lowercase();
    let base = api_base.to_lowercase();
    model.starts_with("claude") || base.contains("anthropic") || base.contains("claude")
}

#[async_trait]
impl ChatClient for HttpChatClient {
    async fn stream_chat(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[ToolDeclaration],
        temperature: Option<f64>,
        on_chunk: &mut (dyn FnMut(StreamChunk) + Send),
    ) -> Result<(), AgentCoreError> {
        if is_claude(model, &self.api_base) {
            self.stream_claude(model, messages, tools, temperature, on_chunk).await
        } else {
            self.stream_openai(model, messages, tools, temperature, on_chunk).await
        }
    }
}

impl HttpChatClient {
    async fn stream_openai(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[ToolDeclaration],
        temperature: Option<f64>,
        on_chunk: &mut (dyn FnMut(StreamChunk) + Send),
    ) -> Result<(), AgentCoreError> {
        let url = format!("{}/chat/completions", self.api_base);

        let mut body = json!({
            "model": model,
            "messages": messages.iter().map(Self::to_wire_message).collect::<Vec<_>>(),
            "stream": true,
        });
        if let Some(temp) = temperature {
            body["temperature"] = json!(temp);
        }
        if !tools.is_empty() {
            body["tools"] = json!(tools.iter().map(Self::to_wire_tool).collect::<Vec<_>>());
        }

        let resp = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentCoreError::classify_llm_error(&e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(AgentCoreError::classify_llm_error(&format!(
                "LLM API error ({status}): {body_text}"
            )));
        }

        let mut buffer = String::new();
        let mut stream = resp.bytes_stream();

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|e| AgentCoreError::classify_llm_error(&e.to_string()))?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(newline_pos) = buffer.find('\n') {
                let line = buffer[..newline_pos].trim().to_string();
                buffer = buffer[newline_pos + 1..].to_string();

                if line.is_empty() || line.starts_with(':') || !line.starts_with("data: ") {
                    continue;
                }
                let data = &line[6..];
                if data == "[DONE]" {
                    continue;
                }
                let Ok(parsed) = serde_json::from_str::<Value>(data) else {
                    continue;
                };
                let Some(choices) = parsed.get("choices").and_then(|c| c.as_array()) else {
                    continue;
                };
                for choice in choices {
                    let Some(delta) = choice.get("delta") else { continue };
                    if let Some(text) = delta.get("content").and_then(|v| v.as_str()) {
                        on_chunk(StreamChunk::TextDelta(text.to_string()));
                    }
                    if let Some(tc_deltas) = delta.get("tool_calls").and_then(|v| v.as_array()) {
                        for tc in tc_deltas {
                            let index = tc.get("index").and_then(|v| v.as_u64()).unwrap_or(0) as usize;
                            let id = tc.get("id").and_then(|v| v.as_str()).map(str::to_string);
                            let (name, arguments_delta) = match tc.get("function") {
                                Some(func) => (
                                    func.get("name").and_then(|v| v.as_str()).map(str::to_string),
                                    func.get("arguments").and_then(|v| v.as_str()).unwrap_or("").to_string(),
                                ),
                                None => (None, String::new()),
                            };
                            on_chunk(StreamChunk::ToolCallDelta { index, id, name, arguments_delta });
                        }
                    }
                }
            }
        }

        on_chunk(StreamChunk::Done);
        Ok(())
    }

    async fn stream_claude(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[ToolDeclaration],
        temperature: Option<f64>,
        on_chunk: &mut (dyn FnMut(StreamChunk) + Send),
    ) -> Result<(), AgentCoreError> {
        let url = format!("{}/v1/messages", self.api_base.trim_end_matches("/v1"));
        let (system_prompt, claude_messages) = Self::to_claude_messages(messages);

        let mut body = json!({
            "model": model,
            "max_tokens": 4096,
            "messages": claude_messages,
            "stream": true,
        });
        if let Some(system) = &system_prompt {
            body["system"] = json!(system);
        }
        if let Some(temp) = temperature {
            body["temperature"] = json!(temp);
        }
        if !tools.is_empty() {
            body["tools"] = json!(tools.iter().map(Self::to_claude_tool).collect::<Vec<_>>());
        }

        let resp = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentCoreError::classify_llm_error(&e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(AgentCoreError::classify_llm_error(&format!(
                "LLM API error ({status}): {body_text}"
            )));
        }

        let mut buffer = String::new();
        let mut stream = resp.bytes_stream();
        let mut current_event = String::new();
        let mut tool_index = 0usize;
        let mut in_tool_use = false;
        let mut current_tool_id: Option<String> = None;
        let mut current_tool_name: Option<String> = None;

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|e| AgentCoreError::classify_llm_error(&e.to_string()))?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(newline_pos) = buffer.find('\n') {
                let line = buffer[..newline_pos].trim().to_string();
                buffer = buffer[newline_pos + 1..].to_string();

                if let Some(event) = line.strip_prefix("event: ") {
                    current_event = event.trim().to_string();
                    continue;
                }
                if line.is_empty() || !line.starts_with("data: ") {
                    continue;
                }
                let Ok(parsed) = serde_json::from_str::<Value>(&line[6..]) else {
                    continue;
                };

                match current_event.as_str() {
                    "content_block_start" => {
                        let block = parsed.get("content_block");
                        if block.and_then(|b| b.get("type")).and_then(|t| t.as_str()) == Some("tool_use") {
                            in_tool_use = true;
                            current_tool_id =
                                block.and_then(|b| b.get("id")).and_then(|v| v.as_str()).map(str::to_string);
                            current_tool_name =
                                block.and_then(|b| b.get("name")).and_then(|v| v.as_str()).map(str::to_string);
                        } else {
                            in_tool_use = false;
                        }
                    }
                    "content_block_delta" => {
                        let Some(delta) = parsed.get("delta") else { continue };
                        match delta.get("type").and_then(|t| t.as_str()) {
                            Some("text_delta") => {
                                if let Some(text) = delta.get("text").and_then(|v| v.as_str()) {
                                    on_chunk(StreamChunk::TextDelta(text.to_string()));
                                }
                            }
                            Some("input_json_delta") => {
                                if in_tool_use {
                                    let fragment =
                                        delta.get("partial_json").and_then(|v| v.as_str()).unwrap_or("");
                                    on_chunk(StreamChunk::ToolCallDelta {
                                        index: tool_index,
                                        id: current_tool_id.take(),
                                        name: current_tool_name.take(),
                                        arguments_delta: fragment.to_string(),
                                    });
                                }
                            }
                            _ => {}
                        }
                    }
                    "content_block_stop" => {
                        if in_tool_use {
                            tool_index += 1;
                            in_tool_use = false;
                        }
                    }
                    _ => {}
                }
            }
        }

        on_chunk(StreamChunk::Done);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_claude_by_model_name() {
        assert!(is_claude("claude-3-5-sonnet-20241022", "https://api.openai.com/v1"));
    }

    #[test]
    fn detects_claude_by_api_base() {
        assert!(is_claude("my-model", "https://api.anthropic.com/v1"));
    }

    #[test]
    fn defaults_to_openai_format() {
        assert!(!is_claude("gpt-4o", "https://api.openai.com/v1"));
    }

    #[test]
    fn merges_system_messages_and_batches_tool_results() {
        let messages = vec![
            Message { role: Role::System, content: Some("be terse".into()), name: None, tool_call_id: None, tool_calls: None },
            Message { role: Role::System, content: Some("answer in english".into()), name: None, tool_call_id: None, tool_calls: None },
            Message { role: Role::User, content: Some("hi".into()), name: None, tool_call_id: None, tool_calls: None },
        ];
        let (system, turns) = HttpChatClient::to_claude_messages(&messages);
        assert_eq!(system.as_deref(), Some("be terse\n\nanswer in english"));
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0]["role"], "user");
    }
}
