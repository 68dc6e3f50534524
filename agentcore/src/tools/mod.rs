//! Built-in workspace-confined tools (file read/write, terminate),
//! registered as the default `ToolRegistry` a CLI run wires into the agent.
//!
//! Grounded on the teacher's `skilllite/src/agent/extensions/builtin.rs`
//! (`resolve_within_workspace`, sensitive-path blocking), simplified to the
//! two file operations an agent loop smoke test needs plus the distinguished
//! terminate tool every run must be able to call.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use agentcore_core::traits::{
    ExecutionMeta, ToolApplyResult, ToolCapability, ToolContext, ToolRegistry,
};

const SENSITIVE_SUFFIXES: &[&str] = &[".env", ".key", ".pem"];

fn is_sensitive_write_path(path: &str) -> bool {
    let lower = path.to_lowercase();
    SENSITIVE_SUFFIXES.iter().any(|s| lower.ends_with(s)) || lower.contains(".git/config")
}

fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            std::path::Component::ParentDir => {
                components.pop();
            }
            std::path::Component::CurDir => {}
            other => components.push(other),
        }
    }
    components.iter().collect()
}

fn resolve_within_workspace(path: &str, workspace: &Path) -> Result<PathBuf, String> {
    let input = Path::new(path);
    let resolved = if input.is_absolute() { input.to_path_buf() } else { workspace.join(input) };
    let normalized = normalize_path(&resolved);
    if !normalized.starts_with(workspace) {
        return Err(format!("path escapes workspace: {path} (workspace: {})", workspace.display()));
    }
    Ok(normalized)
}

pub struct ReadFileTool {
    pub workspace: PathBuf,
}

#[async_trait]
impl ToolContext for ReadFileTool {
    fn capability(&self) -> ToolCapability {
        ToolCapability::Plain
    }

    fn json_schema(&self) -> &Value {
        static SCHEMA: std::sync::OnceLock<Value> = std::sync::OnceLock::new();
        SCHEMA.get_or_init(|| {
            json!({
                "description": "Read the contents of a file. Returns UTF-8 text content.",
                "type": "object",
                "properties": { "path": { "type": "string" } },
                "required": ["path"],
            })
        })
    }

    async fn apply(&self, arguments: Value, _ctx: &ExecutionMeta) -> ToolApplyResult {
        let Some(path) = arguments.get("path").and_then(|v| v.as_str()) else {
            return ToolApplyResult { output: "missing required argument: path".to_string(), is_error: true, can_terminate: false };
        };
        match resolve_within_workspace(path, &self.workspace) {
            Err(e) => ToolApplyResult { output: e, is_error: true, can_terminate: false },
            Ok(resolved) => match std::fs::read_to_string(&resolved) {
                Ok(content) => ToolApplyResult { output: content, is_error: false, can_terminate: false },
                Err(e) => ToolApplyResult { output: format!("failed to read {path}: {e}"), is_error: true, can_terminate: false },
            },
        }
    }
}

pub struct WriteFileTool {
    pub workspace: PathBuf,
}

#[async_trait]
impl ToolContext for WriteFileTool {
    fn capability(&self) -> ToolCapability {
        ToolCapability::Plain
    }

    fn json_schema(&self) -> &Value {
        static SCHEMA: std::sync::OnceLock<Value> = std::sync::OnceLock::new();
        SCHEMA.get_or_init(|| {
            json!({
                "description": "Write content to a file, creating parent directories as needed. Blocks writes to sensitive files (.env, .key, .pem, .git/config).",
                "type": "object",
                "properties": {
                    "path": { "type": "string" },
                    "content": { "type": "string" },
                },
                "required": ["path", "content"],
            })
        })
    }

    async fn apply(&self, arguments: Value, _ctx: &ExecutionMeta) -> ToolApplyResult {
        let (Some(path), Some(content)) = (
            arguments.get("path").and_then(|v| v.as_str()),
            arguments.get("content").and_then(|v| v.as_str()),
        ) else {
            return ToolApplyResult { output: "missing required arguments: path, content".to_string(), is_error: true, can_terminate: false };
        };
        if is_sensitive_write_path(path) {
            return ToolApplyResult { output: format!("refusing to write to sensitive path: {path}"), is_error: true, can_terminate: false };
        }
        match resolve_within_workspace(path, &self.workspace) {
            Err(e) => ToolApplyResult { output: e, is_error: true, can_terminate: false },
            Ok(resolved) => {
                if let Some(parent) = resolved.parent() {
                    if let Err(e) = std::fs::create_dir_all(parent) {
                        return ToolApplyResult { output: format!("failed to create parent dirs: {e}"), is_error: true, can_terminate: false };
                    }
                }
                match std::fs::write(&resolved, content) {
                    Ok(()) => ToolApplyResult { output: format!("wrote {} bytes to {path}", content.len()), is_error: false, can_terminate: false },
                    Err(e) => ToolApplyResult { output: format!("failed to write {path}: {e}"), is_error: true, can_terminate: false },
                }
            }
        }
    }
}

/// The distinguished always-terminates tool (§4.2.2) every run registers.
pub struct TerminateTool;

#[async_trait]
impl ToolContext for TerminateTool {
    fn capability(&self) -> ToolCapability {
        ToolCapability::Terminate
    }

    fn json_schema(&self) -> &Value {
        static SCHEMA: std::sync::OnceLock<Value> = std::sync::OnceLock::new();
        SCHEMA.get_or_init(|| {
            json!({
                "description": "Call this when the step's goal has been accomplished, with a final summary.",
                "type": "object",
                "properties": { "summary": { "type": "string" } },
                "required": ["summary"],
            })
        })
    }

    async fn apply(&self, arguments: Value, _ctx: &ExecutionMeta) -> ToolApplyResult {
        let summary = arguments.get("summary").and_then(|v| v.as_str()).unwrap_or("").to_string();
        ToolApplyResult { output: summary, is_error: false, can_terminate: true }
    }
}

pub struct BuiltinToolRegistry {
    tools: Vec<(String, Arc<dyn ToolContext>)>,
}

impl BuiltinToolRegistry {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        let workspace = workspace.into();
        Self {
            tools: vec![
                ("read_file".to_string(), Arc::new(ReadFileTool { workspace: workspace.clone() }) as Arc<dyn ToolContext>),
                ("write_file".to_string(), Arc::new(WriteFileTool { workspace }) as Arc<dyn ToolContext>),
                ("terminate".to_string(), Arc::new(TerminateTool) as Arc<dyn ToolContext>),
            ],
        }
    }
}

impl ToolRegistry for BuiltinToolRegistry {
    fn all_tools(&self) -> Vec<(String, Arc<dyn ToolContext>)> {
        self.tools.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> ExecutionMeta {
        ExecutionMeta { tool_call_id: "tc1".to_string(), depth: 0, root_plan_id: "root".to_string() }
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let tmp = std::env::temp_dir().join(format!("agentcore-tools-test-{}", std::process::id()));
        std::fs::create_dir_all(&tmp).unwrap();
        let write_tool = WriteFileTool { workspace: tmp.clone() };
        let read_tool = ReadFileTool { workspace: tmp.clone() };

        let write_result = write_tool.apply(json!({"path": "out.txt", "content": "hello"}), &meta()).await;
        assert!(!write_result.is_error);

        let read_result = read_tool.apply(json!({"path": "out.txt"}), &meta()).await;
        assert_eq!(read_result.output, "hello");

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn refuses_to_escape_workspace() {
        let tmp = std::env::temp_dir().join(format!("agentcore-tools-escape-{}", std::process::id()));
        std::fs::create_dir_all(&tmp).unwrap();
        let write_tool = WriteFileTool { workspace: tmp.clone() };
        let result = write_tool.apply(json!({"path": "../escape.txt", "content": "x"}), &meta()).await;
        assert!(result.is_error);
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn refuses_to_write_sensitive_paths() {
        let tmp = std::env::temp_dir().join(format!("agentcore-tools-sensitive-{}", std::process::id()));
        std::fs::create_dir_all(&tmp).unwrap();
        let write_tool = WriteFileTool { workspace: tmp.clone() };
        let result = write_tool.apply(json!({"path": ".env", "content": "SECRET=1"}), &meta()).await;
        assert!(result.is_error);
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn terminate_tool_always_terminates() {
        let result = TerminateTool.apply(json!({"summary": "done"}), &meta()).await;
        assert!(result.can_terminate);
        assert_eq!(result.output, "done");
    }
}
