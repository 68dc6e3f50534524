//! Domain-grouped configuration structs, loaded from environment variables
//! with a single fallback policy (see [`super::loader`]).

use super::env_keys::{agent, llm, memory, observability as obv_keys, paths, pool};
use super::loader::{env_bool, env_num, env_optional, env_or};
use std::path::PathBuf;

/// LLM API configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
}

impl LlmConfig {
    /// Load from the environment (empty values fall back to defaults); loads `.env` first.
    pub fn from_env() -> Self {
        super::loader::load_dotenv();
        Self {
            api_base: env_or(llm::API_BASE, llm::API_BASE_ALIASES, || {
                "https://api.openai.com/v1".to_string()
            }),
            api_key: env_or(llm::API_KEY, llm::API_KEY_ALIASES, String::new),
            model: env_or(llm::MODEL, llm::MODEL_ALIASES, || "gpt-4o".to_string()),
        }
    }

    /// Default model name inferred from the API base, used when no model is set explicitly.
    pub fn default_model_for_base(api_base: &str) -> &'static str {
        if api_base.contains("localhost:11434") || api_base.contains("127.0.0.1:11434") {
            "qwen2.5:7b"
        } else if api_base.contains("api.deepseek.com") {
            "deepseek-chat"
        } else {
            "gpt-4o"
        }
    }
}

/// ReAct Agent Loop tunables (§6 configuration table, §6 numerical defaults).
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Per-agent step budget (default 10-30, agent-overridable). Workspace default: 30.
    pub max_steps: usize,
    /// If true, the system prompt invites multi-tool turns.
    pub parallel_tool_calls: bool,
    /// If true, requests reasoning text before each tool call.
    pub debug_detail: bool,
    /// Form-input wait, in seconds.
    pub user_input_timeout_secs: u64,
    /// Form-input poll interval.
    pub form_poll_ms: u64,
    /// Interruption recheck interval during form-input wait.
    pub interrupt_recheck_ms: u64,
    /// Max LLM retries per step (retryable failures only).
    pub llm_max_retries: u32,
    /// Exponential backoff base, `min(base * 2^(n-1), cap)`.
    pub retry_base_ms: u64,
    pub retry_cap_ms: u64,
    /// Consecutive tool-free LLM responses before failing the step with `LlmToolless`.
    pub early_termination_threshold: u32,
    pub workspace: String,
}

impl ExecutorConfig {
    pub fn from_env() -> Self {
        super::loader::load_dotenv();
        let workspace = env_optional(paths::WORKSPACE, &[]).unwrap_or_else(|| {
            std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .to_string_lossy()
                .to_string()
        });
        Self {
            max_steps: env_num(agent::MAX_STEPS, &[], 30),
            parallel_tool_calls: env_bool(agent::PARALLEL_TOOL_CALLS, &[], true),
            debug_detail: env_bool(agent::DEBUG_DETAIL, &[], false),
            user_input_timeout_secs: env_num(agent::USER_INPUT_TIMEOUT_SECS, &[], 300),
            form_poll_ms: env_num(agent::FORM_POLL_MS, &[], 500),
            interrupt_recheck_ms: env_num(agent::INTERRUPT_RECHECK_MS, &[], 2_000),
            llm_max_retries: env_num(agent::LLM_MAX_RETRIES, &[], 3),
            retry_base_ms: env_num(agent::RETRY_BASE_MS, &[], 2_000),
            retry_cap_ms: env_num(agent::RETRY_CAP_MS, &[], 60_000),
            early_termination_threshold: env_num(agent::EARLY_TERMINATION_THRESHOLD, &[], 3),
            workspace,
        }
    }
}

/// Conversation Memory Compressor thresholds.
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Compression threshold, in characters of combined serialized message JSON.
    pub max_chars: usize,
    /// Fraction of total characters kept as recent rounds (rest is summarized).
    pub retention_ratio: f64,
    pub summary_min_chars: usize,
    pub summary_max_chars: usize,
    /// Consecutive identical tool results that force an agent-memory compression.
    pub repeated_result_threshold: usize,
    pub enable_conversation_memory: bool,
    /// Max messages retained by the window store before compression is considered.
    pub max_memory_messages: usize,
}

impl MemoryConfig {
    pub fn from_env() -> Self {
        super::loader::load_dotenv();
        Self {
            max_chars: env_num(memory::MAX_CHARS, &[], 30_000),
            retention_ratio: env_num(memory::RETENTION_RATIO, &[], 0.40),
            summary_min_chars: env_num(memory::SUMMARY_MIN_CHARS, &[], 3_000),
            summary_max_chars: env_num(memory::SUMMARY_MAX_CHARS, &[], 4_000),
            repeated_result_threshold: env_num(memory::REPEATED_RESULT_THRESHOLD, &[], 3),
            enable_conversation_memory: env_bool(memory::ENABLE_CONVERSATION_MEMORY, &[], true),
            max_memory_messages: env_num(memory::MAX_MEMORY_MESSAGES, &[], 200),
        }
    }
}

/// Level-based Executor Pool capacities, keyed by depth.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub default_capacity: usize,
    /// Sparse per-depth overrides; any depth not listed uses `default_capacity`.
    pub capacity_by_depth: std::collections::HashMap<u32, usize>,
}

impl PoolConfig {
    pub fn from_env() -> Self {
        super::loader::load_dotenv();
        let default_capacity = env_num(pool::DEFAULT_CAPACITY, &[], 8);
        let mut capacity_by_depth = std::collections::HashMap::new();
        // AGENTCORE_POOL_CAPACITY_<N> overrides, scanned for a small fixed
        // range of plausible depths (recursion beyond this falls back to
        // the deepest configured capacity, per the spec's "unbounded depth
        // falls back to the deepest configured pool" rule).
        for depth in 0..16u32 {
            let key = format!("{}{}", pool::CAPACITY_PREFIX, depth);
            if let Some(v) = env_optional(&key, &[]).and_then(|s| s.parse::<usize>().ok()) {
                capacity_by_depth.insert(depth, v);
            }
        }
        Self {
            default_capacity,
            capacity_by_depth,
        }
    }

    /// Capacity for `depth`, falling back to the deepest configured override
    /// and finally to `default_capacity`.
    pub fn capacity_for_depth(&self, depth: u32) -> usize {
        if let Some(c) = self.capacity_by_depth.get(&depth) {
            return *c;
        }
        if let Some(max_depth) = self.capacity_by_depth.keys().max() {
            if depth > *max_depth {
                return self.capacity_by_depth[max_depth];
            }
        }
        self.default_capacity
    }
}

/// Observability configuration: quiet mode, log level, JSON mode.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
}

impl ObservabilityConfig {
    pub fn from_env() -> &'static Self {
        use std::sync::OnceLock;
        static CACHE: OnceLock<ObservabilityConfig> = OnceLock::new();
        CACHE.get_or_init(|| {
            super::loader::load_dotenv();
            let quiet = env_bool(obv_keys::QUIET, &[], false);
            let log_level = env_or(obv_keys::LOG_LEVEL, &[], || "agentcore=info".to_string());
            let log_json = env_bool(obv_keys::LOG_JSON, &[], false);
            Self {
                quiet,
                log_level,
                log_json,
            }
        })
    }
}

/// Aggregate configuration handed to the executor/agent at construction.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub llm: LlmConfig,
    pub executor: ExecutorConfig,
    pub memory: MemoryConfig,
    pub pool: PoolConfig,
}

impl CoreConfig {
    pub fn from_env() -> Self {
        Self {
            llm: LlmConfig::from_env(),
            executor: ExecutorConfig::from_env(),
            memory: MemoryConfig::from_env(),
            pool: PoolConfig::from_env(),
        }
    }
}
