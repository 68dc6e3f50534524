//! Centralized configuration layer.
//!
//! All environment-variable reads are funneled through this module; business
//! code reaches for `CoreConfig`/`LlmConfig`/etc., never a bare `std::env::var`.
//!
//! - `loader`: `env_or`/`env_optional`/`env_bool` helpers shared by every schema type.
//! - `schema`: `LlmConfig`, `ExecutorConfig`, `MemoryConfig`, `PoolConfig`, `ObservabilityConfig`, `CoreConfig`.
//! - `env_keys`: key name constants (with OpenAI-compatible aliases for the LLM section).

pub mod env_keys;
pub mod loader;
pub mod schema;

pub use loader::{env_bool, env_optional, env_or, load_dotenv, set_env_var, ScopedEnvGuard};
pub use schema::{
    CoreConfig, ExecutorConfig, LlmConfig, MemoryConfig, ObservabilityConfig, PoolConfig,
};
