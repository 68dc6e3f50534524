//! Adapter layer and CLI wiring for the agent execution core. The core
//! crates (`agentcore-core`, `-dispatch`, `-memory`, `-agent`, `-executor`)
//! are runtime-agnostic; this crate supplies the concrete implementations of
//! their external interfaces (§6) and a command-line entry point.

pub mod adapters;
pub mod cli;
pub mod tools;
