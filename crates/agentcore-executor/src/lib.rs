//! Plan Executor (§4.1): wires an `AgentRegistry`, the interruption
//! service, a `DirectoryManager`, and a `Recorder` into the plan-level
//! init/step-loop/terminal/cleanup state machine.

pub mod executor;

pub use executor::{AgentRegistry, PlanExecutor};
