//! ReAct Agent Loop (§4.2): think/act iteration, the streaming handler
//! (§4.6), and the form-input rendezvous (§4.2.4, ambient).

pub mod act;
pub mod agent;
pub mod stream;
pub mod think;

pub use agent::{AgentRunResult, DynamicAgent, INTERRUPTED_MARKER};
