pub mod config;
pub mod error;
pub mod interruption;
pub mod model;
pub mod observability;
pub mod pool;
pub mod recorder;
pub mod traits;

pub use error::AgentCoreError;
pub use model::*;
