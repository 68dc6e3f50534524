//! Command-line surface. Grounded on the teacher's `clap`-derive `Cli`/
//! `Commands` shape (`skilllite/src/cli.rs`), trimmed to the one command
//! this crate's scope calls for: run a plan end-to-end.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "agentcore", version, about = "Agent execution core: plan/step ReAct runner")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a plan: one step per `--step` flag, each optionally `[TAG]`-prefixed.
    Run {
        /// Plan title, for recorder/log output.
        #[arg(long, default_value = "untitled plan")]
        title: String,
        /// One step requirement; repeat for multiple steps.
        #[arg(long = "step", required = true)]
        steps: Vec<String>,
        /// Workspace root the built-in file tools are confined to.
        #[arg(long, env = "AGENTCORE_WORKSPACE", default_value = ".")]
        workspace: String,
    },
}
