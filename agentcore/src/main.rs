use std::collections::HashMap;
use std::sync::Arc;

use agentcore::adapters::{HttpChatClient, LocalDirectoryManager};
use agentcore::cli::{Cli, Commands};
use agentcore::tools::BuiltinToolRegistry;

use agentcore_agent::DynamicAgent;
use agentcore_core::config::CoreConfig;
use agentcore_core::interruption::{FormInputSlots, InterruptionRegistry};
use agentcore_core::model::{ConversationMemory, Plan, Step};
use agentcore_core::pool::LevelPools;
use agentcore_core::recorder::TracingRecorder;
use agentcore_core::traits::ModelRegistry;
use agentcore_executor::{AgentRegistry, PlanExecutor};
use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    agentcore_core::observability::init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { title, steps, workspace } => run_plan(title, steps, workspace).await,
    }
}

async fn run_plan(title: String, step_requirements: Vec<String>, workspace: String) -> Result<()> {
    let core_config = CoreConfig::from_env();
    let model_registry = agentcore::adapters::EnvModelRegistry::from_env();
    let model_config = model_registry.find_default().await?;

    let chat_client: Arc<dyn agentcore_core::traits::ChatClient> =
        Arc::new(HttpChatClient::new(model_config.api_base.clone(), model_config.api_key.clone()));
    let tool_registry = Arc::new(BuiltinToolRegistry::new(&workspace));
    let pools = Arc::new(LevelPools::new(&core_config.pool));
    let interruption = Arc::new(InterruptionRegistry::new());
    let form_slots = Arc::new(FormInputSlots::new());

    let agent = Arc::new(DynamicAgent {
        chat_client,
        tool_registry,
        pools,
        interruption: interruption.clone(),
        form_slots,
        executor_config: core_config.executor.clone(),
        memory_config: core_config.memory.clone(),
        model: model_config.name,
    });

    let mut agents = HashMap::new();
    agents.insert(Step::DEFAULT_AGENT_TAG.to_string(), agent);

    let plans_root = std::path::PathBuf::from(&workspace).join(".agentcore/plans");
    let uploads_root = std::path::PathBuf::from(&workspace).join(".agentcore/uploads");
    let directory_manager = Arc::new(LocalDirectoryManager::new(plans_root, uploads_root));

    let executor = PlanExecutor::new(
        AgentRegistry::new(agents),
        interruption,
        directory_manager,
        Arc::new(TracingRecorder),
    );

    let steps: Vec<Step> = step_requirements
        .into_iter()
        .enumerate()
        .map(|(i, req)| Step::new(i, req))
        .collect();
    let mut plan = Plan::top_level(title, steps);
    let mut conversation = ConversationMemory::new(uuid::Uuid::new_v4().to_string());

    let result = executor.execute_all_async(&mut plan, &mut conversation, None).await;

    println!("{}", serde_json::json!({
        "outcome": format!("{:?}", result.outcome),
        "final_result": result.final_result,
        "error": result.error,
        "steps": result.step_outcomes.iter().map(|(id, status)| {
            serde_json::json!({ "step_id": id, "status": format!("{:?}", status) })
        }).collect::<Vec<_>>(),
    }));

    Ok(())
}
