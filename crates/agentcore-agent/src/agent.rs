//! The Agent itself: the per-step think/act loop (§4.2), including the
//! final-summary path taken when `currentStep == maxSteps` without
//! termination.

use std::sync::Arc;

use agentcore_core::config::{ExecutorConfig, MemoryConfig};
use agentcore_core::error::AgentCoreError;
use agentcore_core::interruption::{FormInputSlots, InterruptionRegistry};
use agentcore_core::model::{AgentMemory, ConversationMemory, ExecutionContext};
use agentcore_core::pool::LevelPools;
use agentcore_core::traits::{ChatClient, ToolCapability, ToolContext, ToolDeclaration, ToolRegistry};

use crate::act::{act, ActOutcome};
use crate::think::{environment_snapshot, think, ThinkInputs};

/// Canonical interruption marker text (§4.1 step 2e), so the Plan Executor
/// can detect an interrupted agent result by prefix without a separate
/// status channel.
pub const INTERRUPTED_MARKER: &str = "Execution interrupted by user";

/// What `Agent::run` returns for one Plan Step.
#[derive(Debug, Clone)]
pub struct AgentRunResult {
    pub final_text: String,
    pub terminated: bool,
    pub error_message: Option<String>,
}

/// The default ReAct agent: wires together Think, Act, and the tool
/// registry snapshot behind the dependencies the Plan Executor supplies per
/// run. Grounded on the teacher's agent-loop orchestration shape (one LLM
/// call, then one tool-execution phase, repeated until termination), with
/// the task-planning/skill-progressive-disclosure specifics removed since
/// they have no counterpart here.
pub struct DynamicAgent {
    pub chat_client: Arc<dyn ChatClient>,
    pub tool_registry: Arc<dyn ToolRegistry>,
    pub pools: Arc<LevelPools>,
    pub interruption: Arc<InterruptionRegistry>,
    pub form_slots: Arc<FormInputSlots>,
    pub executor_config: ExecutorConfig,
    pub memory_config: MemoryConfig,
    pub model: String,
}

impl DynamicAgent {
    fn tool_declarations(&self) -> Vec<ToolDeclaration> {
        self.tool_registry
            .all_tools()
            .into_iter()
            .map(|(key, tool)| {
                let schema = tool.json_schema().clone();
                let description = schema
                    .get("description")
                    .and_then(|v| v.as_str())
                    .unwrap_or(&key)
                    .to_string();
                ToolDeclaration { name: key, description, parameters: schema }
            })
            .collect()
    }

    fn environment_message(&self) -> String {
        let states: Vec<(String, String)> = self
            .tool_registry
            .all_tools()
            .into_iter()
            .map(|(key, tool)| (key, tool.current_state_string()))
            .collect();
        environment_snapshot(&states)
    }

    fn index_table(&self) -> agentcore_dispatch::ToolIndex {
        agentcore_dispatch::ToolIndex::new(self.tool_registry.all_tools())
    }

    /// Run the think/act loop for one Plan Step. `conversation` is the
    /// cross-plan dialog the Plan Executor owns; this call both reads it
    /// (for prompt assembly) and is allowed to append to it.
    pub async fn run(
        &self,
        ctx: &ExecutionContext,
        conversation: &mut ConversationMemory,
    ) -> Result<AgentRunResult, AgentCoreError> {
        let mut agent_memory = AgentMemory::default();
        let index_table = self.index_table();
        let tools = self.tool_declarations();
        let mut next_directive: Option<String> = None;

        for _current_step in 1..=self.executor_config.max_steps {
            if !self.interruption.check_and_continue(&ctx.root_plan_id) {
                return Ok(AgentRunResult {
                    final_text: INTERRUPTED_MARKER.to_string(),
                    terminated: false,
                    error_message: None,
                });
            }

            maybe_compress_conversation(
                conversation,
                &mut agent_memory,
                self.chat_client.as_ref(),
                &self.model,
                &self.memory_config,
            )
            .await;

            let env_message = self.environment_message();

            let think_outcome = think(
                self.chat_client.as_ref(),
                &self.executor_config,
                self.interruption.as_ref(),
                ThinkInputs {
                    ctx,
                    conversation,
                    agent_memory: &agent_memory,
                    environment_message: &env_message,
                    tools: &tools,
                    model: &self.model,
                    include_conversation_history: true,
                    extra_directive: next_directive.as_deref(),
                },
            )
            .await?;

            let act_outcome = act(
                &think_outcome.message,
                ctx,
                &index_table,
                self.pools.as_ref(),
                self.interruption.as_ref(),
                self.form_slots.as_ref(),
                &self.executor_config,
                &self.memory_config,
                self.chat_client.as_ref(),
                &self.model,
                &mut agent_memory,
                conversation,
            )
            .await?;

            match act_outcome {
                ActOutcome::InProgress(directive) => {
                    next_directive = directive;
                    continue;
                }
                ActOutcome::Terminate(final_text) => {
                    return Ok(AgentRunResult { final_text, terminated: true, error_message: None })
                }
                ActOutcome::Failed(error_message) => {
                    return Ok(AgentRunResult {
                        final_text: String::new(),
                        terminated: false,
                        error_message: Some(error_message),
                    })
                }
            }
        }

        self.final_summary(ctx, conversation, &mut agent_memory, &tools, &index_table).await
    }

    /// Release every registered tool's plan-scoped resources (§4.1 step 4),
    /// invoked by the Plan Executor for the last agent used in a plan.
    pub fn cleanup(&self, plan_id: &str) {
        for (_, tool) in self.tool_registry.all_tools() {
            tool.cleanup(plan_id);
        }
    }

    /// Final-summary path (§4.2.2): build a summary prompt from existing
    /// memory, make a non-tool LLM call, then invoke the terminator tool
    /// with that summary and mark the step completed.
    async fn final_summary(
        &self,
        ctx: &ExecutionContext,
        conversation: &ConversationMemory,
        agent_memory: &mut AgentMemory,
        tools: &[ToolDeclaration],
        index_table: &agentcore_dispatch::ToolIndex,
    ) -> Result<AgentRunResult, AgentCoreError> {
        let env_message = self.environment_message();

        let think_outcome = think(
            self.chat_client.as_ref(),
            &self.executor_config,
            self.interruption.as_ref(),
            ThinkInputs {
                ctx,
                conversation,
                agent_memory,
                environment_message: &env_message,
                tools,
                model: &self.model,
                include_conversation_history: false,
                extra_directive: Some(
                    "You have reached the step limit. Summarize what you accomplished and call the terminate tool with your final summary now.",
                ),
            },
        )
        .await?;

        let terminate_call = think_outcome
            .message
            .tool_calls
            .as_ref()
            .and_then(|calls| calls.iter().find(|c| is_terminate_call(index_table, &c.name)));

        match terminate_call {
            Some(call) => {
                let (envelope, _tool) = agentcore_dispatch::dispatch_single(call, index_table, ctx.depth, &self.pools).await;
                let final_text = crate::act::post_process_result(&envelope);
                Ok(AgentRunResult { final_text, terminated: true, error_message: None })
            }
            None => {
                let final_text = think_outcome.message.content.unwrap_or_default();
                Ok(AgentRunResult { final_text, terminated: true, error_message: None })
            }
        }
    }
}

fn is_terminate_call(index_table: &agentcore_dispatch::ToolIndex, name: &str) -> bool {
    index_table
        .resolve_key(name)
        .and_then(|key| index_table.get(&key))
        .map(|tool| tool.capability() == ToolCapability::Terminate)
        .unwrap_or(false)
}

async fn maybe_compress_conversation(
    conversation: &mut ConversationMemory,
    agent_memory: &mut AgentMemory,
    chat_client: &dyn ChatClient,
    model: &str,
    memory_config: &MemoryConfig,
) {
    if !memory_config.enable_conversation_memory {
        return;
    }
    *conversation =
        agentcore_memory::compress_conversation_memory(conversation, agent_memory, chat_client, model, memory_config)
            .await;
}
