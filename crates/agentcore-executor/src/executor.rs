//! Plan Executor (§4.1): realizes a plan end-to-end, isolates resources per
//! depth, propagates interruption, records lifecycle.
//!
//! Grounded on the teacher's append-only jsonl plan store (`plan.rs`, now
//! `InMemoryPlanStore` in the root `agentcore` facade) for the "plans are
//! append-only, never mutated in place" idea, generalized here to the
//! in-process `Plan`/`Step` state machine the spec's algorithm describes —
//! file-backed template persistence itself is explicitly out of scope (§1).

use std::collections::HashMap;
use std::sync::Arc;

use agentcore_agent::DynamicAgent;
use agentcore_core::interruption::InterruptionRegistry;
use agentcore_core::model::{
    ConversationMemory, ExecutionContext, Plan, PlanExecutionResult, PlanOutcome, Step, StepStatus,
};
use agentcore_core::recorder::{Recorder, RecorderEvent};
use agentcore_core::traits::DirectoryManager;

/// The set of agent variants an executor can route a step to, keyed by the
/// uppercased `[TAG]` parsed from the step requirement. `Step::DEFAULT_AGENT_TAG`
/// is used when the requirement carries no tag.
pub struct AgentRegistry {
    agents: HashMap<String, Arc<DynamicAgent>>,
}

impl AgentRegistry {
    pub fn new(agents: HashMap<String, Arc<DynamicAgent>>) -> Self {
        Self { agents }
    }

    pub fn resolve(&self, tag: Option<&str>) -> Option<Arc<DynamicAgent>> {
        let key = tag.unwrap_or(Step::DEFAULT_AGENT_TAG);
        self.agents.get(key).or_else(|| self.agents.get(Step::DEFAULT_AGENT_TAG)).cloned()
    }
}

pub struct PlanExecutor {
    pub agents: AgentRegistry,
    pub interruption: Arc<InterruptionRegistry>,
    pub directory_manager: Arc<dyn DirectoryManager>,
    pub recorder: Arc<dyn Recorder>,
}

impl PlanExecutor {
    pub fn new(
        agents: AgentRegistry,
        interruption: Arc<InterruptionRegistry>,
        directory_manager: Arc<dyn DirectoryManager>,
        recorder: Arc<dyn Recorder>,
    ) -> Self {
        Self { agents, interruption, directory_manager, recorder }
    }

    /// `executeAllAsync(ctx) -> future<PlanExecutionResult>` (§4.1). Never
    /// returns `Err` — every failure is materialized inside the result.
    /// `upload_key` is the external-folder correlation key (§2
    /// `ExecutionContext`); `None` when the plan has no uploaded files to
    /// sync.
    pub async fn execute_all_async(
        &self,
        plan: &mut Plan,
        conversation: &mut ConversationMemory,
        upload_key: Option<&str>,
    ) -> PlanExecutionResult {
        let (result, last_agent) = self.run_steps(plan, conversation, upload_key).await;
        self.cleanup(plan, last_agent.as_deref()).await;
        result
    }

    async fn run_steps(
        &self,
        plan: &mut Plan,
        conversation: &mut ConversationMemory,
        upload_key: Option<&str>,
    ) -> (PlanExecutionResult, Option<Arc<DynamicAgent>>) {
        let mut last_agent: Option<Arc<DynamicAgent>> = None;

        if plan.is_top_level() {
            if let Some(upload_key) = upload_key {
                if let Err(e) = self
                    .directory_manager
                    .ensure_external_folder_link(&plan.plan_id, upload_key)
                    .await
                {
                    tracing::warn!("failed to materialize external folder link: {e}");
                }
            }
        }
        self.recorder.record(RecorderEvent::PlanStart { plan_id: plan.plan_id.clone(), title: plan.title.clone() });

        let mut step_outcomes = Vec::with_capacity(plan.steps.len());

        for step_index in 0..plan.steps.len() {
            if !self.interruption.check_and_continue(&plan.root_plan_id) {
                plan.steps[step_index].status = StepStatus::Interrupted;
                step_outcomes.push((plan.steps[step_index].step_id.clone(), StepStatus::Interrupted));
                self.recorder.record(RecorderEvent::Complete { plan_id: plan.plan_id.clone(), success: false });
                return (
                    PlanExecutionResult {
                        outcome: PlanOutcome::Interrupted,
                        final_result: None,
                        error: None,
                        step_outcomes,
                    },
                    last_agent,
                );
            }

            let (step_id, tag) = {
                let step = &plan.steps[step_index];
                (step.step_id.clone(), step.agent_tag.clone())
            };
            self.recorder.record(RecorderEvent::StepStart {
                plan_id: plan.plan_id.clone(),
                step_id: step_id.clone(),
                step_index,
            });

            plan.steps[step_index].status = StepStatus::InProgress;

            let agent = self.agents.resolve(tag.as_deref());
            let outcome = match agent {
                None => StepOutcome {
                    status: StepStatus::Failed,
                    result: None,
                    error_message: Some(format!("no executor agent registered for tag {tag:?}")),
                },
                Some(agent) => {
                    last_agent = Some(agent.clone());
                    let mut ctx = ExecutionContext::for_plan(plan, conversation.conversation_id.clone());
                    ctx.upload_key = upload_key.map(str::to_string);
                    self.run_step_agent(agent, &ctx, conversation).await
                }
            };

            let step = &mut plan.steps[step_index];
            step.status = outcome.status;
            step.result = outcome.result.clone();
            step.error_message = outcome.error_message.clone();

            self.recorder.record(RecorderEvent::StepEnd {
                plan_id: plan.plan_id.clone(),
                step_id: step_id.clone(),
                status: step.status,
            });
            step_outcomes.push((step_id, step.status));

            let interrupted_marker = outcome
                .result
                .as_deref()
                .map(|r| r.starts_with(agentcore_agent::INTERRUPTED_MARKER))
                .unwrap_or(false);

            if step.status == StepStatus::Failed || interrupted_marker {
                let plan_outcome = if interrupted_marker { PlanOutcome::Interrupted } else { PlanOutcome::Failed };
                self.recorder.record(RecorderEvent::Complete { plan_id: plan.plan_id.clone(), success: false });
                return (
                    PlanExecutionResult {
                        outcome: plan_outcome,
                        final_result: None,
                        error: step.error_message.clone(),
                        step_outcomes,
                    },
                    last_agent,
                );
            }
        }

        let final_result = plan.steps.last().and_then(|s| s.result.clone());
        self.recorder.record(RecorderEvent::Complete { plan_id: plan.plan_id.clone(), success: true });
        (
            PlanExecutionResult { outcome: PlanOutcome::Completed, final_result, error: None, step_outcomes },
            last_agent,
        )
    }

    async fn run_step_agent(
        &self,
        agent: Arc<DynamicAgent>,
        ctx: &ExecutionContext,
        conversation: &mut ConversationMemory,
    ) -> StepOutcome {
        match agent.run(ctx, conversation).await {
            Ok(run_result) => {
                if let Some(error_message) = run_result.error_message {
                    StepOutcome { status: StepStatus::Failed, result: None, error_message: Some(error_message) }
                } else if run_result.final_text.starts_with(agentcore_agent::INTERRUPTED_MARKER) {
                    StepOutcome {
                        status: StepStatus::Interrupted,
                        result: Some(run_result.final_text),
                        error_message: None,
                    }
                } else {
                    StepOutcome {
                        status: StepStatus::Completed,
                        result: Some(run_result.final_text),
                        error_message: None,
                    }
                }
            }
            Err(e) => StepOutcome { status: StepStatus::Failed, result: None, error_message: Some(e.to_string()) },
        }
    }

    /// Cleanup runs on every terminal transition (§4.1 step 4). Errors are
    /// logged, never propagated. `last_agent` is the agent that handled the
    /// last resolved step, whose tools get their plan-scoped resources
    /// released.
    async fn cleanup(&self, plan: &Plan, last_agent: Option<&DynamicAgent>) {
        if plan.is_top_level() {
            if let Err(e) = self.directory_manager.remove_external_folder_link(&plan.plan_id).await {
                tracing::warn!("cleanup: failed to remove external folder link: {e}");
            }
        }
        if let Some(agent) = last_agent {
            agent.cleanup(&plan.plan_id);
        }
        self.interruption.clear(&plan.root_plan_id);
    }
}

struct StepOutcome {
    status: StepStatus,
    result: Option<String>,
    error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentcore_core::config::{ExecutorConfig, MemoryConfig};
    use agentcore_core::interruption::FormInputSlots;
    use agentcore_core::model::{Message, Step};
    use agentcore_core::pool::LevelPools;
    use agentcore_core::traits::{ChatClient, StreamChunk, ToolCapability, ToolContext, ToolDeclaration, ToolRegistry};
    use async_trait::async_trait;
    use serde_json::Value;

    struct NoopDirManager;
    #[async_trait]
    impl DirectoryManager for NoopDirManager {
        fn root_plan_dir(&self, plan_id: &str) -> std::path::PathBuf {
            std::path::PathBuf::from(plan_id)
        }
        async fn ensure_external_folder_link(&self, _plan_id: &str, _upload_key: &str) -> Result<(), agentcore_core::error::AgentCoreError> {
            Ok(())
        }
        async fn remove_external_folder_link(&self, _plan_id: &str) -> Result<(), agentcore_core::error::AgentCoreError> {
            Ok(())
        }
    }

    struct TerminateTool;
    #[async_trait]
    impl ToolContext for TerminateTool {
        fn capability(&self) -> ToolCapability {
            ToolCapability::Terminate
        }
        fn json_schema(&self) -> &Value {
            static SCHEMA: once_schema::Lazy = once_schema::Lazy::new();
            SCHEMA.get()
        }
        async fn apply(&self, _arguments: Value, _ctx: &agentcore_core::traits::ExecutionMeta) -> agentcore_core::traits::ToolApplyResult {
            agentcore_core::traits::ToolApplyResult { output: "done".to_string(), is_error: false, can_terminate: true }
        }
    }

    mod once_schema {
        use serde_json::Value;
        pub struct Lazy(std::sync::OnceLock<Value>);
        impl Lazy {
            pub const fn new() -> Self {
                Self(std::sync::OnceLock::new())
            }
            pub fn get(&self) -> &Value {
                self.0.get_or_init(|| serde_json::json!({}))
            }
        }
    }

    struct TerminateRegistry;
    impl ToolRegistry for TerminateRegistry {
        fn all_tools(&self) -> Vec<(String, Arc<dyn ToolContext>)> {
            vec![("terminate".to_string(), Arc::new(TerminateTool))]
        }
    }

    struct ImmediateTerminateClient;
    #[async_trait]
    impl ChatClient for ImmediateTerminateClient {
        async fn stream_chat(
            &self,
            _model: &str,
            _messages: &[Message],
            _tools: &[ToolDeclaration],
            _temperature: Option<f64>,
            on_chunk: &mut (dyn FnMut(StreamChunk) + Send),
        ) -> Result<(), agentcore_core::error::AgentCoreError> {
            on_chunk(StreamChunk::ToolCallDelta {
                index: 0,
                id: Some("c1".into()),
                name: Some("terminate".into()),
                arguments_delta: "{}".into(),
            });
            Ok(())
        }
    }

    fn build_agent() -> Arc<DynamicAgent> {
        Arc::new(DynamicAgent {
            chat_client: Arc::new(ImmediateTerminateClient),
            tool_registry: Arc::new(TerminateRegistry),
            pools: Arc::new(LevelPools::new(&agentcore_core::config::PoolConfig {
                default_capacity: 4,
                capacity_by_depth: Default::default(),
            })),
            interruption: Arc::new(InterruptionRegistry::new()),
            form_slots: Arc::new(FormInputSlots::new()),
            executor_config: ExecutorConfig {
                max_steps: 5,
                parallel_tool_calls: true,
                debug_detail: false,
                user_input_timeout_secs: 5,
                form_poll_ms: 10,
                interrupt_recheck_ms: 50,
                llm_max_retries: 3,
                retry_base_ms: 1,
                retry_cap_ms: 2,
                early_termination_threshold: 3,
                workspace: ".".to_string(),
            },
            memory_config: MemoryConfig {
                max_chars: 30_000,
                retention_ratio: 0.4,
                summary_min_chars: 3_000,
                summary_max_chars: 4_000,
                repeated_result_threshold: 3,
                enable_conversation_memory: false,
                max_memory_messages: 200,
            },
            model: "test-model".to_string(),
        })
    }

    #[tokio::test]
    async fn plan_completes_when_agent_terminates() {
        let interruption = Arc::new(InterruptionRegistry::new());
        let mut agents = HashMap::new();
        agents.insert(Step::DEFAULT_AGENT_TAG.to_string(), build_agent());
        let executor = PlanExecutor::new(
            AgentRegistry::new(agents),
            interruption,
            Arc::new(NoopDirManager),
            Arc::new(agentcore_core::recorder::VecRecorder::new()),
        );

        let mut plan = Plan::top_level("demo", vec![Step::new(0, "do the thing")]);
        let mut conversation = ConversationMemory::new("c1");
        let result = executor.execute_all_async(&mut plan, &mut conversation, None).await;

        assert_eq!(result.outcome, PlanOutcome::Completed);
        assert_eq!(plan.steps[0].status, StepStatus::Completed);
    }

    #[tokio::test]
    async fn interruption_before_any_step_marks_plan_interrupted() {
        let interruption = Arc::new(InterruptionRegistry::new());
        let mut agents = HashMap::new();
        agents.insert(Step::DEFAULT_AGENT_TAG.to_string(), build_agent());
        let mut plan = Plan::top_level("demo", vec![Step::new(0, "do the thing")]);
        interruption.interrupt(&plan.root_plan_id);
        let executor = PlanExecutor::new(
            AgentRegistry::new(agents),
            interruption,
            Arc::new(NoopDirManager),
            Arc::new(agentcore_core::recorder::VecRecorder::new()),
        );
        let mut conversation = ConversationMemory::new("c1");
        let result = executor.execute_all_async(&mut plan, &mut conversation, None).await;
        assert_eq!(result.outcome, PlanOutcome::Interrupted);
    }

    #[tokio::test]
    async fn missing_agent_for_tag_fails_the_step() {
        let executor = PlanExecutor::new(
            AgentRegistry::new(HashMap::new()),
            Arc::new(InterruptionRegistry::new()),
            Arc::new(NoopDirManager),
            Arc::new(agentcore_core::recorder::VecRecorder::new()),
        );
        let mut plan = Plan::top_level("demo", vec![Step::new(0, "[missing] do it")]);
        let mut conversation = ConversationMemory::new("c1");
        let result = executor.execute_all_async(&mut plan, &mut conversation, None).await;
        assert_eq!(result.outcome, PlanOutcome::Failed);
        assert_eq!(plan.steps[0].status, StepStatus::Failed);
    }
}
