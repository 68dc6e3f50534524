//! The `Recorder` external interface (§6): `recordPlanStart`,
//! `recordStepStart/End`, `recordThinkingAndAction`, `recordActionResult`,
//! `recordComplete`. Grounded on the teacher's `EventSink` trait shape
//! (`on_turn_start`/`on_text`/`on_tool_call`/...), generalized from a
//! single-agent CLI sink to plan-scoped lifecycle events.

use std::sync::Mutex;

use crate::model::{PlanId, StepStatus};

/// One recorded lifecycle event. `TracingRecorder` logs these via `tracing`;
/// `VecRecorder` collects them for test assertions.
#[derive(Debug, Clone)]
pub enum RecorderEvent {
    PlanStart { plan_id: PlanId, title: String },
    StepStart { plan_id: PlanId, step_id: String, step_index: usize },
    StepEnd { plan_id: PlanId, step_id: String, status: StepStatus },
    ThinkingAndAction { plan_id: PlanId, step_id: String, think_act_id: String, text: String, tool_count: usize },
    ActionResult { plan_id: PlanId, step_id: String, tool_call_id: String, is_error: bool },
    Complete { plan_id: PlanId, success: bool },
}

/// Progress/lifecycle sink. Implementors must not block the executor for
/// long; recording is fire-and-forget from the core's perspective.
pub trait Recorder: Send + Sync {
    fn record(&self, event: RecorderEvent);
}

/// Logs every event through `tracing`, matching the teacher's
/// `observability::init_tracing` EnvFilter-driven logging density.
#[derive(Debug, Default)]
pub struct TracingRecorder;

impl Recorder for TracingRecorder {
    fn record(&self, event: RecorderEvent) {
        match event {
            RecorderEvent::PlanStart { plan_id, title } => {
                tracing::info!(plan_id = %plan_id, title = %title, "plan start");
            }
            RecorderEvent::StepStart { plan_id, step_id, step_index } => {
                tracing::info!(plan_id = %plan_id, step_id = %step_id, step_index, "step start");
            }
            RecorderEvent::StepEnd { plan_id, step_id, status } => {
                tracing::info!(plan_id = %plan_id, step_id = %step_id, ?status, "step end");
            }
            RecorderEvent::ThinkingAndAction { plan_id, step_id, think_act_id, text, tool_count } => {
                tracing::debug!(
                    plan_id = %plan_id, step_id = %step_id, think_act_id = %think_act_id,
                    tool_count, text_len = text.len(), "think/act"
                );
            }
            RecorderEvent::ActionResult { plan_id, step_id, tool_call_id, is_error } => {
                if is_error {
                    tracing::warn!(plan_id = %plan_id, step_id = %step_id, tool_call_id = %tool_call_id, "tool error");
                } else {
                    tracing::debug!(plan_id = %plan_id, step_id = %step_id, tool_call_id = %tool_call_id, "tool result");
                }
            }
            RecorderEvent::Complete { plan_id, success } => {
                tracing::info!(plan_id = %plan_id, success, "plan complete");
            }
        }
    }
}

/// In-memory recorder for tests: collects every event in order.
#[derive(Default)]
pub struct VecRecorder {
    events: Mutex<Vec<RecorderEvent>>,
}

impl VecRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecorderEvent> {
        self.events.lock().expect("VecRecorder mutex poisoned").clone()
    }
}

impl Recorder for VecRecorder {
    fn record(&self, event: RecorderEvent) {
        self.events.lock().expect("VecRecorder mutex poisoned").push(event);
    }
}

