//! Interruption + Form-Input Service (§4.7, ambient): cooperative
//! cancellation per `rootPlanId`, plus the exclusive form-input slot store
//! used by the form-input rendezvous (§4.2.4).
//!
//! Grounded on the teacher's plain-`Mutex`-guarded-map convention (e.g.
//! `AUDIT_PATH: Mutex<Option<String>>` in `observability.rs`): we use
//! `std::sync::Mutex<HashMap<RootPlanId, Arc<AtomicBool>>>` rather than an
//! external concurrent-map crate, matching that idiom.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::model::PlanId;
use crate::traits::InterruptionHelper;

/// Per-`rootPlanId` cooperative cancellation flags.
#[derive(Default)]
pub struct InterruptionRegistry {
    flags: Mutex<HashMap<PlanId, Arc<AtomicBool>>>,
}

impl InterruptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn flag_for(&self, root_plan_id: &str) -> Arc<AtomicBool> {
        let mut guard = self.flags.lock().expect("interruption registry mutex poisoned");
        guard
            .entry(root_plan_id.to_string())
            .or_insert_with(|| Arc::new(AtomicBool::new(false)))
            .clone()
    }

    /// Set the interruption flag for a root plan. Observed by every
    /// `check_and_continue` call for that plan from this point on.
    pub fn interrupt(&self, root_plan_id: &str) {
        self.flag_for(root_plan_id).store(true, Ordering::SeqCst);
    }

    /// Drop the entry once the plan reaches a terminal state, so the map
    /// does not grow without bound across a long-running process.
    pub fn clear(&self, root_plan_id: &str) {
        self.flags.lock().expect("interruption registry mutex poisoned").remove(root_plan_id);
    }
}

impl InterruptionHelper for InterruptionRegistry {
    fn check_and_continue(&self, root_plan_id: &str) -> bool {
        !self.flag_for(root_plan_id).load(Ordering::SeqCst)
    }
}

/// State of one outstanding form-input request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormState {
    Pending,
    InputReceived(String),
    InputTimeout,
}

/// Exclusive-lock-by-root-plan form slot store: only one form per root plan
/// at a time; concurrent attempts wait or are rejected on lock timeout.
#[derive(Default)]
pub struct FormInputSlots {
    slots: Mutex<HashMap<PlanId, FormState>>,
}

impl FormInputSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the form slot for `root_plan_id`. Returns `false` if another
    /// form is already outstanding for the same root plan.
    pub fn try_acquire(&self, root_plan_id: &str) -> bool {
        let mut guard = self.slots.lock().expect("form slots mutex poisoned");
        if guard.contains_key(root_plan_id) {
            false
        } else {
            guard.insert(root_plan_id.to_string(), FormState::Pending);
            true
        }
    }

    pub fn submit(&self, root_plan_id: &str, input: String) {
        let mut guard = self.slots.lock().expect("form slots mutex poisoned");
        guard.insert(root_plan_id.to_string(), FormState::InputReceived(input));
    }

    pub fn state(&self, root_plan_id: &str) -> Option<FormState> {
        self.slots.lock().expect("form slots mutex poisoned").get(root_plan_id).cloned()
    }

    pub fn release(&self, root_plan_id: &str) {
        self.slots.lock().expect("form slots mutex poisoned").remove(root_plan_id);
    }

    /// Poll on `form_poll` until `INPUT_RECEIVED`/`INPUT_TIMEOUT`, rechecking
    /// interruption on the longer `interrupt_recheck` interval. Interruption
    /// is treated as a timeout (§4.2.4 step 3).
    pub async fn wait_for_input(
        &self,
        root_plan_id: &str,
        interruption: &InterruptionRegistry,
        form_poll: Duration,
        interrupt_recheck: Duration,
        timeout: Duration,
    ) -> FormState {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut since_last_interrupt_check = Duration::ZERO;
        loop {
            if let Some(FormState::InputReceived(v)) = self.state(root_plan_id) {
                return FormState::InputReceived(v);
            }
            if tokio::time::Instant::now() >= deadline {
                let mut guard = self.slots.lock().expect("form slots mutex poisoned");
                guard.insert(root_plan_id.to_string(), FormState::InputTimeout);
                return FormState::InputTimeout;
            }
            if since_last_interrupt_check >= interrupt_recheck
                && !interruption.check_and_continue(root_plan_id)
            {
                let mut guard = self.slots.lock().expect("form slots mutex poisoned");
                guard.insert(root_plan_id.to_string(), FormState::InputTimeout);
                return FormState::InputTimeout;
            }
            tokio::time::sleep(form_poll).await;
            since_last_interrupt_check += form_poll;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interruption_flag_is_observed() {
        let reg = InterruptionRegistry::new();
        assert!(reg.check_and_continue("p1"));
        reg.interrupt("p1");
        assert!(!reg.check_and_continue("p1"));
    }

    #[test]
    fn form_slot_is_exclusive_per_root_plan() {
        let slots = FormInputSlots::new();
        assert!(slots.try_acquire("root1"));
        assert!(!slots.try_acquire("root1"));
        slots.release("root1");
        assert!(slots.try_acquire("root1"));
    }

    #[tokio::test]
    async fn wait_for_input_times_out() {
        let slots = FormInputSlots::new();
        let reg = InterruptionRegistry::new();
        slots.try_acquire("root1");
        let state = slots
            .wait_for_input(
                "root1",
                &reg,
                Duration::from_millis(5),
                Duration::from_millis(20),
                Duration::from_millis(15),
            )
            .await;
        assert_eq!(state, FormState::InputTimeout);
    }

    #[tokio::test]
    async fn wait_for_input_receives_submitted_value() {
        let slots = std::sync::Arc::new(FormInputSlots::new());
        let reg = InterruptionRegistry::new();
        slots.try_acquire("root1");
        let slots2 = slots.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            slots2.submit("root1", "answer".to_string());
        });
        let state = slots
            .wait_for_input(
                "root1",
                &reg,
                Duration::from_millis(5),
                Duration::from_millis(200),
                Duration::from_secs(2),
            )
            .await;
        assert_eq!(state, FormState::InputReceived("answer".to_string()));
    }
}
