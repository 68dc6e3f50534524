//! Concurrent tool execution with the happens-before ordering contract
//! (§4.3 "Ordering contract", §4.2.2 "Multi-tool path").
//!
//! Grounded on the `FuturesUnordered`-based concurrent-execution pattern
//! found in the broader corpus (`agent_executor.rs`:
//! `tool_calls.into_iter().map(|call| async move { .. }).collect::<FuturesUnordered<_>>()`),
//! adapted to the spec's two-phase (non-terminators, then terminators)
//! ordering: non-terminators all run concurrently and their completion is
//! the happens-before point for any terminator; terminators then run
//! (concurrently among themselves); results are sorted back to the
//! original request index.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};

use agentcore_core::model::{ToolResultEnvelope, ToolStatus};
use agentcore_core::pool::LevelPools;
use agentcore_core::traits::{ExecutionMeta, ToolCapability, ToolContext};
use serde_json::Value;

/// One request ready for dispatch: its original index, the resolved tool,
/// and its converted arguments.
pub struct DispatchRequest {
    pub index: usize,
    pub tool_call_id: String,
    pub tool: Arc<dyn ToolContext>,
    pub arguments: Value,
}

/// Runs one request to completion, submitting synchronous tools to the
/// depth-appropriate pool (§4.3 "Execution") so recursion cannot starve a
/// single pool, and invoking async-capable tools directly.
async fn run_one(req: DispatchRequest, depth: u32, pools: &LevelPools) -> ToolResultEnvelope {
    let meta = ExecutionMeta {
        tool_call_id: req.tool_call_id.clone(),
        depth,
        root_plan_id: String::new(),
    };

    let result = if req.tool.is_async() {
        req.tool.apply(req.arguments, &meta).await
    } else {
        let _permit = pools.acquire(depth).await;
        req.tool.apply(req.arguments, &meta).await
    };

    if result.is_error {
        ToolResultEnvelope::error(req.index, req.tool_call_id, result.output)
    } else {
        ToolResultEnvelope::success(req.index, req.tool_call_id, result.output)
    }
}

/// Run a batch of independent tool requests concurrently, honoring the
/// happens-before rule between non-terminators and terminators, and return
/// results sorted by original request index.
///
/// Precondition (enforced by the caller, per §4.2.2 step 1): no request in
/// `requests` resolves to a `ToolCapability::FormInput` tool — those are
/// routed through the single-tool form-input rendezvous instead of batched.
pub async fn execute_batch(
    requests: Vec<DispatchRequest>,
    depth: u32,
    pools: &LevelPools,
) -> Vec<ToolResultEnvelope> {
    let (terminators, others): (Vec<_>, Vec<_>) = requests
        .into_iter()
        .partition(|r| r.tool.capability() == ToolCapability::Terminate);

    let mut results = Vec::with_capacity(terminators.len() + others.len());

    if !others.is_empty() {
        let mut pending: FuturesUnordered<_> =
            others.into_iter().map(|r| run_one(r, depth, pools)).collect();
        while let Some(envelope) = pending.next().await {
            results.push(envelope);
        }
    }

    if !terminators.is_empty() {
        let mut pending: FuturesUnordered<_> =
            terminators.into_iter().map(|r| run_one(r, depth, pools)).collect();
        while let Some(envelope) = pending.next().await {
            results.push(envelope);
        }
    }

    results.sort_by_key(|r| r.index);
    results
}

/// Run a single tool call (§4.2.2 single-tool path). Never returns an
/// exception; failures are materialized as an `ERROR` envelope.
pub async fn execute_one(req: DispatchRequest, depth: u32, pools: &LevelPools) -> ToolResultEnvelope {
    run_one(req, depth, pools).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentcore_core::config::PoolConfig;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    struct SleepTool {
        millis: u64,
        capability: ToolCapability,
        start_order: Arc<std::sync::Mutex<Vec<String>>>,
        name: String,
    }

    #[async_trait]
    impl ToolContext for SleepTool {
        fn capability(&self) -> ToolCapability {
            self.capability
        }
        fn json_schema(&self) -> &Value {
            static NULL: Value = Value::Null;
            &NULL
        }
        async fn apply(
            &self,
            _arguments: Value,
            _ctx: &ExecutionMeta,
        ) -> agentcore_core::traits::ToolApplyResult {
            self.start_order.lock().unwrap().push(format!("start:{}", self.name));
            tokio::time::sleep(Duration::from_millis(self.millis)).await;
            self.start_order.lock().unwrap().push(format!("end:{}", self.name));
            agentcore_core::traits::ToolApplyResult {
                output: self.name.clone(),
                is_error: false,
                can_terminate: false,
            }
        }
    }

    fn pools() -> LevelPools {
        LevelPools::new(&PoolConfig {
            default_capacity: 8,
            capacity_by_depth: Default::default(),
        })
    }

    #[tokio::test]
    async fn terminator_starts_after_non_terminators_complete() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let a = Arc::new(SleepTool {
            millis: 200,
            capability: ToolCapability::Plain,
            start_order: order.clone(),
            name: "a".to_string(),
        });
        let b = Arc::new(SleepTool {
            millis: 50,
            capability: ToolCapability::Plain,
            start_order: order.clone(),
            name: "b".to_string(),
        });
        let term = Arc::new(SleepTool {
            millis: 10,
            capability: ToolCapability::Terminate,
            start_order: order.clone(),
            name: "terminate".to_string(),
        });

        let requests = vec![
            DispatchRequest { index: 0, tool_call_id: "0".into(), tool: a, arguments: Value::Null },
            DispatchRequest { index: 1, tool_call_id: "1".into(), tool: b, arguments: Value::Null },
            DispatchRequest { index: 2, tool_call_id: "2".into(), tool: term, arguments: Value::Null },
        ];
        let results = execute_batch(requests, 0, &pools()).await;
        assert_eq!(results.iter().map(|r| r.index).collect::<Vec<_>>(), vec![0, 1, 2]);

        let log = order.lock().unwrap().clone();
        let term_start = log.iter().position(|e| e == "start:terminate").unwrap();
        let a_end = log.iter().position(|e| e == "end:a").unwrap();
        let b_end = log.iter().position(|e| e == "end:b").unwrap();
        assert!(term_start > a_end && term_start > b_end);
    }

    #[tokio::test]
    async fn results_preserve_original_index_after_sort() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let slow = Arc::new(SleepTool {
            millis: 50,
            capability: ToolCapability::Plain,
            start_order: order.clone(),
            name: "slow".to_string(),
        });
        let fast = Arc::new(SleepTool {
            millis: 1,
            capability: ToolCapability::Plain,
            start_order: order.clone(),
            name: "fast".to_string(),
        });
        let requests = vec![
            DispatchRequest { index: 0, tool_call_id: "0".into(), tool: slow, arguments: Value::Null },
            DispatchRequest { index: 1, tool_call_id: "1".into(), tool: fast, arguments: Value::Null },
        ];
        let results = execute_batch(requests, 0, &pools()).await;
        for (i, r) in results.iter().enumerate() {
            assert_eq!(r.index, i);
        }
    }

    #[tokio::test]
    async fn tool_error_becomes_error_envelope() {
        struct Failing;
        #[async_trait]
        impl ToolContext for Failing {
            fn capability(&self) -> ToolCapability {
                ToolCapability::Plain
            }
            fn json_schema(&self) -> &Value {
                static NULL: Value = Value::Null;
                &NULL
            }
            async fn apply(
                &self,
                _arguments: Value,
                _ctx: &ExecutionMeta,
            ) -> agentcore_core::traits::ToolApplyResult {
                agentcore_core::traits::ToolApplyResult {
                    output: "boom".to_string(),
                    is_error: true,
                    can_terminate: false,
                }
            }
        }
        let requests = vec![DispatchRequest {
            index: 0,
            tool_call_id: "0".into(),
            tool: Arc::new(Failing),
            arguments: Value::Null,
        }];
        let results = execute_batch(requests, 0, &pools()).await;
        assert_eq!(results[0].status, ToolStatus::Error);
        let _ = AtomicU64::new(0); // silence unused import in some feature combos
    }
}
