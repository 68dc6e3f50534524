//! Tool Dispatch & Parallel Execution (§4.3): resolve the qualified tool
//! key an LLM emitted, convert its raw arguments into an ordered JSON value,
//! and run the resulting calls with the two-phase happens-before ordering
//! contract between non-terminators and terminators.

pub mod convert;
pub mod exec;
pub mod resolve;

use std::sync::Arc;

use agentcore_core::model::{ToolCall, ToolResultEnvelope};
use agentcore_core::pool::LevelPools;
use agentcore_core::traits::ToolContext;

pub use exec::{execute_batch, execute_one, DispatchRequest};
pub use resolve::ToolIndex;

/// Resolve + convert one tool call against `index`. Returns an `ERROR`
/// envelope (never an `Err`) for an unresolvable key, so a caller can fold
/// lookup failures into the same result stream as execution failures —
/// matching §4.3's "a miss is a structured result, never an exception."
pub fn prepare_request(
    index: usize,
    call: &ToolCall,
    index_table: &ToolIndex,
) -> Result<DispatchRequest, ToolResultEnvelope> {
    let resolved_key = index_table.resolve_key(&call.name).ok_or_else(|| {
        ToolResultEnvelope::error(
            index,
            call.id.clone(),
            format!("tool not found: {}", call.name),
        )
    })?;
    let tool = index_table.get(&resolved_key).expect("resolve_key returned a live key");

    let mut arguments = convert::parse_arguments(&resolved_key, &call.arguments).map_err(|e| {
        ToolResultEnvelope::error(index, call.id.clone(), e.to_string())
    })?;
    convert::fill_missing_required(&mut arguments, tool.json_schema());

    Ok(DispatchRequest {
        index,
        tool_call_id: call.id.clone(),
        tool,
        arguments,
    })
}

/// Resolve, convert, and dispatch a batch of tool calls, returning one
/// envelope per call sorted by original index. Lookup/conversion failures
/// for individual calls are folded in as `ERROR` envelopes rather than
/// aborting the whole batch.
///
/// Precondition (§4.2.2 multi-tool path step 1, enforced by the caller):
/// none of `calls` resolves to a `ToolCapability::FormInput` tool.
pub async fn dispatch_tool_calls(
    calls: &[ToolCall],
    index_table: &ToolIndex,
    depth: u32,
    pools: &LevelPools,
) -> Vec<ToolResultEnvelope> {
    let mut ready = Vec::with_capacity(calls.len());
    let mut failed = Vec::new();

    for (i, call) in calls.iter().enumerate() {
        match prepare_request(i, call, index_table) {
            Ok(req) => ready.push(req),
            Err(envelope) => failed.push(envelope),
        }
    }

    let mut results = execute_batch(ready, depth, pools).await;
    results.extend(failed);
    results.sort_by_key(|r| r.index);
    results
}

/// Resolve, convert, and dispatch a single tool call (§4.2.2 single-tool
/// path). `Arc<dyn ToolContext>` is returned alongside the envelope so the
/// caller can inspect `ToolCapability`/`current_state_string` for
/// post-processing without a second lookup.
pub async fn dispatch_single(
    call: &ToolCall,
    index_table: &ToolIndex,
    depth: u32,
    pools: &LevelPools,
) -> (ToolResultEnvelope, Option<Arc<dyn ToolContext>>) {
    match prepare_request(0, call, index_table) {
        Ok(req) => {
            let tool = req.tool.clone();
            let envelope = execute_one(req, depth, pools).await;
            (envelope, Some(tool))
        }
        Err(envelope) => (envelope, None),
    }
}
