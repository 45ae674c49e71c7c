// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowforge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowforge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::{Json, Parameters};
use rmcp::model::{ServerCapabilities, ServerInfo};
use rmcp::{tool, tool_handler, tool_router, ErrorData, ServerHandler, ServiceExt};
use tokio::sync::{Mutex, MutexGuard};

use crate::engine::{EngineError, FlowEngine};
use crate::history::Origin;
use crate::model::{Flow, FlowId};
use crate::ops::{OpOutcome, ToolCall};
use crate::store::FlowStore;
use crate::visibility::{detect_circular_reference, validate_group_membership};

use super::types::*;

/// Engine type shared by the MCP server and the CLI.
pub type SharedEngine = FlowEngine<Box<dyn FlowStore + Send>>;

#[derive(Clone)]
pub struct FlowforgeMcp {
    engine: Arc<Mutex<SharedEngine>>,
    default_flow_id: FlowId,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl FlowforgeMcp {
    pub fn new(engine: SharedEngine, default_flow_id: FlowId) -> Self {
        Self::new_shared(Arc::new(Mutex::new(engine)), default_flow_id)
    }

    pub fn new_shared(engine: Arc<Mutex<SharedEngine>>, default_flow_id: FlowId) -> Self {
        Self { engine, default_flow_id, tool_router: Self::tool_router() }
    }

    pub fn default_flow_id(&self) -> &FlowId {
        &self.default_flow_id
    }

    pub async fn serve_stdio(self) -> Result<(), rmcp::RmcpError> {
        let service = self.serve((tokio::io::stdin(), tokio::io::stdout())).await?;
        service.waiting().await?;
        Ok(())
    }

    fn resolve_flow_id(&self, flow_id: Option<&str>) -> Result<FlowId, ErrorData> {
        match flow_id {
            None => Ok(self.default_flow_id.clone()),
            Some(raw) => FlowId::new(raw).map_err(|err| {
                ErrorData::invalid_params(
                    format!("invalid flow_id: {err}"),
                    Some(serde_json::json!({ "flow_id": raw })),
                )
            }),
        }
    }

    async fn lock_engine(&self) -> MutexGuard<'_, SharedEngine> {
        self.engine.lock().await
    }

    /// List stored flows; the default flow is used whenever `flow_id` is omitted.
    #[tool(name = "flow.list")]
    async fn flow_list(&self) -> Result<Json<ListFlowsResponse>, ErrorData> {
        let engine = self.lock_engine().await;
        let flow_ids = engine.flow_ids().map_err(map_engine_error)?;
        Ok(Json(ListFlowsResponse {
            default_flow_id: self.default_flow_id.to_string(),
            flow_ids: flow_ids.iter().map(ToString::to_string).collect(),
        }))
    }

    /// Read a flow. The default view has group/collapse visibility derived (`hidden`,
    /// `groupHidden`, synthetic group edges); pass `raw: true` for the stored document.
    #[tool(name = "flow.read")]
    async fn flow_read(
        &self,
        params: Parameters<FlowReadParams>,
    ) -> Result<Json<FlowReadResponse>, ErrorData> {
        let FlowReadParams { flow_id, raw } = params.0;
        let flow_id = self.resolve_flow_id(flow_id.as_deref())?;

        let mut engine = self.lock_engine().await;
        let flow = if raw { engine.read_flow(&flow_id) } else { engine.read_visible(&flow_id) }
            .map_err(map_engine_error)?;
        let history = engine.status(&flow_id).map_err(map_engine_error)?;
        drop(engine);

        Ok(Json(FlowReadResponse {
            flow_id: flow_id.to_string(),
            nodes: flow.nodes().len() as u64,
            edges: flow.edges().len() as u64,
            flow: flow_to_value(&flow)?,
            history,
        }))
    }

    /// Apply a batch of operations (`addNode`, `updateNode`, `deleteNode`, `addEdge`,
    /// `updateEdge`, `deleteEdge`, `createGroup`, `ungroup`, `toggleGroupExpansion`,
    /// `toggleSubtreeCollapse`, `autoLayout`). Failing ops are reported and skipped; the batch
    /// is committed as one undo step if anything changed.
    #[tool(name = "flow.apply_ops")]
    async fn flow_apply_ops(
        &self,
        params: Parameters<ApplyOpsParams>,
    ) -> Result<Json<ApplyOpsResponse>, ErrorData> {
        let ApplyOpsParams { flow_id, ops } = params.0;
        let flow_id = self.resolve_flow_id(flow_id.as_deref())?;
        let calls = ops
            .into_iter()
            .map(|call| ToolCall::new(call.operation, call.params))
            .collect::<Vec<_>>();

        let report = self
            .lock_engine()
            .await
            .run_tool_calls(&flow_id, Origin::Agent, &calls)
            .map_err(map_engine_error)?;

        let results = calls
            .iter()
            .zip(&report.outcomes)
            .enumerate()
            .map(|(index, (call, outcome))| op_result(index, call, outcome))
            .collect();

        Ok(Json(ApplyOpsResponse {
            flow_id: flow_id.to_string(),
            committed: report.committed,
            snapshot_seq: report.snapshot_seq,
            applied: report.succeeded() as u64,
            failed: report.failed() as u64,
            results,
            history: report.status,
            flow: flow_to_value(&crate::visibility::visible_flow(&report.flow))?,
        }))
    }

    /// Step back one snapshot and persist it. `restored: false` means there was nothing to undo.
    #[tool(name = "flow.undo")]
    async fn flow_undo(
        &self,
        params: Parameters<FlowRefParams>,
    ) -> Result<Json<RestoreResponse>, ErrorData> {
        let flow_id = self.resolve_flow_id(params.0.flow_id.as_deref())?;
        let restore = self.lock_engine().await.undo(&flow_id).map_err(map_engine_error)?;
        restore_response(flow_id, restore)
    }

    /// Step forward one snapshot and persist it. `restored: false` means there was nothing to redo.
    #[tool(name = "flow.redo")]
    async fn flow_redo(
        &self,
        params: Parameters<FlowRefParams>,
    ) -> Result<Json<RestoreResponse>, ErrorData> {
        let flow_id = self.resolve_flow_id(params.0.flow_id.as_deref())?;
        let restore = self.lock_engine().await.redo(&flow_id).map_err(map_engine_error)?;
        restore_response(flow_id, restore)
    }

    /// Snapshot log of a flow, oldest first.
    #[tool(name = "flow.history")]
    async fn flow_history(
        &self,
        params: Parameters<FlowRefParams>,
    ) -> Result<Json<HistoryResponse>, ErrorData> {
        let flow_id = self.resolve_flow_id(params.0.flow_id.as_deref())?;
        let mut engine = self.lock_engine().await;
        let history = engine.history(&flow_id).map_err(map_engine_error)?;

        let status = history.status();
        let snapshots = history
            .snapshots()
            .map(|snapshot| SnapshotSummary {
                seq: snapshot.seq(),
                origin: snapshot.origin(),
                created_at: snapshot.created_at().to_rfc3339(),
                nodes: snapshot.flow().nodes().len() as u64,
                edges: snapshot.flow().edges().len() as u64,
                current: status.current_seq == Some(snapshot.seq()),
            })
            .collect();

        Ok(Json(HistoryResponse {
            flow_id: flow_id.to_string(),
            cap: history.cap() as u64,
            status,
            snapshots,
        }))
    }

    /// Drop all snapshots and start over from the current flow.
    #[tool(name = "flow.reset_history")]
    async fn flow_reset_history(
        &self,
        params: Parameters<FlowRefParams>,
    ) -> Result<Json<ResetHistoryResponse>, ErrorData> {
        let flow_id = self.resolve_flow_id(params.0.flow_id.as_deref())?;
        let history =
            self.lock_engine().await.reset_history(&flow_id).map_err(map_engine_error)?;
        Ok(Json(ResetHistoryResponse { flow_id: flow_id.to_string(), history }))
    }

    /// Check whether `member_ids` could form a new group, without changing anything.
    #[tool(name = "group.validate")]
    async fn group_validate(
        &self,
        params: Parameters<GroupValidateParams>,
    ) -> Result<Json<GroupValidateResponse>, ErrorData> {
        let GroupValidateParams { flow_id, member_ids } = params.0;
        let flow_id = self.resolve_flow_id(flow_id.as_deref())?;
        let flow = self.lock_engine().await.read_flow(&flow_id).map_err(map_engine_error)?;

        let response = match validate_group_membership(&flow, &member_ids) {
            Ok(parent) => GroupValidateResponse {
                valid: true,
                error: None,
                parent_group_id: parent.map(|parent| parent.to_string()),
            },
            Err(err) => GroupValidateResponse {
                valid: false,
                error: Some(err.to_string()),
                parent_group_id: None,
            },
        };
        Ok(Json(response))
    }

    /// Whether placing `node_id` inside `potential_parent_id` would make containment cyclic.
    #[tool(name = "group.detect_cycle")]
    async fn group_detect_cycle(
        &self,
        params: Parameters<GroupDetectCycleParams>,
    ) -> Result<Json<GroupDetectCycleResponse>, ErrorData> {
        let GroupDetectCycleParams { flow_id, node_id, potential_parent_id } = params.0;
        let flow_id = self.resolve_flow_id(flow_id.as_deref())?;
        let flow = self.lock_engine().await.read_flow(&flow_id).map_err(map_engine_error)?;

        Ok(Json(GroupDetectCycleResponse {
            would_cycle: detect_circular_reference(&flow, &node_id, &potential_parent_id),
        }))
    }
}

#[tool_handler]
impl ServerHandler for FlowforgeMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Flowforge flow editing server (tools: flow.list, flow.read, flow.apply_ops, \
                 flow.undo, flow.redo, flow.history, flow.reset_history, group.validate, \
                 group.detect_cycle). Read with flow.read, mutate with flow.apply_ops; every \
                 committed batch is one undo step."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

fn map_engine_error(err: EngineError) -> ErrorData {
    tracing::warn!(error = %err, "engine call failed");
    ErrorData::internal_error(format!("flow store failure: {err}"), None)
}

fn flow_to_value(flow: &Flow) -> Result<serde_json::Value, ErrorData> {
    serde_json::to_value(flow)
        .map_err(|err| ErrorData::internal_error(format!("cannot serialize flow: {err}"), None))
}

fn op_result(index: usize, call: &ToolCall, outcome: &OpOutcome) -> McpOpResult {
    McpOpResult {
        index: index as u64,
        operation: call.operation.clone(),
        success: outcome.success,
        error: outcome.error.clone(),
        node_id: outcome.node_id.as_ref().map(ToString::to_string),
        edge_id: outcome.edge_id.as_ref().map(ToString::to_string),
        group_id: outcome.group_id.as_ref().map(ToString::to_string),
        changed: outcome.changed,
    }
}

fn restore_response(
    flow_id: FlowId,
    restore: crate::engine::Restore,
) -> Result<Json<RestoreResponse>, ErrorData> {
    Ok(Json(RestoreResponse {
        flow_id: flow_id.to_string(),
        restored: restore.restored,
        history: restore.status,
        flow: flow_to_value(&crate::visibility::visible_flow(&restore.flow))?,
    }))
}
