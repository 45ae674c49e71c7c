// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowforge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowforge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::history::{HistoryStatus, Origin};

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct FlowRefParams {
    /// Defaults to the server's flow.
    pub flow_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ListFlowsResponse {
    pub default_flow_id: String,
    pub flow_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct FlowReadParams {
    pub flow_id: Option<String>,
    /// Return the stored document instead of the visibility-derived view.
    #[serde(default)]
    pub raw: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FlowReadResponse {
    pub flow_id: String,
    pub nodes: u64,
    pub edges: u64,
    /// `{nodes, edges}` in the camelCase document format.
    pub flow: Value,
    pub history: HistoryStatus,
}

/// One operation: a wire name such as `addNode` plus its parameter object.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct McpToolCall {
    pub operation: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ApplyOpsParams {
    pub flow_id: Option<String>,
    pub ops: Vec<McpToolCall>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct McpOpResult {
    pub index: u64,
    pub operation: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ApplyOpsResponse {
    pub flow_id: String,
    pub committed: bool,
    pub snapshot_seq: Option<u64>,
    pub applied: u64,
    pub failed: u64,
    pub results: Vec<McpOpResult>,
    pub history: HistoryStatus,
    /// Visibility-derived view of the resulting flow.
    pub flow: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RestoreResponse {
    pub flow_id: String,
    pub restored: bool,
    pub history: HistoryStatus,
    pub flow: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SnapshotSummary {
    pub seq: u64,
    pub origin: Origin,
    /// RFC 3339 timestamp.
    pub created_at: String,
    pub nodes: u64,
    pub edges: u64,
    pub current: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HistoryResponse {
    pub flow_id: String,
    pub cap: u64,
    pub status: HistoryStatus,
    pub snapshots: Vec<SnapshotSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResetHistoryResponse {
    pub flow_id: String,
    pub history: HistoryStatus,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GroupValidateParams {
    pub flow_id: Option<String>,
    pub member_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GroupValidateResponse {
    pub valid: bool,
    pub error: Option<String>,
    /// Group the new group would be nested in.
    pub parent_group_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GroupDetectCycleParams {
    pub flow_id: Option<String>,
    pub node_id: String,
    pub potential_parent_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GroupDetectCycleResponse {
    pub would_cycle: bool,
}
