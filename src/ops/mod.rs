// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowforge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowforge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Structural mutations of a flow.
//!
//! Operations are applied to a clone of the current flow; the input is never mutated.
//! [`execute`] is the single dispatch boundary: every [`OpError`] is folded into the uniform
//! `{success: false, error}` shape there, so callers never see a panic or a raw error for an
//! expected validation failure.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::layout::{LayoutDirection, LayoutEngine, LayoutError, NodeDims};
use crate::model::{Edge, EdgeId, Flow, Id, IdError, Node, NodeId, Position};
use crate::query::edge_descendants;
use crate::visibility::{
    collapse_subtree_by_handles, validate_group_membership, GroupMembershipError,
};

/// Per-axis tolerance below which a layout result counts as "unchanged".
pub const LAYOUT_TOLERANCE: f64 = 0.01;

const CHILD_OFFSET_X: f64 = 200.0;
const CHILD_OFFSET_Y: f64 = 120.0;
const TOP_LEVEL_OFFSET_X: f64 = 220.0;
const DEFAULT_GROUP_LABEL: &str = "Group";
const SUGGESTION_MIN_RATIO: f64 = 0.6;

/// Wire names of every operation, in documentation order.
pub const OPERATION_NAMES: [&str; 11] = [
    "addNode",
    "updateNode",
    "deleteNode",
    "addEdge",
    "updateEdge",
    "deleteEdge",
    "createGroup",
    "ungroup",
    "toggleGroupExpansion",
    "toggleSubtreeCollapse",
    "autoLayout",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    AddNode(NewNode),
    UpdateNode { node_id: NodeId, patch: NodePatch },
    DeleteNode { node_id: NodeId },
    /// Endpoints are node references: an id, or a label resolved through [`resolve_node_ref`].
    AddEdge { source: String, target: String, label: Option<String> },
    UpdateEdge { edge_id: EdgeId, label: Option<String> },
    DeleteEdge { edge_id: EdgeId },
    CreateGroup { member_ids: Vec<String>, label: Option<String>, position: Option<Position> },
    Ungroup { group_id: NodeId },
    ToggleGroupExpansion { group_id: NodeId, expand: bool },
    ToggleSubtreeCollapse { node_id: NodeId, collapsed: bool },
    AutoLayout { direction: LayoutDirection },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewNode {
    /// Explicit id; generated from the label when absent.
    pub id: Option<NodeId>,
    pub label: String,
    pub description: Option<String>,
    /// Parent node reference (id or label).
    pub parent: Option<String>,
    pub edge_label: Option<String>,
    pub position: Option<Position>,
}

impl NewNode {
    pub fn labeled(label: impl Into<String>) -> Self {
        Self { label: label.into(), ..Self::default() }
    }

    pub fn with_id(mut self, id: NodeId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_edge_label(mut self, edge_label: impl Into<String>) -> Self {
        self.edge_label = Some(edge_label.into());
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodePatch {
    pub label: Option<String>,
    pub description: Option<String>,
    pub position: Option<Position>,
}

impl Op {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddNode(_) => "addNode",
            Self::UpdateNode { .. } => "updateNode",
            Self::DeleteNode { .. } => "deleteNode",
            Self::AddEdge { .. } => "addEdge",
            Self::UpdateEdge { .. } => "updateEdge",
            Self::DeleteEdge { .. } => "deleteEdge",
            Self::CreateGroup { .. } => "createGroup",
            Self::Ungroup { .. } => "ungroup",
            Self::ToggleGroupExpansion { .. } => "toggleGroupExpansion",
            Self::ToggleSubtreeCollapse { .. } => "toggleSubtreeCollapse",
            Self::AutoLayout { .. } => "autoLayout",
        }
    }

    /// Parses an agent-supplied `(operation, params)` pair.
    ///
    /// Parameters are checked strictly: a wrongly typed value is an error, never coerced.
    pub fn from_tool_call(call: &ToolCall) -> Result<Self, OpError> {
        let params = Params::new(&call.operation, &call.params)?;
        let op = match call.operation.as_str() {
            "addNode" => Self::AddNode(NewNode {
                id: params.optional_id("id")?,
                label: params.required_str("label")?.to_owned(),
                description: params.optional_string("description")?,
                parent: params.optional_string("parentNodeId")?,
                edge_label: params.optional_string("edgeLabel")?,
                position: params.optional_position("position")?,
            }),
            "updateNode" => Self::UpdateNode {
                node_id: params.required_id("nodeId")?,
                patch: NodePatch {
                    label: params.optional_string("label")?,
                    description: params.optional_string("description")?,
                    position: params.optional_position("position")?,
                },
            },
            "deleteNode" => Self::DeleteNode { node_id: params.required_id("nodeId")? },
            "addEdge" => Self::AddEdge {
                source: params.required_str("sourceNodeId")?.to_owned(),
                target: params.required_str("targetNodeId")?.to_owned(),
                label: params.optional_string("label")?,
            },
            "updateEdge" => Self::UpdateEdge {
                edge_id: params.required_id("edgeId")?,
                label: params.optional_string("label")?,
            },
            "deleteEdge" => Self::DeleteEdge { edge_id: params.required_id("edgeId")? },
            "createGroup" => Self::CreateGroup {
                member_ids: params.required_str_list("memberIds")?,
                label: params.optional_string("label")?,
                position: params.optional_position("position")?,
            },
            "ungroup" => Self::Ungroup { group_id: params.required_id("groupId")? },
            "toggleGroupExpansion" => Self::ToggleGroupExpansion {
                group_id: params.required_id("groupId")?,
                expand: params.required_bool("expand")?,
            },
            "toggleSubtreeCollapse" => Self::ToggleSubtreeCollapse {
                node_id: params.required_id("nodeId")?,
                collapsed: params.required_bool("collapsed")?,
            },
            "autoLayout" => Self::AutoLayout {
                direction: params.optional_direction("direction")?.unwrap_or_default(),
            },
            other => {
                return Err(OpError::UnknownOperation {
                    operation: other.to_owned(),
                    suggestion: closest_match(other, OPERATION_NAMES.iter().copied())
                        .map(str::to_owned),
                })
            }
        };
        Ok(op)
    }
}

/// An agent-facing operation request: a wire name plus a JSON parameter bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub operation: String,
    #[serde(default)]
    pub params: Value,
}

impl ToolCall {
    pub fn new(operation: impl Into<String>, params: Value) -> Self {
        Self { operation: operation.into(), params }
    }
}

struct Params<'a> {
    operation: &'a str,
    map: Option<&'a Map<String, Value>>,
}

impl<'a> Params<'a> {
    fn new(operation: &'a str, params: &'a Value) -> Result<Self, OpError> {
        match params {
            Value::Null => Ok(Self { operation, map: None }),
            Value::Object(map) => Ok(Self { operation, map: Some(map) }),
            _ => Err(OpError::invalid_param(operation, "params", "must be a JSON object")),
        }
    }

    /// `null` counts as absent.
    fn get(&self, name: &str) -> Option<&'a Value> {
        self.map.and_then(|map| map.get(name)).filter(|value| !value.is_null())
    }

    fn invalid(&self, name: &str, reason: &str) -> OpError {
        OpError::invalid_param(self.operation, name, reason)
    }

    fn optional_str(&self, name: &str) -> Result<Option<&'a str>, OpError> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::String(value)) => Ok(Some(value.as_str())),
            Some(_) => Err(self.invalid(name, "must be a string")),
        }
    }

    fn optional_string(&self, name: &str) -> Result<Option<String>, OpError> {
        Ok(self.optional_str(name)?.map(str::to_owned))
    }

    fn required_str(&self, name: &str) -> Result<&'a str, OpError> {
        self.optional_str(name)?.ok_or_else(|| self.invalid(name, "is required"))
    }

    fn optional_id<T>(&self, name: &str) -> Result<Option<Id<T>>, OpError> {
        self.optional_str(name)?
            .map(|value| {
                Id::new(value)
                    .map_err(|err| self.invalid(name, &format!("is not a valid id ({err})")))
            })
            .transpose()
    }

    fn required_id<T>(&self, name: &str) -> Result<Id<T>, OpError> {
        self.optional_id(name)?.ok_or_else(|| self.invalid(name, "is required"))
    }

    fn required_bool(&self, name: &str) -> Result<bool, OpError> {
        match self.get(name) {
            Some(Value::Bool(value)) => Ok(*value),
            Some(_) => Err(self.invalid(name, "must be a boolean (true or false)")),
            None => Err(self.invalid(name, "is required and must be a boolean (true or false)")),
        }
    }

    fn required_str_list(&self, name: &str) -> Result<Vec<String>, OpError> {
        let Some(Value::Array(values)) = self.get(name) else {
            return Err(self.invalid(name, "must be an array of node ids"));
        };
        values
            .iter()
            .map(|value| match value {
                Value::String(value) => Ok(value.clone()),
                _ => Err(self.invalid(name, "must be an array of node ids")),
            })
            .collect()
    }

    fn optional_position(&self, name: &str) -> Result<Option<Position>, OpError> {
        let Some(value) = self.get(name) else {
            return Ok(None);
        };
        let axis = |axis: &str| value.get(axis).and_then(Value::as_f64);
        match (axis("x"), axis("y")) {
            (Some(x), Some(y)) => Ok(Some(Position::new(x, y))),
            _ => Err(self.invalid(name, "must be an object with numeric x and y")),
        }
    }

    fn optional_direction(&self, name: &str) -> Result<Option<LayoutDirection>, OpError> {
        self.optional_str(name)?
            .map(|value| {
                value.parse().map_err(|err: LayoutError| self.invalid(name, &err.to_string()))
            })
            .transpose()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OpError {
    #[error("node {node_ref:?} not found{}", did_you_mean(.suggestion))]
    NodeNotFound { node_ref: String, suggestion: Option<String> },
    #[error("edge {edge_id:?} not found")]
    EdgeNotFound { edge_id: String },
    #[error("node {node_id} already exists")]
    NodeAlreadyExists { node_id: NodeId },
    #[error("node {node_id} is not a group")]
    NotAGroup { node_id: NodeId },
    #[error("group {group_id} has no members")]
    EmptyGroup { group_id: NodeId },
    #[error("invalid group: {0}")]
    GroupMembership(#[from] GroupMembershipError),
    #[error("{operation}: parameter `{param}` {reason}")]
    InvalidParam { operation: String, param: String, reason: String },
    #[error("unknown operation {operation:?}{}", did_you_mean(.suggestion))]
    UnknownOperation { operation: String, suggestion: Option<String> },
    #[error("invalid id: {0}")]
    InvalidId(#[from] IdError),
    #[error("layout failed: {0}")]
    Layout(#[from] LayoutError),
}

impl OpError {
    fn invalid_param(operation: &str, param: &str, reason: &str) -> Self {
        Self::InvalidParam {
            operation: operation.to_owned(),
            param: param.to_owned(),
            reason: reason.to_owned(),
        }
    }
}

fn did_you_mean(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(suggestion) => format!(" (did you mean {suggestion:?}?)"),
        None => String::new(),
    }
}

/// Lowercases, collapses every run of non-alphanumerics into one `_`, trims `_` at both ends.
pub fn sanitize_label(label: &str) -> String {
    static NON_ALNUM: OnceLock<Regex> = OnceLock::new();
    let pattern = NON_ALNUM.get_or_init(|| Regex::new("[^a-z0-9]+").expect("static pattern"));
    pattern.replace_all(&label.to_lowercase(), "_").trim_matches('_').to_owned()
}

/// Resolves a node reference: exact id first, then the sanitized reference against node ids,
/// then against sanitized labels. Ties resolve to the earliest node in the flow.
pub fn resolve_node_ref<'a>(flow: &'a Flow, node_ref: &str) -> Option<&'a Node> {
    if let Some(node) = flow.node(node_ref) {
        return Some(node);
    }

    let wanted = sanitize_label(node_ref);
    if wanted.is_empty() {
        return None;
    }
    flow.node(&wanted)
        .or_else(|| flow.nodes().iter().find(|node| sanitize_label(node.label()) == wanted))
}

fn closest_match<'a>(needle: &str, candidates: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    candidates
        .map(|candidate| {
            let ratio =
                rapidfuzz::fuzz::ratio(needle.chars(), candidate.to_lowercase().chars());
            (candidate, ratio)
        })
        .filter(|(_, ratio)| *ratio >= SUGGESTION_MIN_RATIO)
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(candidate, _)| candidate)
}

/// Best-effort "did you mean" for an unresolved node reference: the id of the node whose id
/// or label is closest to `node_ref`.
pub fn suggest_node(flow: &Flow, node_ref: &str) -> Option<String> {
    let needle = node_ref.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    let score =
        |candidate: &str| rapidfuzz::fuzz::ratio(needle.chars(), candidate.to_lowercase().chars());
    flow.nodes()
        .iter()
        .map(|node| (node, score(node.id().as_str()).max(score(node.label()))))
        .filter(|(_, ratio)| *ratio >= SUGGESTION_MIN_RATIO)
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(node, _)| node.id().to_string())
}

fn node_not_found(flow: &Flow, node_ref: &str) -> OpError {
    OpError::NodeNotFound {
        node_ref: node_ref.to_owned(),
        suggestion: suggest_node(flow, node_ref),
    }
}

/// Result of a successful [`apply_op`].
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    pub flow: Flow,
    pub node_id: Option<NodeId>,
    pub edge_id: Option<EdgeId>,
    pub group_id: Option<NodeId>,
    /// Whether the flow differs from the input.
    pub changed: bool,
}

/// Applies one operation to a copy of `flow`.
pub fn apply_op(flow: &Flow, op: &Op, layout: &dyn LayoutEngine) -> Result<Applied, OpError> {
    let mut next = flow.clone();
    let mut node_id = None;
    let mut edge_id = None;
    let mut group_id = None;

    match op {
        Op::AddNode(new_node) => {
            let (created, edge) = add_node(&mut next, new_node)?;
            node_id = Some(created);
            edge_id = edge;
        }
        Op::UpdateNode { node_id: target, patch } => {
            update_node(&mut next, target, patch)?;
            node_id = Some(target.clone());
        }
        Op::DeleteNode { node_id: target } => {
            delete_node(&mut next, target)?;
            node_id = Some(target.clone());
        }
        Op::AddEdge { source, target, label } => {
            edge_id = Some(add_edge(&mut next, source, target, label.as_deref())?);
        }
        Op::UpdateEdge { edge_id: target, label } => {
            update_edge(&mut next, target, label.as_deref())?;
            edge_id = Some(target.clone());
        }
        Op::DeleteEdge { edge_id: target } => {
            delete_edge(&mut next, target)?;
            edge_id = Some(target.clone());
        }
        Op::CreateGroup { member_ids, label, position } => {
            group_id = Some(create_group(&mut next, member_ids, label.as_deref(), *position)?);
        }
        Op::Ungroup { group_id: target } => {
            ungroup(&mut next, target)?;
            group_id = Some(target.clone());
        }
        Op::ToggleGroupExpansion { group_id: target, expand } => {
            toggle_group_expansion(&mut next, target, *expand)?;
            group_id = Some(target.clone());
        }
        Op::ToggleSubtreeCollapse { node_id: target, collapsed } => {
            toggle_subtree_collapse(&mut next, target, *collapsed)?;
            node_id = Some(target.clone());
        }
        Op::AutoLayout { direction } => {
            auto_layout(&mut next, *direction, layout)?;
        }
    }

    let changed = next != *flow;
    Ok(Applied { flow: next, node_id, edge_id, group_id, changed })
}

/// Uniform per-operation result shape handed to users and agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_flow: Option<Flow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_id: Option<EdgeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed: Option<bool>,
}

impl OpOutcome {
    pub fn failure(error: impl fmt::Display) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            updated_flow: None,
            node_id: None,
            edge_id: None,
            group_id: None,
            changed: None,
        }
    }

    fn from_applied(applied: Applied) -> Self {
        Self {
            success: true,
            error: None,
            updated_flow: Some(applied.flow),
            node_id: applied.node_id,
            edge_id: applied.edge_id,
            group_id: applied.group_id,
            changed: Some(applied.changed),
        }
    }
}

/// Dispatch boundary: applies `op` and folds any error into a failure outcome.
pub fn execute(flow: &Flow, op: &Op, layout: &dyn LayoutEngine) -> OpOutcome {
    match apply_op(flow, op, layout) {
        Ok(applied) => {
            tracing::debug!(operation = op.name(), changed = applied.changed, "op applied");
            OpOutcome::from_applied(applied)
        }
        Err(err) => {
            tracing::warn!(operation = op.name(), error = %err, "op failed");
            OpOutcome::failure(err)
        }
    }
}

/// Parses and executes an agent tool call. Parse failures use the same failure shape.
pub fn execute_tool_call(flow: &Flow, call: &ToolCall, layout: &dyn LayoutEngine) -> OpOutcome {
    match Op::from_tool_call(call) {
        Ok(op) => execute(flow, &op, layout),
        Err(err) => {
            tracing::warn!(operation = %call.operation, error = %err, "tool call rejected");
            OpOutcome::failure(err)
        }
    }
}

// Per-operation mutation helpers.
include!("ops_impl.rs");

#[cfg(test)]
mod tests;
