// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowforge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowforge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use serde::{Deserialize, Serialize};

use super::ids::{EdgeId, NodeId};

/// The graph document: nodes and edges in insertion order.
///
/// Serialized as camelCase JSON; this is both the persisted format and the shape handed to
/// renderers after the visibility pass.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Flow {
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    edges: Vec<Edge>,
}

impl Flow {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut Vec<Node> {
        &mut self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edges_mut(&mut self) -> &mut Vec<Edge> {
        &mut self.edges
    }

    pub fn into_parts(self) -> (Vec<Node>, Vec<Edge>) {
        (self.nodes, self.edges)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn node(&self, node_id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id.as_str() == node_id)
    }

    pub fn node_mut(&mut self, node_id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|node| node.id.as_str() == node_id)
    }

    pub fn contains_node(&self, node_id: &str) -> bool {
        self.node(node_id).is_some()
    }

    pub fn edge(&self, edge_id: &str) -> Option<&Edge> {
        self.edges.iter().find(|edge| edge.id.as_str() == edge_id)
    }

    pub fn edge_mut(&mut self, edge_id: &str) -> Option<&mut Edge> {
        self.edges.iter_mut().find(|edge| edge.id.as_str() == edge_id)
    }

    pub fn contains_edge(&self, edge_id: &str) -> bool {
        self.edge(edge_id).is_some()
    }

    /// Direct members of `group_id` (one level of `parentGroupId`).
    pub fn group_members<'a>(&'a self, group_id: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes
            .iter()
            .filter(move |node| node.parent_group_id().is_some_and(|parent| parent == group_id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    #[default]
    Plain,
    Group,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Per-axis comparison with an absolute tolerance.
    pub fn approx_eq(&self, other: &Position, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance && (self.y - other.y).abs() <= tolerance
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    id: NodeId,
    #[serde(default)]
    kind: NodeKind,
    #[serde(default)]
    position: Position,
    label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent_group_id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    collapsed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    is_collapsed: Option<bool>,
    #[serde(default)]
    hidden: bool,
    #[serde(default)]
    group_hidden: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    subtree_hidden: bool,
}

impl Node {
    pub fn new(id: NodeId, label: impl Into<String>) -> Self {
        Self {
            id,
            kind: NodeKind::Plain,
            position: Position::default(),
            label: label.into(),
            description: None,
            parent_group_id: None,
            collapsed: None,
            is_collapsed: None,
            hidden: false,
            group_hidden: false,
            subtree_hidden: false,
        }
    }

    /// A new group node. Groups start collapsed.
    pub fn new_group(id: NodeId, label: impl Into<String>) -> Self {
        let mut node = Self::new(id, label);
        node.kind = NodeKind::Group;
        node.is_collapsed = Some(true);
        node
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_group(&self) -> bool {
        self.kind == NodeKind::Group
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description<T: Into<String>>(&mut self, description: Option<T>) {
        self.description = description.map(Into::into);
    }

    pub fn parent_group_id(&self) -> Option<&NodeId> {
        self.parent_group_id.as_ref()
    }

    pub fn set_parent_group_id(&mut self, parent_group_id: Option<NodeId>) {
        self.parent_group_id = parent_group_id;
    }

    /// Own-subtree collapse flag (edge-based collapse rooted at this node).
    pub fn collapsed(&self) -> Option<bool> {
        self.collapsed
    }

    pub fn set_collapsed(&mut self, collapsed: Option<bool>) {
        self.collapsed = collapsed;
    }

    pub fn is_collapsed(&self) -> Option<bool> {
        self.is_collapsed
    }

    pub fn set_is_collapsed(&mut self, is_collapsed: Option<bool>) {
        self.is_collapsed = is_collapsed;
    }

    /// Whether this node is a group whose members are currently folded away.
    ///
    /// A group without an explicit flag (e.g. imported data) counts as expanded.
    pub fn is_collapsed_group(&self) -> bool {
        self.is_group() && self.is_collapsed.unwrap_or(false)
    }

    pub fn hidden(&self) -> bool {
        self.hidden
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    pub fn group_hidden(&self) -> bool {
        self.group_hidden
    }

    pub fn set_group_hidden(&mut self, group_hidden: bool) {
        self.group_hidden = group_hidden;
    }

    pub fn subtree_hidden(&self) -> bool {
        self.subtree_hidden
    }

    pub fn set_subtree_hidden(&mut self, subtree_hidden: bool) {
        self.subtree_hidden = subtree_hidden;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    id: EdgeId,
    source: NodeId,
    target: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(default)]
    hidden: bool,
    #[serde(default)]
    group_hidden: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    is_synthetic_group_edge: bool,
}

impl Edge {
    pub fn new(id: EdgeId, source: NodeId, target: NodeId) -> Self {
        Self {
            id,
            source,
            target,
            label: None,
            hidden: false,
            group_hidden: false,
            is_synthetic_group_edge: false,
        }
    }

    /// A derived edge standing in for real edges that cross a collapsed group boundary.
    pub fn new_synthetic(id: EdgeId, source: NodeId, target: NodeId) -> Self {
        let mut edge = Self::new(id, source, target);
        edge.is_synthetic_group_edge = true;
        edge
    }

    pub fn with_label<T: Into<String>>(mut self, label: Option<T>) -> Self {
        self.label = label.map(Into::into);
        self
    }

    pub fn id(&self) -> &EdgeId {
        &self.id
    }

    pub fn source(&self) -> &NodeId {
        &self.source
    }

    pub fn target(&self) -> &NodeId {
        &self.target
    }

    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn set_label<T: Into<String>>(&mut self, label: Option<T>) {
        self.label = label.map(Into::into);
    }

    pub fn hidden(&self) -> bool {
        self.hidden
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    pub fn group_hidden(&self) -> bool {
        self.group_hidden
    }

    pub fn set_group_hidden(&mut self, group_hidden: bool) {
        self.group_hidden = group_hidden;
    }

    pub fn is_synthetic_group_edge(&self) -> bool {
        self.is_synthetic_group_edge
    }
}
