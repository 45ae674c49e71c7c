// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowforge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowforge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Derived visibility for groups and collapsed subtrees.
//!
//! Stored flows only carry the inputs (`parentGroupId`, `isCollapsed`, `subtreeHidden`).
//! [`apply_group_visibility`] recomputes `hidden`/`groupHidden` and the synthetic
//! boundary-crossing edges at every read boundary; its output is never persisted.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{Edge, EdgeId, Flow, Node, NodeId};
use crate::query::{group_ancestors, group_descendants};

/// Collapses (or expands) the subtree hanging off `node_id`.
///
/// Sets the root's own `collapsed` flag, marks every descendant produced by `descendants`
/// hidden with `subtreeHidden`, and hides every edge with a descendant endpoint. Expanding
/// removes `subtreeHidden` rather than storing `false`.
///
/// Returns `false` if `node_id` is not in the flow (the flow is left untouched).
pub fn collapse_subtree_by_handles<F>(
    flow: &mut Flow,
    node_id: &str,
    collapsed: bool,
    descendants: F,
) -> bool
where
    F: Fn(&Flow, &str) -> BTreeSet<NodeId>,
{
    let Some(root) = flow.node_mut(node_id) else {
        return false;
    };
    root.set_collapsed(Some(collapsed));

    let affected = descendants(flow, node_id);
    for node in flow.nodes_mut().iter_mut().filter(|node| affected.contains(node.id())) {
        node.set_hidden(collapsed);
        node.set_subtree_hidden(collapsed);
    }
    for edge in flow
        .edges_mut()
        .iter_mut()
        .filter(|edge| affected.contains(edge.source()) || affected.contains(edge.target()))
    {
        edge.set_hidden(collapsed);
    }

    true
}

#[derive(Debug, Clone, Copy, Default)]
struct NodeVisibility {
    hidden: bool,
    group_hidden: bool,
}

/// Recomputes `hidden`/`groupHidden` on every node and edge and appends synthetic group edges.
///
/// Pure and idempotent: synthetic edges in the input are discarded before recomputation, so
/// feeding the output back in yields the same output.
pub fn apply_group_visibility(nodes: &[Node], edges: &[Edge]) -> (Vec<Node>, Vec<Edge>) {
    let flow = Flow::new(
        nodes.to_vec(),
        edges.iter().filter(|edge| !edge.is_synthetic_group_edge()).cloned().collect(),
    );

    let mut visibility: BTreeMap<NodeId, NodeVisibility> = BTreeMap::new();
    // Outermost collapsed ancestor group, for nodes folded into one.
    let mut representative: BTreeMap<NodeId, NodeId> = BTreeMap::new();

    for node in flow.nodes() {
        let mut group_hidden = false;
        for ancestor_id in group_ancestors(&flow, node.id().as_str()) {
            let collapsed = flow
                .node(ancestor_id.as_str())
                .is_some_and(|ancestor| ancestor.is_collapsed_group());
            if collapsed {
                group_hidden = true;
                representative.insert(node.id().clone(), ancestor_id);
            }
        }

        visibility.insert(
            node.id().clone(),
            NodeVisibility { hidden: group_hidden || node.subtree_hidden(), group_hidden },
        );
    }

    let lookup = |node_id: &NodeId| visibility.get(node_id).copied().unwrap_or_default();

    let (mut nodes_out, mut edges_out) = flow.clone().into_parts();
    for node in nodes_out.iter_mut() {
        let state = lookup(node.id());
        node.set_group_hidden(state.group_hidden);
        node.set_hidden(state.hidden);
    }
    for edge in edges_out.iter_mut() {
        let source = lookup(edge.source());
        let target = lookup(edge.target());
        edge.set_hidden(source.hidden || target.hidden);
        edge.set_group_hidden(source.group_hidden || target.group_hidden);
    }

    let mut seen: BTreeSet<(NodeId, NodeId)> = BTreeSet::new();
    for edge in flow.edges() {
        let source_rep = representative.get(edge.source()).unwrap_or(edge.source());
        let target_rep = representative.get(edge.target()).unwrap_or(edge.target());
        if source_rep == target_rep {
            continue;
        }

        let source_folded = source_rep != edge.source();
        let target_folded = target_rep != edge.target();
        if !source_folded && !target_folded {
            continue;
        }

        let key = if source_folded {
            (source_rep.clone(), target_rep.clone())
        } else {
            (target_rep.clone(), source_rep.clone())
        };
        if !seen.insert(key.clone()) {
            continue;
        }

        let (group_id, other_id) = key;
        let edge_id = EdgeId::new(format!("group-edge-{group_id}-{other_id}"))
            .expect("derived from valid node ids");
        let mut synthetic =
            Edge::new_synthetic(edge_id, source_rep.clone(), target_rep.clone());
        let source = lookup(source_rep);
        let target = lookup(target_rep);
        synthetic.set_hidden(source.hidden || target.hidden);
        synthetic.set_group_hidden(source.group_hidden || target.group_hidden);
        edges_out.push(synthetic);
    }

    (nodes_out, edges_out)
}

/// Convenience wrapper: the render-ready view of `flow`.
pub fn visible_flow(flow: &Flow) -> Flow {
    let (nodes, edges) = apply_group_visibility(flow.nodes(), flow.edges());
    Flow::new(nodes, edges)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GroupMembershipError {
    #[error("a group needs at least 2 members (got {count})")]
    TooFewMembers { count: usize },
    #[error("node {node_id} is listed more than once")]
    DuplicateMember { node_id: String },
    #[error("node {node_id} does not exist")]
    UnknownMember { node_id: String },
    #[error("node {descendant} is already inside {ancestor}; grouping them would create a cycle")]
    CircularReference { ancestor: NodeId, descendant: NodeId },
    #[error(
        "members belong to different parent groups ({first}: {first_parent}, {second}: {second_parent})"
    )]
    MixedParentGroups {
        first: NodeId,
        first_parent: String,
        second: NodeId,
        second_parent: String,
    },
}

/// Pre-check for creating a group from `member_ids`.
///
/// On success returns the parent group shared by all members (`None` for top level), which is
/// where the new group must be nested.
pub fn validate_group_membership<S: AsRef<str>>(
    flow: &Flow,
    member_ids: &[S],
) -> Result<Option<NodeId>, GroupMembershipError> {
    if member_ids.len() < 2 {
        return Err(GroupMembershipError::TooFewMembers { count: member_ids.len() });
    }

    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut members: Vec<&Node> = Vec::with_capacity(member_ids.len());
    for member_id in member_ids {
        let member_id = member_id.as_ref();
        if !seen.insert(member_id) {
            return Err(GroupMembershipError::DuplicateMember { node_id: member_id.to_owned() });
        }
        let Some(node) = flow.node(member_id) else {
            return Err(GroupMembershipError::UnknownMember { node_id: member_id.to_owned() });
        };
        members.push(node);
    }

    for candidate in &members {
        let contained = group_descendants(flow, candidate.id().as_str());
        if let Some(descendant) = members.iter().find(|other| contained.contains(other.id())) {
            return Err(GroupMembershipError::CircularReference {
                ancestor: candidate.id().clone(),
                descendant: descendant.id().clone(),
            });
        }
    }

    let first = members[0];
    for other in &members[1..] {
        if other.parent_group_id() != first.parent_group_id() {
            let describe = |parent: Option<&NodeId>| {
                parent.map(ToString::to_string).unwrap_or_else(|| "top level".to_owned())
            };
            return Err(GroupMembershipError::MixedParentGroups {
                first: first.id().clone(),
                first_parent: describe(first.parent_group_id()),
                second: other.id().clone(),
                second_parent: describe(other.parent_group_id()),
            });
        }
    }

    Ok(first.parent_group_id().cloned())
}

/// True iff `potential_parent_id` already lies inside `node_id` (group-based), i.e. making it
/// the parent of `node_id` would close a containment cycle.
pub fn detect_circular_reference(flow: &Flow, node_id: &str, potential_parent_id: &str) -> bool {
    group_descendants(flow, node_id)
        .iter()
        .any(|descendant| descendant.as_str() == potential_parent_id)
}
