// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowforge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowforge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use smallvec::SmallVec;

use crate::model::{Flow, NodeId};

/// Ancestor chain of a node, nearest first. Nesting rarely goes deeper than a few levels.
pub type GroupChain = SmallVec<[NodeId; 4]>;

fn outgoing_adjacency(flow: &Flow) -> BTreeMap<&str, Vec<&str>> {
    let mut outgoing: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for edge in flow.edges().iter().filter(|edge| !edge.is_synthetic_group_edge()) {
        outgoing.entry(edge.source().as_str()).or_default().push(edge.target().as_str());
    }
    outgoing
}

fn membership_adjacency(flow: &Flow) -> BTreeMap<&str, Vec<&str>> {
    let mut members: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for node in flow.nodes() {
        if let Some(parent) = node.parent_group_id() {
            members.entry(parent.as_str()).or_default().push(node.id().as_str());
        }
    }
    members
}

fn bfs_descendants<'a>(
    flow: &Flow,
    adjacency: &BTreeMap<&'a str, Vec<&'a str>>,
    root: &'a str,
) -> BTreeSet<NodeId> {
    let mut visited: BTreeSet<&'a str> = BTreeSet::new();
    let mut queue: VecDeque<&'a str> = VecDeque::new();

    visited.insert(root);
    queue.push_back(root);

    while let Some(node_id) = queue.pop_front() {
        for &next_id in adjacency.get(node_id).into_iter().flatten() {
            if visited.insert(next_id) {
                queue.push_back(next_id);
            }
        }
    }

    flow.nodes()
        .iter()
        .map(|node| node.id())
        .filter(|node_id| node_id.as_str() != root && visited.contains(node_id.as_str()))
        .cloned()
        .collect()
}

/// Nodes reachable from `root` along directed edges (`source -> target`), excluding `root`.
///
/// Safe on cyclic graphs; a cycle back to `root` does not make it its own descendant.
pub fn edge_descendants(flow: &Flow, root: &str) -> BTreeSet<NodeId> {
    let outgoing = outgoing_adjacency(flow);
    bfs_descendants(flow, &outgoing, root)
}

/// Nodes contained in `root` through the `parentGroupId` chain, at any depth, excluding `root`.
pub fn group_descendants(flow: &Flow, root: &str) -> BTreeSet<NodeId> {
    let members = membership_adjacency(flow);
    bfs_descendants(flow, &members, root)
}

/// Walks `parentGroupId` upwards from `node_id`. Stops at a missing parent or a repeated id.
pub fn group_ancestors(flow: &Flow, node_id: &str) -> GroupChain {
    let mut chain = GroupChain::new();
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    seen.insert(node_id);

    let mut current = flow.node(node_id);
    while let Some(parent_id) = current.and_then(|node| node.parent_group_id()) {
        if !seen.insert(parent_id.as_str()) {
            break;
        }
        let Some(parent) = flow.node(parent_id.as_str()) else {
            break;
        };
        chain.push(parent.id().clone());
        current = Some(parent);
    }

    chain
}

#[cfg(test)]
mod tests {
    use super::{edge_descendants, group_ancestors, group_descendants};
    use crate::model::fixtures::{edge, flow_nested_groups, flow_small_dag, nid, node_at};
    use crate::model::{Flow, NodeId};

    fn ids(set: impl IntoIterator<Item = NodeId>) -> Vec<String> {
        set.into_iter().map(NodeId::into_string).collect()
    }

    #[test]
    fn edge_descendants_follow_direction() {
        let flow = flow_small_dag();
        assert_eq!(ids(edge_descendants(&flow, "a")), vec!["b", "c", "d"]);
        assert_eq!(ids(edge_descendants(&flow, "b")), vec!["d"]);
        assert!(edge_descendants(&flow, "d").is_empty());
    }

    #[test]
    fn edge_descendants_terminate_on_cycles() {
        let flow = Flow::new(
            vec![node_at("a", "A", 0.0, 0.0), node_at("b", "B", 0.0, 0.0)],
            vec![edge("e1", "a", "b"), edge("e2", "b", "a")],
        );
        assert_eq!(ids(edge_descendants(&flow, "a")), vec!["b"]);
    }

    #[test]
    fn unknown_root_has_no_descendants() {
        let flow = flow_small_dag();
        assert!(edge_descendants(&flow, "missing").is_empty());
        assert!(group_descendants(&flow, "missing").is_empty());
    }

    #[test]
    fn group_descendants_include_nested_members() {
        let flow = flow_nested_groups(true, true);
        assert_eq!(ids(group_descendants(&flow, "outer")), vec!["a", "b", "c", "inner"]);
        assert_eq!(ids(group_descendants(&flow, "inner")), vec!["a", "b"]);
        assert!(group_descendants(&flow, "x").is_empty());
    }

    #[test]
    fn group_ancestors_are_nearest_first_and_cycle_safe() {
        let flow = flow_nested_groups(false, false);
        let chain = group_ancestors(&flow, "a");
        assert_eq!(chain.as_slice(), &[nid("inner"), nid("outer")]);

        let mut cyclic = flow.clone();
        cyclic
            .node_mut("outer")
            .expect("outer")
            .set_parent_group_id(Some(nid("inner")));
        let chain = group_ancestors(&cyclic, "a");
        assert_eq!(chain.as_slice(), &[nid("inner"), nid("outer")]);
    }
}
