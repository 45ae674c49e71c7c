// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowforge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowforge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use super::flow::{Edge, Flow, Node, Position};
use super::ids::{EdgeId, NodeId};

pub(crate) fn nid(value: &str) -> NodeId {
    NodeId::new(value).expect("node id")
}

pub(crate) fn eid(value: &str) -> EdgeId {
    EdgeId::new(value).expect("edge id")
}

pub(crate) fn node_at(id: &str, label: &str, x: f64, y: f64) -> Node {
    Node::new(nid(id), label).with_position(Position::new(x, y))
}

pub(crate) fn edge(id: &str, source: &str, target: &str) -> Edge {
    Edge::new(eid(id), nid(source), nid(target))
}

/// `a -> b, a -> c, b -> d, c -> d`.
pub(crate) fn flow_small_dag() -> Flow {
    Flow::new(
        vec![
            node_at("a", "A", 0.0, 0.0),
            node_at("b", "B", 100.0, 0.0),
            node_at("c", "C", 100.0, 100.0),
            node_at("d", "D", 200.0, 50.0),
        ],
        vec![
            edge("e_ab", "a", "b"),
            edge("e_ac", "a", "c"),
            edge("e_bd", "b", "d"),
            edge("e_cd", "c", "d"),
        ],
    )
}

/// `a`, `b` and an outside node `x`, with `a -> x` and `x -> b`.
pub(crate) fn flow_pair_with_external() -> Flow {
    Flow::new(
        vec![
            node_at("a", "A", 0.0, 0.0),
            node_at("b", "B", 0.0, 100.0),
            node_at("x", "External", 300.0, 50.0),
        ],
        vec![edge("e_ax", "a", "x"), edge("e_xb", "x", "b")],
    )
}

/// Two-level nesting: `outer` contains `inner` and `c`; `inner` contains `a` and `b`.
pub(crate) fn flow_nested_groups(outer_collapsed: bool, inner_collapsed: bool) -> Flow {
    let mut outer = Node::new_group(nid("outer"), "Outer");
    outer.set_is_collapsed(Some(outer_collapsed));

    let mut inner = Node::new_group(nid("inner"), "Inner");
    inner.set_is_collapsed(Some(inner_collapsed));
    inner.set_parent_group_id(Some(nid("outer")));

    let mut a = node_at("a", "A", 0.0, 0.0);
    a.set_parent_group_id(Some(nid("inner")));
    let mut b = node_at("b", "B", 0.0, 100.0);
    b.set_parent_group_id(Some(nid("inner")));
    let mut c = node_at("c", "C", 100.0, 0.0);
    c.set_parent_group_id(Some(nid("outer")));

    Flow::new(
        vec![outer, inner, a, b, c, node_at("x", "X", 400.0, 0.0)],
        vec![edge("e_ax", "a", "x"), edge("e_ab", "a", "b"), edge("e_cx", "c", "x")],
    )
}
