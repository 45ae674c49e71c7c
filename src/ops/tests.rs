// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowforge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowforge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use rstest::rstest;
use serde_json::json;

use super::*;
use crate::layout::{LayeredLayout, NodePosition};
use crate::model::fixtures::{eid, flow_nested_groups, flow_pair_with_external, flow_small_dag, nid};
use crate::visibility::visible_flow;

/// Returns the current positions, optionally nudged by a fixed delta.
struct NudgeLayout {
    dx: f64,
}

impl LayoutEngine for NudgeLayout {
    fn layout(
        &self,
        nodes: &[Node],
        _edges: &[Edge],
        _direction: LayoutDirection,
        _dims: NodeDims,
    ) -> Result<Vec<NodePosition>, LayoutError> {
        Ok(nodes
            .iter()
            .map(|node| {
                let position = node.position();
                NodePosition {
                    node_id: node.id().clone(),
                    position: Position::new(position.x + self.dx, position.y),
                }
            })
            .collect())
    }
}

fn apply(flow: &Flow, op: Op) -> Applied {
    apply_op(flow, &op, &LayeredLayout::default()).expect("op applies")
}

fn apply_err(flow: &Flow, op: Op) -> OpError {
    apply_op(flow, &op, &LayeredLayout::default()).expect_err("op fails")
}

fn call(flow: &Flow, operation: &str, params: serde_json::Value) -> OpOutcome {
    execute_tool_call(flow, &ToolCall::new(operation, params), &LayeredLayout::default())
}

fn edge_ids(flow: &Flow) -> Vec<&str> {
    flow.edges().iter().map(|edge| edge.id().as_str()).collect()
}

#[rstest]
#[case("Home", "home")]
#[case("Login / Auth!", "login_auth")]
#[case("  --Sign__Up--  ", "sign_up")]
#[case("Step 2: Verify", "step_2_verify")]
#[case("!!!", "")]
fn sanitize_label_collapses_and_trims(#[case] label: &str, #[case] expected: &str) {
    assert_eq!(sanitize_label(label), expected);
}

#[test]
fn labels_become_ids_and_children_link_to_their_parent() {
    let flow = apply(&Flow::default(), Op::AddNode(NewNode::labeled("Home"))).flow;
    let applied =
        apply(&flow, Op::AddNode(NewNode::labeled("Login / Auth!").with_parent("Home")));

    assert_eq!(applied.node_id, Some(nid("login_auth")));
    assert_eq!(applied.edge_id, Some(eid("e_home_login_auth")));

    let flow = applied.flow;
    let ids = flow.nodes().iter().map(|node| node.id().as_str()).collect::<Vec<_>>();
    assert_eq!(ids, vec!["home", "login_auth"]);
    assert_eq!(flow.edges().len(), 1);
    let edge = &flow.edges()[0];
    assert_eq!((edge.source().as_str(), edge.target().as_str()), ("home", "login_auth"));
}

#[test]
fn tool_call_scenario_reports_entity_ids() {
    let first = call(&Flow::default(), "addNode", json!({ "label": "Home" }));
    assert!(first.success);
    assert_eq!(first.node_id, Some(nid("home")));

    let second = call(
        first.updated_flow.as_ref().expect("flow"),
        "addNode",
        json!({ "label": "Login / Auth!", "parentNodeId": "Home", "edgeLabel": "next" }),
    );
    assert!(second.success, "{:?}", second.error);
    let flow = second.updated_flow.expect("flow");
    assert_eq!(flow.edge("e_home_login_auth").and_then(Edge::label), Some("next"));
}

#[test]
fn generated_id_collision_falls_back_to_random_id() {
    let flow = apply(&Flow::default(), Op::AddNode(NewNode::labeled("Home"))).flow;
    let applied = apply(&flow, Op::AddNode(NewNode::labeled("Home")));

    let node_id = applied.node_id.expect("node id");
    let suffix = node_id.as_str().strip_prefix("node_").expect("random prefix");
    assert_eq!(suffix.len(), 8);
    assert!(suffix.chars().all(|ch| ch.is_ascii_hexdigit()));

    let unlabeled = apply(&flow, Op::AddNode(NewNode::labeled("???")));
    assert!(unlabeled.node_id.expect("node id").as_str().starts_with("node_"));
}

#[test]
fn explicit_duplicate_id_and_unknown_parent_fail() {
    let flow = flow_small_dag();
    assert_eq!(
        apply_err(&flow, Op::AddNode(NewNode::labeled("Again").with_id(nid("a")))),
        OpError::NodeAlreadyExists { node_id: nid("a") }
    );

    let err = apply_err(&flow, Op::AddNode(NewNode::labeled("Child").with_parent("zzz")));
    assert!(matches!(err, OpError::NodeNotFound { ref node_ref, .. } if node_ref == "zzz"));
}

#[test]
fn unknown_references_carry_a_suggestion() {
    let flow = apply(&Flow::default(), Op::AddNode(NewNode::labeled("Checkout"))).flow;
    let err = apply_err(&flow, Op::AddNode(NewNode::labeled("Pay").with_parent("Chekout")));

    assert_eq!(
        err,
        OpError::NodeNotFound { node_ref: "Chekout".to_owned(), suggestion: Some("checkout".into()) }
    );
    assert!(err.to_string().contains("did you mean \"checkout\""));
}

#[test]
fn children_fan_out_below_their_parent() {
    let mut flow = Flow::default();
    flow = apply(
        &flow,
        Op::AddNode(NewNode::labeled("Root").with_position(Position::new(10.0, 20.0))),
    )
    .flow;
    flow = apply(&flow, Op::AddNode(NewNode::labeled("First").with_parent("root"))).flow;
    flow = apply(&flow, Op::AddNode(NewNode::labeled("Second").with_parent("root"))).flow;
    flow = apply(&flow, Op::AddNode(NewNode::labeled("Loose"))).flow;

    let at = |id: &str| flow.node(id).expect("node").position();
    assert_eq!(at("first"), Position::new(10.0, 140.0));
    assert_eq!(at("second"), Position::new(210.0, 140.0));
    assert_eq!(at("loose"), Position::new(430.0, 140.0));
}

#[test]
fn new_child_inherits_its_parents_group() {
    let flow = flow_nested_groups(false, true);
    let applied = apply(&flow, Op::AddNode(NewNode::labeled("Sibling").with_parent("a")));
    let node = applied.flow.node("sibling").expect("new node");
    assert_eq!(node.parent_group_id(), Some(&nid("inner")));
    assert!(node.hidden(), "parent group is collapsed");

    let applied = apply(&flow, Op::AddNode(NewNode::labeled("Other").with_parent("c")));
    let node = applied.flow.node("other").expect("new node");
    assert_eq!(node.parent_group_id(), Some(&nid("outer")));
    assert!(!node.hidden());
}

#[test]
fn update_node_touches_only_supplied_fields() {
    let flow = flow_small_dag();
    let patch = NodePatch { label: Some("Renamed".to_owned()), ..NodePatch::default() };
    let updated = apply(&flow, Op::UpdateNode { node_id: nid("a"), patch }).flow;

    let node = updated.node("a").expect("a");
    assert_eq!(node.label(), "Renamed");
    assert_eq!(node.position(), flow.node("a").expect("a").position());

    let err = apply_err(&flow, Op::UpdateNode { node_id: nid("nope"), patch: NodePatch::default() });
    assert!(matches!(err, OpError::NodeNotFound { .. }));
}

#[test]
fn delete_node_removes_exactly_the_touching_edges() {
    let flow = flow_small_dag();
    let applied = apply(&flow, Op::DeleteNode { node_id: nid("b") });

    assert!(!applied.flow.contains_node("b"));
    assert_eq!(applied.flow.nodes().len(), 3);
    assert_eq!(edge_ids(&applied.flow), vec!["e_ac", "e_cd"]);
    assert!(flow.contains_node("b"), "input flow is untouched");
}

#[test]
fn deleting_a_group_promotes_its_members() {
    let flow = flow_nested_groups(true, true);
    let updated = apply(&flow, Op::DeleteNode { node_id: nid("inner") }).flow;

    let view = visible_flow(&updated);
    for id in ["a", "b"] {
        let node = updated.node(id).expect("member");
        assert_eq!(node.parent_group_id(), Some(&nid("outer")));
        assert!(node.hidden(), "outer is still collapsed");
        assert_eq!(node.hidden(), view.node(id).expect("view").hidden());
    }
}

#[test]
fn ungroup_inside_a_collapsed_parent_keeps_members_hidden() {
    let flow = flow_nested_groups(true, false);
    let updated = apply(&flow, Op::Ungroup { group_id: nid("inner") }).flow;

    let view = visible_flow(&updated);
    for id in ["a", "b"] {
        let stored = updated.node(id).expect("member");
        assert!(stored.hidden());
        assert_eq!(stored.hidden(), view.node(id).expect("view").hidden());
    }
}

#[test]
fn add_edge_resolves_labels_and_allows_parallel_edges() {
    let flow = flow_small_dag();
    let first = apply(
        &flow,
        Op::AddEdge { source: "A".to_owned(), target: "d".to_owned(), label: None },
    );
    assert_eq!(first.edge_id, Some(eid("e_a_d")));

    let second = apply(
        &first.flow,
        Op::AddEdge { source: "a".to_owned(), target: "D".to_owned(), label: Some("again".into()) },
    );
    assert_eq!(second.edge_id, Some(eid("e_a_d_2")));
    assert_eq!(second.flow.edges().len(), 6);

    let err = apply_err(
        &flow,
        Op::AddEdge { source: "a".to_owned(), target: "ghost".to_owned(), label: None },
    );
    assert!(matches!(err, OpError::NodeNotFound { ref node_ref, .. } if node_ref == "ghost"));
}

#[test]
fn edge_updates_and_deletes_require_known_ids() {
    let flow = flow_small_dag();
    let updated =
        apply(&flow, Op::UpdateEdge { edge_id: eid("e_ab"), label: Some("yes".to_owned()) }).flow;
    assert_eq!(updated.edge("e_ab").and_then(Edge::label), Some("yes"));

    let deleted = apply(&updated, Op::DeleteEdge { edge_id: eid("e_ab") }).flow;
    assert_eq!(edge_ids(&deleted), vec!["e_ac", "e_bd", "e_cd"]);
    assert_eq!(deleted.nodes(), flow.nodes(), "no cascade into nodes");

    assert_eq!(
        apply_err(&flow, Op::DeleteEdge { edge_id: eid("e_zz") }),
        OpError::EdgeNotFound { edge_id: "e_zz".to_owned() }
    );
    assert!(matches!(
        apply_err(&flow, Op::UpdateEdge { edge_id: eid("e_zz"), label: None }),
        OpError::EdgeNotFound { .. }
    ));
}

#[test]
fn create_group_collapses_and_hides_members() {
    let flow = flow_pair_with_external();
    let applied = apply(
        &flow,
        Op::CreateGroup {
            member_ids: vec!["a".to_owned(), "b".to_owned()],
            label: Some("Auth Flow".to_owned()),
            position: None,
        },
    );

    let group_id = applied.group_id.expect("group id");
    assert_eq!(group_id.as_str(), "group_auth_flow");
    let group = applied.flow.node(group_id.as_str()).expect("group node");
    assert!(group.is_group());
    assert_eq!(group.is_collapsed(), Some(true));
    assert_eq!(group.position(), Position::new(0.0, 50.0));
    assert_eq!(group.parent_group_id(), None);

    for id in ["a", "b"] {
        let member = applied.flow.node(id).expect("member");
        assert_eq!(member.parent_group_id(), Some(&group_id));
        assert!(member.hidden());
    }
    assert_eq!(applied.flow.edges(), flow.edges(), "no synthetic edges are stored");
}

#[test]
fn create_group_nests_inside_the_shared_parent() {
    let flow = flow_nested_groups(false, false);
    let applied = apply(
        &flow,
        Op::CreateGroup { member_ids: vec!["a".into(), "b".into()], label: None, position: None },
    );
    let group_id = applied.group_id.expect("group id");
    assert_eq!(group_id.as_str(), "group_group");
    let group = applied.flow.node("group_group").expect("group");
    assert_eq!(group.parent_group_id(), Some(&nid("inner")));
}

#[test]
fn create_group_rejects_ancestor_and_descendant_together() {
    let flow = flow_nested_groups(false, false);
    let err = apply_err(
        &flow,
        Op::CreateGroup {
            member_ids: vec!["outer".into(), "a".into()],
            label: None,
            position: None,
        },
    );
    assert!(matches!(
        err,
        OpError::GroupMembership(GroupMembershipError::CircularReference { .. })
    ));
}

#[test]
fn ungroup_promotes_members_and_drops_group_edges() {
    let mut flow = flow_nested_groups(false, true);
    flow.edges_mut().push(crate::model::fixtures::edge("e_inner_x", "inner", "x"));
    flow.node_mut("a").expect("a").set_subtree_hidden(true);

    let applied = apply(&flow, Op::Ungroup { group_id: nid("inner") });
    assert!(!applied.flow.contains_node("inner"));
    assert!(!applied.flow.contains_edge("e_inner_x"));
    for id in ["a", "b"] {
        let node = applied.flow.node(id).expect("member");
        assert_eq!(node.parent_group_id(), Some(&nid("outer")));
        assert!(!node.hidden());
        assert!(!node.subtree_hidden());
    }
}

#[test]
fn ungroup_rejects_unknown_plain_and_empty_targets() {
    let mut flow = flow_nested_groups(false, false);
    flow.nodes_mut().push(Node::new_group(nid("empty"), "Empty"));

    assert!(matches!(
        apply_err(&flow, Op::Ungroup { group_id: nid("zzz") }),
        OpError::NodeNotFound { .. }
    ));
    assert_eq!(
        apply_err(&flow, Op::Ungroup { group_id: nid("a") }),
        OpError::NotAGroup { node_id: nid("a") }
    );
    assert_eq!(
        apply_err(&flow, Op::Ungroup { group_id: nid("empty") }),
        OpError::EmptyGroup { group_id: nid("empty") }
    );
}

#[test]
fn toggle_group_expansion_touches_direct_members_only() {
    let mut flow = flow_nested_groups(true, true);
    for node in flow.nodes_mut() {
        if node.parent_group_id().is_some() {
            node.set_hidden(true);
        }
    }

    let expanded =
        apply(&flow, Op::ToggleGroupExpansion { group_id: nid("outer"), expand: true }).flow;
    assert_eq!(expanded.node("outer").expect("outer").is_collapsed(), Some(false));
    assert!(!expanded.node("inner").expect("inner").hidden());
    assert!(!expanded.node("c").expect("c").hidden());
    assert!(expanded.node("a").expect("a").hidden(), "nested members are left alone");
    assert_eq!(expanded.node("inner").expect("inner").is_collapsed(), Some(true));

    assert_eq!(
        apply_err(&flow, Op::ToggleGroupExpansion { group_id: nid("x"), expand: true }),
        OpError::NotAGroup { node_id: nid("x") }
    );
}

#[test]
fn grouped_pair_collapses_into_a_synthetic_boundary_edge() {
    let flow = flow_pair_with_external();
    let grouped = apply(
        &flow,
        Op::CreateGroup { member_ids: vec!["a".into(), "b".into()], label: None, position: None },
    );
    let group_id = grouped.group_id.expect("group id");
    let collapsed = apply(
        &grouped.flow,
        Op::ToggleGroupExpansion { group_id: group_id.clone(), expand: false },
    )
    .flow;

    let view = visible_flow(&collapsed);
    assert!(view.node("a").expect("a").hidden());
    assert!(view.node("b").expect("b").hidden());
    assert!(!view.node(group_id.as_str()).expect("group").hidden());

    let synthetic = view
        .edges()
        .iter()
        .find(|edge| edge.is_synthetic_group_edge())
        .expect("synthetic edge");
    assert_eq!(synthetic.source(), &group_id);
    assert_eq!(synthetic.target().as_str(), "x");
}

#[test]
fn toggle_subtree_collapse_uses_edge_descendants() {
    let flow = flow_small_dag();
    let collapsed =
        apply(&flow, Op::ToggleSubtreeCollapse { node_id: nid("b"), collapsed: true }).flow;
    assert!(collapsed.node("d").expect("d").subtree_hidden());
    assert!(!collapsed.node("c").expect("c").hidden());

    let err = apply_err(&flow, Op::ToggleSubtreeCollapse { node_id: nid("zzz"), collapsed: true });
    assert!(matches!(err, OpError::NodeNotFound { .. }));
}

#[test]
fn deleting_a_collapsed_root_reveals_its_former_subtree() {
    let flow = flow_small_dag();
    let collapsed =
        apply(&flow, Op::ToggleSubtreeCollapse { node_id: nid("a"), collapsed: true }).flow;
    let updated = apply(&collapsed, Op::DeleteNode { node_id: nid("a") }).flow;

    for id in ["b", "c", "d"] {
        let node = updated.node(id).expect("survivor");
        assert!(!node.subtree_hidden(), "{id} has no collapsed ancestor left");
        assert!(!node.hidden());
    }
    assert!(visible_flow(&updated).nodes().iter().all(|node| !node.hidden()));
    assert!(updated.edges().iter().all(|edge| !edge.hidden()));
}

#[test]
fn deleting_the_edge_into_a_collapsed_subtree_reveals_it() {
    let flow = flow_small_dag();
    let collapsed =
        apply(&flow, Op::ToggleSubtreeCollapse { node_id: nid("b"), collapsed: true }).flow;
    assert!(collapsed.node("d").expect("d").hidden());

    let updated = apply(&collapsed, Op::DeleteEdge { edge_id: eid("e_bd") }).flow;
    let d = updated.node("d").expect("d");
    assert!(!d.subtree_hidden());
    assert!(!d.hidden());
    assert!(!updated.edge("e_cd").expect("e_cd").hidden());
    assert!(!visible_flow(&updated).node("d").expect("d").hidden());
}

#[test]
fn nodes_still_under_a_collapsed_root_stay_hidden_after_deletes() {
    let flow = flow_small_dag();
    let collapsed =
        apply(&flow, Op::ToggleSubtreeCollapse { node_id: nid("a"), collapsed: true }).flow;
    let updated = apply(&collapsed, Op::DeleteNode { node_id: nid("c") }).flow;

    for id in ["b", "d"] {
        let node = updated.node(id).expect("covered");
        assert!(node.subtree_hidden());
        assert!(node.hidden());
    }
    assert!(updated.edge("e_bd").expect("e_bd").hidden());
}

#[rstest]
#[case(json!("yes"))]
#[case(json!(1))]
#[case(json!("true"))]
#[case(json!(null))]
fn toggle_subtree_collapse_requires_a_strict_boolean(#[case] collapsed: serde_json::Value) {
    let outcome = call(
        &flow_small_dag(),
        "toggleSubtreeCollapse",
        json!({ "nodeId": "a", "collapsed": collapsed }),
    );
    assert!(!outcome.success);
    assert!(outcome.updated_flow.is_none());
    let error = outcome.error.expect("error message");
    assert!(error.contains("boolean"), "{error}");
    assert!(error.contains("collapsed"), "{error}");
}

#[test]
fn auto_layout_within_tolerance_reports_no_change() {
    let flow = flow_small_dag();
    let op = Op::AutoLayout { direction: LayoutDirection::TopBottom };

    let noise = apply_op(&flow, &op, &NudgeLayout { dx: 0.005 }).expect("layout");
    assert!(!noise.changed);
    assert_eq!(noise.flow, flow);

    let moved = apply_op(&flow, &op, &NudgeLayout { dx: 5.0 }).expect("layout");
    assert!(moved.changed);
    assert_eq!(moved.flow.node("a").expect("a").position(), Position::new(5.0, 0.0));
}

#[test]
fn auto_layout_through_tool_call_accepts_direction() {
    let outcome = call(&flow_small_dag(), "autoLayout", json!({ "direction": "LR" }));
    assert!(outcome.success);
    assert_eq!(outcome.changed, Some(true));

    let bad = call(&flow_small_dag(), "autoLayout", json!({ "direction": "sideways" }));
    assert!(!bad.success);
}

#[test]
fn unknown_operations_are_rejected_with_a_hint() {
    let outcome = call(&flow_small_dag(), "addnode", json!({ "label": "x" }));
    assert!(!outcome.success);
    assert_eq!(
        outcome.error.as_deref(),
        Some("unknown operation \"addnode\" (did you mean \"addNode\"?)")
    );
}

#[rstest]
#[case::missing_label("addNode", json!({}), "`label` is required")]
#[case::wrong_type("updateNode", json!({ "nodeId": 3 }), "`nodeId` must be a string")]
#[case::bad_id("deleteNode", json!({ "nodeId": "a/b" }), "`nodeId` is not a valid id")]
#[case::bad_members("createGroup", json!({ "memberIds": "a,b" }), "`memberIds` must be an array")]
#[case::bad_position("addNode", json!({ "label": "x", "position": { "x": 1 } }), "`position` must be")]
#[case::not_an_object("deleteEdge", json!(["e_ab"]), "`params` must be a JSON object")]
fn malformed_params_fail_uniformly(
    #[case] operation: &str,
    #[case] params: serde_json::Value,
    #[case] expected: &str,
) {
    let outcome = call(&flow_small_dag(), operation, params);
    assert!(!outcome.success);
    let error = outcome.error.expect("error");
    assert!(error.contains(expected), "{error}");
}

#[test]
fn outcome_serializes_in_camel_case() {
    let outcome = call(&Flow::default(), "addNode", json!({ "label": "Home" }));
    let value = serde_json::to_value(&outcome).expect("serialize");
    assert_eq!(value["success"], json!(true));
    assert_eq!(value["nodeId"], json!("home"));
    assert!(value["updatedFlow"]["nodes"].is_array());
    assert!(value.get("error").is_none());
}
