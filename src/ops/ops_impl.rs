// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowforge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowforge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

/// Node/edge/group mutation helpers used by `apply_op`.
/// Each helper mutates the working copy in place and leaves it untouched on error.
fn generate_node_id(flow: &Flow, preferred: Option<String>, prefix: &str) -> NodeId {
    if let Some(candidate) = preferred.filter(|candidate| !flow.contains_node(candidate)) {
        if let Ok(node_id) = NodeId::new(candidate) {
            return node_id;
        }
    }

    let mut rng = rand::thread_rng();
    loop {
        let candidate = format!("{prefix}_{:08x}", rng.gen::<u32>());
        if !flow.contains_node(&candidate) {
            return NodeId::new(candidate).expect("generated ids are non-empty and slash-free");
        }
    }
}

fn next_edge_id(flow: &Flow, source: &NodeId, target: &NodeId) -> EdgeId {
    let base = format!("e_{source}_{target}");
    let mut candidate = base.clone();
    let mut suffix = 2usize;
    while flow.contains_edge(&candidate) {
        candidate = format!("{base}_{suffix}");
        suffix += 1;
    }
    EdgeId::new(candidate).expect("derived from valid node ids")
}

fn default_node_position(flow: &Flow, parent: Option<&Node>) -> Position {
    match parent {
        Some(parent) => {
            let siblings = flow.edges().iter().filter(|edge| edge.source() == parent.id()).count();
            let origin = parent.position();
            Position::new(origin.x + siblings as f64 * CHILD_OFFSET_X, origin.y + CHILD_OFFSET_Y)
        }
        None => flow
            .nodes()
            .iter()
            .map(Node::position)
            .max_by(|a, b| a.x.total_cmp(&b.x))
            .map(|right_most| Position::new(right_most.x + TOP_LEVEL_OFFSET_X, right_most.y))
            .unwrap_or_default(),
    }
}

fn is_inside_collapsed_group(flow: &Flow, group_id: Option<&NodeId>) -> bool {
    group_id
        .and_then(|group_id| flow.node(group_id.as_str()))
        .is_some_and(Node::is_collapsed_group)
}

fn add_node(flow: &mut Flow, new_node: &NewNode) -> Result<(NodeId, Option<EdgeId>), OpError> {
    let parent = match new_node.parent.as_deref() {
        Some(parent_ref) => Some(
            resolve_node_ref(flow, parent_ref)
                .cloned()
                .ok_or_else(|| node_not_found(flow, parent_ref))?,
        ),
        None => None,
    };

    let node_id = match &new_node.id {
        Some(node_id) if flow.contains_node(node_id.as_str()) => {
            return Err(OpError::NodeAlreadyExists { node_id: node_id.clone() });
        }
        Some(node_id) => node_id.clone(),
        None => {
            let sanitized = sanitize_label(&new_node.label);
            generate_node_id(flow, (!sanitized.is_empty()).then_some(sanitized), "node")
        }
    };

    let position =
        new_node.position.unwrap_or_else(|| default_node_position(flow, parent.as_ref()));
    let mut node = Node::new(node_id.clone(), new_node.label.clone()).with_position(position);
    node.set_description(new_node.description.clone());

    let group_id = parent.as_ref().and_then(Node::parent_group_id).cloned();
    node.set_hidden(is_inside_collapsed_group(flow, group_id.as_ref()));
    node.set_parent_group_id(group_id);
    flow.nodes_mut().push(node);

    let edge_id = parent.map(|parent| {
        let edge_id = next_edge_id(flow, parent.id(), &node_id);
        let edge = Edge::new(edge_id.clone(), parent.id().clone(), node_id.clone())
            .with_label(new_node.edge_label.clone());
        flow.edges_mut().push(edge);
        edge_id
    });

    Ok((node_id, edge_id))
}

fn update_node(flow: &mut Flow, node_id: &NodeId, patch: &NodePatch) -> Result<(), OpError> {
    if !flow.contains_node(node_id.as_str()) {
        return Err(node_not_found(flow, node_id.as_str()));
    }
    let node = flow.node_mut(node_id.as_str()).expect("node exists (checked)");

    if let Some(label) = &patch.label {
        node.set_label(label.clone());
    }
    if let Some(description) = &patch.description {
        node.set_description(Some(description.clone()));
    }
    if let Some(position) = patch.position {
        node.set_position(position);
    }
    Ok(())
}

/// Moves every direct member of `group_id` to `new_parent`. Members stay hidden only while
/// `new_parent` is collapsed or a collapsed subtree still covers them.
fn promote_members(flow: &mut Flow, group_id: &str, new_parent: Option<&NodeId>) {
    let parent_collapsed = is_inside_collapsed_group(flow, new_parent);
    for member in flow
        .nodes_mut()
        .iter_mut()
        .filter(|node| node.parent_group_id().is_some_and(|parent| parent == group_id))
    {
        member.set_parent_group_id(new_parent.cloned());
        member.set_hidden(parent_collapsed || member.subtree_hidden());
        member.set_group_hidden(false);
    }
}

/// Clears `subtreeHidden` on nodes no longer reachable from any collapsed subtree root, and
/// `hidden` on edges with neither endpoint still covered.
fn release_stranded_subtrees(flow: &mut Flow) {
    let covered = flow
        .nodes()
        .iter()
        .filter(|node| node.collapsed() == Some(true))
        .flat_map(|node| edge_descendants(flow, node.id().as_str()))
        .collect::<BTreeSet<NodeId>>();

    let released = flow
        .nodes()
        .iter()
        .filter(|node| node.subtree_hidden() && !covered.contains(node.id()))
        .map(|node| (node.id().clone(), is_inside_collapsed_group(flow, node.parent_group_id())))
        .collect::<Vec<_>>();
    for (node_id, group_collapsed) in released {
        if let Some(node) = flow.node_mut(node_id.as_str()) {
            node.set_subtree_hidden(false);
            node.set_hidden(group_collapsed);
        }
    }

    for edge in flow.edges_mut().iter_mut().filter(|edge| {
        edge.hidden() && !covered.contains(edge.source()) && !covered.contains(edge.target())
    }) {
        edge.set_hidden(false);
    }
}

fn delete_node(flow: &mut Flow, node_id: &NodeId) -> Result<(), OpError> {
    let Some(index) = flow.nodes().iter().position(|node| node.id() == node_id) else {
        return Err(node_not_found(flow, node_id.as_str()));
    };

    let removed = flow.nodes_mut().remove(index);
    flow.edges_mut().retain(|edge| !edge.touches(node_id.as_str()));
    if removed.is_group() {
        promote_members(flow, node_id.as_str(), removed.parent_group_id());
    }
    release_stranded_subtrees(flow);
    Ok(())
}

fn add_edge(
    flow: &mut Flow,
    source_ref: &str,
    target_ref: &str,
    label: Option<&str>,
) -> Result<EdgeId, OpError> {
    let source = resolve_node_ref(flow, source_ref)
        .map(|node| node.id().clone())
        .ok_or_else(|| node_not_found(flow, source_ref))?;
    let target = resolve_node_ref(flow, target_ref)
        .map(|node| node.id().clone())
        .ok_or_else(|| node_not_found(flow, target_ref))?;

    let edge_id = next_edge_id(flow, &source, &target);
    flow.edges_mut().push(Edge::new(edge_id.clone(), source, target).with_label(label));
    Ok(edge_id)
}

fn update_edge(flow: &mut Flow, edge_id: &EdgeId, label: Option<&str>) -> Result<(), OpError> {
    let Some(edge) = flow.edge_mut(edge_id.as_str()) else {
        return Err(OpError::EdgeNotFound { edge_id: edge_id.to_string() });
    };
    edge.set_label(label);
    Ok(())
}

fn delete_edge(flow: &mut Flow, edge_id: &EdgeId) -> Result<(), OpError> {
    let Some(index) = flow.edges().iter().position(|edge| edge.id() == edge_id) else {
        return Err(OpError::EdgeNotFound { edge_id: edge_id.to_string() });
    };
    flow.edges_mut().remove(index);
    release_stranded_subtrees(flow);
    Ok(())
}

fn create_group(
    flow: &mut Flow,
    member_ids: &[String],
    label: Option<&str>,
    position: Option<Position>,
) -> Result<NodeId, OpError> {
    let shared_parent = validate_group_membership(flow, member_ids)?;

    let label = label.unwrap_or(DEFAULT_GROUP_LABEL);
    let sanitized = sanitize_label(label);
    let group_id = generate_node_id(
        flow,
        (!sanitized.is_empty()).then(|| format!("group_{sanitized}")),
        "group",
    );

    let position = position.unwrap_or_else(|| {
        let members = member_ids
            .iter()
            .filter_map(|member_id| flow.node(member_id))
            .map(Node::position)
            .collect::<Vec<_>>();
        let min_x = members.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
        let mean_y = members.iter().map(|p| p.y).sum::<f64>() / members.len() as f64;
        Position::new(min_x, mean_y)
    });

    let mut group = Node::new_group(group_id.clone(), label).with_position(position);
    group.set_hidden(is_inside_collapsed_group(flow, shared_parent.as_ref()));
    group.set_parent_group_id(shared_parent);

    for member in flow
        .nodes_mut()
        .iter_mut()
        .filter(|node| member_ids.iter().any(|member_id| node.id() == member_id.as_str()))
    {
        member.set_parent_group_id(Some(group_id.clone()));
        member.set_hidden(true);
    }
    flow.nodes_mut().push(group);

    Ok(group_id)
}

fn require_group<'a>(flow: &'a Flow, group_id: &NodeId) -> Result<&'a Node, OpError> {
    let Some(group) = flow.node(group_id.as_str()) else {
        return Err(node_not_found(flow, group_id.as_str()));
    };
    if !group.is_group() {
        return Err(OpError::NotAGroup { node_id: group_id.clone() });
    }
    Ok(group)
}

fn ungroup(flow: &mut Flow, group_id: &NodeId) -> Result<(), OpError> {
    let parent = require_group(flow, group_id)?.parent_group_id().cloned();
    if flow.group_members(group_id.as_str()).next().is_none() {
        return Err(OpError::EmptyGroup { group_id: group_id.clone() });
    }

    flow.nodes_mut().retain(|node| node.id() != group_id);
    flow.edges_mut().retain(|edge| !edge.touches(group_id.as_str()));
    promote_members(flow, group_id.as_str(), parent.as_ref());
    release_stranded_subtrees(flow);
    Ok(())
}

fn toggle_group_expansion(flow: &mut Flow, group_id: &NodeId, expand: bool) -> Result<(), OpError> {
    require_group(flow, group_id)?;

    for node in flow.nodes_mut().iter_mut() {
        if node.id() == group_id {
            node.set_is_collapsed(Some(!expand));
        } else if node.parent_group_id() == Some(group_id) {
            node.set_hidden(!expand);
        }
    }
    Ok(())
}

fn toggle_subtree_collapse(
    flow: &mut Flow,
    node_id: &NodeId,
    collapsed: bool,
) -> Result<(), OpError> {
    if collapse_subtree_by_handles(flow, node_id.as_str(), collapsed, edge_descendants) {
        Ok(())
    } else {
        Err(node_not_found(flow, node_id.as_str()))
    }
}

/// Applies the layout result only if some node moved by more than [`LAYOUT_TOLERANCE`] on an
/// axis; otherwise the flow is left exactly as it was.
fn auto_layout(
    flow: &mut Flow,
    direction: LayoutDirection,
    layout: &dyn LayoutEngine,
) -> Result<bool, OpError> {
    let placed = layout.layout(flow.nodes(), flow.edges(), direction, NodeDims::default())?;

    let moved = placed.iter().any(|placement| {
        flow.node(placement.node_id.as_str())
            .is_some_and(|node| !node.position().approx_eq(&placement.position, LAYOUT_TOLERANCE))
    });
    if !moved {
        return Ok(false);
    }

    for placement in placed {
        if let Some(node) = flow.node_mut(placement.node_id.as_str()) {
            node.set_position(placement.position);
        }
    }
    Ok(true)
}
