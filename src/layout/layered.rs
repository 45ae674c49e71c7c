// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowforge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowforge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::{BTreeMap, BTreeSet};

use super::{LayoutDirection, LayoutEngine, LayoutError, NodeDims, NodePosition};
use crate::model::{Edge, Node, Position};

/// Deterministic layered layout.
///
/// - Orders nodes topologically; cycles are broken greedily at the node with the fewest
///   unresolved predecessors, so cyclic flows still lay out.
/// - Assigns layers by longest path over the forward edges of that order.
/// - Orders each layer with one downward barycenter sweep; ties keep flow insertion order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayeredLayout {
    node_gap: f64,
    layer_gap: f64,
}

impl Default for LayeredLayout {
    fn default() -> Self {
        Self { node_gap: 40.0, layer_gap: 80.0 }
    }
}

impl LayeredLayout {
    pub fn new(node_gap: f64, layer_gap: f64) -> Self {
        Self { node_gap, layer_gap }
    }

    pub fn node_gap(&self) -> f64 {
        self.node_gap
    }

    pub fn layer_gap(&self) -> f64 {
        self.layer_gap
    }
}

struct Graph {
    outgoing: Vec<Vec<usize>>,
    predecessors: Vec<Vec<usize>>,
}

fn build_graph(nodes: &[Node], edges: &[Edge]) -> Result<Graph, LayoutError> {
    let index = nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| (node.id().as_str(), idx))
        .collect::<BTreeMap<_, _>>();

    let mut outgoing = vec![Vec::<usize>::new(); nodes.len()];
    let mut predecessors = vec![Vec::<usize>::new(); nodes.len()];

    for edge in edges {
        let endpoint = |node_id: &str| {
            index.get(node_id).copied().ok_or_else(|| LayoutError::UnknownNode {
                edge_id: edge.id().to_string(),
                node_id: node_id.to_owned(),
            })
        };
        let from = endpoint(edge.source().as_str())?;
        let to = endpoint(edge.target().as_str())?;
        if from == to {
            continue;
        }
        outgoing[from].push(to);
        predecessors[to].push(from);
    }

    for list in outgoing.iter_mut().chain(predecessors.iter_mut()) {
        list.sort_unstable();
        list.dedup();
    }

    Ok(Graph { outgoing, predecessors })
}

fn topo_order(graph: &Graph) -> Vec<usize> {
    let count = graph.outgoing.len();
    let mut indegree = graph.predecessors.iter().map(Vec::len).collect::<Vec<_>>();
    let mut placed = vec![false; count];
    let mut ready = (0..count).filter(|&idx| indegree[idx] == 0).collect::<BTreeSet<_>>();
    let mut order = Vec::with_capacity(count);

    loop {
        while let Some(next) = ready.pop_first() {
            placed[next] = true;
            order.push(next);
            for &to in &graph.outgoing[next] {
                if placed[to] {
                    continue;
                }
                indegree[to] = indegree[to].saturating_sub(1);
                if indegree[to] == 0 {
                    ready.insert(to);
                }
            }
        }

        if order.len() == count {
            return order;
        }

        // Only cycles remain; release the node closest to being ready.
        let breaker = (0..count)
            .filter(|&idx| !placed[idx])
            .min_by_key(|&idx| (indegree[idx], idx))
            .expect("an unplaced node remains");
        ready.insert(breaker);
    }
}

fn assign_layers(order: &[usize], graph: &Graph) -> Vec<usize> {
    let mut rank = vec![0usize; order.len()];
    for (pos, &idx) in order.iter().enumerate() {
        rank[idx] = pos;
    }

    let mut layers = vec![0usize; order.len()];
    for &from in order {
        for &to in &graph.outgoing[from] {
            if rank[to] > rank[from] {
                layers[to] = layers[to].max(layers[from] + 1);
            }
        }
    }
    layers
}

fn barycenter(
    node: usize,
    prev_positions: &[Option<usize>],
    graph: &Graph,
) -> Option<(usize, usize)> {
    let (sum, count) = graph.predecessors[node]
        .iter()
        .filter_map(|&pred| prev_positions[pred])
        .fold((0usize, 0usize), |(sum, count), pos| (sum + pos, count + 1));
    (count > 0).then_some((sum, count))
}

fn sort_layer_by_barycenter(
    layer_nodes: &mut [usize],
    prev_positions: &[Option<usize>],
    graph: &Graph,
) {
    layer_nodes.sort_by(|&a, &b| {
        match (barycenter(a, prev_positions, graph), barycenter(b, prev_positions, graph)) {
            (None, None) => a.cmp(&b),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (Some((sum_a, count_a)), Some((sum_b, count_b))) => {
                // sum_a/count_a vs sum_b/count_b without floats.
                let left = (sum_a as u128) * (count_b as u128);
                let right = (sum_b as u128) * (count_a as u128);
                left.cmp(&right).then_with(|| a.cmp(&b))
            }
        }
    });
}

impl LayoutEngine for LayeredLayout {
    fn layout(
        &self,
        nodes: &[Node],
        edges: &[Edge],
        direction: LayoutDirection,
        dims: NodeDims,
    ) -> Result<Vec<NodePosition>, LayoutError> {
        let valid = |value: f64| value.is_finite() && value > 0.0;
        if !valid(dims.width) || !valid(dims.height) {
            return Err(LayoutError::InvalidDims { width: dims.width, height: dims.height });
        }
        if nodes.is_empty() {
            return Ok(Vec::new());
        }

        let graph = build_graph(nodes, edges)?;
        let order = topo_order(&graph);
        let node_layers = assign_layers(&order, &graph);

        let max_layer = node_layers.iter().copied().max().unwrap_or(0);
        let mut layers = vec![Vec::<usize>::new(); max_layer + 1];
        for (idx, &layer) in node_layers.iter().enumerate() {
            layers[layer].push(idx);
        }

        for layer_idx in 1..layers.len() {
            let mut prev_positions = vec![None; nodes.len()];
            for (pos, &idx) in layers[layer_idx - 1].iter().enumerate() {
                prev_positions[idx] = Some(pos);
            }
            sort_layer_by_barycenter(&mut layers[layer_idx], &prev_positions, &graph);
        }

        let (across_size, along_size) = if direction.is_horizontal() {
            (dims.height, dims.width)
        } else {
            (dims.width, dims.height)
        };
        let across_step = across_size + self.node_gap;
        let along_step = along_size + self.layer_gap;
        let widest = layers.iter().map(Vec::len).max().unwrap_or(0);

        let mut positions = vec![Position::default(); nodes.len()];
        for (layer, layer_nodes) in layers.iter().enumerate() {
            let offset = (widest - layer_nodes.len()) as f64 * across_step / 2.0;
            let along_layer = match direction {
                LayoutDirection::BottomTop | LayoutDirection::RightLeft => max_layer - layer,
                LayoutDirection::TopBottom | LayoutDirection::LeftRight => layer,
            };
            let along = along_layer as f64 * along_step;

            for (slot, &idx) in layer_nodes.iter().enumerate() {
                let across = offset + slot as f64 * across_step;
                positions[idx] = if direction.is_horizontal() {
                    Position::new(along, across)
                } else {
                    Position::new(across, along)
                };
            }
        }

        Ok(nodes
            .iter()
            .zip(positions)
            .map(|(node, position)| NodePosition { node_id: node.id().clone(), position })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::LayeredLayout;
    use crate::layout::{LayoutDirection, LayoutEngine, LayoutError, NodeDims};
    use crate::model::fixtures::{edge, flow_small_dag, node_at};
    use crate::model::{Flow, Position};

    fn positions(flow: &Flow, direction: LayoutDirection) -> Vec<(String, Position)> {
        LayeredLayout::default()
            .layout(flow.nodes(), flow.edges(), direction, NodeDims::default())
            .expect("layout")
            .into_iter()
            .map(|placed| (placed.node_id.into_string(), placed.position))
            .collect()
    }

    fn at(flow: &Flow, direction: LayoutDirection, node_id: &str) -> Position {
        positions(flow, direction)
            .into_iter()
            .find(|(id, _)| id == node_id)
            .map(|(_, position)| position)
            .expect("node placed")
    }

    #[test]
    fn top_bottom_layers_follow_longest_path() {
        let flow = flow_small_dag();
        // width 172 + gap 40 across, height 36 + gap 80 along.
        assert_eq!(at(&flow, LayoutDirection::TopBottom, "a"), Position::new(106.0, 0.0));
        assert_eq!(at(&flow, LayoutDirection::TopBottom, "b"), Position::new(0.0, 116.0));
        assert_eq!(at(&flow, LayoutDirection::TopBottom, "c"), Position::new(212.0, 116.0));
        assert_eq!(at(&flow, LayoutDirection::TopBottom, "d"), Position::new(106.0, 232.0));
    }

    #[test]
    fn horizontal_directions_swap_axes() {
        let flow = flow_small_dag();
        assert_eq!(at(&flow, LayoutDirection::LeftRight, "a"), Position::new(0.0, 38.0));
        assert_eq!(at(&flow, LayoutDirection::LeftRight, "d").x, 504.0);
        assert_eq!(at(&flow, LayoutDirection::RightLeft, "a").x, 504.0);
        assert_eq!(at(&flow, LayoutDirection::BottomTop, "d").y, 0.0);
    }

    #[test]
    fn output_follows_input_order_and_is_deterministic() {
        let flow = flow_small_dag();
        let first = positions(&flow, LayoutDirection::TopBottom);
        let ids = first.iter().map(|(id, _)| id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
        assert_eq!(first, positions(&flow, LayoutDirection::TopBottom));
    }

    #[test]
    fn cycles_are_broken_instead_of_rejected() {
        let flow = Flow::new(
            vec![
                node_at("a", "A", 0.0, 0.0),
                node_at("b", "B", 0.0, 0.0),
                node_at("c", "C", 0.0, 0.0),
            ],
            vec![edge("e1", "a", "b"), edge("e2", "b", "c"), edge("e3", "c", "a")],
        );
        assert_eq!(at(&flow, LayoutDirection::TopBottom, "a").y, 0.0);
        assert_eq!(at(&flow, LayoutDirection::TopBottom, "b").y, 116.0);
        assert_eq!(at(&flow, LayoutDirection::TopBottom, "c").y, 232.0);
    }

    #[test]
    fn barycenter_sweep_reduces_crossings() {
        // Without the sweep, insertion order would put `y` (child of `b`) before `x` (child of `a`).
        let flow = Flow::new(
            vec![
                node_at("a", "A", 0.0, 0.0),
                node_at("b", "B", 0.0, 0.0),
                node_at("y", "Y", 0.0, 0.0),
                node_at("x", "X", 0.0, 0.0),
            ],
            vec![edge("e1", "a", "x"), edge("e2", "b", "y")],
        );
        let x = at(&flow, LayoutDirection::TopBottom, "x");
        let y = at(&flow, LayoutDirection::TopBottom, "y");
        assert!(x.x < y.x);
    }

    #[test]
    fn rejects_dangling_edges_and_bad_dims() {
        let flow = Flow::new(vec![node_at("a", "A", 0.0, 0.0)], vec![edge("e1", "a", "ghost")]);
        let err = LayeredLayout::default()
            .layout(flow.nodes(), flow.edges(), LayoutDirection::TopBottom, NodeDims::default())
            .expect_err("dangling edge");
        assert_eq!(
            err,
            LayoutError::UnknownNode { edge_id: "e1".to_owned(), node_id: "ghost".to_owned() }
        );

        let err = LayeredLayout::default()
            .layout(&[], &[], LayoutDirection::TopBottom, NodeDims { width: 0.0, height: 10.0 })
            .expect_err("zero width");
        assert!(matches!(err, LayoutError::InvalidDims { .. }));
    }

    #[test]
    fn direction_parses_short_names() {
        assert_eq!("lr".parse::<LayoutDirection>(), Ok(LayoutDirection::LeftRight));
        assert_eq!("TD".parse::<LayoutDirection>(), Ok(LayoutDirection::TopBottom));
        assert!("diagonal".parse::<LayoutDirection>().is_err());
        assert_eq!(serde_json::to_value(LayoutDirection::RightLeft).expect("json"), "RL");
    }
}
