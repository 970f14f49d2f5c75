//! Connections between leaves and their paths through the hierarchy.

use rustc_hash::FxHashMap;

use crate::hierarchy::{Hierarchy, NodeId};
use crate::model::GraphSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub(crate) u32);

impl ConnectionId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A routed link between two leaves. Parallel edges are merged up front;
/// opposite directions stay separate so they can be bundled as a
/// counter-path pair during range allocation.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub source: NodeId,
    pub target: NodeId,
    pub weight: f64,
}

/// Resolves the spec's edges against the hierarchy, merging duplicates and
/// dropping self-loops. An edge naming an unknown endpoint is skipped with
/// a warning; the remaining edges still lay out.
pub fn build_connections(hierarchy: &Hierarchy, spec: &GraphSpec) -> Vec<Connection> {
    let mut connections: Vec<Connection> = Vec::with_capacity(spec.edges.len());
    let mut seen: FxHashMap<(NodeId, NodeId), usize> = FxHashMap::default();

    for edge in &spec.edges {
        let (Ok(source), Ok(target)) = (
            hierarchy.resolve(&edge.source),
            hierarchy.resolve(&edge.target),
        ) else {
            tracing::warn!(
                source = edge.source.as_str(),
                target = edge.target.as_str(),
                "skipping edge with unknown endpoint"
            );
            continue;
        };
        if source == target {
            tracing::debug!(node = edge.source.as_str(), "skipping self-loop");
            continue;
        }
        match seen.get(&(source, target)) {
            Some(&index) => connections[index].weight += edge.weight,
            None => {
                let id = ConnectionId(connections.len() as u32);
                seen.insert((source, target), connections.len());
                connections.push(Connection {
                    id,
                    source,
                    target,
                    weight: edge.weight,
                });
            }
        }
    }
    connections
}

/// The node sequence a connection travels through: the source, its ancestors
/// up to the child of the first common parent, then down the target side.
/// Whenever an ancestor on the way holds a virtual stand-in for the opposite
/// endpoint, the stand-in is spliced in just before that ancestor, so the
/// path detours through the marker instead of crossing the community twice.
pub fn node_path(hierarchy: &Hierarchy, source: NodeId, target: NodeId) -> Vec<NodeId> {
    let Some(common) = hierarchy.first_common_parent(source, target) else {
        return vec![source, target];
    };
    let top_of = |id: NodeId| hierarchy.ancestor_below(id, common).unwrap_or(id);
    let source_top = top_of(source);
    let target_top = top_of(target);

    let mut path = vec![source];
    let mut current = source;
    while current != source_top {
        let Some(parent) = hierarchy.node(current).parent else {
            break;
        };
        if let Some(&stand_in) = hierarchy.node(parent).virtual_children.get(&target) {
            path.push(stand_in);
        }
        current = parent;
        path.push(current);
    }

    let mut tail = vec![target];
    let mut current = target;
    while current != target_top {
        let Some(parent) = hierarchy.node(current).parent else {
            break;
        };
        if let Some(&stand_in) = hierarchy.node(parent).virtual_children.get(&source) {
            tail.push(stand_in);
        }
        current = parent;
        tail.push(current);
    }
    tail.reverse();
    path.extend(tail);
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClusterSpec, EdgeSpec, GraphSpec, NodeSpec};

    fn two_community_spec() -> GraphSpec {
        GraphSpec {
            nodes: ["x", "x2", "y", "y2"].map(NodeSpec::new).to_vec(),
            edges: vec![EdgeSpec::new("x", "y")],
            clusters: vec![
                ClusterSpec::new("h1", &["x", "x2"]),
                ClusterSpec::new("h2", &["y", "y2"]),
            ],
            config: Default::default(),
        }
    }

    fn names(hierarchy: &Hierarchy, path: &[NodeId]) -> Vec<String> {
        path.iter()
            .map(|&id| hierarchy.node(id).name.clone())
            .collect()
    }

    #[test]
    fn sibling_path_is_direct() {
        let spec = two_community_spec();
        let hierarchy = Hierarchy::build(&spec).unwrap();
        let x = hierarchy.resolve("x").unwrap();
        let x2 = hierarchy.resolve("x2").unwrap();
        assert_eq!(node_path(&hierarchy, x, x2), vec![x, x2]);
    }

    #[test]
    fn cross_community_path_climbs_through_hypernodes() {
        let spec = two_community_spec();
        let hierarchy = Hierarchy::build(&spec).unwrap();
        let x = hierarchy.resolve("x").unwrap();
        let y = hierarchy.resolve("y").unwrap();
        assert_eq!(
            names(&hierarchy, &node_path(&hierarchy, x, y)),
            ["x", "h1", "h2", "y"]
        );
    }

    #[test]
    fn virtual_stand_ins_are_spliced_in() {
        let spec = two_community_spec();
        let mut hierarchy = Hierarchy::build(&spec).unwrap();
        let x = hierarchy.resolve("x").unwrap();
        let y = hierarchy.resolve("y").unwrap();
        hierarchy.add_virtual_community_nodes(&[(x, y)]).unwrap();
        assert_eq!(
            names(&hierarchy, &node_path(&hierarchy, x, y)),
            ["x", "y_in_h1", "h1", "h2", "x_in_h2", "y"]
        );
    }

    #[test]
    fn duplicate_edges_merge_weights() {
        let mut spec = two_community_spec();
        spec.edges.push(EdgeSpec::new("x", "y"));
        spec.edges.push(EdgeSpec::new("y", "x"));
        let hierarchy = Hierarchy::build(&spec).unwrap();
        let connections = build_connections(&hierarchy, &spec);
        assert_eq!(connections.len(), 2);
        assert_eq!(connections[0].weight, 2.0);
        assert_eq!(connections[1].weight, 1.0);
    }

    #[test]
    fn self_loops_are_dropped() {
        let mut spec = two_community_spec();
        spec.edges = vec![EdgeSpec::new("x", "x")];
        let hierarchy = Hierarchy::build(&spec).unwrap();
        assert!(build_connections(&hierarchy, &spec).is_empty());
    }

    #[test]
    fn edges_with_unknown_endpoints_are_skipped() {
        let mut spec = two_community_spec();
        spec.edges.push(EdgeSpec::new("x", "ghost"));
        spec.edges.push(EdgeSpec::new("ghost", "y"));
        let hierarchy = Hierarchy::build(&spec).unwrap();
        let connections = build_connections(&hierarchy, &spec);
        assert_eq!(connections.len(), 1);
        let x = hierarchy.resolve("x").unwrap();
        let y = hierarchy.resolve("y").unwrap();
        assert_eq!((connections[0].source, connections[0].target), (x, y));
    }
}
