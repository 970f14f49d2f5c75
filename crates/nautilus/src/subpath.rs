//! Sub-paths: the per-level segments a connection decomposes into.
//!
//! A connection's node-path is scanned left to right; each maximal run that
//! stays within one sibling group (or climbs towards one) becomes a sub-path.
//! Adjacent sub-paths share their boundary node, which lets a resolved curve
//! hand its end anchor to the neighbour as a desired attachment point.

use nautilus_core::{ArcDirection, Curve};

use crate::connection::ConnectionId;
use crate::hierarchy::{Hierarchy, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubPathId(pub(crate) u32);

impl SubPathId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(pub(crate) u32);

impl GroupId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelType {
    /// Both endpoints share a parent.
    SameLevel,
    /// The segment crosses a hierarchy boundary.
    LevelChanging,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionType {
    /// Runs from one node boundary to another.
    NodeToNode,
    /// Starts at a free node, ends where the following segment begins.
    NodeToPath,
    /// Starts where the preceding segment ended, ends at a free node.
    PathToNode,
    /// Passes through a virtual stand-in; both ends are taken from the
    /// neighbouring segments.
    PathToPath,
}

#[derive(Debug, Clone)]
pub struct SubPath {
    pub id: SubPathId,
    pub connection: ConnectionId,
    pub source: NodeId,
    pub target: NodeId,
    pub node_path: Vec<NodeId>,
    pub level_type: LevelType,
    pub connection_type: ConnectionType,
    /// Sweep direction when this is an adjacent-sibling circular arc:
    /// counter-clockwise towards the next sibling, clockwise towards the
    /// previous one.
    pub arc: Option<ArcDirection>,
    pub previous: Option<SubPathId>,
    pub next: Option<SubPathId>,
    pub group: Option<GroupId>,
    pub curve: Option<Curve>,
    /// A resolution attempt happened; a missing curve then means unrouted.
    pub resolved: bool,
}

impl SubPath {
    pub fn is_circle_arc(&self) -> bool {
        self.arc.is_some()
    }

    /// Depth of the deeper endpoint; the layer this sub-path resolves in.
    pub fn layer(&self, hierarchy: &Hierarchy) -> usize {
        hierarchy
            .node(self.source)
            .layer_from_top
            .max(hierarchy.node(self.target).layer_from_top)
    }

    /// Depth of the shallower endpoint; orders sub-paths within a shared
    /// range.
    pub fn min_layer(&self, hierarchy: &Hierarchy) -> usize {
        hierarchy
            .node(self.source)
            .layer_from_top
            .min(hierarchy.node(self.target).layer_from_top)
    }

    pub fn opposite_endpoint(&self, node: NodeId) -> Option<NodeId> {
        if node == self.source {
            Some(self.target)
        } else if node == self.target {
            Some(self.source)
        } else {
            None
        }
    }
}

/// Parallel same-level segments between the same two nodes share one group:
/// the representative claims the angular range, the first resolved member
/// donates its curve to the rest.
#[derive(Debug, Clone)]
pub struct SubPathGroup {
    pub source: NodeId,
    pub target: NodeId,
    pub members: Vec<SubPathId>,
    pub representative: SubPathId,
    pub resolved: Option<SubPathId>,
}

/// An unclassified segment of a node-path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Seed {
    pub source: NodeId,
    pub target: NodeId,
    pub node_path: Vec<NodeId>,
    /// A pass-through marker at a virtual node (no extent of its own).
    pub pass_through: bool,
}

/// Splits a node-path into sub-path seeds.
///
/// In hierarchical mode a segment extends while its far end lives in a
/// different sibling group than its start *and* the node after that is no
/// sibling of the far end either. Otherwise a segment from a leaf swallows
/// every hypernode up to the next non-hypernode. In both modes consecutive
/// segments share their boundary node, which keeps the chain connected for
/// anchor handover.
pub(crate) fn split_node_path(
    hierarchy: &Hierarchy,
    path: &[NodeId],
    hierarchical: bool,
) -> Vec<Seed> {
    let mut seeds = Vec::new();
    let mut i = 0usize;
    while i + 1 < path.len() {
        let source = path[i];
        if i > 0 && hierarchy.node(source).is_virtual() {
            seeds.push(Seed {
                source,
                target: source,
                node_path: vec![source],
                pass_through: true,
            });
        }

        let mut j = i + 1;
        if hierarchical {
            while hierarchy.node(path[j]).parent != hierarchy.node(source).parent {
                let Some(&after) = path.get(j + 1) else {
                    break;
                };
                if hierarchy.node(after).parent == hierarchy.node(path[j]).parent {
                    break;
                }
                j += 1;
            }
        } else {
            while !hierarchy.node(source).is_hyper_node()
                && hierarchy.node(path[j]).is_hyper_node()
                && j + 1 < path.len()
            {
                j += 1;
            }
        }

        seeds.push(Seed {
            source,
            target: path[j],
            node_path: path[i..=j].to_vec(),
            pass_through: false,
        });
        i = j;
    }
    seeds
}

/// Level type, connection type and circular-arc tag for a seed.
pub(crate) fn classify(
    hierarchy: &Hierarchy,
    seed: &Seed,
) -> (LevelType, ConnectionType, Option<ArcDirection>) {
    if seed.pass_through {
        return (LevelType::SameLevel, ConnectionType::PathToPath, None);
    }
    let source = hierarchy.node(seed.source);
    let target = hierarchy.node(seed.target);
    if source.parent == target.parent {
        let forward = hierarchy.is_direct_successor_in_sorting_to(seed.target, seed.source);
        let backward = hierarchy.is_direct_successor_in_sorting_to(seed.source, seed.target);
        let arc = if forward {
            Some(ArcDirection::CounterClockwise)
        } else if backward {
            Some(ArcDirection::Clockwise)
        } else {
            None
        };
        return (LevelType::SameLevel, ConnectionType::NodeToNode, arc);
    }
    let connection_type = if source.is_hyper_node() {
        ConnectionType::PathToNode
    } else if target.is_hyper_node() {
        ConnectionType::NodeToPath
    } else {
        ConnectionType::NodeToNode
    };
    (LevelType::LevelChanging, connection_type, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::node_path;
    use crate::model::{ClusterSpec, GraphSpec, NodeSpec};

    fn spec() -> GraphSpec {
        GraphSpec {
            nodes: ["x", "x2", "x3", "y", "y2", "y3"].map(NodeSpec::new).to_vec(),
            edges: vec![],
            clusters: vec![
                ClusterSpec::new("h1", &["x", "x2", "x3"]),
                ClusterSpec::new("h2", &["y", "y2", "y3"]),
            ],
            config: Default::default(),
        }
    }

    #[test]
    fn cross_community_path_splits_into_three() {
        let hierarchy = Hierarchy::build(&spec()).unwrap();
        let x = hierarchy.resolve("x").unwrap();
        let y = hierarchy.resolve("y").unwrap();
        let path = node_path(&hierarchy, x, y);
        let seeds = split_node_path(&hierarchy, &path, true);
        assert_eq!(seeds.len(), 3);

        let h1 = hierarchy.resolve("h1").unwrap();
        let h2 = hierarchy.resolve("h2").unwrap();
        assert_eq!((seeds[0].source, seeds[0].target), (x, h1));
        assert_eq!((seeds[1].source, seeds[1].target), (h1, h2));
        assert_eq!((seeds[2].source, seeds[2].target), (h2, y));
        // Adjacent segments overlap in their boundary node.
        assert_eq!(seeds[0].node_path.last(), seeds[1].node_path.first());

        assert_eq!(
            classify(&hierarchy, &seeds[0]),
            (LevelType::LevelChanging, ConnectionType::NodeToPath, None)
        );
        assert_eq!(
            classify(&hierarchy, &seeds[2]),
            (LevelType::LevelChanging, ConnectionType::PathToNode, None)
        );
        let (level, kind, arc) = classify(&hierarchy, &seeds[1]);
        assert_eq!(level, LevelType::SameLevel);
        assert_eq!(kind, ConnectionType::NodeToNode);
        // h1 and h2 are adjacent siblings under the root.
        assert_eq!(arc, Some(ArcDirection::CounterClockwise));
    }

    #[test]
    fn non_hierarchical_mode_spans_the_whole_detour() {
        let hierarchy = Hierarchy::build(&spec()).unwrap();
        let x = hierarchy.resolve("x").unwrap();
        let y = hierarchy.resolve("y").unwrap();
        let path = node_path(&hierarchy, x, y);
        let seeds = split_node_path(&hierarchy, &path, false);
        assert_eq!(seeds.len(), 1);
        assert_eq!((seeds[0].source, seeds[0].target), (x, y));
        assert_eq!(
            classify(&hierarchy, &seeds[0]),
            (LevelType::LevelChanging, ConnectionType::NodeToNode, None)
        );
    }

    #[test]
    fn non_hierarchical_segments_share_their_boundary_nodes() {
        let mut hierarchy = Hierarchy::build(&spec()).unwrap();
        let x = hierarchy.resolve("x").unwrap();
        let y = hierarchy.resolve("y").unwrap();
        hierarchy.add_virtual_community_nodes(&[(x, y)]).unwrap();
        let path = node_path(&hierarchy, x, y);
        let seeds = split_node_path(&hierarchy, &path, false);

        assert_eq!(seeds.len(), 5);
        assert_eq!(seeds.iter().filter(|s| s.pass_through).count(), 2);
        assert_eq!(seeds[0].source, x);
        assert_eq!(seeds.last().unwrap().target, y);
        // Every segment picks up where the previous one ended.
        let mut previous_target = None;
        for seed in seeds.iter().filter(|s| !s.pass_through) {
            if let Some(previous) = previous_target {
                assert_eq!(seed.source, previous, "segment chain must stay connected");
            }
            previous_target = Some(seed.target);
        }
    }

    #[test]
    fn virtual_nodes_emit_pass_through_seeds() {
        let mut hierarchy = Hierarchy::build(&spec()).unwrap();
        let x = hierarchy.resolve("x").unwrap();
        let y = hierarchy.resolve("y").unwrap();
        hierarchy.add_virtual_community_nodes(&[(x, y)]).unwrap();
        let path = node_path(&hierarchy, x, y);
        let seeds = split_node_path(&hierarchy, &path, true);
        assert_eq!(seeds.len(), 7);
        assert_eq!(seeds.iter().filter(|s| s.pass_through).count(), 2);

        // The first segment runs to the stand-in inside the own community
        // and stays same-level.
        let y_in_h1 = hierarchy.resolve("y_in_h1").unwrap();
        assert_eq!((seeds[0].source, seeds[0].target), (x, y_in_h1));
        let (level, kind, _) = classify(&hierarchy, &seeds[0]);
        assert_eq!(level, LevelType::SameLevel);
        assert_eq!(kind, ConnectionType::NodeToNode);
        assert_eq!(
            classify(&hierarchy, &seeds[1]).1,
            ConnectionType::PathToPath
        );
    }

    #[test]
    fn wrap_around_siblings_are_not_arcs() {
        let hierarchy = Hierarchy::build(&spec()).unwrap();
        let x = hierarchy.resolve("x").unwrap();
        let x3 = hierarchy.resolve("x3").unwrap();
        let seeds = split_node_path(&hierarchy, &[x, x3], true);
        let (_, _, arc) = classify(&hierarchy, &seeds[0]);
        assert_eq!(arc, None);
        // The reverse direction is a plain backward-adjacent pair.
        let seeds = split_node_path(&hierarchy, &[x3, x], true);
        // x3 -> x wraps as well; still no arc.
        let (_, _, arc) = classify(&hierarchy, &seeds[0]);
        assert_eq!(arc, None);
        let x2 = hierarchy.resolve("x2").unwrap();
        let seeds = split_node_path(&hierarchy, &[x2, x], true);
        let (_, _, arc) = classify(&hierarchy, &seeds[0]);
        assert_eq!(arc, Some(ArcDirection::Clockwise));
    }
}
