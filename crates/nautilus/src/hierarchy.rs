//! The node hierarchy: leaves, community hypernodes, and virtual
//! pass-through nodes, stored in one arena.

use std::collections::BTreeMap;

use nautilus_core::Circle;
use nautilus_core::error::{Error, Result};
use nautilus_core::geom::{Point, Vector, point, rotate, rotate_around, slope, vector};
use nautilus_core::radial::{
    ArcDirection, closest_point_to, forward_rad, furthest_point_to, normalize_rad, rad_is_between,
    rad_of_point, tangents_from_point,
};
use rustc_hash::FxHashMap;

use crate::model::GraphSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[cfg(test)]
    pub(crate) fn for_testing(raw: u32) -> Self {
        NodeId(raw)
    }
}

#[derive(Debug, Clone)]
pub struct LayoutNode {
    pub id: NodeId,
    pub name: String,
    pub label: Option<String>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub sort_index: usize,
    pub layer_from_top: usize,
    pub score: Option<f64>,

    /// The real node this one stands in for, when virtual.
    pub virtual_parent: Option<NodeId>,
    /// Virtual stand-ins living inside this hypernode, keyed by the real
    /// node they represent.
    pub virtual_children: BTreeMap<NodeId, NodeId>,

    pub center: Point,
    pub radius: f64,
    pub outer_radius: f64,
    pub inner_radius: f64,
    pub inner_enclosing_radius: f64,
    pub inner_center_translation: Vector,
}

impl LayoutNode {
    fn new(id: NodeId, name: String) -> Self {
        Self {
            id,
            name,
            label: None,
            parent: None,
            children: Vec::new(),
            sort_index: 0,
            layer_from_top: 0,
            score: None,
            virtual_parent: None,
            virtual_children: BTreeMap::new(),
            center: point(0.0, 0.0),
            radius: 0.0,
            outer_radius: 0.0,
            inner_radius: 0.0,
            inner_enclosing_radius: 0.0,
            inner_center_translation: vector(0.0, 0.0),
        }
    }

    pub fn is_hyper_node(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn is_virtual(&self) -> bool {
        self.virtual_parent.is_some()
    }

    pub fn circle(&self) -> Circle {
        Circle::new(self.center, self.radius)
    }

    pub fn outer_circle(&self) -> Circle {
        Circle::new(self.center, self.outer_radius)
    }

    /// Circle the children are placed in; offset by the enclosing-circle
    /// re-centering.
    pub fn inner_circle(&self) -> Circle {
        Circle::new(self.center - self.inner_center_translation, self.inner_radius)
    }

    pub fn inner_enclosing_circle(&self) -> Circle {
        Circle::new(
            self.center - self.inner_center_translation,
            self.inner_enclosing_radius,
        )
    }
}

#[derive(Debug, Clone)]
pub struct Hierarchy {
    nodes: Vec<LayoutNode>,
    ids: FxHashMap<String, NodeId>,
    pub root: NodeId,
    /// Leaves in input order.
    leaves: Vec<NodeId>,
}

impl Hierarchy {
    /// Builds the tree from the spec: leaves under the root, then clusters
    /// pulled out into hypernodes, nested clusters forming deeper levels.
    pub fn build(spec: &GraphSpec) -> Result<Self> {
        let mut hierarchy = Self {
            nodes: Vec::with_capacity(spec.nodes.len() + spec.clusters.len() + 1),
            ids: FxHashMap::default(),
            root: NodeId(0),
            leaves: Vec::new(),
        };
        hierarchy.push_node("__root".to_string())?;

        for node_spec in &spec.nodes {
            let id = hierarchy.push_node(node_spec.id.clone())?;
            hierarchy.nodes[id.index()].score = node_spec.score;
            hierarchy.nodes[id.index()].label = node_spec.label.clone();
            hierarchy.attach(id, hierarchy.root);
            hierarchy.leaves.push(id);
        }

        // Hypernodes first, memberships second, so clusters can nest in any
        // declaration order.
        for cluster in &spec.clusters {
            let id = hierarchy.push_node(cluster.id.clone())?;
            hierarchy.attach(id, hierarchy.root);
        }
        for cluster in &spec.clusters {
            let cluster_id = hierarchy.ids[&cluster.id];
            let mut seen: FxHashMap<NodeId, ()> = FxHashMap::default();
            for member in &cluster.members {
                let member_id =
                    *hierarchy
                        .ids
                        .get(member)
                        .ok_or_else(|| Error::UnknownNode { id: member.clone() })?;
                if seen.insert(member_id, ()).is_some() {
                    return Err(Error::DuplicateClusterMember {
                        cluster: cluster.id.clone(),
                        id: member.clone(),
                    });
                }
                if hierarchy.node(member_id).parent != Some(hierarchy.root) {
                    // Already claimed by an earlier cluster; first one wins.
                    tracing::warn!(
                        member = member.as_str(),
                        cluster = cluster.id.as_str(),
                        "member already assigned, keeping first cluster"
                    );
                    continue;
                }
                hierarchy.move_to_parent(member_id, cluster_id);
            }
        }
        hierarchy.check_acyclic(spec)?;
        hierarchy.assign_layers();
        Ok(hierarchy)
    }

    fn push_node(&mut self, name: String) -> Result<NodeId> {
        if self.ids.contains_key(&name) {
            return Err(Error::DuplicateNode { id: name });
        }
        let id = NodeId(self.nodes.len() as u32);
        self.ids.insert(name.clone(), id);
        self.nodes.push(LayoutNode::new(id, name));
        Ok(id)
    }

    fn attach(&mut self, child: NodeId, parent: NodeId) {
        let sort_index = self.nodes[parent.index()].children.len();
        self.nodes[parent.index()].children.push(child);
        let node = &mut self.nodes[child.index()];
        node.parent = Some(parent);
        node.sort_index = sort_index;
    }

    fn move_to_parent(&mut self, child: NodeId, new_parent: NodeId) {
        if let Some(old_parent) = self.nodes[child.index()].parent {
            self.nodes[old_parent.index()].children.retain(|&c| c != child);
            let siblings = self.nodes[old_parent.index()].children.clone();
            for (i, &c) in siblings.iter().enumerate() {
                self.nodes[c.index()].sort_index = i;
            }
        }
        self.attach(child, new_parent);
    }

    fn check_acyclic(&self, spec: &GraphSpec) -> Result<()> {
        // Memberships move nodes, so a cycle would leave a cluster detached
        // from the root.
        for cluster in &spec.clusters {
            let mut current = Some(self.ids[&cluster.id]);
            let mut steps = 0usize;
            while let Some(id) = current {
                if id == self.root {
                    break;
                }
                steps += 1;
                if steps > self.nodes.len() {
                    return Err(Error::InvalidConfig {
                        message: format!("cluster `{}` is part of a membership cycle", cluster.id),
                    });
                }
                current = self.node(id).parent;
            }
            if current.is_none() {
                return Err(Error::InvalidConfig {
                    message: format!("cluster `{}` is part of a membership cycle", cluster.id),
                });
            }
        }
        Ok(())
    }

    fn assign_layers(&mut self) {
        let mut stack = vec![(self.root, 0usize)];
        while let Some((id, layer)) = stack.pop() {
            self.nodes[id.index()].layer_from_top = layer;
            for &child in &self.nodes[id.index()].children.clone() {
                stack.push((child, layer + 1));
            }
        }
    }

    pub fn node(&self, id: NodeId) -> &LayoutNode {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut LayoutNode {
        &mut self.nodes[id.index()]
    }

    pub fn resolve(&self, name: &str) -> Result<NodeId> {
        self.ids
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownNode {
                id: name.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayoutNode> {
        self.nodes.iter()
    }

    pub fn leaves(&self) -> &[NodeId] {
        &self.leaves
    }

    pub fn score_of(&self, id: NodeId) -> f64 {
        self.node(id).score.unwrap_or(0.0)
    }

    pub fn next_in_sorting(&self, id: NodeId) -> Option<NodeId> {
        let node = self.node(id);
        let parent = self.node(node.parent?);
        let next = (node.sort_index + 1) % parent.children.len();
        Some(parent.children[next])
    }

    pub fn previous_in_sorting(&self, id: NodeId) -> Option<NodeId> {
        let node = self.node(id);
        let parent = self.node(node.parent?);
        let len = parent.children.len();
        let previous = (node.sort_index + len - 1) % len;
        Some(parent.children[previous])
    }

    /// True when `id` directly follows `other` in their shared parent's
    /// sorting. The wrap-around pair (last, first) does not count: such a
    /// link crosses the placement seam and is routed as a spline instead.
    pub fn is_direct_successor_in_sorting_to(&self, id: NodeId, other: NodeId) -> bool {
        let node = self.node(id);
        let other_node = self.node(other);
        let (Some(parent), Some(other_parent)) = (node.parent, other_node.parent) else {
            return false;
        };
        parent == other_parent && node.sort_index == other_node.sort_index + 1
    }

    pub fn first_common_parent(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
        let mut ancestors = Vec::new();
        let mut current = Some(a);
        while let Some(id) = current {
            ancestors.push(id);
            current = self.node(id).parent;
        }
        let mut current = Some(b);
        while let Some(id) = current {
            if ancestors.contains(&id) {
                return Some(id);
            }
            current = self.node(id).parent;
        }
        None
    }

    /// The ancestor of `id` that is a direct child of `ancestor`, or `id`
    /// itself when it already is one.
    pub fn ancestor_below(&self, id: NodeId, ancestor: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            let parent = self.node(current).parent?;
            if parent == ancestor {
                return Some(current);
            }
            current = parent;
        }
    }

    /// The community of a node: its ancestor directly under the root.
    pub fn community_of(&self, id: NodeId) -> Option<NodeId> {
        self.ancestor_below(id, self.root)
    }

    /// For every leaf with edges into foreign communities, plants a virtual
    /// stand-in inside each such community. Connection paths pass through
    /// the stand-in instead of crossing the community boundary twice.
    pub fn add_virtual_community_nodes(&mut self, edges: &[(NodeId, NodeId)]) -> Result<()> {
        let mut neighbours: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
        for &(source, target) in edges {
            neighbours.entry(source).or_default().push(target);
            neighbours.entry(target).or_default().push(source);
        }

        for leaf in self.leaves.clone() {
            let Some(own_community) = self.community_of(leaf) else {
                continue;
            };
            let Some(partners) = neighbours.get(&leaf) else {
                continue;
            };
            let mut foreign: Vec<NodeId> = Vec::new();
            for &partner in partners {
                let Some(community) = self.community_of(partner) else {
                    continue;
                };
                if community == own_community || !self.node(community).is_hyper_node() {
                    continue;
                }
                if !foreign.contains(&community) {
                    foreign.push(community);
                }
            }

            for community in foreign {
                if self.node(community).virtual_children.contains_key(&leaf) {
                    continue;
                }
                let name = format!(
                    "{}_in_{}",
                    self.node(leaf).name,
                    self.node(community).name
                );
                let virtual_id = self.push_node(name)?;
                self.nodes[virtual_id.index()].score = self.node(leaf).score;
                self.nodes[virtual_id.index()].label = Some(
                    self.node(leaf)
                        .label
                        .clone()
                        .unwrap_or_else(|| self.node(leaf).name.clone()),
                );
                self.nodes[virtual_id.index()].virtual_parent = Some(leaf);
                self.attach(virtual_id, community);
                self.nodes[community.index()]
                    .virtual_children
                    .insert(leaf, virtual_id);
            }
        }

        self.assign_layers();
        Ok(())
    }

    /// Rotates the subtree below `id` around `pivot` (local coordinates).
    pub fn rotate_children_locally(&mut self, id: NodeId, rad: f64, pivot: Point) {
        let node = self.node_mut(id);
        node.inner_center_translation = rotate(node.inner_center_translation, rad);
        for child in self.nodes[id.index()].children.clone() {
            let child_node = self.node_mut(child);
            child_node.center = rotate_around(child_node.center, pivot, rad);
            self.rotate_children_locally(child, rad, pivot);
        }
    }

    /// Translates the subtree below and including `id`.
    pub fn translate_subtree(&mut self, id: NodeId, offset: Vector) {
        self.node_mut(id).center += offset;
        for child in self.nodes[id.index()].children.clone() {
            self.translate_subtree(child, offset);
        }
    }

    /// Angular span on this node's boundary facing the parent center,
    /// bounded by the tangents to both neighbouring siblings.
    pub fn valid_inner_rad_range(&self, id: NodeId, factor: f64) -> [f64; 2] {
        let node = self.node(id);
        let (Some(parent), Some(next), Some(previous)) = (
            node.parent,
            self.next_in_sorting(id),
            self.previous_in_sorting(id),
        ) else {
            return [0.0, 0.0];
        };
        if next == id || previous == id {
            return [0.0, 0.0];
        }
        let parent_center = self.node(parent).center;

        let Some(next_tangents) = tangents_from_point(&self.node(next).outer_circle(), node.center)
        else {
            return [0.0, 0.0];
        };
        let Some(prev_tangents) =
            tangents_from_point(&self.node(previous).outer_circle(), node.center)
        else {
            return [0.0, 0.0];
        };

        let (next_point, prev_point) = if next == previous {
            (next_tangents.0, next_tangents.1)
        } else {
            let next_point = closest_point_to(&[next_tangents.0, next_tangents.1], parent_center);
            let prev_point = closest_point_to(&[prev_tangents.0, prev_tangents.1], parent_center);
            match (next_point, prev_point) {
                (Some(n), Some(p)) => (n, p),
                _ => return [0.0, 0.0],
            }
        };

        let next_rad = rad_of_point(node.center, next_point);
        let prev_rad = rad_of_point(node.center, prev_point);
        let mut range = [next_rad, prev_rad];

        if next == previous {
            let node_rad = rad_of_point(node.center, self.node(next).center);
            range = if rad_is_between(node_rad, prev_rad, next_rad) {
                [prev_rad, next_rad]
            } else {
                [next_rad, prev_rad]
            };
            // Only one sibling constrains us; double the span around its mid.
            let diff = forward_rad(range[0], range[1]);
            let mid = range[0] + diff / 2.0;
            range = [mid - diff, mid + diff];
        }

        shrink_range(&mut range, factor);
        [normalize_rad(range[0]), normalize_rad(range[1])]
    }

    /// Angular span on this node's boundary facing away from the parent
    /// center. With `include_parent_circle`, the span is further cut down
    /// to the part outside the parent's inner circle when that is tighter.
    pub fn valid_outer_rad_range(
        &self,
        id: NodeId,
        factor: f64,
        include_parent_circle: bool,
    ) -> [f64; 2] {
        let node = self.node(id);
        let Some(parent) = node.parent else {
            return [0.0, 0.0];
        };

        if self.node(parent).children.len() == 1 {
            // Sole child: everything except a sliver towards the outside.
            let reference = match self.node(parent).parent {
                Some(grandparent) => self.node(grandparent).center,
                None => self.node(parent).center,
            };
            let from_center_slope = slope(node.center - reference);
            return [
                normalize_rad(from_center_slope + 0.1),
                normalize_rad(from_center_slope - 0.1),
            ];
        }

        let (Some(next), Some(previous)) =
            (self.next_in_sorting(id), self.previous_in_sorting(id))
        else {
            return [0.0, 0.0];
        };
        let parent_center = self.node(parent).center;

        let Some(next_tangents) = tangents_from_point(&self.node(next).outer_circle(), node.center)
        else {
            return [0.0, 0.0];
        };
        let Some(prev_tangents) =
            tangents_from_point(&self.node(previous).outer_circle(), node.center)
        else {
            return [0.0, 0.0];
        };

        let (next_point, prev_point) = if next == previous {
            (next_tangents.0, next_tangents.1)
        } else {
            let next_point = furthest_point_to(&[next_tangents.0, next_tangents.1], parent_center);
            let prev_point = furthest_point_to(&[prev_tangents.0, prev_tangents.1], parent_center);
            match (next_point, prev_point) {
                (Some(n), Some(p)) => (n, p),
                _ => return [0.0, 0.0],
            }
        };

        let next_rad = rad_of_point(node.center, next_point);
        let prev_rad = rad_of_point(node.center, prev_point);
        let mut range = [prev_rad, next_rad];

        if next == previous {
            let node_rad = rad_of_point(node.center, self.node(next).center);
            range = if rad_is_between(node_rad, prev_rad, next_rad) {
                [next_rad, prev_rad]
            } else {
                [prev_rad, next_rad]
            };
        }

        if include_parent_circle {
            let parent_center_rad = rad_of_point(node.center, parent_center);
            let intersections = self
                .node(parent)
                .inner_circle()
                .intersect_circle(&node.outer_circle());
            if intersections.len() == 2 {
                let mut rad_circle_end = rad_of_point(node.center, intersections[0]);
                let mut rad_circle_start = rad_of_point(node.center, intersections[1]);
                if !rad_is_between(parent_center_rad, rad_circle_end, rad_circle_start) {
                    std::mem::swap(&mut rad_circle_end, &mut rad_circle_start);
                }
                let diff_circle = forward_rad(rad_circle_start, rad_circle_end);
                let diff_tangent = forward_rad(range[0], range[1]);
                if diff_circle < diff_tangent {
                    range = [rad_circle_start, rad_circle_end];
                }
            }
        }

        shrink_range(&mut range, factor);
        [normalize_rad(range[0]), normalize_rad(range[1])]
    }

    /// Angular span for circular-arc attachment: where the lane circle
    /// (parent's inner circle, offset by the given factors of the smaller
    /// neighbour) crosses this node's outer circle. Children sit at
    /// increasing angle, so a counter-clockwise sweep heads for the next
    /// sibling and the range opens on that side; clockwise mirrors it.
    pub fn valid_circular_rad_range(
        &self,
        id: NodeId,
        start_radius_factor: f64,
        end_radius_factor: f64,
        direction: ArcDirection,
    ) -> [f64; 2] {
        let node = self.node(id);
        let Some(parent) = node.parent else {
            return [0.0, 0.0];
        };

        let center = node.center;
        let parent_inner = self.node(parent).inner_circle();
        let parent_center = parent_inner.center;

        let other = match direction {
            ArcDirection::CounterClockwise => self.next_in_sorting(id),
            ArcDirection::Clockwise => self.previous_in_sorting(id),
        };
        let min_radius = other
            .map(|o| self.node(o).outer_radius)
            .unwrap_or(0.0)
            .min(node.outer_radius);

        let circle1 = parent_inner.with_radius(parent_inner.radius + min_radius * start_radius_factor);
        let circle2 = parent_inner.with_radius(parent_inner.radius + min_radius * end_radius_factor);

        let outer = node.outer_circle();
        let mut intersections1 = outer.intersect_circle(&circle1);
        let mut intersections2 = outer.intersect_circle(&circle2);

        if intersections1.len() != 2 || intersections2.len() != 2 {
            intersections1.clear();
            intersections2.clear();

            // Deeply nested nodes may sit outside the parent's inner circle;
            // retry against a ring through this node around the grandparent.
            if let Some(grandparent) = self.node(parent).parent {
                let ring_center = self.node(grandparent).inner_circle().center;
                let ring = Circle::new(ring_center, (node.center - ring_center).length());
                let ring1 = ring.with_radius(ring.radius + min_radius * start_radius_factor);
                let ring2 = ring.with_radius(ring.radius + min_radius * end_radius_factor);
                let retry1 = outer.intersect_circle(&ring1);
                let retry2 = outer.intersect_circle(&ring2);
                if retry1.len() == 2 && retry2.len() == 2 {
                    intersections1 = retry1;
                    intersections2 = retry2;
                }
            }
            if intersections1.len() != 2 || intersections2.len() != 2 {
                return [0.0, 0.0];
            }
        }

        let pick = |intersections: &[Point]| -> (Point, Point) {
            let forward = if forward_rad(
                rad_of_point(parent_center, intersections[0]),
                rad_of_point(parent_center, intersections[1]),
            ) < std::f64::consts::PI
            {
                intersections[1]
            } else {
                intersections[0]
            };
            let backward = if forward == intersections[0] {
                intersections[1]
            } else {
                intersections[0]
            };
            (forward, backward)
        };
        let (forward1, backward1) = pick(&intersections1);
        let (forward2, backward2) = pick(&intersections2);

        match direction {
            ArcDirection::CounterClockwise => [
                rad_of_point(center, forward1),
                rad_of_point(center, forward2),
            ],
            ArcDirection::Clockwise => [
                rad_of_point(center, backward2),
                rad_of_point(center, backward1),
            ],
        }
    }
}

/// Shrinks (or stretches) a forward range around its middle.
fn shrink_range(range: &mut [f64; 2], factor: f64) {
    if (factor - 1.0).abs() < f64::EPSILON {
        return;
    }
    let diff = forward_rad(range[0], range[1]);
    let mid = range[0] + diff / 2.0;
    range[0] = mid - diff / 2.0 * factor;
    range[1] = mid + diff / 2.0 * factor;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClusterSpec, GraphSpec, NodeSpec};

    #[test]
    fn removed_members_compact_the_sibling_sorting() {
        let spec = GraphSpec {
            nodes: ["a", "b", "c"].map(NodeSpec::new).to_vec(),
            clusters: vec![ClusterSpec::new("h", &["b"])],
            ..Default::default()
        };
        let hierarchy = Hierarchy::build(&spec).unwrap();
        let a = hierarchy.resolve("a").unwrap();
        let c = hierarchy.resolve("c").unwrap();
        let h = hierarchy.resolve("h").unwrap();
        // b left the root's children; a and c close the gap, h follows.
        assert_eq!(hierarchy.node(a).sort_index, 0);
        assert_eq!(hierarchy.node(c).sort_index, 1);
        assert_eq!(hierarchy.node(h).sort_index, 2);
        assert!(hierarchy.is_direct_successor_in_sorting_to(c, a));
        assert_eq!(hierarchy.node(hierarchy.resolve("b").unwrap()).sort_index, 0);
    }
}
