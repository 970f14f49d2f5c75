//! One layout pass from graph spec to resolved curves.
//!
//! The session owns every arena: the positioned hierarchy, the connections
//! with their node-paths, the sub-paths, shared groups and per-node range
//! allocators. Resolution runs strictly ordered (outer hierarchy layers
//! first, circular arcs before splines within a layer) so that every curve
//! can hand its anchors to the neighbours that resolve after it.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use nautilus_core::error::{Error, Result};
use nautilus_core::geom::{Point, rotate90_ccw, rotate90_cw, slope};
use nautilus_core::radial::{
    circle_from_point_and_tangent_anchor, closest_point_to, forward_rad,
    position_on_circle_at_rad, put_rad_between, rad_is_between, rad_of_point,
};
use nautilus_core::{Anchor, ArcDirection, Circle, Curve, LayoutConfig, RadClamp};
use rustc_hash::FxHashMap;

use crate::connection::{self, Connection, ConnectionId};
use crate::hierarchy::{Hierarchy, NodeId};
use crate::model::GraphSpec;
use crate::output::{self, LayoutOutput};
use crate::positioner;
use crate::range::{AnchorFacing, PathInfo, RangeAllocator, Side};
use crate::router;
use crate::subpath::{
    self, ConnectionType, GroupId, LevelType, SubPath, SubPathGroup, SubPathId,
};

pub struct LayoutSession {
    pub(crate) hierarchy: Hierarchy,
    pub(crate) config: LayoutConfig,
    pub(crate) connections: Vec<Connection>,
    /// Full node-path per connection, parallel to `connections`.
    connection_paths: Vec<Vec<NodeId>>,
    /// Sub-path ids per connection in travel order, parallel to
    /// `connections`.
    connection_sub_paths: Vec<Vec<SubPathId>>,
    pub(crate) sub_paths: Vec<SubPath>,
    groups: Vec<SubPathGroup>,
    group_index: FxHashMap<(NodeId, NodeId), GroupId>,
    ranges: FxHashMap<(NodeId, Side), RangeAllocator>,
    /// Sub-paths per resolution layer, outermost first.
    layers: BTreeMap<usize, Vec<SubPathId>>,
}

impl LayoutSession {
    /// Validates, positions and decomposes; curves are not resolved yet.
    pub fn build(spec: &GraphSpec) -> Result<Self> {
        spec.config.validate()?;
        let mut hierarchy = Hierarchy::build(spec)?;
        let connections = connection::build_connections(&hierarchy, spec);
        if spec.config.use_virtual_nodes {
            let pairs: Vec<(NodeId, NodeId)> = connections
                .iter()
                .map(|conn| (conn.source, conn.target))
                .collect();
            hierarchy.add_virtual_community_nodes(&pairs)?;
        }
        positioner::run(&mut hierarchy, &spec.config);

        let mut session = Self {
            hierarchy,
            config: spec.config.clone(),
            connections,
            connection_paths: Vec::new(),
            connection_sub_paths: Vec::new(),
            sub_paths: Vec::new(),
            groups: Vec::new(),
            group_index: FxHashMap::default(),
            ranges: FxHashMap::default(),
            layers: BTreeMap::new(),
        };
        session.decompose();
        Ok(session)
    }

    /// Resolves every sub-path and assembles the output.
    pub fn finish(mut self) -> LayoutOutput {
        self.resolve_connections();
        output::build(&self)
    }

    pub fn resolve_connections(&mut self) {
        let layers: Vec<usize> = self.layers.keys().copied().collect();
        for layer in layers {
            let mut ids = self.layers[&layer].clone();
            // Circular arcs claim range space first; pass-throughs need both
            // neighbours and go last.
            ids.sort_by_key(|&id| {
                let sub = &self.sub_paths[id.index()];
                if sub.is_circle_arc() {
                    0
                } else if sub.connection_type == ConnectionType::PathToPath {
                    3
                } else if sub.level_type == LevelType::SameLevel {
                    1
                } else {
                    2
                }
            });
            for id in ids {
                self.resolve_sub_path(id);
            }
        }
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn sub_paths(&self) -> &[SubPath] {
        &self.sub_paths
    }

    pub fn sub_paths_of(&self, connection: ConnectionId) -> &[SubPathId] {
        &self.connection_sub_paths[connection.index()]
    }

    pub(crate) fn connection_path(&self, connection: ConnectionId) -> &[NodeId] {
        &self.connection_paths[connection.index()]
    }

    pub fn allocator(&self, node: NodeId, side: Side) -> Option<&RangeAllocator> {
        self.ranges.get(&(node, side))
    }

    fn decompose(&mut self) {
        for index in 0..self.connections.len() {
            let conn_id = self.connections[index].id;
            let (source, target) = {
                let conn = &self.connections[index];
                (conn.source, conn.target)
            };
            let path = connection::node_path(&self.hierarchy, source, target);
            let seeds = subpath::split_node_path(
                &self.hierarchy,
                &path,
                self.config.use_hierarchical_sub_paths,
            );
            self.connection_paths.push(path);

            let mut ids: Vec<SubPathId> = Vec::with_capacity(seeds.len());
            let mut previous: Option<SubPathId> = None;
            let mut pending_pass_through: Option<SubPathId> = None;
            for seed in seeds {
                let (level_type, connection_type, arc) = subpath::classify(&self.hierarchy, &seed);
                let id = SubPathId(self.sub_paths.len() as u32);
                self.sub_paths.push(SubPath {
                    id,
                    connection: conn_id,
                    source: seed.source,
                    target: seed.target,
                    node_path: seed.node_path,
                    level_type,
                    connection_type,
                    arc,
                    previous,
                    next: None,
                    group: None,
                    curve: None,
                    resolved: false,
                });
                ids.push(id);
                self.add_to_layer(id);

                if connection_type == ConnectionType::PathToPath {
                    // The marker borrows its neighbours' anchors; the main
                    // chain continues past it.
                    pending_pass_through = Some(id);
                    continue;
                }
                if let Some(prev) = previous {
                    self.sub_paths[prev.index()].next = Some(id);
                }
                if let Some(marker) = pending_pass_through.take() {
                    self.sub_paths[marker.index()].next = Some(id);
                }
                previous = Some(id);
                self.assign_group(id);
                self.register_sub_path(id);
            }
            self.connection_sub_paths.push(ids);
        }
    }

    fn add_to_layer(&mut self, id: SubPathId) {
        let layer = self.sub_paths[id.index()].layer(&self.hierarchy);
        self.layers.entry(layer).or_default().push(id);
    }

    fn assign_group(&mut self, id: SubPathId) {
        let (source, target, cachable) = {
            let sub = &self.sub_paths[id.index()];
            let cachable = sub.level_type == LevelType::SameLevel
                && sub.connection_type == ConnectionType::NodeToNode
                && (self.hierarchy.node(sub.source).is_virtual()
                    || self.hierarchy.node(sub.target).is_virtual()
                    || self.config.use_hyper_edges);
            (sub.source, sub.target, cachable)
        };
        if !cachable {
            return;
        }
        let group_id = match self.group_index.get(&(source, target)) {
            Some(&group_id) => {
                self.groups[group_id.index()].members.push(id);
                group_id
            }
            None => {
                let group_id = GroupId(self.groups.len() as u32);
                self.groups.push(SubPathGroup {
                    source,
                    target,
                    members: vec![id],
                    representative: id,
                    resolved: None,
                });
                self.group_index.insert((source, target), group_id);
                group_id
            }
        };
        self.sub_paths[id.index()].group = Some(group_id);
    }

    /// Which range a sub-path claims on each of its endpoints. Only the
    /// group representative registers; the rest reuse its slot.
    fn register_sub_path(&mut self, id: SubPathId) {
        if self.rep(id) != id {
            return;
        }
        let (source, target, level_type, connection_type, arc) = {
            let sub = &self.sub_paths[id.index()];
            (
                sub.source,
                sub.target,
                sub.level_type,
                sub.connection_type,
                sub.arc,
            )
        };
        if connection_type == ConnectionType::PathToPath {
            return;
        }
        match (level_type, arc) {
            (LevelType::SameLevel, Some(ArcDirection::CounterClockwise)) => {
                self.register_at(source, Side::CircularForward, id);
                self.register_at(target, Side::CircularBackward, id);
            }
            (LevelType::SameLevel, Some(ArcDirection::Clockwise)) => {
                self.register_at(source, Side::CircularBackward, id);
                self.register_at(target, Side::CircularForward, id);
            }
            (LevelType::SameLevel, None) => {
                self.register_at(source, Side::Inside, id);
                self.register_at(target, Side::Inside, id);
            }
            (LevelType::LevelChanging, _) => {
                self.register_at(source, Side::Outside, id);
                self.register_at(target, Side::Outside, id);
            }
        }
    }

    fn register_at(&mut self, node: NodeId, side: Side, id: SubPathId) {
        if !self.ranges.contains_key(&(node, side)) {
            let allocator = RangeAllocator::new(&self.hierarchy, node, side, &self.config);
            self.ranges.insert((node, side), allocator);
        }
        if let Some(allocator) = self.ranges.get_mut(&(node, side)) {
            allocator.register(id);
        }
    }

    pub(crate) fn rep(&self, id: SubPathId) -> SubPathId {
        match self.sub_paths[id.index()].group {
            Some(group) => self.groups[group.index()].representative,
            None => id,
        }
    }

    fn ensure_calculated(&mut self, node: NodeId, side: Side) {
        let Some(allocator) = self.ranges.get(&(node, side)) else {
            return;
        };
        if allocator.is_calculated() {
            return;
        }
        let ids: Vec<SubPathId> = allocator.sub_paths().to_vec();
        let backside = allocator.backside_rad();
        let infos: Vec<PathInfo> = ids
            .iter()
            .map(|&sub_path| self.path_info(sub_path, node, backside))
            .collect();
        if let Some(allocator) = self.ranges.get_mut(&(node, side)) {
            allocator.calculate(infos, &self.config);
        }
    }

    fn path_info(&self, id: SubPathId, node: NodeId, backside: f64) -> PathInfo {
        let sub = &self.sub_paths[id.index()];
        let conn = &self.connections[sub.connection.index()];
        let center = self.hierarchy.node(node).center;
        let opposite_node = sub.opposite_endpoint(node).unwrap_or(node);
        let opposite_center = self.hierarchy.node(opposite_node).center;
        let opposite_point = self
            .opposite_connection_point(id, node)
            .unwrap_or(opposite_center);
        PathInfo {
            id,
            level: sub.min_layer(&self.hierarchy),
            forward_to_connection_point: forward_rad(backside, rad_of_point(center, opposite_point)),
            forward_to_opposite_node: forward_rad(backside, rad_of_point(center, opposite_center)),
            desired_rad: self
                .desired_node_anchor(id, node)
                .map(|anchor| rad_of_point(center, anchor.point)),
            outgoing: sub.source == node,
            endpoints: (conn.source, conn.target),
        }
    }

    /// The point a sub-path heads for on the far side of `node`: the other
    /// endpoint's center, or the handover anchor when the far side continues
    /// into a neighbouring segment.
    fn opposite_connection_point(&self, id: SubPathId, node: NodeId) -> Option<Point> {
        let sub = &self.sub_paths[id.index()];
        match sub.connection_type {
            ConnectionType::NodeToNode => {
                Some(self.hierarchy.node(sub.opposite_endpoint(node)?).center)
            }
            ConnectionType::NodeToPath => {
                if node == sub.source {
                    let next = &self.sub_paths[sub.next?.index()];
                    next.curve.as_ref().map(|curve| curve.start.point)
                } else {
                    Some(self.hierarchy.node(sub.source).center)
                }
            }
            ConnectionType::PathToNode => {
                if node == sub.target {
                    let previous = &self.sub_paths[sub.previous?.index()];
                    previous.curve.as_ref().map(|curve| curve.end.point)
                } else {
                    Some(self.hierarchy.node(sub.target).center)
                }
            }
            ConnectionType::PathToPath => None,
        }
    }

    pub(crate) fn outer_range_of(&self, node: NodeId) -> [f64; 2] {
        match self.ranges.get(&(node, Side::Outside)) {
            Some(allocator) => allocator.valid_range(),
            None => self.hierarchy.valid_outer_rad_range(
                node,
                self.config.valid_range_margin_factor,
                false,
            ),
        }
    }

    fn outer_range_contains(&self, node: NodeId, point: Point) -> bool {
        let range = self.outer_range_of(node);
        let center = self.hierarchy.node(node).center;
        rad_is_between(rad_of_point(center, point), range[0], range[1])
    }

    /// The free end's assigned slot, when the sub-path is registered on
    /// `node`'s outside range and the side is already calculated.
    pub(crate) fn outer_slot(&self, id: SubPathId, node: NodeId) -> Option<[f64; 2]> {
        let rep = self.rep(id);
        let allocator = self.ranges.get(&(node, Side::Outside))?;
        if !allocator.is_calculated() || !allocator.has(rep) {
            return None;
        }
        allocator.assigned_range(rep)
    }

    /// Boundary anchor on `node` as close to `towards` as its outside
    /// constraints allow; floats over the whole valid span when the
    /// sub-path holds no slot there.
    pub(crate) fn outer_anchor_towards(
        &self,
        id: SubPathId,
        node: NodeId,
        towards: Point,
    ) -> Anchor {
        if let Some(allocator) = self.ranges.get(&(node, Side::Outside)) {
            let rep = self.rep(id);
            let slot = if allocator.is_calculated() && allocator.has(rep) {
                allocator.assigned_range(rep)
            } else {
                None
            };
            return allocator.anchor_towards(towards, slot);
        }
        let range =
            self.hierarchy
                .valid_outer_rad_range(node, self.config.valid_range_margin_factor, false);
        let layout_node = self.hierarchy.node(node);
        let rad = put_rad_between(
            rad_of_point(layout_node.center, towards),
            range[0],
            range[1],
            RadClamp::Closer,
        );
        Anchor::at_angle(layout_node.center, rad).moved(layout_node.outer_radius)
    }

    /// Where a sub-path would ideally attach to `node`, propagated from the
    /// surrounding geometry and neighbouring resolved curves. `None` when
    /// nothing constrains the attachment yet.
    pub(crate) fn desired_node_anchor(&self, id: SubPathId, node: NodeId) -> Option<Anchor> {
        let sub = &self.sub_paths[id.index()];
        let other = sub.opposite_endpoint(node)?;
        let conn = &self.connections[sub.connection.index()];
        let end_toward = |endpoint: NodeId| {
            if endpoint == sub.source {
                conn.source
            } else {
                conn.target
            }
        };
        let node_end = end_toward(node);
        let other_end = end_toward(other);
        let node_ln = self.hierarchy.node(node);
        let other_ln = self.hierarchy.node(other);
        if node_ln.layer_from_top.abs_diff(other_ln.layer_from_top) > 1 {
            return None;
        }

        match (sub.connection_type, sub.level_type) {
            (ConnectionType::NodeToNode, LevelType::SameLevel) => {
                if !node_ln.is_hyper_node() {
                    // Aim past hypernodes at the first concrete node on the
                    // way to the far end.
                    let target_point = match self.next_non_hyper_between(sub.connection, node, other_end)
                    {
                        Some(next) => self.hierarchy.node(next).center,
                        None => self.hierarchy.node(other_end).center,
                    };
                    Some(Anchor::towards(node_ln.center, target_point).moved(node_ln.outer_radius))
                } else {
                    // A hypernode attaches where the line from its inner
                    // representative to the far end pierces its boundary.
                    let representative = self
                        .next_non_hyper_between(sub.connection, node, node_end)
                        .unwrap_or(node_end);
                    let from = self.hierarchy.node(representative).center;
                    let to = self.hierarchy.node(other_end).center;
                    let hits = node_ln.outer_circle().intersect_segment(from, to);
                    match hits.first() {
                        Some(&hit) => Some(Anchor::new(hit, to - from)),
                        None => Some(
                            Anchor::towards(node_ln.center, from).moved(node_ln.outer_radius),
                        ),
                    }
                }
            }
            (ConnectionType::NodeToNode, LevelType::LevelChanging) => {
                if self.outer_range_contains(node, other_ln.center)
                    && self.outer_range_contains(other, node_ln.center)
                {
                    return Some(
                        Anchor::towards(node_ln.center, other_ln.center)
                            .moved(node_ln.outer_radius),
                    );
                }
                // The direct line is blocked; unwrap the other side's ring
                // into a straight continuation and aim at the projection.
                let parent = other_ln.parent?;
                let ring = self.hierarchy.node(parent).inner_circle();
                let to_ring_center = ring.center - node_ln.center;
                let start_slope = slope(to_ring_center);
                let other_slope = slope(other_ln.center - ring.center);
                let mut rad_diff = forward_rad(start_slope, other_slope) - PI;
                if (ring.center - other_ln.center).length() < 0.1 {
                    rad_diff = 0.0;
                }
                let move_distance = 3.0 * ring.radius * rad_diff / PI;
                let projected = Anchor::new(ring.center, rotate90_ccw(to_ring_center))
                    .point_in_direction(move_distance);
                Some(Anchor::towards(node_ln.center, projected).moved(node_ln.outer_radius))
            }
            (ConnectionType::NodeToPath, _) => {
                if node_end == node {
                    // Free leaf end: bend the handover anchor around the
                    // node on a tangent circle.
                    let path_anchor = self.sub_paths[sub.next?.index()].curve.as_ref()?.start;
                    let Some(circle) =
                        circle_from_point_and_tangent_anchor(node_ln.center, &path_anchor)
                    else {
                        return Some(path_anchor);
                    };
                    let hits = node_ln.outer_circle().intersect_circle(&circle);
                    match closest_point_to(&hits, path_anchor.point) {
                        Some(hit) => Some(Anchor::new(hit, hit - node_ln.center)),
                        None => Some(path_anchor),
                    }
                } else {
                    // Pass-through start: leave opposite the incoming side.
                    let path_anchor = self.sub_paths[sub.previous?.index()].curve.as_ref()?.end;
                    Some(
                        Anchor::new(node_ln.center, node_ln.center - path_anchor.point)
                            .moved(node_ln.outer_radius),
                    )
                }
            }
            (ConnectionType::PathToNode, _) => {
                if node_end == node {
                    let path_anchor = self.sub_paths[sub.previous?.index()].curve.as_ref()?.end;
                    let Some(circle) =
                        circle_from_point_and_tangent_anchor(node_ln.center, &path_anchor)
                    else {
                        return Some(path_anchor);
                    };
                    let hits = node_ln.outer_circle().intersect_circle(&circle);
                    match closest_point_to(&hits, path_anchor.point) {
                        Some(hit) => Some(Anchor::new(hit, hit - node_ln.center)),
                        None => Some(path_anchor),
                    }
                } else {
                    let path_anchor = self.sub_paths[sub.next?.index()].curve.as_ref()?.start;
                    Some(
                        Anchor::new(node_ln.center, node_ln.center - path_anchor.point)
                            .moved(node_ln.outer_radius),
                    )
                }
            }
            (ConnectionType::PathToPath, _) => None,
        }
    }

    /// First non-hypernode on the connection's node-path strictly after
    /// `start`, scanning towards `end`.
    fn next_non_hyper_between(
        &self,
        connection: ConnectionId,
        start: NodeId,
        end: NodeId,
    ) -> Option<NodeId> {
        let path = self.connection_path(connection);
        let mut start_index = path.iter().position(|&n| n == start)?;
        let end_index = path.iter().position(|&n| n == end)?;
        while start_index != end_index {
            start_index = if end_index > start_index {
                start_index + 1
            } else {
                start_index - 1
            };
            if !self.hierarchy.node(path[start_index]).is_hyper_node() {
                return Some(path[start_index]);
            }
        }
        None
    }

    fn resolve_sub_path(&mut self, id: SubPathId) {
        if self.sub_paths[id.index()].resolved {
            return;
        }
        if let Some(group) = self.sub_paths[id.index()].group {
            if let Some(donor) = self.groups[group.index()].resolved {
                let curve = self.sub_paths[donor.index()].curve.clone();
                let sub = &mut self.sub_paths[id.index()];
                sub.curve = curve;
                sub.resolved = true;
                return;
            }
        }

        let (is_arc, level_type, connection_type) = {
            let sub = &self.sub_paths[id.index()];
            (sub.is_circle_arc(), sub.level_type, sub.connection_type)
        };
        let result = if is_arc {
            self.layout_circle_arc(id)
        } else {
            match (level_type, connection_type) {
                (_, ConnectionType::PathToPath) => self.layout_pass_through(id),
                (LevelType::SameLevel, _) => self.layout_inside_parent(id),
                (LevelType::LevelChanging, ConnectionType::NodeToNode) => {
                    self.layout_direct_outside(id)
                }
                (LevelType::LevelChanging, _) => self.layout_dynamic(id),
            }
        };
        match result {
            Ok(curve) => {
                self.sub_paths[id.index()].curve = Some(curve);
                if let Some(group) = self.sub_paths[id.index()].group {
                    let group = &mut self.groups[group.index()];
                    if group.resolved.is_none() {
                        group.resolved = Some(id);
                    }
                }
            }
            Err(error) => {
                let sub = &self.sub_paths[id.index()];
                tracing::warn!(
                    source = self.hierarchy.node(sub.source).name.as_str(),
                    target = self.hierarchy.node(sub.target).name.as_str(),
                    %error,
                    "sub-path left unrouted"
                );
            }
        }
        self.sub_paths[id.index()].resolved = true;
    }

    /// Adjacent siblings: an arc on a lane concentric with the parent's
    /// inner circle, at the radius of the allocated lane point.
    fn layout_circle_arc(&mut self, id: SubPathId) -> Result<Curve> {
        let (source, target, direction) = {
            let sub = &self.sub_paths[id.index()];
            let direction = sub
                .arc
                .ok_or_else(|| Error::construction("arc layout without arc tag"))?;
            (sub.source, sub.target, direction)
        };
        let source_side = match direction {
            ArcDirection::CounterClockwise => Side::CircularForward,
            ArcDirection::Clockwise => Side::CircularBackward,
        };
        self.ensure_calculated(source, source_side);
        let rep = self.rep(id);
        let rad = self
            .ranges
            .get(&(source, source_side))
            .and_then(|allocator| allocator.assigned_rad(rep))
            .ok_or_else(|| Error::construction("no circular lane assignment"))?;

        let (source_circle, target_circle, lane) = {
            let source_node = self.hierarchy.node(source);
            let target_node = self.hierarchy.node(target);
            let parent = source_node
                .parent
                .ok_or_else(|| Error::construction("circular arc at the root"))?;
            let parent_node = self.hierarchy.node(parent);
            let inner = parent_node.inner_circle();
            let lane_point =
                position_on_circle_at_rad(rad, source_node.outer_radius, source_node.center);
            let mut lane = inner.with_radius((lane_point - inner.center).length());

            if parent_node.children.len() == 2 {
                // With two children the inner circle degenerates to the axis
                // between them; move the lane center sideways so the arc
                // approaches a straight chord.
                let center_vector = target_node.center - source_node.center;
                let translation = match direction {
                    ArcDirection::CounterClockwise => rotate90_ccw(center_vector),
                    ArcDirection::Clockwise => rotate90_cw(center_vector),
                };
                let lane_center = parent_node.center + translation;
                let smaller = if source_node.radius <= target_node.radius {
                    source_node
                } else {
                    target_node
                };
                let new_radius = (smaller.center - lane_center).length();
                let radius_factor = inner.radius / lane.radius;
                lane = Circle::new(lane_center, new_radius / radius_factor);
            }
            (source_node.outer_circle(), target_node.outer_circle(), lane)
        };

        let curve = Curve::arc_between_circles(lane, &source_circle, &target_circle, direction)
            .ok_or_else(|| Error::construction("lane circle misses an endpoint"))?;

        // The attachment points are spoken for; pull the endpoint ranges in.
        for (node, point) in [(source, curve.start.point), (target, curve.end.point)] {
            for side in [Side::Inside, Side::Outside] {
                if let Some(allocator) = self.ranges.get_mut(&(node, side)) {
                    allocator.trim_to_anchor(point);
                }
            }
        }
        Ok(curve)
    }

    /// Same-level, non-adjacent: a spline through the parent between the two
    /// allocated inside anchors.
    fn layout_inside_parent(&mut self, id: SubPathId) -> Result<Curve> {
        let (source, target) = {
            let sub = &self.sub_paths[id.index()];
            (sub.source, sub.target)
        };
        self.ensure_calculated(source, Side::Inside);
        self.ensure_calculated(target, Side::Inside);
        let rep = self.rep(id);
        let start = self
            .ranges
            .get(&(source, Side::Inside))
            .and_then(|allocator| allocator.anchor_for(rep, AnchorFacing::Out))
            .ok_or_else(|| Error::construction("no inside anchor at the source"))?;
        let end = self
            .ranges
            .get(&(target, Side::Inside))
            .and_then(|allocator| allocator.anchor_for(rep, AnchorFacing::In))
            .ok_or_else(|| Error::construction("no inside anchor at the target"))?;
        Ok(Curve::smooth_spline(start, end, self.config.spline_tension))
    }

    /// Level-changing without an intermediate hypernode endpoint: a single
    /// spline between the two outside anchors.
    fn layout_direct_outside(&mut self, id: SubPathId) -> Result<Curve> {
        let (source, target) = {
            let sub = &self.sub_paths[id.index()];
            (sub.source, sub.target)
        };
        self.ensure_calculated(source, Side::Outside);
        self.ensure_calculated(target, Side::Outside);
        let rep = self.rep(id);
        let start = self
            .ranges
            .get(&(source, Side::Outside))
            .and_then(|allocator| allocator.anchor_for(rep, AnchorFacing::Out))
            .ok_or_else(|| Error::construction("no outside anchor at the source"))?;
        let end = self
            .ranges
            .get(&(target, Side::Outside))
            .and_then(|allocator| allocator.anchor_for(rep, AnchorFacing::In))
            .ok_or_else(|| Error::construction("no outside anchor at the target"))?;
        Ok(Curve::smooth_spline(
            start,
            end,
            self.config.outside_spline_tension,
        ))
    }

    /// Virtual pass-through: bridge the gap between the neighbouring curves.
    fn layout_pass_through(&mut self, id: SubPathId) -> Result<Curve> {
        let (previous, next) = {
            let sub = &self.sub_paths[id.index()];
            (sub.previous, sub.next)
        };
        let start = previous
            .and_then(|prev| self.sub_paths[prev.index()].curve.as_ref())
            .map(|curve| curve.end)
            .ok_or_else(|| Error::construction("pass-through without incoming curve"))?;
        let end = next
            .and_then(|next| self.sub_paths[next.index()].curve.as_ref())
            .map(|curve| curve.start)
            .ok_or_else(|| Error::construction("pass-through without outgoing curve"))?;
        Ok(Curve::smooth_spline(start, end, self.config.spline_tension))
    }

    /// Node-to-path / path-to-node: candidate construction with recursive
    /// splitting.
    fn layout_dynamic(&mut self, id: SubPathId) -> Result<Curve> {
        let (source, target, connection_type, previous, next) = {
            let sub = &self.sub_paths[id.index()];
            (
                sub.source,
                sub.target,
                sub.connection_type,
                sub.previous,
                sub.next,
            )
        };
        // The router only reads; make sure every slot it may ask for exists.
        self.ensure_calculated(source, Side::Outside);
        self.ensure_calculated(target, Side::Outside);

        let to_node = connection_type == ConnectionType::PathToNode;
        let path_anchor = if to_node {
            previous
                .and_then(|prev| self.sub_paths[prev.index()].curve.as_ref())
                .map(|curve| curve.end)
        } else {
            next.and_then(|next| self.sub_paths[next.index()].curve.as_ref())
                .map(|curve| curve.start)
        }
        .ok_or_else(|| Error::construction("neighbouring curve not resolved"))?;

        let node_path = self.sub_paths[id.index()].node_path.clone();
        router::solve(self, id, &node_path, path_anchor, to_node)
            .ok_or_else(|| Error::construction("every candidate and split exhausted"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClusterSpec, EdgeSpec, NodeSpec};

    fn spec() -> GraphSpec {
        GraphSpec {
            nodes: ["a", "b", "c", "d", "e", "f"].map(NodeSpec::new).to_vec(),
            edges: vec![EdgeSpec::new("a", "d")],
            clusters: vec![
                ClusterSpec::new("h1", &["a", "b", "c"]),
                ClusterSpec::new("h2", &["d", "e", "f"]),
            ],
            config: LayoutConfig::default(),
        }
    }

    #[test]
    fn decomposition_links_the_chain() {
        let session = LayoutSession::build(&spec()).unwrap();
        let ids = session.sub_paths_of(session.connections()[0].id);
        assert_eq!(ids.len(), 3);
        let [first, middle, last] = [ids[0], ids[1], ids[2]];
        assert_eq!(session.sub_paths()[first.index()].next, Some(middle));
        assert_eq!(session.sub_paths()[middle.index()].previous, Some(first));
        assert_eq!(session.sub_paths()[middle.index()].next, Some(last));
        assert_eq!(session.sub_paths()[last.index()].previous, Some(middle));
    }

    #[test]
    fn level_changing_sub_paths_register_outside() {
        let session = LayoutSession::build(&spec()).unwrap();
        let hierarchy = session.hierarchy();
        let a = hierarchy.resolve("a").unwrap();
        let d = hierarchy.resolve("d").unwrap();
        assert!(session.allocator(a, Side::Outside).is_some());
        assert!(session.allocator(d, Side::Outside).is_some());
        assert!(session.allocator(a, Side::Inside).is_none());
    }

    #[test]
    fn adjacent_hypernodes_register_circular_lanes() {
        let session = LayoutSession::build(&spec()).unwrap();
        let hierarchy = session.hierarchy();
        let h1 = hierarchy.resolve("h1").unwrap();
        let h2 = hierarchy.resolve("h2").unwrap();
        assert!(session.allocator(h1, Side::CircularForward).is_some());
        assert!(session.allocator(h2, Side::CircularBackward).is_some());
    }

    #[test]
    fn hyper_edges_share_the_community_segment() {
        let mut graph = spec();
        graph.config.use_hyper_edges = true;
        graph.edges.push(EdgeSpec::new("b", "e"));
        let session = LayoutSession::build(&graph).unwrap();
        let h1 = session.hierarchy().resolve("h1").unwrap();
        let h2 = session.hierarchy().resolve("h2").unwrap();
        let community_segments: Vec<_> = session
            .sub_paths()
            .iter()
            .filter(|sub| sub.source == h1 && sub.target == h2)
            .collect();
        assert_eq!(community_segments.len(), 2);
        assert!(community_segments[0].group.is_some());
        assert_eq!(community_segments[0].group, community_segments[1].group);
    }
}
