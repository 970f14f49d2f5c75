//! Per-node angular range allocation.
//!
//! Every node side (facing the parent center, facing away, or the two
//! circular-arc lanes) owns one allocator. Sub-paths register while the
//! connections are decomposed; the first anchor query calculates the whole
//! side at once and the results are cached.

use std::cmp::Ordering;
use std::f64::consts::PI;

use nautilus_core::geom::Point;
use nautilus_core::radial::{
    forward_rad, middle_rad, normalize_rad, put_rad_between, rad_is_between, rad_of_point,
};
use nautilus_core::{Anchor, ArcDirection, LayoutConfig, RadClamp};
use rustc_hash::FxHashMap;

use crate::hierarchy::{Hierarchy, NodeId};
use crate::subpath::SubPathId;

/// Two sort keys within 0.01 rad count as coincident.
const RAD_EPSILON: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    /// Facing the parent's inner center.
    Inside,
    /// Facing away from the parent.
    Outside,
    /// Lane towards the next sibling (counter-clockwise sweep).
    CircularForward,
    /// Lane towards the previous sibling (clockwise sweep).
    CircularBackward,
}

/// Whether an anchor points out of the node or into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorFacing {
    Out,
    In,
}

/// Everything the allocator needs to know about one registered sub-path;
/// assembled by the session right before calculation.
#[derive(Debug, Clone)]
pub struct PathInfo {
    pub id: SubPathId,
    /// Depth of the shallower connection-side endpoint.
    pub level: usize,
    /// Forward angle from the backside to the opposite connection point.
    pub forward_to_connection_point: f64,
    /// Forward angle from the backside to the opposite node center.
    pub forward_to_opposite_node: f64,
    /// Angle of the propagated desired anchor, when a neighbouring curve is
    /// already resolved.
    pub desired_rad: Option<f64>,
    /// The sub-path leaves this node (its source is here).
    pub outgoing: bool,
    /// Connection endpoints; an exact swap marks a counter-path pair.
    pub endpoints: (NodeId, NodeId),
}

#[derive(Debug)]
pub struct RangeAllocator {
    pub node: NodeId,
    pub side: Side,
    center: Point,
    outer_radius: f64,
    range: [f64; 2],
    backside_rad: f64,
    outer_margin: f64,
    sub_paths: Vec<SubPathId>,
    calculated: bool,
    assigned_rads: FxHashMap<SubPathId, f64>,
    assigned_ranges: FxHashMap<SubPathId, [f64; 2]>,
}

impl RangeAllocator {
    pub fn new(hierarchy: &Hierarchy, node: NodeId, side: Side, config: &LayoutConfig) -> Self {
        let layout_node = hierarchy.node(node);
        let center = layout_node.center;
        let factor = config.valid_range_margin_factor;
        let (range, full_range) = match side {
            Side::Inside => (
                hierarchy.valid_inner_rad_range(node, factor),
                hierarchy.valid_inner_rad_range(node, 1.0),
            ),
            Side::Outside => (
                hierarchy.valid_outer_rad_range(node, factor, false),
                hierarchy.valid_outer_rad_range(node, 1.0, false),
            ),
            Side::CircularForward => {
                let range = hierarchy.valid_circular_rad_range(
                    node,
                    config.circular_range_start_factor,
                    config.circular_range_end_factor,
                    ArcDirection::CounterClockwise,
                );
                (range, range)
            }
            Side::CircularBackward => {
                let range = hierarchy.valid_circular_rad_range(
                    node,
                    config.circular_range_start_factor,
                    config.circular_range_end_factor,
                    ArcDirection::Clockwise,
                );
                (range, range)
            }
        };
        let backside_rad = match (side, layout_node.parent) {
            (Side::Outside, Some(parent)) => {
                rad_of_point(center, hierarchy.node(parent).inner_circle().center)
            }
            _ => normalize_rad(middle_rad(range[0], range[1]) + PI),
        };
        Self {
            node,
            side,
            center,
            outer_radius: layout_node.outer_radius,
            range,
            backside_rad,
            outer_margin: forward_rad(full_range[0], range[0]),
            sub_paths: Vec::new(),
            calculated: false,
            assigned_rads: FxHashMap::default(),
            assigned_ranges: FxHashMap::default(),
        }
    }

    pub fn register(&mut self, id: SubPathId) {
        debug_assert!(!self.calculated, "registration after calculation");
        if !self.sub_paths.contains(&id) {
            self.sub_paths.push(id);
        }
    }

    pub fn has(&self, id: SubPathId) -> bool {
        self.sub_paths.contains(&id)
    }

    pub fn is_calculated(&self) -> bool {
        self.calculated
    }

    pub fn sub_paths(&self) -> &[SubPathId] {
        &self.sub_paths
    }

    pub fn valid_range(&self) -> [f64; 2] {
        self.range
    }

    pub fn backside_rad(&self) -> f64 {
        self.backside_rad
    }

    pub fn rad_of(&self, point: Point) -> f64 {
        rad_of_point(self.center, point)
    }

    pub fn rad_inside(&self, rad: f64) -> bool {
        rad_is_between(rad, self.range[0], self.range[1])
    }

    pub fn point_inside(&self, point: Point) -> bool {
        self.rad_inside(self.rad_of(point))
    }

    /// Boundary anchor at an angle, pointing out of or into the node.
    pub fn anchor_at(&self, rad: f64, facing: AnchorFacing) -> Anchor {
        let anchor = Anchor::at_angle(self.center, rad).moved(self.outer_radius);
        match facing {
            AnchorFacing::Out => anchor,
            AnchorFacing::In => anchor.reversed(),
        }
    }

    pub fn assigned_rad(&self, id: SubPathId) -> Option<f64> {
        debug_assert!(self.calculated, "query before calculation");
        self.assigned_rads.get(&id).copied()
    }

    pub fn assigned_range(&self, id: SubPathId) -> Option<[f64; 2]> {
        debug_assert!(self.calculated, "query before calculation");
        self.assigned_ranges.get(&id).copied()
    }

    pub fn anchor_for(&self, id: SubPathId, facing: AnchorFacing) -> Option<Anchor> {
        Some(self.anchor_at(self.assigned_rad(id)?, facing))
    }

    /// Anchor as close to the direction of `towards` as the constraint
    /// allows: the sub-path's assigned slot when given, the valid span
    /// otherwise.
    pub fn anchor_towards(&self, towards: Point, slot: Option<[f64; 2]>) -> Anchor {
        let [start, end] = slot.unwrap_or(self.range);
        let rad = put_rad_between(self.rad_of(towards), start, end, RadClamp::Closer);
        self.anchor_at(rad, AnchorFacing::Out)
    }

    /// A resolved circular arc claims boundary space: the span side whose
    /// middle reaches the arc's attachment point forward within half a turn
    /// is pulled in to it.
    pub fn trim_to_anchor(&mut self, point: Point) {
        let rad = self.rad_of(point);
        if !self.rad_inside(rad) {
            return;
        }
        let middle = middle_rad(self.range[0], self.range[1]);
        if forward_rad(middle, rad) < PI {
            self.range[1] = normalize_rad(rad - self.outer_margin);
        } else {
            self.range[0] = normalize_rad(rad + self.outer_margin);
        }
        // Already-calculated results refer to the untrimmed span.
        self.calculated = false;
        self.assigned_rads.clear();
        self.assigned_ranges.clear();
    }

    /// Distributes the registered sub-paths over the valid span. `infos`
    /// carries one entry per registered sub-path (any order).
    pub fn calculate(&mut self, mut infos: Vec<PathInfo>, config: &LayoutConfig) {
        debug_assert_eq!(infos.len(), self.sub_paths.len());
        self.calculated = true;
        if infos.is_empty() {
            return;
        }

        infos.sort_by(|a, b| compare_paths(a, b));

        let count = infos.len();
        let factor = if config.combine_counter_paths {
            config.combined_paths_distance_factor
        } else {
            1.0
        };
        let counter = |a: &PathInfo, b: &PathInfo| {
            a.endpoints.0 == b.endpoints.1 && a.endpoints.1 == b.endpoints.0
        };

        // Unit slots along an abstract continuum; a counter-path pair shares
        // the middle of its two units instead of spreading over them.
        let mut slots: Vec<[f64; 2]> = Vec::with_capacity(count);
        let mut has_counter = vec![false; count];
        let mut cursor = 0.0;
        for (i, info) in infos.iter().enumerate() {
            let mut slot = [cursor, cursor];
            let mut padding = 0.0;
            if i + 1 < count && counter(info, &infos[i + 1]) && factor < 1.0 {
                slot[0] += 1.0 - factor;
                slot[1] = slot[0] + factor;
                has_counter[i] = true;
            } else if i > 0 && counter(info, &infos[i - 1]) && factor < 1.0 {
                slot[1] += factor;
                padding = 1.0 - factor;
                has_counter[i] = true;
            } else {
                slot[1] += 1.0;
            }
            cursor = slot[1] + padding;
            slots.push(slot);
        }
        let total = cursor;

        // Map the continuum onto the valid span and carve the inter-slot
        // margin out of each slot.
        let span = forward_rad(self.range[0], self.range[1]);
        let mut ranges: Vec<[f64; 2]> = slots
            .iter()
            .map(|slot| {
                let start = normalize_rad(self.range[0] + slot[0] / total * span);
                let end = normalize_rad(self.range[0] + slot[1] / total * span);
                let margin = forward_rad(start, end) * config.path_range_margin_factor / 2.0;
                [normalize_rad(start + margin), normalize_rad(end - margin)]
            })
            .collect();

        if config.optimize_connection_anchors {
            self.refine(&infos, &mut ranges, span, config);
        }

        for (i, info) in infos.iter().enumerate() {
            let [start, end] = ranges[i];
            let rad = match info.desired_rad {
                Some(desired) if !has_counter[i] => {
                    put_rad_between(desired, start, end, RadClamp::Closer)
                }
                _ => middle_rad(start, end),
            };
            self.assigned_rads.insert(info.id, rad);
            self.assigned_ranges.insert(info.id, [start, end]);
        }
    }

    /// Moves slots towards propagated desired anchors. A slot whose desired
    /// angle already falls inside it contracts to a minimum-size window
    /// around that angle; the neighbours yield, keeping a minimum size and
    /// separation of their own. Repeats until no slot changes, which is
    /// bounded by the slot count since every change pins one slot.
    fn refine(
        &self,
        infos: &[PathInfo],
        ranges: &mut [[f64; 2]],
        span: f64,
        config: &LayoutConfig,
    ) {
        let count = infos.len();
        let min_distance = config.path_range_margin_factor * span / count as f64;
        let min_size = config.minimum_range_size_factor * span / count as f64;
        let mut pinned = vec![false; count];
        let mut changed = true;
        while changed {
            changed = false;
            for i in 0..count {
                if pinned[i] {
                    continue;
                }
                let Some(desired) = infos[i].desired_rad else {
                    continue;
                };
                if !rad_is_between(desired, ranges[i][0], ranges[i][1]) {
                    continue;
                }
                ranges[i] = [
                    normalize_rad(desired - min_size / 2.0),
                    normalize_rad(desired + min_size / 2.0),
                ];
                if i > 0 {
                    ranges[i - 1][1] = normalize_rad(ranges[i][0] - min_distance);
                    if forward_rad(ranges[i - 1][0], ranges[i - 1][1]) < min_size {
                        ranges[i - 1][0] = normalize_rad(ranges[i - 1][1] - min_size);
                    }
                }
                if i + 1 < count {
                    ranges[i + 1][0] = normalize_rad(ranges[i][1] + min_distance);
                    if forward_rad(ranges[i + 1][0], ranges[i + 1][1]) < min_size {
                        ranges[i + 1][1] = normalize_rad(ranges[i + 1][0] + min_size);
                    }
                }
                pinned[i] = true;
                changed = true;
            }
        }
    }
}

/// Quantized sort angle. Coincidence within an epsilon bucket is an
/// equivalence, not a pairwise tolerance, so the order below stays
/// transitive and `sort_by` never sees an inconsistent comparator.
fn rad_bucket(rad: f64) -> i64 {
    (rad / RAD_EPSILON).round() as i64
}

/// Order around the node: shallower connections first when their endpoint
/// sits in the forward half, then by forward angle to the opposite
/// connection point, outgoing before incoming on a tie.
fn compare_paths(a: &PathInfo, b: &PathInfo) -> Ordering {
    if a.level != b.level {
        let (lower, ascending) = if a.level < b.level { (a, true) } else { (b, false) };
        let lower_first = rad_bucket(lower.forward_to_connection_point) < rad_bucket(PI);
        return if lower_first == ascending {
            Ordering::Less
        } else {
            Ordering::Greater
        };
    }
    rad_bucket(a.forward_to_connection_point)
        .cmp(&rad_bucket(b.forward_to_connection_point))
        .then_with(|| match (a.outgoing, b.outgoing) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => a
                .forward_to_opposite_node
                .total_cmp(&b.forward_to_opposite_node),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nautilus_core::geom::point;

    fn allocator(range: [f64; 2]) -> RangeAllocator {
        RangeAllocator {
            node: NodeId::for_testing(1),
            side: Side::Inside,
            center: point(0.0, 0.0),
            outer_radius: 10.0,
            range,
            backside_rad: normalize_rad(middle_rad(range[0], range[1]) + PI),
            outer_margin: 0.05,
            sub_paths: Vec::new(),
            calculated: false,
            assigned_rads: FxHashMap::default(),
            assigned_ranges: FxHashMap::default(),
        }
    }

    fn info(id: u32, forward: f64) -> PathInfo {
        PathInfo {
            id: SubPathId(id),
            level: 1,
            forward_to_connection_point: forward,
            forward_to_opposite_node: forward,
            desired_rad: None,
            outgoing: true,
            endpoints: (NodeId::for_testing(10 + id), NodeId::for_testing(20 + id)),
        }
    }

    #[test]
    fn slots_are_even_and_ordered() {
        let mut alloc = allocator([0.0, 1.2]);
        for id in 0..3 {
            alloc.register(SubPathId(id));
        }
        // Registration order differs from angular order.
        let infos = vec![info(0, 2.0), info(1, 1.0), info(2, 3.0)];
        alloc.calculate(infos, &LayoutConfig::default());

        let rads: Vec<f64> = (0..3)
            .map(|id| alloc.assigned_rad(SubPathId(id)).unwrap())
            .collect();
        // Slot middles at 1/6, 3/6 and 5/6 of the span, in sort-key order.
        assert!((rads[1] - 0.2).abs() < 1e-9);
        assert!((rads[0] - 0.6).abs() < 1e-9);
        assert!((rads[2] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn counter_pair_is_packed_together() {
        let mut alloc = allocator([0.0, 3.0]);
        for id in 0..3 {
            alloc.register(SubPathId(id));
        }
        let a = NodeId::for_testing(1);
        let b = NodeId::for_testing(2);
        let mut forth = info(0, 1.0);
        forth.endpoints = (a, b);
        let mut back = info(1, 1.0);
        back.endpoints = (b, a);
        back.outgoing = false;
        let other = info(2, 2.0);
        alloc.calculate(vec![forth, back, other], &LayoutConfig::default());

        let rad_forth = alloc.assigned_rad(SubPathId(0)).unwrap();
        let rad_back = alloc.assigned_rad(SubPathId(1)).unwrap();
        let rad_other = alloc.assigned_rad(SubPathId(2)).unwrap();
        let pair_gap = (rad_forth - rad_back).abs();
        assert!(pair_gap < (rad_back - rad_other).abs());
        assert!(pair_gap < 0.25 * (rad_other - rad_forth).abs());
    }

    #[test]
    fn desired_rad_inside_slot_is_used_verbatim() {
        let mut alloc = allocator([0.0, 2.0]);
        alloc.register(SubPathId(0));
        alloc.register(SubPathId(1));
        let mut first = info(0, 1.0);
        first.desired_rad = Some(0.42);
        let second = info(1, 2.0);
        alloc.calculate(vec![first, second], &LayoutConfig::default());
        assert!((alloc.assigned_rad(SubPathId(0)).unwrap() - 0.42).abs() < 1e-9);
        // The neighbour keeps its distance.
        assert!(alloc.assigned_rad(SubPathId(1)).unwrap() > 0.42);
    }

    #[test]
    fn near_coincident_sort_keys_stay_transitive() {
        // Keys a fraction of an epsilon apart, mixed directions and levels,
        // half of them straddling the forward/backward boundary at pi.
        let mut infos = Vec::new();
        for i in 0..30u32 {
            let rad = if i % 2 == 0 {
                0.004 * f64::from(i)
            } else {
                PI + 0.004 * (f64::from(i) - 15.0)
            };
            let mut path = info(i, rad);
            path.outgoing = i % 3 == 0;
            path.level = 1 + (i % 3) as usize;
            infos.push(path);
        }
        for a in &infos {
            for b in &infos {
                match compare_paths(a, b) {
                    Ordering::Less => assert_eq!(compare_paths(b, a), Ordering::Greater),
                    Ordering::Greater => assert_eq!(compare_paths(b, a), Ordering::Less),
                    Ordering::Equal => assert_eq!(compare_paths(b, a), Ordering::Equal),
                }
            }
        }
        for a in &infos {
            for b in &infos {
                for c in &infos {
                    if compare_paths(a, b) != Ordering::Greater
                        && compare_paths(b, c) != Ordering::Greater
                    {
                        assert_ne!(compare_paths(a, c), Ordering::Greater);
                    }
                }
            }
        }
    }

    #[test]
    fn trim_pulls_the_near_side_in() {
        let mut alloc = allocator([0.0, 2.0]);
        alloc.register(SubPathId(0));
        // Anchor in the forward half relative to the middle trims the end.
        let anchor = point(10.0 * 1.8f64.cos(), 10.0 * 1.8f64.sin());
        alloc.trim_to_anchor(anchor);
        let [start, end] = alloc.valid_range();
        assert!((start - 0.0).abs() < 1e-9);
        assert!((end - (1.8 - 0.05)).abs() < 1e-9);
    }

    #[test]
    fn anchor_points_sit_on_the_outer_circle() {
        let mut alloc = allocator([0.0, 2.0]);
        alloc.register(SubPathId(0));
        alloc.calculate(vec![info(0, 1.0)], &LayoutConfig::default());
        let anchor = alloc.anchor_for(SubPathId(0), AnchorFacing::Out).unwrap();
        assert!((anchor.point.to_vector().length() - 10.0).abs() < 1e-9);
        // Outward anchors point away from the center.
        assert!(anchor.point.to_vector().dot(anchor.direction) > 0.0);
    }
}
