//! Dynamic construction of level-changing curves.
//!
//! One end of such a sub-path is fixed: the anchor handed over by the
//! neighbouring, already-resolved segment. The other end is free on the
//! remaining node's boundary. Candidates are tried in a fixed order; when
//! none fits the whole node-path, the path is split near the fixed end and
//! both halves are solved recursively.

use nautilus_core::radial::{
    anchor_direction_on_circle, circle_from_point_and_tangent_anchor, closest_point_to,
    forward_is_short, forward_rad, rad_is_between, rad_of_point,
};
use nautilus_core::{Anchor, ArcDirection, Curve};

use crate::hierarchy::NodeId;
use crate::session::LayoutSession;
use crate::subpath::SubPathId;

/// Solves a level-changing sub-path. `to_node` marks a path-to-node segment
/// (fixed start, free end); otherwise the segment is node-to-path (free
/// start, fixed end). The returned curve always runs in travel direction.
pub(crate) fn solve(
    session: &LayoutSession,
    sub_path: SubPathId,
    node_path: &[NodeId],
    path_anchor: Anchor,
    to_node: bool,
) -> Option<Curve> {
    if node_path.len() < 2 {
        return None;
    }
    let free = if to_node {
        *node_path.last()?
    } else {
        node_path[0]
    };

    type Candidate =
        fn(&LayoutSession, SubPathId, NodeId, &Anchor, &[NodeId], bool) -> Option<Curve>;
    let candidates: [Candidate; 3] = [direct_arc, spline, circle_segment];
    for candidate in candidates {
        if let Some(curve) = candidate(session, sub_path, free, &path_anchor, node_path, to_node) {
            return Some(curve);
        }
    }

    // No candidate spans the whole path; hand over at an intermediate node,
    // nearest the fixed anchor first.
    let len = node_path.len();
    for i in 1..len - 1 {
        if to_node {
            let near = &node_path[..len - i];
            let Some(near_curve) = solve(session, sub_path, near, path_anchor, true) else {
                continue;
            };
            let handoff = near_curve.end;
            let far = &node_path[len - i - 1..];
            if let Some(far_curve) = solve(session, sub_path, far, handoff, true) {
                return Some(near_curve.join(far_curve));
            }
        } else {
            let near = &node_path[i..];
            let Some(near_curve) = solve(session, sub_path, near, path_anchor, false) else {
                continue;
            };
            let handoff = near_curve.start;
            let far = &node_path[..=i];
            if let Some(far_curve) = solve(session, sub_path, far, handoff, false) {
                return Some(far_curve.join(near_curve));
            }
        }
    }
    None
}

/// Candidate 1: a single circular arc tangent to the fixed anchor, ending on
/// the free node's outer circle.
fn direct_arc(
    session: &LayoutSession,
    sub_path: SubPathId,
    free: NodeId,
    path_anchor: &Anchor,
    node_path: &[NodeId],
    to_node: bool,
) -> Option<Curve> {
    let free_node = session.hierarchy.node(free);
    let arc_circle = circle_from_point_and_tangent_anchor(free_node.center, path_anchor)?;
    let hits = free_node.outer_circle().intersect_circle(&arc_circle);
    let node_point = closest_point_to(&hits, path_anchor.point)?;

    // A registered free end must land inside its allocated slot.
    if let Some(slot) = session.outer_slot(sub_path, free) {
        let rad = rad_of_point(free_node.center, node_point);
        if !rad_is_between(rad, slot[0], slot[1]) {
            return None;
        }
    }

    // Travelling along the arc from the fixed anchor, the free-node
    // attachment must come before any crossing into a constraining node's
    // interior.
    let center = arc_circle.center;
    let travel = anchor_direction_on_circle(path_anchor, center);
    let anchor_rad = rad_of_point(center, path_anchor.point);
    let node_rad = rad_of_point(center, node_point);
    for &constraining in node_path {
        let inner = session.hierarchy.node(constraining).inner_circle();
        let crossings = inner.intersect_circle(&arc_circle);
        let Some(crossing) = closest_point_to(&crossings, path_anchor.point) else {
            continue;
        };
        let crossing_rad = rad_of_point(center, crossing);
        let valid = match (to_node, travel) {
            (true, ArcDirection::CounterClockwise) | (false, ArcDirection::Clockwise) => {
                forward_rad(anchor_rad, crossing_rad) > forward_rad(anchor_rad, node_rad)
            }
            (true, ArcDirection::Clockwise) | (false, ArcDirection::CounterClockwise) => {
                forward_rad(crossing_rad, anchor_rad) > forward_rad(node_rad, anchor_rad)
            }
        };
        if !valid {
            return None;
        }
    }

    let (start_point, end_point) = if to_node {
        (path_anchor.point, node_point)
    } else {
        (node_point, path_anchor.point)
    };
    let start_rad = rad_of_point(center, start_point);
    let end_rad = rad_of_point(center, end_point);
    let mut curve = Curve::arc(arc_circle, start_rad, end_rad, ArcDirection::CounterClockwise);
    let fixed_end = if to_node { &curve.start } else { &curve.end };
    if fixed_end.direction.dot(path_anchor.direction) < 0.0 {
        curve = Curve::arc(arc_circle, start_rad, end_rad, ArcDirection::Clockwise);
    }
    Some(curve)
}

/// Candidate 2: a smooth spline to an allocated anchor on the free node;
/// only valid when the straight chord stays clear of every constraining
/// node's interior (crossings in front of the free node's own outer range
/// are tolerated).
fn spline(
    session: &LayoutSession,
    sub_path: SubPathId,
    free: NodeId,
    path_anchor: &Anchor,
    node_path: &[NodeId],
    to_node: bool,
) -> Option<Curve> {
    let free_node = session.hierarchy.node(free);
    let towards = session
        .desired_node_anchor(sub_path, free)
        .map(|anchor| anchor.point)
        .unwrap_or(path_anchor.point);
    let node_anchor = session.outer_anchor_towards(sub_path, free, towards);

    let outer_range = session.outer_range_of(free);
    for &constraining in node_path {
        let inner = session.hierarchy.node(constraining).inner_circle();
        let crossings = inner.intersect_segment(path_anchor.point, node_anchor.point);
        let tolerated = crossings.iter().all(|&p| {
            rad_is_between(
                rad_of_point(free_node.center, p),
                outer_range[0],
                outer_range[1],
            )
        });
        if !tolerated {
            return None;
        }
    }

    let tension = session.config.spline_tension;
    Some(if to_node {
        Curve::smooth_spline(*path_anchor, node_anchor.reversed(), tension)
    } else {
        Curve::smooth_spline(node_anchor, *path_anchor, tension)
    })
}

/// Candidate 3: ride just inside the rim of the node carrying the fixed
/// anchor, then head for the free node.
fn circle_segment(
    session: &LayoutSession,
    sub_path: SubPathId,
    free: NodeId,
    path_anchor: &Anchor,
    node_path: &[NodeId],
    to_node: bool,
) -> Option<Curve> {
    let ride_node = if to_node {
        node_path[0]
    } else {
        *node_path.last()?
    };
    let ride = session
        .hierarchy
        .node(ride_node)
        .circle()
        .scaled(session.config.circle_segment_scale);
    if ride.radius < f64::EPSILON {
        return None;
    }
    let node_anchor = session.outer_anchor_towards(sub_path, free, path_anchor.point);
    let tension = session.config.spline_tension;

    let (entry, exit) = if to_node {
        (
            rad_of_point(ride.center, path_anchor.point),
            rad_of_point(ride.center, node_anchor.point),
        )
    } else {
        (
            rad_of_point(ride.center, node_anchor.point),
            rad_of_point(ride.center, path_anchor.point),
        )
    };
    let direction = if forward_is_short(entry, exit) {
        ArcDirection::CounterClockwise
    } else {
        ArcDirection::Clockwise
    };
    let arc = Curve::arc(ride, entry, exit, direction);
    let (lead_start, tail_end) = if to_node {
        (*path_anchor, node_anchor.reversed())
    } else {
        (node_anchor, *path_anchor)
    };
    let lead = Curve::smooth_spline(lead_start, arc.start, tension);
    let tail = Curve::smooth_spline(arc.end, tail_end, tension);
    Some(lead.join(arc).join(tail))
}
