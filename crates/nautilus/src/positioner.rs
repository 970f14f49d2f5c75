//! Node sizing and recursive radial placement.
//!
//! Children are laid out in parent-local coordinates (parent at the origin),
//! bottom-up; absolute positions are resolved in one final pass.

use std::f64::consts::TAU;

use nautilus_core::LayoutConfig;
use nautilus_core::enclosing::minimum_enclosing_circle;
use nautilus_core::geom::{Point, Vector, point, slope, vector};
use nautilus_core::radial::position_on_circle_at_rad;

use crate::hierarchy::{Hierarchy, NodeId};

/// Score at which a leaf reaches its minimum size fraction.
const MIN_SIZE_SCORE: f64 = 0.1;
/// Score at which a leaf reaches the full size multiplier.
const MAX_SIZE_SCORE: f64 = 1.0;

pub fn run(hierarchy: &mut Hierarchy, config: &LayoutConfig) {
    size_leaves(hierarchy, config);
    layout_subtree(hierarchy, config, hierarchy.root);
    place_absolute(hierarchy, hierarchy.root, vector(0.0, 0.0));
}

fn size_leaves(hierarchy: &mut Hierarchy, config: &LayoutConfig) {
    let ids: Vec<NodeId> = hierarchy.iter().map(|n| n.id).collect();
    for id in ids {
        if hierarchy.node(id).is_hyper_node() {
            continue;
        }
        let node = hierarchy.node(id);
        let fraction = match node.score {
            Some(score) => score_to_size_fraction(score, config.min_size_fraction),
            None => 1.0,
        };
        let mut radius = fraction * config.size_multiplier;
        if node.is_virtual() {
            radius *= config.virtual_node_size_factor;
        }
        radius = radius.max(config.min_node_radius);
        let node = hierarchy.node_mut(id);
        node.radius = radius;
        node.outer_radius = radius * config.outer_radius_factor;
    }
}

/// Log scale from score to size fraction, `MIN_SIZE_SCORE` mapping to
/// `min_fraction` and `MAX_SIZE_SCORE` to 1. Scores above the domain
/// extrapolate; scores below are clamped.
fn score_to_size_fraction(score: f64, min_fraction: f64) -> f64 {
    let score = score.max(MIN_SIZE_SCORE);
    let t = (score / MIN_SIZE_SCORE).ln() / (MAX_SIZE_SCORE / MIN_SIZE_SCORE).ln();
    min_fraction + (1.0 - min_fraction) * t
}

fn layout_subtree(hierarchy: &mut Hierarchy, config: &LayoutConfig, id: NodeId) {
    for child in hierarchy.node(id).children.clone() {
        layout_subtree(hierarchy, config, child);
    }
    if hierarchy.node(id).is_hyper_node() {
        position_children(hierarchy, config, id);
        let node = hierarchy.node_mut(id);
        node.outer_radius = node.radius * config.outer_radius_factor;
    }
}

fn position_children(hierarchy: &mut Hierarchy, config: &LayoutConfig, parent: NodeId) {
    let children = hierarchy.node(parent).children.clone();
    let origin = point(0.0, 0.0);
    let radius_margin = config.radius_margin_factor;

    // Walk the circumference continuum: every child claims its outer
    // diameter plus margin on both sides; the mid of its claim is its
    // placement position.
    let mut current_position = 0.0;
    let mut continuum = Vec::with_capacity(children.len());
    for &child in &children {
        let node = hierarchy.node(child);
        let margin = config.margin_factor_for(node.is_hyper_node());
        let r = node.outer_radius;
        current_position += r * margin + r;
        continuum.push(current_position);
        current_position += r + r * margin;
    }
    let radius = current_position / TAU;

    match children.len() {
        1 => {
            let child = children[0];
            let (child_radius, child_outer) = {
                let node = hierarchy.node(child);
                (node.radius, node.outer_radius)
            };
            hierarchy.node_mut(child).center = origin;
            let parent_node = hierarchy.node_mut(parent);
            parent_node.inner_radius = child_radius;
            parent_node.radius = child_outer;
            parent_node.inner_enclosing_radius = child_outer;
            parent_node.inner_center_translation = vector(0.0, 0.0);
            // A single point cannot tighten further; skip the enclosing fit.
            return;
        }
        2 => {
            let r0 = hierarchy.node(children[0]).radius;
            let r1 = hierarchy.node(children[1]).radius;
            let margin_factor = config
                .margin_factor_for(hierarchy.node(children[0]).is_hyper_node())
                .max(config.margin_factor_for(hierarchy.node(children[1]).is_hyper_node()));

            let without_margin = r0 + r1;
            let margin = without_margin * margin_factor;
            let distance_between_centers = without_margin + margin;
            let half = distance_between_centers / 2.0;

            hierarchy.node_mut(children[0]).center = point(-half, 0.0);
            hierarchy.node_mut(children[1]).center = point(half, 0.0);

            let parent_node = hierarchy.node_mut(parent);
            parent_node.inner_radius = half;
            parent_node.radius = (without_margin + margin / 2.0) * radius_margin;
        }
        _ => {
            let start_angle = config.start_angle_rad();
            let mut max_child_radius: f64 = 0.0;
            for (i, &child) in children.iter().enumerate() {
                let placement = continuum[i] / current_position;
                let angle = start_angle + placement * TAU;
                let center = position_on_circle_at_rad(angle, radius, origin);
                hierarchy.node_mut(child).center = center;
                max_child_radius = max_child_radius.max(hierarchy.node(child).radius);

                // A pass-through child is turned to face the parent center.
                if let Some(anchor) = anchor_child(hierarchy, child) {
                    let anchor_center = hierarchy.node(anchor).center;
                    let current_slope = slope(origin - anchor_center);
                    hierarchy.rotate_children_locally(child, angle - current_slope, origin);
                }
            }
            let parent_node = hierarchy.node_mut(parent);
            parent_node.radius = (radius + max_child_radius) * radius_margin;
            parent_node.inner_radius = radius;
        }
    }

    adapt_enclosing_circle(hierarchy, config, parent, origin);
}

/// The pass-through pivot of a hypernode: its sole virtual child, if any.
fn anchor_child(hierarchy: &Hierarchy, id: NodeId) -> Option<NodeId> {
    let mut found = None;
    for &child in &hierarchy.node(id).children {
        if hierarchy.node(child).is_virtual() {
            if found.is_some() {
                return None;
            }
            found = Some(child);
        }
    }
    found
}

/// Tightens the parent around the minimum enclosing circle of the
/// children's outward-expanded boundary points, re-centering the inner
/// layout to the fitted circle.
fn adapt_enclosing_circle(
    hierarchy: &mut Hierarchy,
    config: &LayoutConfig,
    parent: NodeId,
    origin: Point,
) {
    let children = hierarchy.node(parent).children.clone();

    let expanded: Vec<Point> = children
        .iter()
        .map(|&child| {
            let node = hierarchy.node(child);
            let direction = node.center - origin;
            let length = direction.length();
            if length < f64::EPSILON {
                node.center
            } else {
                node.center + direction * (node.outer_radius / length)
            }
        })
        .collect();

    let enclosing = minimum_enclosing_circle(&expanded);
    let inner_translation: Vector = enclosing.center - origin;

    let parent_node = hierarchy.node_mut(parent);
    parent_node.radius = enclosing.radius * config.radius_margin_factor;
    parent_node.inner_enclosing_radius = enclosing.radius;
    parent_node.inner_center_translation = inner_translation;

    for child in children {
        hierarchy.node_mut(child).center -= inner_translation;
    }
}

/// Converts parent-local centers into absolute ones, top-down.
fn place_absolute(hierarchy: &mut Hierarchy, id: NodeId, offset: Vector) {
    hierarchy.node_mut(id).center += offset;
    let child_offset = hierarchy.node(id).center.to_vector();
    for child in hierarchy.node(id).children.clone() {
        place_absolute(hierarchy, child, child_offset);
    }
}
