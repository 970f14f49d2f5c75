use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Flat tuning surface of the layout engine.
///
/// All values have working defaults; deserializing a partial document fills
/// the rest in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    /// Radius of a leaf with no score, and scale of scored leaves.
    pub size_multiplier: f64,
    /// Smallest scored leaf radius, as a fraction of `size_multiplier`.
    pub min_size_fraction: f64,
    /// Shrink factor for virtual pass-through nodes.
    pub virtual_node_size_factor: f64,
    /// Hard lower bound for any node radius.
    pub min_node_radius: f64,
    /// `outer_radius = radius * outer_radius_factor`.
    pub outer_radius_factor: f64,

    /// Spacing between sibling leaves on their placement circle.
    pub node_margin_factor: f64,
    /// Spacing between sibling hypernodes; kept tighter than leaves.
    pub hyper_node_margin_factor: f64,
    /// Growth applied to a parent radius around its fitted children.
    pub radius_margin_factor: f64,
    /// Angle of the first child on a placement circle.
    pub start_angle_deg: f64,

    /// Refine slot positions towards desired anchors.
    pub optimize_connection_anchors: bool,
    /// Lower bound of a refined slot, relative to the even split.
    pub minimum_range_size_factor: f64,
    /// Gap carved out of each slot between adjacent curves.
    pub range_padding_factor: f64,
    /// Slot separation for a bidirectional pair, relative to unit spacing.
    pub combined_paths_distance_factor: f64,
    /// Pack exact-reverse sub-paths as one visual bundle.
    pub combine_counter_paths: bool,
    /// Decompose connections along the hypernode hierarchy.
    pub use_hierarchical_sub_paths: bool,
    /// Collapse parallel sub-paths between the same hypernodes.
    pub use_hyper_edges: bool,
    /// Plant virtual pass-through stand-ins inside foreign communities, so
    /// cross-community connections detour through a marker node.
    pub use_virtual_nodes: bool,

    /// Fraction of the geometric valid span that sub-paths may occupy.
    pub valid_range_margin_factor: f64,
    /// Margin between neighbouring sub-ranges of one node side.
    pub path_range_margin_factor: f64,
    /// Inner offset of the circular-arc lane, relative to the smaller node.
    pub circular_range_start_factor: f64,
    /// Outer offset of the circular-arc lane, relative to the smaller node.
    pub circular_range_end_factor: f64,

    /// Control-point distance of splines inside a parent circle.
    pub spline_tension: f64,
    /// Control-point distance of splines between different parents.
    pub outside_spline_tension: f64,
    /// Shrink factor of the fallback ride-around circle segment.
    pub circle_segment_scale: f64,

    /// Forward angular difference above which a same-parent link is routed
    /// outside the parent circle instead of through it.
    pub forward_backward_threshold_deg: f64,
    /// Angle delta at which an outside forward link renders straight;
    /// smaller deltas bow concave, larger deltas convex.
    pub straight_forward_line_delta_deg: f64,
    /// Angle delta at which an outside backward link renders straight.
    pub backward_line_curvature_deg: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            size_multiplier: 50.0,
            min_size_fraction: 0.2,
            virtual_node_size_factor: 0.7,
            min_node_radius: 0.1,
            outer_radius_factor: 1.1,

            node_margin_factor: 1.0,
            hyper_node_margin_factor: 0.4,
            radius_margin_factor: 1.1,
            start_angle_deg: -90.0,

            optimize_connection_anchors: true,
            minimum_range_size_factor: 0.2,
            range_padding_factor: 0.1,
            combined_paths_distance_factor: 0.2,
            combine_counter_paths: true,
            use_hierarchical_sub_paths: true,
            use_hyper_edges: false,
            use_virtual_nodes: false,

            valid_range_margin_factor: 0.9,
            path_range_margin_factor: 0.1,
            circular_range_start_factor: 0.2,
            circular_range_end_factor: -0.4,

            spline_tension: 0.4,
            outside_spline_tension: 0.5,
            circle_segment_scale: 0.9,

            forward_backward_threshold_deg: 270.0,
            straight_forward_line_delta_deg: 135.0,
            backward_line_curvature_deg: 120.0,
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<()> {
        if self.size_multiplier <= 0.0 {
            return Err(Error::InvalidConfig {
                message: format!("sizeMultiplier must be positive, got {}", self.size_multiplier),
            });
        }
        if !(0.0..=1.0).contains(&self.min_size_fraction) {
            return Err(Error::InvalidConfig {
                message: format!(
                    "minSizeFraction must be in [0, 1], got {}",
                    self.min_size_fraction
                ),
            });
        }
        if self.outer_radius_factor < 1.0 {
            return Err(Error::InvalidConfig {
                message: format!(
                    "outerRadiusFactor must be at least 1, got {}",
                    self.outer_radius_factor
                ),
            });
        }
        if self.radius_margin_factor < 1.0 {
            return Err(Error::InvalidConfig {
                message: format!(
                    "radiusMarginFactor must be at least 1, got {}",
                    self.radius_margin_factor
                ),
            });
        }
        for (name, value) in [
            ("nodeMarginFactor", self.node_margin_factor),
            ("hyperNodeMarginFactor", self.hyper_node_margin_factor),
            ("validRangeMarginFactor", self.valid_range_margin_factor),
            ("pathRangeMarginFactor", self.path_range_margin_factor),
            ("splineTension", self.spline_tension),
            ("outsideSplineTension", self.outside_spline_tension),
            ("circleSegmentScale", self.circle_segment_scale),
        ] {
            if value < 0.0 {
                return Err(Error::InvalidConfig {
                    message: format!("{name} must not be negative, got {value}"),
                });
            }
        }
        Ok(())
    }

    pub fn start_angle_rad(&self) -> f64 {
        self.start_angle_deg.to_radians()
    }

    pub fn forward_backward_threshold_rad(&self) -> f64 {
        self.forward_backward_threshold_deg.to_radians()
    }

    /// Margin factor for a child: hypernodes pack tighter than leaves.
    pub fn margin_factor_for(&self, is_hyper: bool) -> f64 {
        if is_hyper {
            self.hyper_node_margin_factor
        } else {
            self.node_margin_factor
        }
    }
}
