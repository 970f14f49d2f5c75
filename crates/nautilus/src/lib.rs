#![forbid(unsafe_code)]

//! Radial hierarchical graph layout with connection routing.
//!
//! Leaves are grouped into cluster hypernodes and packed recursively onto
//! circles; connections between leaves are decomposed into per-level
//! sub-paths, get angular ranges allocated on the node boundaries they
//! touch, and are rendered as circular arcs and splines.
//!
//! ```no_run
//! use nautilus::{EdgeSpec, GraphSpec, NodeSpec, layout};
//!
//! let spec = GraphSpec {
//!     nodes: vec![NodeSpec::new("a"), NodeSpec::new("b")],
//!     edges: vec![EdgeSpec::new("a", "b")],
//!     clusters: vec![],
//!     config: Default::default(),
//! };
//! let output = layout(&spec)?;
//! # Ok::<(), nautilus::Error>(())
//! ```

pub mod connection;
pub mod hierarchy;
pub mod model;
pub mod output;
pub mod range;
pub mod session;
pub mod subpath;

mod positioner;
mod router;

pub use nautilus_core::{Anchor, ArcDirection, Circle, Curve, Error, LayoutConfig, Primitive, Result};

pub use model::{ClusterSpec, EdgeSpec, GraphSpec, NodeSpec};
pub use output::{ConnectionOutput, LayoutOutput, NodeOutput};
pub use session::LayoutSession;

/// Runs the full pipeline: positioning, decomposition and routing.
pub fn layout(spec: &GraphSpec) -> Result<LayoutOutput> {
    Ok(LayoutSession::build(spec)?.finish())
}
