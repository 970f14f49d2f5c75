//! Flat, serializable result of a layout pass.

use nautilus_core::Primitive;
use nautilus_core::geom::Point;
use serde::{Deserialize, Serialize};

use crate::session::LayoutSession;

/// Positioned circles and routed connection paths, ready for rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutOutput {
    pub nodes: Vec<NodeOutput>,
    pub connections: Vec<ConnectionOutput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeOutput {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub center: Point,
    pub radius: f64,
    /// Nesting depth below the implicit root, 1 for top-level nodes.
    pub depth: usize,
    /// Set for cluster hypernodes, absent for leaves.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionOutput {
    pub source: String,
    pub target: String,
    pub weight: f64,
    /// False when no curve could be constructed; `path` is empty then.
    pub routed: bool,
    pub path: Vec<Primitive>,
}

pub(crate) fn build(session: &LayoutSession) -> LayoutOutput {
    let hierarchy = session.hierarchy();
    let root = hierarchy.root;
    let nodes = hierarchy
        .iter()
        .filter(|node| node.id != root && !node.is_virtual())
        .map(|node| NodeOutput {
            id: node.name.clone(),
            label: node.label.clone(),
            center: node.center,
            radius: node.radius,
            depth: node.layer_from_top,
            parent: node
                .parent
                .filter(|&parent| parent != root)
                .map(|parent| hierarchy.node(parent).name.clone()),
        })
        .collect();

    let connections = session
        .connections()
        .iter()
        .map(|conn| {
            let mut path = Vec::new();
            let mut routed = true;
            for &sub_path in session.sub_paths_of(conn.id) {
                match &session.sub_paths()[sub_path.index()].curve {
                    Some(curve) => path.extend(curve.primitives.iter().cloned()),
                    None => {
                        routed = false;
                        break;
                    }
                }
            }
            if !routed {
                path.clear();
            }
            ConnectionOutput {
                source: hierarchy.node(conn.source).name.clone(),
                target: hierarchy.node(conn.target).name.clone(),
                weight: conn.weight,
                routed,
                path,
            }
        })
        .collect();

    LayoutOutput { nodes, connections }
}
