use std::f64::consts::TAU;

use nautilus::{ClusterSpec, EdgeSpec, GraphSpec, LayoutConfig, NodeOutput, NodeSpec, layout};

/// Unit-free numbers: radius 10 leaves, no outer padding, no extra margins.
fn flat_config() -> LayoutConfig {
    LayoutConfig {
        size_multiplier: 10.0,
        outer_radius_factor: 1.0,
        node_margin_factor: 1.0,
        radius_margin_factor: 1.0,
        ..Default::default()
    }
}

fn node<'a>(nodes: &'a [NodeOutput], id: &str) -> &'a NodeOutput {
    nodes
        .iter()
        .find(|n| n.id == id)
        .unwrap_or_else(|| panic!("node {id} missing from output"))
}

#[test]
fn a_single_node_sits_at_the_origin() {
    let spec = GraphSpec {
        nodes: vec![NodeSpec::new("a")],
        config: flat_config(),
        ..Default::default()
    };
    let output = layout(&spec).unwrap();
    assert_eq!(output.nodes.len(), 1);
    let a = node(&output.nodes, "a");
    assert_eq!((a.center.x, a.center.y), (0.0, 0.0));
    assert_eq!(a.radius, 10.0);
    assert_eq!(a.depth, 1);
    assert_eq!(a.parent, None);
}

#[test]
fn two_nodes_share_the_horizontal_axis() {
    let spec = GraphSpec {
        nodes: vec![NodeSpec::new("a"), NodeSpec::new("b")],
        config: flat_config(),
        ..Default::default()
    };
    let output = layout(&spec).unwrap();
    // Radii 10 each, margin factor 1: centers 40 apart, symmetric.
    let a = node(&output.nodes, "a");
    let b = node(&output.nodes, "b");
    assert!((a.center.x - -20.0).abs() < 1e-9);
    assert!((a.center.y - 0.0).abs() < 1e-9);
    assert!((b.center.x - 20.0).abs() < 1e-9);
    assert!((b.center.y - 0.0).abs() < 1e-9);
}

#[test]
fn a_ring_of_three_keeps_its_members_apart_and_contained() {
    let spec = GraphSpec {
        nodes: vec![
            NodeSpec::new("a"),
            NodeSpec::new("b"),
            NodeSpec::new("c"),
            NodeSpec::new("t"),
        ],
        clusters: vec![ClusterSpec::new("h", &["a", "b", "c"])],
        config: flat_config(),
        ..Default::default()
    };
    let output = layout(&spec).unwrap();
    let h = node(&output.nodes, "h");
    // Each child claims its diameter plus margins on the circumference.
    let ring_radius = 120.0 / TAU;
    assert!((h.radius - (ring_radius + 10.0)).abs() < 1e-6);

    let members: Vec<_> = ["a", "b", "c"]
        .iter()
        .map(|id| node(&output.nodes, id))
        .collect();
    for member in &members {
        assert_eq!(member.parent.as_deref(), Some("h"));
        assert_eq!(member.depth, 2);
        let distance = (member.center - h.center).length();
        assert!(
            distance + member.radius <= h.radius + 1e-6,
            "{} sticks out of its cluster",
            member.id
        );
    }
    for i in 0..members.len() {
        for j in i + 1..members.len() {
            let distance = (members[i].center - members[j].center).length();
            assert!(
                distance >= members[i].radius + members[j].radius - 1e-6,
                "{} and {} overlap",
                members[i].id,
                members[j].id
            );
        }
    }
}

#[test]
fn scores_scale_radii_on_a_log_curve() {
    let spec = GraphSpec {
        nodes: vec![
            NodeSpec::with_score("big", 1.0),
            NodeSpec::with_score("small", 0.1),
            NodeSpec::with_score("tiny", 0.01),
        ],
        config: flat_config(),
        ..Default::default()
    };
    let output = layout(&spec).unwrap();
    assert!((node(&output.nodes, "big").radius - 10.0).abs() < 1e-9);
    // A score of 0.1 maps to the minimum size fraction (0.2 by default);
    // anything below clamps.
    assert!((node(&output.nodes, "small").radius - 2.0).abs() < 1e-9);
    assert!((node(&output.nodes, "tiny").radius - 2.0).abs() < 1e-9);
}

#[test]
fn nested_clusters_nest_geometrically() {
    let spec = GraphSpec {
        nodes: vec![
            NodeSpec::new("a"),
            NodeSpec::new("b"),
            NodeSpec::new("c"),
            NodeSpec::new("d"),
        ],
        clusters: vec![
            ClusterSpec::new("inner", &["a", "b"]),
            ClusterSpec::new("outer", &["inner", "c", "d"]),
        ],
        config: LayoutConfig {
            // Uneven children shift the fitted enclosing circle; keep the
            // default radius margin as headroom.
            radius_margin_factor: 1.1,
            ..flat_config()
        },
        ..Default::default()
    };
    let output = layout(&spec).unwrap();
    let inner = node(&output.nodes, "inner");
    let outer = node(&output.nodes, "outer");
    assert_eq!(inner.parent.as_deref(), Some("outer"));
    assert_eq!(node(&output.nodes, "a").parent.as_deref(), Some("inner"));
    assert_eq!(node(&output.nodes, "a").depth, 3);
    let distance = (inner.center - outer.center).length();
    assert!(distance + inner.radius <= outer.radius + 1e-6);
    for id in ["a", "b"] {
        let leaf = node(&output.nodes, id);
        let distance = (leaf.center - inner.center).length();
        assert!(distance + leaf.radius <= inner.radius + 1e-6);
    }
}

#[test]
fn an_invalid_config_is_rejected() {
    let mut config = flat_config();
    config.size_multiplier = 0.0;
    let spec = GraphSpec {
        nodes: vec![NodeSpec::new("a")],
        config,
        ..Default::default()
    };
    assert!(layout(&spec).is_err());
}

#[test]
fn a_dangling_edge_does_not_abort_the_layout() {
    let spec = GraphSpec {
        nodes: vec![NodeSpec::new("a"), NodeSpec::new("b"), NodeSpec::new("c")],
        edges: vec![EdgeSpec::new("a", "ghost"), EdgeSpec::new("b", "c")],
        config: flat_config(),
        ..Default::default()
    };
    let output = layout(&spec).unwrap();
    // The bad edge is dropped; the good one still routes.
    assert_eq!(output.connections.len(), 1);
    let connection = &output.connections[0];
    assert_eq!(connection.source, "b");
    assert_eq!(connection.target, "c");
    assert!(connection.routed);
    assert!(!connection.path.is_empty());
}
