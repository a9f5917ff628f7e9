//! Collapsing and rendering properties over a recorded graph.

use std::collections::HashSet;
use std::fs;

use gradviz_core::{
    make_dot, record, render_network, GraphvizStyler, InputSource, NodeId, OutputFormat, Recorder,
    RenderOptions, Renderer,
};

mod common;
use common::{BranchNet, Command, RecordingSurface};

fn recorded_branch_net() -> Recorder {
    let net = BranchNet::new();
    record(&net, "BranchNet", InputSource::Shape(vec![1, 3])).unwrap()
}

fn name_of(rec: &Recorder, id: NodeId) -> String {
    rec.node(id).name.clone()
}

#[test]
fn test_unbounded_depth_reproduces_the_full_graph() {
    let rec = recorded_branch_net();
    let styler = GraphvizStyler::new();
    let mut surface = RecordingSurface::default();
    Renderer::new(&rec, 256, &styler).render(&mut surface);

    // Every node except the root context is emitted exactly once.
    let emitted = surface.emitted_nodes();
    assert_eq!(emitted.len(), rec.len() - 1);
    let unique: HashSet<NodeId> = emitted.iter().copied().collect();
    assert_eq!(unique.len(), emitted.len());
    assert!(!unique.contains(&NodeId::ROOT));

    // Every recorded edge survives untouched; nothing was lifted.
    let emitted_edges = surface.edges();
    assert_eq!(emitted_edges.len(), rec.edges().len());
    let recorded: HashSet<(NodeId, NodeId)> =
        rec.edges().iter().map(|e| (e.from, e.to)).collect();
    for pair in &emitted_edges {
        assert!(recorded.contains(pair));
        assert_ne!(pair.0, pair.1);
    }
}

#[test]
fn test_depth_zero_collapses_to_a_single_box() {
    let rec = recorded_branch_net();
    let styler = GraphvizStyler::new();
    let mut surface = RecordingSurface::default();
    Renderer::new(&rec, 0, &styler).render(&mut surface);

    // Only the network box, the input and the output remain; the box is a
    // plain leaf, not a group with internals.
    assert!(surface
        .commands
        .iter()
        .all(|c| !matches!(c, Command::Open(_))));
    let names: Vec<String> = surface
        .emitted_nodes()
        .into_iter()
        .map(|id| name_of(&rec, id))
        .collect();
    assert_eq!(names, vec!["BranchNet", "Input", "Output"]);

    let edges: HashSet<(String, String)> = surface
        .edges()
        .into_iter()
        .map(|(f, t)| (name_of(&rec, f), name_of(&rec, t)))
        .collect();
    let expected: HashSet<(String, String)> = [("Input", "BranchNet"), ("BranchNet", "Output")]
        .iter()
        .map(|(f, t)| (f.to_string(), t.to_string()))
        .collect();
    assert_eq!(edges, expected);
}

#[test]
fn test_depth_one_lifts_edges_to_nearest_retained_ancestors() {
    let rec = recorded_branch_net();
    let styler = GraphvizStyler::new();
    let mut surface = RecordingSurface::default();
    Renderer::new(&rec, 1, &styler).render(&mut surface);

    let edges: HashSet<(String, String)> = surface
        .edges()
        .into_iter()
        .map(|(f, t)| (name_of(&rec, f), name_of(&rec, t)))
        .collect();
    // Parameter and chain-internal edges collapse into their layers; what
    // survives is the layer-level data flow. Intermediate tensors keep
    // their occurrence-numbered default names.
    let expected: HashSet<(String, String)> = [
        ("Input", "linear_1\n(Linear)"),
        ("Input", "linear_2\n(Linear)"),
        ("linear_1\n(Linear)", "Tensor-2"),
        ("linear_2\n(Linear)", "Tensor-3"),
        ("Tensor-2", "CatBackward"),
        ("Tensor-3", "CatBackward"),
        ("CatBackward", "Tensor-4"),
        ("Tensor-4", "linear_3\n(Linear)"),
        ("linear_3\n(Linear)", "Tensor-5"),
        ("Tensor-5", "my_special_relu\n(ReLU)"),
        ("my_special_relu\n(ReLU)", "Output"),
    ]
    .iter()
    .map(|(f, t)| (f.to_string(), t.to_string()))
    .collect();
    assert_eq!(edges, expected);

    // The network renders as a group holding its children as leaves.
    let net_id = rec
        .nodes()
        .find(|(_, node)| node.name == "BranchNet")
        .unwrap()
        .0;
    assert!(surface.commands.contains(&Command::Open(net_id)));
}

#[test]
fn test_dot_output_hides_collapsed_internals() {
    let rec = recorded_branch_net();
    let styler = GraphvizStyler::new();
    let options = RenderOptions::new().depth(1);
    let g = make_dot(&rec, &options, &styler);
    let source = g.source();

    assert!(source.contains("subgraph cluster_n1 {"));
    assert!(source.contains("linear_1\\n(Linear)"));
    // The concatenation happens at depth 1 and stays visible; the matmuls
    // inside the linear layers do not.
    assert!(source.contains("CatBackward"));
    assert!(!source.contains("MatmulBackward"));
    assert!(!source.contains("weight"));
}

#[test]
fn test_render_network_writes_the_captioned_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let net = BranchNet::new();
    let options = RenderOptions::new()
        .depth(1)
        .format(OutputFormat::Dot)
        .directory(dir.path());
    let path = render_network(&net, "BranchNet", InputSource::Shape(vec![1, 3]), &options).unwrap();

    assert_eq!(path, dir.path().join("BranchNet-1.dot"));
    let source = fs::read_to_string(&path).unwrap();
    assert!(source.starts_with("digraph {\n"));
    assert!(source.contains("label=\"BranchNet at depth = 1\";"));
}

#[test]
fn test_file_stem_and_uniform_attrs_are_honored() {
    let dir = tempfile::tempdir().unwrap();
    let net = BranchNet::new();
    let options = RenderOptions::new()
        .depth(0)
        .format(OutputFormat::Dot)
        .directory(dir.path())
        .file_stem("collapsed")
        .fontname("Lato")
        .node_attr("penwidth", "1.6");
    let path = render_network(&net, "BranchNet", InputSource::Shape(vec![1, 3]), &options).unwrap();

    assert_eq!(path, dir.path().join("collapsed.dot"));
    let source = fs::read_to_string(&path).unwrap();
    assert!(source.contains("fontname=\"Lato\";"));
    assert!(source.contains("penwidth=\"1.6\""));
}
