// ABOUTME: Hand-checked edit scenarios on small graphs.
// ABOUTME: Each expected tree was worked out on paper from a full solve.

use cascade_core::{CycleStats, Edit, GraphStore};
use cascade_graph::{check_tree, diff_against_fresh, CascadeEngine, Graph};

fn assert_consistent(engine: &CascadeEngine<&'static str>) {
    let violations = check_tree(engine);
    assert!(violations.is_empty(), "tree violations: {:?}", violations);
    let diffs = diff_against_fresh(engine).unwrap();
    assert!(diffs.is_empty(), "differs from fresh solve: {:?}", diffs);
}

/// A-B, A-C, B-C, B-D, C-D, all weight 1
fn braced_square() -> CascadeEngine<&'static str> {
    let graph = Graph::from_edges([
        ("A", "B", 1.0),
        ("A", "C", 1.0),
        ("B", "C", 1.0),
        ("B", "D", 1.0),
        ("C", "D", 1.0),
    ]);
    let mut engine = CascadeEngine::new(graph);
    engine.solve("A").unwrap();
    engine
}

#[test]
fn braced_square_initial_tree() {
    let engine = braced_square();
    assert_eq!(engine.distance(&"B"), 1.0);
    assert_eq!(engine.distance(&"C"), 1.0);
    assert_eq!(engine.distance(&"D"), 2.0);
    assert_eq!(engine.parent(&"D"), Some(&"B"));
    assert_consistent(&engine);
}

#[test]
fn braced_square_remove_then_add() {
    let mut engine = braced_square();

    engine.apply_batch(&[Edit::RemoveEdge("A", "B")]).unwrap();
    engine.cascade();
    assert_eq!(engine.distance(&"B"), 2.0);
    assert_eq!(engine.parent(&"B"), Some(&"C"));
    assert_eq!(engine.distance(&"D"), 2.0);
    assert_eq!(engine.parent(&"D"), Some(&"C"));
    assert_consistent(&engine);

    engine.apply_batch(&[Edit::AddEdge("A", "D", 1.0)]).unwrap();
    engine.cascade();
    assert_eq!(engine.distance(&"D"), 1.0);
    assert_eq!(engine.parent(&"D"), Some(&"A"));
    assert_eq!(engine.path(&"D"), Some(vec!["A", "D"]));
    assert_consistent(&engine);
}

#[test]
fn four_cycle_loses_tree_edge() {
    // A-B, B-C, C-D, D-A
    let graph = Graph::from_edges([
        ("A", "B", 1.0),
        ("B", "C", 1.0),
        ("C", "D", 1.0),
        ("D", "A", 1.0),
    ]);
    let mut engine = CascadeEngine::new(graph);
    engine.solve("A").unwrap();
    assert_eq!(engine.distance(&"C"), 2.0);
    assert_eq!(engine.parent(&"C"), Some(&"B"));

    engine.apply_batch(&[Edit::RemoveEdge("A", "B")]).unwrap();
    engine.cascade();
    assert_eq!(engine.distance(&"B"), 3.0);
    assert_eq!(engine.parent(&"B"), Some(&"C"));
    assert_eq!(engine.parent(&"C"), Some(&"D"));
    assert_eq!(engine.state().height(&"B"), 3);
    assert_consistent(&engine);
}

#[test]
fn weight_increase_moves_subtree() {
    // s-a-b-c chain with a detour s-x-c
    let graph = Graph::from_edges([
        ("s", "a", 1.0),
        ("a", "b", 1.0),
        ("b", "c", 1.0),
        ("s", "x", 1.5),
        ("x", "c", 1.0),
    ]);
    let mut engine = CascadeEngine::new(graph);
    engine.solve("s").unwrap();
    assert_eq!(engine.parent(&"c"), Some(&"x"));

    engine.apply_batch(&[Edit::ModifyEdge("a", "s", 5.0)]).unwrap();
    engine.cascade();
    assert_eq!(engine.distance(&"c"), 2.5);
    assert_eq!(engine.distance(&"b"), 3.5);
    assert_eq!(engine.distance(&"a"), 4.5);
    assert_eq!(engine.parent(&"a"), Some(&"b"));
    assert_consistent(&engine);
}

#[test]
fn disconnection_and_reconnection() {
    let graph = Graph::from_edges([("s", "a", 1.0), ("a", "b", 2.0)]);
    let mut engine = CascadeEngine::new(graph);
    engine.solve("s").unwrap();

    engine.apply_batch(&[Edit::RemoveEdge("s", "a")]).unwrap();
    engine.cascade();
    assert_eq!(engine.distance(&"a"), f64::INFINITY);
    assert_eq!(engine.distance(&"b"), f64::INFINITY);
    assert_eq!(engine.parent(&"b"), None);
    assert_consistent(&engine);

    engine.apply_batch(&[Edit::AddEdge("b", "s", 4.0)]).unwrap();
    engine.cascade();
    assert_eq!(engine.distance(&"b"), 4.0);
    assert_eq!(engine.distance(&"a"), 6.0);
    assert_consistent(&engine);
}

#[test]
fn vertex_removal_orphans_children_once() {
    // s-h is the only way into a star of four leaves; the leaves also form a ring
    let graph = Graph::from_edges([
        ("s", "h", 1.0),
        ("h", "l1", 1.0),
        ("h", "l2", 1.0),
        ("h", "l3", 1.0),
        ("h", "l4", 1.0),
        ("l1", "l2", 3.0),
        ("l2", "l3", 3.0),
        ("l3", "l4", 3.0),
        ("s", "l4", 10.0),
    ]);
    let mut engine = CascadeEngine::new(graph);
    engine.solve("s").unwrap();

    let mut stats = CycleStats::new();
    let applied = engine.apply_batch_with(&[Edit::RemoveVertex("h")], &mut stats).unwrap();
    assert_eq!(applied, vec![true]);
    assert_eq!(engine.pending().0, 4);

    engine.cascade();
    assert!(!engine.graph().contains_vertex(&"h"));
    assert!(!engine.state().contains(&"h"));
    assert_eq!(engine.distance(&"l4"), 10.0);
    assert_eq!(engine.distance(&"l3"), 13.0);
    assert_eq!(engine.distance(&"l2"), 16.0);
    assert_eq!(engine.distance(&"l1"), 19.0);
    assert_consistent(&engine);
}

#[test]
fn mixed_batch_sees_earlier_edits() {
    let graph = Graph::from_edges([("s", "a", 1.0), ("a", "b", 1.0), ("s", "b", 5.0)]);
    let mut engine = CascadeEngine::new(graph);
    engine.solve("s").unwrap();

    let applied = engine
        .apply_batch(&[
            Edit::AddVertex("c"),
            Edit::AddEdge("b", "c", 1.0),
            Edit::RemoveEdge("s", "a"),
            Edit::RemoveEdge("a", "s"),
            Edit::ModifyEdge("s", "b", 1.0),
            Edit::AddEdge("c", "c", 1.0),
        ])
        .unwrap();
    assert_eq!(applied, vec![true, true, true, false, true, false]);

    engine.cascade();
    assert_eq!(engine.distance(&"b"), 1.0);
    assert_eq!(engine.distance(&"a"), 2.0);
    assert_eq!(engine.distance(&"c"), 2.0);
    assert_consistent(&engine);
}

#[test]
fn repeated_targets_in_one_batch_are_rejected() {
    let graph = Graph::from_edges([("s", "a", 1.0), ("a", "b", 1.0), ("s", "b", 5.0)]);
    let mut engine = CascadeEngine::new(graph);
    engine.solve("s").unwrap();

    let applied = engine
        .apply_batch(&[
            Edit::ModifyEdge("s", "b", 1.5),
            Edit::ModifyEdge("b", "s", 0.5),
            Edit::AddVertex("d"),
            Edit::RemoveVertex("d"),
            Edit::RemoveEdge("a", "x"),
            Edit::AddEdge("x", "a", 1.0),
        ])
        .unwrap();
    assert_eq!(applied, vec![true, false, true, false, false, false]);

    engine.cascade();
    assert_eq!(engine.graph().weight(&"s", &"b"), Some(1.5));
    assert!(engine.graph().contains_vertex(&"d"));
    assert!(!engine.graph().contains_vertex(&"x"));
    assert_eq!(engine.distance(&"b"), 1.5);
    assert_consistent(&engine);

    // A new batch starts with a clean slate
    let applied = engine.apply_batch(&[Edit::ModifyEdge("b", "s", 0.5)]).unwrap();
    assert_eq!(applied, vec![true]);
    engine.cascade();
    assert_eq!(engine.distance(&"b"), 0.5);
    assert_consistent(&engine);
}

#[test]
fn reroot_then_lighter_tree_edge_keeps_heights() {
    // s -1- a -1- b -3- c
    let graph = Graph::from_edges([("s", "a", 1.0), ("a", "b", 1.0), ("b", "c", 3.0)]);
    let mut engine = CascadeEngine::new(graph);
    engine.solve("s").unwrap();

    engine
        .apply_batch(&[Edit::AddEdge("s", "b", 0.5), Edit::ModifyEdge("b", "c", 1.0)])
        .unwrap();
    engine.cascade();

    assert_eq!(engine.distance(&"c"), 1.5);
    assert_eq!(engine.parent(&"c"), Some(&"b"));
    assert_eq!(engine.state().height(&"b"), 1);
    assert_eq!(engine.state().height(&"c"), 2);
    assert_consistent(&engine);
}

#[test]
fn reroot_at_equal_distance_refreshes_subtree_heights() {
    // s -1- a -1- b -2- c -1- d; b moves under s, c keeps its distance
    let graph = Graph::from_edges([("s", "a", 1.0), ("a", "b", 1.0), ("b", "c", 2.0), ("c", "d", 1.0)]);
    let mut engine = CascadeEngine::new(graph);
    engine.solve("s").unwrap();
    assert_eq!(engine.state().height(&"d"), 4);

    engine
        .apply_batch(&[Edit::AddEdge("s", "b", 1.0), Edit::ModifyEdge("b", "c", 3.0)])
        .unwrap();
    engine.cascade();

    assert_eq!(engine.distance(&"c"), 4.0);
    assert_eq!(engine.distance(&"d"), 5.0);
    assert_eq!(engine.state().height(&"c"), 2);
    assert_eq!(engine.state().height(&"d"), 3);
    assert_eq!(engine.path(&"d"), Some(vec!["s", "b", "c", "d"]));
    assert_consistent(&engine);
}

#[test]
fn cascade_is_idempotent() {
    let mut engine = braced_square();
    engine
        .apply_batch(&[Edit::ModifyEdge("A", "C", 4.0), Edit::AddEdge("A", "D", 3.0)])
        .unwrap();
    engine.cascade();
    let distances = engine.distances();
    let parents: Vec<_> = ["B", "C", "D"].iter().map(|v| engine.parent(v).copied()).collect();

    let mut stats = CycleStats::new();
    assert_eq!(engine.cascade_with(&mut stats), 0);
    assert_eq!(stats.changes, 0);
    assert_eq!(engine.distances(), distances);
    let again: Vec<_> = ["B", "C", "D"].iter().map(|v| engine.parent(v).copied()).collect();
    assert_eq!(again, parents);
}
