//! Dependency graph construction, cycle detection and declaration order.
//!
//! Edges come from property references and explicit `depends_on` entries;
//! ownership never creates an edge. Cycles are found with a depth-first
//! search that tracks in-progress nodes, so the reported members are exactly
//! one cycle. Ordering uses Kahn's algorithm with insertion order as the
//! tie-break for determinism.

use super::construct::ConstructTree;
use super::error::{Result, SynthError};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Dependencies per construct, indexed by arena position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGraph {
    /// `deps[i]` lists the producers construct `i` depends on, ascending.
    deps: Vec<Vec<usize>>,
}

impl DependencyGraph {
    pub fn len(&self) -> usize {
        self.deps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deps.is_empty()
    }

    /// Producers of construct `index`, in insertion order.
    pub fn dependencies(&self, index: usize) -> &[usize] {
        &self.deps[index]
    }

    fn dependents(&self) -> Vec<Vec<usize>> {
        let mut out = vec![Vec::new(); self.deps.len()];
        for (consumer, producers) in self.deps.iter().enumerate() {
            for &p in producers {
                out[p].push(consumer);
            }
        }
        out
    }
}

/// Build the graph from declared references only, independent of whether
/// any value is known yet.
pub fn build_graph(tree: &ConstructTree) -> Result<DependencyGraph> {
    let mut deps = Vec::with_capacity(tree.len());

    for construct in tree.iter() {
        let targets = construct
            .props
            .references()
            .into_iter()
            .map(|(_, reference)| reference.target)
            .chain(construct.depends_on.iter().cloned());

        let mut producers = Vec::new();
        for target in targets {
            let index = tree
                .index_of(&target)
                .ok_or_else(|| SynthError::UnresolvedReference {
                    construct: construct.path.clone(),
                    target: target.clone(),
                })?;
            producers.push(index);
        }
        producers.sort_unstable();
        producers.dedup();
        deps.push(producers);
    }

    Ok(DependencyGraph { deps })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Fail with `CyclicReference` if the graph has a cycle. Members are listed
/// in traversal order starting from the first construct of the cycle reached.
pub fn detect_cycle(tree: &ConstructTree, graph: &DependencyGraph) -> Result<()> {
    let mut marks = vec![Mark::Unvisited; graph.len()];

    for root in 0..graph.len() {
        if marks[root] != Mark::Unvisited {
            continue;
        }
        // (node, next dependency to visit)
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        marks[root] = Mark::InProgress;

        while let Some(top) = stack.len().checked_sub(1) {
            let (node, next) = stack[top];
            let deps = graph.dependencies(node);
            if next == deps.len() {
                marks[node] = Mark::Done;
                stack.pop();
                continue;
            }
            stack[top].1 += 1;
            let dep = deps[next];

            match marks[dep] {
                Mark::Unvisited => {
                    marks[dep] = Mark::InProgress;
                    stack.push((dep, 0));
                }
                Mark::InProgress => {
                    let start = stack
                        .iter()
                        .position(|&(n, _)| n == dep)
                        .unwrap_or_default();
                    let members = stack[start..]
                        .iter()
                        .map(|&(n, _)| tree.node(n).path.clone())
                        .collect();
                    return Err(SynthError::CyclicReference { members });
                }
                Mark::Done => {}
            }
        }
    }

    Ok(())
}

/// Topological order (producers first). Among constructs with no relative
/// constraint the one inserted first comes first. Assumes an acyclic graph.
pub fn topological_order(graph: &DependencyGraph) -> Vec<usize> {
    let dependents = graph.dependents();
    let mut in_degree: Vec<usize> = (0..graph.len())
        .map(|i| graph.dependencies(i).len())
        .collect();

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &d)| d == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(graph.len());
    while let Some(Reverse(node)) = ready.pop() {
        order.push(node);
        for &consumer in &dependents[node] {
            in_degree[consumer] -= 1;
            if in_degree[consumer] == 0 {
                ready.push(Reverse(consumer));
            }
        }
    }
    order
}

/// Build the graph, reject cycles, and return the graph with the
/// declaration order.
pub fn build_declaration_order(tree: &ConstructTree) -> Result<(DependencyGraph, Vec<usize>)> {
    let graph = build_graph(tree)?;
    detect_cycle(tree, &graph)?;
    let order = topological_order(&graph);
    Ok((graph, order))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Value;
    use crate::resources::{ConstructProps, UnknownProps};
    use proptest::prelude::*;

    /// Tree of root-level constructs; each entry is (id, referenced ids).
    fn make_tree(decls: &[(&str, &[&str])]) -> ConstructTree {
        let mut tree = ConstructTree::new();
        for (id, refs) in decls {
            let mut props = UnknownProps::new("node");
            for (i, target) in refs.iter().enumerate() {
                props
                    .properties
                    .insert(format!("in{}", i), Value::reference(*target, "id"));
            }
            tree.insert("test", None, id, ConstructProps::Unknown(props))
                .unwrap();
        }
        tree
    }

    fn paths(tree: &ConstructTree, order: &[usize]) -> Vec<String> {
        order.iter().map(|&i| tree.node(i).path.clone()).collect()
    }

    #[test]
    fn test_topo_linear() {
        let tree = make_tree(&[("c", &["b"]), ("b", &["a"]), ("a", &[])]);
        let (_, order) = build_declaration_order(&tree).unwrap();
        assert_eq!(paths(&tree, &order), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_topo_tie_break_is_insertion_order() {
        let tree = make_tree(&[("zeta", &[]), ("alpha", &[]), ("mid", &[])]);
        let (_, order) = build_declaration_order(&tree).unwrap();
        assert_eq!(paths(&tree, &order), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_topo_diamond() {
        let tree = make_tree(&[
            ("bottom", &["right", "left"]),
            ("right", &["top"]),
            ("left", &["top"]),
            ("top", &[]),
        ]);
        let (_, order) = build_declaration_order(&tree).unwrap();
        assert_eq!(paths(&tree, &order), vec!["top", "right", "left", "bottom"]);
    }

    #[test]
    fn test_depends_on_is_an_edge() {
        let mut tree = make_tree(&[("b", &[]), ("a", &[])]);
        tree.add_dependency("test", "b", "a").unwrap();
        let (graph, order) = build_declaration_order(&tree).unwrap();
        assert_eq!(graph.dependencies(0), &[1]);
        assert_eq!(paths(&tree, &order), vec!["a", "b"]);
    }

    #[test]
    fn test_duplicate_edges_collapse() {
        let tree = make_tree(&[("a", &[]), ("b", &["a", "a"])]);
        let graph = build_graph(&tree).unwrap();
        assert_eq!(graph.dependencies(1), &[0]);
    }

    #[test]
    fn test_unresolved_reference() {
        let tree = make_tree(&[("a", &["ghost"])]);
        let err = build_graph(&tree).unwrap_err();
        assert_eq!(
            err,
            SynthError::UnresolvedReference {
                construct: "a".into(),
                target: "ghost".into()
            }
        );
    }

    #[test]
    fn test_cycle_names_exactly_its_members() {
        // "entry" depends on the cycle but is not part of it
        let tree = make_tree(&[
            ("entry", &["a"]),
            ("a", &["b"]),
            ("b", &["c"]),
            ("c", &["a"]),
            ("free", &[]),
        ]);
        let err = build_declaration_order(&tree).unwrap_err();
        assert_eq!(
            err,
            SynthError::CyclicReference {
                members: vec!["a".into(), "b".into(), "c".into()]
            }
        );
    }

    #[test]
    fn test_self_reference_is_cycle() {
        let tree = make_tree(&[("a", &["a"])]);
        let err = build_declaration_order(&tree).unwrap_err();
        assert_eq!(
            err,
            SynthError::CyclicReference {
                members: vec!["a".into()]
            }
        );
    }

    #[test]
    fn test_empty_tree() {
        let tree = ConstructTree::new();
        let (graph, order) = build_declaration_order(&tree).unwrap();
        assert!(graph.is_empty());
        assert!(order.is_empty());
    }

    proptest! {
        /// Random DAGs: every producer is declared before its consumers and
        /// every construct appears exactly once.
        #[test]
        fn prop_order_respects_edges(
            n in 1usize..24,
            raw_edges in proptest::collection::vec((0usize..24, 0usize..24), 0..60),
        ) {
            let edges: Vec<(usize, usize)> = raw_edges
                .into_iter()
                .map(|(a, b)| (a % n, b % n))
                .filter(|(a, b)| a != b)
                // acyclic: higher ids depend on lower ids only
                .map(|(a, b)| if a > b { (a, b) } else { (b, a) })
                .collect();
            let names: Vec<String> = (0..n).map(|i| format!("n{}", i)).collect();
            let decls: Vec<(&str, Vec<&str>)> = (0..n)
                .map(|i| {
                    let deps = edges
                        .iter()
                        .filter(|(c, _)| *c == i)
                        .map(|(_, p)| names[*p].as_str())
                        .collect();
                    (names[i].as_str(), deps)
                })
                .collect();
            let decl_refs: Vec<(&str, &[&str])> =
                decls.iter().map(|(id, deps)| (*id, deps.as_slice())).collect();
            let tree = make_tree(&decl_refs);

            let (_, order) = build_declaration_order(&tree).unwrap();
            prop_assert_eq!(order.len(), n);
            let mut position = vec![0usize; n];
            for (pos, &node) in order.iter().enumerate() {
                position[node] = pos;
            }
            for (consumer, producer) in edges {
                prop_assert!(position[producer] < position[consumer]);
            }
        }

        /// A ring of any length is reported with exactly its members.
        #[test]
        fn prop_ring_reports_all_members(n in 1usize..12) {
            let names: Vec<String> = (0..n).map(|i| format!("r{}", i)).collect();
            let decls: Vec<(&str, Vec<&str>)> = (0..n)
                .map(|i| (names[i].as_str(), vec![names[(i + 1) % n].as_str()]))
                .collect();
            let decl_refs: Vec<(&str, &[&str])> =
                decls.iter().map(|(id, deps)| (*id, deps.as_slice())).collect();
            let tree = make_tree(&decl_refs);

            match build_declaration_order(&tree) {
                Err(SynthError::CyclicReference { members }) => {
                    let mut sorted = members.clone();
                    sorted.sort();
                    let mut expected = names.clone();
                    expected.sort();
                    prop_assert_eq!(sorted, expected);
                }
                other => prop_assert!(false, "expected cycle, got {:?}", other),
            }
        }
    }
}
