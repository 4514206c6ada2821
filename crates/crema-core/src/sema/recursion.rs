//! The no-recursion rule.
//!
//! Crema forbids recursion as a static property of the whole call
//! graph, not just syntactic self-calls. The check is a DFS keyed on
//! function name with a visited set to bound the work.

use crate::interner::Name;
use std::collections::{HashMap, HashSet};

/// Whether `start` is reachable from its own callees.
pub fn reaches_itself(graph: &HashMap<Name, Vec<Name>>, start: Name) -> bool {
    let mut visited = HashSet::new();
    let mut stack: Vec<Name> = graph.get(&start).cloned().unwrap_or_default();

    while let Some(current) = stack.pop() {
        if current == start {
            return true;
        }
        if !visited.insert(current) {
            continue;
        }
        if let Some(callees) = graph.get(&current) {
            stack.extend(callees.iter().copied());
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(usize, &[usize])]) -> HashMap<Name, Vec<Name>> {
        edges
            .iter()
            .map(|&(from, tos)| (Name(from), tos.iter().map(|&t| Name(t)).collect()))
            .collect()
    }

    #[test]
    fn test_direct_self_call() {
        let g = graph(&[(0, &[0])]);
        assert!(reaches_itself(&g, Name(0)));
    }

    #[test]
    fn test_mutual_recursion() {
        let g = graph(&[(0, &[1]), (1, &[0])]);
        assert!(reaches_itself(&g, Name(0)));
        assert!(reaches_itself(&g, Name(1)));
    }

    #[test]
    fn test_long_cycle() {
        let g = graph(&[(0, &[1]), (1, &[2]), (2, &[3]), (3, &[0])]);
        for i in 0..4 {
            assert!(reaches_itself(&g, Name(i)));
        }
    }

    #[test]
    fn test_acyclic_chain() {
        let g = graph(&[(0, &[1, 2]), (1, &[2]), (2, &[])]);
        assert!(!reaches_itself(&g, Name(0)));
        assert!(!reaches_itself(&g, Name(1)));
        assert!(!reaches_itself(&g, Name(2)));
    }

    #[test]
    fn test_diamond_terminates() {
        // Shared callees are visited once.
        let g = graph(&[(0, &[1, 2]), (1, &[3]), (2, &[3]), (3, &[])]);
        assert!(!reaches_itself(&g, Name(0)));
    }

    #[test]
    fn test_cycle_not_reaching_start() {
        // A cycle elsewhere in the graph does not implicate `start`.
        let g = graph(&[(0, &[1]), (1, &[2]), (2, &[1])]);
        assert!(!reaches_itself(&g, Name(0)));
        assert!(reaches_itself(&g, Name(1)));
    }
}
