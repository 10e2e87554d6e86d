//! Directed acyclic graph used for ordering
//!
//! Edges point from a dependency to its dependent, so a topological sort
//! yields a valid construction (or deployment) order.

use crate::error::{CloudError, Result};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, VecDeque};
use std::fmt::Display;
use std::hash::Hash;

#[derive(Debug, Clone)]
pub struct Dag<T>
where
    T: Clone + Eq + Hash + Display,
{
    graph: DiGraph<T, ()>,
    index_map: HashMap<T, NodeIndex>,
    /// Insertion order, used for deterministic tie-breaking
    insertion_order: Vec<NodeIndex>,
}

impl<T> Dag<T>
where
    T: Clone + Eq + Hash + Display,
{
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            index_map: HashMap::new(),
            insertion_order: Vec::new(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Adds a node; a no-op if it already exists
    pub fn add_node(&mut self, value: T) -> NodeIndex {
        if let Some(&idx) = self.index_map.get(&value) {
            return idx;
        }
        let idx = self.graph.add_node(value.clone());
        self.index_map.insert(value, idx);
        self.insertion_order.push(idx);
        idx
    }

    /// Adds an edge meaning "`dependent` depends on `dependency`"
    pub fn add_dependency(&mut self, dependency: &T, dependent: &T) -> Result<()> {
        let from = self.index_of(dependency)?;
        let to = self.index_of(dependent)?;
        if self.graph.find_edge(from, to).is_none() {
            self.graph.add_edge(from, to, ());
        }
        Ok(())
    }

    fn index_of(&self, value: &T) -> Result<NodeIndex> {
        self.index_map
            .get(value)
            .copied()
            .ok_or_else(|| CloudError::NodeNotFound(value.to_string()))
    }

    /// Direct dependencies of a node, in insertion order
    pub fn upstream(&self, value: &T) -> Result<Vec<T>> {
        let idx = self.index_of(value)?;
        let mut neighbors: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Incoming)
            .collect();
        self.sort_by_insertion(&mut neighbors);
        Ok(neighbors
            .into_iter()
            .filter_map(|i| self.graph.node_weight(i).cloned())
            .collect())
    }

    fn sort_by_insertion(&self, nodes: &mut [NodeIndex]) {
        nodes.sort_by_key(|n| {
            self.insertion_order
                .iter()
                .position(|i| i == n)
                .unwrap_or(usize::MAX)
        });
    }

    /// Kahn's algorithm; ties broken by insertion order
    pub fn toposort(&self) -> Result<Vec<T>> {
        let node_count = self.graph.node_count();
        let mut in_degree: HashMap<NodeIndex, usize> = HashMap::with_capacity(node_count);
        for idx in self.graph.node_indices() {
            in_degree.insert(idx, 0);
        }
        for edge in self.graph.edge_references() {
            *in_degree.entry(edge.target()).or_insert(0) += 1;
        }

        let mut queue: VecDeque<NodeIndex> = self
            .insertion_order
            .iter()
            .filter(|&&idx| in_degree.get(&idx).copied().unwrap_or(0) == 0)
            .copied()
            .collect();

        let mut result = Vec::with_capacity(node_count);
        while let Some(idx) = queue.pop_front() {
            let node = self
                .graph
                .node_weight(idx)
                .ok_or_else(|| CloudError::NodeNotFound(format!("index {}", idx.index())))?;
            result.push(node.clone());

            let mut neighbors: Vec<NodeIndex> = self
                .graph
                .neighbors_directed(idx, Direction::Outgoing)
                .collect();
            self.sort_by_insertion(&mut neighbors);

            for neighbor in neighbors {
                if let Some(deg) = in_degree.get_mut(&neighbor) {
                    *deg = deg.saturating_sub(1);
                    if *deg == 0 {
                        queue.push_back(neighbor);
                    }
                }
            }
        }

        if result.len() != node_count {
            let cycle_node = self
                .insertion_order
                .iter()
                .find(|&&idx| in_degree.get(&idx).copied().unwrap_or(0) > 0)
                .and_then(|&idx| self.graph.node_weight(idx))
                .map_or_else(|| "unknown".to_string(), ToString::to_string);
            return Err(CloudError::CycleDetected(cycle_node));
        }

        Ok(result)
    }
}

impl<T> Default for Dag<T>
where
    T: Clone + Eq + Hash + Display,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toposort_respects_edges() {
        let mut dag = Dag::new();
        for n in ["routes", "vpc", "subnets", "igw"] {
            dag.add_node(n.to_string());
        }
        dag.add_dependency(&"vpc".to_string(), &"subnets".to_string())
            .unwrap();
        dag.add_dependency(&"vpc".to_string(), &"igw".to_string())
            .unwrap();
        dag.add_dependency(&"subnets".to_string(), &"routes".to_string())
            .unwrap();
        dag.add_dependency(&"igw".to_string(), &"routes".to_string())
            .unwrap();

        let order = dag.toposort().unwrap();
        assert_eq!(order, vec!["vpc", "subnets", "igw", "routes"]);
    }

    #[test]
    fn test_cycle_detected() {
        let mut dag = Dag::new();
        dag.add_node("a".to_string());
        dag.add_node("b".to_string());
        dag.add_dependency(&"a".to_string(), &"b".to_string())
            .unwrap();
        dag.add_dependency(&"b".to_string(), &"a".to_string())
            .unwrap();

        assert!(matches!(dag.toposort(), Err(CloudError::CycleDetected(_))));
    }

    #[test]
    fn test_unknown_node_edge() {
        let mut dag: Dag<String> = Dag::new();
        dag.add_node("a".to_string());
        let result = dag.add_dependency(&"a".to_string(), &"missing".to_string());
        assert!(matches!(result, Err(CloudError::NodeNotFound(_))));
    }

    #[test]
    fn test_upstream() {
        let mut dag = Dag::new();
        for n in ["vpc", "igw", "routes"] {
            dag.add_node(n.to_string());
        }
        dag.add_dependency(&"igw".to_string(), &"routes".to_string())
            .unwrap();
        dag.add_dependency(&"vpc".to_string(), &"routes".to_string())
            .unwrap();

        assert_eq!(
            dag.upstream(&"routes".to_string()).unwrap(),
            vec!["vpc", "igw"]
        );
    }
}
