//! Resource dependency graph

use cirrus_core::{path, Result, TemplateError};
use indexmap::IndexMap;
use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use tracing::debug;

/// Resources as nodes, with an edge from each resource to the resources that
/// depend on it.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
    indices: IndexMap<String, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource. Resources must be added in declaration order.
    pub fn add_resource(&mut self, logical_id: &str) -> NodeIndex {
        if let Some(index) = self.indices.get(logical_id) {
            return *index;
        }
        let index = self.graph.add_node(logical_id.to_string());
        self.indices.insert(logical_id.to_string(), index);
        index
    }

    /// Record that `dependent` needs `dependency` to exist first.
    ///
    /// Unknown ids are ignored; they were rejected during evaluation.
    pub fn add_dependency(&mut self, dependent: &str, dependency: &str) {
        if let (Some(&from), Some(&to)) = (self.indices.get(dependency), self.indices.get(dependent)) {
            self.graph.update_edge(from, to, ());
        }
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Resources the given one depends on, in declaration order.
    pub fn dependencies_of(&self, logical_id: &str) -> Vec<&str> {
        let Some(&index) = self.indices.get(logical_id) else {
            return Vec::new();
        };
        let mut found: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(index, Direction::Incoming)
            .collect();
        found.sort();
        found.iter().map(|i| self.graph[*i].as_str()).collect()
    }

    /// Fail with the first dependency cycle, listed in declaration order.
    pub fn check_acyclic(&self) -> Result<()> {
        let cycle = kosaraju_scc(&self.graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || component
                        .first()
                        .is_some_and(|n| self.graph.contains_edge(*n, *n))
            })
            .map(|mut component| {
                component.sort();
                component
            })
            .min_by_key(|component| component[0]);

        match cycle {
            Some(component) => {
                let mut members: Vec<String> =
                    component.iter().map(|i| self.graph[*i].clone()).collect();
                members.push(members[0].clone());
                Err(TemplateError::CyclicReference {
                    path: path::child("Resources", &members[0]),
                    cycle: members,
                })
            }
            None => Ok(()),
        }
    }

    /// Topological order, preferring earlier-declared resources on ties.
    pub fn creation_order(&self) -> Result<Vec<String>> {
        self.check_acyclic()?;

        let mut in_degree: Vec<usize> = self
            .graph
            .node_indices()
            .map(|n| self.graph.neighbors_directed(n, Direction::Incoming).count())
            .collect();
        let mut ready: BinaryHeap<Reverse<NodeIndex>> = self
            .graph
            .node_indices()
            .filter(|n| in_degree[n.index()] == 0)
            .map(Reverse)
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse(node)) = ready.pop() {
            order.push(self.graph[node].clone());
            for next in self.graph.neighbors_directed(node, Direction::Outgoing) {
                in_degree[next.index()] -= 1;
                if in_degree[next.index()] == 0 {
                    ready.push(Reverse(next));
                }
            }
        }

        debug!(resources = order.len(), "computed creation order");
        Ok(order)
    }
}
