// src/dag/graph.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::errors::{AstroError, Result};
use crate::expand::{BoundExecution, ExecutionSet};

/// Dependency graph over an execution set.
///
/// Vertices are stored in a vector and edges as adjacency lists of integer
/// indices, so the structure owns its executions without reference cycles.
/// Executions whose module has no dependencies are the roots of the walk.
#[derive(Debug)]
pub struct ExecutionGraph {
    vertices: Vec<BoundExecution>,
    successors: Vec<Vec<usize>>,
    predecessors: Vec<Vec<usize>>,
}

impl ExecutionGraph {
    /// Build the graph for a set of bound executions.
    ///
    /// For every execution `b` whose module depends on module `m`, an edge is
    /// added from each execution `a` of `m` whose identity-variable values
    /// agree with `b`'s on the variables both identities share.
    pub fn build(set: &ExecutionSet) -> Result<Self> {
        let n = set.len();
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];

        for (bi, b) in set.iter().enumerate() {
            for dep in &b.module_config().dependencies {
                for &ai in set.of_module(dep) {
                    if !identities_agree(set.get(ai), b) {
                        continue;
                    }
                    if !successors[ai].contains(&bi) {
                        successors[ai].push(bi);
                        predecessors[bi].push(ai);
                        debug!(
                            from = %set.get(ai).id(),
                            to = %b.id(),
                            "added dependency edge"
                        );
                    }
                }
            }
        }

        let graph = Self {
            vertices: set.iter().cloned().collect(),
            successors,
            predecessors,
        };
        graph.ensure_acyclic()?;
        Ok(graph)
    }

    fn ensure_acyclic(&self) -> Result<()> {
        let mut check: DiGraphMap<usize, ()> = DiGraphMap::new();
        for i in 0..self.vertices.len() {
            check.add_node(i);
        }
        for (from, succs) in self.successors.iter().enumerate() {
            for &to in succs {
                check.add_edge(from, to, ());
            }
        }

        match toposort(&check, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => Err(AstroError::CyclicGraph(
                self.vertices[cycle.node_id()].id().to_string(),
            )),
        }
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn vertex(&self, index: usize) -> &BoundExecution {
        &self.vertices[index]
    }

    pub fn successors_of(&self, index: usize) -> &[usize] {
        &self.successors[index]
    }

    pub fn predecessors_of(&self, index: usize) -> &[usize] {
        &self.predecessors[index]
    }

    pub(crate) fn into_parts(self) -> (Vec<BoundExecution>, Vec<Vec<usize>>, Vec<Vec<usize>>) {
        (self.vertices, self.successors, self.predecessors)
    }
}

/// Whether two executions carry equal values for every identity variable
/// their modules both declare. An empty intersection matches everything, so
/// an identity-less module (e.g. one with no variables) relates to all
/// executions of its dependents.
fn identities_agree(a: &BoundExecution, b: &BoundExecution) -> bool {
    let a_id = a.identity();
    let b_id = b.identity();
    a_id.iter()
        .filter_map(|(name, a_value)| b_id.get(name).map(|b_value| (a_value, b_value)))
        .all(|(a_value, b_value)| a_value == b_value)
}
