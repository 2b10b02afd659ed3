//! Task dependency graph
//!
//! Pipelines are described as nested series/parallel compositions and
//! lowered into an explicit DAG. Every node of a series step depends on
//! every terminal node of the step before it; parallel branches share the
//! same dependencies and do not depend on each other.

use crate::runner::TaskKind;

/// Declarative description of a pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Composition {
    /// A single leaf unit
    Task(TaskKind),
    /// Steps that run one after another
    Series(Vec<Composition>),
    /// Branches that run concurrently
    Parallel(Vec<Composition>),
}

/// Index of a node in a [`TaskGraph`]
pub type NodeId = usize;

#[derive(Debug, Clone)]
struct Node {
    task: TaskKind,
    dependencies: Vec<NodeId>,
    dependents: Vec<NodeId>,
}

/// Directed acyclic graph of leaf units
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    nodes: Vec<Node>,
}

impl TaskGraph {
    /// Lower a composition into a graph
    pub fn from_composition(composition: &Composition) -> Self {
        let mut graph = TaskGraph::default();
        graph.lower(composition, &[]);
        graph
    }

    /// Add a node depending on `dependencies`; ids always point backwards,
    /// so the graph stays acyclic
    fn add(&mut self, task: TaskKind, dependencies: &[NodeId]) -> NodeId {
        let id = self.nodes.len();
        for &dep in dependencies {
            self.nodes[dep].dependents.push(id);
        }
        self.nodes.push(Node {
            task,
            dependencies: dependencies.to_vec(),
            dependents: Vec::new(),
        });
        id
    }

    /// Returns the terminal nodes of the lowered composition
    fn lower(&mut self, composition: &Composition, dependencies: &[NodeId]) -> Vec<NodeId> {
        match composition {
            Composition::Task(task) => vec![self.add(*task, dependencies)],
            Composition::Series(steps) => {
                let mut current = dependencies.to_vec();
                for step in steps {
                    current = self.lower(step, &current);
                }
                current
            }
            Composition::Parallel(branches) => branches
                .iter()
                .flat_map(|branch| self.lower(branch, dependencies))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn task(&self, id: NodeId) -> TaskKind {
        self.nodes[id].task
    }

    pub fn dependencies(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].dependencies
    }

    pub fn dependents(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].dependents
    }

    /// Nodes with no dependencies
    pub fn roots(&self) -> Vec<NodeId> {
        (0..self.nodes.len())
            .filter(|&id| self.nodes[id].dependencies.is_empty())
            .collect()
    }

    /// First node running `task`
    pub fn find(&self, task: TaskKind) -> Option<NodeId> {
        self.nodes.iter().position(|node| node.task == task)
    }

    /// Every node reachable from `id` through dependents
    pub fn downstream(&self, id: NodeId) -> Vec<NodeId> {
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = self.nodes[id].dependents.clone();
        let mut result = Vec::new();

        while let Some(next) = stack.pop() {
            if seen[next] {
                continue;
            }
            seen[next] = true;
            result.push(next);
            stack.extend(self.nodes[next].dependents.iter().copied());
        }

        result.sort_unstable();
        result
    }
}
