// src/dag/graph.rs

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::errors::{PipedagError, Result};
use crate::task::{TaskId, TaskRef};

/// Index of a task node within a [`TaskGraph`].
pub type NodeId = NodeIndex;

/// Deduplicated DAG of task instances discovered from a root task.
///
/// Edges point from a task to each of its dependencies. Besides the petgraph
/// structure we keep each node's dependencies in declaration order (petgraph
/// neighbour iteration order is not insertion order) and a topological order
/// fixed at build time. A task may declare the same dependency more than
/// once: the edges and readiness use the distinct set, while `declared`
/// keeps every entry so the task still gets one input per declaration.
#[derive(Debug)]
pub struct TaskGraph {
    graph: DiGraph<TaskRef, ()>,
    index: HashMap<TaskId, NodeId>,
    deps: Vec<Vec<NodeId>>,
    declared: Vec<Vec<NodeId>>,
    order: Vec<NodeId>,
    root: NodeId,
}

impl TaskGraph {
    /// Expand `root` into a graph. See [`GraphBuilder`].
    pub fn build(root: TaskRef) -> Result<Self> {
        GraphBuilder::new().build(root)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn task(&self, node: NodeId) -> &TaskRef {
        &self.graph[node]
    }

    pub fn id_of(&self, node: NodeId) -> TaskId {
        self.graph[node].id()
    }

    pub fn node_of(&self, id: &TaskId) -> Option<NodeId> {
        self.index.get(id).copied()
    }

    /// Dependencies before dependents; ties broken by discovery order, so the
    /// same input always yields the same order.
    pub fn topological_order(&self) -> &[NodeId] {
        &self.order
    }

    /// Immediate dependencies, in the order the task declared them.
    pub fn dependencies_of(&self, node: NodeId) -> &[NodeId] {
        self.deps
            .get(node.index())
            .map(|d| d.as_slice())
            .unwrap_or(&[])
    }

    /// Dependencies exactly as returned by the task, repeats included.
    pub fn declared_dependencies_of(&self, node: NodeId) -> &[NodeId] {
        self.declared
            .get(node.index())
            .map(|d| d.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents (tasks that declared `node` as a dependency).
    pub fn dependents_of(&self, node: NodeId) -> Vec<NodeId> {
        let mut dependents: Vec<NodeId> = self
            .graph
            .neighbors_directed(node, Direction::Incoming)
            .collect();
        dependents.sort();
        dependents
    }
}

/// Recursively expands a root task's dependencies.
///
/// Identical `(kind, params)` pairs collapse into one node. The builder keeps
/// the current recursion path; meeting a task that is already on it is a
/// cycle and fails the whole build before anything runs.
#[derive(Default)]
pub struct GraphBuilder {
    graph: DiGraph<TaskRef, ()>,
    index: HashMap<TaskId, NodeId>,
    deps: Vec<Vec<NodeId>>,
    declared: Vec<Vec<NodeId>>,
    order: Vec<NodeId>,
    path: Vec<TaskId>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(mut self, root: TaskRef) -> Result<TaskGraph> {
        let root = self.visit(root)?;

        debug_assert!(!petgraph::algo::is_cyclic_directed(&self.graph));
        debug!(
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            "dependency graph built"
        );

        Ok(TaskGraph {
            graph: self.graph,
            index: self.index,
            deps: self.deps,
            declared: self.declared,
            order: self.order,
            root,
        })
    }

    fn visit(&mut self, task: TaskRef) -> Result<NodeId> {
        let id = task.id();

        if let Some(pos) = self.path.iter().position(|p| *p == id) {
            let mut cycle = self.path[pos..].to_vec();
            cycle.push(id);
            return Err(PipedagError::CyclicDependency { cycle });
        }

        // Not on the path, so an existing node is already fully expanded.
        if let Some(&node) = self.index.get(&id) {
            return Ok(node);
        }

        let dependencies = task.dependencies()?;

        let node = self.graph.add_node(task);
        self.index.insert(id.clone(), node);
        self.deps.push(Vec::with_capacity(dependencies.len()));
        self.declared.push(Vec::with_capacity(dependencies.len()));
        debug_assert_eq!(self.deps.len(), self.graph.node_count());

        self.path.push(id);
        for dep in dependencies {
            let child = self.visit(dep)?;
            self.declared[node.index()].push(child);
            let distinct = &mut self.deps[node.index()];
            if !distinct.contains(&child) {
                distinct.push(child);
                self.graph.add_edge(node, child, ());
            }
        }
        self.path.pop();

        // Post-order: every dependency has been pushed already.
        self.order.push(node);
        Ok(node)
    }
}
