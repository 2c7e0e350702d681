// SPDX-License-Identifier: MIT

//! `TaskGraph` (spec §3, §4.7): the node set the DAG Executor schedules.

use daer_core::ids::NodeId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::DagError;

/// One node of a [`TaskGraph`]: an agent invocation plus the set of nodes
/// it depends on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskNode {
    pub id: NodeId,
    pub agent_ref: String,
    pub task_input: Value,
    #[serde(default)]
    pub dependencies: HashSet<NodeId>,
}

impl TaskNode {
    pub fn new(id: NodeId, agent_ref: impl Into<String>, task_input: Value) -> Self {
        Self { id, agent_ref: agent_ref.into(), task_input, dependencies: HashSet::new() }
    }

    pub fn depends_on(mut self, node_id: NodeId) -> Self {
        self.dependencies.insert(node_id);
        self
    }
}

/// A set of [`TaskNode`]s, checked acyclic at construction (spec §4.7
/// "Detect cycles via topological sort; reject on cycle").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskGraph {
    nodes: HashMap<NodeId, TaskNode>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: TaskNode) {
        self.nodes.insert(node.id, node);
    }

    pub fn node(&self, id: NodeId) -> Option<&TaskNode> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TaskNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Kahn's algorithm: peel off nodes with no unresolved dependency,
    /// repeating until every node is ordered or none remain peelable (a
    /// cycle). Also the authoritative cycle check at `submit` time.
    pub fn topo_order(&self) -> Result<Vec<NodeId>, DagError> {
        let mut in_degree: HashMap<NodeId, usize> = HashMap::new();
        let mut dependents: HashMap<NodeId, Vec<NodeId>> = HashMap::new();

        for node in self.nodes.values() {
            in_degree.entry(node.id).or_insert(0);
            for dep in &node.dependencies {
                if !self.nodes.contains_key(dep) {
                    return Err(DagError::UnknownDependency { node: node.id, dependency: *dep });
                }
                *in_degree.entry(node.id).or_insert(0) += 1;
                dependents.entry(*dep).or_default().push(node.id);
            }
        }

        let mut ready: VecDeque<NodeId> =
            in_degree.iter().filter(|(_, &deg)| deg == 0).map(|(id, _)| *id).collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(id) = ready.pop_front() {
            order.push(id);
            if let Some(children) = dependents.get(&id) {
                for &child in children {
                    let Some(entry) = in_degree.get_mut(&child) else {
                        unreachable!("every dependent was seeded into in_degree above")
                    };
                    *entry -= 1;
                    if *entry == 0 {
                        ready.push_back(child);
                    }
                }
            }
        }

        if order.len() != self.nodes.len() {
            return Err(DagError::Cycle);
        }
        Ok(order)
    }
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
