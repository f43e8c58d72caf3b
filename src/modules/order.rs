//! Dependency ordering for modules.
//!
//! Kahn's algorithm over the graph formed by each node's `load_before` and
//! `load_after` lists. The queue is seeded and fed in input order, so the
//! result is reproducible for the same input. Unknown references and cycles
//! are reported in the returned [`Ordering`], never raised.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::FrameworkError;

/// A named unit with ordering constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyNode {
    pub name: String,
    /// Nodes this one must be ordered before.
    pub load_before: Vec<String>,
    /// Nodes this one must be ordered after.
    pub load_after: Vec<String>,
}

impl DependencyNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn before<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.load_before.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn after<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.load_after.extend(names.into_iter().map(Into::into));
        self
    }
}

/// A reference to a node that is not part of the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingReference {
    pub node: String,
    pub reference: String,
}

/// Result of ordering a dependency graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ordering {
    /// Nodes whose constraints were all satisfied, in load order.
    pub sorted: Vec<String>,
    /// Nodes left over because of a cycle (members and their dependants), in input order.
    pub unresolved: Vec<String>,
    /// References to unknown nodes; these constraints were ignored.
    pub missing: Vec<MissingReference>,
}

impl Ordering {
    pub fn has_cycle(&self) -> bool {
        !self.unresolved.is_empty()
    }

    /// Every node: the sorted prefix followed by the unresolved ones.
    pub fn sequence(&self) -> Vec<String> {
        self.sorted
            .iter()
            .chain(self.unresolved.iter())
            .cloned()
            .collect()
    }

    /// For callers that refuse partial orders.
    pub fn cycle_error(&self) -> Option<FrameworkError> {
        self.has_cycle().then(|| FrameworkError::CircularDependency {
            nodes: self.unresolved.clone(),
        })
    }
}

/// Order `nodes` so every `before`/`after` constraint between known nodes holds.
pub fn topological_order(nodes: &[DependencyNode]) -> Ordering {
    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.name.as_str(), i))
        .collect();

    let mut missing = Vec::new();
    let mut edges: HashSet<(usize, usize)> = HashSet::new();
    // Adjacency in the order edges are discovered, for stable traversal.
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    let mut in_degree = vec![0usize; nodes.len()];

    let mut add_edge = |from: usize, to: usize| {
        if from != to && edges.insert((from, to)) {
            successors[from].push(to);
            in_degree[to] += 1;
        }
    };

    for (i, node) in nodes.iter().enumerate() {
        for target in &node.load_before {
            match index.get(target.as_str()) {
                Some(&j) => add_edge(i, j),
                None => missing.push(MissingReference {
                    node: node.name.clone(),
                    reference: target.clone(),
                }),
            }
        }
        for source in &node.load_after {
            match index.get(source.as_str()) {
                Some(&j) => add_edge(j, i),
                None => missing.push(MissingReference {
                    node: node.name.clone(),
                    reference: source.clone(),
                }),
            }
        }
    }

    let mut queue: VecDeque<usize> = (0..nodes.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut placed = vec![false; nodes.len()];
    let mut sorted = Vec::with_capacity(nodes.len());

    while let Some(i) = queue.pop_front() {
        placed[i] = true;
        sorted.push(nodes[i].name.clone());
        for &next in &successors[i] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    let unresolved = nodes
        .iter()
        .zip(&placed)
        .filter(|(_, placed)| !**placed)
        .map(|(node, _)| node.name.clone())
        .collect();

    Ordering {
        sorted,
        unresolved,
        missing,
    }
}
