//! Bipartite file/checksum graph.
//!
//! Nodes are either files or checksums, and every edge joins one of each.
//! Adjacency is kept in ordered collections so that component discovery and
//! shortest-path search visit nodes in a fixed order: the same vector set
//! always yields the same graph, components and paths.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

use crate::registry::{ChecksumId, FileId};
use crate::vectors::FileVector;

/// A graph node, tagged with its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Node {
    File(FileId),
    Checksum(ChecksumId),
}

impl Node {
    #[must_use]
    pub fn as_file(self) -> Option<FileId> {
        match self {
            Self::File(id) => Some(id),
            Self::Checksum(_) => None,
        }
    }

    #[must_use]
    pub fn as_checksum(self) -> Option<ChecksumId> {
        match self {
            Self::Checksum(id) => Some(id),
            Self::File(_) => None,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(id) => id.fmt(f),
            Self::Checksum(id) => id.fmt(f),
        }
    }
}

/// An undirected edge in canonical (file, checksum) form.
///
/// Both traversal directions map to the same value, so edge sets taken from
/// paths can be intersected directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Edge {
    pub file: FileId,
    pub checksum: ChecksumId,
}

impl Edge {
    #[must_use]
    pub fn new(file: FileId, checksum: ChecksumId) -> Self {
        Self { file, checksum }
    }

    /// The edge joining `a` and `b`, or `None` if both have the same kind.
    #[must_use]
    pub fn between(a: Node, b: Node) -> Option<Self> {
        match (a, b) {
            (Node::File(file), Node::Checksum(checksum))
            | (Node::Checksum(checksum), Node::File(file)) => Some(Self::new(file, checksum)),
            _ => None,
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.file, self.checksum)
    }
}

/// Undirected bipartite graph over files and checksums.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BipartiteGraph {
    adjacency: BTreeMap<Node, BTreeSet<Node>>,
    edges: usize,
}

impl BipartiteGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph for a set of file vectors.
    ///
    /// Every vector contributes its file node (even when it has no blocks)
    /// and one edge per checksum it contains.
    ///
    /// # Example
    ///
    /// ```
    /// use blockdedupe::graph::BipartiteGraph;
    /// use blockdedupe::registry::{ChecksumId, FileId};
    /// use blockdedupe::vectors::FileVector;
    ///
    /// let vectors = vec![
    ///     FileVector::new(FileId(0), vec![ChecksumId(0), ChecksumId(1)]),
    ///     FileVector::new(FileId(1), vec![ChecksumId(1)]),
    /// ];
    /// let graph = BipartiteGraph::from_vectors(&vectors);
    ///
    /// assert_eq!(graph.file_count(), 2);
    /// assert_eq!(graph.checksum_count(), 2);
    /// assert_eq!(graph.edge_count(), 3);
    /// ```
    #[must_use]
    pub fn from_vectors(vectors: &[FileVector]) -> Self {
        let mut graph = Self::new();
        for vector in vectors {
            graph.add_node(Node::File(vector.file));
            for &checksum in &vector.checksums {
                graph.add_edge(Edge::new(vector.file, checksum));
            }
        }
        log::info!(
            "Graph: {} files, {} checksums, {} edges",
            graph.file_count(),
            graph.checksum_count(),
            graph.edge_count()
        );
        graph
    }

    /// Add an isolated node. No-op if present.
    pub fn add_node(&mut self, node: Node) {
        self.adjacency.entry(node).or_default();
    }

    /// Add an edge, creating its endpoints as needed.
    ///
    /// Returns `false` if the edge already existed.
    pub fn add_edge(&mut self, edge: Edge) -> bool {
        let file = Node::File(edge.file);
        let checksum = Node::Checksum(edge.checksum);
        let inserted = self.adjacency.entry(file).or_default().insert(checksum);
        self.adjacency.entry(checksum).or_default().insert(file);
        if inserted {
            self.edges += 1;
        }
        inserted
    }

    /// Remove an edge, keeping both endpoints as nodes.
    ///
    /// Returns `false` if the edge was not present.
    pub fn remove_edge(&mut self, edge: Edge) -> bool {
        let file = Node::File(edge.file);
        let checksum = Node::Checksum(edge.checksum);
        let removed = self
            .adjacency
            .get_mut(&file)
            .is_some_and(|adj| adj.remove(&checksum));
        if removed {
            if let Some(adj) = self.adjacency.get_mut(&checksum) {
                adj.remove(&file);
            }
            self.edges -= 1;
        }
        removed
    }

    #[must_use]
    pub fn contains_node(&self, node: Node) -> bool {
        self.adjacency.contains_key(&node)
    }

    #[must_use]
    pub fn contains_edge(&self, edge: Edge) -> bool {
        self.adjacency
            .get(&Node::File(edge.file))
            .is_some_and(|adj| adj.contains(&Node::Checksum(edge.checksum)))
    }

    /// Neighbours of `node` in ascending order. Empty for unknown nodes.
    pub fn neighbors(&self, node: Node) -> impl Iterator<Item = Node> + '_ {
        self.adjacency.get(&node).into_iter().flatten().copied()
    }

    /// Number of edges at `node`; 0 for unknown nodes.
    #[must_use]
    pub fn degree(&self, node: Node) -> usize {
        self.adjacency.get(&node).map_or(0, BTreeSet::len)
    }

    /// All nodes in ascending order (files before checksums).
    pub fn nodes(&self) -> impl Iterator<Item = Node> + '_ {
        self.adjacency.keys().copied()
    }

    pub fn files(&self) -> impl Iterator<Item = FileId> + '_ {
        self.nodes().filter_map(Node::as_file)
    }

    pub fn checksums(&self) -> impl Iterator<Item = ChecksumId> + '_ {
        self.nodes().filter_map(Node::as_checksum)
    }

    /// All edges in canonical order.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.adjacency.iter().flat_map(|(&node, adj)| {
            adj.iter()
                .filter_map(move |&other| node.as_file().and_then(|_| Edge::between(node, other)))
        })
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files().count()
    }

    #[must_use]
    pub fn checksum_count(&self) -> usize {
        self.checksums().count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// The subgraph induced by `nodes`: those nodes (when present here) and
    /// every edge between two of them.
    #[must_use]
    pub fn induced_subgraph(&self, nodes: &BTreeSet<Node>) -> Self {
        let mut sub = Self::new();
        for &node in nodes {
            let Some(adj) = self.adjacency.get(&node) else {
                continue;
            };
            sub.add_node(node);
            if let Node::File(file) = node {
                for &other in adj.iter().filter(|n| nodes.contains(*n)) {
                    if let Node::Checksum(checksum) = other {
                        sub.add_edge(Edge::new(file, checksum));
                    }
                }
            }
        }
        sub
    }

    /// Connected components, each as an ordered node set.
    ///
    /// Components are returned in order of their smallest node.
    #[must_use]
    pub fn connected_components(&self) -> Vec<BTreeSet<Node>> {
        let mut seen: BTreeSet<Node> = BTreeSet::new();
        let mut components = Vec::new();

        for start in self.nodes() {
            if seen.contains(&start) {
                continue;
            }
            let mut component = BTreeSet::new();
            let mut queue = VecDeque::from([start]);
            seen.insert(start);

            while let Some(node) = queue.pop_front() {
                component.insert(node);
                for next in self.neighbors(node) {
                    if seen.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
            components.push(component);
        }

        components
    }

    /// A shortest path from `from` to `to`, both endpoints included.
    ///
    /// Breadth-first with neighbours visited in ascending order, so ties
    /// always resolve the same way. Returns `None` when either node is
    /// missing or `to` is unreachable.
    #[must_use]
    pub fn shortest_path(&self, from: Node, to: Node) -> Option<Vec<Node>> {
        if !self.contains_node(from) || !self.contains_node(to) {
            return None;
        }
        if from == to {
            return Some(vec![from]);
        }

        let mut parent: BTreeMap<Node, Node> = BTreeMap::new();
        let mut queue = VecDeque::from([from]);
        let mut seen = BTreeSet::from([from]);

        while let Some(node) = queue.pop_front() {
            for next in self.neighbors(node) {
                if !seen.insert(next) {
                    continue;
                }
                parent.insert(next, node);
                if next == to {
                    let mut path = vec![to];
                    let mut cursor = to;
                    while let Some(&prev) = parent.get(&cursor) {
                        path.push(prev);
                        cursor = prev;
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(next);
            }
        }

        None
    }
}
