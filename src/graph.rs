//! k-nearest-neighbor graphs and the graph algorithms the topology indicators use.
//!
//! The graph is built directed (each node points at its k nearest neighbors) and kept
//! alongside its undirected view, in which an edge exists if either endpoint lists the
//! other. Paths, components and the cycle estimate all run on the undirected view.

use std::collections::{BinaryHeap, HashSet};

use smallvec::SmallVec;

use crate::neighbors::knn_table;

type Adjacency = SmallVec<[(usize, f32); 16]>;

/// Weighted kNN graph over a point set.
#[derive(Debug, Clone, PartialEq)]
pub struct KnnGraph {
    k: usize,
    directed: Vec<Adjacency>,
    undirected: Vec<Adjacency>,
}

impl KnnGraph {
    /// Brute-force kNN graph, weight = Euclidean distance.
    pub fn build<V: AsRef<[f32]>>(points: &[V], k: usize) -> Self {
        let directed: Vec<Adjacency> = knn_table(points, k)
            .into_iter()
            .map(|ns| ns.into_iter().map(|n| (n.index, n.distance)).collect())
            .collect();
        Self::from_directed(k, directed)
    }

    /// Graph from explicit directed edges `(from, to, weight)` over `n` nodes.
    pub fn from_edges(n: usize, edges: &[(usize, usize, f32)]) -> Self {
        let mut directed = vec![Adjacency::new(); n];
        for &(from, to, w) in edges {
            directed[from].push((to, w));
        }
        Self::from_directed(0, directed)
    }

    fn from_directed(k: usize, directed: Vec<Adjacency>) -> Self {
        let mut undirected = vec![Adjacency::new(); directed.len()];
        for (from, edges) in directed.iter().enumerate() {
            for &(to, w) in edges {
                if from == to {
                    continue;
                }
                add_undirected(&mut undirected[from], to, w);
                add_undirected(&mut undirected[to], from, w);
            }
        }
        Self {
            k,
            directed,
            undirected,
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn node_count(&self) -> usize {
        self.directed.len()
    }

    /// Outgoing kNN edges of `node`.
    pub fn neighbors(&self, node: usize) -> &[(usize, f32)] {
        &self.directed[node]
    }

    /// Neighbors of `node` in the undirected view.
    pub fn undirected_neighbors(&self, node: usize) -> &[(usize, f32)] {
        &self.undirected[node]
    }

    /// Number of edges, each unordered pair counted once.
    pub fn undirected_edge_count(&self) -> usize {
        self.undirected.iter().map(|adj| adj.len()).sum::<usize>() / 2
    }

    /// Single-pair Dijkstra with early exit at `target`. `None` if unreachable.
    pub fn shortest_path(&self, source: usize, target: usize) -> Option<f32> {
        let n = self.node_count();
        if source >= n || target >= n {
            return None;
        }
        if source == target {
            return Some(0.0);
        }

        let mut dist = vec![f32::INFINITY; n];
        let mut settled: HashSet<usize> = HashSet::new();
        let mut heap = BinaryHeap::new();
        dist[source] = 0.0;
        heap.push(Candidate {
            node: source,
            distance: 0.0,
        });

        while let Some(Candidate { node, distance }) = heap.pop() {
            if node == target {
                return Some(distance);
            }
            if !settled.insert(node) {
                continue;
            }
            for &(next, w) in &self.undirected[node] {
                let candidate = distance + w;
                if candidate < dist[next] {
                    dist[next] = candidate;
                    heap.push(Candidate {
                        node: next,
                        distance: candidate,
                    });
                }
            }
        }
        None
    }

    /// Floyd–Warshall over the undirected view. O(n³): small graphs only.
    pub fn all_pairs_shortest_paths(&self) -> Vec<Vec<f32>> {
        let n = self.node_count();
        let mut d = vec![vec![f32::INFINITY; n]; n];
        for (i, row) in d.iter_mut().enumerate() {
            row[i] = 0.0;
            for &(j, w) in &self.undirected[i] {
                if w < row[j] {
                    row[j] = w;
                }
            }
        }
        for via in 0..n {
            for i in 0..n {
                let d_iv = d[i][via];
                if d_iv.is_infinite() {
                    continue;
                }
                for j in 0..n {
                    let through = d_iv + d[via][j];
                    if through < d[i][j] {
                        d[i][j] = through;
                    }
                }
            }
        }
        d
    }

    /// Connected components (iterative DFS), each sorted, ordered by smallest member.
    pub fn connected_components(&self) -> Vec<Vec<usize>> {
        let n = self.node_count();
        let mut visited = vec![false; n];
        let mut components = Vec::new();
        for start in 0..n {
            if visited[start] {
                continue;
            }
            let mut component = Vec::new();
            let mut stack = vec![start];
            visited[start] = true;
            while let Some(node) = stack.pop() {
                component.push(node);
                for &(next, _) in &self.undirected[node] {
                    if !visited[next] {
                        visited[next] = true;
                        stack.push(next);
                    }
                }
            }
            component.sort_unstable();
            components.push(component);
        }
        components
    }

    pub fn component_count(&self) -> usize {
        self.connected_components().len()
    }

    /// Cycle rank `max(0, |E| − |V| + |C|)`: the number of independent cycles.
    pub fn approximate_cycle_count(&self) -> usize {
        let e = self.undirected_edge_count();
        let v = self.node_count();
        let c = self.component_count();
        (e + c).saturating_sub(v)
    }
}

fn add_undirected(adj: &mut Adjacency, to: usize, w: f32) {
    match adj.iter_mut().find(|(n, _)| *n == to) {
        Some(edge) => edge.1 = edge.1.min(w),
        None => adj.push((to, w)),
    }
}

/// Dijkstra frontier entry, min-heap by distance.
#[derive(Clone, Copy, PartialEq)]
struct Candidate {
    node: usize,
    distance: f32,
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Min-heap: smaller distance = higher priority
        self.distance
            .total_cmp(&other.distance)
            .reverse()
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
