//! Variable-length path patterns over the graph store.

use std::collections::{HashSet, VecDeque};
use std::fmt;

use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use super::store::GraphStore;
use crate::error::Result;
use crate::graph::TraversalBudget;
use crate::model::{sort_paths, PathQuery, RelationshipPath, VendorNode, VendorRelationship};

/// `(source)-[:TYPES*min..max]->(target)` with a strength floor on every
/// edge, matched as simple paths that never revisit the source.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchPattern {
    pub source_vendor_id: String,
    /// Empty matches any type.
    pub relationship_types: Vec<String>,
    pub min_hops: usize,
    pub max_hops: usize,
    pub min_strength: f64,
    pub limit: usize,
}

impl MatchPattern {
    pub fn from_query(query: &PathQuery) -> Self {
        Self {
            source_vendor_id: query.source_vendor_id.clone(),
            relationship_types: query.type_filter().map(<[String]>::to_vec).unwrap_or_default(),
            min_hops: query.min_depth,
            max_hops: query.max_depth,
            min_strength: query.min_strength,
            limit: query.limit,
        }
    }

    fn allows(&self, edge: &VendorRelationship) -> bool {
        edge.strength >= self.min_strength
            && (self.relationship_types.is_empty()
                || self.relationship_types.contains(&edge.relationship_type))
    }
}

impl fmt::Display for MatchPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MATCH p = (s:Vendor {{vendor_id: {:?}}})-[r", self.source_vendor_id)?;
        if !self.relationship_types.is_empty() {
            write!(f, ":{}", self.relationship_types.join("|"))?;
        }
        write!(
            f,
            "*{}..{}]->(t:Vendor) WHERE all(x IN r WHERE x.strength >= {}) AND t <> s RETURN p LIMIT {}",
            self.min_hops, self.max_hops, self.min_strength, self.limit
        )
    }
}

struct Frame {
    edges: Vec<EdgeIndex>,
    next: usize,
}

impl GraphStore {
    /// Edges leaving `node` in ascending relationship-id order.
    fn sorted_outgoing<F>(&self, node: NodeIndex, mut keep: F) -> Vec<EdgeIndex>
    where
        F: FnMut(&VendorRelationship) -> bool,
    {
        let graph = self.graph();
        let mut edges: Vec<_> = graph
            .edges_directed(node, Direction::Outgoing)
            .filter(|e| keep(e.weight()))
            .map(|e| (e.weight().id, e.id()))
            .collect();
        edges.sort_unstable_by_key(|&(id, _)| id);
        edges.into_iter().map(|(_, e)| e).collect()
    }

    fn materialize(&self, nodes: &[NodeIndex], edges: &[EdgeIndex]) -> RelationshipPath {
        let graph = self.graph();
        let nodes = nodes
            .iter()
            .enumerate()
            .map(|(depth, &n)| VendorNode::from_vendor(&graph[n], depth))
            .collect();
        let relationships = edges.iter().map(|&e| graph[e].clone()).collect();
        RelationshipPath::new(nodes, relationships)
    }

    /// Matches of `pattern`, one hop count at a time from `min_hops` up.
    /// Stops after the expansion in which `limit` distinct vendor sequences
    /// have matched, so a binding limit drops the deepest paths first. The
    /// result is ordered by (length asc, strength desc) and truncated.
    pub fn match_paths(
        &self,
        pattern: &MatchPattern,
        budget: &TraversalBudget,
    ) -> Result<Vec<RelationshipPath>> {
        log::debug!("native: {}", pattern);
        let source = self.require_node(&pattern.source_vendor_id)?;
        let mut seen: HashSet<Vec<NodeIndex>> = HashSet::new();
        let mut matches: Vec<RelationshipPath> = Vec::new();

        for hops in pattern.min_hops..=pattern.max_hops {
            self.match_exact_hops(source, pattern, hops, budget, &mut seen, &mut matches)?;
            if matches.len() >= pattern.limit {
                break;
            }
        }

        log::debug!(
            "native: {} matched {} paths",
            pattern.source_vendor_id,
            matches.len()
        );
        sort_paths(&mut matches);
        matches.truncate(pattern.limit);
        Ok(matches)
    }

    /// Depth-first pass emitting simple paths of exactly `hops` edges in
    /// ascending edge-id order. The frame holding the last hop is always
    /// expanded in full before the limit is checked.
    fn match_exact_hops(
        &self,
        source: NodeIndex,
        pattern: &MatchPattern,
        hops: usize,
        budget: &TraversalBudget,
        seen: &mut HashSet<Vec<NodeIndex>>,
        matches: &mut Vec<RelationshipPath>,
    ) -> Result<()> {
        let graph = self.graph();
        let mut path_nodes = vec![source];
        let mut path_edges: Vec<EdgeIndex> = Vec::new();

        budget.check()?;
        let mut stack = vec![Frame {
            edges: self.sorted_outgoing(source, |e| pattern.allows(e)),
            next: 0,
        }];

        loop {
            let level = stack.len();
            let Some(frame) = stack.last_mut() else {
                break;
            };

            if level == hops {
                let last_hop = std::mem::take(&mut frame.edges);
                stack.pop();
                for edge in last_hop {
                    let Some((_, target)) = graph.edge_endpoints(edge) else {
                        continue;
                    };
                    if path_nodes.contains(&target) {
                        continue;
                    }
                    path_nodes.push(target);
                    path_edges.push(edge);
                    if seen.insert(path_nodes.clone()) {
                        matches.push(self.materialize(&path_nodes, &path_edges));
                    }
                    path_nodes.pop();
                    path_edges.pop();
                }
                if matches.len() >= pattern.limit {
                    return Ok(());
                }
                if !stack.is_empty() {
                    path_nodes.pop();
                    path_edges.pop();
                }
                continue;
            }

            let Some(&edge) = frame.edges.get(frame.next) else {
                stack.pop();
                if !stack.is_empty() {
                    path_nodes.pop();
                    path_edges.pop();
                }
                continue;
            };
            frame.next += 1;

            let Some((_, target)) = graph.edge_endpoints(edge) else {
                continue;
            };
            if path_nodes.contains(&target) {
                continue;
            }
            budget.check()?;
            let edges = self.sorted_outgoing(target, |e| pattern.allows(e));
            path_nodes.push(target);
            path_edges.push(edge);
            stack.push(Frame { edges, next: 0 });
        }
        Ok(())
    }

    /// Minimum-hop path over edges of any type and strength.
    pub fn shortest_path(
        &self,
        source_vendor_id: &str,
        target_vendor_id: &str,
        max_depth: usize,
        budget: &TraversalBudget,
    ) -> Result<Option<RelationshipPath>> {
        let source = self.require_node(source_vendor_id)?;
        let target = self.require_node(target_vendor_id)?;
        if source == target {
            return Ok(None);
        }

        let graph = self.graph();
        let mut parent: Vec<Option<EdgeIndex>> = vec![None; graph.node_count()];
        let mut visited = vec![false; graph.node_count()];
        visited[source.index()] = true;
        let mut queue = VecDeque::from([(source, 0usize)]);

        while let Some((node, depth)) = queue.pop_front() {
            budget.check()?;
            if depth >= max_depth {
                continue;
            }
            for edge in self.sorted_outgoing(node, |_| true) {
                let Some((_, next)) = graph.edge_endpoints(edge) else {
                    continue;
                };
                if visited[next.index()] {
                    continue;
                }
                visited[next.index()] = true;
                parent[next.index()] = Some(edge);
                if next == target {
                    return Ok(Some(self.unwind(source, target, &parent)));
                }
                queue.push_back((next, depth + 1));
            }
        }
        Ok(None)
    }

    fn unwind(&self, source: NodeIndex, target: NodeIndex, parent: &[Option<EdgeIndex>]) -> RelationshipPath {
        let graph = self.graph();
        let mut nodes = vec![target];
        let mut edges = Vec::new();
        let mut current = target;
        while current != source {
            let Some(edge) = parent[current.index()] else {
                break;
            };
            edges.push(edge);
            current = graph.edge_endpoints(edge).map_or(source, |(from, _)| from);
            nodes.push(current);
        }
        nodes.reverse();
        edges.reverse();
        self.materialize(&nodes, &edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::GraphSnapshot;
    use crate::error::VendorGraphError;
    use crate::graph::PathExplorer;
    use crate::test_support::{chain_repository, MemoryRepository};
    use chrono::Utc;

    fn store_from(repo: &MemoryRepository) -> GraphStore {
        GraphStore::from_snapshot(GraphSnapshot {
            synced_at: Utc::now(),
            vendors: repo.vendors(),
            relationships: repo.edges(),
        })
    }

    #[test]
    fn test_pattern_renders_as_match_clause() {
        let query = PathQuery::new("A", 2, 4)
            .with_relationship_types(["supplier", "partner"])
            .with_min_strength(0.5)
            .with_limit(20);
        assert_eq!(
            MatchPattern::from_query(&query).to_string(),
            "MATCH p = (s:Vendor {vendor_id: \"A\"})-[r:supplier|partner*2..4]->(t:Vendor) \
             WHERE all(x IN r WHERE x.strength >= 0.5) AND t <> s RETURN p LIMIT 20"
        );
    }

    #[test]
    fn test_chain_match() {
        let store = store_from(&chain_repository());
        let paths = store
            .match_paths(
                &MatchPattern::from_query(&PathQuery::new("A", 1, 3)),
                &TraversalBudget::unbounded(),
            )
            .unwrap();
        let targets: Vec<_> = paths.iter().map(|p| p.target_vendor_id.as_str()).collect();
        assert_eq!(targets, vec!["B", "C", "D"]);
        assert_eq!(paths[2].vendor_ids(), vec!["A", "B", "C", "D"]);
        assert_eq!(paths[2].nodes[3].depth, 3);
    }

    #[test]
    fn test_cycles_and_parallel_edges() {
        let repo = MemoryRepository::with_vendors(["A", "B", "C"]);
        repo.add_edge("A", "B", "supplier", 0.5);
        repo.add_edge("A", "B", "partner", 0.9);
        repo.add_edge("B", "C", "supplier", 0.8);
        repo.add_edge("C", "A", "supplier", 0.8);
        let store = store_from(&repo);

        let paths = store
            .match_paths(
                &MatchPattern::from_query(&PathQuery::new("A", 1, 5)),
                &TraversalBudget::unbounded(),
            )
            .unwrap();
        assert_eq!(paths.len(), 2);
        // The lower-id edge wins the A→B signature.
        assert_eq!(paths[0].relationships[0].id, 1);
        assert!(paths.iter().all(|p| p.target_vendor_id != "A"));
    }

    #[test]
    fn test_filters_apply_to_every_hop() {
        let store = store_from(&chain_repository());
        let paths = store
            .match_paths(
                &MatchPattern::from_query(&PathQuery::new("A", 1, 3).with_relationship_types(["supplier"])),
                &TraversalBudget::unbounded(),
            )
            .unwrap();
        assert_eq!(paths.len(), 1);

        let paths = store
            .match_paths(
                &MatchPattern::from_query(&PathQuery::new("A", 1, 3).with_min_strength(0.75)),
                &TraversalBudget::unbounded(),
            )
            .unwrap();
        assert_eq!(paths.len(), 2);
    }

    /// A→B (0.5), A→C (1.0), B→X (0.1), C→Y (1.0).
    fn fork_repository() -> MemoryRepository {
        let repo = MemoryRepository::with_vendors(["A", "B", "C", "X", "Y"]);
        repo.add_edge("A", "B", "supplier", 0.5);
        repo.add_edge("A", "C", "supplier", 1.0);
        repo.add_edge("B", "X", "supplier", 0.1);
        repo.add_edge("C", "Y", "supplier", 1.0);
        repo
    }

    fn ids(paths: &[RelationshipPath]) -> Vec<String> {
        paths.iter().map(|p| p.vendor_ids().join(">")).collect()
    }

    #[test]
    fn test_binding_limit_keeps_shallowest_paths() {
        let repo = fork_repository();
        let store = store_from(&repo);
        let budget = TraversalBudget::unbounded();

        let query = PathQuery::new("A", 1, 2).with_limit(2);
        let paths = store.match_paths(&MatchPattern::from_query(&query), &budget).unwrap();
        assert_eq!(ids(&paths), vec!["A>C", "A>B"]);

        let bfs = PathExplorer::new(&repo).find_paths(&query, &budget).unwrap();
        assert_eq!(ids(&paths), ids(&bfs));
    }

    #[test]
    fn test_limit_reached_inside_a_deeper_level() {
        let repo = fork_repository();
        let store = store_from(&repo);
        let budget = TraversalBudget::unbounded();

        let query = PathQuery::new("A", 1, 2).with_limit(3);
        let paths = store.match_paths(&MatchPattern::from_query(&query), &budget).unwrap();
        assert_eq!(paths.len(), 3);
        assert_eq!(ids(&paths), vec!["A>C", "A>B", "A>B>X"]);

        let bfs = PathExplorer::new(&repo).find_paths(&query, &budget).unwrap();
        assert_eq!(ids(&paths), ids(&bfs));
    }

    #[test]
    fn test_shortest_path_and_unknown_vendor() {
        let store = store_from(&chain_repository());
        let budget = TraversalBudget::unbounded();
        let path = store.shortest_path("A", "D", 3, &budget).unwrap().unwrap();
        assert_eq!(path.vendor_ids(), vec!["A", "B", "C", "D"]);
        assert!(store.shortest_path("A", "D", 2, &budget).unwrap().is_none());
        assert!(store.shortest_path("B", "B", 2, &budget).unwrap().is_none());
        assert!(matches!(
            store.shortest_path("A", "ghost", 2, &budget),
            Err(VendorGraphError::NotFound(_))
        ));
    }

    #[test]
    fn test_expired_budget() {
        let store = store_from(&chain_repository());
        let budget = TraversalBudget::with_deadline(std::time::Instant::now());
        assert!(matches!(
            store.match_paths(&MatchPattern::from_query(&PathQuery::new("A", 1, 3)), &budget),
            Err(VendorGraphError::TraversalBudgetExceeded(_))
        ));
    }
}
