//! Hop-count shortest path.

use std::collections::{HashSet, VecDeque};

use crate::error::{Result, VendorGraphError};
use crate::graph::arena::{PathArena, StateRef};
use crate::graph::{TraversalBudget, VendorRepository};
use crate::model::{RelationshipPath, ShortestPathQuery};

/// Single-target BFS with a global visited set.
///
/// Guarantees the minimum hop count only. Among equal-length paths the first
/// one discovered in edge-id order wins, regardless of strength.
pub struct ShortestPathFinder<'r, R: VendorRepository + ?Sized> {
    repo: &'r R,
}

impl<'r, R: VendorRepository + ?Sized> ShortestPathFinder<'r, R> {
    pub fn new(repo: &'r R) -> Self {
        Self { repo }
    }

    /// `None` when source and target coincide or the target is further than
    /// `max_depth` hops away.
    pub fn find_shortest_path(
        &self,
        query: &ShortestPathQuery,
        budget: &TraversalBudget,
    ) -> Result<Option<RelationshipPath>> {
        query.validate()?;
        let source = self
            .repo
            .get_vendor(&query.source_vendor_id)?
            .ok_or_else(|| {
                VendorGraphError::NotFound(format!("vendor {}", query.source_vendor_id))
            })?;
        if self.repo.get_vendor(&query.target_vendor_id)?.is_none() {
            return Err(VendorGraphError::NotFound(format!(
                "vendor {}",
                query.target_vendor_id
            )));
        }
        if query.source_vendor_id == query.target_vendor_id {
            return Ok(None);
        }

        let mut arena = PathArena::new(source);
        let mut visited: HashSet<String> = HashSet::from([query.source_vendor_id.clone()]);
        let mut queue: VecDeque<StateRef> = VecDeque::from([PathArena::ROOT]);

        while let Some(state) = queue.pop_front() {
            budget.check()?;
            let (current_vendor, depth) = {
                let st = arena.state(state);
                (st.vendor, st.depth)
            };
            if depth >= query.max_depth {
                continue;
            }

            let current_id = arena.vendor(current_vendor).vendor_id.clone();
            for edge in self.repo.outgoing_edges(&current_id, None, 0.0)? {
                if !visited.insert(edge.target_vendor_id.clone()) {
                    continue;
                }
                let Some(vendor) = self.repo.get_vendor(&edge.target_vendor_id)? else {
                    continue;
                };
                let reached_target = vendor.vendor_id == query.target_vendor_id;
                let idx = arena.intern(vendor);
                let next = arena.push(state, idx, edge);
                if reached_target {
                    return Ok(Some(arena.materialize(next)));
                }
                queue.push_back(next);
            }
        }

        Ok(None)
    }
}
