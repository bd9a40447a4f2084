//! Bounded multi-path BFS enumeration.

use std::collections::{HashSet, VecDeque};

use crate::error::{Result, VendorGraphError};
use crate::graph::arena::{PathArena, StateRef, VendorIdx};
use crate::graph::{TraversalBudget, VendorRepository};
use crate::model::{sort_paths, PathQuery, RelationshipPath};

/// Enumerates simple paths from a source vendor inside a hop window.
///
/// Exploration is breadth-first and stops dequeuing once `limit` paths have
/// been emitted. The limit therefore bounds how much of the graph is explored,
/// not just how much is returned: when it binds, stronger paths that sit later
/// in BFS order are never discovered, and the final sort only reorders what
/// was collected.
pub struct PathExplorer<'r, R: VendorRepository + ?Sized> {
    repo: &'r R,
}

impl<'r, R: VendorRepository + ?Sized> PathExplorer<'r, R> {
    pub fn new(repo: &'r R) -> Self {
        Self { repo }
    }

    /// Find paths of length `min_depth..=max_depth` from the query source,
    /// sorted by (length asc, strength desc) and truncated to `limit`.
    pub fn find_paths(
        &self,
        query: &PathQuery,
        budget: &TraversalBudget,
    ) -> Result<Vec<RelationshipPath>> {
        query.validate()?;
        let source = self
            .repo
            .get_vendor(&query.source_vendor_id)?
            .ok_or_else(|| {
                VendorGraphError::NotFound(format!("vendor {}", query.source_vendor_id))
            })?;

        let type_filter = query.type_filter();
        let mut arena = PathArena::new(source);
        let mut queue: VecDeque<StateRef> = VecDeque::from([PathArena::ROOT]);
        let mut emitted_signatures: HashSet<Box<[VendorIdx]>> = HashSet::new();
        let mut emitted: Vec<StateRef> = Vec::new();
        let mut expansions = 0usize;

        while let Some(state) = queue.pop_front() {
            if emitted.len() >= query.limit {
                break;
            }
            budget.check()?;

            let (current_vendor, current_depth) = {
                let st = arena.state(state);
                (st.vendor, st.depth)
            };
            if current_depth >= query.max_depth {
                continue;
            }
            expansions += 1;

            let current_id = arena.vendor(current_vendor).vendor_id.clone();
            let edges = self
                .repo
                .outgoing_edges(&current_id, type_filter, query.min_strength)?;

            for edge in edges {
                if edge.target_vendor_id == query.source_vendor_id {
                    continue;
                }
                let target = match arena.vendor_index(&edge.target_vendor_id) {
                    Some(idx) if arena.on_path(state, idx) => continue,
                    Some(idx) => idx,
                    None => match self.repo.get_vendor(&edge.target_vendor_id)? {
                        Some(vendor) => arena.intern(vendor),
                        None => {
                            log::debug!(
                                "Skipping edge {} to unknown vendor {}",
                                edge.id,
                                edge.target_vendor_id
                            );
                            continue;
                        }
                    },
                };

                let next = arena.push(state, target, edge);
                let new_depth = arena.state(next).depth;

                if (query.min_depth..=query.max_depth).contains(&new_depth)
                    && emitted_signatures.insert(arena.signature(next))
                {
                    emitted.push(next);
                }

                if new_depth < query.max_depth {
                    queue.push_back(next);
                }
            }
        }

        log::debug!(
            "find_paths from {}: {} expansions, {} states, {} paths",
            query.source_vendor_id,
            expansions,
            arena.len(),
            emitted.len()
        );

        let mut paths: Vec<RelationshipPath> =
            emitted.into_iter().map(|s| arena.materialize(s)).collect();
        sort_paths(&mut paths);
        paths.truncate(query.limit);
        Ok(paths)
    }
}
