//! Arena of parent-linked path states.
//!
//! A state records only its own hop; the full path is the chain of parent
//! links back to the root. Extending a path is O(1) and on-path membership is
//! a walk of at most `MAX_TRAVERSAL_DEPTH` links.

use std::collections::HashMap;

use crate::model::{RelationshipPath, Vendor, VendorNode, VendorRelationship};

pub(crate) type VendorIdx = u32;
pub(crate) type StateRef = u32;

#[derive(Debug)]
pub(crate) struct PathState {
    pub vendor: VendorIdx,
    /// Edge that reached this state; `None` only for the root.
    edge: Option<u32>,
    parent: Option<StateRef>,
    pub depth: usize,
    pub strength: f64,
}

#[derive(Debug)]
pub(crate) struct PathArena {
    vendors: Vec<Vendor>,
    index: HashMap<String, VendorIdx>,
    edges: Vec<VendorRelationship>,
    states: Vec<PathState>,
}

impl PathArena {
    /// New arena rooted at `source`. The root state is `0`.
    pub fn new(source: Vendor) -> Self {
        let mut arena = Self {
            vendors: Vec::new(),
            index: HashMap::new(),
            edges: Vec::new(),
            states: Vec::new(),
        };
        let vendor = arena.intern(source);
        arena.states.push(PathState {
            vendor,
            edge: None,
            parent: None,
            depth: 0,
            strength: 1.0,
        });
        arena
    }

    pub const ROOT: StateRef = 0;

    pub fn intern(&mut self, vendor: Vendor) -> VendorIdx {
        if let Some(&idx) = self.index.get(&vendor.vendor_id) {
            return idx;
        }
        let idx = self.vendors.len() as VendorIdx;
        self.index.insert(vendor.vendor_id.clone(), idx);
        self.vendors.push(vendor);
        idx
    }

    pub fn vendor_index(&self, vendor_id: &str) -> Option<VendorIdx> {
        self.index.get(vendor_id).copied()
    }

    pub fn vendor(&self, idx: VendorIdx) -> &Vendor {
        &self.vendors[idx as usize]
    }

    pub fn state(&self, state: StateRef) -> &PathState {
        &self.states[state as usize]
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Extend `parent` by one hop over `edge` into `vendor`.
    pub fn push(&mut self, parent: StateRef, vendor: VendorIdx, edge: VendorRelationship) -> StateRef {
        let (depth, strength) = {
            let p = self.state(parent);
            (p.depth + 1, p.strength * edge.strength)
        };
        let edge_idx = self.edges.len() as u32;
        self.edges.push(edge);
        let state = self.states.len() as StateRef;
        self.states.push(PathState {
            vendor,
            edge: Some(edge_idx),
            parent: Some(parent),
            depth,
            strength,
        });
        state
    }

    /// Whether `vendor` already appears on the chain ending at `state`.
    pub fn on_path(&self, state: StateRef, vendor: VendorIdx) -> bool {
        let mut cursor = Some(state);
        while let Some(s) = cursor {
            let st = self.state(s);
            if st.vendor == vendor {
                return true;
            }
            cursor = st.parent;
        }
        false
    }

    /// Chain of states from the root down to `state`, root first.
    fn chain(&self, state: StateRef) -> Vec<StateRef> {
        let mut chain = Vec::with_capacity(self.state(state).depth + 1);
        let mut cursor = Some(state);
        while let Some(s) = cursor {
            chain.push(s);
            cursor = self.state(s).parent;
        }
        chain.reverse();
        chain
    }

    /// Ordered vendor indices from the root to `state`.
    pub fn signature(&self, state: StateRef) -> Box<[VendorIdx]> {
        self.chain(state)
            .into_iter()
            .map(|s| self.state(s).vendor)
            .collect()
    }

    /// Turn the chain ending at `state` into an owned path.
    pub fn materialize(&self, state: StateRef) -> RelationshipPath {
        let chain = self.chain(state);
        let mut nodes = Vec::with_capacity(chain.len());
        let mut relationships = Vec::with_capacity(chain.len().saturating_sub(1));
        for s in chain {
            let st = self.state(s);
            nodes.push(VendorNode::from_vendor(self.vendor(st.vendor), st.depth));
            if let Some(edge) = st.edge {
                relationships.push(self.edges[edge as usize].clone());
            }
        }
        RelationshipPath::new(nodes, relationships)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{relationship, vendor};

    #[test]
    fn test_push_tracks_depth_and_strength() {
        let mut arena = PathArena::new(vendor("A"));
        let b = arena.intern(vendor("B"));
        let c = arena.intern(vendor("C"));
        let s1 = arena.push(PathArena::ROOT, b, relationship(1, "A", "B", 0.5));
        let s2 = arena.push(s1, c, relationship(2, "B", "C", 0.5));

        assert_eq!(arena.state(s2).depth, 2);
        assert!((arena.state(s2).strength - 0.25).abs() < 1e-12);
        assert_eq!(arena.len(), 3);
    }

    #[test]
    fn test_on_path_is_path_local() {
        let mut arena = PathArena::new(vendor("A"));
        let b = arena.intern(vendor("B"));
        let c = arena.intern(vendor("C"));
        let via_b = arena.push(PathArena::ROOT, b, relationship(1, "A", "B", 1.0));
        let via_c = arena.push(PathArena::ROOT, c, relationship(2, "A", "C", 1.0));

        assert!(arena.on_path(via_b, b));
        assert!(!arena.on_path(via_c, b));
        assert!(arena.on_path(via_c, 0));
    }

    #[test]
    fn test_interning_is_idempotent() {
        let mut arena = PathArena::new(vendor("A"));
        let first = arena.intern(vendor("B"));
        let second = arena.intern(vendor("B"));
        assert_eq!(first, second);
        assert_eq!(arena.vendor_index("A"), Some(0));
        assert_eq!(arena.vendor_index("Z"), None);
    }

    #[test]
    fn test_materialize_and_signature() {
        let mut arena = PathArena::new(vendor("A"));
        let b = arena.intern(vendor("B"));
        let c = arena.intern(vendor("C"));
        let s1 = arena.push(PathArena::ROOT, b, relationship(1, "A", "B", 0.9));
        let s2 = arena.push(s1, c, relationship(2, "B", "C", 0.8));

        assert_eq!(&*arena.signature(s2), &[0, b, c]);
        let path = arena.materialize(s2);
        assert_eq!(path.vendor_ids(), vec!["A", "B", "C"]);
        assert_eq!(path.nodes[2].depth, 2);
        assert!((path.total_strength - arena.state(s2).strength).abs() < 1e-12);
    }
}
