use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a node (stock) in the causal-loop graph.
    pub struct NodeId;

    /// Identifies an edge (flow) in the causal-loop graph.
    pub struct EdgeId;
}

/// The numeric node id a saved diagram uses to refer to its nodes.
///
/// Edges in the flat attribute format point at nodes through this id, so it
/// is kept alongside the runtime [`NodeId`] for the load/save boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PersistId(pub u32);

/// A pending node ID returned from queued mutations. Resolves to NodeId on apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingNodeId(pub u64);

/// A pending edge ID returned from queued mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingEdgeId(pub u64);

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn persist_ids_order_numerically() {
        let mut ids = vec![PersistId(7), PersistId(2), PersistId(5)];
        ids.sort();
        assert_eq!(ids, vec![PersistId(2), PersistId(5), PersistId(7)]);
    }

    #[test]
    fn node_keys_are_unique_after_reuse() {
        let mut sm = SlotMap::<NodeId, ()>::with_key();
        let a = sm.insert(());
        sm.remove(a);
        let b = sm.insert(());
        assert_ne!(a, b, "a recycled slot must carry a new version");
    }
}
