use crate::edge::EdgeConfig;
use crate::fixed::Fixed64;
use crate::id::*;
use crate::node::NodeConfig;
use serde::{Deserialize, Serialize};
use slotmap::{SecondaryMap, SlotMap};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during graph operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("node not found: {0:?}")]
    NodeNotFound(NodeId),
    #[error("edge not found: {0:?}")]
    EdgeNotFound(EdgeId),
    #[error("queued connection {0:?} was rejected: an endpoint no longer exists")]
    ConnectRejected(PendingEdgeId),
}

// ---------------------------------------------------------------------------
// Core data structures
// ---------------------------------------------------------------------------

/// Adjacency lists for a single node, tracking incoming and outgoing edges.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct NodeAdjacency {
    /// Edges whose destination is this node.
    inputs: Vec<EdgeId>,
    /// Edges whose source is this node.
    outputs: Vec<EdgeId>,
}

/// Per-node data stored in the graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeData {
    pub config: NodeConfig,
}

/// Per-edge data stored in the graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeData {
    /// Source node.
    pub from: NodeId,
    /// Destination node. May equal `from`.
    pub to: NodeId,
    pub config: EdgeConfig,
}

impl EdgeData {
    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }
}

// ---------------------------------------------------------------------------
// Queued mutations
// ---------------------------------------------------------------------------

/// A mutation to be applied during the next `apply_mutations` call.
#[derive(Debug)]
enum Mutation {
    AddNode {
        config: NodeConfig,
        pending_id: PendingNodeId,
    },
    RemoveNode {
        node: NodeId,
    },
    Connect {
        from: NodeId,
        to: NodeId,
        config: EdgeConfig,
        pending_id: PendingEdgeId,
    },
    Disconnect {
        edge: EdgeId,
    },
}

/// Result of applying queued mutations.
#[derive(Debug, Default)]
pub struct MutationResult {
    /// Maps each `PendingNodeId` to the real `NodeId` it was assigned.
    pub added_nodes: Vec<(PendingNodeId, NodeId)>,
    /// Maps each `PendingEdgeId` to the real `EdgeId` it was assigned.
    pub added_edges: Vec<(PendingEdgeId, EdgeId)>,
    /// Nodes that were actually removed.
    pub removed_nodes: Vec<NodeId>,
    /// Edges that were actually removed, including those taken down with
    /// a removed node.
    pub removed_edges: Vec<EdgeId>,
    /// Connections skipped because an endpoint did not exist.
    pub rejected: Vec<GraphError>,
}

impl MutationResult {
    /// Look up the real `NodeId` for a pending node.
    pub fn resolve_node(&self, pending: PendingNodeId) -> Option<NodeId> {
        self.added_nodes
            .iter()
            .find(|(p, _)| *p == pending)
            .map(|(_, id)| *id)
    }

    /// Look up the real `EdgeId` for a pending edge.
    pub fn resolve_edge(&self, pending: PendingEdgeId) -> Option<EdgeId> {
        self.added_edges
            .iter()
            .find(|(p, _)| *p == pending)
            .map(|(_, id)| *id)
    }

    /// Whether the graph's topology changed.
    pub fn is_empty(&self) -> bool {
        self.added_nodes.is_empty()
            && self.added_edges.is_empty()
            && self.removed_nodes.is_empty()
            && self.removed_edges.is_empty()
    }
}

// ---------------------------------------------------------------------------
// CausalGraph
// ---------------------------------------------------------------------------

/// The causal-loop graph: nodes (stocks), edges (flows) and their
/// configuration, with a queued mutation system.
///
/// Slot maps give stable keys but reuse slots, so their iteration order is
/// not creation order. Two explicit vectors keep creation order, which the
/// engine uses for every deterministic sweep.
#[derive(Debug, Serialize, Deserialize)]
pub struct CausalGraph {
    nodes: SlotMap<NodeId, NodeData>,
    edges: SlotMap<EdgeId, EdgeData>,
    adjacency: SecondaryMap<NodeId, NodeAdjacency>,
    node_order: Vec<NodeId>,
    edge_order: Vec<EdgeId>,

    /// Queued mutations to be applied atomically.
    #[serde(skip)]
    mutations: Vec<Mutation>,
    next_pending_node: u64,
    next_pending_edge: u64,
}

impl Clone for CausalGraph {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            adjacency: self.adjacency.clone(),
            node_order: self.node_order.clone(),
            edge_order: self.edge_order.clone(),
            mutations: Vec::new(), // Don't clone queued mutations.
            next_pending_node: self.next_pending_node,
            next_pending_edge: self.next_pending_edge,
        }
    }
}

impl Default for CausalGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl CausalGraph {
    /// Create a new, empty graph.
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            edges: SlotMap::with_key(),
            adjacency: SecondaryMap::new(),
            node_order: Vec::new(),
            edge_order: Vec::new(),
            mutations: Vec::new(),
            next_pending_node: 0,
            next_pending_edge: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Immediate mutations, used by apply_mutations
    // -----------------------------------------------------------------------

    fn add_node_immediate(&mut self, config: NodeConfig) -> NodeId {
        let node_id = self.nodes.insert(NodeData { config });
        self.adjacency.insert(node_id, NodeAdjacency::default());
        self.node_order.push(node_id);
        node_id
    }

    /// Remove a node and every edge touching it.
    fn remove_node_immediate(&mut self, node: NodeId, result: &mut MutationResult) {
        let Some(adj) = self.adjacency.get(node) else {
            return;
        };
        let edges_to_remove: Vec<EdgeId> =
            adj.inputs.iter().chain(adj.outputs.iter()).copied().collect();

        for edge_id in edges_to_remove {
            // A self-loop is listed twice; the second removal is a no-op.
            if self.disconnect_immediate(edge_id) {
                result.removed_edges.push(edge_id);
            }
        }

        self.nodes.remove(node);
        self.adjacency.remove(node);
        self.node_order.retain(|&n| n != node);
        result.removed_nodes.push(node);
    }

    fn connect_immediate(
        &mut self,
        from: NodeId,
        to: NodeId,
        config: EdgeConfig,
    ) -> Result<EdgeId, GraphError> {
        if !self.nodes.contains_key(from) {
            return Err(GraphError::NodeNotFound(from));
        }
        if !self.nodes.contains_key(to) {
            return Err(GraphError::NodeNotFound(to));
        }
        let edge_id = self.edges.insert(EdgeData { from, to, config });

        if let Some(adj) = self.adjacency.get_mut(from) {
            adj.outputs.push(edge_id);
        }
        if let Some(adj) = self.adjacency.get_mut(to) {
            adj.inputs.push(edge_id);
        }
        self.edge_order.push(edge_id);
        Ok(edge_id)
    }

    /// Returns true if the edge existed.
    fn disconnect_immediate(&mut self, edge: EdgeId) -> bool {
        let Some(edge_data) = self.edges.remove(edge) else {
            return false;
        };
        if let Some(adj) = self.adjacency.get_mut(edge_data.from) {
            adj.outputs.retain(|&e| e != edge);
        }
        if let Some(adj) = self.adjacency.get_mut(edge_data.to) {
            adj.inputs.retain(|&e| e != edge);
        }
        self.edge_order.retain(|&e| e != edge);
        true
    }

    // -----------------------------------------------------------------------
    // Queued mutations
    // -----------------------------------------------------------------------

    /// Queue a node to be added. Returns a `PendingNodeId` that can be
    /// resolved to a real `NodeId` after `apply_mutations`.
    ///
    /// # Examples
    ///
    /// ```
    /// use loopy_core::graph::CausalGraph;
    /// use loopy_core::node::NodeConfig;
    ///
    /// let mut graph = CausalGraph::new();
    /// let pending = graph.queue_add_node(NodeConfig::default());
    /// let result = graph.apply_mutations();
    /// let node_id = result.resolve_node(pending).unwrap();
    /// assert!(graph.contains_node(node_id));
    /// ```
    pub fn queue_add_node(&mut self, config: NodeConfig) -> PendingNodeId {
        let pending = PendingNodeId(self.next_pending_node);
        self.next_pending_node += 1;
        self.mutations.push(Mutation::AddNode {
            config,
            pending_id: pending,
        });
        pending
    }

    /// Queue a node for removal. Its edges go with it.
    pub fn queue_remove_node(&mut self, node: NodeId) {
        self.mutations.push(Mutation::RemoveNode { node });
    }

    /// Queue an edge between two nodes. Self-loops are allowed.
    ///
    /// # Examples
    ///
    /// ```
    /// use loopy_core::edge::EdgeConfig;
    /// use loopy_core::graph::CausalGraph;
    /// use loopy_core::node::NodeConfig;
    ///
    /// let mut graph = CausalGraph::new();
    /// let p1 = graph.queue_add_node(NodeConfig::default());
    /// let p2 = graph.queue_add_node(NodeConfig::default());
    /// let result = graph.apply_mutations();
    /// let n1 = result.resolve_node(p1).unwrap();
    /// let n2 = result.resolve_node(p2).unwrap();
    ///
    /// let pending_edge = graph.queue_connect(n1, n2, EdgeConfig::default());
    /// let result = graph.apply_mutations();
    /// let edge_id = result.resolve_edge(pending_edge).unwrap();
    /// assert_eq!(graph.get_outputs(n1), &[edge_id]);
    /// ```
    pub fn queue_connect(&mut self, from: NodeId, to: NodeId, config: EdgeConfig) -> PendingEdgeId {
        let pending = PendingEdgeId(self.next_pending_edge);
        self.next_pending_edge += 1;
        self.mutations.push(Mutation::Connect {
            from,
            to,
            config,
            pending_id: pending,
        });
        pending
    }

    /// Queue an edge for removal.
    pub fn queue_disconnect(&mut self, edge: EdgeId) {
        self.mutations.push(Mutation::Disconnect { edge });
    }

    /// Apply all queued mutations atomically, in submission order.
    pub fn apply_mutations(&mut self) -> MutationResult {
        let mutations = std::mem::take(&mut self.mutations);
        let mut result = MutationResult::default();

        for mutation in mutations {
            match mutation {
                Mutation::AddNode { config, pending_id } => {
                    let node_id = self.add_node_immediate(config);
                    result.added_nodes.push((pending_id, node_id));
                }
                Mutation::RemoveNode { node } => {
                    self.remove_node_immediate(node, &mut result);
                }
                Mutation::Connect {
                    from,
                    to,
                    config,
                    pending_id,
                } => match self.connect_immediate(from, to, config) {
                    Ok(edge_id) => result.added_edges.push((pending_id, edge_id)),
                    Err(err) => {
                        tracing::warn!(?pending_id, %err, "skipping queued connection");
                        result.rejected.push(GraphError::ConnectRejected(pending_id));
                    }
                },
                Mutation::Disconnect { edge } => {
                    if self.disconnect_immediate(edge) {
                        result.removed_edges.push(edge);
                    }
                }
            }
        }

        result
    }

    /// Returns true if there are queued mutations waiting to be applied.
    pub fn has_pending_mutations(&self) -> bool {
        !self.mutations.is_empty()
    }

    // -----------------------------------------------------------------------
    // Configuration edits
    // -----------------------------------------------------------------------

    /// Mutable access to a node's configuration. Edits take effect at the
    /// next tick. Threshold flags are then re-evaluated against the current
    /// fill without reporting a crossing; a new initial fill only applies
    /// on the next reset.
    pub fn node_config_mut(&mut self, node: NodeId) -> Result<&mut NodeConfig, GraphError> {
        self.nodes
            .get_mut(node)
            .map(|n| &mut n.config)
            .ok_or(GraphError::NodeNotFound(node))
    }

    /// Mutable access to an edge's configuration. Geometry edits only
    /// affect signals spawned afterwards.
    pub fn edge_config_mut(&mut self, edge: EdgeId) -> Result<&mut EdgeConfig, GraphError> {
        self.edges
            .get_mut(edge)
            .map(|e| &mut e.config)
            .ok_or(GraphError::EdgeNotFound(edge))
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn get_node(&self, node: NodeId) -> Option<&NodeData> {
        self.nodes.get(node)
    }

    pub fn get_edge(&self, edge: EdgeId) -> Option<&EdgeData> {
        self.edges.get(edge)
    }

    /// Edges coming into a node, in creation order.
    pub fn get_inputs(&self, node: NodeId) -> &[EdgeId] {
        self.adjacency
            .get(node)
            .map(|adj| adj.inputs.as_slice())
            .unwrap_or(&[])
    }

    /// Edges going out of a node, in creation order.
    pub fn get_outputs(&self, node: NodeId) -> &[EdgeId] {
        self.adjacency
            .get(node)
            .map(|adj| adj.outputs.as_slice())
            .unwrap_or(&[])
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains_node(&self, node: NodeId) -> bool {
        self.nodes.contains_key(node)
    }

    pub fn contains_edge(&self, edge: EdgeId) -> bool {
        self.edges.contains_key(edge)
    }

    /// Node ids in creation order.
    pub fn node_order(&self) -> &[NodeId] {
        &self.node_order
    }

    /// Edge ids in creation order.
    pub fn edge_order(&self) -> &[EdgeId] {
        &self.edge_order
    }

    /// Iterate over nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &NodeData)> {
        self.node_order
            .iter()
            .filter_map(|&id| self.nodes.get(id).map(|data| (id, data)))
    }

    /// Iterate over edges in creation order.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &EdgeData)> {
        self.edge_order
            .iter()
            .filter_map(|&id| self.edges.get(id).map(|data| (id, data)))
    }

    /// Path length of an edge, from its geometry and its endpoints'
    /// current positions.
    pub fn path_length(&self, edge: EdgeId) -> Option<Fixed64> {
        let data = self.edges.get(edge)?;
        let from = &self.nodes.get(data.from)?.config;
        let to = &self.nodes.get(data.to)?.config;
        Some(data.config.geometry.path_length(
            (from.x, from.y),
            (to.x, to.y),
            data.is_self_loop(),
        ))
    }
}
