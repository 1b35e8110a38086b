//! Gateway node identities and node batches.
//!
//! Every value the bridge publishes lands in one of nine fixed gateway
//! nodes. [`LogicalNode`] is the closed set of those nodes; its
//! identity (`nodeType`, `nodeName`) and "empty" value are pure
//! functions over the variant, so there is no lookup state anywhere.
//!
//! A [`NodeBatch`] is what the engine emits for one event: a set-list
//! followed by a clear-list, all sharing one timestamp.

use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// `nodeType` of the boolean machine-state nodes.
pub const NODE_TYPE_STATE: i32 = 0;

/// `nodeType` of the integer quantity nodes.
pub const NODE_TYPE_QUANTITY: i32 = 2;

/// `nodeType` of the program name node.
pub const NODE_TYPE_TEXT: i32 = 3;

/// Value written to a boolean node when it is asserted.
pub const FLAG_TRUE: &str = "true";

/// Value written to a boolean node when it is cleared.
pub const FLAG_FALSE: &str = "false";

// ---------------------------------------------------------------------------
// LogicalNode
// ---------------------------------------------------------------------------

/// One of the fixed nodes on the gateway.
///
/// The first six variants are boolean presence flags forming the
/// mutually-exclusive machine-state family; the last three carry a
/// string-encoded value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalNode {
    Running,
    Ended,
    Stopped,
    StoppedMalfunction,
    StoppedOperator,
    Aborted,
    ProgName,
    TargetQuantity,
    CurrentQuantity,
}

impl LogicalNode {
    /// The machine-state family. At most one member (or `Stopped` plus
    /// one stop reason) is asserted at any time.
    pub const STATE_FAMILY: [LogicalNode; 6] = [
        LogicalNode::Running,
        LogicalNode::Ended,
        LogicalNode::Stopped,
        LogicalNode::StoppedMalfunction,
        LogicalNode::StoppedOperator,
        LogicalNode::Aborted,
    ];

    /// Gateway `nodeType` for this node.
    pub fn node_type(self) -> i32 {
        match self {
            LogicalNode::ProgName => NODE_TYPE_TEXT,
            LogicalNode::TargetQuantity | LogicalNode::CurrentQuantity => NODE_TYPE_QUANTITY,
            _ => NODE_TYPE_STATE,
        }
    }

    /// Gateway `nodeName` for this node.
    pub fn name(self) -> &'static str {
        match self {
            LogicalNode::Running => "35.Running",
            LogicalNode::Ended => "35.Ended",
            LogicalNode::Stopped => "35.Stopped",
            LogicalNode::StoppedMalfunction => "35.StoppedMalfunction",
            LogicalNode::StoppedOperator => "35.StoppedOperator",
            LogicalNode::Aborted => "35.Aborted",
            LogicalNode::ProgName => "32",
            LogicalNode::TargetQuantity => "12",
            LogicalNode::CurrentQuantity => "13",
        }
    }

    /// The value that resets this node.
    pub fn cleared_value(self) -> &'static str {
        match self {
            LogicalNode::ProgName => "",
            LogicalNode::TargetQuantity | LogicalNode::CurrentQuantity => "0",
            _ => FLAG_FALSE,
        }
    }

    /// `true` for the six boolean machine-state nodes.
    pub fn is_state(self) -> bool {
        self.node_type() == NODE_TYPE_STATE
    }
}

// ---------------------------------------------------------------------------
// NodeAssertion
// ---------------------------------------------------------------------------

/// A single value update for one gateway node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAssertion {
    pub node: LogicalNode,
    pub value: String,
    pub timestamp: Timestamp,
}

impl NodeAssertion {
    /// Update `node` to `value`.
    pub fn new(node: LogicalNode, value: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            node,
            value: value.into(),
            timestamp,
        }
    }

    /// Reset `node` to its empty value.
    pub fn cleared(node: LogicalNode, timestamp: Timestamp) -> Self {
        Self::new(node, node.cleared_value(), timestamp)
    }

    pub fn node_type(&self) -> i32 {
        self.node.node_type()
    }

    pub fn name(&self) -> &'static str {
        self.node.name()
    }
}

// ---------------------------------------------------------------------------
// NodeBatch
// ---------------------------------------------------------------------------

/// The ordered output of one engine decision.
///
/// Set entries always precede clear entries when the batch is
/// flattened with [`NodeBatch::into_assertions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeBatch {
    pub timestamp: Timestamp,
    pub set: Vec<NodeAssertion>,
    pub clear: Vec<NodeAssertion>,
}

impl NodeBatch {
    /// Start an empty batch stamped with `timestamp`.
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            set: Vec::new(),
            clear: Vec::new(),
        }
    }

    /// Assert a boolean state node.
    pub fn flag(self, node: LogicalNode) -> Self {
        debug_assert!(node.is_state(), "{node:?} is not a boolean node");
        self.value(node, FLAG_TRUE)
    }

    /// Assert a node with an explicit value.
    pub fn value(mut self, node: LogicalNode, value: impl Into<String>) -> Self {
        self.set.push(NodeAssertion::new(node, value, self.timestamp));
        self
    }

    /// Append clears for every node in `nodes`.
    pub fn clear(mut self, nodes: &[LogicalNode]) -> Self {
        let ts = self.timestamp;
        self.clear.extend(nodes.iter().map(|&n| NodeAssertion::cleared(n, ts)));
        self
    }

    /// Value asserted for `node` in this batch, if any.
    pub fn asserted(&self, node: LogicalNode) -> Option<&str> {
        self.set
            .iter()
            .find(|a| a.node == node)
            .map(|a| a.value.as_str())
    }

    /// Whether `node` is in the clear-list.
    pub fn clears(&self, node: LogicalNode) -> bool {
        self.clear.iter().any(|a| a.node == node)
    }

    /// Nodes in the set-list, in emission order.
    pub fn set_nodes(&self) -> Vec<LogicalNode> {
        self.set.iter().map(|a| a.node).collect()
    }

    /// Nodes in the clear-list, in emission order.
    pub fn cleared_nodes(&self) -> Vec<LogicalNode> {
        self.clear.iter().map(|a| a.node).collect()
    }

    /// Flatten into dispatch order: every set, then every clear.
    pub fn into_assertions(self) -> Vec<NodeAssertion> {
        let mut all = self.set;
        all.extend(self.clear);
        all
    }
}
