use crate::suite::ProtocolSuite;

use super::Gate;

/// Handle of a node in [`ProtocolGraph`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Evaluation state of an atomic node.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum GateState {
    Ready,
    Pulled,
    Done,
}

enum Node<S: ProtocolSuite> {
    Atomic {
        gate: Box<dyn Gate<S>>,
        state: GateState,
    },
    /// Children evaluated one after another. `cursor` points at the first child not known to be done.
    Sequential { children: Vec<NodeId>, cursor: usize },
    /// Children evaluated in any order. `pending` holds children not known to be done.
    Parallel { pending: Vec<NodeId> },
}

/// Arena of atomic and composite protocol nodes.
pub struct ProtocolGraph<S: ProtocolSuite> {
    nodes: Vec<Node<S>>,
}

impl<S: ProtocolSuite> ProtocolGraph<S> {
    /// Create empty graph.
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Total number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn add_atomic(&mut self, gate: Box<dyn Gate<S>>) -> NodeId {
        self.push(Node::Atomic {
            gate,
            state: GateState::Ready,
        })
    }

    pub fn add_sequential(&mut self, children: Vec<NodeId>) -> NodeId {
        self.push(Node::Sequential {
            children,
            cursor: 0,
        })
    }

    pub fn add_parallel(&mut self, children: Vec<NodeId>) -> NodeId {
        self.push(Node::Parallel { pending: children })
    }

    fn push(&mut self, node: Node<S>) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Whether every atomic node under given node has been evaluated.
    pub fn is_done(&self, id: NodeId) -> bool {
        match &self.nodes[id.0] {
            Node::Atomic { state, .. } => *state == GateState::Done,
            Node::Sequential { children, cursor } => {
                children[*cursor..].iter().all(|&child| self.is_done(child))
            }
            Node::Parallel { pending } => pending.iter().all(|&child| self.is_done(child)),
        }
    }

    /// Take up to `budget` atomic nodes that are ready to be evaluated.
    /// Nodes returned once are never returned again.
    pub fn pull(&mut self, id: NodeId, budget: usize) -> Vec<NodeId> {
        let mut batch = Vec::new();
        if budget > 0 {
            self.pull_into(id, budget, &mut batch);
        }
        batch
    }

    fn pull_into(&mut self, id: NodeId, budget: usize, batch: &mut Vec<NodeId>) {
        match &self.nodes[id.0] {
            Node::Atomic { state, .. } => {
                if *state == GateState::Ready {
                    self.set_state(id, GateState::Pulled);
                    batch.push(id);
                }
            }
            Node::Sequential { children, cursor } => {
                let mut next = *cursor;
                while next < children.len() && self.is_done(children[next]) {
                    next += 1;
                }
                let current = children.get(next).copied();
                if let Node::Sequential { cursor, .. } = &mut self.nodes[id.0] {
                    *cursor = next;
                }
                if let Some(child) = current {
                    self.pull_into(child, budget, batch);
                }
            }
            Node::Parallel { pending } => {
                let pending: Vec<_> = pending
                    .iter()
                    .copied()
                    .filter(|&child| !self.is_done(child))
                    .collect();
                for &child in &pending {
                    if batch.len() >= budget {
                        break;
                    }
                    self.pull_into(child, budget, batch);
                }
                self.nodes[id.0] = Node::Parallel { pending };
            }
        }
    }

    fn set_state(&mut self, id: NodeId, new_state: GateState) {
        if let Node::Atomic { state, .. } = &mut self.nodes[id.0] {
            *state = new_state;
        }
    }

    /// Gate of atomic node.
    pub fn gate_mut(&mut self, id: NodeId) -> &mut dyn Gate<S> {
        match &mut self.nodes[id.0] {
            Node::Atomic { gate, .. } => gate.as_mut(),
            _ => panic!("Node {} is not atomic", id.0),
        }
    }

    /// Record that pulled atomic node has been evaluated.
    pub fn mark_done(&mut self, id: NodeId) {
        match &self.nodes[id.0] {
            Node::Atomic {
                state: GateState::Pulled,
                ..
            } => self.set_state(id, GateState::Done),
            _ => panic!("Node {} was not pulled", id.0),
        }
    }
}

impl<S: ProtocolSuite> Default for ProtocolGraph<S> {
    fn default() -> Self {
        Self::new()
    }
}
