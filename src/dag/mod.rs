//   Copyright (c) 2024-2026 Anton Kundenko <singaraiona@gmail.com>
//   All rights reserved.
//
//   Permission is hereby granted, free of charge, to any person obtaining a copy
//   of this software and associated documentation files (the "Software"), to deal
//   in the Software without restriction, including without limitation the rights
//   to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
//   copies of the Software, and to permit persons to whom the Software is
//   furnished to do so, subject to the following conditions:
//
//   The above copyright notice and this permission notice shall be included in all
//   copies or substantial portions of the Software.
//
//   THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
//   IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
//   FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
//   AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
//   LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
//   OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
//   SOFTWARE.

//! DAG nodes and compute units (4.I).
//!
//! A node is stored in the context's arena and referenced by [`NodeId`]
//! (an index), never by pointer — this is the arena representation
//! called for by the source's own design notes, and it sidesteps
//! reference-count cycles entirely.

use crate::bigint::Integer;
use std::sync::atomic::{AtomicBool, AtomicUsize};
use std::sync::Arc;

pub type NodeId = usize;

/// The tagged node-kind variants. A method table in place of the
/// constant/binary-op class hierarchy and its `dynamic_cast` dispatch.
#[derive(Debug, Clone, Copy)]
pub enum NodeKind {
    /// Carries a limb vector produced by parsing; a trivial unit with no
    /// task, acting purely as a forward source.
    Constant,
    /// References two predecessor nodes; its limb vector is allocated
    /// lazily when its task runs.
    BinaryAdd { lhs: NodeId, rhs: NodeId },
}

impl NodeKind {
    pub fn predecessor_count(&self) -> usize {
        match self {
            NodeKind::Constant => 0,
            NodeKind::BinaryAdd { .. } => 2,
        }
    }

    pub fn predecessors(&self) -> Vec<NodeId> {
        match *self {
            NodeKind::Constant => Vec::new(),
            NodeKind::BinaryAdd { lhs, rhs } => vec![lhs, rhs],
        }
    }
}

/// Best-effort state-machine view of a node's compute unit, for
/// diagnostics only; `Running` is not durably tracked since a unit's task
/// body executes synchronously within one worker-thread closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    Pending,
    Ready,
    Done,
}

/// One DAG vertex: its kind, its own limb vector, its successor list
/// (`nexts`, used for topological sort), and the scheduling state of its
/// single compute unit (every node kind here produces exactly one mono
/// unit; a future node kind with multiple internal tasks would use a
/// latch instead of this single counter).
pub struct NodeRecord {
    pub kind: NodeKind,
    pub value: Arc<Integer>,
    pub nexts: Vec<NodeId>,
    pub(crate) remaining: AtomicUsize,
    pub(crate) forwarded: AtomicBool,
}

impl NodeRecord {
    pub fn new(kind: NodeKind, value: Arc<Integer>) -> Self {
        NodeRecord {
            remaining: AtomicUsize::new(kind.predecessor_count()),
            forwarded: AtomicBool::new(false),
            kind,
            value,
            nexts: Vec::new(),
        }
    }

    pub fn state(&self) -> UnitState {
        use std::sync::atomic::Ordering;
        if self.forwarded.load(Ordering::Acquire) {
            UnitState::Done
        } else if self.remaining.load(Ordering::Acquire) == 0 {
            UnitState::Ready
        } else {
            UnitState::Pending
        }
    }
}

/// Kahn's-algorithm topological sort over a node arena's `nexts` edges.
/// Returns `None` if the arena is not acyclic.
pub fn topological_sort(nodes: &[NodeRecord]) -> Option<Vec<NodeId>> {
    let mut in_degree = vec![0usize; nodes.len()];
    for node in nodes {
        for &succ in &node.nexts {
            in_degree[succ] += 1;
        }
    }
    let mut queue: std::collections::VecDeque<NodeId> = (0..nodes.len())
        .filter(|&i| in_degree[i] == 0)
        .collect();
    let mut order = Vec::with_capacity(nodes.len());
    while let Some(id) = queue.pop_front() {
        order.push(id);
        for &succ in &nodes[id].nexts {
            in_degree[succ] -= 1;
            if in_degree[succ] == 0 {
                queue.push_back(succ);
            }
        }
    }
    if order.len() == nodes.len() {
        Some(order)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::{default_allocator, Pool};
    use crate::config::Config;
    use std::sync::Arc as StdArc;

    fn leaf() -> NodeRecord {
        let pool = StdArc::new(Pool::new(default_allocator(), 1));
        NodeRecord::new(
            NodeKind::Constant,
            StdArc::new(Integer::new(pool, crate::bigint::Base::Dec, 2, &Config::empty())),
        )
    }

    #[test]
    fn sorts_a_diamond() {
        let mut nodes = vec![leaf(), leaf(), leaf(), leaf()];
        nodes[0].nexts = vec![1, 2];
        nodes[1].nexts = vec![3];
        nodes[2].nexts = vec![3];
        let order = topological_sort(&nodes).unwrap();
        let pos = |id: NodeId| order.iter().position(|&x| x == id).unwrap();
        assert!(pos(0) < pos(1));
        assert!(pos(0) < pos(2));
        assert!(pos(1) < pos(3));
        assert!(pos(2) < pos(3));
    }

    #[test]
    fn rejects_a_cycle() {
        let mut nodes = vec![leaf(), leaf(), leaf()];
        nodes[0].nexts = vec![1];
        nodes[1].nexts = vec![2];
        nodes[2].nexts = vec![0]; // synthetic back-edge for testing
        assert!(topological_sort(&nodes).is_none());
    }
}
