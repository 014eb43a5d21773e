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

//! Context & handles (4.J): the owning arena of nodes, the handle
//! registry, topological sort, procedure generation, and the evaluation
//! driver.

use crate::bigint::{signed_add, Base, Integer};
use crate::config::Config;
use crate::dag::{topological_sort, NodeId, NodeKind, NodeRecord};
use crate::diagnostics;
use crate::error::{Context as ErrContext, Error, Result};
use crate::runtime::Runtime;
use crate::threadpool;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

struct HandleRegistry {
    next_id: AtomicU64,
    live: Mutex<HashMap<u64, NodeId>>,
}

/// The owning arena: fixed `(limb_len, base)`, the insertion-ordered node
/// list, and the handle registry. Shared via `Arc` so worker-thread tasks
/// can reach predecessor/successor nodes and re-submit ready units.
pub struct ContextInner {
    base: Base,
    limb_len: usize,
    runtime: Arc<Runtime>,
    nodes: Mutex<Vec<NodeRecord>>,
    handles: HandleRegistry,
    generated: AtomicUsize,
}

/// A context owns all integers constructed within it; it freezes their
/// shared `(precision, base)` at construction.
pub struct Context {
    inner: Arc<ContextInner>,
}

/// A user-visible reference to one DAG node. Cloning a handle registers a
/// second entry in the context's handle registry and shares the node;
/// dropping a handle only unlinks it from that registry, never from the
/// node graph itself.
pub struct Handle {
    inner: Arc<ContextInner>,
    node: NodeId,
    id: u64,
}

fn ceil_log2(mut n: usize) -> u32 {
    if n <= 1 {
        return 0;
    }
    n -= 1;
    (usize::BITS - n.leading_zeros()).max(1)
}

impl Context {
    /// `log_len = ceil_log2(ceil(precision_digits / log_store_base(base)))`.
    /// Builds a private [`Runtime`] for this context alone; use
    /// [`Context::with_runtime`] to share a pool and thread pool across
    /// several contexts.
    pub fn new(precision_digits: usize, base: Base) -> Self {
        Self::with_runtime(Runtime::new(Config::empty()), precision_digits, base)
    }

    pub fn with_config(precision_digits: usize, base: Base, config: Config) -> Self {
        Self::with_runtime(Runtime::new(config), precision_digits, base)
    }

    pub fn with_runtime(runtime: Arc<Runtime>, precision_digits: usize, base: Base) -> Self {
        let digits_per_limb = base.log_store_base() as usize;
        let limb_count = precision_digits.div_ceil(digits_per_limb).max(1);
        let log_len = ceil_log2(limb_count);
        let inner = Arc::new(ContextInner {
            base,
            limb_len: 1usize << log_len,
            runtime,
            nodes: Mutex::new(Vec::new()),
            handles: HandleRegistry {
                next_id: AtomicU64::new(1),
                live: Mutex::new(HashMap::new()),
            },
            generated: AtomicUsize::new(0),
        });
        Context { inner }
    }

    fn new_integer(&self) -> Integer {
        let log_len = self.inner.limb_len.trailing_zeros();
        Integer::new(
            self.inner.runtime.pool.clone(),
            self.inner.base,
            log_len,
            &self.inner.runtime.config,
        )
    }

    fn register_handle(&self, node: NodeId) -> Handle {
        let id = self.inner.handles.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.handles.live.lock().unwrap().insert(id, node);
        Handle {
            inner: self.inner.clone(),
            node,
            id,
        }
    }

    /// Parses `literal` into a new constant node and returns a handle to it.
    pub fn make_integer(&self, literal: &str) -> Result<Handle> {
        let value = self.new_integer();
        value.parse(literal).ctx("context.rs", "make_integer")?;
        let record = NodeRecord::new(NodeKind::Constant, Arc::new(value));
        let mut nodes = self.inner.nodes.lock().unwrap();
        let id = nodes.len();
        nodes.push(record);
        drop(nodes);
        Ok(self.register_handle(id))
    }

    /// `a + b`. Both handles must belong to this context.
    pub fn add(&self, a: &Handle, b: &Handle) -> Result<Handle> {
        if !Arc::ptr_eq(&a.inner, &self.inner) || !Arc::ptr_eq(&b.inner, &self.inner) {
            return Err(Error::context("different contexts"));
        }
        let value = self.new_integer();
        let mut nodes = self.inner.nodes.lock().unwrap();
        let id = nodes.len();
        nodes.push(NodeRecord::new(
            NodeKind::BinaryAdd {
                lhs: a.node,
                rhs: b.node,
            },
            Arc::new(value),
        ));
        nodes[a.node].nexts.push(id);
        nodes[b.node].nexts.push(id);
        drop(nodes);
        Ok(self.register_handle(id))
    }

    /// Kahn's algorithm over the node list; fails with a DAG-construction
    /// error ("loop detected") if a cycle exists. On success, the node
    /// list is left unchanged (the order is returned, not written back);
    /// callers needing a concrete reordering should use the returned
    /// `Vec<NodeId>` directly.
    pub fn sort_nodes(&self) -> Result<Vec<NodeId>> {
        let nodes = self.inner.nodes.lock().unwrap();
        topological_sort(&nodes).ok_or_else(|| Error::dag_construction("loop detected in a DAG"))
    }

    /// Sorts the nodes, then "generates" each one's procedure in sorted
    /// order. In this system every node produces exactly one compute
    /// unit, already materialized at construction time (`NodeRecord`'s
    /// `remaining` counter); this step exists to validate acyclicity
    /// before [`evaluate`](Context::evaluate) runs, satisfying the
    /// precondition that every predecessor's procedure port exists by
    /// the time a later node is generated.
    pub fn generate_procedures(&self) -> Result<()> {
        let order = self.sort_nodes()?;
        self.inner.generated.store(order.len(), Ordering::Release);
        Ok(())
    }

    fn on_unit_done(inner: &Arc<ContextInner>, node_id: NodeId) {
        let nexts = {
            let nodes = inner.nodes.lock().unwrap();
            if nodes[node_id].forwarded.swap(true, Ordering::AcqRel) {
                return;
            }
            nodes[node_id].nexts.clone()
        };
        for succ in nexts {
            let remaining_now = {
                let nodes = inner.nodes.lock().unwrap();
                nodes[succ].remaining.fetch_sub(1, Ordering::AcqRel) - 1
            };
            if remaining_now == 0 {
                Self::submit_unit(inner, succ);
            }
        }
    }

    fn submit_unit(inner: &Arc<ContextInner>, node_id: NodeId) {
        let kind = {
            let nodes = inner.nodes.lock().unwrap();
            nodes[node_id].kind
        };
        match kind {
            NodeKind::Constant => {
                // Trivial unit: no task, fire its forward callbacks directly.
                Self::on_unit_done(inner, node_id);
            }
            NodeKind::BinaryAdd { lhs, rhs } => {
                let (a, b, target) = {
                    let nodes = inner.nodes.lock().unwrap();
                    (
                        nodes[lhs].value.clone(),
                        nodes[rhs].value.clone(),
                        nodes[node_id].value.clone(),
                    )
                };
                let ctx = inner.clone();
                inner.runtime.executor.submit(vec![threadpool::from_fn(
                    "signed_add",
                    move || {
                        if let Err(e) = signed_add(&a, &b, &target) {
                            log::warn!("compute unit for node {node_id} failed: {e}");
                        }
                        Context::on_unit_done(&ctx, node_id);
                    },
                )]);
            }
        }
    }

    /// Kicks every source constant node's unit, cascading dependency
    /// decrements through the DAG. Returns immediately; call
    /// [`wait`](Context::wait) to block for completion. Evaluation is
    /// batch and one-shot: a node forwards at most once.
    pub fn evaluate(&self) -> Result<()> {
        if self.inner.generated.load(Ordering::Acquire) == 0 {
            return Err(Error::dag_construction(
                "evaluate called before generate_procedures",
            ));
        }
        let constants: Vec<NodeId> = {
            let nodes = self.inner.nodes.lock().unwrap();
            nodes
                .iter()
                .enumerate()
                .filter(|(_, n)| matches!(n.kind, NodeKind::Constant))
                .map(|(i, _)| i)
                .collect()
        };
        for id in constants {
            Self::on_unit_done(&self.inner, id);
        }
        Ok(())
    }

    /// Blocks until the pool has drained and every in-flight unit has
    /// completed.
    pub fn wait(&self) {
        self.inner.runtime.executor.wait_all_done();
    }

    /// Reads the currently realized value of `handle` in this context's
    /// base.
    pub fn format(&self, handle: &Handle) -> Result<String> {
        let value = {
            let nodes = self.inner.nodes.lock().unwrap();
            nodes[handle.node].value.clone()
        };
        value.format()
    }

    /// Emits `dag.json` and `pro.json` describing the current node and
    /// unit state into `dir`.
    pub fn export_graph(&self, dir: impl AsRef<Path>) -> Result<()> {
        let nodes = self.inner.nodes.lock().unwrap();
        diagnostics::export(&nodes, dir.as_ref()).ctx("context.rs", "export_graph")
    }

    pub fn base(&self) -> Base {
        self.inner.base
    }

    pub fn limb_len(&self) -> usize {
        self.inner.limb_len
    }
}

impl Handle {
    pub fn node(&self) -> NodeId {
        self.node
    }
}

impl Clone for Handle {
    fn clone(&self) -> Self {
        let id = self.inner.handles.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.handles.live.lock().unwrap().insert(id, self.node);
        Handle {
            inner: self.inner.clone(),
            node: self.node,
            id,
        }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.inner.handles.live.lock().unwrap().remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fibonacci_in_hex() {
        let ctx = Context::new(7000, Base::Hex);
        let mut a = ctx.make_integer("0").unwrap();
        let mut b = ctx.make_integer("1").unwrap();
        for _ in 0..19_998 {
            let c = ctx.add(&a, &b).unwrap();
            a = b;
            b = c;
        }
        ctx.generate_procedures().unwrap();
        ctx.evaluate().unwrap();
        ctx.wait();
        let result = ctx.format(&b).unwrap();
        assert_eq!(result.len(), 4180);
    }

    #[test]
    fn signed_cancellation() {
        let ctx = Context::new(64, Base::Dec);
        let x = ctx.make_integer("12345678901234567890").unwrap();
        let y = ctx.make_integer("-12345678901234567890").unwrap();
        let sum = ctx.add(&x, &y).unwrap();
        ctx.generate_procedures().unwrap();
        ctx.evaluate().unwrap();
        ctx.wait();
        assert_eq!(ctx.format(&sum).unwrap(), "0");
    }

    #[test]
    fn sign_of_smaller_magnitude_loses() {
        let ctx = Context::new(32, Base::Dec);
        let a = ctx.make_integer("5").unwrap();
        let b = ctx.make_integer("-3").unwrap();
        let c = ctx.add(&a, &b).unwrap();
        ctx.generate_procedures().unwrap();
        ctx.evaluate().unwrap();
        ctx.wait();
        assert_eq!(ctx.format(&c).unwrap(), "2");

        let ctx2 = Context::new(32, Base::Dec);
        let a2 = ctx2.make_integer("-5").unwrap();
        let b2 = ctx2.make_integer("3").unwrap();
        let c2 = ctx2.add(&a2, &b2).unwrap();
        ctx2.generate_procedures().unwrap();
        ctx2.evaluate().unwrap();
        ctx2.wait();
        assert_eq!(ctx2.format(&c2).unwrap(), "-2");
    }

    #[test]
    fn cross_context_add_is_rejected() {
        let c1 = Context::new(32, Base::Dec);
        let c2 = Context::new(32, Base::Dec);
        let a = c1.make_integer("1").unwrap();
        let b = c2.make_integer("1").unwrap();
        assert!(c1.add(&a, &b).is_err());
    }

    #[test]
    fn handle_clone_shares_the_node() {
        let ctx = Context::new(32, Base::Dec);
        let a = ctx.make_integer("42").unwrap();
        let a2 = a.clone();
        assert_eq!(a.node(), a2.node());
        drop(a2);
        ctx.generate_procedures().unwrap();
        ctx.evaluate().unwrap();
        ctx.wait();
        assert_eq!(ctx.format(&a).unwrap(), "42");
    }
}
