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

//! Structured-notation diagnostic export (4.J, 6): `dag.json` describes
//! node and edge groups; `pro.json` is a flat list of compute units. Both
//! are plain `serde_json::Value` trees, the nearest idiomatic analogue of
//! the source's `stn::*` structured-notation emitter.

use crate::dag::{NodeKind, NodeRecord, UnitState};
use crate::error::{Error, Result};
use serde_json::json;
use std::path::Path;

fn node_kind_name(kind: &NodeKind) -> &'static str {
    match kind {
        NodeKind::Constant => "constant",
        NodeKind::BinaryAdd { .. } => "binary_add",
    }
}

fn forward_signal(node: &NodeRecord) -> &'static str {
    match node.nexts.len() {
        0 => "NO_FORWARDS",
        1 => "SERIALIZE_SIGNAL",
        _ => "DEFAULT_SIGNAL",
    }
}

fn state_name(state: UnitState) -> &'static str {
    match state {
        UnitState::Pending => "Pending",
        UnitState::Ready => "Ready",
        UnitState::Done => "Done",
    }
}

fn build_dag_json(nodes: &[NodeRecord]) -> serde_json::Value {
    let dag_nodes: Vec<_> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| {
            json!({
                "index": i,
                "kind": node_kind_name(&n.kind),
                "predecessors": n.kind.predecessors(),
            })
        })
        .collect();

    let node_to_node_edges: Vec<_> = nodes
        .iter()
        .enumerate()
        .flat_map(|(i, n)| n.nexts.iter().map(move |&succ| json!({"from": i, "to": succ})))
        .collect();

    let node_to_data_edges: Vec<_> = (0..nodes.len())
        .map(|i| json!({"node": i, "data": format!("node-{i}-limbs")}))
        .collect();

    json!({
        "nodes_groups": {
            "dag_nodes": {
                "node_list": dag_nodes,
                "display_configs": {"shape": "box"},
                "label_configs": {"field": "kind"},
            },
            "datas": {
                "node_list": (0..nodes.len()).map(|i| json!({"index": i})).collect::<Vec<_>>(),
                "display_configs": {"shape": "ellipse"},
                "label_configs": {"field": "index"},
            },
        },
        "edges_groups": {
            "nodes_nodes": {
                "edge_list": node_to_node_edges,
                "display_configs": {"style": "solid"},
            },
            "nodes_datas": {
                "edge_list": node_to_data_edges,
                "display_configs": {"style": "dashed"},
            },
        },
    })
}

fn build_pro_json(nodes: &[NodeRecord]) -> serde_json::Value {
    let units: Vec<_> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| {
            json!({
                "name": format!("unit-{i}"),
                "index": i,
                "type": node_kind_name(&n.kind),
                "dependency_type": "mono",
                "forward_signal": forward_signal(n),
                "state": state_name(n.state()),
                "task": match &n.kind {
                    NodeKind::Constant => "trivial unit, no task".to_string(),
                    NodeKind::BinaryAdd { lhs, rhs } => format!("signed_add(node {lhs}, node {rhs})"),
                },
            })
        })
        .collect();
    json!({ "compute_units": units })
}

/// Writes `dag.json` and `pro.json` into `dir`, creating it if absent.
pub fn export(nodes: &[NodeRecord], dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| Error::io(format!("{}: {e}", dir.display())))?;
    let dag = build_dag_json(nodes);
    let pro = build_pro_json(nodes);
    std::fs::write(
        dir.join("dag.json"),
        serde_json::to_string_pretty(&dag).expect("json serialization of owned values cannot fail"),
    )
    .map_err(|e| Error::io(format!("dag.json: {e}")))?;
    std::fs::write(
        dir.join("pro.json"),
        serde_json::to_string_pretty(&pro).expect("json serialization of owned values cannot fail"),
    )
    .map_err(|e| Error::io(format!("pro.json: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::{default_allocator, Pool};
    use crate::bigint::{Base, Integer};
    use crate::config::Config;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn exports_both_files() {
        let pool = Arc::new(Pool::new(default_allocator(), 1));
        let value = Arc::new(Integer::new(pool, Base::Dec, 2, &Config::empty()));
        let nodes = vec![NodeRecord::new(NodeKind::Constant, value)];
        let dir = tempdir().unwrap();
        export(&nodes, dir.path()).unwrap();
        assert!(dir.path().join("dag.json").exists());
        assert!(dir.path().join("pro.json").exists());
    }
}
