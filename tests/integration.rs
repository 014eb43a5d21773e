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

//! Black-box integration tests, exercising only the public `Context`/`Handle`
//! API: a wide Fibonacci-style fan of additions, sign handling across bases,
//! a shared `Runtime` backing several contexts, and graph diagnostics export.

use bigflow::{Base, Context, Runtime};
use tempfile::tempdir;

#[test]
fn wide_fan_in_addition_across_bases() {
    for base in [Base::Oct, Base::Dec, Base::Hex] {
        let ctx = Context::new(64, base);
        let literal = match base {
            Base::Oct => "17",
            Base::Dec => "19",
            Base::Hex => "1f",
        };
        let mut terms = Vec::new();
        for _ in 0..50 {
            terms.push(ctx.make_integer(literal).unwrap());
        }
        let mut acc = terms[0].clone();
        for t in &terms[1..] {
            acc = ctx.add(&acc, t).unwrap();
        }
        ctx.generate_procedures().unwrap();
        ctx.evaluate().unwrap();
        ctx.wait();
        let expected = match base {
            Base::Oct => 0o17u64 * 50,
            Base::Dec => 19u64 * 50,
            Base::Hex => 0x1fu64 * 50,
        };
        let expected_str = match base {
            Base::Oct => format!("{expected:o}"),
            Base::Dec => format!("{expected}"),
            Base::Hex => format!("{expected:x}"),
        };
        assert_eq!(ctx.format(&acc).unwrap(), expected_str);
    }
}

#[test]
fn two_contexts_share_one_runtime() {
    let runtime = Runtime::new(Default::default());
    let a = Context::with_runtime(runtime.clone(), 32, Base::Dec);
    let b = Context::with_runtime(runtime, 32, Base::Dec);

    let x = a.make_integer("100").unwrap();
    let y = a.make_integer("23").unwrap();
    let sum_a = a.add(&x, &y).unwrap();
    a.generate_procedures().unwrap();
    a.evaluate().unwrap();
    a.wait();
    assert_eq!(a.format(&sum_a).unwrap(), "123");

    let p = b.make_integer("-5").unwrap();
    let q = b.make_integer("5").unwrap();
    let sum_b = b.add(&p, &q).unwrap();
    b.generate_procedures().unwrap();
    b.evaluate().unwrap();
    b.wait();
    assert_eq!(b.format(&sum_b).unwrap(), "0");
}

#[test]
fn evaluate_without_generate_procedures_is_rejected() {
    let ctx = Context::new(32, Base::Dec);
    let a = ctx.make_integer("1").unwrap();
    let b = ctx.make_integer("2").unwrap();
    let _ = ctx.add(&a, &b).unwrap();
    assert!(ctx.evaluate().is_err());
}

#[test]
fn unrealized_handle_fails_to_format() {
    let ctx = Context::new(32, Base::Dec);
    let a = ctx.make_integer("1").unwrap();
    let b = ctx.make_integer("2").unwrap();
    let sum = ctx.add(&a, &b).unwrap();
    // Never generated/evaluated: the sum node's limb vector was never allocated.
    assert!(ctx.format(&sum).is_err());
}

#[test]
fn exports_diagnostics_after_evaluation() {
    let ctx = Context::new(32, Base::Dec);
    let a = ctx.make_integer("4").unwrap();
    let b = ctx.make_integer("5").unwrap();
    let c = ctx.add(&a, &b).unwrap();
    ctx.generate_procedures().unwrap();
    ctx.evaluate().unwrap();
    ctx.wait();
    assert_eq!(ctx.format(&c).unwrap(), "9");

    let dir = tempdir().unwrap();
    ctx.export_graph(dir.path()).unwrap();
    let dag = std::fs::read_to_string(dir.path().join("dag.json")).unwrap();
    let pro = std::fs::read_to_string(dir.path().join("pro.json")).unwrap();
    assert!(dag.contains("nodes_groups"));
    assert!(pro.contains("compute_units"));
}
