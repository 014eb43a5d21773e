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

//! Kernel and DAG-throughput benchmarks (criterion).

use bigflow::kernels;
use bigflow::{Base, Context};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

const BASE: u64 = 10u64.pow(8);

fn bench_add_with_carry(c: &mut Criterion) {
    let a: Vec<u64> = (0..64).map(|i| (i * 7) % BASE).collect();
    let b: Vec<u64> = (0..64).map(|i| (i * 13) % BASE).collect();
    let mut out = vec![0u64; 64];
    c.bench_function("add_with_carry/64limbs", |bencher| {
        bencher.iter(|| kernels::add_with_carry(black_box(&a), black_box(&b), &mut out, BASE))
    });
}

fn bench_sub_a_ge_b(c: &mut Criterion) {
    let a: Vec<u64> = (0..64).map(|i| BASE - 1 - (i % BASE)).collect();
    let b: Vec<u64> = (0..64).map(|i| i % (BASE / 2)).collect();
    let mut out = vec![0u64; 64];
    c.bench_function("sub_a_ge_b/64limbs", |bencher| {
        bencher.iter(|| kernels::sub_a_ge_b(black_box(&a), black_box(&b), &mut out, BASE))
    });
}

fn bench_mul_2len(c: &mut Criterion) {
    let a: Vec<u64> = (0..32).map(|i| (i * 7) % BASE).collect();
    let b: Vec<u64> = (0..32).map(|i| (i * 13) % BASE).collect();
    let mut out = vec![0u64; 64];
    c.bench_function("mul_2len/32limbs", |bencher| {
        bencher.iter(|| kernels::mul_2len(black_box(&a), black_box(&b), &mut out, BASE))
    });
}

fn bench_dag_fan_in(c: &mut Criterion) {
    c.bench_function("dag_fan_in/2000_additions", |bencher| {
        bencher.iter(|| {
            let ctx = Context::new(64, Base::Dec);
            let mut acc = ctx.make_integer("1").unwrap();
            for _ in 0..2000 {
                let next = ctx.make_integer("1").unwrap();
                acc = ctx.add(&acc, &next).unwrap();
            }
            ctx.generate_procedures().unwrap();
            ctx.evaluate().unwrap();
            ctx.wait();
            black_box(ctx.format(&acc).unwrap())
        })
    });
}

criterion_group!(
    benches,
    bench_add_with_carry,
    bench_sub_a_ge_b,
    bench_mul_2len,
    bench_dag_fan_in
);
criterion_main!(benches);
