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

//! bigflow: multi-precision integer arithmetic over a lazily-scheduled
//! computation graph, backed by a sharded slab allocator and a
//! lock-free work-stealing-free thread pool.
//!
//! [`Context`] is the entry point: it owns a DAG of [`bigint::Integer`]
//! nodes, and [`Context::evaluate`] fans work out across a [`Runtime`].

pub mod alloc;
pub mod bigint;
pub mod config;
pub mod context;
pub mod dag;
pub mod diagnostics;
pub mod error;
pub mod kernels;
pub mod logging;
pub mod queue;
pub mod runtime;
pub mod termination;
pub mod threadpool;

pub use bigint::Base;
pub use config::Config;
pub use context::{Context, Handle};
pub use error::{Error, Result};
pub use runtime::Runtime;
