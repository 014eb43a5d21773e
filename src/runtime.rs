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

//! The execution substrate's shared, explicit handle (5, design notes).
//!
//! The source treats the memory pool, thread pool, log sink, and
//! termination registry as process-wide singletons. Per the design
//! notes, this crate threads the pool and thread pool through an
//! explicit `Runtime` object instead; only the log sink and termination
//! registry remain process-global, where that really is required. A
//! single `Runtime` can back several [`Context`](crate::context::Context)s
//! that should share allocator and worker capacity.

use crate::alloc::{default_allocator, Pool};
use crate::config::Config;
use crate::threadpool::ThreadPool;
use std::sync::Arc;

pub struct Runtime {
    pub pool: Arc<Pool>,
    pub executor: Arc<ThreadPool>,
    pub config: Arc<Config>,
}

impl Runtime {
    pub fn new(config: Config) -> Arc<Self> {
        let config = Arc::new(config);
        let pool = Arc::new(Pool::from_config(default_allocator(), &config));
        let executor = Arc::new(ThreadPool::default_sized());
        Arc::new(Runtime {
            pool,
            executor,
            config,
        })
    }

    pub fn with_config_file(path: impl AsRef<std::path::Path>) -> crate::error::Result<Arc<Self>> {
        Ok(Self::new(Config::from_toml_file(path)?))
    }
}

impl Default for Runtime {
    fn default() -> Self {
        // `Arc::new` wrapping happens in `new`; `Default` is provided for
        // callers that just want `Runtime::default()` without the `Arc`
        // and are willing to wrap it themselves.
        let config = Arc::new(Config::empty());
        let pool = Arc::new(Pool::from_config(default_allocator(), &config));
        let executor = Arc::new(ThreadPool::default_sized());
        Runtime {
            pool,
            executor,
            config,
        }
    }
}
