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

//! Worker thread pool draining the task queue (4.F).
//!
//! A task is any value implementing [`Task`]; [`Task::from_fn`] adapts a
//! plain closure. Workers block on a condition variable only when the
//! queue is observed empty; a short wait timeout guards against a missed
//! wakeup racing between the lock-free queue and the condvar's mutex.

use crate::queue::Queue;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

pub trait Task: Send {
    fn run(self: Box<Self>);
    fn description(&self) -> String;
}

struct ClosureTask<F> {
    f: F,
    desc: String,
}

impl<F: FnOnce() + Send> Task for ClosureTask<F> {
    fn run(self: Box<Self>) {
        (self.f)()
    }

    fn description(&self) -> String {
        self.desc.clone()
    }
}

/// Wraps a closure as a [`Task`] with the given diagnostic description.
pub fn from_fn<F: FnOnce() + Send + 'static>(desc: impl Into<String>, f: F) -> Box<dyn Task> {
    Box::new(ClosureTask { f, desc: desc.into() })
}

struct Inner {
    queue: Queue<Box<dyn Task>>,
    /// Tasks enqueued but not yet finished running: incremented once per
    /// task at `submit`, before it becomes visible in the queue, and
    /// decremented only after `task.run()` returns. A single counter so
    /// quiescence can't be observed between "dequeued" and "run".
    outstanding: AtomicUsize,
    quit: AtomicBool,
    gate: Mutex<()>,
    not_empty: Condvar,
    all_done: Condvar,
}

impl Inner {
    fn worker_loop(self: &Arc<Self>) {
        loop {
            match self.queue.try_pop() {
                Some(task) => {
                    task.run();
                    if self.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
                        let _guard = self.gate.lock().unwrap();
                        self.all_done.notify_all();
                    }
                }
                None => {
                    if self.quit.load(Ordering::Acquire) {
                        break;
                    }
                    let guard = self.gate.lock().unwrap();
                    if self.queue.empty() && !self.quit.load(Ordering::Acquire) {
                        let _ = self
                            .not_empty
                            .wait_timeout(guard, Duration::from_millis(20))
                            .unwrap();
                    }
                }
            }
        }
    }
}

/// A fixed-size worker pool. Default size is `available_parallelism()`,
/// per 4.F.
pub struct ThreadPool {
    inner: Arc<Inner>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    pub fn new(workers: usize) -> Self {
        Self::with_capacity(workers, 4096)
    }

    pub fn with_capacity(worker_count: usize, queue_capacity: usize) -> Self {
        let worker_count = worker_count.max(1);
        let inner = Arc::new(Inner {
            queue: Queue::with_capacity(queue_capacity),
            outstanding: AtomicUsize::new(0),
            quit: AtomicBool::new(false),
            gate: Mutex::new(()),
            not_empty: Condvar::new(),
            all_done: Condvar::new(),
        });
        let workers = (0..worker_count)
            .map(|_| {
                let inner = inner.clone();
                std::thread::spawn(move || inner.worker_loop())
            })
            .collect();
        ThreadPool { inner, workers }
    }

    pub fn default_sized() -> Self {
        let n = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        ThreadPool::new(n)
    }

    /// Enqueues every task in `tasks`. A submission after [`shutdown`]
    /// logs a warning and drops the tasks, per 4.F's no-op-past-shutdown
    /// contract.
    ///
    /// [`shutdown`]: ThreadPool::shutdown
    pub fn submit(&self, tasks: Vec<Box<dyn Task>>) {
        if self.inner.quit.load(Ordering::Acquire) {
            log::warn!("submission of {} task(s) after shutdown ignored", tasks.len());
            return;
        }
        self.inner.outstanding.fetch_add(tasks.len(), Ordering::SeqCst);
        for mut task in tasks {
            loop {
                match self.inner.queue.try_enqueue(task) {
                    Ok(()) => break,
                    Err(back) => {
                        task = back;
                        std::thread::yield_now();
                    }
                }
            }
        }
        let _guard = self.inner.gate.lock().unwrap();
        self.inner.not_empty.notify_all();
    }

    /// Blocks until every submitted task has finished running.
    pub fn wait_all_done(&self) {
        let mut guard = self.inner.gate.lock().unwrap();
        while self.inner.outstanding.load(Ordering::SeqCst) != 0 {
            guard = self
                .inner
                .all_done
                .wait_timeout(guard, Duration::from_millis(20))
                .unwrap()
                .0;
        }
    }

    /// Sets the quit flag, wakes every worker, and joins them. Any tasks
    /// still queued are drained and run to completion first.
    pub fn shutdown(mut self) {
        self.wait_all_done();
        self.inner.quit.store(true, Ordering::Release);
        {
            let _guard = self.inner.gate.lock().unwrap();
            self.inner.not_empty.notify_all();
        }
        for w in self.workers.drain(..) {
            let _ = w.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize as AU;

    #[test]
    fn runs_every_submitted_task_exactly_once() {
        let pool = ThreadPool::new(4);
        let counter = Arc::new(AU::new(0));
        let tasks = (0..500)
            .map(|_| {
                let counter = counter.clone();
                from_fn("increment", move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();
        pool.submit(tasks);
        pool.wait_all_done();
        assert_eq!(counter.load(Ordering::SeqCst), 500);
        pool.shutdown();
    }

    #[test]
    fn submission_after_shutdown_is_a_no_op() {
        let inner = Arc::new(Inner {
            queue: Queue::with_capacity(16),
            outstanding: AtomicUsize::new(0),
            quit: AtomicBool::new(true),
            gate: Mutex::new(()),
            not_empty: Condvar::new(),
            all_done: Condvar::new(),
        });
        let pool = ThreadPool {
            inner: inner.clone(),
            workers: Vec::new(),
        };
        pool.submit(vec![from_fn("noop", || {})]);
        assert!(inner.queue.empty());
    }

    #[test]
    fn wait_all_done_does_not_return_while_a_chained_task_is_still_running() {
        // A single worker, and a task that submits its own successor before
        // finishing: `wait_all_done` must not observe quiescence between the
        // successor being dequeued and it actually completing.
        fn chain(inner: Arc<Inner>, counter: Arc<AU>, remaining: usize) {
            if remaining == 0 {
                return;
            }
            let next_inner = inner.clone();
            let next_counter = counter.clone();
            let scratch = ThreadPool { inner, workers: Vec::new() };
            scratch.submit(vec![from_fn("chain", move || {
                next_counter.fetch_add(1, Ordering::SeqCst);
                chain(next_inner, next_counter.clone(), remaining - 1);
            })]);
        }

        let pool = ThreadPool::new(1);
        let counter = Arc::new(AU::new(0));
        chain(pool.inner.clone(), counter.clone(), 200);
        pool.wait_all_done();
        assert_eq!(counter.load(Ordering::SeqCst), 200);
        pool.shutdown();
    }
}
