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

//! Asynchronous, severity-filtered log sink (4.E).
//!
//! Implements [`log::Log`] so ordinary `log::info!`/`log::warn!` call
//! sites throughout the crate reach it through the standard facade.
//! Producers enqueue onto a bounded lock-free queue (4.C); a single
//! flushing thread (whichever caller wins the CAS) drains it to a file.

use crate::queue::Queue;
use crate::termination;
use log::{Level, Metadata, Record};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

struct Entry {
    level: Level,
    message: String,
    timestamp_millis: u128,
    thread_hash: u64,
}

/// A buffered, single-consumer log sink. Construct one with [`Logger::new`]
/// and install it process-wide with [`Logger::install`].
pub struct Logger {
    queue: Queue<Entry>,
    threshold: Level,
    path: PathBuf,
    flushing: AtomicBool,
}

fn thread_hash() -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    std::thread::current().id().hash(&mut hasher);
    hasher.finish()
}

impl Logger {
    pub fn new(path: impl Into<PathBuf>, threshold: Level, capacity: usize) -> Self {
        Logger {
            queue: Queue::with_capacity(capacity.max(1)),
            threshold,
            path: path.into(),
            flushing: AtomicBool::new(false),
        }
    }

    /// Installs `self` as the process-wide `log` facade sink and
    /// registers its flush with the termination-callback registry (4.D)
    /// so buffered messages are not lost on abnormal exit.
    pub fn install(self) -> Result<&'static Logger, log::SetLoggerError> {
        let boxed: &'static Logger = Box::leak(Box::new(self));
        log::set_max_level(boxed.threshold.to_level_filter());
        log::set_logger(boxed)?;
        termination::register_callback(move || {
            boxed.flush();
        });
        Ok(boxed)
    }

    fn add(&self, level: Level, message: String) {
        let entry = Entry {
            level,
            message,
            timestamp_millis: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or(0),
            thread_hash: thread_hash(),
        };
        if let Err(entry) = self.queue.try_enqueue(entry) {
            // Queue full: drive a flush ourselves, then retry once. A
            // second failure drops the message rather than blocking the
            // caller indefinitely.
            self.flush();
            let _ = self.queue.try_enqueue(entry);
        }
    }

    /// Drains the queue to the configured file. Uses a CAS flag as a
    /// single-consumer mutex: if another thread is already flushing, this
    /// call yields immediately rather than blocking.
    pub fn flush(&self) {
        if self
            .flushing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        struct ReleaseGuard<'a>(&'a AtomicBool);
        impl Drop for ReleaseGuard<'_> {
            fn drop(&mut self) {
                self.0.store(false, Ordering::Release);
            }
        }
        let _guard = ReleaseGuard(&self.flushing);

        let file = OpenOptions::new().create(true).append(true).open(&self.path);
        let mut file = match file {
            Ok(f) => Some(f),
            Err(e) => {
                eprintln!("bigflow: failed to open log file {}: {e}", self.path.display());
                None
            }
        };
        while let Some(entry) = self.queue.try_pop() {
            if entry.level > self.threshold {
                continue;
            }
            if let Some(f) = file.as_mut() {
                let _ = writeln!(
                    f,
                    "[{}][{}][thread {:x}] {}",
                    entry.timestamp_millis, entry.level, entry.thread_hash, entry.message
                );
            }
        }
    }
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.threshold
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.add(record.level(), format!("{}", record.args()));
    }

    fn flush(&self) {
        Logger::flush(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn filters_below_threshold() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.txt");
        let logger = Logger::new(&path, Level::Warn, 16);
        logger.add(Level::Info, "suppressed".into());
        logger.add(Level::Error, "kept".into());
        logger.flush();
        let contents = std::fs::read_to_string(&path).unwrap_or_default();
        assert!(!contents.contains("suppressed"));
        assert!(contents.contains("kept"));
    }
}
