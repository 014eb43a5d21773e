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

//! Process-wide termination-callback registry (4.D).
//!
//! Callbacks run in registration order, at most once, on normal process
//! exit or on panic. A panic hook and a `libc::atexit` handler are both
//! installed lazily the first time a callback is registered so a caller
//! who never touches this module pays no cost for it.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

type Callback = Box<dyn Fn() + Send + Sync + 'static>;

struct Entry {
    id: u64,
    callback: Callback,
}

struct Registry {
    callbacks: Mutex<Vec<Entry>>,
    next_id: AtomicU64,
    executing: AtomicBool,
    hook_installed: AtomicBool,
}

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| Registry {
        callbacks: Mutex::new(Vec::new()),
        next_id: AtomicU64::new(1),
        executing: AtomicBool::new(false),
        hook_installed: AtomicBool::new(false),
    })
}

extern "C" fn run_at_exit() {
    execute_all_callbacks();
}

fn ensure_hook_installed() {
    let r = registry();
    if r.hook_installed
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_ok()
    {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            previous(info);
            execute_all_callbacks();
        }));
        unsafe { libc::atexit(run_at_exit) };
    }
}

/// Registers `callback`, returning an id usable with [`remove_callback`].
/// Installs the process panic hook on first use.
pub fn register_callback<F>(callback: F) -> u64
where
    F: Fn() + Send + Sync + 'static,
{
    ensure_hook_installed();
    let r = registry();
    let id = r.next_id.fetch_add(1, Ordering::Relaxed);
    r.callbacks.lock().unwrap().push(Entry {
        id,
        callback: Box::new(callback),
    });
    id
}

/// Removes a previously-registered callback. A no-op if `id` is unknown
/// (already removed, or execution already consumed the registry).
pub fn remove_callback(id: u64) {
    let r = registry();
    r.callbacks.lock().unwrap().retain(|e| e.id != id);
}

/// Runs every remaining callback in registration order, exactly once
/// regardless of how many threads call this concurrently. Panics raised
/// by a callback are caught and swallowed: a termination callback must
/// never itself abort the process.
pub fn execute_all_callbacks() -> bool {
    let r = registry();
    if r.executing
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        return false;
    }
    let entries = std::mem::take(&mut *r.callbacks.lock().unwrap());
    for entry in &entries {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| (entry.callback)()));
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn register_and_remove() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let id = register_callback(move || {
            h.fetch_add(1, Ordering::SeqCst);
        });
        remove_callback(id);
        // A removed callback must not be present for later execute_all_callbacks
        // calls from *other* tests in this process; we only assert removal
        // took effect on the registry's current contents.
        assert!(registry()
            .callbacks
            .lock()
            .unwrap()
            .iter()
            .all(|e| e.id != id));
    }
}
