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

//! Fixed-capacity lock-free multi-producer/multi-consumer queue (4.C).
//!
//! A ring buffer where each slot carries its own sequence number instead
//! of a simple boolean ready flag; the sequence generalizes the "toggle on
//! each lap" flag the design calls for to an arbitrary number of laps,
//! which is what lets `try_enqueue`/`try_pop` detect full/empty without a
//! separate count.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

struct Slot<T> {
    sequence: AtomicUsize,
    data: UnsafeCell<MaybeUninit<T>>,
}

/// A bounded MPMC queue. Never resizes; `capacity` is fixed at
/// construction, matching 4.C exactly.
pub struct Queue<T> {
    buffer: Box<[Slot<T>]>,
    capacity: usize,
    enqueue_pos: AtomicUsize,
    dequeue_pos: AtomicUsize,
}

unsafe impl<T: Send> Send for Queue<T> {}
unsafe impl<T: Send> Sync for Queue<T> {}

impl<T> Queue<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be nonzero");
        let buffer = (0..capacity)
            .map(|i| Slot {
                sequence: AtomicUsize::new(i),
                data: UnsafeCell::new(MaybeUninit::uninit()),
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Queue {
            buffer,
            capacity,
            enqueue_pos: AtomicUsize::new(0),
            dequeue_pos: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Attempts to reserve a tail slot and write `value` into it. Returns
    /// `value` back on failure (queue full) so the caller can drive a
    /// flush and retry, mirroring how the log sink's `add()` behaves.
    pub fn try_enqueue(&self, value: T) -> Result<(), T> {
        let mut pos = self.enqueue_pos.load(Ordering::Relaxed);
        loop {
            let slot = &self.buffer[pos % self.capacity];
            let seq = slot.sequence.load(Ordering::Acquire);
            let diff = seq as isize - pos as isize;
            if diff == 0 {
                match self.enqueue_pos.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        unsafe {
                            (*slot.data.get()).write(value);
                        }
                        slot.sequence.store(pos.wrapping_add(1), Ordering::Release);
                        return Ok(());
                    }
                    Err(cur) => pos = cur,
                }
            } else if diff < 0 {
                return Err(value);
            } else {
                pos = self.enqueue_pos.load(Ordering::Relaxed);
            }
        }
    }

    /// Attempts to reserve a head slot and read its value out.
    pub fn try_pop(&self) -> Option<T> {
        let mut pos = self.dequeue_pos.load(Ordering::Relaxed);
        loop {
            let slot = &self.buffer[pos % self.capacity];
            let seq = slot.sequence.load(Ordering::Acquire);
            let diff = seq as isize - (pos.wrapping_add(1)) as isize;
            if diff == 0 {
                match self.dequeue_pos.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        let value = unsafe { (*slot.data.get()).assume_init_read() };
                        slot.sequence
                            .store(pos.wrapping_add(self.capacity), Ordering::Release);
                        return Some(value);
                    }
                    Err(cur) => pos = cur,
                }
            } else if diff < 0 {
                return None;
            } else {
                pos = self.dequeue_pos.load(Ordering::Relaxed);
            }
        }
    }

    /// Best-effort emptiness check; racy under concurrent producers, as
    /// any snapshot of a lock-free queue's occupancy must be.
    pub fn empty(&self) -> bool {
        let dequeue = self.dequeue_pos.load(Ordering::Acquire);
        let enqueue = self.enqueue_pos.load(Ordering::Acquire);
        dequeue == enqueue
    }
}

impl<T> Drop for Queue<T> {
    fn drop(&mut self) {
        // Drain any values still owned by the buffer so T's Drop runs;
        // MaybeUninit slots do not drop their contents on their own.
        while self.try_pop().is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn single_thread_fifo() {
        let q = Queue::with_capacity(4);
        assert!(q.try_enqueue(1).is_ok());
        assert!(q.try_enqueue(2).is_ok());
        assert_eq!(q.try_pop(), Some(1));
        assert_eq!(q.try_pop(), Some(2));
        assert_eq!(q.try_pop(), None);
    }

    #[test]
    fn rejects_when_full() {
        let q = Queue::with_capacity(2);
        assert!(q.try_enqueue(1).is_ok());
        assert!(q.try_enqueue(2).is_ok());
        assert_eq!(q.try_enqueue(3), Err(3));
    }

    #[test]
    fn concurrent_producers_consumers_no_loss_no_duplication() {
        let q = Arc::new(Queue::with_capacity(1024));
        let producers = 4;
        let per_producer = 2000usize;
        let total = producers * per_producer;
        let mut handles = Vec::new();
        for p in 0..producers {
            let q = q.clone();
            handles.push(thread::spawn(move || {
                for i in 0..per_producer {
                    let value = p * per_producer + i;
                    loop {
                        if q.try_enqueue(value).is_ok() {
                            break;
                        }
                        thread::yield_now();
                    }
                }
            }));
        }
        let consumed = Arc::new(std::sync::Mutex::new(vec![false; total]));
        let received = Arc::new(AtomicUsize::new(0));
        let mut consumer_handles = Vec::new();
        for _ in 0..producers {
            let q = q.clone();
            let consumed = consumed.clone();
            let received = received.clone();
            consumer_handles.push(thread::spawn(move || loop {
                if let Some(v) = q.try_pop() {
                    let mut table = consumed.lock().unwrap();
                    assert!(!table[v], "duplicate item observed: {v}");
                    table[v] = true;
                    drop(table);
                    if received.fetch_add(1, Ordering::SeqCst) + 1 == total {
                        break;
                    }
                } else if received.load(Ordering::SeqCst) == total {
                    break;
                } else {
                    thread::yield_now();
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        for h in consumer_handles {
            h.join().unwrap();
        }
        assert!(consumed.lock().unwrap().iter().all(|&b| b));
    }
}
