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

//! Slab memory pool (4.B): a process-wide, thread-sharded free-list of
//! power-of-two-ish blocks with split/coalesce, backed by OS slabs
//! obtained through a [`PageAllocator`].

use crate::alloc::page::{Page, PageAllocator};
use crate::error::{Context as ErrContext, Error, Result};
use crate::config::Config;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::ptr::NonNull;
use std::sync::Mutex;

const ALIGNMENT: usize = 64;
const MIN_SLAB: usize = 1 << 12;
const MAX_SLAB: usize = 1 << 32;

type BlockId = usize;

struct Block {
    header: bool,
    free: bool,
    valid: bool,
    ptr: NonNull<u8>,
    len: usize,
    prev: Option<BlockId>,
    next: Option<BlockId>,
}

/// One shard of the pool: a doubly-linked arena of blocks protected by a
/// single mutex, plus a lower-bound free index keyed by block length.
struct MetaBlock {
    blocks: Vec<Block>,
    free_index: BTreeMap<usize, Vec<BlockId>>,
    slabs: Vec<Page>,
    tail: Option<BlockId>,
}

impl MetaBlock {
    fn new() -> Self {
        MetaBlock {
            blocks: Vec::new(),
            free_index: BTreeMap::new(),
            slabs: Vec::new(),
            tail: None,
        }
    }

    fn find_free(&mut self, safe: usize) -> Option<BlockId> {
        loop {
            let key = *self.free_index.range(safe..).next()?.0;
            let ids = self.free_index.get_mut(&key).unwrap();
            while let Some(id) = ids.pop() {
                if self.blocks[id].valid && self.blocks[id].free {
                    if ids.is_empty() {
                        self.free_index.remove(&key);
                    }
                    return Some(id);
                }
            }
            self.free_index.remove(&key);
        }
    }

    fn split(&mut self, id: BlockId, safe: usize) -> BlockId {
        let total_len = self.blocks[id].len;
        let remainder_ptr = unsafe { self.blocks[id].ptr.as_ptr().add(safe) };
        let remainder = Block {
            header: false,
            free: true,
            valid: true,
            ptr: NonNull::new(remainder_ptr).expect("split offset within a live slab"),
            len: total_len - safe,
            prev: Some(id),
            next: self.blocks[id].next,
        };
        let remainder_id = self.blocks.len();
        self.blocks.push(remainder);
        if let Some(n) = self.blocks[id].next {
            self.blocks[n].prev = Some(remainder_id);
        }
        if self.tail == Some(id) {
            self.tail = Some(remainder_id);
        }
        self.blocks[id].next = Some(remainder_id);
        self.blocks[id].len = safe;
        self.blocks[id].free = false;
        self.free_index
            .entry(total_len - safe)
            .or_default()
            .push(remainder_id);
        id
    }

    fn extend(&mut self, safe: usize, page_alloc: &dyn PageAllocator) -> Result<()> {
        let wanted = safe.next_power_of_two().clamp(MIN_SLAB, MAX_SLAB);
        if safe > wanted {
            log::warn!("slab request {safe} clamped to {wanted}; allocation will fail");
        }
        let page = page_alloc.alloc(ALIGNMENT, wanted)?;
        log::info!("allocated new slab of {}", human(page.length));
        let id = self.blocks.len();
        let prev_tail = self.tail;
        self.blocks.push(Block {
            header: true,
            free: true,
            valid: true,
            ptr: page.base,
            len: page.length,
            prev: prev_tail,
            next: None,
        });
        if let Some(p) = prev_tail {
            self.blocks[p].next = Some(id);
        }
        self.tail = Some(id);
        self.free_index.entry(page.length).or_default().push(id);
        self.slabs.push(page);
        Ok(())
    }

    fn allocate(&mut self, safe: usize, page_alloc: &dyn PageAllocator) -> Result<BlockId> {
        loop {
            if let Some(id) = self.find_free(safe) {
                let len = self.blocks[id].len;
                return Ok(if len == safe {
                    self.blocks[id].free = false;
                    id
                } else {
                    self.split(id, safe)
                });
            }
            self.extend(safe, page_alloc).ctx("alloc/pool.rs", "allocate")?;
        }
    }

    fn merge_into(&mut self, keep: BlockId, absorb: BlockId) {
        self.blocks[keep].len += self.blocks[absorb].len;
        self.blocks[absorb].valid = false;
        let next_of_absorb = self.blocks[absorb].next;
        self.blocks[keep].next = next_of_absorb;
        if let Some(n) = next_of_absorb {
            self.blocks[n].prev = Some(keep);
        }
        if self.tail == Some(absorb) {
            self.tail = Some(keep);
        }
    }

    fn release(&mut self, mut block: BlockId) {
        self.blocks[block].free = true;
        loop {
            if self.blocks[block].header {
                break;
            }
            let Some(prev) = self.blocks[block].prev else {
                break;
            };
            if !(self.blocks[prev].valid && self.blocks[prev].free) {
                break;
            }
            self.merge_into(prev, block);
            block = prev;
        }
        loop {
            let Some(next) = self.blocks[block].next else {
                break;
            };
            if !(self.blocks[next].valid && self.blocks[next].free) || self.blocks[next].header {
                break;
            }
            self.merge_into(block, next);
        }
        self.free_index
            .entry(self.blocks[block].len)
            .or_default()
            .push(block);
    }

    fn metrics(&self) -> (usize, usize, usize, usize, usize) {
        let mut bytes_total = 0usize;
        let mut num_blocks = 0usize;
        let mut min_block = usize::MAX;
        let mut max_block = 0usize;
        let mut bytes_in_use = 0usize;
        for b in &self.blocks {
            if !b.valid {
                continue;
            }
            num_blocks += 1;
            bytes_total += b.len;
            min_block = min_block.min(b.len);
            max_block = max_block.max(b.len);
            if !b.free {
                bytes_in_use += b.len;
            }
        }
        if num_blocks == 0 {
            min_block = 0;
        }
        (bytes_total, num_blocks, min_block, max_block, bytes_in_use)
    }
}

/// A live allocation handed out by [`Pool::allocate`]. Must be returned
/// via [`Pool::release`] exactly once.
pub struct BlockHandle {
    shard: usize,
    block: BlockId,
    pub ptr: NonNull<u8>,
    pub len: usize,
}

unsafe impl Send for BlockHandle {}

/// A point-in-time snapshot of pool occupancy, as produced by `report()`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemView {
    pub bytes_total: usize,
    pub num_blocks: usize,
    pub avg_block_size: f64,
    pub min_block_size: usize,
    pub max_block_size: usize,
    pub bytes_in_use: usize,
    pub usage_ratio: f64,
}

pub struct Pool {
    metablocks: Vec<Mutex<MetaBlock>>,
    page_alloc: Box<dyn PageAllocator>,
}

fn round_up(target: usize, alignment: usize) -> usize {
    (target + alignment - 1) / alignment * alignment
}

thread_local! {
    static SHARD_RNG: RefCell<rand::rngs::SmallRng> =
        RefCell::new(<rand::rngs::SmallRng as rand::SeedableRng>::from_entropy());
}

impl Pool {
    pub fn new(page_alloc: Box<dyn PageAllocator>, shard_count: usize) -> Self {
        let shard_count = shard_count.max(1);
        let metablocks = (0..shard_count).map(|_| Mutex::new(MetaBlock::new())).collect();
        Pool {
            metablocks,
            page_alloc,
        }
    }

    /// Builds a pool sized `2 * available_parallelism()` shards, per 4.B,
    /// with the shard count overridable from `config`.
    pub fn from_config(page_alloc: Box<dyn PageAllocator>, config: &Config) -> Self {
        let default_shards = 2 * std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        let shard_count = config.get_or_else("MemoryPreference/pool_shards", default_shards as i64);
        Pool::new(page_alloc, shard_count.max(1) as usize)
    }

    fn pick_shard(&self) -> usize {
        use rand::Rng;
        SHARD_RNG.with(|rng| rng.borrow_mut().gen_range(0..self.metablocks.len()))
    }

    pub fn allocate(&self, target: usize) -> Result<BlockHandle> {
        let safe = round_up(target.max(1), ALIGNMENT);
        let shard = self.pick_shard();
        let mut meta = self.metablocks[shard].lock().unwrap();
        let block = meta
            .allocate(safe, self.page_alloc.as_ref())
            .ctx("alloc/pool.rs", "Pool::allocate")?;
        let (ptr, len) = (meta.blocks[block].ptr, meta.blocks[block].len);
        Ok(BlockHandle {
            shard,
            block,
            ptr,
            len,
        })
    }

    pub fn release(&self, handle: BlockHandle) {
        let mut meta = self.metablocks[handle.shard].lock().unwrap();
        meta.release(handle.block);
    }

    pub fn report(&self) -> MemView {
        let mut bytes_total = 0usize;
        let mut num_blocks = 0usize;
        let mut min_block = usize::MAX;
        let mut max_block = 0usize;
        let mut bytes_in_use = 0usize;
        for shard in &self.metablocks {
            let meta = shard.lock().unwrap();
            let (t, n, mn, mx, u) = meta.metrics();
            bytes_total += t;
            num_blocks += n;
            if n > 0 {
                min_block = min_block.min(mn);
                max_block = max_block.max(mx);
            }
            bytes_in_use += u;
        }
        if num_blocks == 0 {
            min_block = 0;
        }
        MemView {
            bytes_total,
            num_blocks,
            avg_block_size: if num_blocks == 0 {
                0.0
            } else {
                bytes_total as f64 / num_blocks as f64
            },
            min_block_size: min_block,
            max_block_size: max_block,
            bytes_in_use,
            usage_ratio: if bytes_total == 0 {
                0.0
            } else {
                bytes_in_use as f64 / bytes_total as f64
            },
        }
    }
}

impl Drop for Pool {
    /// Returns every OS slab still held by any shard to the page
    /// allocator, so a pool's slabs are independently freeable at pool
    /// destruction rather than leaked for the life of the process.
    fn drop(&mut self) {
        for shard in &self.metablocks {
            let mut meta = shard.lock().unwrap();
            for page in meta.slabs.drain(..) {
                unsafe { self.page_alloc.free(page) };
            }
        }
    }
}

/// Renders a byte count the way the allocator's diagnostics do: the
/// largest whole unit with one decimal place.
pub fn human(bytes: usize) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}
