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

//! Big-integer value (4.G): a signed, fixed-length limb array with a
//! base-`B` invariant, plus the parse/format routines and the signed-add
//! algorithm built on the 4.H kernels.

use crate::alloc::{BlockHandle, Pool};
use crate::config::Config;
use crate::error::{Context as ErrContext, Error, Result};
use crate::kernels;
use std::sync::{Arc, Mutex};

/// The three supported limb bases, matching the exact store/io constants
/// recovered from the original IO tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base {
    Oct,
    Dec,
    Hex,
}

impl Base {
    pub fn io_base(self) -> u64 {
        match self {
            Base::Oct => 8,
            Base::Dec => 10,
            Base::Hex => 16,
        }
    }

    /// Number of io-base digits packed into one limb.
    pub fn log_store_base(self) -> u32 {
        match self {
            Base::Oct => 9,
            Base::Dec => 8,
            Base::Hex => 7,
        }
    }

    pub fn store_base(self) -> u64 {
        self.io_base().pow(self.log_store_base())
    }
}

fn digit_value(c: char, io_base: u64) -> Option<u64> {
    let v = match c {
        '0'..='9' => c as u64 - '0' as u64,
        'a'..='f' => c as u64 - 'a' as u64 + 10,
        'A'..='F' => c as u64 - 'A' as u64 + 10,
        _ => return None,
    };
    if v < io_base {
        Some(v)
    } else {
        None
    }
}

fn digit_char(d: u64) -> char {
    if d < 10 {
        (b'0' + d as u8) as char
    } else {
        (b'a' + (d - 10) as u8) as char
    }
}

/// Owns the lazily-allocated limb storage for one [`Integer`]. Releases
/// its block back to the pool on drop.
struct LimbVec {
    handle: Option<BlockHandle>,
    pool: Arc<Pool>,
    limb_len: usize,
}

impl LimbVec {
    fn as_slice(&self) -> &[u64] {
        let handle = self.handle.as_ref().expect("limb vec always holds its block until drop");
        unsafe { std::slice::from_raw_parts(handle.ptr.as_ptr().cast(), self.limb_len) }
    }

    fn as_mut_slice(&mut self) -> &mut [u64] {
        let handle = self.handle.as_ref().expect("limb vec always holds its block until drop");
        unsafe { std::slice::from_raw_parts_mut(handle.ptr.as_ptr().cast(), self.limb_len) }
    }
}

impl Drop for LimbVec {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.pool.release(handle);
        }
    }
}

struct Inner {
    sign: bool,
    limbs: Option<LimbVec>,
}

/// A signed fixed-length big integer: `(sign, base, limbs[0..limb_len])`
/// with `value = sign_factor * sum(limbs[i] * base^i)`. Storage is
/// allocated from a [`Pool`], lazily unless `eager` is set.
pub struct Integer {
    base: Base,
    limb_len: usize,
    pool: Arc<Pool>,
    eager: bool,
    inner: Mutex<Inner>,
}

impl Integer {
    /// `log_len` is clamped into the `[min, max]` range read from
    /// `config`, logging at `INFO` when truncation occurs.
    pub fn new(pool: Arc<Pool>, base: Base, requested_log_len: u32, config: &Config) -> Self {
        let min_log_len =
            config.get_or_else::<i64>("core/BasicIntegerType/limits/min_log_length", 4) as u32;
        let max_log_len =
            config.get_or_else::<i64>("core/BasicIntegerType/limits/max_log_length", 32) as u32;
        let clamped = requested_log_len.clamp(min_log_len, max_log_len);
        if clamped != requested_log_len {
            log::info!(
                "requested log_length {requested_log_len} clamped to {clamped} (allowed [{min_log_len}, {max_log_len}])"
            );
        }
        let delayed_allocation =
            config.get_or_else::<bool>("core/MemoryPreference/delayed_allocation", true);
        let integer = Integer {
            base,
            limb_len: 1usize << clamped,
            pool,
            eager: !delayed_allocation,
            inner: Mutex::new(Inner {
                sign: true,
                limbs: None,
            }),
        };
        if integer.eager {
            let _ = integer.ensure_allocated();
        }
        integer
    }

    pub fn base(&self) -> Base {
        self.base
    }

    pub fn limb_len(&self) -> usize {
        self.limb_len
    }

    pub fn sign(&self) -> bool {
        self.inner.lock().unwrap().sign
    }

    fn ensure_allocated(&self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.limbs.is_some() {
            return Ok(());
        }
        let handle = self
            .pool
            .allocate(self.limb_len * std::mem::size_of::<u64>())
            .ctx("bigint.rs", "ensure_allocated")?;
        let mut limbs = LimbVec {
            handle: Some(handle),
            pool: self.pool.clone(),
            limb_len: self.limb_len,
        };
        limbs.as_mut_slice().fill(0);
        inner.limbs = Some(limbs);
        Ok(())
    }

    /// Reads the current limb vector, failing with a DAG-construction
    /// error if it has never been allocated (the node producing it has
    /// not run yet).
    fn with_limbs<R>(&self, f: impl FnOnce(&[u64]) -> R) -> Result<R> {
        let inner = self.inner.lock().unwrap();
        match &inner.limbs {
            Some(l) => Ok(f(l.as_slice())),
            None => Err(Error::dag_construction("data domain not yet allocated")),
        }
    }

    fn with_limbs_mut<R>(&self, f: impl FnOnce(&mut [u64]) -> R) -> Result<R> {
        self.ensure_allocated().ctx("bigint.rs", "with_limbs_mut")?;
        let mut inner = self.inner.lock().unwrap();
        Ok(f(inner.limbs.as_mut().unwrap().as_mut_slice()))
    }

    fn set_sign(&self, sign: bool) {
        self.inner.lock().unwrap().sign = sign;
    }

    /// Parses `literal` into this integer's storage, per the grammar
    /// `[+|-]? digit+`. Leaves the integer unmodified on failure.
    pub fn parse(&self, literal: &str) -> Result<()> {
        let (sign, digits) = match literal.as_bytes().first() {
            Some(b'+') => (true, &literal[1..]),
            Some(b'-') => (false, &literal[1..]),
            _ => (true, literal),
        };
        if digits.is_empty() {
            return Err(Error::parse("empty literal"));
        }
        let io_base = self.base.io_base();
        let log_store_base = self.base.log_store_base();
        let store_base = self.base.store_base();

        let mut limbs = vec![0u64; self.limb_len];
        let mut store_digit = 0u64;
        let mut power = 1u64;
        let mut digit_count = 0u32;
        let mut limb_index = 0usize;
        for c in digits.chars().rev() {
            let d = digit_value(c, io_base)
                .ok_or_else(|| Error::parse(format!("invalid digit '{c}' for base")))?;
            store_digit += d * power;
            power *= io_base;
            digit_count += 1;
            if digit_count == log_store_base {
                if limb_index >= self.limb_len {
                    return Err(Error::parse("integer length limit exceeded"));
                }
                limbs[limb_index] = store_digit;
                limb_index += 1;
                store_digit = 0;
                power = 1;
                digit_count = 0;
            }
        }
        if digit_count > 0 {
            if limb_index >= self.limb_len {
                return Err(Error::parse("integer length limit exceeded"));
            }
            limbs[limb_index] = store_digit;
        }
        debug_assert!(store_digit < store_base);

        self.with_limbs_mut(|dst| dst.copy_from_slice(&limbs))?;
        self.set_sign(sign);
        Ok(())
    }

    /// Formats the currently realized limb vector in this integer's base.
    /// An all-zero integer prints `"0"`.
    pub fn format(&self) -> Result<String> {
        let sign = self.sign();
        let io_base = self.base.io_base();
        let width = self.base.log_store_base() as usize;
        self.with_limbs(|limbs| {
            let top = limbs.iter().rposition(|&l| l != 0);
            let Some(top) = top else {
                return "0".to_string();
            };
            let mut out = String::new();
            if !sign {
                out.push('-');
            }
            out.push_str(&format_limb(limbs[top], io_base, None));
            for i in (0..top).rev() {
                out.push_str(&format_limb(limbs[i], io_base, Some(width)));
            }
            out
        })
    }
}

fn format_limb(value: u64, io_base: u64, width: Option<usize>) -> String {
    let mut digits = Vec::new();
    let mut v = value;
    if v == 0 {
        digits.push(0u64);
    } else {
        while v > 0 {
            digits.push(v % io_base);
            v /= io_base;
        }
    }
    if let Some(w) = width {
        while digits.len() < w {
            digits.push(0);
        }
    }
    digits.iter().rev().map(|&d| digit_char(d)).collect()
}

/// The 4.H signed-add algorithm: equal signs add magnitudes; differing
/// signs subtract the smaller magnitude from the larger, and the result's
/// sign follows the larger magnitude (ties yield zero with `sign = true`).
/// `a`, `b`, and `target` must share `(limb_len, base)`.
pub fn signed_add(a: &Integer, b: &Integer, target: &Integer) -> Result<()> {
    if a.limb_len != b.limb_len || a.limb_len != target.limb_len {
        return Err(Error::length_mismatch("operands of different lengths"));
    }
    if a.base != b.base || a.base != target.base {
        return Err(Error::base_mismatch("operands of different bases"));
    }
    let base = a.base.store_base();
    let a_limbs = a.with_limbs(|l| l.to_vec()).ctx("bigint.rs", "signed_add")?;
    let b_limbs = b.with_limbs(|l| l.to_vec()).ctx("bigint.rs", "signed_add")?;
    let mut out = vec![0u64; a.limb_len];
    let (sign, overflow) = if a.sign() == b.sign() {
        let overflow = kernels::add_with_carry(&a_limbs, &b_limbs, &mut out, base);
        (a.sign(), overflow)
    } else {
        match kernels::compare(&a_limbs, &b_limbs) {
            std::cmp::Ordering::Equal => {
                (true, 0)
            }
            std::cmp::Ordering::Greater => {
                let borrow = kernels::sub_a_ge_b(&a_limbs, &b_limbs, &mut out, base);
                (a.sign(), borrow)
            }
            std::cmp::Ordering::Less => {
                let borrow = kernels::sub_a_ge_b(&b_limbs, &a_limbs, &mut out, base);
                (b.sign(), borrow)
            }
        }
    };
    if overflow != 0 {
        log::warn!("calculation overflow in signed add");
    }
    target
        .with_limbs_mut(|dst| dst.copy_from_slice(&out))
        .ctx("bigint.rs", "signed_add")?;
    target.set_sign(sign);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::default_allocator;

    fn fresh_pool() -> Arc<Pool> {
        Arc::new(Pool::new(default_allocator(), 1))
    }

    fn int(base: Base, log_len: u32) -> Integer {
        Integer::new(fresh_pool(), base, log_len, &Config::empty())
    }

    #[test]
    fn round_trips_decimal_literal() {
        let n = int(Base::Dec, 3);
        n.parse("12345678901234567890").unwrap();
        assert_eq!(n.format().unwrap(), "12345678901234567890");
    }

    #[test]
    fn round_trips_negative_hex_literal() {
        let n = int(Base::Hex, 2);
        n.parse("-1a2b3c").unwrap();
        assert_eq!(n.format().unwrap(), "-1a2b3c");
    }

    #[test]
    fn all_zero_prints_zero_and_is_non_negative() {
        let n = int(Base::Dec, 2);
        n.parse("0").unwrap();
        assert_eq!(n.format().unwrap(), "0");
        assert!(n.sign());
    }

    #[test]
    fn rejects_empty_literal() {
        let n = int(Base::Dec, 2);
        assert!(n.parse("").is_err());
    }

    #[test]
    fn rejects_out_of_base_digit() {
        let n = int(Base::Oct, 2);
        assert!(n.parse("89").is_err());
    }

    #[test]
    fn signed_cancellation_yields_zero() {
        let pool = fresh_pool();
        let x = Integer::new(pool.clone(), Base::Dec, 3, &Config::empty());
        let y = Integer::new(pool.clone(), Base::Dec, 3, &Config::empty());
        let c = Integer::new(pool, Base::Dec, 3, &Config::empty());
        x.parse("12345678901234567890").unwrap();
        y.parse("-12345678901234567890").unwrap();
        signed_add(&x, &y, &c).unwrap();
        assert_eq!(c.format().unwrap(), "0");
        assert!(c.sign());
    }

    #[test]
    fn sign_of_larger_magnitude_wins() {
        let pool = fresh_pool();
        let a = Integer::new(pool.clone(), Base::Dec, 2, &Config::empty());
        let b = Integer::new(pool.clone(), Base::Dec, 2, &Config::empty());
        let c = Integer::new(pool.clone(), Base::Dec, 2, &Config::empty());
        a.parse("5").unwrap();
        b.parse("-3").unwrap();
        signed_add(&a, &b, &c).unwrap();
        assert_eq!(c.format().unwrap(), "2");

        let a2 = Integer::new(pool.clone(), Base::Dec, 2, &Config::empty());
        let b2 = Integer::new(pool, Base::Dec, 2, &Config::empty());
        let c2_pool = fresh_pool();
        let c2 = Integer::new(c2_pool, Base::Dec, 2, &Config::empty());
        a2.parse("-5").unwrap();
        b2.parse("3").unwrap();
        signed_add(&a2, &b2, &c2).unwrap();
        assert_eq!(c2.format().unwrap(), "-2");
    }

    #[test]
    fn mismatched_length_is_rejected() {
        let pool = fresh_pool();
        let a = Integer::new(pool.clone(), Base::Dec, 2, &Config::empty());
        let b = Integer::new(pool.clone(), Base::Dec, 4, &Config::empty());
        let c = Integer::new(pool, Base::Dec, 2, &Config::empty());
        a.parse("1").unwrap();
        b.parse("1").unwrap();
        assert!(signed_add(&a, &b, &c).is_err());
    }
}
