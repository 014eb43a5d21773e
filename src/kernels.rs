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

//! Arithmetic kernels (4.H): `compare`, `add_with_carry`, `sub_a_ge_b`,
//! `mul_2len`. Operate on plain `u64` limb slices; callers are
//! responsible for allocation, base selection, and sign handling.

use std::cmp::Ordering;

/// Lexicographic compare from the most-significant limb down, with an
/// early exit on the first difference.
pub fn compare(a: &[u64], b: &[u64]) -> Ordering {
    debug_assert_eq!(a.len(), b.len());
    for i in (0..a.len()).rev() {
        match a[i].cmp(&b[i]) {
            Ordering::Equal => continue,
            ord => return ord,
        }
    }
    Ordering::Equal
}

/// `c[i] = a[i] + b[i] + carry`, subtracting `base` and carrying when the
/// column reaches or exceeds it. Returns the carry out of the top limb.
pub fn add_with_carry(a: &[u64], b: &[u64], c: &mut [u64], base: u64) -> u64 {
    debug_assert_eq!(a.len(), b.len());
    debug_assert_eq!(a.len(), c.len());
    let mut carry = 0u64;
    for i in 0..a.len() {
        let mut sum = a[i] + b[i] + carry;
        carry = if sum >= base {
            sum -= base;
            1
        } else {
            0
        };
        c[i] = sum;
    }
    carry
}

/// `c = a - b`, under the precondition `a >= b`. Borrows by adding `base`
/// when a column would go negative. A nonzero return (borrow propagated
/// past the top limb) indicates the precondition was violated.
pub fn sub_a_ge_b(a: &[u64], b: &[u64], c: &mut [u64], base: u64) -> u64 {
    debug_assert_eq!(a.len(), b.len());
    debug_assert_eq!(a.len(), c.len());
    let mut borrow = 0u64;
    for i in 0..a.len() {
        let diff = a[i] as i64 - b[i] as i64 - borrow as i64;
        if diff < 0 {
            c[i] = (diff + base as i64) as u64;
            borrow = 1;
        } else {
            c[i] = diff as u64;
            borrow = 0;
        }
    }
    borrow
}

/// Schoolbook `O(L^2)` multiplication with column carry. `c` must have
/// length `2 * a.len()` and is zeroed before use.
pub fn mul_2len(a: &[u64], b: &[u64], c: &mut [u64], base: u64) {
    let len = a.len();
    debug_assert_eq!(b.len(), len);
    debug_assert_eq!(c.len(), 2 * len);
    c.fill(0);
    for i in 0..len {
        if a[i] == 0 {
            continue;
        }
        let mut carry = 0u64;
        for j in 0..len {
            let acc = a[i] * b[j] + c[i + j] + carry;
            c[i + j] = acc % base;
            carry = acc / base;
        }
        c[i + len] = carry;
    }
}
