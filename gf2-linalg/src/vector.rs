// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2023 Yulong Ming (myl7)

//! See [`BitVector`].

use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign};

use bitvec::prelude::*;
use rand::{CryptoRng, RngCore};
use tracing::trace;

use crate::utils::{and_parity, xor, xor_inplace};
use crate::{LinalgError, DEFAULT_SAMPLING_ATTEMPTS};

/// Fixed-width vector over GF(2).
///
/// Bit `i` is stored in word `i >> 6` at bit `i & 63`, LSB first,
/// which is the [`Lsb0`] order of `bitvec`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BitVector {
    words: Vec<u64>,
}

impl BitVector {
    pub fn zero(words: usize) -> Self {
        Self {
            words: vec![0; words],
        }
    }

    pub fn from_words(words: Vec<u64>) -> Self {
        Self { words }
    }

    /// Uniformly random vector, possibly zero.
    pub fn uniform<R>(words: usize, rng: &mut R) -> Self
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        Self::from_words((0..words).map(|_| rng.next_u64()).collect())
    }

    /// Uniformly random non-zero vector.
    ///
    /// The zero vector is resampled since it is useless as a mask.
    pub fn random<R>(words: usize, rng: &mut R) -> Result<Self, LinalgError>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        Self::random_with_attempts(words, DEFAULT_SAMPLING_ATTEMPTS, rng)
    }

    pub fn random_with_attempts<R>(
        words: usize,
        attempts: usize,
        rng: &mut R,
    ) -> Result<Self, LinalgError>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        assert!(words > 0, "cannot sample a non-zero vector of 0 words");
        for attempt in 0..attempts {
            let v = Self::uniform(words, rng);
            if !v.is_zero() {
                return Ok(v);
            }
            trace!(attempt, "rejected all-zero vector sample");
        }
        Err(LinalgError::SamplingExhausted {
            what: "non-zero vector",
            attempts,
        })
    }

    pub fn words(&self) -> &[u64] {
        &self.words
    }

    pub fn words_mut(&mut self) -> &mut [u64] {
        &mut self.words
    }

    /// Width in 64-bit words.
    pub fn word_len(&self) -> usize {
        self.words.len()
    }

    /// Width in bits.
    pub fn len(&self) -> usize {
        self.words.len() << 6
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn bits(&self) -> &BitSlice<u64, Lsb0> {
        self.words.view_bits::<Lsb0>()
    }

    /// Indices of the set bits in increasing order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits().iter_ones()
    }

    pub fn get(&self, i: usize) -> bool {
        self.check_index(i);
        self.words[i >> 6] & (1 << (i & 63)) != 0
    }

    pub fn set(&mut self, i: usize) -> &mut Self {
        self.check_index(i);
        self.words[i >> 6] |= 1 << (i & 63);
        self
    }

    pub fn clear(&mut self, i: usize) -> &mut Self {
        self.check_index(i);
        self.words[i >> 6] &= !(1 << (i & 63));
        self
    }

    pub fn assign(&mut self, i: usize, bit: bool) -> &mut Self {
        if bit {
            self.set(i)
        } else {
            self.clear(i)
        }
    }

    pub fn flip(&mut self, i: usize) -> &mut Self {
        self.check_index(i);
        self.words[i >> 6] ^= 1 << (i & 63);
        self
    }

    pub fn swap(&mut self, i: usize, j: usize) {
        let (bi, bj) = (self.get(i), self.get(j));
        self.assign(i, bj);
        self.assign(j, bi);
    }

    pub fn is_zero(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// True iff an odd number of bits are set.
    pub fn parity(&self) -> bool {
        self.words.iter().fold(0u64, |acc, w| acc ^ w).count_ones() & 1 == 1
    }

    /// GF(2) inner product.
    pub fn dot(&self, rhs: &Self) -> bool {
        self.check_same_len(rhs);
        and_parity(&self.words, &rhs.words)
    }

    /// Shifts towards index 0: bit `i` takes bit `i + k`, the top `k` bits become 0.
    pub fn left_shift(&self, k: usize) -> Self {
        assert!(
            k <= self.len(),
            "shift by {} exceeds {} bits",
            k,
            self.len()
        );
        let mut res = self.clone();
        res.words.view_bits_mut::<Lsb0>().shift_start(k);
        res
    }

    /// Shifts away from index 0: bit `i + k` takes bit `i`, the low `k` bits become 0.
    pub fn right_shift(&self, k: usize) -> Self {
        assert!(
            k <= self.len(),
            "shift by {} exceeds {} bits",
            k,
            self.len()
        );
        let mut res = self.clone();
        res.words.view_bits_mut::<Lsb0>().shift_end(k);
        res
    }

    /// Concatenation. The operands may have different widths.
    pub fn vcat2(a: &Self, b: &Self) -> Self {
        Self::vcat(&[a, b])
    }

    pub fn vcat3(a: &Self, b: &Self, c: &Self) -> Self {
        Self::vcat(&[a, b, c])
    }

    pub fn vcat(parts: &[&Self]) -> Self {
        let mut words = Vec::with_capacity(parts.iter().map(|p| p.word_len()).sum());
        parts.iter().for_each(|p| words.extend_from_slice(&p.words));
        Self { words }
    }

    /// Piece `part` of `parts` equal contiguous pieces.
    pub fn proj(&self, parts: usize, part: usize) -> Self {
        assert!(
            parts > 0 && self.word_len() % parts == 0,
            "cannot split {} words into {} equal parts",
            self.word_len(),
            parts
        );
        assert!(part < parts, "part {} out of {} parts", part, parts);
        let sub = self.word_len() / parts;
        Self::from_words(self.words[part * sub..(part + 1) * sub].to_vec())
    }

    /// Inverse of [`BitVector::vcat2`] for equal widths.
    pub fn proj2(&self) -> (Self, Self) {
        (self.proj(2, 0), self.proj(2, 1))
    }

    /// Inverse of [`BitVector::vcat3`] for equal widths.
    pub fn proj3(&self) -> (Self, Self, Self) {
        (self.proj(3, 0), self.proj(3, 1), self.proj(3, 2))
    }

    fn check_index(&self, i: usize) {
        assert!(
            i < self.len(),
            "bit index {} out of range for {} bits",
            i,
            self.len()
        );
    }

    fn check_same_len(&self, rhs: &Self) {
        assert_eq!(
            self.word_len(),
            rhs.word_len(),
            "vector width mismatch: {} vs {} words",
            self.word_len(),
            rhs.word_len()
        );
    }
}

macro_rules! impl_bit_op {
    ($op:ident, $op_fn:ident, $op_assign:ident, $op_assign_fn:ident, $tok:tt) => {
        impl $op_assign<&BitVector> for BitVector {
            fn $op_assign_fn(&mut self, rhs: &BitVector) {
                self.check_same_len(rhs);
                self.words
                    .iter_mut()
                    .zip(&rhs.words)
                    .for_each(|(l, r)| *l = *l $tok *r);
            }
        }

        impl $op<&BitVector> for &BitVector {
            type Output = BitVector;

            fn $op_fn(self, rhs: &BitVector) -> Self::Output {
                let mut res = self.clone();
                $op_assign::$op_assign_fn(&mut res, rhs);
                res
            }
        }

        impl $op<&BitVector> for BitVector {
            type Output = BitVector;

            fn $op_fn(mut self, rhs: &BitVector) -> Self::Output {
                $op_assign::$op_assign_fn(&mut self, rhs);
                self
            }
        }

        impl $op for BitVector {
            type Output = BitVector;

            fn $op_fn(mut self, rhs: BitVector) -> Self::Output {
                $op_assign::$op_assign_fn(&mut self, &rhs);
                self
            }
        }
    };
}

impl_bit_op!(BitAnd, bitand, BitAndAssign, bitand_assign, &);
impl_bit_op!(BitOr, bitor, BitOrAssign, bitor_assign, |);

impl BitXorAssign<&BitVector> for BitVector {
    fn bitxor_assign(&mut self, rhs: &BitVector) {
        self.check_same_len(rhs);
        xor_inplace(&mut self.words, &[&rhs.words]);
    }
}

impl BitXor<&BitVector> for &BitVector {
    type Output = BitVector;

    fn bitxor(self, rhs: &BitVector) -> Self::Output {
        self.check_same_len(rhs);
        BitVector::from_words(xor(&[&self.words, &rhs.words]))
    }
}

impl BitXor<&BitVector> for BitVector {
    type Output = BitVector;

    fn bitxor(mut self, rhs: &BitVector) -> Self::Output {
        self ^= rhs;
        self
    }
}

impl BitXor for BitVector {
    type Output = BitVector;

    fn bitxor(mut self, rhs: BitVector) -> Self::Output {
        self ^= &rhs;
        self
    }
}

impl fmt::Display for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, bit) in self.bits().iter().by_vals().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", bit as u8)?;
        }
        write!(f, "]")
    }
}
