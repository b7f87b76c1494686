// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2023 Yulong Ming (myl7)

//! See [`BitMatrix`].

use std::fmt;
use std::ops::{BitXor, Mul, Range};

use rand::{CryptoRng, RngCore};
#[cfg(feature = "multi-thread")]
use rayon::prelude::*;
use tracing::trace;

use crate::utils::xor_inplace;
use crate::{BitVector, LinalgError, DEFAULT_SAMPLING_ATTEMPTS};

/// Row-major matrix over GF(2).
///
/// Every row is a [`BitVector`] of `col_words` words, so the column count is `64 * col_words`.
/// The row count is free.
/// The matrix is square when it has `64 * col_words` rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitMatrix {
    rows: Vec<BitVector>,
    col_words: usize,
}

/// Receives the row operations Gaussian elimination performs,
/// so the same elimination drives [`BitMatrix::rref`], [`BitMatrix::inv`] and [`BitMatrix::solve`].
trait RowMirror {
    fn swap(&mut self, i: usize, j: usize);
    /// Row `dst` += row `src`.
    fn add(&mut self, dst: usize, src: usize);
}

impl RowMirror for () {
    fn swap(&mut self, _: usize, _: usize) {}

    fn add(&mut self, _: usize, _: usize) {}
}

impl RowMirror for BitMatrix {
    fn swap(&mut self, i: usize, j: usize) {
        self.swap_rows(i, j);
    }

    fn add(&mut self, dst: usize, src: usize) {
        self.add_row(dst, src);
    }
}

impl RowMirror for BitVector {
    fn swap(&mut self, i: usize, j: usize) {
        BitVector::swap(self, i, j);
    }

    fn add(&mut self, dst: usize, src: usize) {
        if self.get(src) {
            self.flip(dst);
        }
    }
}

impl BitMatrix {
    pub fn zero(rows: usize, col_words: usize) -> Self {
        Self {
            rows: vec![BitVector::zero(col_words); rows],
            col_words,
        }
    }

    /// All rows must be `col_words` words wide.
    pub fn from_rows(rows: Vec<BitVector>, col_words: usize) -> Self {
        rows.iter().enumerate().for_each(|(i, row)| {
            assert_eq!(
                row.word_len(),
                col_words,
                "row {} has {} words, expected {}",
                i,
                row.word_len(),
                col_words
            )
        });
        Self { rows, col_words }
    }

    pub fn identity(words: usize) -> Self {
        let mut res = Self::zero(words << 6, words);
        res.rows.iter_mut().enumerate().for_each(|(i, row)| {
            row.set(i);
        });
        res
    }

    /// Uniformly random matrix. Zero rows are allowed.
    pub fn random<R>(rows: usize, col_words: usize, rng: &mut R) -> Self
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        let rows = (0..rows)
            .map(|_| BitVector::uniform(col_words, rng))
            .collect();
        Self { rows, col_words }
    }

    /// Square random matrix with determinant 1, by rejection sampling.
    pub fn random_invertible<R>(words: usize, rng: &mut R) -> Result<Self, LinalgError>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        Self::random_invertible_with_attempts(words, DEFAULT_SAMPLING_ATTEMPTS, rng)
    }

    pub fn random_invertible_with_attempts<R>(
        words: usize,
        attempts: usize,
        rng: &mut R,
    ) -> Result<Self, LinalgError>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        for attempt in 0..attempts {
            let m = Self::random(words << 6, words, rng);
            if m.det() {
                return Ok(m);
            }
            trace!(attempt, words, "rejected singular matrix sample");
        }
        Err(LinalgError::SamplingExhausted {
            what: "invertible matrix",
            attempts,
        })
    }

    /// The matrix `T` with `T * v == v.left_shift(1)`.
    pub fn left_shift_matrix(words: usize) -> Self {
        let mut res = Self::zero(words << 6, words);
        (0..(words << 6) - 1).for_each(|i| res.set(i, i + 1));
        res
    }

    /// The matrix `T` with `T * v == v.right_shift(1)`.
    pub fn right_shift_matrix(words: usize) -> Self {
        let mut res = Self::zero(words << 6, words);
        (0..(words << 6) - 1).for_each(|i| res.set(i + 1, i));
        res
    }

    /// The matrix whose product with `v` repeats bit `col` of `v` in every position.
    pub fn column_broadcast_matrix(words: usize, col: usize) -> Self {
        let mut res = Self::zero(words << 6, words);
        res.rows.iter_mut().for_each(|row| {
            row.set(col);
        });
        res
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.col_words << 6
    }

    pub fn col_words(&self) -> usize {
        self.col_words
    }

    /// Row count in words. Panics if the row count is not a multiple of 64.
    pub fn row_words(&self) -> usize {
        assert!(
            self.row_count() % 64 == 0,
            "{} rows do not pack into whole words",
            self.row_count()
        );
        self.row_count() >> 6
    }

    pub fn is_square(&self) -> bool {
        self.row_count() == self.col_count()
    }

    pub fn rows(&self) -> &[BitVector] {
        &self.rows
    }

    pub fn get(&self, row: usize, col: usize) -> bool {
        self.check_row(row);
        self.rows[row].get(col)
    }

    pub fn set(&mut self, row: usize, col: usize) {
        self.check_row(row);
        self.rows[row].set(col);
    }

    pub fn clear(&mut self, row: usize, col: usize) {
        self.check_row(row);
        self.rows[row].clear(col);
    }

    pub fn assign(&mut self, row: usize, col: usize, bit: bool) {
        self.check_row(row);
        self.rows[row].assign(col, bit);
    }

    pub fn row(&self, i: usize) -> &BitVector {
        self.check_row(i);
        &self.rows[i]
    }

    pub fn set_row(&mut self, i: usize, v: BitVector) {
        self.check_row(i);
        assert_eq!(v.word_len(), self.col_words, "row width mismatch");
        self.rows[i] = v;
    }

    pub fn col(&self, j: usize) -> BitVector {
        let mut res = BitVector::zero(self.row_words());
        self.rows.iter().enumerate().for_each(|(i, row)| {
            res.assign(i, row.get(j));
        });
        res
    }

    pub fn set_col(&mut self, j: usize, v: &BitVector) {
        assert_eq!(v.len(), self.row_count(), "column height mismatch");
        self.rows.iter_mut().enumerate().for_each(|(i, row)| {
            row.assign(j, v.get(i));
        });
    }

    /// Overwrites rows `row_offset..row_offset + m.row_count()` with the rows of `m`.
    pub fn set_sub_matrix(&mut self, row_offset: usize, m: &BitMatrix) {
        assert_eq!(self.col_words, m.col_words, "column width mismatch");
        assert!(
            row_offset + m.row_count() <= self.row_count(),
            "sub-matrix rows {}..{} out of range for {} rows",
            row_offset,
            row_offset + m.row_count(),
            self.row_count()
        );
        self.rows[row_offset..row_offset + m.row_count()].clone_from_slice(&m.rows);
    }

    pub fn swap_rows(&mut self, i: usize, j: usize) {
        self.check_row(i);
        self.check_row(j);
        self.rows.swap(i, j);
    }

    /// Row `dst` ^= row `src`.
    pub fn add_row(&mut self, dst: usize, src: usize) {
        self.check_row(dst);
        self.check_row(src);
        assert_ne!(dst, src, "adding a row to itself");
        let (d, s) = if dst < src {
            let (lo, hi) = self.rows.split_at_mut(src);
            (&mut lo[dst], &hi[0])
        } else {
            let (lo, hi) = self.rows.split_at_mut(dst);
            (&mut hi[0], &lo[src])
        };
        xor_inplace(d.words_mut(), &[s.words()]);
    }

    /// Row `i` ^= `v`.
    pub fn xor_row(&mut self, i: usize, v: &BitVector) {
        self.check_row(i);
        self.rows[i] ^= v;
    }

    pub fn is_zero(&self) -> bool {
        self.rows.iter().all(|row| row.is_zero())
    }

    pub fn is_identity(&self) -> bool {
        self.is_square()
            && self
                .rows
                .iter()
                .enumerate()
                .all(|(i, row)| row.get(i) && row.count_ones() == 1)
    }

    /// Matrix-vector product. Bit `i` of the result is the parity of `row_i & v`.
    pub fn mul_vec(&self, v: &BitVector) -> BitVector {
        assert_eq!(
            v.len(),
            self.col_count(),
            "cannot multiply {} columns by a {}-bit vector",
            self.col_count(),
            v.len()
        );
        let mut res = BitVector::zero(self.row_words());
        self.rows.iter().enumerate().for_each(|(i, row)| {
            if row.dot(v) {
                res.set(i);
            }
        });
        res
    }

    /// `self^T * v` without materializing the transpose:
    /// the XOR of the rows selected by the set bits of `v`.
    pub fn t_mult(&self, v: &BitVector) -> BitVector {
        assert_eq!(
            v.len(),
            self.row_count(),
            "cannot multiply the transpose of {} rows by a {}-bit vector",
            self.row_count(),
            v.len()
        );
        let mut res = BitVector::zero(self.col_words);
        v.iter_ones().for_each(|i| res ^= &self.rows[i]);
        res
    }

    /// `self[:, cols] * rhs[rhs_rows, :]`.
    pub fn p_mult(&self, rhs: &BitMatrix, cols: Range<usize>, rhs_rows: Range<usize>) -> BitMatrix {
        assert_eq!(cols.len(), rhs_rows.len(), "partial product range mismatch");
        assert!(cols.end <= self.col_count(), "column range out of bound");
        assert!(rhs_rows.end <= rhs.row_count(), "row range out of bound");
        let mut res = BitMatrix::zero(self.row_count(), rhs.col_words);
        res.rows.iter_mut().zip(&self.rows).for_each(|(out, row)| {
            row.bits()[cols.clone()]
                .iter_ones()
                .for_each(|k| *out ^= &rhs.rows[rhs_rows.start + k]);
        });
        res
    }

    pub fn transpose(&self) -> BitMatrix {
        let mut res = BitMatrix::zero(self.col_count(), self.row_words());
        self.rows.iter().enumerate().for_each(|(i, row)| {
            row.iter_ones().for_each(|j| {
                res.rows[j].set(i);
            })
        });
        res
    }

    /// Forward elimination. Returns the number of pivots found.
    ///
    /// With `strict`, a column without a pivot aborts with [`LinalgError::Singular`],
    /// which keeps pivot `k` on row `k` for square matrices.
    fn eliminate<M>(&mut self, mirror: &mut M, strict: bool) -> Result<usize, LinalgError>
    where
        M: RowMirror,
    {
        let (n, m) = (self.row_count(), self.col_count());
        let mut l = 0;
        for k in 0..m {
            if l == n {
                break;
            }
            match (l..n).find(|&i| self.rows[i].get(k)) {
                Some(pos) => {
                    if pos != l {
                        self.rows.swap(pos, l);
                        mirror.swap(pos, l);
                    }
                    for i in l + 1..n {
                        if self.rows[i].get(k) {
                            self.add_row(i, l);
                            mirror.add(i, l);
                        }
                    }
                    l += 1;
                }
                None if strict => return Err(LinalgError::Singular { col: k }),
                None => {}
            }
        }
        Ok(l)
    }

    /// Row-echelon form by forward elimination only.
    pub fn rref(&self) -> BitMatrix {
        let mut res = self.clone();
        // Non-strict elimination never fails.
        let _ = res.eliminate(&mut (), false);
        res
    }

    pub fn rank(&self) -> usize {
        let mut a = self.clone();
        a.eliminate(&mut (), false).unwrap_or_default()
    }

    /// Determinant of a square matrix: the bottom-right corner of its row-echelon form.
    pub fn det(&self) -> bool {
        assert!(self.is_square(), "determinant of a non-square matrix");
        let n = self.row_count();
        n > 0 && self.rref().get(n - 1, n - 1)
    }

    pub fn inv(&self) -> Result<BitMatrix, LinalgError> {
        assert!(self.is_square(), "inverse of a non-square matrix");
        let n = self.row_count();
        let mut a = self.clone();
        let mut res = BitMatrix::identity(self.col_words);
        a.eliminate(&mut res, true)?;
        // `a` is now upper triangular with a unit diagonal.
        for k in (0..n).rev() {
            for i in 0..k {
                if a.rows[i].get(k) {
                    a.add_row(i, k);
                    res.add_row(i, k);
                }
            }
        }
        Ok(res)
    }

    /// `x` with `self * x == b`.
    pub fn solve(&self, b: &BitVector) -> Result<BitVector, LinalgError> {
        assert!(self.is_square(), "solving a non-square system");
        assert_eq!(b.len(), self.row_count(), "right-hand side height mismatch");
        let n = self.row_count();
        let mut a = self.clone();
        let mut b = b.clone();
        a.eliminate(&mut b, true)?;
        let mut x = BitVector::zero(self.col_words);
        for i in (0..n).rev() {
            // `x_i` is still 0 here, so the unit diagonal does not contribute.
            if b.get(i) ^ a.rows[i].dot(&x) {
                x.set(i);
            }
        }
        Ok(x)
    }

    /// `[a | b]`.
    pub fn aug_h(a: &BitMatrix, b: &BitMatrix) -> BitMatrix {
        Self::aug_h_all(&[a, b])
    }

    pub fn aug_h3(a: &BitMatrix, b: &BitMatrix, c: &BitMatrix) -> BitMatrix {
        Self::aug_h_all(&[a, b, c])
    }

    pub fn aug_h_all(parts: &[&BitMatrix]) -> BitMatrix {
        assert!(!parts.is_empty());
        let rows = parts[0].row_count();
        for p in parts {
            assert_eq!(p.row_count(), rows, "horizontal augmentation row mismatch");
        }
        let col_words = parts.iter().map(|p| p.col_words).sum();
        let rows = (0..rows)
            .map(|i| BitVector::vcat(&parts.iter().map(|p| &p.rows[i]).collect::<Vec<_>>()))
            .collect();
        BitMatrix { rows, col_words }
    }

    /// `[a; b]`.
    pub fn aug_v(a: &BitMatrix, b: &BitMatrix) -> BitMatrix {
        Self::aug_v_all(&[a, b])
    }

    pub fn aug_v3(a: &BitMatrix, b: &BitMatrix, c: &BitMatrix) -> BitMatrix {
        Self::aug_v_all(&[a, b, c])
    }

    pub fn aug_v_all(parts: &[&BitMatrix]) -> BitMatrix {
        assert!(!parts.is_empty());
        let col_words = parts[0].col_words;
        parts.iter().for_each(|p| {
            assert_eq!(
                p.col_words, col_words,
                "vertical augmentation column mismatch"
            )
        });
        let rows = parts.iter().flat_map(|p| p.rows.iter().cloned()).collect();
        BitMatrix { rows, col_words }
    }

    /// Row block `part` of `parts` equal blocks.
    pub fn split_v(&self, parts: usize, part: usize) -> BitMatrix {
        assert!(
            parts > 0 && self.row_count() % parts == 0,
            "cannot split {} rows into {} equal blocks",
            self.row_count(),
            parts
        );
        assert!(part < parts, "block {} out of {} blocks", part, parts);
        let sub = self.row_count() / parts;
        BitMatrix {
            rows: self.rows[part * sub..(part + 1) * sub].to_vec(),
            col_words: self.col_words,
        }
    }

    pub fn split_v_2(&self, part: usize) -> BitMatrix {
        self.split_v(2, part)
    }

    pub fn split_v_3(&self, part: usize) -> BitMatrix {
        self.split_v(3, part)
    }

    /// Column block `part` of `parts` equal blocks.
    pub fn split_h(&self, parts: usize, part: usize) -> BitMatrix {
        assert!(
            parts > 0 && self.col_words % parts == 0,
            "cannot split {} words of columns into {} equal blocks",
            self.col_words,
            parts
        );
        BitMatrix {
            rows: self.rows.iter().map(|row| row.proj(parts, part)).collect(),
            col_words: self.col_words / parts,
        }
    }

    pub fn split_h_2(&self, part: usize) -> BitMatrix {
        self.split_h(2, part)
    }

    pub fn split_h_3(&self, part: usize) -> BitMatrix {
        self.split_h(3, part)
    }

    fn check_row(&self, i: usize) {
        assert!(
            i < self.row_count(),
            "row index {} out of range for {} rows",
            i,
            self.row_count()
        );
    }
}

impl Mul<&BitMatrix> for &BitMatrix {
    type Output = BitMatrix;

    /// For every set bit `(row, col)` of `self`, XOR row `col` of `rhs` into row `row` of the result.
    fn mul(self, rhs: &BitMatrix) -> BitMatrix {
        assert_eq!(
            self.col_count(),
            rhs.row_count(),
            "cannot multiply {} columns by {} rows",
            self.col_count(),
            rhs.row_count()
        );
        let mut res = BitMatrix::zero(self.row_count(), rhs.col_words);
        let accumulate = |(out, row): (&mut BitVector, &BitVector)| {
            row.iter_ones().for_each(|col| *out ^= &rhs.rows[col]);
        };
        #[cfg(feature = "multi-thread")]
        res.rows
            .par_iter_mut()
            .zip(self.rows.par_iter())
            .for_each(accumulate);
        #[cfg(not(feature = "multi-thread"))]
        res.rows
            .iter_mut()
            .zip(self.rows.iter())
            .for_each(accumulate);
        res
    }
}

impl Mul<&BitVector> for &BitMatrix {
    type Output = BitVector;

    fn mul(self, rhs: &BitVector) -> BitVector {
        self.mul_vec(rhs)
    }
}

impl BitXor<&BitMatrix> for &BitMatrix {
    type Output = BitMatrix;

    fn bitxor(self, rhs: &BitMatrix) -> BitMatrix {
        assert_eq!(self.row_count(), rhs.row_count(), "row count mismatch");
        assert_eq!(self.col_words, rhs.col_words, "column width mismatch");
        BitMatrix {
            rows: self
                .rows
                .iter()
                .zip(&rhs.rows)
                .map(|(l, r)| l ^ r)
                .collect(),
            col_words: self.col_words,
        }
    }
}

impl fmt::Display for BitMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            writeln!(f, "{}", row)?;
        }
        Ok(())
    }
}
