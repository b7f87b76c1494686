// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2023 Yulong Ming (myl7)

//! Tuples of multivariate quadratic polynomials over GF(2).
//!
//! A [`QuadTuple`] with `W` input bits stores one row per monomial `$x_i x_j$`, `$i \le j$`,
//! in the order given by [`monomial_index`].
//! Row `k` holds the contribution of monomial `k` to every output bit.
//! The diagonal monomials `$x_i x_i = x_i$` carry the linear terms.
//! Every constructor and composition below emits rows in exactly this order.

use std::ops::{BitXor, Mul};

use gf2_linalg::{BitMatrix, BitVector};
use rand::{CryptoRng, RngCore};
#[cfg(feature = "multi-thread")]
use rayon::prelude::*;

/// Number of monomials `$x_i x_j$`, `$i \le j$`, over `in_len` input bits.
pub fn monomial_count(in_len: usize) -> usize {
    in_len * (in_len + 1) / 2
}

/// Canonical row of the monomial `$x_i x_j$` over `in_len` input bits.
///
/// `$W(W+1)/2 - (W-i)(W-i+1)/2 + (j-i)$`, so the monomials sharing the smaller index `i` are contiguous.
pub fn monomial_index(in_len: usize, i: usize, j: usize) -> usize {
    assert!(
        i <= j && j < in_len,
        "monomial ({}, {}) out of range for {} input bits",
        i,
        j,
        in_len
    );
    monomial_count(in_len) - monomial_count(in_len - i) + (j - i)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuadTuple {
    in_words: usize,
    /// `monomial_count(64 * in_words)` rows, one output word count wide.
    contrib: BitMatrix,
    constants: BitVector,
}

impl QuadTuple {
    pub fn zero(in_words: usize, out_words: usize) -> Self {
        Self {
            in_words,
            contrib: BitMatrix::zero(monomial_count(in_words << 6), out_words),
            constants: BitVector::zero(out_words),
        }
    }

    pub fn random<R>(in_words: usize, out_words: usize, rng: &mut R) -> Self
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        Self {
            in_words,
            contrib: BitMatrix::random(monomial_count(in_words << 6), out_words, rng),
            constants: BitVector::uniform(out_words, rng),
        }
    }

    /// Embeds the linear map `m` (output bits by input bits) into the diagonal monomials.
    pub fn from_linear(m: &BitMatrix) -> Self {
        let in_words = m.col_words();
        let w = in_words << 6;
        let mt = m.transpose();
        let mut res = Self::zero(in_words, m.row_words());
        mt.rows().iter().enumerate().for_each(|(i, row)| {
            res.contrib.set_row(monomial_index(w, i, i), row.clone());
        });
        res
    }

    /// The tuple whose output `k` is `$(a_k \cdot x)(b_k \cdot x)$`.
    ///
    /// `a` and `b` must have the same shape.
    pub fn from_linear_product(a: &BitMatrix, b: &BitMatrix) -> Self {
        assert_eq!(a.row_count(), b.row_count(), "factor row count mismatch");
        assert_eq!(a.col_words(), b.col_words(), "factor column width mismatch");
        let in_words = a.col_words();
        let w = in_words << 6;
        let (at, bt) = (a.transpose(), b.transpose());
        let (at, bt) = (at.rows(), bt.rows());
        // Rows of the monomials `(i, i..w)`.
        let block = |i: usize| -> Vec<BitVector> {
            (i..w)
                .map(|j| {
                    if i == j {
                        &at[i] & &bt[i]
                    } else {
                        (&at[i] & &bt[j]) ^ (&at[j] & &bt[i])
                    }
                })
                .collect()
        };
        #[cfg(feature = "multi-thread")]
        let blocks: Vec<Vec<BitVector>> = (0..w).into_par_iter().map(block).collect();
        #[cfg(not(feature = "multi-thread"))]
        let blocks: Vec<Vec<BitVector>> = (0..w).map(block).collect();
        Self {
            in_words,
            contrib: BitMatrix::from_rows(blocks.into_iter().flatten().collect(), a.row_words()),
            constants: BitVector::zero(a.row_words()),
        }
    }

    pub fn in_words(&self) -> usize {
        self.in_words
    }

    pub fn out_words(&self) -> usize {
        self.contrib.col_words()
    }

    pub fn in_len(&self) -> usize {
        self.in_words << 6
    }

    pub fn out_len(&self) -> usize {
        self.contrib.col_count()
    }

    pub fn contributions(&self) -> &BitMatrix {
        &self.contrib
    }

    pub fn constants(&self) -> &BitVector {
        &self.constants
    }

    pub fn with_constants(mut self, constants: BitVector) -> Self {
        assert_eq!(
            constants.len(),
            self.out_len(),
            "constant width {} does not match {} outputs",
            constants.len(),
            self.out_len()
        );
        self.constants = constants;
        self
    }

    pub fn eval(&self, x: &BitVector) -> BitVector {
        assert_eq!(
            x.len(),
            self.in_len(),
            "cannot evaluate {} inputs on a {}-bit vector",
            self.in_len(),
            x.len()
        );
        let w = self.in_len();
        let ones: Vec<usize> = x.iter_ones().collect();
        let rows = self.contrib.rows();
        let mut res = self.constants.clone();
        for (k, &i) in ones.iter().enumerate() {
            let base = monomial_index(w, i, i) - i;
            for &j in &ones[k..] {
                res ^= &rows[base + j];
            }
        }
        res
    }

    /// Left composition: the tuple `$x \mapsto f(C x)$`.
    ///
    /// `c` has one row per input bit of `self`. The result takes `c.col_count()` input bits.
    pub fn compose(&self, c: &BitMatrix) -> QuadTuple {
        let w = self.in_len();
        assert_eq!(
            c.row_count(),
            w,
            "cannot compose {} inputs with a map of {} outputs",
            w,
            c.row_count()
        );
        let new_words = c.col_words();
        let nw = new_words << 6;
        let ct = c.transpose();
        // Row `b` of the block `i` is the sum over `j >= i` of `C[j][b]` times the row of `(i, j)`,
        // i.e. `$\sum_{j \ge i} y_j f_{ij}$` expanded over the new inputs `$y = C x$`.
        let partial = |i: usize| {
            let start = monomial_index(w, i, i);
            ct.p_mult(&self.contrib, i..w, start..start + w - i)
        };
        #[cfg(feature = "multi-thread")]
        let partials: Vec<BitMatrix> = (0..w).into_par_iter().map(partial).collect();
        #[cfg(not(feature = "multi-thread"))]
        let partials: Vec<BitMatrix> = (0..w).map(partial).collect();

        let mut contrib = BitMatrix::zero(monomial_count(nw), self.out_words());
        for (i, d) in partials.iter().enumerate() {
            for a in c.row(i).iter_ones() {
                for (b, row) in d.rows().iter().enumerate() {
                    if row.is_zero() {
                        continue;
                    }
                    contrib.xor_row(monomial_index(nw, a.min(b), a.max(b)), row);
                }
            }
        }
        QuadTuple {
            in_words: new_words,
            contrib,
            constants: self.constants.clone(),
        }
    }

    /// Right composition: the tuple `$x \mapsto D f(x)$`.
    pub fn r_mult(&self, d: &BitMatrix) -> QuadTuple {
        assert_eq!(
            d.col_count(),
            self.out_len(),
            "cannot apply a map of {} inputs to {} outputs",
            d.col_count(),
            self.out_len()
        );
        QuadTuple {
            in_words: self.in_words,
            contrib: &self.contrib * &d.transpose(),
            constants: d.mul_vec(&self.constants),
        }
    }

    /// The tuple whose output is `vcat(a(x), b(x))`.
    pub fn aug_v(a: &QuadTuple, b: &QuadTuple) -> QuadTuple {
        Self::aug_v_all(&[a, b])
    }

    pub fn aug_v3(a: &QuadTuple, b: &QuadTuple, c: &QuadTuple) -> QuadTuple {
        Self::aug_v_all(&[a, b, c])
    }

    pub fn aug_v_all(parts: &[&QuadTuple]) -> QuadTuple {
        assert!(!parts.is_empty());
        let in_words = parts[0].in_words;
        for p in parts {
            assert_eq!(p.in_words, in_words, "augmented tuples differ in inputs");
        }
        let contribs: Vec<_> = parts.iter().map(|p| &p.contrib).collect();
        let constants: Vec<_> = parts.iter().map(|p| &p.constants).collect();
        QuadTuple {
            in_words,
            contrib: BitMatrix::aug_h_all(&contribs),
            constants: BitVector::vcat(&constants),
        }
    }
}

impl Mul<&BitMatrix> for &QuadTuple {
    type Output = QuadTuple;

    fn mul(self, rhs: &BitMatrix) -> QuadTuple {
        self.compose(rhs)
    }
}

impl BitXor<&QuadTuple> for &QuadTuple {
    type Output = QuadTuple;

    fn bitxor(self, rhs: &QuadTuple) -> QuadTuple {
        assert_eq!(self.in_words, rhs.in_words, "input width mismatch");
        QuadTuple {
            in_words: self.in_words,
            contrib: &self.contrib ^ &rhs.contrib,
            constants: &self.constants ^ &rhs.constants,
        }
    }
}

/// Sequential composition of quadratic tuples: stage `k + 1` consumes the output of stage `k`.
///
/// Used both for the secret noise function and for its obfuscated public counterparts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuadChain {
    stages: Vec<QuadTuple>,
}

impl QuadChain {
    pub fn from_stages(stages: Vec<QuadTuple>) -> Self {
        assert!(!stages.is_empty(), "empty chain");
        stages.windows(2).for_each(|w| {
            assert_eq!(
                w[0].out_words(),
                w[1].in_words(),
                "chain stage outputs {} words but the next takes {}",
                w[0].out_words(),
                w[1].in_words()
            )
        });
        Self { stages }
    }

    /// `len` random `words -> words` stages.
    pub fn random<R>(words: usize, len: usize, rng: &mut R) -> Self
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        let stages = (0..len)
            .map(|_| QuadTuple::random(words, words, rng))
            .collect();
        Self::from_stages(stages)
    }

    pub fn stages(&self) -> &[QuadTuple] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn in_words(&self) -> usize {
        self.stages[0].in_words()
    }

    pub fn out_words(&self) -> usize {
        self.stages[self.stages.len() - 1].out_words()
    }

    pub fn eval(&self, x: &BitVector) -> BitVector {
        self.stages
            .iter()
            .fold(x.clone(), |acc, stage| stage.eval(&acc))
    }
}

#[cfg(test)]
mod tests {
    use arbtest::arbtest;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    /// Evaluates `f` straight from its definition.
    fn eval_naive(f: &QuadTuple, x: &BitVector) -> BitVector {
        let w = f.in_len();
        let mut res = f.constants().clone();
        for i in 0..w {
            for j in i..w {
                if x.get(i) && x.get(j) {
                    res ^= f.contributions().row(monomial_index(w, i, j));
                }
            }
        }
        res
    }

    #[test]
    fn test_monomial_index_enumerates_rows() {
        for w in [1, 2, 5, 64, 128] {
            let mut k = 0;
            for i in 0..w {
                for j in i..w {
                    assert_eq!(monomial_index(w, i, j), k, "where w={} i={} j={}", w, i, j);
                    k += 1;
                }
            }
            assert_eq!(k, monomial_count(w));
        }
    }

    #[test]
    fn test_eval_matches_definition() {
        arbtest(|u| {
            let mut rng = StdRng::seed_from_u64(u.arbitrary()?);
            let f = QuadTuple::random(1, 2, &mut rng);
            let x = BitVector::random(1, &mut rng).unwrap();
            assert_eq!(f.eval(&x), eval_naive(&f, &x));
            Ok(())
        });
    }

    #[test]
    fn test_eval_zero_input_is_constant() {
        let mut rng = StdRng::seed_from_u64(0);
        let f = QuadTuple::random(2, 1, &mut rng);
        assert_eq!(&f.eval(&BitVector::zero(2)), f.constants());
        assert!(QuadTuple::zero(1, 1).eval(&BitVector::zero(1)).is_zero());
    }

    #[test]
    fn test_left_composition() {
        arbtest(|u| {
            let mut rng = StdRng::seed_from_u64(u.arbitrary()?);
            let new_words = u.int_in_range(1..=2)?;
            let f = QuadTuple::random(1, 1, &mut rng);
            let c = BitMatrix::random(64, new_words, &mut rng);
            let g = &f * &c;
            assert_eq!(g.in_words(), new_words);
            for _ in 0..4 {
                let x = BitVector::random(new_words, &mut rng).unwrap();
                assert_eq!(g.eval(&x), f.eval(&c.mul_vec(&x)));
            }
            Ok(())
        });
    }

    #[test]
    fn test_left_composition_with_wide_input() {
        let mut rng = StdRng::seed_from_u64(1);
        let f = QuadTuple::random(2, 1, &mut rng);
        let c = BitMatrix::random(128, 1, &mut rng);
        let g = f.compose(&c);
        let x = BitVector::random(1, &mut rng).unwrap();
        assert_eq!(g.eval(&x), f.eval(&c.mul_vec(&x)));
    }

    #[test]
    fn test_right_composition() {
        arbtest(|u| {
            let mut rng = StdRng::seed_from_u64(u.arbitrary()?);
            let out_words = u.int_in_range(1..=3)?;
            let f = QuadTuple::random(1, 2, &mut rng);
            let d = BitMatrix::random(out_words << 6, 2, &mut rng);
            let g = f.r_mult(&d);
            assert_eq!(g.out_words(), out_words);
            let x = BitVector::random(1, &mut rng).unwrap();
            assert_eq!(g.eval(&x), d.mul_vec(&f.eval(&x)));
            Ok(())
        });
    }

    #[test]
    fn test_aug_v() {
        arbtest(|u| {
            let mut rng = StdRng::seed_from_u64(u.arbitrary()?);
            let f1 = QuadTuple::random(1, 1, &mut rng);
            let f2 = QuadTuple::random(1, 2, &mut rng);
            let f3 = QuadTuple::random(1, 1, &mut rng);
            let x = BitVector::random(1, &mut rng).unwrap();
            assert_eq!(
                QuadTuple::aug_v(&f1, &f2).eval(&x),
                BitVector::vcat2(&f1.eval(&x), &f2.eval(&x))
            );
            assert_eq!(
                QuadTuple::aug_v3(&f1, &f2, &f3).eval(&x),
                BitVector::vcat3(&f1.eval(&x), &f2.eval(&x), &f3.eval(&x))
            );
            Ok(())
        });
    }

    #[test]
    fn test_xor() {
        let mut rng = StdRng::seed_from_u64(2);
        let f = QuadTuple::random(1, 1, &mut rng);
        let g = QuadTuple::random(1, 1, &mut rng);
        let x = BitVector::random(1, &mut rng).unwrap();
        assert_eq!((&f ^ &g).eval(&x), &f.eval(&x) ^ &g.eval(&x));
        assert_eq!(&f ^ &f, QuadTuple::zero(1, 1));
    }

    #[test]
    fn test_from_linear() {
        arbtest(|u| {
            let mut rng = StdRng::seed_from_u64(u.arbitrary()?);
            let m = BitMatrix::random(128, 1, &mut rng);
            let f = QuadTuple::from_linear(&m);
            assert_eq!(f.in_words(), 1);
            assert_eq!(f.out_words(), 2);
            let x = BitVector::random(1, &mut rng).unwrap();
            assert_eq!(f.eval(&x), m.mul_vec(&x));
            Ok(())
        });
    }

    #[test]
    fn test_from_linear_product() {
        arbtest(|u| {
            let mut rng = StdRng::seed_from_u64(u.arbitrary()?);
            let a = BitMatrix::random(64, 2, &mut rng);
            let b = BitMatrix::random(64, 2, &mut rng);
            let f = QuadTuple::from_linear_product(&a, &b);
            let x = BitVector::random(2, &mut rng).unwrap();
            assert_eq!(f.eval(&x), &a.mul_vec(&x) & &b.mul_vec(&x));
            Ok(())
        });
    }

    #[test]
    fn test_composition_keeps_constants() {
        let mut rng = StdRng::seed_from_u64(3);
        let f = QuadTuple::random(1, 1, &mut rng);
        let c = BitMatrix::random(64, 2, &mut rng);
        assert_eq!(f.compose(&c).constants(), f.constants());
        let k = BitVector::random(1, &mut rng).unwrap();
        let g = f.clone().with_constants(k.clone());
        assert_eq!(g.eval(&BitVector::zero(1)), k);
    }

    #[test]
    fn test_chain() {
        let mut rng = StdRng::seed_from_u64(4);
        let chain = QuadChain::random(1, 3, &mut rng);
        assert_eq!(chain.len(), 3);
        let x = BitVector::random(1, &mut rng).unwrap();
        let expected = chain
            .stages()
            .iter()
            .fold(x.clone(), |acc, f| eval_naive(f, &acc));
        assert_eq!(chain.eval(&x), expected);
    }

    #[test]
    #[should_panic(expected = "chain stage outputs")]
    fn test_chain_shape_mismatch() {
        QuadChain::from_stages(vec![QuadTuple::zero(1, 2), QuadTuple::zero(1, 1)]);
    }
}
