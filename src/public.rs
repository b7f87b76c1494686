// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2023 Yulong Ming (myl7)

//! See [`PublicKey`].

use gf2_linalg::BitVector;

use crate::bridge::{AndBundle, BinaryOp, LmmBundle, PublicBundle, XorBundle};

/// Evaluates homomorphic operators with the bundles from a [`crate::BridgeKey`] only.
///
/// Every output is a ciphertext of the same key and can be fed back into any operator.
#[derive(Debug, Clone)]
pub struct PublicKey {
    xor: XorBundle,
    and: AndBundle,
    left_shift: LmmBundle,
    right_shift: LmmBundle,
    left_column: LmmBundle,
    right_column: LmmBundle,
}

impl PublicKey {
    pub fn new(bundle: PublicBundle) -> Self {
        let PublicBundle {
            xor,
            and,
            left_shift,
            right_shift,
            left_column,
            right_column,
        } = bundle;
        Self {
            xor,
            and,
            left_shift,
            right_shift,
            left_column,
            right_column,
        }
    }

    /// Plaintext width in bits.
    pub fn bits(&self) -> usize {
        self.xor.xx.row_count() / 2
    }

    /// Multiplies the plaintext of `c` by the matrix `bundle` was derived for.
    pub fn homomorphic_lmm(&self, bundle: &LmmBundle, c: &BitVector) -> BitVector {
        bundle.eval(c)
    }

    pub fn homomorphic_xor(&self, cx: &BitVector, cy: &BitVector) -> BitVector {
        self.xor.eval(cx, cy)
    }

    pub fn homomorphic_and(&self, cx: &BitVector, cy: &BitVector) -> BitVector {
        self.and.eval(cx, cy)
    }

    /// See [`BitVector::left_shift`].
    pub fn homomorphic_left_shift(&self, c: &BitVector) -> BitVector {
        self.left_shift.eval(c)
    }

    /// See [`BitVector::right_shift`].
    pub fn homomorphic_right_shift(&self, c: &BitVector) -> BitVector {
        self.right_shift.eval(c)
    }

    /// Wrapping addition of the plaintexts as little-endian integers, bit 0 least significant.
    ///
    /// Ripple carry: after round `k` the carry has no set bit below `k + 1`,
    /// so the top bit is the only one left after `n - 1` rounds.
    pub fn homomorphic_add(&self, cx: &BitVector, cy: &BitVector) -> BitVector {
        let mut sum = cx.clone();
        let mut carry = cy.clone();
        for _ in 0..self.bits() - 1 {
            let s = self.homomorphic_xor(&sum, &carry);
            carry = self.homomorphic_right_shift(&self.homomorphic_and(&sum, &carry));
            sum = s;
        }
        self.homomorphic_xor(&sum, &carry)
    }

    /// Every bit of the result is bit 0 of the plaintext.
    pub fn homomorphic_left_column(&self, c: &BitVector) -> BitVector {
        self.left_column.eval(c)
    }

    /// Every bit of the result is the top bit of the plaintext.
    pub fn homomorphic_right_column(&self, c: &BitVector) -> BitVector {
        self.right_column.eval(c)
    }

    /// Wrapping multiplication of the plaintexts as little-endian integers.
    ///
    /// Partial product `k` is `$x_k \cdot (y \ll k)$`, with `$x_k$` broadcast by
    /// [`PublicKey::homomorphic_left_column`] from `x` shifted down `k` times.
    /// Partials are folded into a sum and a carry by full adders,
    /// and only the final sum and carry pass through [`PublicKey::homomorphic_add`].
    pub fn homomorphic_mult(&self, cx: &BitVector, cy: &BitVector) -> BitVector {
        let mut x = cx.clone();
        let mut y = cy.clone();
        let mut sum = self.homomorphic_and(&self.homomorphic_left_column(&x), &y);
        x = self.homomorphic_left_shift(&x);
        y = self.homomorphic_right_shift(&y);
        let mut carry = self.homomorphic_and(&self.homomorphic_left_column(&x), &y);
        for _ in 2..self.bits() {
            x = self.homomorphic_left_shift(&x);
            y = self.homomorphic_right_shift(&y);
            let partial = self.homomorphic_and(&self.homomorphic_left_column(&x), &y);
            let half = self.homomorphic_xor(&sum, &carry);
            let majority = self.homomorphic_xor(
                &self.homomorphic_and(&sum, &carry),
                &self.homomorphic_and(&partial, &half),
            );
            sum = self.homomorphic_xor(&half, &partial);
            carry = self.homomorphic_right_shift(&majority);
        }
        self.homomorphic_add(&sum, &carry)
    }
}
