// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2023 Yulong Ming (myl7)

//! See [`BridgeKey`].
//!
//! Notation below: `n` is the plaintext width in bits, `$M^{-1} = [M_t; M_b]$` split into halves,
//! and `$P = A^{-1} M_b$` so that `$P c = r$` for a ciphertext `c` with mask `r`.
//! Every bundle outputs a ciphertext of the same shape with a new mask.

use gf2_linalg::{BitMatrix, BitVector};
use rand::{CryptoRng, RngCore};
use tracing::{debug, info};

use crate::error::Result;
use crate::key::SecretKey;
use crate::quad::{QuadChain, QuadTuple};

/// Homomorphic operator on 2 ciphertexts.
pub trait BinaryOp {
    fn eval(&self, cx: &BitVector, cy: &BitVector) -> BitVector;
}

/// Left multiplication of the plaintext by a public matrix `T`.
///
/// `$Z [c; g(c)]$` with `$g(c) = C_u [f(r); f(R r)]$` carries the mask `$R r$`.
#[derive(Debug, Clone)]
pub struct LmmBundle {
    pub z: BitMatrix,
    pub g: QuadChain,
}

impl LmmBundle {
    pub fn eval(&self, c: &BitVector) -> BitVector {
        check_ciphertext(c, self.z.row_count());
        let g = self.g.eval(c);
        self.z.mul_vec(&BitVector::vcat2(c, &g))
    }
}

/// XOR of the plaintexts, purely linear in the ciphertexts and the chain output.
///
/// `t` evaluates to `$C_b [f(r_x); f(r_y); f(r')]$` with the new mask `$r' = R_x r_x \oplus R_y r_y$`.
#[derive(Debug, Clone)]
pub struct XorBundle {
    pub xx: BitMatrix,
    pub xy: BitMatrix,
    pub y: BitMatrix,
    pub t: QuadChain,
}

impl BinaryOp for XorBundle {
    fn eval(&self, cx: &BitVector, cy: &BitVector) -> BitVector {
        check_ciphertext(cx, self.xx.row_count());
        check_ciphertext(cy, self.xy.row_count());
        let t = self.t.eval(&BitVector::vcat2(cx, cy));
        self.xx.mul_vec(cx) ^ &self.xy.mul_vec(cy) ^ &self.y.mul_vec(&t)
    }
}

/// AND of the plaintexts.
///
/// `z` takes `$[c_x; c_y; t]$` to `$B (m_x \land m_y)$`, the linear parts add the mask and noise.
#[derive(Debug, Clone)]
pub struct AndBundle {
    pub z: QuadTuple,
    pub zx: BitMatrix,
    pub zy: BitMatrix,
    pub y: BitMatrix,
    pub t: QuadChain,
}

impl BinaryOp for AndBundle {
    fn eval(&self, cx: &BitVector, cy: &BitVector) -> BitVector {
        check_ciphertext(cx, self.zx.row_count());
        check_ciphertext(cy, self.zy.row_count());
        let t = self.t.eval(&BitVector::vcat2(cx, cy));
        let z = self.z.eval(&BitVector::vcat3(cx, cy, &t));
        self.zx.mul_vec(cx) ^ &self.zy.mul_vec(cy) ^ &self.y.mul_vec(&BitVector::vcat2(&z, &t))
    }
}

/// Everything a [`crate::PublicKey`] holds.
#[derive(Debug, Clone)]
pub struct PublicBundle {
    pub xor: XorBundle,
    pub and: AndBundle,
    pub left_shift: LmmBundle,
    pub right_shift: LmmBundle,
    pub left_column: LmmBundle,
    pub right_column: LmmBundle,
}

fn check_ciphertext(c: &BitVector, expected: usize) {
    assert_eq!(
        c.len(),
        expected,
        "ciphertext has {} bits, the bundle takes {}",
        c.len(),
        expected
    );
}

/// Invertible matrix paired with its inverse.
struct Invertible {
    m: BitMatrix,
    inv: BitMatrix,
}

impl Invertible {
    fn random<R>(words: usize, attempts: usize, rng: &mut R) -> Result<Self>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        let m = BitMatrix::random_invertible_with_attempts(words, attempts, rng)?;
        let inv = m.inv()?;
        Ok(Self { m, inv })
    }

    fn random_seq<R>(words: usize, len: usize, attempts: usize, rng: &mut R) -> Result<Vec<Self>>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        (0..len)
            .map(|_| Self::random(words, attempts, rng))
            .collect()
    }
}

/// Derives public bundles from a [`SecretKey`].
///
/// `R` and the unary obfuscation matrices `$C_{u,1..L}$` are fixed at construction.
/// `$R_x, R_y$` and the binary obfuscation matrices `$C_{b,1..L}$` are resampled by [`BridgeKey::refresh_param`]
/// before every binary derivation, so no 2 binary bundles share randomness.
pub struct BridgeKey<'a> {
    sk: &'a SecretKey,
    mi: BitMatrix,
    ai: BitMatrix,
    bi: BitMatrix,
    /// `$A^{-1} M_b$`.
    p: BitMatrix,
    r: BitMatrix,
    cu: Vec<Invertible>,
    unary: QuadChain,
    rx: BitMatrix,
    ry: BitMatrix,
    cb: Vec<Invertible>,
}

impl<'a> BridgeKey<'a> {
    pub fn new<R>(sk: &'a SecretKey, rng: &mut R) -> Result<Self>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        let params = *sk.params();
        let (words, attempts) = (params.words, params.max_sampling_attempts);
        let key = sk.material();
        let mi = key.m.inv()?;
        let ai = key.a.inv()?;
        let bi = key.b.inv()?;
        let p = &ai * &mi.split_v_2(1);
        let r = BitMatrix::random_invertible_with_attempts(words, attempts, rng)?;
        let cu = Invertible::random_seq(words * 2, params.chain_len, attempts, rng)?;
        let unary = obfuscate_chain(key.f, &[p.clone(), &r * &p], &cu);
        debug!(words, "derived unary chain");
        let (rx, ry, cb) = sample_binary(sk, rng)?;
        Ok(Self {
            sk,
            mi,
            ai,
            bi,
            p,
            r,
            cu,
            unary,
            rx,
            ry,
            cb,
        })
    }

    fn words(&self) -> usize {
        self.sk.words()
    }

    /// Resamples `$R_x, R_y$` and `$C_{b,1..L}$`.
    pub fn refresh_param<R>(&mut self, rng: &mut R) -> Result<()>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        (self.rx, self.ry, self.cb) = sample_binary(self.sk, rng)?;
        Ok(())
    }

    /// The chain `$g(c) = C_{u,L} [f(r); f(R r)]$` over one ciphertext.
    pub fn unary_chain(&self) -> &QuadChain {
        &self.unary
    }

    /// The chain `$t = C_{b,L} [f(r_x); f(r_y); f(R_x r_x \oplus R_y r_y)]$` over `$[c_x; c_y]$`
    /// for the current `$R_x, R_y$`.
    pub fn binary_chain(&self) -> QuadChain {
        let w = self.words();
        let zero = BitMatrix::zero(w << 6, w * 2);
        let pre = [
            BitMatrix::aug_h(&self.p, &zero),
            BitMatrix::aug_h(&zero, &self.p),
            BitMatrix::aug_h(&(&self.rx * &self.p), &(&self.ry * &self.p)),
        ];
        let t = obfuscate_chain(self.sk.material().f, &pre, &self.cb);
        debug!(words = w, "derived binary chain");
        t
    }

    pub fn lmm_bundle(&self, t: &BitMatrix) -> LmmBundle {
        let w = self.words();
        assert!(
            t.is_square() && t.col_words() == w,
            "LMM by a {}x{} matrix on {}-bit plaintexts",
            t.row_count(),
            t.col_count(),
            w << 6
        );
        let key = self.sk.material();
        let id = BitMatrix::identity(w);
        let zero = BitMatrix::zero(w << 6, w);
        let k = &(key.b * t) * &self.bi;
        let x = self.conjugate(&upper_block(
            &k,
            &(&(&k ^ &self.r) * &self.ai),
            &(&(key.a * &self.r) * &self.ai),
        ));
        let y = &(key.m * &upper_block(&k, &id, &zero)) * &last(&self.cu).inv;
        debug!(words = w, "derived LMM bundle");
        LmmBundle {
            z: BitMatrix::aug_h(&x, &y),
            g: self.unary.clone(),
        }
    }

    pub fn left_shift_bundle(&self) -> LmmBundle {
        self.lmm_bundle(&BitMatrix::left_shift_matrix(self.words()))
    }

    pub fn right_shift_bundle(&self) -> LmmBundle {
        self.lmm_bundle(&BitMatrix::right_shift_matrix(self.words()))
    }

    /// Copies bit 0 of the plaintext into every bit.
    pub fn left_column_bundle(&self) -> LmmBundle {
        self.lmm_bundle(&BitMatrix::column_broadcast_matrix(self.words(), 0))
    }

    /// Copies the top bit of the plaintext into every bit.
    pub fn right_column_bundle(&self) -> LmmBundle {
        let w = self.words();
        self.lmm_bundle(&BitMatrix::column_broadcast_matrix(w, (w << 6) - 1))
    }

    /// Refreshes the binary randomness, then derives a XOR bundle from it.
    pub fn xor_bundle<R>(&mut self, rng: &mut R) -> Result<XorBundle>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        self.refresh_param(rng)?;
        let w = self.words();
        let key = self.sk.material();
        let id = BitMatrix::identity(w);
        let mask_move = |rm: &BitMatrix| {
            self.conjugate(&upper_block(
                &id,
                &(&(&id ^ rm) * &self.ai),
                &(&(key.a * rm) * &self.ai),
            ))
        };
        let xx = mask_move(&self.rx);
        let xy = mask_move(&self.ry);
        let top = BitMatrix::aug_h3(&id, &id, &id);
        let y = &(key.m * &BitMatrix::aug_v(&top, &BitMatrix::zero(w << 6, w * 3)))
            * &last(&self.cb).inv;
        let t = self.binary_chain();
        debug!(words = w, "derived XOR bundle");
        Ok(XorBundle { xx, xy, y, t })
    }

    /// Refreshes the binary randomness, then derives an AND bundle from it.
    pub fn and_bundle<R>(&mut self, rng: &mut R) -> Result<AndBundle>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        self.refresh_param(rng)?;
        let w = self.words();
        let key = self.sk.material();
        let id = BitMatrix::identity(w);
        let q = &last(&self.cb).inv;
        // `$X c = m \oplus B^{-1} f(r)$`.
        let x = &(&self.bi * &BitMatrix::aug_h(&id, &self.ai)) * &self.mi;
        let zero2 = BitMatrix::zero(w << 6, w * 2);
        let a = BitMatrix::aug_h3(&x, &zero2, &(&self.bi * &q.split_v_3(0)));
        let b = BitMatrix::aug_h3(&zero2, &x, &(&self.bi * &q.split_v_3(1)));
        let z = QuadTuple::from_linear_product(&a, &b).r_mult(key.b);
        let mask = |rm: &BitMatrix| {
            let rp = rm * &self.p;
            key.m * &BitMatrix::aug_v(&rp, &(key.a * &rp))
        };
        let zx = mask(&self.rx);
        let zy = mask(&self.ry);
        let y = key.m
            * &BitMatrix::aug_v(
                &BitMatrix::aug_h(&id, &q.split_v_3(2)),
                &BitMatrix::zero(w << 6, w * 4),
            );
        let t = self.binary_chain();
        debug!(words = w, "derived AND bundle");
        Ok(AndBundle { z, zx, zy, y, t })
    }

    /// All bundles a [`crate::PublicKey`] needs, each binary one with its own randomness.
    pub fn public_bundle<R>(&mut self, rng: &mut R) -> Result<PublicBundle>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        let xor = self.xor_bundle(rng)?;
        let and = self.and_bundle(rng)?;
        let left_shift = self.left_shift_bundle();
        let right_shift = self.right_shift_bundle();
        let left_column = self.left_column_bundle();
        let right_column = self.right_column_bundle();
        info!(words = self.words(), "generated public bundle");
        Ok(PublicBundle {
            xor,
            and,
            left_shift,
            right_shift,
            left_column,
            right_column,
        })
    }

    /// `$M \cdot inner \cdot M^{-1}$`.
    fn conjugate(&self, inner: &BitMatrix) -> BitMatrix {
        &(self.sk.material().m * inner) * &self.mi
    }
}

/// Binary randomness: `$R_x, R_y, C_{b,1..L}$`.
fn sample_binary<R>(sk: &SecretKey, rng: &mut R) -> Result<(BitMatrix, BitMatrix, Vec<Invertible>)>
where
    R: RngCore + CryptoRng + ?Sized,
{
    let params = sk.params();
    let (words, attempts) = (params.words, params.max_sampling_attempts);
    let rx = BitMatrix::random_invertible_with_attempts(words, attempts, rng)?;
    let ry = BitMatrix::random_invertible_with_attempts(words, attempts, rng)?;
    let cb = Invertible::random_seq(words * 3, params.chain_len, attempts, rng)?;
    Ok((rx, ry, cb))
}

fn last(cs: &[Invertible]) -> &Invertible {
    &cs[cs.len() - 1]
}

/// `$[tl, tr; 0, br]$`.
fn upper_block(tl: &BitMatrix, tr: &BitMatrix, br: &BitMatrix) -> BitMatrix {
    let zero = BitMatrix::zero(br.row_count(), tl.col_words());
    BitMatrix::aug_v(&BitMatrix::aug_h(tl, tr), &BitMatrix::aug_h(&zero, br))
}

/// Obfuscates the secret chain `f`.
///
/// `pre` are the linear maps from the public input to the masks `f` is applied to.
/// Stage `s` applies `$f_s$` to every block of the previous stage's output and mixes the result by `$C_s$`.
fn obfuscate_chain(f: &QuadChain, pre: &[BitMatrix], cs: &[Invertible]) -> QuadChain {
    assert_eq!(f.len(), cs.len(), "one obfuscation matrix per stage");
    let k = pre.len();
    let stages = f
        .stages()
        .iter()
        .zip(cs)
        .enumerate()
        .map(|(s, (fs, c))| {
            let blocks: Vec<QuadTuple> = if s == 0 {
                pre.iter().map(|l| fs.compose(l)).collect()
            } else {
                let prev = &cs[s - 1].inv;
                (0..k).map(|i| fs.compose(&prev.split_v(k, i))).collect()
            };
            QuadTuple::aug_v_all(&blocks.iter().collect::<Vec<_>>()).r_mult(&c.m)
        })
        .collect();
    QuadChain::from_stages(stages)
}
