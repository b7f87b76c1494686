// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2023 Yulong Ming (myl7)

//! See [`SecretKey`].

use std::fmt;

use gf2_linalg::{BitMatrix, BitVector, DEFAULT_SAMPLING_ATTEMPTS};
use rand::{CryptoRng, RngCore};
use tracing::info;

use crate::error::{Error, Result};
use crate::quad::QuadChain;

/// Parameters of a key. Also inherited by the [`crate::BridgeKey`] derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyParams {
    /// Plaintext width in 64-bit words. Ciphertexts are twice as wide.
    pub words: usize,
    /// Number of quadratic stages of the noise function.
    pub chain_len: usize,
    /// Cap on every rejection-sampling loop run for this key.
    pub max_sampling_attempts: usize,
}

impl Default for KeyParams {
    fn default() -> Self {
        Self {
            words: 1,
            chain_len: 2,
            max_sampling_attempts: DEFAULT_SAMPLING_ATTEMPTS,
        }
    }
}

impl KeyParams {
    pub fn validate(&self) -> Result<()> {
        if self.words == 0 {
            return Err(Error::InvalidParams("words must be positive".to_owned()));
        }
        if self.chain_len == 0 {
            return Err(Error::InvalidParams(
                "chain_len must be positive".to_owned(),
            ));
        }
        if self.max_sampling_attempts == 0 {
            return Err(Error::InvalidParams(
                "max_sampling_attempts must be positive".to_owned(),
            ));
        }
        Ok(())
    }

    /// Plaintext width in bits.
    pub fn bits(&self) -> usize {
        self.words << 6
    }
}

/// Secret key of the scheme.
///
/// With plaintext `m` and a fresh random mask `r`, the ciphertext is
/// `$M \cdot [B m \oplus r \oplus f(r); A r]$`,
/// where `A`, `B` and `M` are invertible and `f` is a [`QuadChain`].
pub struct SecretKey {
    params: KeyParams,
    a: BitMatrix,
    b: BitMatrix,
    m: BitMatrix,
    f: QuadChain,
}

/// The secret values a bridge key derives its bundles from.
pub(crate) struct KeyMaterial<'a> {
    pub a: &'a BitMatrix,
    pub b: &'a BitMatrix,
    pub m: &'a BitMatrix,
    pub f: &'a QuadChain,
}

impl SecretKey {
    pub fn new<R>(words: usize, rng: &mut R) -> Result<Self>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        Self::new_with_params(
            KeyParams {
                words,
                ..Default::default()
            },
            rng,
        )
    }

    pub fn new_with_params<R>(params: KeyParams, rng: &mut R) -> Result<Self>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        params.validate()?;
        let (words, attempts) = (params.words, params.max_sampling_attempts);
        let a = BitMatrix::random_invertible_with_attempts(words, attempts, rng)?;
        let b = BitMatrix::random_invertible_with_attempts(words, attempts, rng)?;
        let m = BitMatrix::random_invertible_with_attempts(words * 2, attempts, rng)?;
        let f = QuadChain::random(words, params.chain_len, rng);
        info!(words, chain_len = params.chain_len, "generated secret key");
        Ok(Self { params, a, b, m, f })
    }

    pub fn params(&self) -> &KeyParams {
        &self.params
    }

    pub fn words(&self) -> usize {
        self.params.words
    }

    pub(crate) fn material(&self) -> KeyMaterial<'_> {
        KeyMaterial {
            a: &self.a,
            b: &self.b,
            m: &self.m,
            f: &self.f,
        }
    }

    pub fn encrypt<R>(&self, m: &BitVector, rng: &mut R) -> Result<BitVector>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        assert_eq!(
            m.len(),
            self.params.bits(),
            "plaintext has {} bits, the key takes {}",
            m.len(),
            self.params.bits()
        );
        let r = BitVector::random_with_attempts(
            self.params.words,
            self.params.max_sampling_attempts,
            rng,
        )?;
        let top = self.b.mul_vec(m) ^ &r ^ &self.f.eval(&r);
        let bottom = self.a.mul_vec(&r);
        Ok(self.m.mul_vec(&BitVector::vcat2(&top, &bottom)))
    }

    pub fn decrypt(&self, c: &BitVector) -> Result<BitVector> {
        assert_eq!(
            c.len(),
            self.params.bits() * 2,
            "ciphertext has {} bits, the key takes {}",
            c.len(),
            self.params.bits() * 2
        );
        let (x1, x2) = self.m.solve(c)?.proj2();
        let r = self.a.solve(&x2)?;
        let noise = self.f.eval(&r);
        Ok(self.b.solve(&(x1 ^ &r ^ &noise))?)
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}
