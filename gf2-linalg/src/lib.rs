// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2023 Yulong Ming (myl7)

//! Dense linear algebra over GF(2).
//!
//! Widths are counted in 64-bit words and checked at runtime:
//! a [`BitVector`] of `words` words has `64 * words` bits,
//! and a [`BitMatrix`] carries the word count of its rows.
//! Mismatched dimensions are programming errors and panic.
//! Singular input to [`BitMatrix::inv`]/[`BitMatrix::solve`] and exhausted rejection sampling are reported as [`LinalgError`].

use thiserror::Error;

pub mod matrix;
pub mod utils;
pub mod vector;

pub use matrix::BitMatrix;
pub use vector::BitVector;

/// How many samples the random constructors draw before giving up.
///
/// A uniformly random square matrix over GF(2) is invertible with probability about 0.289,
/// so 64 attempts fail with probability below `$2^{-31}$`.
pub const DEFAULT_SAMPLING_ATTEMPTS: usize = 64;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinalgError {
    /// Gaussian elimination found no pivot in column `col`.
    #[error("matrix is singular: no pivot in column {col}")]
    Singular { col: usize },
    #[error("no acceptable {what} after {attempts} sampling attempts")]
    SamplingExhausted { what: &'static str, attempts: usize },
}

/// Generator whose every output is 0, to drive the rejection paths.
#[cfg(test)]
pub(crate) struct ZeroRng;

#[cfg(test)]
impl rand::RngCore for ZeroRng {
    fn next_u32(&mut self) -> u32 {
        0
    }

    fn next_u64(&mut self) -> u64 {
        0
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        dest.fill(0);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        dest.fill(0);
        Ok(())
    }
}

#[cfg(test)]
impl rand::CryptoRng for ZeroRng {}
