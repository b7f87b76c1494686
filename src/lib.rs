// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2023 Yulong Ming (myl7)

//! Encryption over GF(2) with public homomorphic XOR, AND and left matrix multiplication.
//!
//! A [`SecretKey`] hides the plaintext `m` behind invertible linear maps and a secret quadratic noise function `f`:
//! the ciphertext is `$M \cdot [B m \oplus r \oplus f(r); A r]$` for a fresh mask `r`.
//! A [`BridgeKey`] rewrites `f` into obfuscated [`QuadChain`]s and derives operator bundles,
//! which a [`PublicKey`] evaluates on ciphertexts without any secret.
//!
//! ```
//! use mqhe::{BitVector, BridgeKey, PublicKey, SecretKey};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let mut rng = StdRng::seed_from_u64(0);
//! let sk = SecretKey::new(1, &mut rng).unwrap();
//! let mut bk = BridgeKey::new(&sk, &mut rng).unwrap();
//! let pk = PublicKey::new(bk.public_bundle(&mut rng).unwrap());
//!
//! let x = BitVector::from_words(vec![0b1100]);
//! let y = BitVector::from_words(vec![0b1010]);
//! let cx = sk.encrypt(&x, &mut rng).unwrap();
//! let cy = sk.encrypt(&y, &mut rng).unwrap();
//! let c = pk.homomorphic_xor(&cx, &cy);
//! assert_eq!(sk.decrypt(&c).unwrap(), BitVector::from_words(vec![0b0110]));
//! ```

pub mod bridge;
pub mod error;
pub mod key;
pub mod public;
pub mod quad;

pub use bridge::{AndBundle, BinaryOp, BridgeKey, LmmBundle, PublicBundle, XorBundle};
pub use error::{Error, Result};
pub use gf2_linalg::{BitMatrix, BitVector, LinalgError};
pub use key::{KeyParams, SecretKey};
pub use public::PublicKey;
pub use quad::{QuadChain, QuadTuple};
