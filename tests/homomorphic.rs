// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2023 Yulong Ming (myl7)

use std::sync::Once;

use arbtest::arbtest;
use mqhe::{BitMatrix, BitVector, BridgeKey, KeyParams, PublicKey, SecretKey};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

fn setup(seed: u64, params: KeyParams) -> (StdRng, SecretKey, PublicKey) {
    init_tracing();
    let mut rng = StdRng::seed_from_u64(seed);
    let sk = SecretKey::new_with_params(params, &mut rng).unwrap();
    let mut bk = BridgeKey::new(&sk, &mut rng).unwrap();
    let pk = PublicKey::new(bk.public_bundle(&mut rng).unwrap());
    (rng, sk, pk)
}

#[test]
fn test_xor_scenario() {
    init_tracing();
    let mut rng = StdRng::seed_from_u64(0x1011);
    let sk = SecretKey::new(1, &mut rng).unwrap();
    let m = BitVector::from_words(vec![rng.gen::<u64>() | 0b1011]);
    assert_eq!(sk.decrypt(&sk.encrypt(&m, &mut rng).unwrap()).unwrap(), m);

    let mut bk = BridgeKey::new(&sk, &mut rng).unwrap();
    let pk = PublicKey::new(bk.public_bundle(&mut rng).unwrap());
    let y = BitVector::from_words(vec![rng.gen()]);
    let cm = sk.encrypt(&m, &mut rng).unwrap();
    let cy = sk.encrypt(&y, &mut rng).unwrap();
    assert_eq!(sk.decrypt(&pk.homomorphic_xor(&cm, &cy)).unwrap(), &m ^ &y);
}

#[test]
fn test_xor_and() {
    let (mut rng, sk, pk) = setup(1, KeyParams::default());
    arbtest(|u| {
        let x = BitVector::from_words(vec![u.arbitrary()?]);
        let y = BitVector::from_words(vec![u.arbitrary()?]);
        let cx = sk.encrypt(&x, &mut rng).unwrap();
        let cy = sk.encrypt(&y, &mut rng).unwrap();
        assert_eq!(sk.decrypt(&pk.homomorphic_xor(&cx, &cy)).unwrap(), &x ^ &y);
        assert_eq!(sk.decrypt(&pk.homomorphic_and(&cx, &cy)).unwrap(), &x & &y);
        Ok(())
    })
    .budget_ms(2_000);
}

#[test]
fn test_lmm() {
    init_tracing();
    let mut rng = StdRng::seed_from_u64(2);
    let sk = SecretKey::new(1, &mut rng).unwrap();
    let mut bk = BridgeKey::new(&sk, &mut rng).unwrap();
    let pk = PublicKey::new(bk.public_bundle(&mut rng).unwrap());
    for _ in 0..4 {
        let t = BitMatrix::random(64, 1, &mut rng);
        let bundle = bk.lmm_bundle(&t);
        let x = BitVector::random(1, &mut rng).unwrap();
        let c = sk.encrypt(&x, &mut rng).unwrap();
        assert_eq!(
            sk.decrypt(&pk.homomorphic_lmm(&bundle, &c)).unwrap(),
            t.mul_vec(&x)
        );
    }
}

#[test]
fn test_shifts() {
    let (mut rng, sk, pk) = setup(3, KeyParams::default());
    let x: u64 = rng.gen();
    let m = BitVector::from_words(vec![x]);
    let c = sk.encrypt(&m, &mut rng).unwrap();
    let left = sk.decrypt(&pk.homomorphic_left_shift(&c)).unwrap();
    let right = sk.decrypt(&pk.homomorphic_right_shift(&c)).unwrap();
    assert_eq!(left.words(), &[x >> 1]);
    assert_eq!(right.words(), &[x << 1]);
}

#[test]
fn test_chained_operators() {
    let (mut rng, sk, pk) = setup(4, KeyParams::default());
    let (x, y, z): (u64, u64, u64) = rng.gen();
    let enc = |v: u64, rng: &mut StdRng| sk.encrypt(&BitVector::from_words(vec![v]), rng).unwrap();
    let (cx, cy, cz) = (enc(x, &mut rng), enc(y, &mut rng), enc(z, &mut rng));
    // ((x ^ y) & z) << 1, evaluated without decrypting in between.
    let c = pk.homomorphic_right_shift(&pk.homomorphic_and(&pk.homomorphic_xor(&cx, &cy), &cz));
    assert_eq!(sk.decrypt(&c).unwrap().words(), &[((x ^ y) & z) << 1]);
}

#[test]
fn test_add() {
    let (mut rng, sk, pk) = setup(5, KeyParams::default());
    let enc = |v: u64, rng: &mut StdRng| sk.encrypt(&BitVector::from_words(vec![v]), rng).unwrap();
    for (a, b) in [(3u64, 5u64), (u64::MAX, 1), (rng.gen(), rng.gen())] {
        let (ca, cb) = (enc(a, &mut rng), enc(b, &mut rng));
        let sum = sk.decrypt(&pk.homomorphic_add(&ca, &cb)).unwrap();
        assert_eq!(sum.words(), &[a.wrapping_add(b)], "where a={} b={}", a, b);
    }
}

#[test]
fn test_column_broadcast() {
    let (mut rng, sk, pk) = setup(8, KeyParams::default());
    let x: u64 = rng.gen::<u64>() | 1;
    let m = BitVector::from_words(vec![x]);
    let c = sk.encrypt(&m, &mut rng).unwrap();
    let low = sk.decrypt(&pk.homomorphic_left_column(&c)).unwrap();
    let high = sk.decrypt(&pk.homomorphic_right_column(&c)).unwrap();
    assert_eq!(low.words(), &[u64::MAX]);
    let expected_high = if x >> 63 == 1 { u64::MAX } else { 0 };
    assert_eq!(high.words(), &[expected_high]);
}

#[test]
fn test_mult() {
    let (mut rng, sk, pk) = setup(9, KeyParams::default());
    let enc = |v: u64, rng: &mut StdRng| sk.encrypt(&BitVector::from_words(vec![v]), rng).unwrap();
    for (a, b) in [(3u64, 5u64), (u64::MAX, 2), (rng.gen(), rng.gen())] {
        let (ca, cb) = (enc(a, &mut rng), enc(b, &mut rng));
        let prod = sk.decrypt(&pk.homomorphic_mult(&ca, &cb)).unwrap();
        assert_eq!(prod.words(), &[a.wrapping_mul(b)], "where a={} b={}", a, b);
    }
}

#[test]
fn test_wide_key_and_long_chain() {
    let params = KeyParams {
        words: 2,
        chain_len: 3,
        ..Default::default()
    };
    let (mut rng, sk, pk) = setup(6, params);
    let x = BitVector::random(2, &mut rng).unwrap();
    let y = BitVector::random(2, &mut rng).unwrap();
    let cx = sk.encrypt(&x, &mut rng).unwrap();
    let cy = sk.encrypt(&y, &mut rng).unwrap();
    assert_eq!(sk.decrypt(&pk.homomorphic_xor(&cx, &cy)).unwrap(), &x ^ &y);
    assert_eq!(sk.decrypt(&pk.homomorphic_and(&cx, &cy)).unwrap(), &x & &y);
    assert_eq!(
        sk.decrypt(&pk.homomorphic_left_shift(&cx)).unwrap(),
        x.left_shift(1)
    );
}

#[test]
fn test_sampling_cap_is_reported() {
    init_tracing();
    let mut rng = StdRng::seed_from_u64(7);
    let params = KeyParams {
        max_sampling_attempts: 1,
        ..Default::default()
    };
    // A random 64x64 matrix is singular with probability about 0.71,
    // so with a single attempt some of these seeds fail.
    let failures = (0..32)
        .filter(|_| SecretKey::new_with_params(params, &mut rng).is_err())
        .count();
    assert!(failures > 0);
}
