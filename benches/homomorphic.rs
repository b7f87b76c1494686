use criterion::{criterion_group, criterion_main, Criterion};
use rand::prelude::*;

use mqhe::{BitVector, BridgeKey, PublicKey, SecretKey};

pub fn bench_derive(c: &mut Criterion) {
    let mut rng = StdRng::from_entropy();
    let sk = SecretKey::new(1, &mut rng).unwrap();
    let mut bk = BridgeKey::new(&sk, &mut rng).unwrap();

    let mut group = c.benchmark_group("derive");
    group.sample_size(10);
    group.bench_function("xor bundle", |b| {
        b.iter(|| {
            bk.xor_bundle(&mut rng).unwrap();
        })
    });
    group.bench_function("and bundle", |b| {
        b.iter(|| {
            bk.and_bundle(&mut rng).unwrap();
        })
    });
    group.finish();
}

pub fn bench_eval(c: &mut Criterion) {
    let mut rng = StdRng::from_entropy();
    let sk = SecretKey::new(1, &mut rng).unwrap();
    let mut bk = BridgeKey::new(&sk, &mut rng).unwrap();
    let pk = PublicKey::new(bk.public_bundle(&mut rng).unwrap());
    let cx = sk
        .encrypt(&BitVector::from_words(vec![rng.gen()]), &mut rng)
        .unwrap();
    let cy = sk
        .encrypt(&BitVector::from_words(vec![rng.gen()]), &mut rng)
        .unwrap();

    c.bench_function("homomorphic xor", |b| {
        b.iter(|| {
            pk.homomorphic_xor(&cx, &cy);
        })
    });
    c.bench_function("homomorphic and", |b| {
        b.iter(|| {
            pk.homomorphic_and(&cx, &cy);
        })
    });
    c.bench_function("homomorphic left shift", |b| {
        b.iter(|| {
            pk.homomorphic_left_shift(&cx);
        })
    });

    let mut group = c.benchmark_group("arithmetic");
    group.sample_size(10);
    group.bench_function("homomorphic add", |b| {
        b.iter(|| {
            pk.homomorphic_add(&cx, &cy);
        })
    });
    group.bench_function("homomorphic mult", |b| {
        b.iter(|| {
            pk.homomorphic_mult(&cx, &cy);
        })
    });
    group.finish();
}

criterion_group!(benches, bench_derive, bench_eval);
criterion_main!(benches);
