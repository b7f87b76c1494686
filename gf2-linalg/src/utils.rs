// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2023 Yulong Ming (myl7)

//! Word-level XOR over packed GF(2) data.

pub fn xor(xs: &[&[u64]]) -> Vec<u64> {
    assert!(!xs.is_empty());
    let mut res = vec![0; xs[0].len()];
    xor_inplace(&mut res, xs);
    res
}

pub fn xor_inplace(lhs: &mut [u64], rhss: &[&[u64]]) {
    rhss.iter().fold(lhs, |lhs, &rhs| {
        assert_eq!(lhs.len(), rhs.len());
        // 4 words per step, one AVX2 register.
        let mut lhs_chunks = lhs.chunks_exact_mut(4);
        let mut rhs_chunks = rhs.chunks_exact(4);
        lhs_chunks
            .by_ref()
            .zip(rhs_chunks.by_ref())
            .for_each(|(l, r)| {
                l[0] ^= r[0];
                l[1] ^= r[1];
                l[2] ^= r[2];
                l[3] ^= r[3];
            });
        lhs_chunks
            .into_remainder()
            .iter_mut()
            .zip(rhs_chunks.remainder())
            .for_each(|(l, r)| *l ^= r);
        lhs
    });
}

/// AND-accumulate then fold: the GF(2) inner product of two word slices.
pub fn and_parity(lhs: &[u64], rhs: &[u64]) -> bool {
    assert_eq!(lhs.len(), rhs.len());
    let acc = lhs.iter().zip(rhs).fold(0u64, |acc, (l, r)| acc ^ (l & r));
    acc.count_ones() & 1 == 1
}
