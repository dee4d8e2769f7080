//! Common test fixtures for gcsvfs testing

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const KIB: usize = 1024;
pub const MIB: usize = 1024 * 1024;

/// Deterministic content where every offset is distinguishable within 251 bytes
pub fn patterned_content(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Seeded random content
pub fn random_content(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = vec![0u8; len];
    rng.fill(data.as_mut_slice());
    data
}

/// Contiguous `(offset, length)` requests covering `[0, len)` with sizes in
/// `1..=max_chunk`, in order
pub fn sequential_read_plan(len: u64, max_chunk: u64, seed: u64) -> Vec<(u64, u64)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut plan = Vec::new();
    let mut offset = 0;

    while offset < len {
        let chunk = rng.gen_range(1..=max_chunk).min(len - offset);
        plan.push((offset, chunk));
        offset += chunk;
    }

    plan
}

/// The same requests as [`sequential_read_plan`], issued in shuffled order
pub fn shuffled_read_plan(len: u64, max_chunk: u64, seed: u64) -> Vec<(u64, u64)> {
    let mut plan = sequential_read_plan(len, max_chunk, seed);
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(1));

    // Fisher-Yates
    for i in (1..plan.len()).rev() {
        let j = rng.gen_range(0..=i);
        plan.swap(i, j);
    }

    plan
}
