//! Double hashing over a single xxh3-128 digest.
use xxhash_rust::xxh3::xxh3_128;

/// Cell positions for one item, `(h1 + i*h2) mod m` for `i in 0..k`.
#[derive(Debug, Clone)]
pub struct Positions {
    h1: u128,
    h2: u128,
    m: u128,
    i: u32,
    k: u32,
}

impl Iterator for Positions {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.i >= self.k {
            return None;
        }
        let pos = (self.h1 + (self.i as u128) * self.h2) % self.m;
        self.i += 1;
        Some(pos as usize)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.k - self.i) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Positions {}

#[inline]
pub fn base_hashes(item: &[u8]) -> (u64, u64) {
    let dig = xxh3_128(item);
    (dig as u64, (dig >> 64) as u64)
}

/// An empty store (`bit_length == 0`) yields no positions.
pub fn positions(item: &[u8], hash_count: u32, bit_length: usize) -> Positions {
    let (h1, h2) = base_hashes(item);
    Positions {
        h1: h1 as u128,
        h2: h2 as u128,
        m: (bit_length as u128).max(1),
        i: 0,
        k: if bit_length == 0 { 0 } else { hash_count },
    }
}
