//! Karp-Rabin rolling fingerprint over Mersenne-61 arithmetic.

use rand::Rng;
use rand::SeedableRng;

/// The Mersenne prime 2^61 - 1.
pub const MERSENNE61: u64 = (1u64 << 61) - 1;

#[inline(always)]
fn modulo(x: u128) -> u64 {
    let p = MERSENNE61 as u128;
    let lo = x & p;
    let hi = x >> 61;
    let mut r = lo + hi;
    if r >= p {
        r -= p;
    }
    r as u64
}

/// b^w mod p via fast exponentiation.
fn power(mut base: u64, mut exp: u64) -> u64 {
    let mut result: u64 = 1;
    base %= MERSENNE61;
    while exp > 0 {
        if exp & 1 == 1 {
            result = modulo(result as u128 * base as u128);
        }
        base = modulo(base as u128 * base as u128);
        exp >>= 1;
    }
    result
}

/// Draws a base uniformly from [1, 2^61 - 2] using a seeded, reproducible RNG.
pub fn random_base(seed: u64) -> u64 {
    let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(seed);
    rng.gen_range(1..=MERSENNE61 - 2)
}

/// A rolling Karp-Rabin hash configured with a window width and base.
#[derive(Clone, Copy, Debug)]
pub struct RollingKarpRabin {
    base: u64,
    window: usize,
    base_pow_w: u64,
}

impl RollingKarpRabin {
    pub fn new(window: usize, base: u64) -> Self {
        Self {
            base,
            window,
            base_pow_w: power(base, window as u64),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Extends the hashed suffix on the right by one byte. Does not shrink
    /// from the left; used when the hashed string is a growing prefix.
    #[inline(always)]
    pub fn push(&self, fp: u64, c: u8) -> u64 {
        modulo(self.base as u128 * fp as u128 + c as u128)
    }

    /// Slides a w-character window one position: drops `out`, pushes `in`.
    #[inline(always)]
    pub fn roll(&self, fp: u64, out: u8, new_in: u8) -> u64 {
        let advanced = modulo(self.base as u128 * fp as u128);
        let dropped = modulo(self.base_pow_w as u128 * out as u128);
        let diff = if advanced >= dropped {
            advanced - dropped
        } else {
            advanced + MERSENNE61 - dropped
        };
        modulo(diff as u128 + new_in as u128)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_then_roll_equals_direct_push() {
        let krk = RollingKarpRabin::new(4, random_base(42));
        let s = b"abcdefgh";
        // build fingerprint of s[0..4] via push
        let mut fp = 0u64;
        for &c in &s[0..4] {
            fp = krk.push(fp, c);
        }
        // roll once: drop s[0], push s[4]
        let rolled = krk.roll(fp, s[0], s[4]);

        // direct push of s[1..5]
        let mut direct = 0u64;
        for &c in &s[1..5] {
            direct = krk.push(direct, c);
        }
        assert_eq!(rolled, direct);
    }

    #[test]
    fn roll_w_times_matches_pushed_suffix() {
        let krk = RollingKarpRabin::new(5, random_base(7));
        let s = b"the quick brown fox jumps";
        let mut fp = 0u64;
        for &c in &s[0..5] {
            fp = krk.push(fp, c);
        }
        for i in 0..(s.len() - 5) {
            fp = krk.roll(fp, s[i], s[i + 5]);
        }
        let mut direct = 0u64;
        for &c in &s[s.len() - 5..] {
            direct = krk.push(direct, c);
        }
        assert_eq!(fp, direct);
    }

    #[test]
    fn distinct_strings_usually_differ() {
        let krk = RollingKarpRabin::new(3, random_base(1));
        let mut fp_abc = 0u64;
        for &c in b"abc" {
            fp_abc = krk.push(fp_abc, c);
        }
        let mut fp_abd = 0u64;
        for &c in b"abd" {
            fp_abd = krk.push(fp_abd, c);
        }
        assert_ne!(fp_abc, fp_abd);
    }
}
