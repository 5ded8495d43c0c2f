//! Two-row Count-Min sketch with a conservative-update variant, grounded on
//! `examples/original_source/include/count_min2.hpp`.

use rand::Rng;
use rand::SeedableRng;

const P1: u64 = (1u64 << 45) - 229;
const P2: u64 = (1u64 << 45) - 193;
const RANDOM_SEED: u64 = 147;

pub struct CountMin {
    table: Vec<u64>,
    q1: u64,
    q2: u64,
    num_columns: usize,
    cmask: usize,
}

impl CountMin {
    pub fn new(columns: usize) -> Self {
        let cbits = usize::BITS - (columns.saturating_sub(1)).leading_zeros();
        let num_columns = 1usize << cbits;
        let cmask = num_columns - 1;

        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(RANDOM_SEED);
        let q1: u64 = rng.gen();
        let q2: u64 = rng.gen();

        Self {
            table: vec![0u64; 2 * num_columns],
            q1,
            q2,
            num_columns,
            cmask,
        }
    }

    fn h1(&self, item: u64) -> usize {
        (((item ^ self.q1) % P1) as usize) & self.cmask
    }

    fn h2(&self, item: u64) -> usize {
        self.num_columns + ((((item ^ self.q2) % P2) as usize) & self.cmask)
    }

    /// Non-conservative increment: both counters advance unconditionally.
    pub fn increment(&mut self, item: u64, inc: u64) {
        let j1 = self.h1(item);
        let j2 = self.h2(item);
        self.table[j1] += inc;
        self.table[j2] += inc;
    }

    /// Conservative increment: only counters currently equal to the row
    /// minimum advance.
    pub fn increment_conservative(&mut self, item: u64, inc: u64) {
        let j1 = self.h1(item);
        let j2 = self.h2(item);
        let f1 = self.table[j1];
        let f2 = self.table[j2];
        let fmin = f1.min(f2);
        if f1 == fmin {
            self.table[j1] = f1 + inc;
        }
        if f2 == fmin {
            self.table[j2] = f2 + inc;
        }
    }

    /// Conservative increment-and-estimate: returns the post-update minimum.
    pub fn increment_and_estimate_conservative(&mut self, item: u64, inc: u64) -> u64 {
        let j1 = self.h1(item);
        let j2 = self.h2(item);
        let mut f1 = self.table[j1];
        let mut f2 = self.table[j2];
        let fmin = f1.min(f2);
        if f1 == fmin {
            f1 += inc;
            self.table[j1] = f1;
        }
        if f2 == fmin {
            f2 += inc;
            self.table[j2] = f2;
        }
        f1.min(f2)
    }

    pub fn estimate(&self, item: u64) -> u64 {
        self.table[self.h1(item)].min(self.table[self.h2(item)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_never_underestimates() {
        let mut cm = CountMin::new(64);
        for _ in 0..5 {
            cm.increment_and_estimate_conservative(12345, 1);
        }
        assert!(cm.estimate(12345) >= 5);
    }
}
