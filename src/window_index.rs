//! Reversed-window suffix array / inverse suffix array / LCP array / RMQ,
//! supporting "longest common extension to the nearest marked position"
//! queries in O(1) amortized per marked-position change, plus a forward
//! prefix-fingerprint array for O(1) substring fingerprints. Grounded on
//! `examples/original_source/include/alx_rmq.hpp`'s `rmq_nlgn` sparse table
//! (built here without OpenMP, since this crate is single-threaded
//! cooperative) plus `lzend_kk_parser.hpp`'s `windex.mark`/`marked_lcp`/
//! `marked_lcp2`/`reverse_fingerprint` calls, which key the marked set by
//! phrase identity rather than by raw text position.

use std::collections::BTreeMap;

use crate::rolling_hash::{random_base, RollingKarpRabin};

/// Fixed internal seed for the window's substring-fingerprint hasher. Only
/// used to compare window substrings against phrase hashes computed with the
/// same hasher, never across processes, so a fixed seed keeps repeated runs
/// over the same input deterministic.
const WINDOW_FP_SEED: u64 = 0x7769_6e64_6578_6670;

/// Suffix array built by the doubling/rank-sort algorithm (`O(n log n)`,
/// adequate at the window sizes this crate targets; no external crate
/// needed).
fn build_suffix_array(text: &[u8]) -> Vec<u32> {
    let n = text.len();
    let mut sa: Vec<u32> = (0..n as u32).collect();
    let mut rank: Vec<i64> = text.iter().map(|&b| b as i64).collect();
    let mut tmp = vec![0i64; n];

    let mut k = 1usize;
    while k < n {
        let rank_at = |i: usize| -> i64 {
            if i < n {
                rank[i]
            } else {
                -1
            }
        };
        let key = |i: u32| -> (i64, i64) {
            let i = i as usize;
            (rank_at(i), rank_at(i + k))
        };
        sa.sort_by(|&a, &b| key(a).cmp(&key(b)));

        tmp[sa[0] as usize] = 0;
        for i in 1..n {
            tmp[sa[i] as usize] = tmp[sa[i - 1] as usize]
                + if key(sa[i - 1]) < key(sa[i]) { 1 } else { 0 };
        }
        rank.copy_from_slice(&tmp);

        if rank[sa[n - 1] as usize] == (n as i64 - 1) {
            break;
        }
        k *= 2;
    }
    sa
}

fn build_inverse(sa: &[u32]) -> Vec<u32> {
    let mut isa = vec![0u32; sa.len()];
    for (i, &s) in sa.iter().enumerate() {
        isa[s as usize] = i as u32;
    }
    isa
}

/// Kasai's O(n) LCP array construction from the suffix array and its
/// inverse. `lcp[i]` is the longest common prefix of `sa[i-1]` and `sa[i]`
/// (`lcp[0]` is unused/zero).
fn build_lcp(text: &[u8], sa: &[u32], isa: &[u32]) -> Vec<u32> {
    let n = text.len();
    let mut lcp = vec![0u32; n];
    let mut h = 0u32;
    for i in 0..n {
        let r = isa[i] as usize;
        if r > 0 {
            let j = sa[r - 1] as usize;
            while i + h as usize < n && j + h as usize < n && text[i + h as usize] == text[j + h as usize] {
                h += 1;
            }
            lcp[r] = h;
            if h > 0 {
                h -= 1;
            }
        } else {
            h = 0;
        }
    }
    lcp
}

/// Sparse-table range-minimum query, grounded on `alx_rmq.hpp`'s
/// `rmq_nlgn`: `table[k][i]` holds the index of the minimum over
/// `[i, i + 2^k)`.
struct SparseRmq {
    table: Vec<Vec<u32>>,
    log_table: Vec<u32>,
}

impl SparseRmq {
    fn build(values: &[u32]) -> Self {
        let n = values.len();
        let mut log_table = vec![0u32; n + 1];
        for i in 2..=n {
            log_table[i] = log_table[i / 2] + 1;
        }
        let klevels = if n == 0 { 1 } else { (log_table[n] + 1) as usize };
        let mut table = vec![vec![0u32; n]; klevels];
        for i in 0..n {
            table[0][i] = i as u32;
        }
        let mut k = 1;
        while (1 << k) <= n {
            let half = 1usize << (k - 1);
            let mut i = 0;
            while i + (1 << k) <= n {
                let left = table[k - 1][i];
                let right = table[k - 1][i + half];
                table[k][i] = if values[left as usize] <= values[right as usize] {
                    left
                } else {
                    right
                };
                i += 1;
            }
            k += 1;
        }
        Self { table, log_table }
    }

    /// Index of the minimum value in `values[l..=r]` (inclusive).
    fn query(&self, values: &[u32], l: usize, r: usize) -> u32 {
        debug_assert!(l <= r);
        let k = self.log_table[r - l + 1] as usize;
        let a = self.table[k][l];
        let b = self.table[k][r + 1 - (1 << k)];
        if values[a as usize] <= values[b as usize] {
            a
        } else {
            b
        }
    }
}

/// Index over a reversed sliding window: suffix array, ISA, LCP array, RMQ
/// over the LCP array, a forward prefix-fingerprint array, and a set of
/// "marked" suffix-array positions (keyed by the phrase ending there, per
/// the data model's "ordered set of (SA-position, phrase-number) pairs")
/// supporting LCE-to-nearest-marked queries.
pub struct WindowIndex {
    text: Vec<u8>,
    sa: Vec<u32>,
    isa: Vec<u32>,
    lcp: Vec<u32>,
    rmq: SparseRmq,
    /// SA rank -> phrase id whose boundary is marked there.
    marked: BTreeMap<u32, u32>,
    /// Forward (unreversed) prefix fingerprints: `pfp[i]` is the hash of
    /// `window[0..i]`. Supports O(1) fingerprints of arbitrary substrings,
    /// the same trick `phrase_hashes_` relies on in the original parser.
    pfp: Vec<u64>,
    /// Prefix fingerprints over `text` (the reversed window): `rpfp[i]` is
    /// the hash of `text[0..i]`. Lets `reverse_fingerprint` answer, in O(1),
    /// the same Horner-order fingerprint the reverse-phrase trie computes
    /// over a phrase's reversed spelling (last character first), so the two
    /// structures' fingerprints are directly comparable when built with the
    /// same hasher.
    rpfp: Vec<u64>,
    base_pow: Vec<u64>,
    hasher: RollingKarpRabin,
}

impl WindowIndex {
    /// Builds the index over `window`. The suffix/LCP/RMQ machinery is built
    /// over `window` reversed (matching the LZ-End parser's convention of
    /// indexing the window back-to-front so that "extend leftwards"
    /// corresponds to "append" in suffix-array terms); the fingerprint array
    /// is kept in forward order since it is queried by forward positions.
    pub fn build(window: &[u8]) -> Self {
        Self::build_with_hasher(window, RollingKarpRabin::new(window.len().max(1), random_base(WINDOW_FP_SEED)))
    }

    /// Like `build`, but with a caller-supplied fingerprint hasher — needed
    /// so the window's substring fingerprints compare equal to phrase
    /// fingerprints computed by a `RevPhraseTrie` sharing the same hasher.
    pub fn build_with_hasher(window: &[u8], hasher: RollingKarpRabin) -> Self {
        let text: Vec<u8> = window.iter().rev().copied().collect();
        let sa = build_suffix_array(&text);
        let isa = build_inverse(&sa);
        let lcp = build_lcp(&text, &sa, &isa);
        let rmq = SparseRmq::build(&lcp);

        let mut pfp = Vec::with_capacity(window.len() + 1);
        pfp.push(0u64);
        for &c in window {
            pfp.push(hasher.push(*pfp.last().unwrap(), c));
        }
        let mut rpfp = Vec::with_capacity(text.len() + 1);
        rpfp.push(0u64);
        for &c in &text {
            rpfp.push(hasher.push(*rpfp.last().unwrap(), c));
        }
        // base_pow[i] = base^i mod p, built iteratively rather than via a
        // second power routine: base_pow[i] = base_pow[i-1] * base mod p.
        let base = hasher_base(&hasher);
        let mut base_pow = Vec::with_capacity(window.len() + 1);
        base_pow.push(1u64);
        for i in 1..=window.len() {
            base_pow.push(mulmod(base_pow[i - 1], base));
        }

        Self {
            text,
            sa,
            isa,
            lcp,
            rmq,
            marked: BTreeMap::new(),
            pfp,
            rpfp,
            base_pow,
            hasher,
        }
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Converts a forward (left-to-right) window offset into the
    /// corresponding index into the reversed text the SA/LCP/RMQ structures
    /// are built over.
    pub fn pos_to_reverse(&self, forward_pos: u32) -> u32 {
        self.text.len() as u32 - 1 - forward_pos
    }

    pub fn sa_rank_rev(&self, reversed_pos: u32) -> u32 {
        self.isa[reversed_pos as usize]
    }

    /// Fingerprint of `window[from..=to]` (inclusive, forward order), via the
    /// prefix-fingerprint array's standard subtraction trick.
    pub fn fingerprint(&self, from: u32, to: u32) -> u64 {
        debug_assert!(from <= to);
        Self::subrange_fingerprint(&self.pfp, &self.base_pow, from as usize, to as usize + 1)
    }

    /// Fingerprint of `window[from..=to]` read back-to-front (last character
    /// first) — the Horner order `RevPhraseTrie`'s `PhraseBytes::extract`
    /// spells a phrase's content in, so a trie candidate's fingerprint and a
    /// window substring's `reverse_fingerprint` are directly comparable when
    /// both were built from the same hasher. Computed as a forward
    /// subtraction-trick query over `rpfp`, the prefix array built over
    /// `text` (`window` reversed): `window[from..=to]` reversed equals
    /// `text[pos_to_reverse(to)..=pos_to_reverse(from)]` forward.
    pub fn reverse_fingerprint(&self, from: u32, to: u32) -> u64 {
        debug_assert!(from <= to);
        let a = self.pos_to_reverse(to) as usize;
        let b = self.pos_to_reverse(from) as usize + 1;
        Self::subrange_fingerprint(&self.rpfp, &self.base_pow, a, b)
    }

    fn subrange_fingerprint(prefix: &[u64], base_pow: &[u64], a: usize, b: usize) -> u64 {
        let whole = prefix[b];
        let scaled = mulmod(prefix[a], base_pow[b - a]);
        if whole >= scaled {
            whole - scaled
        } else {
            whole + crate::rolling_hash::MERSENNE61 - scaled
        }
    }

    /// Longest common prefix between two suffixes given by SA rank.
    fn lcp_between_ranks(&self, r1: u32, r2: u32) -> u32 {
        if r1 == r2 {
            return (self.text.len() as u32) - self.sa[r1 as usize];
        }
        let (lo, hi) = if r1 < r2 { (r1, r2) } else { (r2, r1) };
        let idx = self.rmq.query(&self.lcp, lo as usize + 1, hi as usize);
        self.lcp[idx as usize]
    }

    /// Marks the phrase boundary at forward window offset `forward_pos` as
    /// belonging to `phrase_id`.
    pub fn mark(&mut self, forward_pos: u32, phrase_id: u32) {
        let rank = self.sa_rank_rev(self.pos_to_reverse(forward_pos));
        self.marked.insert(rank, phrase_id);
    }

    pub fn unmark(&mut self, forward_pos: u32) {
        let rank = self.sa_rank_rev(self.pos_to_reverse(forward_pos));
        self.marked.remove(&rank);
    }

    pub fn clear_marked(&mut self) {
        self.marked.clear();
    }

    pub fn is_marked(&self, forward_pos: u32) -> bool {
        let rank = self.sa_rank_rev(self.pos_to_reverse(forward_pos));
        self.marked.contains_key(&rank)
    }

    /// The longest common extension between the suffix ending at forward
    /// offset `forward_pos` and the nearest marked suffix-array position (in
    /// SA order, searching both neighbors and taking the larger LCP). Returns
    /// `(phrase_id, lcp)` — a phrase identity, not a raw text position — or
    /// `None` if nothing is marked.
    pub fn marked_lcp(&self, forward_pos: u32) -> Option<(u32, u32)> {
        if self.marked.is_empty() {
            return None;
        }
        let rank = self.sa_rank_rev(self.pos_to_reverse(forward_pos));

        let mut best: Option<(u32, u32)> = None;
        if let Some((&before, &phr)) = self.marked.range(..=rank).next_back() {
            let lcp = self.lcp_between_ranks(rank, before);
            best = Some((phr, lcp));
        }
        if let Some((&after, &phr)) = self.marked.range(rank..).next() {
            let lcp = self.lcp_between_ranks(rank, after);
            if best.map(|(_, l)| lcp > l).unwrap_or(true) {
                best = Some((phr, lcp));
            }
        }
        best
    }

    /// Like `marked_lcp`, but excludes any marked position whose stored
    /// phrase id equals `exclude_phrase` (the "two-marked-LCP" query the
    /// parser uses when merging two phrases must not point back to the
    /// phrase it is about to absorb).
    pub fn marked_lcp2(&self, forward_pos: u32, exclude_phrase: u32) -> Option<(u32, u32)> {
        let rank = self.sa_rank_rev(self.pos_to_reverse(forward_pos));

        let mut best: Option<(u32, u32)> = None;
        for (&cand, &phr) in self.marked.range(..=rank).rev() {
            if phr == exclude_phrase {
                continue;
            }
            let lcp = self.lcp_between_ranks(rank, cand);
            best = Some((phr, lcp));
            break;
        }
        for (&cand, &phr) in self.marked.range(rank..) {
            if phr == exclude_phrase {
                continue;
            }
            let lcp = self.lcp_between_ranks(rank, cand);
            if best.map(|(_, l)| lcp > l).unwrap_or(true) {
                best = Some((phr, lcp));
            }
            break;
        }
        best
    }
}

fn hasher_base(hasher: &RollingKarpRabin) -> u64 {
    // recover the configured base: push(0, 1) = base*0 + 1 = 1, so push(1,0)
    // = base*1 + 0 = base.
    hasher.push(1, 0)
}

fn mulmod(a: u64, b: u64) -> u64 {
    let p = crate::rolling_hash::MERSENNE61 as u128;
    let prod = (a as u128) * (b as u128);
    let lo = prod & p;
    let hi = prod >> 61;
    let mut r = lo + hi;
    if r >= p {
        r -= p;
    }
    r as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_array_is_sorted() {
        let sa = build_suffix_array(b"banana");
        let suffixes: Vec<&[u8]> = sa.iter().map(|&i| &b"banana"[i as usize..]).collect();
        let mut sorted = suffixes.clone();
        sorted.sort();
        assert_eq!(suffixes, sorted);
    }

    #[test]
    fn marked_lcp_finds_best_neighbor() {
        let mut idx = WindowIndex::build(b"abcabcabc");
        idx.mark(0, 7);
        let (phr, lcp) = idx.marked_lcp(3).expect("some mark present");
        assert_eq!(phr, 7);
        assert!(lcp > 0);
    }

    #[test]
    fn unmarked_index_returns_none() {
        let idx = WindowIndex::build(b"abcabcabc");
        assert!(idx.marked_lcp(0).is_none());
    }

    #[test]
    fn marked_lcp2_excludes_by_phrase_identity_not_position() {
        let mut idx = WindowIndex::build(b"abcabcabc");
        // two different positions, same phrase id: both must be skipped.
        idx.mark(0, 5);
        idx.mark(3, 5);
        idx.mark(6, 9);
        let (phr, _lcp) = idx.marked_lcp2(3, 5).expect("an unexcluded mark remains");
        assert_eq!(phr, 9);
    }

    #[test]
    fn fingerprint_matches_across_equal_substrings() {
        let idx = WindowIndex::build(b"abcabcabc");
        let fp1 = idx.fingerprint(0, 2);
        let fp2 = idx.fingerprint(3, 5);
        assert_eq!(fp1, fp2);
        let fp3 = idx.fingerprint(0, 3);
        assert_ne!(fp1, fp3);
    }

    #[test]
    fn reverse_fingerprint_matches_across_equal_substrings() {
        let idx = WindowIndex::build(b"abcabcabc");
        let fp1 = idx.reverse_fingerprint(0, 2);
        let fp2 = idx.reverse_fingerprint(3, 5);
        assert_eq!(fp1, fp2);
        let fp3 = idx.reverse_fingerprint(0, 3);
        assert_ne!(fp1, fp3);
    }

    #[test]
    fn reverse_fingerprint_agrees_with_manually_reversed_hash() {
        let hasher = RollingKarpRabin::new(8, random_base(1));
        let idx = WindowIndex::build_with_hasher(b"abbabab", hasher);
        // window[2..=5] = "baba", reversed = "abab"
        let expect = {
            let mut fp = 0u64;
            for &c in b"abab" {
                fp = hasher.push(fp, c);
            }
            fp
        };
        assert_eq!(idx.reverse_fingerprint(2, 5), expect);
    }
}
