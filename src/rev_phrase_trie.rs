//! Compact trie over reversed LZ-End phrases, used by the parser to find the
//! longest previously-seen phrase matching the string ending at the current
//! position. Grounded on
//! `examples/original_source/include/lzend_rev_phrase_trie.hpp`: nodes carry
//! a string depth (`len`) and a phrase id (`phr`), edges are looked up by
//! their first character rather than stored inline on the node (mirroring
//! the header's separate `nav_`/`map_` maps), and a navigation map answers
//! "fat binary search" queries — the header's own jump table is a
//! fingerprint-keyed shortcut (`rst`/`max_i_rst`) rather than a plain
//! ancestor table, so `nav` here is keyed by `(depth, fingerprint)` exactly
//! as the header's comment describes, and `approx_find_phr` returns a
//! `hash_match_len` certified purely by fingerprint agreement (no
//! byte-for-byte check), matching the header's non-`PARANOID` default path.
//! A second, plain ancestor-lifting table (`anc`) is kept to answer
//! `nca_len` queries, which are structural (depend only on trie topology,
//! not on content) and so need no fingerprint at all.

use std::collections::HashMap;

use crate::rolling_hash::{random_base, RollingKarpRabin};

pub const ROOT: u32 = 0;
pub const NIL: u32 = u32::MAX;

/// Fixed internal seed for the trie's own content fingerprint, distinct from
/// the window index's so the two never accidentally compare equal by
/// construction.
const TRIE_FP_SEED: u64 = 0x7265_765f_7068_7261;

/// Supplies the byte at a given depth (0-indexed from the root) of a given
/// phrase's reversed spelling. Backed, in practice, by the LZ-End parsing
/// output's reverse-extract (`parsing::reverse_extract`).
pub trait PhraseBytes {
    fn byte_at(&self, phr: u32, depth: u32) -> u8;

    /// Bulk fetch of the first `len` bytes (depths `0..len`) of `phr`'s
    /// reversed spelling in one call, rather than `len` separate `byte_at`
    /// calls each re-walking the phrase's link chain from scratch. The
    /// default falls back to repeated `byte_at`; `Parsing` overrides it with
    /// its explicit-stack `reverse_extract`.
    fn extract(&self, phr: u32, len: u32) -> Vec<u8> {
        (0..len).map(|d| self.byte_at(phr, d)).collect()
    }
}

#[derive(Clone, Debug)]
struct Node {
    len: u32,
    /// Set iff some phrase's suffix ends exactly at this node.
    phr: u32,
    /// Any phrase passing through this node, used to fetch comparison bytes
    /// for edges below it (every phrase sharing this node's path agrees on
    /// all bytes up to `len`).
    repr_phr: u32,
    parent: u32,
    /// Karp-Rabin fingerprint of the reversed-phrase prefix of length `len`
    /// spelled out by the path from the root to this node.
    fp: u64,
}

pub struct RevPhraseTrie {
    nodes: Vec<Node>,
    map: HashMap<(u32, u8), u32>,
    /// `(depth, fingerprint) -> node`: the fat binary search index. A node
    /// is entered here under its own `(len, fp)` at creation time.
    nav: HashMap<(u32, u64), u32>,
    /// Distinct depths present as a first coordinate in `nav`, kept sorted
    /// to binary-search over during `approx_find_phr`.
    depths: Vec<u32>,
    /// Plain binary-lifting ancestor table (`anc[(v,0)]` is the parent,
    /// `anc[(v,k)]` the `2^k`-th ancestor), used only for `nca`/`nca_len`.
    anc: HashMap<(u32, u32), u32>,
    hasher: RollingKarpRabin,
}

/// Highest `k` such that `1 << k <= x`; used to decompose a depth
/// difference into binary-lifting jumps (the header's `max_i_rst`).
fn max_pow2_leq(x: u32) -> u32 {
    debug_assert!(x > 0);
    31 - x.leading_zeros()
}

impl RevPhraseTrie {
    pub fn new() -> Self {
        Self::with_hasher(RollingKarpRabin::new(1, random_base(TRIE_FP_SEED)))
    }

    /// Builds an empty trie using a caller-supplied fingerprint hasher —
    /// needed whenever fingerprints computed here must compare equal to
    /// fingerprints computed elsewhere (e.g. a window index's substring
    /// fingerprints), which requires sharing the same base.
    pub fn with_hasher(hasher: RollingKarpRabin) -> Self {
        let root = Node {
            len: 0,
            phr: NIL,
            repr_phr: NIL,
            parent: NIL,
            fp: 0,
        };
        Self {
            nodes: vec![root],
            map: HashMap::new(),
            nav: HashMap::new(),
            depths: Vec::new(),
            anc: HashMap::new(),
            hasher,
        }
    }

    pub fn len_of(&self, node: u32) -> u32 {
        self.nodes[node as usize].len
    }

    pub fn phrase_of(&self, node: u32) -> u32 {
        self.nodes[node as usize].phr
    }

    pub fn parent(&self, node: u32) -> u32 {
        self.nodes[node as usize].parent
    }

    pub fn try_get_child(&self, node: u32, c: u8) -> Option<u32> {
        self.map.get(&(node, c)).copied()
    }

    fn register_nav(&mut self, node: u32) {
        let len = self.nodes[node as usize].len;
        let fp = self.nodes[node as usize].fp;
        self.nav.insert((len, fp), node);
        if let Err(i) = self.depths.binary_search(&len) {
            self.depths.insert(i, len);
        }
    }

    fn new_node(&mut self, parent: u32, len: u32, phr: u32, repr_phr: u32, fp: u64) -> u32 {
        let id = self.nodes.len() as u32;
        self.nodes.push(Node {
            len,
            phr,
            repr_phr,
            parent,
            fp,
        });
        self.update_anc(id);
        self.register_nav(id);
        id
    }

    /// Binary-lifting ancestor table: `anc[(v,0)]` is the parent, `anc[(v,k)]`
    /// is the `2^k`-th ancestor of `v`.
    fn update_anc(&mut self, v: u32) {
        let parent = self.nodes[v as usize].parent;
        if parent == NIL {
            return;
        }
        self.anc.insert((v, 0), parent);
        let mut k = 1;
        loop {
            let prev = match self.anc.get(&(v, k - 1)) {
                Some(&p) => p,
                None => break,
            };
            match self.anc.get(&(prev, k - 1)) {
                Some(&up) => {
                    self.anc.insert((v, k), up);
                    k += 1;
                }
                None => break,
            }
        }
    }

    fn kth_ancestor(&self, mut v: u32, mut k: u32) -> u32 {
        let mut bit = 0u32;
        while k > 0 {
            if k & 1 == 1 {
                match self.anc.get(&(v, bit)) {
                    Some(&a) => v = a,
                    None => return NIL,
                }
            }
            k >>= 1;
            bit += 1;
        }
        v
    }

    /// The ancestor of `node` whose string depth is exactly `d` (`d` must be
    /// `<= len(node)`).
    pub fn ancestor_at_depth(&self, node: u32, d: u32) -> u32 {
        let mut diff = self.nodes[node as usize].len - d;
        let mut v = node;
        while diff > 0 {
            let k = max_pow2_leq(diff);
            v = self.kth_ancestor(v, 1 << k);
            if v == NIL {
                return NIL;
            }
            diff -= 1 << k;
        }
        v
    }

    /// Nearest common ancestor of `u` and `v` by depth, via binary lifting.
    /// Purely structural: unaffected by fingerprints.
    pub fn nca(&self, mut u: u32, mut v: u32) -> u32 {
        if self.nodes[u as usize].len < self.nodes[v as usize].len {
            std::mem::swap(&mut u, &mut v);
        }
        u = self.ancestor_at_depth(u, self.nodes[v as usize].len);
        if u == v {
            return u;
        }
        let mut k = 32;
        while k > 0 {
            k -= 1;
            let au = self.kth_ancestor(u, 1 << k);
            let av = self.kth_ancestor(v, 1 << k);
            if au != NIL && au != av {
                u = au;
                v = av;
            }
        }
        self.nodes[u as usize].parent
    }

    pub fn nca_len(&self, u: u32, v: u32) -> u32 {
        self.nodes[self.nca(u, v) as usize].len
    }

    fn fingerprint_of(&self, bytes: &[u8]) -> u64 {
        let mut fp = 0u64;
        for &c in bytes {
            fp = self.hasher.push(fp, c);
        }
        fp
    }

    /// Inserts the reversed phrase `new_phr` (of string length `new_len`)
    /// into the trie, splitting an existing edge if the new phrase diverges
    /// partway along it. Returns the node now representing `new_phr`. Fetches
    /// each phrase's bytes once in bulk via `PhraseBytes::extract` rather
    /// than re-walking its link chain on every comparison.
    pub fn insert(&mut self, bytes: &impl PhraseBytes, new_phr: u32, new_len: u32) -> u32 {
        if new_len == 0 {
            self.nodes[ROOT as usize].phr = new_phr;
            return ROOT;
        }
        let new_bytes = bytes.extract(new_phr, new_len);

        let mut cur = ROOT;
        let mut depth = 0u32;
        loop {
            if depth == new_len {
                self.nodes[cur as usize].phr = new_phr;
                return cur;
            }
            let c = new_bytes[depth as usize];
            match self.map.get(&(cur, c)).copied() {
                None => {
                    let fp = self.fingerprint_of(&new_bytes);
                    let child = self.new_node(cur, new_len, new_phr, new_phr, fp);
                    self.map.insert((cur, c), child);
                    return child;
                }
                Some(child) => {
                    let child_len = self.nodes[child as usize].len;
                    let child_repr = self.nodes[child as usize].repr_phr;
                    let limit = child_len.min(new_len);
                    let repr_bytes = bytes.extract(child_repr, child_len);
                    let mut split_at = depth + 1;
                    while split_at < limit && new_bytes[split_at as usize] == repr_bytes[split_at as usize] {
                        split_at += 1;
                    }

                    if split_at == child_len {
                        cur = child;
                        depth = child_len;
                        continue;
                    }

                    let mid_fp = self.fingerprint_of(&repr_bytes[..split_at as usize]);
                    let mid = self.new_node(cur, split_at, NIL, child_repr, mid_fp);
                    self.map.insert((cur, c), mid);

                    let old_c = repr_bytes[split_at as usize];
                    self.nodes[child as usize].parent = mid;
                    self.map.insert((mid, old_c), child);

                    if split_at == new_len {
                        self.nodes[mid as usize].phr = new_phr;
                        return mid;
                    }
                    let new_c = new_bytes[split_at as usize];
                    let leaf_fp = self.fingerprint_of(&new_bytes);
                    let leaf = self.new_node(mid, new_len, new_phr, new_phr, leaf_fp);
                    self.map.insert((mid, new_c), leaf);
                    return leaf;
                }
            }
        }
    }

    /// Longest prefix of `query` (a forward byte sequence) matched by any
    /// phrase in the trie, found via direct edge-by-edge descent (O(1) per
    /// edge via the `map` lookup) rather than one character at a time,
    /// fetching each candidate edge's comparison bytes in one `extract`
    /// call. Returns the deepest matching node and the match length.
    pub fn approx_find(&self, bytes: &impl PhraseBytes, query: &[u8]) -> (u32, u32) {
        let mut cur = ROOT;
        let mut depth = 0u32;
        while (depth as usize) < query.len() {
            let c = query[depth as usize];
            match self.map.get(&(cur, c)).copied() {
                None => break,
                Some(child) => {
                    let child_len = self.nodes[child as usize].len;
                    let child_repr = self.nodes[child as usize].repr_phr;
                    let limit = child_len.min(query.len() as u32);
                    let repr_bytes = bytes.extract(child_repr, limit);
                    let mut d = depth + 1;
                    while d < limit && repr_bytes[d as usize] == query[d as usize] {
                        d += 1;
                    }
                    if d < child_len {
                        return (child, d);
                    }
                    cur = child;
                    depth = child_len;
                }
            }
        }
        (cur, depth)
    }

    /// Fat binary search over `nav`: given a fingerprint oracle `query_fp(d)`
    /// returning the fingerprint of the query's first `d` bytes (for any `d
    /// <= max_len`, normally answered in O(1) from a window index's
    /// prefix-fingerprint array), finds the deepest node depth `<= max_len`
    /// whose `(depth, fingerprint)` pair is present in the trie.
    ///
    /// Returns `(phr, hash_match_len)`: a phrase certified (by fingerprint
    /// agreement only, never a byte comparison) to share `hash_match_len`
    /// characters with the query, and `hash_match_len == 0` with `phr ==
    /// NIL` if nothing in the trie matches even a single byte.
    pub fn approx_find_phr(&self, query_fp: impl Fn(u32) -> u64, max_len: u32) -> (u32, u32) {
        let cap = match self.depths.binary_search(&max_len) {
            Ok(i) => i + 1,
            Err(i) => i,
        };
        if cap == 0 {
            return (NIL, 0);
        }

        let (mut lo, mut hi) = (0usize, cap);
        let mut found: Option<usize> = None;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let d = self.depths[mid];
            if self.nav.contains_key(&(d, query_fp(d))) {
                found = Some(mid);
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }

        match found {
            Some(i) => {
                let d = self.depths[i];
                let node = self.nav[&(d, query_fp(d))];
                (self.nodes[node as usize].repr_phr, d)
            }
            None => (NIL, 0),
        }
    }
}

impl Default for RevPhraseTrie {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Flat(Vec<Vec<u8>>);
    impl PhraseBytes for Flat {
        fn byte_at(&self, phr: u32, depth: u32) -> u8 {
            self.0[phr as usize][depth as usize]
        }
    }

    #[test]
    fn insert_and_find_exact() {
        let phrases = Flat(vec![b"abc".to_vec(), b"abd".to_vec()]);
        let mut trie = RevPhraseTrie::new();
        trie.insert(&phrases, 0, 3);
        trie.insert(&phrases, 1, 3);

        let (node, len) = trie.approx_find(&phrases, b"abd");
        assert_eq!(len, 3);
        assert_eq!(trie.phrase_of(node), 1);
    }

    #[test]
    fn split_on_divergence() {
        let phrases = Flat(vec![b"abcdef".to_vec(), b"abcxyz".to_vec()]);
        let mut trie = RevPhraseTrie::new();
        trie.insert(&phrases, 0, 6);
        trie.insert(&phrases, 1, 6);

        let (_node, len) = trie.approx_find(&phrases, b"abcqqq");
        assert_eq!(len, 3);
    }

    #[test]
    fn nca_len_matches_common_prefix() {
        let phrases = Flat(vec![b"abcdef".to_vec(), b"abcxyz".to_vec()]);
        let mut trie = RevPhraseTrie::new();
        let a = trie.insert(&phrases, 0, 6);
        let b = trie.insert(&phrases, 1, 6);
        assert_eq!(trie.nca_len(a, b), 3);
    }

    #[test]
    fn approx_find_phr_certifies_by_fingerprint() {
        let phrases = Flat(vec![b"abcdef".to_vec(), b"xyz".to_vec()]);
        let mut trie = RevPhraseTrie::new();
        trie.insert(&phrases, 0, 6);
        trie.insert(&phrases, 1, 3);

        // build a query fingerprint oracle the same way `fingerprint_of` does
        let hasher = RollingKarpRabin::new(1, random_base(TRIE_FP_SEED));
        let query = b"abcdef".to_vec();
        let query_fp = |d: u32| {
            let mut fp = 0u64;
            for &c in &query[..d as usize] {
                fp = hasher.push(fp, c);
            }
            fp
        };

        let (phr, hash_match_len) = trie.approx_find_phr(query_fp, 6);
        assert_eq!(hash_match_len, 6);
        assert_eq!(phr, 0);
    }

    // Three phrases whose reverse-content all start with "bab": one nested
    // entirely inside another ("babb" is a prefix of "babba", so their nodes
    // sit on the same root-to-leaf edge and their nearest common ancestor is
    // the shorter phrase's own node), and a third ("babx") that diverges from
    // both at the fourth character, forcing a split node at depth 3 — which
    // is exactly what a length-3 fat-binary-search query needs to land on.
    #[test]
    fn nca_and_approx_find_phr_agree_on_a_shared_bab_suffix() {
        let phrases = Flat(vec![b"babb".to_vec(), b"babba".to_vec(), b"babx".to_vec()]);
        let mut trie = RevPhraseTrie::new();
        let nested = trie.insert(&phrases, 0, 4);
        let outer = trie.insert(&phrases, 1, 5);
        trie.insert(&phrases, 2, 4);

        assert!(trie.nca_len(nested, outer) >= 2);

        let hasher = RollingKarpRabin::new(1, random_base(TRIE_FP_SEED));
        let query = b"bab".to_vec();
        let query_fp = |d: u32| {
            let mut fp = 0u64;
            for &c in &query[..d as usize] {
                fp = hasher.push(fp, c);
            }
            fp
        };

        let (phr, hash_match_len) = trie.approx_find_phr(query_fp, 3);
        assert_eq!(hash_match_len, 3);
        assert!([0, 1, 2].contains(&phr), "expected one of the three bab-prefixed phrases, got {phr}");
    }

    #[test]
    fn approx_find_phr_reports_zero_when_nothing_matches() {
        let phrases = Flat(vec![b"abc".to_vec()]);
        let mut trie = RevPhraseTrie::new();
        trie.insert(&phrases, 0, 3);

        let (phr, hash_match_len) = trie.approx_find_phr(|_| 0xdead_beef, 3);
        assert_eq!(phr, NIL);
        assert_eq!(hash_match_len, 0);
    }
}
