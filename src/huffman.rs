//! Static Huffman coding over a per-block symbol histogram. Grounded on
//! `examples/dfgordon-retrocompressor/src/tools/adaptive_huff.rs`'s
//! parallel-array node arena (`freq`/`parent`/`son` indexed vectors), adapted
//! from an adaptively-rebalanced single-pass coder to a one-shot static tree
//! built once per block from that block's token histogram. Tree merges use
//! `min_pq::MinPq` (already built for the top-k filter's sketch variant)
//! rather than the teacher's sibling-pair insertion scheme, since a static
//! build merges two arbitrary lowest-frequency nodes at a time rather than
//! always a freshly inserted pair; child ids are therefore tracked as
//! explicit `left`/`right` arrays instead of the teacher's `son`/`son + 1`
//! sibling convention.

use bit_vec::BitVec;

use crate::min_pq::MinPq;

const NIL: u32 = u32::MAX;

pub struct HuffmanTable {
    parent: Vec<u32>,
    left: Vec<u32>,
    right: Vec<u32>,
    root: u32,
    num_symbols: u32,
}

impl HuffmanTable {
    /// Builds a tree over symbols `0..freqs.len()`. Every entry must be
    /// nonzero (callers remap a block's alphabet down to the symbols that
    /// actually occur before calling this, exactly as `block_coding.hpp`'s
    /// per-type aux header records which symbols are present).
    pub fn build(freqs: &[u64]) -> Self {
        let num_symbols = freqs.len() as u32;
        debug_assert!(freqs.iter().all(|&f| f > 0));

        if num_symbols == 0 {
            return Self {
                parent: Vec::new(),
                left: Vec::new(),
                right: Vec::new(),
                root: NIL,
                num_symbols: 0,
            };
        }
        if num_symbols == 1 {
            return Self {
                parent: vec![NIL],
                left: vec![NIL],
                right: vec![NIL],
                root: 0,
                num_symbols: 1,
            };
        }

        let total_nodes = 2 * num_symbols as usize - 1;
        let mut parent = vec![NIL; total_nodes];
        let mut left = vec![NIL; total_nodes];
        let mut right = vec![NIL; total_nodes];
        let mut freq = vec![0u64; total_nodes];
        freq[..num_symbols as usize].copy_from_slice(freqs);

        let mut pq = MinPq::new(total_nodes);
        for i in 0..num_symbols {
            pq.insert(i, freq[i as usize]);
        }

        let mut next_node = num_symbols;
        while next_node < total_nodes as u32 {
            let a = pq.extract_min();
            let b = pq.extract_min();
            let node = next_node;
            next_node += 1;

            freq[node as usize] = freq[a as usize] + freq[b as usize];
            parent[a as usize] = node;
            parent[b as usize] = node;
            left[node as usize] = a;
            right[node as usize] = b;

            if next_node < total_nodes as u32 {
                pq.insert(node, freq[node as usize]);
            }
        }

        Self {
            parent,
            left,
            right,
            root: total_nodes as u32 - 1,
            num_symbols,
        }
    }

    pub fn num_symbols(&self) -> u32 {
        self.num_symbols
    }

    /// Appends the code for `symbol` (a leaf id in `0..num_symbols`) to
    /// `out`, most-significant bit first.
    pub fn encode_symbol(&self, symbol: u32, out: &mut BitVec) {
        if self.num_symbols <= 1 {
            return; // single-symbol alphabet needs no bits at all
        }
        let mut bits = Vec::new();
        let mut node = symbol;
        while self.parent[node as usize] != NIL {
            let p = self.parent[node as usize];
            bits.push(self.right[p as usize] == node);
            node = p;
        }
        for bit in bits.into_iter().rev() {
            out.push(bit);
        }
    }

    /// Reads one symbol starting at `*pos`, advancing it past the consumed
    /// bits.
    pub fn decode_symbol(&self, bits: &BitVec, pos: &mut usize) -> u32 {
        if self.num_symbols <= 1 {
            return 0;
        }
        let mut node = self.root;
        while self.left[node as usize] != NIL {
            let bit = bits.get(*pos).expect("truncated huffman stream");
            *pos += 1;
            node = if bit {
                self.right[node as usize]
            } else {
                self.left[node as usize]
            };
        }
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_symbol_roundtrips_with_zero_bits() {
        let table = HuffmanTable::build(&[42]);
        let mut out = BitVec::new();
        table.encode_symbol(0, &mut out);
        assert_eq!(out.len(), 0);
        let mut pos = 0;
        assert_eq!(table.decode_symbol(&out, &mut pos), 0);
    }

    #[test]
    fn skewed_histogram_roundtrips() {
        // symbol 0 is far more frequent than 1..4
        let table = HuffmanTable::build(&[1000, 1, 1, 1]);
        let mut out = BitVec::new();
        let symbols = [0u32, 1, 0, 2, 0, 3, 0, 0];
        for &s in &symbols {
            table.encode_symbol(s, &mut out);
        }
        let mut pos = 0;
        for &expected in &symbols {
            assert_eq!(table.decode_symbol(&out, &mut pos), expected);
        }
    }
}
