//! Trie edge array: a byte -> node-index mapping with unique keys, switching
//! between a small inline representation and a 256-bit-bitmap representation
//! once the child count crosses a threshold.

/// Above this many children, switch from a linear inline scan to the bitmap
/// representation. Chosen, as in the source, so the inline array stays
/// roughly the size of the bitmap layout's fixed overhead.
pub const INLINE_THRESHOLD: usize = 7;

#[derive(Clone, Debug)]
enum Repr {
    Inline(Vec<(u8, u32)>),
    Bitmap { bits: [u64; 4], links: Vec<u32> },
}

#[derive(Clone, Debug)]
pub struct TrieEdgeArray {
    repr: Repr,
}

impl Default for TrieEdgeArray {
    fn default() -> Self {
        Self::new()
    }
}

fn bit_index(label: u8) -> (usize, u32) {
    (label as usize / 64, (label as u32) % 64)
}

fn bitmap_set(bits: &mut [u64; 4], label: u8) {
    let (word, bit) = bit_index(label);
    bits[word] |= 1u64 << bit;
}

fn bitmap_clear(bits: &mut [u64; 4], label: u8) {
    let (word, bit) = bit_index(label);
    bits[word] &= !(1u64 << bit);
}

fn bitmap_test(bits: &[u64; 4], label: u8) -> bool {
    let (word, bit) = bit_index(label);
    bits[word] & (1u64 << bit) != 0
}

/// Rank (number of set bits strictly below `label`) within the bitmap.
fn bitmap_rank(bits: &[u64; 4], label: u8) -> usize {
    let (word, bit) = bit_index(label);
    let mut rank = 0usize;
    for w in bits.iter().take(word) {
        rank += w.count_ones() as usize;
    }
    let mask = if bit == 0 { 0 } else { (1u64 << bit) - 1 };
    rank += (bits[word] & mask).count_ones() as usize;
    rank
}

impl TrieEdgeArray {
    pub fn new() -> Self {
        Self {
            repr: Repr::Inline(Vec::new()),
        }
    }

    pub fn clear(&mut self) {
        self.repr = Repr::Inline(Vec::new());
    }

    pub fn size(&self) -> usize {
        match &self.repr {
            Repr::Inline(v) => v.len(),
            Repr::Bitmap { links, .. } => links.len(),
        }
    }

    pub fn contains(&self, link: u32) -> bool {
        match &self.repr {
            Repr::Inline(v) => v.iter().any(|&(_, l)| l == link),
            Repr::Bitmap { links, .. } => links.contains(&link),
        }
    }

    pub fn try_get(&self, label: u8) -> Option<u32> {
        match &self.repr {
            Repr::Inline(v) => v.iter().find(|&&(l, _)| l == label).map(|&(_, link)| link),
            Repr::Bitmap { bits, links } => {
                if bitmap_test(bits, label) {
                    Some(links[bitmap_rank(bits, label)])
                } else {
                    None
                }
            }
        }
    }

    pub fn find(&self, label: u8) -> Option<usize> {
        match &self.repr {
            Repr::Inline(v) => v.iter().position(|&(l, _)| l == label),
            Repr::Bitmap { bits, .. } => {
                if bitmap_test(bits, label) {
                    Some(bitmap_rank(bits, label))
                } else {
                    None
                }
            }
        }
    }

    pub fn insert(&mut self, label: u8, link: u32) {
        debug_assert!(self.try_get(label).is_none(), "label already present");
        match &mut self.repr {
            Repr::Inline(v) => {
                v.push((label, link));
                if v.len() > INLINE_THRESHOLD {
                    self.upgrade_to_bitmap();
                }
            }
            Repr::Bitmap { bits, links } => {
                bitmap_set(bits, label);
                let rank = bitmap_rank(bits, label);
                links.insert(rank, link);
            }
        }
    }

    pub fn remove(&mut self, label: u8) {
        match &mut self.repr {
            Repr::Inline(v) => {
                if let Some(pos) = v.iter().position(|&(l, _)| l == label) {
                    v.swap_remove(pos);
                } else {
                    debug_assert!(false, "remove of absent label");
                }
            }
            Repr::Bitmap { bits, links } => {
                if bitmap_test(bits, label) {
                    let rank = bitmap_rank(bits, label);
                    bitmap_clear(bits, label);
                    links.remove(rank);
                    if links.len() <= INLINE_THRESHOLD {
                        self.downgrade_to_inline();
                    }
                } else {
                    debug_assert!(false, "remove of absent label");
                }
            }
        }
    }

    fn upgrade_to_bitmap(&mut self) {
        if let Repr::Inline(v) = &mut self.repr {
            v.sort_unstable_by_key(|&(l, _)| l);
            let mut bits = [0u64; 4];
            let mut links = Vec::with_capacity(v.len());
            for &(label, link) in v.iter() {
                bitmap_set(&mut bits, label);
                links.push(link);
            }
            self.repr = Repr::Bitmap { bits, links };
        }
    }

    fn downgrade_to_inline(&mut self) {
        if let Repr::Bitmap { bits, links } = &self.repr {
            let mut v = Vec::with_capacity(links.len());
            let mut idx = 0usize;
            for label in 0u8..=255u8 {
                if bitmap_test(bits, label) {
                    v.push((label, links[idx]));
                    idx += 1;
                }
                if label == 255 {
                    break;
                }
            }
            self.repr = Repr::Inline(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_insert_get_remove() {
        let mut e = TrieEdgeArray::new();
        e.insert(b'a', 1);
        e.insert(b'b', 2);
        assert_eq!(e.try_get(b'a'), Some(1));
        assert_eq!(e.try_get(b'c'), None);
        e.remove(b'a');
        assert_eq!(e.try_get(b'a'), None);
        assert_eq!(e.size(), 1);
    }

    #[test]
    fn crosses_threshold_and_back() {
        let mut e = TrieEdgeArray::new();
        for i in 0..10u8 {
            e.insert(b'a' + i, i as u32 + 100);
        }
        assert_eq!(e.size(), 10);
        for i in 0..10u8 {
            assert_eq!(e.try_get(b'a' + i), Some(i as u32 + 100));
        }
        for i in 0..6u8 {
            e.remove(b'a' + i);
        }
        assert_eq!(e.size(), 4);
        for i in 6..10u8 {
            assert_eq!(e.try_get(b'a' + i), Some(i as u32 + 100));
        }
    }

    #[test]
    fn no_duplicate_labels() {
        let mut e = TrieEdgeArray::new();
        e.insert(b'x', 1);
        assert!(e.try_get(b'x').is_some());
    }
}
