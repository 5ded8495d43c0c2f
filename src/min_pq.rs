//! Minimum priority queue over trie-node ids keyed by frequency, used by the
//! sketch-assisted top-k prefix filter to track maximal frequent strings.
//! Grounded on the usage pattern in
//! `examples/original_source/include/topk_prefixes_filter_sketch.hpp`
//! (`min_pq_.insert`, `.increase_key`, `.remove`, `.extract_min`,
//! `.min_frequency`); the original's `min_pq.hpp` header itself was not part
//! of the retrieved pack, so this is a standard indexed binary min-heap.

pub struct MinPq {
    heap: Vec<(u32, u64)>,
    pos: Vec<u32>, // node -> heap slot, NIL (u32::MAX) if absent
}

const NIL: u32 = u32::MAX;

impl MinPq {
    pub fn new(capacity: usize) -> Self {
        Self {
            heap: Vec::with_capacity(capacity),
            pos: vec![NIL; capacity],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn min_frequency(&self) -> u64 {
        self.heap.first().map(|&(_, f)| f).unwrap_or(0)
    }

    fn swap(&mut self, i: usize, j: usize) {
        self.heap.swap(i, j);
        self.pos[self.heap[i].0 as usize] = i as u32;
        self.pos[self.heap[j].0 as usize] = j as u32;
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if self.heap[parent].1 <= self.heap[i].1 {
                break;
            }
            self.swap(parent, i);
            i = parent;
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        loop {
            let l = 2 * i + 1;
            let r = 2 * i + 2;
            let mut smallest = i;
            if l < self.heap.len() && self.heap[l].1 < self.heap[smallest].1 {
                smallest = l;
            }
            if r < self.heap.len() && self.heap[r].1 < self.heap[smallest].1 {
                smallest = r;
            }
            if smallest == i {
                break;
            }
            self.swap(i, smallest);
            i = smallest;
        }
    }

    pub fn insert(&mut self, node: u32, freq: u64) {
        let i = self.heap.len();
        self.heap.push((node, freq));
        self.pos[node as usize] = i as u32;
        self.sift_up(i);
    }

    pub fn remove(&mut self, node: u32) {
        let i = self.pos[node as usize] as usize;
        debug_assert_ne!(self.pos[node as usize], NIL);
        let last = self.heap.len() - 1;
        if i != last {
            self.swap(i, last);
        }
        self.heap.pop();
        self.pos[node as usize] = NIL;
        if i < self.heap.len() {
            self.sift_down(i);
            self.sift_up(i);
        }
    }

    /// `freq` increases monotonically for a node already present; re-heapify
    /// accordingly (a min-heap entry whose key grows may need to sift down).
    pub fn increase_key(&mut self, node: u32, freq: u64) {
        let i = self.pos[node as usize] as usize;
        self.heap[i].1 = freq;
        self.sift_down(i);
    }

    pub fn extract_min(&mut self) -> u32 {
        debug_assert!(!self.heap.is_empty());
        let node = self.heap[0].0;
        self.remove(node);
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_min_returns_smallest() {
        let mut pq = MinPq::new(8);
        pq.insert(1, 5);
        pq.insert(2, 1);
        pq.insert(3, 9);
        assert_eq!(pq.min_frequency(), 1);
        assert_eq!(pq.extract_min(), 2);
        assert_eq!(pq.min_frequency(), 5);
    }

    #[test]
    fn increase_key_reorders() {
        let mut pq = MinPq::new(8);
        pq.insert(1, 1);
        pq.insert(2, 2);
        pq.increase_key(1, 10);
        assert_eq!(pq.extract_min(), 2);
        assert_eq!(pq.extract_min(), 1);
    }
}
