//! Doubly linked per-frequency buckets implementing Misra-Gries's collective
//! decrement in O(1), per `examples/original_source/include/space_saving.hpp`.

use crate::trie::{TrieNode, NIL};

/// Per-node fields the space-saving list needs; implemented by the payload
/// data attached to the node arena it is tracking.
pub trait SpaceSavingItem {
    fn ss_freq(&self) -> u32;
    fn ss_set_freq(&mut self, f: u32);
    fn ss_prev(&self) -> u32;
    fn ss_set_prev(&mut self, x: u32);
    fn ss_next(&self) -> u32;
    fn ss_set_next(&mut self, x: u32);
    fn ss_is_linked(&self) -> bool;
}

/// The frequency/prev/next fields a trie node's payload must carry for the
/// blanket `SpaceSavingItem` impl below. `is_linked` on a trie node is always
/// "is a leaf", hence that predicate lives on `TrieNode` itself rather than
/// on the payload.
pub trait FreqLink {
    fn freq(&self) -> u32;
    fn set_freq(&mut self, f: u32);
    fn prev(&self) -> u32;
    fn set_prev(&mut self, x: u32);
    fn next(&self) -> u32;
    fn set_next(&mut self, x: u32);
}

impl<D: FreqLink + Default + Clone> SpaceSavingItem for TrieNode<D> {
    fn ss_freq(&self) -> u32 {
        self.data.freq()
    }
    fn ss_set_freq(&mut self, f: u32) {
        self.data.set_freq(f)
    }
    fn ss_prev(&self) -> u32 {
        self.data.prev()
    }
    fn ss_set_prev(&mut self, x: u32) {
        self.data.set_prev(x)
    }
    fn ss_next(&self) -> u32 {
        self.data.next()
    }
    fn ss_set_next(&mut self, x: u32) {
        self.data.set_next(x)
    }
    fn ss_is_linked(&self) -> bool {
        self.is_leaf()
    }
}

pub struct SpaceSaving {
    bucket_head: Vec<u32>,
    threshold: u32,
    max_allowed_frequency: u32,
}

fn prepend_list<T: SpaceSavingItem>(items: &mut [T], old_head: u32, new_head: u32) {
    if old_head != NIL {
        let mut link = new_head;
        while items[link as usize].ss_next() != NIL {
            link = items[link as usize].ss_next();
        }
        items[link as usize].ss_set_next(old_head);
        items[old_head as usize].ss_set_prev(link);
    }
}

impl SpaceSaving {
    pub fn new(max_frequency: u32) -> Self {
        assert!(max_frequency > 1, "max frequency must be at least two");
        Self {
            bucket_head: vec![NIL; max_frequency as usize + 1],
            threshold: 0,
            max_allowed_frequency: max_frequency,
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn init_as_garbage(&mut self, items: &mut [impl SpaceSavingItem], first: u32, last: u32) {
        debug_assert!(first <= last);
        self.bucket_head[0] = first;
        for i in first..=last {
            items[i as usize].ss_set_prev(if i > 1 { i - 1 } else { NIL });
            items[i as usize].ss_set_next(if i < (items.len() as u32 - 1) { i + 1 } else { NIL });
        }
    }

    pub fn get_garbage(&self) -> Option<u32> {
        let v = self.bucket_head[self.threshold as usize];
        if v != NIL {
            Some(v)
        } else {
            None
        }
    }

    pub fn increment(&mut self, items: &mut [impl SpaceSavingItem], v: u32) {
        let f = items[v as usize].ss_freq().max(self.threshold);

        if items[v as usize].ss_is_linked() {
            self.unlink(items, v);

            let u = self.bucket_head[f as usize + 1];
            if u != NIL {
                items[v as usize].ss_set_next(u);
                items[u as usize].ss_set_prev(v);
            }
            self.bucket_head[f as usize + 1] = v;
        }

        items[v as usize].ss_set_freq(f + 1);

        if f + 1 == self.max_allowed_frequency {
            self.renormalize(items, |_| {});
        }
    }

    pub fn decrement_all(&mut self, items: &mut [impl SpaceSavingItem]) {
        let head = self.bucket_head[self.threshold as usize];
        if head != NIL {
            prepend_list(items, self.bucket_head[self.threshold as usize + 1], head);
            self.bucket_head[self.threshold as usize + 1] = head;
            self.bucket_head[self.threshold as usize] = NIL;
        }
        self.threshold += 1;
    }

    pub fn link(&mut self, items: &mut [impl SpaceSavingItem], v: u32) {
        let f = items[v as usize].ss_freq().max(self.threshold);
        let u = self.bucket_head[f as usize];
        if u != NIL {
            items[v as usize].ss_set_next(u);
            items[u as usize].ss_set_prev(v);
        }
        self.bucket_head[f as usize] = v;
    }

    pub fn unlink(&mut self, items: &mut [impl SpaceSavingItem], v: u32) {
        let x = items[v as usize].ss_prev();
        let y = items[v as usize].ss_next();

        items[v as usize].ss_set_prev(NIL);
        items[v as usize].ss_set_next(NIL);

        if x != NIL {
            items[x as usize].ss_set_next(y);
        }
        if y != NIL {
            items[y as usize].ss_set_prev(x);
        }

        let f = items[v as usize].ss_freq();
        if self.bucket_head[f as usize] == v {
            self.bucket_head[f as usize] = y;
        }
    }

    /// Halves every stored frequency, compensated for the current
    /// threshold, and resets the threshold to zero. `on_renormalize` is
    /// handed the same remapping closure applied to the list's own items, so
    /// external counters tracking the same entities (a sketch's per-node
    /// estimate, a caller's own insertion-frequency field) can be kept in
    /// lockstep rather than drifting out of sync with the list.
    pub fn renormalize(&mut self, items: &mut [impl SpaceSavingItem], mut on_renormalize: impl FnMut(&dyn Fn(u32) -> u32)) {
        log::debug!(
            "space-saving renormalization at threshold={}",
            self.threshold
        );

        let threshold = self.threshold;
        let renorm = move |f: u32| (f.max(threshold) - threshold) / 2;
        on_renormalize(&renorm);

        for item in items.iter_mut().skip(1) {
            let f = item.ss_freq();
            item.ss_set_freq(renorm(f));
        }

        let mut compacted = vec![NIL; self.max_allowed_frequency as usize + 1];
        for f in 0..=self.max_allowed_frequency {
            let head = self.bucket_head[f as usize];
            if head != NIL {
                let adjusted = renorm(f);
                prepend_list(items, compacted[adjusted as usize], head);
                compacted[adjusted as usize] = head;
            }
        }
        self.bucket_head = compacted;
        self.threshold = 0;
    }
}
