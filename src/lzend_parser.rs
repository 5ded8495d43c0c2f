//! LZ-End parsing: the three-block sliding-window factorizer, grounded on
//! `examples/original_source/include/lzend_kk_parser.hpp`'s phase-loop driver
//! (`parse`/`parse_block`) and its `absorb_two_trie`/`absorb_one_trie`/
//! `absorb_two_local`/`absorb_one_local`/new-literal decision ladder.
//!
//! Each phase exposes a window covering the current block plus the two
//! blocks before it (`cfg.window` bytes each): a reverse-phrase trie
//! (Component E) holds every phrase finalized before the window began, and a
//! `WindowIndex` (Component F) over the window itself answers "nearest
//! marked phrase boundary" queries for phrases too recent to have reached
//! the trie yet. Because the whole input is already in memory, each phase's
//! window is a direct slice of it rather than a copy into a literal ring
//! buffer — the windowing *semantics* (per-phase visibility boundaries,
//! deferred trie insertion, a freshly built local index every phase) are
//! what the original's three-block buffer exists to provide, and those are
//! preserved; only the byte-shuffling mechanics are skipped as redundant
//! when random-access to `data` is already available. See DESIGN.md for the
//! one further simplification this rewrite makes: trie absorption accepts a
//! candidate phrase only when that phrase's own length already covers the
//! needed match (`hash_match_len >= len`), rather than the original's
//! NCA-stitched combination of a short trie phrase with a second reference.
//! That combination is a pure optimization (finds strictly more merge
//! opportunities); skipping it still yields a valid, round-trip-correct
//! LZ-End parse, and `RevPhraseTrie::nca`/`nca_len` remain as tested,
//! general-purpose trie API for callers that do need it.

use crate::config::Config;
use crate::parsing::{Parsing, NIL as OUT_NIL};
use crate::rev_phrase_trie::{PhraseBytes, RevPhraseTrie, NIL as TRIE_NIL};
use crate::rolling_hash::{random_base, RollingKarpRabin};
use crate::window_index::WindowIndex;

const PARSER_FP_SEED: u64 = 0x6c7a_656e_645f_7068;

/// No-link sentinel in this module's internal 1-indexed phrase numbering
/// (phrase 0 never denotes a real phrase), matching the convention
/// `lzend_kk_parser.hpp` itself uses.
const NO_LINK: u32 = 0;

#[derive(Clone, Copy, Default)]
struct WorkPhrase {
    link: u32,
    len: u32,
    last: u8,
}

/// The parser's own working phrase list: 1-indexed with a sentinel at index
/// 0, mirroring the original's `NIL == 0` convention directly instead of
/// `Parsing`'s `NIL == u32::MAX` (translated once, at the end, in
/// `into_parsing`).
struct WorkPhrases {
    phrases: Vec<WorkPhrase>,
}

impl WorkPhrases {
    fn new() -> Self {
        Self {
            phrases: vec![WorkPhrase::default()],
        }
    }

    fn len_of(&self, id: u32) -> u32 {
        self.phrases[id as usize].len
    }

    fn push(&mut self, link: u32, len: u32, last: u8) -> u32 {
        self.phrases.push(WorkPhrase { link, len, last });
        (self.phrases.len() - 1) as u32
    }

    fn pop(&mut self) {
        self.phrases.pop();
    }

    fn replace_last(&mut self, link: u32, len: u32, last: u8) {
        let id = self.phrases.len() - 1;
        self.phrases[id] = WorkPhrase { link, len, last };
    }

    fn into_parsing(self, z: u32) -> Parsing {
        let mut out = Parsing::new();
        for id in 1..=z {
            let p = self.phrases[id as usize];
            let link = if p.link == NO_LINK { OUT_NIL } else { p.link - 1 };
            out.emplace_back(link, p.len, p.last);
        }
        out
    }
}

impl PhraseBytes for WorkPhrases {
    fn byte_at(&self, phr: u32, depth: u32) -> u8 {
        let mut cur = phr;
        let mut d = depth;
        loop {
            let p = self.phrases[cur as usize];
            if d == p.len - 1 {
                return p.last;
            }
            let link_len = self.phrases[p.link as usize].len;
            d = link_len - (p.len - 1) + d;
            cur = p.link;
        }
    }

    /// Last `len` characters of `phr`'s string, right-to-left (matching
    /// `Parsing::reverse_extract`'s convention, which `extract`'s callers
    /// expect), via an explicit stack rather than recursion.
    fn extract(&self, phr: u32, len: u32) -> Vec<u8> {
        let mut out = Vec::with_capacity(len as usize);
        let mut stack = vec![(phr, len)];
        while let Some((p, remaining)) = stack.pop() {
            if remaining == 0 {
                continue;
            }
            let ph = self.phrases[p as usize];
            out.push(ph.last);
            if remaining > 1 {
                stack.push((ph.link, remaining - 1));
            }
        }
        out
    }
}

/// The four-way absorb decision plus the literal fallback, mirroring
/// `lzend_kk_parser.hpp`'s `whence` enum.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Decision {
    TwoTrie,
    TwoLocal,
    OneTrie,
    OneLocal,
    NewChar,
}

/// Marked-set lookups for the current position, gathered up front so the
/// decision ladder below just compares numbers. Both queries look up
/// position `m - 1`, which the previous position's iteration always marked
/// as belonging to the (then-current) phrase `z` — so both exclude `z`
/// itself, or the nearest "marked neighbor" would simply be that mark,
/// matching itself trivially. The merge query (`lnk2`/`lce2`) additionally
/// can never land on the phrase it is about to absorb (`z - 1`): that
/// phrase's own length is strictly less than the `len2` the merge needs, so
/// the length check the caller applies to `lnk2` already rules it out.
fn precompute_absorb_local(
    windex: &WindowIndex,
    m: u32,
    len1: u32,
    len2: u32,
    z: u32,
    max_block: u32,
) -> (u32, u32, u32, u32) {
    let (lnk1, lce1) = if m > 0 && len1 < max_block {
        windex.marked_lcp2(m - 1, z).unwrap_or((NO_LINK, 0))
    } else {
        (NO_LINK, 0)
    };
    let (lnk2, lce2) = if z > 0 && m > len1 && len2 < max_block {
        windex.marked_lcp2(m - 1, z).unwrap_or((NO_LINK, 0))
    } else {
        (NO_LINK, 0)
    };
    (lnk1, lce1, lnk2, lce2)
}

/// Parses `data` into an LZ-End phrase sequence using a three-block sliding
/// window of `cfg.window` bytes per block.
pub fn parse(data: &[u8], cfg: &Config) -> Parsing {
    let n = data.len() as u32;
    let max_block = (cfg.window as u32).max(1);

    let hasher = RollingKarpRabin::new(1, random_base(PARSER_FP_SEED));
    let mut trie = RevPhraseTrie::with_hasher(hasher);
    let mut wp = WorkPhrases::new();
    let mut z: u32 = 0;
    let mut ztrie: u32 = 0;
    let mut ztrie_end: i64 = -1;

    if n == 0 {
        return wp.into_parsing(z);
    }

    let mut phase: u32 = 0;
    loop {
        let (window_begin_glob, curblock_window_offs) = match phase {
            0 => (0u32, 0u32),
            1 => (0u32, max_block),
            _ => ((phase - 2) * max_block, 2 * max_block),
        };
        let curblock_start_glob = window_begin_glob + curblock_window_offs;
        let curblock_size = max_block.min(n.saturating_sub(curblock_start_glob));
        if curblock_size == 0 {
            break;
        }
        let final_block = curblock_start_glob + curblock_size >= n;
        let window_len = curblock_window_offs + curblock_size;
        let window = &data[window_begin_glob as usize..(window_begin_glob + window_len) as usize];

        let mut windex = WindowIndex::build_with_hasher(window, hasher);

        // Mark, within this phase's window, the end position of every
        // phrase finalized before the window began — these feed
        // `marked_lcp`/`marked_lcp2` for positions in the current block.
        if phase >= 1 {
            let mut x = z;
            let mut xend: i64 = curblock_start_glob as i64 - 1;
            while x > 0 && xend >= window_begin_glob as i64 {
                let local = (xend - window_begin_glob as i64) as u32;
                windex.mark(local, x);
                xend -= wp.len_of(x) as i64;
                x -= 1;
            }
        }

        for mblock in 0..curblock_size {
            let m = curblock_window_offs + mblock;
            let next_char = window[m as usize];

            let len1 = wp.len_of(z);
            let len2 = if z > 0 { len1 + wp.len_of(z - 1) } else { len1 };

            let (p, hash_match_len) = if phase >= 2 && m > 0 {
                let qfp = |d: u32| if d == 0 { 0 } else { windex.reverse_fingerprint(m - d, m - 1) };
                let (phr, matched) = trie.approx_find_phr(qfp, m);
                (if phr == TRIE_NIL { NO_LINK } else { phr }, matched)
            } else {
                (NO_LINK, 0)
            };

            let (lnk1, lce1, lnk2, lce2) = precompute_absorb_local(&windex, m, len1, len2, z, max_block);

            let decision = if z >= 2 && m > len1 && p != NO_LINK && len2 < max_block && hash_match_len >= len2 {
                Decision::TwoTrie
            } else if z >= 2
                && m > len1
                && len2 < max_block
                && lnk2 != NO_LINK
                && lce2 >= len2
                && wp.len_of(lnk2) >= len2
            {
                Decision::TwoLocal
            } else if m > 0 && p != NO_LINK && len1 < max_block && hash_match_len >= len1 {
                Decision::OneTrie
            } else if m > 0 && lnk1 != NO_LINK && lce1 >= len1 && wp.len_of(lnk1) >= len1 {
                Decision::OneLocal
            } else {
                Decision::NewChar
            };

            match decision {
                Decision::TwoTrie | Decision::TwoLocal => {
                    windex.unmark(m - 1);
                    windex.unmark(m - 1 - len1);
                    wp.pop();
                    z -= 1;
                    let link = if matches!(decision, Decision::TwoTrie) { p } else { lnk2 };
                    wp.replace_last(link, len2 + 1, next_char);
                }
                Decision::OneTrie | Decision::OneLocal => {
                    windex.unmark(m - 1);
                    let link = if matches!(decision, Decision::OneTrie) { p } else { lnk1 };
                    wp.replace_last(link, len1 + 1, next_char);
                }
                Decision::NewChar => {
                    z += 1;
                    wp.push(NO_LINK, 1, next_char);
                }
            }
            windex.mark(m, z);
        }

        // Batch-insert phrases that finalized before the current block
        // began: the two most recent phrases can still be merged away by a
        // later absorb-two, so only phrases strictly older than that are
        // safe to commit to the trie.
        if phase >= 1 && !final_block {
            let border = curblock_start_glob as i64;
            while ztrie < z {
                let candidate = ztrie + 1;
                let clen = wp.len_of(candidate) as i64;
                if ztrie_end + clen > border {
                    break;
                }
                ztrie_end += clen;
                trie.insert(&wp, candidate, clen as u32);
                ztrie += 1;
            }
        }

        if final_block {
            break;
        }
        phase += 1;
    }

    wp.into_parsing(z)
}

/// Reconstructs the original byte sequence: each phrase is self-contained
/// (its `decode` already resolves the whole link chain), so the full text is
/// simply their concatenation in phrase order.
pub fn expand(parsing: &Parsing) -> Vec<u8> {
    let mut out = Vec::new();
    for id in 0..parsing.len() as u32 {
        out.extend(parsing.decode(id));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::STD_CONFIG;

    fn roundtrip(input: &[u8]) {
        let parsing = parse(input, &STD_CONFIG);
        let out = expand(&parsing);
        assert_eq!(out, input);
    }

    fn roundtrip_with_window(input: &[u8], window: usize) {
        let cfg = Config { window, ..STD_CONFIG };
        let parsing = parse(input, &cfg);
        let out = expand(&parsing);
        assert_eq!(out, input);
    }

    #[test]
    fn empty_input() {
        roundtrip(b"");
    }

    #[test]
    fn single_byte() {
        roundtrip(b"x");
    }

    #[test]
    fn no_repetition_all_literals() {
        roundtrip(b"abcdefg");
        let parsing = parse(b"abcdefg", &STD_CONFIG);
        assert_eq!(parsing.len(), 7);
    }

    #[test]
    fn highly_repetitive_input_roundtrips() {
        let input = b"abcabcabcabcabcabcabcabcabcabcabcabc".to_vec();
        roundtrip(&input);
    }

    #[test]
    fn repetitive_input_uses_fewer_phrases_than_bytes() {
        let input = b"the quick brown fox the quick brown fox the quick brown fox".to_vec();
        let parsing = parse(&input, &STD_CONFIG);
        assert!(parsing.len() < input.len());
    }

    #[test]
    fn small_window_forces_multiple_phases_and_still_roundtrips() {
        // block size 4 forces several phase transitions over a 37-byte
        // input, exercising the sliding window itself, not just the ladder.
        roundtrip_with_window(b"abcabcabcabcabcabcabcabcabcabcabcabc", 4);
    }

    #[test]
    fn alternating_ab_parses_and_roundtrips() {
        let input = b"ab".repeat(512);
        roundtrip_with_window(&input, 16);
    }

    #[test]
    fn repeating_abc_with_block_four_bounds_phrase_count() {
        // "abcabcabcabcabc" with an LZ-End block size of 4 should never need
        // more than 5 phrases, and must decompress back to the input.
        let input = b"abcabcabcabcabc";
        let cfg = Config { window: 4, ..STD_CONFIG };
        let parsing = parse(input, &cfg);
        assert!(parsing.len() <= 5, "expected at most 5 phrases, got {}", parsing.len());
        assert_eq!(expand(&parsing), input);
    }

    #[test]
    fn first_two_distinct_bytes_are_bare_literals() {
        // Unambiguous regardless of window size or tie-breaking: the very
        // first occurrence of a byte can only ever be a length-1 literal.
        let input = b"ababbbabbabbbabbaa";
        let cfg = Config { window: 6, ..STD_CONFIG };
        let parsing = parse(input, &cfg);
        assert!(parsing.len() >= 2);
        let first = parsing.get(0);
        assert_eq!((first.len, first.last), (1, b'a'));
        let second = parsing.get(1);
        assert_eq!((second.len, second.last), (1, b'b'));
        assert_eq!(expand(&parsing), input);
    }

    // Same 18-byte alternating/repeating input, traced through the first
    // five positions by hand against the absorb-one/absorb-two ladder: the
    // third position merges into phrase 0 to spell "ab" (absorb-one, local),
    // but the fourth position's would-be merge target (phrase 1, "b") is too
    // short to satisfy the link-length guard, so position four opens a fresh
    // bare-literal phrase instead of stitching across it. This crate's
    // simplified parser (no combine-with-a-second-reference step) always
    // picks the conservative, guard-respecting option, so it does not
    // reproduce every phrase breakdown a fuller optimal parser could reach
    // for this input - only that this prefix of decisions is forced.
    #[test]
    fn third_and_fourth_positions_follow_the_guarded_absorb_ladder() {
        let input = b"ababbbabbabbbabbaa";
        let cfg = Config { window: 6, ..STD_CONFIG };
        let parsing = parse(input, &cfg);
        assert!(parsing.len() >= 4);
        assert_eq!((parsing.get(0).len, parsing.get(0).last), (1, b'a'));
        assert_eq!((parsing.get(1).len, parsing.get(1).last), (1, b'b'));
        let third = parsing.get(2);
        assert_eq!((third.link, third.len, third.last), (0, 2, b'b'));
        let fourth = parsing.get(3);
        assert_eq!((fourth.len, fourth.last), (1, b'b'));
        assert_eq!(expand(&parsing), input);
    }
}
