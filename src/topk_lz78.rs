//! Top-k LZ78: a second, independent compression method alongside the
//! LZ-End flagship, exercising the top-k prefix filter (Component D) on its
//! own rather than as an LZ-End helper structure. Grounded on
//! `examples/original_source/src/topk_lz78_impl.hpp`'s `topk_compress_lz78`/
//! `topk_decompress_lz78` driver, instantiated with the Misra-Gries filter
//! (`examples/original_source/src/topk_lz78_mg.cpp`'s choice of
//! `TopKPrefixesMisraGries`, no sketch).
//!
//! Each phrase is the longest frequent-prefix match found by walking
//! `TopkMisraGries`, followed by the one literal byte that broke the match
//! (dropped only for a final phrase that runs out of input mid-match). The
//! token stream is two columns — `TRIE_REF` (the node reached just before
//! the breaking byte) and `LITERAL` (the breaking byte itself) — coded
//! independently by `block_coder`, same as the LZ-End container's
//! `link`/`len`/`last` columns.

use crate::block_coder;
use crate::config::Config;
use crate::error::Error;
use crate::topk_filter::TopkMisraGries;

const MAGIC: u64 = 0x544f_504b_4c5a_3738; // "TOPKLZ78" in ascii-ish hex

fn push_u64(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_be_bytes());
}
fn read_u64(data: &[u8], pos: &mut usize) -> Result<u64, Error> {
    let bytes: [u8; 8] = data
        .get(*pos..*pos + 8)
        .ok_or_else(|| Error::CorruptInput("truncated header".into()))?
        .try_into()
        .unwrap();
    *pos += 8;
    Ok(u64::from_be_bytes(bytes))
}

fn push_block(out: &mut Vec<u8>, values: &[u32]) {
    let encoded = block_coder::encode_tokens(values);
    push_u64(out, encoded.len() as u64);
    out.extend_from_slice(&encoded);
}

fn read_block(data: &[u8], pos: &mut usize) -> Result<Vec<u32>, Error> {
    let len = read_u64(data, pos)? as usize;
    let block = data
        .get(*pos..*pos + len)
        .ok_or_else(|| Error::CorruptInput("truncated token block".into()))?;
    *pos += len;
    block_coder::decode_tokens(block)
}

/// Compresses `data` with the top-k LZ78 method: `cfg.k` sizes the prefix
/// filter's trie (root plus `k - 1` tracked strings), same meaning as for
/// the LZ-End variant. `cfg.window`/`cfg.sketch_columns`/`cfg.sketch_rows`
/// are not consulted — this method has no sliding window and the
/// Misra-Gries filter carries no sketch.
pub fn compress(data: &[u8], cfg: &Config) -> Result<Vec<u8>, Error> {
    cfg.validate()?;

    let mut topk = TopkMisraGries::new(cfg.k as u32);
    let mut trie_refs = Vec::new();
    let mut literals = Vec::new();

    let mut s = topk.empty_string();
    for &c in data {
        let next = topk.extend(&s, c);
        if !next.frequent {
            trie_refs.push(s.node);
            literals.push(c as u32);
            s = topk.empty_string();
        } else {
            s = next;
        }
    }
    if s.len > 0 {
        // final phrase ran out of input mid-match: no breaking byte to emit
        trie_refs.push(s.node);
    }

    let mut out = Vec::new();
    push_u64(&mut out, MAGIC);
    push_u64(&mut out, cfg.k as u64);
    push_u64(&mut out, data.len() as u64);
    push_block(&mut out, &trie_refs);
    push_block(&mut out, &literals);
    Ok(out)
}

/// Reconstructs the original byte sequence from an archive produced by
/// `compress`.
pub fn expand(data: &[u8]) -> Result<Vec<u8>, Error> {
    let mut pos = 0usize;
    let magic = read_u64(data, &mut pos)?;
    if magic != MAGIC {
        return Err(Error::CorruptInput(format!(
            "wrong magic: 0x{magic:016x} (expected 0x{MAGIC:016x})"
        )));
    }
    let k = read_u64(data, &mut pos)? as usize;
    let original_len = read_u64(data, &mut pos)?;

    let trie_refs = read_block(data, &mut pos)?;
    let literals = read_block(data, &mut pos)?;
    if literals.len() != trie_refs.len() && literals.len() + 1 != trie_refs.len() {
        return Err(Error::CorruptInput(
            "literal count inconsistent with trie-ref count".into(),
        ));
    }

    let mut topk = TopkMisraGries::new(k as u32);
    let mut out = Vec::new();
    for (i, &node) in trie_refs.iter().enumerate() {
        let phrase = topk.get(node);
        let mut s = topk.empty_string();
        for &pc in &phrase {
            s = topk.extend(&s, pc);
            out.push(pc);
        }
        if let Some(&lit) = literals.get(i) {
            let lit = u8::try_from(lit).map_err(|_| Error::CorruptInput("literal byte out of range".into()))?;
            topk.extend(&s, lit);
            out.push(lit);
        }
    }

    if out.len() as u64 != original_len {
        return Err(Error::CorruptInput(
            "decoded length does not match header".into(),
        ));
    }
    out.truncate(original_len as usize);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::STD_CONFIG;

    fn roundtrip(input: &[u8]) {
        let archive = compress(input, &STD_CONFIG).unwrap();
        let out = expand(&archive).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn empty_input_roundtrips() {
        roundtrip(b"");
    }

    #[test]
    fn single_byte_roundtrips() {
        roundtrip(b"x");
    }

    #[test]
    fn small_input_roundtrips() {
        roundtrip(b"hello, hello, hello world");
    }

    #[test]
    fn repetitive_input_roundtrips() {
        let input = b"abcabcabcabcabcabcabcabcabcabcabcabc".repeat(4);
        roundtrip(&input);
    }

    #[test]
    fn small_trie_still_roundtrips() {
        let cfg = Config { k: 4, ..STD_CONFIG };
        let archive = compress(b"aaaaaaaabbbbbbbbcccccccc", &cfg).unwrap();
        let out = expand(&archive).unwrap();
        assert_eq!(out, b"aaaaaaaabbbbbbbbcccccccc");
    }

    #[test]
    fn rejects_wrong_magic() {
        let mut archive = compress(b"some data", &STD_CONFIG).unwrap();
        archive[0] ^= 0xff;
        assert!(expand(&archive).is_err());
    }

    #[test]
    fn rejects_truncated_archive() {
        let archive = compress(b"some data here", &STD_CONFIG).unwrap();
        let truncated = &archive[..archive.len() / 2];
        assert!(expand(truncated).is_err());
    }
}
