//! Top-level LZ-End container: a small file header followed by the phrase
//! sequence's three columns (`link`, `len`, `last`) each coded independently
//! by `block_coder`. Grounded on
//! `examples/original_source/include/topk_header.hpp`'s field set
//! (magic, `k`, `window_size`, `num_sketches`, `sketch_rows`,
//! `sketch_columns`), reimplemented over plain big-endian byte writes
//! instead of the original's `code::Binary` universes since no retrieved
//! example depends on that header's own `code` library. `compress`/`expand`
//! follow `examples/dfgordon-retrocompressor/src/lzss_huff.rs`'s free-function
//! naming and `fn(&[u8]) -> Result<Vec<u8>, Error>` shape.

use crate::block_coder;
use crate::config::Config;
use crate::error::Error;
use crate::lzend_parser;
use crate::parsing::{Parsing, NIL};

const MAGIC: u64 = 0x4c5a_454e_445f_3031; // "LZEND_01" in ascii-ish hex

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

fn write_header(out: &mut Vec<u8>, cfg: &Config, original_len: u64) {
    push_u64(out, MAGIC);
    push_u64(out, cfg.k as u64);
    push_u64(out, cfg.window as u64);
    push_u64(out, 1); // num_sketches: the multi-sketch mode is out of scope here
    out.push(cfg.sketch_rows);
    push_u64(out, cfg.sketch_columns as u64);
    push_u64(out, cfg.block as u64);
    push_u64(out, original_len);
}

struct Header {
    cfg: Config,
    original_len: u64,
}

fn read_header(data: &[u8], pos: &mut usize) -> Result<Header, Error> {
    let magic = read_u64(data, pos)?;
    if magic != MAGIC {
        return Err(Error::CorruptInput(format!(
            "wrong magic: 0x{magic:016x} (expected 0x{MAGIC:016x})"
        )));
    }
    let k = read_u64(data, pos)? as usize;
    let window = read_u64(data, pos)? as usize;
    let _num_sketches = read_u64(data, pos)?;
    let sketch_rows = *data
        .get(*pos)
        .ok_or_else(|| Error::CorruptInput("truncated header".into()))?;
    *pos += 1;
    let sketch_columns = read_u64(data, pos)? as usize;
    let block = read_u64(data, pos)? as usize;
    let original_len = read_u64(data, pos)?;

    let cfg = Config {
        k,
        sketch_columns,
        sketch_rows,
        window,
        block,
        min_pq_mode: crate::config::MinPqMode::Exact,
    };
    cfg.validate()?;
    Ok(Header { cfg, original_len })
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

/// Compresses `data` into a self-contained LZ-End archive.
pub fn compress(data: &[u8], cfg: &Config) -> Result<Vec<u8>, Error> {
    cfg.validate()?;
    let parsing = lzend_parser::parse(data, cfg);

    let mut links = Vec::with_capacity(parsing.len());
    let mut lens = Vec::with_capacity(parsing.len());
    let mut lasts = Vec::with_capacity(parsing.len());
    for id in 0..parsing.len() as u32 {
        let p = parsing.get(id);
        // NIL (no link) is stored as 0, every real link as (id + 1), so the
        // token stream stays a plain non-negative alphabet for the coder.
        links.push(if p.link == NIL { 0 } else { p.link + 1 });
        lens.push(p.len);
        lasts.push(p.last as u32);
    }

    let mut out = Vec::new();
    write_header(&mut out, cfg, data.len() as u64);
    push_block(&mut out, &links);
    push_block(&mut out, &lens);
    push_block(&mut out, &lasts);
    Ok(out)
}

/// Reconstructs the original byte sequence from an archive produced by
/// `compress`.
pub fn expand(data: &[u8]) -> Result<Vec<u8>, Error> {
    let mut pos = 0usize;
    let header = read_header(data, &mut pos)?;

    let links = read_block(data, &mut pos)?;
    let lens = read_block(data, &mut pos)?;
    let lasts = read_block(data, &mut pos)?;

    if links.len() != lens.len() || links.len() != lasts.len() {
        return Err(Error::CorruptInput(
            "token stream length mismatch between phrase columns".into(),
        ));
    }

    let mut parsing = Parsing::new();
    for i in 0..links.len() {
        let link = if links[i] == 0 { NIL } else { links[i] - 1 };
        let last = u8::try_from(lasts[i])
            .map_err(|_| Error::CorruptInput("literal byte out of range".into()))?;
        parsing.emplace_back(link, lens[i], last);
    }

    let mut out = lzend_parser::expand(&parsing);
    if out.len() as u64 != header.original_len {
        return Err(Error::CorruptInput(
            "decoded length does not match header".into(),
        ));
    }
    out.truncate(header.original_len as usize);
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
    fn small_input_roundtrips() {
        roundtrip(b"hello, hello, hello world");
    }

    #[test]
    fn repetitive_input_roundtrips() {
        let input = b"abcabcabcabcabcabcabcabcabcabcabcabc".repeat(4);
        roundtrip(&input);
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
