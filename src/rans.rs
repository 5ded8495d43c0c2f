//! Static byte-renormalized rANS (range Asymmetric Numeral System) coder
//! over a per-block symbol histogram. The teacher has no rANS coder of its
//! own; this follows `block_coding.hpp`'s general per-type-block contract
//! ("build frequencies, emit a table, emit a stream") implemented from
//! rANS's well-known constant-space renormalizing-state formulation (Duda's
//! original construction, as popularized in the public "ryg_rans" reference
//! coder) — there being no retrieved Rust example of it to imitate
//! directly.

const RANS_L: u32 = 1 << 16;

pub struct RansTable {
    cum_freq: Vec<u32>, // cum_freq[s] = sum of freq[0..s]; length num_symbols + 1
    total_bits: u32,
}

impl RansTable {
    /// Builds a table from per-symbol frequencies already normalized to sum
    /// to `1 << total_bits`. Every present symbol's frequency must be
    /// nonzero (callers remap a block's alphabet to only the symbols that
    /// occur, then normalize, before calling this).
    pub fn from_normalized(freq: &[u32], total_bits: u32) -> Self {
        debug_assert_eq!(freq.iter().sum::<u32>(), 1u32 << total_bits);
        let mut cum_freq = Vec::with_capacity(freq.len() + 1);
        let mut acc = 0u32;
        cum_freq.push(0);
        for &f in freq {
            acc += f;
            cum_freq.push(acc);
        }
        Self { cum_freq, total_bits }
    }

    /// Normalizes raw counts to sum exactly to `1 << total_bits`, keeping
    /// every nonzero-count symbol at a frequency of at least 1 (largest
    /// remainder method).
    pub fn normalize(counts: &[u64], total_bits: u32) -> Vec<u32> {
        let target = 1u64 << total_bits;
        let sum: u64 = counts.iter().sum();
        debug_assert!(sum > 0);
        let mut freq: Vec<u32> = counts
            .iter()
            .map(|&c| {
                if c == 0 {
                    0
                } else {
                    (((c * target) / sum) as u32).max(1)
                }
            })
            .collect();

        let mut total: i64 = freq.iter().map(|&f| f as i64).sum();
        let mut order: Vec<usize> = (0..counts.len()).filter(|&i| counts[i] > 0).collect();
        order.sort_by_key(|&i| std::cmp::Reverse(counts[i]));

        let mut idx = 0;
        while total != target as i64 {
            let i = order[idx % order.len()];
            if total < target as i64 {
                freq[i] += 1;
                total += 1;
            } else if freq[i] > 1 {
                freq[i] -= 1;
                total -= 1;
            }
            idx += 1;
        }
        freq
    }

    fn freq_of(&self, symbol: usize) -> u32 {
        self.cum_freq[symbol + 1] - self.cum_freq[symbol]
    }

    fn symbol_of_slot(&self, slot: u32) -> usize {
        match self.cum_freq.binary_search(&slot) {
            Ok(i) => {
                // slot lands exactly on a boundary; it belongs to the
                // symbol starting there unless that symbol has zero range
                let mut i = i;
                while i + 1 < self.cum_freq.len() && self.cum_freq[i + 1] == self.cum_freq[i] {
                    i += 1;
                }
                i
            }
            Err(i) => i - 1,
        }
    }
}

fn encode_symbol(state: &mut u32, symbol: usize, table: &RansTable, out: &mut Vec<u8>) {
    let freq = table.freq_of(symbol);
    let start = table.cum_freq[symbol];
    let x_max = ((RANS_L >> table.total_bits) << 8) * freq;
    while *state >= x_max {
        out.push((*state & 0xff) as u8);
        *state >>= 8;
    }
    *state = ((*state / freq) << table.total_bits) + (*state % freq) + start;
}

fn decode_symbol(state: &mut u32, table: &RansTable, data: &[u8], pos: &mut usize) -> usize {
    let mask = (1u32 << table.total_bits) - 1;
    let slot = *state & mask;
    let symbol = table.symbol_of_slot(slot);
    let freq = table.freq_of(symbol);
    let start = table.cum_freq[symbol];
    *state = freq * (*state >> table.total_bits) + slot - start;
    while *state < RANS_L {
        let byte = *data.get(*pos).unwrap_or(&0);
        *state = (*state << 8) | byte as u32;
        *pos += 1;
    }
    symbol
}

/// Encodes `symbols` (indices into `table`'s alphabet) into a byte stream
/// that `decode` can invert given the same table and symbol count.
pub fn encode(symbols: &[usize], table: &RansTable) -> Vec<u8> {
    let mut state = RANS_L;
    let mut out = Vec::new();
    for &sym in symbols.iter().rev() {
        encode_symbol(&mut state, sym, table, &mut out);
    }
    out.extend_from_slice(&state.to_le_bytes());
    out.reverse();
    out
}

pub fn decode(data: &[u8], table: &RansTable, count: usize) -> Vec<usize> {
    let mut pos = 0usize;
    let mut state = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    pos += 4;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(decode_symbol(&mut state, table, data, &mut pos));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_skewed_alphabet() {
        let counts = [100u64, 1, 1, 5];
        let freq = RansTable::normalize(&counts, 12);
        let table = RansTable::from_normalized(&freq, 12);

        let symbols = [0usize, 0, 3, 1, 0, 2, 0, 3, 0, 0];
        let encoded = encode(&symbols, &table);
        let decoded = decode(&encoded, &table, symbols.len());
        assert_eq!(decoded, symbols);
    }

    #[test]
    fn roundtrips_uniform_alphabet() {
        let counts = [1u64; 8];
        let freq = RansTable::normalize(&counts, 8);
        let table = RansTable::from_normalized(&freq, 8);

        let symbols: Vec<usize> = (0..50).map(|i| i % 8).collect();
        let encoded = encode(&symbols, &table);
        let decoded = decode(&encoded, &table, symbols.len());
        assert_eq!(decoded, symbols);
    }
}
