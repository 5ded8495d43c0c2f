//! Configuration knobs shared by the top-k filter and the LZ-End parser.

use crate::error::Error;

/// How the sketch-assisted top-k filter's min-priority-queue keys its
/// entries. `ApproxBitWidth` surfaces the source's `approx_minpq_` mode as an
/// explicit, distinct choice rather than a guessed default (see DESIGN.md).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MinPqMode {
    Exact,
    ApproxBitWidth,
}

/// Top-level configuration for a compression run.
#[derive(Clone, Debug)]
pub struct Config {
    /// trie capacity for the top-k prefix filter (root + k-1 occupied slots)
    pub k: usize,
    /// number of columns in the Count-Min sketch (rounded up to a power of two)
    pub sketch_columns: usize,
    /// number of independent sketch rows (this crate's sketch is fixed at 2 rows,
    /// but the value is carried through the file header for forward compatibility)
    pub sketch_rows: u8,
    /// LZ-End block size (each of the three sliding blocks)
    pub window: usize,
    /// block token coder's max tokens per block
    pub block: usize,
    pub min_pq_mode: MinPqMode,
}

pub const STD_CONFIG: Config = Config {
    k: 1 << 16,
    sketch_columns: 1 << 14,
    sketch_rows: 2,
    window: 1 << 12,
    block: 1 << 12,
    min_pq_mode: MinPqMode::Exact,
};

impl Config {
    pub fn validate(&self) -> Result<(), Error> {
        if self.k < 2 {
            return Err(Error::ConfigInvalid("k must be at least 2".into()));
        }
        if self.sketch_columns < 2 || !self.sketch_columns.is_power_of_two() {
            return Err(Error::ConfigInvalid(
                "sketch_columns must be a power of two >= 2".into(),
            ));
        }
        if self.window < 2 {
            return Err(Error::ConfigInvalid("window must be at least 2".into()));
        }
        if self.block == 0 {
            return Err(Error::ConfigInvalid("block must be nonzero".into()));
        }
        Ok(())
    }
}
