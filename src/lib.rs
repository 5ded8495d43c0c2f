//! # topk-lzend
//!
//! A research workbench for two related online-compression ideas: a
//! streaming top-k frequent-prefix filter (Space-Saving / Misra-Gries,
//! optionally Count-Min-sketch-assisted) and an LZ-End factorizer that uses
//! that filter's supporting structures to find reusable phrases in a single
//! forward pass.
//!
//! ## Buffer example
//!
//! ```rs
//! use topk_lzend::{lzend, config::STD_CONFIG};
//! let test_data = "This is the chaunt of the priests.  The chaunt of the priests of Mung.".as_bytes();
//! let compressed = lzend::compress(test_data, &STD_CONFIG).expect("compression failed");
//! let expanded = lzend::expand(&compressed).expect("expansion failed");
//! assert_eq!(expanded, test_data);
//! ```

pub mod block_coder;
pub mod config;
pub mod count_min;
pub mod error;
pub mod huffman;
pub mod lzend;
pub mod lzend_parser;
pub mod min_pq;
pub mod parsing;
pub mod rans;
pub mod rev_phrase_trie;
pub mod rolling_hash;
pub mod space_saving;
pub mod topk_filter;
pub mod topk_lz78;
pub mod trie;
pub mod trie_edge;
pub mod window_index;

pub use error::{Error, DYNERR, STDRESULT};
