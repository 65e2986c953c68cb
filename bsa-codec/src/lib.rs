//! Codec layer for BSA game archives.
//!
//! The archives store four flavors of packed pixel data plus an XOR-ciphered
//! text format. This crate implements the symmetric transforms for all of
//! them:
//!
//! - [`lzss`] — flag-grouped LZSS over a 4096-byte sliding window
//! - [`huffcode`] — a fixed-Huffman dictionary coder (the format's
//!   "deflate"; unrelated to IETF Deflate) with table-coded offsets
//! - [`rle`] — per-line and stream run-length coding
//! - [`crypt`] — the counter+key XOR stream cipher used by `.INF` text
//!
//! The supporting machinery ([`bits`], [`window`], [`huffman`]) is public
//! because the codecs are bit-exact wire formats: two implementations
//! interoperate only if they share the window pre-fill, the frozen tree and
//! the offset tables embedded here.

pub mod bits;
pub mod crypt;
pub mod error;
pub mod huffcode;
pub mod huffman;
pub mod lzss;
pub mod rle;
pub mod window;

pub use bits::{BitsReader, BitsWriter};
pub use error::{CodecError, Result};
pub use huffman::HuffmanTree;
pub use window::{DuplicateMatch, SlidingWindow, WINDOW_SIZE};
