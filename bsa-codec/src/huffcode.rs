//! The fixed-Huffman dictionary codec (the format's "deflate").
//!
//! Literals and copy lengths share one frozen prefix-code tree; match
//! offsets are split into six verbatim low bits and table-coded high bits
//! (see [`crate::huffman`]). The uncompressed size is not part of this
//! stream: the enclosing asset header transmits it and the decoder stops
//! once that many bytes have been produced. A final copy token may overrun
//! the target count; callers validate the total.
//!
//! Unrelated to IETF Deflate beyond the general literal/match idea.

use tracing::trace;

use crate::bits::{BitsReader, BitsWriter};
use crate::error::{CodecError, Result};
use crate::huffman::{
    HuffmanTree, LEAF_BASE, LENGTH_LEAF_BASE, NB_BITS_MISSING_IN_OFFSET_LOW_BITS, OFFSET_HIGH_BITS,
};
use crate::window::{SlidingWindow, WINDOW_SIZE};

/// Space pre-fill before the first real byte.
const PREFILL: usize = 4036;

/// The tree has copy-length symbols for 3..=60 only.
const MAX_DUPLICATE_LENGTH: usize = 60;

/// Decompress until `uncompressed_size` bytes have been produced.
pub fn decompress(data: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
    trace!(
        compressed = data.len(),
        uncompressed = uncompressed_size,
        "huffcode decompress"
    );
    let tree = HuffmanTree::new();
    let mut window = SlidingWindow::prefilled(false, PREFILL);
    let mut bits = BitsReader::new(data);
    let mut out = Vec::with_capacity(uncompressed_size);
    while out.len() < uncompressed_size {
        let symbol = tree.find_leaf(&mut bits)? - LEAF_BASE;
        if symbol < 256 {
            let byte = symbol as u8;
            out.push(byte);
            window.insert(byte);
        } else {
            let index = usize::from(bits.get_bits()?);
            bits.remove_bits(8);
            let mut low = index as u16;
            let high = u16::from(OFFSET_HIGH_BITS[index]) << 6;
            let extra = u32::from(NB_BITS_MISSING_IN_OFFSET_LOW_BITS[index]) - 2;
            for _ in 0..extra {
                let bit = bits.get_bits()? >> 7;
                bits.remove_bits(1);
                low = (low << 1) | u16::from(bit);
            }
            let offset = usize::from((low & 0x3F) | high);
            let copy_pos = (window.cursor() + WINDOW_SIZE - offset - 1) & 0x0FFF;
            let length = usize::from(symbol - 256) + 3;
            for k in 0..length {
                let byte = window.read_at(copy_pos + k);
                out.push(byte);
                window.insert(byte);
            }
        }
    }
    Ok(out)
}

/// Compress with greedy longest-match selection up to 60 bytes.
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    trace!(uncompressed = data.len(), "huffcode compress");
    let tree = HuffmanTree::new();
    let mut window = SlidingWindow::prefilled(true, PREFILL);
    let mut bits = BitsWriter::new();
    let mut pos = 0;
    while pos < data.len() {
        let found = window.find_duplicate(&data[pos..], MAX_DUPLICATE_LENGTH);
        if found.length > 2 {
            let offset = (window.cursor() + WINDOW_SIZE - found.start - 1) & 0x0FFF;
            let low = (offset & 0x3F) as u16;
            let high = (offset >> 6) as u16;
            // smallest table index whose high-bits entry matches; the
            // block-internal position comes from the top low bits
            let base = OFFSET_HIGH_BITS
                .iter()
                .position(|&h| u16::from(h) == high)
                .ok_or(CodecError::InvalidOffsetHighBits(high))?;
            let extra = u32::from(NB_BITS_MISSING_IN_OFFSET_LOW_BITS[base]) - 2;
            let index = base as u16 + (low >> extra);
            tree.write_path_for_leaf(&mut bits, (found.length - 3) as u16 + LENGTH_LEAF_BASE);
            bits.add_bits(index, 8);
            bits.add_bits(low & ((1u16 << extra) - 1), extra);
            for _ in 0..found.length {
                window.insert(data[pos]);
                pos += 1;
            }
        } else {
            tree.write_path_for_leaf(&mut bits, u16::from(data[pos]) + LEAF_BASE);
            window.insert(data[pos]);
            pos += 1;
        }
    }
    Ok(bits.into_bytes())
}
