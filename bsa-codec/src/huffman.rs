//! Fixed prefix-code tree and offset tables for the dictionary codec.
//!
//! The tree is the frozen initial state of the classic adaptive-Huffman
//! dictionary coder: 314 symbols (256 literal bytes plus copy lengths
//! 3..=60), all starting at weight one and paired sequentially. The format
//! never updates or transmits the tree, so the shape produced by that
//! construction *is* the wire format, as are the two 256-entry offset
//! tables below. Changing any of them breaks interoperability.
//!
//! Node layout follows the original arrays: internal nodes occupy indices
//! `0..627` with the root at 626, and a leaf for symbol `s` is identified
//! by the value `s + 627`. Symbols `0..256` are literals; `256..314` encode
//! copy lengths `symbol - 256 + 3`.

use crate::bits::{BitsReader, BitsWriter};
use crate::error::Result;

/// Literal bytes plus copy-length symbols.
pub const NUM_SYMBOLS: usize = 314;
/// Internal node count; also the bias added to a symbol to form its leaf id.
pub const LEAF_BASE: u16 = (2 * NUM_SYMBOLS - 1) as u16;
/// First leaf id that encodes a copy length rather than a literal.
pub const LENGTH_LEAF_BASE: u16 = LEAF_BASE + 256;

const TABLE_SIZE: usize = 2 * NUM_SYMBOLS - 1;
const ROOT: usize = TABLE_SIZE - 1;

/// High six bits of a match offset, indexed by the first stream byte of an
/// offset code.
pub const OFFSET_HIGH_BITS: [u8; 256] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01,
    0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01,
    0x02, 0x02, 0x02, 0x02, 0x02, 0x02, 0x02, 0x02,
    0x02, 0x02, 0x02, 0x02, 0x02, 0x02, 0x02, 0x02,
    0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03,
    0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03,
    0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04,
    0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05,
    0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06,
    0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07,
    0x08, 0x08, 0x08, 0x08, 0x08, 0x08, 0x08, 0x08,
    0x09, 0x09, 0x09, 0x09, 0x09, 0x09, 0x09, 0x09,
    0x0A, 0x0A, 0x0A, 0x0A, 0x0A, 0x0A, 0x0A, 0x0A,
    0x0B, 0x0B, 0x0B, 0x0B, 0x0B, 0x0B, 0x0B, 0x0B,
    0x0C, 0x0C, 0x0C, 0x0C, 0x0D, 0x0D, 0x0D, 0x0D,
    0x0E, 0x0E, 0x0E, 0x0E, 0x0F, 0x0F, 0x0F, 0x0F,
    0x10, 0x10, 0x10, 0x10, 0x11, 0x11, 0x11, 0x11,
    0x12, 0x12, 0x12, 0x12, 0x13, 0x13, 0x13, 0x13,
    0x14, 0x14, 0x14, 0x14, 0x15, 0x15, 0x15, 0x15,
    0x16, 0x16, 0x16, 0x16, 0x17, 0x17, 0x17, 0x17,
    0x18, 0x18, 0x19, 0x19, 0x1A, 0x1A, 0x1B, 0x1B,
    0x1C, 0x1C, 0x1D, 0x1D, 0x1E, 0x1E, 0x1F, 0x1F,
    0x20, 0x20, 0x21, 0x21, 0x22, 0x22, 0x23, 0x23,
    0x24, 0x24, 0x25, 0x25, 0x26, 0x26, 0x27, 0x27,
    0x28, 0x28, 0x29, 0x29, 0x2A, 0x2A, 0x2B, 0x2B,
    0x2C, 0x2C, 0x2D, 0x2D, 0x2E, 0x2E, 0x2F, 0x2F,
    0x30, 0x31, 0x32, 0x33, 0x34, 0x35, 0x36, 0x37,
    0x38, 0x39, 0x3A, 0x3B, 0x3C, 0x3D, 0x3E, 0x3F,
];

/// Total bit length of an offset code minus the six verbatim low bits,
/// indexed like [`OFFSET_HIGH_BITS`]. The decoder reads `value - 2` extra
/// bits after the first stream byte.
pub const NB_BITS_MISSING_IN_OFFSET_LOW_BITS: [u8; 256] = [
    0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03,
    0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03,
    0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03,
    0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03,
    0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04,
    0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04,
    0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04,
    0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04,
    0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04,
    0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04,
    0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05,
    0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05,
    0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05,
    0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05,
    0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05,
    0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05,
    0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05,
    0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05,
    0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06,
    0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06,
    0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06,
    0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06,
    0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06,
    0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06,
    0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07,
    0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07,
    0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07,
    0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07,
    0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07,
    0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07,
    0x08, 0x08, 0x08, 0x08, 0x08, 0x08, 0x08, 0x08,
    0x08, 0x08, 0x08, 0x08, 0x08, 0x08, 0x08, 0x08,
];

/// The frozen prefix-code tree.
pub struct HuffmanTree {
    /// For an internal node, the even index of its left child; for a node
    /// in `0..314`, the leaf id `index + 627`.
    son: [u16; TABLE_SIZE],
    /// Parent node of each node, plus a tail mapping leaf ids to their
    /// node index.
    prnt: [u16; TABLE_SIZE + NUM_SYMBOLS],
}

impl Default for HuffmanTree {
    fn default() -> Self {
        Self::new()
    }
}

impl HuffmanTree {
    pub fn new() -> Self {
        let mut son = [0u16; TABLE_SIZE];
        let mut prnt = [0u16; TABLE_SIZE + NUM_SYMBOLS];
        for i in 0..NUM_SYMBOLS {
            son[i] = (i + TABLE_SIZE) as u16;
            prnt[i + TABLE_SIZE] = i as u16;
        }
        let mut i = 0;
        for j in NUM_SYMBOLS..TABLE_SIZE {
            son[j] = i as u16;
            prnt[i] = j as u16;
            prnt[i + 1] = j as u16;
            i += 2;
        }
        Self { son, prnt }
    }

    /// Consume bits until a leaf is reached; returns the leaf id in
    /// `[627, 941)`.
    pub fn find_leaf(&self, bits: &mut BitsReader<'_>) -> Result<u16> {
        let mut node = self.son[ROOT];
        while (node as usize) < TABLE_SIZE {
            let bit = u16::from(bits.get_bits()? >> 7);
            bits.remove_bits(1);
            node = self.son[(node + bit) as usize];
        }
        Ok(node)
    }

    /// Emit the root-to-leaf bit path for a leaf id in `[627, 941)`.
    pub fn write_path_for_leaf(&self, bits: &mut BitsWriter, leaf: u16) {
        // Left children sit at even indices, so the low bit of a node index
        // is its branch bit. Collected leaf-to-root, emitted reversed.
        let mut path = [0u8; NUM_SYMBOLS];
        let mut depth = 0;
        let mut node = self.prnt[leaf as usize];
        while (node as usize) != ROOT {
            path[depth] = (node & 1) as u8;
            depth += 1;
            node = self.prnt[node as usize];
        }
        for &bit in path[..depth].iter().rev() {
            bits.add_bits(u16::from(bit), 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip_symbol(tree: &HuffmanTree, symbol: u16) {
        let mut writer = BitsWriter::new();
        tree.write_path_for_leaf(&mut writer, symbol + LEAF_BASE);
        let bytes = writer.into_bytes();
        let mut reader = BitsReader::new(&bytes);
        assert_eq!(tree.find_leaf(&mut reader).unwrap(), symbol + LEAF_BASE);
    }

    #[test]
    fn every_symbol_round_trips() {
        let tree = HuffmanTree::new();
        for symbol in 0..NUM_SYMBOLS as u16 {
            round_trip_symbol(&tree, symbol);
        }
    }

    #[test]
    fn paths_are_prefix_free() {
        // Concatenate the paths of several symbols and decode them back in
        // order; any prefix ambiguity would desynchronize the stream.
        let tree = HuffmanTree::new();
        let symbols = [0u16, 1, 65, 255, 256, 280, 313];
        let mut writer = BitsWriter::new();
        for &s in &symbols {
            tree.write_path_for_leaf(&mut writer, s + LEAF_BASE);
        }
        let bytes = writer.into_bytes();
        let mut reader = BitsReader::new(&bytes);
        for &s in &symbols {
            assert_eq!(tree.find_leaf(&mut reader).unwrap(), s + LEAF_BASE);
        }
    }

    #[test]
    fn offset_tables_are_consistent() {
        // Every 12-bit offset must survive the split/rejoin performed by
        // the codec: table index plus extra bits back to the same offset.
        for offset in 0u16..4096 {
            let high = offset >> 6;
            let low = offset & 0x3F;
            let base = OFFSET_HIGH_BITS
                .iter()
                .position(|&h| u16::from(h) == high)
                .unwrap();
            let extra = u32::from(NB_BITS_MISSING_IN_OFFSET_LOW_BITS[base]) - 2;
            let index = base as u16 + (low >> extra);
            assert_eq!(u16::from(OFFSET_HIGH_BITS[index as usize]), high);
            let rebuilt_low = ((index << extra) | (low & ((1u16 << extra) - 1))) & 0x3F;
            assert_eq!(rebuilt_low, low);
        }
    }

    #[test]
    fn table_blocks_share_bit_lengths() {
        // Within one high-bits block the extra-bit count is constant.
        for i in 1..256 {
            if OFFSET_HIGH_BITS[i] == OFFSET_HIGH_BITS[i - 1] {
                assert_eq!(
                    NB_BITS_MISSING_IN_OFFSET_LOW_BITS[i],
                    NB_BITS_MISSING_IN_OFFSET_LOW_BITS[i - 1]
                );
            }
        }
    }
}
