//! Flag-grouped LZSS over the 4096-byte window.
//!
//! The stream is a repetition of groups: one flag byte followed by eight
//! operations, the flag's bits read LSB first. A set bit is a literal byte;
//! a clear bit is a two-byte back-reference packing a 12-bit window index
//! and a 4-bit length (stored length + 3). Both sides pre-fill 0xFEE bytes
//! of the window with spaces before any data moves.

use tracing::trace;

use crate::error::{CodecError, Result};
use crate::window::SlidingWindow;

/// Space pre-fill before the first real byte.
const PREFILL: usize = 0xFEE;

/// Lengths are stored on 4 bits as `length - 3`.
const MAX_DUPLICATE_LENGTH: usize = 18;

/// Decompress an LZSS stream. The output size is whatever the stream
/// produces; a back-reference missing its second byte is an error, but
/// ending between operations is not.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    trace!(compressed = data.len(), "LZSS decompress");
    let mut window = SlidingWindow::prefilled(false, PREFILL);
    let mut out = Vec::new();
    let mut flags: u16 = 0;
    let mut pos = 0;
    while pos < data.len() {
        // shift to the next flag bit, fetching a fresh flag byte when the
        // high marker bits run out
        flags >>= 1;
        if flags & 0xFF00 == 0 {
            flags = u16::from(data[pos]) | 0xFF00;
            pos += 1;
            if pos >= data.len() {
                break;
            }
        }
        if flags & 0x01 == 1 {
            let byte = data[pos];
            pos += 1;
            out.push(byte);
            window.insert(byte);
        } else {
            let b1 = data[pos];
            pos += 1;
            let b2 = *data.get(pos).ok_or(CodecError::TruncatedInput)?;
            pos += 1;
            let length = usize::from(b2 & 0x0F) + 3;
            let start = (usize::from(b2 & 0xF0) << 4) | usize::from(b1);
            // read before each insert so a reference that overlaps the
            // cursor replays the bytes it is producing
            for k in 0..length {
                let byte = window.read_at(start + k);
                out.push(byte);
                window.insert(byte);
            }
        }
    }
    Ok(out)
}

/// Compress with greedy longest-match selection, back-referencing any
/// duplicate of three bytes or more.
pub fn compress(data: &[u8]) -> Vec<u8> {
    trace!(uncompressed = data.len(), "LZSS compress");
    let mut window = SlidingWindow::prefilled(true, PREFILL);
    let mut out = Vec::new();
    let mut group: Vec<u8> = Vec::with_capacity(16);
    let mut flags: u8 = 0;
    let mut flags_used = 0u32;
    let mut pos = 0;
    while pos < data.len() {
        if flags_used == 8 {
            out.push(flags);
            out.extend_from_slice(&group);
            flags = 0;
            flags_used = 0;
            group.clear();
        }
        let found = window.find_duplicate(&data[pos..], MAX_DUPLICATE_LENGTH);
        if found.length > 2 {
            flags >>= 1;
            flags_used += 1;
            group.push((found.start & 0xFF) as u8);
            group.push((((found.start & 0x0F00) >> 4) | (found.length - 3)) as u8);
            for _ in 0..found.length {
                window.insert(data[pos]);
                pos += 1;
            }
        } else {
            flags = (flags >> 1) | 0x80;
            flags_used += 1;
            group.push(data[pos]);
            window.insert(data[pos]);
            pos += 1;
        }
    }
    // partial final group: align the used flag bits down to bit zero
    if flags_used > 0 {
        flags >>= 8 - flags_used;
        out.push(flags);
        out.extend_from_slice(&group);
    }
    out
}
