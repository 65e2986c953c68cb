//! Run-length coding, per pixel line or as a single stream.
//!
//! Each token is a control byte: values of 128 and above repeat the next
//! byte `(control & 0x7F) + 1` times, lower values copy the next
//! `control + 1` bytes verbatim. Tokens never cross a line boundary, so
//! each of the `height` lines decodes to exactly `width` bytes. The stream
//! form is the same codec with a single line the size of the whole buffer.

use tracing::trace;

use crate::error::{CodecError, Result};

/// Decompress `height` lines of `width` bytes each.
pub fn decompress_lines(data: &[u8], width: usize, height: usize) -> Result<Vec<u8>> {
    trace!(compressed = data.len(), width, height, "RLE decompress");
    let mut out = Vec::with_capacity(width * height);
    let mut pos = 0;
    for _ in 0..height {
        let mut left = width;
        while left > 0 {
            let control = *data.get(pos).ok_or(CodecError::TruncatedInput)?;
            pos += 1;
            if control >= 128 {
                let count = usize::from(control & 0x7F) + 1;
                if count > left {
                    return Err(CodecError::LineOverrun {
                        token: count,
                        remaining: left,
                    });
                }
                let value = *data.get(pos).ok_or(CodecError::TruncatedInput)?;
                pos += 1;
                out.resize(out.len() + count, value);
                left -= count;
            } else {
                let count = usize::from(control) + 1;
                if count > left {
                    return Err(CodecError::LineOverrun {
                        token: count,
                        remaining: left,
                    });
                }
                let literals = data
                    .get(pos..pos + count)
                    .ok_or(CodecError::TruncatedInput)?;
                out.extend_from_slice(literals);
                pos += count;
                left -= count;
            }
        }
    }
    Ok(out)
}

/// Compress `height` lines of `width` bytes each, greedily choosing
/// between run and literal tokens of up to 128 bytes.
pub fn compress_lines(data: &[u8], width: usize, height: usize) -> Result<Vec<u8>> {
    trace!(uncompressed = data.len(), width, height, "RLE compress");
    let mut out = Vec::new();
    let mut pos = 0;
    for _ in 0..height {
        let mut left = width;
        while left > 0 {
            if left == 1 {
                // lone trailing byte of the line
                out.push(0x00);
                out.push(*data.get(pos).ok_or(CodecError::UnexpectedEndOfData)?);
                pos += 1;
                left -= 1;
                continue;
            }
            let rest = &data[pos..];
            if rest.len() < 2 {
                return Err(CodecError::UnexpectedEndOfData);
            }
            if rest[0] != rest[1] {
                let mut count = 0;
                while rest.len() - count >= 2
                    && rest[count] != rest[count + 1]
                    && count < 128
                    && left - count > 0
                {
                    count += 1;
                }
                // a single byte left on the line joins the literal token
                if count < 128 && left - count == 1 {
                    count += 1;
                }
                out.push((count - 1) as u8);
                out.extend_from_slice(&rest[..count]);
                pos += count;
                left -= count;
            } else {
                let mut count = 0;
                while count < rest.len() && rest[0] == rest[count] && count < 128 && left - count > 0
                {
                    count += 1;
                }
                out.push(((count - 1) as u8) | 0x80);
                out.push(rest[0]);
                pos += count;
                left -= count;
            }
        }
    }
    Ok(out)
}

/// Stream form: one line covering the whole buffer.
pub fn decompress(data: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
    decompress_lines(data, uncompressed_size, 1)
}

/// Stream form of [`compress_lines`].
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    compress_lines(data, data.len(), 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_and_literal_token_boundary() {
        // line 1 = short run then a literal pair, line 2 = one full run
        let data = [0x01, 0x01, 0x01, 0x02, 0x03, 0x04, 0x04, 0x04, 0x04, 0x04];
        let compressed = compress_lines(&data, 5, 2).unwrap();
        assert_eq!(
            compressed,
            vec![0x82, 0x01, 0x01, 0x02, 0x03, 0x84, 0x04]
        );
        assert_eq!(decompress_lines(&compressed, 5, 2).unwrap(), data);
    }

    #[test]
    fn empty_input_round_trips() {
        assert!(compress(&[]).unwrap().is_empty());
        assert!(decompress(&[], 0).unwrap().is_empty());
    }

    #[test]
    fn single_byte_line_uses_zero_control() {
        let compressed = compress_lines(&[0x7A], 1, 1).unwrap();
        assert_eq!(compressed, vec![0x00, 0x7A]);
        assert_eq!(decompress_lines(&compressed, 1, 1).unwrap(), vec![0x7A]);
    }

    #[test]
    fn runs_split_at_128() {
        let data = vec![0x33u8; 300];
        let compressed = compress(&data).unwrap();
        assert_eq!(
            compressed,
            vec![0xFF, 0x33, 0xFF, 0x33, 0xAB, 0x33]
        );
        assert_eq!(decompress(&compressed, 300).unwrap(), data);
    }

    #[test]
    fn runs_do_not_cross_lines() {
        // the same byte everywhere, but 4-byte lines force 4-byte runs
        let data = vec![0x11u8; 12];
        let compressed = compress_lines(&data, 4, 3).unwrap();
        assert_eq!(
            compressed,
            vec![0x83, 0x11, 0x83, 0x11, 0x83, 0x11]
        );
        assert_eq!(decompress_lines(&compressed, 4, 3).unwrap(), data);
    }

    #[test]
    fn alternating_bytes_become_literals() {
        let data = [1u8, 2, 1, 2, 1, 2];
        let compressed = compress(&data).unwrap();
        assert_eq!(compressed, vec![0x05, 1, 2, 1, 2, 1, 2]);
        assert_eq!(decompress(&compressed, 6).unwrap(), data);
    }

    #[test]
    fn arbitrary_grid_round_trips() {
        let mut data = Vec::new();
        for i in 0..(61 * 47usize) {
            data.push(if i % 13 < 7 { 0xAA } else { (i % 256) as u8 });
        }
        let compressed = compress_lines(&data, 61, 47).unwrap();
        assert_eq!(decompress_lines(&compressed, 61, 47).unwrap(), data);
    }

    #[test]
    fn overrunning_token_is_corrupt() {
        // run of 5 into a 3-byte line
        let result = decompress_lines(&[0x84, 0xFF], 3, 1);
        assert!(matches!(result, Err(CodecError::LineOverrun { .. })));
    }

    #[test]
    fn missing_run_value_is_truncated() {
        let result = decompress_lines(&[0x84], 5, 1);
        assert!(matches!(result, Err(CodecError::TruncatedInput)));
    }

    #[test]
    fn encoder_rejects_short_input() {
        // 10 bytes promised, 4 supplied
        let result = compress_lines(&[1, 2, 3, 4], 10, 1);
        assert!(matches!(result, Err(CodecError::UnexpectedEndOfData)));
    }
}
