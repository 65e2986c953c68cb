//! DFA animation decoder.
//!
//! Header (12 bytes, little-endian): `frame_count`, `offset_x`,
//! `offset_y`, `width`, `height` as u16, then the u16 size of the
//! run-length payload of the first frame. Every later frame starts as a
//! copy of the first and is patched by chunks of replacement pixels:
//! `u16 diff_size`, `u16 chunk_count`, then per chunk `u16 start_offset`,
//! `u16 pixel_count` and the pixels themselves.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;
use tracing::debug;

use bsa_codec::rle;

use crate::error::{ensure_len, AssetError, Result};
use crate::palette::Palette;

/// A decoded animation: equally sized frames over one palette.
pub struct Dfa {
    offset_x: u16,
    offset_y: u16,
    width: u16,
    height: u16,
    frames: Vec<Vec<u8>>,
    palette: Palette,
}

impl Dfa {
    pub fn parse(data: &[u8], palette: Palette) -> Result<Self> {
        Self::parse_inner(data, palette).map_err(|e| AssetError::Load {
            asset: "DFA",
            source: Box::new(e),
        })
    }

    fn parse_inner(data: &[u8], palette: Palette) -> Result<Self> {
        ensure_len(data, 12)?;
        let mut header = Cursor::new(data);
        let frame_count = header.read_u16::<LittleEndian>()?;
        let offset_x = header.read_u16::<LittleEndian>()?;
        let offset_y = header.read_u16::<LittleEndian>()?;
        let width = header.read_u16::<LittleEndian>()?;
        let height = header.read_u16::<LittleEndian>()?;
        let first_frame_size = usize::from(header.read_u16::<LittleEndian>()?);
        let pixel_count = usize::from(width) * usize::from(height);
        debug!(frame_count, width, height, "decoding DFA");

        let mut pos = 12usize;
        ensure_len(&data[pos..], first_frame_size)?;
        let first_frame = rle::decompress(&data[pos..pos + first_frame_size], pixel_count)?;
        pos += first_frame_size;

        // the first frame exists even for a zero frame count
        let mut frames = vec![first_frame];
        for _ in 1..frame_count {
            frames.push(frames[0].clone());
        }

        for frame_index in 1..usize::from(frame_count) {
            ensure_len(&data[pos..], 2)?;
            let diff_size = usize::from(u16::from_le_bytes([data[pos], data[pos + 1]]));
            pos += 2;
            ensure_len(&data[pos..], diff_size)?;
            ensure_len(&data[pos..], 2)?;
            let chunk_count = usize::from(u16::from_le_bytes([data[pos], data[pos + 1]]));
            pos += 2;

            let frame = &mut frames[frame_index];
            for _ in 0..chunk_count {
                ensure_len(&data[pos..], 4)?;
                let start = usize::from(u16::from_le_bytes([data[pos], data[pos + 1]]));
                let count = usize::from(u16::from_le_bytes([data[pos + 2], data[pos + 3]]));
                pos += 4;
                ensure_len(&data[pos..], count)?;
                if start + count > frame.len() {
                    return Err(AssetError::PatchOutOfBounds {
                        offset: start,
                        count,
                        len: frame.len(),
                    });
                }
                frame[start..start + count].copy_from_slice(&data[pos..pos + count]);
                pos += count;
            }
        }

        for frame in &frames {
            if frame.len() != pixel_count {
                return Err(AssetError::PixelCountMismatch {
                    expected: pixel_count,
                    actual: frame.len(),
                });
            }
        }

        Ok(Self {
            offset_x,
            offset_y,
            width,
            height,
            frames,
            palette,
        })
    }

    pub fn offset_x(&self) -> u16 {
        self.offset_x
    }

    pub fn offset_y(&self) -> u16 {
        self.offset_y
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Decoded frames, each `width * height` palette indices.
    pub fn frames(&self) -> &[Vec<u8>] {
        &self.frames
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn set_palette(&mut self, palette: Palette) {
        self.palette = palette;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_dfa(
        frame_count: u16,
        width: u16,
        height: u16,
        first_frame: &[u8],
        diffs: &[Vec<(u16, Vec<u8>)>],
    ) -> Vec<u8> {
        let compressed = rle::compress(first_frame).unwrap();
        let mut data = Vec::new();
        data.extend_from_slice(&frame_count.to_le_bytes());
        data.extend_from_slice(&3u16.to_le_bytes()); // offset_x
        data.extend_from_slice(&5u16.to_le_bytes()); // offset_y
        data.extend_from_slice(&width.to_le_bytes());
        data.extend_from_slice(&height.to_le_bytes());
        data.extend_from_slice(&(compressed.len() as u16).to_le_bytes());
        data.extend_from_slice(&compressed);
        for chunks in diffs {
            let mut body = Vec::new();
            body.extend_from_slice(&(chunks.len() as u16).to_le_bytes());
            for (start, pixels) in chunks {
                body.extend_from_slice(&start.to_le_bytes());
                body.extend_from_slice(&(pixels.len() as u16).to_le_bytes());
                body.extend_from_slice(pixels);
            }
            data.extend_from_slice(&(body.len() as u16).to_le_bytes());
            data.extend_from_slice(&body);
        }
        data
    }

    #[test]
    fn patched_frames_diverge_from_the_first() {
        let first: Vec<u8> = vec![0x00; 6 * 4];
        let data = build_dfa(
            3,
            6,
            4,
            &first,
            &[
                vec![(0, vec![0xAA, 0xBB])],
                vec![(4, vec![0x11]), (20, vec![0x22, 0x33])],
            ],
        );
        let dfa = Dfa::parse(&data, Palette::default()).unwrap();
        assert_eq!(dfa.frame_count(), 3);
        assert_eq!(dfa.frames()[0], first);
        assert_eq!(&dfa.frames()[1][..2], &[0xAA, 0xBB]);
        assert_eq!(dfa.frames()[1][2..], first[2..]);
        assert_eq!(dfa.frames()[2][4], 0x11);
        assert_eq!(&dfa.frames()[2][20..22], &[0x22, 0x33]);
        for frame in dfa.frames() {
            assert_eq!(frame.len(), 24);
        }
    }

    #[test]
    fn single_frame_animation() {
        let first: Vec<u8> = (0..12).collect();
        let data = build_dfa(1, 4, 3, &first, &[]);
        let dfa = Dfa::parse(&data, Palette::default()).unwrap();
        assert_eq!(dfa.frame_count(), 1);
        assert_eq!(dfa.frames()[0], first);
        assert_eq!(dfa.offset_x(), 3);
        assert_eq!(dfa.offset_y(), 5);
    }

    #[test]
    fn zero_frame_count_still_decodes_the_first_frame() {
        let first: Vec<u8> = vec![7; 8];
        let data = build_dfa(0, 4, 2, &first, &[]);
        let dfa = Dfa::parse(&data, Palette::default()).unwrap();
        assert_eq!(dfa.frame_count(), 1);
    }

    #[test]
    fn patch_outside_the_frame_is_rejected() {
        let first: Vec<u8> = vec![0; 8];
        let data = build_dfa(2, 4, 2, &first, &[vec![(7, vec![1, 2, 3])]]);
        let result = Dfa::parse(&data, Palette::default());
        assert!(matches!(
            result,
            Err(AssetError::Load { source, .. })
                if matches!(*source, AssetError::PatchOutOfBounds { .. })
        ));
    }

    #[test]
    fn wrong_first_frame_size_is_a_pixel_mismatch() {
        // first frame decodes to 8 pixels but the header claims 3x3
        let first: Vec<u8> = vec![0; 8];
        let compressed = rle::compress(&first).unwrap();
        let mut data = Vec::new();
        data.extend_from_slice(&1u16.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&3u16.to_le_bytes());
        data.extend_from_slice(&3u16.to_le_bytes());
        data.extend_from_slice(&(compressed.len() as u16).to_le_bytes());
        data.extend_from_slice(&compressed);
        let result = Dfa::parse(&data, Palette::default());
        assert!(result.is_err());
    }

    #[test]
    fn truncated_diff_block_is_an_error() {
        let first: Vec<u8> = vec![0; 8];
        let compressed = rle::compress(&first).unwrap();
        let mut data = Vec::new();
        data.extend_from_slice(&2u16.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&4u16.to_le_bytes());
        data.extend_from_slice(&2u16.to_le_bytes());
        data.extend_from_slice(&(compressed.len() as u16).to_le_bytes());
        data.extend_from_slice(&compressed);
        data.extend_from_slice(&100u16.to_le_bytes()); // diff_size far past the end
        let result = Dfa::parse(&data, Palette::default());
        assert!(matches!(
            result,
            Err(AssetError::Load { source, .. })
                if matches!(*source, AssetError::Truncated { .. })
        ));
    }
}
