//! CFA animation decoder.
//!
//! Header layout (little-endian):
//!
//! ```text
//! width            : u16
//! height           : u16
//! compressed_width : u16
//! offset_x         : u16
//! offset_y         : u16
//! bpp              : u8
//! frame_count      : u8
//! header_size      : u16
//! frame_offsets    : 30 x u16   start of each frame past the first
//! total_size       : u16
//! color_subtable   : header_size - 76 bytes of palette indices
//! ```
//!
//! Frame payloads are run-length streams; decoded pixels are indices into
//! the subtable when one is present, otherwise direct palette indices.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;
use tracing::debug;

use bsa_codec::rle;

use crate::error::{ensure_len, AssetError, Result};
use crate::palette::Palette;

/// Fixed header bytes before the color subtable.
const FIXED_HEADER_LEN: usize = 76;

/// Offsets are carried for every frame but the first.
const MAX_EXTRA_FRAMES: usize = 30;

/// A decoded CFA animation.
pub struct Cfa {
    width: u16,
    height: u16,
    compressed_width: u16,
    offset_x: u16,
    offset_y: u16,
    bpp: u8,
    frames: Vec<Vec<u8>>,
    palette: Palette,
}

impl Cfa {
    pub fn parse(data: &[u8], palette: Palette) -> Result<Self> {
        Self::parse_inner(data, palette).map_err(|e| AssetError::Load {
            asset: "CFA",
            source: Box::new(e),
        })
    }

    fn parse_inner(data: &[u8], palette: Palette) -> Result<Self> {
        ensure_len(data, FIXED_HEADER_LEN)?;
        let mut header = Cursor::new(data);
        let width = header.read_u16::<LittleEndian>()?;
        let height = header.read_u16::<LittleEndian>()?;
        let compressed_width = header.read_u16::<LittleEndian>()?;
        let offset_x = header.read_u16::<LittleEndian>()?;
        let offset_y = header.read_u16::<LittleEndian>()?;
        let bpp = header.read_u8()?;
        let frame_count = usize::from(header.read_u8()?);
        let header_size = usize::from(header.read_u16::<LittleEndian>()?);
        let mut frame_offsets = [0usize; MAX_EXTRA_FRAMES];
        for slot in frame_offsets.iter_mut() {
            *slot = usize::from(header.read_u16::<LittleEndian>()?);
        }
        let total_size = usize::from(header.read_u16::<LittleEndian>()?);
        debug!(width, height, bpp, frame_count, "decoding CFA");

        if frame_count == 0 || frame_count > MAX_EXTRA_FRAMES + 1 {
            return Err(AssetError::InvalidHeader(format!(
                "frame count {frame_count} outside 1..=31"
            )));
        }
        if header_size < FIXED_HEADER_LEN {
            return Err(AssetError::InvalidHeader(format!(
                "header size {header_size} below the fixed {FIXED_HEADER_LEN} bytes"
            )));
        }
        ensure_len(data, header_size)?;
        ensure_len(data, total_size)?;
        let subtable = &data[FIXED_HEADER_LEN..header_size];
        let pixel_count = usize::from(width) * usize::from(height);

        let mut frames = Vec::with_capacity(frame_count);
        let mut start = header_size;
        for frame_index in 0..frame_count {
            let end = if frame_index + 1 < frame_count {
                frame_offsets[frame_index]
            } else {
                total_size
            };
            if end < start || end > data.len() {
                return Err(AssetError::InvalidHeader(format!(
                    "frame {frame_index} spans {start}..{end} in {} bytes",
                    data.len()
                )));
            }
            let mut frame = rle::decompress(&data[start..end], pixel_count)?;
            if frame.len() != pixel_count {
                return Err(AssetError::PixelCountMismatch {
                    expected: pixel_count,
                    actual: frame.len(),
                });
            }
            if !subtable.is_empty() {
                for pixel in frame.iter_mut() {
                    if let Some(&mapped) = subtable.get(usize::from(*pixel)) {
                        *pixel = mapped;
                    }
                }
            }
            frames.push(frame);
            start = end;
        }

        Ok(Self {
            width,
            height,
            compressed_width,
            offset_x,
            offset_y,
            bpp,
            frames,
            palette,
        })
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn compressed_width(&self) -> u16 {
        self.compressed_width
    }

    pub fn offset_x(&self) -> u16 {
        self.offset_x
    }

    pub fn offset_y(&self) -> u16 {
        self.offset_y
    }

    pub fn bpp(&self) -> u8 {
        self.bpp
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

    fn build_cfa(
        width: u16,
        height: u16,
        subtable: &[u8],
        frames: &[Vec<u8>],
    ) -> Vec<u8> {
        let header_size = (FIXED_HEADER_LEN + subtable.len()) as u16;
        let compressed: Vec<Vec<u8>> = frames
            .iter()
            .map(|frame| rle::compress(frame).unwrap())
            .collect();

        let mut data = Vec::new();
        data.extend_from_slice(&width.to_le_bytes());
        data.extend_from_slice(&height.to_le_bytes());
        data.extend_from_slice(&width.to_le_bytes()); // compressed_width
        data.extend_from_slice(&1u16.to_le_bytes()); // offset_x
        data.extend_from_slice(&2u16.to_le_bytes()); // offset_y
        data.push(8); // bpp
        data.push(frames.len() as u8);
        data.extend_from_slice(&header_size.to_le_bytes());

        let mut offsets = [0u16; MAX_EXTRA_FRAMES];
        let mut cursor = header_size + compressed[0].len() as u16;
        for (i, payload) in compressed.iter().enumerate().skip(1) {
            offsets[i - 1] = cursor;
            cursor += payload.len() as u16;
        }
        for offset in offsets {
            data.extend_from_slice(&offset.to_le_bytes());
        }
        data.extend_from_slice(&cursor.to_le_bytes()); // total_size
        data.extend_from_slice(subtable);
        for payload in &compressed {
            data.extend_from_slice(payload);
        }
        data
    }

    #[test]
    fn frames_decode_in_order() {
        let frame_a = vec![0u8; 12];
        let frame_b = vec![1u8; 12];
        let frame_c: Vec<u8> = (0..12).collect();
        let data = build_cfa(4, 3, &[], &[frame_a.clone(), frame_b.clone(), frame_c.clone()]);
        let cfa = Cfa::parse(&data, Palette::default()).unwrap();
        assert_eq!(cfa.frame_count(), 3);
        assert_eq!(cfa.frames()[0], frame_a);
        assert_eq!(cfa.frames()[1], frame_b);
        assert_eq!(cfa.frames()[2], frame_c);
        assert_eq!(cfa.offset_x(), 1);
        assert_eq!(cfa.bpp(), 8);
    }

    #[test]
    fn subtable_remaps_pixels() {
        let frame = vec![0u8, 1, 2, 1];
        let data = build_cfa(2, 2, &[0x10, 0x20, 0x30], &[frame]);
        let cfa = Cfa::parse(&data, Palette::default()).unwrap();
        assert_eq!(cfa.frames()[0], vec![0x10, 0x20, 0x30, 0x20]);
    }

    #[test]
    fn pixel_count_is_validated() {
        // frame decodes to 4 pixels, header claims 3x3
        let frame = vec![5u8; 4];
        let mut data = build_cfa(2, 2, &[], &[frame]);
        // patch the height field to 3
        data[2] = 3;
        let result = Cfa::parse(&data, Palette::default());
        assert!(result.is_err());
    }

    #[test]
    fn zero_frames_is_invalid() {
        let data = build_cfa(2, 2, &[], &[vec![0u8; 4]]);
        let mut patched = data.clone();
        patched[11] = 0; // frame_count byte
        assert!(matches!(
            Cfa::parse(&patched, Palette::default()),
            Err(AssetError::Load { source, .. })
                if matches!(*source, AssetError::InvalidHeader(_))
        ));
    }

    #[test]
    fn short_header_is_truncated() {
        assert!(matches!(
            Cfa::parse(&[0u8; 20], Palette::default()),
            Err(AssetError::Load { source, .. })
                if matches!(*source, AssetError::Truncated { .. })
        ));
    }
}
