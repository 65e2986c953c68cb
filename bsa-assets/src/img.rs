//! IMG still-image decoder.
//!
//! Header (12 bytes, little-endian):
//!
//! ```text
//! offset_x    : u16
//! offset_y    : u16
//! width       : u16
//! height      : u16
//! compression : u8    0x00 raw, 0x02 per-line RLE, 0x04 LZSS, 0x08 huffcode
//! palette     : u8    bit 0 set = a 768-byte palette follows the payload
//! raw_size    : u16   payload bytes (for 0x08, includes a leading
//!                     u16 uncompressed size)
//! ```

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;
use tracing::debug;

use bsa_codec::{huffcode, lzss, rle};

use crate::error::{ensure_len, AssetError, Result};
use crate::palette::Palette;

/// A decoded indexed-color image.
pub struct Img {
    offset_x: u16,
    offset_y: u16,
    width: u16,
    height: u16,
    compression: u8,
    palette_flag: u8,
    pixels: Vec<u8>,
    palette: Palette,
}

impl Img {
    /// Decode a headered IMG blob. `fallback_palette` is used unless the
    /// image carries its own.
    pub fn parse(data: &[u8], fallback_palette: Palette) -> Result<Self> {
        Self::parse_inner(data, fallback_palette).map_err(|e| AssetError::Load {
            asset: "IMG",
            source: Box::new(e),
        })
    }

    /// Decode a headerless raw image of known dimensions.
    pub fn parse_raw(data: &[u8], width: u16, height: u16, palette: Palette) -> Result<Self> {
        let expected = usize::from(width) * usize::from(height);
        ensure_len(data, expected).map_err(|e| AssetError::Load {
            asset: "IMG",
            source: Box::new(e),
        })?;
        Ok(Self {
            offset_x: 0,
            offset_y: 0,
            width,
            height,
            compression: 0,
            palette_flag: 0,
            pixels: data[..expected].to_vec(),
            palette,
        })
    }

    fn parse_inner(data: &[u8], fallback_palette: Palette) -> Result<Self> {
        ensure_len(data, 12)?;
        let mut header = Cursor::new(data);
        let offset_x = header.read_u16::<LittleEndian>()?;
        let offset_y = header.read_u16::<LittleEndian>()?;
        let width = header.read_u16::<LittleEndian>()?;
        let height = header.read_u16::<LittleEndian>()?;
        let compression = header.read_u8()?;
        let palette_flag = header.read_u8()?;
        let raw_size = usize::from(header.read_u16::<LittleEndian>()?);
        debug!(width, height, compression, raw_size, "decoding IMG");

        ensure_len(&data[12..], raw_size)?;
        let payload = &data[12..12 + raw_size];
        let pixels = match compression {
            0x00 => payload.to_vec(),
            0x02 => rle::decompress_lines(payload, usize::from(width), usize::from(height))?,
            0x04 => lzss::decompress(payload)?,
            0x08 => {
                ensure_len(payload, 2)?;
                let uncompressed_size =
                    usize::from(u16::from_le_bytes([payload[0], payload[1]]));
                huffcode::decompress(&payload[2..], uncompressed_size)?
            }
            other => return Err(AssetError::UnsupportedCompression(other)),
        };

        let expected = usize::from(width) * usize::from(height);
        if pixels.len() != expected {
            return Err(AssetError::PixelCountMismatch {
                expected,
                actual: pixels.len(),
            });
        }

        // integrated palette beats the caller-supplied one
        let palette = if palette_flag & 1 != 0 {
            Palette::from_bytes(&data[12 + raw_size..], true)?
        } else {
            fallback_palette
        };

        Ok(Self {
            offset_x,
            offset_y,
            width,
            height,
            compression,
            palette_flag,
            pixels,
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

    pub fn compression(&self) -> u8 {
        self.compression
    }

    pub fn palette_flag(&self) -> u8 {
        self.palette_flag
    }

    pub fn has_integrated_palette(&self) -> bool {
        self.palette_flag & 1 != 0
    }

    /// Decoded pixels, exactly `width * height` palette indices.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn set_palette(&mut self, palette: Palette) {
        self.palette = palette;
    }
}
