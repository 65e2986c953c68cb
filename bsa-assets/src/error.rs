//! Error types for asset decoding

use thiserror::Error;

/// Result type for asset decoding
pub type Result<T> = std::result::Result<T, AssetError>;

/// Asset decoding error types
#[derive(Error, Debug)]
pub enum AssetError {
    /// Context wrapper naming the asset kind that failed to load
    #[error("unable to load {asset} data: {source}")]
    Load {
        asset: &'static str,
        #[source]
        source: Box<AssetError>,
    },

    /// IMG compression flag outside {0x00, 0x02, 0x04, 0x08}
    #[error("this image compression is not supported: {0:#04x}")]
    UnsupportedCompression(u8),

    /// Decoded pixel count does not match `width * height`
    #[error("the image contained too many or too few pixels for its size: got {actual}, expected {expected}")]
    PixelCountMismatch { expected: usize, actual: usize },

    /// Data shorter than a declared length
    #[error("data is too short: {expected} bytes required, {actual} available")]
    Truncated { expected: usize, actual: usize },

    /// Integrated palette announced but not present in full
    #[error("integrated palette could not be read")]
    PaletteTruncated,

    /// Animation patch chunk addressing pixels outside the frame
    #[error("patch of {count} pixels at offset {offset} lands outside the {len}-pixel frame")]
    PatchOutOfBounds {
        offset: usize,
        count: usize,
        len: usize,
    },

    /// Structurally impossible header field values
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// Payload failed to decompress
    #[error(transparent)]
    Codec(#[from] bsa_codec::CodecError),

    /// IO error while reading header fields
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fail with [`AssetError::Truncated`] unless `data` holds `needed` bytes.
pub(crate) fn ensure_len(data: &[u8], needed: usize) -> Result<()> {
    if data.len() < needed {
        return Err(AssetError::Truncated {
            expected: needed,
            actual: data.len(),
        });
    }
    Ok(())
}
