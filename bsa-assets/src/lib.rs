//! Decoders for the packed asset formats stored in BSA archives.
//!
//! These types sit on top of [`bsa_codec`]: they parse the asset headers,
//! drive the right codec for each payload, and validate that every decoded
//! frame holds exactly `width * height` pixels.
//!
//! - [`Img`] — single indexed-color image, four compression modes
//! - [`Dfa`] — animation stored as a first frame plus per-frame patch
//!   chunks
//! - [`Cfa`] — animation stored as per-frame run-length payloads with a
//!   color subtable
//! - [`Palette`] — the 256-entry RGB lookup the images index into

pub mod cfa;
pub mod dfa;
pub mod error;
pub mod img;
pub mod palette;

pub use cfa::Cfa;
pub use dfa::Dfa;
pub use error::{AssetError, Result};
pub use img::Img;
pub use palette::{Palette, PALETTE_BYTES};
