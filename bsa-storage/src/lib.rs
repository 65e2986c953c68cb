//! BSA archive container.
//!
//! An archive is a flat concatenation of file payloads framed by a two-byte
//! entry count at the front and an 18-bytes-per-entry file table at the
//! back:
//!
//! ```text
//! +------------------+
//! | count : u16 LE   |                      offset 0
//! +------------------+
//! | entry payloads   |                      offset 2, in table order
//! +------------------+
//! | file table       |  count x 18 bytes:
//! |   name : 14 B    |  ASCII, NUL padded
//! |   size : u32 LE  |  payload bytes
//! +------------------+
//! ```
//!
//! There is no magic number, no checksum and no padding; payload offsets
//! are recovered by summing sizes in table order. [`Archive`] reads that
//! layout, supports in-memory editing backed by external staging files,
//! and saves through a verified write-to-temporary-then-rename protocol so
//! the target file is never left half-written.

pub mod archive;
pub mod entry;
pub mod error;
pub mod observer;

pub use archive::{Archive, FILE_TABLE_ENTRY_SIZE};
pub use entry::{ArchiveEntry, MAX_NAME_LEN};
pub use error::{ArchiveError, Result};
pub use observer::ArchiveObserver;
