//! Error types for archive operations

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for archive operations
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Archive error types
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Open or create on an instance that is already open
    #[error("an archive is already opened")]
    AlreadyOpen,

    /// Operation requiring an open archive
    #[error("the archive is not opened")]
    NotOpen,

    /// Entry name not present in the archive
    #[error("the file {0} is not in the archive")]
    EntryNotFound(String),

    /// A filesystem path does not exist or is not a readable file
    #[error("file not found or not readable: {0}")]
    NotFound(String),

    /// Short read relative to a declared length
    #[error("could not retrieve all the data: got {actual} bytes, expected {expected}")]
    Truncated { expected: u64, actual: u64 },

    /// Structural inconsistency in the archive bytes
    #[error("the archive seems corrupted: {0}")]
    Corrupt(String),

    /// File name beyond the 13 usable bytes of the on-disk name field
    #[error("the file name {0} exceeds 13 characters")]
    NameTooLong(String),

    /// File name not expressible in the on-disk ASCII name field
    #[error("the file name {0} is not plain ASCII")]
    InvalidName(String),

    /// Failure while producing the temporary save file
    #[error("could not write temporary archive {}: {source}", tmp_path.display())]
    IoWrite {
        tmp_path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failure while moving the temporary save file into place; the saved
    /// archive remains at `tmp_path`
    #[error("could not move saved archive into place, it can be found at {}: {source}", tmp_path.display())]
    IoRename {
        tmp_path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Other IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
