//! Synchronous observer surface for archive mutations.
//!
//! Observers are invoked from the mutating call itself, after the
//! in-memory state has been updated. Implement only the channels you care
//! about; the defaults are no-ops.

use crate::entry::ArchiveEntry;

/// Receiver for archive state-change notifications.
pub trait ArchiveObserver {
    /// An archive was opened or created.
    fn archive_opened(&self, opened: bool) {
        let _ = opened;
    }

    /// The current archive was closed.
    fn archive_closed(&self, closed: bool) {
        let _ = closed;
    }

    /// The entry list changed shape: open, close, add, delete.
    fn file_list_modified(&self, entries: &[ArchiveEntry]) {
        let _ = entries;
    }

    /// A single entry changed in place: staged, updated, reverted.
    fn file_modified(&self, entry: &ArchiveEntry) {
        let _ = entry;
    }
}
