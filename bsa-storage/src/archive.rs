//! Archive container: open, read, edit in memory, save atomically.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::entry::{ArchiveEntry, MAX_NAME_LEN};
use crate::error::{ArchiveError, Result};
use crate::observer::ArchiveObserver;

/// Bytes per file-table record: 14 name bytes plus a u32 size.
pub const FILE_TABLE_ENTRY_SIZE: u64 = 18;

const NAME_FIELD_LEN: usize = MAX_NAME_LEN + 1;

/// An archive held open for reading and editing.
///
/// The entry list is kept sorted by name and addressed by name. Edits
/// (add, update, delete) only touch in-memory state plus external staging
/// files; nothing reaches the source file until [`Archive::save`], which
/// writes a sibling `.tmp`, verifies its size, and renames it over the
/// target so the target is never left partially written.
///
/// The open source file is exclusively owned by the archive; reads
/// reposition its cursor, so an `Archive` must not be shared across
/// threads.
#[derive(Default)]
pub struct Archive {
    source: Option<File>,
    source_path: Option<PathBuf>,
    entries: Vec<ArchiveEntry>,
    original_count: u16,
    opened: bool,
    observers: Vec<Box<dyn ArchiveObserver>>,
}

impl Archive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer for subsequent mutations.
    pub fn register_observer(&mut self, observer: Box<dyn ArchiveObserver>) {
        self.observers.push(observer);
    }

    pub fn is_opened(&self) -> bool {
        self.opened
    }

    /// Path of the archive file backing this instance, if any.
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// An archive is modified when its entry list diverged from what was
    /// opened or any entry is staged.
    pub fn is_modified(&self) -> bool {
        self.opened
            && (self.entries.len() != usize::from(self.original_count)
                || self
                    .entries
                    .iter()
                    .any(|entry| entry.is_new() || entry.is_updated()))
    }

    /// Total payload bytes the archive holds, staged sizes included.
    pub fn size(&self) -> u64 {
        self.entries
            .iter()
            .map(|entry| u64::from(entry.effective_size()))
            .sum()
    }

    pub fn file_number(&self) -> u16 {
        self.entries.len() as u16
    }

    /// Entries, sorted by name.
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Look up an entry by its exact (upper-cased) name.
    pub fn entry(&self, name: &str) -> Option<&ArchiveEntry> {
        self.entries.iter().find(|entry| entry.name() == name)
    }

    /// Open an archive file and load its file table.
    pub fn open<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        if self.opened {
            return Err(ArchiveError::AlreadyOpen);
        }
        debug!(path = %path.display(), "opening archive");
        let mut file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ArchiveError::NotFound(path.display().to_string()),
            _ => ArchiveError::Io(e),
        })?;
        let archive_size = file.metadata()?.len();
        if archive_size < 2 {
            return Err(ArchiveError::Truncated {
                expected: 2,
                actual: archive_size,
            });
        }
        let count = file.read_u16::<LittleEndian>()?;
        let table_size = u64::from(count) * FILE_TABLE_ENTRY_SIZE;
        if archive_size < 2 + table_size {
            return Err(ArchiveError::Corrupt(format!(
                "file table of {count} entries does not fit in {archive_size} bytes"
            )));
        }
        file.seek(SeekFrom::Start(archive_size - table_size))?;

        let mut entries = Vec::with_capacity(usize::from(count));
        let mut offset: i64 = 2;
        for index in 0..count {
            let mut name_field = [0u8; NAME_FIELD_LEN];
            file.read_exact(&mut name_field).map_err(|e| {
                if e.kind() == std::io::ErrorKind::UnexpectedEof {
                    ArchiveError::Corrupt(format!(
                        "could not read the name of file {} of {count}",
                        index + 1
                    ))
                } else {
                    ArchiveError::Io(e)
                }
            })?;
            let size = file.read_u32::<LittleEndian>().map_err(|e| {
                if e.kind() == std::io::ErrorKind::UnexpectedEof {
                    ArchiveError::Corrupt(format!(
                        "could not read the size of file {} of {count}",
                        index + 1
                    ))
                } else {
                    ArchiveError::Io(e)
                }
            })?;
            let name = parse_table_name(&name_field, index, count)?;
            entries.push(ArchiveEntry::from_table(name, size, offset));
            offset += i64::from(size);
        }

        let expected_size = 2
            + entries
                .iter()
                .map(|entry| u64::from(entry.effective_size()))
                .sum::<u64>()
            + table_size;
        if expected_size != archive_size {
            return Err(ArchiveError::Corrupt(format!(
                "actual size {archive_size}, expected size {expected_size}"
            )));
        }
        entries.sort_by(|a, b| a.name().cmp(b.name()));

        debug!(count, "archive opened");
        self.source = Some(file);
        self.source_path = Some(path.to_path_buf());
        self.entries = entries;
        self.original_count = count;
        self.opened = true;
        self.emit_opened();
        self.emit_file_list();
        Ok(())
    }

    /// Close the archive and drop all in-memory state.
    pub fn close(&mut self) -> Result<()> {
        if !self.opened {
            return Err(ArchiveError::NotOpen);
        }
        debug!("closing archive");
        self.source = None;
        self.source_path = None;
        self.entries.clear();
        self.original_count = 0;
        self.opened = false;
        self.emit_file_list();
        self.emit_closed();
        Ok(())
    }

    /// Become an opened, empty archive with no source file.
    pub fn create_new(&mut self) -> Result<()> {
        if self.opened {
            return Err(ArchiveError::AlreadyOpen);
        }
        debug!("creating new archive");
        self.source = None;
        self.source_path = None;
        self.entries.clear();
        self.original_count = 0;
        self.opened = true;
        self.emit_opened();
        self.emit_file_list();
        Ok(())
    }

    /// Read the payload bytes of the named entry: from its staging file
    /// while staged, from the source archive otherwise.
    pub fn file_data(&mut self, name: &str) -> Result<Vec<u8>> {
        let index = self.position(name)?;
        let entry = &self.entries[index];
        if entry.is_new() || entry.is_updated() {
            let staging = entry.staging_path().ok_or_else(|| {
                ArchiveError::Corrupt(format!("staged entry {name} has no staging file"))
            })?;
            return fs::read(staging).map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    ArchiveError::NotFound(staging.display().to_string())
                }
                _ => ArchiveError::Io(e),
            });
        }
        let size = u64::from(entry.size_in_archive());
        let offset = entry.offset_in_archive() as u64;
        let source = self.source.as_mut().ok_or_else(|| {
            ArchiveError::Corrupt(format!("entry {name} has no backing archive file"))
        })?;
        source.seek(SeekFrom::Start(offset))?;
        let mut data = Vec::with_capacity(size as usize);
        source.take(size).read_to_end(&mut data)?;
        if (data.len() as u64) < size {
            return Err(ArchiveError::Truncated {
                expected: size,
                actual: data.len() as u64,
            });
        }
        Ok(data)
    }

    /// Write the named entry's bytes to `directory/<name>`, atomically.
    pub fn extract<P: AsRef<Path>>(&mut self, directory: P, name: &str) -> Result<()> {
        let directory = directory.as_ref();
        let data = self.file_data(name)?;
        debug!(name, bytes = data.len(), directory = %directory.display(), "extracting entry");
        let mut staged = NamedTempFile::new_in(directory)?;
        staged.write_all(&data)?;
        staged.flush()?;
        staged
            .persist(directory.join(name))
            .map_err(|e| ArchiveError::Io(e.error))?;
        Ok(())
    }

    /// Remove the named entry from the in-memory list. The removal becomes
    /// durable on the next save.
    pub fn delete(&mut self, name: &str) -> Result<ArchiveEntry> {
        let index = self.position(name)?;
        let removed = self.entries.remove(index);
        debug!(name, "entry deleted");
        self.emit_file_list();
        Ok(removed)
    }

    /// Stage the file at `path` as a new or replacement entry named after
    /// its upper-cased base name.
    pub fn add_or_update<P: AsRef<Path>>(&mut self, path: P) -> Result<ArchiveEntry> {
        let path = path.as_ref();
        if !self.opened {
            return Err(ArchiveError::NotOpen);
        }
        let metadata = fs::metadata(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ArchiveError::NotFound(path.display().to_string()),
            _ => ArchiveError::Io(e),
        })?;
        if !metadata.is_file() {
            return Err(ArchiveError::NotFound(path.display().to_string()));
        }
        let staged_size = u32::try_from(metadata.len()).map_err(|_| {
            ArchiveError::Corrupt(format!(
                "file {} is too large for the archive format",
                path.display()
            ))
        })?;
        let base_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ArchiveError::InvalidName(path.display().to_string()))?;
        let name = base_name.to_ascii_uppercase();
        ArchiveEntry::validate_name(&name)?;
        debug!(name, staged_size, "staging entry");

        match self.entries.iter().position(|entry| entry.name() == name) {
            None => {
                let entry = ArchiveEntry::staged_new(name, staged_size, path.to_path_buf());
                self.entries.push(entry.clone());
                self.entries.sort_by(|a, b| a.name().cmp(b.name()));
                self.emit_file_list();
                Ok(entry)
            }
            Some(index) => {
                if self.entries[index].is_new() {
                    // a never-saved entry is simply replaced by the new
                    // descriptor
                    let entry = ArchiveEntry::staged_new(name, staged_size, path.to_path_buf());
                    self.entries[index] = entry.clone();
                    self.emit_file_modified(index);
                    Ok(entry)
                } else {
                    self.entries[index].mark_updated(path.to_path_buf(), staged_size);
                    let entry = self.entries[index].clone();
                    self.emit_file_modified(index);
                    Ok(entry)
                }
            }
        }
    }

    /// Undo the staging of the named entry: a new entry is removed, an
    /// updated one reverts to its stored payload.
    pub fn revert(&mut self, name: &str) -> Result<ArchiveEntry> {
        let index = self.position(name)?;
        if self.entries[index].is_new() {
            let removed = self.entries.remove(index);
            debug!(name, "staged entry removed");
            self.emit_file_list();
            return Ok(removed);
        }
        self.entries[index].clear_staging();
        let entry = self.entries[index].clone();
        debug!(name, "entry reverted");
        self.emit_file_modified(index);
        Ok(entry)
    }

    /// Save the archive to `path` through a verified `.tmp` sibling, then
    /// reopen the saved file so offsets and the original count refresh.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        if !self.opened {
            return Err(ArchiveError::NotOpen);
        }
        if self.entries.len() > usize::from(u16::MAX) {
            return Err(ArchiveError::Corrupt(format!(
                "{} entries exceed the u16 entry count",
                self.entries.len()
            )));
        }
        let mut tmp_os: OsString = path.as_os_str().to_os_string();
        tmp_os.push(".tmp");
        let tmp_path = PathBuf::from(tmp_os);
        debug!(path = %path.display(), tmp = %tmp_path.display(), "saving archive");

        let entries = self.entries.clone();
        let total_payload = match self.write_archive_to(&tmp_path, &entries) {
            Ok(total) => total,
            Err(e) => {
                let _ = fs::remove_file(&tmp_path);
                return Err(e);
            }
        };

        // verify the temporary file before touching the target
        let table_size = entries.len() as u64 * FILE_TABLE_ENTRY_SIZE;
        let expected_size = 2 + total_payload + table_size;
        let tmp_size = match fs::metadata(&tmp_path) {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                let _ = fs::remove_file(&tmp_path);
                return Err(ArchiveError::IoWrite {
                    tmp_path,
                    source: e,
                });
            }
        };
        if tmp_size != expected_size {
            let _ = fs::remove_file(&tmp_path);
            return Err(ArchiveError::Corrupt(format!(
                "temporary archive holds {tmp_size} bytes, expected {expected_size}"
            )));
        }

        if path.exists() {
            fs::remove_file(path).map_err(|e| ArchiveError::IoRename {
                tmp_path: tmp_path.clone(),
                source: e,
            })?;
        }
        fs::rename(&tmp_path, path).map_err(|e| ArchiveError::IoRename {
            tmp_path: tmp_path.clone(),
            source: e,
        })?;
        debug!(bytes = expected_size, "archive saved");

        // reload so offsets and the original count reflect the saved file
        self.close()?;
        self.open(path)
    }

    /// Write header, payloads and file table to `target`; returns the
    /// payload byte total.
    fn write_archive_to(&mut self, target: &Path, entries: &[ArchiveEntry]) -> Result<u64> {
        let io_write = |tmp: &Path| {
            let tmp = tmp.to_path_buf();
            move |e: std::io::Error| ArchiveError::IoWrite {
                tmp_path: tmp.clone(),
                source: e,
            }
        };
        let file = File::create(target).map_err(io_write(target))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_u16::<LittleEndian>(entries.len() as u16)
            .map_err(io_write(target))?;

        let mut total_payload = 0u64;
        for entry in entries {
            let data = self.file_data(entry.name())?;
            // a staging file that changed size since staging would break
            // the file table written below
            if data.len() as u64 != u64::from(entry.effective_size()) {
                return Err(ArchiveError::Truncated {
                    expected: u64::from(entry.effective_size()),
                    actual: data.len() as u64,
                });
            }
            writer.write_all(&data).map_err(io_write(target))?;
            total_payload += data.len() as u64;
        }

        for entry in entries {
            let mut name_field = [0u8; NAME_FIELD_LEN];
            name_field[..entry.name().len()].copy_from_slice(entry.name().as_bytes());
            writer.write_all(&name_field).map_err(io_write(target))?;
            writer
                .write_u32::<LittleEndian>(entry.effective_size())
                .map_err(io_write(target))?;
        }

        let file = writer
            .into_inner()
            .map_err(|e| ArchiveError::IoWrite {
                tmp_path: target.to_path_buf(),
                source: e.into_error(),
            })?;
        file.sync_all().map_err(io_write(target))?;
        Ok(total_payload)
    }

    fn position(&self, name: &str) -> Result<usize> {
        if !self.opened {
            return Err(ArchiveError::NotOpen);
        }
        self.entries
            .iter()
            .position(|entry| entry.name() == name)
            .ok_or_else(|| ArchiveError::EntryNotFound(name.to_string()))
    }

    fn emit_opened(&self) {
        for observer in &self.observers {
            observer.archive_opened(true);
        }
    }

    fn emit_closed(&self) {
        for observer in &self.observers {
            observer.archive_closed(true);
        }
    }

    fn emit_file_list(&self) {
        for observer in &self.observers {
            observer.file_list_modified(&self.entries);
        }
    }

    fn emit_file_modified(&self, index: usize) {
        for observer in &self.observers {
            observer.file_modified(&self.entries[index]);
        }
    }
}

/// Decode a 14-byte table name field: NUL-terminated, 1..=13 bytes of
/// ASCII.
fn parse_table_name(field: &[u8; NAME_FIELD_LEN], index: u16, count: u16) -> Result<String> {
    let len = field
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| {
            ArchiveError::Corrupt(format!(
                "name of file {} of {count} is not NUL-terminated",
                index + 1
            ))
        })?;
    if len == 0 || !field[..len].iter().all(u8::is_ascii) {
        return Err(ArchiveError::Corrupt(format!(
            "name of file {} of {count} is not plain ASCII",
            index + 1
        )));
    }
    Ok(String::from_utf8_lossy(&field[..len]).into_owned())
}
