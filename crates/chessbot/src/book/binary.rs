//! Binary opening book: fixed 16-byte big-endian records sorted by key.
//!
//! Each record is `key: u64, move: u16, weight: u16, learn: u32`. Lookups
//! binary-search the file through a seekable handle, so the book is never
//! loaded into memory.

use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use cozy_chess::Board;
use tracing::{info, warn};

use super::key::book_key;
use super::{BookMove, OpeningBook, resolve_candidates};
use crate::error::BookError;

pub const RECORD_SIZE: u64 = 16;

/// One book record as stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEntry {
    pub key: u64,
    /// Polyglot move code
    pub mv: u16,
    pub weight: u16,
    /// Unused by lookups; carried through when books are rewritten.
    pub learn: u32,
}

impl RawEntry {
    pub fn to_bytes(&self) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        bytes[0..8].copy_from_slice(&self.key.to_be_bytes());
        bytes[8..10].copy_from_slice(&self.mv.to_be_bytes());
        bytes[10..12].copy_from_slice(&self.weight.to_be_bytes());
        bytes[12..16].copy_from_slice(&self.learn.to_be_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8; 16]) -> Self {
        let [k0, k1, k2, k3, k4, k5, k6, k7, m0, m1, w0, w1, l0, l1, l2, l3] = *bytes;
        Self {
            key: u64::from_be_bytes([k0, k1, k2, k3, k4, k5, k6, k7]),
            mv: u16::from_be_bytes([m0, m1]),
            weight: u16::from_be_bytes([w0, w1]),
            learn: u32::from_be_bytes([l0, l1, l2, l3]),
        }
    }
}

fn read_record(file: &mut File, index: u64) -> io::Result<RawEntry> {
    file.seek(SeekFrom::Start(index * RECORD_SIZE))?;
    let mut bytes = [0u8; 16];
    file.read_exact(&mut bytes)?;
    Ok(RawEntry::from_bytes(&bytes))
}

/// Opening book backed by a binary file.
#[derive(Debug)]
pub struct BinaryBook {
    path: PathBuf,
    file: Mutex<File>,
    records: u64,
}

impl BinaryBook {
    /// Open a book and check its framing.
    ///
    /// A size that is not a whole number of records, or a first key above the
    /// last key, is reported as corrupt.
    pub fn open(path: &Path) -> Result<Self, BookError> {
        let io_error = |source| BookError::Io {
            path: path.to_path_buf(),
            source,
        };
        let corrupt = |reason: String| BookError::Corrupt {
            path: path.to_path_buf(),
            reason,
        };

        let mut file = File::open(path).map_err(io_error)?;
        let size = file.metadata().map_err(io_error)?.len();
        if size % RECORD_SIZE != 0 {
            return Err(corrupt(format!(
                "size {size} is not a multiple of {RECORD_SIZE} bytes"
            )));
        }

        let records = size / RECORD_SIZE;
        if records > 0 {
            let first = read_record(&mut file, 0).map_err(io_error)?;
            let last = read_record(&mut file, records - 1).map_err(io_error)?;
            if first.key > last.key {
                return Err(corrupt("records are not sorted by key".to_string()));
            }
        }

        info!(path = %path.display(), records, "opened binary opening book");
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
            records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> u64 {
        self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records == 0
    }

    /// All records stored under `key`, in file order.
    pub fn entries_for(&self, key: u64) -> io::Result<Vec<RawEntry>> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "book file handle poisoned"))?;

        let (mut lo, mut hi) = (0, self.records);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if read_record(&mut file, mid)?.key < key {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }

        let mut entries = Vec::new();
        for index in lo..self.records {
            let entry = read_record(&mut file, index)?;
            if entry.key != key {
                break;
            }
            entries.push(entry);
        }
        Ok(entries)
    }
}

impl OpeningBook for BinaryBook {
    fn lookup(&self, board: &Board) -> Vec<BookMove> {
        match self.entries_for(book_key(board)) {
            Ok(entries) => resolve_candidates(board, entries.iter().map(|e| (e.mv, e.weight))),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "opening book read failed");
                Vec::new()
            }
        }
    }
}

/// Write `entries` as a binary book, sorted by key. Entries sharing a key keep
/// their relative order.
pub fn write_binary_book(path: &Path, entries: &[RawEntry]) -> Result<(), BookError> {
    let io_error = |source| BookError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut sorted = entries.to_vec();
    sorted.sort_by_key(|entry| entry.key);

    let mut writer = BufWriter::new(File::create(path).map_err(io_error)?);
    for entry in &sorted {
        writer.write_all(&entry.to_bytes()).map_err(io_error)?;
    }
    writer.flush().map_err(io_error)?;

    info!(path = %path.display(), records = sorted.len(), "wrote binary opening book");
    Ok(())
}

#[cfg(test)]
#[path = "binary_tests.rs"]
mod binary_tests;
