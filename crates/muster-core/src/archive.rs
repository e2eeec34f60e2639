//! On-disk snapshot documents.
//!
//! Each successful snapshot is written as one JSON document under
//! `<archive_dir>/<group_id>/`, optionally gzip-compressed as a whole file.
//! Readers sniff the gzip magic bytes instead of trusting the extension.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;
use crate::model::MemberRecord;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("snapshot file I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("snapshot document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot document gzip stream failed: {0}")]
    Gzip(#[source] io::Error),
}

impl ArchiveError {
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Io { .. } => ErrorCode::ArchiveWriteFailed,
            Self::Json(_) | Self::Gzip(_) => ErrorCode::ArchiveReadFailed,
        }
    }

    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Where and how snapshot documents are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSettings {
    pub dir: PathBuf,
    pub compress: bool,
}

/// The persisted form of one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    pub snapshot_id: i64,
    pub group_id: i64,
    pub timestamp: DateTime<Utc>,
    pub member_count: usize,
    pub members: Vec<MemberRecord>,
}

impl SnapshotDocument {
    #[must_use]
    pub fn new(
        snapshot_id: i64,
        group_id: i64,
        timestamp: DateTime<Utc>,
        members: Vec<MemberRecord>,
    ) -> Self {
        Self {
            snapshot_id,
            group_id,
            timestamp,
            member_count: members.len(),
            members,
        }
    }
}

/// Group-scoped file path for a snapshot document.
#[must_use]
pub fn archive_path(settings: &ArchiveSettings, document: &SnapshotDocument) -> PathBuf {
    let extension = if settings.compress { "json.gz" } else { "json" };
    let name = format!(
        "snapshot_{}_{}_{}.{extension}",
        document.group_id,
        document.timestamp.format("%Y%m%d_%H%M%S"),
        document.snapshot_id,
    );
    settings
        .dir
        .join(document.group_id.to_string())
        .join(name)
}

/// Serialize a document, gzip-wrapping it when `compress` is set.
///
/// # Errors
///
/// Returns an error if serialization or compression fails.
pub fn encode_document(document: &SnapshotDocument, compress: bool) -> Result<Vec<u8>, ArchiveError> {
    let json = serde_json::to_vec_pretty(document)?;
    if !compress {
        return Ok(json);
    }
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json).map_err(ArchiveError::Gzip)?;
    encoder.finish().map_err(ArchiveError::Gzip)
}

/// Parse a document from plain or gzip-compressed bytes.
///
/// # Errors
///
/// Returns an error if the bytes are neither a valid document nor a gzip
/// stream containing one.
pub fn decode_document(bytes: &[u8]) -> Result<SnapshotDocument, ArchiveError> {
    if bytes.starts_with(&GZIP_MAGIC) {
        let mut decoder = GzDecoder::new(bytes);
        let mut json = Vec::new();
        decoder
            .read_to_end(&mut json)
            .map_err(ArchiveError::Gzip)?;
        return Ok(serde_json::from_slice(&json)?);
    }
    Ok(serde_json::from_slice(bytes)?)
}

/// Write a document to its group-scoped path and return `(path, size)`.
///
/// Bytes go to a sibling `.tmp` path first and are renamed into place.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the file cannot
/// be written.
pub fn write_document(
    settings: &ArchiveSettings,
    document: &SnapshotDocument,
) -> Result<(PathBuf, u64), ArchiveError> {
    let path = archive_path(settings, document);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ArchiveError::io(parent, e))?;
    }

    let bytes = encode_document(document, settings.compress)?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, &bytes).map_err(|e| ArchiveError::io(&tmp, e))?;
    fs::rename(&tmp, &path).map_err(|e| ArchiveError::io(&path, e))?;

    Ok((path, bytes.len() as u64))
}

/// Read and decode a document from disk.
///
/// # Errors
///
/// Returns an error if the file cannot be read or decoded.
pub fn read_document(path: &Path) -> Result<SnapshotDocument, ArchiveError> {
    let bytes = fs::read(path).map_err(|e| ArchiveError::io(path, e))?;
    decode_document(&bytes)
}

/// Delete a snapshot file. A missing file is not an error.
///
/// Returns `true` when a file was removed.
///
/// # Errors
///
/// Returns an error for I/O failures other than the file being absent.
pub fn remove_document(path: &Path) -> Result<bool, ArchiveError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(ArchiveError::io(path, e)),
    }
}
