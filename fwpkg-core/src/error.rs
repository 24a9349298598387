//! Error types for firmware package operations

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for firmware package operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the package consumer and producer
#[derive(Error, Debug)]
pub enum Error {
    /// The package file could not be (re)opened
    #[error("can't open {}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },

    /// Generic I/O failure outside of entry extraction
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// `./manifest.json` could not be extracted
    #[error("can't untar manifest: {0}")]
    ManifestEntry(#[source] EntryError),

    /// The manifest was extracted but is not acceptable
    #[error("error in manifest: {0}")]
    Manifest(#[from] ManifestError),

    /// The firmware binary named by the manifest could not be extracted
    #[error("can't untar firmware binary {file}: {source}")]
    FirmwareEntry { file: String, source: EntryError },

    /// The manifest could not be serialised while writing a package
    #[error("can't encode manifest: {0}")]
    Encode(#[source] serde_json::Error),

    /// Entry names are stored verbatim in the 100-byte ustar name field
    #[error("can't store entry name {0:?}: longer than 100 bytes")]
    EntryName(String),
}

/// Failures of a single named tar entry lookup
#[derive(Error, Debug)]
pub enum EntryError {
    #[error("{0} not found in archive")]
    NotFound(String),

    #[error("{name} is {size} bytes, limit is {limit}")]
    TooLarge { name: String, size: u64, limit: u64 },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Manifest decoding and validation failures
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("can't decode manifest: {0}")]
    Decode(#[from] serde_json::Error),

    /// A required key is absent, null or empty. Holds the dotted JSON key.
    #[error("missing \"{0}\" in manifest")]
    Missing(&'static str),

    #[error("invalid \"file\" in manifest: {0}")]
    UnsafePath(String),
}

impl EntryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, EntryError::NotFound(_))
    }
}

impl Error {
    /// True when a named entry (manifest or firmware binary) is absent from the archive.
    pub fn is_entry_not_found(&self) -> bool {
        match self {
            Error::ManifestEntry(e) | Error::FirmwareEntry { source: e, .. } => e.is_not_found(),
            _ => false,
        }
    }

    /// The manifest key named by a validation failure, if this is one.
    pub fn missing_field(&self) -> Option<&'static str> {
        match self {
            Error::Manifest(ManifestError::Missing(field)) => Some(*field),
            _ => None,
        }
    }
}
