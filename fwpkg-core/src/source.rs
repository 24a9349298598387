//! Rewindable byte sources for package archives.
//!
//! The tar walk only reads forward, so every pass over a package (manifest
//! first, then the firmware binary, possibly several times) starts with
//! [`Source::reopen`], which puts the reader back at offset zero of the
//! archive regardless of how much was consumed before.

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// A package archive backed either by a file on disk or by bytes in memory.
#[derive(Debug)]
pub struct Source<'a> {
    backing: Backing<'a>,
}

#[derive(Debug)]
enum Backing<'a> {
    /// At most one handle is held; `reopen` drops the old one first.
    File { path: PathBuf, file: Option<File> },
    /// `pos` is `None` until the first `reopen`.
    Buffer { data: Cow<'a, [u8]>, pos: Option<usize> },
}

impl Source<'static> {
    /// File-backed source. Nothing is opened until [`Source::reopen`].
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self { backing: Backing::File { path: path.into(), file: None } }
    }
}

impl<'a> Source<'a> {
    /// Buffer-backed source over owned or borrowed bytes. The bytes are never mutated.
    pub fn from_bytes(data: impl Into<Cow<'a, [u8]>>) -> Self {
        Self { backing: Backing::Buffer { data: data.into(), pos: None } }
    }

    /// Path of a file-backed source.
    pub fn path(&self) -> Option<&Path> {
        match &self.backing {
            Backing::File { path, .. } => Some(path),
            Backing::Buffer { .. } => None,
        }
    }

    /// Discard the current reader and start again at offset zero.
    ///
    /// For a file this re-opens the stored path, so it fails if the file was
    /// removed or became unreadable since the last pass. Buffers never fail.
    pub fn reopen(&mut self) -> io::Result<()> {
        match &mut self.backing {
            Backing::File { path, file } => {
                // Close before opening so only one descriptor is ever held.
                *file = None;
                *file = Some(File::open(&*path)?);
                tracing::trace!(path = %path.display(), "reopened file source");
            }
            Backing::Buffer { data, pos } => {
                *pos = Some(0);
                tracing::trace!(len = data.len(), "rewound buffer source");
            }
        }
        Ok(())
    }
}

fn not_opened() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "source read before reopen")
}

impl Read for Source<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.backing {
            Backing::File { file, .. } => file.as_mut().ok_or_else(not_opened)?.read(buf),
            Backing::Buffer { data, pos } => {
                let pos = pos.as_mut().ok_or_else(not_opened)?;
                let n = (&data[*pos..]).read(buf)?;
                *pos += n;
                Ok(n)
            }
        }
    }
}
