//! Writing firmware packages.
//!
//! Headers are deterministic (mtime 0, mode 0644, uid/gid 0) so the same
//! manifest and image always produce the same archive bytes. Entry names are
//! copied verbatim into the ustar name field: `tar::Header::set_path` would
//! normalise `./manifest.json` to `manifest.json`, and readers of this format
//! look entries up with the `./` prefix.

use crate::archive::entry_name;
use crate::error::{Error, Result};
use crate::manifest::{Manifest, MANIFEST_FILE};
use std::io::{self, Read, Write};
use tar::{Builder, EntryType, Header};

/// Size of the ustar `name` field that entry names are stored in.
const NAME_FIELD_LEN: usize = 100;

fn check_entry_name(name: &str) -> Result<()> {
    if name.len() > NAME_FIELD_LEN {
        return Err(Error::EntryName(name.to_string()));
    }
    Ok(())
}

/// Low-level tar writer that stores entry names exactly as given.
pub struct PackageWriter<W: Write> {
    builder: Builder<W>,
}

impl<W: Write> PackageWriter<W> {
    /// Start an archive on `writer`. Nothing is written until the first entry.
    pub fn new(writer: W) -> Self {
        Self { builder: Builder::new(writer) }
    }

    /// Append one regular file entry of exactly `size` bytes read from `data`.
    ///
    /// Fails if `data` ends early or `name` does not fit the 100-byte name field.
    pub fn append_entry<R: Read>(&mut self, name: &str, size: u64, data: R) -> Result<()> {
        check_entry_name(name)?;
        let mut header = Header::new_ustar();
        header.as_old_mut().name[..name.len()].copy_from_slice(name.as_bytes());
        header.set_entry_type(EntryType::Regular);
        header.set_size(size);
        header.set_mode(0o644);
        header.set_uid(0);
        header.set_gid(0);
        header.set_mtime(0);
        header.set_cksum();

        self.builder.append(&header, Exact { inner: data, remaining: size })?;
        tracing::trace!(entry = name, size, "appended tar entry");
        Ok(())
    }

    /// Write the end-of-archive marker and return the underlying writer.
    pub fn finish(self) -> Result<W> {
        Ok(self.builder.into_inner()?)
    }
}

/// Yields exactly `remaining` bytes of `inner`, or an `UnexpectedEof` error.
struct Exact<R> {
    inner: R,
    remaining: u64,
}

impl<R: Read> Read for Exact<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Ok(0);
        }
        let max = buf.len().min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
        let n = self.inner.read(&mut buf[..max])?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("entry data ended {} bytes short", self.remaining),
            ));
        }
        self.remaining -= n as u64;
        Ok(n)
    }
}

/// Build a package: `./manifest.json` followed by `./<manifest.file>` holding
/// `firmware_len` bytes read from `firmware`.
///
/// The manifest is validated with the same rules the consumer applies, so a
/// package written here always opens. Both entry names are checked before
/// anything reaches `writer`.
pub fn write_package<W: Write, R: Read>(
    writer: W,
    manifest: &Manifest,
    firmware: R,
    firmware_len: u64,
) -> Result<W> {
    manifest.validate()?;
    let manifest_entry = entry_name(MANIFEST_FILE);
    let firmware_entry = entry_name(&manifest.file);
    check_entry_name(&firmware_entry)?;
    let json = serde_json::to_vec_pretty(manifest).map_err(Error::Encode)?;

    let mut w = PackageWriter::new(writer);
    w.append_entry(&manifest_entry, json.len() as u64, json.as_slice())?;
    w.append_entry(&firmware_entry, firmware_len, firmware)?;
    let out = w.finish()?;
    tracing::debug!(
        name = %manifest.name,
        version = %manifest.version,
        file = %manifest.file,
        bytes = firmware_len,
        "wrote firmware package"
    );
    Ok(out)
}
