use crate::archive::{copy_entry, entry_name, list_entries, EntryInfo};
use crate::error::{Error, Result};
use crate::manifest::{Manifest, MANIFEST_FILE};
use crate::source::Source;
use std::borrow::Cow;
use std::io::Write;
use std::path::Path;

#[derive(Clone, Copy, Debug)]
pub struct PackageLimits {
    /// Largest `manifest.json` entry that will be buffered for decoding.
    pub max_manifest_bytes: u64,
}

impl Default for PackageLimits {
    fn default() -> Self {
        Self { max_manifest_bytes: 1024 * 1024 }
    }
}

/// Handle to a firmware package whose manifest has already been validated.
///
/// Construction reads and validates `./manifest.json`; a handle is only ever
/// returned for a package with a complete manifest. The firmware binary is
/// not touched until [`FirmwarePackageConsumer::file`] is called, and every
/// such call rewinds the archive and scans it again.
///
/// ```no_run
/// use fwpkg_core::FirmwarePackageConsumer;
///
/// let mut pkg = FirmwarePackageConsumer::from_path("fw.tar").unwrap();
/// println!("{} {}", pkg.manifest().name, pkg.manifest().version);
/// let mut out = std::fs::File::create("fw.bin").unwrap();
/// pkg.file(&mut out).unwrap();
/// ```
#[derive(Debug)]
pub struct FirmwarePackageConsumer<'a> {
    source: Source<'a>,
    manifest: Manifest,
}

impl FirmwarePackageConsumer<'static> {
    /// Open the package at `path`. The file is re-opened for every pass, so
    /// it must stay in place for later [`FirmwarePackageConsumer::file`] calls.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_path_with_limits(path, &PackageLimits::default())
    }

    /// [`FirmwarePackageConsumer::from_path`] with explicit limits.
    pub fn from_path_with_limits(path: impl AsRef<Path>, limits: &PackageLimits) -> Result<Self> {
        Self::open(Source::from_path(path.as_ref()), limits)
    }
}

impl<'a> FirmwarePackageConsumer<'a> {
    /// Open a package held in memory, either owned (`Vec<u8>`) or borrowed (`&[u8]`).
    pub fn from_bytes(data: impl Into<Cow<'a, [u8]>>) -> Result<Self> {
        Self::from_bytes_with_limits(data, &PackageLimits::default())
    }

    /// [`FirmwarePackageConsumer::from_bytes`] with explicit limits.
    pub fn from_bytes_with_limits(
        data: impl Into<Cow<'a, [u8]>>,
        limits: &PackageLimits,
    ) -> Result<Self> {
        Self::open(Source::from_bytes(data), limits)
    }

    fn open(mut source: Source<'a>, limits: &PackageLimits) -> Result<Self> {
        let manifest = load_manifest(&mut source, limits)?;
        tracing::debug!(
            name = %manifest.name,
            version = %manifest.version,
            file = %manifest.file,
            "opened firmware package"
        );
        Ok(Self { source, manifest })
    }

    /// The validated manifest. Never re-reads the archive.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Stream the firmware binary `./<manifest.file>` into `sink`, returning the
    /// number of bytes written. A failure here leaves the handle usable.
    pub fn file<W: Write + ?Sized>(&mut self, sink: &mut W) -> Result<u64> {
        reopen(&mut self.source)?;
        let name = entry_name(&self.manifest.file);
        let n = copy_entry(&mut self.source, &name, sink, None).map_err(|source| {
            Error::FirmwareEntry { file: self.manifest.file.clone(), source }
        })?;
        tracing::debug!(file = %self.manifest.file, bytes = n, "extracted firmware binary");
        Ok(n)
    }

    /// Names and sizes of all entries in the archive.
    pub fn entries(&mut self) -> Result<Vec<EntryInfo>> {
        reopen(&mut self.source)?;
        Ok(list_entries(&mut self.source)?)
    }
}

fn reopen(source: &mut Source<'_>) -> Result<()> {
    source.reopen().map_err(|e| match source.path() {
        Some(path) => Error::Open { path: path.to_path_buf(), source: e },
        None => Error::Io(e),
    })
}

fn load_manifest(source: &mut Source<'_>, limits: &PackageLimits) -> Result<Manifest> {
    reopen(source)?;
    let mut json = Vec::new();
    copy_entry(&mut *source, &entry_name(MANIFEST_FILE), &mut json, Some(limits.max_manifest_bytes))
        .map_err(Error::ManifestEntry)?;
    Ok(Manifest::from_json(&json)?)
}
