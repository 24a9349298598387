//! Named-entry lookup over a forward-only tar stream.
//!
//! Entry names are compared as stored, byte for byte. Packages store their
//! entries with a `./` prefix, so callers look up `./manifest.json`, not
//! `manifest.json`. Every lookup is a linear scan from wherever the reader is
//! positioned; no index is kept between calls.

use crate::error::EntryError;
use std::io::{self, Read, Write};

/// Name and declared size of one archive entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryInfo {
    pub name: String,
    pub size: u64,
}

/// Scan `reader` for the entry stored as `name` and stream its content to `sink`.
///
/// Returns the number of bytes copied. With `limit` set, a matching entry whose
/// header declares more than `limit` bytes is rejected before anything is copied.
pub fn copy_entry<R: Read, W: Write + ?Sized>(
    reader: R,
    name: &str,
    sink: &mut W,
    limit: Option<u64>,
) -> Result<u64, EntryError> {
    let mut archive = tar::Archive::new(reader);
    for entry in archive.entries()? {
        let mut entry = entry?;
        if &*entry.path_bytes() != name.as_bytes() {
            continue;
        }
        let size = entry.header().size()?;
        if let Some(limit) = limit {
            if size > limit {
                return Err(EntryError::TooLarge { name: name.to_string(), size, limit });
            }
        }
        let copied = io::copy(&mut entry, sink)?;
        tracing::trace!(entry = name, bytes = copied, "copied tar entry");
        return Ok(copied);
    }
    Err(EntryError::NotFound(name.to_string()))
}

/// List every entry in the stream, in archive order.
pub fn list_entries<R: Read>(reader: R) -> io::Result<Vec<EntryInfo>> {
    let mut archive = tar::Archive::new(reader);
    let mut out = Vec::new();
    for entry in archive.entries()? {
        let entry = entry?;
        out.push(EntryInfo {
            name: String::from_utf8_lossy(&entry.path_bytes()).into_owned(),
            size: entry.header().size()?,
        });
    }
    Ok(out)
}

/// Archive name for a package-relative path.
pub fn entry_name(rel: &str) -> String {
    format!("./{rel}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::producer::PackageWriter;

    fn archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut w = PackageWriter::new(Vec::new());
        for (name, data) in entries {
            w.append_entry(name, data.len() as u64, *data).unwrap();
        }
        w.finish().unwrap()
    }

    #[test]
    fn finds_entry_regardless_of_order() {
        let tar = archive(&[("./b", &b"bee"[..]), ("./a", &b"ay"[..])]);
        let mut out = Vec::new();
        let n = copy_entry(tar.as_slice(), "./a", &mut out, None).unwrap();
        assert_eq!(n, 2);
        assert_eq!(out, b"ay");
    }

    #[test]
    fn match_is_exact_and_case_sensitive() {
        let tar = archive(&[("./Image.bin", &b"x"[..]), ("image.bin", &b"y"[..])]);
        let mut out = Vec::new();
        let err = copy_entry(tar.as_slice(), "./image.bin", &mut out, None).unwrap_err();
        assert!(err.is_not_found());
        assert!(out.is_empty());
    }

    #[test]
    fn limit_rejects_oversized_entry() {
        let tar = archive(&[("./big", &[0u8; 64][..])]);
        let mut out = Vec::new();
        let err = copy_entry(tar.as_slice(), "./big", &mut out, Some(16)).unwrap_err();
        assert!(matches!(err, EntryError::TooLarge { size: 64, limit: 16, .. }));
        let n = copy_entry(tar.as_slice(), "./big", &mut out, Some(64)).unwrap();
        assert_eq!(n, 64);
    }

    #[test]
    fn lists_entries_in_order() {
        let tar = archive(&[("./manifest.json", &b"{}"[..]), ("./fw.bin", &b"1234"[..])]);
        let entries = list_entries(tar.as_slice()).unwrap();
        assert_eq!(
            entries,
            vec![
                EntryInfo { name: "./manifest.json".into(), size: 2 },
                EntryInfo { name: "./fw.bin".into(), size: 4 },
            ]
        );
    }

    #[test]
    fn empty_stream_is_not_found() {
        let mut out = Vec::new();
        let err = copy_entry(io::empty(), "./manifest.json", &mut out, None).unwrap_err();
        assert!(err.is_not_found());
    }
}
