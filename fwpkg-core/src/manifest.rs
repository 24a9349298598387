use crate::error::ManifestError;
use crate::path_safety::validate_entry_path;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Package-relative name of the manifest entry.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Hardware a firmware image targets.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Compatibility {
    #[serde(default, deserialize_with = "null_as_default")]
    pub hw: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub major_revs: Vec<String>,
    /// Keys this crate does not interpret, kept as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Contents of `manifest.json` in a firmware package.
///
/// Absent and `null` keys decode to empty values so that [`Manifest::validate`]
/// can name the offending key instead of failing in the JSON decoder.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Manifest {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub version: String,
    /// Package-relative path of the firmware binary, stored in the archive as `./<file>`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub file: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub compatibility: Compatibility,
    /// Keys this crate does not interpret, kept as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

impl Manifest {
    /// Decode and validate manifest JSON.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ManifestError> {
        let m: Manifest = serde_json::from_slice(bytes)?;
        m.validate()?;
        Ok(m)
    }

    /// Check required keys in a fixed order and report only the first one missing:
    /// `name`, `version`, `file`, `compatibility.hw`, `compatibility.major_revs`.
    /// A present `file` must also stay inside the package.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.name.is_empty() {
            return Err(ManifestError::Missing("name"));
        }
        if self.version.is_empty() {
            return Err(ManifestError::Missing("version"));
        }
        if self.file.is_empty() {
            return Err(ManifestError::Missing("file"));
        }
        if self.compatibility.hw.is_empty() {
            return Err(ManifestError::Missing("compatibility.hw"));
        }
        if self.compatibility.major_revs.is_empty() {
            return Err(ManifestError::Missing("compatibility.major_revs"));
        }
        validate_entry_path(&self.file)
    }

    /// Exact string match on `hw` and membership of `major_rev` in `major_revs`.
    /// Revisions are opaque labels; `"01"` and `"1"` are different revisions.
    pub fn is_compatible(&self, hw: &str, major_rev: &str) -> bool {
        self.compatibility.hw == hw && self.compatibility.major_revs.iter().any(|r| r == major_rev)
    }
}
