use crate::error::ManifestError;
use std::path::{Component, Path};

/// Ensure the manifest's `file` names an entry inside the package: no absolute
/// path, no drive prefix and no `..` component. Tar names always use `/`, so a
/// leading `/` is rejected on every platform.
///
/// `.` segments are rejected too: the entry is looked up as `./<file>`, so
/// `./image.bin` would be searched for as `././image.bin` and never match.
pub fn validate_entry_path(rel: &str) -> Result<(), ManifestError> {
    let path = Path::new(rel);
    if rel.starts_with('/') || path.is_absolute() {
        return Err(ManifestError::UnsafePath(format!("absolute paths are not allowed: {rel:?}")));
    }
    // `Path::components` drops interior `.` segments, so look at the raw text.
    if rel.split('/').any(|seg| seg == ".") {
        return Err(ManifestError::UnsafePath(format!("\".\" segments not allowed: {rel:?}")));
    }
    for comp in path.components() {
        match comp {
            Component::ParentDir => {
                return Err(ManifestError::UnsafePath(format!(
                    "parent traversal not allowed: {rel:?}"
                )));
            }
            Component::Prefix(_) | Component::RootDir => {
                return Err(ManifestError::UnsafePath(format!(
                    "absolute paths are not allowed: {rel:?}"
                )));
            }
            Component::CurDir | Component::Normal(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_relative_names() {
        for ok in ["image.bin", "fw/image.bin", "a/b/c.img", "dots..in.name"] {
            validate_entry_path(ok).unwrap();
        }
    }

    #[test]
    fn rejects_dot_segments() {
        for bad in ["./image.bin", "fw/./image.bin", "."] {
            let err = validate_entry_path(bad).unwrap_err();
            assert!(err.to_string().contains(r#""." segments not allowed"#), "{bad}: {err}");
        }
    }

    #[test]
    fn rejects_traversal_and_absolute() {
        for bad in ["../../etc/passwd", "fw/../../x", "/etc/passwd", ".."] {
            let err = validate_entry_path(bad).unwrap_err();
            assert!(matches!(err, ManifestError::UnsafePath(_)), "{bad}: {err}");
        }
    }
}
