pub mod archive;
pub mod consumer;
pub mod error;
pub mod manifest;
pub mod path_safety;
pub mod producer;
pub mod source;

pub use consumer::{FirmwarePackageConsumer, PackageLimits};
pub use error::{EntryError, Error, ManifestError, Result};
pub use manifest::{Compatibility, Manifest};
