//! Package identity extraction
//!
//! An Android package is a ZIP container with a compiled `AndroidManifest.xml`
//! entry. Identity extraction opens the container in memory, reads the
//! manifest entry, and decodes the three attributes the dashboard needs:
//! package name, version name, and version code. Pure parse, no side effects.

mod axml;
pub mod error;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use error::ApkError;

use std::io::{Cursor, Read};

use serde::Serialize;
use zip::result::ZipError;
use zip::ZipArchive;

const ANDROID_MANIFEST: &str = "AndroidManifest.xml";

/// Identity of an uploaded package, as declared by its manifest.
///
/// Ephemeral: derived per upload, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApkIdentity {
    /// Package name, e.g. "ch.threema.app.libre"
    pub package: String,

    /// Human-readable version, e.g. "5.2.1"
    #[serde(rename = "versionName")]
    pub version_name: String,

    /// Numeric version, monotonically increasing per application
    #[serde(rename = "versionCode")]
    pub version_code: i64,
}

/// Extract the manifest identity from raw package bytes.
pub fn extract_identity(bytes: &[u8]) -> Result<ApkIdentity, ApkError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(ApkError::InvalidArchive)?;

    let mut entry = match archive.by_name(ANDROID_MANIFEST) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Err(ApkError::MissingManifest),
        Err(e) => return Err(ApkError::InvalidArchive(e)),
    };

    let mut manifest = Vec::with_capacity(entry.size() as usize);
    entry
        .read_to_end(&mut manifest)
        .map_err(ApkError::ManifestRead)?;
    drop(entry);

    let attrs = axml::read_root_attributes(&manifest)?;

    Ok(ApkIdentity {
        package: attrs.package.ok_or(ApkError::MissingAttribute("package"))?,
        version_name: attrs
            .version_name
            .ok_or(ApkError::MissingAttribute("versionName"))?,
        version_code: attrs
            .version_code
            .ok_or(ApkError::MissingAttribute("versionCode"))?,
    })
}
