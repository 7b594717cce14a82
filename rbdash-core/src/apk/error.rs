//! Error types for package parsing

use thiserror::Error;

/// Errors raised while extracting identity from an uploaded package.
///
/// All of these mean the payload could not be understood as a valid Android
/// package; none of them are fatal to the host and a retry with a new file is
/// always possible.
#[derive(Error, Debug)]
pub enum ApkError {
    /// The payload is not a readable ZIP container
    #[error("not a valid Android package archive")]
    InvalidArchive(#[source] zip::result::ZipError),

    /// The container has no AndroidManifest.xml entry
    #[error("package archive has no AndroidManifest.xml entry")]
    MissingManifest,

    /// The manifest entry could not be decompressed/read
    #[error("failed to read manifest entry from archive")]
    ManifestRead(#[source] std::io::Error),

    /// The manifest bytes do not decode as Android binary XML
    #[error("malformed binary manifest: {0}")]
    MalformedManifest(String),

    /// The manifest decodes but lacks a required identity attribute
    #[error("manifest is missing the {0} attribute")]
    MissingAttribute(&'static str),
}
