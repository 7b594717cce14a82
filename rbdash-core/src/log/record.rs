//! Build log data model
//!
//! Field names mirror the upstream JSON log documents so records deserialize
//! without renaming. Records are append-only: the build pipeline publishes
//! them and nothing in this crate ever mutates one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One remote per-application log document: records grouped by version tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogDocument {
    pub appid: String,

    #[serde(default)]
    pub tags: BTreeMap<String, Vec<BuildRecord>>,
}

/// One historical reproduction attempt for an (application, version, variant).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub appid: String,

    pub version_name: String,

    pub version_code: i64,

    /// Some(true) = rebuild matched upstream, Some(false) = attempted and
    /// differed, None = the build errored out entirely
    #[serde(default)]
    pub reproducible: Option<bool>,

    /// SHA-256 of the officially published, signed APK
    pub upstream_signed_apk_sha256: String,

    /// SHA-256 of the independently built, unsigned APK
    pub built_unsigned_apk_sha256: String,

    /// SHA-256 of the built APK with the upstream signature block copied in,
    /// kept to recognize signature-transplant deception
    pub signature_copied_apk_sha256: String,

    /// Source commit the rebuild was made from
    #[serde(default)]
    pub commit: String,

    /// Unix seconds of the last reproduction attempt
    #[serde(default)]
    pub timestamp: i64,

    #[serde(default)]
    pub recipe: Recipe,

    /// Captured rebuild output, when the pipeline published it
    #[serde(default)]
    pub build_log: Option<String>,

    /// Optional warnings attached by the pipeline
    #[serde(default)]
    pub notes: Vec<String>,
}

/// Build recipe reference attached to a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    #[serde(default)]
    pub repository: String,

    /// The build script; also encodes whether the build was universal
    #[serde(default)]
    pub build: String,

    /// Glob the produced APK was matched with; encodes the target ABI
    #[serde(default)]
    pub apk_pattern: String,

    #[serde(default)]
    pub apk_url: String,
}

/// Device architecture a record was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Architecture {
    #[serde(rename = "universal")]
    Universal,
    #[serde(rename = "arm64-v8a")]
    Arm64V8a,
    #[serde(rename = "armeabi-v7a")]
    ArmeabiV7a,
    #[serde(rename = "x86_64")]
    X86_64,
    #[serde(rename = "x86")]
    X86,
    #[serde(rename = "unknown")]
    Unknown,
}

impl Architecture {
    /// All known values, in detection order. `x86_64` must precede `x86`:
    /// every `x86_64` pattern also contains `x86`.
    pub const ALL: [Architecture; 6] = [
        Architecture::Universal,
        Architecture::Arm64V8a,
        Architecture::ArmeabiV7a,
        Architecture::X86_64,
        Architecture::X86,
        Architecture::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::Universal => "universal",
            Architecture::Arm64V8a => "arm64-v8a",
            Architecture::ArmeabiV7a => "armeabi-v7a",
            Architecture::X86_64 => "x86_64",
            Architecture::X86 => "x86",
            Architecture::Unknown => "unknown",
        }
    }

    pub fn parse(label: &str) -> Option<Architecture> {
        Architecture::ALL
            .iter()
            .copied()
            .find(|arch| arch.as_str() == label)
    }

    /// Derive the architecture of a record from its recipe.
    ///
    /// The ABI is named in the apk pattern when the build targets one; a
    /// universal build is recognizable by its `enable true` flag in the build
    /// script instead.
    pub fn of(record: &BuildRecord) -> Architecture {
        let pattern = &record.recipe.apk_pattern;
        for arch in Architecture::ALL {
            if arch != Architecture::Unknown && pattern.contains(arch.as_str()) {
                return arch;
            }
        }
        if record.recipe.build.contains("enable true") {
            Architecture::Universal
        } else {
            Architecture::Unknown
        }
    }
}

/// Display classification of the reproducibility tri-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reproducibility {
    /// Rebuild matched the published binary
    Success,
    /// Rebuild completed but differed
    Failure,
    /// Rebuild did not complete
    Error,
}

impl Reproducibility {
    pub fn of(record: &BuildRecord) -> Reproducibility {
        match record.reproducible {
            Some(true) => Reproducibility::Success,
            Some(false) => Reproducibility::Failure,
            None => Reproducibility::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Reproducibility::Success => "Success",
            Reproducibility::Failure => "Failure",
            Reproducibility::Error => "Error",
        }
    }

    pub fn parse(label: &str) -> Option<Reproducibility> {
        match label {
            "Success" => Some(Reproducibility::Success),
            "Failure" => Some(Reproducibility::Failure),
            "Error" => Some(Reproducibility::Error),
            _ => None,
        }
    }
}
