//! Verification classifier
//!
//! Matches an uploaded package's identity and content digest against the
//! historical build records for its application and produces a trust verdict.
//! Classification is a pure function of its inputs: no I/O, no mutation,
//! safe to re-run on every upload.

use serde::Serialize;

use crate::apk::ApkIdentity;
use crate::digest::digests_equal;
use crate::log::record::BuildRecord;

/// Identity and digest of one uploaded package.
///
/// Ephemeral: built when a file is submitted, dropped when the request ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedIdentity {
    pub package: String,
    pub version_name: String,
    pub version_code: i64,
    /// SHA-256 of the uploaded bytes, hex
    pub content_hash: String,
}

impl UploadedIdentity {
    pub fn new(identity: ApkIdentity, content_hash: String) -> Self {
        UploadedIdentity {
            package: identity.package,
            version_name: identity.version_name,
            version_code: identity.version_code,
            content_hash,
        }
    }
}

/// How alarming a verdict is, for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Warning,
    Error,
}

/// Trust classification of one upload. Closed set: renderers must handle
/// every variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Verdict {
    /// The declared (version name, version code) pair is not in the log:
    /// out of coverage, distinct from any hash mismatch.
    NoMatchingVersion {
        package: String,
        version_name: String,
        version_code: i64,
    },

    /// Tracked version, but the digest matches none of the recorded hashes:
    /// unrecognized signer or unauthorized modification.
    UnknownHash,

    /// Digest matches the independently built, unsigned artifact.
    MatchesUnsignedBuild,

    /// Digest matches upstream and the rebuild reproduced it. The strongest
    /// assurance available.
    MatchesReproducedRelease,

    /// Digest matches the genuine published binary, but the rebuild did not
    /// succeed, so provenance is uncorroborated.
    MatchesUnreproducedUpstream,

    /// Digest matches an artifact known to carry a transplanted signature
    /// over different content: a deliberate-deception pattern.
    MatchesSignatureCopyAttempt,
}

impl Verdict {
    pub fn severity(&self) -> Severity {
        match self {
            Verdict::MatchesReproducedRelease => Severity::Success,
            Verdict::NoMatchingVersion { .. }
            | Verdict::UnknownHash
            | Verdict::MatchesUnsignedBuild
            | Verdict::MatchesUnreproducedUpstream => Severity::Warning,
            Verdict::MatchesSignatureCopyAttempt => Severity::Error,
        }
    }

    /// Explanation shown next to the verdict.
    pub fn explanation(&self) -> String {
        match self {
            Verdict::NoMatchingVersion {
                package,
                version_name,
                version_code,
            } => format!(
                "No logs found for this APK. Package: {package}, version: {version_name}, \
                 version code: {version_code}. Either this application is not tracked, or the \
                 log has not been updated to the latest release yet."
            ),
            Verdict::UnknownHash => "Your APK declares a version from the logs, but none of the \
                logged checksums match it. Your APK might be compromised, or it might be signed \
                with a key unknown to us. Be careful!"
                .to_string(),
            Verdict::MatchesUnsignedBuild => "Your APK matches the APK we built from the source \
                code, so it faithfully reflects the source. However, it might not be usable as \
                it is not signed."
                .to_string(),
            Verdict::MatchesReproducedRelease => {
                "Your APK matches a successfully reproduced release.".to_string()
            }
            Verdict::MatchesUnreproducedUpstream => "Your APK matches the officially published \
                release, but we were not able to reproduce it from the source code. Be careful."
                .to_string(),
            Verdict::MatchesSignatureCopyAttempt => "Your APK matches an artifact whose \
                signature was copied from a genuine release onto different content. This is a \
                known deception pattern; do not trust this file."
                .to_string(),
        }
    }
}

/// Outcome of classifying one upload: the verdict, the record whose digest
/// matched (when one did), and every record for the declared version.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub verdict: Verdict,

    pub severity: Severity,

    pub matched: Option<BuildRecord>,

    /// All records sharing the upload's exact (version name, version code)
    pub candidates: Vec<BuildRecord>,
}

/// Classify an upload against the build records of its application.
///
/// `records` may be the application's full record set or one already narrowed
/// to the upload's version; the exact-version filter is applied either way.
/// Outcomes follow a fixed precedence and do not depend on record order:
/// no match at all, then unsigned-build, then reproduced release, then
/// unreproduced upstream, then signature copy. A record matching several
/// digest fields at once is degenerate and resolves to the first rung it
/// satisfies.
pub fn classify(identity: &UploadedIdentity, records: &[BuildRecord]) -> Classification {
    let candidates: Vec<BuildRecord> = records
        .iter()
        .filter(|record| {
            record.version_name == identity.version_name
                && record.version_code == identity.version_code
        })
        .cloned()
        .collect();

    if candidates.is_empty() {
        let verdict = Verdict::NoMatchingVersion {
            package: identity.package.clone(),
            version_name: identity.version_name.clone(),
            version_code: identity.version_code,
        };
        return Classification {
            severity: verdict.severity(),
            verdict,
            matched: None,
            candidates,
        };
    }

    let hash = identity.content_hash.as_str();

    let unsigned = candidates
        .iter()
        .find(|r| digests_equal(hash, &r.built_unsigned_apk_sha256));
    let reproduced = candidates.iter().find(|r| {
        r.reproducible == Some(true) && digests_equal(hash, &r.upstream_signed_apk_sha256)
    });
    let upstream = candidates
        .iter()
        .find(|r| digests_equal(hash, &r.upstream_signed_apk_sha256));
    let signature_copy = candidates
        .iter()
        .find(|r| digests_equal(hash, &r.signature_copied_apk_sha256));

    let outcome = if let Some(record) = unsigned {
        Some((Verdict::MatchesUnsignedBuild, record))
    } else if let Some(record) = reproduced {
        Some((Verdict::MatchesReproducedRelease, record))
    } else if let Some(record) = upstream {
        Some((Verdict::MatchesUnreproducedUpstream, record))
    } else {
        signature_copy.map(|record| (Verdict::MatchesSignatureCopyAttempt, record))
    };

    match outcome {
        Some((verdict, record)) => Classification {
            severity: verdict.severity(),
            verdict,
            matched: Some(record.clone()),
            candidates: candidates.clone(),
        },
        None => Classification {
            severity: Verdict::UnknownHash.severity(),
            verdict: Verdict::UnknownHash,
            matched: None,
            candidates,
        },
    }
}
