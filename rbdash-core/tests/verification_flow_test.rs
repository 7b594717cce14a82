//! End-to-end core flow: extract identity, hash, look up candidates, classify.

use std::collections::BTreeMap;
use std::sync::Arc;

use pretty_assertions::assert_eq;

use rbdash_core::apk::{self, fixtures, ApkError};
use rbdash_core::config::{AppConfig, DashboardConfig, LogSettings};
use rbdash_core::digest::sha256_hex;
use rbdash_core::log::record::{BuildRecord, LogDocument, Recipe};
use rbdash_core::log::source::memory::MemoryLogSource;
use rbdash_core::log::LogStore;
use rbdash_core::verify::{classify, Severity, UploadedIdentity, Verdict};

const APPID: &str = "ch.threema.app.libre";

fn record(version_name: &str, version_code: i64, upstream_sha256: &str) -> BuildRecord {
    BuildRecord {
        appid: APPID.to_string(),
        version_name: version_name.to_string(),
        version_code,
        reproducible: Some(true),
        upstream_signed_apk_sha256: upstream_sha256.to_string(),
        built_unsigned_apk_sha256: "bb".repeat(32),
        signature_copied_apk_sha256: "cc".repeat(32),
        commit: "deadbeef".to_string(),
        timestamp: 1_722_000_000,
        recipe: Recipe {
            apk_pattern: "app-arm64-v8a-release.apk".to_string(),
            ..Recipe::default()
        },
        build_log: None,
        notes: Vec::new(),
    }
}

fn store_with(records: Vec<BuildRecord>) -> LogStore {
    let mut tags: BTreeMap<String, Vec<BuildRecord>> = BTreeMap::new();
    for rec in records {
        tags.entry(rec.version_name.clone()).or_default().push(rec);
    }
    let source = Arc::new(MemoryLogSource::new(vec![LogDocument {
        appid: APPID.to_string(),
        tags,
    }]));
    let config = DashboardConfig {
        apps: vec![AppConfig {
            appid: APPID.to_string(),
            display_name: "Threema Libre".to_string(),
            log_url: "https://logs.example/ch.threema.app.libre.json".to_string(),
        }],
        log: LogSettings::default(),
    };
    LogStore::new(&config, source)
}

#[tokio::test]
async fn test_reproduced_release_upload_verifies() {
    let apk_bytes = fixtures::build_apk(APPID, "5.2", 1520);
    let digest = sha256_hex(&apk_bytes);

    let store = store_with(vec![record("5.2", 1520, &digest)]);

    let identity = apk::extract_identity(&apk_bytes).unwrap();
    assert_eq!(identity.package, APPID);

    let candidates = store
        .candidates(&identity.package, &identity.version_name, identity.version_code)
        .await
        .unwrap();
    assert_eq!(candidates.len(), 1);

    let outcome = classify(&UploadedIdentity::new(identity, digest), &candidates);
    assert_eq!(outcome.verdict, Verdict::MatchesReproducedRelease);
    assert_eq!(outcome.severity, Severity::Success);
}

#[tokio::test]
async fn test_untracked_version_is_out_of_coverage() {
    let apk_bytes = fixtures::build_apk(APPID, "5.2", 1520);
    let digest = sha256_hex(&apk_bytes);

    // Only an older release is logged.
    let store = store_with(vec![record("5.1", 1510, &"aa".repeat(32))]);

    let identity = apk::extract_identity(&apk_bytes).unwrap();
    let candidates = store
        .candidates(&identity.package, &identity.version_name, identity.version_code)
        .await
        .unwrap();
    assert!(candidates.is_empty());

    let outcome = classify(&UploadedIdentity::new(identity, digest), &candidates);
    assert_eq!(
        outcome.verdict,
        Verdict::NoMatchingVersion {
            package: APPID.to_string(),
            version_name: "5.2".to_string(),
            version_code: 1520,
        }
    );
}

#[test]
fn test_malformed_upload_fails_before_classification() {
    // Extraction is the gate: bytes that are not a package never produce an
    // identity, so nothing can be classified.
    let err = apk::extract_identity(b"not an android package").unwrap_err();
    assert!(matches!(err, ApkError::InvalidArchive(_)));
}

#[test]
fn test_digest_is_computed_over_submitted_bytes() {
    let apk_bytes = fixtures::build_apk(APPID, "5.2", 1520);
    let digest = sha256_hex(&apk_bytes);

    // Stable across repeated hashing of the same buffer...
    assert_eq!(digest, sha256_hex(&apk_bytes));

    // ...and sensitive to any byte of the container, manifest or not.
    let mut tampered = apk_bytes.clone();
    let last = tampered.len() - 1;
    tampered[last] ^= 0xFF;
    assert_ne!(digest, sha256_hex(&tampered));
}
