//! API integration tests: drive the router end to end with synthetic uploads.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use serde_json::Value;
use tower::ServiceExt;

use rbdash_core::apk::fixtures;
use rbdash_core::config::{AppConfig, DashboardConfig, LogSettings};
use rbdash_core::digest::sha256_hex;
use rbdash_core::log::record::{BuildRecord, LogDocument, Recipe};
use rbdash_core::log::source::memory::MemoryLogSource;
use rbdash_core::log::LogStore;
use rbdash_server::{router, AppState};

const APK_CONTENT_TYPE: &str = "application/vnd.android.package-archive";
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

fn test_router(records: Vec<BuildRecord>) -> Router {
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
    let store = LogStore::new(&config, source);
    router(AppState::new(config, store))
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn verify_request(body: Vec<u8>, content_type: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_verify_reproduced_release() {
    let apk = fixtures::build_apk(APPID, "5.2", 1520);
    let expected_sha256 = sha256_hex(&apk);

    let app = test_router(vec![record("5.2", 1520, &expected_sha256)]);
    let response = app
        .oneshot(verify_request(apk, APK_CONTENT_TYPE, "/api/verify"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], Value::Bool(true));

    let data = &body["data"];
    assert_eq!(data["manifest"]["package"], APPID);
    assert_eq!(data["manifest"]["versionName"], "5.2");
    assert_eq!(data["manifest"]["versionCode"], 1520);
    // The digest must cover the exact bytes that were posted, byte for byte.
    assert_eq!(data["sha256"], Value::String(expected_sha256));
    assert_eq!(data["verdict"]["kind"], "matches_reproduced_release");
    assert_eq!(data["severity"], "success");
    assert_eq!(data["candidates"].as_array().unwrap().len(), 1);
    assert!(data["matched"].is_object());
}

#[tokio::test]
async fn test_verify_unknown_hash_warns() {
    let apk = fixtures::build_apk(APPID, "5.2", 1520);

    // The log tracks this version, but with digests that cannot match.
    let app = test_router(vec![record("5.2", 1520, &"aa".repeat(32))]);
    let response = app
        .oneshot(verify_request(apk, APK_CONTENT_TYPE, "/api/verify"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let data = json_body(response).await["data"].clone();
    assert_eq!(data["verdict"]["kind"], "unknown_hash");
    assert_eq!(data["severity"], "warning");
    assert!(data["matched"].is_null());
}

#[tokio::test]
async fn test_verify_untracked_version_is_distinct_outcome() {
    let apk = fixtures::build_apk(APPID, "9.9", 9990);

    let app = test_router(vec![record("5.2", 1520, &"aa".repeat(32))]);
    let response = app
        .oneshot(verify_request(apk, APK_CONTENT_TYPE, "/api/verify"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let data = json_body(response).await["data"].clone();
    assert_eq!(data["verdict"]["kind"], "no_matching_version");
    assert_eq!(data["verdict"]["version_code"], 9990);
    assert_eq!(data["candidates"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_verify_rejects_wrong_content_type() {
    let app = test_router(vec![]);
    let response = app
        .oneshot(verify_request(b"plain text".to_vec(), "text/plain", "/api/verify"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let body = json_body(response).await;
    assert_eq!(body["success"], Value::Bool(false));
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_verify_accepts_filename_hint() {
    let apk = fixtures::build_apk(APPID, "5.2", 1520);
    let expected_sha256 = sha256_hex(&apk);

    let app = test_router(vec![record("5.2", 1520, &expected_sha256)]);
    let response = app
        .oneshot(verify_request(
            apk,
            "application/octet-stream",
            "/api/verify?filename=threema-libre.apk",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_verify_rejects_non_apk_filename() {
    let app = test_router(vec![]);
    let response = app
        .oneshot(verify_request(
            b"zip-like".to_vec(),
            APK_CONTENT_TYPE,
            "/api/verify?filename=report.pdf",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_verify_rejects_malformed_package() {
    let app = test_router(vec![]);
    let response = app
        .oneshot(verify_request(
            b"garbage that is not a zip".to_vec(),
            APK_CONTENT_TYPE,
            "/api/verify",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(body["success"], Value::Bool(false));
}

#[tokio::test]
async fn test_log_listing_and_filters() {
    let digest = "aa".repeat(32);
    let mut x86 = record("5.1", 1510, &digest);
    x86.recipe.apk_pattern = "app-x86_64-release.apk".to_string();

    let app = test_router(vec![record("5.2", 1520, &digest), x86]);

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/log").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let rows = json_body(response).await["data"].as_array().unwrap().len();
    assert_eq!(rows, 2);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/log?arch=arm64-v8a")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = json_body(response).await;
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["record"]["version_code"], 1520);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/log?arch=sparc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_apps_listing() {
    let app = test_router(vec![]);
    let response = app
        .oneshot(Request::builder().uri("/api/apps").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let apps = body["data"].as_array().unwrap();
    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0]["appid"], APPID);
    assert_eq!(apps[0]["display_name"], "Threema Libre");
}

#[tokio::test]
async fn test_per_app_log_unknown_appid_is_not_found() {
    let app = test_router(vec![]);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/log/com.example.unknown")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health() {
    let app = test_router(vec![]);
    let response = app
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
