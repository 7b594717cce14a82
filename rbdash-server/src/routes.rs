//! HTTP API routes
//!
//! The JSON surface consumed by the dashboard front end: the application
//! registry, the flattened build log with multi-select filters, and the
//! upload-verification endpoint.

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use rbdash_core::apk::{self, ApkIdentity};
use rbdash_core::digest::sha256_hex;
use rbdash_core::log::record::{Architecture, BuildRecord, Reproducibility};
use rbdash_core::log::{FlatRecord, LogFilter};
use rbdash_core::verify::{classify, Severity, UploadedIdentity, Verdict};

use crate::error::ApiError;
use crate::AppState;

/// The only content type accepted for uploads.
pub const APK_CONTENT_TYPE: &str = "application/vnd.android.package-archive";

/// Response envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(message: String) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let max_upload = state.config.log.max_upload_bytes;

    Router::new()
        .route("/api/health", get(health))
        .route("/api/apps", get(list_apps))
        .route("/api/log", get(get_log))
        .route("/api/log/:appid", get(get_app_log))
        .route("/api/verify", post(verify_apk))
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}

async fn health() -> Json<ApiResponse<String>> {
    Json(ApiResponse::ok("OK".to_string()))
}

#[derive(Debug, Serialize)]
struct AppInfo {
    appid: String,
    display_name: String,
}

async fn list_apps(State(state): State<AppState>) -> Json<ApiResponse<Vec<AppInfo>>> {
    let apps = state
        .config
        .apps
        .iter()
        .map(|app| AppInfo {
            appid: app.appid.clone(),
            display_name: app.display_name.clone(),
        })
        .collect();
    Json(ApiResponse::ok(apps))
}

/// Multi-select filters; each parameter is a comma-separated list and an
/// absent parameter means no restriction.
#[derive(Debug, Deserialize)]
struct LogQuery {
    app: Option<String>,
    version: Option<String>,
    arch: Option<String>,
    reproducible: Option<String>,
}

impl LogQuery {
    fn into_filter(self) -> Result<LogFilter, ApiError> {
        let mut filter = LogFilter {
            apps: split_csv(self.app.as_deref()),
            versions: split_csv(self.version.as_deref()),
            ..LogFilter::default()
        };

        for label in split_csv(self.arch.as_deref()) {
            let arch = Architecture::parse(&label)
                .ok_or_else(|| ApiError::BadRequest(format!("unknown architecture '{label}'")))?;
            filter.architectures.push(arch);
        }

        for label in split_csv(self.reproducible.as_deref()) {
            let repro = Reproducibility::parse(&label).ok_or_else(|| {
                ApiError::BadRequest(format!("unknown reproducibility '{label}'"))
            })?;
            filter.reproducibility.push(repro);
        }

        Ok(filter)
    }
}

fn split_csv(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

async fn get_log(
    State(state): State<AppState>,
    Query(query): Query<LogQuery>,
) -> Result<Json<ApiResponse<Vec<FlatRecord>>>, ApiError> {
    let filter = query.into_filter()?;
    let rows = state.store.flattened(&filter).await;
    Ok(Json(ApiResponse::ok(rows)))
}

async fn get_app_log(
    State(state): State<AppState>,
    Path(appid): Path<String>,
) -> Result<Json<ApiResponse<Vec<FlatRecord>>>, ApiError> {
    let rows = state.store.records_for(&appid).await?;
    Ok(Json(ApiResponse::ok(rows)))
}

#[derive(Debug, Deserialize)]
struct VerifyQuery {
    /// Optional original file name; only its extension is consulted
    filename: Option<String>,
}

/// Everything the front end needs to render a verification result.
#[derive(Debug, Serialize)]
struct VerifyReport {
    manifest: ApkIdentity,
    sha256: String,
    verdict: Verdict,
    severity: Severity,
    explanation: String,
    matched: Option<BuildRecord>,
    candidates: Vec<BuildRecord>,
}

async fn verify_apk(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ApiResponse<VerifyReport>>, ApiError> {
    check_upload_type(&headers, query.filename.as_deref())?;

    // Manifest parse and digest have no data dependency; run both and join
    // before classification. `Bytes` clones are reference-counted, so the
    // digest covers the exact bytes that were posted.
    let parse_input = body.clone();
    let digest_input = body.clone();
    let (identity, sha256) = tokio::join!(
        tokio::task::spawn_blocking(move || apk::extract_identity(&parse_input)),
        tokio::task::spawn_blocking(move || sha256_hex(&digest_input)),
    );
    let identity = identity.map_err(|_| ApiError::Internal)??;
    let sha256 = sha256.map_err(|_| ApiError::Internal)?;

    let candidates = state
        .store
        .candidates(&identity.package, &identity.version_name, identity.version_code)
        .await?;

    let uploaded = UploadedIdentity::new(identity.clone(), sha256.clone());
    let classification = classify(&uploaded, &candidates);

    info!(
        "classified upload {} {}/{}: {:?}",
        identity.package, identity.version_name, identity.version_code, classification.severity
    );

    let explanation = classification.verdict.explanation();
    Ok(Json(ApiResponse::ok(VerifyReport {
        manifest: identity,
        sha256,
        verdict: classification.verdict,
        severity: classification.severity,
        explanation,
        matched: classification.matched,
        candidates: classification.candidates,
    })))
    // The uploaded bytes drop with this frame; nothing is persisted.
}

fn check_upload_type(headers: &HeaderMap, filename: Option<&str>) -> Result<(), ApiError> {
    if let Some(name) = filename {
        if !name.to_ascii_lowercase().ends_with(".apk") {
            return Err(ApiError::InvalidFileType);
        }
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    // A bare .apk filename hint is acceptable when the client sent no usable
    // content type (some browsers post APKs as octet-stream).
    if content_type.starts_with(APK_CONTENT_TYPE) || filename.is_some() {
        Ok(())
    } else {
        Err(ApiError::InvalidFileType)
    }
}
