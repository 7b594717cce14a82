//! Cached build-log store
//!
//! Loads one document per application, flattens the nested version map into
//! an indexed sequence once per refresh, and serves immutable snapshots from
//! a time-bounded cache. A refresh builds a complete new snapshot and swaps
//! it in atomically; readers keep whatever snapshot they already hold.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::DateTime;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::{AppConfig, DashboardConfig};

use super::error::LogError;
use super::record::{Architecture, BuildRecord, LogDocument, Reproducibility};
use super::source::{HttpLogSource, LogSource};

/// One flattened log row: a record plus the fields derived for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatRecord {
    /// The version tag the record was published under
    pub version: String,

    pub architecture: Architecture,

    pub reproducibility: Reproducibility,

    /// RFC 3339 rendering of the record's reproduction timestamp
    pub build_date: String,

    pub record: BuildRecord,
}

/// Immutable view of one application's log at a point in time.
struct Snapshot {
    records: Vec<FlatRecord>,
    index: HashMap<(String, i64), Vec<usize>>,
    fetched_at: Instant,
}

impl Snapshot {
    fn build(doc: LogDocument) -> Snapshot {
        let mut tags: Vec<(String, Vec<BuildRecord>)> = doc.tags.into_iter().collect();
        tags.sort_by(|(a, _), (b, _)| compare_versions(b, a));

        let mut records = Vec::new();
        let mut index: HashMap<(String, i64), Vec<usize>> = HashMap::new();
        for (version, group) in tags {
            for record in group {
                index
                    .entry((record.version_name.clone(), record.version_code))
                    .or_default()
                    .push(records.len());
                records.push(FlatRecord {
                    version: version.clone(),
                    architecture: Architecture::of(&record),
                    reproducibility: Reproducibility::of(&record),
                    build_date: DateTime::from_timestamp(record.timestamp, 0)
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_default(),
                    record,
                });
            }
        }

        Snapshot {
            records,
            index,
            fetched_at: Instant::now(),
        }
    }

    fn candidates(&self, version_name: &str, version_code: i64) -> Vec<BuildRecord> {
        self.index
            .get(&(version_name.to_string(), version_code))
            .map(|positions| {
                positions
                    .iter()
                    .map(|&i| self.records[i].record.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Compare dotted version strings numerically, major then minor then patch.
/// Missing or non-numeric components count as zero.
fn compare_versions(a: &str, b: &str) -> Ordering {
    version_components(a).cmp(&version_components(b))
}

fn version_components(version: &str) -> (u64, u64, u64) {
    let mut parts = version
        .split('.')
        .map(|part| part.parse::<u64>().unwrap_or(0));
    (
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
    )
}

/// Multi-select filter over the flattened log.
///
/// An empty selection for a dimension means "no restriction", matching the
/// dashboard's filter dropdowns.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub apps: Vec<String>,
    pub versions: Vec<String>,
    pub architectures: Vec<Architecture>,
    pub reproducibility: Vec<Reproducibility>,
}

impl LogFilter {
    pub fn matches(&self, row: &FlatRecord) -> bool {
        (self.apps.is_empty() || self.apps.contains(&row.record.appid))
            && (self.versions.is_empty() || self.versions.contains(&row.version))
            && (self.architectures.is_empty() || self.architectures.contains(&row.architecture))
            && (self.reproducibility.is_empty()
                || self.reproducibility.contains(&row.reproducibility))
    }
}

/// The dashboard's view of all configured application logs.
pub struct LogStore {
    source: Arc<dyn LogSource>,
    apps: Vec<AppConfig>,
    ttl: Duration,
    cache: RwLock<HashMap<String, Arc<Snapshot>>>,
}

impl LogStore {
    pub fn new(config: &DashboardConfig, source: Arc<dyn LogSource>) -> Self {
        LogStore {
            source,
            apps: config.apps.clone(),
            ttl: Duration::from_secs(config.log.cache_ttl_secs),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Store backed by the production HTTP source.
    pub fn with_http_source(config: &DashboardConfig) -> Result<Self, LogError> {
        let source = Arc::new(HttpLogSource::new(&config.log)?);
        Ok(LogStore::new(config, source))
    }

    pub fn apps(&self) -> &[AppConfig] {
        &self.apps
    }

    fn app(&self, appid: &str) -> Option<&AppConfig> {
        self.apps.iter().find(|app| app.appid == appid)
    }

    /// Candidate records for an exact `(version_name, version_code)` pair.
    ///
    /// An application id outside the configured registry yields an empty set:
    /// "not tracked" is a legitimate classification input, not an error.
    pub async fn candidates(
        &self,
        appid: &str,
        version_name: &str,
        version_code: i64,
    ) -> Result<Vec<BuildRecord>, LogError> {
        let Some(app) = self.app(appid) else {
            return Ok(Vec::new());
        };
        let snapshot = self.snapshot(app).await?;
        Ok(snapshot.candidates(version_name, version_code))
    }

    /// All records for one configured application, flattened.
    pub async fn records_for(&self, appid: &str) -> Result<Vec<FlatRecord>, LogError> {
        let app = self
            .app(appid)
            .ok_or_else(|| LogError::UnknownApp(appid.to_string()))?;
        let snapshot = self.snapshot(app).await?;
        Ok(snapshot.records.clone())
    }

    /// The combined, filtered log across every configured application.
    ///
    /// An application whose log cannot be fetched (and has no cached
    /// snapshot) is skipped with a warning so one broken source does not
    /// take down the whole listing.
    pub async fn flattened(&self, filter: &LogFilter) -> Vec<FlatRecord> {
        let mut out = Vec::new();
        for app in &self.apps {
            match self.snapshot(app).await {
                Ok(snapshot) => {
                    out.extend(
                        snapshot
                            .records
                            .iter()
                            .filter(|row| filter.matches(row))
                            .cloned(),
                    );
                }
                Err(e) => {
                    warn!("skipping build log for '{}': {}", app.appid, e);
                }
            }
        }
        out
    }

    /// Fetch every configured log now, ignoring the cache. Failures are
    /// logged and left for the next lazy refresh.
    pub async fn warm(&self) {
        for app in &self.apps {
            match self.source.fetch(app).await {
                Ok(doc) => {
                    self.install(&app.appid, doc).await;
                }
                Err(e) => {
                    warn!("failed to warm build log for '{}': {}", app.appid, e);
                }
            }
        }
    }

    async fn snapshot(&self, app: &AppConfig) -> Result<Arc<Snapshot>, LogError> {
        if let Some(snapshot) = self.cache.read().await.get(&app.appid) {
            if snapshot.fetched_at.elapsed() < self.ttl {
                return Ok(snapshot.clone());
            }
        }

        match self.source.fetch(app).await {
            Ok(doc) => Ok(self.install(&app.appid, doc).await),
            Err(e) => {
                // Serve the expired snapshot rather than nothing: the log is
                // append-only, so stale data is merely incomplete.
                if let Some(stale) = self.cache.read().await.get(&app.appid) {
                    warn!("serving stale build log for '{}': {}", app.appid, e);
                    return Ok(stale.clone());
                }
                Err(e)
            }
        }
    }

    async fn install(&self, appid: &str, doc: LogDocument) -> Arc<Snapshot> {
        let snapshot = Arc::new(Snapshot::build(doc));
        debug!(
            "refreshed build log for '{}' ({} records) via {}",
            appid,
            snapshot.records.len(),
            self.source.name()
        );
        self.cache
            .write()
            .await
            .insert(appid.to_string(), snapshot.clone());
        snapshot
    }
}
