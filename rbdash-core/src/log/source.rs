//! Log source abstraction
//!
//! The dashboard consumes one HTTP-fetchable JSON document per application.
//! The trait keeps the store testable without a network; the reqwest
//! implementation is the production source.

use async_trait::async_trait;

use crate::config::{AppConfig, LogSettings};

use super::error::LogError;
use super::record::LogDocument;

/// A provider of per-application build log documents.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Fetch the current log document for one configured application.
    async fn fetch(&self, app: &AppConfig) -> Result<LogDocument, LogError>;

    /// Source identifier for logging/debugging
    fn name(&self) -> &'static str;
}

/// HTTP log source backed by reqwest.
pub struct HttpLogSource {
    client: reqwest::Client,
}

impl HttpLogSource {
    pub fn new(settings: &LogSettings) -> Result<Self, LogError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("rbdash/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(settings.fetch_timeout_secs))
            .build()
            .map_err(LogError::Client)?;

        Ok(HttpLogSource { client })
    }
}

#[async_trait]
impl LogSource for HttpLogSource {
    async fn fetch(&self, app: &AppConfig) -> Result<LogDocument, LogError> {
        let response = self
            .client
            .get(&app.log_url)
            .send()
            .await
            .map_err(|source| LogError::Transport {
                appid: app.appid.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LogError::Status {
                appid: app.appid.clone(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| LogError::Transport {
                appid: app.appid.clone(),
                source,
            })?;

        serde_json::from_str(&body).map_err(|source| LogError::Parse {
            appid: app.appid.clone(),
            source,
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// In-memory source for tests: serves fixed documents, counts fetches.
#[cfg(any(test, feature = "fixtures"))]
pub mod memory {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    pub struct MemoryLogSource {
        documents: HashMap<String, LogDocument>,
        fetches: AtomicUsize,
    }

    impl MemoryLogSource {
        pub fn new(documents: Vec<LogDocument>) -> Self {
            MemoryLogSource {
                documents: documents
                    .into_iter()
                    .map(|doc| (doc.appid.clone(), doc))
                    .collect(),
                fetches: AtomicUsize::new(0),
            }
        }

        /// Number of fetches served so far, for cache assertions.
        pub fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LogSource for MemoryLogSource {
        async fn fetch(&self, app: &AppConfig) -> Result<LogDocument, LogError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.documents
                .get(&app.appid)
                .cloned()
                .ok_or_else(|| LogError::Status {
                    appid: app.appid.clone(),
                    status: 404,
                })
        }

        fn name(&self) -> &'static str {
            "memory"
        }
    }
}
