//! Load-once artifact fetch.
//!
//! The artifact is fetched exactly once per process lifetime. Concurrent
//! callers share a single in-flight load; re-invocation after a successful
//! load is a no-op. A failed load records its error on the (empty) index
//! instead of propagating, so consumers degrade gracefully.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{error, info};

use lectern_core::Error;

use crate::artifact::parse_artifact;
use crate::index::{IndexConfig, PassageIndex};

/// Artifact fetch failure, with the missing-artifact case distinguished
/// because it gets a user-actionable remediation message.
#[derive(Debug)]
pub enum FetchError {
    NotFound,
    Other(String),
}

/// Where the embeddings artifact comes from.
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Fetch the raw artifact body.
    async fn fetch(&self) -> Result<String, FetchError>;

    /// Human-readable location of the artifact, for error messages.
    fn describe(&self) -> String;
}

/// HTTP source: `<base_url>/embeddings.json`.
pub struct HttpArtifactSource {
    client: reqwest::Client,
    url: String,
}

impl HttpArtifactSource {
    /// Source under a site base URL (trailing slash tolerated).
    pub fn new(base_url: &str) -> Self {
        Self::with_url(format!("{}/embeddings.json", base_url.trim_end_matches('/')))
    }

    /// Source at an explicit URL.
    pub fn with_url(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl ArtifactSource for HttpArtifactSource {
    async fn fetch(&self) -> Result<String, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FetchError::Other(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound);
        }
        if !response.status().is_success() {
            return Err(FetchError::Other(format!("HTTP {}", response.status())));
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::Other(e.to_string()))
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// The process-wide note index: one memoized load, shared by all consumers.
///
/// Explicitly owned and passed by reference (typically `Arc`) — not ambient
/// global state — so the core stays testable in isolation.
pub struct NoteIndex {
    source: Box<dyn ArtifactSource>,
    cfg: IndexConfig,
    cell: OnceCell<PassageIndex>,
}

impl NoteIndex {
    pub fn new(source: impl ArtifactSource + 'static) -> Self {
        Self::with_config(source, IndexConfig::default())
    }

    pub fn with_config(source: impl ArtifactSource + 'static, cfg: IndexConfig) -> Self {
        Self {
            source: Box::new(source),
            cfg,
            cell: OnceCell::new(),
        }
    }

    /// Load the index, fetching the artifact at most once. Concurrent callers
    /// await the same in-flight load; later calls return the cached result.
    pub async fn load(&self) -> &PassageIndex {
        self.cell.get_or_init(|| self.load_inner()).await
    }

    /// The index, if a load has completed.
    pub fn get(&self) -> Option<&PassageIndex> {
        self.cell.get()
    }

    /// Whether a load has completed with at least one passage.
    pub fn is_loaded(&self) -> bool {
        self.get().map(|idx| !idx.is_empty()).unwrap_or(false)
    }

    async fn load_inner(&self) -> PassageIndex {
        match self.source.fetch().await {
            Ok(body) => match parse_artifact(&body) {
                Ok(records) => {
                    let index = PassageIndex::from_records(records, &self.cfg);
                    info!(
                        passages = index.len(),
                        source = %self.source.describe(),
                        "loaded embeddings artifact"
                    );
                    index
                }
                Err(e) => {
                    error!("failed to parse embeddings artifact: {e}");
                    PassageIndex::failed(Error::ArtifactLoad(format!("could not parse it: {e}")))
                }
            },
            Err(FetchError::NotFound) => {
                error!(
                    source = %self.source.describe(),
                    "embeddings artifact not found"
                );
                PassageIndex::failed(Error::ArtifactNotFound(format!(
                    "{}. Regenerate it with the lectern-embed builder.",
                    self.source.describe()
                )))
            }
            Err(FetchError::Other(e)) => {
                error!("failed to load embeddings artifact: {e}");
                PassageIndex::failed(Error::ArtifactLoad(e))
            }
        }
    }
}
