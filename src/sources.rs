use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::models::Posting;

// --- Adapter trait ---

/// One origin of postings. A failed fetch only loses this source's results.
#[async_trait]
pub trait JobSource: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch(&self, query: &str, location: &str) -> Result<Vec<Posting>>;
}

// --- Registry configuration ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceKind {
    File {
        path: PathBuf,
    },
    Feed {
        url: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub enabled: bool,
    #[serde(flatten)]
    pub kind: SourceKind,
}

impl SourceConfig {
    pub fn build(&self) -> Result<Arc<dyn JobSource>> {
        match &self.kind {
            SourceKind::File { path } => Ok(Arc::new(FileSource::new(&self.name, path.clone()))),
            SourceKind::Feed { url, timeout_secs } => Ok(Arc::new(FeedSource::new(
                &self.name,
                url,
                Duration::from_secs(*timeout_secs),
            )?)),
        }
    }
}

/// Sets `enabled` on the named source. Returns false when no source has that name.
pub fn set_enabled(configs: &mut [SourceConfig], name: &str, enabled: bool) -> bool {
    match configs.iter_mut().find(|c| c.name.eq_ignore_ascii_case(name)) {
        Some(config) => {
            config.enabled = enabled;
            true
        }
        None => false,
    }
}

pub struct RegistryEntry {
    pub source: Arc<dyn JobSource>,
    pub enabled: bool,
}

/// The adapters for one search, with their enabled state.
#[derive(Default)]
pub struct Registry {
    entries: Vec<RegistryEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: Arc<dyn JobSource>, enabled: bool) -> Self {
        self.entries.push(RegistryEntry { source, enabled });
        self
    }

    /// Builds every configured adapter. One that cannot be set up is logged
    /// and left out, the same as a source whose fetch fails.
    pub fn from_configs(configs: &[SourceConfig]) -> Self {
        let mut registry = Self::new();
        for config in configs {
            match config.build() {
                Ok(source) => registry = registry.with(source, config.enabled),
                Err(e) => warn!(source = %config.name, error = %e, "failed to set up source, skipping"),
            }
        }
        registry
    }

    pub fn enabled(&self) -> impl Iterator<Item = &Arc<dyn JobSource>> {
        self.entries.iter().filter(|e| e.enabled).map(|e| &e.source)
    }
}

// --- Aggregation ---

/// Queries every enabled source concurrently and merges what succeeded.
pub async fn aggregate(query: &str, location: &str, registry: &Registry) -> Vec<Posting> {
    let sources: Vec<&Arc<dyn JobSource>> = registry.enabled().collect();
    let fetches = sources.iter().map(|s| s.fetch(query, location));
    let outcomes = futures::future::join_all(fetches).await;

    let mut merged = Vec::new();
    for (source, outcome) in sources.iter().zip(outcomes) {
        match outcome {
            Ok(postings) => {
                debug!(source = source.name(), count = postings.len(), "source returned postings");
                merged.extend(postings);
            }
            Err(e) => {
                warn!(source = source.name(), error = %e, "source failed, skipping");
            }
        }
    }

    let deduped = dedup(merged);
    info!(query, location, count = deduped.len(), "search complete");
    deduped
}

/// Dedups by `(source, id)`. A later duplicate replaces the earlier one in
/// the earlier one's position.
pub fn dedup(postings: Vec<Posting>) -> Vec<Posting> {
    let mut index: HashMap<(String, String), usize> = HashMap::new();
    let mut out: Vec<Posting> = Vec::with_capacity(postings.len());

    for posting in postings {
        let key = (posting.source.clone(), posting.id.clone());
        match index.get(&key) {
            Some(&i) => out[i] = posting,
            None => {
                index.insert(key, out.len());
                out.push(posting);
            }
        }
    }
    out
}

// --- Search sequencing ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTicket(u64);

/// Hands out increasing tickets so results from a superseded search can be
/// recognised and dropped.
#[derive(Debug, Default)]
pub struct SearchTracker {
    latest: AtomicU64,
}

impl SearchTracker {
    pub fn begin(&self) -> SearchTicket {
        SearchTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: SearchTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }
}

// --- Shipped adapters ---

/// Postings from a local JSON file (an array of postings).
pub struct FileSource {
    name: String,
    path: PathBuf,
}

impl FileSource {
    pub fn new(name: &str, path: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            path,
        }
    }
}

#[async_trait]
impl JobSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, query: &str, location: &str) -> Result<Vec<Posting>> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read postings file: {}", self.path.display()))?;
        let postings: Vec<Posting> = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid postings JSON in {}", self.path.display()))?;

        let query = query.trim().to_lowercase();
        let location = location.trim().to_lowercase();

        Ok(postings
            .into_iter()
            .filter(|p| {
                query.is_empty()
                    || p.title.to_lowercase().contains(&query)
                    || p.company.to_lowercase().contains(&query)
                    || p.description_text().to_lowercase().contains(&query)
            })
            .filter(|p| location.is_empty() || p.location.to_lowercase().contains(&location))
            .map(|mut p| {
                p.source = self.name.clone();
                p
            })
            .collect())
    }
}

/// Postings from an HTTP endpoint returning a JSON array of postings.
pub struct FeedSource {
    name: String,
    url: reqwest::Url,
    client: reqwest::Client,
}

impl FeedSource {
    pub fn new(name: &str, url: &str, timeout: Duration) -> Result<Self> {
        let url = reqwest::Url::parse(url).with_context(|| format!("Invalid feed URL '{}'", url))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("jobscout/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            name: name.to_string(),
            url,
            client,
        })
    }
}

#[async_trait]
impl JobSource for FeedSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, query: &str, location: &str) -> Result<Vec<Posting>> {
        let response = self
            .client
            .get(self.url.clone())
            .query(&[("q", query), ("location", location)])
            .send()
            .await
            .with_context(|| format!("Failed to reach feed {}", self.url))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "Feed request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let postings: Vec<Posting> = response
            .json()
            .await
            .context("Failed to parse feed response")?;

        Ok(postings
            .into_iter()
            .map(|mut p| {
                p.source = self.name.clone();
                p
            })
            .collect())
    }
}
