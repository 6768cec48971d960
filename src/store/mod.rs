use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::source::SourceTag;
use crate::summary::SummaryResult;

const PREVIEW_CHARS: usize = 200;

/// A processed video as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResult {
    pub id: Uuid,
    pub url: String,
    pub source_type: SourceTag,
    pub transcript: String,
    pub summary: SummaryResult,
    pub processed_at: DateTime<Utc>,
}

/// Search hit with a short transcript preview
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: Uuid,
    pub url: String,
    pub source_type: SourceTag,
    pub processed_at: DateTime<Utc>,
    pub transcript_preview: String,
}

/// Filters for [`ResultStore::search`]; unset filters match everything
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub keyword: Option<String>,
    pub source_type: Option<SourceTag>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl SearchQuery {
    fn matches(&self, record: &StoredResult) -> bool {
        let keyword_ok = self.keyword.as_ref().map_or(true, |keyword| {
            let keyword = keyword.to_lowercase();
            record.transcript.to_lowercase().contains(&keyword)
                || record.summary.brief.to_lowercase().contains(&keyword)
        });

        keyword_ok
            && self.source_type.map_or(true, |tag| record.source_type == tag)
            && self.since.map_or(true, |since| record.processed_at >= since)
            && self.until.map_or(true, |until| record.processed_at <= until)
    }
}

/// Cache of processed results keyed by source URL
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn lookup(&self, url: &str) -> Result<Option<StoredResult>>;

    /// Persist a result, replacing any previous one for the URL; returns its id
    async fn store(
        &self,
        url: &str,
        source_type: SourceTag,
        transcript: &str,
        summary: &SummaryResult,
    ) -> Result<Uuid>;

    /// Matches ordered newest first
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>>;
}

/// One JSON document per URL in a directory
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn record_path(&self, url: &str) -> PathBuf {
        let digest = Sha256::digest(url.trim().as_bytes());
        self.root.join(format!("{}.json", hex::encode(digest)))
    }

    async fn read_record(path: &Path) -> Result<StoredResult> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Corrupt record {}", path.display()))
    }
}

#[async_trait]
impl ResultStore for JsonFileStore {
    async fn lookup(&self, url: &str) -> Result<Option<StoredResult>> {
        let path = self.record_path(url);
        if !path.is_file() {
            return Ok(None);
        }
        Self::read_record(&path).await.map(Some)
    }

    async fn store(
        &self,
        url: &str,
        source_type: SourceTag,
        transcript: &str,
        summary: &SummaryResult,
    ) -> Result<Uuid> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("Failed to create store directory {}", self.root.display()))?;

        let record = StoredResult {
            id: Uuid::new_v4(),
            url: url.trim().to_string(),
            source_type,
            transcript: transcript.to_string(),
            summary: summary.clone(),
            processed_at: Utc::now(),
        };

        let path = self.record_path(url);
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_vec_pretty(&record).context("Failed to serialize record")?;
        tokio::fs::write(&tmp, content)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("Failed to move record into place at {}", path.display()))?;

        tracing::debug!(id = %record.id, path = %path.display(), "stored result");
        Ok(record.id)
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).context("Failed to list store directory"),
        };

        let mut hits = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let record = match Self::read_record(&path).await {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable record");
                    continue;
                }
            };
            if query.matches(&record) {
                hits.push(SearchHit {
                    id: record.id,
                    url: record.url,
                    source_type: record.source_type,
                    processed_at: record.processed_at,
                    transcript_preview: preview(&record.transcript),
                });
            }
        }

        hits.sort_by(|a, b| b.processed_at.cmp(&a.processed_at));
        Ok(hits)
    }
}

/// First characters of a transcript followed by `...`
pub fn preview(transcript: &str) -> String {
    let head: String = transcript.chars().take(PREVIEW_CHARS).collect();
    format!("{}...", head)
}
