use super::tokenizer::condense;
use super::types::{CondensedJob, IndexingJob};
use crate::index::container::WordReference;
use crate::index::hash::{UrlHash, WordHash};
use crate::index::metadata::UrlMetadataEntry;
use crate::index::segment::Segment;
use crate::workflow::stage::StageHandler;
use crate::workflow::types::{JobStatus, WorkflowJob};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::sync::Arc;

/// Turns a parsed document into URL metadata and per-word statistics.
pub struct CondenseStage;

#[async_trait]
impl StageHandler for CondenseStage {
    type Input = IndexingJob;
    type Output = CondensedJob;

    async fn process(&self, job: &mut IndexingJob) -> Result<Option<CondensedJob>> {
        let doc = &job.document;
        let url = url::Url::parse(&doc.url).with_context(|| format!("bad url '{}'", doc.url))?;

        let condensed = condense(&doc.text);
        if condensed.words.is_empty() {
            tracing::debug!("Skipping {}: no indexable words", url);
            return Ok(None);
        }

        let modified_ms = doc.modified_ms.unwrap_or(job.load_ms);
        let entry = UrlMetadataEntry {
            hash: UrlHash::of_url(&url),
            url: url.to_string(),
            title: doc.title.clone(),
            language: doc.language.clone(),
            load_ms: job.load_ms,
            fresh_ms: job.load_ms,
            modified_ms,
            size: doc.text.len() as u64,
            word_count: condensed.word_count,
        };

        tracing::trace!("Condensed {} into {} words", url, condensed.words.len());

        Ok(Some(CondensedJob {
            id: job.id().clone(),
            status: JobStatus::New,
            entry,
            words: condensed.words,
        }))
    }
}

/// Writes condensed documents into the local segment.
pub struct StoreStage {
    segment: Arc<Segment>,
}

impl StoreStage {
    pub fn new(segment: Arc<Segment>) -> Self {
        Self { segment }
    }
}

#[async_trait]
impl StageHandler for StoreStage {
    type Input = CondensedJob;
    type Output = ();

    async fn open(&self) -> Result<()> {
        if self.segment.words().is_closed() {
            bail!("segment is closed");
        }
        Ok(())
    }

    async fn process(&self, job: &mut CondensedJob) -> Result<Option<()>> {
        let entry = &job.entry;
        let postings: Vec<(WordHash, WordReference)> = job
            .words
            .iter()
            .map(|(word, stat)| {
                let reference = WordReference {
                    url_hash: entry.hash,
                    hits: stat.hits,
                    first_position: stat.first_position,
                    word_count: entry.word_count,
                    last_modified: entry.modified_ms,
                };
                (WordHash::of_word(word), reference)
            })
            .collect();

        let stored = self.segment.store_document(entry.clone(), postings)?;
        tracing::debug!("Indexed {} with {} words", entry.url, stored);
        Ok(None)
    }

    fn on_error(&self, job: &CondensedJob, error: &anyhow::Error) {
        tracing::warn!("Could not index {}: {:#}", job.entry.url, error);
    }
}
