//! Indexing Pipeline Jobs
//!
//! A [`Document`] enters from the parser, becomes an [`IndexingJob`] in the
//! condense stage and leaves it as a [`CondensedJob`] for the store stage.

use super::tokenizer::WordStat;
use crate::index::metadata::UrlMetadataEntry;
use crate::workflow::types::{JobId, JobStatus, WorkflowJob};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A parsed web page as delivered by the crawler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub language: String,
    pub text: String,
    /// Last modification reported by the server (Unix ms). Defaults to load time.
    #[serde(default)]
    pub modified_ms: Option<u64>,
}

#[derive(Debug)]
pub struct IndexingJob {
    pub id: JobId,
    pub status: JobStatus,
    pub document: Document,
    pub load_ms: u64,
}

impl IndexingJob {
    pub fn new(document: Document, load_ms: u64) -> Self {
        Self {
            id: JobId::new(),
            status: JobStatus::New,
            document,
            load_ms,
        }
    }
}

impl WorkflowJob for IndexingJob {
    fn id(&self) -> &JobId {
        &self.id
    }
    fn status(&self) -> JobStatus {
        self.status
    }
    fn set_status(&mut self, status: JobStatus) {
        self.status = status;
    }
}

/// URL metadata plus the distinct words of one document, ready to store.
#[derive(Debug)]
pub struct CondensedJob {
    pub id: JobId,
    pub status: JobStatus,
    pub entry: UrlMetadataEntry,
    pub words: BTreeMap<String, WordStat>,
}

impl WorkflowJob for CondensedJob {
    fn id(&self) -> &JobId {
        &self.id
    }
    fn status(&self) -> JobStatus {
        self.status
    }
    fn set_status(&mut self, status: JobStatus) {
        self.status = status;
    }
}
