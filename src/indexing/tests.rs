//! Indexing Module Tests
//!
//! ## Test Scopes
//! - **Tokenizer**: word extraction and per-word statistics.
//! - **Stages**: condense output and store stage writes.
//! - **Pipeline**: documents flow end to end and shutdown drains both stages.
//! - **HTTP**: submission and stats endpoints.

#[cfg(test)]
mod tests {
    use crate::index::container::HandleSet;
    use crate::index::hash::{UrlHash, WordHash};
    use crate::index::reader::IndexReader;
    use crate::index::segment::Segment;
    use crate::indexing::handlers::{ENDPOINT_DOCUMENTS, ENDPOINT_STATS, SubmitResponse, routes};
    use crate::indexing::pipeline::{IndexingPipeline, PipelineConfig};
    use crate::indexing::stages::CondenseStage;
    use crate::indexing::tokenizer::{WordStat, condense, tokenize};
    use crate::indexing::types::{Document, IndexingJob};
    use crate::workflow::accounting::NoMemoryProbe;
    use crate::workflow::stage::StageHandler;
    use crate::workflow::types::WorkflowError;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn document(url: &str, text: &str) -> Document {
        Document {
            url: url.to_string(),
            title: "Title".to_string(),
            language: "en".to_string(),
            text: text.to_string(),
            modified_ms: Some(1_600_000_000_000),
        }
    }

    fn spawn(segment: Arc<Segment>) -> IndexingPipeline {
        IndexingPipeline::spawn(
            segment,
            PipelineConfig {
                workers: 2,
                queue_capacity: 4,
            },
            Arc::new(NoMemoryProbe),
        )
    }

    // ============================================================
    // TOKENIZER
    // ============================================================

    #[test]
    fn test_tokenize_lowercases_and_drops_short_words() {
        let words = tokenize("The Rust book, an ok read: Ownership & BORROWING!");

        assert_eq!(words, vec!["the", "rust", "book", "read", "ownership", "borrowing"]);
    }

    #[test]
    fn test_tokenize_keeps_non_ascii_words() {
        assert_eq!(tokenize("Größe über café"), vec!["größe", "über", "café"]);
    }

    #[test]
    fn test_condense_counts_hits_and_first_position() {
        let condensed = condense("alpha beta alpha gamma alpha");

        assert_eq!(condensed.word_count, 5);
        assert_eq!(condensed.words.len(), 3);
        assert_eq!(
            condensed.words["alpha"],
            WordStat {
                hits: 3,
                first_position: 0
            }
        );
        assert_eq!(
            condensed.words["gamma"],
            WordStat {
                hits: 1,
                first_position: 3
            }
        );
    }

    // ============================================================
    // STAGES
    // ============================================================

    #[tokio::test]
    async fn test_condense_stage_builds_metadata() {
        let mut job = IndexingJob::new(
            document("https://example.org/page", "rust search rust"),
            1_700_000_000_000,
        );

        let out = CondenseStage.process(&mut job).await.unwrap().unwrap();

        let url = url::Url::parse("https://example.org/page").unwrap();
        assert_eq!(out.id, job.id);
        assert_eq!(out.entry.hash, UrlHash::of_url(&url));
        assert_eq!(out.entry.word_count, 3);
        assert_eq!(out.entry.fresh_ms, 1_700_000_000_000);
        assert_eq!(out.entry.modified_ms, 1_600_000_000_000);
        assert_eq!(out.words["rust"].hits, 2);
    }

    #[tokio::test]
    async fn test_condense_stage_skips_empty_and_rejects_bad_urls() {
        let mut empty = IndexingJob::new(document("https://example.org/", "a b"), 1);
        let mut bad = IndexingJob::new(document("no scheme here", "some words here"), 1);

        assert!(CondenseStage.process(&mut empty).await.unwrap().is_none());
        assert!(CondenseStage.process(&mut bad).await.is_err());
    }

    // ============================================================
    // PIPELINE
    // ============================================================

    #[tokio::test]
    async fn test_pipeline_indexes_documents_and_drains() {
        // ARRANGE
        let segment = Arc::new(Segment::default());
        let pipeline = spawn(segment.clone());

        // ACT
        pipeline
            .submit(document("https://example.org/a", "rust ownership"))
            .await
            .unwrap();
        pipeline
            .submit(document("https://example.org/b", "rust borrowing"))
            .await
            .unwrap();
        pipeline
            .submit(document("https://example.org/c", "async runtime"))
            .await
            .unwrap();
        pipeline.shutdown().await;
        pipeline.join().await;

        // ASSERT
        assert_eq!(segment.urls().size(), 3);
        let rust = segment
            .words()
            .get(&WordHash::of_word("rust"), &HandleSet::new());
        assert_eq!(rust.len(), 2);
        assert!(segment.words().has(&WordHash::of_word("runtime")));

        let stats = pipeline.stats();
        assert_eq!(stats[0].name, "condense");
        assert_eq!(stats[0].processed, 3);
        assert_eq!(stats[1].name, "store");
        assert_eq!(stats[1].processed, 3);
        assert_eq!(stats[1].alive_workers, 0);
    }

    #[tokio::test]
    async fn test_pipeline_survives_bad_document() {
        let segment = Arc::new(Segment::default());
        let pipeline = spawn(segment.clone());

        pipeline
            .submit(document("::not a url::", "broken document"))
            .await
            .unwrap();
        pipeline
            .submit(document("https://example.org/ok", "valid document"))
            .await
            .unwrap();
        pipeline.shutdown().await;
        pipeline.join().await;

        assert_eq!(segment.urls().size(), 1);
        let stats = pipeline.stats();
        assert_eq!(stats[0].failed, 1);
        assert_eq!(stats[0].processed, 1);
    }

    #[tokio::test]
    async fn test_submit_after_join_is_rejected() {
        let pipeline = spawn(Arc::new(Segment::default()));
        pipeline.shutdown().await;
        pipeline.join().await;

        let result = pipeline
            .submit(document("https://example.org/late", "too late"))
            .await;

        assert!(matches!(result, Err(WorkflowError::Closed { .. })));
    }

    #[tokio::test]
    async fn test_closed_segment_stops_store_workers() {
        let segment = Arc::new(Segment::default());
        segment.close();
        let pipeline = spawn(segment.clone());

        pipeline
            .submit(document("https://example.org/x", "never stored"))
            .await
            .unwrap();
        pipeline.shutdown().await;
        pipeline.join().await;

        assert_eq!(segment.urls().size(), 0);
        assert_eq!(pipeline.stats()[1].processed, 0);
    }

    // ============================================================
    // HTTP
    // ============================================================

    #[tokio::test]
    async fn test_http_submit_then_stats() {
        let segment = Arc::new(Segment::default());
        let pipeline = Arc::new(spawn(segment.clone()));
        let app = routes(pipeline.clone(), segment.clone());

        let body = serde_json::to_string(&document("https://example.org/doc", "hello indexing world"))
            .unwrap();
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(ENDPOINT_DOCUMENTS)
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let reply: SubmitResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(reply.status, "queued");
        assert!(reply.job_id.is_some());

        pipeline.shutdown().await;
        pipeline.join().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri(ENDPOINT_STATS)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let stats: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(stats["index"]["urls"], 1);
        assert_eq!(stats["index"]["words"], 3);
        assert_eq!(stats["stages"][0]["processed"], 1);
    }
}
