use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::pipeline::IndexingPipeline;
use super::types::Document;
use crate::index::segment::{IndexStats, Segment};
use crate::workflow::stage::StageStats;

pub const ENDPOINT_DOCUMENTS: &str = "/index/documents";
pub const ENDPOINT_STATS: &str = "/index/stats";

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub job_id: Option<String>,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct NodeStats {
    pub index: IndexStats,
    pub stages: Vec<StageStats>,
}

pub fn routes(pipeline: Arc<IndexingPipeline>, segment: Arc<Segment>) -> Router {
    Router::new()
        .route(ENDPOINT_DOCUMENTS, post(handle_submit_document))
        .route(ENDPOINT_STATS, get(handle_stats))
        .layer(Extension(pipeline))
        .layer(Extension(segment))
}

pub async fn handle_submit_document(
    Extension(pipeline): Extension<Arc<IndexingPipeline>>,
    Json(document): Json<Document>,
) -> (StatusCode, Json<SubmitResponse>) {
    match pipeline.submit(document).await {
        Ok(id) => (
            StatusCode::ACCEPTED,
            Json(SubmitResponse {
                job_id: Some(id.0),
                status: "queued".to_string(),
            }),
        ),
        Err(e) => {
            tracing::warn!("Rejected document: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(SubmitResponse {
                    job_id: None,
                    status: "closed".to_string(),
                }),
            )
        }
    }
}

pub async fn handle_stats(
    Extension(pipeline): Extension<Arc<IndexingPipeline>>,
    Extension(segment): Extension<Arc<Segment>>,
) -> Json<NodeStats> {
    Json(NodeStats {
        index: segment.stats(),
        stages: pipeline.stats(),
    })
}
