use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    routing::{get, post},
};
use std::sync::Arc;

use super::auth::NetworkAuth;
use super::protocol::{
    ENDPOINT_PEERS, ENDPOINT_TRANSFER_URLS, ENDPOINT_TRANSFERS, ReceiveStatus,
    TransferUrlsRequest, TransferUrlsResponse,
};
use super::receiver::IndexReceiver;
use super::transfer_log::TransferEvent;
use crate::peers::types::PeerSummary;

/// Routes of the DHT transfer surface.
pub fn routes(auth: Arc<NetworkAuth>, receiver: Arc<IndexReceiver>) -> Router {
    Router::new()
        .route(ENDPOINT_TRANSFER_URLS, post(handle_transfer_urls))
        .route(ENDPOINT_TRANSFERS, get(handle_transfers))
        .route(ENDPOINT_PEERS, get(handle_peers))
        .layer(Extension(auth))
        .layer(Extension(receiver))
}

pub async fn handle_transfer_urls(
    Extension(auth): Extension<Arc<NetworkAuth>>,
    Extension(receiver): Extension<Arc<IndexReceiver>>,
    Json(req): Json<TransferUrlsRequest>,
) -> (StatusCode, Json<TransferUrlsResponse>) {
    let sender = req.iam.clone();
    let request = match auth.authenticate(req) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!("Refused transfer from {}: {}", sender, e);
            return (
                StatusCode::UNAUTHORIZED,
                Json(TransferUrlsResponse::rejected(
                    ReceiveStatus::NotAuthenticated,
                )),
            );
        }
    };

    // Entry checks and the store writer lock are synchronous work.
    let outcome =
        match tokio::task::spawn_blocking(move || receiver.receive_entries(&request)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Transfer from {} aborted: {}", sender, e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(TransferUrlsResponse::rejected(ReceiveStatus::Internal)),
                );
            }
        };
    (StatusCode::OK, Json(outcome.to_response()))
}

pub async fn handle_transfers(
    Extension(receiver): Extension<Arc<IndexReceiver>>,
) -> Json<Vec<TransferEvent>> {
    Json(receiver.transfers().recent())
}

pub async fn handle_peers(
    Extension(receiver): Extension<Arc<IndexReceiver>>,
) -> Json<Vec<PeerSummary>> {
    Json(receiver.peers().summaries())
}
