use crate::cancel::CancelToken;
use crate::partition::filter::Filter;
use crate::partition::types::PartitionId;
use crate::source::error::FetchError;
use crate::source::memory::InMemorySource;
use crate::source::protocol::*;
use crate::source::{PartitionLister, RecordFetcher};

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct ListParams {
    pub home: Option<String>,
}

type ErrorReply = (StatusCode, Json<ErrorResponse>);

pub async fn handle_list_partitions(
    Query(params): Query<ListParams>,
    Extension(source): Extension<Arc<InMemorySource>>,
) -> Result<Json<ListPartitionsResponse>, ErrorReply> {
    let home = PartitionId::new(params.home.unwrap_or_default());

    match source.list(&home).await {
        Ok(partitions) => Ok(Json(ListPartitionsResponse { home, partitions })),
        Err(e) => {
            tracing::warn!("List through {} failed: {}", home, e);
            Err(error_reply(&e))
        }
    }
}

pub async fn handle_fetch_records(
    Path(id): Path<String>,
    Extension(source): Extension<Arc<InMemorySource>>,
    Json(req): Json<FetchRecordsRequest>,
) -> Result<Json<FetchRecordsResponse>, ErrorReply> {
    let partition = PartitionId::new(id);
    let filter = Filter::from_predicates(req.filters);

    let unknown = filter.unknown_names();
    if !unknown.is_empty() {
        let message = format!("unknown filter name(s): {}", unknown.join(", "));
        tracing::debug!("Rejecting query for {}: {}", partition, message);
        return Err((StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message })));
    }

    match source.fetch(&partition, &filter, &CancelToken::new()).await {
        Ok(records) => {
            tracing::debug!("Serving {} records from {}", records.len(), partition);
            Ok(Json(FetchRecordsResponse { partition, records }))
        }
        Err(e) => {
            tracing::debug!("Query for {} failed: {}", partition, e);
            Err(error_reply(&e))
        }
    }
}

fn error_reply(err: &FetchError) -> ErrorReply {
    let status = match err {
        FetchError::NotFound(_) => StatusCode::NOT_FOUND,
        FetchError::Transient(_) | FetchError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        FetchError::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = match err {
        // Keep the bare partition id so the client can rebuild `NotFound(id)`.
        FetchError::NotFound(id) => id.clone(),
        other => other.to_string(),
    };
    (status, Json(ErrorResponse { error: body }))
}
