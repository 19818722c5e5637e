//! HTTP Partition Client
//!
//! Talks to a partition service over the JSON protocol in `source::protocol`.
//! A single request is made per call; wrap the client in `retry::Retrying` for the
//! bounded retry behavior. Status codes map onto `FetchError` as follows:
//! 404 -> `NotFound`, 429 and 5xx -> `Transient`, any other non-2xx -> `Rejected`.

use super::error::FetchError;
use super::protocol::*;
use super::{PartitionLister, RecordFetcher};
use crate::cancel::CancelToken;
use crate::partition::filter::Filter;
use crate::partition::types::{PartitionId, Record};

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use std::time::Duration;

pub struct HttpSource {
    http_client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpSource {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Base URL extended by `segments`, each percent-encoded as one path segment.
    fn endpoint_url<'a>(
        &self,
        segments: impl IntoIterator<Item = &'a str>,
    ) -> Result<Url, FetchError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            FetchError::Rejected(format!("invalid endpoint {}: {}", self.base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|()| {
                FetchError::Rejected(format!("endpoint {} cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub(crate) fn list_url(&self, home: &PartitionId) -> Result<Url, FetchError> {
        let mut url = self.endpoint_url(partitions_segments())?;
        url.query_pairs_mut().append_pair("home", home.as_str());
        Ok(url)
    }

    pub(crate) fn records_url(&self, partition: &PartitionId) -> Result<Url, FetchError> {
        self.endpoint_url(records_segments(partition))
    }

    async fn fetch_once(
        &self,
        partition: &PartitionId,
        filter: &Filter,
    ) -> Result<Vec<Record>, FetchError> {
        let url = self.records_url(partition)?;
        let payload = FetchRecordsRequest {
            filters: filter.predicates().to_vec(),
        };

        let response = self
            .http_client
            .post(url)
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport_error)?;

        let response = check_status(response).await?;
        let body: FetchRecordsResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        tracing::debug!(
            "Fetched {} records from {}",
            body.records.len(),
            body.partition
        );
        Ok(body.records)
    }
}

#[async_trait]
impl PartitionLister for HttpSource {
    async fn list(&self, home: &PartitionId) -> Result<Vec<PartitionId>, FetchError> {
        let url = self.list_url(home)?;

        let response = self
            .http_client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport_error)?;

        let response = check_status(response).await?;
        let body: ListPartitionsResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        Ok(body.partitions)
    }
}

#[async_trait]
impl RecordFetcher for HttpSource {
    async fn fetch(
        &self,
        partition: &PartitionId,
        filter: &Filter,
        cancel: &CancelToken,
    ) -> Result<Vec<Record>, FetchError> {
        // Dropping the request future aborts the in-flight call.
        tokio::select! {
            outcome = self.fetch_once(partition, filter) => outcome,
            _ = cancel.cancelled() => {
                tracing::debug!("Request for {} abandoned on cancellation", partition);
                Err(FetchError::Cancelled)
            }
        }
    }
}

fn transport_error(err: reqwest::Error) -> FetchError {
    if err.is_decode() {
        FetchError::Decode(err.to_string())
    } else {
        FetchError::Transport(err.to_string())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, FetchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.error,
        Err(_) => status.to_string(),
    };

    Err(classify_status(status, message))
}

pub(crate) fn classify_status(status: StatusCode, message: String) -> FetchError {
    if status == StatusCode::NOT_FOUND {
        FetchError::NotFound(message)
    } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        FetchError::Transient(format!("{}: {}", status, message))
    } else {
        FetchError::Rejected(format!("{}: {}", status, message))
    }
}
