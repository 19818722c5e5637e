//! Partition Service Tests
//!
//! Round trips between `HttpSource` and the demo service on a loopback port.
//!
//! ## Test Scopes
//! - **Listing**: Partition set and order over HTTP.
//! - **Records**: Filters travel over the wire and are applied server-side.
//! - **Errors**: 404, 400, 422 and 503 map onto the right `FetchError` kinds; 503 is retried.

#[cfg(test)]
mod tests {
    use crate::cancel::CancelToken;
    use crate::partition::filter::{Filter, FilterPredicate};
    use crate::partition::types::{LifecycleState, PartitionId, Record};
    use crate::server;
    use crate::source::error::FetchError;
    use crate::source::http::HttpSource;
    use crate::source::memory::{InMemorySource, PartitionScript};
    use crate::source::retry::{RetryPolicy, Retrying};
    use crate::source::{PartitionLister, RecordFetcher};
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    async fn start(source: InMemorySource) -> (HttpSource, Arc<InMemorySource>) {
        let source = Arc::new(source);
        let bind: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let (addr, _handle) = server::spawn(bind, source.clone()).await.unwrap();
        let client = HttpSource::new(&format!("http://{}/", addr), Duration::from_secs(2));
        (client, source)
    }

    fn pid(id: &str) -> PartitionId {
        PartitionId::new(id)
    }

    #[tokio::test]
    async fn test_list_over_http() {
        let (client, _) = start(
            InMemorySource::new()
                .with_records("ap-northeast-1", vec![])
                .with_records("us-east-1", vec![]),
        )
        .await;

        let partitions = client.list(&pid("ap-northeast-1")).await.unwrap();

        assert_eq!(partitions, vec![pid("ap-northeast-1"), pid("us-east-1")]);
        assert!(!client.base_url().ends_with('/'));
    }

    #[tokio::test]
    async fn test_records_over_http_apply_filters() {
        let (client, _) = start(InMemorySource::new().with_records(
            "a",
            vec![
                Record::new("i1", "a1").with_name("web"),
                Record::new("i2", "a1").with_name("db"),
                Record::new("i3", "a1")
                    .with_name("web")
                    .with_state(LifecycleState::Terminated),
            ],
        ))
        .await;
        let filter = Filter::new(vec![FilterPredicate::new("tag:Name", ["web"])]);

        let records = client
            .fetch(&pid("a"), &filter, &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].record_id, "i1");
        assert_eq!(records[0].display_name, "web");
    }

    #[tokio::test]
    async fn test_reserved_characters_in_partition_id() {
        let (client, source) = start(
            InMemorySource::new()
                .with_records("edge/zone?1#x", vec![Record::new("i9", "edge")])
                .with_records("edge", vec![]),
        )
        .await;

        let records = client
            .fetch(&pid("edge/zone?1#x"), &Filter::default(), &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].record_id, "i9");
        assert_eq!(source.attempts(&pid("edge/zone?1#x")), 1);
        assert_eq!(source.attempts(&pid("edge")), 0);
    }

    #[tokio::test]
    async fn test_unknown_partition_is_not_found() {
        let (client, _) = start(InMemorySource::new()).await;

        let err = client
            .fetch(&pid("mars-1"), &Filter::default(), &CancelToken::new())
            .await
            .unwrap_err();

        assert_eq!(err, FetchError::NotFound("mars-1".to_string()));
    }

    #[tokio::test]
    async fn test_unknown_filter_is_rejected() {
        let (client, source) = start(InMemorySource::new().with_records("a", vec![])).await;
        let filter = Filter::new(vec![FilterPredicate::new("owner-id", ["1"])]);

        let err = client
            .fetch(&pid("a"), &filter, &CancelToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Rejected(ref m) if m.contains("owner-id")));
        // Rejected before the source is consulted
        assert_eq!(source.attempts(&pid("a")), 0);
    }

    #[tokio::test]
    async fn test_scripted_failure_is_not_retryable() {
        let (client, _) = start(
            InMemorySource::new().with_failure("a", FetchError::Rejected("access denied".into())),
        )
        .await;

        let err = client
            .fetch(&pid("a"), &Filter::default(), &CancelToken::new())
            .await
            .unwrap_err();

        assert!(!err.is_retryable());
        assert!(err.to_string().contains("access denied"));
    }

    #[tokio::test]
    async fn test_throttling_is_retried_over_http() {
        let (client, source) = start(InMemorySource::new().with_partition(
            "a",
            PartitionScript::Flaky {
                failures: 2,
                records: vec![Record::new("i1", "a1")],
            },
        ))
        .await;
        let retrying = Retrying::new(client, RetryPolicy::immediate(3));

        let records = retrying
            .fetch(&pid("a"), &Filter::default(), &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(source.attempts(&pid("a")), 3);
    }

    #[tokio::test]
    async fn test_cancelled_request_returns_promptly() {
        let (client, _) = start(
            InMemorySource::new()
                .with_records("slow", vec![Record::new("i1", "z")])
                .with_delay("slow", Duration::from_secs(30)),
        )
        .await;
        let client = Arc::new(client);
        let cancel = CancelToken::new();

        let task = {
            let client = client.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                client
                    .fetch(&PartitionId::new("slow"), &Filter::default(), &cancel)
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();

        let result = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("request should be abandoned")
            .unwrap();
        assert_eq!(result.unwrap_err(), FetchError::Cancelled);
    }
}
