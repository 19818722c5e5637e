//! Source Module Tests
//!
//! ## Test Scopes
//! - **InMemorySource**: Listing order, filtering, scripted failures, cancellation, fixtures.
//! - **Retrying**: Attempt bound, non-retryable pass-through, cancellation during backoff.
//! - **HTTP status mapping**: Status codes to `FetchError` kinds.
//!
//! *Note: HTTP round trips against the demo service live in `server::tests`.*

#[cfg(test)]
mod tests {
    use crate::cancel::CancelToken;
    use crate::partition::filter::{Filter, FilterPredicate};
    use crate::partition::types::{LifecycleState, PartitionId, Record};
    use crate::source::error::FetchError;
    use crate::source::http::{HttpSource, classify_status};
    use crate::source::memory::{InMemorySource, PartitionScript};
    use crate::source::retry::{RetryPolicy, Retrying};
    use crate::source::{PartitionLister, RecordFetcher};
    use reqwest::StatusCode;
    use std::io::Write;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn pid(id: &str) -> PartitionId {
        PartitionId::new(id)
    }

    // ============================================================
    // IN-MEMORY SOURCE
    // ============================================================

    #[tokio::test]
    async fn test_list_preserves_insertion_order() {
        let source = InMemorySource::new()
            .with_records("c", vec![])
            .with_records("a", vec![])
            .with_records("b", vec![])
            .with_records("a", vec![Record::new("i1", "a1")]);

        let listed = source.list(&pid("home")).await.unwrap();

        assert_eq!(listed, vec![pid("c"), pid("a"), pid("b")]);
        assert_eq!(source.list_calls(), 1);
    }

    #[tokio::test]
    async fn test_fetch_applies_filter_and_keeps_order() {
        let source = InMemorySource::new().with_records(
            "a",
            vec![
                Record::new("i1", "a1"),
                Record::new("i2", "a1").with_state(LifecycleState::Terminated),
                Record::new("i3", "a2").with_state(LifecycleState::Stopped),
            ],
        );

        let records = source
            .fetch(&pid("a"), &Filter::default(), &CancelToken::new())
            .await
            .unwrap();

        let ids: Vec<&str> = records.iter().map(|r| r.record_id.as_str()).collect();
        assert_eq!(ids, vec!["i1", "i3"]);
    }

    #[tokio::test]
    async fn test_fetch_extra_predicate_narrows_results() {
        let source = InMemorySource::new().with_records(
            "a",
            vec![Record::new("i1", "a1"), Record::new("i2", "a2")],
        );
        let filter = Filter::new(vec![FilterPredicate::new("availability-zone", ["a2"])]);

        let records = source
            .fetch(&pid("a"), &filter, &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].record_id, "i2");
    }

    #[tokio::test]
    async fn test_fetch_unknown_partition_is_not_found() {
        let source = InMemorySource::new();

        let err = source
            .fetch(&pid("nowhere"), &Filter::default(), &CancelToken::new())
            .await
            .unwrap_err();

        assert_eq!(err, FetchError::NotFound("nowhere".to_string()));
    }

    #[tokio::test]
    async fn test_fetch_observes_cancellation_during_delay() {
        let source = Arc::new(
            InMemorySource::new()
                .with_records("slow", vec![Record::new("i1", "z")])
                .with_delay("slow", Duration::from_secs(30)),
        );
        let cancel = CancelToken::new();

        let task = {
            let source = source.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                source
                    .fetch(&PartitionId::new("slow"), &Filter::default(), &cancel)
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        let result = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("fetch should unwind promptly")
            .unwrap();

        assert_eq!(result.unwrap_err(), FetchError::Cancelled);
        assert_eq!(source.cancelled_fetches(), 1);
        assert_eq!(source.completed_fetches(), 0);
    }

    #[tokio::test]
    async fn test_scripted_list_failure() {
        let source =
            InMemorySource::new().with_list_failure(FetchError::Rejected("no access".into()));

        let err = source.list(&pid("home")).await.unwrap_err();

        assert_eq!(err, FetchError::Rejected("no access".into()));
    }

    #[test]
    fn test_fixture_file_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "partitions": [
                    {{ "id": "a", "records": [{{"recordId": "i1", "zone": "a1", "lifecycleState": "running"}}] }},
                    {{ "id": "b", "fail": "access denied" }},
                    {{ "id": "c", "transient_failures": 2, "delay_ms": 5 }}
                ]
            }}"#
        )
        .unwrap();

        let source = InMemorySource::load_fixture_file(file.path()).unwrap();

        assert_eq!(source.partition_ids(), &[pid("a"), pid("b"), pid("c")]);
        assert!(source.contains(&pid("b")));
    }

    #[test]
    fn test_fixture_file_missing_is_an_error() {
        let result = InMemorySource::load_fixture_file("/definitely/not/here.json");

        let err = result.err().expect("missing file must fail").to_string();
        assert!(err.contains("failed to read fixture file"));
    }

    // ============================================================
    // RETRY DECORATOR
    // ============================================================

    #[tokio::test]
    async fn test_retry_recovers_below_bound() {
        // ARRANGE: two transient failures, bound of three attempts
        let source = Arc::new(InMemorySource::new().with_partition(
            "a",
            PartitionScript::Flaky {
                failures: 2,
                records: vec![Record::new("i1", "a1")],
            },
        ));
        let retrying = Retrying::new(source.clone(), RetryPolicy::immediate(3));

        // ACT
        let records = retrying
            .fetch(&pid("a"), &Filter::default(), &CancelToken::new())
            .await
            .unwrap();

        // ASSERT
        assert_eq!(records.len(), 1);
        assert_eq!(source.attempts(&pid("a")), 3);
    }

    #[tokio::test]
    async fn test_retry_exhausts_after_three_attempts() {
        let source = Arc::new(InMemorySource::new().with_partition(
            "b",
            PartitionScript::Flaky {
                failures: 10,
                records: vec![],
            },
        ));
        let retrying = Retrying::new(source.clone(), RetryPolicy::immediate(3));

        let err = retrying
            .fetch(&pid("b"), &Filter::default(), &CancelToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Exhausted { attempts: 3, .. }));
        assert!(err.to_string().contains("throttled"));
        assert_eq!(source.attempts(&pid("b")), 3);
    }

    #[tokio::test]
    async fn test_retry_does_not_repeat_rejections() {
        let source = Arc::new(
            InMemorySource::new().with_failure("b", FetchError::Rejected("bad filter".into())),
        );
        let retrying = Retrying::new(source.clone(), RetryPolicy::immediate(3));

        let err = retrying
            .fetch(&pid("b"), &Filter::default(), &CancelToken::new())
            .await
            .unwrap_err();

        assert_eq!(err, FetchError::Rejected("bad filter".into()));
        assert_eq!(source.attempts(&pid("b")), 1);
    }

    #[tokio::test]
    async fn test_retry_backoff_observes_cancellation() {
        let source = Arc::new(InMemorySource::new().with_partition(
            "b",
            PartitionScript::Flaky {
                failures: 10,
                records: vec![],
            },
        ));
        let policy = RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(30),
            max_backoff: Duration::from_secs(30),
            max_jitter: Duration::ZERO,
        };
        let retrying = Arc::new(Retrying::new(source.clone(), policy));
        let cancel = CancelToken::new();

        let task = {
            let retrying = retrying.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                retrying
                    .fetch(&PartitionId::new("b"), &Filter::default(), &cancel)
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        let started = Instant::now();
        cancel.cancel();

        let result = task.await.unwrap();
        assert_eq!(result.unwrap_err(), FetchError::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(source.attempts(&pid("b")), 1);
    }

    #[tokio::test]
    async fn test_retry_wraps_lister() {
        let source = Arc::new(
            InMemorySource::new().with_list_failure(FetchError::Transient("throttled".into())),
        );
        let retrying = Retrying::new(source.clone(), RetryPolicy::immediate(3));

        let err = retrying.list(&pid("home")).await.unwrap_err();

        assert!(matches!(err, FetchError::Exhausted { attempts: 3, .. }));
        assert_eq!(source.list_calls(), 3);
    }

    #[tokio::test]
    async fn test_default_policy_backs_off_between_attempts() {
        let source = Arc::new(InMemorySource::new().with_partition(
            "a",
            PartitionScript::Flaky {
                failures: 1,
                records: vec![Record::new("i1", "a1")],
            },
        ));
        let retrying = Retrying::new(source.clone(), RetryPolicy::default());

        let started = Instant::now();
        retrying
            .fetch(&pid("a"), &Filter::default(), &CancelToken::new())
            .await
            .unwrap();

        // One backoff of at least the initial 150ms
        assert!(started.elapsed() >= Duration::from_millis(150));
        assert_eq!(retrying.policy().max_attempts, 3);
    }

    // ============================================================
    // HTTP URLS
    // ============================================================

    #[test]
    fn test_partition_id_is_one_encoded_segment() {
        let client = HttpSource::new("http://127.0.0.1:7000/", Duration::from_secs(1));

        let url = client.records_url(&pid("edge/zone?1#x")).unwrap();

        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:7000/partitions/edge%2Fzone%3F1%23x/records"
        );
    }

    #[test]
    fn test_home_is_query_encoded() {
        let client = HttpSource::new("http://127.0.0.1:7000/api", Duration::from_secs(1));

        let url = client.list_url(&pid("a b&c#d")).unwrap();

        assert_eq!(url.path(), "/api/partitions");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs, vec![("home".to_string(), "a b&c#d".to_string())]);
    }

    #[test]
    fn test_unusable_endpoint_is_rejected() {
        let client = HttpSource::new("not a url", Duration::from_secs(1));

        let err = client.records_url(&pid("a")).unwrap_err();

        assert!(!err.is_retryable());
        assert!(err.to_string().contains("invalid endpoint"));
    }

    // ============================================================
    // HTTP STATUS MAPPING
    // ============================================================

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND, "x".into()),
            FetchError::NotFound(_)
        ));
        assert!(classify_status(StatusCode::TOO_MANY_REQUESTS, "slow down".into()).is_retryable());
        assert!(classify_status(StatusCode::SERVICE_UNAVAILABLE, "busy".into()).is_retryable());
        assert!(!classify_status(StatusCode::BAD_REQUEST, "bad".into()).is_retryable());
        assert!(matches!(
            classify_status(StatusCode::UNPROCESSABLE_ENTITY, "denied".into()),
            FetchError::Rejected(_)
        ));
    }
}
