mod common;

use common::FakeCluster;
use es_fluent::{BulkDeleteRequest, BulkIndexRequest, BulkUpdateRequest, EsError, Method};
use serde_json::json;

#[tokio::test]
async fn execute_indexes_and_resets_the_queue() {
    let cluster = FakeCluster::new("7.17.9");
    let mut bulk = cluster.client().bulk();
    for i in 1..=3 {
        bulk.add(
            BulkIndexRequest::new()
                .index("tweets")
                .id(i.to_string())
                .doc(json!({ "user": "olivere", "n": i })),
        );
    }

    let response = bulk.execute().await.unwrap();

    assert!(!response.errors);
    assert_eq!(response.items.len(), 3);
    assert_eq!(response.indexed().len(), 3);
    assert!(response.failed().is_empty());
    assert_eq!(bulk.number_of_actions(), 0);
    assert_eq!(cluster.doc_count("tweets"), 3);
    assert_eq!(cluster.get("tweets", "2"), Some(json!({ "user": "olivere", "n": 2 })));
}

#[tokio::test]
async fn one_conflict_is_an_item_failure_not_an_error() {
    let cluster = FakeCluster::new("7.17.9");
    cluster.put("tweets", "2", json!({ "user": "sandrae" }));

    let mut bulk = cluster.client().bulk();
    for i in 1..=3 {
        bulk.add(
            BulkIndexRequest::new()
                .op_type("create")
                .index("tweets")
                .id(i.to_string())
                .doc(json!({ "n": i })),
        );
    }

    let response = bulk.execute().await.unwrap();

    assert!(response.errors);
    assert_eq!(response.succeeded().len(), 2);
    let failed = response.failed();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].id, "2");
    assert_eq!(failed[0].status, 409);
    assert_eq!(
        failed[0].error.as_ref().unwrap().error_type.as_deref(),
        Some("version_conflict_engine_exception")
    );
    assert_eq!(response.created().len(), 3);
    assert_eq!(cluster.get("tweets", "2"), Some(json!({ "user": "sandrae" })));
}

#[tokio::test]
async fn empty_queue_is_rejected_without_a_request() {
    let cluster = FakeCluster::new("7.17.9");
    let mut bulk = cluster.client().bulk();

    let err = bulk.execute().await.unwrap_err();

    assert!(matches!(err, EsError::NoBulkActions));
    assert!(cluster.requests().is_empty());
}

#[tokio::test]
async fn failed_call_keeps_the_queue_for_a_retry() {
    let cluster = FakeCluster::new("7.17.9").failing_bulk_call(1);
    let mut bulk = cluster.client().bulk();
    bulk.add(BulkIndexRequest::new().index("tweets").id("1").doc(json!({ "n": 1 })));
    bulk.add(BulkIndexRequest::new().index("tweets").id("2").doc(json!({ "n": 2 })));

    let err = bulk.execute().await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(bulk.number_of_actions(), 2);
    assert_eq!(cluster.doc_count("tweets"), 0);

    let response = bulk.execute().await.unwrap();
    assert_eq!(response.succeeded().len(), 2);
    assert_eq!(bulk.number_of_actions(), 0);
    assert_eq!(cluster.doc_count("tweets"), 2);
}

#[tokio::test]
async fn mixed_actions_report_per_action_outcomes() {
    let cluster = FakeCluster::new("7.17.9");
    cluster.put("tweets", "1", json!({ "user": "olivere", "retweets": 0 }));
    cluster.put("tweets", "2", json!({ "user": "sandrae" }));

    let mut bulk = cluster.client().bulk().index("tweets");
    bulk.add(BulkUpdateRequest::new().id("1").doc(json!({ "retweets": 42 })))
        .add(BulkDeleteRequest::new().id("2"))
        .add(BulkUpdateRequest::new().id("3").doc(json!({ "user": "new" })).doc_as_upsert(true))
        .add(BulkUpdateRequest::new().id("4").doc(json!({ "user": "ghost" })));

    let response = bulk.execute().await.unwrap();

    assert_eq!(cluster.requests_to(Method::POST, "/tweets/_bulk"), 1);
    assert_eq!(response.updated().len(), 3);
    assert_eq!(response.deleted().len(), 1);
    assert_eq!(response.by_id("4")[0].status, 404);
    assert_eq!(response.failed().len(), 1);
    assert_eq!(
        cluster.get("tweets", "1"),
        Some(json!({ "user": "olivere", "retweets": 42 }))
    );
    assert_eq!(cluster.get("tweets", "2"), None);
    assert_eq!(cluster.get("tweets", "3"), Some(json!({ "user": "new" })));
}

#[tokio::test]
async fn request_parameters_are_sent() {
    let cluster = FakeCluster::new("7.17.9");
    let mut bulk = cluster
        .client()
        .bulk()
        .refresh("wait_for")
        .timeout("30s")
        .with(BulkIndexRequest::new().index("tweets").id("1").doc(json!({})));

    bulk.execute().await.unwrap();

    let requests = cluster.requests();
    assert_eq!(requests[0].path, "/_bulk");
    assert_eq!(requests[0].get_param("refresh"), Some("wait_for"));
    assert_eq!(requests[0].get_param("timeout"), Some("30s"));
    assert_eq!(
        requests[0].body.as_ref().unwrap().content_type(),
        "application/x-ndjson"
    );
}

#[tokio::test]
async fn oversized_reply_fails_the_call() {
    let cluster = FakeCluster::new("7.17.9");
    let mut bulk = cluster
        .client()
        .bulk()
        .max_response_size(16)
        .with(BulkIndexRequest::new().index("tweets").id("1").doc(json!({ "n": 1 })));

    let err = bulk.execute().await.unwrap_err();

    assert!(matches!(err, EsError::ResponseTooLarge { limit: 16, .. }));
    assert_eq!(bulk.number_of_actions(), 1);
}
