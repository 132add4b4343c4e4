mod common;

use common::FakeCluster;
use es_fluent::{is_not_found, EsError, Method};
use serde_json::json;

#[tokio::test]
async fn discovers_the_server_version() {
    let cluster = FakeCluster::new("6.8.23");
    let mut client = cluster.client();
    assert_eq!(client.server_major_version(), None);

    let info = client.server_info().await.unwrap();
    assert_eq!(info.get_name(), "fake");
    assert_eq!(info.get_version(), "6.8.23");

    let version = client.discover_version().await.unwrap();
    assert_eq!(version.major, 6);
    assert_eq!(client.server_major_version(), Some(6));
    assert_eq!(cluster.requests_to(Method::GET, "/"), 2);
}

#[tokio::test]
async fn clones_share_the_transport() {
    let cluster = FakeCluster::new("7.17.9");
    cluster.seed("tweets", 2);
    let client = cluster.client();
    let clone = client.clone();

    assert_eq!(client.count(["tweets"]).execute().await.unwrap(), 2);
    assert_eq!(clone.count(["tweets"]).execute().await.unwrap(), 2);
    assert_eq!(cluster.requests_to(Method::POST, "/tweets/_count"), 2);
}

#[tokio::test]
async fn count_with_query() {
    let cluster = FakeCluster::new("7.17.9");
    cluster.seed("tweets", 9);

    let count = cluster
        .client()
        .count(["tweets"])
        .query(json!({ "term": { "even": false } }))
        .execute()
        .await
        .unwrap();

    assert_eq!(count, 4);
}

#[tokio::test]
async fn count_of_missing_index_is_not_found() {
    let cluster = FakeCluster::new("7.17.9");

    let err = cluster.client().count(["nope"]).execute().await.unwrap_err();

    assert!(is_not_found(&err));
    assert!(!err.is_conflict());
    assert!(err.to_string().contains("index_not_found_exception"));
}

#[tokio::test]
async fn point_in_time_round_trip() {
    let cluster = FakeCluster::new("8.11.0");
    cluster.seed("tweets", 1);
    let client = cluster.client();

    let opened = client
        .open_point_in_time(["tweets"])
        .keep_alive("1m")
        .execute()
        .await
        .unwrap();
    assert_eq!(cluster.open_pits(), 1);
    assert_eq!(cluster.requests()[0].get_param("keep_alive"), Some("1m"));

    let closed = client.close_point_in_time(opened.id).execute().await.unwrap();
    assert!(closed.succeeded);
    assert_eq!(closed.num_freed, 1);
    assert_eq!(cluster.open_pits(), 0);
}

#[tokio::test]
async fn point_in_time_requires_index_and_keep_alive() {
    let cluster = FakeCluster::new("8.11.0");
    let client = cluster.client();

    let err = client.open_point_in_time(Vec::<String>::new()).keep_alive("1m").execute().await;
    assert!(matches!(err, Err(EsError::InvalidArgument(_))));
    let err = client.open_point_in_time(["tweets"]).execute().await;
    assert!(matches!(err, Err(EsError::InvalidArgument(_))));
    assert!(cluster.requests().is_empty());
}

#[tokio::test]
async fn clear_scroll_needs_an_id() {
    let cluster = FakeCluster::new("8.11.0");

    let err = cluster
        .client()
        .clear_scroll(Vec::<String>::new())
        .execute()
        .await
        .unwrap_err();

    assert!(matches!(err, EsError::InvalidArgument(_)));
}
