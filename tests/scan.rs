mod common;

use common::FakeCluster;
use es_fluent::{EndOfStream, EsError, Page, ScanCursor};
use serde_json::json;

async fn page_sizes(cursor: &mut ScanCursor) -> (Vec<usize>, EndOfStream) {
    let mut sizes = Vec::new();
    loop {
        match cursor.next().await.unwrap() {
            Page::Hits(page) => sizes.push(page.len()),
            Page::Exhausted(end) => return (sizes, end),
        }
    }
}

#[tokio::test]
async fn empty_index_yields_one_empty_page_then_eos() {
    let cluster = FakeCluster::new("7.17.9");
    cluster.create_index("tweets");
    let mut client = cluster.client();
    client.discover_version().await.unwrap();

    let mut cursor = client.scan(["tweets"]).execute().await.unwrap();
    assert_eq!(cursor.total_hits(), 0);

    match cursor.next().await.unwrap() {
        Page::Hits(page) => assert!(page.is_empty()),
        Page::Exhausted(_) => panic!("expected an empty page first"),
    }
    assert!(matches!(
        cursor.next().await.unwrap(),
        Page::Exhausted(EndOfStream::Eos)
    ));
    assert!(matches!(
        cursor.next().await.unwrap(),
        Page::Exhausted(EndOfStream::Eos)
    ));
}

#[tokio::test]
async fn modern_cluster_sorts_by_doc_and_returns_the_opening_hits() {
    let cluster = FakeCluster::new("7.17.9");
    cluster.seed("tweets", 5);
    let mut client = cluster.client();
    client.discover_version().await.unwrap();

    let mut cursor = client.scan(["tweets"]).size(2).execute().await.unwrap();
    assert_eq!(cursor.total_hits(), 5);

    let (sizes, end) = page_sizes(&mut cursor).await;

    assert_eq!(sizes, vec![2, 2, 1]);
    assert_eq!(end, EndOfStream::Eos);
    assert_eq!(cursor.current_page(), 4);
    let opening = &cluster.requests()[1];
    assert_eq!(opening.get_param("search_type"), None);
    assert!(opening.body.as_ref().unwrap().as_str().contains("\"_doc\""));
}

#[tokio::test]
async fn legacy_cluster_uses_search_type_scan() {
    let cluster = FakeCluster::new("1.7.5");
    cluster.seed("tweets", 3);
    let mut client = cluster.client();
    assert_eq!(client.discover_version().await.unwrap().major, 1);

    let mut cursor = client.scan(["tweets"]).size(1).execute().await.unwrap();
    assert_eq!(cursor.total_hits(), 3);

    let (sizes, end) = page_sizes(&mut cursor).await;

    assert_eq!(sizes, vec![1, 1, 1]);
    assert_eq!(end, EndOfStream::Eos);
    let opening = &cluster.requests()[1];
    assert_eq!(opening.get_param("search_type"), Some("scan"));
}

#[tokio::test]
async fn query_is_applied() {
    let cluster = FakeCluster::new("7.17.9");
    cluster.seed("tweets", 7);
    let client = cluster.client();

    let mut cursor = client
        .scan(["tweets"])
        .query(json!({ "term": { "even": true } }))
        .size(10)
        .execute()
        .await
        .unwrap();

    let page = cursor.next().await.unwrap().into_result().unwrap();
    assert_eq!(page.len(), 4);
    assert_eq!(cursor.total_hits(), 4);
    assert!(cursor.next().await.unwrap().is_exhausted());
}

#[tokio::test]
async fn cleared_cursor_fails() {
    let cluster = FakeCluster::new("7.17.9");
    cluster.seed("tweets", 4);
    let client = cluster.client();

    let mut cursor = client.scan(["tweets"]).size(1).execute().await.unwrap();
    assert!(!cursor.next().await.unwrap().is_exhausted());

    cursor.clear().await.unwrap();

    assert_eq!(cluster.open_scrolls(), 0);
    assert!(matches!(cursor.next().await, Err(EsError::ScrollCleared)));
    assert!(matches!(cursor.clear().await, Err(EsError::ScrollCleared)));
}

#[tokio::test]
async fn failed_clear_keeps_the_context_for_another_try() {
    let cluster = FakeCluster::new("7.17.9").failing_clears(1);
    cluster.seed("tweets", 4);
    let client = cluster.client();

    let mut cursor = client.scan(["tweets"]).size(1).execute().await.unwrap();
    assert!(!cursor.next().await.unwrap().is_exhausted());

    assert!(matches!(cursor.clear().await, Err(EsError::Connection(_))));
    assert!(cursor.scroll_id().is_some());
    assert_eq!(cluster.open_scrolls(), 1);

    cursor.clear().await.unwrap();

    assert_eq!(cluster.open_scrolls(), 0);
    assert!(matches!(cursor.next().await, Err(EsError::ScrollCleared)));
}
