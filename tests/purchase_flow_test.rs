mod common;

use billing_bridge::application::adapter::AdapterConfig;
use billing_bridge::domain::event::BillingEvent;
use billing_bridge::domain::ports::EntitlementStore;
use billing_bridge::domain::purchase::{Purchase, PurchaseState};
use billing_bridge::domain::response::{BillingResult, ResponseCode};
use common::{Harness, Outcome, RecordingListener};

fn strings(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

#[tokio::test]
async fn test_purchase_launches_after_connection() {
    let mut h = Harness::new();
    let listener = RecordingListener::new();

    h.adapter.initiate_purchase("coins_100", listener.clone()).await;
    assert_eq!(h.client.calls(), vec!["start_connection"]);

    h.connect().await;
    assert_eq!(
        h.client.calls(),
        vec![
            "start_connection",
            "query_product_details:coins_100",
            "launch:coins_100"
        ]
    );
    assert!(!h.adapter.is_idle());

    h.purchases_updated(
        ResponseCode::Ok,
        Some(vec![Purchase::new("coins_100", "tok-100")]),
    )
    .await;

    assert_eq!(
        listener.outcomes(),
        vec![Outcome::Loaded(1), Outcome::Bought("coins_100".to_string())]
    );
    assert_eq!(h.store.get("coins_100").await.unwrap().verdict(), Some(true));
    assert_eq!(h.client.count("acknowledge:tok-100"), 1);
    assert!(h.adapter.is_idle());
}

#[tokio::test]
async fn test_catalog_metadata_is_fetched_once() {
    let mut h = Harness::with_config(AdapterConfig {
        catalog: strings(&["coins_100", "gems", "ad_free"]),
        ..AdapterConfig::default()
    });
    let listener = RecordingListener::new();

    h.adapter.initiate_purchase("coins_100", listener.clone()).await;
    h.connect().await;
    h.purchases_updated(ResponseCode::UserCanceled, None).await;

    h.adapter.initiate_purchase("gems", listener.clone()).await;

    assert_eq!(
        h.client.calls(),
        vec![
            "start_connection",
            "query_product_details:coins_100,gems,ad_free",
            "launch:coins_100",
            "launch:gems"
        ]
    );
}

#[tokio::test]
async fn test_unknown_product_is_unavailable() {
    let mut h = Harness::new();
    h.client.with(|s| s.known_products = Some(Vec::new()));
    let listener = RecordingListener::new();

    h.adapter.initiate_purchase("coins_100", listener.clone()).await;
    h.connect().await;

    assert_eq!(
        listener.outcomes(),
        vec![Outcome::Error(ResponseCode::ItemUnavailable)]
    );
    assert_eq!(h.client.count("launch:coins_100"), 0);
    assert!(h.adapter.is_idle());
}

#[tokio::test]
async fn test_metadata_and_launch_failures_are_reported() {
    let mut h = Harness::new();
    h.client
        .with(|s| s.details_result = BillingResult::from_code(ResponseCode::BillingUnavailable));
    let listener = RecordingListener::new();

    h.adapter.initiate_purchase("coins_100", listener.clone()).await;
    h.connect().await;

    h.client.with(|s| {
        s.details_result = BillingResult::ok();
        s.launch_result = BillingResult::new(5, "bad params");
    });
    h.adapter.initiate_purchase("coins_100", listener.clone()).await;

    assert_eq!(
        listener.outcomes(),
        vec![
            Outcome::Error(ResponseCode::BillingUnavailable),
            Outcome::Error(ResponseCode::DeveloperError),
        ]
    );
    assert!(h.adapter.is_idle());
}

#[tokio::test]
async fn test_second_purchase_is_rejected_while_one_is_outstanding() {
    let mut h = Harness::new();
    let first = RecordingListener::new();
    let second = RecordingListener::new();

    h.adapter.initiate_purchase("coins_100", first.clone()).await;
    h.adapter.initiate_purchase("gems", second.clone()).await;
    assert_eq!(second.outcomes(), vec![Outcome::Error(ResponseCode::Error)]);
    assert_eq!(h.adapter.pending_len(), 1);

    h.connect().await;
    h.adapter.initiate_purchase("gems", second.clone()).await;
    assert_eq!(second.outcomes().len(), 2);
    assert_eq!(h.client.count("launch:gems"), 0);

    h.purchases_updated(
        ResponseCode::Ok,
        Some(vec![Purchase::new("coins_100", "tok-100")]),
    )
    .await;
    h.adapter.initiate_purchase("gems", second.clone()).await;
    assert_eq!(h.client.count("launch:gems"), 1);
}

#[tokio::test]
async fn test_purchase_update_outcomes() {
    let mut h = Harness::new();
    let listener = RecordingListener::new();

    h.adapter.initiate_purchase("coins_100", listener.clone()).await;
    h.connect().await;
    h.purchases_updated(ResponseCode::UserCanceled, None).await;

    h.adapter.initiate_purchase("coins_100", listener.clone()).await;
    h.purchases_updated(ResponseCode::Ok, None).await;

    assert_eq!(
        listener.outcomes(),
        vec![
            Outcome::Error(ResponseCode::UserCanceled),
            Outcome::NotBought(Some("coins_100".to_string())),
        ]
    );
    // Negative purchase-flow results are not cached.
    assert!(!h.store.was_checked("coins_100").await.unwrap());
}

#[tokio::test]
async fn test_already_owned_counts_as_bought() {
    let mut h = Harness::new();
    let listener = RecordingListener::new();

    h.adapter.initiate_purchase("ad_free", listener.clone()).await;
    h.connect().await;
    h.purchases_updated(ResponseCode::ItemAlreadyOwned, None).await;

    assert_eq!(listener.outcomes(), vec![Outcome::Bought("ad_free".to_string())]);
    assert_eq!(h.store.get("ad_free").await.unwrap().verdict(), Some(true));
}

#[tokio::test]
async fn test_update_for_other_products_is_not_a_purchase() {
    let mut h = Harness::new();
    let listener = RecordingListener::new();
    let mut pending = Purchase::new("coins_100", "tok-100");
    pending.state = PurchaseState::Pending;

    h.adapter.initiate_purchase("coins_100", listener.clone()).await;
    h.connect().await;
    h.purchases_updated(
        ResponseCode::Ok,
        Some(vec![pending, Purchase::new("gems", "tok-gems")]),
    )
    .await;

    assert_eq!(
        listener.outcomes(),
        vec![
            Outcome::Loaded(2),
            Outcome::NotBought(Some("coins_100".to_string())),
        ]
    );
    assert!(h.store.is_bought("gems").await.unwrap());
    assert!(!h.store.is_bought("coins_100").await.unwrap());
    assert_eq!(h.client.count("acknowledge:tok-gems"), 1);
    assert_eq!(h.client.count("acknowledge:tok-100"), 0);
}

#[tokio::test]
async fn test_unsolicited_update_is_cached_silently() {
    let mut h = Harness::new();
    let listener = RecordingListener::new();

    // Arrives before the queued flow was launched, so it cannot be its answer.
    h.adapter.initiate_purchase("coins_100", listener.clone()).await;
    h.purchases_updated(ResponseCode::Ok, Some(vec![Purchase::new("gems", "tok-gems")]))
        .await;

    assert!(listener.outcomes().is_empty());
    assert!(h.store.is_bought("gems").await.unwrap());
    assert_eq!(h.client.count("acknowledge:tok-gems"), 1);

    h.connect().await;
    assert_eq!(h.client.count("launch:coins_100"), 1);
}

#[tokio::test]
async fn test_disconnect_fails_launched_purchase() {
    let mut h = Harness::new();
    let listener = RecordingListener::new();

    h.adapter.initiate_purchase("coins_100", listener.clone()).await;
    h.connect().await;
    h.adapter.handle_event(BillingEvent::ServiceDisconnected).await;

    assert_eq!(
        listener.outcomes(),
        vec![Outcome::Error(ResponseCode::ServiceDisconnected)]
    );
    assert!(h.adapter.is_idle());

    // A late answer is treated as unsolicited.
    h.purchases_updated(
        ResponseCode::Ok,
        Some(vec![Purchase::new("coins_100", "tok-100")]),
    )
    .await;
    assert_eq!(listener.outcomes().len(), 1);
    assert!(h.store.is_bought("coins_100").await.unwrap());
}
