//! Membership cache integration tests
//!
//! Optimistic add/remove with rollback, duplicate checks, stale refresh
//! handling and change events.

use crate::common::{anonymous_client, config_builder, logged_in_client, MockCatalogServer, TEST_TOKEN};
use crate::{assert_err, assert_ok};
use assert_matches::assert_matches;
use cardkeep::client::{CardClient, Config, MembershipTarget, Session, SetPhase};
use cardkeep::shared::{
    CardId, ClientError, DuplicatePolicy, MembershipChangeKind, MembershipId, MembershipSet,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_wishlist_add_then_refresh_includes_card() {
    let server = MockCatalogServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/wishlist/add"))
        .and(header("Authorization", format!("Bearer {}", TEST_TOKEN).as_str()))
        .and(body_json(json!({"card_id": 42})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server.server)
        .await;
    server
        .membership_list(MembershipSet::Wishlist, json!([{"id": 1, "card_id": 42}]))
        .await;

    let client = logged_in_client(&server).await;
    let cache = client.membership();

    let record = assert_ok!(cache.add(MembershipSet::Wishlist, CardId(42)).await);
    assert_eq!(record.card_id, CardId(42));
    assert!(cache.contains(MembershipSet::Wishlist, CardId(42)).await);

    let records = assert_ok!(cache.refresh(MembershipSet::Wishlist).await);
    assert!(records.iter().any(|r| r.card_id == CardId(42)));
    assert_eq!(cache.phase(MembershipSet::Wishlist).await, SetPhase::Ready);
}

#[tokio::test]
async fn test_collection_add_twice_is_rejected() {
    let server = MockCatalogServer::start().await;
    // Empty before the insert, then the new entry
    server
        .get_json_once("/api/collection", json!([]))
        .await;
    server
        .membership_list(MembershipSet::Collection, json!([{"id": 9, "card_id": 7}]))
        .await;
    Mock::given(method("POST"))
        .and(path("/api/collection/add"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server.server)
        .await;

    let client = logged_in_client(&server).await;
    let cache = client.membership();

    let record = assert_ok!(cache.add(MembershipSet::Collection, CardId(7)).await);
    assert_eq!(record.membership_id, Some(MembershipId(9)));

    let err = cache.add(MembershipSet::Collection, CardId(7)).await.unwrap_err();
    assert_matches!(
        err,
        ClientError::AlreadyMember {
            set: MembershipSet::Collection,
            card_id: CardId(7)
        }
    );

    let records = cache.records(MembershipSet::Collection).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].membership_id, Some(MembershipId(9)));
}

#[tokio::test]
async fn test_collection_add_rejected_when_server_already_has_card() {
    let server = MockCatalogServer::start().await;
    server
        .membership_list(MembershipSet::Collection, json!([{"id": 3, "card_id": 7}]))
        .await;
    Mock::given(method("POST"))
        .and(path("/api/collection/add"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server.server)
        .await;

    let client = logged_in_client(&server).await;
    let cache = client.membership();

    assert_err!(
        cache.add(MembershipSet::Collection, CardId(7)).await,
        ClientError::AlreadyMember { .. }
    );
    assert!(cache.contains(MembershipSet::Collection, CardId(7)).await);
    // The whole set was loaded, so phase and count agree
    assert_eq!(cache.phase(MembershipSet::Collection).await, SetPhase::Ready);
    assert_eq!(cache.count(MembershipSet::Collection).await, 1);
}

#[tokio::test]
async fn test_wishlist_allows_duplicates_by_default() {
    let server = MockCatalogServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/wishlist/add"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server.server)
        .await;

    let client = logged_in_client(&server).await;
    let cache = client.membership();

    assert_ok!(cache.add(MembershipSet::Wishlist, CardId(5)).await);
    assert_ok!(cache.add(MembershipSet::Wishlist, CardId(5)).await);
    assert_eq!(cache.count(MembershipSet::Wishlist).await, 1);
}

#[tokio::test]
async fn test_wishlist_reject_policy_is_configurable() {
    let server = MockCatalogServer::start().await;
    server.membership_list(MembershipSet::Wishlist, json!([])).await;
    server.accept_add(MembershipSet::Wishlist).await;

    let config = Config::with_builder(
        config_builder(&server).duplicate_policy(MembershipSet::Wishlist, DuplicatePolicy::Reject),
    )
    .unwrap();
    let session = Session::new();
    session.set_credential(TEST_TOKEN).await.unwrap();
    let client = CardClient::with_session(config, session).unwrap();

    assert_ok!(client.membership().add(MembershipSet::Wishlist, CardId(5)).await);
    assert_err!(
        client.membership().add(MembershipSet::Wishlist, CardId(5)).await,
        ClientError::AlreadyMember { .. }
    );
}

#[tokio::test]
async fn test_failed_add_rolls_back() {
    let server = MockCatalogServer::start().await;
    server.status("POST", "/api/wishlist/add", 500).await;

    let client = logged_in_client(&server).await;
    let cache = client.membership();
    let mut events = cache.subscribe();

    assert_err!(
        cache.add(MembershipSet::Wishlist, CardId(42)).await,
        ClientError::Remote { status: 500, .. }
    );
    assert!(!cache.contains(MembershipSet::Wishlist, CardId(42)).await);
    assert_eq!(cache.pending_count().await, 0);

    let first = events.recv().await.unwrap();
    let second = events.recv().await.unwrap();
    assert_eq!(first.change, MembershipChangeKind::Added { card_id: CardId(42) });
    assert_eq!(second.change, MembershipChangeKind::RolledBack { card_id: CardId(42) });
}

#[tokio::test]
async fn test_failed_remove_restores_record() {
    let server = MockCatalogServer::start().await;
    server
        .membership_list(MembershipSet::Wishlist, json!([{"card_id": 5}, {"card_id": 6}]))
        .await;
    server.status("POST", "/api/wishlist/remove", 503).await;

    let client = logged_in_client(&server).await;
    let cache = client.membership();
    assert_ok!(cache.refresh(MembershipSet::Wishlist).await);

    assert_err!(
        cache.remove(MembershipSet::Wishlist, CardId(5)).await,
        ClientError::Remote { status: 503, .. }
    );
    assert!(cache.contains(MembershipSet::Wishlist, CardId(5)).await);
    assert_eq!(cache.count(MembershipSet::Wishlist).await, 2);
}

#[tokio::test]
async fn test_wishlist_remove_posts_card_id() {
    let server = MockCatalogServer::start().await;
    server
        .membership_list(MembershipSet::Wishlist, json!([{"card_id": 5}]))
        .await;
    Mock::given(method("POST"))
        .and(path("/api/wishlist/remove"))
        .and(body_json(json!({"card_id": 5})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server.server)
        .await;

    let client = logged_in_client(&server).await;
    let cache = client.membership();
    assert_ok!(cache.refresh(MembershipSet::Wishlist).await);

    assert_ok!(cache.remove(MembershipSet::Wishlist, CardId(5)).await);
    assert!(!cache.contains(MembershipSet::Wishlist, CardId(5)).await);
}

#[tokio::test]
async fn test_collection_remove_by_entry_id() {
    let server = MockCatalogServer::start().await;
    server
        .membership_list(MembershipSet::Collection, json!([{"id": 9, "card_id": 7}]))
        .await;
    Mock::given(method("POST"))
        .and(path("/api/collection/remove"))
        .and(body_json(json!({"id": 9})))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server.server)
        .await;

    let client = logged_in_client(&server).await;
    let cache = client.membership();
    assert_ok!(cache.refresh(MembershipSet::Collection).await);

    assert_ok!(cache.remove(MembershipSet::Collection, MembershipId(9)).await);
    assert!(!cache.contains(MembershipSet::Collection, CardId(7)).await);

    // Unknown locally: the entry id comes from the server list
    assert_ok!(
        cache
            .remove(MembershipSet::Collection, MembershipTarget::Card(CardId(7)))
            .await
    );
}

#[tokio::test]
async fn test_collection_remove_unknown_entry_is_not_found() {
    let server = MockCatalogServer::start().await;
    server.membership_list(MembershipSet::Collection, json!([])).await;
    Mock::given(method("POST"))
        .and(path("/api/collection/remove"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server.server)
        .await;

    let client = logged_in_client(&server).await;
    assert_err!(
        client
            .membership()
            .remove(MembershipSet::Collection, CardId(7))
            .await,
        ClientError::NotFound { .. }
    );
}

#[tokio::test]
async fn test_toggle_adds_then_removes() {
    let server = MockCatalogServer::start().await;
    server.accept_add(MembershipSet::Wishlist).await;
    server.accept_remove(MembershipSet::Wishlist).await;

    let client = logged_in_client(&server).await;
    let cache = client.membership();

    let change = assert_ok!(cache.toggle(MembershipSet::Wishlist, CardId(3)).await);
    assert!(change.member);
    assert!(change.record.is_some());

    let change = assert_ok!(cache.toggle(MembershipSet::Wishlist, CardId(3)).await);
    assert!(!change.member);
    assert!(!cache.contains(MembershipSet::Wishlist, CardId(3)).await);
}

#[tokio::test]
async fn test_protected_calls_send_nothing_without_credential() {
    let server = MockCatalogServer::start().await;
    let client = anonymous_client(&server);
    let cache = client.membership();

    assert_err!(cache.refresh(MembershipSet::Wishlist).await, ClientError::Unauthenticated);
    assert_err!(
        cache.add(MembershipSet::Collection, CardId(1)).await,
        ClientError::Unauthenticated
    );
    assert_err!(
        cache.remove(MembershipSet::Wishlist, CardId(1)).await,
        ClientError::Unauthenticated
    );
    assert_err!(
        cache.toggle(MembershipSet::Wishlist, CardId(1)).await,
        ClientError::Unauthenticated
    );

    assert_eq!(server.request_count().await, 0);
}

#[tokio::test]
async fn test_refresh_is_idempotent() {
    let server = MockCatalogServer::start().await;
    server
        .membership_list(MembershipSet::Collection, json!([{"id": 1, "card_id": 2}, {"id": 3, "card_id": 4}]))
        .await;

    let client = logged_in_client(&server).await;
    let cache = client.membership();

    let first = assert_ok!(cache.refresh(MembershipSet::Collection).await);
    let second = assert_ok!(cache.refresh(MembershipSet::Collection).await);
    assert_eq!(first, second);
    assert_eq!(cache.records(MembershipSet::Collection).await, second);
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_snapshot() {
    let server = MockCatalogServer::start().await;
    server
        .get_json_once("/api/wishlist", json!([{"card_id": 8}]))
        .await;
    server.status("GET", "/api/wishlist", 500).await;

    let client = logged_in_client(&server).await;
    let cache = client.membership();

    assert_ok!(cache.refresh(MembershipSet::Wishlist).await);
    assert_err!(
        cache.refresh(MembershipSet::Wishlist).await,
        ClientError::Remote { status: 500, .. }
    );
    assert_eq!(cache.phase(MembershipSet::Wishlist).await, SetPhase::Ready);
    assert!(cache.contains(MembershipSet::Wishlist, CardId(8)).await);
}

#[tokio::test]
async fn test_malformed_membership_list() {
    let server = MockCatalogServer::start().await;
    server
        .membership_list(MembershipSet::Wishlist, json!({"unexpected": true}))
        .await;

    let client = logged_in_client(&server).await;
    assert_err!(
        client.membership().refresh(MembershipSet::Wishlist).await,
        ClientError::MalformedResponse { .. }
    );
}

#[tokio::test]
async fn test_closed_scope_discards_refresh() {
    let server = MockCatalogServer::start().await;
    server
        .get_json_delayed_once(
            "/api/wishlist",
            json!([{"card_id": 1}]),
            Duration::from_millis(200),
        )
        .await;

    let client = logged_in_client(&server).await;
    let cache = client.membership().clone();
    let scope = cache.scope();
    let token = scope.token();

    let pending = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.refresh_in(&token, MembershipSet::Wishlist).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(cache.phase(MembershipSet::Wishlist).await, SetPhase::Loading);
    drop(scope);

    let result = pending.await.unwrap();
    assert_err!(result, ClientError::Cancelled);
    assert!(!cache.contains(MembershipSet::Wishlist, CardId(1)).await);
    assert_eq!(cache.phase(MembershipSet::Wishlist).await, SetPhase::Empty);
}

#[tokio::test]
async fn test_superseded_refresh_is_discarded() {
    let server = MockCatalogServer::start().await;
    server
        .get_json_delayed_once(
            "/api/wishlist",
            json!([{"card_id": 1}]),
            Duration::from_millis(300),
        )
        .await;
    server
        .membership_list(MembershipSet::Wishlist, json!([{"card_id": 2}]))
        .await;

    let client = logged_in_client(&server).await;
    let cache = client.membership().clone();

    let slow = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.refresh(MembershipSet::Wishlist).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let fresh = assert_ok!(cache.refresh(MembershipSet::Wishlist).await);
    assert_eq!(fresh.len(), 1);
    assert_eq!(fresh[0].card_id, CardId(2));

    assert_err!(slow.await.unwrap(), ClientError::Cancelled);
    let cards: Vec<CardId> = cache
        .records(MembershipSet::Wishlist)
        .await
        .into_iter()
        .map(|r| r.card_id)
        .collect();
    assert_eq!(cards, vec![CardId(2)]);
}

#[tokio::test]
async fn test_pending_add_survives_refresh() {
    let server = MockCatalogServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/wishlist/add"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(300)))
        .mount(&server.server)
        .await;
    server.membership_list(MembershipSet::Wishlist, json!([])).await;

    let client = logged_in_client(&server).await;
    let cache = client.membership().clone();

    let adding = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.add(MembershipSet::Wishlist, CardId(11)).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The server does not know the card yet; the optimistic insert stays
    let records = assert_ok!(cache.refresh(MembershipSet::Wishlist).await);
    assert!(records.iter().any(|r| r.card_id == CardId(11)));
    assert_eq!(cache.pending_count().await, 1);

    assert_ok!(adding.await.unwrap());
    assert_eq!(cache.pending_count().await, 0);
    assert!(cache.contains(MembershipSet::Wishlist, CardId(11)).await);
}

#[tokio::test]
async fn test_same_card_mutations_are_serialized() {
    let server = MockCatalogServer::start().await;
    server.membership_list(MembershipSet::Collection, json!([])).await;
    Mock::given(method("POST"))
        .and(path("/api/collection/add"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(100)))
        .expect(1)
        .mount(&server.server)
        .await;

    let client = logged_in_client(&server).await;
    let cache = client.membership().clone();

    let (a, b) = tokio::join!(
        cache.add(MembershipSet::Collection, CardId(7)),
        cache.add(MembershipSet::Collection, CardId(7)),
    );
    let failures = [a.is_err(), b.is_err()].iter().filter(|e| **e).count();
    assert_eq!(failures, 1);
    assert_eq!(cache.count(MembershipSet::Collection).await, 1);
}

#[tokio::test]
async fn test_events_follow_confirmed_add() {
    let server = MockCatalogServer::start().await;
    server.accept_add(MembershipSet::Wishlist).await;

    let client = logged_in_client(&server).await;
    let cache = client.membership();
    let mut events = cache.subscribe();

    assert_ok!(cache.add(MembershipSet::Wishlist, CardId(42)).await);

    let added = events.recv().await.unwrap();
    let confirmed = events.recv().await.unwrap();
    assert_eq!(added.set, Some(MembershipSet::Wishlist));
    assert_eq!(added.change, MembershipChangeKind::Added { card_id: CardId(42) });
    assert_eq!(confirmed.change, MembershipChangeKind::Confirmed { card_id: CardId(42) });
}

#[tokio::test]
async fn test_duplicate_add_emits_no_added_event() {
    let server = MockCatalogServer::start().await;
    server.accept_add(MembershipSet::Wishlist).await;

    let client = logged_in_client(&server).await;
    let cache = client.membership();
    assert_ok!(cache.add(MembershipSet::Wishlist, CardId(5)).await);

    let mut events = cache.subscribe();
    assert_ok!(cache.add(MembershipSet::Wishlist, CardId(5)).await);

    let event = events.recv().await.unwrap();
    assert_eq!(event.change, MembershipChangeKind::Confirmed { card_id: CardId(5) });
}

#[tokio::test]
async fn test_confirmed_add_survives_older_refresh() {
    let server = MockCatalogServer::start().await;
    server
        .get_json_delayed_once("/api/wishlist", json!([]), Duration::from_millis(400))
        .await;
    Mock::given(method("POST"))
        .and(path("/api/wishlist/add"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(50)))
        .expect(1)
        .mount(&server.server)
        .await;

    let client = logged_in_client(&server).await;
    let cache = client.membership().clone();

    let refreshing = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.refresh(MembershipSet::Wishlist).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_ok!(cache.add(MembershipSet::Wishlist, CardId(42)).await);
    assert_eq!(cache.pending_count().await, 0);

    // The list was requested before the add reached the server
    let records = assert_ok!(refreshing.await.unwrap());
    assert!(records.iter().any(|r| r.card_id == CardId(42)));
    assert!(cache.contains(MembershipSet::Wishlist, CardId(42)).await);
    assert_eq!(cache.phase(MembershipSet::Wishlist).await, SetPhase::Ready);
}

#[tokio::test]
async fn test_confirmed_remove_survives_older_refresh() {
    let server = MockCatalogServer::start().await;
    server
        .get_json_delayed_once(
            "/api/wishlist",
            json!([{"card_id": 5}, {"card_id": 6}]),
            Duration::from_millis(400),
        )
        .await;
    Mock::given(method("POST"))
        .and(path("/api/wishlist/remove"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(50)))
        .expect(1)
        .mount(&server.server)
        .await;

    let client = logged_in_client(&server).await;
    let cache = client.membership().clone();

    let refreshing = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.refresh(MembershipSet::Wishlist).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_ok!(cache.remove(MembershipSet::Wishlist, CardId(5)).await);

    let records = assert_ok!(refreshing.await.unwrap());
    let cards: Vec<CardId> = records.iter().map(|r| r.card_id).collect();
    assert_eq!(cards, vec![CardId(6)]);
    assert!(!cache.contains(MembershipSet::Wishlist, CardId(5)).await);
}
