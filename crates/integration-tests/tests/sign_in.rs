//! Password sign-in and guest cart merging against mock auth and REST APIs.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use serde_json::json;
use tower_sessions::{MemoryStore, Session};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bazaar_core::{Cart, Price, ProductNo, ProductSnapshot, UserId};
use bazaar_integration_tests::backend_client;
use bazaar_storefront::models::{CurrentUser, session_keys};
use bazaar_storefront::services::cart::cart_count;
use bazaar_storefront::services::{AuthError, AuthService, CartError};

fn memory_session() -> Session {
    Session::new(None, Arc::new(MemoryStore::default()), None)
}

fn snapshot(no: i64, name: &str, cents: i64) -> ProductSnapshot {
    ProductSnapshot {
        product_no: ProductNo::new(no),
        p_description: name.to_string(),
        product_price: Price::from_cents(cents),
        product_image: None,
    }
}

/// Guest picked two laptops and a pair of shoes before signing in.
async fn session_with_guest_cart() -> Session {
    let session = memory_session();
    let mut cart = Cart::new();
    cart.add(snapshot(1, "Premium Laptop", 99_999), 2);
    cart.add(snapshot(3, "Running Shoes", 12_999), 1);
    session.insert(session_keys::GUEST_CART, &cart).await.unwrap();
    session
}

/// Auth API accepts the password; the profile already holds one laptop.
async fn mount_existing_account(server: &MockServer, user_id: UserId) {
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "user-token",
            "refresh_token": "refresh-token",
            "expires_in": 3600,
            "user": { "id": user_id.to_string(), "email": "ada@example.com" },
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/app_user"))
        .and(query_param("user_id", format!("eq.{user_id}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "user_id": user_id.to_string(),
            "user_name": "Ada",
            "user_email": "ada@example.com",
            "user_cart": [{
                "product_no": 1,
                "p_description": "Premium Laptop",
                "product_price": 999.99,
                "quantity": 1,
            }],
            "user_wish_list": null,
            "user_role": "customer",
        }])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_sign_in_merges_guest_cart_into_profile() {
    let server = MockServer::start().await;
    let user_id = UserId::generate();
    mount_existing_account(&server, user_id).await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/app_user"))
        .and(query_param("user_id", format!("eq.{user_id}").as_str()))
        .and(body_partial_json(json!({
            "user_cart": [
                { "product_no": 1, "quantity": 3 },
                { "product_no": 3, "quantity": 1 },
            ],
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "user_id": user_id.to_string() }])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = backend_client(&server);
    let session = session_with_guest_cart().await;
    let user = AuthService::new(&client)
        .sign_in(&session, "ada@example.com", "correct horse")
        .await
        .unwrap();

    assert_eq!(user.id, user_id);
    let stored: Option<CurrentUser> = session.get(session_keys::CURRENT_USER).await.unwrap();
    assert_eq!(stored.map(|u| u.id), Some(user_id));
    let guest: Option<Cart> = session.get(session_keys::GUEST_CART).await.unwrap();
    assert!(guest.is_none());
    assert_eq!(cart_count(&session).await, 4);
}

#[tokio::test]
async fn test_failed_merge_leaves_visitor_signed_out_with_cart() {
    let server = MockServer::start().await;
    let user_id = UserId::generate();
    mount_existing_account(&server, user_id).await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/app_user"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(1)
        .mount(&server)
        .await;

    let client = backend_client(&server);
    let session = session_with_guest_cart().await;
    let err = AuthService::new(&client)
        .sign_in(&session, "ada@example.com", "correct horse")
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::Cart(CartError::Backend(_))));
    let stored: Option<CurrentUser> = session.get(session_keys::CURRENT_USER).await.unwrap();
    assert!(stored.is_none());
    let guest: Cart = session
        .get(session_keys::GUEST_CART)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(guest.item_count(), 3);
}

#[tokio::test]
async fn test_sign_in_without_guest_cart_writes_nothing() {
    let server = MockServer::start().await;
    let user_id = UserId::generate();
    mount_existing_account(&server, user_id).await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let client = backend_client(&server);
    let session = memory_session();
    AuthService::new(&client)
        .sign_in(&session, "ada@example.com", "correct horse")
        .await
        .unwrap();

    assert_eq!(cart_count(&session).await, 1);
}

#[tokio::test]
async fn test_wrong_password_is_invalid_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials",
        })))
        .mount(&server)
        .await;

    let client = backend_client(&server);
    let session = session_with_guest_cart().await;
    let err = AuthService::new(&client)
        .sign_in(&session, "ada@example.com", "wrong")
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::InvalidCredentials));
    assert_eq!(server.received_requests().await.unwrap_or_default().len(), 1);
}
