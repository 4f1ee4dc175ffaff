//! The full storefront router, driven in-process.
//!
//! Sessions live in memory and the hosted backend is a mock server, so these
//! tests exercise routing, extractors, templates, and middleware together.

#![allow(clippy::unwrap_used)]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bazaar_integration_tests::{product_row, test_app};

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// `name=value` of the session cookie set on `response`.
fn session_cookie(response: &Response) -> String {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("bazaar_session="))
        .and_then(|v| v.split(';').next())
        .unwrap()
        .to_string()
}

async fn get(app: &Router, uri: &str) -> Response {
    app.clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_health_and_response_headers() {
    let server = MockServer::start().await;
    let app = test_app(&server);

    let response = app
        .oneshot(
            Request::get("/health")
                .header("x-request-id", "req-abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-abc-123");
    assert_eq!(response.headers()["x-frame-options"], "DENY");
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn test_readiness_fails_without_session_database() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/rest/v1/product_master"))
        .respond_with(ResponseTemplate::new(200).insert_header("Content-Range", "*/8"))
        .expect(1)
        .mount(&server)
        .await;

    let app = test_app(&server);
    let response = get(&app, "/health/ready").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_guest_is_sent_to_sign_in_with_return_path() {
    let server = MockServer::start().await;
    let app = test_app(&server);

    let response = get(&app, "/orders").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/signin?redirect=%2Forders");

    let response = get(&app, "/wishlist").await;
    assert_eq!(location(&response), "/auth/signin?redirect=%2Fwishlist");
}

#[tokio::test]
async fn test_admin_panel_requires_sign_in() {
    let server = MockServer::start().await;
    let app = test_app(&server);

    let response = get(&app, "/admin").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("/auth/signin?redirect="));
}

#[tokio::test]
async fn test_profile_api_rejects_guests_with_401() {
    let server = MockServer::start().await;
    let app = test_app(&server);

    let body = json!({
        "userId": "5b0c6a8e-2f4d-4c1e-9a7b-3d2e1f0a9b8c",
        "name": "Ada",
        "email": "ada@example.com",
    });
    let response = app
        .oneshot(
            Request::post("/api/create-user-profile")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_product_listing_renders_catalog_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/product_master"))
        .and(query_param("select", "*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            product_row(1, "Premium Laptop", 999.99, 15),
            product_row(2, "Casual T-Shirt", 29.99, 50),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/product_master"))
        .and(query_param("select", "product_type"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "product_type": "Electronics" },
            { "product_type": "Clothing" },
            { "product_type": "Electronics" },
        ])))
        .mount(&server)
        .await;

    let app = test_app(&server);
    let response = get(&app, "/products").await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("Premium Laptop"));
    assert!(html.contains("$999.99"));
    assert!(html.contains("Casual T-Shirt"));
    assert!(html.contains("Clothing"));
}

#[tokio::test]
async fn test_missing_product_is_404() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/product_master"))
        .and(query_param("product_no", "eq.404"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let app = test_app(&server);
    let response = get(&app, "/products/404").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_guest_cart_survives_between_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/product_master"))
        .and(query_param("product_no", "eq.3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([product_row(
            3,
            "Running Shoes",
            129.99,
            8
        )])))
        .mount(&server)
        .await;

    let app = test_app(&server);
    let response = app
        .clone()
        .oneshot(
            Request::post("/cart/add")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("product_no=3&quantity=2&return_to=%2Fproducts%2F3"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/products/3");
    let cookie = session_cookie(&response);

    let response = app
        .oneshot(
            Request::get("/cart")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("Running Shoes"));
    assert!(html.contains("$259.98"));
    assert!(html.contains("Running Shoes added to your cart"));
}

#[tokio::test]
async fn test_out_of_stock_product_is_not_added() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/product_master"))
        .and(query_param("product_no", "eq.5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([product_row(
            5,
            "Sold Out Lamp",
            49.00,
            0
        )])))
        .mount(&server)
        .await;

    let app = test_app(&server);
    let response = app
        .clone()
        .oneshot(
            Request::post("/cart/add")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("product_no=5"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/cart");
    let cookie = session_cookie(&response);

    let response = app
        .oneshot(
            Request::get("/cart")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let html = body_text(response).await;
    assert!(html.contains("out of stock"));
    assert!(!html.contains("Sold Out Lamp"));
}
