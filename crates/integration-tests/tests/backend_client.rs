//! Backend client against a mock REST API.

#![allow(clippy::unwrap_used)]

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bazaar_core::{Email, Price, ProductNo, UserId, UserRole};
use bazaar_integration_tests::{ANON_KEY, SERVICE_KEY, api_error, backend_client, product_row};
use bazaar_storefront::backend::{BackendError, PriceBand, ProductFilter};

#[tokio::test]
async fn test_list_sends_filters_and_caches_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/product_master"))
        .and(header("apikey", ANON_KEY))
        .and(header("authorization", format!("Bearer {ANON_KEY}").as_str()))
        .and(query_param("product_type", "eq.Electronics"))
        .and(query_param("order", "product_no.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            product_row(1, "Premium Laptop", 999.99, 15),
            product_row(4, "Wireless Headphones", 79.99, 0),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = backend_client(&server);
    let filter = ProductFilter {
        product_type: Some("Electronics".to_string()),
        price: None,
    };

    let first = client.anon().products().list(&filter).await.unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].product_price, Price::from_cents(99_999));
    assert!(!first[1].in_stock());

    // Served from the catalog cache; the mock expects a single request.
    let second = client.anon().products().list(&filter).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_price_band_becomes_range_filter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/product_master"))
        .and(query_param("product_price", "gte.50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([product_row(
            2,
            "Casual T-Shirt",
            59.00,
            3
        )])))
        .mount(&server)
        .await;

    let filter = ProductFilter {
        product_type: None,
        price: Some(PriceBand::From50To100),
    };
    let products = backend_client(&server)
        .anon()
        .products()
        .list(&filter)
        .await
        .unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].product_no, ProductNo::new(2));
}

#[tokio::test]
async fn test_null_columns_decode_as_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/product_master"))
        .and(query_param("product_no", "eq.9"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "product_no": 9,
            "product_price": null,
            "quantity_available": null,
            "product_type": null,
            "p_description": "Mystery Box",
            "product_sales": null,
            "p_details": null,
            "product_image": null,
        }])))
        .mount(&server)
        .await;

    let product = backend_client(&server)
        .anon()
        .products()
        .get(ProductNo::new(9))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(product.product_price, Price::ZERO);
    assert_eq!(product.quantity_available, 0);
    assert!(product.product_type.is_empty());
}

#[tokio::test]
async fn test_count_reads_content_range_total() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/rest/v1/app_user"))
        .and(header("prefer", "count=exact"))
        .and(header("apikey", SERVICE_KEY))
        .respond_with(ResponseTemplate::new(200).insert_header("Content-Range", "0-24/573"))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/rest/v1/sales_order"))
        .respond_with(ResponseTemplate::new(200).insert_header("Content-Range", "*/0"))
        .mount(&server)
        .await;

    let client = backend_client(&server);
    assert_eq!(client.privileged().users().count().await.unwrap(), 573);
    assert_eq!(client.privileged().orders().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_unique_violation_maps_to_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/app_user"))
        .respond_with(ResponseTemplate::new(409).set_body_json(api_error(
            "23505",
            "duplicate key value violates unique constraint \"app_user_pkey\"",
        )))
        .mount(&server)
        .await;

    let client = backend_client(&server);
    let user_id = UserId::generate();
    let profile = bazaar_storefront::backend::UserProfile::new(user_id, "Ada", "ada@example.com");
    let err = client.privileged().users().create(&profile).await.unwrap_err();
    assert!(err.is_conflict(), "unexpected error: {err}");
}

#[tokio::test]
async fn test_status_mapping_for_auth_and_rate_limits() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/app_user"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(api_error("PGRST301", "JWT expired")),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/sales_order"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/rest/v1/product_master"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let client = backend_client(&server);

    let err = client
        .anon()
        .users()
        .get(UserId::generate())
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Unauthorized(ref m) if m.contains("JWT expired")));

    let err = client.anon().orders().recent(5).await.unwrap_err();
    assert!(matches!(err, BackendError::RateLimited(7)));

    let err = client.anon().products().count().await.unwrap_err();
    assert!(matches!(err, BackendError::Api { status: 500, .. }));
}

#[tokio::test]
async fn test_set_role_patches_the_profile() {
    let server = MockServer::start().await;
    let user_id = UserId::generate();
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/app_user"))
        .and(query_param("user_id", format!("eq.{user_id}").as_str()))
        .and(body_json(json!({ "user_role": "admin" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "user_id": user_id.to_string(),
            "user_role": "admin",
        }])))
        .expect(1)
        .mount(&server)
        .await;

    backend_client(&server)
        .privileged()
        .users()
        .set_role(user_id, UserRole::Admin)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_find_by_email_filters_on_email_column() {
    let server = MockServer::start().await;
    let user_id = UserId::generate();
    Mock::given(method("GET"))
        .and(path("/rest/v1/app_user"))
        .and(query_param("user_email", "eq.ada@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "user_id": user_id.to_string(),
            "user_name": "Ada",
            "user_email": "ada@example.com",
            "user_cart": null,
            "user_wish_list": null,
            "user_role": null,
        }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/app_user"))
        .and(query_param("user_email", "eq.nobody@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let client = backend_client(&server);
    let users = client.privileged().users();

    let found = users
        .find_by_email(&Email::parse("ada@example.com").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.user_id, user_id);
    assert!(found.user_cart.is_empty());
    assert_eq!(found.user_role, UserRole::Customer);

    let missing = users
        .find_by_email(&Email::parse("nobody@example.com").unwrap())
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_failed_catalog_replace_does_not_serve_deleted_products() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/product_master"))
        .and(query_param("product_no", "eq.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([product_row(
            1,
            "Old Laptop",
            899.00,
            4
        )])))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/product_master"))
        .and(query_param("product_no", "eq.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .with_priority(2)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/product_master"))
        .and(query_param("product_no", "neq.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "product_no": 1 }])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/product_master"))
        .respond_with(ResponseTemplate::new(500).set_body_string("insert failed"))
        .expect(1)
        .mount(&server)
        .await;

    let client = backend_client(&server);
    let cached = client.anon().products().get(ProductNo::new(1)).await.unwrap();
    assert_eq!(cached.map(|p| p.p_description), Some("Old Laptop".to_string()));

    let catalog = bazaar_storefront::services::catalog::sample_products();
    let result = client.privileged().products().replace_catalog(&catalog).await;
    assert!(matches!(result, Err(BackendError::Api { status: 500, .. })));

    let after = client.anon().products().get(ProductNo::new(1)).await.unwrap();
    assert!(after.is_none());
}
