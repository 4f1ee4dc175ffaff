//! Smoke tests against a running storefront.
//!
//! Set `STOREFRONT_URL` (default `http://localhost:3000`) and run with
//! `--ignored`.

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use reqwest::redirect::Policy;

fn storefront_url() -> String {
    std::env::var("STOREFRONT_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
        .unwrap()
}

#[tokio::test]
#[ignore = "requires a running storefront"]
async fn test_live_readiness() {
    let response = client()
        .get(format!("{}/health/ready", storefront_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "requires a running storefront"]
async fn test_live_catalog_pages() {
    let client = client();
    for page in ["/", "/products", "/cart", "/auth/signin", "/auth/signup"] {
        let response = client
            .get(format!("{}{page}", storefront_url()))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "GET {page}");
    }
}

#[tokio::test]
#[ignore = "requires a running storefront"]
async fn test_live_protected_pages_redirect() {
    let client = client();
    for page in ["/orders", "/wishlist", "/profile", "/admin"] {
        let response = client
            .get(format!("{}{page}", storefront_url()))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "GET {page}");
    }
}
