//! Integration tests for the admin HTTP API.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The admin server running (cargo run -p smartcartify-admin)
//!
//! None of them call Shopify: every request is rejected or answered before a
//! Shopify call would be made. Session tokens are signed with the server's
//! `SHOPIFY_API_KEY` and `SHOPIFY_API_SECRET`.

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use smartcartify_integration_tests::{admin_base_url, session_token, unique_shop};

fn client() -> Client {
    Client::builder()
        .build()
        .expect("Failed to create HTTP client")
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_health_endpoints() {
    let base_url = admin_base_url();

    let resp = client()
        .get(format!("{base_url}/health"))
        .send()
        .await
        .expect("Failed to call /health");
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));

    let resp = client()
        .get(format!("{base_url}/health/ready"))
        .send()
        .await
        .expect("Failed to call /health/ready");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_rules_require_session_token() {
    let resp = client()
        .get(format!("{}/api/rules", admin_base_url()))
        .send()
        .await
        .expect("Failed to get rules");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = client()
        .post(format!("{}/api/rules", admin_base_url()))
        .bearer_auth("not.a.token")
        .json(&json!({"section": "discount", "payload": []}))
        .send()
        .await
        .expect("Failed to post rules");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_bxgy_without_products_fails_validation() {
    let shop = unique_shop();
    let resp = client()
        .post(format!("{}/api/rules", admin_base_url()))
        .bearer_auth(session_token(&shop).expect("session token"))
        .json(&json!({
            "section": "bxgy",
            "payload": [{"scope": "product", "appliesTo": {"products": []}}]
        }))
        .send()
        .await
        .expect("Failed to post rules");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("Failed to parse body");
    assert_eq!(body["validationFailed"], true);
    assert_eq!(
        body["fieldErrors"]["0.appliesTo.products"],
        "select at least one product"
    );
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_valid_save_for_unknown_shop_is_unauthorized() {
    let shop = unique_shop();
    let resp = client()
        .post(format!("{}/api/rules", admin_base_url()))
        .bearer_auth(session_token(&shop).expect("session token"))
        .json(&json!({
            "section": "discount",
            "payload": [{"value": 10, "valueType": "percent"}]
        }))
        .send()
        .await
        .expect("Failed to post rules");

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.expect("Failed to parse body");
    assert!(body["error"].is_string());
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_request_for_other_shop_rejected() {
    let token = session_token(&unique_shop()).expect("session token");
    let resp = client()
        .get(format!("{}/api/rules?shop={}", admin_base_url(), unique_shop()))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to get rules");

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_unsigned_proxy_request_rejected() {
    let resp = client()
        .get(format!(
            "{}/proxy/smart?shop={}",
            admin_base_url(),
            unique_shop()
        ))
        .send()
        .await
        .expect("Failed to call proxy");

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_install_redirects_to_shopify() {
    let shop = unique_shop();
    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client");

    let resp = client
        .get(format!("{}/auth?shop={shop}", admin_base_url()))
        .send()
        .await
        .expect("Failed to call /auth");

    assert!(resp.status().is_redirection());
    let location = resp
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("redirect has a location");
    assert!(location.starts_with(&format!("https://{shop}/admin/oauth/authorize")));
    assert!(location.contains("state="));
}
