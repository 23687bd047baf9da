use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

use storefront_api::app::{router, services::AppServices};
use storefront_auth::{Hs256JwtValidator, JwtClaims, Role};
use storefront_core::UserId;

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, in-memory stores, ephemeral port.
        let jwt = Arc::new(Hs256JwtValidator::new(JWT_SECRET.as_bytes().to_vec()));
        let app = router(AppServices::in_memory(), jwt);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn get_json(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut req = self.client.get(self.url(path));
        if let Some(t) = token {
            req = req.bearer_auth(t);
        }
        let res = req.send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn create_product(&self, token: &str, body: Value) -> Value {
        let res = self.post("/products/", token, body).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        res.json().await.unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt_for(user: UserId, roles: Vec<Role>, secret: &str) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: user,
        roles,
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn mint_jwt() -> String {
    mint_jwt_for(UserId::new(), vec![Role::new("customer")], JWT_SECRET)
}

fn names(list: &Value) -> Vec<&str> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn health_is_open() {
    let srv = TestServer::spawn().await;
    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn whoami_reflects_token() {
    let srv = TestServer::spawn().await;
    let user = UserId::new();
    let token = mint_jwt_for(user, vec![Role::new("admin")], JWT_SECRET);

    let (status, body) = srv.get_json("/whoami", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"].as_str().unwrap(), user.to_string());
    assert!(body["roles"].as_array().unwrap().iter().any(|r| r == "admin"));

    let (status, _) = srv.get_json("/whoami", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn cart_requires_authentication() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv.get_json("/cart/", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let res = srv
        .client
        .post(srv.url("/cart/"))
        .json(&json!({ "product_id": UserId::new().to_string() }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_tokens_are_rejected_everywhere() {
    let srv = TestServer::spawn().await;
    let forged = mint_jwt_for(UserId::new(), vec![], "some-other-secret");

    let (status, _) = srv.get_json("/products/", Some(&forged)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = srv.get_json("/products/", Some("garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn catalog_writes_require_authentication_reads_do_not() {
    let srv = TestServer::spawn().await;

    let res = srv
        .client
        .post(srv.url("/products/"))
        .json(&json!({ "name": "Runner", "price": "10.00" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let (status, body) = srv.get_json("/products/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn add_to_cart_accumulates_quantities() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt();

    let p1 = srv
        .create_product(&token, json!({ "name": "Runner", "price": "49.90", "stock": 3 }))
        .await;
    let p2 = srv
        .create_product(&token, json!({ "name": "Sock", "price": 5 }))
        .await;
    let p1_id = p1["id"].as_str().unwrap();
    let p2_id = p2["id"].as_str().unwrap();

    let res = srv
        .post("/cart/", &token, json!({ "product_id": p1_id, "quantity": 2 }))
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Item added to cart");
    assert_eq!(body["item"]["quantity"], 2);

    let res = srv
        .post("/cart", &token, json!({ "product_id": p1_id, "quantity": "3" }))
        .await;
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["item"]["quantity"], 5);

    let res = srv.post("/cart/", &token, json!({ "product_id": p2_id })).await;
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["item"]["quantity"], 1);

    let (status, cart) = srv.get_json("/cart/", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let items = cart["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["product_id"], p1_id);
    assert_eq!(items[0]["quantity"], 5);
    assert_eq!(items[0]["product_name"], "Runner");
    assert_eq!(items[1]["quantity"], 1);
}

#[tokio::test]
async fn carts_are_isolated_per_user() {
    let srv = TestServer::spawn().await;
    let alice = mint_jwt();
    let bob = mint_jwt();

    let p = srv.create_product(&alice, json!({ "name": "Runner", "price": "10" })).await;
    srv.post("/cart/", &alice, json!({ "product_id": p["id"] })).await;

    let (_, alice_cart) = srv.get_json("/cart/", Some(&alice)).await;
    let (_, bob_cart) = srv.get_json("/cart/", Some(&bob)).await;
    assert_eq!(alice_cart["items"].as_array().unwrap().len(), 1);
    assert!(bob_cart["items"].as_array().unwrap().is_empty());
    assert_ne!(alice_cart["id"], bob_cart["id"]);

    let (_, again) = srv.get_json("/cart/", Some(&bob)).await;
    assert_eq!(again["id"], bob_cart["id"]);
}

#[tokio::test]
async fn add_to_cart_rejects_bad_input() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt();
    let p = srv.create_product(&token, json!({ "name": "Runner", "price": "10" })).await;

    let res = srv
        .post("/cart/", &token, json!({ "product_id": UserId::new().to_string() }))
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    for quantity in [json!(0), json!(-1), json!("lots"), json!(2.5)] {
        let res = srv
            .post("/cart/", &token, json!({ "product_id": p["id"], "quantity": quantity }))
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "quantity {quantity}");
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], "validation_error");
    }

    let res = srv.post("/cart/", &token, json!({ "quantity": 1 })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let (_, cart) = srv.get_json("/cart/", Some(&token)).await;
    assert!(cart["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn product_listing_filters_searches_and_orders() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt();

    srv.create_product(&token, json!({ "name": "Trail Runner", "description": "grippy", "price": "80", "stock": 2 }))
        .await;
    srv.create_product(&token, json!({ "name": "Road Runner", "description": "light", "price": "60", "stock": 0 }))
        .await;
    srv.create_product(&token, json!({ "name": "Wool Sock", "description": "warm trail sock", "price": "9.50", "stock": 40 }))
        .await;

    let (_, all) = srv.get_json("/products/", None).await;
    assert_eq!(names(&all), vec!["Trail Runner", "Road Runner", "Wool Sock"]);

    let (_, cheap_first) = srv.get_json("/products/?ordering=price", None).await;
    assert_eq!(names(&cheap_first), vec!["Wool Sock", "Road Runner", "Trail Runner"]);

    let (_, in_stock) = srv.get_json("/products/?stock__gt=0&ordering=-price", None).await;
    assert_eq!(names(&in_stock), vec!["Trail Runner", "Wool Sock"]);

    let (_, trail) = srv.get_json("/products/?search=TRAIL", None).await;
    assert_eq!(names(&trail), vec!["Trail Runner", "Wool Sock"]);

    let (_, exact) = srv.get_json("/products/?price=60.00", None).await;
    assert_eq!(names(&exact), vec!["Road Runner"]);

    let (status, body) = srv.get_json("/products/?price__gte=cheap", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn product_update_patch_and_delete() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt();
    let p = srv.create_product(&token, json!({ "name": "Runner", "price": "10", "stock": 1 })).await;
    let path = format!("/products/{}/", p["id"].as_str().unwrap());

    let res = srv
        .client
        .patch(srv.url(&path))
        .bearer_auth(&token)
        .json(&json!({ "stock": 7 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let patched: Value = res.json().await.unwrap();
    assert_eq!(patched["stock"], 7);
    assert_eq!(patched["name"], "Runner");

    let res = srv
        .client
        .put(srv.url(&path))
        .bearer_auth(&token)
        .json(&json!({ "name": "Runner II", "price": "12.5" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let replaced: Value = res.json().await.unwrap();
    assert_eq!(replaced["name"], "Runner II");
    assert_eq!(replaced["stock"], 0);

    let res = srv
        .client
        .put(srv.url(&path))
        .bearer_auth(&token)
        .json(&json!({ "name": "Runner II", "price": "-1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv.client.delete(srv.url(&path)).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let (status, body) = srv.get_json(&path, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = srv.get_json("/products/not-an-id/", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn category_products_are_listed_by_slug() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt();

    let res = srv.post("/categories/", &token, json!({ "name": "Shoes" })).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let shoes: Value = res.json().await.unwrap();
    assert_eq!(shoes["slug"], "shoes");

    let res = srv.post("/categories/", &token, json!({ "name": "Shoes!" })).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    srv.create_product(&token, json!({ "name": "Runner", "price": "10", "category_id": shoes["id"] }))
        .await;
    srv.create_product(&token, json!({ "name": "Boot", "price": "90", "category_id": shoes["id"] }))
        .await;
    srv.create_product(&token, json!({ "name": "Scarf", "price": "15" })).await;

    let (status, listed) = srv.get_json("/categories/shoes/products/?ordering=-price", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&listed), vec!["Boot", "Runner"]);

    let (status, _) = srv.get_json("/categories/hats/products/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, category) = srv.get_json("/categories/shoes", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(category["name"], "Shoes");

    let res = srv
        .client
        .put(srv.url("/categories/shoes/"))
        .bearer_auth(&token)
        .json(&json!({ "name": "Footwear" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let renamed: Value = res.json().await.unwrap();
    assert_eq!(renamed["slug"], "footwear");

    let res = srv
        .client
        .delete(srv.url("/categories/footwear/"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let (_, all) = srv.get_json("/products/", None).await;
    assert!(all.as_array().unwrap().iter().all(|p| p["category_id"].is_null()));
}

#[tokio::test]
async fn null_quantity_defaults_to_one() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt();
    let p = srv.create_product(&token, json!({ "name": "Runner", "price": "10" })).await;

    let res = srv
        .post("/cart/", &token, json!({ "product_id": p["id"], "quantity": null }))
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["item"]["quantity"], 1);
}

#[tokio::test]
async fn malformed_json_bodies_are_validation_errors() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt();

    for path in ["/cart/", "/products/", "/categories/"] {
        let res = srv
            .client
            .post(srv.url(path))
            .bearer_auth(&token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{path}");
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], "validation_error", "{path}");
    }
}

#[tokio::test]
async fn category_patch_updates_only_given_fields() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt();
    let res = srv.post("/categories/", &token, json!({ "name": "Shoes" })).await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = srv
        .client
        .patch(srv.url("/categories/shoes/"))
        .bearer_auth(&token)
        .json(&json!({ "name": "Footwear" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let patched: Value = res.json().await.unwrap();
    assert_eq!(patched["name"], "Footwear");
    assert_eq!(patched["slug"], "shoes");

    let res = srv
        .client
        .patch(srv.url("/categories/shoes"))
        .bearer_auth(&token)
        .json(&json!({ "slug": "footwear" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let (status, category) = srv.get_json("/categories/footwear/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(category["name"], "Footwear");

    let res = srv
        .client
        .patch(srv.url("/categories/footwear/"))
        .json(&json!({ "name": "Anon" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv
        .client
        .patch(srv.url("/categories/missing/"))
        .bearer_auth(&token)
        .json(&json!({ "name": "Ghost" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
