use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use glow_api::{app, AppState, AuthConfig};
use glow_catalog::Product;
use glow_core::{Actor, InMemoryStore, LogNotifier, OrderService, ProductRepository, Role, User};
use glow_shared::Masked;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "integration-secret";

struct TestApp {
    router: Router,
    store: Arc<InMemoryStore>,
    auth: AuthConfig,
    customer: Actor,
    admin: Actor,
    argan_oil: Uuid,
    rose_water: Uuid,
}

impl TestApp {
    async fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let customer = Actor::customer(Uuid::new_v4());
        let admin = Actor::admin(Uuid::new_v4());

        for (actor, name) in [(customer, "Salma"), (admin, "Youssef")] {
            store
                .insert_user(User {
                    id: actor.user_id,
                    name: name.to_string(),
                    email: Masked(format!("{}@example.com", name.to_lowercase())),
                    role: actor.role,
                })
                .unwrap();
        }

        let argan_oil = store
            .create_product(&Product::new("Argan Oil", 10_000, 10).unwrap())
            .await
            .unwrap();
        let rose_water = store
            .create_product(&Product::new("Rose Water", 5_000, 5).unwrap())
            .await
            .unwrap();

        let service = OrderService::new(store.clone(), store.clone(), store.clone(), Arc::new(LogNotifier));
        let auth = AuthConfig {
            secret: SECRET.to_string(),
            expiration: 3600,
        };
        let router = app(AppState {
            service,
            auth: auth.clone(),
        });

        Self {
            router,
            store,
            auth,
            customer,
            admin,
            argan_oil,
            rose_water,
        }
    }

    fn token(&self, actor: &Actor) -> String {
        self.auth.issue_token(actor).unwrap()
    }

    async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    fn reference_cart(&self) -> Value {
        json!({
            "items": [
                { "product_id": self.argan_oil, "quantity": 2 },
                { "product_id": self.rose_water, "quantity": 1 }
            ],
            "shipping": {
                "full_name": "Salma Idrissi",
                "phone": "0612345678",
                "address_line": "12 Avenue Mohammed V",
                "city": "Rabat"
            }
        })
    }

    async fn place_reference_order(&self) -> Uuid {
        let token = self.token(&self.customer);
        let (status, body) = self
            .send("POST", "/v1/orders", Some(&token), Some(self.reference_cart()))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["order"]["id"].as_str().unwrap().parse().unwrap()
    }

    async fn set_status(&self, actor: &Actor, order_id: Uuid, status: &str) -> (StatusCode, Value) {
        let token = self.token(actor);
        self.send(
            "PUT",
            &format!("/v1/admin/orders/{}/status", order_id),
            Some(&token),
            Some(json!({ "status": status })),
        )
        .await
    }
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;
    let (status, body) = app.send("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_checkout_prices_order_and_leaves_stock() {
    let app = TestApp::new().await;
    let token = app.token(&app.customer);

    let (status, body) = app
        .send("POST", "/v1/orders", Some(&token), Some(app.reference_cart()))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["order"]["status"], "PENDING");
    assert_eq!(body["order"]["subtotal_cents"], 25_000);
    assert_eq!(body["order"]["shipping_fee_cents"], 2_500);
    assert_eq!(body["order"]["total_cents"], 27_500);
    assert_eq!(body["order"]["payment_method"], "CASH_ON_DELIVERY");
    assert_eq!(body["order"]["items"].as_array().unwrap().len(), 2);
    assert_eq!(app.store.stock_of(app.argan_oil).unwrap(), Some(10));
}

#[tokio::test]
async fn test_requests_without_valid_token_are_rejected() {
    let app = TestApp::new().await;

    let (status, _) = app.send("POST", "/v1/orders", None, Some(app.reference_cart())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.send("GET", "/v1/orders", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let forged = AuthConfig {
        secret: "someone-else".to_string(),
        expiration: 3600,
    }
    .issue_token(&app.customer)
    .unwrap();
    let (status, _) = app.send("GET", "/v1/orders", Some(&forged), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let app = TestApp::new().await;
    let claims = json!({
        "sub": app.customer.user_id.to_string(),
        "role": Role::Customer.as_str(),
        "exp": (chrono::Utc::now().timestamp() - 3_600) as usize,
    });
    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap();

    let (status, _) = app.send("GET", "/v1/orders", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_for_unknown_user_cannot_checkout() {
    let app = TestApp::new().await;
    let stranger = Actor::customer(Uuid::new_v4());

    let (status, _) = app
        .send("POST", "/v1/orders", Some(&app.token(&stranger)), Some(app.reference_cart()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_carts_are_bad_requests() {
    let app = TestApp::new().await;
    let token = app.token(&app.customer);

    let mut empty = app.reference_cart();
    empty["items"] = json!([]);
    let (status, body) = app.send("POST", "/v1/orders", Some(&token), Some(empty)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    for quantity in [0, -3] {
        let mut cart = app.reference_cart();
        cart["items"][0]["quantity"] = json!(quantity);
        let (status, _) = app.send("POST", "/v1/orders", Some(&token), Some(cart)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "quantity {}", quantity);
    }

    let mut vanished = app.reference_cart();
    vanished["items"] = json!([{ "product_id": Uuid::new_v4(), "quantity": 1 }]);
    let (status, _) = app.send("POST", "/v1/orders", Some(&token), Some(vanished)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut no_city = app.reference_cart();
    no_city["shipping"]["city"] = json!("  ");
    let (status, _) = app.send("POST", "/v1/orders", Some(&token), Some(no_city)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_quantities_outside_storage_range_are_bad_requests() {
    let app = TestApp::new().await;
    let token = app.token(&app.customer);

    for quantity in [-3_i64, 3_000_000_000, 5_000_000_000] {
        let mut cart = app.reference_cart();
        cart["items"][0]["quantity"] = json!(quantity);
        let (status, body) = app.send("POST", "/v1/orders", Some(&token), Some(cart)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "quantity {}", quantity);
        assert!(
            body["error"].as_str().unwrap().contains("out of range"),
            "quantity {}: {}",
            quantity,
            body
        );
    }

    let (status, body) = app.send("GET", "/v1/orders", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_commit_and_cancel_move_stock_once() {
    let app = TestApp::new().await;
    let order_id = app.place_reference_order().await;

    let (status, body) = app.set_status(&app.admin, order_id, "PROCESSING").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["inventory_effect"], "DECREMENT");
    assert_eq!(body["adjustments"].as_array().unwrap().len(), 2);
    assert_eq!(app.store.stock_of(app.argan_oil).unwrap(), Some(8));
    assert_eq!(app.store.stock_of(app.rose_water).unwrap(), Some(4));

    let (status, body) = app.set_status(&app.admin, order_id, "shipped").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["inventory_effect"], "NONE");
    assert_eq!(app.store.stock_of(app.argan_oil).unwrap(), Some(8));

    let (status, body) = app.set_status(&app.admin, order_id, "CANCELLED").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["inventory_effect"], "RESTOCK");
    assert_eq!(app.store.stock_of(app.argan_oil).unwrap(), Some(10));
    assert_eq!(app.store.stock_of(app.rose_water).unwrap(), Some(5));

    let token = app.token(&app.customer);
    let (status, body) = app
        .send("GET", &format!("/v1/orders/{}", order_id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "CANCELLED");

    let (status, history) = app
        .send(
            "GET",
            &format!("/v1/admin/orders/{}/history", order_id),
            Some(&app.token(&app.admin)),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0]["to_status"], "PROCESSING");
    assert_eq!(history[2]["inventory_effect"], "RESTOCK");
}

#[tokio::test]
async fn test_customer_cannot_change_status() {
    let app = TestApp::new().await;
    let order_id = app.place_reference_order().await;

    let (status, _) = app.set_status(&app.customer, order_id, "PROCESSING").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(app.store.stock_of(app.argan_oil).unwrap(), Some(10));

    let (status, _) = app
        .send("GET", "/v1/admin/orders", Some(&app.token(&app.customer)), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_status_update_errors() {
    let app = TestApp::new().await;
    let order_id = app.place_reference_order().await;

    let (status, _) = app.set_status(&app.admin, order_id, "TELEPORTED").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.set_status(&app.admin, Uuid::new_v4(), "PROCESSING").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_failed_transition_is_retryable_and_writes_nothing() {
    let app = TestApp::new().await;
    let order_id = app.place_reference_order().await;
    app.store.fail_stock_updates_for(app.rose_water).unwrap();

    let (status, body) = app.set_status(&app.admin, order_id, "PROCESSING").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Unable to complete the request, please retry");
    assert_eq!(app.store.stock_of(app.argan_oil).unwrap(), Some(10));

    let token = app.token(&app.customer);
    let (_, order) = app
        .send("GET", &format!("/v1/orders/{}", order_id), Some(&token), None)
        .await;
    assert_eq!(order["status"], "PENDING");

    app.store.clear_failures().unwrap();
    let (status, _) = app.set_status(&app.admin, order_id, "PROCESSING").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.store.stock_of(app.argan_oil).unwrap(), Some(8));
}

#[tokio::test]
async fn test_orders_are_private_to_their_owner() {
    let app = TestApp::new().await;
    let order_id = app.place_reference_order().await;

    let other = Actor::customer(Uuid::new_v4());
    let (status, _) = app
        .send("GET", &format!("/v1/orders/{}", order_id), Some(&app.token(&other)), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, mine) = app
        .send("GET", "/v1/orders", Some(&app.token(&app.customer)), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let (status, _) = app
        .send("GET", &format!("/v1/orders/{}", order_id), Some(&app.token(&app.admin)), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_admin_filters_orders_by_status() {
    let app = TestApp::new().await;
    let first = app.place_reference_order().await;
    app.place_reference_order().await;
    app.set_status(&app.admin, first, "PROCESSING").await;

    let token = app.token(&app.admin);
    let (status, processing) = app
        .send("GET", "/v1/admin/orders?status=PROCESSING", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let processing = processing.as_array().unwrap();
    assert_eq!(processing.len(), 1);
    assert_eq!(processing[0]["id"], first.to_string());

    let (_, all) = app.send("GET", "/v1/admin/orders", Some(&token), None).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (status, _) = app
        .send("GET", "/v1/admin/orders?status=LOST", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_shipping_quote_is_public() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send("GET", "/v1/shipping/quote?city=Sal%C3%A9&subtotal_cents=25000", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["zone"], "ZONE_ONE");
    assert_eq!(body["fee_cents"], 2_500);
    assert_eq!(body["remaining_for_free_cents"], 15_000);

    let (_, body) = app
        .send("GET", "/v1/shipping/quote?city=Tanger&subtotal_cents=60000", None, None)
        .await;
    assert_eq!(body["zone"], "ZONE_TWO");
    assert_eq!(body["fee_cents"], 0);
}
