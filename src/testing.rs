//! Fixtures shared by the unit and handler tests.

use std::sync::{Arc, Mutex};

use actix_web::web;
use async_trait::async_trait;
use chrono::Duration;
use serde_json::{json, Value};

use crate::app::{self, AppState};
use crate::auth::{hash_password, TokenKeys};
use crate::config::{Environment, PolicyConfig};
use crate::models::{new_id, now, Category, Product, Role, User};
use crate::services::razorpay::{GatewayError, GatewayOrder, GatewayOrderRequest, PaymentGateway};
use crate::store::memory::MemoryStore;
use crate::store::Store;

pub const PAYMENT_SECRET: &str = "rzp_test_secret";
pub const JWT_SECRET: &str = "test-jwt-secret";
pub const PASSWORD: &str = "password123";

/// Records requests and answers with a canned gateway order.
#[derive(Default)]
pub struct StubGateway {
    requests: Mutex<Vec<GatewayOrderRequest>>,
    fail: bool,
}

impl StubGateway {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<GatewayOrderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_order(&self, request: &GatewayOrderRequest) -> Result<GatewayOrder, GatewayError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(GatewayError::Rejected("Authentication failed".to_string()));
        }
        Ok(GatewayOrder {
            id: "order_test_1".to_string(),
            amount: request.amount,
            currency: request.currency.clone(),
            receipt: Some(request.receipt.clone()),
            status: Some("created".to_string()),
        })
    }
}

pub fn user(name: &str, email: &str, role: Role) -> User {
    User {
        id: new_id(),
        name: name.to_string(),
        email: email.to_string(),
        password: hash_password(PASSWORD).unwrap(),
        phone: None,
        address: None,
        role,
        created_at: now(),
        deleted_at: None,
    }
}

pub fn product(id: &str, price: f64, stock: i64) -> Product {
    Product {
        id: id.to_string(),
        name: format!("Product {}", id),
        description: "Handmade at the ashram".to_string(),
        price,
        images: Vec::new(),
        category: Category::Other,
        stock,
        maker: "Kamala".to_string(),
        story: None,
        featured: false,
        created_at: now(),
        updated_at: now(),
    }
}

/// Shawl 599 x1, candles 399 x2, shipping 50: subtotal 1397, total 1447.
pub fn order_json(payment_method: &str) -> Value {
    json!({
        "orderItems": [
            { "product": "p-shawl", "name": "Shawl", "quantity": 1, "price": 599 },
            { "product": "p-candle", "name": "Candle", "quantity": 2, "price": 399 }
        ],
        "shippingAddress": {
            "address": "12 Temple Road",
            "city": "Pune",
            "state": "MH",
            "pincode": "411001",
            "country": "India"
        },
        "paymentMethod": payment_method,
        "itemsPrice": 1397,
        "shippingPrice": 50,
        "taxPrice": 0,
        "totalPrice": 1447,
        "name": "Asha",
        "email": "asha@example.com"
    })
}

/// Application state over an in-memory store and a stub gateway.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<StubGateway>,
    pub state: web::Data<AppState>,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(PolicyConfig::default(), Environment::Development, StubGateway::default())
    }

    pub fn with_policy(policy: PolicyConfig) -> Self {
        Self::build(policy, Environment::Development, StubGateway::default())
    }

    pub fn with_environment(environment: Environment) -> Self {
        Self::build(PolicyConfig::default(), environment, StubGateway::default())
    }

    pub fn with_gateway(gateway: StubGateway) -> Self {
        Self::build(PolicyConfig::default(), Environment::Development, gateway)
    }

    fn build(policy: PolicyConfig, environment: Environment, gateway: StubGateway) -> Self {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(gateway);
        let state = web::Data::new(AppState {
            store: store.clone(),
            gateway: gateway.clone(),
            tokens: TokenKeys::new(JWT_SECRET, Duration::hours(1)),
            payment_secret: PAYMENT_SECRET.to_string(),
            environment,
            policy,
        });
        Self {
            store,
            gateway,
            state,
        }
    }

    pub fn mount(&self) -> impl FnOnce(&mut web::ServiceConfig) {
        app::mount(self.state.clone(), 1024 * 1024)
    }

    /// Stores the user and returns a ready `Authorization` header value.
    pub async fn sign_in(&self, user: &User) -> String {
        self.store.insert_user(user).await.unwrap();
        self.bearer(user)
    }

    pub fn bearer(&self, user: &User) -> String {
        format!("Bearer {}", self.state.tokens.issue(&user.id).unwrap())
    }
}
