use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{error, http::header, web, HttpRequest};

use crate::auth::TokenKeys;
use crate::config::{AppConfig, CorsConfig, Environment, PolicyConfig};
use crate::db;
use crate::error::AppError;
use crate::routes;
use crate::services::razorpay::{PaymentGateway, RazorpayClient};
use crate::store::{MongoStore, Store};

/// Shared by every worker through `web::Data`.
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub tokens: TokenKeys,
    /// Razorpay key secret, the HMAC key for payment signatures.
    pub payment_secret: String,
    pub environment: Environment,
    pub policy: PolicyConfig,
}

pub async fn build_state(config: &AppConfig) -> Result<AppState, AppError> {
    let database = db::connect(&config.database).await?;
    let store = MongoStore::new(&database);
    store.ensure_indexes().await?;

    Ok(AppState {
        store: Arc::new(store),
        gateway: Arc::new(RazorpayClient::new(&config.razorpay)),
        tokens: TokenKeys::new(&config.auth.jwt_secret, config.auth.jwt_ttl),
        payment_secret: config.razorpay.key_secret.clone(),
        environment: config.server.environment,
        policy: config.policy,
    })
}

pub fn cors(config: &CorsConfig) -> Cors {
    config
        .allowed_origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .supports_credentials()
        .max_age(3600)
}

pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(|err: error::JsonPayloadError, _req: &HttpRequest| {
            AppError::BadRequest(format!("Invalid request body: {}", err)).into()
        })
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err: error::QueryPayloadError, _req: &HttpRequest| {
        AppError::BadRequest(format!("Invalid query string: {}", err)).into()
    })
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err: error::PathError, _req: &HttpRequest| {
        AppError::BadRequest(format!("Invalid path: {}", err)).into()
    })
}

/// Registers shared state, extractor limits and the route table.
pub fn mount(
    state: web::Data<AppState>,
    max_body_size: usize,
) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(state)
            .app_data(json_config(max_body_size))
            .app_data(query_config())
            .app_data(path_config())
            .configure(routes::configure);
    }
}
