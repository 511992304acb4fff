use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::app::AppState;
use crate::error::Result;
use crate::middleware::{AuthMiddleware, CurrentUser};
use crate::models::{OrderPayload, OrderStatus, PaymentResultInput, StatusUpdate};
use crate::services::checkout;

async fn create_order(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    payload: web::Json<OrderPayload>,
) -> Result<HttpResponse> {
    let order = checkout::place_cod_order(state.store.as_ref(), payload.into_inner(), &user).await?;
    Ok(HttpResponse::Created().json(order))
}

async fn my_orders(state: web::Data<AppState>, CurrentUser(user): CurrentUser) -> Result<HttpResponse> {
    let orders = state.store.orders_for_user(&user.id).await?;
    Ok(HttpResponse::Ok().json(orders))
}

async fn get_order(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    id: web::Path<String>,
) -> Result<HttpResponse> {
    let order = checkout::visible_order(state.store.as_ref(), &id, &user).await?;
    Ok(HttpResponse::Ok().json(order))
}

async fn pay_order(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    id: web::Path<String>,
    input: Option<web::Json<PaymentResultInput>>,
) -> Result<HttpResponse> {
    let input = input.map(web::Json::into_inner).unwrap_or_default();
    let order = checkout::pay_order(state.store.as_ref(), &id, &user, input).await?;
    Ok(HttpResponse::Ok().json(order))
}

async fn all_orders(state: web::Data<AppState>) -> Result<HttpResponse> {
    let orders = state.store.recent_orders(None).await?;
    Ok(HttpResponse::Ok().json(orders))
}

async fn deliver_order(state: web::Data<AppState>, id: web::Path<String>) -> Result<HttpResponse> {
    let order = checkout::update_status(
        state.store.as_ref(),
        &id,
        OrderStatus::Delivered,
        state.policy.order_status,
    )
    .await?;
    Ok(HttpResponse::Ok().json(order))
}

async fn update_status(
    state: web::Data<AppState>,
    id: web::Path<String>,
    input: web::Json<StatusUpdate>,
) -> Result<HttpResponse> {
    let order = checkout::update_status(
        state.store.as_ref(),
        &id,
        input.status,
        state.policy.order_status,
    )
    .await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "order": order })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "",
        web::post().to(create_order).wrap(AuthMiddleware::authenticated()),
    )
    .route("", web::get().to(all_orders).wrap(AuthMiddleware::admin()))
    .route(
        "/myorders",
        web::get().to(my_orders).wrap(AuthMiddleware::authenticated()),
    )
    .route(
        "/{id}",
        web::get().to(get_order).wrap(AuthMiddleware::authenticated()),
    )
    .route(
        "/{id}/pay",
        web::put().to(pay_order).wrap(AuthMiddleware::authenticated()),
    )
    .route(
        "/{id}/deliver",
        web::put().to(deliver_order).wrap(AuthMiddleware::admin()),
    )
    .route(
        "/{id}/status",
        web::put().to(update_status).wrap(AuthMiddleware::admin()),
    );
}
