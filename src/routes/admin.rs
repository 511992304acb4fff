use actix_web::{web, HttpResponse};
use serde::Serialize;
use serde_json::json;

use crate::app::AppState;
use crate::error::{AppError, Result};
use crate::middleware::AuthMiddleware;
use crate::models::{UserProfile, UserSummary};

const RECENT_LIMIT: i64 = 5;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DashboardStats {
    total_users: u64,
    total_products: u64,
    total_orders: u64,
    total_donations: u64,
    total_revenue: f64,
    pending_orders: u64,
}

async fn stats(state: web::Data<AppState>) -> Result<HttpResponse> {
    let store = state.store.as_ref();
    let donation_revenue: f64 = store
        .completed_donations_by_month()
        .await?
        .iter()
        .map(|m| m.total)
        .sum();

    Ok(HttpResponse::Ok().json(DashboardStats {
        total_users: store.count_users().await?,
        total_products: store.count_products().await?,
        total_orders: store.count_orders().await?,
        total_donations: store.count_donations().await?,
        total_revenue: store.paid_order_revenue().await? + donation_revenue,
        pending_orders: store.count_undelivered_orders().await?,
    }))
}

async fn recent_orders(state: web::Data<AppState>) -> Result<HttpResponse> {
    let orders = state.store.recent_orders(Some(RECENT_LIMIT)).await?;

    // Buyer expanded in place of the bare user id.
    let mut rows = Vec::with_capacity(orders.len());
    for order in orders {
        let buyer = match order.user.as_deref() {
            Some(id) => state.store.find_user(id).await?.map(|u| UserSummary {
                id: u.id,
                name: u.name,
                email: u.email,
            }),
            None => None,
        };
        let mut row = serde_json::to_value(&order)
            .map_err(|e| AppError::Internal(format!("Failed to serialize order: {}", e)))?;
        row["user"] = json!(buyer);
        rows.push(row);
    }

    Ok(HttpResponse::Ok().json(rows))
}

async fn recent_users(state: web::Data<AppState>) -> Result<HttpResponse> {
    let users: Vec<UserProfile> = state
        .store
        .recent_users(Some(RECENT_LIMIT))
        .await?
        .iter()
        .map(UserProfile::from)
        .collect();

    Ok(HttpResponse::Ok().json(users))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("")
            .wrap(AuthMiddleware::admin())
            .route("/stats", web::get().to(stats))
            .route("/orders/recent", web::get().to(recent_orders))
            .route("/users/recent", web::get().to(recent_users)),
    );
}
