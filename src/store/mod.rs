//! Persistence seam between the handlers and MongoDB.

mod mongo;

#[cfg(test)]
pub mod memory;

pub use mongo::MongoStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Donation, MonthlyDonations, Order, Product, ProductFilter, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate key on {0}")]
    Duplicate(String),

    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),

    #[error("malformed aggregate row: {0}")]
    Decode(#[from] mongodb::bson::de::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Every collection the service reads or writes.
///
/// Each call is a single round trip; nothing here spans documents, so callers
/// that touch several records get no atomicity between them.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_user(&self, user: &User) -> StoreResult<()>;
    async fn find_user(&self, id: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    /// Returns false when no user has the given id.
    async fn replace_user(&self, user: &User) -> StoreResult<bool>;
    /// Active users, newest first.
    async fn recent_users(&self, limit: Option<i64>) -> StoreResult<Vec<User>>;
    async fn count_users(&self) -> StoreResult<u64>;

    async fn insert_product(&self, product: &Product) -> StoreResult<()>;
    async fn find_product(&self, id: &str) -> StoreResult<Option<Product>>;
    async fn replace_product(&self, product: &Product) -> StoreResult<bool>;
    async fn delete_product(&self, id: &str) -> StoreResult<bool>;
    /// One page of matching products plus the total match count.
    async fn search_products(&self, filter: &ProductFilter) -> StoreResult<(Vec<Product>, u64)>;
    async fn count_products(&self) -> StoreResult<u64>;
    /// Adds `delta` to the product's stock without any floor. Returns false
    /// when the product does not exist.
    async fn adjust_stock(&self, product_id: &str, delta: i64) -> StoreResult<bool>;

    async fn insert_order(&self, order: &Order) -> StoreResult<()>;
    async fn find_order(&self, id: &str) -> StoreResult<Option<Order>>;
    async fn replace_order(&self, order: &Order) -> StoreResult<bool>;
    async fn orders_for_user(&self, user_id: &str) -> StoreResult<Vec<Order>>;
    async fn recent_orders(&self, limit: Option<i64>) -> StoreResult<Vec<Order>>;
    async fn count_orders(&self) -> StoreResult<u64>;
    async fn count_undelivered_orders(&self) -> StoreResult<u64>;
    /// Sum of `totalPrice` over paid orders.
    async fn paid_order_revenue(&self) -> StoreResult<f64>;

    async fn insert_donation(&self, donation: &Donation) -> StoreResult<()>;
    async fn donations_for_user(&self, user_id: &str) -> StoreResult<Vec<Donation>>;
    async fn recent_donations(&self, limit: Option<i64>) -> StoreResult<Vec<Donation>>;
    async fn count_donations(&self) -> StoreResult<u64>;
    /// Completed donations grouped by calendar month (UTC), latest month first.
    async fn completed_donations_by_month(&self) -> StoreResult<Vec<MonthlyDonations>>;
}
