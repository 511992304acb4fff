use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::{self, doc, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{FindOptions, IndexOptions};
use mongodb::{Collection, Database, IndexModel};

use super::{Store, StoreError, StoreResult};
use serde::Deserialize;

use crate::models::{
    now, timestamp, Donation, MonthlyDonations, Order, Product, ProductFilter, ProductSort, User,
};

const DUPLICATE_KEY: i32 = 11000;

#[derive(Clone)]
pub struct MongoStore {
    users: Collection<User>,
    products: Collection<Product>,
    orders: Collection<Order>,
    donations: Collection<Donation>,
}

impl MongoStore {
    pub fn new(db: &Database) -> Self {
        Self {
            users: db.collection("users"),
            products: db.collection("products"),
            orders: db.collection("orders"),
            donations: db.collection("donations"),
        }
    }

    pub async fn ensure_indexes(&self) -> StoreResult<()> {
        let unique_email = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.users.create_index(unique_email, None).await?;

        let by_user = IndexModel::builder().keys(doc! { "user": 1 }).build();
        self.orders.create_index(by_user.clone(), None).await?;
        self.donations.create_index(by_user, None).await?;

        log::info!("MongoDB indexes ensured");
        Ok(())
    }
}

fn classify(err: mongodb::error::Error, key: &str) -> StoreError {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY => {
            StoreError::Duplicate(key.to_string())
        }
        _ => StoreError::Mongo(err),
    }
}

fn newest_first(limit: Option<i64>) -> FindOptions {
    FindOptions::builder()
        .sort(doc! { "createdAt": -1 })
        .limit(limit)
        .build()
}

#[derive(Deserialize)]
struct Sum {
    total: f64,
}

/// Buckets completed donations by the `YYYY-MM` prefix of their stored timestamp.
pub(crate) fn donation_months_pipeline() -> Vec<Document> {
    vec![
        doc! { "$match": { "status": "completed" } },
        doc! { "$group": {
            "_id": {
                "month": { "$toInt": { "$substrBytes": ["$createdAt", 5, 2] } },
                "year": { "$toInt": { "$substrBytes": ["$createdAt", 0, 4] } },
            },
            "count": { "$sum": 1 },
            "total": { "$sum": "$amount" },
        } },
        doc! { "$sort": { "_id.year": -1, "_id.month": -1 } },
    ]
}

pub(crate) fn paid_revenue_pipeline() -> Vec<Document> {
    vec![
        doc! { "$match": { "isPaid": true } },
        doc! { "$group": { "_id": null, "total": { "$sum": "$totalPrice" } } },
    ]
}

fn active_users() -> Document {
    doc! { "deletedAt": null }
}

pub(crate) fn product_filter(filter: &ProductFilter) -> Document {
    let mut query = Document::new();

    if let Some(category) = filter.category {
        query.insert("category", category.as_str());
    }

    let mut price = Document::new();
    if let Some(min) = filter.min_price {
        price.insert("$gte", min);
    }
    if let Some(max) = filter.max_price {
        price.insert("$lte", max);
    }
    if !price.is_empty() {
        query.insert("price", price);
    }

    if let Some(featured) = filter.featured {
        query.insert("featured", featured);
    }

    if let Some(term) = &filter.search {
        let pattern = regex::escape(term);
        query.insert(
            "$or",
            vec![
                doc! { "name": { "$regex": &pattern, "$options": "i" } },
                doc! { "description": { "$regex": &pattern, "$options": "i" } },
            ],
        );
    }

    query
}

pub(crate) fn product_sort(sort: ProductSort) -> Document {
    match sort {
        ProductSort::Newest => doc! { "createdAt": -1 },
        ProductSort::Oldest => doc! { "createdAt": 1 },
        ProductSort::PriceAsc => doc! { "price": 1, "createdAt": -1 },
        ProductSort::PriceDesc => doc! { "price": -1, "createdAt": -1 },
        ProductSort::NameAsc => doc! { "name": 1 },
        ProductSort::NameDesc => doc! { "name": -1 },
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        self.users
            .insert_one(user, None)
            .await
            .map_err(|e| classify(e, "email"))?;
        Ok(())
    }

    async fn find_user(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self.users.find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.users.find_one(doc! { "email": email }, None).await?)
    }

    async fn replace_user(&self, user: &User) -> StoreResult<bool> {
        let result = self
            .users
            .replace_one(doc! { "_id": &user.id }, user, None)
            .await
            .map_err(|e| classify(e, "email"))?;
        Ok(result.matched_count == 1)
    }

    async fn recent_users(&self, limit: Option<i64>) -> StoreResult<Vec<User>> {
        let cursor = self
            .users
            .find(active_users(), newest_first(limit))
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn count_users(&self) -> StoreResult<u64> {
        Ok(self.users.count_documents(active_users(), None).await?)
    }

    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        self.products.insert_one(product, None).await?;
        Ok(())
    }

    async fn find_product(&self, id: &str) -> StoreResult<Option<Product>> {
        Ok(self.products.find_one(doc! { "_id": id }, None).await?)
    }

    async fn replace_product(&self, product: &Product) -> StoreResult<bool> {
        let result = self
            .products
            .replace_one(doc! { "_id": &product.id }, product, None)
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn delete_product(&self, id: &str) -> StoreResult<bool> {
        let result = self.products.delete_one(doc! { "_id": id }, None).await?;
        Ok(result.deleted_count == 1)
    }

    async fn search_products(&self, filter: &ProductFilter) -> StoreResult<(Vec<Product>, u64)> {
        let query = product_filter(filter);
        let total = self.products.count_documents(query.clone(), None).await?;

        let options = FindOptions::builder()
            .sort(product_sort(filter.sort))
            .skip(filter.skip())
            .limit(filter.limit as i64)
            .build();
        let cursor = self.products.find(query, options).await?;

        Ok((cursor.try_collect().await?, total))
    }

    async fn count_products(&self) -> StoreResult<u64> {
        Ok(self.products.count_documents(None, None).await?)
    }

    async fn adjust_stock(&self, product_id: &str, delta: i64) -> StoreResult<bool> {
        let update = doc! {
            "$inc": { "stock": delta },
            "$set": { "updatedAt": timestamp::format(&now()) },
        };
        let result = self
            .products
            .update_one(doc! { "_id": product_id }, update, None)
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        self.orders.insert_one(order, None).await?;
        Ok(())
    }

    async fn find_order(&self, id: &str) -> StoreResult<Option<Order>> {
        Ok(self.orders.find_one(doc! { "_id": id }, None).await?)
    }

    async fn replace_order(&self, order: &Order) -> StoreResult<bool> {
        let result = self
            .orders
            .replace_one(doc! { "_id": &order.id }, order, None)
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn orders_for_user(&self, user_id: &str) -> StoreResult<Vec<Order>> {
        let cursor = self
            .orders
            .find(doc! { "user": user_id }, newest_first(None))
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn recent_orders(&self, limit: Option<i64>) -> StoreResult<Vec<Order>> {
        let cursor = self.orders.find(None, newest_first(limit)).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn count_orders(&self) -> StoreResult<u64> {
        Ok(self.orders.count_documents(None, None).await?)
    }

    async fn count_undelivered_orders(&self) -> StoreResult<u64> {
        Ok(self
            .orders
            .count_documents(doc! { "isDelivered": false }, None)
            .await?)
    }

    async fn paid_order_revenue(&self) -> StoreResult<f64> {
        let mut cursor = self.orders.aggregate(paid_revenue_pipeline(), None).await?;
        match cursor.try_next().await? {
            Some(row) => Ok(bson::from_document::<Sum>(row)?.total),
            None => Ok(0.0),
        }
    }

    async fn insert_donation(&self, donation: &Donation) -> StoreResult<()> {
        self.donations.insert_one(donation, None).await?;
        Ok(())
    }

    async fn donations_for_user(&self, user_id: &str) -> StoreResult<Vec<Donation>> {
        let cursor = self
            .donations
            .find(doc! { "user": user_id }, newest_first(None))
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn recent_donations(&self, limit: Option<i64>) -> StoreResult<Vec<Donation>> {
        let cursor = self.donations.find(None, newest_first(limit)).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn count_donations(&self) -> StoreResult<u64> {
        Ok(self.donations.count_documents(None, None).await?)
    }

    async fn completed_donations_by_month(&self) -> StoreResult<Vec<MonthlyDonations>> {
        let rows: Vec<Document> = self
            .donations
            .aggregate(donation_months_pipeline(), None)
            .await?
            .try_collect()
            .await?;
        rows.into_iter()
            .map(|row| Ok(bson::from_document(row)?))
            .collect()
    }
}
