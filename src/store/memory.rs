use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Datelike;

use super::{Store, StoreError, StoreResult};
use crate::models::{
    Donation, DonationStatus, MonthKey, MonthlyDonations, Order, Product, ProductFilter,
    ProductSort, User,
};

/// In-process `Store` used by the handler tests.
#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<Vec<User>>,
    products: Mutex<Vec<Product>>,
    orders: Mutex<Vec<Order>>,
    donations: Mutex<Vec<Donation>>,
}

fn newest_first<T: Clone>(items: &[T], created: impl Fn(&T) -> chrono::DateTime<chrono::Utc>) -> Vec<T> {
    let mut items = items.to_vec();
    items.sort_by_key(|item| std::cmp::Reverse(created(item)));
    items
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn orders(&self) -> Vec<Order> {
        self.orders.lock().unwrap().clone()
    }

    pub fn donations(&self) -> Vec<Donation> {
        self.donations.lock().unwrap().clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate("email".to_string()));
        }
        users.push(user.clone());
        Ok(())
    }

    async fn find_user(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn replace_user(&self, user: &User) -> StoreResult<bool> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email && u.id != user.id) {
            return Err(StoreError::Duplicate("email".to_string()));
        }
        match users.iter_mut().find(|u| u.id == user.id) {
            Some(slot) => {
                *slot = user.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn recent_users(&self, limit: Option<i64>) -> StoreResult<Vec<User>> {
        let users = self.users.lock().unwrap();
        let active: Vec<User> = users.iter().filter(|u| u.is_active()).cloned().collect();
        let sorted: Vec<User> = newest_first(&active, |u| u.created_at);
        Ok(sorted.into_iter().take(limit_of(limit)).collect())
    }

    async fn count_users(&self) -> StoreResult<u64> {
        Ok(self.users.lock().unwrap().iter().filter(|u| u.is_active()).count() as u64)
    }

    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        self.products.lock().unwrap().push(product.clone());
        Ok(())
    }

    async fn find_product(&self, id: &str) -> StoreResult<Option<Product>> {
        Ok(self
            .products
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn replace_product(&self, product: &Product) -> StoreResult<bool> {
        let mut products = self.products.lock().unwrap();
        match products.iter_mut().find(|p| p.id == product.id) {
            Some(slot) => {
                *slot = product.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_product(&self, id: &str) -> StoreResult<bool> {
        let mut products = self.products.lock().unwrap();
        let before = products.len();
        products.retain(|p| p.id != id);
        Ok(products.len() != before)
    }

    async fn search_products(&self, filter: &ProductFilter) -> StoreResult<(Vec<Product>, u64)> {
        let mut matching: Vec<Product> = self
            .products
            .lock()
            .unwrap()
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();

        match filter.sort {
            ProductSort::Newest => matching.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            ProductSort::Oldest => matching.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            ProductSort::PriceAsc => matching.sort_by(|a, b| a.price.total_cmp(&b.price)),
            ProductSort::PriceDesc => matching.sort_by(|a, b| b.price.total_cmp(&a.price)),
            ProductSort::NameAsc => matching.sort_by(|a, b| a.name.cmp(&b.name)),
            ProductSort::NameDesc => matching.sort_by(|a, b| b.name.cmp(&a.name)),
        }

        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(filter.skip() as usize)
            .take(filter.limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn count_products(&self) -> StoreResult<u64> {
        Ok(self.products.lock().unwrap().len() as u64)
    }

    async fn adjust_stock(&self, product_id: &str, delta: i64) -> StoreResult<bool> {
        let mut products = self.products.lock().unwrap();
        match products.iter_mut().find(|p| p.id == product_id) {
            Some(product) => {
                product.stock += delta;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        self.orders.lock().unwrap().push(order.clone());
        Ok(())
    }

    async fn find_order(&self, id: &str) -> StoreResult<Option<Order>> {
        Ok(self.orders.lock().unwrap().iter().find(|o| o.id == id).cloned())
    }

    async fn replace_order(&self, order: &Order) -> StoreResult<bool> {
        let mut orders = self.orders.lock().unwrap();
        match orders.iter_mut().find(|o| o.id == order.id) {
            Some(slot) => {
                *slot = order.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn orders_for_user(&self, user_id: &str) -> StoreResult<Vec<Order>> {
        let orders = self.orders.lock().unwrap();
        let mine: Vec<Order> = orders.iter().filter(|o| o.is_owned_by(user_id)).cloned().collect();
        Ok(newest_first(&mine, |o| o.created_at))
    }

    async fn recent_orders(&self, limit: Option<i64>) -> StoreResult<Vec<Order>> {
        let orders = self.orders.lock().unwrap();
        let sorted = newest_first(orders.as_slice(), |o| o.created_at);
        Ok(sorted.into_iter().take(limit_of(limit)).collect())
    }

    async fn count_orders(&self) -> StoreResult<u64> {
        Ok(self.orders.lock().unwrap().len() as u64)
    }

    async fn count_undelivered_orders(&self) -> StoreResult<u64> {
        let orders = self.orders.lock().unwrap();
        Ok(orders.iter().filter(|o| !o.is_delivered).count() as u64)
    }

    async fn paid_order_revenue(&self) -> StoreResult<f64> {
        let orders = self.orders.lock().unwrap();
        Ok(orders.iter().filter(|o| o.is_paid).map(|o| o.total_price).sum())
    }

    async fn insert_donation(&self, donation: &Donation) -> StoreResult<()> {
        self.donations.lock().unwrap().push(donation.clone());
        Ok(())
    }

    async fn donations_for_user(&self, user_id: &str) -> StoreResult<Vec<Donation>> {
        let donations = self.donations.lock().unwrap();
        let mine: Vec<Donation> = donations
            .iter()
            .filter(|d| d.user.as_deref() == Some(user_id))
            .cloned()
            .collect();
        Ok(newest_first(&mine, |d| d.created_at))
    }

    async fn recent_donations(&self, limit: Option<i64>) -> StoreResult<Vec<Donation>> {
        let donations = self.donations.lock().unwrap();
        let sorted = newest_first(donations.as_slice(), |d| d.created_at);
        Ok(sorted.into_iter().take(limit_of(limit)).collect())
    }

    async fn count_donations(&self) -> StoreResult<u64> {
        Ok(self.donations.lock().unwrap().len() as u64)
    }

    async fn completed_donations_by_month(&self) -> StoreResult<Vec<MonthlyDonations>> {
        let donations = self.donations.lock().unwrap();
        let mut months: BTreeMap<(i32, u32), (u64, f64)> = BTreeMap::new();
        for donation in donations
            .iter()
            .filter(|d| d.status == DonationStatus::Completed)
        {
            let key = (donation.created_at.year(), donation.created_at.month());
            let slot = months.entry(key).or_insert((0, 0.0));
            slot.0 += 1;
            slot.1 += donation.amount;
        }

        Ok(months
            .into_iter()
            .rev()
            .map(|((year, month), (count, total))| MonthlyDonations {
                id: MonthKey { month, year },
                count,
                total,
            })
            .collect())
    }
}

fn limit_of(limit: Option<i64>) -> usize {
    limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX)
}
