use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::timestamp;
use crate::error::{AppError, FieldError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Clothing,
    Accessories,
    #[serde(rename = "Home Decor")]
    HomeDecor,
    #[serde(rename = "Art & Craft")]
    ArtAndCraft,
    Wellness,
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Clothing,
        Category::Accessories,
        Category::HomeDecor,
        Category::ArtAndCraft,
        Category::Wellness,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Clothing => "Clothing",
            Category::Accessories => "Accessories",
            Category::HomeDecor => "Home Decor",
            Category::ArtAndCraft => "Art & Craft",
            Category::Wellness => "Wellness",
            Category::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    #[serde(default)]
    pub public_id: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    pub category: Category,
    /// Goes negative when paid orders outrun inventory; there is no floor.
    pub stock: i64,
    pub maker: String,
    #[serde(default)]
    pub story: Option<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn from_input(id: String, input: ProductInput, at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: input.name,
            description: input.description,
            price: input.price,
            images: input.images,
            category: input.category,
            stock: input.stock,
            maker: input.maker,
            story: input.story,
            featured: input.featured,
            created_at: at,
            updated_at: at,
        }
    }

    pub fn apply(&mut self, input: ProductInput, at: DateTime<Utc>) {
        self.name = input.name;
        self.description = input.description;
        self.price = input.price;
        self.images = input.images;
        self.category = input.category;
        self.stock = input.stock;
        self.maker = input.maker;
        self.story = input.story;
        self.featured = input.featured;
        self.updated_at = at;
    }
}

/// Admin create/update body.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProductInput {
    #[validate(length(min = 1, max = 100, message = "Product name must be 1 to 100 characters"))]
    pub name: String,
    #[validate(length(min = 1, message = "Please enter product description"))]
    pub description: String,
    #[validate(range(min = 0.0, message = "Price cannot be less than 0"))]
    pub price: f64,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    pub category: Category,
    #[serde(default)]
    #[validate(range(min = 0, message = "Stock cannot be less than 0"))]
    pub stock: i64,
    #[validate(length(min = 1, message = "Please enter name of the resident who made this product"))]
    pub maker: String,
    #[serde(default)]
    pub story: Option<String>,
    #[serde(default)]
    pub featured: bool,
}

impl ProductInput {
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.description = self.description.trim().to_string();
        self.maker = self.maker.trim().to_string();
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProductSort {
    #[default]
    Newest,
    Oldest,
    PriceAsc,
    PriceDesc,
    NameAsc,
    NameDesc,
}

/// Raw `GET /api/products` query string.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub category: Option<Category>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub featured: Option<bool>,
    pub search: Option<String>,
    pub sort: Option<ProductSort>,
}

/// Checked listing filter handed to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductFilter {
    pub page: u64,
    pub limit: u64,
    pub category: Option<Category>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub featured: Option<bool>,
    pub search: Option<String>,
    pub sort: ProductSort,
}

pub const DEFAULT_PAGE_SIZE: u64 = 12;
pub const MAX_PAGE_SIZE: u64 = 100;
/// Highest listing page; `skip()` stays well inside the range MongoDB accepts.
pub const MAX_PAGE: u64 = 10_000;

impl ProductFilter {
    pub fn skip(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    pub fn pages(&self, total: u64) -> u64 {
        total.div_ceil(self.limit)
    }

    /// In-process form of the store query, shared by every `Store` implementation
    /// that cannot push the filter down.
    pub fn matches(&self, product: &Product) -> bool {
        if self.category.is_some_and(|c| c != product.category) {
            return false;
        }
        if self.min_price.is_some_and(|min| product.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price > max) {
            return false;
        }
        if self.featured.is_some_and(|f| f != product.featured) {
            return false;
        }
        match &self.search {
            Some(term) => {
                let term = term.to_lowercase();
                product.name.to_lowercase().contains(&term)
                    || product.description.to_lowercase().contains(&term)
            }
            None => true,
        }
    }
}

impl TryFrom<ProductQuery> for ProductFilter {
    type Error = AppError;

    fn try_from(query: ProductQuery) -> Result<Self, Self::Error> {
        let mut errors = Vec::new();

        let page = query.page.unwrap_or(1);
        if page == 0 || page > MAX_PAGE {
            errors.push(FieldError::new(
                "page",
                format!("Page must be between 1 and {}", MAX_PAGE),
            ));
        }
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if limit == 0 || limit > MAX_PAGE_SIZE {
            errors.push(FieldError::new(
                "limit",
                format!("Limit must be between 1 and {}", MAX_PAGE_SIZE),
            ));
        }
        if let (Some(min), Some(max)) = (query.min_price, query.max_price) {
            if min > max {
                errors.push(FieldError::new(
                    "minPrice",
                    "Minimum price cannot exceed maximum price",
                ));
            }
        }
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        Ok(Self {
            page,
            limit,
            category: query.category,
            min_price: query.min_price,
            max_price: query.max_price,
            featured: query.featured,
            search: query
                .search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            sort: query.sort.unwrap_or_default(),
        })
    }
}
