use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::timestamp;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DonationStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Donation {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub amount: f64,
    #[serde(default)]
    pub message: Option<String>,
    pub payment_id: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub status: DonationStatus,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DonationInput {
    #[validate(length(min = 1, message = "Please enter your name"))]
    pub name: String,
    #[validate(email(message = "Please enter a valid email"))]
    pub email: String,
    #[validate(range(min = 1.0, message = "Donation amount cannot be less than 1"))]
    pub amount: f64,
    #[serde(default)]
    pub message: Option<String>,
    #[validate(length(min = 1, message = "Payment ID is required"))]
    pub payment_id: String,
    /// Gateway order id, needed with `razorpay_signature` to verify the payment.
    #[serde(default)]
    pub razorpay_order_id: Option<String>,
    #[serde(default)]
    pub razorpay_signature: Option<String>,
}

impl DonationInput {
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.email = self.email.trim().to_string();
        self.payment_id = self.payment_id.trim().to_string();
        self.message = self
            .message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthKey {
    pub month: u32,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyDonations {
    #[serde(rename = "_id")]
    pub id: MonthKey,
    pub count: u64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationStats {
    pub success: bool,
    pub total_donations: u64,
    pub total_amount: f64,
    pub monthly_donations: Vec<MonthlyDonations>,
}
