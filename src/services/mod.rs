pub mod checkout;
pub mod donations;
pub mod razorpay;
