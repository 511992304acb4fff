use std::cmp::Reverse;

use validator::Validate;

use super::razorpay::verify_payment_signature;
use crate::config::DonationSignaturePolicy;
use crate::error::{AppError, Result};
use crate::models::{
    new_id, now, Donation, DonationInput, DonationStats, DonationStatus, MonthlyDonations, User,
};
use crate::store::Store;

const STATS_MONTHS: usize = 12;

/// Records a completed donation.
///
/// Gateway proof is checked whenever the client sends it. Without proof the
/// outcome depends on `policy`: `Optional` trusts the payment id as the
/// storefront always has, `Required` refuses the donation.
pub async fn record_donation(
    store: &dyn Store,
    secret: &str,
    policy: DonationSignaturePolicy,
    input: DonationInput,
    donor: Option<&User>,
) -> Result<Donation> {
    let input = input.normalized();
    input.validate()?;

    let order_id = input.razorpay_order_id.as_deref().filter(|s| !s.is_empty());
    let signature = input.razorpay_signature.as_deref().filter(|s| !s.is_empty());

    match (order_id, signature) {
        (Some(order_id), Some(signature)) => {
            if !verify_payment_signature(secret, order_id, &input.payment_id, signature) {
                log::warn!("Rejected donation signature for payment {}", input.payment_id);
                return Err(AppError::SignatureMismatch);
            }
        }
        _ if policy == DonationSignaturePolicy::Required => {
            return Err(AppError::BadRequest(
                "Payment signature is required".to_string(),
            ));
        }
        _ => log::warn!(
            "Recording donation for payment {} without signature proof",
            input.payment_id
        ),
    }

    let donation = Donation {
        id: new_id(),
        name: input.name,
        email: input.email,
        amount: input.amount,
        message: input.message,
        payment_id: input.payment_id,
        user: donor.map(|u| u.id.clone()),
        status: DonationStatus::Completed,
        created_at: now(),
    };
    store.insert_donation(&donation).await?;

    log::info!("Donation {} of {:.2} recorded", donation.id, donation.amount);
    Ok(donation)
}

/// Totals over the monthly buckets of completed donations, keeping the latest
/// twelve months.
pub fn summarize(mut months: Vec<MonthlyDonations>) -> DonationStats {
    months.sort_by_key(|m| Reverse((m.id.year, m.id.month)));

    let total_donations = months.iter().map(|m| m.count).sum();
    let total_amount = months.iter().map(|m| m.total).sum();
    months.truncate(STATS_MONTHS);

    DonationStats {
        success: true,
        total_donations,
        total_amount,
        monthly_donations: months,
    }
}
