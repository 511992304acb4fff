use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::app::AppState;
use crate::error::Result;
use crate::middleware::{AuthMiddleware, CurrentUser};
use crate::models::DonationInput;
use crate::services::donations;

async fn create_donation(
    state: web::Data<AppState>,
    donor: Option<CurrentUser>,
    input: web::Json<DonationInput>,
) -> Result<HttpResponse> {
    let donor = donor.map(|CurrentUser(user)| user);
    let donation = donations::record_donation(
        state.store.as_ref(),
        &state.payment_secret,
        state.policy.donation_signature,
        input.into_inner(),
        donor.as_ref(),
    )
    .await?;

    Ok(HttpResponse::Created().json(json!({ "success": true, "donation": donation })))
}

async fn my_donations(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<HttpResponse> {
    let donations = state.store.donations_for_user(&user.id).await?;
    Ok(HttpResponse::Ok().json(donations))
}

async fn all_donations(state: web::Data<AppState>) -> Result<HttpResponse> {
    let donations = state.store.recent_donations(None).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "donations": donations })))
}

async fn donation_stats(state: web::Data<AppState>) -> Result<HttpResponse> {
    let months = state.store.completed_donations_by_month().await?;
    Ok(HttpResponse::Ok().json(donations::summarize(months)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "",
        web::post()
            .to(create_donation)
            .wrap(AuthMiddleware::optional()),
    )
    .route(
        "/mydonations",
        web::get()
            .to(my_donations)
            .wrap(AuthMiddleware::authenticated()),
    )
    .route("", web::get().to(all_donations).wrap(AuthMiddleware::admin()))
    .route(
        "/stats",
        web::get().to(donation_stats).wrap(AuthMiddleware::admin()),
    );
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::{json, Value};

    use super::*;
    use crate::config::{DonationSignaturePolicy, PolicyConfig};
    use crate::models::Role;
    use crate::services::razorpay::payment_signature;
    use crate::testing::{self, Harness, PAYMENT_SECRET};

    fn gift(amount: f64) -> Value {
        json!({
            "name": "Meera",
            "email": "meera@example.com",
            "amount": amount,
            "message": "For the library",
            "paymentId": "pay_don_1",
        })
    }

    #[actix_web::test]
    async fn donations_are_public_and_attach_the_donor() {
        let h = Harness::new();
        let user = testing::user("Meera", "meera@example.com", Role::User);
        let auth = h.sign_in(&user).await;
        let app = test::init_service(App::new().configure(h.mount())).await;

        let req = test::TestRequest::post()
            .uri("/api/donations")
            .set_json(gift(500.0))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["donation"]["status"], "completed");
        assert!(body["donation"]["user"].is_null());

        let req = test::TestRequest::post()
            .uri("/api/donations")
            .insert_header(("Authorization", auth.clone()))
            .set_json(gift(250.0))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::CREATED
        );

        let req = test::TestRequest::get()
            .uri("/api/donations/mydonations")
            .insert_header(("Authorization", auth))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let mine = body.as_array().unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0]["amount"], 250.0);
    }

    #[actix_web::test]
    async fn signature_proof_is_checked_when_present() {
        let h = Harness::new();
        let app = test::init_service(App::new().configure(h.mount())).await;

        let mut forged = gift(500.0);
        forged["razorpayOrderId"] = json!("order_don_1");
        forged["razorpaySignature"] = json!("f".repeat(64));
        let req = test::TestRequest::post()
            .uri("/api/donations")
            .set_json(forged)
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );
        assert!(h.store.donations().is_empty());

        let mut signed = gift(500.0);
        signed["razorpayOrderId"] = json!("order_don_1");
        signed["razorpaySignature"] =
            json!(payment_signature(PAYMENT_SECRET, "order_don_1", "pay_don_1"));
        let req = test::TestRequest::post()
            .uri("/api/donations")
            .set_json(signed)
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::CREATED
        );
    }

    #[actix_web::test]
    async fn required_policy_refuses_unsigned_donations() {
        let h = Harness::with_policy(PolicyConfig {
            donation_signature: DonationSignaturePolicy::Required,
            ..PolicyConfig::default()
        });
        let app = test::init_service(App::new().configure(h.mount())).await;

        let req = test::TestRequest::post()
            .uri("/api/donations")
            .set_json(gift(500.0))
            .to_request();

        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );
        assert!(h.store.donations().is_empty());
    }

    #[actix_web::test]
    async fn admin_views_history_and_stats() {
        let h = Harness::new();
        let admin = testing::user("Admin", "admin@example.com", Role::Admin);
        let user = testing::user("Meera", "meera@example.com", Role::User);
        let admin_auth = h.sign_in(&admin).await;
        let user_auth = h.sign_in(&user).await;
        let app = test::init_service(App::new().configure(h.mount())).await;

        for amount in [100.0, 400.0] {
            let req = test::TestRequest::post()
                .uri("/api/donations")
                .set_json(gift(amount))
                .to_request();
            test::call_service(&app, req).await;
        }

        let req = test::TestRequest::get()
            .uri("/api/donations/stats")
            .insert_header(("Authorization", user_auth))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::FORBIDDEN
        );

        let req = test::TestRequest::get()
            .uri("/api/donations")
            .insert_header(("Authorization", admin_auth.clone()))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["donations"].as_array().unwrap().len(), 2);

        let req = test::TestRequest::get()
            .uri("/api/donations/stats")
            .insert_header(("Authorization", admin_auth))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["totalDonations"], 2);
        assert_eq!(body["totalAmount"], 500.0);
        assert_eq!(body["monthlyDonations"][0]["count"], 2);
    }
}
