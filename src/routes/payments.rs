use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::app::AppState;
use crate::error::{AppError, Result};
use crate::middleware::{AuthMiddleware, CurrentUser};
use crate::services::checkout::{self, InitiatePaymentRequest, PaymentConfirmation, VerificationOutcome};

async fn create_payment_order(
    state: web::Data<AppState>,
    input: web::Json<InitiatePaymentRequest>,
) -> Result<HttpResponse> {
    let order = checkout::initiate_payment(state.gateway.as_ref(), input.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "order": order })))
}

async fn verify_payment(
    state: web::Data<AppState>,
    buyer: Option<CurrentUser>,
    input: web::Json<PaymentConfirmation>,
) -> Result<HttpResponse> {
    let buyer = buyer.map(|CurrentUser(user)| user);
    let outcome = checkout::verify_and_materialize(
        state.store.as_ref(),
        &state.payment_secret,
        input.into_inner(),
        buyer.as_ref(),
    )
    .await?;

    match outcome {
        VerificationOutcome::OrderCreated {
            order_id,
            payment_id,
        } => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Payment verified successfully",
            "_id": order_id,
            "paymentId": payment_id,
        }))),
        VerificationOutcome::SignatureMismatch => Err(AppError::SignatureMismatch),
        VerificationOutcome::ValidationFailed(errors) => Err(AppError::Validation(errors)),
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/razorpay",
        web::post()
            .to(create_payment_order)
            .wrap(AuthMiddleware::authenticated()),
    )
    .route(
        "/razorpay/verify",
        web::post().to(verify_payment).wrap(AuthMiddleware::optional()),
    );
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::{json, Value};

    use super::*;
    use crate::models::Role;
    use crate::services::razorpay::payment_signature;
    use crate::store::Store;
    use crate::testing::{self, Harness, StubGateway, PAYMENT_SECRET};

    fn confirmation(signature: &str) -> Value {
        json!({
            "razorpay_order_id": "order_test_1",
            "razorpay_payment_id": "pay_test_1",
            "razorpay_signature": signature,
            "orderData": testing::order_json("razorpay"),
        })
    }

    async fn seeded() -> Harness {
        let h = Harness::new();
        h.store.insert_product(&testing::product("p-shawl", 599.0, 10)).await.unwrap();
        h.store.insert_product(&testing::product("p-candle", 399.0, 5)).await.unwrap();
        h
    }

    #[actix_web::test]
    async fn creating_a_gateway_order_needs_login() {
        let h = Harness::new();
        let user = testing::user("Asha", "asha@example.com", Role::User);
        let auth = h.sign_in(&user).await;
        let app = test::init_service(App::new().configure(h.mount())).await;

        let req = test::TestRequest::post()
            .uri("/api/payments/razorpay")
            .set_json(json!({ "amount": 1447 }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNAUTHORIZED
        );

        let req = test::TestRequest::post()
            .uri("/api/payments/razorpay")
            .insert_header(("Authorization", auth))
            .set_json(json!({ "amount": 1447 }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["success"], true);
        assert_eq!(body["order"]["id"], "order_test_1");
        assert_eq!(body["order"]["amount"], 144_700);
        assert_eq!(body["order"]["receipt"], "order_receipt");
        assert_eq!(h.gateway.requests()[0].amount, 144_700);
    }

    #[actix_web::test]
    async fn gateway_failure_is_a_bad_gateway() {
        let h = Harness::with_gateway(StubGateway::failing());
        let user = testing::user("Asha", "asha@example.com", Role::User);
        let auth = h.sign_in(&user).await;
        let app = test::init_service(App::new().configure(h.mount())).await;

        let req = test::TestRequest::post()
            .uri("/api/payments/razorpay")
            .insert_header(("Authorization", auth))
            .set_json(json!({ "amount": 10 }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
    }

    #[actix_web::test]
    async fn verified_payment_creates_one_paid_order_and_moves_stock() {
        let h = seeded().await;
        let app = test::init_service(App::new().configure(h.mount())).await;
        let signature = payment_signature(PAYMENT_SECRET, "order_test_1", "pay_test_1");

        let req = test::TestRequest::post()
            .uri("/api/payments/razorpay/verify")
            .set_json(confirmation(&signature))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Payment verified successfully");
        assert_eq!(body["paymentId"], "pay_test_1");

        let orders = h.store.orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(body["_id"], orders[0].id.as_str());
        assert!(orders[0].is_paid);
        assert_eq!(orders[0].total_price, 1447.0);
        assert_eq!(h.store.find_product("p-candle").await.unwrap().unwrap().stock, 3);
        assert_eq!(h.store.find_product("p-shawl").await.unwrap().unwrap().stock, 9);
    }

    #[actix_web::test]
    async fn logged_in_buyer_owns_the_verified_order() {
        let h = seeded().await;
        let user = testing::user("Asha", "asha@example.com", Role::User);
        let auth = h.sign_in(&user).await;
        let app = test::init_service(App::new().configure(h.mount())).await;
        let signature = payment_signature(PAYMENT_SECRET, "order_test_1", "pay_test_1");

        let req = test::TestRequest::post()
            .uri("/api/payments/razorpay/verify")
            .insert_header(("Authorization", auth))
            .set_json(confirmation(&signature))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        assert_eq!(h.store.orders_for_user(&user.id).await.unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn wrong_signature_persists_nothing() {
        let h = seeded().await;
        let app = test::init_service(App::new().configure(h.mount())).await;
        let forged = payment_signature("not-the-secret", "order_test_1", "pay_test_1");

        let req = test::TestRequest::post()
            .uri("/api/payments/razorpay/verify")
            .set_json(confirmation(&forged))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(
            body,
            json!({ "success": false, "message": "Payment verification failed" })
        );
        assert!(h.store.orders().is_empty());
        assert_eq!(h.store.find_product("p-candle").await.unwrap().unwrap().stock, 5);
    }

    #[actix_web::test]
    async fn signed_payment_without_order_data() {
        let h = seeded().await;
        let app = test::init_service(App::new().configure(h.mount())).await;
        let signature = payment_signature(PAYMENT_SECRET, "order_test_1", "pay_test_1");

        let req = test::TestRequest::post()
            .uri("/api/payments/razorpay/verify")
            .set_json(json!({
                "razorpay_order_id": "order_test_1",
                "razorpay_payment_id": "pay_test_1",
                "razorpay_signature": signature,
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Order data is required");
        assert!(h.store.orders().is_empty());
    }
}
