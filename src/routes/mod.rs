use actix_web::{web, HttpResponse, Responder};

pub mod admin;
pub mod donations;
pub mod orders;
pub mod payments;
pub mod products;
pub mod users;

async fn index() -> impl Responder {
    HttpResponse::Ok().body("VrudhaCare API is running...")
}

/// The full route table, shared by the server and the handler tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index)).service(
        web::scope("/api")
            .service(web::scope("/users").configure(users::configure))
            .service(web::scope("/auth").configure(users::configure))
            .service(web::scope("/products").configure(products::configure))
            .service(web::scope("/orders").configure(orders::configure))
            .service(web::scope("/payments").configure(payments::configure))
            .service(web::scope("/donations").configure(donations::configure))
            .service(web::scope("/admin").configure(admin::configure)),
    );
}
