use actix_web::{web, HttpResponse};
use serde_json::json;
use validator::Validate;

use crate::app::AppState;
use crate::error::{AppError, Result};
use crate::middleware::AuthMiddleware;
use crate::models::{new_id, now, Category, Product, ProductFilter, ProductInput, ProductQuery};

fn not_found() -> AppError {
    AppError::NotFound("Product not found".to_string())
}

async fn list_products(
    state: web::Data<AppState>,
    query: web::Query<ProductQuery>,
) -> Result<HttpResponse> {
    let filter = ProductFilter::try_from(query.into_inner())?;
    let (products, total) = state.store.search_products(&filter).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "products": products,
        "total": total,
        "page": filter.page,
        "pages": filter.pages(total),
    })))
}

async fn categories() -> HttpResponse {
    let names: Vec<&str> = Category::ALL.iter().map(Category::as_str).collect();
    HttpResponse::Ok().json(json!({ "success": true, "categories": names }))
}

async fn get_product(state: web::Data<AppState>, id: web::Path<String>) -> Result<HttpResponse> {
    let product = state.store.find_product(&id).await?.ok_or_else(not_found)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "product": product })))
}

async fn create_product(
    state: web::Data<AppState>,
    input: web::Json<ProductInput>,
) -> Result<HttpResponse> {
    let input = input.into_inner().normalized();
    input.validate()?;

    let product = Product::from_input(new_id(), input, now());
    state.store.insert_product(&product).await?;

    log::info!("Created product {} ({})", product.id, product.name);
    Ok(HttpResponse::Created().json(json!({ "success": true, "product": product })))
}

async fn update_product(
    state: web::Data<AppState>,
    id: web::Path<String>,
    input: web::Json<ProductInput>,
) -> Result<HttpResponse> {
    let input = input.into_inner().normalized();
    input.validate()?;

    let mut product = state.store.find_product(&id).await?.ok_or_else(not_found)?;
    product.apply(input, now());
    if !state.store.replace_product(&product).await? {
        return Err(not_found());
    }

    Ok(HttpResponse::Ok().json(json!({ "success": true, "product": product })))
}

async fn delete_product(state: web::Data<AppState>, id: web::Path<String>) -> Result<HttpResponse> {
    if !state.store.delete_product(&id).await? {
        return Err(not_found());
    }

    log::info!("Deleted product {}", id);
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Product removed",
    })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("", web::get().to(list_products))
        .route("/categories", web::get().to(categories))
        .route("/{id}", web::get().to(get_product))
        .route(
            "",
            web::post().to(create_product).wrap(AuthMiddleware::admin()),
        )
        .route(
            "/{id}",
            web::put().to(update_product).wrap(AuthMiddleware::admin()),
        )
        .route(
            "/{id}",
            web::delete().to(delete_product).wrap(AuthMiddleware::admin()),
        );
}
