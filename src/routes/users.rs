use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::app::AppState;
use crate::auth::{hash_password, verify_dummy_password, verify_password};
use crate::config::Environment;
use crate::error::{AppError, Result};
use crate::middleware::{AuthMiddleware, CurrentUser};
use crate::models::{
    new_id, normalize_email, now, AdminToggle, AuthResponse, PasswordChange, ProfileUpdate, Role,
    SignInInput, SignUpInput, User, UserProfile,
};
use crate::store::StoreError;

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid credentials".to_string())
}

fn user_exists() -> AppError {
    AppError::Conflict("User with this email already exists".to_string())
}

async fn register(state: web::Data<AppState>, input: web::Json<SignUpInput>) -> Result<HttpResponse> {
    let input = input.into_inner().normalized();
    input.validate()?;

    if state.store.find_user_by_email(&input.email).await?.is_some() {
        return Err(user_exists());
    }

    let user = User {
        id: new_id(),
        name: input.name,
        email: input.email,
        password: hash_password(&input.password)?,
        phone: input.phone,
        address: input.address,
        role: Role::User,
        created_at: now(),
        deleted_at: None,
    };

    match state.store.insert_user(&user).await {
        Ok(()) => {}
        Err(StoreError::Duplicate(_)) => return Err(user_exists()),
        Err(e) => return Err(e.into()),
    }

    log::info!("Registered user {}", user.id);
    let token = state.tokens.issue(&user.id)?;
    Ok(HttpResponse::Created().json(AuthResponse::new(token, &user)))
}

async fn login(state: web::Data<AppState>, input: web::Json<SignInInput>) -> Result<HttpResponse> {
    let input = input.into_inner();
    let (email, password) = match (input.email, input.password) {
        (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => {
            (normalize_email(&email), password)
        }
        _ => {
            return Err(AppError::BadRequest(
                "Please provide email and password".to_string(),
            ))
        }
    };

    let user = match state
        .store
        .find_user_by_email(&email)
        .await?
        .filter(User::is_active)
    {
        Some(user) => user,
        None => {
            // Unknown accounts cost one argon2 verify as well.
            verify_dummy_password(&password);
            return Err(invalid_credentials());
        }
    };

    if !verify_password(&user.password, &password) {
        return Err(invalid_credentials());
    }

    let token = state.tokens.issue(&user.id)?;
    Ok(HttpResponse::Ok().json(AuthResponse::new(token, &user)))
}

async fn profile(CurrentUser(user): CurrentUser) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "user": UserProfile::from(&user),
    })))
}

async fn update_profile(
    state: web::Data<AppState>,
    CurrentUser(mut user): CurrentUser,
    input: web::Json<ProfileUpdate>,
) -> Result<HttpResponse> {
    let input = input.into_inner().normalized();
    input.validate()?;

    if let Some(name) = input.name {
        user.name = name;
    }
    if let Some(email) = input.email {
        if email != user.email {
            if let Some(owner) = state.store.find_user_by_email(&email).await? {
                if owner.id != user.id {
                    return Err(AppError::Conflict("Email is already in use".to_string()));
                }
            }
            user.email = email;
        }
    }
    if input.phone.is_some() {
        user.phone = input.phone;
    }
    if input.address.is_some() {
        user.address = input.address;
    }

    if !state.store.replace_user(&user).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "user": UserProfile::from(&user),
    })))
}

async fn change_password(
    state: web::Data<AppState>,
    CurrentUser(mut user): CurrentUser,
    input: web::Json<PasswordChange>,
) -> Result<HttpResponse> {
    let input = input.into_inner();
    input.validate()?;

    if !verify_password(&user.password, &input.current_password) {
        return Err(AppError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    user.password = hash_password(&input.new_password)?;
    state.store.replace_user(&user).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Password updated successfully",
    })))
}

async fn list_users(state: web::Data<AppState>) -> Result<HttpResponse> {
    let users: Vec<UserProfile> = state
        .store
        .recent_users(None)
        .await?
        .iter()
        .map(UserProfile::from)
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": users.len(),
        "users": users,
    })))
}

async fn active_user(state: &AppState, id: &str) -> Result<User> {
    state
        .store
        .find_user(id)
        .await?
        .filter(User::is_active)
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

async fn delete_user(
    state: web::Data<AppState>,
    CurrentUser(admin): CurrentUser,
    id: web::Path<String>,
) -> Result<HttpResponse> {
    let id = id.into_inner();
    if id == admin.id {
        return Err(AppError::BadRequest(
            "You cannot delete your own account".to_string(),
        ));
    }

    let mut user = active_user(&state, &id).await?;
    user.deleted_at = Some(now());
    state.store.replace_user(&user).await?;

    log::info!("User {} deleted by admin {}", user.id, admin.id);
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "User removed",
    })))
}

async fn set_admin(
    state: web::Data<AppState>,
    id: web::Path<String>,
    input: web::Json<AdminToggle>,
) -> Result<HttpResponse> {
    let mut user = active_user(&state, &id).await?;
    user.role = if input.is_admin { Role::Admin } else { Role::User };
    state.store.replace_user(&user).await?;

    log::info!("User {} role set to {:?}", user.id, user.role);
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "user": UserProfile::from(&user),
    })))
}

#[derive(Debug, Deserialize)]
struct AdminBootstrap {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

/// Development-only shortcut for creating the first admin.
async fn create_admin(
    state: web::Data<AppState>,
    input: web::Json<AdminBootstrap>,
) -> Result<HttpResponse> {
    if state.environment == Environment::Production {
        return Err(AppError::Forbidden(
            "This endpoint is not available in production".to_string(),
        ));
    }

    let input = input.into_inner();
    let (name, email, password) = match (input.name, input.email, input.password) {
        (Some(name), Some(email), Some(password))
            if !name.trim().is_empty() && !email.trim().is_empty() && !password.is_empty() =>
        {
            (name.trim().to_string(), normalize_email(&email), password)
        }
        _ => {
            return Err(AppError::BadRequest(
                "Please provide name, email and password".to_string(),
            ))
        }
    };

    if let Some(mut user) = state.store.find_user_by_email(&email).await? {
        if user.is_admin() {
            return Err(AppError::BadRequest(
                "Admin user with this email already exists".to_string(),
            ));
        }
        user.role = Role::Admin;
        state.store.replace_user(&user).await?;
        return Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": format!("User {} upgraded to admin role", email),
        })));
    }

    let admin = User {
        id: new_id(),
        name,
        email,
        password: hash_password(&password)?,
        phone: None,
        address: None,
        role: Role::Admin,
        created_at: now(),
        deleted_at: None,
    };
    state.store.insert_user(&admin).await?;

    log::info!("Created admin user {}", admin.id);
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": format!("Admin user created successfully: {}", admin.email),
    })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/register", web::post().to(register))
        .route("/login", web::post().to(login))
        .route("/create-admin", web::post().to(create_admin))
        .route(
            "/profile",
            web::get().to(profile).wrap(AuthMiddleware::authenticated()),
        )
        .route(
            "/profile",
            web::put()
                .to(update_profile)
                .wrap(AuthMiddleware::authenticated()),
        )
        .route(
            "/password",
            web::put()
                .to(change_password)
                .wrap(AuthMiddleware::authenticated()),
        )
        .route("", web::get().to(list_users).wrap(AuthMiddleware::admin()))
        .route(
            "/{id}",
            web::delete().to(delete_user).wrap(AuthMiddleware::admin()),
        )
        .route(
            "/{id}/admin",
            web::put().to(set_admin).wrap(AuthMiddleware::admin()),
        );
}
