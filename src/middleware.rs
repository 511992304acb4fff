use std::rc::Rc;

use actix_service::{forward_ready, Service};
use actix_web::body::EitherBody;
use actix_web::dev::{Payload, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, Error, FromRequest, HttpMessage, HttpRequest, ResponseError};
use futures::future::{ok, ready, LocalBoxFuture, Ready};

use crate::app::AppState;
use crate::auth::bearer_token;
use crate::error::AppError;
use crate::models::User;

/// The user resolved from the bearer token, stored in request extensions.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<CurrentUser>()
                .cloned()
                .ok_or_else(|| AppError::Unauthorized("Not authorized, no token".to_string())),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gate {
    /// Attach the user when a valid token is present, never reject.
    Optional,
    Authenticated,
    Admin,
}

pub struct AuthMiddleware {
    gate: Gate,
}

impl AuthMiddleware {
    pub fn optional() -> Self {
        AuthMiddleware { gate: Gate::Optional }
    }

    pub fn authenticated() -> Self {
        AuthMiddleware { gate: Gate::Authenticated }
    }

    pub fn admin() -> Self {
        AuthMiddleware { gate: Gate::Admin }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddlewareService {
            service: Rc::new(service),
            gate: self.gate,
        })
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    gate: Gate,
}

async fn resolve_user(req: &ServiceRequest) -> Result<User, AppError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::Internal("application state missing".to_string()))?;

    let token = bearer_token(req.headers().get(AUTHORIZATION))?;
    let claims = state.tokens.verify(token)?;

    state
        .store
        .find_user(&claims.sub)
        .await?
        .filter(User::is_active)
        .ok_or_else(|| AppError::Unauthorized("Not authorized, user not found".to_string()))
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let gate = self.gate;

        Box::pin(async move {
            let checked = match (resolve_user(&req).await, gate) {
                (Ok(user), Gate::Admin) if !user.is_admin() => Err(AppError::Forbidden(
                    "Not authorized as an admin".to_string(),
                )),
                (Ok(user), _) => Ok(Some(user)),
                (Err(_), Gate::Optional) => Ok(None),
                (Err(e), _) => Err(e),
            };

            match checked {
                Ok(user) => {
                    if let Some(user) = user {
                        req.extensions_mut().insert(CurrentUser(user));
                    }
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                Err(e) => {
                    let response = e.error_response();
                    Ok(req.into_response(response).map_into_right_body())
                }
            }
        })
    }
}
