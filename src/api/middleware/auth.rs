use std::future::{ready, Future, Ready};
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;

use actix_web::dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{web, Error, FromRequest, HttpMessage, HttpRequest};
use tracing::warn;

use crate::store::models::AuthUser;
use crate::store::TokenVerifier;

/// Routes served without a bearer token.
const PUBLIC_PATHS: &[&str] = &["/", "/health", "/api/models"];

pub struct RequireAuth;

impl<S, B> Transform<S, ServiceRequest> for RequireAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireAuthMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct RequireAuthMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequireAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();

        if req.method() == actix_web::http::Method::OPTIONS
            || PUBLIC_PATHS.contains(&req.path())
        {
            return Box::pin(async move { srv.call(req).await });
        }

        let verifier = match req.app_data::<web::Data<Arc<dyn TokenVerifier>>>() {
            Some(v) => v.get_ref().clone(),
            None => {
                warn!("TokenVerifier missing in app_data");
                return Box::pin(async move {
                    Err(actix_web::error::ErrorInternalServerError(
                        "Configuration error",
                    ))
                });
            }
        };

        let token = req
            .headers()
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_string);

        Box::pin(async move {
            let token = match token {
                Some(token) => token,
                None => {
                    return Err(actix_web::error::ErrorUnauthorized(
                        "An authorization token is required",
                    ))
                }
            };

            match verifier.verify(&token).await {
                Ok(Some(user)) => {
                    req.extensions_mut().insert(user);
                    srv.call(req).await
                }
                Ok(None) => Err(actix_web::error::ErrorUnauthorized(
                    "Invalid or expired token",
                )),
                Err(e) => {
                    warn!("Token verification failed: {}", e);
                    Err(actix_web::error::ErrorInternalServerError(
                        "Authentication service unavailable",
                    ))
                }
            }
        })
    }
}

/// Handlers take `AuthUser` as an extractor; the middleware has already
/// placed it in the request extensions for every protected route.
impl FromRequest for AuthUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| actix_web::error::ErrorUnauthorized("Not authenticated")),
        )
    }
}
