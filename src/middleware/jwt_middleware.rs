/// JWT Authentication Middleware
///
/// Validates the bearer access token, checks its token version against the
/// user store, and injects `AuthenticatedUser` into request extensions for
/// downstream handlers.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::sync::Arc;

use crate::auth::TokenIssuer;
use crate::domain::Role;
use crate::error::{AppError, AuthError};
use crate::store::UserStore;

const BEARER_PREFIX: &str = "Bearer ";

/// Identity attached to an authenticated request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub role: Role,
}

/// Run the per-request authentication checks
///
/// Only the user lookup touches I/O. Every failure is final for the request.
pub async fn authenticate(
    authorization: Option<&str>,
    issuer: &TokenIssuer,
    users: &dyn UserStore,
) -> Result<AuthenticatedUser, AuthError> {
    let token = authorization
        .and_then(|h| h.strip_prefix(BEARER_PREFIX))
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            tracing::warn!("Missing or invalid Authorization header");
            AuthError::MissingToken
        })?;

    let claims = issuer.verify_access_token(token)?;

    // Store failures are reported exactly like a missing user
    let user = users.get_user_by_id(claims.user_id).await.map_err(|e| {
        tracing::warn!(user_id = claims.user_id, error = %e, "Failed to fetch token owner");
        AuthError::UserNotFound
    })?;

    if user.token_version != claims.token_version {
        tracing::warn!(
            user_id = user.id,
            token_version = claims.token_version,
            current_version = user.token_version,
            "Token version mismatch"
        );
        return Err(AuthError::TokenRevoked);
    }

    tracing::debug!(user_id = claims.user_id, role = %claims.role, "JWT validated successfully");

    Ok(AuthenticatedUser {
        user_id: claims.user_id,
        role: claims.role,
    })
}

/// JWT middleware for protecting routes
pub struct JwtMiddleware {
    issuer: TokenIssuer,
    users: Arc<dyn UserStore>,
}

impl JwtMiddleware {
    pub fn new(issuer: TokenIssuer, users: Arc<dyn UserStore>) -> Self {
        Self { issuer, users }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtMiddlewareService {
            service: Rc::new(service),
            issuer: Rc::new(self.issuer.clone()),
            users: self.users.clone(),
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    issuer: Rc<TokenIssuer>,
    users: Arc<dyn UserStore>,
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let authorization = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .map(str::to_owned);

        let service = self.service.clone();
        let issuer = self.issuer.clone();
        let users = self.users.clone();

        Box::pin(async move {
            let user = authenticate(authorization.as_deref(), &issuer, users.as_ref())
                .await
                .map_err(AppError::from)?;

            req.extensions_mut().insert(user);
            service.call(req).await
        })
    }
}
