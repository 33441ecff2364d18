/// Admin Authorization Middleware
///
/// Role gate for admin-only scopes. Must sit inside `JwtMiddleware`, which
/// provides the `AuthenticatedUser` it reads. Non-admins get 401, not 403.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use super::jwt_middleware::AuthenticatedUser;
use crate::error::{AppError, AuthError};

/// Decide whether an authenticated caller may pass the admin gate
pub fn authorize_admin(user: Option<&AuthenticatedUser>) -> Result<(), AuthError> {
    let user = user.ok_or_else(|| {
        tracing::error!("Admin gate reached without an authenticated user");
        AuthError::InvalidRole
    })?;

    if !user.role.is_admin() {
        tracing::warn!(user_id = user.user_id, role = %user.role, "User is not admin");
        return Err(AuthError::AccessDenied);
    }

    Ok(())
}

pub struct AdminMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AdminMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AdminMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(AdminMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct AdminMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AdminMiddlewareService<S>
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
        let decision = authorize_admin(req.extensions().get::<AuthenticatedUser>());

        match decision {
            Ok(()) => {
                let service = self.service.clone();
                Box::pin(async move { service.call(req).await })
            }
            Err(e) => {
                let error = Error::from(AppError::from(e));
                Box::pin(async move { Err(error) })
            }
        }
    }
}
