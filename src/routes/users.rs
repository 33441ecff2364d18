/// User Routes
///
/// Read-only account views behind the authentication middleware.

use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::domain::{Role, User};
use crate::error::{AppError, ErrorContext};
use crate::middleware::AuthenticatedUser;
use crate::store::UserStore;

/// Public view of an account, without credentials or token version
#[derive(Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// GET /api/me
///
/// The caller's own account. Requires `Authorization: Bearer <access_token>`.
pub async fn get_current_user(
    caller: web::ReqData<AuthenticatedUser>,
    users: web::Data<dyn UserStore>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("get_current_user").with_user_id(caller.user_id);

    let user = users.get_user_by_id(caller.user_id).await.map_err(|e| {
        let e = AppError::from(e);
        context.log_error(&e);
        e
    })?;

    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// GET /admin/users/{id}
///
/// Any account by id. Admin only.
///
/// # Errors
/// - 401: Not authenticated, or not an admin
/// - 404: No such user
pub async fn get_user(
    path: web::Path<i64>,
    caller: web::ReqData<AuthenticatedUser>,
    users: web::Data<dyn UserStore>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    let context = ErrorContext::new("admin_get_user").with_user_id(caller.user_id);

    let user = users.get_user_by_id(user_id).await.map_err(|e| {
        let e = AppError::from(e);
        context.log_error(&e);
        e
    })?;

    tracing::info!(
        request_id = %context.request_id,
        admin_id = caller.user_id,
        user_id,
        "Admin fetched user"
    );

    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}
