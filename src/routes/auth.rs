/// Authentication Routes
///
/// Handles user registration, login and token refresh.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::AuthService;
use crate::domain::Role;
use crate::error::{AppError, ErrorContext, ValidationError};
use crate::validators::{is_valid_password, is_valid_username};

const TOKEN_TYPE: &str = "Bearer";

/// User registration request
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Token refresh request
#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub username: String,
    pub role: Role,
    pub user_id: i64,
}

/// Response of a successful refresh
#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

/// POST /auth/register
///
/// Create a `user`-role account. No tokens are issued; the client logs in
/// afterwards.
///
/// # Errors
/// - 400: Invalid username or password
/// - 409: Username already taken
/// - 500: Internal server error
pub async fn register(
    form: web::Json<RegisterRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_registration");

    let username = is_valid_username(&form.username)?;
    is_valid_password(&form.password)?;

    let user = auth
        .register(&username, &form.password)
        .await
        .map_err(|e| {
            context.log_error(&e);
            e
        })?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = user.id,
        "User registered successfully"
    );

    Ok(HttpResponse::Created().json(RegisterResponse {
        id: user.id,
        username: user.username,
        role: user.role,
    }))
}

/// POST /auth/login
///
/// # Errors
/// - 400: Missing username or password
/// - 401: Invalid credentials (unknown username or wrong password, same body)
/// - 500: Internal server error
pub async fn login(
    form: web::Json<LoginRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");

    let username = form.username.trim();
    if username.is_empty() {
        return Err(ValidationError::EmptyField("username".to_string()).into());
    }
    if form.password.is_empty() {
        return Err(ValidationError::EmptyField("password".to_string()).into());
    }

    let outcome = auth.login(username, &form.password).await.map_err(|e| {
        context.log_error(&e);
        e
    })?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = outcome.user.id,
        "User logged in successfully"
    );

    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token: outcome.tokens.access_token,
        refresh_token: outcome.tokens.refresh_token,
        token_type: TOKEN_TYPE,
        expires_in: auth.issuer().access_token_expiry(),
        username: outcome.user.username,
        role: outcome.user.role,
        user_id: outcome.user.id,
    }))
}

/// POST /auth/refresh
///
/// Rotate a refresh token: the presented token is consumed, every access
/// token issued before is revoked, and a new pair is returned.
///
/// # Errors
/// - 401: Unknown, expired or already used refresh token
/// - 500: Rotation failed part way (the client must log in again)
pub async fn refresh(
    form: web::Json<RefreshRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_refresh");

    let pair = auth.refresh(&form.refresh_token).await.map_err(|e| {
        context.log_error(&e);
        e
    })?;

    tracing::info!(request_id = %context.request_id, "Token refreshed successfully");

    Ok(HttpResponse::Ok().json(TokenResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        token_type: TOKEN_TYPE,
        expires_in: auth.issuer().access_token_expiry(),
    }))
}
