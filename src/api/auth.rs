//! Authentication endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::user::{ChangePassword, LoginRequest, RegisterUser, UserInfo},
    AppState,
};

use super::AuthenticatedUser;

/// Login response
#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    /// JWT access token
    pub token: String,
    /// Token type (always "Bearer")
    pub token_type: String,
    pub user: UserInfo,
}

impl LoginResponse {
    fn new(token: String, user: UserInfo) -> Self {
        Self {
            token,
            token_type: "Bearer".to_string(),
            user,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Create an account and log it in
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterUser,
    responses(
        (status = 201, description = "Account created", body = LoginResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email already exists")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(registration): Json<RegisterUser>,
) -> AppResult<(StatusCode, Json<LoginResponse>)> {
    registration.validate()?;

    let user = state.services.auth.register(registration).await?;
    let token = state.services.auth.create_token(&user)?;

    Ok((
        StatusCode::CREATED,
        Json(LoginResponse::new(token, UserInfo::from(&user))),
    ))
}

/// Authenticate with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    request.validate()?;

    let (token, user) = state
        .services
        .auth
        .authenticate(&request.email, &request.password)
        .await?;

    Ok(Json(LoginResponse::new(token, UserInfo::from(&user))))
}

/// Get current user information
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user info", body = UserInfo),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(State(state): State<AppState>, user: AuthenticatedUser) -> AppResult<Json<UserInfo>> {
    let account = state.services.auth.me(&user.caller()).await?;
    Ok(Json(UserInfo::from(&account)))
}

/// Change the caller's password
#[utoipa::path(
    post,
    path = "/auth/change-password",
    tag = "auth",
    security(("bearer_auth" = [])),
    request_body = ChangePassword,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Current password incorrect or new password invalid"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(change): Json<ChangePassword>,
) -> AppResult<Json<MessageResponse>> {
    change.validate()?;

    state.services.auth.change_password(&user.caller(), change).await?;
    Ok(Json(MessageResponse {
        message: "Password changed successfully".to_string(),
    }))
}
