//! Account registration and sign-in.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use mongodb::bson::doc;
use serde::{Deserialize, Serialize};

use crate::auth;
use crate::http::error::ApiError;
use crate::http::middleware::CurrentUser;
use crate::http::server::AppState;
use crate::store::models::{User, UserRole};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

/// Public view of an account. Never carries the password hash.
#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

impl UserProfile {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    if request.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".into()));
    }
    if !request.email.contains('@') {
        return Err(ApiError::BadRequest("invalid email address".into()));
    }
    if request.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "password must be at least 8 characters".into(),
        ));
    }

    let users = state.store.users();
    if users
        .find_one(doc! { "email": &request.email })
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("account"));
    }

    let password_hash = auth::hash_password(&state.config.auth, &request.password)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let mut user = User {
        id: None,
        name: request.name,
        email: request.email,
        password_hash,
        role: UserRole::User,
        created_at: Utc::now(),
    };

    let inserted = users.insert_one(&user).await?;
    user.id = inserted.inserted_id.as_object_id();

    let token = auth::create_token(&state.config.auth, &user)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    tracing::info!(email = %user.email, "account registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: UserProfile::from_user(&user),
        }),
    ))
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let user = state
        .store
        .users()
        .find_one(doc! { "email": &request.email })
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    let valid = auth::verify_password(&request.password, &user.password_hash)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    if !valid {
        return Err(ApiError::InvalidCredentials);
    }

    let token = auth::create_token(&state.config.auth, &user)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    tracing::info!(email = %user.email, "signed in");

    Ok(Json(AuthResponse {
        token,
        user: UserProfile::from_user(&user),
    }))
}

async fn me(
    current: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = state
        .store
        .users()
        .find_one(doc! { "_id": current.id })
        .await?
        .ok_or(ApiError::NotFound("account"))?;

    Ok(Json(UserProfile::from_user(&user)))
}
