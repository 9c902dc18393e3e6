//! Account administration and profile updates.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::ReturnDocument;
use serde::Deserialize;

use crate::auth;
use crate::http::error::ApiError;
use crate::http::middleware::{AdminUser, CurrentUser};
use crate::http::server::AppState;
use crate::routes::auth::UserProfile;
use crate::routes::parse_object_id;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/{id}", get(fetch).put(update).delete(remove))
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

async fn list(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserProfile>>, ApiError> {
    let mut cursor = state.store.users().find(doc! {}).await?;

    let mut users = Vec::new();
    while let Some(user) = cursor.try_next().await? {
        users.push(UserProfile::from_user(&user));
    }
    Ok(Json(users))
}

async fn fetch(
    current: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserProfile>, ApiError> {
    let id = parse_object_id(&id)?;
    if id != current.id && !current.role.is_admin() {
        return Err(ApiError::Forbidden);
    }

    let user = state
        .store
        .users()
        .find_one(doc! { "_id": id })
        .await?
        .ok_or(ApiError::NotFound("account"))?;

    Ok(Json(UserProfile::from_user(&user)))
}

async fn update(
    current: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    let id = parse_object_id(&id)?;
    if id != current.id && !current.role.is_admin() {
        return Err(ApiError::Forbidden);
    }

    let users = state.store.users();
    let mut set = doc! {};

    if let Some(name) = request.name {
        if name.trim().is_empty() {
            return Err(ApiError::BadRequest("name must not be empty".into()));
        }
        set.insert("name", name);
    }
    if let Some(email) = request.email {
        if !email.contains('@') {
            return Err(ApiError::BadRequest("invalid email address".into()));
        }
        let taken = users
            .find_one(doc! { "email": &email, "_id": { "$ne": id } })
            .await?
            .is_some();
        if taken {
            return Err(ApiError::Conflict("account"));
        }
        set.insert("email", email);
    }
    if let Some(password) = request.password {
        if password.len() < 8 {
            return Err(ApiError::BadRequest(
                "password must be at least 8 characters".into(),
            ));
        }
        let hash = auth::hash_password(&state.config.auth, &password)
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        set.insert("password_hash", hash);
    }
    if set.is_empty() {
        return Err(ApiError::BadRequest("no fields to update".into()));
    }

    let user = users
        .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
        .return_document(ReturnDocument::After)
        .await?
        .ok_or(ApiError::NotFound("account"))?;

    Ok(Json(UserProfile::from_user(&user)))
}

async fn remove(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_object_id(&id)?;
    let result = state.store.users().delete_one(doc! { "_id": id }).await?;

    if result.deleted_count == 0 {
        return Err(ApiError::NotFound("account"));
    }
    Ok(StatusCode::NO_CONTENT)
}
