//! Product catalog CRUD.
//!
//! Reads are public; writes require the admin role.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use futures_util::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::ReturnDocument;
use serde::{Deserialize, Serialize};

use crate::http::error::ApiError;
use crate::http::middleware::AdminUser;
use crate::http::server::AppState;
use crate::routes::parse_object_id;
use crate::store::models::Product;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(fetch).put(update).delete(remove))
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub stock: i64,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i64>,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub stock: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl ProductResponse {
    fn from_product(product: &Product) -> Self {
        Self {
            id: product.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price,
            stock: product.stock,
            category: product.category.clone(),
            image_url: product.image_url.clone(),
        }
    }
}

async fn list(State(state): State<AppState>) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let mut cursor = state.store.products().find(doc! {}).await?;

    let mut products = Vec::new();
    while let Some(product) = cursor.try_next().await? {
        products.push(ProductResponse::from_product(&product));
    }
    Ok(Json(products))
}

async fn fetch(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let id = parse_object_id(&id)?;
    let product = state
        .store
        .products()
        .find_one(doc! { "_id": id })
        .await?
        .ok_or(ApiError::NotFound("product"))?;

    Ok(Json(ProductResponse::from_product(&product)))
}

async fn create(
    _admin: AdminUser,
    State(state): State<AppState>,
    Json(request): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    if request.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".into()));
    }
    if request.price < 0.0 {
        return Err(ApiError::BadRequest("price must not be negative".into()));
    }
    if request.stock < 0 {
        return Err(ApiError::BadRequest("stock must not be negative".into()));
    }

    let mut product = Product {
        id: None,
        name: request.name,
        description: request.description,
        price: request.price,
        stock: request.stock,
        category: request.category,
        image_url: request.image_url,
        created_at: Utc::now(),
    };

    let inserted = state.store.products().insert_one(&product).await?;
    product.id = inserted.inserted_id.as_object_id();

    tracing::info!(product = %product.name, "product created");

    Ok((
        StatusCode::CREATED,
        Json(ProductResponse::from_product(&product)),
    ))
}

async fn update(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    let id = parse_object_id(&id)?;

    let mut set = doc! {};
    if let Some(name) = request.name {
        set.insert("name", name);
    }
    if let Some(description) = request.description {
        set.insert("description", description);
    }
    if let Some(price) = request.price {
        if price < 0.0 {
            return Err(ApiError::BadRequest("price must not be negative".into()));
        }
        set.insert("price", price);
    }
    if let Some(stock) = request.stock {
        if stock < 0 {
            return Err(ApiError::BadRequest("stock must not be negative".into()));
        }
        set.insert("stock", stock);
    }
    if let Some(category) = request.category {
        set.insert("category", category);
    }
    if let Some(image_url) = request.image_url {
        set.insert("image_url", image_url);
    }
    if set.is_empty() {
        return Err(ApiError::BadRequest("no fields to update".into()));
    }

    let product = state
        .store
        .products()
        .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
        .return_document(ReturnDocument::After)
        .await?
        .ok_or(ApiError::NotFound("product"))?;

    Ok(Json(ProductResponse::from_product(&product)))
}

async fn remove(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_object_id(&id)?;
    let result = state.store.products().delete_one(doc! { "_id": id }).await?;

    if result.deleted_count == 0 {
        return Err(ApiError::NotFound("product"));
    }
    Ok(StatusCode::NO_CONTENT)
}
