//! Order placement and tracking.
//!
//! Status changes fan out to realtime subscribers through the order
//! event bus.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use mongodb::bson::{self, doc};
use mongodb::options::ReturnDocument;
use serde::{Deserialize, Serialize};

use crate::http::error::ApiError;
use crate::http::middleware::{AdminUser, CurrentUser};
use crate::http::server::AppState;
use crate::realtime::{broadcast_event, OrderEvent};
use crate::routes::parse_object_id;
use crate::store::models::{Order, OrderItem, OrderStatus};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(fetch))
        .route("/{id}/status", put(update_status))
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<CreateOrderItem>,
    pub shipping_address: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderItem {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Serialize)]
pub struct OrderItemResponse {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub price: f64,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: String,
    pub items: Vec<OrderItemResponse>,
    pub total: f64,
    pub status: OrderStatus,
    pub shipping_address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderResponse {
    fn from_order(order: &Order) -> Self {
        Self {
            id: order.id.map(|id| id.to_hex()).unwrap_or_default(),
            user_id: order.user_id.to_hex(),
            items: order
                .items
                .iter()
                .map(|item| OrderItemResponse {
                    product_id: item.product_id.to_hex(),
                    name: item.name.clone(),
                    quantity: item.quantity,
                    price: item.price,
                })
                .collect(),
            total: order.total,
            status: order.status,
            shipping_address: order.shipping_address.clone(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

async fn create(
    current: CurrentUser,
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    if request.items.is_empty() {
        return Err(ApiError::BadRequest("order has no items".into()));
    }
    if request.shipping_address.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "shipping address must not be empty".into(),
        ));
    }

    let products = state.store.products();
    let mut items = Vec::with_capacity(request.items.len());
    let mut total = 0.0;

    for line in &request.items {
        if line.quantity == 0 {
            return Err(ApiError::BadRequest("quantity must be at least 1".into()));
        }
        let product_id = parse_object_id(&line.product_id)?;
        let product = products
            .find_one(doc! { "_id": product_id })
            .await?
            .ok_or(ApiError::NotFound("product"))?;

        if product.stock < i64::from(line.quantity) {
            return Err(ApiError::BadRequest(format!(
                "insufficient stock for {}",
                product.name
            )));
        }

        total += product.price * f64::from(line.quantity);
        items.push(OrderItem {
            product_id,
            name: product.name,
            quantity: line.quantity,
            price: product.price,
        });
    }

    let now = Utc::now();
    let mut order = Order {
        id: None,
        user_id: current.id,
        items,
        total,
        status: OrderStatus::Pending,
        shipping_address: request.shipping_address,
        created_at: now,
        updated_at: now,
    };

    let inserted = state.store.orders().insert_one(&order).await?;
    order.id = inserted.inserted_id.as_object_id();

    // Stock is adjusted per line after the order lands; a contended
    // product can briefly oversell, which the fulfilment flow absorbs.
    for item in &order.items {
        products
            .update_one(
                doc! { "_id": item.product_id },
                doc! { "$inc": { "stock": -i64::from(item.quantity) } },
            )
            .await?;
    }

    tracing::info!(
        order = %order.id.map(|id| id.to_hex()).unwrap_or_default(),
        total = order.total,
        "order placed"
    );

    Ok((StatusCode::CREATED, Json(OrderResponse::from_order(&order))))
}

async fn list(
    current: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let filter = if current.role.is_admin() {
        doc! {}
    } else {
        doc! { "user_id": current.id }
    };

    let mut cursor = state
        .store
        .orders()
        .find(filter)
        .sort(doc! { "created_at": -1 })
        .await?;

    let mut orders = Vec::new();
    while let Some(order) = cursor.try_next().await? {
        orders.push(OrderResponse::from_order(&order));
    }
    Ok(Json(orders))
}

async fn fetch(
    current: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let id = parse_object_id(&id)?;
    let order = state
        .store
        .orders()
        .find_one(doc! { "_id": id })
        .await?
        .ok_or(ApiError::NotFound("order"))?;

    if order.user_id != current.id && !current.role.is_admin() {
        return Err(ApiError::Forbidden);
    }

    Ok(Json(OrderResponse::from_order(&order)))
}

async fn update_status(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let id = parse_object_id(&id)?;
    let status = bson::to_bson(&request.status).map_err(|e| ApiError::Internal(e.to_string()))?;

    let order = state
        .store
        .orders()
        .find_one_and_update(
            doc! { "_id": id },
            doc! { "$set": { "status": status, "updated_at": bson::DateTime::now() } },
        )
        .return_document(ReturnDocument::After)
        .await?
        .ok_or(ApiError::NotFound("order"))?;

    broadcast_event(
        &state.orders_tx,
        OrderEvent::StatusChanged {
            order_id: id.to_hex(),
            status: order.status,
        },
    );

    tracing::info!(order = %id.to_hex(), status = ?order.status, "order status updated");

    Ok(Json(OrderResponse::from_order(&order)))
}
