use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use orderly_order::{BatchSummary, OrderWithPayment, StatusUpdate};
use orderly_shared::{NewOrder, Order, OrderId, OrderUpdate};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/with-payment", post(create_order_with_payment))
        .route("/orders/batch", post(create_batch_orders))
        .route(
            "/orders/{id}",
            get(get_order).put(update_order).delete(delete_order),
        )
        .route("/orders/{id}/status", patch(update_order_status))
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderWithPaymentRequest {
    pub customer_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub total_price: Option<Decimal>,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

type JsonBody<T> = Result<Json<T>, JsonRejection>;
type OrderPath = Result<Path<OrderId>, PathRejection>;

/// POST /orders
pub async fn create_order(
    State(state): State<AppState>,
    body: JsonBody<NewOrder>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    let Json(request) = body?;
    let order = state.orchestrator.create_order(request).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// POST /orders/with-payment
pub async fn create_order_with_payment(
    State(state): State<AppState>,
    body: JsonBody<CreateOrderWithPaymentRequest>,
) -> Result<(StatusCode, Json<OrderWithPayment>), AppError> {
    let Json(req) = body?;
    let mut request = NewOrder::new(req.customer_id, req.product_id, req.quantity);
    request.total_price = req.total_price;

    let result = state
        .orchestrator
        .create_order_with_payment(request, &req.currency)
        .await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// POST /orders/batch
pub async fn create_batch_orders(
    State(state): State<AppState>,
    body: JsonBody<Vec<NewOrder>>,
) -> Result<Json<BatchSummary>, AppError> {
    let Json(orders) = body?;
    if orders.is_empty() {
        return Err(AppError::ValidationError("at least one order is required".to_string()));
    }
    Ok(Json(state.orchestrator.batch_create_orders(orders).await))
}

/// GET /orders
pub async fn list_orders(State(state): State<AppState>) -> Result<Json<Vec<Order>>, AppError> {
    Ok(Json(state.orchestrator.list_orders().await?))
}

/// GET /orders/{id}
pub async fn get_order(
    State(state): State<AppState>,
    id: OrderPath,
) -> Result<Json<Order>, AppError> {
    let Path(id) = id?;
    Ok(Json(state.orchestrator.get_order(id).await?))
}

/// PUT /orders/{id}
pub async fn update_order(
    State(state): State<AppState>,
    id: OrderPath,
    body: JsonBody<OrderUpdate>,
) -> Result<Json<Order>, AppError> {
    let Path(id) = id?;
    let Json(update) = body?;
    Ok(Json(state.orchestrator.update_order(id, update).await?))
}

/// DELETE /orders/{id}
pub async fn delete_order(
    State(state): State<AppState>,
    id: OrderPath,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;
    state.orchestrator.delete_order(id).await?;
    Ok(Json(json!({ "message": "Order deleted successfully" })))
}

/// PATCH /orders/{id}/status
pub async fn update_order_status(
    State(state): State<AppState>,
    id: OrderPath,
    body: JsonBody<StatusUpdateRequest>,
) -> Result<Json<Value>, AppError> {
    let Path(id) = id?;
    let Json(req) = body?;
    let StatusUpdate { order_id, status } = state.orchestrator.update_order_status(id, req.status).await?;

    Ok(Json(json!({
        "message": "Order status updated successfully",
        "order_id": order_id,
        "status": status,
    })))
}
