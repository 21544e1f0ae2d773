//! API 路由
//!
//! 订单路径同时接受带与不带结尾斜杠的形式。

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use procure_bootstrap::Infrastructure;
use procure_telemetry::HealthStatus;
use serde::Serialize;

use crate::application::PurchaseOrderService;
use crate::domain::PurchaseOrderId;

use super::dto::{ListOrdersParams, PurchaseOrderRequest, PurchaseOrderResponse};
use super::error::ApiError;

/// 路由共享状态
#[derive(Clone)]
pub struct AppState {
    service: Arc<PurchaseOrderService>,
    infrastructure: Option<Infrastructure>,
}

impl AppState {
    pub fn new(service: Arc<PurchaseOrderService>) -> Self {
        Self {
            service,
            infrastructure: None,
        }
    }

    /// 附加基础设施，用于就绪检查与 metrics 输出
    pub fn with_infrastructure(mut self, infrastructure: Infrastructure) -> Self {
        self.infrastructure = Some(infrastructure);
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/purchase/orders", get(list_orders).post(create_order))
        .route("/purchase/orders/", get(list_orders).post(create_order))
        .route(
            "/purchase/orders/{id}",
            get(get_order).put(update_order).delete(delete_order),
        )
        .route(
            "/purchase/orders/{id}/",
            get(get_order).put(update_order).delete(delete_order),
        )
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics))
        .with_state(state)
}

type ApiResult<T> = Result<T, ApiError>;

fn order_id(path: Result<Path<i64>, PathRejection>) -> ApiResult<PurchaseOrderId> {
    path.map(|Path(id)| PurchaseOrderId(id))
        .map_err(|_| ApiError::order_not_found())
}

async fn list_orders(
    State(state): State<AppState>,
    Query(params): Query<ListOrdersParams>,
) -> ApiResult<Json<Vec<PurchaseOrderResponse>>> {
    let orders = state.service.list(params.into()).await?;
    Ok(Json(orders.into_iter().map(Into::into).collect()))
}

async fn create_order(
    State(state): State<AppState>,
    body: Result<Json<PurchaseOrderRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<PurchaseOrderResponse>)> {
    let Json(request) = body.map_err(ApiError::invalid_body)?;
    let order = state.service.create(request.into()).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

async fn get_order(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<PurchaseOrderResponse>> {
    let id = order_id(path)?;
    let order = state.service.get(id).await?;
    Ok(Json(order.into()))
}

async fn update_order(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<PurchaseOrderRequest>, JsonRejection>,
) -> ApiResult<Json<PurchaseOrderResponse>> {
    let id = order_id(path)?;
    let Json(request) = body.map_err(ApiError::invalid_body)?;
    let order = state.service.update(id, request.into()).await?;
    Ok(Json(order.into()))
}

async fn delete_order(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let id = order_id(path).map_err(|_| ApiError::delete_not_found())?;
    state
        .service
        .delete(id)
        .await
        .map_err(ApiError::for_delete)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    let status = match &state.infrastructure {
        Some(infra) => infra.readiness().await,
        None => HealthStatus::new(),
    };
    let code = if status.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status))
}

async fn metrics(State(state): State<AppState>) -> Response {
    match state
        .infrastructure
        .as_ref()
        .and_then(Infrastructure::metrics_handle)
    {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
