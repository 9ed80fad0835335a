//! REST API for the packing service.
//!
//! Provides HTTP endpoints for submitting orders together with a container
//! catalogue and receiving the computed placements. Uses Axum as the web
//! framework and supports CORS; `/pack_stream` streams packing events as
//! Server-Sent Events for live visualisation.

use axum::extract::Json;
use axum::extract::rejection::JsonRejection;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use std::sync::OnceLock;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use utoipa::{OpenApi, ToSchema};

use crate::config::ApiConfig;
use crate::model::{BoxDefinition, Order, Product, ValidationError};
use crate::optimizer::{OrderResult, PackEvent, Packer, RejectReason};

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>pack-it-now API Docs</title>
        <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css" />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
        <script>
            window.onload = function () {
                window.ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                });
            };
        </script>
    </body>
</html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

fn default_fit_ratio() -> f64 {
    100.0
}

fn default_quantity() -> u32 {
    1
}

/// One container type of the request catalogue.
///
/// Dimension order does not matter; the engine normalises it.
#[derive(Deserialize, Clone, ToSchema)]
pub struct ContainerRequest {
    pub width: f64,
    pub height: f64,
    pub length: f64,
    pub weight: f64,
    pub max_weight: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub container_type: String,
    #[serde(default)]
    pub remark: String,
    #[serde(default)]
    #[schema(nullable = true)]
    pub max_fill_percentage: Option<f64>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub min_fill_percentage: Option<f64>,
}

impl ContainerRequest {
    fn into_definition(self) -> Result<BoxDefinition, ValidationError> {
        Ok(BoxDefinition::new(
            self.width,
            self.height,
            self.length,
            self.weight,
            self.max_weight,
            (
                self.min_fill_percentage.unwrap_or(5.0),
                self.max_fill_percentage.unwrap_or(80.0),
            ),
        )?
        .with_labels(self.description, self.container_type, self.remark))
    }
}

/// One item of an order, with an optional replication count.
#[derive(Deserialize, Clone, ToSchema)]
pub struct ItemRequest {
    pub item: String,
    pub width: f64,
    pub height: f64,
    pub length: f64,
    pub weight: f64,
    #[serde(default = "default_fit_ratio")]
    pub fit_ratio: f64,
    #[serde(default)]
    pub location: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

/// One order to pack.
#[derive(Deserialize, Clone, ToSchema)]
pub struct OrderRequest {
    pub order_number: String,
    #[serde(default)]
    pub date_time: String,
    pub items: Vec<ItemRequest>,
}

#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "containers": [
            {
                "width": 415.0,
                "height": 300.0,
                "length": 510.0,
                "weight": 805.0,
                "max_weight": 19195.0,
                "description": "Carton medium",
                "container_type": "M"
            }
        ],
        "orders": [
            {
                "order_number": "6S04573613",
                "items": [
                    {
                        "item": "Product_5252",
                        "width": 113.0,
                        "height": 208.0,
                        "length": 113.0,
                        "weight": 900.0,
                        "quantity": 2
                    }
                ]
            }
        ]
    })
)]
pub struct PackRequest {
    pub containers: Vec<ContainerRequest>,
    pub orders: Vec<OrderRequest>,
}

struct ValidatedPackRequest {
    containers: Vec<BoxDefinition>,
    orders: Vec<Order>,
}

impl ValidatedPackRequest {
    fn order_count(&self) -> usize {
        self.orders.len()
    }

    fn container_count(&self) -> usize {
        self.containers.len()
    }

    fn into_parts(self) -> (Vec<BoxDefinition>, Vec<Order>) {
        (self.containers, self.orders)
    }
}

enum PackRequestValidationError {
    MissingContainers,
    MissingOrders,
    InvalidContainer(ValidationError),
    InvalidItem(ValidationError),
    InvalidQuantity { item: String },
}

impl PackRequest {
    fn into_validated(self) -> Result<ValidatedPackRequest, PackRequestValidationError> {
        if self.containers.is_empty() {
            return Err(PackRequestValidationError::MissingContainers);
        }
        if self.orders.is_empty() {
            return Err(PackRequestValidationError::MissingOrders);
        }

        let containers = self
            .containers
            .into_iter()
            .map(ContainerRequest::into_definition)
            .collect::<Result<Vec<_>, ValidationError>>()
            .map_err(PackRequestValidationError::InvalidContainer)?;

        let mut orders = Vec::new();
        for order_request in self.orders {
            let mut products = Vec::new();
            for item in order_request.items {
                if item.quantity == 0 {
                    return Err(PackRequestValidationError::InvalidQuantity { item: item.item });
                }
                let product = Product::new(
                    item.width,
                    item.height,
                    item.length,
                    item.weight,
                    item.fit_ratio,
                    item.item,
                    item.location,
                )
                .map_err(PackRequestValidationError::InvalidItem)?;
                for _ in 0..item.quantity {
                    products.push(product.clone());
                }
            }
            let mut order = Order::new(order_request.order_number, order_request.date_time);
            order.add_items(products);
            orders.push(order);
        }

        Ok(ValidatedPackRequest { containers, orders })
    }
}

/// Response with the packing results of every submitted order.
#[derive(Serialize, ToSchema)]
pub struct PackResponse {
    pub results: Vec<PackedOrder>,
    pub is_complete: bool,
}

/// Result of one order.
///
/// `error` is set when the order failed as a whole (no catalogue container
/// can hold one of its items); `rejected` lists items that stayed behind
/// although the order itself was packed.
#[derive(Serialize, ToSchema)]
pub struct PackedOrder {
    pub order_number: String,
    pub containers: Vec<PackedContainer>,
    pub rejected: Vec<RejectedItem>,
    #[schema(nullable = true)]
    pub error: Option<String>,
}

/// One carton used for an order.
#[derive(Serialize, ToSchema)]
pub struct PackedContainer {
    pub box_id: u64,
    pub container_type: String,
    pub description: String,
    #[schema(value_type = [f64; 3], example = json!([415.0, 510.0, 300.0]))]
    pub dims: (f64, f64, f64),
    pub max_weight: f64,
    pub total_weight: f64,
    pub placements: Vec<PackedItem>,
}

/// One placed item with rotation label, rotated dimensions and coordinates.
#[derive(Serialize, ToSchema)]
pub struct PackedItem {
    pub item: String,
    pub rotation: String,
    #[schema(value_type = [f64; 3], example = json!([113.0, 113.0, 208.0]))]
    pub dims: (f64, f64, f64),
    #[schema(value_type = [f64; 3], example = json!([0.0, 0.0, 0.0]))]
    pub position: (f64, f64, f64),
}

#[derive(Serialize, ToSchema)]
pub struct RejectedItem {
    pub item: String,
    pub reason_code: String,
    pub reason: String,
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        err.to_string(),
    )
}

fn validation_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid input data",
        details,
    )
}

fn parse_pack_request(
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> Result<ValidatedPackRequest, Response> {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(err) => return Err(json_deserialize_error(err)),
    };

    match payload.into_validated() {
        Ok(validated) => Ok(validated),
        Err(PackRequestValidationError::MissingContainers) => Err(validation_error(
            "At least one container type must be specified",
        )),
        Err(PackRequestValidationError::MissingOrders) => {
            Err(validation_error("At least one order must be specified"))
        }
        Err(PackRequestValidationError::InvalidContainer(err)) => Err(error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Invalid container configuration",
            err.to_string(),
        )),
        Err(PackRequestValidationError::InvalidItem(err)) => Err(validation_error(err.to_string())),
        Err(PackRequestValidationError::InvalidQuantity { item }) => Err(validation_error(
            format!("Item '{}' has a quantity of 0", item),
        )),
    }
}

impl PackedOrder {
    fn from_result(result: &OrderResult) -> Self {
        Self {
            order_number: result.order_number().to_string(),
            containers: result
                .boxes()
                .iter()
                .map(|box_result| {
                    let bx = box_result.box_definition();
                    PackedContainer {
                        box_id: box_result.box_id(),
                        container_type: bx.container_type.clone(),
                        description: bx.description.clone(),
                        dims: bx.dimensions(),
                        max_weight: bx.max_weight,
                        total_weight: box_result.packed_weight(),
                        placements: box_result
                            .positions()
                            .map(|placement| PackedItem {
                                item: placement.product().item.clone(),
                                rotation: placement.rotation().label().to_string(),
                                dims: placement.dimensions(),
                                position: placement.coordinates(),
                            })
                            .collect(),
                    }
                })
                .collect(),
            rejected: result
                .rejected_products()
                .map(|product| RejectedItem {
                    item: product.item.clone(),
                    reason_code: RejectReason::NoSpace.code().to_string(),
                    reason: RejectReason::NoSpace.to_string(),
                })
                .collect(),
            error: None,
        }
    }

    fn from_failure(order_number: &str, details: String) -> Self {
        Self {
            order_number: order_number.to_string(),
            containers: Vec::new(),
            rejected: Vec::new(),
            error: Some(details),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(handle_pack, handle_pack_stream),
    components(
        schemas(
            PackRequest,
            ContainerRequest,
            OrderRequest,
            ItemRequest,
            PackResponse,
            PackedOrder,
            PackedContainer,
            PackedItem,
            RejectedItem,
            ErrorResponse
        )
    ),
    tags((name = "packing", description = "Endpoints for order packing"))
)]
struct ApiDoc;

/// Starts the API server.
///
/// Configures CORS for cross-origin requests. Blocks until the server is
/// terminated.
pub async fn start_api_server(config: ApiConfig) {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let app = Router::new()
        // API endpoints
        .route("/pack", post(handle_pack))
        .route("/pack_stream", post(handle_pack_stream))
        // API documentation
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors);

    let addr = config.socket_addr();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            panic!("❌ Could not bind API server to {}: {}", addr, err);
        }
    };

    let display_host = config.display_host().to_string();
    println!(
        "🚀 Server running on http://{}:{}",
        display_host,
        config.port()
    );
    if config.binds_to_all_interfaces() && config.uses_default_host() {
        println!("💡 Local access: http://localhost:{}", config.port());
    }
    println!("📦 API Endpoints:");
    println!("   - POST /pack");
    println!("   - POST /pack_stream");
    println!("📑 Documentation:");
    println!("   - GET /docs");
    println!("   - GET /docs/openapi.json");

    if let Err(err) = axum::serve(listener, app).await {
        eprintln!("❌ API server terminated with an error: {err}");
    }
}

fn pack_validated_request(
    containers: &[BoxDefinition],
    orders: &mut [Order],
    mut on_event: impl FnMut(&PackEvent),
) -> PackResponse {
    let mut packer = Packer::new();
    let mut results = Vec::with_capacity(orders.len());
    let mut failed = 0usize;

    for order in orders.iter_mut() {
        let order_number = order.order_number().to_string();
        match packer.pack_order_with_progress(order, containers, &mut on_event) {
            Ok(result) => results.push(PackedOrder::from_result(&result)),
            Err(err) => {
                failed += 1;
                results.push(PackedOrder::from_failure(&order_number, err.to_string()));
            }
        }
    }

    on_event(&PackEvent::Finished {
        orders: results.len(),
        failed,
    });

    let is_complete = results
        .iter()
        .all(|order| order.error.is_none() && order.rejected.is_empty());
    PackResponse {
        results,
        is_complete,
    }
}

/// Handler for the POST /pack endpoint.
///
/// Packs every submitted order against the request's container catalogue.
///
/// # Returns
/// JSON response with the containers and placements of every order
#[utoipa::path(
    post,
    path = "/pack",
    request_body = PackRequest,
    responses(
        (status = 200, description = "Orders were processed", body = PackResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request or container configuration",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_pack(payload: Result<Json<PackRequest>, JsonRejection>) -> impl IntoResponse {
    let request = match parse_pack_request(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    println!(
        "📥 New pack request: {} orders, {} container types",
        request.order_count(),
        request.container_count()
    );

    let (containers, mut orders) = request.into_parts();
    let response = pack_validated_request(&containers, &mut orders, |_| {});

    println!(
        "📦 Result: {} orders processed, complete: {}",
        response.results.len(),
        response.is_complete
    );
    (StatusCode::OK, Json(response)).into_response()
}

/// Handler for the POST /pack_stream endpoint (SSE).
///
/// Streams pack events in real-time as Server-Sent Events
/// (text/event-stream), so a client can visualise placements live without
/// waiting for the complete result.
#[utoipa::path(
    post,
    path = "/pack_stream",
    request_body = PackRequest,
    responses(
        (
            status = 200,
            description = "Streams pack events in real-time",
            content_type = "text/event-stream",
            body = String
        ),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request or container configuration",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_pack_stream(
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_pack_request(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let (containers, mut orders) = request.into_parts();
    let (tx, rx) = mpsc::channel::<String>(32);

    tokio::task::spawn_blocking(move || {
        pack_validated_request(&containers, &mut orders, |event| {
            if let Ok(json) = serde_json::to_string(event) {
                // Receiver may have closed the stream; remaining events are discarded.
                let _ = tx.blocking_send(json);
            }
        });
    });

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

async fn serve_openapi_json() -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui() -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}
