//! HTTP server for the fulfillment API.
//!
//! Every order endpoint authenticates the bearer credential before looking at
//! the request body, so an anonymous caller always gets a 401 regardless of
//! what they sent.

use crate::apis::{self, validation_error};
use axum::{
	extract::{
		rejection::{JsonRejection, QueryRejection},
		DefaultBodyLimit, Path, Query, State,
	},
	http::{header::AUTHORIZATION, HeaderMap},
	response::Json,
	routing::{get, post},
	Router,
};
use fulfillment_config::ApiConfig;
use fulfillment_core::FulfillmentEngine;
use fulfillment_types::{
	APIError, AuthContext, CreateShipmentRequest, CreateShipmentResponse, TrackingQuery,
	TrackingResponse, TransitionRequest, TransitionResponse, TransitionRule,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Reference to the fulfillment engine for processing requests.
	pub engine: Arc<FulfillmentEngine>,
}

/// Builds the API router with its middleware stack.
///
/// Shipment creation is left out of the request timeout. It is bounded by
/// the carrier timeout instead, and a shipment the carrier accepted must
/// never be answered with a 408.
pub fn router(state: AppState, api_config: &ApiConfig) -> Router {
	let timed = Router::new()
		.route("/tracking", get(handle_get_tracking).post(handle_post_tracking))
		.route("/orders/{id}/transitions", post(handle_transition))
		.route("/fulfillment/stages", get(handle_stages))
		.layer(TimeoutLayer::new(Duration::from_secs(
			api_config.timeout_seconds,
		)));

	Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/shipments", post(handle_create_shipment))
				.merge(timed),
		)
		.route("/health", get(handle_health))
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(CorsLayer::permissive())
				.layer(DefaultBodyLimit::max(api_config.max_request_size)),
		)
		.with_state(state)
}

/// Starts the HTTP server and serves until Ctrl+C.
pub async fn start_server(
	api_config: ApiConfig,
	engine: Arc<FulfillmentEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(AppState { engine }, &api_config);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Fulfillment API server starting on {}", bind_address);

	axum::serve(listener, app)
		.with_graceful_shutdown(shutdown_signal())
		.await?;

	Ok(())
}

async fn shutdown_signal() {
	match tokio::signal::ctrl_c().await {
		Ok(()) => tracing::info!("Shutdown signal received"),
		Err(e) => tracing::warn!("Failed to listen for shutdown signal: {}", e),
	}
}

/// Resolves the caller from the `Authorization` header.
async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthContext, APIError> {
	let header = headers
		.get(AUTHORIZATION)
		.and_then(|value| value.to_str().ok());

	state
		.engine
		.authenticate(header)
		.await
		.map_err(apis::api_error)
}

/// Handles POST /api/shipments requests.
async fn handle_create_shipment(
	State(state): State<AppState>,
	headers: HeaderMap,
	body: Result<Json<CreateShipmentRequest>, JsonRejection>,
) -> Result<Json<CreateShipmentResponse>, APIError> {
	let caller = authenticate(&state, &headers).await?;
	let Json(request) = body.map_err(|e| validation_error(e.body_text()))?;

	match apis::shipment::process_create_shipment(&state.engine, &caller, request).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Shipment creation failed: {}", e);
			Err(e)
		},
	}
}

/// Handles GET /api/tracking requests.
async fn handle_get_tracking(
	State(state): State<AppState>,
	headers: HeaderMap,
	query: Result<Query<TrackingQuery>, QueryRejection>,
) -> Result<Json<TrackingResponse>, APIError> {
	let caller = authenticate(&state, &headers).await?;
	let Query(query) = query.map_err(|e| validation_error(e.body_text()))?;
	tracking(&state, &caller, query).await
}

/// Handles POST /api/tracking requests.
async fn handle_post_tracking(
	State(state): State<AppState>,
	headers: HeaderMap,
	body: Result<Json<TrackingQuery>, JsonRejection>,
) -> Result<Json<TrackingResponse>, APIError> {
	let caller = authenticate(&state, &headers).await?;
	let Json(query) = body.map_err(|e| validation_error(e.body_text()))?;
	tracking(&state, &caller, query).await
}

async fn tracking(
	state: &AppState,
	caller: &AuthContext,
	query: TrackingQuery,
) -> Result<Json<TrackingResponse>, APIError> {
	match apis::tracking::process_tracking_query(&state.engine, caller, query).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Tracking lookup failed: {}", e);
			Err(e)
		},
	}
}

/// Handles POST /api/orders/{id}/transitions requests.
async fn handle_transition(
	State(state): State<AppState>,
	Path(id): Path<String>,
	headers: HeaderMap,
	body: Result<Json<TransitionRequest>, JsonRejection>,
) -> Result<Json<TransitionResponse>, APIError> {
	let caller = authenticate(&state, &headers).await?;
	let Json(request) = body.map_err(|e| validation_error(e.body_text()))?;

	match apis::transitions::process_transition(&state.engine, &caller, &id, request).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Order transition failed: {}", e);
			Err(e)
		},
	}
}

/// Handles GET /api/fulfillment/stages requests.
async fn handle_stages(State(state): State<AppState>) -> Json<Vec<TransitionRule>> {
	Json(apis::transitions::transition_table(&state.engine))
}

/// Handles GET /health requests.
async fn handle_health(State(state): State<AppState>) -> Json<Value> {
	Json(json!({
		"status": "ok",
		"service": state.engine.config().service.id,
	}))
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use axum::body::Body;
	use axum::http::{Request, StatusCode};
	use fulfillment_auth::implementations::hs256::testing::{claims_for, mint_token};
	use fulfillment_auth::implementations::hs256::Hs256Verifier;
	use fulfillment_auth::AuthService;
	use fulfillment_carrier::implementations::sandbox::{SandboxCarrier, SandboxCarrierConfig};
	use fulfillment_carrier::{CarrierError, CarrierInterface, CarrierService};
	use fulfillment_config::builders::config::{ConfigBuilder, TEST_AUTH_SECRET};
	use fulfillment_config::Config;
	use fulfillment_storage::implementations::memory::MemoryStorage;
	use fulfillment_storage::StorageService;
	use fulfillment_types::{
		CarrierResult, CarrierShipmentRequest, ConfigSchema, SecretString, StorageKey,
	};
	use mockall::mock;
	use rust_decimal::Decimal;
	use tower::ServiceExt;

	mock! {
		pub Carrier {}

		#[async_trait]
		impl CarrierInterface for Carrier {
			fn config_schema(&self) -> Box<dyn ConfigSchema>;
			async fn create_shipment(
				&self,
				request: &CarrierShipmentRequest,
			) -> Result<CarrierResult, CarrierError>;
		}
	}

	fn token(subject: &str) -> String {
		format!("Bearer {}", mint_token(TEST_AUTH_SECRET, &claims_for(subject)))
	}

	fn admin_token() -> String {
		let mut claims = claims_for("ops-1");
		claims.admin = true;
		format!("Bearer {}", mint_token(TEST_AUTH_SECRET, &claims))
	}

	async fn seed(engine: &FulfillmentEngine) {
		let storage = engine.storage();
		storage
			.store(
				StorageKey::Orders,
				"ord-1",
				&json!({
					"id": "ord-1",
					"status": "confirmed",
					"ownerId": "buyer-1",
					"sellerIds": ["seller-1"],
					"items": [{ "name": "Mug", "quantity": 2, "unitPrice": "150" }],
					"shippingInfo": {
						"recipientName": "Ana Cruz",
						"address": "123 Main St, Brgy. San Isidro",
						"city": "Makati",
						"phone": "09171111111"
					},
					"paymentInfo": { "method": "cod" },
					"summary": { "total": "300" }
				}),
			)
			.await
			.unwrap();
		storage
			.store(
				StorageKey::Sellers,
				"seller-1",
				&json!({
					"id": "seller-1",
					"ownerUserId": "seller-user",
					"storeName": "Mug Shop",
					"phone": "09173333333",
					"address": { "line": "8 Kalye St, Brgy. Ugong", "city": "Pasig" }
				}),
			)
			.await
			.unwrap();
	}

	async fn sandbox_app(config: Config) -> Router {
		let engine = crate::factory_registry::build_engine_from_config(config).unwrap();
		seed(&engine).await;
		let api = ApiConfig::default();
		router(
			AppState {
				engine: Arc::new(engine),
			},
			&api,
		)
	}

	/// Holds the sandbox carrier's answer back.
	struct SlowCarrier {
		delay: Duration,
		inner: SandboxCarrier,
	}

	#[async_trait]
	impl CarrierInterface for SlowCarrier {
		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			self.inner.config_schema()
		}

		async fn create_shipment(
			&self,
			request: &CarrierShipmentRequest,
		) -> Result<CarrierResult, CarrierError> {
			tokio::time::sleep(self.delay).await;
			self.inner.create_shipment(request).await
		}
	}

	async fn mock_app(carrier: MockCarrier) -> Router {
		carrier_app(Box::new(carrier), ApiConfig::default()).await
	}

	async fn carrier_app(carrier: Box<dyn CarrierInterface>, api: ApiConfig) -> Router {
		let config = ConfigBuilder::new().build();
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let auth = Arc::new(AuthService::new(Box::new(Hs256Verifier::new(
			SecretString::from(TEST_AUTH_SECRET),
			None,
			0,
		))));
		let carrier = Arc::new(CarrierService::new(carrier, Duration::from_secs(5)));
		let engine = FulfillmentEngine::new(config, storage, auth, carrier);
		seed(&engine).await;
		router(
			AppState {
				engine: Arc::new(engine),
			},
			&api,
		)
	}

	async fn send(
		app: &Router,
		method: &str,
		uri: &str,
		auth: Option<&str>,
		body: Option<Value>,
	) -> (StatusCode, Value) {
		let mut request = Request::builder().method(method).uri(uri);
		if let Some(auth) = auth {
			request = request.header(AUTHORIZATION, auth);
		}
		let body = match body {
			Some(body) => {
				request = request.header("content-type", "application/json");
				Body::from(body.to_string())
			},
			None => Body::empty(),
		};

		let response = app
			.clone()
			.oneshot(request.body(body).unwrap())
			.await
			.unwrap();
		let status = response.status();
		let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
			.await
			.unwrap();
		let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
		(status, value)
	}

	#[tokio::test]
	async fn test_public_endpoints_need_no_credential() {
		let app = sandbox_app(ConfigBuilder::new().service_id("fulfillment-a").build()).await;

		let (status, body) = send(&app, "GET", "/health", None, None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["status"], "ok");
		assert_eq!(body["service"], "fulfillment-a");

		let (status, body) = send(&app, "GET", "/api/fulfillment/stages", None, None).await;
		assert_eq!(status, StatusCode::OK);
		assert!(body.as_array().is_some_and(|rules| !rules.is_empty()));
	}

	#[tokio::test]
	async fn test_missing_credential_is_401_before_body_checks() {
		let app = sandbox_app(ConfigBuilder::new().build()).await;

		let (status, body) = send(&app, "POST", "/api/shipments", None, Some(json!({}))).await;
		assert_eq!(status, StatusCode::UNAUTHORIZED);
		assert_eq!(body["error"], "UNAUTHORIZED");

		let (status, _) = send(
			&app,
			"GET",
			"/api/tracking?orderId=ord-1",
			Some("Bearer not-a-token"),
			None,
		)
		.await;
		assert_eq!(status, StatusCode::UNAUTHORIZED);
	}

	#[tokio::test]
	async fn test_shipment_then_duplicate_then_tracking() {
		let app = sandbox_app(ConfigBuilder::new().build()).await;
		let seller = token("seller-user");

		let (status, created) = send(
			&app,
			"POST",
			"/api/shipments",
			Some(&seller),
			Some(json!({ "orderId": "ord-1", "remarks": "fragile" })),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(created["success"], true);
		let tracking_id = created["trackingId"].as_str().unwrap().to_string();
		assert!(!tracking_id.is_empty());
		assert!(created["shippingReferenceNo"]
			.as_str()
			.unwrap()
			.starts_with("MKT-ord-1-"));

		let (status, duplicate) = send(
			&app,
			"POST",
			"/api/shipments",
			Some(&seller),
			Some(json!({ "orderId": "ord-1" })),
		)
		.await;
		assert_eq!(status, StatusCode::CONFLICT);
		assert_eq!(duplicate["error"], "ALREADY_SHIPPED");
		assert_eq!(duplicate["details"]["trackingId"], tracking_id.as_str());

		let (status, tracking) = send(
			&app,
			"GET",
			"/api/tracking?orderId=ord-1",
			Some(&token("buyer-1")),
			None,
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(tracking["trackingId"], tracking_id.as_str());
		assert_eq!(tracking["shippingReferenceNo"], created["shippingReferenceNo"]);
	}

	#[tokio::test]
	async fn test_tracking_query_modes() {
		let app = sandbox_app(ConfigBuilder::new().build()).await;
		let buyer = token("buyer-1");

		let (status, body) = send(
			&app,
			"POST",
			"/api/tracking",
			Some(&buyer),
			Some(json!({ "trackingId": "TRK1" })),
		)
		.await;
		assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
		assert_eq!(body["error"], "NOT_IMPLEMENTED");

		let (status, body) = send(&app, "GET", "/api/tracking", Some(&buyer), None).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "VALIDATION_ERROR");

		let (status, body) = send(
			&app,
			"GET",
			"/api/tracking?orderId=ord-1",
			Some(&buyer),
			None,
		)
		.await;
		assert_eq!(status, StatusCode::NOT_FOUND);
		assert_eq!(body["error"], "NOT_FOUND");
	}

	#[tokio::test]
	async fn test_unknown_order_hidden_from_non_admins() {
		let app = sandbox_app(ConfigBuilder::new().build()).await;
		let request = json!({ "orderId": "ord-404" });

		let (status, _) = send(
			&app,
			"POST",
			"/api/shipments",
			Some(&token("seller-user")),
			Some(request.clone()),
		)
		.await;
		assert_eq!(status, StatusCode::FORBIDDEN);

		let (status, body) = send(
			&app,
			"POST",
			"/api/shipments",
			Some(&admin_token()),
			Some(request),
		)
		.await;
		assert_eq!(status, StatusCode::NOT_FOUND);
		assert_eq!(body["error"], "NOT_FOUND");
	}

	#[tokio::test]
	async fn test_malformed_body_is_validation_error() {
		let app = sandbox_app(ConfigBuilder::new().build()).await;

		let (status, body) = send(
			&app,
			"POST",
			"/api/shipments",
			Some(&token("seller-user")),
			Some(json!({ "remarks": "no order id" })),
		)
		.await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "VALIDATION_ERROR");

		let (status, body) = send(
			&app,
			"POST",
			"/api/shipments",
			Some(&token("seller-user")),
			Some(json!({ "orderId": "   " })),
		)
		.await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "VALIDATION_ERROR");
	}

	#[tokio::test]
	async fn test_sandbox_rejection_reports_reference() {
		let app = sandbox_app(ConfigBuilder::new().sandbox_fail_with("Invalid city").build()).await;

		let (status, body) = send(
			&app,
			"POST",
			"/api/shipments",
			Some(&token("seller-user")),
			Some(json!({ "orderId": "ord-1" })),
		)
		.await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "CARRIER_REJECTED");
		assert!(body["details"]["shippingReferenceNo"]
			.as_str()
			.unwrap()
			.starts_with("MKT-ord-1-"));
	}

	#[tokio::test]
	async fn test_carrier_receives_built_request() {
		let mut carrier = MockCarrier::new();
		carrier
			.expect_create_shipment()
			.withf(|request| {
				request.cod_amount_to_collect == Decimal::from(300)
					&& request.recipient.district == "San Isidro"
			})
			.times(1)
			.returning(|_| {
				Ok(CarrierResult {
					tracking_id: "TRK-MOCK".into(),
					total_shipping_amount: Decimal::new(8500, 2),
					raw_response: json!({ "Success": true }),
				})
			});
		let app = mock_app(carrier).await;

		let (status, body) = send(
			&app,
			"POST",
			"/api/shipments",
			Some(&token("seller-user")),
			Some(json!({ "orderId": "ord-1" })),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["trackingId"], "TRK-MOCK");
		assert_eq!(body["totalShippingAmount"], 85.0);
	}

	#[tokio::test]
	async fn test_carrier_transport_failure() {
		let mut carrier = MockCarrier::new();
		carrier.expect_create_shipment().times(1).returning(|_| {
			Err(CarrierError::Transport {
				message: "connection reset".into(),
				raw_body: None,
			})
		});
		let app = mock_app(carrier).await;

		let (status, body) = send(
			&app,
			"POST",
			"/api/shipments",
			Some(&token("seller-user")),
			Some(json!({ "orderId": "ord-1" })),
		)
		.await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "CARRIER_TRANSPORT_ERROR");

		let (status, _) = send(
			&app,
			"GET",
			"/api/tracking?orderId=ord-1",
			Some(&token("buyer-1")),
			None,
		)
		.await;
		assert_eq!(status, StatusCode::NOT_FOUND);
	}

	#[tokio::test]
	async fn test_slow_carrier_outlasts_request_timeout() {
		let carrier = SlowCarrier {
			delay: Duration::from_millis(1500),
			inner: SandboxCarrier::new(SandboxCarrierConfig {
				shipping_fee: 85.0,
				fail_with: None,
			}),
		};
		let api = ApiConfig {
			timeout_seconds: 1,
			..ApiConfig::default()
		};
		let app = carrier_app(Box::new(carrier), api).await;

		let (status, body) = send(
			&app,
			"POST",
			"/api/shipments",
			Some(&token("seller-user")),
			Some(json!({ "orderId": "ord-1" })),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		let tracking_id = body["trackingId"].as_str().unwrap().to_string();

		let (status, body) = send(
			&app,
			"GET",
			"/api/tracking?orderId=ord-1",
			Some(&token("buyer-1")),
			None,
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["trackingId"], tracking_id.as_str());
	}

	#[tokio::test]
	async fn test_transitions() {
		let app = sandbox_app(ConfigBuilder::new().build()).await;
		let seller = token("seller-user");
		let uri = "/api/orders/ord-1/transitions";

		let (status, body) = send(
			&app,
			"POST",
			uri,
			Some(&seller),
			Some(json!({ "action": "move_to_ship" })),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["status"], "to_ship");
		assert_eq!(body["fulfillmentStage"], "to_pack");

		let (status, body) = send(
			&app,
			"POST",
			uri,
			Some(&seller),
			Some(json!({ "action": "confirm_handover" })),
		)
		.await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "VALIDATION_ERROR");

		let (status, body) = send(
			&app,
			"POST",
			uri,
			Some(&seller),
			Some(json!({ "action": "teleport" })),
		)
		.await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "VALIDATION_ERROR");

		let (status, _) = send(
			&app,
			"POST",
			uri,
			Some(&seller),
			Some(json!({ "action": "cancel" })),
		)
		.await;
		assert_eq!(status, StatusCode::FORBIDDEN);

		let (status, _) = send(
			&app,
			"POST",
			uri,
			Some(&token("stranger")),
			Some(json!({ "action": "move_to_arrangement" })),
		)
		.await;
		assert_eq!(status, StatusCode::FORBIDDEN);

		let (status, body) = send(
			&app,
			"POST",
			uri,
			Some(&admin_token()),
			Some(json!({ "action": "cancel", "note": "buyer request" })),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["status"], "cancelled");
	}
}
