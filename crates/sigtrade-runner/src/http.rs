//! HTTP API.
//!
//! | Route                        | Purpose                          |
//! |------------------------------|----------------------------------|
//! | `POST /api/signal`           | BUY/SELL signal for a coin       |
//! | `POST /api/open-long`        | open a long position             |
//! | `POST /api/open-short`       | open a short position            |
//! | `POST /api/close-position`   | close the position for a symbol  |
//! | `POST /api/close/{tradeId}`  | close by opening order ID        |
//! | `GET  /api/trades`           | active trades                    |
//! | `GET  /api/status`           | service status                   |
//! | `GET/POST /api/settings`     | read / replace trade settings    |
//!
//! Failures are answered as `{"success": false, "message": ...}` with a
//! status derived from the [`TradeError`] kind.

use std::path::Path;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path as UrlPath, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use sigtrade_core::enums::SignalSide;
use sigtrade_core::error::TradeError;
use sigtrade_core::symbol::display_symbol;
use sigtrade_core::trading::{ActiveTrade, TradeSettings};
use sigtrade_engine::TradeManager;
use sigtrade_engine::opener::OpenRequest;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{info, warn};

/// Shared handler state.
pub struct AppState {
    pub manager: TradeManager,
    pub test_mode: bool,
}

type Shared = State<Arc<AppState>>;

/// Build the application router. `static_dir`, when set, is served for
/// every path outside `/api`.
pub fn router(state: Arc<AppState>, static_dir: Option<&Path>) -> Router {
    let api = Router::new()
        .route("/signal", post(handle_signal))
        .route("/open-long", post(open_long))
        .route("/open-short", post(open_short))
        .route("/close-position", post(close_position))
        .route("/close/{trade_id}", post(close_trade))
        .route("/trades", get(list_trades))
        .route("/status", get(status))
        .route("/settings", get(get_settings).post(save_settings));

    let mut app = Router::new().nest("/api", api);
    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }
    app.layer(CorsLayer::permissive()).with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A [`TradeError`] on its way to the client.
pub struct HttpError(TradeError);

impl From<TradeError> for HttpError {
    fn from(e: TradeError) -> Self {
        Self(e)
    }
}

impl From<JsonRejection> for HttpError {
    fn from(e: JsonRejection) -> Self {
        Self(TradeError::Validation(format!("invalid request body: {}", e.body_text())))
    }
}

fn status_for(e: &TradeError) -> StatusCode {
    match e {
        TradeError::Validation(_) => StatusCode::BAD_REQUEST,
        TradeError::Conflict(_) => StatusCode::CONFLICT,
        TradeError::NotFound(_) => StatusCode::NOT_FOUND,
        TradeError::Upstream(_) | TradeError::PrecisionExhausted { .. } => StatusCode::BAD_GATEWAY,
        TradeError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            warn!("[http] {status}: {}", self.0);
        }
        (status, Json(json!({ "success": false, "message": self.0.to_string() }))).into_response()
    }
}

type HttpResult = Result<Json<Value>, HttpError>;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SignalBody {
    #[serde(rename = "COINNAME", default)]
    coin_name: Option<String>,
    #[serde(rename = "SIDE", default)]
    side: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenBody {
    #[serde(default)]
    symbol: String,
    amount: Option<f64>,
    take_profit_percentage: Option<f64>,
    stop_loss_percentage: Option<f64>,
}

impl From<OpenBody> for OpenRequest {
    fn from(b: OpenBody) -> Self {
        Self {
            symbol: b.symbol,
            amount: b.amount,
            take_profit_pct: b.take_profit_percentage,
            stop_loss_pct: b.stop_loss_percentage,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CloseBody {
    #[serde(default)]
    symbol: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn handle_signal(State(state): Shared, body: Result<Json<SignalBody>, JsonRejection>) -> HttpResult {
    let Json(body) = body?;
    let (Some(coin), Some(side)) = (body.coin_name.filter(|c| !c.trim().is_empty()), body.side) else {
        return Err(TradeError::Validation("COINNAME and SIDE are required".into()).into());
    };
    let side: SignalSide = side.parse()?;
    info!("[http] signal {} {}", coin.trim(), side.as_str());

    let outcome = state.manager.handle_signal(&coin, side).await?;
    Ok(Json(json!({
        "success": outcome.executed,
        "message": outcome.message,
        "signal": { "COINNAME": display_symbol(&outcome.symbol), "SIDE": outcome.side },
        "action": outcome.action,
        "result": outcome.result,
    })))
}

async fn open_long(State(state): Shared, body: Result<Json<OpenBody>, JsonRejection>) -> HttpResult {
    let Json(body) = body?;
    let opened = state.manager.open_long(body.into()).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("opened long {}", display_symbol(&opened.symbol)),
        "data": opened,
    })))
}

async fn open_short(State(state): Shared, body: Result<Json<OpenBody>, JsonRejection>) -> HttpResult {
    let Json(body) = body?;
    let opened = state.manager.open_short(body.into()).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("opened short {}", display_symbol(&opened.symbol)),
        "data": opened,
    })))
}

async fn close_position(State(state): Shared, body: Result<Json<CloseBody>, JsonRejection>) -> HttpResult {
    let Json(body) = body?;
    let closed = state.manager.close_position(&body.symbol).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("closed {} {}", closed.trade_type, display_symbol(&closed.symbol)),
        "data": closed,
    })))
}

async fn close_trade(State(state): Shared, UrlPath(trade_id): UrlPath<String>) -> HttpResult {
    let closed = state.manager.close_by_order_id(&trade_id).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("closed {} {}", closed.trade_type, display_symbol(&closed.symbol)),
        "data": closed,
    })))
}

async fn list_trades(State(state): Shared) -> Json<Vec<ActiveTrade>> {
    Json(state.manager.active_trades().await)
}

async fn status(State(state): Shared) -> Json<Value> {
    Json(json!({
        "success": true,
        "apiConnected": true,
        "isTestMode": state.test_mode,
        "activeTrades": state.manager.active_trades().await.len(),
    }))
}

async fn get_settings(State(state): Shared) -> Json<TradeSettings> {
    Json(state.manager.settings())
}

async fn save_settings(State(state): Shared, body: Result<Json<TradeSettings>, JsonRejection>) -> HttpResult {
    let Json(settings) = body?;
    let saved = state.manager.update_settings(settings)?;
    Ok(Json(json!({
        "success": true,
        "message": "settings saved",
        "settings": saved,
    })))
}
