use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    controllers::input::{check_price, parse_symbol},
    error::{CommandError, StoreError},
    models::OwnerId,
    services::alerts_service::{self, UpdateOutcome},
    AppState,
};

fn bad_request(message: impl std::fmt::Display) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message.to_string() }))).into_response()
}

fn store_failure(e: StoreError) -> Response {
    tracing::error!(error = %e, "store error in api handler");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "store unavailable" })),
    )
        .into_response()
}

#[derive(Deserialize)]
pub struct NewAlert {
    pub symbol: String,
    pub target_price: f64,
}

#[derive(Deserialize)]
pub struct CreateAlertsBody {
    pub alerts: Vec<NewAlert>,
}

#[derive(Deserialize)]
pub struct UpdateAlertBody {
    pub target_price: f64,
}

#[derive(Deserialize)]
pub struct QuotesQuery {
    #[serde(default)]
    pub symbols: String,
}

// GET /api/owners/:owner/alerts
pub async fn get_alerts(State(state): State<AppState>, Path(owner): Path<OwnerId>) -> Response {
    match alerts_service::list_alerts(&state, owner).await {
        Ok(alerts) => (StatusCode::OK, Json(alerts)).into_response(),
        Err(e) => store_failure(e),
    }
}

// POST /api/owners/:owner/alerts
pub async fn post_alerts(
    State(state): State<AppState>,
    Path(owner): Path<OwnerId>,
    Json(body): Json<CreateAlertsBody>,
) -> Response {
    if body.alerts.is_empty() {
        return bad_request("at least one alert is required");
    }

    let mut pairs = Vec::with_capacity(body.alerts.len());
    for a in body.alerts {
        let parsed: Result<_, CommandError> =
            parse_symbol(&a.symbol).and_then(|s| Ok((s, check_price(a.target_price)?)));
        match parsed {
            Ok(pair) => pairs.push(pair),
            Err(e) => return bad_request(e),
        }
    }

    match alerts_service::add_alerts(&state, owner, &pairs).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => store_failure(e),
    }
}

// PUT /api/owners/:owner/alerts/:symbol
pub async fn put_alert(
    State(state): State<AppState>,
    Path((owner, symbol)): Path<(OwnerId, String)>,
    Json(body): Json<UpdateAlertBody>,
) -> Response {
    let symbol = match parse_symbol(&symbol) {
        Ok(s) => s,
        Err(e) => return bad_request(e),
    };
    let target_price = match check_price(body.target_price) {
        Ok(p) => p,
        Err(e) => return bad_request(e),
    };

    match alerts_service::update_alert(&state, owner, &symbol, target_price).await {
        Ok(UpdateOutcome::Updated { current_price }) => (
            StatusCode::OK,
            Json(json!({
                "symbol": symbol,
                "target_price": target_price,
                "current_price": current_price,
            })),
        )
            .into_response(),
        Ok(UpdateOutcome::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("no alert for {symbol}") })),
        )
            .into_response(),
        Err(e) => store_failure(e),
    }
}

// DELETE /api/owners/:owner/alerts/:symbol
pub async fn delete_alert(
    State(state): State<AppState>,
    Path((owner, symbol)): Path<(OwnerId, String)>,
) -> Response {
    let symbol = match parse_symbol(&symbol) {
        Ok(s) => s,
        Err(e) => return bad_request(e),
    };

    match state.store.remove_by_symbol(owner, &symbol).await {
        Ok(removed) => (StatusCode::OK, Json(json!({ "removed": removed }))).into_response(),
        Err(e) => store_failure(e),
    }
}

// DELETE /api/owners/:owner/alerts
pub async fn delete_alerts(State(state): State<AppState>, Path(owner): Path<OwnerId>) -> Response {
    match alerts_service::clear_alerts(&state, owner).await {
        Ok(removed) => (StatusCode::OK, Json(json!({ "removed": removed }))).into_response(),
        Err(e) => store_failure(e),
    }
}

// GET /api/quotes/:symbol
pub async fn get_quote(State(state): State<AppState>, Path(symbol): Path<String>) -> Response {
    let symbol = match parse_symbol(&symbol) {
        Ok(s) => s,
        Err(e) => return bad_request(e),
    };

    match alerts_service::stock_info(&state, &symbol).await {
        Ok(info) => (StatusCode::OK, Json(info)).into_response(),
        Err(e) => {
            tracing::warn!(symbol = %symbol, error = %e, "quote lookup failed");
            (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": format!("no quote for {symbol}") })),
            )
                .into_response()
        }
    }
}

// GET /api/quotes?symbols=HPG,VNM
pub async fn get_quotes(State(state): State<AppState>, Query(q): Query<QuotesQuery>) -> Response {
    let symbols: Vec<String> = q
        .symbols
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if symbols.is_empty() {
        return bad_request("symbols query parameter is required");
    }

    let quotes = alerts_service::quotes(&state, &symbols).await;
    (StatusCode::OK, Json(quotes)).into_response()
}
