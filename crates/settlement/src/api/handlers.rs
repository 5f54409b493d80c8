//! API handlers for the rewards HTTP endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use bigdecimal::BigDecimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::error;

use common::decimal::{from_f64, to_f64};
use common::types::{RewardId, UserId};

use crate::api::models::*;
use crate::engine::SettlementEngine;
use crate::error::SettlementError;
use crate::valuation::ValuationAggregator;

pub struct RewardsApiState {
    pub engine: Arc<SettlementEngine>,
    pub valuation: Arc<ValuationAggregator>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<T, ApiError>;

/// Map a settlement error to its status code and body
///
/// Persistence details are logged here and replaced by a generic message.
pub fn error_response(e: SettlementError) -> ApiError {
    let (status, code, message) = match e {
        SettlementError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST", msg),
        SettlementError::QuoteUnavailable { symbol, reason } => (
            StatusCode::BAD_GATEWAY,
            "QUOTE_UNAVAILABLE",
            format!("price for {} is unavailable: {}", symbol, reason),
        ),
        SettlementError::PersistenceError(err) => {
            error!(error = %err, "Persistence failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "PERSISTENCE_ERROR",
                "failed to record reward".to_string(),
            )
        }
        SettlementError::NotFound(what) => (StatusCode::NOT_FOUND, "NOT_FOUND", format!("{} not found", what)),
    };
    (status, Json(ErrorResponse::new(code, message)))
}

/// Map an amount that has no JSON number form
fn internal_error(e: common::Error) -> ApiError {
    error!(error = %e, "Response encoding failure");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new("INTERNAL_ERROR", "failed to encode response")),
    )
}

fn number(value: &BigDecimal) -> ApiResult<f64> {
    to_f64(value).map_err(internal_error)
}

fn quantity_map(holdings: &BTreeMap<String, BigDecimal>) -> ApiResult<BTreeMap<String, f64>> {
    holdings
        .iter()
        .map(|(symbol, qty)| -> ApiResult<(String, f64)> { Ok((symbol.clone(), number(qty)?)) })
        .collect()
}

fn parse_id(raw: &str, name: &str) -> ApiResult<i64> {
    raw.parse::<i64>()
        .map_err(|_| error_response(SettlementError::invalid(format!("invalid {}: {}", name, raw))))
}

/// Settle reward handler
pub async fn create_reward(
    State(state): State<Arc<RewardsApiState>>,
    payload: Result<Json<CreateRewardRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreateRewardResponse>)> {
    let Json(req) = payload
        .map_err(|rejection| error_response(SettlementError::invalid(rejection.body_text())))?;

    let quantity = from_f64(req.quantity)
        .map_err(|e| error_response(SettlementError::invalid(e.to_string())))?;

    let receipt = state
        .engine
        .settle(req.user_id, &req.stock_symbol, quantity)
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(CreateRewardResponse {
            message: "Reward created".to_string(),
            reward_id: receipt.reward_id,
            total_company_cost: number(&receipt.total_company_cost)?,
            currency: receipt.currency,
        }),
    ))
}

/// Get reward with its ledger legs
pub async fn get_reward(
    State(state): State<Arc<RewardsApiState>>,
    Path(reward_id): Path<String>,
) -> ApiResult<Json<RewardDetailResponse>> {
    let reward_id: RewardId = parse_id(&reward_id, "reward_id")?;
    let detail = state.engine.get_reward(reward_id).await.map_err(error_response)?;

    Ok(Json(RewardDetailResponse {
        reward: RewardResponse::try_from(detail.reward).map_err(internal_error)?,
        ledger: detail
            .legs
            .into_iter()
            .map(LedgerEntryResponse::try_from)
            .collect::<Result<_, _>>()
            .map_err(internal_error)?,
    }))
}

/// All-time holdings handler
pub async fn get_holdings(
    State(state): State<Arc<RewardsApiState>>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<HoldingsResponse>> {
    let user_id: UserId = parse_id(&user_id, "user_id")?;
    let holdings = state.valuation.holdings(user_id).await.map_err(error_response)?;

    Ok(Json(HoldingsResponse {
        user_id,
        holdings: quantity_map(&holdings)?,
    }))
}

/// Today's holdings handler
pub async fn get_today_holdings(
    State(state): State<Arc<RewardsApiState>>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<TodayHoldingResponse>>> {
    let user_id: UserId = parse_id(&user_id, "user_id")?;
    let holdings = state.valuation.today_holdings(user_id).await.map_err(error_response)?;

    let body = holdings
        .into_iter()
        .map(TodayHoldingResponse::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(internal_error)?;
    Ok(Json(body))
}

/// Portfolio stats handler
pub async fn get_stats(
    State(state): State<Arc<RewardsApiState>>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<StatsResponse>> {
    let user_id: UserId = parse_id(&user_id, "user_id")?;
    let stats = state.valuation.stats(user_id).await.map_err(error_response)?;

    Ok(Json(StatsResponse {
        total_shares_by_stock: quantity_map(&stats.holdings)?,
        current_portfolio_value: number(&stats.total_value)?,
        currency: stats.currency,
    }))
}

/// Historical valuation is not served yet
pub async fn get_historical_value(Path(user_id): Path<String>) -> ApiError {
    match parse_id(&user_id, "user_id") {
        Err(e) => return e,
        Ok(id) if id <= 0 => {
            return error_response(SettlementError::invalid("user_id must be positive"));
        }
        Ok(_) => {}
    }
    (
        StatusCode::NOT_IMPLEMENTED,
        Json(ErrorResponse::new(
            "NOT_IMPLEMENTED",
            "historical valuation from daily snapshots is not available",
        )),
    )
}
