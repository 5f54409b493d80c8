//! API routes for rewards

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::api::handlers::*;
use crate::engine::SettlementEngine;
use crate::valuation::ValuationAggregator;

/// Create the rewards router
pub fn create_router(state: Arc<RewardsApiState>) -> Router {
    Router::new()
        .route("/api/v1/rewards", post(create_reward))
        .route("/api/v1/rewards/:reward_id", get(get_reward))
        .route("/api/v1/users/:user_id/holdings", get(get_holdings))
        .route("/api/v1/users/:user_id/holdings/today", get(get_today_holdings))
        .route("/api/v1/users/:user_id/stats", get(get_stats))
        .route("/api/v1/users/:user_id/historical-value", get(get_historical_value))
        .with_state(state)
}

/// Get the API state for the router
pub fn create_api_state(engine: SettlementEngine, valuation: ValuationAggregator) -> Arc<RewardsApiState> {
    Arc::new(RewardsApiState {
        engine: Arc::new(engine),
        valuation: Arc::new(valuation),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::*;
    use crate::policy::{SettlementPolicy, ValuationPolicy};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use bigdecimal::BigDecimal;
    use market_data::MockPriceOracle;
    use serde::de::DeserializeOwned;
    use storage::{FaultPoint, InMemoryLedgerStore};
    use tower::ServiceExt;

    fn app_with(store: Arc<InMemoryLedgerStore>, oracle: Arc<MockPriceOracle>) -> Router {
        let engine = SettlementEngine::new(store.clone(), oracle.clone(), SettlementPolicy::default());
        let valuation = ValuationAggregator::new(store, oracle, ValuationPolicy::default());
        create_router(create_api_state(engine, valuation))
    }

    fn app() -> (Router, Arc<MockPriceOracle>) {
        let oracle = Arc::new(MockPriceOracle::new().with_price("ACME", BigDecimal::from(100)));
        (app_with(Arc::new(InMemoryLedgerStore::new()), oracle.clone()), oracle)
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn call<T: DeserializeOwned>(app: &Router, req: Request<Body>) -> (StatusCode, T) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_create_reward() {
        let (app, _) = app();
        let (status, body): (_, CreateRewardResponse) = call(
            &app,
            post_json("/api/v1/rewards", r#"{"user_id":1,"stock_symbol":"ACME","quantity":10}"#),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body.message, "Reward created");
        assert_eq!(body.total_company_cost, 1010.0);
        assert_eq!(body.currency, "INR");

        let (status, detail): (_, RewardDetailResponse) =
            call(&app, get_req(&format!("/api/v1/rewards/{}", body.reward_id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail.reward.stock_symbol, "ACME");
        assert_eq!(detail.ledger.len(), 3);
        assert_eq!(detail.ledger[1].amount, -1000.0);
    }

    #[tokio::test]
    async fn test_invalid_quantity_is_400() {
        let (app, oracle) = app();
        let (status, body): (_, ErrorResponse) = call(
            &app,
            post_json("/api/v1/rewards", r#"{"user_id":1,"stock_symbol":"ACME","quantity":0}"#),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.success);
        assert_eq!(body.error.code, "INVALID_REQUEST");
        assert_eq!(oracle.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let (app, _) = app();
        let (status, body): (_, ErrorResponse) =
            call(&app, post_json("/api/v1/rewards", r#"{"user_id":1}"#)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error.code, "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn test_quote_unavailable_is_502() {
        let (app, _) = app();
        let (status, body): (_, ErrorResponse) = call(
            &app,
            post_json("/api/v1/rewards", r#"{"user_id":1,"stock_symbol":"ZETA","quantity":1}"#),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body.error.code, "QUOTE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_persistence_error_is_500() {
        let store = Arc::new(
            InMemoryLedgerStore::new().with_fault(FaultPoint::EntryInsert(
                common::types::AccountType::FeeExpense,
            )),
        );
        let oracle = Arc::new(MockPriceOracle::new().with_price("ACME", BigDecimal::from(100)));
        let app = app_with(store.clone(), oracle);

        let (status, body): (_, ErrorResponse) = call(
            &app,
            post_json("/api/v1/rewards", r#"{"user_id":1,"stock_symbol":"ACME","quantity":1}"#),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.code, "PERSISTENCE_ERROR");
        assert_eq!(body.error.message, "failed to record reward");
        assert_eq!(store.reward_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_reward_is_404() {
        let (app, _) = app();
        let (status, body): (_, ErrorResponse) = call(&app, get_req("/api/v1/rewards/77")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error.code, "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_bad_user_id_is_400() {
        let (app, _) = app();
        let (status, body): (_, ErrorResponse) = call(&app, get_req("/api/v1/users/abc/holdings")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error.code, "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn test_holdings_today_and_stats() {
        let (app, oracle) = app();
        for qty in ["4", "6"] {
            let body = format!(r#"{{"user_id":5,"stock_symbol":"ACME","quantity":{}}}"#, qty);
            let (status, _): (_, CreateRewardResponse) = call(&app, post_json("/api/v1/rewards", &body)).await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, holdings): (_, HoldingsResponse) = call(&app, get_req("/api/v1/users/5/holdings")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(holdings.holdings["ACME"], 10.0);

        let (status, today): (_, Vec<TodayHoldingResponse>) =
            call(&app, get_req("/api/v1/users/5/holdings/today")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(today.len(), 1);
        assert_eq!(today[0].stock_symbol, "ACME");
        assert_eq!(today[0].total_quantity, 10.0);

        oracle.set_price("ACME", BigDecimal::from(120));
        let (status, stats): (_, StatsResponse) = call(&app, get_req("/api/v1/users/5/stats")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats.total_shares_by_stock["ACME"], 10.0);
        assert_eq!(stats.current_portfolio_value, 1200.0);
        assert_eq!(stats.currency, "INR");
    }

    #[tokio::test]
    async fn test_historical_value_is_501() {
        let (app, _) = app();
        let (status, body): (_, ErrorResponse) =
            call(&app, get_req("/api/v1/users/5/historical-value")).await;

        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
        assert_eq!(body.error.code, "NOT_IMPLEMENTED");
    }

    #[tokio::test]
    async fn test_historical_value_rejects_non_positive_user() {
        let (app, _) = app();
        for uri in ["/api/v1/users/0/historical-value", "/api/v1/users/-3/historical-value"] {
            let (status, body): (_, ErrorResponse) = call(&app, get_req(uri)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body.error.code, "INVALID_REQUEST");
        }
    }

    #[tokio::test]
    async fn test_oversized_quantity_is_400() {
        let (app, oracle) = app();
        let (status, body): (_, ErrorResponse) = call(
            &app,
            post_json(
                "/api/v1/rewards",
                r#"{"user_id": 1, "stock_symbol": "ACME", "quantity": 1e15}"#,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error.code, "INVALID_REQUEST");
        assert_eq!(oracle.total_calls(), 0);
    }
}
