//! HTTP price oracle
//!
//! Talks to a quote service exposing `GET {endpoint}/quotes/{symbol}` that
//! answers `{ "symbol": "ACME", "price": 100.5 }`.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use bigdecimal::BigDecimal;

use crate::error::{OracleError, OracleResult};
use crate::oracle::{PriceOracle, Quote};

#[derive(Debug, Deserialize)]
struct QuoteBody {
    symbol: String,
    price: serde_json::Number,
}

/// HTTP-based price oracle
pub struct HttpPriceOracle {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpPriceOracle {
    /// Create a new HTTP price oracle with a per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> OracleResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OracleError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn map_send_error(&self, e: reqwest::Error) -> OracleError {
        if e.is_timeout() {
            OracleError::Timeout(self.timeout.as_millis() as u64)
        } else {
            OracleError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl PriceOracle for HttpPriceOracle {
    async fn quote(&self, symbol: &str) -> OracleResult<Quote> {
        let url = format!("{}/quotes/{}", self.base_url, symbol);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(OracleError::UnknownSymbol(symbol.to_string())),
            status if !status.is_success() => {
                let error_text = response.text().await.unwrap_or_default();
                return Err(OracleError::Provider(format!("{}: {}", status, error_text)));
            }
            _ => {}
        }

        let body: QuoteBody = response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.map_send_error(e)
            } else {
                OracleError::Provider(format!("undecodable quote: {}", e))
            }
        })?;

        if body.symbol != symbol {
            return Err(OracleError::Provider(format!(
                "asked for {} but got a quote for {}",
                symbol, body.symbol
            )));
        }

        let price = BigDecimal::from_str(&body.price.to_string()).map_err(|_| {
            OracleError::InvalidPrice {
                symbol: symbol.to_string(),
                price: body.price.to_string(),
            }
        })?;

        debug!(symbol, %price, "Fetched quote");
        Quote::new(symbol, price)
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use axum::extract::Path;
    use axum::http::StatusCode as AxumStatus;
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    async fn fake_quote(Path(symbol): Path<String>) -> Response {
        match symbol.as_str() {
            "ACME" => Json(json!({ "symbol": "ACME", "price": 100.25 })).into_response(),
            "FREE" => Json(json!({ "symbol": "FREE", "price": 0 })).into_response(),
            "JUNK" => (AxumStatus::OK, "not json").into_response(),
            "FAIL" => (AxumStatus::INTERNAL_SERVER_ERROR, "boom").into_response(),
            "SLOW" => {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Json(json!({ "symbol": "SLOW", "price": 1 })).into_response()
            }
            _ => AxumStatus::NOT_FOUND.into_response(),
        }
    }

    async fn spawn_fake() -> String {
        let app = Router::new().route("/quotes/:symbol", get(fake_quote));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    #[tokio::test]
    async fn test_http_quote_ok() {
        let oracle = HttpPriceOracle::new(&spawn_fake().await, Duration::from_secs(2)).unwrap();
        let quote = oracle.quote("ACME").await.unwrap();
        assert_eq!(quote.price, BigDecimal::from_str("100.25").unwrap());
    }

    #[tokio::test]
    async fn test_http_error_mapping() {
        let oracle = HttpPriceOracle::new(&spawn_fake().await, Duration::from_millis(300)).unwrap();

        assert_matches!(oracle.quote("NOPE").await, Err(OracleError::UnknownSymbol(_)));
        assert_matches!(oracle.quote("FAIL").await, Err(OracleError::Provider(_)));
        assert_matches!(oracle.quote("JUNK").await, Err(OracleError::Provider(_)));
        assert_matches!(oracle.quote("FREE").await, Err(OracleError::InvalidPrice { .. }));
        assert_matches!(oracle.quote("SLOW").await, Err(OracleError::Timeout(300)));
    }

    #[tokio::test]
    async fn test_http_unreachable() {
        let oracle = HttpPriceOracle::new("http://127.0.0.1:1", Duration::from_millis(200)).unwrap();
        assert_matches!(
            oracle.quote("ACME").await,
            Err(OracleError::Transport(_) | OracleError::Timeout(_))
        );
    }
}
