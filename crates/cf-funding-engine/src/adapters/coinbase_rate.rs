//! Coinbase exchange-rate source.
//!
//! `GET {url}?currency={base}` answers
//! `{"data": {"currency": "ETH", "rates": {"EUR": "2345.67", ...}}}`.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

use crate::domain::CurrencyPair;
use crate::ports::{RateError, RateSource};

/// HTTP rate source backed by the Coinbase exchange-rates endpoint.
pub struct CoinbaseRateSource {
    client: Client,
    url: String,
}

impl CoinbaseRateSource {
    /// Create a source for `url` with a request timeout.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RateError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RateError::Unreachable(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

/// Pull `data.rates.{quote}` out of a response body.
pub fn parse_rate(body: &Value, pair: &CurrencyPair) -> Result<Decimal, RateError> {
    let raw = body
        .get("data")
        .and_then(|d| d.get("rates"))
        .ok_or_else(|| RateError::Malformed("missing data.rates".to_string()))?
        .get(&pair.quote)
        .ok_or_else(|| RateError::Unavailable(pair.to_string()))?;

    let rate = match raw {
        Value::String(s) => Decimal::from_str(s.trim())
            .map_err(|e| RateError::Malformed(format!("{}: {}", s, e)))?,
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .map_err(|e| RateError::Malformed(format!("{}: {}", n, e)))?,
        other => return Err(RateError::Malformed(format!("rate is {}", other))),
    };

    if rate <= Decimal::ZERO {
        return Err(RateError::Unavailable(pair.to_string()));
    }
    Ok(rate)
}

#[async_trait]
impl RateSource for CoinbaseRateSource {
    async fn fetch_rate(&self, pair: &CurrencyPair) -> Result<Decimal, RateError> {
        debug!("[cf-rates] Fetching {} from {}", pair, self.url);
        let response = self
            .client
            .get(&self.url)
            .query(&[("currency", pair.base.as_str())])
            .send()
            .await
            .map_err(|e| RateError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RateError::Unreachable(format!("HTTP {}", response.status())));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| RateError::Malformed(e.to_string()))?;
        parse_rate(&body, pair)
    }
}
