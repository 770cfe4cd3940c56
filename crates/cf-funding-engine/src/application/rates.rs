//! # Exchange-Rate Cache
//!
//! Single-entry cache of the base → quote rate. A fetched rate stays valid
//! until the next successful refresh; a failed refresh keeps serving the
//! previous value and only the caller of `refresh` sees the error.
//!
//! Conversions never feed funding logic. They exist for display and for
//! turning a display-currency amount into native units before a donation.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::domain::{Amount, CurrencyPair, ExchangeRate};
use crate::ports::{RateError, RateSource};

/// Cached exchange rate in front of a `RateSource`.
pub struct ExchangeRateCache<R: RateSource> {
    source: Arc<R>,
    pair: CurrencyPair,
    native_decimals: u32,
    entry: RwLock<Option<ExchangeRate>>,
}

impl<R: RateSource> ExchangeRateCache<R> {
    /// Empty cache for the configured pair.
    pub fn new(source: Arc<R>, config: &EngineConfig) -> Self {
        Self {
            source,
            pair: config.currency_pair(),
            native_decimals: config.native_decimals,
            entry: RwLock::new(None),
        }
    }

    /// Pair served by this cache.
    pub fn pair(&self) -> &CurrencyPair {
        &self.pair
    }

    /// Last known rate, `None` if never fetched.
    pub fn rate(&self) -> Option<ExchangeRate> {
        self.entry.read().clone()
    }

    /// Last known rate for `base`/`quote`; `None` for any other pair.
    pub fn rate_for(&self, base: &str, quote: &str) -> Option<ExchangeRate> {
        let wanted = CurrencyPair::new(base, quote);
        self.rate().filter(|r| r.pair == wanted)
    }

    /// Fetch a fresh rate. On failure the cached value is left untouched.
    pub async fn refresh(&self) -> Result<ExchangeRate, RateError> {
        let fetched = match self.source.fetch_rate(&self.pair).await {
            Ok(value) => value,
            Err(e) => {
                warn!("[cf-rates] Refresh of {} failed, keeping last value: {}", self.pair, e);
                return Err(e);
            }
        };

        let rate = ExchangeRate::new(self.pair.clone(), fetched, Utc::now())
            .ok_or_else(|| RateError::Unavailable(self.pair.to_string()))?;
        info!("[cf-rates] {} = {}", self.pair, rate.rate);
        *self.entry.write() = Some(rate.clone());
        Ok(rate)
    }

    /// Native amount in display currency. `None` without a rate or on overflow.
    pub fn to_display(&self, amount: Amount) -> Option<Decimal> {
        let rate = self.rate()?;
        native_to_decimal(amount, self.native_decimals)?.checked_mul(rate.rate)
    }

    /// Display-currency amount in native units, truncated toward zero.
    pub fn from_display(&self, value: Decimal) -> Option<Amount> {
        if value.is_sign_negative() {
            return None;
        }
        let rate = self.rate()?;
        let native = value.checked_div(rate.rate)?;
        let smallest = native.checked_mul(unit_scale(self.native_decimals)?)?.trunc();
        debug!("[cf-rates] {} {} -> {} native", value, self.pair.quote, smallest);
        smallest.to_u128().map(Amount::from)
    }
}

/// `amount / 10^decimals` as a decimal, `None` if it does not fit.
pub fn native_to_decimal(amount: Amount, decimals: u32) -> Option<Decimal> {
    if amount > Amount::from(u128::MAX) {
        return None;
    }
    let raw = i128::try_from(amount.as_u128()).ok()?;
    Decimal::try_from_i128_with_scale(raw, decimals).ok()
}

fn unit_scale(decimals: u32) -> Option<Decimal> {
    (0..decimals).try_fold(Decimal::ONE, |acc, _| acc.checked_mul(Decimal::TEN))
}
