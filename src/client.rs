//! Crypto.com Exchange API client
//!
//! Covers the public candlestick endpoint and the signed private endpoints
//! for order management, order history, and account balances, with rate
//! limiting and transport-level retry.
//!
//! # Example
//!
//! ```no_run
//! use cryptocom_client::{CryptoComClient, Interval};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = CryptoComClient::new("api_key", "api_secret");
//!
//!     let candles = client
//!         .get_candlesticks("BTC_USD", Interval::Hour1, 25, None, None)
//!         .await?;
//!     println!("Fetched {} candles", candles.len());
//!
//!     let portfolio = client.get_portfolio().await?;
//!     for item in portfolio {
//!         println!("{}: {}", item.currency, item.market_value);
//!     }
//!
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client as HttpClient;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::auth::{build_envelope, Credentials};
use crate::error::{Error, Result};
use crate::pagination::{Direction, RangeWalker, TimeWindow, WalkError, WalkerConfig};
use crate::rate_limiter::RateLimiter;
use crate::types::{
    ApiResponse, Candle, CandlestickResult, Interval, Order, OrderAck, OrderHistoryResult,
    PortfolioItem, Side, UserBalance, UserBalanceResult,
};

/// Base URL for the exchange REST API
pub const API_BASE_URL: &str = "https://api.crypto.com/exchange/v1";

/// Maximum candles per `public/get-candlestick` response
pub const MAX_CANDLES_PER_PAGE: usize = 300;

/// Maximum records per `private/get-order-history` response
pub const MAX_ORDERS_PER_PAGE: usize = 100;

const PUBLIC_GET_CANDLESTICK: &str = "public/get-candlestick";
const PRIVATE_GET_ORDER_HISTORY: &str = "private/get-order-history";
const PRIVATE_CREATE_ORDER: &str = "private/create-order";
const PRIVATE_CANCEL_ORDER: &str = "private/cancel-order";
const PRIVATE_CANCEL_ALL_ORDERS: &str = "private/cancel-all-orders";
const PRIVATE_GET_ORDER_DETAIL: &str = "private/get-order-detail";
const PRIVATE_USER_BALANCE: &str = "private/user-balance";

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root; overridable for testing against a mock server
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Maximum retry attempts for transport-level failures
    pub max_retries: u32,
    /// Request pacing, calls per second
    pub requests_per_second: u32,
    /// Fetch budget for one paginated walk
    pub max_fetches_per_walk: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: API_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            requests_per_second: 10,
            max_fetches_per_walk: 10_000,
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_rate_limit(mut self, requests_per_second: u32) -> Self {
        self.requests_per_second = requests_per_second;
        self
    }

    pub fn with_max_fetches_per_walk(mut self, max_fetches: usize) -> Self {
        self.max_fetches_per_walk = max_fetches;
        self
    }
}

/// Crypto.com Exchange API client
#[derive(Debug, Clone)]
pub struct CryptoComClient {
    credentials: Credentials,
    http: HttpClient,
    rate_limiter: RateLimiter,
    config: ClientConfig,
}

impl CryptoComClient {
    /// Create a client with API credentials and default configuration
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self::with_config(Credentials::new(api_key, api_secret), ClientConfig::default())
    }

    /// Create a client with custom configuration
    pub fn with_config(credentials: Credentials, config: ClientConfig) -> Self {
        let http = HttpClient::builder()
            .timeout(config.timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            credentials,
            http,
            rate_limiter: RateLimiter::per_second(config.requests_per_second),
            config,
        }
    }

    /// Create a client from `CRYPTOCOM_API_KEY` and `CRYPTOCOM_API_SECRET`
    pub fn from_env() -> Result<Self> {
        Ok(Self::with_config(
            Credentials::from_env()?,
            ClientConfig::default(),
        ))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // =========================================================================
    // Transport
    // =========================================================================

    /// Retry `operation` with exponential backoff on transport failures.
    /// Exchange rejections and parse failures are never retried.
    async fn request_with_retry<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(2u64.pow(attempt - 1));
                debug!("retrying after {}ms", delay.as_millis());
                sleep(delay).await;
            }

            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transport() && attempt < self.config.max_retries => {
                    warn!(
                        "request failed (attempt {}/{}): {}",
                        attempt + 1,
                        self.config.max_retries + 1,
                        e
                    );
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error
            .unwrap_or_else(|| Error::Config("request failed after retries".to_string())))
    }

    /// Public GET request; query parameters, no signature
    async fn get_public<T: DeserializeOwned>(
        &self,
        method: &str,
        query: Vec<(String, String)>,
    ) -> Result<T> {
        self.rate_limiter.acquire().await;

        let url = format!("{}/{}", self.config.base_url, method);
        debug!("GET {}", method);
        let response = self.http.get(&url).query(&query).send().await?;
        let status = response.status();
        let text = response.text().await?;

        expect_result(decode_response(status, &text)?)
    }

    /// Private POST request with a signed envelope body
    async fn post_signed<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Map<String, Value>,
    ) -> Result<ApiResponse<T>> {
        self.rate_limiter.acquire().await;

        let envelope = build_envelope(method, params, &self.credentials)?;
        let url = format!("{}/{}", self.config.base_url, method);
        debug!("POST {} (request id {})", method, envelope.id);
        let response = self.http.post(&url).json(&envelope).send().await?;
        let status = response.status();
        let text = response.text().await?;

        decode_response(status, &text)
    }

    /// Signed POST whose result payload is required
    async fn post_result<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Map<String, Value>,
    ) -> Result<T> {
        expect_result(self.post_signed(method, params).await?)
    }

    /// Signed POST where only the success code matters
    async fn post_ack(&self, method: &str, params: Map<String, Value>) -> Result<()> {
        let _: ApiResponse<Value> = self.post_signed(method, params).await?;
        Ok(())
    }

    // =========================================================================
    // Candlesticks
    // =========================================================================

    /// Fetch one page of OHLCV bars
    ///
    /// # Arguments
    /// * `instrument_name` - Trading pair (e.g., "BTC_USD")
    /// * `interval` - Bar timeframe
    /// * `count` - Number of bars (clamped to the 300-bar endpoint cap)
    /// * `start_ts` / `end_ts` - Optional window bounds, Unix milliseconds
    pub async fn get_candlesticks(
        &self,
        instrument_name: &str,
        interval: Interval,
        count: usize,
        start_ts: Option<i64>,
        end_ts: Option<i64>,
    ) -> Result<Vec<Candle>> {
        let count = count.clamp(1, MAX_CANDLES_PER_PAGE);
        let mut query = vec![
            ("instrument_name".to_string(), instrument_name.to_string()),
            ("timeframe".to_string(), interval.as_str().to_string()),
            ("count".to_string(), count.to_string()),
        ];
        if let Some(start) = start_ts {
            query.push(("start_ts".to_string(), start.to_string()));
        }
        if let Some(end) = end_ts {
            query.push(("end_ts".to_string(), end.to_string()));
        }

        let result: CandlestickResult = self
            .request_with_retry(|| self.get_public(PUBLIC_GET_CANDLESTICK, query.clone()))
            .await?;
        Ok(result.data)
    }

    /// Download every bar in the requested range by walking backward
    /// through the capped candlestick endpoint
    ///
    /// With `start = None` the walk continues until the exchange runs out
    /// of history. On failure the error carries the bars retrieved so far.
    pub async fn get_all_candlesticks(
        &self,
        instrument_name: &str,
        interval: Interval,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> std::result::Result<Vec<Candle>, WalkError<Candle>> {
        let now_ms = Utc::now().timestamp_millis();
        let end_ms = end.map_or(now_ms, |d| d.timestamp_millis().min(now_ms));
        let window = match start {
            Some(s) => TimeWindow::closed(s.timestamp_millis(), end_ms),
            None => TimeWindow::until(end_ms),
        };

        info!(
            "downloading {} {} candlesticks over {}",
            instrument_name, interval, window
        );

        let walker = RangeWalker::new(
            WalkerConfig::default()
                .with_max_page_size(MAX_CANDLES_PER_PAGE)
                .with_direction(Direction::Backward)
                .with_max_fetches(self.config.max_fetches_per_walk),
        );
        let candles = walker
            .collect(window, |win| {
                self.candlestick_page(instrument_name, interval, win)
            })
            .await?;

        info!(
            "downloaded {} candlesticks for {} {}",
            candles.len(),
            instrument_name,
            interval
        );
        Ok(candles)
    }

    async fn candlestick_page(
        &self,
        instrument_name: &str,
        interval: Interval,
        window: TimeWindow,
    ) -> Result<Vec<Candle>> {
        self.get_candlesticks(
            instrument_name,
            interval,
            MAX_CANDLES_PER_PAGE,
            window.start,
            Some(window.end),
        )
        .await
    }

    // =========================================================================
    // Order history
    // =========================================================================

    /// Fetch one page of order history (newest first, 100-record cap)
    pub async fn get_order_history(
        &self,
        instrument_name: Option<&str>,
        start_time: i64,
        end_time: i64,
        limit: usize,
    ) -> Result<Vec<Order>> {
        let mut params = Map::new();
        if let Some(name) = instrument_name {
            params.insert("instrument_name".to_string(), json!(name));
        }
        params.insert("start_time".to_string(), json!(start_time));
        params.insert("end_time".to_string(), json!(end_time));
        params.insert(
            "limit".to_string(),
            json!(limit.clamp(1, MAX_ORDERS_PER_PAGE)),
        );

        let result: OrderHistoryResult = self
            .request_with_retry(|| self.post_result(PRIVATE_GET_ORDER_HISTORY, params.clone()))
            .await?;
        Ok(result.data)
    }

    /// Retrieve every order in `[start, end]`, splitting the range whenever
    /// a page comes back at the endpoint's record cap
    pub async fn get_all_order_history(
        &self,
        instrument_name: Option<&str>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> std::result::Result<Vec<Order>, WalkError<Order>> {
        let window = TimeWindow::closed(start.timestamp_millis(), end.timestamp_millis());

        info!("downloading order history over {}", window);

        let walker = RangeWalker::new(
            WalkerConfig::default()
                .with_max_page_size(MAX_ORDERS_PER_PAGE)
                .with_direction(Direction::Backward)
                .with_max_fetches(self.config.max_fetches_per_walk),
        );
        walker
            .collect(window, |win| self.order_history_page(instrument_name, win))
            .await
    }

    /// Every order created on `day` (UTC)
    pub async fn get_order_history_for_day(
        &self,
        instrument_name: Option<&str>,
        day: NaiveDate,
    ) -> std::result::Result<Vec<Order>, WalkError<Order>> {
        let start = day.and_hms_opt(0, 0, 0).unwrap().and_utc();
        let end = start + chrono::Duration::days(1) - chrono::Duration::milliseconds(1);
        self.get_all_order_history(instrument_name, start, end).await
    }

    async fn order_history_page(
        &self,
        instrument_name: Option<&str>,
        window: TimeWindow,
    ) -> Result<Vec<Order>> {
        // order-history walks always use a closed window
        let start = window.start.unwrap_or(0);
        self.get_order_history(instrument_name, start, window.end, MAX_ORDERS_PER_PAGE)
            .await
    }

    // =========================================================================
    // Order management
    // =========================================================================

    /// Place a limit order
    ///
    /// Not retried internally: a transport failure here is surfaced to the
    /// caller, who must check order state before resubmitting.
    pub async fn create_limit_order(
        &self,
        instrument_name: &str,
        side: Side,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<OrderAck> {
        let mut params = Map::new();
        params.insert("instrument_name".to_string(), json!(instrument_name));
        params.insert("side".to_string(), json!(side.to_string()));
        params.insert("type".to_string(), json!("LIMIT"));
        params.insert("quantity".to_string(), json!(quantity.to_string()));
        params.insert("price".to_string(), json!(price.to_string()));

        let ack: OrderAck = self.post_result(PRIVATE_CREATE_ORDER, params).await?;
        info!(
            "placed {} limit order {} on {}: {} @ {}",
            side, ack.order_id, instrument_name, quantity, price
        );
        Ok(ack)
    }

    /// Cancel one order; the exchange confirms asynchronously
    pub async fn cancel_order(&self, order_id: &str) -> Result<()> {
        let mut params = Map::new();
        params.insert("order_id".to_string(), json!(order_id));

        self.request_with_retry(|| self.post_ack(PRIVATE_CANCEL_ORDER, params.clone()))
            .await?;
        info!("cancel requested for order {}", order_id);
        Ok(())
    }

    /// Cancel all open orders, optionally for a single instrument
    pub async fn cancel_all_orders(&self, instrument_name: Option<&str>) -> Result<()> {
        let mut params = Map::new();
        if let Some(name) = instrument_name {
            params.insert("instrument_name".to_string(), json!(name));
        }

        self.request_with_retry(|| self.post_ack(PRIVATE_CANCEL_ALL_ORDERS, params.clone()))
            .await?;
        info!(
            "cancel-all requested{}",
            instrument_name
                .map(|n| format!(" for {}", n))
                .unwrap_or_default()
        );
        Ok(())
    }

    /// Fetch the current state of one order
    pub async fn get_order_detail(&self, order_id: &str) -> Result<Order> {
        let mut params = Map::new();
        params.insert("order_id".to_string(), json!(order_id));

        self.request_with_retry(|| self.post_result(PRIVATE_GET_ORDER_DETAIL, params.clone()))
            .await
    }

    // =========================================================================
    // Balances
    // =========================================================================

    /// Raw per-account balances
    pub async fn get_user_balance(&self) -> Result<Vec<UserBalance>> {
        let result: UserBalanceResult = self
            .request_with_retry(|| self.post_result(PRIVATE_USER_BALANCE, Map::new()))
            .await?;
        Ok(result.data)
    }

    /// Flattened per-currency portfolio summary, largest position first
    pub async fn get_portfolio(&self) -> Result<Vec<PortfolioItem>> {
        let balances = self.get_user_balance().await?;
        Ok(crate::types::summarize_positions(&balances))
    }
}

/// Decode an HTTP response body into the API envelope, mapping HTTP-level
/// and exchange-level failures to typed errors
fn decode_response<T: DeserializeOwned>(
    status: reqwest::StatusCode,
    text: &str,
) -> Result<ApiResponse<T>> {
    if !status.is_success() {
        // rejections still carry an exchange code in the body when the
        // request reached the API at all
        if let Ok(err) = serde_json::from_str::<ApiResponse<Value>>(text) {
            return Err(Error::from_exchange_code(
                err.code,
                err.message.unwrap_or_else(|| text.to_string()),
            ));
        }
        return Err(Error::Exchange {
            code: i64::from(status.as_u16()),
            message: text.to_string(),
        });
    }

    let parsed: ApiResponse<T> = serde_json::from_str(text)?;
    if parsed.code != 0 {
        return Err(Error::from_exchange_code(
            parsed.code,
            parsed.message.clone().unwrap_or_default(),
        ));
    }
    Ok(parsed)
}

fn expect_result<T>(response: ApiResponse<T>) -> Result<T> {
    response.result.ok_or(Error::Exchange {
        code: -1,
        message: "response missing result payload".to_string(),
    })
}
