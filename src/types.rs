//! Typed models for Crypto.com Exchange API requests and responses

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::pagination::PageRecord;

/// Response envelope shared by every endpoint
///
/// `code` 0 means success; any other value is an exchange-level rejection
/// and `message` carries the reason.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub method: String,
    pub code: i64,
    pub result: Option<T>,
    pub message: Option<String>,
}

// =============================================================================
// Candlesticks
// =============================================================================

/// One OHLCV bar
///
/// The exchange serializes prices and volume as strings on some endpoints
/// and numbers on others, so all numeric fields accept both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    #[serde(rename = "o", deserialize_with = "de_flexible_f64")]
    pub open: f64,
    #[serde(rename = "h", deserialize_with = "de_flexible_f64")]
    pub high: f64,
    #[serde(rename = "l", deserialize_with = "de_flexible_f64")]
    pub low: f64,
    #[serde(rename = "c", deserialize_with = "de_flexible_f64")]
    pub close: f64,
    #[serde(rename = "v", deserialize_with = "de_flexible_f64")]
    pub volume: f64,
    /// Bar start time, Unix milliseconds
    #[serde(rename = "t")]
    pub time: i64,
}

impl PageRecord for Candle {
    fn timestamp_ms(&self) -> i64 {
        self.time
    }

    fn record_id(&self) -> String {
        self.time.to_string()
    }
}

/// Result payload of `public/get-candlestick`
#[derive(Debug, Clone, Deserialize)]
pub struct CandlestickResult {
    pub interval: Interval,
    pub instrument_name: String,
    pub data: Vec<Candle>,
}

/// Candlestick timeframes supported by the exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    Min1,
    #[serde(rename = "5m")]
    Min5,
    #[serde(rename = "15m")]
    Min15,
    #[serde(rename = "30m")]
    Min30,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "2h")]
    Hour2,
    #[serde(rename = "4h")]
    Hour4,
    #[serde(rename = "12h")]
    Hour12,
    #[serde(rename = "1D")]
    Day1,
    #[serde(rename = "7D")]
    Day7,
    #[serde(rename = "14D")]
    Day14,
    #[serde(rename = "1M")]
    Month1,
}

impl Interval {
    pub const ALL: &'static [Interval] = &[
        Interval::Min1,
        Interval::Min5,
        Interval::Min15,
        Interval::Min30,
        Interval::Hour1,
        Interval::Hour2,
        Interval::Hour4,
        Interval::Hour12,
        Interval::Day1,
        Interval::Day7,
        Interval::Day14,
        Interval::Month1,
    ];

    /// Wire value sent in the `timeframe` request parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Min1 => "1m",
            Interval::Min5 => "5m",
            Interval::Min15 => "15m",
            Interval::Min30 => "30m",
            Interval::Hour1 => "1h",
            Interval::Hour2 => "2h",
            Interval::Hour4 => "4h",
            Interval::Hour12 => "12h",
            Interval::Day1 => "1D",
            Interval::Day7 => "7D",
            Interval::Day14 => "14D",
            Interval::Month1 => "1M",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = crate::Error;

    /// Parses the wire value; day values also accept a lowercase suffix
    /// (`"1d"`, `"7d"`, `"14d"`) for CLI convenience
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let interval = match s {
            "1m" => Interval::Min1,
            "5m" => Interval::Min5,
            "15m" => Interval::Min15,
            "30m" => Interval::Min30,
            "1h" => Interval::Hour1,
            "2h" => Interval::Hour2,
            "4h" => Interval::Hour4,
            "12h" => Interval::Hour12,
            "1D" | "1d" => Interval::Day1,
            "7D" | "7d" => Interval::Day7,
            "14D" | "14d" => Interval::Day14,
            "1M" => Interval::Month1,
            other => {
                return Err(crate::Error::Config(format!(
                    "invalid interval '{}'; expected one of 1m 5m 15m 30m 1h 2h 4h 12h 1D 7D 14D 1M",
                    other
                )))
            }
        };
        Ok(interval)
    }
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.write_str("BUY"),
            Side::Sell => f.write_str("SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Market,
    Limit,
    StopLoss,
    StopLimit,
    TakeProfit,
    TakeProfitLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeInForce {
    GoodTillCancel,
    ImmediateOrCancel,
    FillOrKill,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Rejected,
    Canceled,
    Filled,
    Expired,
    Active,
}

impl OrderStatus {
    /// True while the order can still fill
    pub fn is_open(&self) -> bool {
        matches!(self, OrderStatus::Active)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Rejected => "REJECTED",
            OrderStatus::Canceled => "CANCELED",
            OrderStatus::Filled => "FILLED",
            OrderStatus::Expired => "EXPIRED",
            OrderStatus::Active => "ACTIVE",
        };
        f.write_str(s)
    }
}

/// An order as returned by `private/get-order-history` and
/// `private/get-order-detail`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub client_oid: String,
    pub instrument_name: String,
    pub side: Side,
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
    pub status: OrderStatus,
    #[serde(deserialize_with = "de_flexible_f64")]
    pub quantity: f64,
    #[serde(deserialize_with = "de_flexible_f64")]
    pub order_value: f64,
    #[serde(default, deserialize_with = "de_flexible_f64")]
    pub avg_price: f64,
    #[serde(default, deserialize_with = "de_flexible_f64")]
    pub cumulative_quantity: f64,
    #[serde(default, deserialize_with = "de_flexible_f64")]
    pub cumulative_value: f64,
    #[serde(default, deserialize_with = "de_flexible_f64")]
    pub cumulative_fee: f64,
    #[serde(default)]
    pub fee_instrument_name: String,
    /// Order creation time, Unix milliseconds
    pub create_time: i64,
    /// Last update time, Unix milliseconds
    #[serde(default)]
    pub update_time: i64,
}

impl Order {
    /// Average unit price, derived from order value when the exchange
    /// does not fill in `avg_price`
    pub fn unit_price(&self) -> f64 {
        if self.avg_price > 0.0 {
            self.avg_price
        } else if self.quantity > 0.0 {
            self.order_value / self.quantity
        } else {
            0.0
        }
    }
}

impl PageRecord for Order {
    fn timestamp_ms(&self) -> i64 {
        self.create_time
    }

    fn record_id(&self) -> String {
        self.order_id.clone()
    }
}

/// Result payload of `private/get-order-history`
#[derive(Debug, Clone, Deserialize)]
pub struct OrderHistoryResult {
    pub data: Vec<Order>,
}

/// Acknowledgement returned by `private/create-order`
#[derive(Debug, Clone, Deserialize)]
pub struct OrderAck {
    pub order_id: String,
    pub client_oid: String,
}

// =============================================================================
// Balances
// =============================================================================

/// Per-currency position inside a user balance account
#[derive(Debug, Clone, Deserialize)]
pub struct PositionBalance {
    pub instrument_name: String,
    #[serde(deserialize_with = "de_flexible_f64")]
    pub quantity: f64,
    #[serde(default, deserialize_with = "de_flexible_f64")]
    pub reserved_qty: f64,
    #[serde(deserialize_with = "de_flexible_f64")]
    pub market_value: f64,
    #[serde(default, deserialize_with = "de_flexible_f64")]
    pub max_withdrawal_balance: f64,
    #[serde(default, deserialize_with = "de_flexible_f64")]
    pub hourly_interest_rate: f64,
}

/// One account from `private/user-balance`
#[derive(Debug, Clone, Deserialize)]
pub struct UserBalance {
    pub instrument_name: String,
    #[serde(deserialize_with = "de_flexible_f64")]
    pub total_available_balance: f64,
    #[serde(default, deserialize_with = "de_flexible_f64")]
    pub total_margin_balance: f64,
    #[serde(default, deserialize_with = "de_flexible_f64")]
    pub total_cash_balance: f64,
    #[serde(default)]
    pub position_balances: Vec<PositionBalance>,
}

/// Result payload of `private/user-balance`
#[derive(Debug, Clone, Deserialize)]
pub struct UserBalanceResult {
    pub data: Vec<UserBalance>,
}

/// Flattened per-currency portfolio row
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioItem {
    pub currency: String,
    pub quantity: f64,
    pub market_value: f64,
    /// Share of total portfolio market value, 0..=1
    pub portfolio_percentage: f64,
}

/// Flatten the primary account's positions into portfolio rows, sorted by
/// market value descending
pub fn summarize_positions(balances: &[UserBalance]) -> Vec<PortfolioItem> {
    let Some(account) = balances.first() else {
        return Vec::new();
    };

    let total: f64 = account.position_balances.iter().map(|p| p.market_value).sum();

    let mut items: Vec<PortfolioItem> = account
        .position_balances
        .iter()
        .map(|p| PortfolioItem {
            currency: p.instrument_name.clone(),
            quantity: p.quantity,
            market_value: p.market_value,
            portfolio_percentage: if total > 0.0 { p.market_value / total } else { 0.0 },
        })
        .collect();

    items.sort_by(|a, b| {
        b.market_value
            .partial_cmp(&a.market_value)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    items
}

// =============================================================================
// Deserialization helpers
// =============================================================================

/// Accept a float from either a JSON number or its string representation
fn de_flexible_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    struct FlexibleF64;

    impl serde::de::Visitor<'_> for FlexibleF64 {
        type Value = f64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a number or a numeric string")
        }

        fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<f64, E> {
            Ok(v)
        }

        fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<f64, E> {
            v.parse().map_err(E::custom)
        }
    }

    deserializer.deserialize_any(FlexibleF64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    #[test]
    fn test_candle_parses_numeric_values() {
        let candle: Candle = serde_json::from_value(json!({
            "o": 50000.0, "h": 51000.0, "l": 49000.0, "c": 50500.0,
            "v": 10.5, "t": 1704067200000i64,
        }))
        .unwrap();

        assert_relative_eq!(candle.open, 50000.0);
        assert_relative_eq!(candle.close, 50500.0);
        assert_eq!(candle.time, 1704067200000);
    }

    #[test]
    fn test_candle_parses_string_values() {
        let candle: Candle = serde_json::from_value(json!({
            "o": "50000.0", "h": "51000.0", "l": "49000.0", "c": "50500.0",
            "v": "10.5", "t": 1704067200000i64,
        }))
        .unwrap();

        assert_relative_eq!(candle.open, 50000.0);
        assert_relative_eq!(candle.volume, 10.5);
    }

    #[test]
    fn test_candle_identity_is_bar_time() {
        let candle = Candle {
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: 0.0,
            time: 1704067200000,
        };
        assert_eq!(candle.timestamp_ms(), 1704067200000);
        assert_eq!(candle.record_id(), "1704067200000");
    }

    #[test]
    fn test_candlestick_result_parses() {
        let result: CandlestickResult = serde_json::from_value(json!({
            "interval": "1m",
            "instrument_name": "BTC_USD",
            "data": [{"o": "1", "h": "2", "l": "0.5", "c": "1.5", "v": "3", "t": 1000}],
        }))
        .unwrap();

        assert_eq!(result.interval, Interval::Min1);
        assert_eq!(result.instrument_name, "BTC_USD");
        assert_eq!(result.data.len(), 1);
    }

    #[test]
    fn test_interval_round_trip() {
        for interval in Interval::ALL {
            assert_eq!(&interval.as_str().parse::<Interval>().unwrap(), interval);
        }
    }

    #[test]
    fn test_interval_accepts_lowercase_day_alias() {
        assert_eq!("1d".parse::<Interval>().unwrap(), Interval::Day1);
        assert_eq!("14d".parse::<Interval>().unwrap(), Interval::Day14);
    }

    #[test]
    fn test_interval_rejects_unknown_value() {
        assert!("INVALID".parse::<Interval>().is_err());
        assert!("2d".parse::<Interval>().is_err());
    }

    fn order_fixture() -> serde_json::Value {
        json!({
            "account_id": "acc-001",
            "order_id": "ord-001",
            "client_oid": "clt-001",
            "order_type": "LIMIT",
            "time_in_force": "GOOD_TILL_CANCEL",
            "side": "BUY",
            "exec_inst": [],
            "quantity": "100",
            "order_value": "14.0",
            "avg_price": "0.14",
            "cumulative_quantity": "0",
            "cumulative_value": "0",
            "cumulative_fee": "0",
            "status": "ACTIVE",
            "instrument_name": "CRO_USD",
            "fee_instrument_name": "CRO",
            "create_time": 1704067200000i64,
            "update_time": 1704067200001i64,
        })
    }

    #[test]
    fn test_order_parses_and_ignores_unknown_fields() {
        let order: Order = serde_json::from_value(order_fixture()).unwrap();

        assert_eq!(order.order_id, "ord-001");
        assert_eq!(order.side, Side::Buy);
        assert_eq!(order.order_type, OrderType::Limit);
        assert_eq!(order.time_in_force, TimeInForce::GoodTillCancel);
        assert_eq!(order.status, OrderStatus::Active);
        assert_relative_eq!(order.quantity, 100.0);
        assert_eq!(order.create_time, 1704067200000);
    }

    #[test]
    fn test_order_identity_is_order_id() {
        let order: Order = serde_json::from_value(order_fixture()).unwrap();
        assert_eq!(order.record_id(), "ord-001");
        assert_eq!(order.timestamp_ms(), 1704067200000);
    }

    #[test]
    fn test_order_unit_price_falls_back_to_order_value() {
        let mut order: Order = serde_json::from_value(order_fixture()).unwrap();
        order.avg_price = 0.0;
        assert_relative_eq!(order.unit_price(), 0.14);
    }

    #[test]
    fn test_order_status_is_open() {
        assert!(OrderStatus::Active.is_open());
        assert!(!OrderStatus::Filled.is_open());
        assert!(!OrderStatus::Canceled.is_open());
    }

    fn balance_fixture() -> Vec<UserBalance> {
        serde_json::from_value(json!([{
            "instrument_name": "USD",
            "total_available_balance": "28000",
            "total_margin_balance": "28000",
            "total_cash_balance": "28000",
            "position_balances": [
                {"instrument_name": "BTC", "quantity": "0.5", "market_value": "25000",
                 "reserved_qty": "0", "max_withdrawal_balance": "0.5"},
                {"instrument_name": "ETH", "quantity": "10", "market_value": "3000",
                 "reserved_qty": "0", "max_withdrawal_balance": "10"}
            ]
        }]))
        .unwrap()
    }

    #[test]
    fn test_summarize_positions_sorts_by_market_value() {
        let items = summarize_positions(&balance_fixture());

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].currency, "BTC");
        assert_eq!(items[1].currency, "ETH");
    }

    #[test]
    fn test_summarize_positions_percentages_sum_to_one() {
        let items = summarize_positions(&balance_fixture());
        let total: f64 = items.iter().map(|i| i.portfolio_percentage).sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_summarize_positions_empty_input() {
        assert!(summarize_positions(&[]).is_empty());
    }

    #[test]
    fn test_api_response_error_shape() {
        let response: ApiResponse<CandlestickResult> = serde_json::from_value(json!({
            "id": 1, "method": "private/create-order",
            "code": 315, "message": "Invalid price",
        }))
        .unwrap();

        assert_eq!(response.code, 315);
        assert!(response.result.is_none());
        assert_eq!(response.message.as_deref(), Some("Invalid price"));
    }
}
