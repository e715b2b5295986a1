//! Crypto.com Exchange API Client
//!
//! A Rust client for the Crypto.com Exchange REST API v1, featuring signed
//! private requests, complete paginated retrieval of historical data, and
//! CSV export of candlesticks and order history.
//!
//! # Features
//!
//! - **Signed requests**: HMAC-SHA256 envelopes with canonical,
//!   order-independent parameter serialization
//! - **Complete history downloads**: a range walker that splits time
//!   windows whenever the endpoint's page cap is hit, so capped pages
//!   never silently drop records
//! - **Typed responses**: candlesticks, orders, and balances as plain Rust
//!   structs
//! - **Rate limiting and retry**: request pacing plus exponential backoff
//!   on transport failures
//!
//! # Market data example
//!
//! ```no_run
//! use cryptocom_client::{CryptoComClient, Interval};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = CryptoComClient::new("", "");
//!     let candles = client
//!         .get_all_candlesticks("BTC_USD", Interval::Hour1, None, None)
//!         .await?;
//!     println!("Fetched {} candles", candles.len());
//!     Ok(())
//! }
//! ```
//!
//! # Trading example
//!
//! ```no_run
//! use cryptocom_client::{CryptoComClient, Side};
//! use rust_decimal_macros::dec;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = CryptoComClient::from_env()?;
//!     let ack = client
//!         .create_limit_order("CRO_USD", Side::Buy, dec!(100), dec!(0.14))
//!         .await?;
//!     println!("Order placed: {}", ack.order_id);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod data;
pub mod error;
pub mod pagination;
pub mod rate_limiter;
pub mod types;

pub use auth::{Credentials, RequestEnvelope};
pub use client::{ClientConfig, CryptoComClient, API_BASE_URL};
pub use config::Config;
pub use error::{Error, Result};
pub use pagination::{Direction, PageRecord, RangeWalker, TimeWindow, WalkError, WalkerConfig};
pub use types::{
    Candle, Interval, Order, OrderAck, OrderStatus, OrderType, PortfolioItem, Side, TimeInForce,
    UserBalance,
};
