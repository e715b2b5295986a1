//! Error types for the Crypto.com Exchange client

use thiserror::Error;

/// Exchange error code for an invalid order quantity
pub const CODE_BAD_QUANTITY: i64 = 213;

/// Exchange error codes for an invalid or out-of-range order price
pub const CODE_BAD_PRICE_RANGE: i64 = 308;
pub const CODE_BAD_PRICE: i64 = 315;

/// Errors surfaced by the client library
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid credentials/configuration, raised before any
    /// network call is attempted
    #[error("configuration error: {0}")]
    Config(String),

    /// Request canonicalization or signing failed; indicates a defect
    /// rather than a runtime condition
    #[error("signature error: {0}")]
    Signature(String),

    /// Network or HTTP-level failure
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The exchange returned a non-success code in the response body
    #[error("exchange rejected request (code {code}): {message}")]
    Exchange { code: i64, message: String },

    /// Order price rejected by the exchange (codes 308, 315)
    #[error("invalid price (code {code}): {message}")]
    BadPrice { code: i64, message: String },

    /// Order quantity rejected by the exchange (code 213)
    #[error("invalid quantity (code {code}): {message}")]
    BadQuantity { code: i64, message: String },

    /// Response body could not be decoded into the expected shape
    #[error("malformed response: {0}")]
    Parse(#[from] serde_json::Error),

    /// The pagination walker exceeded its fetch budget, which usually
    /// means the endpoint's windowing behavior changed
    #[error("pagination safety bound exceeded after {fetches} fetches")]
    PaginationSafety { fetches: usize },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Map an exchange error code to the matching typed error
    pub fn from_exchange_code(code: i64, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            CODE_BAD_PRICE | CODE_BAD_PRICE_RANGE => Error::BadPrice { code, message },
            CODE_BAD_QUANTITY => Error::BadQuantity { code, message },
            _ => Error::Exchange { code, message },
        }
    }

    /// True for wire-level failures that are worth retrying
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_price_codes_map_to_bad_price() {
        assert!(matches!(
            Error::from_exchange_code(315, "invalid price"),
            Error::BadPrice { code: 315, .. }
        ));
        assert!(matches!(
            Error::from_exchange_code(308, "price out of range"),
            Error::BadPrice { code: 308, .. }
        ));
    }

    #[test]
    fn test_bad_quantity_code_maps_to_bad_quantity() {
        assert!(matches!(
            Error::from_exchange_code(213, "invalid quantity"),
            Error::BadQuantity { code: 213, .. }
        ));
    }

    #[test]
    fn test_unknown_code_maps_to_exchange() {
        let err = Error::from_exchange_code(999, "unexpected");
        match err {
            Error::Exchange { code, message } => {
                assert_eq!(code, 999);
                assert_eq!(message, "unexpected");
            }
            other => panic!("expected Exchange error, got {:?}", other),
        }
    }

    #[test]
    fn test_is_transport() {
        let err = Error::Config("missing key".to_string());
        assert!(!err.is_transport());
    }
}
