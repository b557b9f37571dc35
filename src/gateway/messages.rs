//! Gateway message identifiers, limits and outbound requests

use serde::{Deserialize, Serialize};

use crate::common::types::{Contract, MarketDataType, RequestId};

/// Maximum length of a single inbound message accepted by the pump
pub const MAX_MSG_LEN: usize = 0xFF_FFFF;

/// Request id used for errors that are not tied to a request
pub const NO_VALID_ID: i32 = -1;

/// Error code raised for an inbound message exceeding [`MAX_MSG_LEN`]
pub const BAD_LENGTH_CODE: i32 = 507;

/// Error text raised for an inbound message exceeding [`MAX_MSG_LEN`]
pub const BAD_LENGTH_MSG: &str = "Bad message length";

/// Error code raised when an inbound message cannot be decoded
pub const BAD_MESSAGE_CODE: i32 = 505;

/// Inbound message ids handled by the decoder
pub mod incoming {
    pub const TICK_PRICE: i32 = 1;
    pub const TICK_SIZE: i32 = 2;
    pub const ERR_MSG: i32 = 4;
    pub const MARKET_DATA_TYPE: i32 = 58;
    pub const POSITION_DATA: i32 = 61;
    pub const POSITION_END: i32 = 62;
}

/// Request transmitted to the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboundRequest {
    /// Ask for a full position snapshot, terminated by a position-end message
    RequestPositions,
    /// Select the market data tier for subsequent market data requests
    MarketDataType(MarketDataType),
    /// Subscribe to market data for a contract
    MarketData {
        request_id: RequestId,
        contract: Contract,
        /// Comma-separated generic tick ids
        generic_ticks: String,
        snapshot: bool,
        regulatory_snapshot: bool,
    },
}

impl OutboundRequest {
    /// Streaming (non-snapshot) market data subscription
    pub fn streaming_market_data(request_id: RequestId, contract: Contract) -> Self {
        OutboundRequest::MarketData {
            request_id,
            contract,
            generic_ticks: String::new(),
            snapshot: false,
            regulatory_snapshot: false,
        }
    }
}

/// Split inbound message text into its NUL-separated fields
///
/// Messages are NUL-terminated, so the empty piece after the final
/// separator is dropped.
pub fn read_fields(text: &str) -> Vec<&str> {
    let mut fields: Vec<&str> = text.split('\0').collect();
    if text.ends_with('\0') {
        fields.pop();
    }
    fields
}

/// Join fields into NUL-terminated message text
pub fn make_message(fields: &[&str]) -> String {
    let mut text = String::new();
    for field in fields {
        text.push_str(field);
        text.push('\0');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_read_fields_drops_trailing_terminator() {
        assert_eq!(read_fields("1\x006\x0042\x00"), vec!["1", "6", "42"]);
    }

    #[test]
    fn test_read_fields_keeps_inner_empty_fields() {
        assert_eq!(read_fields("61\x003\x00\x00265598\x00"), vec!["61", "3", "", "265598"]);
    }

    #[test]
    fn test_read_fields_without_terminator() {
        assert_eq!(read_fields("62\x001"), vec!["62", "1"]);
    }

    #[test]
    fn test_make_message_matches_read_fields() {
        let text = make_message(&["2", "6", "42", "0", "300"]);
        assert_eq!(text, "2\x006\x0042\x000\x00300\x00");
        assert_eq!(read_fields(&text), vec!["2", "6", "42", "0", "300"]);
    }

    #[test]
    fn test_streaming_market_data_request() {
        let request = OutboundRequest::streaming_market_data(RequestId(42), Contract::with_id(7));
        match request {
            OutboundRequest::MarketData {
                request_id,
                snapshot,
                regulatory_snapshot,
                ..
            } => {
                assert_eq!(request_id, RequestId(42));
                assert!(!snapshot);
                assert!(!regulatory_snapshot);
            }
            _ => panic!("Expected MarketData"),
        }
    }
}
