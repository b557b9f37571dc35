//! Domain types shared by the gateway and bridge layers

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Identifier tagging an outstanding market-data request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub i32);

impl RequestId {
    pub fn value(&self) -> i32 {
        self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tradable instrument reference
///
/// Identity is the gateway's numeric contract id; the remaining fields are
/// descriptive and only carried through for rendering.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Contract {
    /// Gateway contract id
    #[serde(rename = "id")]
    pub con_id: i64,
    pub symbol: String,
    /// Security type (STK, OPT, FUT, ...)
    #[serde(rename = "type")]
    pub sec_type: String,
    pub currency: String,
    pub exchange: String,
    pub primary_exchange: String,
    /// Last trade date or contract month
    pub last_trade_date: String,
    pub strike: f64,
    /// Option right (C/P), empty for non-options
    pub right: String,
    pub multiplier: String,
}

impl Contract {
    /// Create a contract reference from its id alone
    pub fn with_id(con_id: i64) -> Self {
        Self {
            con_id,
            ..Default::default()
        }
    }

    /// Create a stock contract reference
    pub fn stock(con_id: i64, symbol: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            con_id,
            symbol: symbol.into(),
            sec_type: "STK".to_string(),
            currency: currency.into(),
            exchange: "SMART".to_string(),
            ..Default::default()
        }
    }
}

/// A position held in a gateway account
///
/// Two positions are the same entity when account and contract id match,
/// regardless of quantity or cost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// Account identifier
    pub account: String,
    /// Contract the position is held in
    pub contract: Contract,
    /// Position size
    pub quantity: Decimal,
    /// Average cost of the position (in currency)
    pub average_cost: f64,
}

impl Position {
    pub fn new(
        account: impl Into<String>,
        contract: Contract,
        quantity: Decimal,
        average_cost: f64,
    ) -> Self {
        Self {
            account: account.into(),
            contract,
            quantity,
            average_cost,
        }
    }

    /// Identity key of this position
    pub fn key(&self) -> (&str, i64) {
        (&self.account, self.contract.con_id)
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Position {}

impl Hash for Position {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

/// Lifecycle state of the gateway connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}

/// Market data tier requested from the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketDataType {
    RealTime,
    Frozen,
    Delayed,
    DelayedFrozen,
}

impl MarketDataType {
    /// Numeric code used on the wire
    pub fn code(&self) -> i32 {
        match self {
            MarketDataType::RealTime => 1,
            MarketDataType::Frozen => 2,
            MarketDataType::Delayed => 3,
            MarketDataType::DelayedFrozen => 4,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(MarketDataType::RealTime),
            2 => Some(MarketDataType::Frozen),
            3 => Some(MarketDataType::Delayed),
            4 => Some(MarketDataType::DelayedFrozen),
            _ => None,
        }
    }
}

impl Default for MarketDataType {
    fn default() -> Self {
        MarketDataType::DelayedFrozen
    }
}

impl std::fmt::Display for MarketDataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarketDataType::RealTime => write!(f, "real_time"),
            MarketDataType::Frozen => write!(f, "frozen"),
            MarketDataType::Delayed => write!(f, "delayed"),
            MarketDataType::DelayedFrozen => write!(f, "delayed_frozen"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashSet;

    #[test]
    fn test_position_identity_ignores_quantity_and_cost() {
        let first = Position::new("U123", Contract::with_id(7), dec!(100), 55.2);
        let second = Position::new("U123", Contract::with_id(7), dec!(150), 56.0);
        let other_account = Position::new("U999", Contract::with_id(7), dec!(100), 55.2);

        assert_eq!(first, second);
        assert_ne!(first, other_account);

        let mut set = HashSet::new();
        set.insert(first);
        assert!(set.contains(&second));
    }

    #[test]
    fn test_contract_serializes_with_gateway_field_names() {
        let contract = Contract::stock(265598, "AAPL", "USD");
        let value = serde_json::to_value(&contract).unwrap();

        assert_eq!(value["id"], 265598);
        assert_eq!(value["type"], "STK");
        assert_eq!(value["symbol"], "AAPL");
    }

    #[test]
    fn test_market_data_type_codes() {
        assert_eq!(MarketDataType::default().code(), 4);
        for tier in [
            MarketDataType::RealTime,
            MarketDataType::Frozen,
            MarketDataType::Delayed,
            MarketDataType::DelayedFrozen,
        ] {
            assert_eq!(MarketDataType::from_code(tier.code()), Some(tier));
        }
        assert_eq!(MarketDataType::from_code(9), None);
    }
}
