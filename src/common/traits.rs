//! Trait definitions for the gateway client boundary

use rust_decimal::Decimal;
use std::time::Duration;

use super::errors::Result;
use super::types::{Contract, MarketDataType, RequestId};
use crate::gateway::messages::OutboundRequest;
use crate::gateway::tick_kind::TickKind;

/// Socket-level client for the trading gateway
///
/// Implementations own the socket and an internal queue of framed inbound
/// message text. The supervisor drains that queue from its pump thread, so
/// every method must be callable from any thread.
pub trait Transport: Send + Sync {
    /// Open the socket and perform the gateway handshake
    fn open(&self, host: &str, port: u16, client_id: i32) -> Result<()>;

    /// Close the socket. Already queued inbound messages stay readable.
    fn close(&self);

    /// Check if the socket is currently open
    fn is_connected(&self) -> bool;

    /// Pop the next inbound message, waiting at most `timeout`
    ///
    /// Returns `None` when nothing arrived in time.
    fn next_message(&self, timeout: Duration) -> Option<String>;

    /// Check if inbound messages are still queued
    fn has_pending(&self) -> bool;

    /// Transmit an outbound request
    fn send(&self, request: OutboundRequest) -> Result<()>;
}

/// Turns the fields of one inbound message into callback invocations
pub trait MessageDecoder: Send + Sync {
    /// Interpret a single message and invoke the matching callback(s)
    ///
    /// An error means the message was malformed; the pump treats it as fatal.
    fn interpret(&self, fields: &[&str], events: &dyn GatewayEvents) -> Result<()>;
}

/// Callbacks invoked by the decoder on the pump thread
///
/// Invocations arrive one at a time in wire order. Implementations must not
/// block: a slow callback stalls every message behind it.
pub trait GatewayEvents: Send + Sync {
    /// Price tick for a market data request
    fn on_tick_price(&self, request_id: RequestId, kind: TickKind, price: f64);

    /// Size tick for a market data request
    fn on_tick_size(&self, request_id: RequestId, kind: TickKind, size: i64);

    /// One position record of a position snapshot
    fn on_position(&self, account: &str, contract: Contract, quantity: Decimal, average_cost: f64);

    /// No more position records in the current snapshot
    fn on_position_end(&self);

    /// Error or notice reported by the gateway or the pump
    fn on_error(&self, request_id: i32, code: i32, message: &str);

    /// Gateway confirmed the market data tier used for a request
    fn on_market_data_type(&self, _request_id: RequestId, _tier: MarketDataType) {}
}
