//! Gateway Bridge Library
//!
//! Turns the callback-driven trading gateway client into request/response
//! calls for position snapshots and streaming market data.

pub mod bridge;
pub mod common;
pub mod config;
pub mod gateway;

// Re-export commonly used types
pub use bridge::{BridgeOptions, GatewayBridge, MarketDataRecord};
pub use common::errors::{BridgeError, Result};
pub use common::traits::{GatewayEvents, MessageDecoder, Transport};
pub use common::types::{ConnectionState, Contract, MarketDataType, Position, RequestId};
pub use config::types::AppConfig;
pub use gateway::{ConnectionSupervisor, FieldDecoder, ScriptedTransport, TickKind};
