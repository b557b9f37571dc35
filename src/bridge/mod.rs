//! Bridge module - correlates pump callbacks with consumer requests
//!
//! ```text
//!  consumer task                         pump thread
//!  ─────────────                         ───────────
//!  get_positions() ──RequestPositions──▶ gateway
//!        │                                  │ position, position, ..., position end
//!        ▼                                  ▼
//!  await_positions() ◀──batch signal── PositionAggregator
//!
//!  request_market_data() ──MarketData{id}──▶ gateway
//!  get_market_data()  ◀──snapshot── MarketDataStore ◀── RequestCorrelator ◀── tick(id)
//! ```

pub mod client;
pub mod correlator;
pub mod events;
pub mod market_data;
pub mod positions;

pub use client::{BridgeOptions, GatewayBridge};
pub use correlator::RequestCorrelator;
pub use events::BridgeEvents;
pub use market_data::{MarketDataRecord, MarketDataStore};
pub use positions::PositionAggregator;
