//! Routing of pump callbacks to the bridge state

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error, info};

use super::correlator::RequestCorrelator;
use super::positions::PositionAggregator;
use crate::common::traits::GatewayEvents;
use crate::common::types::{Contract, MarketDataType, RequestId};
use crate::gateway::tick_kind::TickKind;

/// Gateway system notice codes (farm status and similar), not failures
const NOTICE_CODES: std::ops::RangeInclusive<i32> = 2100..=2199;

/// Callback sink handed to the pump
pub struct BridgeEvents {
    positions: Arc<PositionAggregator>,
    correlator: Arc<RequestCorrelator>,
}

impl BridgeEvents {
    pub fn new(positions: Arc<PositionAggregator>, correlator: Arc<RequestCorrelator>) -> Self {
        Self {
            positions,
            correlator,
        }
    }
}

impl GatewayEvents for BridgeEvents {
    fn on_tick_price(&self, request_id: RequestId, kind: TickKind, price: f64) {
        self.correlator.on_tick_price(request_id, kind, price);
    }

    fn on_tick_size(&self, request_id: RequestId, kind: TickKind, size: i64) {
        self.correlator.on_tick_size(request_id, kind, size);
    }

    fn on_position(&self, account: &str, contract: Contract, quantity: Decimal, average_cost: f64) {
        self.positions
            .on_position(account, contract, quantity, average_cost);
    }

    fn on_position_end(&self) {
        self.positions.on_position_end();
    }

    fn on_error(&self, request_id: i32, code: i32, message: &str) {
        if NOTICE_CODES.contains(&code) {
            info!("Gateway notice {} (req {}): {}", code, request_id, message);
        } else {
            error!("Gateway error {} (req {}): {}", code, request_id, message);
        }
    }

    fn on_market_data_type(&self, request_id: RequestId, tier: MarketDataType) {
        debug!("Market data for request {} delivered as {}", request_id, tier);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_callbacks_reach_aggregator_and_correlator() {
        let positions = Arc::new(PositionAggregator::new());
        let correlator = Arc::new(RequestCorrelator::new());
        let events = BridgeEvents::new(positions.clone(), correlator.clone());

        let contract = Contract::with_id(7);
        let request_id = correlator.begin_market_data_request(&contract);

        events.on_tick_price(request_id, TickKind::LAST, 12.5);
        events.on_tick_size(request_id, TickKind::LAST_SIZE, 100);
        events.on_position("U123", contract.clone(), dec!(3), 12.0);
        events.on_position_end();
        events.on_error(-1, 2104, "Market data farm connection is OK");
        events.on_market_data_type(request_id, MarketDataType::DelayedFrozen);

        let record = correlator.get_market_data(&contract).unwrap();
        assert_eq!(record.price.get("LAST"), Some(&12.5));
        assert_eq!(record.size.get("LAST_SIZE"), Some(&100));
        assert_eq!(positions.snapshot().len(), 1);
        assert!(positions.is_batch_complete());
    }
}
