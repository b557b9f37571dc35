//! Common test utilities and fixtures

#![allow(dead_code)]

use gateway_bridge::{BridgeOptions, Contract, FieldDecoder, GatewayBridge, RequestId, ScriptedTransport};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};

/// Poll unit short enough to keep the position poll schedule fast
pub const TEST_POLL_UNIT: Duration = Duration::from_millis(20);

/// Upper bound for anything the pump thread has to deliver
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Sample stock contract
pub fn sample_contract() -> Contract {
    Contract::stock(265598, "AAPL", "USD")
}

/// Bridge over a fresh scripted transport
pub fn scripted_bridge(options: BridgeOptions) -> (Arc<GatewayBridge>, Arc<ScriptedTransport>) {
    let transport = Arc::new(ScriptedTransport::new());
    let bridge = GatewayBridge::new(transport.clone(), Arc::new(FieldDecoder::new()), options);
    (Arc::new(bridge), transport)
}

/// Options with a short poll unit
pub fn fast_options() -> BridgeOptions {
    BridgeOptions {
        poll_unit: TEST_POLL_UNIT,
        ..Default::default()
    }
}

/// Wait until `condition` holds, panicking after [`DELIVERY_TIMEOUT`]
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + DELIVERY_TIMEOUT;
    while !condition() {
        assert!(Instant::now() < deadline, "condition not met in time");
        sleep(Duration::from_millis(5)).await;
    }
}

/// Await a future, panicking after [`DELIVERY_TIMEOUT`]
pub async fn within<F: std::future::Future>(future: F) -> F::Output {
    timeout(DELIVERY_TIMEOUT, future)
        .await
        .expect("operation did not finish in time")
}

/// Inbound message fields in gateway wire order
pub mod wire {
    use super::*;

    /// Position record for a stock contract
    pub fn position(
        account: &str,
        con_id: i64,
        symbol: &str,
        quantity: &str,
        average_cost: &str,
    ) -> Vec<String> {
        let con_id = con_id.to_string();
        let fields = [
            "61", "3", account, con_id.as_str(), symbol, "STK", "", "0", "", "", "NASDAQ",
            "USD", symbol, "NMS", quantity, average_cost,
        ];
        fields.iter().map(|field| field.to_string()).collect()
    }

    /// End of a position snapshot
    pub fn position_end() -> Vec<String> {
        vec!["62".to_string(), "1".to_string()]
    }

    /// Price tick
    pub fn tick_price(request_id: RequestId, tick_type: i32, price: &str) -> Vec<String> {
        vec![
            "1".to_string(),
            "6".to_string(),
            request_id.to_string(),
            tick_type.to_string(),
            price.to_string(),
        ]
    }

    /// Size tick
    pub fn tick_size(request_id: RequestId, tick_type: i32, size: &str) -> Vec<String> {
        vec![
            "2".to_string(),
            "6".to_string(),
            request_id.to_string(),
            tick_type.to_string(),
            size.to_string(),
        ]
    }

    /// Queue the given fields on the transport
    pub fn push(transport: &ScriptedTransport, fields: Vec<String>) {
        let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
        transport.push_fields(&fields);
    }
}
