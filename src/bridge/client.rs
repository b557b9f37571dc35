//! Request/response facade over the callback-driven gateway client

use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use super::correlator::RequestCorrelator;
use super::events::BridgeEvents;
use super::market_data::MarketDataRecord;
use super::positions::{PositionAggregator, DEFAULT_POLL_UNIT};
use crate::common::errors::{BridgeError, Result};
use crate::common::traits::{MessageDecoder, Transport};
use crate::common::types::{ConnectionState, Contract, MarketDataType, Position, RequestId};
use crate::config::types::{AppConfig, GatewayConfig};
use crate::gateway::messages::{OutboundRequest, MAX_MSG_LEN};
use crate::gateway::supervisor::{ConnectionSupervisor, DEFAULT_CONNECT_TIMEOUT};

/// Exclusive upper bound for generated client ids
pub const MAX_CLIENT_ID: i32 = 999_999;

/// Tunables of a [`GatewayBridge`]
#[derive(Debug, Clone)]
pub struct BridgeOptions {
    /// Market data tier requested before each subscription
    pub market_data_type: MarketDataType,
    /// Time unit of the position poll schedule
    pub poll_unit: Duration,
    /// Clear accumulated positions when a new snapshot is requested
    pub clear_positions_on_request: bool,
    /// Bound on the post-connect readiness wait
    pub connect_timeout: Duration,
    /// Maximum accepted inbound message length
    pub max_message_len: usize,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            market_data_type: MarketDataType::default(),
            poll_unit: DEFAULT_POLL_UNIT,
            clear_positions_on_request: false,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_message_len: MAX_MSG_LEN,
        }
    }
}

impl From<&AppConfig> for BridgeOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            market_data_type: config.gateway.market_data_type,
            poll_unit: Duration::from_millis(config.settings.poll_unit_ms),
            clear_positions_on_request: config.settings.clear_positions_on_request,
            connect_timeout: Duration::from_millis(config.gateway.connect_timeout_ms),
            max_message_len: config.gateway.max_message_len,
        }
    }
}

/// Composition root exposing positions and market data as request/response calls
///
/// Share it as `Arc<GatewayBridge>` with whatever layer needs gateway access.
pub struct GatewayBridge {
    supervisor: ConnectionSupervisor,
    positions: Arc<PositionAggregator>,
    correlator: Arc<RequestCorrelator>,
    market_data_type: MarketDataType,
    clear_positions_on_request: bool,
    /// Serializes position snapshot requests; holds the number sent so far
    position_requests: Mutex<u64>,
}

impl GatewayBridge {
    pub fn new(
        transport: Arc<dyn Transport>,
        decoder: Arc<dyn MessageDecoder>,
        options: BridgeOptions,
    ) -> Self {
        let positions = Arc::new(PositionAggregator::with_poll_unit(options.poll_unit));
        let correlator = Arc::new(RequestCorrelator::new());
        let events = Arc::new(BridgeEvents::new(positions.clone(), correlator.clone()));

        let supervisor = ConnectionSupervisor::new(transport, decoder, events)
            .with_connect_timeout(options.connect_timeout)
            .with_max_message_len(options.max_message_len);

        Self {
            supervisor,
            positions,
            correlator,
            market_data_type: options.market_data_type,
            clear_positions_on_request: options.clear_positions_on_request,
            position_requests: Mutex::new(0),
        }
    }

    /// Create a bridge from application configuration
    pub fn from_config(
        config: &AppConfig,
        transport: Arc<dyn Transport>,
        decoder: Arc<dyn MessageDecoder>,
    ) -> Self {
        Self::new(transport, decoder, BridgeOptions::from(config))
    }

    /// Connect to the gateway; a missing client id is generated randomly
    ///
    /// No-op while already connected or connecting.
    pub async fn connect(&self, host: &str, port: u16, client_id: Option<i32>) -> Result<()> {
        let client_id = client_id.unwrap_or_else(random_client_id);
        self.supervisor.connect(host, port, client_id).await
    }

    /// Connect using the gateway section of the configuration
    pub async fn connect_with(&self, config: &GatewayConfig) -> Result<()> {
        self.connect(&config.host, config.port, config.client_id)
            .await
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.supervisor.is_connected()
    }

    /// Latest observed connection state
    pub fn connection_state(&self) -> ConnectionState {
        self.supervisor.state()
    }

    /// Close the connection and wait for the pump to stop
    ///
    /// Blocks the calling thread for up to one pump poll interval (200 ms)
    /// while the pump thread is joined. From a busy runtime, call it through
    /// `tokio::task::spawn_blocking`.
    pub fn disconnect(&self) {
        self.supervisor.disconnect();
    }

    /// Request a position snapshot and wait for it to complete
    ///
    /// Blocks for as long as the gateway does not end the snapshot; use
    /// [`GatewayBridge::get_positions_with_timeout`] for a bounded wait.
    /// The end of an earlier, abandoned request never completes this one.
    #[instrument(skip(self))]
    pub async fn get_positions(&self) -> Result<HashSet<Position>> {
        let mut requests_sent = self.position_requests.lock().await;

        if self.clear_positions_on_request {
            self.positions.clear();
        }
        self.supervisor
            .transport()
            .send(OutboundRequest::RequestPositions)?;
        *requests_sent += 1;
        let expected_end = *requests_sent;
        debug!("Position snapshot {} requested", expected_end);

        loop {
            let positions = self.positions.await_positions().await;
            if self.positions.batches_completed() >= expected_end {
                info!("Received {} positions", positions.len());
                return Ok(positions);
            }
            debug!("Skipping the end of an abandoned position snapshot");
        }
    }

    /// Like [`GatewayBridge::get_positions`] but gives up after `limit`
    pub async fn get_positions_with_timeout(&self, limit: Duration) -> Result<HashSet<Position>> {
        timeout(limit, self.get_positions())
            .await
            .map_err(|_| BridgeError::Timeout(format!("position snapshot after {:?}", limit)))?
    }

    /// Subscribe to streaming market data for a contract
    ///
    /// Returns as soon as the request is sent; ticks accumulate in the
    /// record returned by [`GatewayBridge::get_market_data`].
    #[instrument(skip(self, contract), fields(con_id = contract.con_id))]
    pub fn request_market_data(&self, contract: &Contract) -> Result<RequestId> {
        let previous = self.correlator.get_market_data(contract);
        let request_id = self.correlator.begin_market_data_request(contract);

        if let Err(e) = self.send_market_data_request(request_id, contract) {
            warn!("Market data request {} failed: {}", request_id, e);
            self.correlator
                .abandon_market_data_request(request_id, contract, previous);
            return Err(e);
        }

        info!(
            "Requested {} market data for contract {} (req {})",
            self.market_data_type, contract.con_id, request_id
        );
        Ok(request_id)
    }

    fn send_market_data_request(&self, request_id: RequestId, contract: &Contract) -> Result<()> {
        let transport = self.supervisor.transport();
        transport.send(OutboundRequest::MarketDataType(self.market_data_type))?;
        transport.send(OutboundRequest::streaming_market_data(
            request_id,
            contract.clone(),
        ))
    }

    /// Latest market data for a contract, `None` if it was never requested
    pub fn get_market_data(&self, contract: &Contract) -> Option<MarketDataRecord> {
        self.correlator.get_market_data(contract)
    }
}

fn random_client_id() -> i32 {
    rand::rng().random_range(0..MAX_CLIENT_ID)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::decoder::FieldDecoder;
    use crate::gateway::scripted::ScriptedTransport;
    use pretty_assertions::assert_eq;

    fn bridge(transport: Arc<ScriptedTransport>) -> GatewayBridge {
        GatewayBridge::new(
            transport,
            Arc::new(FieldDecoder::new()),
            BridgeOptions {
                poll_unit: Duration::from_millis(10),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_options_from_config() {
        let mut config = AppConfig::default();
        config.settings.poll_unit_ms = 250;
        config.gateway.market_data_type = MarketDataType::RealTime;

        let options = BridgeOptions::from(&config);
        assert_eq!(options.poll_unit, Duration::from_millis(250));
        assert_eq!(options.market_data_type, MarketDataType::RealTime);
        assert_eq!(options.max_message_len, MAX_MSG_LEN);
    }

    #[test]
    fn test_random_client_id_in_range() {
        for _ in 0..100 {
            assert!((0..MAX_CLIENT_ID).contains(&random_client_id()));
        }
    }

    #[tokio::test]
    async fn test_request_market_data_sends_tier_then_subscription() {
        let transport = Arc::new(ScriptedTransport::new());
        let bridge = bridge(transport.clone());
        bridge.connect("localhost", 4001, Some(1)).await.unwrap();

        let contract = Contract::with_id(7);
        let request_id = bridge.request_market_data(&contract).unwrap();

        assert_eq!(
            transport.sent_requests(),
            vec![
                OutboundRequest::MarketDataType(MarketDataType::DelayedFrozen),
                OutboundRequest::streaming_market_data(request_id, contract.clone()),
            ]
        );
        assert_eq!(bridge.get_market_data(&contract), Some(MarketDataRecord::default()));
        bridge.disconnect();
    }

    #[tokio::test]
    async fn test_market_data_unknown_contract_is_absent() {
        let bridge = bridge(Arc::new(ScriptedTransport::new()));
        assert!(bridge.get_market_data(&Contract::with_id(1)).is_none());
    }

    #[tokio::test]
    async fn test_requests_fail_when_not_connected() {
        let bridge = bridge(Arc::new(ScriptedTransport::new()));
        assert!(matches!(
            bridge.get_positions().await,
            Err(BridgeError::NotConnected)
        ));
        assert!(bridge.request_market_data(&Contract::with_id(1)).is_err());
    }

    #[tokio::test]
    async fn test_get_positions_times_out_without_batch_end() {
        let transport = Arc::new(ScriptedTransport::new());
        let bridge = bridge(transport.clone());
        bridge.connect("localhost", 4001, Some(1)).await.unwrap();

        let result = bridge
            .get_positions_with_timeout(Duration::from_millis(200))
            .await;
        assert!(matches!(result, Err(BridgeError::Timeout(_))));
        assert_eq!(transport.sent_requests(), vec![OutboundRequest::RequestPositions]);
        bridge.disconnect();
    }
}
