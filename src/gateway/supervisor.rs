//! Connection lifecycle and the background message pump

use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

use super::messages::{read_fields, BAD_LENGTH_CODE, BAD_LENGTH_MSG, BAD_MESSAGE_CODE, MAX_MSG_LEN, NO_VALID_ID};
use crate::common::errors::Result;
use crate::common::traits::{GatewayEvents, MessageDecoder, Transport};
use crate::common::types::ConnectionState;

/// How long the pump blocks on the inbound queue before re-checking liveness
pub const PUMP_POLL_TIMEOUT: Duration = Duration::from_millis(200);

/// Default bound on how long `connect` waits for the pump to confirm
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Owns the gateway socket lifecycle and the pump thread
pub struct ConnectionSupervisor {
    transport: Arc<dyn Transport>,
    decoder: Arc<dyn MessageDecoder>,
    events: Arc<dyn GatewayEvents>,
    /// Connection state, published by the pump
    state: Arc<watch::Sender<ConnectionState>>,
    /// Handle of the running pump thread
    pump: Mutex<Option<JoinHandle<()>>>,
    connect_timeout: Duration,
    max_message_len: usize,
}

impl ConnectionSupervisor {
    pub fn new(
        transport: Arc<dyn Transport>,
        decoder: Arc<dyn MessageDecoder>,
        events: Arc<dyn GatewayEvents>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            transport,
            decoder,
            events,
            state: Arc::new(state),
            pump: Mutex::new(None),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_message_len: MAX_MSG_LEN,
        }
    }

    /// Set the bound on the post-connect readiness wait
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Set the maximum accepted inbound message length
    pub fn with_max_message_len(mut self, max_message_len: usize) -> Self {
        self.max_message_len = max_message_len;
        self
    }

    /// Transport used for outbound requests
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Latest observed connection state
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Subscribe to connection state changes
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Open the transport and start the pump thread
    ///
    /// No-op while a connection is live or being established. Waits at most
    /// the connect timeout for the pump to confirm the connection; reaching
    /// the bound is not an error, `is_connected` reports the outcome.
    #[instrument(skip(self))]
    pub async fn connect(&self, host: &str, port: u16, client_id: i32) -> Result<()> {
        let claimed = self.state.send_if_modified(|state| {
            if *state == ConnectionState::Disconnected {
                *state = ConnectionState::Connecting;
                true
            } else {
                false
            }
        });
        if !claimed {
            debug!("Connect skipped, connection is {}", self.state());
            return Ok(());
        }

        // A previous pump may still be finishing its cleanup
        self.join_pump();

        info!("Connecting to gateway at {}:{} (client_id={})", host, port, client_id);
        if let Err(e) = self.transport.open(host, port, client_id) {
            error!("Failed to open gateway transport: {}", e);
            self.state.send_replace(ConnectionState::Disconnected);
            return Err(e);
        }

        let pump = MessagePump {
            transport: self.transport.clone(),
            decoder: self.decoder.clone(),
            events: self.events.clone(),
            state: self.state.clone(),
            max_message_len: self.max_message_len,
        };
        let handle = std::thread::Builder::new()
            .name("gateway-pump".to_string())
            .spawn(move || pump.run());
        match handle {
            Ok(handle) => *self.pump.lock() = Some(handle),
            Err(e) => {
                error!("Failed to spawn pump thread: {}", e);
                self.transport.close();
                self.state.send_replace(ConnectionState::Disconnected);
                return Err(e.into());
            }
        }

        let mut state_rx = self.state.subscribe();
        let ready = timeout(
            self.connect_timeout,
            state_rx.wait_for(|state| *state != ConnectionState::Connecting),
        )
        .await;
        match ready {
            Ok(Ok(state)) => info!("Gateway connection {}", *state),
            Ok(Err(_)) => warn!("Connection state channel closed"),
            Err(_) => warn!(
                "Gateway not confirmed within {:?}, still connecting",
                self.connect_timeout
            ),
        }
        Ok(())
    }

    /// Close the transport and wait for the pump to finish its cleanup
    ///
    /// Blocks the calling thread for up to [`PUMP_POLL_TIMEOUT`] while the
    /// pump thread is joined; `Drop` does the same. Async callers on a busy
    /// runtime should go through `tokio::task::spawn_blocking`.
    #[instrument(skip(self))]
    pub fn disconnect(&self) {
        info!("Disconnecting from gateway");
        self.transport.close();
        self.join_pump();
    }

    fn join_pump(&self) {
        let handle = self.pump.lock().take();
        if let Some(handle) = handle {
            if handle.thread().id() == std::thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                error!("Pump thread panicked");
            }
        }
    }
}

impl Drop for ConnectionSupervisor {
    fn drop(&mut self) {
        self.transport.close();
        self.join_pump();
    }
}

/// State moved onto the pump thread
struct MessagePump {
    transport: Arc<dyn Transport>,
    decoder: Arc<dyn MessageDecoder>,
    events: Arc<dyn GatewayEvents>,
    state: Arc<watch::Sender<ConnectionState>>,
    max_message_len: usize,
}

impl MessagePump {
    fn run(self) {
        info!("Message pump started");
        while self.transport.is_connected() || self.transport.has_pending() {
            if self.transport.is_connected() {
                self.mark_connected();
            }

            let Some(text) = self.transport.next_message(PUMP_POLL_TIMEOUT) else {
                continue;
            };

            if text.len() > self.max_message_len {
                error!("Inbound message of {} bytes exceeds limit", text.len());
                self.events.on_error(
                    NO_VALID_ID,
                    BAD_LENGTH_CODE,
                    &format!("{}:{}:{}", BAD_LENGTH_MSG, text.len(), text),
                );
                break;
            }

            let fields = read_fields(&text);
            if let Err(e) = self.decoder.interpret(&fields, self.events.as_ref()) {
                error!("Failed to decode inbound message: {}", e);
                self.events
                    .on_error(NO_VALID_ID, BAD_MESSAGE_CODE, &e.to_string());
                break;
            }
        }
        self.cleanup();
    }

    fn mark_connected(&self) {
        self.state.send_if_modified(|state| {
            if *state == ConnectionState::Connecting {
                *state = ConnectionState::Connected;
                true
            } else {
                false
            }
        });
    }

    fn cleanup(&self) {
        self.transport.close();
        self.state.send_replace(ConnectionState::Disconnected);
        info!("Message pump stopped, gateway disconnected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::{Contract, RequestId};
    use crate::gateway::decoder::FieldDecoder;
    use crate::gateway::scripted::ScriptedTransport;
    use crate::gateway::tick_kind::TickKind;
    use rust_decimal::Decimal;

    #[derive(Default)]
    struct Recorder {
        prices: Mutex<Vec<(RequestId, f64)>>,
        errors: Mutex<Vec<i32>>,
    }

    impl GatewayEvents for Recorder {
        fn on_tick_price(&self, request_id: RequestId, _kind: TickKind, price: f64) {
            self.prices.lock().push((request_id, price));
        }

        fn on_tick_size(&self, _request_id: RequestId, _kind: TickKind, _size: i64) {}

        fn on_position(&self, _account: &str, _contract: Contract, _quantity: Decimal, _average_cost: f64) {}

        fn on_position_end(&self) {}

        fn on_error(&self, _request_id: i32, code: i32, _message: &str) {
            self.errors.lock().push(code);
        }
    }

    fn supervisor(
        transport: Arc<ScriptedTransport>,
        recorder: Arc<Recorder>,
    ) -> ConnectionSupervisor {
        ConnectionSupervisor::new(transport, Arc::new(FieldDecoder::new()), recorder)
    }

    async fn wait_for_disconnect(supervisor: &ConnectionSupervisor) {
        let mut rx = supervisor.watch_state();
        timeout(
            Duration::from_secs(5),
            rx.wait_for(|state| *state == ConnectionState::Disconnected),
        )
        .await
        .expect("pump did not stop")
        .expect("state channel closed");
    }

    #[test]
    fn test_initial_state_is_disconnected() {
        let supervisor = supervisor(
            Arc::new(ScriptedTransport::new()),
            Arc::new(Recorder::default()),
        );
        assert_eq!(supervisor.state(), ConnectionState::Disconnected);
        assert!(!supervisor.is_connected());
    }

    #[tokio::test]
    async fn test_connect_reaches_connected_and_is_idempotent() {
        let transport = Arc::new(ScriptedTransport::new());
        let supervisor = supervisor(transport.clone(), Arc::new(Recorder::default()));

        supervisor.connect("localhost", 4001, 1).await.unwrap();
        assert!(supervisor.is_connected());

        supervisor.connect("localhost", 4001, 1).await.unwrap();
        assert_eq!(transport.open_count(), 1);

        supervisor.disconnect();
        assert_eq!(supervisor.state(), ConnectionState::Disconnected);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_disconnect_from_blocking_task_joins_pump() {
        let transport = Arc::new(ScriptedTransport::new());
        let supervisor = Arc::new(supervisor(transport.clone(), Arc::new(Recorder::default())));
        supervisor.connect("localhost", 4001, 1).await.unwrap();

        let closing = supervisor.clone();
        let start = std::time::Instant::now();
        tokio::task::spawn_blocking(move || closing.disconnect())
            .await
            .unwrap();

        assert!(start.elapsed() < PUMP_POLL_TIMEOUT * 5, "{:?}", start.elapsed());
        assert_eq!(supervisor.state(), ConnectionState::Disconnected);
        assert!(supervisor.pump.lock().is_none());
    }

    #[tokio::test]
    async fn test_failed_open_returns_to_disconnected() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.fail_next_open("connection refused");
        let supervisor = supervisor(transport.clone(), Arc::new(Recorder::default()));

        assert!(supervisor.connect("localhost", 4001, 1).await.is_err());
        assert_eq!(supervisor.state(), ConnectionState::Disconnected);

        supervisor.connect("localhost", 4001, 1).await.unwrap();
        assert!(supervisor.is_connected());
        supervisor.disconnect();
    }

    #[tokio::test]
    async fn test_oversized_message_stops_pump() {
        let transport = Arc::new(ScriptedTransport::with_messages([
            "1\x006\x0042\x001\x00101.5\x00".to_string(),
            "x".repeat(64),
            "1\x006\x0042\x002\x00102.0\x00".to_string(),
        ]));
        let recorder = Arc::new(Recorder::default());
        let supervisor = supervisor(transport.clone(), recorder.clone()).with_max_message_len(32);

        supervisor.connect("localhost", 4001, 1).await.unwrap();
        wait_for_disconnect(&supervisor).await;

        assert!(!supervisor.is_connected());
        assert!(!transport.is_connected());
        assert_eq!(*recorder.prices.lock(), vec![(RequestId(42), 101.5)]);
        assert_eq!(*recorder.errors.lock(), vec![BAD_LENGTH_CODE]);
        assert_eq!(transport.pending_len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_message_stops_pump() {
        let transport = Arc::new(ScriptedTransport::with_messages(["1\x006\x00\x00"]));
        let recorder = Arc::new(Recorder::default());
        let supervisor = supervisor(transport.clone(), recorder.clone());

        supervisor.connect("localhost", 4001, 1).await.unwrap();
        wait_for_disconnect(&supervisor).await;

        assert_eq!(*recorder.errors.lock(), vec![BAD_MESSAGE_CODE]);
    }

    #[tokio::test]
    async fn test_remote_close_drains_queue_then_disconnects() {
        let transport = Arc::new(ScriptedTransport::new());
        let recorder = Arc::new(Recorder::default());
        let supervisor = supervisor(transport.clone(), recorder.clone());

        supervisor.connect("localhost", 4001, 1).await.unwrap();
        transport.push_fields(&["1", "6", "42", "4", "99.0"]);
        transport.drop_connection();
        wait_for_disconnect(&supervisor).await;

        assert!(!supervisor.is_connected());
        assert_eq!(transport.pending_len(), 0);
        assert_eq!(*recorder.prices.lock(), vec![(RequestId(42), 99.0)]);
    }
}
