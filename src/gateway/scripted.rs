//! In-memory transport with a scripted inbound queue
//!
//! Used for offline replay of captured sessions and for tests. Inbound
//! messages are queued up front (or pushed while the pump runs), outbound
//! requests are recorded instead of being written to a socket.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info};

use super::messages::{make_message, OutboundRequest};
use crate::common::errors::{BridgeError, Result};
use crate::common::traits::Transport;

/// Field separator used in replay capture files
pub const REPLAY_FIELD_SEPARATOR: char = '|';

/// Transport backed by an in-memory message queue
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    /// Connected state flag
    connected: AtomicBool,
    /// Inbound message text waiting for the pump
    inbound: Mutex<VecDeque<String>>,
    /// Signalled whenever a message is queued or the transport closes
    inbound_cond: Condvar,
    /// Requests sent through the transport, in order
    sent: Mutex<Vec<OutboundRequest>>,
    /// Number of successful `open` calls
    opens: AtomicUsize,
    /// Error returned by the next `open` call
    fail_next_open: Mutex<Option<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport pre-loaded with the given messages
    pub fn with_messages<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let transport = Self::new();
        transport.inbound.lock().extend(messages.into_iter().map(Into::into));
        transport
    }

    /// Load a replay capture: one message per line, fields separated by `|`
    ///
    /// Blank lines and lines starting with `#` are skipped.
    pub fn from_replay_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let transport = Self::with_messages(parse_replay(&content));
        info!(
            "Loaded {} replay messages from {}",
            transport.pending_len(),
            path.as_ref().display()
        );
        Ok(transport)
    }

    /// Queue one inbound message
    pub fn push_message(&self, text: impl Into<String>) {
        self.inbound.lock().push_back(text.into());
        self.inbound_cond.notify_one();
    }

    /// Queue one inbound message built from its fields
    pub fn push_fields(&self, fields: &[&str]) {
        self.push_message(make_message(fields));
    }

    /// Simulate the gateway closing the socket
    pub fn drop_connection(&self) {
        info!("Scripted transport: remote closed connection");
        self.close();
    }

    /// Make the next `open` call fail with the given reason
    pub fn fail_next_open(&self, reason: impl Into<String>) {
        *self.fail_next_open.lock() = Some(reason.into());
    }

    /// Requests sent so far
    pub fn sent_requests(&self) -> Vec<OutboundRequest> {
        self.sent.lock().clone()
    }

    /// Number of inbound messages not yet consumed
    pub fn pending_len(&self) -> usize {
        self.inbound.lock().len()
    }

    /// Number of times the transport was opened
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl Transport for ScriptedTransport {
    fn open(&self, host: &str, port: u16, client_id: i32) -> Result<()> {
        if let Some(reason) = self.fail_next_open.lock().take() {
            return Err(BridgeError::Connection(reason));
        }
        debug!(
            "Scripted transport open: {}:{} client_id={}",
            host, port, client_id
        );
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
        // Take the lock so a pump blocked in next_message sees the flag
        let _queue = self.inbound.lock();
        self.inbound_cond.notify_all();
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn next_message(&self, timeout: Duration) -> Option<String> {
        let mut queue = self.inbound.lock();
        if queue.is_empty() && self.is_connected() {
            self.inbound_cond.wait_for(&mut queue, timeout);
        }
        queue.pop_front()
    }

    fn has_pending(&self) -> bool {
        !self.inbound.lock().is_empty()
    }

    fn send(&self, request: OutboundRequest) -> Result<()> {
        if !self.is_connected() {
            return Err(BridgeError::NotConnected);
        }
        debug!("Scripted transport send: {:?}", request);
        self.sent.lock().push(request);
        Ok(())
    }
}

/// Convert replay capture text into NUL-terminated message text
pub fn parse_replay(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            let fields: Vec<&str> = line.split(REPLAY_FIELD_SEPARATOR).collect();
            make_message(&fields)
        })
        .collect()
}
