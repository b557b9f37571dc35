//! Position snapshot accumulation and the batch-complete signal

use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, trace, warn};

use crate::common::types::{Contract, Position};

/// Number of short sleeps performed before blocking on the batch signal
pub const POLL_ITERATIONS: u32 = 10;

/// Default time unit of the poll schedule
pub const DEFAULT_POLL_UNIT: Duration = Duration::from_secs(1);

/// Accumulates position records pushed by the pump thread
///
/// Positions are deduplicated on `(account, contract id)`; a later record for
/// the same key replaces the earlier one. The batch signal is armed by the
/// position-end callback and cleared by the consumer after reading.
#[derive(Debug)]
pub struct PositionAggregator {
    positions: RwLock<HashSet<Position>>,
    batch_complete: watch::Sender<bool>,
    /// Position-end messages received since creation
    batches_completed: AtomicU64,
    poll_unit: Duration,
}

impl PositionAggregator {
    pub fn new() -> Self {
        Self::with_poll_unit(DEFAULT_POLL_UNIT)
    }

    /// Create an aggregator whose poll schedule uses the given time unit
    pub fn with_poll_unit(poll_unit: Duration) -> Self {
        let (batch_complete, _) = watch::channel(false);
        Self {
            positions: RwLock::new(HashSet::new()),
            batch_complete,
            batches_completed: AtomicU64::new(0),
            poll_unit,
        }
    }

    /// Insert or replace a position record
    pub fn on_position(&self, account: &str, contract: Contract, quantity: Decimal, average_cost: f64) {
        trace!(
            "Position: account={} contract={} quantity={} avg_cost={}",
            account,
            contract.con_id,
            quantity,
            average_cost
        );
        self.positions
            .write()
            .replace(Position::new(account, contract, quantity, average_cost));
    }

    /// Arm the batch-complete signal
    pub fn on_position_end(&self) {
        debug!("Position snapshot complete");
        self.batches_completed.fetch_add(1, Ordering::SeqCst);
        self.batch_complete.send_replace(true);
    }

    /// Number of position snapshots the gateway has ended so far
    pub fn batches_completed(&self) -> u64 {
        self.batches_completed.load(Ordering::SeqCst)
    }

    /// Check if the batch-complete signal is armed
    pub fn is_batch_complete(&self) -> bool {
        *self.batch_complete.borrow()
    }

    /// Drop all accumulated positions
    pub fn clear(&self) {
        self.positions.write().clear();
    }

    /// Copy of the accumulated positions
    pub fn snapshot(&self) -> HashSet<Position> {
        self.positions.read().clone()
    }

    /// Wait for the current batch to complete and return the accumulated set
    ///
    /// Polls the signal with sleeps of 0, 0.1, ... 0.9 poll units, leaving
    /// the poll as soon as the signal is armed, then waits on the signal
    /// without a bound. The signal is cleared before returning.
    pub async fn await_positions(&self) -> HashSet<Position> {
        for n in 0..POLL_ITERATIONS {
            if self.is_batch_complete() {
                break;
            }
            sleep(self.poll_unit * n / POLL_ITERATIONS).await;
        }

        let mut batch_complete = self.batch_complete.subscribe();
        if batch_complete.wait_for(|complete| *complete).await.is_err() {
            warn!("Position batch signal closed");
        }

        self.batch_complete.send_replace(false);
        self.snapshot()
    }
}

impl Default for PositionAggregator {
    fn default() -> Self {
        Self::new()
    }
}
