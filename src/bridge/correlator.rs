//! Correlation of market data request ids with their contracts

use parking_lot::RwLock;
use rand::Rng;
use std::collections::HashMap;
use tracing::{debug, error};

use super::market_data::{MarketDataRecord, MarketDataStore};
use crate::common::types::{Contract, RequestId};
use crate::gateway::tick_kind::TickKind;

/// Exclusive upper bound for allocated request ids
pub const MAX_REQUEST_ID: i32 = 999_999_999;

/// Routes ticks tagged with a request id to the record of their contract
#[derive(Debug, Default)]
pub struct RequestCorrelator {
    requests: RwLock<HashMap<RequestId, Contract>>,
    store: MarketDataStore,
}

impl RequestCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a request id for a contract and start its empty record
    ///
    /// The caller transmits the actual market data request.
    pub fn begin_market_data_request(&self, contract: &Contract) -> RequestId {
        let mut requests = self.requests.write();
        let mut rng = rand::rng();
        let request_id = loop {
            let candidate = RequestId(rng.random_range(0..MAX_REQUEST_ID));
            if !requests.contains_key(&candidate) {
                break candidate;
            }
        };
        requests.insert(request_id, contract.clone());
        self.store.reset(contract.con_id);
        debug!(
            "Market data request {} begun for contract {}",
            request_id, contract.con_id
        );
        request_id
    }

    /// Undo a request whose transmission failed
    ///
    /// Unregisters the id and puts back the record the contract had before
    /// the request began.
    pub fn abandon_market_data_request(
        &self,
        request_id: RequestId,
        contract: &Contract,
        previous: Option<MarketDataRecord>,
    ) {
        self.requests.write().remove(&request_id);
        self.store.restore(contract.con_id, previous);
        debug!(
            "Market data request {} abandoned for contract {}",
            request_id, contract.con_id
        );
    }

    /// Contract a request id was issued for
    pub fn resolve(&self, request_id: RequestId) -> Option<Contract> {
        self.requests.read().get(&request_id).cloned()
    }

    /// Record a price tick; unknown request ids are logged and dropped
    pub fn on_tick_price(&self, request_id: RequestId, kind: TickKind, value: f64) {
        let Some(con_id) = self.con_id_for(request_id) else {
            error!("Market data request with ID {} not found.", request_id);
            return;
        };
        self.store.set_price(con_id, &kind.name(), value);
    }

    /// Record a size tick; unknown request ids are logged and dropped
    pub fn on_tick_size(&self, request_id: RequestId, kind: TickKind, value: i64) {
        let Some(con_id) = self.con_id_for(request_id) else {
            error!("Market data request with ID {} not found.", request_id);
            return;
        };
        self.store.set_size(con_id, &kind.name(), value);
    }

    /// Snapshot of the latest market data for a contract
    pub fn get_market_data(&self, contract: &Contract) -> Option<MarketDataRecord> {
        self.store.get(contract.con_id)
    }

    /// Number of request ids handed out
    pub fn request_count(&self) -> usize {
        self.requests.read().len()
    }

    fn con_id_for(&self, request_id: RequestId) -> Option<i64> {
        self.requests
            .read()
            .get(&request_id)
            .map(|contract| contract.con_id)
    }

    #[cfg(test)]
    pub(crate) fn insert_request(&self, request_id: RequestId, contract: &Contract) {
        self.requests.write().insert(request_id, contract.clone());
        self.store.reset(contract.con_id);
    }
}
