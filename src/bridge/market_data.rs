//! Latest-value market data records keyed by contract

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Latest price and size per tick kind for one contract
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketDataRecord {
    /// Market data prices by tick name
    pub price: HashMap<String, f64>,
    /// Market data sizes by tick name
    pub size: HashMap<String, i64>,
}

impl MarketDataRecord {
    pub fn is_empty(&self) -> bool {
        self.price.is_empty() && self.size.is_empty()
    }
}

/// Market data records for every contract a request was begun for
///
/// Records are written by the pump thread and read by consumers; readers
/// always get a cloned snapshot.
#[derive(Debug, Default)]
pub struct MarketDataStore {
    records: RwLock<HashMap<i64, MarketDataRecord>>,
}

impl MarketDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an empty record for a contract, discarding any previous one
    pub fn reset(&self, con_id: i64) {
        self.records.write().insert(con_id, MarketDataRecord::default());
    }

    /// Put back a record saved before a reset; `None` removes the record
    pub fn restore(&self, con_id: i64, record: Option<MarketDataRecord>) {
        let mut records = self.records.write();
        match record {
            Some(record) => records.insert(con_id, record),
            None => records.remove(&con_id),
        };
    }

    /// Store a price under the tick name; returns false if no record exists
    pub fn set_price(&self, con_id: i64, tick: &str, value: f64) -> bool {
        match self.records.write().get_mut(&con_id) {
            Some(record) => {
                record.price.insert(tick.to_string(), value);
                true
            }
            None => false,
        }
    }

    /// Store a size under the tick name; returns false if no record exists
    pub fn set_size(&self, con_id: i64, tick: &str, value: i64) -> bool {
        match self.records.write().get_mut(&con_id) {
            Some(record) => {
                record.size.insert(tick.to_string(), value);
                true
            }
            None => false,
        }
    }

    /// Snapshot of the record for a contract
    pub fn get(&self, con_id: i64) -> Option<MarketDataRecord> {
        self.records.read().get(&con_id).cloned()
    }

    /// Number of contracts with a record
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}
