//! Field decoder for the inbound messages the bridge consumes

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::{debug, trace};

use super::messages::incoming;
use super::tick_kind::TickKind;
use crate::common::errors::{BridgeError, Result};
use crate::common::traits::{GatewayEvents, MessageDecoder};
use crate::common::types::{Contract, MarketDataType, RequestId};

/// Cursor over the fields of a single message
struct FieldReader<'a> {
    fields: &'a [&'a str],
    pos: usize,
    msg_id: i32,
}

impl<'a> FieldReader<'a> {
    fn new(fields: &'a [&'a str], msg_id: i32) -> Self {
        // Field 0 is the message id itself
        Self {
            fields,
            pos: 1,
            msg_id,
        }
    }

    fn next_str(&mut self) -> Result<&'a str> {
        let field = self.fields.get(self.pos).copied().ok_or_else(|| {
            BridgeError::Decode(format!(
                "message {} truncated at field {}",
                self.msg_id, self.pos
            ))
        })?;
        self.pos += 1;
        Ok(field)
    }

    fn skip(&mut self) -> Result<()> {
        self.next_str().map(|_| ())
    }

    fn next_i32(&mut self) -> Result<i32> {
        Ok(self.next_str()?.parse()?)
    }

    fn next_i64(&mut self) -> Result<i64> {
        Ok(self.next_str()?.parse()?)
    }

    /// Empty float fields are sent for unset values and read as zero
    fn next_f64(&mut self) -> Result<f64> {
        match self.next_str()? {
            "" => Ok(0.0),
            value => Ok(value.parse()?),
        }
    }

    /// Empty decimal fields are read as zero, like empty floats
    fn next_decimal(&mut self) -> Result<Decimal> {
        match self.next_str()? {
            "" => Ok(Decimal::ZERO),
            value => Ok(Decimal::from_str(value)?),
        }
    }
}

/// Decoder for tick, position, error and market-data-type messages
///
/// Messages outside that set are skipped.
#[derive(Debug, Clone, Default)]
pub struct FieldDecoder;

impl FieldDecoder {
    pub fn new() -> Self {
        Self
    }

    fn tick_price(reader: &mut FieldReader<'_>, events: &dyn GatewayEvents) -> Result<()> {
        reader.skip()?; // version
        let request_id = RequestId(reader.next_i32()?);
        let kind = TickKind(reader.next_i32()?);
        let price = reader.next_f64()?;
        trace!("tick price: req={} kind={} price={}", request_id, kind, price);
        events.on_tick_price(request_id, kind, price);
        Ok(())
    }

    fn tick_size(reader: &mut FieldReader<'_>, events: &dyn GatewayEvents) -> Result<()> {
        reader.skip()?; // version
        let request_id = RequestId(reader.next_i32()?);
        let kind = TickKind(reader.next_i32()?);
        let size = reader
            .next_decimal()?
            .trunc()
            .to_i64()
            .ok_or_else(|| BridgeError::Decode("tick size out of range".to_string()))?;
        trace!("tick size: req={} kind={} size={}", request_id, kind, size);
        events.on_tick_size(request_id, kind, size);
        Ok(())
    }

    fn error(reader: &mut FieldReader<'_>, events: &dyn GatewayEvents) -> Result<()> {
        reader.skip()?; // version
        let request_id = reader.next_i32()?;
        let code = reader.next_i32()?;
        let message = reader.next_str()?;
        events.on_error(request_id, code, message);
        Ok(())
    }

    fn market_data_type(reader: &mut FieldReader<'_>, events: &dyn GatewayEvents) -> Result<()> {
        reader.skip()?; // version
        let request_id = RequestId(reader.next_i32()?);
        let code = reader.next_i32()?;
        let tier = MarketDataType::from_code(code)
            .ok_or_else(|| BridgeError::Decode(format!("unknown market data type {}", code)))?;
        events.on_market_data_type(request_id, tier);
        Ok(())
    }

    fn position(reader: &mut FieldReader<'_>, events: &dyn GatewayEvents) -> Result<()> {
        reader.skip()?; // version
        let account = reader.next_str()?;
        let contract = Contract {
            con_id: reader.next_i64()?,
            symbol: reader.next_str()?.to_string(),
            sec_type: reader.next_str()?.to_string(),
            last_trade_date: reader.next_str()?.to_string(),
            strike: reader.next_f64()?,
            right: reader.next_str()?.to_string(),
            multiplier: reader.next_str()?.to_string(),
            exchange: reader.next_str()?.to_string(),
            currency: reader.next_str()?.to_string(),
            ..Default::default()
        };
        reader.skip()?; // local symbol
        reader.skip()?; // trading class
        let quantity = reader.next_decimal()?;
        let average_cost = reader.next_f64()?;
        events.on_position(account, contract, quantity, average_cost);
        Ok(())
    }
}

impl MessageDecoder for FieldDecoder {
    fn interpret(&self, fields: &[&str], events: &dyn GatewayEvents) -> Result<()> {
        let Some(first) = fields.first() else {
            return Err(BridgeError::Decode("empty message".to_string()));
        };
        let msg_id: i32 = first.parse()?;
        let mut reader = FieldReader::new(fields, msg_id);

        match msg_id {
            incoming::TICK_PRICE => Self::tick_price(&mut reader, events),
            incoming::TICK_SIZE => Self::tick_size(&mut reader, events),
            incoming::ERR_MSG => Self::error(&mut reader, events),
            incoming::MARKET_DATA_TYPE => Self::market_data_type(&mut reader, events),
            incoming::POSITION_DATA => Self::position(&mut reader, events),
            incoming::POSITION_END => {
                events.on_position_end();
                Ok(())
            }
            other => {
                debug!("Skipping unhandled message id {}", other);
                Ok(())
            }
        }
    }
}
