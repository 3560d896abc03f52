//! Transaction outputs: legacy array form and post-Alonzo map form

use crate::{
    utils::write_raw,
    value::{decode_value, encode_value},
};
use gasless_common::{
    Address, Value,
    cbor::{at_break, skip_rest},
};
use minicbor::{Decoder, Encoder, data::Type, decode, encode};

/// An output as far as sponsorship cares: who holds it and what it holds.
///
/// Outputs read from a transaction keep their original encoding so datums and
/// script references pass through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    pub address: Address,
    pub value: Value,
    raw: Option<Vec<u8>>,
}

impl TxOutput {
    pub fn new(address: Address, value: Value) -> Self {
        Self {
            address,
            value,
            raw: None,
        }
    }

    pub fn decode(d: &mut Decoder<'_>) -> Result<Self, decode::Error> {
        let start = d.position();
        let (address, value) = match d.datatype()? {
            Type::Array | Type::ArrayIndef => {
                // [address, amount, ? datum_hash]
                let len = d.array()?;
                let address = decode_address(d)?;
                let value = decode_value(d)?;
                skip_rest(d, len, 2)?;
                (address, value)
            }
            Type::Map | Type::MapIndef => {
                let len = d.map()?;
                let mut address = None;
                let mut value = None;
                let mut seen = 0;
                loop {
                    match len {
                        Some(n) if seen == n => break,
                        None if at_break(d)? => break,
                        _ => {}
                    }
                    match d.u32()? {
                        0 => address = Some(decode_address(d)?),
                        1 => value = Some(decode_value(d)?),
                        _ => d.skip()?,
                    }
                    seen += 1;
                }
                let address = address.ok_or_else(|| decode::Error::message("output without address"))?;
                (address, value.unwrap_or_default())
            }
            t => return Err(decode::Error::type_mismatch(t)),
        };
        let end = d.position();

        Ok(Self {
            address,
            value,
            raw: Some(d.input()[start..end].to_vec()),
        })
    }

    pub fn encode<W: encode::Write>(&self, e: &mut Encoder<W>) -> Result<(), encode::Error<W::Error>> {
        match &self.raw {
            Some(raw) => write_raw(e, raw)?,
            None => {
                e.map(2)?;
                e.u8(0)?.bytes(self.address.as_bytes())?;
                e.u8(1)?;
                encode_value(&self.value, e)?;
            }
        }
        Ok(())
    }

    /// Same holder, different lovelace. Drops the original encoding.
    pub fn with_lovelace(&self, lovelace: u64) -> Self {
        let mut value = self.value.clone();
        value.lovelace = lovelace;
        Self::new(self.address.clone(), value)
    }
}

fn decode_address(d: &mut Decoder<'_>) -> Result<Address, decode::Error> {
    Address::from_bytes(d.bytes()?).map_err(|e| decode::Error::message(e.to_string()))
}
