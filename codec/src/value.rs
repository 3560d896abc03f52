//! `value = coin / [coin, multiasset<uint>]`

use gasless_common::{AssetId, AssetName, PolicyId, Value, cbor::at_break};
use minicbor::{Decoder, Encoder, data::Type, decode, encode};
use std::collections::BTreeMap;

pub fn decode_value(d: &mut Decoder<'_>) -> Result<Value, decode::Error> {
    match d.datatype()? {
        Type::U8 | Type::U16 | Type::U32 | Type::U64 => Ok(Value::new(d.u64()?)),
        Type::Array | Type::ArrayIndef => {
            let len = d.array()?;
            let mut value = Value::new(d.u64()?);
            decode_multiasset(d, |asset, quantity| {
                value = std::mem::take(&mut value).with_asset(asset, quantity);
            })?;
            if len.is_none() && !at_break(d)? {
                return Err(decode::Error::message("value array has extra items"));
            }
            Ok(value)
        }
        t => Err(decode::Error::type_mismatch(t)),
    }
}

fn map_len(d: &mut Decoder<'_>) -> Result<Option<u64>, decode::Error> {
    d.map()
}

fn for_each_entry<'b>(
    d: &mut Decoder<'b>,
    mut visit: impl FnMut(&mut Decoder<'b>) -> Result<(), decode::Error>,
) -> Result<(), decode::Error> {
    match map_len(d)? {
        Some(n) => {
            for _ in 0..n {
                visit(d)?;
            }
        }
        None => {
            while !at_break(d)? {
                visit(d)?;
            }
        }
    }
    Ok(())
}

fn decode_multiasset(
    d: &mut Decoder<'_>,
    mut add: impl FnMut(AssetId, u64),
) -> Result<(), decode::Error> {
    for_each_entry(d, |d| {
        let policy: PolicyId = d.decode()?;
        for_each_entry(d, |d| {
            let name = AssetName::new(d.bytes()?)
                .map_err(|e| decode::Error::message(e.to_string()))?;
            let quantity = d.u64()?;
            add(AssetId::new(policy, name), quantity);
            Ok(())
        })
    })
}

pub fn encode_value<W: encode::Write>(
    value: &Value,
    e: &mut Encoder<W>,
) -> Result<(), encode::Error<W::Error>> {
    if value.assets.is_empty() {
        e.u64(value.lovelace)?;
        return Ok(());
    }

    let mut by_policy: BTreeMap<&PolicyId, Vec<(&AssetName, u64)>> = BTreeMap::new();
    for (asset, quantity) in &value.assets {
        by_policy.entry(&asset.policy).or_default().push((&asset.name, *quantity));
    }

    e.array(2)?.u64(value.lovelace)?;
    e.map(by_policy.len() as u64)?;
    for (policy, assets) in by_policy {
        e.encode(policy)?;
        e.map(assets.len() as u64)?;
        for (name, quantity) in assets {
            e.bytes(name.as_slice())?.u64(quantity)?;
        }
    }
    Ok(())
}
