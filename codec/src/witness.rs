//! Transaction witness set

use crate::utils::{encode_set_header, write_raw};
use gasless_common::{
    ExUnits, VKeyWitness,
    cbor::{at_break, for_each_in_set, raw_item, skip_rest},
};
use minicbor::{Decoder, Encoder, data::Type, decode, encode};
use std::collections::BTreeMap;

const VKEY_WITNESSES: u64 = 0;
const NATIVE_SCRIPTS: u64 = 1;
const REDEEMERS: u64 = 5;

/// Script invocation budget declared in the witness set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redeemer {
    pub tag: u8,
    pub index: u64,
    pub ex_units: ExUnits,
}

/// Witness set with typed signatures. Scripts and redeemers are readable but
/// always re-emitted from their original bytes, as is every other field.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WitnessSet {
    pub vkeys: Vec<VKeyWitness>,
    pub(crate) vkeys_tagged: bool,
    native_scripts: Vec<Vec<u8>>,
    redeemers: Vec<Redeemer>,
    raw_fields: BTreeMap<u64, Vec<u8>>,
}

impl WitnessSet {
    pub fn native_scripts(&self) -> &[Vec<u8>] {
        &self.native_scripts
    }

    pub fn redeemers(&self) -> &[Redeemer] {
        &self.redeemers
    }

    /// Add a signature, replacing one made by the same key
    pub fn add_vkey(&mut self, witness: VKeyWitness) {
        match self.vkeys.iter_mut().find(|w| w.vkey == witness.vkey) {
            Some(existing) => *existing = witness,
            None => self.vkeys.push(witness),
        }
    }

    pub fn decode(d: &mut Decoder<'_>) -> Result<Self, decode::Error> {
        let mut set = WitnessSet::default();
        let len = d.map()?;
        let mut seen = 0;
        loop {
            match len {
                Some(n) if seen == n => break,
                None if at_break(d)? => break,
                _ => {}
            }
            seen += 1;

            let key = d.u64()?;
            let start = d.position();
            match key {
                VKEY_WITNESSES => {
                    let mut vkeys: Vec<VKeyWitness> = Vec::new();
                    set.vkeys_tagged = for_each_in_set(d, |d| {
                        vkeys.push(d.decode()?);
                        Ok(())
                    })?;
                    set.vkeys = vkeys;
                    continue;
                }
                NATIVE_SCRIPTS => {
                    let mut scripts = Vec::new();
                    for_each_in_set(d, |d| {
                        scripts.push(raw_item(d)?.to_vec());
                        Ok(())
                    })?;
                    set.native_scripts = scripts;
                }
                REDEEMERS => set.redeemers = decode_redeemers(d)?,
                _ => d.skip()?,
            }
            set.raw_fields.insert(key, d.input()[start..d.position()].to_vec());
        }
        Ok(set)
    }

    pub fn encode<W: encode::Write>(&self, e: &mut Encoder<W>) -> Result<(), encode::Error<W::Error>> {
        let has_vkeys = !self.vkeys.is_empty();
        e.map(self.raw_fields.len() as u64 + u64::from(has_vkeys))?;

        if has_vkeys {
            e.u64(VKEY_WITNESSES)?;
            encode_set_header(e, self.vkeys_tagged, self.vkeys.len())?;
            for vkey in &self.vkeys {
                e.encode(vkey)?;
            }
        }
        for (key, raw) in &self.raw_fields {
            e.u64(*key)?;
            write_raw(e, raw)?;
        }
        Ok(())
    }

    /// Copy with exactly `count` placeholder signatures, for measuring size
    pub fn with_placeholder_vkeys(&self, count: usize) -> Self {
        let mut sizing = self.clone();
        sizing.vkeys = (0..count).map(|i| VKeyWitness::placeholder(i as u8)).collect();
        sizing
    }
}

fn decode_ex_units(d: &mut Decoder<'_>) -> Result<ExUnits, decode::Error> {
    let len = d.array()?;
    let ex_units = ExUnits {
        mem: d.u64()?,
        steps: d.u64()?,
    };
    skip_rest(d, len, 2)?;
    Ok(ex_units)
}

/// Either `[[tag, index, data, ex_units]]` or `{[tag, index]: [data, ex_units]}`
fn decode_redeemers(d: &mut Decoder<'_>) -> Result<Vec<Redeemer>, decode::Error> {
    let mut redeemers = Vec::new();
    match d.datatype()? {
        Type::Array | Type::ArrayIndef => {
            for_each_in_set(d, |d| {
                let len = d.array()?;
                let tag = d.u8()?;
                let index = d.u64()?;
                d.skip()?;
                let ex_units = decode_ex_units(d)?;
                skip_rest(d, len, 4)?;
                redeemers.push(Redeemer {
                    tag,
                    index,
                    ex_units,
                });
                Ok(())
            })?;
        }
        Type::Map | Type::MapIndef => {
            let len = d.map()?;
            let mut seen = 0;
            loop {
                match len {
                    Some(n) if seen == n => break,
                    None if at_break(d)? => break,
                    _ => {}
                }
                seen += 1;

                let key_len = d.array()?;
                let tag = d.u8()?;
                let index = d.u64()?;
                skip_rest(d, key_len, 2)?;

                let value_len = d.array()?;
                d.skip()?;
                let ex_units = decode_ex_units(d)?;
                skip_rest(d, value_len, 2)?;

                redeemers.push(Redeemer {
                    tag,
                    index,
                    ex_units,
                });
            }
        }
        t => return Err(decode::Error::type_mismatch(t)),
    }
    Ok(redeemers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(set: &WitnessSet) -> Vec<u8> {
        let mut e = Encoder::new(Vec::new());
        set.encode(&mut e).unwrap();
        e.into_writer()
    }

    #[test]
    fn list_redeemers_are_read_and_kept() {
        let mut e = Encoder::new(Vec::new());
        e.map(1).unwrap().u8(5).unwrap();
        e.array(2).unwrap();
        for (mem, steps) in [(1_000, 2_000_000), (500, 300)] {
            e.array(4).unwrap().u8(0).unwrap().u8(0).unwrap();
            e.u8(0).unwrap(); // data
            e.array(2).unwrap().u64(mem).unwrap().u64(steps).unwrap();
        }
        let bytes = e.into_writer();

        let set = WitnessSet::decode(&mut Decoder::new(&bytes)).unwrap();
        assert_eq!(set.redeemers().len(), 2);
        assert_eq!(set.redeemers()[0].ex_units, ExUnits { mem: 1_000, steps: 2_000_000 });
        assert_eq!(encode(&set), bytes);
    }

    #[test]
    fn map_redeemers_are_read() {
        let mut e = Encoder::new(Vec::new());
        e.map(1).unwrap().u8(5).unwrap();
        e.map(1).unwrap();
        e.array(2).unwrap().u8(1).unwrap().u8(3).unwrap();
        e.array(2).unwrap().u8(0).unwrap();
        e.array(2).unwrap().u64(7).unwrap().u64(8).unwrap();
        let bytes = e.into_writer();

        let set = WitnessSet::decode(&mut Decoder::new(&bytes)).unwrap();
        assert_eq!(
            set.redeemers(),
            &[Redeemer {
                tag: 1,
                index: 3,
                ex_units: ExUnits { mem: 7, steps: 8 }
            }]
        );
    }

    #[test]
    fn signing_twice_with_one_key_keeps_one_witness() {
        let mut set = WitnessSet::default();
        set.add_vkey(VKeyWitness::new(vec![1; 32], vec![2; 64]));
        set.add_vkey(VKeyWitness::new(vec![1; 32], vec![3; 64]));
        set.add_vkey(VKeyWitness::new(vec![4; 32], vec![5; 64]));
        assert_eq!(set.vkeys.len(), 2);
        assert_eq!(set.vkeys[0].signature, vec![3; 64]);

        let decoded = WitnessSet::decode(&mut Decoder::new(&encode(&set))).unwrap();
        assert_eq!(decoded.vkeys, set.vkeys);
    }

    #[test]
    fn placeholder_copy_replaces_only_signatures() {
        let mut set = WitnessSet::default();
        set.add_vkey(VKeyWitness::new(vec![1; 32], vec![2; 64]));
        let sizing = set.with_placeholder_vkeys(3);
        assert_eq!(sizing.vkeys.len(), 3);
        assert_eq!(set.vkeys.len(), 1);
        assert_eq!(encode(&sizing).len(), encode(&set).len() + 2 * 101);
    }
}
