use std::collections::HashSet;

use crate::{cbor::at_break, hash::KeyHash};

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub enum ScriptType {
    Native,
    PlutusV1,
    PlutusV2,
    PlutusV3,
}

/// A script carried by an output, kept as the bytes the ledger bills for
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub enum ReferenceScript {
    /// CBOR of the native script
    Native(Vec<u8>),
    PlutusV1(Vec<u8>),
    PlutusV2(Vec<u8>),
    PlutusV3(Vec<u8>),
}

impl ReferenceScript {
    pub fn new(script_type: ScriptType, bytes: Vec<u8>) -> Self {
        match script_type {
            ScriptType::Native => ReferenceScript::Native(bytes),
            ScriptType::PlutusV1 => ReferenceScript::PlutusV1(bytes),
            ScriptType::PlutusV2 => ReferenceScript::PlutusV2(bytes),
            ScriptType::PlutusV3 => ReferenceScript::PlutusV3(bytes),
        }
    }

    pub fn get_script_type(&self) -> ScriptType {
        match self {
            ReferenceScript::Native(_) => ScriptType::Native,
            ReferenceScript::PlutusV1(_) => ScriptType::PlutusV1,
            ReferenceScript::PlutusV2(_) => ScriptType::PlutusV2,
            ReferenceScript::PlutusV3(_) => ScriptType::PlutusV3,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            ReferenceScript::Native(b)
            | ReferenceScript::PlutusV1(b)
            | ReferenceScript::PlutusV2(b)
            | ReferenceScript::PlutusV3(b) => b,
        }
    }

    /// Size used by the reference script fee
    pub fn size(&self) -> u64 {
        self.bytes().len() as u64
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub enum NativeScript {
    ScriptPubkey(KeyHash),
    ScriptAll(Vec<NativeScript>),
    ScriptAny(Vec<NativeScript>),
    ScriptNOfK(u32, Vec<NativeScript>),
    InvalidBefore(u64),
    InvalidHereafter(u64),
}

impl<'b, C> minicbor::decode::Decode<'b, C> for NativeScript {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        let size = d.array()?;

        let assert_size = |expected| {
            // NOTE: unwrap_or allows for indefinite arrays.
            if expected != size.unwrap_or(expected) {
                return Err(minicbor::decode::Error::message(
                    "unexpected array size in NativeScript",
                ));
            }
            Ok(())
        };

        let variant = d.u32()?;

        let script = match variant {
            0 => {
                assert_size(2)?;
                Ok(NativeScript::ScriptPubkey(d.decode_with(ctx)?))
            }
            1 => {
                assert_size(2)?;
                Ok(NativeScript::ScriptAll(d.decode_with(ctx)?))
            }
            2 => {
                assert_size(2)?;
                Ok(NativeScript::ScriptAny(d.decode_with(ctx)?))
            }
            3 => {
                assert_size(3)?;
                Ok(NativeScript::ScriptNOfK(
                    d.decode_with(ctx)?,
                    d.decode_with(ctx)?,
                ))
            }
            4 => {
                assert_size(2)?;
                Ok(NativeScript::InvalidBefore(d.decode_with(ctx)?))
            }
            5 => {
                assert_size(2)?;
                Ok(NativeScript::InvalidHereafter(d.decode_with(ctx)?))
            }
            _ => Err(minicbor::decode::Error::message(
                "unknown variant id for native script",
            )),
        }?;

        if size.is_none() && !at_break(d)? {
            return Err(minicbor::decode::Error::message(
                "unterminated indefinite NativeScript",
            ));
        }

        Ok(script)
    }
}

impl<C> minicbor::encode::Encode<C> for NativeScript {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            NativeScript::ScriptPubkey(v) => {
                e.array(2)?;
                e.encode_with(0, ctx)?;
                e.encode_with(v, ctx)?;
            }
            NativeScript::ScriptAll(v) => {
                e.array(2)?;
                e.encode_with(1, ctx)?;
                e.encode_with(v, ctx)?;
            }
            NativeScript::ScriptAny(v) => {
                e.array(2)?;
                e.encode_with(2, ctx)?;
                e.encode_with(v, ctx)?;
            }
            NativeScript::ScriptNOfK(a, b) => {
                e.array(3)?;
                e.encode_with(3, ctx)?;
                e.encode_with(a, ctx)?;
                e.encode_with(b, ctx)?;
            }
            NativeScript::InvalidBefore(v) => {
                e.array(2)?;
                e.encode_with(4, ctx)?;
                e.encode_with(v, ctx)?;
            }
            NativeScript::InvalidHereafter(v) => {
                e.array(2)?;
                e.encode_with(5, ctx)?;
                e.encode_with(v, ctx)?;
            }
        }

        Ok(())
    }
}

impl NativeScript {
    /// Add every key hash a signature node anywhere in the tree asks for.
    /// Time-lock nodes contribute nothing.
    pub fn collect_key_hashes(&self, into: &mut HashSet<KeyHash>) {
        match self {
            Self::ScriptPubkey(hash) => {
                into.insert(*hash);
            }
            Self::ScriptAll(scripts) | Self::ScriptAny(scripts) | Self::ScriptNOfK(_, scripts) => {
                for script in scripts {
                    script.collect_key_hashes(into);
                }
            }
            Self::InvalidBefore(_) | Self::InvalidHereafter(_) => {}
        }
    }
}
