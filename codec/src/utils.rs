use gasless_common::SponsorError;
use minicbor::{Encoder, data::Tag, encode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Cannot decode transaction: {0}")]
    Decode(#[from] minicbor::decode::Error),

    #[error("Cannot encode transaction: {0}")]
    Encode(String),

    #[error("Transaction is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

impl From<CodecError> for SponsorError {
    fn from(error: CodecError) -> Self {
        SponsorError::InvalidTransaction(error.to_string())
    }
}

/// CBOR tag marking a finite set
pub const SET_TAG: u64 = 258;

/// Copy already-encoded CBOR into the output
pub fn write_raw<W: encode::Write>(
    e: &mut Encoder<W>,
    raw: &[u8],
) -> Result<(), encode::Error<W::Error>> {
    e.writer_mut().write_all(raw).map_err(encode::Error::write)
}

/// Array header for a set, with tag 258 when the source used it
pub fn encode_set_header<W: encode::Write>(
    e: &mut Encoder<W>,
    tagged: bool,
    len: usize,
) -> Result<(), encode::Error<W::Error>> {
    if tagged {
        e.tag(Tag::new(SET_TAG))?;
    }
    e.array(len as u64)?;
    Ok(())
}

/// Run an encoding closure into a fresh buffer
pub fn to_bytes<F>(f: F) -> Result<Vec<u8>, CodecError>
where
    F: FnOnce(&mut Encoder<Vec<u8>>) -> Result<(), encode::Error<std::convert::Infallible>>,
{
    let mut e = Encoder::new(Vec::new());
    f(&mut e).map_err(|err| CodecError::Encode(err.to_string()))?;
    Ok(e.into_writer())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_header_with_and_without_tag() {
        let tagged = to_bytes(|e| encode_set_header(e, true, 2)).unwrap();
        assert_eq!(tagged, vec![0xd9, 0x01, 0x02, 0x82]);
        let plain = to_bytes(|e| encode_set_header(e, false, 2)).unwrap();
        assert_eq!(plain, vec![0x82]);
    }

    #[test]
    fn codec_errors_become_invalid_transaction() {
        let err: SponsorError = CodecError::Encode("boom".into()).into();
        assert_eq!(err.code(), "InvalidTransaction");
    }
}
