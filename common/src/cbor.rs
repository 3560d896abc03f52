//! Small helpers for hand-written minicbor codecs that keep parts of the
//! input they do not interpret

use minicbor::{data::Type, decode::Error, Decoder};

/// Skip the next data item and return its raw bytes
pub fn raw_item<'b>(d: &mut Decoder<'b>) -> Result<&'b [u8], Error> {
    let start = d.position();
    d.skip()?;
    let end = d.position();
    Ok(&d.input()[start..end])
}

/// True when the decoder sits on the terminator of an indefinite container.
/// Consumes the break byte when it does.
pub fn at_break(d: &mut Decoder<'_>) -> Result<bool, Error> {
    if d.datatype()? == Type::Break {
        d.set_position(d.position() + 1);
        Ok(true)
    } else {
        Ok(false)
    }
}

/// Advance to the end of an array whose first `consumed` elements were read
pub fn skip_rest(d: &mut Decoder<'_>, len: Option<u64>, consumed: u64) -> Result<(), Error> {
    match len {
        Some(n) => {
            for _ in consumed..n {
                d.skip()?;
            }
        }
        None => {
            while !at_break(d)? {
                d.skip()?;
            }
        }
    }
    Ok(())
}

/// Visit each element of an array or set, with or without tag 258.
/// Returns whether the tag was present.
pub fn for_each_in_set<'b, F>(d: &mut Decoder<'b>, mut visit: F) -> Result<bool, Error>
where
    F: FnMut(&mut Decoder<'b>) -> Result<(), Error>,
{
    let tagged = if d.datatype()? == Type::Tag {
        d.tag()?;
        true
    } else {
        false
    };

    match d.array()? {
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
    Ok(tagged)
}
