// Copyright 2017-2022 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! EBML variable-length integers.
//!
//! Element IDs keep their length-marker bits so that they compare directly
//! against the constants in [crate::Tag]. Sizes have the marker masked out.

use std::io::Read;

use bitstream_io::BitRead;

use crate::error::{Error, Result};

type BitReader<R> = bitstream_io::BitReader<R, bitstream_io::BigEndian>;

/// Longest element ID supported (in bytes).
const MAX_ID_LEN: u32 = 4;
/// Longest size field supported (in bytes).
const MAX_SIZE_LEN: u32 = 8;

/// The declared data size of an element.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ElementSize {
    Known(u64),
    /// All size bits set. Used for live-streamed Segments and Clusters.
    Unknown,
}

impl ElementSize {
    #[inline]
    pub fn known(&self) -> Option<u64> {
        match self {
            ElementSize::Known(size) => Some(*size),
            ElementSize::Unknown => None,
        }
    }
}

/// An element ID and size as read from the stream.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) struct RawHeader {
    pub(crate) id: u32,
    pub(crate) size: ElementSize,
    /// number of bytes taken by the ID and size fields together
    pub(crate) len: u64,
}

fn truncated(err: std::io::Error, position: u64) -> Error {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        Error::MalformedVarint { position }
    } else {
        Error::Io(err)
    }
}

/// Read an element ID and size starting at `position`.
///
/// Returns `Ok(None)` if the stream ends cleanly before the first byte of the
/// ID. Running out of data anywhere later is a [Error::MalformedVarint].
pub(crate) fn read_element_header<R: Read>(
    reader: &mut R,
    position: u64,
) -> Result<Option<RawHeader>> {
    let mut first = [0u8; 1];
    match reader.read_exact(&mut first) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(Error::Io(e)),
    }
    if first[0].leading_zeros() >= MAX_ID_LEN {
        return Err(Error::InvalidId { position });
    }

    let mut r = BitReader::new((&first[..]).chain(reader));
    let (id, id_len) = read_element_id(&mut r, position)?;
    let (size, size_len) = read_element_size(&mut r, position)?;
    Ok(Some(RawHeader {
        id,
        size,
        len: id_len + size_len,
    }))
}

pub(crate) fn read_element_id<R: BitRead>(r: &mut R, position: u64) -> Result<(u32, u64)> {
    match r.read_unary1() {
        Ok(zeros) if zeros < MAX_ID_LEN => {
            let len = zeros + 1;
            let bits = 7 * len;
            r.read::<u32>(bits)
                .map(|u| ((1 << bits) | u, u64::from(len)))
                .map_err(|e| truncated(e, position))
        }
        Ok(_) => Err(Error::InvalidId { position }),
        Err(err) => Err(truncated(err, position)),
    }
}

pub(crate) fn read_element_size<R: BitRead>(
    r: &mut R,
    position: u64,
) -> Result<(ElementSize, u64)> {
    match r.read_unary1() {
        Ok(zeros) if zeros < MAX_SIZE_LEN => {
            let len = zeros + 1;
            let bits = 7 * len;
            let value: u64 = r.read(bits).map_err(|e| truncated(e, position))?;
            let size = if value == (1u64 << bits) - 1 {
                ElementSize::Unknown
            } else {
                ElementSize::Known(value)
            };
            Ok((size, u64::from(len)))
        }
        Ok(_) => Err(Error::InvalidSize { position }),
        Err(err) => Err(truncated(err, position)),
    }
}
