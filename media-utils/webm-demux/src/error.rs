// Copyright 2022-2023 Andrew D. Straw.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT
// or http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::Tag;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("truncated variable-length integer at position {position}")]
    MalformedVarint { position: u64 },
    #[error("invalid element ID at position {position}")]
    InvalidId { position: u64 },
    #[error("invalid element size at position {position}")]
    InvalidSize { position: u64 },
    #[error("unsupported data size {size} for element {tag:?}")]
    BadDataSize { tag: Tag, size: u64 },
    #[error("element {tag:?} is not a master element")]
    NotMaster { tag: Tag },
    #[error("element {tag:?} has unknown size where it is not allowed")]
    UnknownSize { tag: Tag },
    #[error("element {tag:?} data expected at position {expected} but reader is at {actual}")]
    OutOfOrder {
        tag: Tag,
        expected: u64,
        actual: u64,
    },
    #[error("no video track found")]
    TrackNotFound,
}
