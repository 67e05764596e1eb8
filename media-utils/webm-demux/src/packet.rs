// Copyright 2022-2023 Andrew D. Straw.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT
// or http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

/// Lacing mode from the block header flags. Lace data is not examined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lacing {
    None,
    Xiph,
    Fixed,
    Ebml,
}

impl Lacing {
    fn from_flags(flags: u8) -> Self {
        match (flags >> 1) & 0x03 {
            0 => Lacing::None,
            1 => Lacing::Xiph,
            2 => Lacing::Fixed,
            _ => Lacing::Ebml,
        }
    }
}

/// The element a block was stored in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockOrigin {
    SimpleBlock,
    BlockGroup {
        /// BlockDuration, 0 if absent
        duration: u64,
        /// ReferenceBlock values, relative timecodes of referenced blocks
        references: Vec<i64>,
    },
}

/// One block of one track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Cluster timecode plus block relative timecode, in timecode ticks.
    pub timecode: u64,
    pub track_number: u64,
    pub invisible: bool,
    pub lacing: Lacing,
    pub origin: BlockOrigin,
    pub payload: Vec<u8>,
}

/// An item of a demuxed stream. `End` is sent exactly once, last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Demuxed {
    Packet(Packet),
    End,
}

const BLOCK_HEADER_LEN: usize = 4;

/// Decode the header of a (Simple)Block.
///
/// Returns `None` for blocks too short to have a header. Only single byte
/// track numbers are supported.
pub(crate) fn parse_block(
    cluster_timecode: u64,
    mut data: Vec<u8>,
    origin: BlockOrigin,
) -> Option<Packet> {
    if data.len() < BLOCK_HEADER_LEN {
        return None;
    }
    let track_number = u64::from(data[0] & 0x7F);
    // Added as unsigned: 0xFFFF is +65535, not -1.
    let relative = u16::from_be_bytes([data[1], data[2]]);
    let flags = data[3];
    let payload = data.split_off(BLOCK_HEADER_LEN);
    Some(Packet {
        timecode: cluster_timecode.wrapping_add(u64::from(relative)),
        track_number,
        invisible: flags & 0x80 != 0,
        lacing: Lacing::from_flags(flags),
        origin,
        payload,
    })
}
