// Copyright 2022-2023 Andrew D. Straw.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT
// or http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Streaming demuxer for WebM files.
//!
//! The EBML header and Segment metadata (tracks, cues, seek index) are bound
//! into [WebM]. Clusters are then read one block at a time by a
//! [PacketExtractor], so memory use does not grow with file size. Only
//! [std::io::Read] is required of the input.

pub use error::{Error, Result};
pub use extract::{demux_to_channel, Demuxer, PacketExtractor};
pub use packet::{BlockOrigin, Demuxed, Lacing, Packet};
pub use reader::{Cursor, EbmlReader, Element};
pub use schema::{bind_record, Bound, Continuation, Field, FieldDescriptor, Record};
pub use tags::{ElementType, Tag};
pub use varint::ElementSize;
pub use webm::{
    segment_level_ids, Audio, BlockGroup, Cluster, CuePoint, CueTrackPositions, Cues, Header, Seek,
    SeekHead, Segment, SegmentInformation, Slices, TimeSlice, TrackEntry, Tracks, Video, WebM,
    TRACK_TYPE_AUDIO, TRACK_TYPE_VIDEO,
};

mod error;
mod extract;
mod packet;
mod reader;
#[macro_use]
mod schema;
mod tags;
#[cfg(test)]
mod testutil;
mod varint;
mod webm;
