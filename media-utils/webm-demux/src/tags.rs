// Copyright 2022-2023 Andrew D. Straw.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT
// or http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

/// The storage type of an EBML element payload.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ElementType {
    /// Contains child elements.
    Master,
    Unsigned,
    Signed,
    Float,
    /// ASCII string.
    String,
    Utf8,
    Date,
    Binary,
}

#[derive(PartialEq, Eq, Clone, Copy)]
pub struct Hex32(u32);

impl std::fmt::Debug for Hex32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

macro_rules! impl_tags {
    ( $( ($name:ident, $val:expr, $dtype:ident) ),* ) => {
        #[derive(Debug, PartialEq, Eq, Clone, Copy)]
        pub enum Tag {
            $(
                $name,
            )*
            Other(Hex32),
        }

        impl Tag {
            pub const fn element_type(&self) -> ElementType {
                use Tag::*;
                match self {
                    $(
                        $name => ElementType::$dtype,
                    )*
                    Other(_) => ElementType::Binary,
                }
            }

            /// The raw element ID, length-marker bits included.
            pub const fn id(&self) -> u32 {
                use Tag::*;
                match self {
                    $(
                        $name => $val,
                    )*
                    Other(id) => id.0,
                }
            }
        }

        impl From<u32> for Tag {
            fn from(id: u32) -> Tag {
                use Tag::*;
                match id {
                    $(
                        $val => $name,
                    )*
                    id => Other(Hex32(id)),
                }
            }
        }
    };
}

impl Tag {
    #[inline]
    pub const fn is_master(&self) -> bool {
        matches!(self.element_type(), ElementType::Master)
    }
}

// See https://www.matroska.org/technical/elements.html and
// https://www.webmproject.org/docs/container/ for the WebM subset.

impl_tags!(
    // EBML header
    (Ebml, 0x1a45_dfa3, Master),
    (EbmlVersion, 0x4286, Unsigned),
    (EbmlReadVersion, 0x42F7, Unsigned),
    (EbmlMaxIdLength, 0x42F2, Unsigned),
    (EbmlMaxSizeLength, 0x42F3, Unsigned),
    (DocType, 0x4282, String),
    (DocTypeVersion, 0x4287, Unsigned),
    (DocTypeReadVersion, 0x4285, Unsigned),
    // Global elements
    (Void, 0xEC, Binary),
    (Crc32, 0xBF, Binary),
    // Segment
    (Segment, 0x1853_8067, Master),
    (SeekHead, 0x114D_9B74, Master),
    (Seek, 0x4DBB, Master),
    (SeekId, 0x53AB, Binary),
    (SeekPosition, 0x53AC, Unsigned),
    (Info, 0x1549_A966, Master),
    (TimecodeScale, 0x2A_D7B1, Unsigned),
    (Duration, 0x4489, Float),
    (DateUtc, 0x4461, Date),
    (Title, 0x7BA9, Utf8),
    (MuxingApp, 0x4D80, Utf8),
    (WritingApp, 0x5741, Utf8),
    // Tracks
    (Tracks, 0x1654_ae6b, Master),
    (TrackEntry, 0xAE, Master),
    (TrackNumber, 0xD7, Unsigned),
    (TrackUid, 0x73C5, Unsigned),
    (TrackType, 0x83, Unsigned),
    (FlagEnabled, 0xB9, Unsigned),
    (FlagDefault, 0x88, Unsigned),
    (FlagForced, 0x55AA, Unsigned),
    (FlagLacing, 0x9C, Unsigned),
    (DefaultDuration, 0x23_E383, Unsigned),
    (Name, 0x536E, Utf8),
    (Language, 0x22_B59C, String),
    (CodecId, 0x86, String),
    (CodecPrivate, 0x63A2, Binary),
    (CodecName, 0x25_8688, Utf8),
    (Video, 0xE0, Master),
    (FlagInterlaced, 0x9A, Unsigned),
    (StereoMode, 0x53B8, Unsigned),
    (PixelWidth, 0xB0, Unsigned),
    (PixelHeight, 0xBA, Unsigned),
    (PixelCropBottom, 0x54AA, Unsigned),
    (PixelCropTop, 0x54BB, Unsigned),
    (PixelCropLeft, 0x54CC, Unsigned),
    (PixelCropRight, 0x54DD, Unsigned),
    (DisplayWidth, 0x54B0, Unsigned),
    (DisplayHeight, 0x54BA, Unsigned),
    (DisplayUnit, 0x54B2, Unsigned),
    (AspectRatioType, 0x54B3, Unsigned),
    (Audio, 0xE1, Master),
    (SamplingFrequency, 0xB5, Float),
    (OutputSamplingFrequency, 0x78B5, Float),
    (Channels, 0x9F, Unsigned),
    (BitDepth, 0x6264, Unsigned),
    // Cluster
    (Cluster, 0x1F43_B675, Master),
    (Timecode, 0xE7, Unsigned),
    (PrevSize, 0xAB, Unsigned),
    (Position, 0xA7, Unsigned),
    (SimpleBlock, 0xA3, Binary),
    (BlockGroup, 0xA0, Master),
    (Block, 0xA1, Binary),
    (BlockDuration, 0x9B, Unsigned),
    (ReferenceBlock, 0xFB, Signed),
    (CodecState, 0xA4, Binary),
    (Slices, 0x8E, Master),
    (TimeSlice, 0xE8, Master),
    (LaceNumber, 0xCC, Unsigned),
    // Cues
    (Cues, 0x1C53_BB6B, Master),
    (CuePoint, 0xBB, Master),
    (CueTime, 0xB3, Unsigned),
    (CueTrackPositions, 0xB7, Master),
    (CueTrack, 0xF7, Unsigned),
    (CueClusterPosition, 0xF1, Unsigned),
    (CueBlockNumber, 0x5378, Unsigned),
    // Other top-level elements. Not bound, but known so that their payload
    // is skipped as a unit.
    (Chapters, 0x1043_A770, Master),
    (Attachments, 0x1941_A469, Master),
    (Tags, 0x1254_C367, Master)
);
