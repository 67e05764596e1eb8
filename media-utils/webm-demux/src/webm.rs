// Copyright 2022-2023 Andrew D. Straw.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT
// or http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The WebM subset of the Matroska schema.
//!
//! See https://www.webmproject.org/docs/container/ for element semantics.

use chrono::{DateTime, Utc};

use crate::schema::Record;
use crate::Tag;

/// `TrackType` of a video track.
pub const TRACK_TYPE_VIDEO: u64 = 1;
/// `TrackType` of an audio track.
pub const TRACK_TYPE_AUDIO: u64 = 2;

ebml_record! {
    /// A complete document: EBML header and Segment.
    ///
    /// Binding stops at the first Cluster.
    pub struct WebM {
        pub header: Header = Ebml;
        pub segment: Segment = Segment, unbounded = true;
    }
}

ebml_record! {
    pub struct Header {
        pub version: u64 = EbmlVersion, default 1;
        pub read_version: u64 = EbmlReadVersion, default 1;
        pub max_id_length: u64 = EbmlMaxIdLength, default 4;
        pub max_size_length: u64 = EbmlMaxSizeLength, default 8;
        pub doc_type: String = DocType;
        pub doc_type_version: u64 = DocTypeVersion, default 1;
        pub doc_type_read_version: u64 = DocTypeReadVersion, default 1;
    }
}

ebml_record! {
    /// Segment metadata. Clusters are not bound but streamed.
    pub struct Segment [stop Cluster] {
        pub seek_head: SeekHead = SeekHead;
        pub info: SegmentInformation = Info;
        pub tracks: Tracks = Tracks;
        pub cues: Cues = Cues;
    }
}

ebml_record! {
    pub struct SeekHead {
        pub seek: Vec<Seek> = Seek;
    }
}

ebml_record! {
    pub struct Seek {
        pub id: Vec<u8> = SeekId;
        pub position: u64 = SeekPosition;
    }
}

ebml_record! {
    pub struct SegmentInformation {
        /// Nanoseconds per timecode tick.
        pub timecode_scale: u64 = TimecodeScale, default 1_000_000;
        /// Duration in timecode ticks.
        pub duration: f64 = Duration;
        pub date_utc: Option<DateTime<Utc>> = DateUtc;
        pub title: String = Title;
        pub muxing_app: String = MuxingApp;
        pub writing_app: String = WritingApp;
    }
}

ebml_record! {
    pub struct Tracks {
        pub entries: Vec<TrackEntry> = TrackEntry;
    }
}

ebml_record! {
    pub struct TrackEntry {
        pub number: u64 = TrackNumber;
        pub uid: u64 = TrackUid;
        pub track_type: u64 = TrackType;
        pub flag_enabled: u64 = FlagEnabled, default 1;
        pub flag_default: u64 = FlagDefault, default 1;
        pub flag_forced: u64 = FlagForced, default 0;
        pub flag_lacing: u64 = FlagLacing, default 1;
        pub default_duration: u64 = DefaultDuration;
        pub name: String = Name;
        pub language: String = Language, default String::from("eng");
        pub codec_id: String = CodecId;
        pub codec_private: Vec<u8> = CodecPrivate;
        pub codec_name: String = CodecName;
        pub video: Video = Video;
        pub audio: Audio = Audio;
    }
}

ebml_record! {
    pub struct Video {
        pub flag_interlaced: u64 = FlagInterlaced, default 0;
        pub stereo_mode: u64 = StereoMode, default 0;
        pub pixel_width: u64 = PixelWidth;
        pub pixel_height: u64 = PixelHeight;
        pub pixel_crop_bottom: u64 = PixelCropBottom, default 0;
        pub pixel_crop_top: u64 = PixelCropTop, default 0;
        pub pixel_crop_left: u64 = PixelCropLeft, default 0;
        pub pixel_crop_right: u64 = PixelCropRight, default 0;
        pub display_width: u64 = DisplayWidth, default_from pixel_width;
        pub display_height: u64 = DisplayHeight, default_from pixel_height;
        pub display_unit: u64 = DisplayUnit, default 0;
        pub aspect_ratio_type: u64 = AspectRatioType, default 0;
    }
}

ebml_record! {
    pub struct Audio {
        pub sampling_frequency: f64 = SamplingFrequency, default 8000.0;
        pub output_sampling_frequency: f64 = OutputSamplingFrequency,
            default_from sampling_frequency;
        pub channels: u64 = Channels, default 1;
        pub bit_depth: u64 = BitDepth;
    }
}

ebml_record! {
    /// Eagerly bound fields of a Cluster. Blocks are streamed.
    pub struct Cluster [stop SimpleBlock, BlockGroup] {
        pub timecode: u64 = Timecode;
        pub prev_size: u64 = PrevSize;
        pub position: u64 = Position;
    }
}

ebml_record! {
    pub struct BlockGroup {
        pub block: Vec<u8> = Block;
        pub block_duration: u64 = BlockDuration;
        pub reference_block: Vec<i64> = ReferenceBlock;
        pub codec_state: Vec<u8> = CodecState;
        pub slices: Vec<Slices> = Slices;
    }
}

ebml_record! {
    pub struct Slices {
        pub time_slice: Vec<TimeSlice> = TimeSlice;
    }
}

ebml_record! {
    pub struct TimeSlice {
        pub lace_number: u64 = LaceNumber, default 0;
    }
}

ebml_record! {
    pub struct Cues {
        pub cue_point: Vec<CuePoint> = CuePoint;
    }
}

ebml_record! {
    pub struct CuePoint {
        pub time: u64 = CueTime;
        pub track_positions: Vec<CueTrackPositions> = CueTrackPositions;
    }
}

ebml_record! {
    pub struct CueTrackPositions {
        pub track: u64 = CueTrack;
        pub cluster_position: u64 = CueClusterPosition;
        pub block_number: u64 = CueBlockNumber, default 1;
    }
}

impl WebM {
    #[inline]
    pub fn first_video_track(&self) -> Option<&TrackEntry> {
        self.segment.find_first_video_track()
    }
}

impl Header {
    pub fn is_webm(&self) -> bool {
        self.doc_type == "webm"
    }
}

impl Segment {
    /// The first video track in declaration order.
    pub fn find_first_video_track(&self) -> Option<&TrackEntry> {
        self.tracks.entries.iter().find(|track| track.is_video())
    }

    pub fn track_by_number(&self, number: u64) -> Option<&TrackEntry> {
        self.tracks
            .entries
            .iter()
            .find(|track| track.number == number)
    }
}

impl SegmentInformation {
    pub fn duration_seconds(&self) -> f64 {
        self.duration * self.timecode_scale as f64 / 1e9
    }
}

impl TrackEntry {
    #[inline]
    pub fn is_video(&self) -> bool {
        self.track_type == TRACK_TYPE_VIDEO
    }
    #[inline]
    pub fn is_audio(&self) -> bool {
        self.track_type == TRACK_TYPE_AUDIO
    }
}

/// IDs of the elements which may follow a Cluster inside a Segment.
///
/// A Cluster of unknown size ends at any of these.
pub fn segment_level_ids() -> Vec<u32> {
    let mut ids: Vec<u32> = Segment::FIELDS.iter().map(|f| f.tag.id()).collect();
    ids.extend([Tag::Chapters, Tag::Attachments, Tag::Tags].map(|t| t.id()));
    ids
}
