//! Builds small WebM documents in memory.
#![allow(dead_code)]

pub const EBML: u32 = 0x1A45_DFA3;
pub const DOC_TYPE: u32 = 0x4282;
pub const SEGMENT: u32 = 0x1853_8067;
pub const SEEK_HEAD: u32 = 0x114D_9B74;
pub const INFO: u32 = 0x1549_A966;
pub const TIMECODE_SCALE: u32 = 0x2A_D7B1;
pub const DURATION: u32 = 0x4489;
pub const TRACKS: u32 = 0x1654_AE6B;
pub const TRACK_ENTRY: u32 = 0xAE;
pub const TRACK_NUMBER: u32 = 0xD7;
pub const TRACK_TYPE: u32 = 0x83;
pub const VIDEO: u32 = 0xE0;
pub const PIXEL_WIDTH: u32 = 0xB0;
pub const PIXEL_HEIGHT: u32 = 0xBA;
pub const CLUSTER: u32 = 0x1F43_B675;
pub const TIMECODE: u32 = 0xE7;
pub const SIMPLE_BLOCK: u32 = 0xA3;
pub const BLOCK_GROUP: u32 = 0xA0;
pub const BLOCK: u32 = 0xA1;
pub const BLOCK_DURATION: u32 = 0x9B;
pub const REFERENCE_BLOCK: u32 = 0xFB;
pub const CUES: u32 = 0x1C53_BB6B;
pub const CUE_POINT: u32 = 0xBB;
pub const CUE_TIME: u32 = 0xB3;
pub const VOID: u32 = 0xEC;

fn id_bytes(id: u32) -> Vec<u8> {
    let bytes = id.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(3);
    bytes[first..].to_vec()
}

fn size_bytes(size: u64) -> Vec<u8> {
    let mut len = 1;
    // all-ones is reserved for unknown sizes
    while size >= (1u64 << (7 * len)) - 1 {
        len += 1;
    }
    let marked = size | (1u64 << (7 * len));
    marked.to_be_bytes()[8 - len..].to_vec()
}

pub fn el(id: u32, payload: &[u8]) -> Vec<u8> {
    let mut buf = id_bytes(id);
    buf.extend(size_bytes(payload.len() as u64));
    buf.extend_from_slice(payload);
    buf
}

/// Header of an element of unknown size. The children follow directly.
pub fn el_unknown(id: u32) -> Vec<u8> {
    let mut buf = id_bytes(id);
    buf.push(0xFF);
    buf
}

pub fn uint(id: u32, value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(8);
    el(id, &bytes[first..])
}

pub fn float(id: u32, value: f64) -> Vec<u8> {
    el(id, &value.to_be_bytes())
}

pub fn header() -> Vec<u8> {
    el(EBML, &el(DOC_TYPE, b"webm"))
}

pub fn track_entry(number: u64, track_type: u64) -> Vec<u8> {
    let mut buf = uint(TRACK_NUMBER, number);
    buf.extend(uint(TRACK_TYPE, track_type));
    el(TRACK_ENTRY, &buf)
}

pub fn video_track(number: u64, width: u64, height: u64) -> Vec<u8> {
    let mut buf = uint(TRACK_NUMBER, number);
    buf.extend(uint(TRACK_TYPE, 1));
    let mut video = uint(PIXEL_WIDTH, width);
    video.extend(uint(PIXEL_HEIGHT, height));
    buf.extend(el(VIDEO, &video));
    el(TRACK_ENTRY, &buf)
}

pub fn tracks(entries: &[Vec<u8>]) -> Vec<u8> {
    el(TRACKS, &entries.concat())
}

/// Raw block bytes: header and payload.
pub fn block(track: u8, relative_timecode: u16, flags: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = vec![0x80 | track];
    buf.extend(relative_timecode.to_be_bytes());
    buf.push(flags);
    buf.extend_from_slice(payload);
    buf
}

pub fn simple_block(track: u8, relative_timecode: u16, payload: &[u8]) -> Vec<u8> {
    el(SIMPLE_BLOCK, &block(track, relative_timecode, 0, payload))
}

pub fn block_group(block_bytes: &[u8], duration: u64, references: &[i8]) -> Vec<u8> {
    let mut buf = el(BLOCK, block_bytes);
    buf.extend(uint(BLOCK_DURATION, duration));
    for reference in references {
        buf.extend(el(REFERENCE_BLOCK, &reference.to_be_bytes()));
    }
    el(BLOCK_GROUP, &buf)
}

pub fn cluster_body(timecode: u64, children: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = uint(TIMECODE, timecode);
    for child in children {
        buf.extend_from_slice(child);
    }
    buf
}

pub fn cluster(timecode: u64, children: &[Vec<u8>]) -> Vec<u8> {
    el(CLUSTER, &cluster_body(timecode, children))
}

/// A document with a known-size Segment.
pub fn webm(segment_children: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = header();
    buf.extend(el(SEGMENT, &segment_children.concat()));
    buf
}

/// A live-stream style document: Segment and Clusters of unknown size.
pub fn live_webm(metadata: &[Vec<u8>], clusters: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = header();
    buf.extend(el_unknown(SEGMENT));
    buf.extend(metadata.concat());
    for body in clusters {
        buf.extend(el_unknown(CLUSTER));
        buf.extend_from_slice(body);
    }
    buf
}
