//! Builds small WebM documents in memory.
#![allow(dead_code)]

pub const EBML: u32 = 0x1A45_DFA3;
pub const DOC_TYPE: u32 = 0x4282;
pub const SEGMENT: u32 = 0x1853_8067;
pub const TRACKS: u32 = 0x1654_AE6B;
pub const TRACK_ENTRY: u32 = 0xAE;
pub const TRACK_NUMBER: u32 = 0xD7;
pub const TRACK_TYPE: u32 = 0x83;
pub const CODEC_ID: u32 = 0x86;
pub const CLUSTER: u32 = 0x1F43_B675;
pub const TIMECODE: u32 = 0xE7;
pub const SIMPLE_BLOCK: u32 = 0xA3;

fn id_bytes(id: u32) -> Vec<u8> {
    let bytes = id.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(3);
    bytes[first..].to_vec()
}

fn size_bytes(size: u64) -> Vec<u8> {
    let mut len = 1;
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

pub fn uint(id: u32, value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(8);
    el(id, &bytes[first..])
}

pub fn track_entry(number: u64, track_type: u64, codec_id: &str) -> Vec<u8> {
    let mut buf = uint(TRACK_NUMBER, number);
    buf.extend(uint(TRACK_TYPE, track_type));
    buf.extend(el(CODEC_ID, codec_id.as_bytes()));
    el(TRACK_ENTRY, &buf)
}

pub fn simple_block(track: u8, relative_timecode: u16, payload: &[u8]) -> Vec<u8> {
    let mut buf = vec![0x80 | track];
    buf.extend(relative_timecode.to_be_bytes());
    buf.push(0);
    buf.extend_from_slice(payload);
    el(SIMPLE_BLOCK, &buf)
}

pub fn cluster(timecode: u64, blocks: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = uint(TIMECODE, timecode);
    for block in blocks {
        buf.extend_from_slice(block);
    }
    el(CLUSTER, &buf)
}

pub fn webm(tracks: &[Vec<u8>], clusters: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = el(EBML, &el(DOC_TYPE, b"webm"));
    let mut segment = el(TRACKS, &tracks.concat());
    segment.extend(clusters.concat());
    buf.extend(el(SEGMENT, &segment));
    buf
}

/// Audio on track 1 and video on track 2, `n` clusters of one block each.
///
/// Video payloads are `[i]`, audio payloads `[100 + i]`.
pub fn movie(n: u8) -> Vec<u8> {
    let tracks = [track_entry(1, 2, "A_OPUS"), track_entry(2, 1, "V_VP8")];
    let clusters: Vec<Vec<u8>> = (0..n)
        .map(|i| {
            cluster(
                u64::from(i) * 40,
                &[simple_block(1, 0, &[100 + i]), simple_block(2, 0, &[i])],
            )
        })
        .collect();
    webm(&tracks, &clusters)
}
