//! Builders for small in-memory EBML documents.

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

/// An element of known size.
pub(crate) fn el(id: u32, payload: &[u8]) -> Vec<u8> {
    let mut buf = id_bytes(id);
    buf.extend(size_bytes(payload.len() as u64));
    buf.extend_from_slice(payload);
    buf
}

/// The header of an element of unknown size. Children follow directly.
pub(crate) fn el_unknown(id: u32) -> Vec<u8> {
    let mut buf = id_bytes(id);
    buf.push(0xFF);
    buf
}

/// An unsigned integer element in its shortest encoding.
pub(crate) fn uint(id: u32, value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(8);
    el(id, &bytes[first..])
}

pub(crate) fn float(id: u32, value: f64) -> Vec<u8> {
    el(id, &value.to_be_bytes())
}

pub(crate) fn string(id: u32, value: &str) -> Vec<u8> {
    el(id, value.as_bytes())
}

#[test]
fn test_builders() {
    assert_eq!(el(0xA3, &[1, 2]), vec![0xA3, 0x82, 1, 2]);
    assert_eq!(uint(0xE7, 0), vec![0xE7, 0x80]);
    assert_eq!(
        uint(0x2A_D7B1, 1000),
        vec![0x2A, 0xD7, 0xB1, 0x82, 0x03, 0xE8]
    );
    assert_eq!(el_unknown(0x1F43_B675), vec![0x1F, 0x43, 0xB6, 0x75, 0xFF]);
    // 127 would be the reserved all-ones 1-byte size
    assert_eq!(&size_bytes(127)[..], &[0x40, 0x7F]);
}
