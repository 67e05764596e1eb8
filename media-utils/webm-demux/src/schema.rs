// Copyright 2022-2023 Andrew D. Straw.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT
// or http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Binding of EBML elements onto statically declared record types.
//!
//! Record types are declared with [ebml_record!], which generates the struct,
//! its table of [FieldDescriptor]s, dispatch by [Tag] and default
//! resolution. Binding walks the elements of one level, skipping unknown IDs,
//! until the level ends or a field marked `stop` is found. In the latter case
//! the partially bound record is returned together with a [Continuation]
//! from which the caller reads the rest of the level.

use std::io::Read;

use chrono::{DateTime, TimeZone, Utc};

use crate::error::{Error, Result};
use crate::reader::{Cursor, EbmlReader, Element};
use crate::tags::ElementType;
use crate::varint::ElementSize;
use crate::Tag;

/// Static description of one field of a record type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldDescriptor {
    pub tag: Tag,
    /// name of the struct field, or of the tag for `stop` fields
    pub name: &'static str,
    pub kind: ElementType,
    /// a literal default is set when the element is absent
    pub has_default: bool,
    /// when absent, copy the value of this (earlier) field
    pub link: Option<&'static str>,
    pub repeated: bool,
    /// binding of the enclosing record halts at this element
    pub stop: bool,
    /// the element may have unknown size
    pub unbounded: bool,
}

/// The rest of a level after binding halted at a `stop` field.
///
/// `first` is the element which halted binding. It has been neither read nor
/// descended. Pass it to `rest` with [Cursor::children] or read it with
/// [EbmlReader::read_data]; otherwise the next call to `rest.next()` skips
/// it.
#[derive(Debug)]
pub struct Continuation {
    first: Element,
    rest: Cursor,
}

impl Continuation {
    pub fn first(&self) -> &Element {
        &self.first
    }

    pub fn into_parts(self) -> (Element, Cursor) {
        (self.first, self.rest)
    }
}

/// The outcome of binding a record.
#[derive(Debug)]
pub enum Bound<T> {
    /// All elements of the level were consumed.
    Complete(T),
    /// A `stop` field was found here or in a nested record.
    ReachedBoundary(T, Continuation),
}

impl<T> Bound<T> {
    pub fn into_parts(self) -> (T, Option<Continuation>) {
        match self {
            Bound::Complete(value) => (value, None),
            Bound::ReachedBoundary(value, continuation) => (value, Some(continuation)),
        }
    }
}

/// A value which can be bound from one element.
pub trait Field {
    const REPEATED: bool = false;

    /// Bind `element`, which `cursor` has just returned.
    ///
    /// `siblings` describes the record containing this field.
    fn bind<R: Read>(
        &mut self,
        element: Element,
        rdr: &mut EbmlReader<R>,
        cursor: &mut Cursor,
        siblings: &'static [FieldDescriptor],
    ) -> Result<Option<Continuation>>;
}

/// A record type declared with [ebml_record!].
pub trait Record: Default {
    const FIELDS: &'static [FieldDescriptor];

    /// Bind `element` into the field declared for its tag.
    ///
    /// Elements without a field are left for the cursor to skip.
    fn bind_field<R: Read>(
        &mut self,
        element: Element,
        rdr: &mut EbmlReader<R>,
        cursor: &mut Cursor,
    ) -> Result<Option<Continuation>>;

    /// Resolve defaults and links of all fields whose tag is not in `seen`.
    ///
    /// Fields are resolved in declaration order, so a link sees the final
    /// value of the field it refers to.
    fn apply_defaults(&mut self, seen: &[Tag]);

    fn field(tag: Tag) -> Option<&'static FieldDescriptor> {
        Self::FIELDS.iter().find(|field| field.tag == tag)
    }
}

/// Bind a record from the elements of one level.
pub fn bind_record<T: Record, R: Read>(
    rdr: &mut EbmlReader<R>,
    mut cursor: Cursor,
) -> Result<Bound<T>> {
    let mut record = T::default();
    let mut seen: Vec<Tag> = Vec::new();

    while let Some(element) = cursor.next(rdr)? {
        let tag = element.tag();
        let Some(descriptor) = T::field(tag) else {
            tracing::trace!("skipping unbound element {tag:?}");
            continue;
        };
        if descriptor.stop {
            record.apply_defaults(&seen);
            let continuation = Continuation {
                first: element,
                rest: cursor,
            };
            return Ok(Bound::ReachedBoundary(record, continuation));
        }
        if !seen.contains(&tag) {
            seen.push(tag);
        }
        if let Some(continuation) = record.bind_field(element, rdr, &mut cursor)? {
            record.apply_defaults(&seen);
            return Ok(Bound::ReachedBoundary(record, continuation));
        }
    }

    record.apply_defaults(&seen);
    Ok(Bound::Complete(record))
}

/// Bind the children of `element` as a nested record into `slot`.
pub(crate) fn bind_child<T: Record, R: Read>(
    slot: &mut T,
    element: Element,
    rdr: &mut EbmlReader<R>,
    cursor: &mut Cursor,
    siblings: &'static [FieldDescriptor],
) -> Result<Option<Continuation>> {
    let unbounded = siblings
        .iter()
        .any(|field| field.tag == element.tag() && field.unbounded);
    // A size-unknown record ends where one of its siblings starts.
    let sibling_ids: Vec<u32> = match element.size() {
        ElementSize::Unknown => siblings.iter().map(|field| field.tag.id()).collect(),
        ElementSize::Known(_) => Vec::new(),
    };
    let children = cursor.children(&element, &sibling_ids, unbounded)?;
    let (record, continuation) = bind_record::<T, R>(rdr, children)?.into_parts();
    *slot = record;
    Ok(continuation)
}

fn bad_size(tag: Tag, data: &[u8]) -> Error {
    Error::BadDataSize {
        tag,
        size: data.len() as u64,
    }
}

pub(crate) fn decode_unsigned(tag: Tag, data: &[u8]) -> Result<u64> {
    if data.len() > 8 {
        return Err(bad_size(tag, data));
    }
    Ok(data.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
}

pub(crate) fn decode_signed(tag: Tag, data: &[u8]) -> Result<i64> {
    if data.len() > 8 {
        return Err(bad_size(tag, data));
    }
    let Some(first) = data.first() else {
        return Ok(0);
    };
    let mut buf = if first & 0x80 != 0 { [0xFF; 8] } else { [0; 8] };
    buf[8 - data.len()..].copy_from_slice(data);
    Ok(i64::from_be_bytes(buf))
}

pub(crate) fn decode_float(tag: Tag, data: &[u8]) -> Result<f64> {
    match data.len() {
        0 => Ok(0.0),
        4 => {
            let mut buf = [0u8; 4];
            buf.copy_from_slice(data);
            Ok(f64::from(f32::from_be_bytes(buf)))
        }
        8 => {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(data);
            Ok(f64::from_be_bytes(buf))
        }
        _ => Err(bad_size(tag, data)),
    }
}

/// Strings may be padded with NUL bytes.
pub(crate) fn decode_string(data: &[u8]) -> String {
    let end = data.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    String::from_utf8_lossy(&data[..end]).into_owned()
}

/// Dates are signed nanoseconds since 2001-01-01T00:00:00 UTC.
pub(crate) fn decode_date(tag: Tag, data: &[u8]) -> Result<Option<DateTime<Utc>>> {
    if data.len() != 8 {
        return Err(bad_size(tag, data));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(data);
    let nsecs = i64::from_be_bytes(buf);
    let millennium = Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).single();
    let offset = chrono::Duration::nanoseconds(nsecs);
    Ok(millennium.map(|t0| t0 + offset))
}

macro_rules! leaf_field {
    ($ty:ty, |$tag:ident, $data:ident| $decode:expr) => {
        impl Field for $ty {
            fn bind<R: Read>(
                &mut self,
                element: Element,
                rdr: &mut EbmlReader<R>,
                _cursor: &mut Cursor,
                _siblings: &'static [FieldDescriptor],
            ) -> Result<Option<Continuation>> {
                let $tag = element.tag();
                let $data = rdr.read_data(&element)?;
                *self = $decode;
                Ok(None)
            }
        }
    };
}

leaf_field!(u64, |tag, data| decode_unsigned(tag, &data)?);
leaf_field!(f64, |tag, data| decode_float(tag, &data)?);
leaf_field!(String, |_tag, data| decode_string(&data));
leaf_field!(Vec<u8>, |_tag, data| data);
leaf_field!(Option<DateTime<Utc>>, |tag, data| decode_date(tag, &data)?);

/// Repeated signed integers, as for ReferenceBlock.
impl Field for Vec<i64> {
    const REPEATED: bool = true;

    fn bind<R: Read>(
        &mut self,
        element: Element,
        rdr: &mut EbmlReader<R>,
        _cursor: &mut Cursor,
        _siblings: &'static [FieldDescriptor],
    ) -> Result<Option<Continuation>> {
        let data = rdr.read_data(&element)?;
        self.push(decode_signed(element.tag(), &data)?);
        Ok(None)
    }
}

/// Declare a record type bound from the children of a master element.
///
/// ```text
/// ebml_record! {
///     pub struct Audio {
///         pub sampling_frequency: f64 = SamplingFrequency, default 8000.0;
///         pub output_sampling_frequency: f64 = OutputSamplingFrequency,
///             default_from sampling_frequency;
///     }
/// }
/// ```
///
/// Each field names the [Tag] it is bound from, optionally followed by
/// `default EXPR`, `default_from FIELD` (which must be declared earlier) and
/// `unbounded = true` (the element may have unknown size). Tags listed in
/// `[stop ...]` after the struct name halt binding of the record.
macro_rules! ebml_record {
    (@has_default) => { false };
    (@has_default $def:expr) => { true };
    (@link) => { None };
    (@link $link:ident) => { Some(stringify!($link)) };
    (@flag) => { false };
    (@flag $flag:literal) => { $flag };
    (
        $(#[$meta:meta])*
        pub struct $name:ident $([stop $($stop:ident),+])? {
            $(
                $(#[$fmeta:meta])*
                pub $field:ident: $ty:ty = $tag:ident
                    $(, default $def:expr)?
                    $(, default_from $link:ident)?
                    $(, unbounded = $unbounded:literal)?
                ;
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name {
            $(
                $(#[$fmeta])*
                pub $field: $ty,
            )*
        }

        impl Default for $name {
            fn default() -> Self {
                let mut record = Self {
                    $( $field: Default::default(), )*
                };
                $crate::schema::Record::apply_defaults(&mut record, &[]);
                record
            }
        }

        impl $crate::schema::Record for $name {
            const FIELDS: &'static [$crate::schema::FieldDescriptor] = &[
                $(
                    $crate::schema::FieldDescriptor {
                        tag: $crate::Tag::$tag,
                        name: stringify!($field),
                        kind: $crate::Tag::$tag.element_type(),
                        has_default: ebml_record!(@has_default $($def)?),
                        link: ebml_record!(@link $($link)?),
                        repeated: <$ty as $crate::schema::Field>::REPEATED,
                        stop: false,
                        unbounded: ebml_record!(@flag $($unbounded)?),
                    },
                )*
                $($(
                    $crate::schema::FieldDescriptor {
                        tag: $crate::Tag::$stop,
                        name: stringify!($stop),
                        kind: $crate::Tag::$stop.element_type(),
                        has_default: false,
                        link: None,
                        repeated: true,
                        stop: true,
                        unbounded: true,
                    },
                )+)?
            ];

            fn bind_field<R: std::io::Read>(
                &mut self,
                element: $crate::reader::Element,
                rdr: &mut $crate::reader::EbmlReader<R>,
                cursor: &mut $crate::reader::Cursor,
            ) -> $crate::Result<Option<$crate::schema::Continuation>> {
                match element.tag() {
                    $(
                        $crate::Tag::$tag => <$ty as $crate::schema::Field>::bind(
                            &mut self.$field,
                            element,
                            rdr,
                            cursor,
                            Self::FIELDS,
                        ),
                    )*
                    _ => Ok(None),
                }
            }

            fn apply_defaults(&mut self, seen: &[$crate::Tag]) {
                let _ = seen;
                $(
                    $(
                        if !seen.contains(&$crate::Tag::$tag) {
                            self.$field = $def;
                        }
                    )?
                    $(
                        if !seen.contains(&$crate::Tag::$tag) {
                            self.$field = self.$link.clone();
                        }
                    )?
                )*
            }
        }

        impl $crate::schema::Field for $name {
            fn bind<R: std::io::Read>(
                &mut self,
                element: $crate::reader::Element,
                rdr: &mut $crate::reader::EbmlReader<R>,
                cursor: &mut $crate::reader::Cursor,
                siblings: &'static [$crate::schema::FieldDescriptor],
            ) -> $crate::Result<Option<$crate::schema::Continuation>> {
                $crate::schema::bind_child(self, element, rdr, cursor, siblings)
            }
        }

        impl $crate::schema::Field for Vec<$name> {
            const REPEATED: bool = true;

            fn bind<R: std::io::Read>(
                &mut self,
                element: $crate::reader::Element,
                rdr: &mut $crate::reader::EbmlReader<R>,
                cursor: &mut $crate::reader::Cursor,
                siblings: &'static [$crate::schema::FieldDescriptor],
            ) -> $crate::Result<Option<$crate::schema::Continuation>> {
                let mut item = <$name as Default>::default();
                let continuation =
                    $crate::schema::bind_child(&mut item, element, rdr, cursor, siblings)?;
                self.push(item);
                Ok(continuation)
            }
        }
    };
}

/// Check the invariants of a descriptor table.
#[cfg(test)]
pub(crate) fn check_fields(fields: &[FieldDescriptor]) -> std::result::Result<(), String> {
    for (i, field) in fields.iter().enumerate() {
        if fields[..i].iter().any(|prev| prev.tag == field.tag) {
            return Err(format!("duplicate tag {:?}", field.tag));
        }
        if field.stop && !field.unbounded {
            return Err(format!("stop field {} must be unbounded", field.name));
        }
        if let Some(link) = field.link {
            if field.has_default {
                return Err(format!("{} has both a default and a link", field.name));
            }
            let Some(target) = fields[..i].iter().find(|prev| prev.name == link) else {
                return Err(format!(
                    "{} links to {link}, not an earlier field",
                    field.name
                ));
            };
            if target.kind != field.kind || target.link.is_some() {
                return Err(format!("{} links to incompatible {link}", field.name));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutil::{el, el_unknown, float, string, uint};

    ebml_record! {
        pub struct Dims {
            pub width: u64 = PixelWidth, default 320;
            pub height: u64 = PixelHeight;
            pub display_width: u64 = DisplayWidth, default_from width;
            pub label: String = Name, default String::from("none");
        }
    }

    ebml_record! {
        pub struct Outer [stop Cluster] {
            pub scale: u64 = TimecodeScale, default 1_000_000;
            pub dims: Dims = Video;
            pub refs: Vec<i64> = ReferenceBlock;
            pub entries: Vec<Dims> = TrackEntry;
            pub rate: f64 = SamplingFrequency;
        }
    }

    ebml_record! {
        pub struct Wrapper {
            pub version: u64 = EbmlVersion, default 1;
            pub inner: Outer = Segment, unbounded = true;
        }
    }

    fn bind<T: Record>(buf: &[u8]) -> Result<Bound<T>> {
        let mut rdr = EbmlReader::new(buf);
        bind_record::<T, _>(&mut rdr, Cursor::root())
    }

    fn complete<T: Record + std::fmt::Debug>(buf: &[u8]) -> anyhow::Result<T> {
        match bind::<T>(buf)? {
            Bound::Complete(value) => Ok(value),
            other => anyhow::bail!("expected complete record, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults_from_empty() -> anyhow::Result<()> {
        let dims: Dims = complete(&[])?;
        assert_eq!(dims.width, 320);
        assert_eq!(dims.height, 0);
        assert_eq!(dims.display_width, 320);
        assert_eq!(dims.label, "none");
        assert_eq!(dims, Dims::default());
        Ok(())
    }

    #[test]
    fn test_link_follows_bound_value() -> anyhow::Result<()> {
        let dims: Dims = complete(&uint(0xB0, 640))?;
        assert_eq!(dims.width, 640);
        assert_eq!(dims.display_width, 640);

        let mut buf = uint(0x54B0, 800);
        buf.extend(uint(0xB0, 640));
        let dims: Dims = complete(&buf)?;
        assert_eq!(dims.width, 640);
        assert_eq!(dims.display_width, 800);
        Ok(())
    }

    #[test]
    fn test_unknown_elements_skipped() -> anyhow::Result<()> {
        let mut buf = el(0x4242, &[1, 2, 3]);
        buf.extend(el(0xEC, &[0; 5]));
        buf.extend(uint(0xB0, 7));
        buf.extend(string(0x536E, "cam\0\0"));
        let dims: Dims = complete(&buf)?;
        assert_eq!(dims.width, 7);
        assert_eq!(dims.label, "cam");
        Ok(())
    }

    #[test]
    fn test_nested_and_repeated() -> anyhow::Result<()> {
        let mut buf = el(0xE0, &uint(0xBA, 480));
        buf.extend(el(0xFB, &[0xFF]));
        buf.extend(el(0xFB, &[0x01, 0x00]));
        buf.extend(el(0xAE, &uint(0xB0, 1)));
        buf.extend(el(0xAE, &uint(0xB0, 2)));
        buf.extend(float(0xB5, 48000.0));
        let outer: Outer = complete(&buf)?;
        assert_eq!(outer.scale, 1_000_000);
        assert_eq!(outer.dims.height, 480);
        assert_eq!(outer.dims.width, 320);
        assert_eq!(outer.refs, vec![-1, 256]);
        let widths: Vec<u64> = outer.entries.iter().map(|e| e.display_width).collect();
        assert_eq!(widths, vec![1, 2]);
        assert_eq!(outer.rate, 48000.0);
        Ok(())
    }

    #[test]
    fn test_stop_boundary() -> anyhow::Result<()> {
        let mut buf = el(0xE0, &uint(0xB0, 100));
        buf.extend(el(0x1F43_B675, &uint(0xE7, 9)));
        // after the boundary: left for the continuation
        buf.extend(uint(0x2A_D7B1, 5));

        let mut rdr = EbmlReader::new(&buf[..]);
        let bound = bind_record::<Outer, _>(&mut rdr, Cursor::root())?;
        let (outer, continuation) = bound.into_parts();
        assert_eq!(outer.dims.width, 100);
        assert_eq!(outer.scale, 1_000_000);

        let continuation = continuation.expect("boundary");
        assert_eq!(continuation.first().tag(), Tag::Cluster);
        let (_cluster, mut rest) = continuation.into_parts();
        let next = rest.next(&mut rdr)?.expect("element after cluster");
        assert_eq!(next.tag(), Tag::TimecodeScale);
        assert!(rest.next(&mut rdr)?.is_none());
        Ok(())
    }

    #[test]
    fn test_boundary_propagates_outward() -> anyhow::Result<()> {
        let mut buf = el_unknown(0x1853_8067);
        buf.extend(uint(0x2A_D7B1, 5));
        buf.extend(el(0x1F43_B675, &uint(0xE7, 9)));

        let mut rdr = EbmlReader::new(&buf[..]);
        let bound = bind_record::<Wrapper, _>(&mut rdr, Cursor::root())?;
        let Bound::ReachedBoundary(wrapper, continuation) = bound else {
            anyhow::bail!("expected boundary");
        };
        assert_eq!(wrapper.version, 1);
        assert_eq!(wrapper.inner.scale, 5);
        assert_eq!(wrapper.inner.dims.width, 320);

        let (cluster, mut rest) = continuation.into_parts();
        let mut children = rest.children(&cluster, &[], false)?;
        let timecode = children.next(&mut rdr)?.expect("timecode");
        assert_eq!(rdr.read_data(&timecode)?, vec![9]);
        Ok(())
    }

    #[test]
    fn test_unknown_size_needs_unbounded_field() {
        let mut buf = el_unknown(0xE0);
        buf.extend(uint(0xB0, 1));
        assert!(matches!(
            bind::<Outer>(&buf),
            Err(Error::UnknownSize { tag: Tag::Video })
        ));
    }

    #[test]
    fn test_bad_data_size() {
        assert!(matches!(
            bind::<Dims>(&el(0xB0, &[0; 9])),
            Err(Error::BadDataSize {
                tag: Tag::PixelWidth,
                size: 9
            })
        ));
        assert!(matches!(
            bind::<Outer>(&el(0xB5, &[0; 3])),
            Err(Error::BadDataSize { size: 3, .. })
        ));
    }

    #[test]
    fn test_leaf_decoding() -> anyhow::Result<()> {
        assert_eq!(decode_unsigned(Tag::Timecode, &[])?, 0);
        assert_eq!(decode_unsigned(Tag::Timecode, &[0xFF; 8])?, u64::MAX);
        assert_eq!(decode_signed(Tag::ReferenceBlock, &[0xFF, 0xFE])?, -2);
        assert_eq!(decode_signed(Tag::ReferenceBlock, &[0x7F])?, 127);
        assert_eq!(decode_float(Tag::Duration, &1.5f32.to_be_bytes())?, 1.5);
        assert_eq!(decode_float(Tag::Duration, &[])?, 0.0);
        assert_eq!(decode_string(b"webm\0"), "webm");
        assert_eq!(decode_string(b""), "");

        let t0 = decode_date(Tag::DateUtc, &[0; 8])?.expect("date");
        assert_eq!(t0, Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap());
        let one_sec = 1_000_000_000i64.to_be_bytes();
        let t1 = decode_date(Tag::DateUtc, &one_sec)?.expect("date");
        assert_eq!(t1, Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 1).unwrap());
        assert!(decode_date(Tag::DateUtc, &[0; 4]).is_err());
        Ok(())
    }

    #[test]
    fn test_descriptors() {
        check_fields(Dims::FIELDS).unwrap();
        check_fields(Outer::FIELDS).unwrap();
        check_fields(Wrapper::FIELDS).unwrap();

        let display = Dims::field(Tag::DisplayWidth).unwrap();
        assert_eq!(display.link, Some("width"));
        assert!(!display.has_default);
        assert!(Dims::field(Tag::PixelWidth).unwrap().has_default);

        let refs = Outer::field(Tag::ReferenceBlock).unwrap();
        assert_eq!(refs.kind, ElementType::Signed);
        assert!(refs.repeated);
        assert!(Outer::field(Tag::TrackEntry).unwrap().repeated);
        assert!(!Outer::field(Tag::Video).unwrap().repeated);

        let stop = Outer::field(Tag::Cluster).unwrap();
        assert!(stop.stop && stop.unbounded);
        assert!(Wrapper::field(Tag::Segment).unwrap().unbounded);
    }

    #[test]
    fn test_check_fields_rejects_forward_link() {
        let fields = [
            FieldDescriptor {
                tag: Tag::DisplayWidth,
                name: "display_width",
                kind: ElementType::Unsigned,
                has_default: false,
                link: Some("width"),
                repeated: false,
                stop: false,
                unbounded: false,
            },
            FieldDescriptor {
                tag: Tag::PixelWidth,
                name: "width",
                kind: ElementType::Unsigned,
                has_default: true,
                link: None,
                repeated: false,
                stop: false,
                unbounded: false,
            },
        ];
        assert!(check_fields(&fields).is_err());
    }
}
