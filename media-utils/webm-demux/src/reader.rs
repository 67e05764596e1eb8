// Copyright 2022-2023 Andrew D. Straw.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT
// or http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::io::Read;

use crate::error::{Error, Result};
use crate::varint::{read_element_header, ElementSize};
use crate::Tag;

/// The header of one EBML element.
///
/// The payload is not read. Use [EbmlReader::read_data] for leaf elements or
/// [Cursor::children] to descend into a master element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element {
    /// the ID of the EBML element
    tag: Tag,
    /// the position of the start of the EBML element
    position: u64,
    /// the position of the start of the payload
    data_position: u64,
    /// the data size of the EBML element
    size: ElementSize,
}

impl Element {
    #[inline]
    pub fn tag(&self) -> Tag {
        self.tag
    }
    #[inline]
    pub fn id(&self) -> u32 {
        self.tag.id()
    }
    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }
    #[inline]
    pub fn data_position(&self) -> u64 {
        self.data_position
    }
    #[inline]
    pub fn size(&self) -> ElementSize {
        self.size
    }
    /// The position one past the end of the payload, if the size is known.
    #[inline]
    pub fn data_end(&self) -> Option<u64> {
        self.size.known().map(|size| self.data_position + size)
    }
}

fn unexpected_eof(what: &str) -> Error {
    Error::Io(std::io::Error::new(
        std::io::ErrorKind::UnexpectedEof,
        what.to_string(),
    ))
}

/// Reads EBML elements strictly forward from a byte stream.
///
/// No seeking is needed: skipped payloads are read and discarded.
pub struct EbmlReader<R> {
    rdr: R,
    /// current position from start of stream
    position: u64,
    /// an element header read by a size-unknown level which belongs to an
    /// enclosing level
    pushed_back: Option<Element>,
}

impl<R: Read> EbmlReader<R> {
    pub fn new(rdr: R) -> Self {
        Self {
            rdr,
            position: 0,
            pushed_back: None,
        }
    }

    /// The position of the next unread element header.
    pub fn position(&self) -> u64 {
        match &self.pushed_back {
            Some(el) => el.position,
            None => self.position,
        }
    }

    fn read_header(&mut self) -> Result<Option<Element>> {
        if let Some(el) = self.pushed_back.take() {
            return Ok(Some(el));
        }
        let position = self.position;
        let raw = match read_element_header(&mut self.rdr, position)? {
            Some(raw) => raw,
            None => return Ok(None),
        };
        self.position += raw.len;
        let el = Element {
            tag: Tag::from(raw.id),
            position,
            data_position: self.position,
            size: raw.size,
        };
        tracing::trace!("{:?} at {position} data size {:?}", el.tag, el.size);
        Ok(Some(el))
    }

    fn push_back(&mut self, el: Element) {
        debug_assert!(self.pushed_back.is_none());
        self.pushed_back = Some(el);
    }

    /// Read the complete payload of a leaf element.
    ///
    /// The reader must be positioned at the start of the payload, which is
    /// the case directly after the element was returned by [Cursor::next].
    pub fn read_data(&mut self, element: &Element) -> Result<Vec<u8>> {
        let size = element
            .size
            .known()
            .ok_or(Error::UnknownSize { tag: element.tag })?;
        if self.pushed_back.is_some() || self.position != element.data_position {
            return Err(Error::OutOfOrder {
                tag: element.tag,
                expected: element.data_position,
                actual: self.position(),
            });
        }
        let mut buf = Vec::new();
        // `take` so that a corrupt size does not allocate up front.
        let n_read = (&mut self.rdr).take(size).read_to_end(&mut buf)?;
        self.position += n_read as u64;
        if (n_read as u64) < size {
            return Err(unexpected_eof("element data truncated"));
        }
        Ok(buf)
    }

    /// Discard input up to absolute position `end`.
    fn skip_to(&mut self, end: u64) -> Result<()> {
        debug_assert!(self.pushed_back.is_none());
        let n_wanted = end.saturating_sub(self.position);
        if n_wanted == 0 {
            return Ok(());
        }
        let n_skipped = std::io::copy(&mut (&mut self.rdr).take(n_wanted), &mut std::io::sink())?;
        self.position += n_skipped;
        if n_skipped < n_wanted {
            return Err(unexpected_eof("skipped element truncated"));
        }
        Ok(())
    }
}

/// The element most recently handed out by a [Cursor].
#[derive(Debug)]
struct OpenElement {
    element: Element,
    descended: bool,
}

/// Iterates the elements at one nesting level.
///
/// A `Cursor` holds no borrow of the reader. Levels must nevertheless be
/// used strictly in order: a child level must be finished before the
/// parent's next element is requested. An element which was returned but
/// neither read nor descended into is skipped when the next element at the
/// same level is requested.
#[derive(Debug)]
pub struct Cursor {
    /// absolute end of this level, if bounded
    end: Option<u64>,
    /// size-unknown levels end at any of these IDs
    closing_ids: Vec<u32>,
    unknown_size: bool,
    open: Option<OpenElement>,
}

impl Cursor {
    /// The top level of a document, ending at end of stream.
    pub fn root() -> Self {
        Self {
            end: None,
            closing_ids: Vec::new(),
            unknown_size: true,
            open: None,
        }
    }

    /// Read the next element header at this level.
    ///
    /// Returns `Ok(None)` at the end of the level.
    pub fn next<R: Read>(&mut self, rdr: &mut EbmlReader<R>) -> Result<Option<Element>> {
        self.finish_open(rdr)?;

        if let Some(end) = self.end {
            if rdr.position() >= end {
                return Ok(None);
            }
        }

        let element = match rdr.read_header()? {
            Some(element) => element,
            None => {
                if !self.unknown_size {
                    return Err(unexpected_eof("master element truncated"));
                }
                return Ok(None);
            }
        };

        if self.unknown_size && self.closing_ids.contains(&element.id()) {
            // A sibling of the enclosing element: hand it back.
            rdr.push_back(element);
            return Ok(None);
        }

        self.open = Some(OpenElement {
            element,
            descended: false,
        });
        Ok(Some(element))
    }

    /// A cursor over the children of `element`.
    ///
    /// `element` must be the element most recently returned by
    /// [Cursor::next] and must be a master element. If its size is unknown,
    /// `allow_unknown` must be set. The child level then ends at end of
    /// stream, at the end of this level, or at the first element whose ID is
    /// in `sibling_ids` (or closes this level).
    pub fn children(
        &mut self,
        element: &Element,
        sibling_ids: &[u32],
        allow_unknown: bool,
    ) -> Result<Cursor> {
        if !element.tag.is_master() {
            return Err(Error::NotMaster { tag: element.tag });
        }
        let child = match element.size {
            ElementSize::Known(size) => Cursor {
                end: Some(element.data_position + size),
                closing_ids: Vec::new(),
                unknown_size: false,
                open: None,
            },
            ElementSize::Unknown => {
                if !allow_unknown {
                    return Err(Error::UnknownSize { tag: element.tag });
                }
                let mut closing_ids = self.closing_ids.clone();
                closing_ids.extend_from_slice(sibling_ids);
                Cursor {
                    end: self.end,
                    closing_ids,
                    unknown_size: true,
                    open: None,
                }
            }
        };
        if let Some(open) = &mut self.open {
            debug_assert_eq!(&open.element, element);
            open.descended = true;
        }
        Ok(child)
    }

    fn finish_open<R: Read>(&mut self, rdr: &mut EbmlReader<R>) -> Result<()> {
        let Some(open) = self.open.take() else {
            return Ok(());
        };
        match open.element.data_end() {
            Some(end) => {
                if rdr.position() < end {
                    rdr.skip_to(end)?;
                }
            }
            None => {
                // The children of a size-unknown element can only be found by
                // reading them, which requires knowing the siblings.
                if !open.descended {
                    return Err(Error::UnknownSize {
                        tag: open.element.tag,
                    });
                }
            }
        }
        Ok(())
    }
}
