// Copyright 2022-2023 Andrew D. Straw.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT
// or http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::io::Read;

use crossbeam_channel::Sender;

use crate::error::{Error, Result};
use crate::packet::{parse_block, BlockOrigin, Demuxed, Packet};
use crate::reader::{Cursor, EbmlReader, Element};
use crate::schema::{bind_child, bind_record, Continuation, Record};
use crate::varint::ElementSize;
use crate::webm::{segment_level_ids, BlockGroup, Cluster, TrackEntry, WebM};
use crate::Tag;

/// Streaming state of the cluster being read.
struct ClusterBlocks {
    timecode: u64,
    /// the first block-bearing element, already returned by `blocks`
    first: Option<Element>,
    blocks: Cursor,
}

/// Iterates the packets of one track, cluster by cluster.
///
/// The iterator ends at the end of the Segment or at the first parse error.
/// In the latter case the error is available from [PacketExtractor::error].
pub struct PacketExtractor<R> {
    rdr: EbmlReader<R>,
    track: u64,
    /// Segment level, positioned after the last Cluster entered
    segment: Option<Cursor>,
    /// a Cluster returned by `segment` but not yet entered
    pending_cluster: Option<Element>,
    cluster: Option<ClusterBlocks>,
    n_clusters: u64,
    error: Option<Error>,
    done: bool,
}

impl<R: Read> PacketExtractor<R> {
    /// Resume from the Segment level continuation left by binding [WebM].
    ///
    /// Without a continuation, the Segment had no Cluster and no packets are
    /// produced.
    pub fn new(rdr: EbmlReader<R>, segment: Option<Continuation>, track: u64) -> Self {
        let (pending_cluster, segment) = match segment.map(Continuation::into_parts) {
            Some((first, rest)) => (Some(first), Some(rest)),
            None => (None, None),
        };
        Self {
            rdr,
            track,
            segment,
            pending_cluster,
            cluster: None,
            n_clusters: 0,
            error: None,
            done: false,
        }
    }

    pub fn track(&self) -> u64 {
        self.track
    }

    /// The error which ended extraction, if any.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn take_error(&mut self) -> Option<Error> {
        self.error.take()
    }

    fn enter_cluster(&mut self, element: Element) -> Result<()> {
        let Some(segment) = &mut self.segment else {
            return Ok(());
        };
        let sibling_ids = match element.size() {
            ElementSize::Unknown => segment_level_ids(),
            ElementSize::Known(_) => Vec::new(),
        };
        let children = segment.children(&element, &sibling_ids, true)?;
        let bound = bind_record::<Cluster, R>(&mut self.rdr, children)?;
        let (cluster, continuation) = bound.into_parts();
        self.n_clusters += 1;
        tracing::debug!(
            "cluster {} at {} with timecode {}",
            self.n_clusters,
            element.position(),
            cluster.timecode
        );
        match continuation {
            Some(continuation) => {
                let (first, blocks) = continuation.into_parts();
                self.cluster = Some(ClusterBlocks {
                    timecode: cluster.timecode,
                    first: Some(first),
                    blocks,
                });
            }
            None => {
                tracing::debug!("cluster {} has no blocks", self.n_clusters);
            }
        }
        Ok(())
    }

    fn next_packet(&mut self) -> Result<Option<Packet>> {
        loop {
            if let Some(cluster) = &mut self.cluster {
                let element = match cluster.first.take() {
                    Some(element) => element,
                    None => match cluster.blocks.next(&mut self.rdr)? {
                        Some(element) => element,
                        None => {
                            self.cluster = None;
                            continue;
                        }
                    },
                };
                let (data, origin) = match element.tag() {
                    Tag::SimpleBlock => (self.rdr.read_data(&element)?, BlockOrigin::SimpleBlock),
                    Tag::BlockGroup => {
                        let mut group = BlockGroup::default();
                        bind_child(
                            &mut group,
                            element,
                            &mut self.rdr,
                            &mut cluster.blocks,
                            Cluster::FIELDS,
                        )?;
                        let origin = BlockOrigin::BlockGroup {
                            duration: group.block_duration,
                            references: group.reference_block,
                        };
                        (group.block, origin)
                    }
                    other => {
                        tracing::trace!("skipping {other:?} in cluster");
                        continue;
                    }
                };
                match parse_block(cluster.timecode, data, origin) {
                    Some(packet) if packet.track_number == self.track => {
                        return Ok(Some(packet));
                    }
                    Some(_) => {}
                    None => {
                        tracing::trace!("skipping short block at {}", element.position());
                    }
                }
                continue;
            }

            let element = match self.pending_cluster.take() {
                Some(element) => element,
                None => {
                    let Some(segment) = &mut self.segment else {
                        return Ok(None);
                    };
                    match segment.next(&mut self.rdr)? {
                        Some(element) => element,
                        None => return Ok(None),
                    }
                }
            };
            if element.tag() == Tag::Cluster {
                self.enter_cluster(element)?;
            } else {
                tracing::trace!("skipping {:?} after clusters", element.tag());
            }
        }
    }
}

impl<R: Read> Iterator for PacketExtractor<R> {
    type Item = Packet;

    fn next(&mut self) -> Option<Packet> {
        if self.done {
            return None;
        }
        match self.next_packet() {
            Ok(Some(packet)) => Some(packet),
            Ok(None) => {
                tracing::debug!("end of segment after {} clusters", self.n_clusters);
                self.done = true;
                None
            }
            Err(e) => {
                tracing::warn!("ending packet extraction: {e}");
                self.error = Some(e);
                self.done = true;
                None
            }
        }
    }
}

/// A WebM document with its metadata bound, positioned at the first Cluster.
pub struct Demuxer<R> {
    rdr: EbmlReader<R>,
    webm: WebM,
    clusters: Option<Continuation>,
}

impl<R: Read> Demuxer<R> {
    /// Read the EBML header and Segment metadata.
    pub fn new(rdr: R) -> Result<Self> {
        let mut rdr = EbmlReader::new(rdr);
        let bound = bind_record::<WebM, R>(&mut rdr, Cursor::root())?;
        let (webm, clusters) = bound.into_parts();
        tracing::debug!(
            "doc type {:?} with {} tracks, has clusters: {}",
            webm.header.doc_type,
            webm.segment.tracks.entries.len(),
            clusters.is_some()
        );
        Ok(Self {
            rdr,
            webm,
            clusters,
        })
    }

    pub fn webm(&self) -> &WebM {
        &self.webm
    }

    pub fn first_video_track(&self) -> Result<&TrackEntry> {
        self.webm.first_video_track().ok_or(Error::TrackNotFound)
    }

    /// Stream the packets of `track`.
    pub fn packets(self, track: u64) -> PacketExtractor<R> {
        self.split(track).1
    }

    pub fn split(self, track: u64) -> (WebM, PacketExtractor<R>) {
        let extractor = PacketExtractor::new(self.rdr, self.clusters, track);
        (self.webm, extractor)
    }
}

/// Send all packets, then [Demuxed::End].
///
/// Returns the number of packets sent. Stops early, without sending `End`,
/// if the receiver is dropped.
pub fn demux_to_channel<R: Read>(packets: PacketExtractor<R>, tx: &Sender<Demuxed>) -> u64 {
    let mut n_sent = 0;
    for packet in packets {
        if tx.send(Demuxed::Packet(packet)).is_err() {
            tracing::debug!("packet receiver closed after {n_sent} packets");
            return n_sent;
        }
        n_sent += 1;
    }
    if tx.send(Demuxed::End).is_err() {
        tracing::debug!("packet receiver closed before end of stream");
    }
    n_sent
}
