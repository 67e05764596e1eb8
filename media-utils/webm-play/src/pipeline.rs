use std::io::Read;

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use webm_demux::{demux_to_channel, Demuxed, Demuxer, Packet};

use crate::{Error, PlayConfig, Result};

/// Turns packets into frames. Runs on its own thread.
pub trait PacketDecoder {
    type Frame: Send + 'static;
    type Error: std::fmt::Display;

    /// Decode one packet. Returns `None` if no frame is complete yet.
    fn decode(&mut self, packet: Packet) -> std::result::Result<Option<Self::Frame>, Self::Error>;
}

/// Receives decoded frames, in order, on the thread calling [play].
pub trait FrameSink<F> {
    type Error: std::fmt::Display;

    fn render(&mut self, frame: F) -> std::result::Result<(), Self::Error>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackSummary {
    pub track: u64,
    pub packets_sent: u64,
    pub frames_decoded: u64,
    pub frames_rendered: u64,
}

/// Play the file named in `cfg`.
pub fn play<D, S>(cfg: &PlayConfig, decoder: D, sink: &mut S) -> Result<PlaybackSummary>
where
    D: PacketDecoder + Send + 'static,
    S: FrameSink<D::Frame>,
{
    let open_error = |source| Error::Open {
        path: cfg.input.clone(),
        source,
    };
    let file = std::fs::File::open(&cfg.input).map_err(open_error)?;
    play_reader(std::io::BufReader::new(file), cfg, decoder, sink)
}

/// Play a WebM stream.
///
/// The demuxer and `decoder` each run on a spawned thread. Frames are rendered
/// on the calling thread until the stream ends or `cfg.frame_limit` frames
/// were rendered. All threads are joined before returning.
pub fn play_reader<R, D, S>(
    rdr: R,
    cfg: &PlayConfig,
    decoder: D,
    sink: &mut S,
) -> Result<PlaybackSummary>
where
    R: Read + Send + 'static,
    D: PacketDecoder + Send + 'static,
    S: FrameSink<D::Frame>,
{
    let demuxer = Demuxer::new(rdr)?;
    let track = match cfg.track {
        Some(track) => track,
        None => demuxer.first_video_track()?.number,
    };
    if let Some(entry) = demuxer.webm().segment.track_by_number(track) {
        tracing::info!(
            "playing track {track} ({}, {}x{})",
            entry.codec_id,
            entry.video.pixel_width,
            entry.video.pixel_height
        );
    }
    let packets = demuxer.packets(track);

    let (packet_tx, packet_rx) = crossbeam_channel::bounded(cfg.channel_capacity);
    let (frame_tx, frame_rx) = crossbeam_channel::bounded(cfg.channel_capacity);
    // Never sent on. Dropped when rendering ends.
    let (render_tx, render_rx) = crossbeam_channel::bounded::<()>(0);

    let demuxer_thread = std::thread::Builder::new()
        .name("webm-demux".to_string())
        .spawn(move || demux_to_channel(packets, &packet_tx))?;
    let decoder_thread = std::thread::Builder::new()
        .name("webm-decode".to_string())
        .spawn(move || decode_loop(decoder, packet_rx, frame_tx, render_rx))?;

    let render_result = render_loop(sink, &frame_rx, cfg.frame_limit);
    // Disconnect so that blocked upstream stages return.
    drop(frame_rx);
    drop(render_tx);

    let packets_sent = demuxer_thread
        .join()
        .map_err(|_| Error::ThreadPanic("demux"))?;
    let frames_decoded = decoder_thread
        .join()
        .map_err(|_| Error::ThreadPanic("decode"))??;
    let frames_rendered = render_result?;

    let summary = PlaybackSummary {
        track,
        packets_sent,
        frames_decoded,
        frames_rendered,
    };
    tracing::debug!("playback done: {summary:?}");
    Ok(summary)
}

fn decode_loop<D: PacketDecoder>(
    mut decoder: D,
    packets: Receiver<Demuxed>,
    frames: Sender<D::Frame>,
    rendering: Receiver<()>,
) -> Result<u64> {
    let mut n_decoded = 0;
    for item in packets.iter() {
        // A decoder yielding no frames would otherwise never notice.
        if let Err(TryRecvError::Disconnected) = rendering.try_recv() {
            tracing::debug!("rendering ended after {n_decoded} frames");
            break;
        }
        let packet = match item {
            Demuxed::Packet(packet) => packet,
            Demuxed::End => {
                tracing::debug!("end of stream after {n_decoded} frames");
                break;
            }
        };
        let frame = match decoder.decode(packet) {
            Ok(Some(frame)) => frame,
            Ok(None) => continue,
            Err(e) => return Err(Error::Decoder(e.to_string())),
        };
        n_decoded += 1;
        if frames.send(frame).is_err() {
            tracing::debug!("frame receiver closed");
            break;
        }
    }
    Ok(n_decoded)
}

fn render_loop<F, S: FrameSink<F>>(
    sink: &mut S,
    frames: &Receiver<F>,
    frame_limit: u64,
) -> Result<u64> {
    let mut n_rendered = 0;
    while n_rendered < frame_limit {
        // Err: the decoder is done
        let Ok(frame) = frames.recv() else {
            break;
        };
        sink.render(frame).map_err(|e| Error::Sink(e.to_string()))?;
        n_rendered += 1;
    }
    if n_rendered == frame_limit {
        tracing::debug!("frame limit {frame_limit} reached");
    }
    Ok(n_rendered)
}
