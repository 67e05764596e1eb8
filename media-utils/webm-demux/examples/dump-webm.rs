// Copyright 2022-2023 Andrew D. Straw.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT
// or http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Sets input file name
    input_fname: std::path::PathBuf,
    /// Track to dump. Defaults to the first video track.
    #[arg(long)]
    track: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let fd = std::io::BufReader::new(std::fs::File::open(&cli.input_fname)?);
    let demuxer = webm_demux::Demuxer::new(fd)?;

    let webm = demuxer.webm();
    println!("{:?}", webm.header);
    println!("{:?}", webm.segment.info);
    println!("{:.1} secs", webm.segment.info.duration_seconds());
    for track in webm.segment.tracks.entries.iter() {
        println!("{track:?}");
    }

    let track = match cli.track {
        Some(track) => track,
        None => demuxer.first_video_track()?.number,
    };

    let mut packets = demuxer.packets(track);
    println!("packets of track {}:", packets.track());
    let mut n_packets = 0;
    for (count, packet) in packets.by_ref().enumerate() {
        if count < 10 {
            println!(
                "packet {count} time {} size {} {:?} {:?}",
                packet.timecode,
                packet.payload.len(),
                packet.lacing,
                packet.origin
            );
        }
        n_packets += 1;
    }
    println!(".. {n_packets} packets total ..");
    if let Some(e) = packets.take_error() {
        return Err(e.into());
    }
    Ok(())
}
