use clap::Parser;
use webm_demux::Packet;
use webm_play::{FrameSink, PacketDecoder, PlayConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input WebM file. Ignored if `--config` is given.
    input: Option<std::path::PathBuf>,
    /// TOML configuration file
    #[arg(long)]
    config: Option<std::path::PathBuf>,
    /// Stop after this many frames
    #[arg(long)]
    frame_limit: Option<u64>,
}

/// Passes payloads through in place of a real video decoder.
struct NullDecoder;

impl PacketDecoder for NullDecoder {
    type Frame = Packet;
    type Error = std::convert::Infallible;
    fn decode(&mut self, packet: Packet) -> Result<Option<Packet>, Self::Error> {
        Ok(Some(packet))
    }
}

struct PrintSink;

impl FrameSink<Packet> for PrintSink {
    type Error = std::convert::Infallible;
    fn render(&mut self, frame: Packet) -> Result<(), Self::Error> {
        println!(
            "t={} track={} {} bytes{}",
            frame.timecode,
            frame.track_number,
            frame.payload.len(),
            if frame.invisible { " (invisible)" } else { "" }
        );
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut cfg = match (&cli.config, &cli.input) {
        (Some(config), _) => PlayConfig::from_toml_path(config)?,
        (None, Some(input)) => PlayConfig::new(input),
        (None, None) => anyhow::bail!("either an input file or --config is required"),
    };
    if let Some(frame_limit) = cli.frame_limit {
        cfg.frame_limit = frame_limit;
    }
    let _guard = webm_play::init_logging(&cfg.logging)?;

    let summary = webm_play::play(&cfg, NullDecoder, &mut PrintSink)?;
    println!("{summary:?}");
    Ok(())
}
