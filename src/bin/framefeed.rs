use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;

/// Read frame commands (one per line) and encode them into a video with `ffmpeg`.
///
/// Commands: `output <path>`, `resolution <w>x<h>`, `fps <n>[/<d>]`, `bitrate <n>`,
/// `repeat <n>`, `image <path>`, `pipe <hex handle>`, `delete`, `cancel`. Any other line is an
/// image path. `stop`, `quit`, `exit`, `done` and `end` end the input; blank lines and lines
/// starting with `#` are skipped.
#[derive(Parser, Debug)]
#[command(name = "framefeed", version)]
struct Cli {
    /// Output video path (same as a leading `output` command).
    output: Option<String>,

    /// Read commands from a file instead of stdin.
    #[arg(long = "input")]
    input: Option<PathBuf>,

    /// Initial frame rate, `<n>` or `<n>/<d>`.
    #[arg(long, default_value_t = framefeed::Fps::DEFAULT)]
    fps: framefeed::Fps,

    /// Initial average bitrate in bits per second.
    #[arg(long, default_value_t = framefeed::DEFAULT_BITRATE)]
    bitrate: u32,

    /// Initial resolution, `<w>x<h>` (both even).
    #[arg(long)]
    resolution: Option<framefeed::Resolution>,

    /// Encoder program.
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// Fail instead of overwriting an existing output file.
    #[arg(long, default_value_t = false)]
    no_overwrite: bool,

    /// Print a JSON run summary to stdout.
    #[arg(long, default_value_t = false)]
    summary: bool,

    /// Diagnostic verbosity (warn, info, debug, trace). Warnings are always shown, so `error`
    /// behaves like `warn`.
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(cli.log_level.max(tracing::Level::WARN))
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("install log subscriber: {e}"))?;

    let opts = framefeed::FeedOpts {
        resolution: cli.resolution,
        fps: cli.fps,
        bitrate: cli.bitrate,
        output: cli.output,
    };

    let sink = framefeed::FfmpegSink::new(framefeed::FfmpegSinkOpts {
        program: cli.ffmpeg,
        overwrite: !cli.no_overwrite,
    });

    let input: Box<dyn BufRead> = match &cli.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("open command file '{}'", path.display()))?,
        )),
        None => Box::new(std::io::stdin().lock()),
    };

    let summary = framefeed::feed(input, &opts, sink)?;

    if cli.summary {
        let json = serde_json::to_string_pretty(&summary).context("serialize run summary")?;
        println!("{json}");
    }
    Ok(())
}
