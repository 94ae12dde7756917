//! `pcaruco` command-line tool.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use pcaruco::aruco::ArucoDetectorParams;
use pcaruco::core::{parse_level, ProjectionParams, TileMask};
use pcaruco::{
    report_outcome, show_frame, ArucoMarkerDetector, ConsoleReporter, DrawStyle, JsonReporter,
    Pipeline, PipelineConfig, PipelineError, PngViewer, Reporter, StdinKeys,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser, Debug)]
#[command(name = "pcaruco")]
#[command(about = "Find ArUco markers in point-cloud projections and images")]
#[command(version)]
struct Cli {
    /// Point-cloud (.ply) or image files.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Raster size for point-cloud projections, as WIDTHxHEIGHT.
    #[arg(long, default_value = "512x512", value_parser = parse_size)]
    size: (usize, usize),

    /// Tile bit to process; repeat for several. Defaults to 1, 2, 4 and 8.
    #[arg(long = "tile", value_name = "MASK")]
    tiles: Vec<TileMask>,

    /// Marker dictionary.
    #[arg(long, default_value = "DICT_4X4_50")]
    dictionary: String,

    /// Maximum corrected bits per marker.
    #[arg(long)]
    max_hamming: Option<u8>,

    /// Print one JSON document per line instead of text.
    #[arg(long)]
    json: bool,

    /// Write annotated frames and wait for ESC on stdin after each one.
    #[arg(long)]
    show: bool,

    /// Directory for annotated frames (default: system temp dir).
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Log level: off, error, warn, info, debug or trace.
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn parse_size(s: &str) -> Result<(usize, usize), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let w: usize = w.trim().parse().map_err(|e| format!("bad width '{w}': {e}"))?;
    let h: usize = h.trim().parse().map_err(|e| format!("bad height '{h}': {e}"))?;
    if w == 0 || h == 0 {
        return Err(format!("size must be positive, got {w}x{h}"));
    }
    Ok((w, h))
}

fn init_logging(level: &str) -> CliResult<()> {
    let level = parse_level(level).ok_or_else(|| format!("unknown log level '{level}'"))?;

    #[cfg(feature = "tracing")]
    {
        tracing_log::LogTracer::builder()
            .with_max_level(level)
            .init()?;
        pcaruco::core::init_tracing(false);
    }
    #[cfg(not(feature = "tracing"))]
    pcaruco::core::init_with_level(level)?;

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_logging(&cli.log_level) {
        eprintln!("error: {e}");
        return ExitCode::from(2);
    }

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}

/// Process every input; `Ok(false)` if any of them could not be read.
#[cfg_attr(feature = "tracing", tracing::instrument(level = "info", skip(cli)))]
fn run(cli: &Cli) -> CliResult<bool> {
    let defaults = ArucoDetectorParams::default();
    let params = ArucoDetectorParams {
        max_hamming: cli.max_hamming.unwrap_or(defaults.max_hamming),
        ..defaults
    };
    let detector = ArucoMarkerDetector::from_name(&cli.dictionary, params)?;

    let (width, height) = cli.size;
    let mut config = PipelineConfig {
        projection: ProjectionParams { width, height },
        ..PipelineConfig::default()
    };
    if !cli.tiles.is_empty() {
        config.tiles = cli.tiles.clone();
    }
    let pipeline = Pipeline::new(config, detector);

    let stdout = io::stdout();
    let mut reporter: Box<dyn Reporter> = if cli.json {
        Box::new(JsonReporter::new(stdout.lock()))
    } else {
        Box::new(ConsoleReporter::new(stdout.lock()))
    };

    let mut viewer = cli.show.then(|| {
        PngViewer::new(
            cli.out_dir
                .clone()
                .unwrap_or_else(|| std::env::temp_dir().join("pcaruco")),
        )
    });
    let mut keys = StdinKeys::stdin();
    let style = DrawStyle::default();

    let mut all_readable = true;
    for path in &cli.files {
        reporter.input(path)?;
        match pipeline.run_on_path(path) {
            Ok(outcome) => {
                report_outcome(reporter.as_mut(), &outcome)?;
                if let Some(viewer) = viewer.as_mut() {
                    for frame in outcome.frames() {
                        if let Err(e) = show_frame(viewer, &mut keys, frame, &style) {
                            log::warn!("{}: cannot show frame: {e}", frame.source);
                        }
                    }
                }
            }
            Err(e) => {
                if matches!(e, PipelineError::UnreadableInput { .. }) {
                    all_readable = false;
                }
                log::error!("{e}");
                reporter.failure(&path.display().to_string(), &e)?;
            }
        }
    }

    io::stdout().flush()?;
    Ok(all_readable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sizes() {
        assert_eq!(parse_size("512x256"), Ok((512, 256)));
        assert_eq!(parse_size("64X64"), Ok((64, 64)));
        assert!(parse_size("0x10").is_err());
        assert!(parse_size("512").is_err());
    }
}
