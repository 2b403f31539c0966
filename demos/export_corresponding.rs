//! Export the source points behind a displayed surface
//!
//! ```text
//! export_corresponding --surface shown.pcd --prefix out/selection_ \
//!     --source cubeA.pcd-0=cubeA.pcd --source cubeA.pcd-1=cubeA.pcd --widget axes -v
//! ```
//!
//! Writes `out/selection_1.pcd`, one file per distinct source, holding only
//! the source points that lie under the displayed surface.

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use threecrate_io::{read_point_cloud, IoRegistry};
use threecrate_visualization::{
    CloudExporter, DisplaySurface, ExportOptions, LogLogger, SourceFileRef, SourceRegistry,
};

#[derive(Parser)]
#[command(name = "export_corresponding")]
#[command(about = "Re-export the original points behind a displayed point cloud surface", version)]
struct Cli {
    /// PCD file holding the displayed surface points
    #[arg(long)]
    surface: PathBuf,

    /// Output prefix; files are named <prefix><n>.pcd
    #[arg(long)]
    prefix: String,

    /// Displayed element loaded from a file, as ID=PATH
    #[arg(long = "source", value_parser = parse_source)]
    sources: Vec<(String, PathBuf)>,

    /// Displayed element without a source file
    #[arg(long = "widget")]
    widgets: Vec<String>,

    /// Write ASCII instead of binary PCD
    #[arg(long)]
    ascii: bool,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_source(value: &str) -> std::result::Result<(String, PathBuf), String> {
    match value.split_once('=') {
        Some((id, path)) if !id.is_empty() && !path.is_empty() => Ok((id.to_string(), PathBuf::from(path))),
        _ => Err(format!("expected ID=PATH, got '{}'", value)),
    }
}

fn run(cli: Cli) -> Result<()> {
    let displayed = read_point_cloud(&cli.surface)
        .with_context(|| format!("failed to read surface {}", cli.surface.display()))?;
    info!("Loaded {} displayed points from {}", displayed.len(), cli.surface.display());

    let mut sources = SourceRegistry::new();
    for (id, path) in cli.sources {
        sources.register_source(id, SourceFileRef::pcd(path));
    }
    for id in cli.widgets {
        sources.register_display_only(id);
    }

    let io = IoRegistry::with_defaults();
    let options = ExportOptions::with_prefix(cli.prefix).binary(!cli.ascii);
    let summary = CloudExporter::new(&io, &LogLogger)
        .with_options(options)
        .export_corresponding(&DisplaySurface::from(&displayed), &sources)?;

    for path in &summary.written {
        println!("{}", path.display());
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
