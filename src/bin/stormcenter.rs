use clap::Parser;
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::{error::Error, path::PathBuf};
use stormsat::{
    remove_empty_files, Coastline, CompositeRenderer, GoesArchive, GoesConfig, RenderOptions,
    RenderOutcome, StormSelection, TrackDatabase,
};

/*-------------------------------------------------------------------------------------------------
 *                                     Command Line Options
 *-----------------------------------------------------------------------------------------------*/

///
/// Render a storm-centered composite image for every chosen storm track point.
///
/// For each interpolated track sample of the storms selected in the chosen_storms table, this
/// program resolves the GOES radiance frame closest to the sample in time, crops it to a square
/// window centered on the storm position, and writes a color mapped PNG with a transparent
/// background. Samples whose output file already exists are skipped, so an interrupted batch can
/// safely be restarted.
///
#[derive(Debug, Parser)]
#[clap(bin_name = "stormcenter")]
#[clap(author, version, about)]
struct StormCenterOptions {
    /// The path to the storm tracks database file.
    ///
    /// If this is not specified, then the program will check for it in the "TRACKS_DB"
    /// environment variable.
    #[clap(short, long)]
    #[clap(env = "TRACKS_DB")]
    tracks_store_file: PathBuf,

    /// The path to the configuration file with the archive location and product defaults.
    ///
    /// If this is not specified the program falls back to ~/.config/stormsat/config.toml, and
    /// to built in defaults if that file does not exist either.
    #[clap(short, long)]
    config_file: Option<PathBuf>,

    /// The directory the storm_centered image tree is written into.
    #[clap(short, long)]
    #[clap(default_value = "./img")]
    img_dir: PathBuf,

    /// Half-width of the crop window in degrees.
    #[clap(short, long)]
    #[clap(default_value_t = 11.0)]
    margin: f64,

    /// Only render these storm ids instead of the chosen_storms table.
    #[clap(long = "storm")]
    storms: Vec<String>,

    /// Do not draw the coastline overlay.
    #[clap(long)]
    no_coastlines: bool,

    /// Verbose output
    #[clap(short, long)]
    verbose: bool,
}

/*-------------------------------------------------------------------------------------------------
 *                                             Main
 *-----------------------------------------------------------------------------------------------*/

fn main() -> Result<(), Box<dyn Error>> {
    let opts = StormCenterOptions::parse();

    let level = if opts.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    SimpleLogger::new().with_level(level).init()?;

    let config = match &opts.config_file {
        Some(path) => GoesConfig::load_from(path)?,
        None => GoesConfig::load()?,
    };

    let tracks = TrackDatabase::connect(&opts.tracks_store_file)?;
    let mut archive = GoesArchive::new(&config)?;

    // Interrupted downloads leave empty files that poison later lookups, clear them up front.
    let removed = remove_empty_files(archive.root());
    if removed > 0 {
        log::info!("removed {} empty files from the archive", removed);
    }

    let coastline = match &config.coastline_file {
        Some(path) => match Coastline::load(path) {
            Ok(coastline) => Some(coastline),
            Err(err) => {
                log::warn!("no coastline overlay, cannot load {}: {}", path.display(), err);
                None
            }
        },
        None => None,
    };

    let selection = if opts.storms.is_empty() {
        StormSelection::Chosen
    } else {
        StormSelection::Ids(opts.storms.clone())
    };

    let samples = tracks.interpolated_track(&selection)?;
    log::info!("{} track samples to render", samples.len());

    let renderer = CompositeRenderer::new(
        RenderOptions {
            margin_deg: opts.margin,
            img_dir: opts.img_dir.clone(),
            draw_coastlines: !opts.no_coastlines,
            ..RenderOptions::default()
        },
        coastline,
    );

    let mut rendered = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;

    for sample in &samples {
        match renderer.render(sample, &mut archive) {
            Ok(RenderOutcome::Rendered(path)) => {
                rendered += 1;
                log::info!(
                    "{} {} -> {}",
                    sample.storm_id,
                    sample.valid_time,
                    path.display()
                );
            }
            Ok(RenderOutcome::Skipped(path)) => {
                skipped += 1;
                log::debug!("already present: {}", path.display());
            }
            Err(err) => {
                // A frame that cannot be fetched or drawn must not sink the whole batch.
                failed += 1;
                log::warn!(
                    "skipping {} at {}: {}",
                    sample.storm_id,
                    sample.valid_time,
                    err
                );
            }
        }
    }

    log::info!(
        "done: {} rendered, {} already present, {} failed",
        rendered,
        skipped,
        failed
    );

    Ok(())
}
