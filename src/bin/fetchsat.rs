use clap::Parser;
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::{error::Error, path::PathBuf};
use stormsat::{GoesArchive, GoesConfig, StormSelection, TrackDatabase};

/*-------------------------------------------------------------------------------------------------
 *                                     Command Line Options
 *-----------------------------------------------------------------------------------------------*/

///
/// Download GOES radiance files for every day a chosen storm was active.
///
/// This program reads the distinct dates with observed track points for the storms selected in
/// the chosen_storms table, then makes sure every matching archive file for those days is
/// present in the local download archive. Files that are already there (and not empty) are not
/// downloaded again, so the program can be re-run to fill gaps.
///
#[derive(Debug, Parser)]
#[clap(bin_name = "fetchsat")]
#[clap(author, version, about)]
struct FetchSatOptions {
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

    /// Only fetch days for these storm ids instead of the chosen_storms table.
    #[clap(long = "storm")]
    storms: Vec<String>,

    /// Verbose output
    #[clap(short, long)]
    verbose: bool,
}

/*-------------------------------------------------------------------------------------------------
 *                                             Main
 *-----------------------------------------------------------------------------------------------*/

fn main() -> Result<(), Box<dyn Error>> {
    let opts = FetchSatOptions::parse();

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
    let product = config.goes_product()?;
    let archive = GoesArchive::new(&config)?;

    let selection = if opts.storms.is_empty() {
        StormSelection::Chosen
    } else {
        StormSelection::Ids(opts.storms.clone())
    };

    let dates = tracks.distinct_track_dates(&selection)?;
    log::info!("{} days of imagery to check", dates.len());

    let mut downloaded = 0usize;
    let mut failed = 0usize;

    let operational = product.satellite.operational().date_naive();

    for date in dates {
        if date < operational {
            log::warn!(
                "{} predates operational {} data, skipping",
                date,
                product.satellite
            );
            continue;
        }

        match archive.fetch_day(date) {
            Ok(0) => log::debug!("{} is already complete", date),
            Ok(count) => {
                log::info!("{}: downloaded {} files", date, count);
                downloaded += count;
            }
            Err(err) => {
                // One bad day should not sink the whole backfill.
                log::warn!("skipping {}: {}", date, err);
                failed += 1;
            }
        }
    }

    log::info!("done: {} files downloaded, {} days failed", downloaded, failed);

    Ok(())
}
