use chrono::{DateTime, Utc};
use std::path::PathBuf;
use thiserror::Error;

/// Result type used throughout this crate.
pub type StormSatResult<T> = Result<T, StormSatError>;

/// All the ways the pipeline can fail.
///
/// The batch renderer only recovers from `DataUnavailable` and render errors, which are skipped
/// one sample at a time. Database and configuration errors abort the run.
#[derive(Debug, Error)]
pub enum StormSatError {
    /// No satellite frame could be obtained for a requested time, even after removing empty
    /// files from the local archive and retrying the lookup once.
    #[error("satellite data unavailable near {when}: {reason}")]
    DataUnavailable {
        when: DateTime<Utc>,
        reason: String,
    },

    /// The archive has no files within the search window of the requested time.
    #[error("no archive files within the search window of {0}")]
    NoCandidates(DateTime<Utc>),

    /// A downloaded file turned out to be empty, a known failure mode of interrupted transfers.
    #[error("downloaded file is empty: {0}")]
    EmptyFile(PathBuf),

    /// A fixed mapping (projection epochs, product names) has no entry for the requested input.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A coordinate is not visible from the satellite, so it cannot be projected.
    #[error("({lat}, {lon}) is not visible from the satellite")]
    OffDisk { lat: f64, lon: f64 },

    /// An archive object key or file name that does not follow the NOAA naming scheme.
    #[error("malformed archive file name: {0}")]
    FileName(String),

    #[error("error decoding netCDF data: {0}")]
    NetCdf(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("error decoding bucket listing: {0}")]
    Listing(#[from] quick_xml::de::DeError),

    #[error("error encoding image: {0}")]
    Image(#[from] image::ImageError),
}
