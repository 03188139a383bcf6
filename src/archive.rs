//! The local GOES archive, backed by the NOAA public buckets.
//!
//! The archive mirrors the bucket layout under a local root directory, so an object key like
//! `ABI-L1b-RadF/2019/244/12/OR_...nc` lands at the same relative path on disk. Files already
//! present and non-empty are never downloaded again.

use crate::{
    config::GoesConfig,
    error::{StormSatError, StormSatResult},
    remote::BucketClient,
    satellite::{scan_start_time, GoesProduct},
    satimage::RadianceImage,
};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

/// One satellite radiance frame resolved for a requested time.
///
/// Owned transiently by the caller for the duration of one render; the archive keeps no copy
/// beyond the file on disk.
#[derive(Debug, Clone)]
pub struct RadianceFrame {
    /// Scan start time of the frame.
    pub capture_time: DateTime<Utc>,
    /// The decoded raster.
    pub image: RadianceImage,
}

/// Anything that can resolve the radiance frame closest in time to a request.
pub trait FrameSource {
    fn nearest(&mut self, when: DateTime<Utc>) -> StormSatResult<RadianceFrame>;
}

/// Represents the local archive directory plus the remote bucket that fills it.
pub struct GoesArchive {
    product: GoesProduct,
    /// Local directory mirroring the bucket, e.g. `~/data/goes/noaa-goes16`.
    root: PathBuf,
    remote: BucketClient,
}

impl GoesArchive {
    pub fn new(config: &GoesConfig) -> StormSatResult<Self> {
        let product = config.goes_product()?;
        let bucket = product.satellite.bucket();

        Ok(GoesArchive {
            product,
            root: config.save_dir.join(bucket),
            remote: BucketClient::new(bucket)?,
        })
    }

    /// The local archive root for this satellite.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The local directory holding the files for the hour containing `when`.
    pub fn hour_dir(&self, when: DateTime<Utc>) -> PathBuf {
        self.root.join(self.product.hour_dir(when))
    }

    /// Make sure one day of this product's files is present locally.
    ///
    /// Lists every hour of the day and downloads whatever is missing or empty. Returns the
    /// number of files downloaded.
    pub fn fetch_day(&self, date: NaiveDate) -> StormSatResult<usize> {
        let mut downloaded = 0;

        for hour in 0..24 {
            let when = Utc.from_utc_datetime(
                &date
                    .and_hms_opt(hour, 0, 0)
                    .expect("hours below 24 are always valid"),
            );

            for key in self.list_hour(when)? {
                let local = self.root.join(&key);
                if file_is_missing_or_empty(&local) {
                    debug!("downloading {}", key);
                    self.remote.download(&key, &local)?;
                    downloaded += 1;
                }
            }
        }

        Ok(downloaded)
    }

    /// List the archive keys of this product's files within the hour containing `when`.
    pub fn list_hour(&self, when: DateTime<Utc>) -> StormSatResult<Vec<String>> {
        let keys = self.remote.list(&self.product.hour_prefix(when))?;

        Ok(keys
            .into_iter()
            .filter(|key| match key.rsplit('/').next() {
                Some(name) => self.product.matches_file(name),
                None => false,
            })
            .collect())
    }

    /// One lookup attempt: list candidates around the hour, pick the closest scan start, make
    /// sure the file is local and non-empty, decode it.
    fn try_nearest(&self, when: DateTime<Utc>) -> StormSatResult<RadianceFrame> {
        let mut best: Option<(Duration, DateTime<Utc>, String)> = None;

        // A request near the top of an hour can be closest to a frame filed under the adjacent
        // hour's directory, so the neighbors are searched too.
        for offset in [-1, 0, 1] {
            let listing_hour = when + Duration::hours(offset);

            for key in self.list_hour(listing_hour)? {
                let name = key.rsplit('/').next().unwrap_or(&key);
                let start = match scan_start_time(name) {
                    Ok(start) => start,
                    Err(err) => {
                        debug!("ignoring unparseable key {}: {}", key, err);
                        continue;
                    }
                };

                let distance = (start - when).abs();
                if best.as_ref().map_or(true, |(d, _, _)| distance < *d) {
                    best = Some((distance, start, key));
                }
            }
        }

        let (_, capture_time, key) = best.ok_or(StormSatError::NoCandidates(when))?;

        let local = self.ensure_local(&key)?;
        let image = RadianceImage::open(&local)?;

        Ok(RadianceFrame {
            capture_time,
            image,
        })
    }

    /// Download a key into the local archive unless it is already there and non-empty.
    fn ensure_local(&self, key: &str) -> StormSatResult<PathBuf> {
        let local = self.root.join(key);

        if file_is_missing_or_empty(&local) {
            debug!("downloading {}", key);
            self.remote.download(key, &local)?;

            if file_is_missing_or_empty(&local) {
                return Err(StormSatError::EmptyFile(local));
            }
        }

        Ok(local)
    }

    /// Best-effort removal of zero-byte files from the hour directory for `when`.
    ///
    /// Interrupted downloads leave empty files behind, and those poison every later lookup that
    /// trusts the local copy. Removal failures are logged and otherwise ignored.
    fn sweep_hour(&self, when: DateTime<Utc>) {
        let dir = self.hour_dir(when);

        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                debug!("cannot scan {}: {}", dir.display(), err);
                return;
            }
        };

        for entry in entries.filter_map(|res| res.ok()) {
            let path = entry.path();

            let is_empty_file = entry
                .metadata()
                .map(|meta| meta.is_file() && meta.len() == 0)
                .unwrap_or(false);

            if is_empty_file {
                match std::fs::remove_file(&path) {
                    Ok(()) => info!("removed empty file {}", path.display()),
                    Err(err) => debug!("cannot remove {}: {}", path.display(), err),
                }
            }
        }
    }
}

impl FrameSource for GoesArchive {
    /// Resolve the frame closest in time to `when`.
    ///
    /// A failed first attempt triggers a sweep of zero-byte files in the hour's local directory
    /// followed by exactly one retry. A second failure is reported as data unavailable.
    fn nearest(&mut self, when: DateTime<Utc>) -> StormSatResult<RadianceFrame> {
        match self.try_nearest(when) {
            Ok(frame) => Ok(frame),
            Err(first) => {
                warn!(
                    "frame lookup near {} failed ({}), sweeping empty files and retrying",
                    when, first
                );
                self.sweep_hour(when);

                self.try_nearest(when)
                    .map_err(|retry| StormSatError::DataUnavailable {
                        when,
                        reason: retry.to_string(),
                    })
            }
        }
    }
}

fn file_is_missing_or_empty(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(meta) => meta.len() == 0,
        Err(_) => true,
    }
}

/// Remove every zero-byte file under `root`, returning how many were deleted.
///
/// This is the en-masse version of the per-hour sweep, run once at the start of a batch job.
/// It never fails: unreadable directories and undeletable files are skipped.
pub fn remove_empty_files<P: AsRef<Path>>(root: P) -> usize {
    let mut removed = 0;

    for entry in walkdir::WalkDir::new(root.as_ref())
        .into_iter()
        .filter_map(|res| res.ok())
        .filter(|entry| {
            entry
                .metadata()
                .map(|meta| meta.is_file() && meta.len() == 0)
                .unwrap_or(false)
        })
    {
        match std::fs::remove_file(entry.path()) {
            Ok(()) => {
                info!("removed empty file {}", entry.path().display());
                removed += 1;
            }
            Err(err) => debug!("cannot remove {}: {}", entry.path().display(), err),
        }
    }

    removed
}
