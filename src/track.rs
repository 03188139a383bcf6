//! Read-only access to the storm tracks database.
//!
//! The database carries three tables: `paths` with the observed track points, `paths_interp`
//! with the time-interpolated track points used for rendering, and `chosen_storms`, a single
//! `ID` column selecting which storms a batch run should process. Both track tables share the
//! shape `(hurricane_id, datetime, latitude, longitude)`.

use crate::error::StormSatResult;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;

/// One observation of a storm's position at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct StormTrackSample {
    /// Opaque identifier grouping the samples belonging to one storm, e.g. "AL012019".
    pub storm_id: String,
    /// Valid time of the position in UTC.
    pub valid_time: DateTime<Utc>,
    /// Decimal degrees, positive north.
    pub latitude: f64,
    /// Decimal degrees, positive east.
    pub longitude: f64,
}

/// Which storms a query should cover.
#[derive(Debug, Clone)]
pub enum StormSelection {
    /// Every storm listed in the `chosen_storms` table.
    Chosen,
    /// An explicit set of storm identifiers.
    Ids(Vec<String>),
}

/// Represents a connection to the database where the storm track information is stored.
pub struct TrackDatabase {
    conn: Connection,
}

impl TrackDatabase {
    /// Open a read-only connection to the tracks database.
    pub fn connect<P: AsRef<Path>>(path: P) -> StormSatResult<Self> {
        let conn = Connection::open_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        Ok(TrackDatabase { conn })
    }

    /// The interpolated track samples for the selected storms, ordered by storm and time.
    ///
    /// The ordering clause is what guarantees the per-storm non-decreasing timestamp invariant
    /// the renderer batch relies on.
    pub fn interpolated_track(
        &self,
        selection: &StormSelection,
    ) -> StormSatResult<Vec<StormTrackSample>> {
        const CHOSEN_QUERY: &str = "\
            SELECT hurricane_id, datetime, latitude, longitude \
            FROM paths_interp \
            WHERE hurricane_id IN (SELECT ID FROM chosen_storms) \
            ORDER BY hurricane_id, datetime";

        let (query, params) = match selection {
            StormSelection::Chosen => (CHOSEN_QUERY.to_string(), Vec::new()),
            StormSelection::Ids(ids) => (
                format!(
                    "SELECT hurricane_id, datetime, latitude, longitude \
                     FROM paths_interp \
                     WHERE hurricane_id IN ({}) \
                     ORDER BY hurricane_id, datetime",
                    placeholders(ids.len())
                ),
                ids.clone(),
            ),
        };

        let mut stmt = self.conn.prepare(&query)?;
        let samples = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                let naive: NaiveDateTime = row.get(1)?;

                Ok(StormTrackSample {
                    storm_id: row.get(0)?,
                    valid_time: Utc.from_utc_datetime(&naive),
                    latitude: row.get(2)?,
                    longitude: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(samples)
    }

    /// The distinct calendar dates on which any selected storm has an observed track point.
    ///
    /// This drives the bulk downloader: one day of imagery per active storm day.
    pub fn distinct_track_dates(
        &self,
        selection: &StormSelection,
    ) -> StormSatResult<Vec<NaiveDate>> {
        const CHOSEN_QUERY: &str = "\
            SELECT DISTINCT date(datetime) \
            FROM paths \
            WHERE hurricane_id IN (SELECT ID FROM chosen_storms) \
            ORDER BY 1";

        let (query, params) = match selection {
            StormSelection::Chosen => (CHOSEN_QUERY.to_string(), Vec::new()),
            StormSelection::Ids(ids) => (
                format!(
                    "SELECT DISTINCT date(datetime) \
                     FROM paths \
                     WHERE hurricane_id IN ({}) \
                     ORDER BY 1",
                    placeholders(ids.len())
                ),
                ids.clone(),
            ),
        };

        let mut stmt = self.conn.prepare(&query)?;
        let dates = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), |row| row.get(0))?
            .collect::<Result<Vec<NaiveDate>, _>>()?;

        Ok(dates)
    }

    /// The storm identifiers currently listed in the `chosen_storms` selection table.
    pub fn chosen_storm_ids(&self) -> StormSatResult<Vec<String>> {
        const QUERY: &str = "SELECT ID FROM chosen_storms ORDER BY ID";

        let mut stmt = self.conn.prepare(QUERY)?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(ids)
    }

    #[cfg(test)]
    fn from_connection(conn: Connection) -> Self {
        TrackDatabase { conn }
    }
}

/// "?, ?, ?" with one placeholder per parameter.
fn placeholders(count: usize) -> String {
    let mut s = String::with_capacity(3 * count);
    for i in 0..count {
        if i > 0 {
            s.push_str(", ");
        }
        s.push('?');
    }
    s
}

#[cfg(test)]
mod test {
    use super::*;

    fn test_database() -> TrackDatabase {
        let conn = Connection::open_in_memory().unwrap();

        conn.execute_batch(
            "CREATE TABLE paths (hurricane_id TEXT, datetime TEXT, latitude REAL, longitude REAL);
             CREATE TABLE paths_interp (hurricane_id TEXT, datetime TEXT, latitude REAL, longitude REAL);
             CREATE TABLE chosen_storms (ID TEXT);

             INSERT INTO chosen_storms VALUES ('AL012019'), ('AL052017');

             INSERT INTO paths_interp VALUES
                ('AL052017', '2017-09-06 06:00:00', 19.1, -64.1),
                ('AL012019', '2019-09-01 18:00:00', 26.0, -71.9),
                ('AL012019', '2019-09-01 12:00:00', 25.1, -70.3),
                ('AL012019', '2019-09-01 15:00:00', 25.5, -71.1),
                ('AL092021', '2021-08-29 12:00:00', 29.1, -90.2),
                ('AL052017', '2017-09-05 18:00:00', 18.2, -62.8);

             INSERT INTO paths VALUES
                ('AL012019', '2019-09-01 12:00:00', 25.1, -70.3),
                ('AL012019', '2019-09-02 00:00:00', 26.4, -72.5),
                ('AL052017', '2017-09-05 18:00:00', 18.2, -62.8),
                ('AL092021', '2021-08-29 12:00:00', 29.1, -90.2);",
        )
        .unwrap();

        TrackDatabase::from_connection(conn)
    }

    #[test]
    fn test_samples_are_ordered_by_storm_then_time() {
        let db = test_database();
        let samples = db.interpolated_track(&StormSelection::Chosen).unwrap();

        // Only chosen storms are returned.
        assert_eq!(samples.len(), 5);
        assert!(samples.iter().all(|s| s.storm_id != "AL092021"));

        // Within a storm, timestamps never decrease.
        for pair in samples.windows(2) {
            if pair[0].storm_id == pair[1].storm_id {
                assert!(pair[0].valid_time <= pair[1].valid_time);
            } else {
                assert!(pair[0].storm_id < pair[1].storm_id);
            }
        }
    }

    #[test]
    fn test_explicit_id_selection() {
        let db = test_database();
        let samples = db
            .interpolated_track(&StormSelection::Ids(vec!["AL092021".to_string()]))
            .unwrap();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].storm_id, "AL092021");
        assert_eq!(
            samples[0].valid_time,
            Utc.with_ymd_and_hms(2021, 8, 29, 12, 0, 0).unwrap()
        );
        assert_eq!(samples[0].latitude, 29.1);
        assert_eq!(samples[0].longitude, -90.2);
    }

    #[test]
    fn test_distinct_track_dates() {
        let db = test_database();
        let dates = db.distinct_track_dates(&StormSelection::Chosen).unwrap();

        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2017, 9, 5).unwrap(),
                NaiveDate::from_ymd_opt(2019, 9, 1).unwrap(),
                NaiveDate::from_ymd_opt(2019, 9, 2).unwrap(),
            ]
        );
    }

    #[test]
    fn test_chosen_storm_ids() {
        let db = test_database();
        assert_eq!(
            db.chosen_storm_ids().unwrap(),
            vec!["AL012019".to_string(), "AL052017".to_string()]
        );
    }
}
