//! The geostationary perspective projection used for the GOES-R fixed grid.
//!
//! Math follows the GOES-R Product Definition and Users' Guide, Volume 4, section on navigating
//! the fixed grid. Projection plane coordinates are scan angles scaled by the perspective point
//! height, in meters, with north up.

use crate::error::{StormSatError, StormSatResult};

/// Height of the perspective point above the Earth surface in meters.
pub const PERSPECTIVE_HEIGHT_M: f64 = 35_786_023.0;
/// Radius of the Earth at the equator in meters (GRS80).
const SEMI_MAJOR_AXIS_M: f64 = 6_378_137.0;
/// Radius of the Earth at the poles in meters.
const SEMI_MINOR_AXIS_M: f64 = 6_356_752.3142;

#[derive(Debug, Clone, Copy)]
pub struct GeosProjection {
    /// Distance from the satellite to the Earth center in meters.
    h: f64,
    /// Radius of the Earth at the equator in meters.
    req: f64,
    /// Radius of the Earth at the poles in meters.
    rpol: f64,
    /// Longitude of the sub-satellite point in radians.
    lon0: f64,
}

impl GeosProjection {
    /// A projection for a satellite sitting over the given longitude.
    pub fn new(nadir_longitude_deg: f64) -> Self {
        GeosProjection {
            h: PERSPECTIVE_HEIGHT_M + SEMI_MAJOR_AXIS_M,
            req: SEMI_MAJOR_AXIS_M,
            rpol: SEMI_MINOR_AXIS_M,
            lon0: nadir_longitude_deg.to_radians(),
        }
    }

    /// The projection in effect for a calendar year of the track archive.
    ///
    /// GOES-16 scanned from its checkout position at 89.5W during the 2017 season and from the
    /// GOES East position at 75.0W afterwards. Only years with track data have entries; any
    /// other year is an error, never a silent default.
    pub fn for_year(year: i32) -> StormSatResult<Self> {
        let nadir_longitude_deg = match year {
            2017 => -89.5,
            2019 | 2022 => -75.0,
            _ => {
                return Err(StormSatError::Configuration(format!(
                    "no satellite position recorded for year {}",
                    year
                )))
            }
        };

        Ok(Self::new(nadir_longitude_deg))
    }

    /// The longitude of the sub-satellite point in degrees.
    pub fn nadir_longitude(&self) -> f64 {
        self.lon0.to_degrees()
    }

    /// Project geodetic coordinates into the projection plane, in meters.
    ///
    /// Returns `None` for points on the far side of the Earth, which are not visible from the
    /// satellite.
    pub fn project(&self, lon_deg: f64, lat_deg: f64) -> Option<(f64, f64)> {
        let (x, y) = self.geodetic_to_scan(lon_deg, lat_deg)?;
        Some((x * PERSPECTIVE_HEIGHT_M, y * PERSPECTIVE_HEIGHT_M))
    }

    /// Convert projection plane coordinates in meters back to fixed-grid scan angles in radians.
    pub fn scan_angle(&self, x_m: f64, y_m: f64) -> (f64, f64) {
        (x_m / PERSPECTIVE_HEIGHT_M, y_m / PERSPECTIVE_HEIGHT_M)
    }

    /// Convert geodetic coordinates in degrees to fixed-grid scan angles in radians.
    fn geodetic_to_scan(&self, lon_deg: f64, lat_deg: f64) -> Option<(f64, f64)> {
        let lat = lat_deg.to_radians();
        let lon = lon_deg.to_radians();

        let req = self.req;
        let rpol = self.rpol;
        let h = self.h;

        let e2 = (req * req - rpol * rpol) / (req * req);
        let phi_c = ((rpol * rpol) / (req * req) * lat.tan()).atan();
        let rc = rpol / (1.0 - e2 * phi_c.cos() * phi_c.cos()).sqrt();

        let dlon = lon - self.lon0;
        let sx = h - rc * phi_c.cos() * dlon.cos();
        let sy = -rc * phi_c.cos() * dlon.sin();
        let sz = rc * phi_c.sin();

        // Visibility: the line of sight must not pass through the Earth.
        if h * (h - sx) < sy * sy + (req * req) / (rpol * rpol) * sz * sz {
            return None;
        }

        let x = (-sy / (sx * sx + sy * sy + sz * sz).sqrt()).asin();
        let y = (sz / sx).atan();

        Some((x, y))
    }

    /// Convert fixed-grid scan angles in radians back to geodetic coordinates in degrees.
    ///
    /// Returns `None` when the scan angle points past the limb of the Earth.
    pub fn scan_to_geodetic(&self, x_rad: f64, y_rad: f64) -> Option<(f64, f64)> {
        let sinx = x_rad.sin();
        let cosx = x_rad.cos();
        let siny = y_rad.sin();
        let cosy = y_rad.cos();

        let req = self.req;
        let rpol = self.rpol;
        let h = self.h;

        let a = sinx * sinx + cosx * cosx * (cosy * cosy + req * req / (rpol * rpol) * siny * siny);
        let b = -2.0 * h * cosx * cosy;
        let c = h * h - req * req;

        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return None;
        }

        let rs = (-b - discriminant.sqrt()) / (2.0 * a);

        let sx = rs * cosx * cosy;
        let sy = -rs * sinx;
        let sz = rs * cosx * siny;

        let lat = (req * req * sz)
            .atan2(rpol * rpol * ((h - sx) * (h - sx) + sy * sy).sqrt())
            .to_degrees();
        let lon = (self.lon0 - sy.atan2(h - sx)).to_degrees();

        Some((lon, lat))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_year_epochs_are_total_over_the_known_years() {
        for (year, nadir) in [(2017, -89.5), (2019, -75.0), (2022, -75.0)] {
            let proj = GeosProjection::for_year(year).unwrap();
            assert!((proj.nadir_longitude() - nadir).abs() < 1.0e-9);
        }

        for year in [2016, 2018, 2020, 2021, 2023] {
            assert!(matches!(
                GeosProjection::for_year(year),
                Err(StormSatError::Configuration(_))
            ));
        }
    }

    #[test]
    fn test_nadir_projects_to_the_origin() {
        let proj = GeosProjection::new(-75.0);
        let (x, y) = proj.project(-75.0, 0.0).unwrap();

        assert!(x.abs() < 1.0e-6);
        assert!(y.abs() < 1.0e-6);
    }

    #[test]
    fn test_projection_round_trip() {
        let proj = GeosProjection::new(-75.0);

        for &(lon, lat) in &[
            (-70.3, 25.1),
            (-95.0, 29.7),
            (-60.0, 14.0),
            (-81.3, 36.1),
            (-75.0, -33.0),
        ] {
            let (x, y) = proj.geodetic_to_scan(lon, lat).unwrap();
            let (lon2, lat2) = proj.scan_to_geodetic(x, y).unwrap();

            assert!((lon - lon2).abs() < 1.0e-6, "{} != {}", lon, lon2);
            assert!((lat - lat2).abs() < 1.0e-6, "{} != {}", lat, lat2);
        }
    }

    #[test]
    fn test_far_side_of_the_earth_is_not_visible() {
        let proj = GeosProjection::new(-75.0);

        assert!(proj.project(105.0, 0.0).is_none());
        assert!(proj.project(140.0, 45.0).is_none());
    }

    #[test]
    fn test_scan_angles_past_the_limb_are_none() {
        let proj = GeosProjection::new(-75.0);

        // The full disk spans roughly +/-0.1518 radians.
        assert!(proj.scan_to_geodetic(0.2, 0.0).is_none());
        assert!(proj.scan_to_geodetic(0.0, 0.2).is_none());
        assert!(proj.scan_to_geodetic(0.01, 0.01).is_some());
    }
}
