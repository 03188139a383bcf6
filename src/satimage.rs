/*! Decoding of ABI radiance rasters from archive NetCDF files. */

use crate::error::{StormSatError, StormSatResult};
use libc::{c_char, c_double, c_int, size_t};
use once_cell::sync::OnceCell;
use std::{
    ffi::{CStr, CString},
    path::Path,
    sync::Mutex,
};

static_assertions::assert_eq_size!(c_double, f64);

/**
 * One decoded radiance raster together with the fixed-grid coordinate metadata needed to map
 * scan angles back onto grid cells.
 *
 * The whole raster is read up front and the NetCDF handle is closed before `open` returns, so
 * values of this type are plain data and hold no library resources.
 */
#[derive(Debug, Clone)]
pub struct RadianceImage {
    /// Image width in pixels
    nx: usize,
    /// Image height in pixels
    ny: usize,
    /// Radiance values in row major order, northernmost row first. Fill values are NaN.
    rad: Vec<f64>,
    /// Scale factor converting a column number to an x scan angle in radians.
    xscale: f64,
    /// Offset converting a column number to an x scan angle in radians.
    xoffset: f64,
    /// Scale factor converting a row number to a y scan angle in radians.
    yscale: f64,
    /// Offset converting a row number to a y scan angle in radians.
    yoffset: f64,
    /// Original file name the raster was loaded from.
    fname: String,
}

macro_rules! check_error {
    ($code:expr) => {
        check_netcdf_error($code, file!(), line!())
    };
    ($code:expr, "attr") => {
        check_netcdf_attribute_error($code, file!(), line!())
    };
}

impl RadianceImage {
    /// Open an archive NetCDF file and decode its radiance variable.
    pub fn open<P: AsRef<Path>>(path: P) -> StormSatResult<Self> {
        let p: &Path = path.as_ref();
        let fname: String = p
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .ok_or_else(|| StormSatError::FileName(p.display().to_string()))?;

        match p.extension() {
            Some(ext) if ext == "nc" => Self::open_nc(p, fname),
            _ => Err(std::io::Error::from(std::io::ErrorKind::Unsupported).into()),
        }
    }

    fn open_nc(p: &Path, fname: String) -> StormSatResult<Self> {
        let path_str = CString::new(p.to_string_lossy().as_bytes())
            .map_err(|_| StormSatError::FileName(fname.clone()))?;

        let lock = get_netcdf_lock()
            .lock()
            .expect("Error locking global mutex for netCDF");

        let mut file_id: c_int = -1;
        unsafe {
            let status = nc_open(path_str.as_ptr(), NC_NOWRITE, &mut file_id as *mut c_int);
            check_error!(status)?;
        }

        // Everything is decoded before the handle is closed, whatever the outcome.
        let result = Self::read_contents(file_id, fname);

        unsafe {
            let _ = nc_close(file_id);
        }

        drop(lock);

        result
    }

    fn read_contents(handle: c_int, fname: String) -> StormSatResult<Self> {
        let mut nx: usize = 0;
        let mut ny: usize = 0;

        let mut xscale: f64 = f64::NAN;
        let mut xoffset: f64 = f64::NAN;
        let mut yscale: f64 = f64::NAN;
        let mut yoffset: f64 = f64::NAN;

        // Shorthand
        let h = handle;

        unsafe {
            let mut xdimid: c_int = -1;
            let mut status = nc_inq_dimid(
                h,
                b"x\0".as_ptr() as *const c_char,
                &mut xdimid as *mut c_int,
            );
            check_error!(status)?;
            status = nc_inq_dimlen(h, xdimid, &mut nx as *mut size_t);
            check_error!(status)?;

            let mut ydimid: c_int = -1;
            status = nc_inq_dimid(
                h,
                b"y\0".as_ptr() as *const c_char,
                &mut ydimid as *mut c_int,
            );
            check_error!(status)?;
            status = nc_inq_dimlen(h, ydimid, &mut ny as *mut size_t);
            check_error!(status)?;

            let mut x: c_int = -1;
            let mut y: c_int = -1;
            status = nc_inq_varid(h, b"x\0".as_ptr() as *const c_char, &mut x as *mut c_int);
            check_error!(status)?;
            status = nc_inq_varid(h, b"y\0".as_ptr() as *const c_char, &mut y as *mut c_int);
            check_error!(status)?;

            let scale_factor = b"scale_factor\0".as_ptr() as *const c_char;
            status = nc_get_att_double(h, x, scale_factor, &mut xscale as *mut c_double);
            check_error!(status)?;
            status = nc_get_att_double(h, y, scale_factor, &mut yscale as *mut c_double);
            check_error!(status)?;

            let add_offset = b"add_offset\0".as_ptr() as *const c_char;
            status = nc_get_att_double(h, x, add_offset, &mut xoffset as *mut c_double);
            check_error!(status)?;
            status = nc_get_att_double(h, y, add_offset, &mut yoffset as *mut c_double);
            check_error!(status)?;
        }

        let rad = extract_variable_double(h, b"Rad\0".as_ptr() as *const c_char, nx, ny)?;

        Ok(RadianceImage {
            nx,
            ny,
            rad,
            xscale,
            xoffset,
            yscale,
            yoffset,
            fname,
        })
    }

    /// Image width in pixels.
    pub fn width(&self) -> usize {
        self.nx
    }

    /// Image height in pixels.
    pub fn height(&self) -> usize {
        self.ny
    }

    /// The file name this raster was decoded from.
    pub fn file_name(&self) -> &str {
        &self.fname
    }

    /// Sample the raster at a fixed-grid scan angle, nearest-neighbor.
    ///
    /// Returns `None` when the angle falls outside the scanned grid or on a fill value (space
    /// pixels and dropped scan lines).
    pub fn sample_scan_angle(&self, x_rad: f64, y_rad: f64) -> Option<f64> {
        let i = ((x_rad - self.xoffset) / self.xscale).round();
        let j = ((y_rad - self.yoffset) / self.yscale).round();

        if !i.is_finite() || !j.is_finite() || i < 0.0 || j < 0.0 {
            return None;
        }

        let (i, j) = (i as usize, j as usize);
        if i >= self.nx || j >= self.ny {
            return None;
        }

        let value = self.rad[j * self.nx + i];
        value.is_finite().then_some(value)
    }

    /// Assemble an image from already decoded parts.
    #[cfg(test)]
    pub(crate) fn from_parts(
        nx: usize,
        ny: usize,
        rad: Vec<f64>,
        xscale: f64,
        xoffset: f64,
        yscale: f64,
        yoffset: f64,
    ) -> Self {
        assert_eq!(rad.len(), nx * ny);

        RadianceImage {
            nx,
            ny,
            rad,
            xscale,
            xoffset,
            yscale,
            yoffset,
            fname: "synthetic".to_string(),
        }
    }
}

/// Read a whole 2-D variable as doubles, applying the packing attributes.
///
/// Values equal to the variable's `_FillValue` become NaN. When `scale_factor`/`add_offset` are
/// present the stored integers are unpacked to physical units, which is how the radiance
/// variable is encoded.
fn extract_variable_double(
    handle: c_int,
    vname: *const c_char,
    nx: usize,
    ny: usize,
) -> StormSatResult<Vec<f64>> {
    let mut vals: Vec<f64> = Vec::with_capacity(nx * ny);

    let mut has_packing;
    let mut scale_factor: f64 = 1.0;
    let mut add_offset: f64 = 0.0;
    let mut fill_value: f64 = 65535.0;

    unsafe {
        let mut varid: c_int = -1;
        let mut status = nc_inq_varid(handle, vname, &mut varid as *mut c_int);
        check_error!(status)?;

        let start: [size_t; 2] = [0, 0];
        let counts: [size_t; 2] = [ny, nx];
        status = nc_get_vara_double(
            handle,
            varid,
            start.as_ptr(),
            counts.as_ptr(),
            vals.as_mut_ptr(),
        );
        check_error!(status)?;

        vals.set_len(ny * nx);

        let scale_str = b"scale_factor\0".as_ptr() as *const c_char;
        let offset_str = b"add_offset\0".as_ptr() as *const c_char;
        let fill_str = b"_FillValue\0".as_ptr() as *const c_char;
        status = nc_get_att_double(handle, varid, scale_str, &mut scale_factor as *mut c_double);
        check_error!(status, "attr")?;
        has_packing = status == NC_NOERR;
        status = nc_get_att_double(handle, varid, offset_str, &mut add_offset as *mut c_double);
        check_error!(status, "attr")?;
        has_packing = has_packing || status == NC_NOERR;
        status = nc_get_att_double(handle, varid, fill_str, &mut fill_value as *mut c_double);
        check_error!(status, "attr")?;
    }

    if has_packing {
        for val in vals.iter_mut() {
            *val = if *val == fill_value {
                f64::NAN
            } else {
                *val * scale_factor + add_offset
            };
        }
    } else {
        for val in vals.iter_mut() {
            if *val == fill_value {
                *val = f64::NAN;
            }
        }
    }

    Ok(vals)
}

static NETCDF_GLOBAL_LOCK: OnceCell<Mutex<()>> = OnceCell::new();

fn get_netcdf_lock() -> &'static Mutex<()> {
    NETCDF_GLOBAL_LOCK.get_or_init(|| Mutex::new(()))
}

const NC_NOWRITE: c_int = 0x0000;
const NC_NOERR: c_int = 0;
const NC_ENOTATT: c_int = -43;

fn check_netcdf_error(status_code: c_int, file: &'static str, line: u32) -> StormSatResult<()> {
    if status_code != NC_NOERR {
        let msg = unsafe {
            String::from_utf8_lossy(CStr::from_ptr(nc_strerror(status_code)).to_bytes())
                .to_string()
        };
        Err(StormSatError::NetCdf(format!(
            "{}[{}]: {}",
            file, line, msg
        )))
    } else {
        Ok(())
    }
}

fn check_netcdf_attribute_error(
    status_code: c_int,
    file: &'static str,
    line: u32,
) -> StormSatResult<()> {
    if status_code != NC_NOERR && status_code != NC_ENOTATT {
        let msg = unsafe {
            String::from_utf8_lossy(CStr::from_ptr(nc_strerror(status_code)).to_bytes())
                .to_string()
        };
        Err(StormSatError::NetCdf(format!(
            "{}[{}] loading attribute: {}",
            file, line, msg
        )))
    } else {
        Ok(())
    }
}

#[link(name = "netcdf")]
extern "C" {
    fn nc_open(path: *const c_char, mode: c_int, ncidp: *mut c_int) -> c_int;
    fn nc_close(handle: c_int) -> c_int;

    fn nc_strerror(code: c_int) -> *const c_char;

    fn nc_inq_dimid(handle: c_int, name: *const c_char, rv: *mut c_int) -> c_int;
    fn nc_inq_dimlen(handle: c_int, dimid: c_int, rv: *mut size_t) -> c_int;
    fn nc_inq_varid(handle: c_int, name: *const c_char, varid: *mut c_int) -> c_int;
    fn nc_get_att_double(
        handle: c_int,
        varid: c_int,
        name: *const c_char,
        val: *mut c_double,
    ) -> c_int;
    fn nc_get_vara_double(
        handle: c_int,
        varid: c_int,
        start: *const size_t,
        counts: *const size_t,
        vals: *mut c_double,
    ) -> c_int;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sample_scan_angle_maps_angles_onto_the_grid() {
        // A 4x4 grid spanning x in [0.0, 0.3] and y in [0.3, 0.0], row 0 northernmost.
        let rad: Vec<f64> = (0..16).map(f64::from).collect();
        let img = RadianceImage::from_parts(4, 4, rad, 0.1, 0.0, -0.1, 0.3);

        assert_eq!(img.sample_scan_angle(0.0, 0.3), Some(0.0));
        assert_eq!(img.sample_scan_angle(0.3, 0.3), Some(3.0));
        assert_eq!(img.sample_scan_angle(0.0, 0.0), Some(12.0));
        assert_eq!(img.sample_scan_angle(0.21, 0.19), Some(6.0));

        // Off the grid in every direction.
        assert_eq!(img.sample_scan_angle(-0.06, 0.3), None);
        assert_eq!(img.sample_scan_angle(0.36, 0.3), None);
        assert_eq!(img.sample_scan_angle(0.0, 0.36), None);
        assert_eq!(img.sample_scan_angle(0.0, -0.06), None);
    }

    #[test]
    fn test_fill_values_sample_as_none() {
        let mut rad: Vec<f64> = vec![1.0; 4];
        rad[3] = f64::NAN;
        let img = RadianceImage::from_parts(2, 2, rad, 1.0, 0.0, -1.0, 1.0);

        assert_eq!(img.sample_scan_angle(0.0, 1.0), Some(1.0));
        assert_eq!(img.sample_scan_angle(1.0, 0.0), None);
    }
}
