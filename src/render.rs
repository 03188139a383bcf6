//! Rendering of storm-centered composite images.

use crate::{
    archive::FrameSource,
    coastline::Coastline,
    colormap::ColorScale,
    error::{StormSatError, StormSatResult},
    projection::GeosProjection,
    track::StormTrackSample,
};
use chrono::Datelike;
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_line_segment_mut;
use log::debug;
use std::path::PathBuf;

/// Knobs for the composite renderer.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Half-width of the crop window in degrees.
    pub margin_deg: f64,
    /// Output image width and height in pixels.
    pub size_px: u32,
    /// Directory that holds the `storm_centered` output tree.
    pub img_dir: PathBuf,
    /// Draw the coastline overlay when coastline geometry is available.
    pub draw_coastlines: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            margin_deg: 11.0,
            size_px: 300,
            img_dir: PathBuf::from("./img"),
            draw_coastlines: true,
        }
    }
}

/// What happened for one track sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// A new composite was written to the path.
    Rendered(PathBuf),
    /// The output file already existed, nothing was done.
    Skipped(PathBuf),
}

/// Renders one composite image per storm track sample.
pub struct CompositeRenderer {
    options: RenderOptions,
    scale: ColorScale,
    coastline: Option<Coastline>,
}

impl CompositeRenderer {
    pub fn new(options: RenderOptions, coastline: Option<Coastline>) -> Self {
        CompositeRenderer {
            options,
            scale: ColorScale::storm_composite(),
            coastline,
        }
    }

    /// The deterministic output path for a sample.
    ///
    /// Composites are keyed by storm and time:
    /// `{img_dir}/storm_centered/{storm id}/centered_{time}.png`, with the timestamp written as
    /// ISO-8601 with the colons (and the date/time separator) replaced so the name is portable.
    pub fn output_path(&self, sample: &StormTrackSample) -> PathBuf {
        let stamp = sample.valid_time.format("%Y-%m-%dT%H-%M-%S");

        self.options
            .img_dir
            .join("storm_centered")
            .join(&sample.storm_id)
            .join(format!("centered_{}.png", stamp))
    }

    /// Render the composite for one track sample.
    ///
    /// The output file's existence is the completion marker: when it is already present the
    /// sample is skipped before any frame lookup or drawing happens, which is what makes an
    /// interrupted batch safely restartable.
    pub fn render(
        &self,
        sample: &StormTrackSample,
        frames: &mut dyn FrameSource,
    ) -> StormSatResult<RenderOutcome> {
        let path = self.output_path(sample);
        if path.exists() {
            return Ok(RenderOutcome::Skipped(path));
        }

        let projection = GeosProjection::for_year(sample.valid_time.year())?;
        let window = CropWindow::centered(
            &projection,
            sample.longitude,
            sample.latitude,
            self.options.margin_deg,
        )?;

        let frame = frames.nearest(sample.valid_time)?;
        debug!(
            "{} at {} using frame {}",
            sample.storm_id,
            sample.valid_time,
            frame.image.file_name()
        );

        let size = self.options.size_px;
        let mut img = RgbaImage::new(size, size);

        for py in 0..size {
            for px in 0..size {
                let (x_m, y_m) = window.plane_coords(px, py, size);
                let (x_rad, y_rad) = projection.scan_angle(x_m, y_m);

                if let Some(value) = frame.image.sample_scan_angle(x_rad, y_rad) {
                    img.put_pixel(px, py, Rgba(self.scale.rgba(value)));
                }
            }
        }

        if self.options.draw_coastlines {
            if let Some(coastline) = &self.coastline {
                draw_coastlines(&mut img, coastline, &projection, &window, size);
            }
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        img.save(&path)?;

        Ok(RenderOutcome::Rendered(path))
    }
}

/// A square crop window in the projection plane, in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct CropWindow {
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
}

impl CropWindow {
    /// Build the window centered on a coordinate with the given angular margin.
    ///
    /// The two corners `(lon - margin, lat - margin)` and `(lon + margin, lat + margin)` are
    /// projected, then both axes are clamped to the smaller of the projected spans so the
    /// window is exactly square around the same center.
    pub(crate) fn centered(
        projection: &GeosProjection,
        center_lon: f64,
        center_lat: f64,
        margin_deg: f64,
    ) -> StormSatResult<Self> {
        let off_disk = |lon: f64, lat: f64| StormSatError::OffDisk { lat, lon };

        let (lon0, lat0) = (center_lon - margin_deg, center_lat - margin_deg);
        let (lon1, lat1) = (center_lon + margin_deg, center_lat + margin_deg);

        let (x0, y0) = projection
            .project(lon0, lat0)
            .ok_or_else(|| off_disk(lon0, lat0))?;
        let (x1, y1) = projection
            .project(lon1, lat1)
            .ok_or_else(|| off_disk(lon1, lat1))?;

        let (x_lo, x_hi) = (x0.min(x1), x0.max(x1));
        let (y_lo, y_hi) = (y0.min(y1), y0.max(y1));

        let x_center = (x_lo + x_hi) / 2.0;
        let y_center = (y_lo + y_hi) / 2.0;
        let usable = (x_hi - x_lo).min(y_hi - y_lo);
        let half = usable / 2.0;

        Ok(CropWindow {
            x_min: x_center - half,
            x_max: x_center + half,
            y_min: y_center - half,
            y_max: y_center + half,
        })
    }

    pub(crate) fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub(crate) fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// The projection plane coordinates of an output pixel's center. Row zero is the northern
    /// edge of the window.
    fn plane_coords(&self, px: u32, py: u32, size: u32) -> (f64, f64) {
        let step = self.width() / f64::from(size);

        let x = self.x_min + (f64::from(px) + 0.5) * step;
        let y = self.y_max - (f64::from(py) + 0.5) * step;

        (x, y)
    }

    /// An output pixel position for a projection plane coordinate. May land outside the image.
    fn pixel_coords(&self, x_m: f64, y_m: f64, size: u32) -> (f32, f32) {
        let px = (x_m - self.x_min) / self.width() * f64::from(size);
        let py = (self.y_max - y_m) / self.height() * f64::from(size);

        (px as f32, py as f32)
    }
}

const COASTLINE_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

fn draw_coastlines(
    img: &mut RgbaImage,
    coastline: &Coastline,
    projection: &GeosProjection,
    window: &CropWindow,
    size: u32,
) {
    let limit = size as f32;

    for segment in coastline.segments() {
        for pair in segment.windows(2) {
            let (a, b) = (pair[0], pair[1]);

            let (Some(pa), Some(pb)) = (projection.project(a.0, a.1), projection.project(b.0, b.1))
            else {
                continue;
            };

            let (ax, ay) = window.pixel_coords(pa.0, pa.1, size);
            let (bx, by) = window.pixel_coords(pb.0, pb.1, size);

            // Skip line work with no chance of touching the window.
            let outside = (ax < 0.0 && bx < 0.0)
                || (ay < 0.0 && by < 0.0)
                || (ax >= limit && bx >= limit)
                || (ay >= limit && by >= limit);
            if outside {
                continue;
            }

            draw_line_segment_mut(img, (ax, ay), (bx, by), COASTLINE_COLOR);
        }
    }
}
